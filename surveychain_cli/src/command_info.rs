use crate::config::Config;
use crate::state::open_ledger;

pub fn command_info(matches: &clap::ArgMatches, config: &Config, now: u64) {
    let address = crate::survey_address(matches);
    let ledger = open_ledger(&config.state_path);

    let survey = ledger
        .survey(&address)
        .unwrap_or_else(|e| crate::exit_with("info", e));

    println!("Survey:   {}", survey.title());
    println!("Address:  {}", survey.address());
    println!("Admin:    {}", survey.admin());
    println!("Window:   {} - {}", survey.voting_start(), survey.voting_end());
    println!("Phase:    {}", survey.phase_at(now));
    println!("Ballots:  {}", survey.voter_count());
    println!("Options:");
    for (option_id, label) in survey.options().iter().enumerate() {
        println!("  [{}] {}", option_id, label);
    }

    if let Some(identity) = &config.identity {
        println!("You have voted: {}", survey.has_voted(identity));
    }
}
