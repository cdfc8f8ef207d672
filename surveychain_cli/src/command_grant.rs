use crate::config::{parse_identity, Config};
use crate::state::{open_ledger, save_ledger};
use surveychain::CallContext;

pub fn command_grant(matches: &clap::ArgMatches, config: &Config, now: u64) {
    let admin = config.identity();
    let survey = crate::survey_address(matches);
    let viewer = parse_identity(matches.value_of("VIEWER").unwrap_or_default());

    let mut ledger = open_ledger(&config.state_path);
    ledger
        .grant_view(&CallContext::new(admin, now), &survey, &viewer)
        .unwrap_or_else(|e| crate::exit_with("grant", e));
    save_ledger(&config.state_path, &ledger);

    println!("{} may now view results of {}", viewer, survey);
}
