use crate::config::Config;
use crate::state::{open_ledger, save_ledger};
use surveychain::CallContext;

pub fn command_finalize(matches: &clap::ArgMatches, config: &Config, now: u64) {
    let admin = config.identity();
    let survey = crate::survey_address(matches);

    let mut ledger = open_ledger(&config.state_path);
    ledger
        .finalize(&CallContext::new(admin, now), &survey)
        .unwrap_or_else(|e| crate::exit_with("finalize", e));
    save_ledger(&config.state_path, &ledger);

    println!("Survey {} finalized, results are public", survey);
}
