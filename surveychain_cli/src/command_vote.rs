use crate::config::Config;
use crate::state::{local_gateway, open_ledger, runtime, save_ledger};
use std::sync::{PoisonError, RwLock};
use surveychain::*;

pub fn command_vote(matches: &clap::ArgMatches, config: &Config, now: u64) {
    let voter = config.identity();
    let survey = crate::survey_address(matches);
    let option_id = crate::option_index(matches.value_of("OPTION").unwrap_or_default());

    let ledger = open_ledger(&config.state_path);
    let gateway = local_gateway(&config.network, ledger.backend().clone(), voter);
    let client = SurveyClient::new(voter, gateway);
    let ledger = RwLock::new(ledger);

    let result = runtime("vote").block_on(client.cast_ballot(&ledger, &survey, option_id, now));
    if let Err(e) = result {
        if e.class().is_retryable() {
            eprintln!("surveychain vote: {} (temporary, please try again)", e);
        } else {
            eprintln!("surveychain vote: {}", e);
        }
        std::process::exit(1);
    }

    let ledger = ledger.into_inner().unwrap_or_else(PoisonError::into_inner);
    save_ledger(&config.state_path, &ledger);

    println!("Encrypted ballot for option {} cast on {}", option_id, survey);
}
