use crate::config::Config;
use crate::state::{local_gateway, open_ledger, runtime};
use std::sync::RwLock;
use surveychain::*;

pub fn command_tally(matches: &clap::ArgMatches, config: &Config) {
    let requester = config.identity();
    let survey = crate::survey_address(matches);
    let ledger = open_ledger(&config.state_path);

    // A single option is revealed through the gateway, as a client would
    if let Some(option) = matches.value_of("OPTION") {
        let option_id = crate::option_index(option);
        let gateway = local_gateway(&config.network, ledger.backend().clone(), requester);
        let client = SurveyClient::new(requester, gateway);
        let ledger = RwLock::new(ledger);

        let count = runtime("tally")
            .block_on(client.read_tally(&ledger, &survey, option_id))
            .unwrap_or_else(|e| crate::exit_with("tally", e));
        println!("{}", count);
        return;
    }

    let results = ledger
        .results(&requester, &survey)
        .unwrap_or_else(|e| crate::exit_with("tally", e));
    let total: u64 = results.iter().map(|tally| tally.count).sum();

    println!("Results ({} ballots):", total);
    for tally in results {
        println!("  [{}] {}: {}", tally.option_id, tally.label, tally.count);
    }
}
