use crate::config::Config;
use crate::state::{local_gateway, runtime, LocalLedger};
use crate::Verbosity;
use std::sync::{Arc, RwLock};
use surveychain::*;

const DAY: u64 = 24 * 60 * 60;

/// Run a survey from deployment to results on a throwaway in-memory chain
pub fn command_e2e(config: &Config, now: u64, verbosity: Verbosity) {
    let admin = Address::random();
    let mut ledger: LocalLedger = Ledger::new(Arc::new(LocalCoprocessor::new()));

    let definition = SurveyDefinition {
        title: "Community Sentiment Survey".to_owned(),
        description: "Share your feedback about our community".to_owned(),
        options: vec![
            "Very Satisfied".to_owned(),
            "Satisfied".to_owned(),
            "Neutral".to_owned(),
            "Dissatisfied".to_owned(),
            "Very Dissatisfied".to_owned(),
        ],
        duration: 7 * DAY,
    };
    let directory = Directory::deploy(&mut ledger, &CallContext::new(admin, now), &[definition])
        .unwrap_or_else(|e| crate::exit_with("e2e", e));
    let survey = directory
        .get("1")
        .and_then(|record| record.address().ok())
        .unwrap_or_else(|| crate::exit_with("e2e", "deployment produced no survey"));
    println!("> Deployed survey at {}", survey);

    let coprocessor = ledger.backend().clone();
    let ledger = RwLock::new(ledger);
    let rt = runtime("e2e");

    // One voter per entry, each voting for the listed option
    let choices = [0, 1, 1, 2, 0, 1, 4];
    let mut expected = [0u64; 5];
    for &option_id in &choices {
        let voter = Address::random();
        let gateway = local_gateway(&config.network, coprocessor.clone(), voter);
        let client = SurveyClient::new(voter, gateway);
        rt.block_on(client.cast_ballot(&ledger, &survey, option_id, now + 1))
            .unwrap_or_else(|e| crate::exit_with("e2e", e));
        expected[option_id] += 1;

        if verbosity as u8 >= Verbosity::Info as u8 {
            println!("  {} voted", voter);
        }
    }
    println!("> Cast {} encrypted ballots", choices.len());

    let end = now + 7 * DAY + 1;
    let mut ledger = ledger
        .into_inner()
        .unwrap_or_else(|e| crate::exit_with("e2e", e));
    ledger
        .finalize(&CallContext::new(admin, end), &survey)
        .unwrap_or_else(|e| crate::exit_with("e2e", e));
    println!("> Survey finalized");

    let results = ledger
        .results(&admin, &survey)
        .unwrap_or_else(|e| crate::exit_with("e2e", e));
    for (tally, expected) in results.iter().zip(expected.iter()) {
        println!("  [{}] {}: {}", tally.option_id, tally.label, tally.count);
        if tally.count != *expected {
            crate::exit_with(
                "e2e",
                format!(
                    "tally for option {} is {}, expected {}",
                    tally.option_id, tally.count, expected
                ),
            );
        }
    }

    println!("> Survey verified OK");
}
