use crate::config::Config;
use crate::state::{open_ledger, save_ledger};
use content_inspector::ContentType;
use surveychain::*;

pub fn command_deploy(matches: &clap::ArgMatches, config: &Config, now: u64) {
    let admin = config.identity();
    let filename = crate::expand(matches.value_of("INPUT").unwrap_or_default());
    let out = crate::expand(matches.value_of("out").unwrap_or("./deployed-surveys.json"));

    let file_bytes = match std::fs::read(&filename) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("surveychain deploy: unable to read {}: {}", &filename, e);
            std::process::exit(1);
        }
    };

    let definitions: Vec<SurveyDefinition> = match content_inspector::inspect(&file_bytes) {
        ContentType::UTF_8 => serde_json::from_slice(&file_bytes).unwrap_or_else(|e| {
            eprintln!("surveychain deploy: unable to read {}: {}", &filename, e);
            std::process::exit(1);
        }),
        ContentType::BINARY => serde_cbor::from_slice(&file_bytes).unwrap_or_else(|e| {
            eprintln!("surveychain deploy: unable to read {}: {}", &filename, e);
            std::process::exit(1);
        }),
        _ => {
            eprintln!("surveychain deploy: invalid file format for {}", &filename);
            std::process::exit(1);
        }
    };

    let mut ledger = open_ledger(&config.state_path);

    // Nothing is saved unless the whole batch deploys
    let ctx = CallContext::new(admin, now);
    let directory = Directory::deploy(&mut ledger, &ctx, &definitions)
        .unwrap_or_else(|e| crate::exit_with("deploy", e));

    save_ledger(&config.state_path, &ledger);
    directory
        .save(&out)
        .unwrap_or_else(|e| crate::exit_with("deploy", e));

    for record in directory.records() {
        println!("{}. {}", record.id, record.title);
        println!("   Address: {}", record.address);
        println!("   Options: {}", record.options_count);
        println!("   End Time: {}", record.end_time);
    }
    println!("Deployment info saved to: {}", out);
}
