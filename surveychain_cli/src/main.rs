#[macro_use]
extern crate serde;

#[macro_use]
extern crate log;

use clap::{App, Arg, SubCommand};
use log::LevelFilter;
use num_enum::TryFromPrimitive;

mod command_deploy;
mod command_e2e;
mod command_finalize;
mod command_grant;
mod command_info;
mod command_keygen;
mod command_tally;
mod command_vote;
mod config;
mod state;

use command_deploy::command_deploy;
use command_e2e::command_e2e;
use command_finalize::command_finalize;
use command_grant::command_grant;
use command_info::command_info;
use command_keygen::command_keygen;
use command_tally::command_tally;
use command_vote::command_vote;
use config::Config;

#[derive(TryFromPrimitive, PartialEq, Copy, Clone)]
#[repr(u8)]
pub enum Verbosity {
    Silent = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
}

impl Verbosity {
    fn level_filter(self) -> LevelFilter {
        match self {
            Verbosity::Silent => LevelFilter::Off,
            Verbosity::Error => LevelFilter::Error,
            Verbosity::Warn => LevelFilter::Warn,
            Verbosity::Info => LevelFilter::Info,
            Verbosity::Debug => LevelFilter::Debug,
        }
    }
}

fn main() {
    let survey_arg = Arg::with_name("SURVEY")
        .index(1)
        .required(true)
        .help("Survey address");

    let matches = App::new("SurveyChain CLI")
        .version("1.0")
        .about("Runs confidential surveys on a local chain")
        .arg(
            Arg::with_name("state")
                .long("state")
                .takes_value(true)
                .help("Chain state file - can also be set with SURVEYCHAIN_STATE"),
        )
        .arg(
            Arg::with_name("identity")
                .long("identity")
                .takes_value(true)
                .help("Caller address - can also be set with SURVEYCHAIN_IDENTITY"),
        )
        .arg(
            Arg::with_name("network")
                .long("network")
                .takes_value(true)
                .possible_values(&["sepolia", "local"])
                .help("Network profile - can also be set with SURVEYCHAIN_NETWORK"),
        )
        .arg(
            Arg::with_name("at")
                .long("at")
                .takes_value(true)
                .help("Unix timestamp of the call, defaults to now"),
        )
        .arg(
            Arg::with_name("v")
                .short("v")
                .multiple(true)
                .help("Sets the level of verbosity"),
        )
        .subcommand(SubCommand::with_name("keygen").about("Generate a random identity"))
        .subcommand(
            SubCommand::with_name("deploy")
                .about("Deploy a batch of surveys and write the survey directory")
                .arg(
                    Arg::with_name("INPUT")
                        .index(1)
                        .required(true)
                        .help("Survey definitions in JSON or CBOR format"),
                )
                .arg(
                    Arg::with_name("out")
                        .long("out")
                        .takes_value(true)
                        .default_value("./deployed-surveys.json")
                        .help("Where to write the survey directory"),
                ),
        )
        .subcommand(
            SubCommand::with_name("info")
                .about("Show a survey")
                .arg(survey_arg.clone()),
        )
        .subcommand(
            SubCommand::with_name("vote")
                .about("Encrypt and cast a ballot")
                .arg(survey_arg.clone())
                .arg(
                    Arg::with_name("OPTION")
                        .index(2)
                        .required(true)
                        .help("Option index, starting at 0"),
                ),
        )
        .subcommand(
            SubCommand::with_name("grant")
                .about("Let an address view results before finalization")
                .arg(survey_arg.clone())
                .arg(
                    Arg::with_name("VIEWER")
                        .index(2)
                        .required(true)
                        .help("Viewer address"),
                ),
        )
        .subcommand(
            SubCommand::with_name("finalize")
                .about("Close a survey and unlock its results")
                .arg(survey_arg.clone()),
        )
        .subcommand(
            SubCommand::with_name("tally")
                .about("Reveal the tallies of a survey")
                .arg(survey_arg)
                .arg(
                    Arg::with_name("OPTION")
                        .index(2)
                        .required(false)
                        .help("Reveal a single option through the encryption gateway"),
                ),
        )
        .subcommand(
            SubCommand::with_name("e2e").about("Run a complete survey on a throwaway chain"),
        )
        .get_matches();

    let level = (Verbosity::Warn as u64 + matches.occurrences_of("v")).min(Verbosity::Debug as u64);
    let verbosity = Verbosity::try_from_primitive(level as u8).unwrap_or(Verbosity::Debug);
    env_logger::Builder::new()
        .filter_level(verbosity.level_filter())
        .parse_env("SURVEYCHAIN_LOG")
        .init();

    let config = Config::from_env().override_with(&matches);
    let now = match matches.value_of("at") {
        Some(at) => at.parse::<u64>().unwrap_or_else(|e| {
            eprintln!("surveychain: invalid timestamp {}: {}", at, e);
            std::process::exit(1);
        }),
        None => surveychain::unix_now(),
    };
    debug!("chain state: {}, at: {}", config.state_path, now);

    // Subcommands
    if matches.subcommand_matches("keygen").is_some() {
        command_keygen();
        std::process::exit(0);
    }
    if let Some(matches) = matches.subcommand_matches("deploy") {
        command_deploy(matches, &config, now);
        std::process::exit(0);
    }
    if let Some(matches) = matches.subcommand_matches("info") {
        command_info(matches, &config, now);
        std::process::exit(0);
    }
    if let Some(matches) = matches.subcommand_matches("vote") {
        command_vote(matches, &config, now);
        std::process::exit(0);
    }
    if let Some(matches) = matches.subcommand_matches("grant") {
        command_grant(matches, &config, now);
        std::process::exit(0);
    }
    if let Some(matches) = matches.subcommand_matches("finalize") {
        command_finalize(matches, &config, now);
        std::process::exit(0);
    }
    if let Some(matches) = matches.subcommand_matches("tally") {
        command_tally(matches, &config);
        std::process::exit(0);
    }
    if matches.subcommand_matches("e2e").is_some() {
        command_e2e(&config, now, verbosity);
        std::process::exit(0);
    }

    eprintln!("{}", matches.usage());
    std::process::exit(1);
}

pub fn expand(input: &str) -> String {
    shellexpand::full(input)
        .map(|expanded| expanded.into_owned())
        .unwrap_or_else(|_| input.to_owned())
}

/// Parse a survey address argument, exiting on failure
pub fn survey_address(matches: &clap::ArgMatches) -> surveychain::Address {
    config::parse_identity(matches.value_of("SURVEY").unwrap_or_default())
}

/// Parse an option index argument, exiting on failure
pub fn option_index(val: &str) -> usize {
    val.parse().unwrap_or_else(|e| {
        eprintln!("surveychain: invalid option {}: {}", val, e);
        std::process::exit(1);
    })
}

/// Report a failed command and exit
pub fn exit_with(command: &str, e: impl std::fmt::Display) -> ! {
    eprintln!("surveychain {}: {}", command, e);
    std::process::exit(1);
}
