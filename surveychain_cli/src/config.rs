use std::env::var;
use std::str::FromStr;
use surveychain::{Address, NetworkProfile};

pub struct Config {
    pub state_path: String,
    pub identity: Option<Address>,
    pub network: NetworkProfile,
}

impl Config {
    pub fn from_env() -> Self {
        let state_path: String = match var("SURVEYCHAIN_STATE") {
            Ok(val) => val,
            Err(_e) => "./surveychain.json".to_owned(),
        };

        let identity = match var("SURVEYCHAIN_IDENTITY") {
            Ok(val) => Some(parse_identity(&val)),
            Err(_e) => None,
        };

        let network = match var("SURVEYCHAIN_NETWORK") {
            Ok(val) => parse_network(&val),
            Err(_e) => NetworkProfile::sepolia(),
        };

        Config {
            state_path,
            identity,
            network,
        }
    }

    /// Apply command-line overrides on top of the environment
    pub fn override_with(mut self, matches: &clap::ArgMatches) -> Self {
        if let Some(path) = matches.value_of("state") {
            self.state_path = crate::expand(path);
        }
        if let Some(identity) = matches.value_of("identity") {
            self.identity = Some(parse_identity(identity));
        }
        if let Some(network) = matches.value_of("network") {
            self.network = parse_network(network);
        }
        self
    }

    /// The caller identity, which every state-changing command needs
    pub fn identity(&self) -> Address {
        self.identity.unwrap_or_else(|| {
            eprintln!("Please provide an identity either via --identity or SURVEYCHAIN_IDENTITY");
            std::process::exit(1);
        })
    }
}

pub fn parse_identity(val: &str) -> Address {
    Address::from_str(val).unwrap_or_else(|e| {
        eprintln!("surveychain: invalid identity {}: {}", val, e);
        std::process::exit(1);
    })
}

fn parse_network(val: &str) -> NetworkProfile {
    NetworkProfile::by_name(val).unwrap_or_else(|| {
        eprintln!("surveychain: unknown network {}", val);
        std::process::exit(1);
    })
}
