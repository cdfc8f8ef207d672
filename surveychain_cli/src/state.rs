use std::path::Path;
use std::sync::Arc;
use surveychain::*;

/// A local chain persisted between CLI invocations
#[derive(Serialize, Deserialize, Default, Debug)]
pub struct ChainState {
    #[serde(default)]
    pub coprocessor: Option<CoprocessorSnapshot>,
    #[serde(default)]
    pub surveys: MemStore,
    #[serde(default)]
    pub events: Vec<LoggedEvent>,
}

pub type LocalLedger = Ledger<Arc<LocalCoprocessor>>;

impl ChainState {
    /// Load the chain at `path`. A missing file is a fresh chain.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("no chain state at {}, starting fresh", path.display());
            return Ok(ChainState::default());
        }

        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn into_ledger(self) -> Result<LocalLedger, Error> {
        let coprocessor = match self.coprocessor {
            Some(snapshot) => LocalCoprocessor::from_snapshot(snapshot)?,
            None => LocalCoprocessor::new(),
        };
        Ok(Ledger::from_parts(
            Arc::new(coprocessor),
            self.surveys,
            self.events,
        ))
    }

    pub fn from_ledger(ledger: &LocalLedger) -> Self {
        ChainState {
            coprocessor: Some(ledger.backend().snapshot()),
            surveys: ledger.store().clone(),
            events: ledger.events().to_vec(),
        }
    }
}

/// Load the ledger at `path`, exiting on failure
pub fn open_ledger(path: &str) -> LocalLedger {
    ChainState::load(path)
        .and_then(ChainState::into_ledger)
        .unwrap_or_else(|e| {
            eprintln!("surveychain: unable to load chain state {}: {}", path, e);
            std::process::exit(1);
        })
}

/// Persist the ledger to `path`, exiting on failure
pub fn save_ledger(path: &str, ledger: &LocalLedger) {
    ChainState::from_ledger(ledger)
        .save(path)
        .unwrap_or_else(|e| {
            eprintln!("surveychain: unable to save chain state {}: {}", path, e);
            std::process::exit(1);
        });
}

/// Gateway encrypting against the local coprocessor, with `account` connected
pub fn local_gateway(
    network: &NetworkProfile,
    coprocessor: Arc<LocalCoprocessor>,
    account: Address,
) -> Arc<EncryptionGateway> {
    let loader = Arc::new(LocalLoader::new(coprocessor));
    let gateway = EncryptionGateway::new(network.clone(), loader);
    gateway.connect(WalletContext {
        account,
        chain_id: network.chain_id,
    });
    Arc::new(gateway)
}

/// Current-thread runtime for the async client, exiting on failure
pub fn runtime(command: &str) -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap_or_else(|e| crate::exit_with(command, e))
}
