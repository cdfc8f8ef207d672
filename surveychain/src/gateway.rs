use crate::*;
use std::sync::{Arc, PoisonError, RwLock};

/// Weight encrypted into every ballot. Surveys count participation per option.
pub const VOTE_WEIGHT: u64 = 1;

/// Client-side encryption pipeline
///
/// The encryption toolkit is fetched through the injected [`BackendLoader`] the first time it
/// is needed and cached until [`reset`](EncryptionGateway::reset). Initialization is
/// single-flight: concurrent callers wait on the same in-flight load.
pub struct EncryptionGateway {
    profile: NetworkProfile,
    loader: Arc<dyn BackendLoader>,
    wallet: RwLock<Option<WalletContext>>,
    instance: tokio::sync::Mutex<Option<Arc<dyn FheInstance>>>,
}

impl EncryptionGateway {
    pub fn new(profile: NetworkProfile, loader: Arc<dyn BackendLoader>) -> Self {
        EncryptionGateway {
            profile,
            loader,
            wallet: RwLock::new(None),
            instance: tokio::sync::Mutex::new(None),
        }
    }

    pub fn profile(&self) -> &NetworkProfile {
        &self.profile
    }

    /// Bind the gateway to an active wallet
    pub fn connect(&self, wallet: WalletContext) {
        *self.wallet.write().unwrap_or_else(PoisonError::into_inner) = Some(wallet);
    }

    pub fn disconnect(&self) {
        *self.wallet.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn wallet(&self) -> Result<WalletContext, GatewayError> {
        let wallet = self
            .wallet
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| {
                GatewayError::InfrastructureUnavailable(
                    "no wallet connected, please connect a wallet first".to_owned(),
                )
            })?;

        if wallet.chain_id != self.profile.chain_id {
            return Err(GatewayError::InfrastructureUnavailable(format!(
                "wallet is on chain {}, expected {} ({})",
                wallet.chain_id, self.profile.chain_id, self.profile.name
            )));
        }
        Ok(wallet)
    }

    /// Load the encryption toolkit, or return the cached instance
    pub async fn init(&self) -> Result<Arc<dyn FheInstance>, GatewayError> {
        let wallet = self.wallet()?;

        // Holding the lock across the load makes concurrent callers share it
        let mut slot = self.instance.lock().await;
        if let Some(instance) = slot.as_ref() {
            return Ok(instance.clone());
        }

        info!("loading encryption toolkit for {}", self.profile.name);
        let instance = self
            .loader
            .load(&self.profile, &wallet)
            .await
            .map_err(|e| GatewayError::BackendLoadError(e.to_string()))?;

        *slot = Some(instance.clone());
        Ok(instance)
    }

    /// Drop the cached instance. The next call loads the toolkit again.
    pub async fn reset(&self) {
        *self.instance.lock().await = None;
    }

    pub async fn is_initialized(&self) -> bool {
        self.instance.lock().await.is_some()
    }

    /// Encrypt the constant vote-weight for `voter` on `survey`
    pub async fn encrypt_ballot(
        &self,
        survey: &Address,
        voter: &Address,
    ) -> Result<EncryptedBallot, GatewayError> {
        let instance = self.init().await?;

        debug!("encrypting ballot for {} on survey {}", voter, survey);
        let raw = instance
            .encrypt_u64(survey, voter, VOTE_WEIGHT)
            .map_err(|e| GatewayError::BackendLoadError(e.to_string()))?;

        let handle = raw
            .handles
            .first()
            .ok_or(GatewayError::HandleSizeMismatch(0))?;
        let ciphertext = CiphertextHandle::from_slice(handle)
            .map_err(|_| GatewayError::HandleSizeMismatch(handle.len()))?;

        Ok(EncryptedBallot {
            survey: *survey,
            voter: *voter,
            ciphertext,
            proof: Proof::new(raw.input_proof),
        })
    }

    /// Request plaintext reveal of a tally handle
    ///
    /// Authorization is the ledger's business. Fetch the handle through
    /// [`Ledger::tally_handle`] to have it enforced.
    pub async fn decrypt_tally(
        &self,
        handle: &CiphertextHandle,
        survey: &Address,
        requester: &Address,
    ) -> Result<u64, GatewayError> {
        let instance = self.init().await?;

        debug!("decrypting {} for {}", handle, requester);
        instance
            .decrypt(survey, handle, requester)
            .map_err(GatewayError::DecryptionFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::{BoxFuture, FutureExt};
    use std::time::Duration;

    fn wallet(profile: &NetworkProfile) -> WalletContext {
        WalletContext {
            account: Address::random(),
            chain_id: profile.chain_id,
        }
    }

    fn local_gateway(delay: Option<Duration>) -> (EncryptionGateway, Arc<LocalLoader>) {
        let coprocessor = Arc::new(LocalCoprocessor::new());
        let mut loader = LocalLoader::new(coprocessor);
        if let Some(delay) = delay {
            loader = loader.with_delay(delay);
        }
        let loader = Arc::new(loader);

        let profile = NetworkProfile::local();
        let gateway = EncryptionGateway::new(profile.clone(), loader.clone());
        gateway.connect(wallet(&profile));
        (gateway, loader)
    }

    struct FailingLoader;

    impl BackendLoader for FailingLoader {
        fn load<'a>(
            &'a self,
            _profile: &'a NetworkProfile,
            _wallet: &'a WalletContext,
        ) -> BoxFuture<'a, Result<Arc<dyn FheInstance>, FheError>> {
            async { Err(FheError::Unavailable("failed to load FHE SDK".to_owned())) }.boxed()
        }
    }

    // Returns handles of a fixed size, as a drifted backend version would
    struct SizedHandles(usize);

    impl FheInstance for SizedHandles {
        fn encrypt_u64(
            &self,
            _survey: &Address,
            _user: &Address,
            _value: u64,
        ) -> Result<RawEncryption, FheError> {
            let handles = if self.0 == 0 {
                vec![]
            } else {
                vec![vec![1; self.0]]
            };
            Ok(RawEncryption {
                handles,
                input_proof: vec![2; 64],
            })
        }

        fn decrypt(
            &self,
            _survey: &Address,
            _handle: &CiphertextHandle,
            _user: &Address,
        ) -> Result<u64, FheError> {
            Ok(0)
        }
    }

    impl BackendLoader for SizedHandles {
        fn load<'a>(
            &'a self,
            _profile: &'a NetworkProfile,
            _wallet: &'a WalletContext,
        ) -> BoxFuture<'a, Result<Arc<dyn FheInstance>, FheError>> {
            let size = self.0;
            async move {
                let instance: Arc<dyn FheInstance> = Arc::new(SizedHandles(size));
                Ok(instance)
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn encrypts_constant_weight() {
        let (gateway, _loader) = local_gateway(None);
        let survey = Address::random();
        let voter = Address::random();

        let ballot = gateway.encrypt_ballot(&survey, &voter).await.unwrap();
        assert_eq!(ballot.survey, survey);
        assert_eq!(ballot.voter, voter);
        assert!(!ballot.proof.is_empty());
        assert_eq!(ballot.ciphertext.to_string().len(), 66);

        let value = gateway
            .decrypt_tally(&ballot.ciphertext, &survey, &voter)
            .await
            .unwrap();
        assert_eq!(value, VOTE_WEIGHT);
    }

    #[tokio::test]
    async fn instance_is_cached_until_reset() {
        let (gateway, loader) = local_gateway(None);
        assert!(!gateway.is_initialized().await);

        let first = gateway.init().await.unwrap();
        let second = gateway.init().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        gateway
            .encrypt_ballot(&Address::random(), &Address::random())
            .await
            .unwrap();
        assert_eq!(loader.load_count(), 1);

        gateway.reset().await;
        assert!(!gateway.is_initialized().await);
        gateway.init().await.unwrap();
        assert_eq!(loader.load_count(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_init_is_single_flight() {
        let (gateway, loader) = local_gateway(Some(Duration::from_millis(50)));
        let gateway = Arc::new(gateway);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let gateway = gateway.clone();
                tokio::spawn(async move { gateway.init().await.map(|_| ()) })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(loader.load_count(), 1);
    }

    #[tokio::test]
    async fn requires_wallet_on_the_right_network() {
        let (gateway, loader) = local_gateway(None);
        gateway.disconnect();

        let err = gateway
            .encrypt_ballot(&Address::random(), &Address::random())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InfrastructureUnavailable(_)));

        gateway.connect(WalletContext {
            account: Address::random(),
            chain_id: NetworkProfile::sepolia().chain_id,
        });
        let err = gateway.init().await.err().unwrap();
        assert!(matches!(err, GatewayError::InfrastructureUnavailable(_)));
        assert_eq!(loader.load_count(), 0);
    }

    #[tokio::test]
    async fn load_failure_is_not_cached() {
        let profile = NetworkProfile::sepolia();
        let gateway = EncryptionGateway::new(profile.clone(), Arc::new(FailingLoader));
        gateway.connect(wallet(&profile));

        let err = gateway.init().await.err().unwrap();
        assert!(matches!(err, GatewayError::BackendLoadError(_)));
        assert!(err.is_retryable());
        assert!(!gateway.is_initialized().await);
    }

    #[tokio::test]
    async fn rejects_handles_of_the_wrong_size() {
        for &(size, reported) in &[(16, 16), (33, 33), (0, 0)] {
            let profile = NetworkProfile::local();
            let gateway = EncryptionGateway::new(profile.clone(), Arc::new(SizedHandles(size)));
            gateway.connect(wallet(&profile));

            let err = gateway
                .encrypt_ballot(&Address::random(), &Address::random())
                .await
                .unwrap_err();
            assert_eq!(err, GatewayError::HandleSizeMismatch(reported));
        }
    }
}
