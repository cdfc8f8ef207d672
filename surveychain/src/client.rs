use crate::*;
use std::sync::{Arc, RwLock};

/// A voter's session against a shared ledger
///
/// Casting runs in two phases. The ballot is first encrypted locally, which may suspend on
/// toolkit loading and can be abandoned without leaving any ledger state. It is then submitted
/// in one atomic ledger call. A failed submission consumes the ballot, so a retry always
/// re-encrypts.
pub struct SurveyClient {
    identity: Address,
    gateway: Arc<EncryptionGateway>,
}

impl SurveyClient {
    pub fn new(identity: Address, gateway: Arc<EncryptionGateway>) -> Self {
        SurveyClient { identity, gateway }
    }

    pub fn identity(&self) -> &Address {
        &self.identity
    }

    /// Phase 1: encrypt a ballot for `survey`
    pub async fn prepare_ballot(&self, survey: &Address) -> Result<EncryptedBallot, GatewayError> {
        self.gateway.encrypt_ballot(survey, &self.identity).await
    }

    /// Phase 2: submit a prepared ballot
    pub fn submit<B: FheBackend, S: Store>(
        &self,
        ledger: &mut Ledger<B, S>,
        timestamp: u64,
        option_id: usize,
        ballot: EncryptedBallot,
    ) -> Result<(), LedgerError> {
        let ctx = CallContext::new(self.identity, timestamp);
        ledger.vote(
            &ctx,
            &ballot.survey,
            option_id,
            &ballot.ciphertext,
            &ballot.proof,
        )
    }

    /// Encrypt and submit a ballot for `option_id`
    ///
    /// The ledger is only locked for the metadata read and for the final submission, never
    /// while encrypting.
    pub async fn cast_ballot<B: FheBackend, S: Store>(
        &self,
        ledger: &RwLock<Ledger<B, S>>,
        survey: &Address,
        option_id: usize,
        timestamp: u64,
    ) -> Result<(), ClientError> {
        {
            let ledger = ledger.read().map_err(|_| ClientError::LedgerPoisoned)?;
            if option_id >= ledger.get_options(survey)?.len() {
                return Err(LedgerError::InvalidOption.into());
            }
            if ledger.has_voted(survey, &self.identity)? {
                return Err(LedgerError::AlreadyVoted.into());
            }
        }

        let ballot = self.prepare_ballot(survey).await?;

        let mut ledger = ledger.write().map_err(|_| ClientError::LedgerPoisoned)?;
        self.submit(&mut *ledger, timestamp, option_id, ballot)?;
        Ok(())
    }

    /// Read and decrypt a tally through the gateway. The ledger enforces who may see it.
    pub async fn read_tally<B: FheBackend, S: Store>(
        &self,
        ledger: &RwLock<Ledger<B, S>>,
        survey: &Address,
        option_id: usize,
    ) -> Result<u64, ClientError> {
        let handle = {
            let ledger = ledger.read().map_err(|_| ClientError::LedgerPoisoned)?;
            ledger.tally_handle(&self.identity, survey, option_id)?
        };

        Ok(self
            .gateway
            .decrypt_tally(&handle, survey, &self.identity)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: u64 = 1_700_000_000;
    const DAY: u64 = 24 * 60 * 60;

    fn setup() -> (
        RwLock<Ledger<Arc<LocalCoprocessor>>>,
        Arc<EncryptionGateway>,
        Address,
        Address,
    ) {
        let coprocessor = Arc::new(LocalCoprocessor::new());
        let mut ledger = Ledger::new(coprocessor.clone());
        let admin = Address::random();
        let survey = ledger
            .create(
                &CallContext::new(admin, START),
                "Developer Experience Survey",
                vec!["Excellent".into(), "Good".into(), "Poor".into()],
                10 * DAY,
            )
            .unwrap();

        let profile = NetworkProfile::local();
        let gateway = EncryptionGateway::new(
            profile.clone(),
            Arc::new(LocalLoader::new(coprocessor)),
        );
        gateway.connect(WalletContext {
            account: Address::random(),
            chain_id: profile.chain_id,
        });

        (RwLock::new(ledger), Arc::new(gateway), admin, survey)
    }

    #[tokio::test]
    async fn cast_and_read_back() {
        let (ledger, gateway, admin, survey) = setup();

        for option_id in &[0, 1, 1] {
            let voter = SurveyClient::new(Address::random(), gateway.clone());
            voter
                .cast_ballot(&ledger, &survey, *option_id, START + 1)
                .await
                .unwrap();
        }

        let admin_client = SurveyClient::new(admin, gateway.clone());
        let locked = admin_client.read_tally(&ledger, &survey, 1).await;
        assert!(matches!(
            locked,
            Err(ClientError::Ledger(LedgerError::ResultsLocked))
        ));

        ledger
            .write()
            .unwrap()
            .finalize(&CallContext::new(admin, START + 11 * DAY), &survey)
            .unwrap();

        assert_eq!(admin_client.read_tally(&ledger, &survey, 0).await.unwrap(), 1);
        assert_eq!(admin_client.read_tally(&ledger, &survey, 1).await.unwrap(), 2);
        assert_eq!(admin_client.read_tally(&ledger, &survey, 2).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_submission_requires_fresh_ballot() {
        let (ledger, gateway, _admin, survey) = setup();
        let client = SurveyClient::new(Address::random(), gateway);

        // Submitted too late: rejected, and the ballot is gone
        let ballot = client.prepare_ballot(&survey).await.unwrap();
        let err = client
            .submit(&mut *ledger.write().unwrap(), START + 11 * DAY, 0, ballot)
            .unwrap_err();
        assert_eq!(err, LedgerError::VotingClosed);
        assert!(!ledger.read().unwrap().has_voted(&survey, client.identity()).unwrap());

        let ballot = client.prepare_ballot(&survey).await.unwrap();
        client
            .submit(&mut *ledger.write().unwrap(), START + 1, 0, ballot)
            .unwrap();

        let err = client
            .cast_ballot(&ledger, &survey, 1, START + 2)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Ledger(LedgerError::AlreadyVoted)));
        assert_eq!(err.class(), ErrorClass::DuplicateVote);
    }

    #[tokio::test]
    async fn abandoned_encryption_leaves_no_trace() {
        let (ledger, gateway, _admin, survey) = setup();
        let client = SurveyClient::new(Address::random(), gateway);

        let ballot = client.prepare_ballot(&survey).await.unwrap();
        drop(ballot);

        let ledger = ledger.read().unwrap();
        assert!(!ledger.has_voted(&survey, client.identity()).unwrap());
        assert!(ledger.events().is_empty());
    }
}
