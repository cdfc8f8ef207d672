//! Deterministic in-process execution environment.
//!
//! `LocalCoprocessor` stands in for a genuine FHE coprocessor. Ciphertext handles are random
//! 32-byte values registered against their hidden plaintext, merging registers a new handle
//! holding the sum, and input proofs are ed25519 signatures by the coprocessor's verifier key
//! over the (handle, survey, voter) binding. Both the ledger and the client-side gateway talk
//! to the same instance, as they would to a shared coprocessor on a real network.

use crate::*;
use ed25519_dalek::{Keypair, Signature, Signer};
use futures::future::{BoxFuture, FutureExt};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::convert::TryFrom;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub struct LocalCoprocessor {
    verifier: Keypair,
    ciphertexts: Mutex<BTreeMap<CiphertextHandle, u64>>,
    reveals: AtomicUsize,
}

/// Serializable state of a [`LocalCoprocessor`]
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CoprocessorSnapshot {
    /// Hex-encoded ed25519 keypair used to sign and verify input proofs
    pub verifier_key: String,
    pub ciphertexts: BTreeMap<CiphertextHandle, u64>,
}

// The message an input proof signs
#[derive(Serialize)]
struct InputBinding<'a> {
    handle: &'a CiphertextHandle,
    survey: &'a Address,
    voter: &'a Address,
}

impl LocalCoprocessor {
    pub fn new() -> Self {
        let mut csprng = rand::rngs::OsRng {};
        LocalCoprocessor {
            verifier: Keypair::generate(&mut csprng),
            ciphertexts: Mutex::new(BTreeMap::new()),
            reveals: AtomicUsize::new(0),
        }
    }

    pub fn from_snapshot(snapshot: CoprocessorSnapshot) -> Result<Self, Error> {
        let key = from_prefixed_hex(&snapshot.verifier_key).map_err(|_| Error::KeyBadHex)?;
        Ok(LocalCoprocessor {
            verifier: Keypair::from_bytes(&key)?,
            ciphertexts: Mutex::new(snapshot.ciphertexts),
            reveals: AtomicUsize::new(0),
        })
    }

    pub fn snapshot(&self) -> CoprocessorSnapshot {
        CoprocessorSnapshot {
            verifier_key: to_prefixed_hex(&self.verifier.to_bytes()),
            ciphertexts: self.ciphertexts().clone(),
        }
    }

    /// Number of reveals served so far
    pub fn reveal_count(&self) -> usize {
        self.reveals.load(Ordering::SeqCst)
    }

    /// Number of ciphertexts currently registered
    pub fn ciphertext_count(&self) -> usize {
        self.ciphertexts().len()
    }

    fn ciphertexts(&self) -> MutexGuard<'_, BTreeMap<CiphertextHandle, u64>> {
        self.ciphertexts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, value: u64) -> CiphertextHandle {
        let mut csprng = rand::rngs::OsRng {};
        let handle = CiphertextHandle::new(csprng.gen());
        self.ciphertexts().insert(handle, value);
        handle
    }

    fn lookup(&self, handle: &CiphertextHandle) -> Result<u64, FheError> {
        self.ciphertexts()
            .get(handle)
            .copied()
            .ok_or(FheError::UnknownHandle(*handle))
    }

    fn binding_message(
        handle: &CiphertextHandle,
        survey: &Address,
        voter: &Address,
    ) -> Result<Vec<u8>, serde_cbor::Error> {
        serde_cbor::to_vec(&InputBinding {
            handle,
            survey,
            voter,
        })
    }
}

impl Default for LocalCoprocessor {
    fn default() -> Self {
        LocalCoprocessor::new()
    }
}

impl HomomorphicTally for LocalCoprocessor {
    fn zero(&self) -> Result<CiphertextHandle, FheError> {
        Ok(self.register(0))
    }

    fn verify_input(
        &self,
        handle: &CiphertextHandle,
        proof: &Proof,
        survey: &Address,
        voter: &Address,
    ) -> bool {
        if self.lookup(handle).is_err() {
            return false;
        }
        let signature = match Signature::try_from(proof.as_bytes()) {
            Ok(signature) => signature,
            Err(_) => return false,
        };
        let message = match Self::binding_message(handle, survey, voter) {
            Ok(message) => message,
            Err(_) => return false,
        };

        self.verifier
            .public
            .verify_strict(&message, &signature)
            .is_ok()
    }

    fn merge(
        &self,
        a: &CiphertextHandle,
        b: &CiphertextHandle,
    ) -> Result<CiphertextHandle, FheError> {
        let sum = self
            .lookup(a)?
            .checked_add(self.lookup(b)?)
            .ok_or(FheError::Overflow)?;

        // Handle of a merge depends only on the unordered pair of inputs
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let mut hasher = Sha256::new();
        hasher.update(b"merge");
        hasher.update(lo.as_bytes());
        hasher.update(hi.as_bytes());
        let mut bytes = [0; HANDLE_LEN];
        bytes.copy_from_slice(&hasher.finalize());

        let merged = CiphertextHandle::new(bytes);
        self.ciphertexts().insert(merged, sum);
        Ok(merged)
    }

    fn discard(&self, handle: &CiphertextHandle) {
        self.ciphertexts().remove(handle);
    }
}

impl DecryptionAuthority for LocalCoprocessor {
    fn reveal(&self, handle: &CiphertextHandle, auth: &Authorization) -> Result<u64, FheError> {
        self.reveals.fetch_add(1, Ordering::SeqCst);
        debug!(
            "revealing {} of survey {} for {} ({:?})",
            handle,
            auth.survey(),
            auth.requester(),
            auth.grounds()
        );
        self.lookup(handle)
    }
}

impl FheInstance for LocalCoprocessor {
    fn encrypt_u64(
        &self,
        survey: &Address,
        user: &Address,
        value: u64,
    ) -> Result<RawEncryption, FheError> {
        let handle = self.register(value);
        let message = Self::binding_message(&handle, survey, user)
            .map_err(|e| FheError::EncryptionFailed(e.to_string()))?;
        let signature = self.verifier.sign(&message);

        Ok(RawEncryption {
            handles: vec![handle.as_bytes().to_vec()],
            input_proof: signature.to_bytes().to_vec(),
        })
    }

    fn decrypt(
        &self,
        _survey: &Address,
        handle: &CiphertextHandle,
        _user: &Address,
    ) -> Result<u64, FheError> {
        self.lookup(handle)
    }
}

/// Loads a shared [`LocalCoprocessor`] as the client's encryption toolkit
pub struct LocalLoader {
    coprocessor: Arc<LocalCoprocessor>,
    delay: Option<Duration>,
    loads: AtomicUsize,
}

impl LocalLoader {
    pub fn new(coprocessor: Arc<LocalCoprocessor>) -> Self {
        LocalLoader {
            coprocessor,
            delay: None,
            loads: AtomicUsize::new(0),
        }
    }

    /// Simulate network latency when fetching the toolkit
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of times the toolkit has been fetched
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl BackendLoader for LocalLoader {
    fn load<'a>(
        &'a self,
        profile: &'a NetworkProfile,
        wallet: &'a WalletContext,
    ) -> BoxFuture<'a, Result<Arc<dyn FheInstance>, FheError>> {
        async move {
            self.loads.fetch_add(1, Ordering::SeqCst);
            debug!(
                "fetching encryption toolkit from {} for {}",
                profile.toolkit_url, wallet.account
            );
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let instance: Arc<dyn FheInstance> = self.coprocessor.clone();
            Ok(instance)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encrypt_one(
        coprocessor: &LocalCoprocessor,
        survey: &Address,
        voter: &Address,
    ) -> (CiphertextHandle, Proof) {
        let raw = coprocessor.encrypt_u64(survey, voter, 1).unwrap();
        let handle = CiphertextHandle::from_slice(&raw.handles[0]).unwrap();
        (handle, Proof::new(raw.input_proof))
    }

    #[test]
    fn proofs_are_bound_to_survey_and_voter() {
        let coprocessor = LocalCoprocessor::new();
        let survey = Address::random();
        let voter = Address::random();
        let (handle, proof) = encrypt_one(&coprocessor, &survey, &voter);

        assert!(coprocessor.verify_input(&handle, &proof, &survey, &voter));

        // Replay against another survey or voter
        assert!(!coprocessor.verify_input(&handle, &proof, &Address::random(), &voter));
        assert!(!coprocessor.verify_input(&handle, &proof, &survey, &Address::random()));

        // Proof for a different ciphertext
        let (other_handle, other_proof) = encrypt_one(&coprocessor, &survey, &voter);
        assert!(!coprocessor.verify_input(&handle, &other_proof, &survey, &voter));
        assert!(coprocessor.verify_input(&other_handle, &other_proof, &survey, &voter));

        // Garbage proof and unknown handle
        assert!(!coprocessor.verify_input(&handle, &Proof::new(vec![2; 64]), &survey, &voter));
        assert!(!coprocessor.verify_input(&handle, &Proof::default(), &survey, &voter));
        let unknown = CiphertextHandle::new([9; HANDLE_LEN]);
        assert!(!coprocessor.verify_input(&unknown, &proof, &survey, &voter));
    }

    #[test]
    fn merge_is_commutative() {
        let coprocessor = LocalCoprocessor::new();
        let survey = Address::random();
        let (a, _) = encrypt_one(&coprocessor, &survey, &Address::random());
        let (b, _) = encrypt_one(&coprocessor, &survey, &Address::random());

        let ab = coprocessor.merge(&a, &b).unwrap();
        let ba = coprocessor.merge(&b, &a).unwrap();
        assert_eq!(ab, ba);
        assert_eq!(coprocessor.decrypt(&survey, &ab, &survey).unwrap(), 2);

        let zero = coprocessor.zero().unwrap();
        let total = coprocessor.merge(&zero, &ab).unwrap();
        assert_eq!(coprocessor.decrypt(&survey, &total, &survey).unwrap(), 2);

        let unknown = CiphertextHandle::new([9; HANDLE_LEN]);
        assert_eq!(
            coprocessor.merge(&a, &unknown),
            Err(FheError::UnknownHandle(unknown))
        );
    }

    #[test]
    fn snapshot_restores_keys_and_ciphertexts() {
        let coprocessor = LocalCoprocessor::new();
        let survey = Address::random();
        let voter = Address::random();
        let (handle, proof) = encrypt_one(&coprocessor, &survey, &voter);

        let json = serde_json::to_string(&coprocessor.snapshot()).unwrap();
        let restored =
            LocalCoprocessor::from_snapshot(serde_json::from_str(&json).unwrap()).unwrap();

        assert_eq!(restored.ciphertext_count(), 1);
        assert!(restored.verify_input(&handle, &proof, &survey, &voter));
    }
}
