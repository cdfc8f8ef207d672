//! Seams to the homomorphic execution environment.
//!
//! The ledger only ever sees ciphertext handles. Everything that touches the scheme itself
//! (encrypting inputs, verifying input proofs, merging ciphertexts, revealing plaintexts)
//! goes through the traits in this module, so a genuine FHE coprocessor and the in-process
//! [`LocalCoprocessor`](crate::LocalCoprocessor) are interchangeable.

use crate::*;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Ledger-side homomorphic accumulation
pub trait HomomorphicTally {
    /// A fresh encryption of zero, used to seed a tally accumulator
    fn zero(&self) -> Result<CiphertextHandle, FheError>;

    /// Check that `proof` shows `handle` was correctly formed for this survey and voter
    fn verify_input(
        &self,
        handle: &CiphertextHandle,
        proof: &Proof,
        survey: &Address,
        voter: &Address,
    ) -> bool;

    /// Homomorphic addition. Commutative and associative over the underlying plaintexts.
    fn merge(
        &self,
        a: &CiphertextHandle,
        b: &CiphertextHandle,
    ) -> Result<CiphertextHandle, FheError>;

    /// Release a ciphertext that nothing refers to any more
    fn discard(&self, _handle: &CiphertextHandle) {}
}

/// Turns an accumulated ciphertext into a plaintext count
///
/// Reveal requires an [`Authorization`], which only the ledger can issue.
pub trait DecryptionAuthority {
    fn reveal(&self, handle: &CiphertextHandle, auth: &Authorization) -> Result<u64, FheError>;
}

/// Everything the ledger needs from its execution environment
pub trait FheBackend: HomomorphicTally + DecryptionAuthority {}

impl<T: HomomorphicTally + DecryptionAuthority> FheBackend for T {}

impl<T: HomomorphicTally + ?Sized> HomomorphicTally for Arc<T> {
    fn zero(&self) -> Result<CiphertextHandle, FheError> {
        (**self).zero()
    }

    fn verify_input(
        &self,
        handle: &CiphertextHandle,
        proof: &Proof,
        survey: &Address,
        voter: &Address,
    ) -> bool {
        (**self).verify_input(handle, proof, survey, voter)
    }

    fn merge(
        &self,
        a: &CiphertextHandle,
        b: &CiphertextHandle,
    ) -> Result<CiphertextHandle, FheError> {
        (**self).merge(a, b)
    }

    fn discard(&self, handle: &CiphertextHandle) {
        (**self).discard(handle)
    }
}

impl<T: DecryptionAuthority + ?Sized> DecryptionAuthority for Arc<T> {
    fn reveal(&self, handle: &CiphertextHandle, auth: &Authorization) -> Result<u64, FheError> {
        (**self).reveal(handle, auth)
    }
}

/// Why a reveal was permitted
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RevealGrounds {
    Finalized,
    ViewerGrant,
}

/// Proof that the ledger authorized `requester` to reveal tallies of `survey`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Authorization {
    survey: Address,
    requester: Address,
    grounds: RevealGrounds,
}

impl Authorization {
    pub(crate) fn new(survey: Address, requester: Address, grounds: RevealGrounds) -> Self {
        Authorization {
            survey,
            requester,
            grounds,
        }
    }

    pub fn survey(&self) -> &Address {
        &self.survey
    }

    pub fn requester(&self) -> &Address {
        &self.requester
    }

    pub fn grounds(&self) -> RevealGrounds {
        self.grounds
    }
}

/// Network profile the encryption toolkit is bound to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkProfile {
    pub name: String,
    pub chain_id: u64,
    pub toolkit_url: String,
}

impl NetworkProfile {
    pub fn sepolia() -> Self {
        NetworkProfile {
            name: "sepolia".to_owned(),
            chain_id: 11_155_111,
            toolkit_url: "https://cdn.zama.ai/relayer-sdk-js/0.2.0/relayer-sdk-js.umd.cjs"
                .to_owned(),
        }
    }

    /// Profile for a chain simulated in-process
    pub fn local() -> Self {
        NetworkProfile {
            name: "local".to_owned(),
            chain_id: 31_337,
            toolkit_url: "memory://local-coprocessor".to_owned(),
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "sepolia" => Some(NetworkProfile::sepolia()),
            "local" => Some(NetworkProfile::local()),
            _ => None,
        }
    }
}

/// Active wallet/network context of the client
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalletContext {
    pub account: Address,
    pub chain_id: u64,
}

/// Raw output of an input encryption, before size checks
#[derive(Clone, Debug, Default)]
pub struct RawEncryption {
    pub handles: Vec<Vec<u8>>,
    pub input_proof: Vec<u8>,
}

/// Client-side handle on a loaded encryption toolkit
pub trait FheInstance: Send + Sync {
    /// Encrypt `value` as an input scoped to `(survey, user)`
    fn encrypt_u64(
        &self,
        survey: &Address,
        user: &Address,
        value: u64,
    ) -> Result<RawEncryption, FheError>;

    /// Request plaintext reveal of `handle` on behalf of `user`
    fn decrypt(
        &self,
        survey: &Address,
        handle: &CiphertextHandle,
        user: &Address,
    ) -> Result<u64, FheError>;
}

/// Fetches and initializes the encryption toolkit
pub trait BackendLoader: Send + Sync {
    fn load<'a>(
        &'a self,
        profile: &'a NetworkProfile,
        wallet: &'a WalletContext,
    ) -> BoxFuture<'a, Result<Arc<dyn FheInstance>, FheError>>;
}
