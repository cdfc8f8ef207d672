use crate::*;

use thiserror::Error;

/// Error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("surveychain: invalid address - invalid hexidecimal")]
    AddressBadHex,

    #[error("surveychain: invalid address - wrong length")]
    AddressBadLen,

    #[error("surveychain: invalid address - checksum mismatch for {0}")]
    AddressBadChecksum(String),

    #[error("surveychain: invalid ciphertext handle - invalid hexidecimal")]
    HandleBadHex,

    #[error("surveychain: invalid ciphertext handle - expected {} bytes, found {0}", HANDLE_LEN)]
    HandleBadLen(usize),

    #[error("surveychain: invalid proof - invalid hexidecimal")]
    ProofBadHex,

    #[error("surveychain: invalid coprocessor key - invalid hexidecimal")]
    KeyBadHex,

    #[error("surveychain: invalid coprocessor key: {0}")]
    CoprocessorKey(#[from] ed25519_dalek::SignatureError),

    #[error("surveychain: invalid survey directory: {0}")]
    InvalidDirectory(String),

    #[error("surveychain: JSON error: {0}")]
    JSON(#[from] serde_json::Error),

    #[error("surveychain: IO error: {0}")]
    IO(#[from] std::io::Error),
}

/// Errors raised by the homomorphic execution environment
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FheError {
    #[error("fhe: unknown ciphertext handle {0}")]
    UnknownHandle(CiphertextHandle),

    #[error("fhe: plaintext overflow while merging ciphertexts")]
    Overflow,

    #[error("fhe: encryption toolkit unavailable: {0}")]
    Unavailable(String),

    #[error("fhe: encryption failed: {0}")]
    EncryptionFailed(String),
}

/// Ledger call errors
///
/// The first seven variants are the error kinds surfaced by the ledger contract surface.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("surveychain ledger: survey already finalized")]
    AlreadyFinalized,

    #[error("surveychain ledger: voter has already voted")]
    AlreadyVoted,

    #[error("surveychain ledger: invalid option")]
    InvalidOption,

    #[error("surveychain ledger: caller is not authorized")]
    NotAuthorized,

    #[error("surveychain ledger: results are locked until the survey is finalized")]
    ResultsLocked,

    #[error("surveychain ledger: voting is closed")]
    VotingClosed,

    #[error("surveychain ledger: voting has not started")]
    VotingNotStarted,

    #[error(
        "surveychain ledger: duration of {0} seconds is outside [{}, {}]",
        MIN_DURATION,
        MAX_DURATION
    )]
    InvalidDuration(u64),

    #[error("surveychain ledger: input proof does not verify for this survey and voter")]
    InvalidProof,

    #[error("surveychain ledger: no survey deployed at {0}")]
    UnknownSurvey(Address),

    #[error("surveychain ledger: execution environment error: {0}")]
    Backend(#[from] FheError),
}

impl LedgerError {
    /// The error-taxonomy class of this error
    pub fn class(&self) -> ErrorClass {
        match self {
            LedgerError::InvalidDuration(_) => ErrorClass::Validation,
            LedgerError::VotingNotStarted
            | LedgerError::VotingClosed
            | LedgerError::AlreadyFinalized => ErrorClass::Phase,
            LedgerError::NotAuthorized | LedgerError::ResultsLocked => ErrorClass::Authorization,
            LedgerError::AlreadyVoted => ErrorClass::DuplicateVote,
            LedgerError::InvalidOption | LedgerError::InvalidProof => ErrorClass::Integrity,
            LedgerError::UnknownSurvey(_) => ErrorClass::Validation,
            LedgerError::Backend(_) => ErrorClass::Infrastructure,
        }
    }
}

/// Errors raised by the client-side encryption pipeline
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("surveychain gateway: infrastructure unavailable: {0}")]
    InfrastructureUnavailable(String),

    #[error("surveychain gateway: failed to load encryption backend: {0}")]
    BackendLoadError(String),

    #[error("surveychain gateway: ciphertext handle must be {} bytes, received {0}", HANDLE_LEN)]
    HandleSizeMismatch(usize),

    #[error("surveychain gateway: decryption failed: {0}")]
    DecryptionFailed(FheError),
}

impl GatewayError {
    pub fn class(&self) -> ErrorClass {
        ErrorClass::Infrastructure
    }

    /// Gateway errors may be retried by the caller, after re-encrypting the ballot.
    pub fn is_retryable(&self) -> bool {
        self.class().is_retryable()
    }
}

/// Errors raised while running the two-phase ballot protocol
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0}")]
    Gateway(#[from] GatewayError),

    #[error("{0}")]
    Ledger(#[from] LedgerError),

    #[error("surveychain client: ledger lock poisoned")]
    LedgerPoisoned,
}

impl ClientError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ClientError::Gateway(e) => e.class(),
            ClientError::Ledger(e) => e.class(),
            ClientError::LedgerPoisoned => ErrorClass::Infrastructure,
        }
    }
}

/// Error taxonomy shared by the ledger and the client pipeline
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    Validation,
    Phase,
    Authorization,
    DuplicateVote,
    Integrity,
    Infrastructure,
}

impl ErrorClass {
    /// Only client-local infrastructure failures are worth retrying. Nothing is retried automatically.
    pub fn is_retryable(self) -> bool {
        self == ErrorClass::Infrastructure
    }
}
