use crate::*;
use std::convert::TryInto;
use std::str::FromStr;

/// Size in bytes of a ciphertext handle
pub const HANDLE_LEN: usize = 32;

/// Opaque reference to an encrypted value held by the execution environment
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CiphertextHandle([u8; HANDLE_LEN]);

impl CiphertextHandle {
    pub fn new(bytes: [u8; HANDLE_LEN]) -> Self {
        CiphertextHandle(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let bytes: [u8; HANDLE_LEN] = bytes
            .try_into()
            .map_err(|_| Error::HandleBadLen(bytes.len()))?;
        Ok(CiphertextHandle(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; HANDLE_LEN] {
        &self.0
    }
}

impl FromStr for CiphertextHandle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = from_prefixed_hex(s).map_err(|_| Error::HandleBadHex)?;
        CiphertextHandle::from_slice(&bytes)
    }
}

impl std::fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", to_prefixed_hex(&self.0))
    }
}

impl_string_serde!(CiphertextHandle);

/// Validity proof accompanying a ciphertext, bound to a survey and a voter
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Proof(Vec<u8>);

impl Proof {
    pub fn new(bytes: Vec<u8>) -> Self {
        Proof(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for Proof {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = from_prefixed_hex(s).map_err(|_| Error::ProofBadHex)?;
        Ok(Proof(bytes))
    }
}

impl std::fmt::Display for Proof {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", to_prefixed_hex(&self.0))
    }
}

impl_string_serde!(Proof);

/// An encrypted ballot ready for submission
///
/// The ballot carries the encryption of the constant vote-weight 1. It is scoped to a single
/// survey and voter, and is consumed on submission: it is neither `Clone` nor `Copy`, so a
/// proof can only ever be submitted once. Retrying after a failed submission requires a
/// fresh encryption.
#[derive(Debug, PartialEq, Eq)]
pub struct EncryptedBallot {
    pub survey: Address,
    pub voter: Address,
    pub ciphertext: CiphertextHandle,
    pub proof: Proof,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_parsing() {
        let handle = CiphertextHandle::new([7; HANDLE_LEN]);
        let s = handle.to_string();
        assert_eq!(s.len(), 66);
        assert!(s.starts_with("0x0707"));
        assert_eq!(CiphertextHandle::from_str(&s).unwrap(), handle);

        assert!(matches!(
            CiphertextHandle::from_str("0x0707"),
            Err(Error::HandleBadLen(2))
        ));
        assert!(matches!(
            CiphertextHandle::from_slice(&[0; 33]),
            Err(Error::HandleBadLen(33))
        ));
    }

    #[test]
    fn proof_serde() {
        let proof = Proof::new(vec![2; 64]);
        let json = serde_json::to_string(&proof).unwrap();
        let parsed: Proof = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, proof);
        assert_eq!(parsed.len(), 64);
        assert!(serde_json::from_str::<Proof>("\"0xnope\"").is_err());
    }
}
