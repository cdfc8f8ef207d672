use crate::*;
use rand::Rng;
use sha3::{Digest, Keccak256};
use std::convert::TryInto;
use std::str::FromStr;

/// Account identity on the ledger
///
/// Voters, administrators, viewers and deployed surveys are all identified by a 20-byte address.
/// Addresses are displayed `0x`-prefixed with an EIP-55 mixed-case checksum.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const LEN: usize = 20;

    /// Generate a new random address
    pub fn random() -> Self {
        let mut csprng = rand::rngs::OsRng {};
        Address(csprng.gen())
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let bytes: [u8; 20] = bytes.try_into().map_err(|_| Error::AddressBadLen)?;
        Ok(Address(bytes))
    }

    /// Derive the address of a survey deployed by `creator` as its `nonce`-th deployment
    pub fn derive(creator: &Address, nonce: u64) -> Self {
        let mut hasher = Keccak256::new();
        hasher.update(&creator.0);
        hasher.update(&nonce.to_be_bytes());
        let hash = hasher.finalize();

        // Last 20 bytes of the hash, as for contract creation
        let mut bytes = [0; 20];
        bytes.copy_from_slice(&hash[12..]);
        Address(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// EIP-55 checksummed representation
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = Keccak256::digest(lower.as_bytes());

        let mut checksummed = String::with_capacity(42);
        checksummed.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = if i % 2 == 0 {
                hash[i / 2] >> 4
            } else {
                hash[i / 2] & 0x0f
            };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                checksummed.push(c.to_ascii_uppercase());
            } else {
                checksummed.push(c);
            }
        }
        checksummed
    }

    /// Returns true if `s` is a valid address written in its exact checksummed form
    pub fn is_checksummed(s: &str) -> bool {
        match Address::from_str(s) {
            Ok(address) => address.to_checksum() == s,
            Err(_) => false,
        }
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = from_prefixed_hex(s).map_err(|_| Error::AddressBadHex)?;
        let address = Address::from_slice(&bytes)?;

        // Mixed-case input carries a checksum, which must match
        let digits = s.trim().trim_start_matches("0x");
        let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper && address.to_checksum()[2..] != *digits {
            return Err(Error::AddressBadChecksum(s.to_owned()));
        }

        Ok(address)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.to_checksum())
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }
}

impl_string_serde!(Address);
