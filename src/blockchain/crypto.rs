use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

use std::fmt;
use std::str::FromStr;

use super::transaction::TransactionError;

/// Identifier reserved for the issuer of mining rewards
pub const SYSTEM_ADDRESS: &str = "SYSTEM";

/// Computes the SHA-256 digest of `data`
///
/// # Returns
///
/// The digest as a 64 character lowercase hexadecimal string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Represents an account identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub struct Address(pub String);

impl Address {
    /// The reserved system identifier used as sender of reward transactions
    pub fn system() -> Self {
        Address(SYSTEM_ADDRESS.to_string())
    }

    /// Parses an account identifier, rejecting blank input
    ///
    /// # Arguments
    ///
    /// * `value` - The raw identifier
    /// * `field` - Name of the field being parsed, used in the error
    pub fn parse(value: &str, field: &'static str) -> Result<Self, TransactionError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(TransactionError::EmptyIdentifier(field));
        }

        Ok(Address(trimmed.to_string()))
    }

    /// Checks if this is the system identifier
    pub fn is_system(&self) -> bool {
        self.0 == SYSTEM_ADDRESS
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Address {
    type Err = TransactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s, "address")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_sha256_hex_format() {
        let digest = sha256_hex(b"");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(digest, sha256_hex(b""));
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(Address::parse("  alice ", "sender").unwrap(), Address("alice".to_string()));
        assert!(matches!(
            Address::parse("   ", "recipient"),
            Err(TransactionError::EmptyIdentifier("recipient"))
        ));
        assert!("".parse::<Address>().is_err());
    }

    #[test]
    fn test_system_address() {
        assert!(Address::system().is_system());
        assert!(!Address("alice".to_string()).is_system());
        assert_eq!(Address::system().to_string(), "SYSTEM");
    }
}
