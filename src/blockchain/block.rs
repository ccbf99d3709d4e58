use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::crypto::sha256_hex;
use super::transaction::Transaction;

/// Previous hash recorded by the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Represents a sealed block in the chain
///
/// Fields are only readable: a block is fixed once its nonce has been found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Block {
    /// Index of the block in the chain
    index: u64,

    /// Timestamp fixed when mining started
    #[schema(value_type = String, example = "2023-01-01T12:00:00Z")]
    timestamp: DateTime<Utc>,

    /// List of transactions included in this block
    transactions: Vec<Transaction>,

    /// Proof of work (nonce)
    nonce: u64,

    /// Hash of the previous block
    previous_hash: String,

    /// Hash of the current block
    hash: String,
}

/// Condensed view of a block for listing the chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BlockSummary {
    pub index: u64,
    pub hash: String,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Assembles a block whose hash was already computed by the miner
    pub(super) fn sealed(
        index: u64,
        timestamp: DateTime<Utc>,
        transactions: Vec<Transaction>,
        nonce: u64,
        previous_hash: String,
        hash: String,
    ) -> Self {
        Block {
            index,
            timestamp,
            transactions,
            nonce,
            previous_hash,
            hash,
        }
    }

    /// Recalculates the hash from the block's contents
    ///
    /// # Returns
    ///
    /// The SHA-256 hash of the block as a hexadecimal string
    pub fn calculate_hash(&self) -> String {
        hash_fields(
            self.index,
            &self.timestamp,
            self.nonce,
            &self.previous_hash,
            &transactions_value(&self.transactions),
        )
    }

    /// Checks that the stored hash matches the contents and has `difficulty` leading zeros
    pub fn meets_difficulty(&self, difficulty: u8) -> bool {
        self.hash == self.calculate_hash() && has_zero_prefix(&self.hash, difficulty)
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Returns the index, hash and transactions of the block
    pub fn summary(&self) -> BlockSummary {
        BlockSummary {
            index: self.index,
            hash: self.hash.clone(),
            transactions: self.transactions.clone(),
        }
    }
}

/// Checks if a hex digest starts with `difficulty` `'0'` characters
pub fn has_zero_prefix(hash: &str, difficulty: u8) -> bool {
    let difficulty = difficulty as usize;
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}

/// Converts the transactions into the JSON value embedded in the hashed document
pub(super) fn transactions_value(transactions: &[Transaction]) -> Value {
    serde_json::json!(transactions)
}

/// Hashes the canonical JSON document of a block's fields
pub(super) fn hash_fields(
    index: u64,
    timestamp: &DateTime<Utc>,
    nonce: u64,
    previous_hash: &str,
    transactions: &Value,
) -> String {
    let block_data = serde_json::json!({
        "index": index,
        "timestamp": timestamp,
        "nonce": nonce,
        "previous_hash": previous_hash,
        "transactions": transactions,
    });

    sha256_hex(block_data.to_string().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::Address;

    /// Builds a block without searching for a valid nonce
    fn unmined(index: u64, transactions: Vec<Transaction>, nonce: u64, previous_hash: &str) -> Block {
        let timestamp = Utc::now();
        let hash = hash_fields(index, &timestamp, nonce, previous_hash, &transactions_value(&transactions));
        Block::sealed(index, timestamp, transactions, nonce, previous_hash.to_string(), hash)
    }

    fn sample_transactions() -> Vec<Transaction> {
        vec![
            Transaction::new_reward(Address("recipient1".to_string()), 10.0),
            Transaction::new_reward(Address("recipient2".to_string()), 20.0),
        ]
    }

    #[test]
    fn test_block_fields() {
        let block = unmined(1, sample_transactions(), 100, "previous_hash");

        assert_eq!(block.index(), 1);
        assert_eq!(block.nonce(), 100);
        assert_eq!(block.previous_hash(), "previous_hash");
        assert_eq!(block.transactions().len(), 2);
        assert_eq!(block.hash().len(), 64); // SHA-256 hash is 64 characters in hex
        assert_eq!(block.hash(), block.calculate_hash());
    }

    #[test]
    fn test_hash_depends_on_nonce() {
        let a = unmined(1, sample_transactions(), 1, "prev");
        let b = Block::sealed(
            1,
            a.timestamp(),
            a.transactions().to_vec(),
            2,
            "prev".to_string(),
            String::new(),
        );

        assert_ne!(a.hash(), b.calculate_hash());
    }

    #[test]
    fn test_tampered_hash_fails_difficulty() {
        let block = unmined(1, Vec::new(), 0, "prev");
        let forged = Block::sealed(
            block.index(),
            block.timestamp(),
            Vec::new(),
            block.nonce(),
            block.previous_hash().to_string(),
            "0".repeat(64),
        );

        assert!(!forged.meets_difficulty(4));
    }

    #[test]
    fn test_has_zero_prefix() {
        assert!(has_zero_prefix("0000ab", 4));
        assert!(!has_zero_prefix("000ab0", 4));
        assert!(has_zero_prefix("abc", 0));
        assert!(!has_zero_prefix("00", 3));
    }

    #[test]
    fn test_hash_survives_json_round_trip() {
        let block = unmined(3, sample_transactions(), 7, "prev");
        let json = serde_json::to_string(&block).unwrap();
        let decoded: Block = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded, block);
        assert_eq!(decoded.calculate_hash(), block.hash());
    }

    #[test]
    fn test_summary() {
        let block = unmined(2, sample_transactions(), 0, "prev");
        let summary = block.summary();

        assert_eq!(summary.index, 2);
        assert_eq!(summary.hash, block.hash());
        assert_eq!(summary.transactions, block.transactions());
    }
}
