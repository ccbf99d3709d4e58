use chrono::Utc;
use log::{debug, info};

use std::sync::atomic::{AtomicBool, Ordering};

use super::block::{has_zero_prefix, hash_fields, transactions_value, Block};
use super::transaction::Transaction;

/// Default number of leading zeros required in a block hash
pub const DEFAULT_DIFFICULTY: u8 = 4;

/// Proof of work search over the block nonce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Miner {
    /// Mining difficulty (number of leading zeros required in hash)
    difficulty: u8,
}

impl Default for Miner {
    fn default() -> Self {
        Miner::new(DEFAULT_DIFFICULTY)
    }
}

impl Miner {
    pub fn new(difficulty: u8) -> Self {
        Miner { difficulty }
    }

    pub fn difficulty(&self) -> u8 {
        self.difficulty
    }

    /// The hash prefix a mined block must start with
    pub fn target(&self) -> String {
        "0".repeat(self.difficulty as usize)
    }

    /// Performs proof of work to find a valid hash
    ///
    /// Blocks the calling thread until a nonce is found. The expected number
    /// of attempts grows as 16^difficulty.
    ///
    /// # Arguments
    ///
    /// * `index` - The index of the new block
    /// * `transactions` - The transactions to include in the block
    /// * `previous_hash` - The hash of the previous block
    ///
    /// # Returns
    ///
    /// The newly mined block with a valid proof
    pub fn mine(&self, index: u64, transactions: Vec<Transaction>, previous_hash: String) -> Block {
        let never = AtomicBool::new(false);

        match self.mine_until(index, transactions, previous_hash, &never) {
            Some(block) => block,
            None => unreachable!("mining token is never set"),
        }
    }

    /// Same search as [`Miner::mine`], but gives up once `cancel` is set
    ///
    /// The timestamp is fixed before the first attempt and the token is
    /// checked before every attempt.
    ///
    /// # Returns
    ///
    /// The mined block, or `None` if the search was cancelled
    pub fn mine_until(
        &self,
        index: u64,
        transactions: Vec<Transaction>,
        previous_hash: String,
        cancel: &AtomicBool,
    ) -> Option<Block> {
        let timestamp = Utc::now();
        let encoded_transactions = transactions_value(&transactions);
        let mut nonce: u64 = 0;

        loop {
            if cancel.load(Ordering::Relaxed) {
                debug!("Mining of block {} cancelled after {} attempts", index, nonce);
                return None;
            }

            let hash = hash_fields(index, &timestamp, nonce, &previous_hash, &encoded_transactions);
            if has_zero_prefix(&hash, self.difficulty) {
                info!("Block {} mined after {} attempts: {}", index, nonce + 1, hash);
                return Some(Block::sealed(index, timestamp, transactions, nonce, previous_hash, hash));
            }
            nonce += 1;
        }
    }
}
