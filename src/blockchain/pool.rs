use thiserror::Error;

use super::crypto::Address;
use super::ledger::Ledger;
use super::transaction::Transaction;

/// Errors that can occur when admitting a transaction into the pool
#[derive(Debug, Error, PartialEq)]
pub enum PoolError {
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: f64, available: f64 },

    #[error("Transaction pool is full (capacity: {capacity})")]
    PoolFull { capacity: usize },
}

/// Transactions admitted but not yet committed to a block
#[derive(Debug, Clone)]
pub struct TransactionPool {
    transactions: Vec<Transaction>,
    capacity: usize,
}

impl TransactionPool {
    /// Creates a pool sized for blocks of at most `max_transactions` entries
    ///
    /// One slot per block is kept for the mining reward, so the pool itself
    /// holds `max_transactions - 1` submissions.
    pub fn new(max_transactions: usize) -> Self {
        TransactionPool {
            transactions: Vec::new(),
            capacity: max_transactions.saturating_sub(1),
        }
    }

    /// Admits a transaction after checking it against committed balances
    ///
    /// Non-system senders must cover the amount from their committed
    /// balance minus what they already have pending in the pool.
    /// A rejected transaction leaves the pool untouched.
    pub fn admit(&mut self, transaction: Transaction, ledger: &Ledger) -> Result<(), PoolError> {
        if self.transactions.len() >= self.capacity {
            return Err(PoolError::PoolFull {
                capacity: self.capacity,
            });
        }

        if !transaction.is_system_issued() {
            let available = self.available_balance(&transaction.sender, ledger);
            if available < transaction.amount {
                return Err(PoolError::InsufficientFunds {
                    required: transaction.amount,
                    available,
                });
            }
        }

        self.transactions.push(transaction);
        Ok(())
    }

    /// Committed balance of `address` minus its pending outflow
    pub fn available_balance(&self, address: &Address, ledger: &Ledger) -> f64 {
        ledger.balance_of(address) - self.pending_outflow(address)
    }

    /// Total amount `address` is sending in pending transactions
    pub fn pending_outflow(&self, address: &Address) -> f64 {
        self.transactions
            .iter()
            .filter(|tx| &tx.sender == address)
            .map(|tx| tx.amount)
            .sum()
    }

    /// Gets the pending transactions in insertion order
    pub fn pending(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Drops the first `count` transactions once they are committed in a block
    ///
    /// Transactions admitted after the block was assembled stay pending.
    pub fn remove_mined(&mut self, count: usize) {
        let count = count.min(self.transactions.len());
        self.transactions.drain(..count);
    }
}
