// Blockchain module
//
// This module contains the core ledger implementation including:
// - Block structure and hashing
// - Proof of work miner
// - Transaction pool and admission rule
// - Balance ledger
// - Chain and the service tying them together

pub mod block;
pub mod chain;
pub mod crypto;
pub mod ledger;
pub mod miner;
pub mod pool;
pub mod transaction;

// Re-export main components for easier access
pub use block::{Block, BlockSummary};
pub use chain::{Blockchain, BlockchainError};
pub use crypto::Address;
pub use ledger::{Account, Ledger};
pub use miner::Miner;
pub use pool::{PoolError, TransactionPool};
pub use transaction::{Transaction, TransactionError};
