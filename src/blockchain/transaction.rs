use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use super::crypto::Address;

/// Errors that can occur while building a transaction
#[derive(Debug, Error, PartialEq)]
pub enum TransactionError {
    #[error("Invalid amount: {0} (must be a finite, non-negative number)")]
    InvalidAmount(f64),

    #[error("Empty identifier for {0}")]
    EmptyIdentifier(&'static str),
}

/// Represents a transfer between two accounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    /// Unique identifier for the transaction
    pub id: String,

    /// Sender's address
    pub sender: Address,

    /// Recipient's address
    pub recipient: Address,

    /// Amount being transferred
    pub amount: f64,

    /// Timestamp when the transaction was created
    #[schema(value_type = String, example = "2023-01-01T12:00:00Z")]
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    /// Creates a new transaction
    ///
    /// # Arguments
    ///
    /// * `sender` - The address of the sender
    /// * `recipient` - The address of the recipient
    /// * `amount` - The amount to transfer
    ///
    /// # Returns
    ///
    /// A new Transaction, or `InvalidAmount` if the amount is negative or not finite
    pub fn new(sender: Address, recipient: Address, amount: f64) -> Result<Self, TransactionError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(TransactionError::InvalidAmount(amount));
        }

        Ok(Transaction {
            id: Uuid::new_v4().to_string(),
            sender,
            recipient,
            amount,
            timestamp: Utc::now(),
        })
    }

    /// Creates a mining reward transaction issued by the system
    ///
    /// The reward amount comes from validated configuration.
    pub fn new_reward(recipient: Address, amount: f64) -> Self {
        Transaction {
            id: Uuid::new_v4().to_string(),
            sender: Address::system(),
            recipient,
            amount,
            timestamp: Utc::now(),
        }
    }

    /// Checks if the transaction was issued by the system
    pub fn is_system_issued(&self) -> bool {
        self.sender.is_system()
    }
}
