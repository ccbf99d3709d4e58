use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use std::collections::HashMap;

use super::block::Block;
use super::crypto::Address;

/// Balance of a single account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Account {
    /// The account's address
    pub address: Address,

    /// The account's balance
    pub balance: f64,
}

/// Balances derived from the committed chain
///
/// Reading an address never creates an entry; entries appear only when a
/// committed block moves funds in or out of an account.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    balances: HashMap<Address, f64>,
}

impl Ledger {
    pub fn new() -> Self {
        Ledger::default()
    }

    /// Rebuilds the ledger by applying every block in order
    ///
    /// Genesis carries no transactions, so it contributes nothing.
    pub fn replay<'a, I>(blocks: I) -> Self
    where
        I: IntoIterator<Item = &'a Block>,
    {
        let mut ledger = Ledger::new();
        for block in blocks {
            ledger.apply_block(block);
        }
        ledger
    }

    /// Gets the balance of an account, 0 if it was never referenced
    pub fn balance_of(&self, address: &Address) -> f64 {
        self.balances.get(address).copied().unwrap_or(0.0)
    }

    /// Checks if the account has been touched by a committed transaction
    pub fn contains(&self, address: &Address) -> bool {
        self.balances.contains_key(address)
    }

    /// Applies the transfers of a committed block
    ///
    /// Debits each sender and credits each recipient in transaction order.
    /// The net changes are computed before anything is written, so the block
    /// lands as a whole.
    pub fn apply_block(&mut self, block: &Block) {
        let mut deltas: Vec<(&Address, f64)> = Vec::with_capacity(block.transactions().len() * 2);
        for transaction in block.transactions() {
            deltas.push((&transaction.sender, -transaction.amount));
            deltas.push((&transaction.recipient, transaction.amount));
        }

        for (address, delta) in deltas {
            *self.balances.entry(address.clone()).or_insert(0.0) += delta;
        }
    }

    /// Gets all known accounts, sorted by address
    pub fn accounts(&self) -> Vec<Account> {
        let mut accounts: Vec<Account> = self
            .balances
            .iter()
            .map(|(address, balance)| Account {
                address: address.clone(),
                balance: *balance,
            })
            .collect();
        accounts.sort_by(|a, b| a.address.cmp(&b.address));
        accounts
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{Miner, Transaction};

    fn addr(s: &str) -> Address {
        Address(s.to_string())
    }

    fn block_with(index: u64, transactions: Vec<Transaction>) -> Block {
        Miner::new(1).mine(index, transactions, "prev".to_string())
    }

    #[test]
    fn test_unknown_account_reads_zero_without_insert() {
        let ledger = Ledger::new();

        assert_eq!(ledger.balance_of(&addr("nobody")), 0.0);
        assert!(!ledger.contains(&addr("nobody")));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_apply_block() {
        let mut ledger = Ledger::new();
        let block = block_with(
            1,
            vec![
                Transaction::new_reward(addr("alice"), 100.0),
                Transaction::new(addr("alice"), addr("bob"), 30.0).unwrap(),
            ],
        );

        ledger.apply_block(&block);

        assert_eq!(ledger.balance_of(&addr("alice")), 70.0);
        assert_eq!(ledger.balance_of(&addr("bob")), 30.0);
        assert_eq!(ledger.balance_of(&Address::system()), -100.0);
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn test_self_transfer_is_neutral() {
        let mut ledger = Ledger::new();
        ledger.apply_block(&block_with(1, vec![Transaction::new_reward(addr("alice"), 5.0)]));
        ledger.apply_block(&block_with(
            2,
            vec![Transaction::new(addr("alice"), addr("alice"), 5.0).unwrap()],
        ));

        assert_eq!(ledger.balance_of(&addr("alice")), 5.0);
    }

    #[test]
    fn test_replay_matches_incremental() {
        let blocks = vec![
            block_with(0, Vec::new()),
            block_with(1, vec![Transaction::new_reward(addr("alice"), 10.0)]),
            block_with(
                2,
                vec![
                    Transaction::new(addr("alice"), addr("carol"), 4.0).unwrap(),
                    Transaction::new_reward(addr("bob"), 10.0),
                ],
            ),
        ];

        let mut incremental = Ledger::new();
        for block in &blocks {
            incremental.apply_block(block);
        }

        assert_eq!(Ledger::replay(&blocks), incremental);
        assert_eq!(incremental.balance_of(&addr("carol")), 4.0);
    }

    #[test]
    fn test_accounts_sorted() {
        let mut ledger = Ledger::new();
        ledger.apply_block(&block_with(
            1,
            vec![
                Transaction::new_reward(addr("zed"), 1.0),
                Transaction::new_reward(addr("amy"), 2.0),
            ],
        ));

        let names: Vec<String> = ledger.accounts().into_iter().map(|a| a.address.0).collect();
        assert_eq!(names, vec!["SYSTEM", "amy", "zed"]);
    }
}
