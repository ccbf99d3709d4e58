use log::{info, warn};
use thiserror::Error;

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::ChainConfig;

use super::block::{Block, BlockSummary, GENESIS_PREVIOUS_HASH};
use super::crypto::Address;
use super::ledger::{Account, Ledger};
use super::miner::Miner;
use super::pool::{PoolError, TransactionPool};
use super::transaction::{Transaction, TransactionError};

/// Errors that can occur during blockchain operations
#[derive(Debug, Error)]
pub enum BlockchainError {
    #[error("Transaction error: {0}")]
    TransactionError(#[from] TransactionError),

    #[error("Pool error: {0}")]
    PoolError(#[from] PoolError),

    #[error("Invalid block: {0}")]
    InvalidBlock(String),

    #[error("Mining cancelled")]
    MiningCancelled,

    #[error("System error: {0}")]
    SystemError(String),
}

/// Append-only sequence of blocks, starting at genesis
#[derive(Debug, Clone)]
pub struct Chain {
    blocks: Vec<Block>,
}

impl Chain {
    /// Creates a chain holding a freshly mined genesis block
    pub fn new(miner: &Miner) -> Self {
        let genesis = miner.mine(0, Vec::new(), GENESIS_PREVIOUS_HASH.to_string());
        Chain {
            blocks: vec![genesis],
        }
    }

    /// Gets the last block in the chain
    pub fn tip(&self) -> &Block {
        // `blocks` starts with genesis and only grows
        &self.blocks[self.blocks.len() - 1]
    }

    /// Index the next block must carry
    pub fn next_index(&self) -> u64 {
        self.blocks.len() as u64
    }

    /// Appends a block after checking it extends the tip
    ///
    /// # Returns
    ///
    /// `InvalidBlock` if the index, link or proof does not fit
    pub fn push(&mut self, block: Block, difficulty: u8) -> Result<(), BlockchainError> {
        if block.index() != self.next_index() {
            return Err(BlockchainError::InvalidBlock(format!(
                "expected index {}, got {}",
                self.next_index(),
                block.index()
            )));
        }

        if block.previous_hash() != self.tip().hash() {
            return Err(BlockchainError::InvalidBlock(format!(
                "block {} does not link to tip {}",
                block.index(),
                self.tip().hash()
            )));
        }

        if !block.meets_difficulty(difficulty) {
            return Err(BlockchainError::InvalidBlock(format!(
                "block {} has an invalid proof of work",
                block.index()
            )));
        }

        self.blocks.push(block);
        Ok(())
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Validates hashes, proofs, indices and links from genesis to tip
    pub fn is_valid(&self, difficulty: u8) -> bool {
        let Some(genesis) = self.blocks.first() else {
            return false;
        };
        if genesis.index() != 0
            || genesis.previous_hash() != GENESIS_PREVIOUS_HASH
            || !genesis.transactions().is_empty()
            || !genesis.meets_difficulty(difficulty)
        {
            return false;
        }

        self.blocks.windows(2).all(|pair| {
            let (previous, current) = (&pair[0], &pair[1]);
            current.index() == previous.index() + 1
                && current.previous_hash() == previous.hash()
                && current.meets_difficulty(difficulty)
        })
    }
}

/// Chain, pool and ledger, always mutated together
#[derive(Debug)]
struct ChainState {
    chain: Chain,
    pool: TransactionPool,
    ledger: Ledger,

    /// Number of pool entries taken by the mine in flight, if any
    sealing: Option<usize>,
}

/// Represents the blockchain
#[derive(Debug, Clone)]
pub struct Blockchain {
    /// Chain, pending transactions and balances behind a single lock
    state: Arc<Mutex<ChainState>>,

    /// Held for the whole of a mine so only one block is searched at a time
    mining: Arc<Mutex<()>>,

    /// Proof of work settings
    miner: Miner,

    /// Mining reward
    mining_reward: f64,
}

impl Default for Blockchain {
    fn default() -> Self {
        Blockchain::new()
    }
}

impl Blockchain {
    /// Creates a new blockchain with a genesis block and default settings
    pub fn new() -> Self {
        Blockchain::with_config(&ChainConfig::default())
    }

    /// Creates a new blockchain with a genesis block
    ///
    /// # Arguments
    ///
    /// * `config` - Difficulty, mining reward and block size
    pub fn with_config(config: &ChainConfig) -> Self {
        let miner = Miner::new(config.difficulty);
        let chain = Chain::new(&miner);
        info!(
            "Created genesis block {} (difficulty {}, reward {}, max {} transactions per block)",
            chain.tip().hash(),
            config.difficulty,
            config.mining_reward,
            config.max_transactions
        );

        Blockchain {
            state: Arc::new(Mutex::new(ChainState {
                chain,
                pool: TransactionPool::new(config.max_transactions),
                ledger: Ledger::new(),
                sealing: None,
            })),
            mining: Arc::new(Mutex::new(())),
            miner,
            mining_reward: config.mining_reward,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ChainState>, BlockchainError> {
        self.state
            .lock()
            .map_err(|_| BlockchainError::SystemError("blockchain state lock poisoned".to_string()))
    }

    /// Adds a new transaction to the pending transactions
    ///
    /// # Arguments
    ///
    /// * `sender` - The sender's identifier, or `SYSTEM` to issue new funds
    /// * `recipient` - The recipient's identifier
    /// * `amount` - The amount to transfer
    ///
    /// # Returns
    ///
    /// The admitted transaction and the index of the block expected to
    /// include it, read under the same lock as the admission
    pub fn submit_transaction(
        &self,
        sender: &str,
        recipient: &str,
        amount: f64,
    ) -> Result<(Transaction, u64), BlockchainError> {
        let sender = Address::parse(sender, "sender")?;
        let recipient = Address::parse(recipient, "recipient")?;
        let transaction = Transaction::new(sender, recipient, amount)?;

        let mut state = self.lock()?;
        let ChainState {
            chain,
            pool,
            ledger,
            sealing,
        } = &mut *state;

        match pool.admit(transaction.clone(), ledger) {
            Ok(()) => {
                info!(
                    "Transaction added: {} -> {}: {}",
                    transaction.sender, transaction.recipient, transaction.amount
                );
                // A block already being sealed does not pick up new submissions
                let block_index = chain.next_index() + u64::from(sealing.is_some());
                Ok((transaction, block_index))
            }
            Err(err) => {
                warn!("Rejected transaction from {}: {}", transaction.sender, err);
                Err(err.into())
            }
        }
    }

    /// Mines a new block with the pending transactions
    ///
    /// Blocks until a proof of work is found.
    ///
    /// # Arguments
    ///
    /// * `miner_address` - The address of the miner (to receive mining reward)
    ///
    /// # Returns
    ///
    /// Result with the newly mined block
    pub fn mine_block(&self, miner_address: &str) -> Result<Block, BlockchainError> {
        self.mine_block_with_cancel(miner_address, &AtomicBool::new(false))
    }

    /// Mines a new block, giving up with `MiningCancelled` once `cancel` is set
    ///
    /// Mines run one at a time. The state lock is only taken to snapshot the
    /// pool and tip, and again to commit, so reads and submissions proceed
    /// during the search. Transactions submitted meanwhile wait for the next
    /// block. If the search is cancelled the pool is left as it was.
    pub fn mine_block_with_cancel(
        &self,
        miner_address: &str,
        cancel: &AtomicBool,
    ) -> Result<Block, BlockchainError> {
        let miner_address = Address::parse(miner_address, "miner address")?;

        let _mining = self
            .mining
            .lock()
            .map_err(|_| BlockchainError::SystemError("mining lock poisoned".to_string()))?;

        let (sealed, index, previous_hash, mut transactions) = {
            let mut state = self.lock()?;
            let sealed = state.pool.len();
            state.sealing = Some(sealed);
            (
                sealed,
                state.chain.next_index(),
                state.chain.tip().hash().to_string(),
                state.pool.pending().to_vec(),
            )
        };
        transactions.push(Transaction::new_reward(miner_address.clone(), self.mining_reward));

        let mined = self.miner.mine_until(index, transactions, previous_hash, cancel);

        let mut state = self.lock()?;
        state.sealing = None;
        let block = mined.ok_or(BlockchainError::MiningCancelled)?;

        // Nothing below fails once the push succeeds, so chain and ledger move together
        state.chain.push(block.clone(), self.miner.difficulty())?;
        state.ledger.apply_block(&block);
        state.pool.remove_mined(sealed);

        info!(
            "Block {} added to chain with {} transactions, reward to {}",
            block.index(),
            block.transactions().len(),
            miner_address
        );

        Ok(block)
    }

    /// Gets the entire blockchain
    pub fn get_chain(&self) -> Result<Vec<Block>, BlockchainError> {
        Ok(self.lock()?.chain.blocks().to_vec())
    }

    /// Gets index, hash and transactions of every block, genesis first
    pub fn list_chain(&self) -> Result<Vec<BlockSummary>, BlockchainError> {
        Ok(self.lock()?.chain.blocks().iter().map(Block::summary).collect())
    }

    /// Lists the chain and validates it from the same snapshot
    pub fn chain_status(&self) -> Result<(Vec<BlockSummary>, bool), BlockchainError> {
        let state = self.lock()?;
        let summaries = state.chain.blocks().iter().map(Block::summary).collect();
        Ok((summaries, self.check(&state)))
    }

    /// Gets the committed balance of an account (0 if never seen)
    pub fn get_balance(&self, account: &str) -> Result<f64, BlockchainError> {
        let address = Address::parse(account, "account")?;
        Ok(self.lock()?.ledger.balance_of(&address))
    }

    /// Gets all pending transactions
    pub fn get_pending_transactions(&self) -> Result<Vec<Transaction>, BlockchainError> {
        Ok(self.lock()?.pool.pending().to_vec())
    }

    /// Gets every account that has been touched by a committed block
    pub fn get_accounts(&self) -> Result<Vec<Account>, BlockchainError> {
        Ok(self.lock()?.ledger.accounts())
    }

    /// Validates the blockchain
    ///
    /// # Returns
    ///
    /// true if every block is linked and proven, and the balances match a
    /// replay of the chain
    pub fn is_valid(&self) -> Result<bool, BlockchainError> {
        let state = self.lock()?;
        Ok(self.check(&state))
    }

    fn check(&self, state: &ChainState) -> bool {
        state.chain.is_valid(self.miner.difficulty()) && Ledger::replay(state.chain.blocks()) == state.ledger
    }
}
