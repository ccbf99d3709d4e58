use actix_web::{web, HttpResponse, Responder};
use log::error;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::blockchain::{Account, Block, BlockSummary, Blockchain, BlockchainError, Transaction};

/// Data structure for the blockchain state
pub type BlockchainData = web::Data<Blockchain>;

/// Response for the chain endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ChainResponse {
    /// The length of the chain
    pub length: usize,

    /// Index, hash and transactions of each block
    pub chain: Vec<BlockSummary>,

    /// Whether the chain is valid
    pub is_valid: bool,
}

/// Request for the transaction endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct TransactionRequest {
    /// The sender's address (`SYSTEM` issues new funds)
    pub sender: String,

    /// The recipient's address
    pub recipient: String,

    /// The amount to transfer
    pub amount: f64,
}

/// Response for the transaction endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    /// The message
    pub message: String,

    /// The admitted transaction
    pub transaction: Transaction,

    /// The index of the block that will include this transaction
    pub block_index: u64,
}

/// Request for the mine endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct MineRequest {
    /// The miner's address
    pub miner_address: String,
}

/// Response for the mine endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct MineResponse {
    /// The message
    pub message: String,

    /// The newly mined block
    pub block: Block,
}

/// Response for the balance endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    /// The account's address
    pub address: String,

    /// The committed balance (0 for unknown accounts)
    pub balance: f64,
}

/// Maps a core error onto an HTTP response
fn error_response(context: &str, err: BlockchainError) -> HttpResponse {
    match err {
        BlockchainError::SystemError(_) => {
            error!("{}: {}", context, err);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("{}: {}", context, err)
            }))
        }
        _ => HttpResponse::BadRequest().json(serde_json::json!({
            "error": format!("{}: {}", context, err)
        })),
    }
}

/// Runs a call against the blockchain on the blocking thread pool
///
/// The state lock and the nonce search never run on an async worker.
async fn run_blocking<T, F>(
    context: &'static str,
    blockchain: BlockchainData,
    call: F,
) -> Result<T, HttpResponse>
where
    F: FnOnce(&Blockchain) -> Result<T, BlockchainError> + Send + 'static,
    T: Send + 'static,
{
    match web::block(move || call(&blockchain)).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(error_response(context, err)),
        Err(err) => {
            error!("{}: blocking task failed: {}", context, err);
            Err(HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("{}: {}", context, err)
            })))
        }
    }
}

/// Get the full blockchain
///
/// Returns a summary of every block and the chain's validity status
#[utoipa::path(
    get,
    path = "/api/v1/chain",
    responses(
        (status = 200, description = "Blockchain retrieved successfully", body = ChainResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_chain(blockchain: BlockchainData) -> impl Responder {
    match run_blocking("Failed to read chain", blockchain, |b| b.chain_status()).await {
        Ok((chain, is_valid)) => HttpResponse::Ok().json(ChainResponse {
            length: chain.len(),
            chain,
            is_valid,
        }),
        Err(response) => response,
    }
}

/// Get all blocks
///
/// Returns every block with its timestamp, nonce and hashes
#[utoipa::path(
    get,
    path = "/api/v1/blocks",
    responses(
        (status = 200, description = "Blocks retrieved successfully", body = Vec<Block>),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_blocks(blockchain: BlockchainData) -> impl Responder {
    match run_blocking("Failed to read chain", blockchain, |b| b.get_chain()).await {
        Ok(blocks) => HttpResponse::Ok().json(blocks),
        Err(response) => response,
    }
}

/// Get all pending transactions
///
/// Returns all transactions waiting to be included in a block
#[utoipa::path(
    get,
    path = "/api/v1/transactions/pending",
    responses(
        (status = 200, description = "Pending transactions retrieved successfully", body = Vec<Transaction>),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_pending_transactions(blockchain: BlockchainData) -> impl Responder {
    match run_blocking("Failed to read pending transactions", blockchain, |b| {
        b.get_pending_transactions()
    })
    .await
    {
        Ok(transactions) => HttpResponse::Ok().json(transactions),
        Err(response) => response,
    }
}

/// Create a new transaction
///
/// Adds a new transaction to the pending transactions
#[utoipa::path(
    post,
    path = "/api/v1/transactions/new",
    request_body = TransactionRequest,
    responses(
        (status = 201, description = "Transaction created successfully", body = TransactionResponse),
        (status = 400, description = "Invalid transaction or insufficient funds"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn new_transaction(
    blockchain: BlockchainData,
    transaction_req: web::Json<TransactionRequest>,
) -> impl Responder {
    let TransactionRequest {
        sender,
        recipient,
        amount,
    } = transaction_req.into_inner();

    let submitted = run_blocking("Failed to add transaction", blockchain, move |b| {
        b.submit_transaction(&sender, &recipient, amount)
    })
    .await;

    match submitted {
        Ok((transaction, block_index)) => HttpResponse::Created().json(TransactionResponse {
            message: "Transaction will be added to Block".to_string(),
            transaction,
            block_index,
        }),
        Err(response) => response,
    }
}

/// Mine a new block
///
/// Seals all pending transactions plus the mining reward into a new block
#[utoipa::path(
    post,
    path = "/api/v1/mine",
    request_body = MineRequest,
    responses(
        (status = 200, description = "Block mined successfully", body = MineResponse),
        (status = 400, description = "Invalid mining request"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn mine_block(
    blockchain: BlockchainData,
    mine_req: web::Json<MineRequest>,
) -> impl Responder {
    let miner_address = mine_req.into_inner().miner_address;

    let mined = run_blocking("Failed to mine block", blockchain, move |b| {
        b.mine_block(&miner_address)
    })
    .await;

    match mined {
        Ok(block) => HttpResponse::Ok().json(MineResponse {
            message: "New Block Mined".to_string(),
            block,
        }),
        Err(response) => response,
    }
}

/// Check if the blockchain is valid
///
/// Validates hashes, links, proofs and balances
#[utoipa::path(
    get,
    path = "/api/v1/validate",
    responses(
        (status = 200, description = "Blockchain validation status", body = bool),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn validate_chain(blockchain: BlockchainData) -> impl Responder {
    match run_blocking("Failed to validate chain", blockchain, |b| b.is_valid()).await {
        Ok(is_valid) => HttpResponse::Ok().json(is_valid),
        Err(response) => response,
    }
}

/// Get account balance
///
/// Returns the committed balance of an account
#[utoipa::path(
    get,
    path = "/api/v1/balance/{address}",
    params(
        ("address" = String, Path, description = "Account identifier")
    ),
    responses(
        (status = 200, description = "Balance retrieved successfully", body = BalanceResponse),
        (status = 400, description = "Invalid address"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_balance(
    blockchain: BlockchainData,
    address: web::Path<String>,
) -> impl Responder {
    let address = address.into_inner();
    let account = address.clone();

    match run_blocking("Failed to read balance", blockchain, move |b| b.get_balance(&account)).await {
        Ok(balance) => HttpResponse::Ok().json(BalanceResponse { address, balance }),
        Err(response) => response,
    }
}

/// Get all accounts
///
/// Returns every account touched by a committed block
#[utoipa::path(
    get,
    path = "/api/v1/accounts",
    responses(
        (status = 200, description = "Accounts retrieved successfully", body = Vec<Account>),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_all_accounts(blockchain: BlockchainData) -> impl Responder {
    match run_blocking("Failed to read accounts", blockchain, |b| b.get_accounts()).await {
        Ok(accounts) => HttpResponse::Ok().json(accounts),
        Err(response) => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::configure_routes;
    use crate::config::ChainConfig;
    use actix_web::{http::StatusCode, test, App};

    fn test_data() -> BlockchainData {
        web::Data::new(Blockchain::with_config(&ChainConfig {
            difficulty: 1,
            mining_reward: 10.0,
            max_transactions: 10,
        }))
    }

    #[actix_web::test]
    async fn test_transaction_mine_and_balance() {
        let data = test_data();
        let app = test::init_service(App::new().app_data(data.clone()).configure(configure_routes)).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/transactions/new")
            .set_json(TransactionRequest {
                sender: "SYSTEM".to_string(),
                recipient: "alice".to_string(),
                amount: 100.0,
            })
            .to_request();
        let resp: TransactionResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.block_index, 1);
        assert_eq!(resp.transaction.amount, 100.0);

        let req = test::TestRequest::post()
            .uri("/api/v1/mine")
            .set_json(MineRequest {
                miner_address: "alice".to_string(),
            })
            .to_request();
        let resp: MineResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.block.index(), 1);
        assert_eq!(resp.block.transactions().len(), 2);

        let req = test::TestRequest::get().uri("/api/v1/balance/alice").to_request();
        let resp: BalanceResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.balance, 110.0);

        let req = test::TestRequest::get().uri("/api/v1/chain").to_request();
        let resp: ChainResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.length, 2);
        assert!(resp.is_valid);
        assert_eq!(resp.chain[1].hash, data.get_chain().unwrap()[1].hash());
    }

    #[actix_web::test]
    async fn test_insufficient_funds_is_bad_request() {
        let app = test::init_service(App::new().app_data(test_data()).configure(configure_routes)).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/transactions/new")
            .set_json(TransactionRequest {
                sender: "bob".to_string(),
                recipient: "alice".to_string(),
                amount: 1.0,
            })
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get().uri("/api/v1/transactions/pending").to_request();
        let pending: Vec<Transaction> = test::call_and_read_body_json(&app, req).await;
        assert!(pending.is_empty());
    }

    #[actix_web::test]
    async fn test_unknown_balance_is_zero() {
        let app = test::init_service(App::new().app_data(test_data()).configure(configure_routes)).await;

        let req = test::TestRequest::get().uri("/api/v1/balance/nobody").to_request();
        let resp: BalanceResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.address, "nobody");
        assert_eq!(resp.balance, 0.0);

        let req = test::TestRequest::get().uri("/api/v1/accounts").to_request();
        let accounts: Vec<Account> = test::call_and_read_body_json(&app, req).await;
        assert!(accounts.is_empty());
    }

    #[actix_web::test]
    async fn test_validate_and_blocks() {
        let app = test::init_service(App::new().app_data(test_data()).configure(configure_routes)).await;

        let req = test::TestRequest::get().uri("/api/v1/validate").to_request();
        let is_valid: bool = test::call_and_read_body_json(&app, req).await;
        assert!(is_valid);

        let req = test::TestRequest::get().uri("/api/v1/blocks").to_request();
        let blocks: Vec<Block> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].previous_hash(), "0");
    }

    #[actix_web::test]
    async fn test_block_index_follows_mined_blocks() {
        let data = test_data();
        let app = test::init_service(App::new().app_data(data.clone()).configure(configure_routes)).await;

        data.mine_block("miner").unwrap();

        let req = test::TestRequest::post()
            .uri("/api/v1/transactions/new")
            .set_json(TransactionRequest {
                sender: "miner".to_string(),
                recipient: "alice".to_string(),
                amount: 4.0,
            })
            .to_request();
        let resp: TransactionResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.block_index, 2);

        let req = test::TestRequest::post()
            .uri("/api/v1/mine")
            .set_json(MineRequest {
                miner_address: " ".to_string(),
            })
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(data.get_pending_transactions().unwrap().len(), 1);
    }
}
