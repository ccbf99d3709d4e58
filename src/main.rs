use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use log::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tally_chain::config::Config;
use tally_chain::{api, blockchain};

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::get_chain,
        api::handlers::get_blocks,
        api::handlers::get_pending_transactions,
        api::handlers::new_transaction,
        api::handlers::mine_block,
        api::handlers::validate_chain,
        api::handlers::get_balance,
        api::handlers::get_all_accounts
    ),
    components(
        schemas(
            blockchain::Block,
            blockchain::BlockSummary,
            blockchain::Transaction,
            blockchain::Address,
            blockchain::Account,
            api::handlers::ChainResponse,
            api::handlers::TransactionRequest,
            api::handlers::TransactionResponse,
            api::handlers::MineRequest,
            api::handlers::MineResponse,
            api::handlers::BalanceResponse
        )
    ),
    tags(
        (name = "ledger", description = "Ledger API endpoints")
    ),
    info(
        title = "Tally Chain API",
        version = "0.1.0",
        description = "A single-node proof-of-work ledger",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
struct ApiDoc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().context("failed to load configuration")?;

    // Mines the genesis block before the server accepts requests
    let blockchain = web::Data::new(blockchain::Blockchain::with_config(&config.chain));

    let bind = (config.server.host.clone(), config.server.port);
    info!("Starting HTTP server at http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        // Configure CORS
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .app_data(blockchain.clone())
            .configure(api::configure_routes)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi())
            )
    })
    .bind(bind)
    .with_context(|| format!("failed to bind {}:{}", config.server.host, config.server.port))?
    .run()
    .await
    .context("HTTP server terminated with an error")
}
