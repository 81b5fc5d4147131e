/// Unified Markets - binary-outcome prediction market engine
/// Exports all modules for use as a library crate, plus the HTTP router

pub mod clock;
pub mod config;
pub mod engine;
pub mod errors;
pub mod factory;
pub mod handlers;
pub mod ledger;
pub mod locks;
pub mod market_resolve;
pub mod models;
pub mod oracle;
pub mod shares;
pub mod snapshot;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{EngineConfig, COLLATERAL_UNIT};
pub use engine::{Engine, PoolReserve, Settlement, SolvencyReport};
pub use errors::{MarketError, MarketResult};
pub use factory::{derive_market_id, MarketFactory, MarketIdCursor};
pub use ledger::{CollateralLedger, LedgerStats, Transaction, TxType};
pub use market_resolve::{
    Amount, LiquidityPool, Market, MarketInfo, MarketState, MarketStatus, Ray, Reserves, TradeQuote, TradeRequest,
    RAY,
};
pub use oracle::{OracleModule, OracleRecord, OracleResult};
pub use shares::{PayoutRule, Position, Redemption, Side};
pub use snapshot::EngineSnapshot;

use handlers::*;

/// Build the HTTP API around a shared engine
pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        // ===== HEALTH =====
        .route("/", get(health_check))
        .route("/health", get(health_check))
        // ===== MARKETS =====
        .route("/markets", get(get_markets).post(create_market))
        .route("/markets/:id", get(get_market))
        .route("/markets/:id/price", get(get_price))
        .route("/markets/:id/quote", get(get_quote))
        .route("/markets/:id/buy-yes", post(buy_yes))
        .route("/markets/:id/buy-no", post(buy_no))
        .route("/markets/:id/settle", post(settle_market))
        .route("/markets/:id/redeem", post(redeem))
        .route("/markets/:id/reclaim", post(reclaim_residual))
        .route("/markets/:id/solvency", get(get_solvency))
        .route("/markets/:id/positions/:account", get(get_position))
        // ===== ORACLE =====
        .route("/oracle/:id", get(get_result).post(publish_result))
        // ===== LEDGER =====
        .route("/balance/:account", get(get_balance))
        .route("/ledger", get(get_ledger_stats))
        .route("/ledger/mint", post(mint))
        .route("/ledger/burn", post(burn))
        .route("/ledger/transfer", post(transfer))
        // ===== LIQUIDITY =====
        .route("/pool/deposit", post(deposit_liquidity))
        .route("/pool/withdraw", post(withdraw_liquidity))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(engine)
}
