// HTTP request handlers for the market engine API

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use crate::engine::Engine;
use crate::errors::MarketError;
use crate::models::*;
use crate::shares::Side;

pub type SharedEngine = Arc<Engine>;

type ApiResult = Result<Json<Value>, MarketError>;

impl MarketError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            MarketError::Unauthorized(_) => StatusCode::FORBIDDEN,
            MarketError::MarketNotFound(_) => StatusCode::NOT_FOUND,
            MarketError::MarketExpired(_)
            | MarketError::MarketNotExpired(_)
            | MarketError::MarketNotSettled(_)
            | MarketError::ResultNotAvailable(_)
            | MarketError::AlreadyPublished(_)
            | MarketError::TooEarly { .. }
            | MarketError::AlreadySettled(_)
            | MarketError::PoolUnderfunded(_) => StatusCode::CONFLICT,
            MarketError::InvalidTrade(_) | MarketError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
            MarketError::SlippageExceeded { .. }
            | MarketError::InsufficientBalance { .. }
            | MarketError::InvalidResolveTime { .. }
            | MarketError::InvalidQuestion(_) => StatusCode::UNPROCESSABLE_ENTITY,
            MarketError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for MarketError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            warn!("❌ {}", self);
        }
        let body = Json(json!({ "error": self.to_string(), "kind": self.kind() }));
        (status, body).into_response()
    }
}

// ===== HEALTH =====

pub async fn health_check(State(engine): State<SharedEngine>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "markets": engine.market_count(),
        "now": engine.now(),
    }))
}

// ===== MARKET ENDPOINTS =====

pub async fn get_markets(State(engine): State<SharedEngine>) -> Json<Value> {
    let markets: Vec<Value> = engine
        .list_markets()
        .filter_map(|id| engine.get_market_info(&id).ok())
        .map(|info| market_info_json(&info))
        .collect();

    Json(json!({ "markets": markets }))
}

pub async fn create_market(
    State(engine): State<SharedEngine>,
    Json(payload): Json<CreateMarketRequest>,
) -> Result<(StatusCode, Json<Value>), MarketError> {
    let creator = payload.creator.as_deref().unwrap_or(&engine.config().admin);
    let market_id = engine.create_market(creator, &payload.question, payload.resolve_timestamp)?;
    let info = engine.get_market_info(&market_id)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "market_id": market_id, "market": market_info_json(&info) })),
    ))
}

pub async fn get_market(State(engine): State<SharedEngine>, Path(id): Path<String>) -> ApiResult {
    let info = engine.get_market_info(&id)?;
    Ok(Json(market_info_json(&info)))
}

pub async fn get_price(State(engine): State<SharedEngine>, Path(id): Path<String>) -> ApiResult {
    let price_yes = engine.get_price_yes(&id)?;
    let price_no = engine.get_price_no(&id)?;
    Ok(Json(price_json(&id, price_yes, price_no)))
}

pub async fn get_quote(
    State(engine): State<SharedEngine>,
    Path(id): Path<String>,
    Query(params): Query<QuoteParams>,
) -> ApiResult {
    let side: Side = params.side.parse()?;
    let amount_in = parse_amount("amount_in", &params.amount_in)?;
    let quote = engine.quote(&id, side, amount_in)?;
    Ok(Json(quote_json(&id, &quote)))
}

async fn buy(engine: SharedEngine, id: String, side: Side, payload: BuyRequest) -> ApiResult {
    let amount_in = parse_amount("amount_in", &payload.amount_in)?;
    let min_out = match payload.min_out.as_deref() {
        Some(raw) => parse_amount("min_out", raw)?,
        None => 0,
    };
    let recipient = payload.recipient.as_deref().unwrap_or(&payload.payer);

    let quote = match side {
        Side::Yes => engine.buy_yes(&id, &payload.payer, amount_in, min_out, recipient)?,
        Side::No => engine.buy_no(&id, &payload.payer, amount_in, min_out, recipient)?,
    };

    let mut body = quote_json(&id, &quote);
    body["success"] = json!(true);
    body["recipient"] = json!(recipient);
    body["payer_balance"] = json!(engine.balance_of(&payload.payer).to_string());
    Ok(Json(body))
}

pub async fn buy_yes(
    State(engine): State<SharedEngine>,
    Path(id): Path<String>,
    Json(payload): Json<BuyRequest>,
) -> ApiResult {
    buy(engine, id, Side::Yes, payload).await
}

pub async fn buy_no(
    State(engine): State<SharedEngine>,
    Path(id): Path<String>,
    Json(payload): Json<BuyRequest>,
) -> ApiResult {
    buy(engine, id, Side::No, payload).await
}

pub async fn settle_market(State(engine): State<SharedEngine>, Path(id): Path<String>) -> ApiResult {
    let settlement = engine.settle(&id)?;
    Ok(Json(json!({
        "success": true,
        "market_id": settlement.market_id,
        "result": settlement.result,
        "settled_at": settlement.settled_at,
    })))
}

pub async fn redeem(
    State(engine): State<SharedEngine>,
    Path(id): Path<String>,
    Json(payload): Json<RedeemRequest>,
) -> ApiResult {
    let redemption = engine.redeem(&id, &payload.account)?;
    Ok(Json(redemption_json(&redemption)))
}

pub async fn reclaim_residual(
    State(engine): State<SharedEngine>,
    Path(id): Path<String>,
    Json(payload): Json<ReclaimRequest>,
) -> ApiResult {
    let reclaimed = engine.reclaim_residual(&payload.caller, &id)?;
    Ok(Json(json!({
        "market_id": id,
        "reclaimed": reclaimed.to_string(),
        "free_liquidity": engine.free_liquidity().to_string(),
    })))
}

pub async fn get_position(
    State(engine): State<SharedEngine>,
    Path((id, account)): Path<(String, String)>,
) -> ApiResult {
    let position = engine.position(&id, &account)?;
    Ok(Json(position_json(&id, &account, &position)))
}

pub async fn get_solvency(State(engine): State<SharedEngine>, Path(id): Path<String>) -> ApiResult {
    let report = engine.solvency(&id)?;
    Ok(Json(json!({
        "market_id": report.market_id,
        "collateral_locked": report.collateral_locked.to_string(),
        "outstanding_yes": report.outstanding_yes.to_string(),
        "outstanding_no": report.outstanding_no.to_string(),
        "best_guess": report.best_guess,
        "owed_to_best_guess": report.owed_to_best_guess.to_string(),
        "owed": report.owed.to_string(),
        "solvent": report.solvent,
    })))
}

// ===== ORACLE ENDPOINTS =====

pub async fn publish_result(
    State(engine): State<SharedEngine>,
    Path(id): Path<String>,
    Json(payload): Json<PublishResultRequest>,
) -> ApiResult {
    let record = engine.publish_result(&payload.caller, &id, payload.result)?;
    Ok(Json(oracle_record_json(&record)))
}

/// 404 until a result is published; settlement paths report the same gap as 409
pub async fn get_result(State(engine): State<SharedEngine>, Path(id): Path<String>) -> Response {
    match engine.get_result(&id) {
        Some(record) => Json(oracle_record_json(&record)).into_response(),
        None => {
            let missing = MarketError::ResultNotAvailable(id);
            let body = Json(json!({ "error": missing.to_string(), "kind": missing.kind() }));
            (StatusCode::NOT_FOUND, body).into_response()
        }
    }
}

// ===== LEDGER ENDPOINTS =====

pub async fn get_balance(State(engine): State<SharedEngine>, Path(account): Path<String>) -> Json<Value> {
    let balance = engine.balance_of(&account);
    Json(json!({
        "account": account,
        "symbol": engine.config().collateral_symbol,
        "balance": amount_json(balance, engine.config().collateral_decimals),
    }))
}

pub async fn mint(State(engine): State<SharedEngine>, Json(payload): Json<SupplyRequest>) -> ApiResult {
    let amount = parse_amount("amount", &payload.amount)?;
    let balance = engine.mint(&payload.caller, &payload.account, amount)?;
    Ok(Json(json!({ "success": true, "account": payload.account, "balance": balance.to_string() })))
}

pub async fn burn(State(engine): State<SharedEngine>, Json(payload): Json<SupplyRequest>) -> ApiResult {
    let amount = parse_amount("amount", &payload.amount)?;
    let balance = engine.burn(&payload.caller, &payload.account, amount)?;
    Ok(Json(json!({ "success": true, "account": payload.account, "balance": balance.to_string() })))
}

pub async fn transfer(State(engine): State<SharedEngine>, Json(payload): Json<TransferRequest>) -> ApiResult {
    let amount = parse_amount("amount", &payload.amount)?;
    engine.transfer(&payload.from, &payload.to, amount)?;
    Ok(Json(json!({
        "success": true,
        "from": payload.from,
        "to": payload.to,
        "amount": amount.to_string(),
    })))
}

pub async fn get_ledger_stats(State(engine): State<SharedEngine>) -> Json<Value> {
    let stats = engine.ledger_stats();
    Json(json!({
        "accounts": stats.accounts,
        "transactions": stats.transactions,
        "block": stats.block,
        "total_supply": stats.total_supply.to_string(),
        "total_minted": stats.total_minted.to_string(),
        "total_burned": stats.total_burned.to_string(),
    }))
}

// ===== LIQUIDITY ENDPOINTS =====

pub async fn deposit_liquidity(
    State(engine): State<SharedEngine>,
    Json(payload): Json<LiquidityRequest>,
) -> ApiResult {
    let amount = parse_amount("amount", &payload.amount)?;
    let provided = engine.deposit_liquidity(&payload.provider, amount)?;
    Ok(Json(json!({
        "provider": payload.provider,
        "provided": provided.to_string(),
        "free_liquidity": engine.free_liquidity().to_string(),
    })))
}

pub async fn withdraw_liquidity(
    State(engine): State<SharedEngine>,
    Json(payload): Json<LiquidityRequest>,
) -> ApiResult {
    let amount = parse_amount("amount", &payload.amount)?;
    let provided = engine.withdraw_liquidity(&payload.provider, amount)?;
    Ok(Json(json!({
        "provider": payload.provider,
        "provided": provided.to_string(),
        "free_liquidity": engine.free_liquidity().to_string(),
    })))
}
