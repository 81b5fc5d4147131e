// Request/response models for the HTTP API
//
// Amounts and ray prices cross the wire as decimal strings: u128 does not fit
// in a JSON number that every client can read back losslessly.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::{MarketError, MarketResult};
use crate::market_resolve::fixed::{amount_to_decimal, ray_to_decimal};
use crate::market_resolve::{Amount, MarketInfo, Ray, TradeQuote};
use crate::oracle::{OracleRecord, OracleResult};
use crate::shares::{Position, Redemption};

/// Parse a decimal-string amount in smallest units
pub fn parse_amount(field: &str, raw: &str) -> MarketResult<Amount> {
    raw.trim()
        .parse::<Amount>()
        .map_err(|_| MarketError::InvalidAmount(format!("{} must be a non-negative integer, got {:?}", field, raw)))
}

// ===== REQUESTS =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMarketRequest {
    pub question: String,
    pub resolve_timestamp: u64,
    #[serde(default)]
    pub creator: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyRequest {
    pub payer: String,
    pub amount_in: String,
    #[serde(default)]
    pub min_out: Option<String>,
    /// Defaults to the payer
    #[serde(default)]
    pub recipient: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteParams {
    pub side: String,
    pub amount_in: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemRequest {
    pub account: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReclaimRequest {
    pub caller: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishResultRequest {
    pub caller: String,
    pub result: OracleResult,
}

/// Mint and burn share one body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplyRequest {
    pub caller: String,
    pub account: String,
    pub amount: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from: String,
    pub to: String,
    pub amount: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidityRequest {
    pub provider: String,
    pub amount: String,
}

// ===== RESPONSES =====

fn ray_json(value: Ray) -> Value {
    json!({
        "ray": value.to_string(),
        "decimal": ray_to_decimal(value),
    })
}

pub fn amount_json(amount: Amount, decimals: u8) -> Value {
    json!({
        "raw": amount.to_string(),
        "decimal": amount_to_decimal(amount, decimals),
    })
}

pub fn market_info_json(info: &MarketInfo) -> Value {
    json!({
        "id": info.id,
        "question": info.question,
        "resolve_timestamp": info.resolve_timestamp,
        "status": info.status,
        "settled": info.settled,
        "result": info.result,
        "total_yes": info.total_yes.to_string(),
        "total_no": info.total_no.to_string(),
        "reserve_yes": info.reserve_yes.to_string(),
        "reserve_no": info.reserve_no.to_string(),
        "price_yes": ray_json(info.price_yes),
        "volume": info.volume.to_string(),
        "trade_count": info.trade_count,
        "created_at": info.created_at,
        "creator": info.creator,
    })
}

pub fn quote_json(market_id: &str, quote: &TradeQuote) -> Value {
    json!({
        "market_id": market_id,
        "side": quote.side,
        "amount_in": quote.amount_in.to_string(),
        "amount_out": quote.amount_out.to_string(),
        "price_before": ray_json(quote.price_before),
        "price_after": ray_json(quote.price_after),
        "average_price": ray_json(quote.average_price),
    })
}

pub fn price_json(market_id: &str, price_yes: Ray, price_no: Ray) -> Value {
    json!({
        "market_id": market_id,
        "price_yes": ray_json(price_yes),
        "price_no": ray_json(price_no),
    })
}

pub fn position_json(market_id: &str, account: &str, position: &Position) -> Value {
    json!({
        "market_id": market_id,
        "account": account,
        "yes": position.yes.to_string(),
        "no": position.no.to_string(),
    })
}

pub fn redemption_json(redemption: &Redemption) -> Value {
    json!({
        "market_id": redemption.market_id,
        "account": redemption.account,
        "yes_burned": redemption.yes_burned.to_string(),
        "no_burned": redemption.no_burned.to_string(),
        "payout": redemption.payout.to_string(),
    })
}

pub fn oracle_record_json(record: &OracleRecord) -> Value {
    json!({
        "market_id": record.market_id,
        "result": record.result,
        "published_at": record.published_at,
        "reporter": record.reporter,
    })
}
