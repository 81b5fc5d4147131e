// ============================================================================
// Market Resolve Module - Core Market Pricing, Custody & Settlement
// ============================================================================
//
// This module contains the core prediction market functionality:
//   - fixed: ray fixed-point math with 256-bit intermediates
//   - cpmm: complete-set Constant Product curve for pricing
//   - pool: shared collateral custody, partitioned per market
//   - markets: per-market state machine (Open → Expired → Settled)
//
// ============================================================================

pub mod cpmm;
pub mod fixed;
pub mod markets;
pub mod pool;

pub use cpmm::{price_no, price_of, price_yes, quote_buy, Reserves, TradeQuote};
pub use fixed::{Amount, Ray, RAY};
pub use markets::{Market, MarketInfo, MarketState, MarketStatus, PreparedTrade, TradeRequest};
pub use pool::{LiquidityPool, MarketCustody};
