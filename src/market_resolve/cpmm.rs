// ============================================================================
// Pricing Engine - complete-set Constant Product curve for binary markets
// ============================================================================
//
// Reserves hold YES and NO shares owned by the curve. Price(YES) is the share
// of the pool held as NO:
//
//   Price(YES) = NO / (YES + NO)        Price(NO) = 1 - Price(YES)
//
// Both are ray-scaled; Price(NO) is derived by subtraction so the two always
// sum to exactly RAY.
//
// Buying side S (other side O) with Δ collateral:
//   1. Δ mints Δ complete sets into the curve:   S' = S + Δ,  O' = O + Δ
//   2. S is withdrawn until S·O is restored:     S'' = ceil(S·O / O')
//   3. The buyer receives                        out = S' - S''
//
// Rounding the retained reserve up floors the amount out, so the pool never
// loses value to rounding. Every function here is pure.
//
// ============================================================================

use serde::{Deserialize, Serialize};

use super::fixed::{mul_div_ceil, ray_ratio, Amount, Ray, RAY};
use crate::errors::{MarketError, MarketResult};
use crate::shares::Side;

/// Curve reserves for one market
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reserves {
    pub yes: Amount,
    pub no: Amount,
}

impl Reserves {
    pub fn new(yes: Amount, no: Amount) -> Self {
        Self { yes, no }
    }

    /// 50/50 reserves seeded with `liquidity` complete sets
    pub fn balanced(liquidity: Amount) -> Self {
        Self { yes: liquidity, no: liquidity }
    }

    pub fn of(&self, side: Side) -> Amount {
        match side {
            Side::Yes => self.yes,
            Side::No => self.no,
        }
    }

    pub fn total(&self) -> Option<Amount> {
        self.yes.checked_add(self.no)
    }
}

/// Output of a buy against the curve
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeQuote {
    pub side: Side,
    pub amount_in: Amount,
    pub amount_out: Amount,
    pub reserves_before: Reserves,
    pub reserves_after: Reserves,
    /// Price of `side` before the trade (ray)
    pub price_before: Ray,
    /// Price of `side` after the trade (ray)
    pub price_after: Ray,
    /// amount_in / amount_out (ray)
    pub average_price: Ray,
}

fn invalid(reason: &str) -> MarketError {
    MarketError::InvalidTrade(reason.to_string())
}

/// Ray price of YES for the given reserves
pub fn price_yes(reserves: &Reserves) -> MarketResult<Ray> {
    let total = reserves.total().ok_or_else(|| invalid("reserve total overflows"))?;
    if total == 0 {
        return Err(invalid("reserves are empty"));
    }
    ray_ratio(reserves.no, total).ok_or_else(|| invalid("price overflow"))
}

/// Ray price of NO, the complement of the YES price
pub fn price_no(reserves: &Reserves) -> MarketResult<Ray> {
    Ok(RAY - price_yes(reserves)?)
}

pub fn price_of(reserves: &Reserves, side: Side) -> MarketResult<Ray> {
    match side {
        Side::Yes => price_yes(reserves),
        Side::No => price_no(reserves),
    }
}

/// Quote a buy of `side` paying `amount_in` collateral
pub fn quote_buy(reserves: &Reserves, side: Side, amount_in: Amount) -> MarketResult<TradeQuote> {
    if amount_in == 0 {
        return Err(invalid("amount_in must be positive"));
    }
    if reserves.yes == 0 || reserves.no == 0 {
        return Err(invalid("reserves must be positive on both sides"));
    }

    let bought = reserves.of(side);
    let other = reserves.of(side.opposite());

    let bought_with_sets = bought
        .checked_add(amount_in)
        .ok_or_else(|| invalid("reserve overflow"))?;
    let other_after = other
        .checked_add(amount_in)
        .ok_or_else(|| invalid("reserve overflow"))?;

    // Restore the constant product, rounding the retained reserve up
    let bought_after = mul_div_ceil(bought, other, other_after)
        .ok_or_else(|| invalid("curve overflow"))?;

    let amount_out = bought_with_sets
        .checked_sub(bought_after)
        .ok_or_else(|| invalid("curve underflow"))?;
    if amount_out == 0 {
        return Err(invalid("trade too small to receive shares"));
    }

    let reserves_after = match side {
        Side::Yes => Reserves::new(bought_after, other_after),
        Side::No => Reserves::new(other_after, bought_after),
    };

    let price_before = price_of(reserves, side)?;
    let price_after = price_of(&reserves_after, side)?;
    let average_price = ray_ratio(amount_in, amount_out).ok_or_else(|| invalid("price overflow"))?;

    Ok(TradeQuote {
        side,
        amount_in,
        amount_out,
        reserves_before: *reserves,
        reserves_after,
        price_before,
        price_after,
        average_price,
    })
}

// ============================================================================
// UNIT TESTS
// ============================================================================
