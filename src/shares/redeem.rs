// ============================================================================
// Share Redemption - payout rules after settlement
// ============================================================================
//
// RESOLUTION REDEMPTION:
//    Winning shares → 1 unit of collateral each
//    Losing shares  → 0 (burned)
//
// INVALID RESULT:
//    Both sides refund at the price ratio snapshotted at settlement:
//    a YES share pays Price(YES), a NO share pays Price(NO). Since the two
//    prices sum to one, a complete set still refunds exactly one unit.
//
// ============================================================================

use serde::{Deserialize, Serialize};

use super::{Position, Side};
use crate::errors::{MarketError, MarketResult};
use crate::market_resolve::fixed::{ray_mul_ceil, ray_mul_floor, Amount, Ray, RAY};
use crate::oracle::OracleResult;

/// How settled shares convert back into collateral
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutRule {
    /// One side pays 1:1, the other pays nothing
    Winner { side: Side },
    /// Each side pays its settlement price per share
    ProRata { yes_price: Ray, no_price: Ray },
}

impl PayoutRule {
    /// Build the rule for an oracle result, given Price(YES) at settlement
    pub fn for_result(result: OracleResult, price_yes: Ray) -> Self {
        match result {
            OracleResult::Yes => PayoutRule::Winner { side: Side::Yes },
            OracleResult::No => PayoutRule::Winner { side: Side::No },
            OracleResult::Invalid => PayoutRule::ProRata {
                yes_price: price_yes,
                no_price: RAY - price_yes,
            },
        }
    }

    /// Collateral paid for burning `position`, floored
    pub fn payout(&self, position: &Position) -> MarketResult<Amount> {
        match self {
            PayoutRule::Winner { side } => Ok(position.of(*side)),
            PayoutRule::ProRata { yes_price, no_price } => {
                let yes = ray_mul_floor(position.yes, *yes_price).ok_or_else(overflow)?;
                let no = ray_mul_floor(position.no, *no_price).ok_or_else(overflow)?;
                yes.checked_add(no).ok_or_else(overflow)
            }
        }
    }

    /// Upper bound on what all outstanding shares can still claim
    pub fn owed(&self, outstanding_yes: Amount, outstanding_no: Amount) -> MarketResult<Amount> {
        match self {
            PayoutRule::Winner { side: Side::Yes } => Ok(outstanding_yes),
            PayoutRule::Winner { side: Side::No } => Ok(outstanding_no),
            PayoutRule::ProRata { yes_price, no_price } => {
                let yes = ray_mul_ceil(outstanding_yes, *yes_price).ok_or_else(overflow)?;
                let no = ray_mul_ceil(outstanding_no, *no_price).ok_or_else(overflow)?;
                yes.checked_add(no).ok_or_else(overflow)
            }
        }
    }
}

fn overflow() -> MarketError {
    MarketError::InvalidAmount("payout overflow".to_string())
}

/// Result of a redemption
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redemption {
    pub market_id: String,
    pub account: String,
    pub yes_burned: Amount,
    pub no_burned: Amount,
    pub payout: Amount,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_winner_pays_one_to_one() {
        let rule = PayoutRule::for_result(OracleResult::Yes, RAY / 3);
        let position = Position { yes: 150, no: 70 };
        assert_eq!(rule.payout(&position).unwrap(), 150);
        assert_eq!(rule.owed(1_000, 500).unwrap(), 1_000);

        let rule = PayoutRule::for_result(OracleResult::No, RAY / 3);
        assert_eq!(rule.payout(&position).unwrap(), 70);
    }

    #[test]
    fn test_invalid_refunds_pro_rata() {
        let rule = PayoutRule::for_result(OracleResult::Invalid, RAY / 4);
        assert_eq!(
            rule,
            PayoutRule::ProRata { yes_price: RAY / 4, no_price: 3 * RAY / 4 }
        );

        // 100 YES @ 0.25 + 100 NO @ 0.75 = one complete set of 100
        let position = Position { yes: 100, no: 100 };
        assert_eq!(rule.payout(&position).unwrap(), 100);

        let position = Position { yes: 3, no: 0 };
        assert_eq!(rule.payout(&position).unwrap(), 0);
    }

    #[test]
    fn test_owed_bounds_individual_payouts() {
        let third = RAY / 3;
        let rule = PayoutRule::ProRata { yes_price: third, no_price: RAY - third };

        let holders = [Position { yes: 1, no: 2 }, Position { yes: 5, no: 1 }, Position { yes: 7, no: 0 }];
        let paid: Amount = holders.iter().map(|p| rule.payout(p).unwrap()).sum();
        let owed = rule.owed(13, 3).unwrap();
        assert!(paid <= owed);
    }
}
