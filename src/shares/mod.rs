// ============================================================================
// Shares Module - outcome share balances for one market
// ============================================================================
//
// Shares represent a claim on one unit of collateral if their side wins.
//
// Core Invariant:
//   1 YES share + 1 NO share = 1 unit of collateral (a complete set)
//
// Shares are minted when a trader buys from the curve and burned on
// redemption after settlement. Nothing burns before settlement, so the
// outstanding totals only grow while a market is open.
//
// ============================================================================

pub mod redeem;

pub use redeem::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::{MarketError, MarketResult};
use crate::market_resolve::fixed::Amount;

// ============================================================================
// SIDE
// ============================================================================

/// Outcome side of a binary market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Yes,
    No,
}

impl Side {
    pub fn opposite(&self) -> Self {
        match self {
            Side::Yes => Side::No,
            Side::No => Side::Yes,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Yes => write!(f, "YES"),
            Side::No => write!(f, "NO"),
        }
    }
}

impl std::str::FromStr for Side {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yes" => Ok(Side::Yes),
            "no" => Ok(Side::No),
            other => Err(MarketError::InvalidTrade(format!("unknown side: {}", other))),
        }
    }
}

// ============================================================================
// POSITION
// ============================================================================

/// One account's share balances in a market
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub yes: Amount,
    pub no: Amount,
}

impl Position {
    pub fn of(&self, side: Side) -> Amount {
        match side {
            Side::Yes => self.yes,
            Side::No => self.no,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.yes == 0 && self.no == 0
    }
}

// ============================================================================
// SHARE BOOK
// ============================================================================

/// A mint checked against a book, ready to commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareCredit {
    pub account: String,
    pub side: Side,
    held_after: Amount,
    outstanding_after: Amount,
}

/// Share balances and outstanding supply for a single market
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShareBook {
    positions: BTreeMap<String, Position>,
    outstanding_yes: Amount,
    outstanding_no: Amount,
}

impl ShareBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self, account: &str) -> Position {
        self.positions.get(account).copied().unwrap_or_default()
    }

    pub fn outstanding(&self, side: Side) -> Amount {
        match side {
            Side::Yes => self.outstanding_yes,
            Side::No => self.outstanding_no,
        }
    }

    pub fn holders(&self) -> usize {
        self.positions.len()
    }

    /// Work out the balances a mint would produce; nothing changes yet
    pub fn plan_credit(&self, account: &str, side: Side, amount: Amount) -> MarketResult<ShareCredit> {
        let overflow = || MarketError::InvalidTrade("share supply overflow".to_string());
        let outstanding_after = self.outstanding(side).checked_add(amount).ok_or_else(overflow)?;
        let held_after = self.position(account).of(side).checked_add(amount).ok_or_else(overflow)?;
        Ok(ShareCredit {
            account: account.to_string(),
            side,
            held_after,
            outstanding_after,
        })
    }

    /// Apply a planned mint. Only valid against the book it was planned on.
    pub fn commit(&mut self, credit: ShareCredit) {
        let position = self.positions.entry(credit.account).or_default();
        match credit.side {
            Side::Yes => {
                position.yes = credit.held_after;
                self.outstanding_yes = credit.outstanding_after;
            }
            Side::No => {
                position.no = credit.held_after;
                self.outstanding_no = credit.outstanding_after;
            }
        }
    }

    /// Mint shares to an account
    pub fn credit(&mut self, account: &str, side: Side, amount: Amount) -> MarketResult<()> {
        let credit = self.plan_credit(account, side, amount)?;
        self.commit(credit);
        Ok(())
    }

    /// Burn every share an account holds, returning what was burned
    pub fn burn_all(&mut self, account: &str) -> Position {
        let burned = self.positions.remove(account).unwrap_or_default();
        self.outstanding_yes -= burned.yes;
        self.outstanding_no -= burned.no;
        burned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_parsing_and_opposite() {
        assert_eq!("YES".parse::<Side>().unwrap(), Side::Yes);
        assert_eq!("no".parse::<Side>().unwrap(), Side::No);
        assert!("maybe".parse::<Side>().is_err());
        assert_eq!(Side::Yes.opposite(), Side::No);
        assert_eq!(Side::No.to_string(), "NO");
    }

    #[test]
    fn test_credit_tracks_outstanding() {
        let mut book = ShareBook::new();
        book.credit("alice", Side::Yes, 100).unwrap();
        book.credit("alice", Side::No, 40).unwrap();
        book.credit("bob", Side::Yes, 10).unwrap();

        assert_eq!(book.outstanding(Side::Yes), 110);
        assert_eq!(book.outstanding(Side::No), 40);
        assert_eq!(book.position("alice"), Position { yes: 100, no: 40 });
        assert_eq!(book.holders(), 2);
    }

    #[test]
    fn test_burn_all_is_idempotent() {
        let mut book = ShareBook::new();
        book.credit("alice", Side::Yes, 100).unwrap();

        assert_eq!(book.burn_all("alice"), Position { yes: 100, no: 0 });
        assert!(book.burn_all("alice").is_empty());
        assert_eq!(book.outstanding(Side::Yes), 0);
    }

    #[test]
    fn test_planned_credit_commits_exactly() {
        let mut book = ShareBook::new();
        book.credit("alice", Side::No, 5).unwrap();
        let credit = book.plan_credit("alice", Side::No, 7).unwrap();
        assert_eq!(book.position("alice").no, 5);

        book.commit(credit);
        assert_eq!(book.position("alice").no, 12);
        assert_eq!(book.outstanding(Side::No), 12);
    }

    #[test]
    fn test_credit_overflow_rejected() {
        let mut book = ShareBook::new();
        book.credit("alice", Side::Yes, u128::MAX).unwrap();
        assert!(book.credit("bob", Side::Yes, 1).is_err());
        assert_eq!(book.position("bob"), Position::default());
    }
}
