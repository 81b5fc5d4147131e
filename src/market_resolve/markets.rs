use serde::{Deserialize, Serialize};
use tracing::debug;

use super::cpmm::{self, Reserves, TradeQuote};
use super::fixed::{Amount, Ray, RAY};
use crate::errors::{MarketError, MarketResult};
use crate::oracle::{OracleRecord, OracleResult};
use crate::shares::{PayoutRule, Position, ShareBook, ShareCredit, Side};

// Binary prediction market: one question, one curve, one settlement
//
// Lifecycle: Open → Expired (at resolve time) → Settled (oracle result)
// Settled is final; every guard fails without mutating.

/// Stored lifecycle state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketState {
    Open,
    Expired,
    Settled {
        result: OracleResult,
        settled_at: u64,
        payout: PayoutRule,
    },
}

/// Lifecycle phase as observed at a given time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
    Open,
    Expired,
    Settled,
}

impl MarketStatus {
    pub fn is_trading_open(&self) -> bool {
        matches!(self, MarketStatus::Open)
    }
}

/// A buy against one market's curve
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRequest {
    pub side: Side,
    pub amount_in: Amount,
    pub min_out: Amount,
    /// Account debited for `amount_in`
    pub payer: String,
    /// Account credited with the shares
    pub recipient: String,
}

/// A buy validated against the current curve and share book.
/// Committing it cannot fail while the market's write lock is held.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTrade {
    pub quote: TradeQuote,
    credit: ShareCredit,
    volume_after: Amount,
    trade_count_after: u64,
}

/// Read-only market view (getMarketInfo)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketInfo {
    pub id: String,
    pub question: String,
    pub resolve_timestamp: u64,
    pub status: MarketStatus,
    pub settled: bool,
    pub result: Option<OracleResult>,
    pub total_yes: Amount,
    pub total_no: Amount,
    pub reserve_yes: Amount,
    pub reserve_no: Amount,
    pub price_yes: Ray,
    pub volume: Amount,
    pub trade_count: u64,
    pub created_at: u64,
    pub creator: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: String,
    pub question: String,
    pub resolve_timestamp: u64,
    pub created_at: u64,
    pub creator: String,
    state: MarketState,
    reserves: Reserves,
    shares: ShareBook,
    volume: Amount,
    trade_count: u64,
}

impl Market {
    /// New open market whose curve starts at (seed, seed)
    pub fn new(
        id: &str,
        question: &str,
        resolve_timestamp: u64,
        created_at: u64,
        creator: &str,
        seed: Amount,
    ) -> Self {
        Self {
            id: id.to_string(),
            question: question.to_string(),
            resolve_timestamp,
            created_at,
            creator: creator.to_string(),
            state: MarketState::Open,
            reserves: Reserves::balanced(seed),
            shares: ShareBook::new(),
            volume: 0,
            trade_count: 0,
        }
    }

    pub fn state(&self) -> &MarketState {
        &self.state
    }

    pub fn status(&self, now: u64) -> MarketStatus {
        match self.state {
            MarketState::Settled { .. } => MarketStatus::Settled,
            MarketState::Expired => MarketStatus::Expired,
            MarketState::Open if now >= self.resolve_timestamp => MarketStatus::Expired,
            MarketState::Open => MarketStatus::Open,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self.state, MarketState::Settled { .. })
    }

    pub fn result(&self) -> Option<OracleResult> {
        match self.state {
            MarketState::Settled { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn payout_rule(&self) -> Option<PayoutRule> {
        match self.state {
            MarketState::Settled { payout, .. } => Some(payout),
            _ => None,
        }
    }

    pub fn reserves(&self) -> Reserves {
        self.reserves
    }

    pub fn outstanding(&self, side: Side) -> Amount {
        self.shares.outstanding(side)
    }

    pub fn position(&self, account: &str) -> Position {
        self.shares.position(account)
    }

    pub fn holders(&self) -> usize {
        self.shares.holders()
    }

    /// Price(YES) in ray. Fixed by the payout rule once settled.
    pub fn price_yes(&self) -> MarketResult<Ray> {
        match self.payout_rule() {
            Some(PayoutRule::Winner { side: Side::Yes }) => Ok(RAY),
            Some(PayoutRule::Winner { side: Side::No }) => Ok(0),
            Some(PayoutRule::ProRata { yes_price, .. }) => Ok(yes_price),
            None => cpmm::price_yes(&self.reserves),
        }
    }

    pub fn price_no(&self) -> MarketResult<Ray> {
        Ok(RAY - self.price_yes()?)
    }

    /// Promote Open to Expired once the deadline has passed
    pub fn observe(&mut self, now: u64) {
        if self.state == MarketState::Open && now >= self.resolve_timestamp {
            debug!("⏰ Market {} expired at {}", self.id, self.resolve_timestamp);
            self.state = MarketState::Expired;
        }
    }

    fn ensure_open(&self, now: u64) -> MarketResult<()> {
        match self.status(now) {
            MarketStatus::Open => Ok(()),
            _ => Err(MarketError::MarketExpired(self.id.clone())),
        }
    }

    /// Quote a buy without changing anything
    pub fn quote(&self, side: Side, amount_in: Amount, now: u64) -> MarketResult<TradeQuote> {
        self.ensure_open(now)?;
        cpmm::quote_buy(&self.reserves, side, amount_in)
    }

    /// Validate a buy without mutating anything; pair with `apply_trade`
    /// under the same write guard once collateral is locked.
    pub fn prepare_trade(&self, request: &TradeRequest, now: u64) -> MarketResult<PreparedTrade> {
        let quote = self.quote(request.side, request.amount_in, now)?;
        if quote.amount_out < request.min_out {
            return Err(MarketError::SlippageExceeded {
                quoted: quote.amount_out,
                min_out: request.min_out,
            });
        }
        let credit = self.shares.plan_credit(&request.recipient, request.side, quote.amount_out)?;
        let volume_after = self
            .volume
            .checked_add(request.amount_in)
            .ok_or_else(|| MarketError::InvalidTrade("volume overflow".to_string()))?;
        let trade_count_after = self
            .trade_count
            .checked_add(1)
            .ok_or_else(|| MarketError::InvalidTrade("trade count overflow".to_string()))?;
        Ok(PreparedTrade {
            quote,
            credit,
            volume_after,
            trade_count_after,
        })
    }

    /// Mint the prepared shares and move the curve
    pub fn apply_trade(&mut self, prepared: PreparedTrade) -> TradeQuote {
        debug_assert_eq!(self.reserves, prepared.quote.reserves_before);
        self.shares.commit(prepared.credit);
        self.reserves = prepared.quote.reserves_after;
        self.volume = prepared.volume_after;
        self.trade_count = prepared.trade_count_after;
        prepared.quote
    }

    /// Collateral the outstanding shares can claim: the larger side while
    /// unsettled, the payout rule's bound once settled
    pub fn owed(&self) -> MarketResult<Amount> {
        let yes = self.outstanding(Side::Yes);
        let no = self.outstanding(Side::No);
        match self.payout_rule() {
            Some(rule) => rule.owed(yes, no),
            None => Ok(yes.max(no)),
        }
    }

    /// Collateral owed if the side currently priced at or above 50% wins
    pub fn owed_to_best_guess(&self) -> MarketResult<(Side, Amount)> {
        let side = if self.price_yes()? >= RAY / 2 { Side::Yes } else { Side::No };
        Ok((side, self.outstanding(side)))
    }

    /// Expired → Settled against an oracle record.
    ///
    /// Fails without mutating on every guard; on success the result is final.
    pub fn settle(
        &mut self,
        record: Option<&OracleRecord>,
        collateral_locked: Amount,
        now: u64,
    ) -> MarketResult<PayoutRule> {
        match self.status(now) {
            MarketStatus::Settled => return Err(MarketError::AlreadySettled(self.id.clone())),
            MarketStatus::Open => return Err(MarketError::MarketNotExpired(self.id.clone())),
            MarketStatus::Expired => {}
        }
        let record = record.ok_or_else(|| MarketError::ResultNotAvailable(self.id.clone()))?;

        let rule = PayoutRule::for_result(record.result, cpmm::price_yes(&self.reserves)?);
        let yes = self.outstanding(Side::Yes);
        let no = self.outstanding(Side::No);
        let owed = rule.owed(yes, no)?;
        if collateral_locked < owed || collateral_locked < yes.min(no) {
            return Err(MarketError::PoolUnderfunded(format!(
                "market {} locks {} but owes {}",
                self.id, collateral_locked, owed
            )));
        }

        self.state = MarketState::Settled {
            result: record.result,
            settled_at: now,
            payout: rule,
        };
        Ok(rule)
    }

    /// Shares `account` would burn and the collateral it would receive
    pub fn preview_redemption(&self, account: &str) -> MarketResult<(Position, Amount)> {
        let rule = self
            .payout_rule()
            .ok_or_else(|| MarketError::MarketNotSettled(self.id.clone()))?;
        let position = self.shares.position(account);
        Ok((position, rule.payout(&position)?))
    }

    /// Burn every share `account` holds
    pub fn apply_redemption(&mut self, account: &str) -> Position {
        self.shares.burn_all(account)
    }

    pub fn info(&self, now: u64) -> MarketResult<MarketInfo> {
        Ok(MarketInfo {
            id: self.id.clone(),
            question: self.question.clone(),
            resolve_timestamp: self.resolve_timestamp,
            status: self.status(now),
            settled: self.is_settled(),
            result: self.result(),
            total_yes: self.outstanding(Side::Yes),
            total_no: self.outstanding(Side::No),
            reserve_yes: self.reserves.yes,
            reserve_no: self.reserves.no,
            price_yes: self.price_yes()?,
            volume: self.volume,
            trade_count: self.trade_count,
            created_at: self.created_at,
            creator: self.creator.clone(),
        })
    }
}
