// ============================================================================
// Oracle Module - authoritative, write-once market results
// ============================================================================
//
// Reporters publish one result per market once its resolve time has passed.
// A published record never changes; markets settle against it.
//
// Flow: factory registers deadline → reporter publishes at/after deadline
//       → market.settle() reads the record
// ============================================================================

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::info;

use crate::errors::{MarketError, MarketResult};

/// Result reported for a binary market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleResult {
    Yes,
    No,
    /// The question could not be resolved; holders are refunded pro rata
    Invalid,
}

impl fmt::Display for OracleResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OracleResult::Yes => "YES",
            OracleResult::No => "NO",
            OracleResult::Invalid => "INVALID",
        };
        write!(f, "{}", label)
    }
}

impl std::str::FromStr for OracleResult {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yes" => Ok(OracleResult::Yes),
            "no" => Ok(OracleResult::No),
            "invalid" => Ok(OracleResult::Invalid),
            other => Err(MarketError::InvalidTrade(format!("unknown oracle result: {}", other))),
        }
    }
}

/// Published result for one market
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleRecord {
    pub market_id: String,
    pub result: OracleResult,
    pub published_at: u64,
    pub reporter: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleModule {
    admin: String,
    reporters: BTreeSet<String>,
    /// market_id -> resolve timestamp
    deadlines: BTreeMap<String, u64>,
    records: BTreeMap<String, OracleRecord>,
}

impl OracleModule {
    pub fn new(admin: &str) -> Self {
        let mut reporters = BTreeSet::new();
        reporters.insert(admin.to_string());
        Self {
            admin: admin.to_string(),
            reporters,
            deadlines: BTreeMap::new(),
            records: BTreeMap::new(),
        }
    }

    pub fn is_reporter(&self, account: &str) -> bool {
        self.reporters.contains(account)
    }

    pub fn grant_reporter(&mut self, caller: &str, account: &str) -> MarketResult<()> {
        self.require_admin(caller)?;
        self.reporters.insert(account.to_string());
        info!("🔑 Reporter role granted to {}", account);
        Ok(())
    }

    pub fn revoke_reporter(&mut self, caller: &str, account: &str) -> MarketResult<()> {
        self.require_admin(caller)?;
        self.reporters.remove(account);
        info!("🔒 Reporter role revoked from {}", account);
        Ok(())
    }

    /// Track a market's deadline so early reports can be refused
    pub fn register_market(&mut self, market_id: &str, resolve_timestamp: u64) {
        self.deadlines.insert(market_id.to_string(), resolve_timestamp);
    }

    pub fn is_registered(&self, market_id: &str) -> bool {
        self.deadlines.contains_key(market_id)
    }

    /// Record the result for a market; write-once
    pub fn publish_result(
        &mut self,
        caller: &str,
        market_id: &str,
        result: OracleResult,
        now: u64,
    ) -> MarketResult<OracleRecord> {
        if !self.is_reporter(caller) {
            return Err(MarketError::Unauthorized(format!("{} is not an oracle reporter", caller)));
        }
        let resolve_timestamp = *self
            .deadlines
            .get(market_id)
            .ok_or_else(|| MarketError::MarketNotFound(market_id.to_string()))?;
        if now < resolve_timestamp {
            return Err(MarketError::TooEarly {
                market_id: market_id.to_string(),
                resolve_timestamp,
                now,
            });
        }
        if self.records.contains_key(market_id) {
            return Err(MarketError::AlreadyPublished(market_id.to_string()));
        }

        let record = OracleRecord {
            market_id: market_id.to_string(),
            result,
            published_at: now,
            reporter: caller.to_string(),
        };
        self.records.insert(market_id.to_string(), record.clone());

        info!("🔮 Oracle: {} reported {} for market {}", caller, result, market_id);
        Ok(record)
    }

    pub fn get_result(&self, market_id: &str) -> Option<&OracleRecord> {
        self.records.get(market_id)
    }

    fn require_admin(&self, caller: &str) -> MarketResult<()> {
        if caller != self.admin {
            return Err(MarketError::Unauthorized(format!("{} is not the oracle admin", caller)));
        }
        Ok(())
    }
}
