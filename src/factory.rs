// ============================================================================
// Market Factory - market creation and the creation-ordered registry
// ============================================================================
//
// Creating a market:
//   1. validate question + resolve time
//   2. derive an address-like id from (nonce, question, resolve time)
//   3. seed the market's pool partition from free liquidity
//   4. register the deadline with the oracle
//   5. append to the registry
//
// Steps 1-3 can fail; nothing is written until all of them have passed.
// ============================================================================

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::info;

use crate::errors::{MarketError, MarketResult};
use crate::locks;
use crate::market_resolve::{Amount, LiquidityPool, Market};
use crate::oracle::OracleModule;

pub type SharedMarket = Arc<RwLock<Market>>;

const MAX_QUESTION_LEN: usize = 512;

#[derive(Debug, Default)]
pub struct MarketFactory {
    /// Market ids in creation order
    order: Vec<String>,
    markets: HashMap<String, SharedMarket>,
    nonce: u64,
}

/// Address-like market id: 0x + first 20 bytes of sha256(nonce | question | resolve time)
pub fn derive_market_id(nonce: u64, question: &str, resolve_timestamp: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(nonce.to_be_bytes());
    hasher.update(question.as_bytes());
    hasher.update(resolve_timestamp.to_be_bytes());
    let digest = hasher.finalize();
    format!("0x{}", hex::encode(&digest[..20]))
}

impl MarketFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from markets listed in creation order
    pub fn from_markets(markets: Vec<Market>, nonce: u64) -> Self {
        let mut factory = Self { nonce, ..Self::default() };
        for market in markets {
            factory.insert(market);
        }
        factory
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, market_id: &str) -> Option<SharedMarket> {
        self.markets.get(market_id).cloned()
    }

    pub fn id_at(&self, index: usize) -> Option<String> {
        self.order.get(index).cloned()
    }

    pub fn ids(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Handles to every market, in creation order
    pub fn markets(&self) -> Vec<SharedMarket> {
        self.order
            .iter()
            .filter_map(|id| self.markets.get(id).cloned())
            .collect()
    }

    /// Create, seed and register a new market; returns its id
    #[allow(clippy::too_many_arguments)]
    pub fn create_market(
        &mut self,
        pool: &mut LiquidityPool,
        oracle: &mut OracleModule,
        creator: &str,
        question: &str,
        resolve_timestamp: u64,
        seed: Amount,
        now: u64,
    ) -> MarketResult<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(MarketError::InvalidQuestion("question must not be blank".to_string()));
        }
        if question.len() > MAX_QUESTION_LEN {
            return Err(MarketError::InvalidQuestion(format!(
                "question longer than {} bytes",
                MAX_QUESTION_LEN
            )));
        }
        if resolve_timestamp <= now {
            return Err(MarketError::InvalidResolveTime { resolve_timestamp, now });
        }
        if seed == 0 {
            return Err(MarketError::InvalidAmount("seed liquidity must be positive".to_string()));
        }

        let mut nonce = self.nonce;
        let mut market_id = derive_market_id(nonce, question, resolve_timestamp);
        while self.markets.contains_key(&market_id) {
            nonce += 1;
            market_id = derive_market_id(nonce, question, resolve_timestamp);
        }

        pool.open_market(&market_id, seed)?;
        oracle.register_market(&market_id, resolve_timestamp);

        self.nonce = nonce + 1;
        self.insert(Market::new(&market_id, question, resolve_timestamp, now, creator, seed));

        info!(
            "🎯 Market created: {} \"{}\" (resolves {}, seed {})",
            market_id, question, resolve_timestamp, seed
        );
        Ok(market_id)
    }

    fn insert(&mut self, market: Market) {
        let id = market.id.clone();
        self.order.push(id.clone());
        self.markets.insert(id, Arc::new(RwLock::new(market)));
    }
}

// ============================================================================
// CURSOR
// ============================================================================

/// Lazy cursor over market ids in creation order.
///
/// Reads the registry one step at a time, so markets created after the cursor
/// was made are still visited. `restart` rewinds to the first market.
#[derive(Debug, Clone)]
pub struct MarketIdCursor {
    registry: Arc<RwLock<MarketFactory>>,
    position: usize,
}

impl MarketIdCursor {
    pub fn new(registry: Arc<RwLock<MarketFactory>>) -> Self {
        Self { registry, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn restart(&mut self) {
        self.position = 0;
    }
}

impl Iterator for MarketIdCursor {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let id = locks::read(&self.registry).id_at(self.position)?;
        self.position += 1;
        Some(id)
    }
}
