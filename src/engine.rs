// ============================================================================
// Engine - process-wide coordinator for ledger, pool, oracle and markets
// ============================================================================
//
// Locks (always taken in this order, never the reverse):
//   registry → market → custody (ledger + pool) → oracle
//
// buy / settle / redeem hold the market's write lock for their whole run;
// price and info reads take its read lock. The ledger and pool share one
// lock so a collateral debit and its pool partition update are never seen
// apart.
// ============================================================================

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::info;

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::errors::{MarketError, MarketResult};
use crate::factory::{MarketFactory, MarketIdCursor, SharedMarket};
use crate::ledger::{CollateralLedger, LedgerStats, Transaction};
use crate::locks;
use crate::market_resolve::{Amount, LiquidityPool, MarketInfo, Ray, TradeQuote, TradeRequest};
use crate::oracle::{OracleModule, OracleRecord, OracleResult};
use crate::shares::{PayoutRule, Position, Redemption, Side};
use crate::snapshot::{EngineSnapshot, SNAPSHOT_VERSION};

/// Ledger and pool, locked together
#[derive(Debug)]
pub struct Custody {
    pub ledger: CollateralLedger,
    pub pool: LiquidityPool,
}

/// Per-market pool view: curve reserves plus locked collateral
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolReserve {
    pub reserve_yes: Amount,
    pub reserve_no: Amount,
    pub collateral_locked: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolvencyReport {
    pub market_id: String,
    pub collateral_locked: Amount,
    pub outstanding_yes: Amount,
    pub outstanding_no: Amount,
    /// Side currently priced at or above 50%
    pub best_guess: Side,
    pub owed_to_best_guess: Amount,
    /// Worst case over every possible result
    pub owed: Amount,
    pub solvent: bool,
}

/// Outcome of a successful settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub market_id: String,
    pub result: OracleResult,
    pub payout: PayoutRule,
    pub settled_at: u64,
}

pub struct Engine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    registry: Arc<RwLock<MarketFactory>>,
    custody: RwLock<Custody>,
    oracle: RwLock<OracleModule>,
}

impl Engine {
    /// Fresh engine: empty registry, genesis liquidity minted into the pool
    pub fn new(config: EngineConfig, clock: Arc<dyn Clock>) -> MarketResult<Self> {
        let mut ledger = CollateralLedger::new(&config.collateral_symbol, config.collateral_decimals, &config.admin);
        let mut pool = LiquidityPool::new(&config.pool_account);

        if config.genesis_pool_liquidity > 0 {
            ledger.mint(&config.admin, &config.pool_account, config.genesis_pool_liquidity)?;
            pool.add_genesis_liquidity(config.genesis_pool_liquidity)?;
            info!("🌱 Genesis liquidity: {} {}", config.genesis_pool_liquidity, config.collateral_symbol);
        }

        let oracle = OracleModule::new(&config.admin);
        info!("🚀 Market engine ready (admin {}, pool {})", config.admin, config.pool_account);

        Ok(Self {
            config,
            clock,
            registry: Arc::new(RwLock::new(MarketFactory::new())),
            custody: RwLock::new(Custody { ledger, pool }),
            oracle: RwLock::new(oracle),
        })
    }

    /// Rebuild an engine from a snapshot, checking pool custody against the ledger
    pub fn from_snapshot(config: EngineConfig, clock: Arc<dyn Clock>, snapshot: EngineSnapshot) -> MarketResult<Self> {
        let EngineSnapshot { ledger, pool, oracle, markets, factory_nonce, .. } = snapshot;

        let held = ledger.balance_of(pool.account());
        if held != pool.total_custody() {
            return Err(MarketError::Persistence(format!(
                "pool account holds {} but pool accounts for {}",
                held,
                pool.total_custody()
            )));
        }
        if let Some(orphan) = markets.iter().find(|m| pool.reserve_of(&m.id).is_none()) {
            return Err(MarketError::Persistence(format!("market {} has no pool partition", orphan.id)));
        }

        Ok(Self {
            config,
            clock,
            registry: Arc::new(RwLock::new(MarketFactory::from_markets(markets, factory_nonce))),
            custody: RwLock::new(Custody { ledger, pool }),
            oracle: RwLock::new(oracle),
        })
    }

    pub fn load_from_path(path: &Path, config: EngineConfig, clock: Arc<dyn Clock>) -> MarketResult<Self> {
        Self::from_snapshot(config, clock, EngineSnapshot::load(path)?)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    // ========================================================================
    // FACTORY
    // ========================================================================

    /// createMarket: seeds the curve from free pool liquidity
    pub fn create_market(&self, creator: &str, question: &str, resolve_timestamp: u64) -> MarketResult<String> {
        let now = self.now();
        let mut registry = locks::write(&self.registry);
        let mut custody = locks::write(&self.custody);
        let mut oracle = locks::write(&self.oracle);

        registry.create_market(
            &mut custody.pool,
            &mut oracle,
            creator,
            question,
            resolve_timestamp,
            self.config.seed_liquidity,
            now,
        )
    }

    /// getMarkets: lazy, restartable cursor in creation order
    pub fn list_markets(&self) -> MarketIdCursor {
        MarketIdCursor::new(Arc::clone(&self.registry))
    }

    pub fn market_count(&self) -> usize {
        locks::read(&self.registry).len()
    }

    fn market(&self, market_id: &str) -> MarketResult<SharedMarket> {
        locks::read(&self.registry)
            .get(market_id)
            .ok_or_else(|| MarketError::MarketNotFound(market_id.to_string()))
    }

    // ========================================================================
    // QUOTES & READS
    // ========================================================================

    pub fn get_market_info(&self, market_id: &str) -> MarketResult<MarketInfo> {
        let market = self.market(market_id)?;
        let info = locks::read(&market).info(self.now());
        info
    }

    pub fn get_price_yes(&self, market_id: &str) -> MarketResult<Ray> {
        let market = self.market(market_id)?;
        let price = locks::read(&market).price_yes();
        price
    }

    pub fn get_price_no(&self, market_id: &str) -> MarketResult<Ray> {
        let market = self.market(market_id)?;
        let price = locks::read(&market).price_no();
        price
    }

    pub fn quote(&self, market_id: &str, side: Side, amount_in: Amount) -> MarketResult<TradeQuote> {
        let market = self.market(market_id)?;
        let quote = locks::read(&market).quote(side, amount_in, self.now());
        quote
    }

    pub fn position(&self, market_id: &str, account: &str) -> MarketResult<Position> {
        let market = self.market(market_id)?;
        let position = locks::read(&market).position(account);
        Ok(position)
    }

    /// reserveOf: curve reserves from the market, locked collateral from the pool
    pub fn reserve_of(&self, market_id: &str) -> MarketResult<PoolReserve> {
        let market = self.market(market_id)?;
        let market = locks::read(&market);
        let custody = locks::read(&self.custody);
        let partition = custody
            .pool
            .reserve_of(market_id)
            .ok_or_else(|| MarketError::MarketNotFound(market_id.to_string()))?;

        let reserves = market.reserves();
        Ok(PoolReserve {
            reserve_yes: reserves.yes,
            reserve_no: reserves.no,
            collateral_locked: partition.collateral_locked,
        })
    }

    pub fn solvency(&self, market_id: &str) -> MarketResult<SolvencyReport> {
        let market = self.market(market_id)?;
        let market = locks::read(&market);
        let custody = locks::read(&self.custody);
        let collateral_locked = custody
            .pool
            .reserve_of(market_id)
            .map(|p| p.collateral_locked)
            .ok_or_else(|| MarketError::MarketNotFound(market_id.to_string()))?;

        let (best_guess, owed_to_best_guess) = market.owed_to_best_guess()?;
        let owed = market.owed()?;
        Ok(SolvencyReport {
            market_id: market_id.to_string(),
            collateral_locked,
            outstanding_yes: market.outstanding(Side::Yes),
            outstanding_no: market.outstanding(Side::No),
            best_guess,
            owed_to_best_guess,
            owed,
            solvent: collateral_locked >= owed && collateral_locked >= owed_to_best_guess,
        })
    }

    // ========================================================================
    // TRADING
    // ========================================================================

    /// Buy `side` shares; all or nothing
    pub fn trade(&self, market_id: &str, request: TradeRequest) -> MarketResult<TradeQuote> {
        let now = self.now();
        let market = self.market(market_id)?;
        let mut market = locks::write(&market);
        market.observe(now);

        let prepared = market.prepare_trade(&request, now)?;

        let mut custody = locks::write(&self.custody);
        let Custody { ledger, pool } = &mut *custody;
        ledger.ensure_balance(&request.payer, request.amount_in)?;
        pool.lock_collateral(ledger, market_id, &request.payer, request.amount_in)?;
        let quote = market.apply_trade(prepared);

        info!(
            "🎲 Trade: {} bought {} {} on {} for {} (recipient {}, price {} -> {})",
            request.payer,
            quote.amount_out,
            request.side,
            market_id,
            request.amount_in,
            request.recipient,
            quote.price_before,
            quote.price_after
        );
        Ok(quote)
    }

    /// buyYes: returns the quote the trade executed at
    pub fn buy_yes(
        &self,
        market_id: &str,
        payer: &str,
        amount_in: Amount,
        min_out: Amount,
        recipient: &str,
    ) -> MarketResult<TradeQuote> {
        self.trade(market_id, trade_request(Side::Yes, payer, amount_in, min_out, recipient))
    }

    /// buyNo: returns the quote the trade executed at
    pub fn buy_no(
        &self,
        market_id: &str,
        payer: &str,
        amount_in: Amount,
        min_out: Amount,
        recipient: &str,
    ) -> MarketResult<TradeQuote> {
        self.trade(market_id, trade_request(Side::No, payer, amount_in, min_out, recipient))
    }

    // ========================================================================
    // ORACLE, SETTLEMENT & REDEMPTION
    // ========================================================================

    pub fn publish_result(&self, caller: &str, market_id: &str, result: OracleResult) -> MarketResult<OracleRecord> {
        let now = self.now();
        locks::write(&self.oracle).publish_result(caller, market_id, result, now)
    }

    pub fn get_result(&self, market_id: &str) -> Option<OracleRecord> {
        locks::read(&self.oracle).get_result(market_id).cloned()
    }

    pub fn grant_reporter(&self, caller: &str, account: &str) -> MarketResult<()> {
        locks::write(&self.oracle).grant_reporter(caller, account)
    }

    pub fn revoke_reporter(&self, caller: &str, account: &str) -> MarketResult<()> {
        locks::write(&self.oracle).revoke_reporter(caller, account)
    }

    /// Expired → Settled against the published oracle result
    pub fn settle(&self, market_id: &str) -> MarketResult<Settlement> {
        let now = self.now();
        let market = self.market(market_id)?;
        let mut market = locks::write(&market);
        market.observe(now);

        let custody = locks::read(&self.custody);
        let collateral_locked = custody
            .pool
            .reserve_of(market_id)
            .map(|p| p.collateral_locked)
            .ok_or_else(|| MarketError::MarketNotFound(market_id.to_string()))?;
        let oracle = locks::read(&self.oracle);
        let record = oracle.get_result(market_id);

        let payout = market.settle(record, collateral_locked, now)?;
        let result = market.result().ok_or_else(|| MarketError::MarketNotSettled(market_id.to_string()))?;

        info!("⚖️ Market {} settled: {} ({:?})", market_id, result, payout);
        Ok(Settlement {
            market_id: market_id.to_string(),
            result,
            payout,
            settled_at: now,
        })
    }

    /// Burn every share `account` holds and pay out; repeat calls pay zero
    pub fn redeem(&self, market_id: &str, account: &str) -> MarketResult<Redemption> {
        let market = self.market(market_id)?;
        let mut market = locks::write(&market);
        let (position, payout) = market.preview_redemption(account)?;

        let mut custody = locks::write(&self.custody);
        let Custody { ledger, pool } = &mut *custody;
        pool.release_collateral(ledger, market_id, account, payout)?;
        market.apply_redemption(account);

        if !position.is_empty() {
            info!(
                "💰 Redeem: {} burned {} YES / {} NO on {} for {}",
                account, position.yes, position.no, market_id, payout
            );
        }
        Ok(Redemption {
            market_id: market_id.to_string(),
            account: account.to_string(),
            yes_burned: position.yes,
            no_burned: position.no,
            payout,
        })
    }

    /// Return a settled market's surplus collateral to free liquidity (admin only)
    pub fn reclaim_residual(&self, caller: &str, market_id: &str) -> MarketResult<Amount> {
        if caller != self.config.admin {
            return Err(MarketError::Unauthorized(format!("{} is not the pool admin", caller)));
        }
        let market = self.market(market_id)?;
        let market = locks::read(&market);
        if !market.is_settled() {
            return Err(MarketError::MarketNotSettled(market_id.to_string()));
        }
        let owed = market.owed()?;

        let mut custody = locks::write(&self.custody);
        let locked = custody
            .pool
            .reserve_of(market_id)
            .map(|p| p.collateral_locked)
            .ok_or_else(|| MarketError::MarketNotFound(market_id.to_string()))?;
        let residual = locked.saturating_sub(owed);
        if residual > 0 {
            custody.pool.reclaim(market_id, residual)?;
        }
        Ok(residual)
    }

    // ========================================================================
    // COLLATERAL LEDGER
    // ========================================================================

    pub fn balance_of(&self, account: &str) -> Amount {
        locks::read(&self.custody).ledger.balance_of(account)
    }

    pub fn total_supply(&self) -> Amount {
        locks::read(&self.custody).ledger.total_supply()
    }

    pub fn mint(&self, caller: &str, account: &str, amount: Amount) -> MarketResult<Amount> {
        locks::write(&self.custody).ledger.mint(caller, account, amount)
    }

    pub fn burn(&self, caller: &str, account: &str, amount: Amount) -> MarketResult<Amount> {
        locks::write(&self.custody).ledger.burn(caller, account, amount)
    }

    pub fn transfer(&self, from: &str, to: &str, amount: Amount) -> MarketResult<()> {
        locks::write(&self.custody).ledger.transfer(from, to, amount)
    }

    pub fn grant_minter(&self, caller: &str, account: &str) -> MarketResult<()> {
        locks::write(&self.custody).ledger.grant_minter(caller, account)
    }

    pub fn transactions_for(&self, account: &str) -> Vec<Transaction> {
        let custody = locks::read(&self.custody);
        custody.ledger.transactions_for(account).into_iter().cloned().collect()
    }

    pub fn ledger_stats(&self) -> LedgerStats {
        locks::read(&self.custody).ledger.stats()
    }

    // ========================================================================
    // LIQUIDITY
    // ========================================================================

    pub fn deposit_liquidity(&self, provider: &str, amount: Amount) -> MarketResult<Amount> {
        let mut custody = locks::write(&self.custody);
        let Custody { ledger, pool } = &mut *custody;
        pool.deposit_liquidity(ledger, provider, amount)
    }

    pub fn withdraw_liquidity(&self, provider: &str, amount: Amount) -> MarketResult<Amount> {
        let mut custody = locks::write(&self.custody);
        let Custody { ledger, pool } = &mut *custody;
        pool.withdraw_liquidity(ledger, provider, amount)
    }

    pub fn free_liquidity(&self) -> Amount {
        locks::read(&self.custody).pool.free_liquidity()
    }

    // ========================================================================
    // PERSISTENCE
    // ========================================================================

    /// Consistent copy of the whole engine
    pub fn snapshot(&self) -> EngineSnapshot {
        let registry = locks::read(&self.registry);
        let handles = registry.markets();
        let guards: Vec<_> = handles.iter().map(|m| locks::read(m)).collect();
        let custody = locks::read(&self.custody);
        let oracle = locks::read(&self.oracle);

        EngineSnapshot {
            version: SNAPSHOT_VERSION,
            taken_at: self.now(),
            ledger: custody.ledger.clone(),
            pool: custody.pool.clone(),
            oracle: oracle.clone(),
            markets: guards.iter().map(|m| (**m).clone()).collect(),
            factory_nonce: registry.nonce(),
        }
    }

    pub fn save_to_path(&self, path: &Path) -> MarketResult<()> {
        self.snapshot().save(path)
    }
}

fn trade_request(side: Side, payer: &str, amount_in: Amount, min_out: Amount, recipient: &str) -> TradeRequest {
    TradeRequest {
        side,
        amount_in,
        min_out,
        payer: payer.to_string(),
        recipient: recipient.to_string(),
    }
}
