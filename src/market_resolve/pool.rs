// ============================================================================
// Liquidity Pool - shared collateral custody, partitioned per market
// ============================================================================
//
// All pooled collateral sits in a single ledger account. The pool's own
// bookkeeping splits that balance into:
//   - free liquidity: deposited by providers, not yet backing any market
//   - per-market partitions: seed liquidity plus every trader's collateral
//
// Releases are bounded by the market's own partition, so one market can never
// pay out another market's collateral.
//
// INVARIANT: ledger.balance_of(pool account) == free + sum(partitions)
//
// ============================================================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::fixed::Amount;
use crate::errors::{MarketError, MarketResult};
use crate::ledger::CollateralLedger;

/// Collateral held for a single market
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketCustody {
    /// Collateral currently backing this market
    pub collateral_locked: Amount,
    /// Seed liquidity allocated at creation
    pub seed: Amount,
    /// Total trader collateral ever locked
    pub total_locked_in: Amount,
    /// Total collateral ever released to traders
    pub total_released: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidityPool {
    account: String,
    free_liquidity: Amount,
    providers: BTreeMap<String, Amount>,
    markets: BTreeMap<String, MarketCustody>,
}

impl LiquidityPool {
    pub fn new(account: &str) -> Self {
        Self {
            account: account.to_string(),
            free_liquidity: 0,
            providers: BTreeMap::new(),
            markets: BTreeMap::new(),
        }
    }

    /// Ledger account that custodies pooled collateral
    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn free_liquidity(&self) -> Amount {
        self.free_liquidity
    }

    pub fn provided_by(&self, provider: &str) -> Amount {
        self.providers.get(provider).copied().unwrap_or(0)
    }

    pub fn reserve_of(&self, market_id: &str) -> Option<&MarketCustody> {
        self.markets.get(market_id)
    }

    /// Sum of free liquidity and every partition; equals the ledger balance
    pub fn total_custody(&self) -> Amount {
        self.markets
            .values()
            .fold(self.free_liquidity, |acc, m| acc.saturating_add(m.collateral_locked))
    }

    /// Provider moves collateral into free liquidity
    pub fn deposit_liquidity(
        &mut self,
        ledger: &mut CollateralLedger,
        provider: &str,
        amount: Amount,
    ) -> MarketResult<Amount> {
        let free = self.free_liquidity.checked_add(amount).ok_or_else(overflow)?;
        let provided = self.provided_by(provider).checked_add(amount).ok_or_else(overflow)?;

        ledger.transfer(provider, &self.account, amount)?;
        self.free_liquidity = free;
        self.providers.insert(provider.to_string(), provided);

        info!("🏦 Liquidity: {} deposited {} (free {})", provider, amount, self.free_liquidity);
        Ok(provided)
    }

    /// Provider withdraws up to their own contribution from free liquidity
    pub fn withdraw_liquidity(
        &mut self,
        ledger: &mut CollateralLedger,
        provider: &str,
        amount: Amount,
    ) -> MarketResult<Amount> {
        let provided = self.provided_by(provider);
        if amount > provided {
            return Err(MarketError::InsufficientBalance { available: provided, required: amount });
        }
        if amount > self.free_liquidity {
            return Err(MarketError::PoolUnderfunded(format!(
                "free liquidity {} < requested {}",
                self.free_liquidity, amount
            )));
        }

        ledger.transfer(&self.account, provider, amount)?;
        self.free_liquidity -= amount;
        let remaining = provided - amount;
        if remaining == 0 {
            self.providers.remove(provider);
        } else {
            self.providers.insert(provider.to_string(), remaining);
        }

        info!("🏦 Liquidity: {} withdrew {} (free {})", provider, amount, self.free_liquidity);
        Ok(remaining)
    }

    /// Credit free liquidity for collateral already sitting in the pool account
    pub fn add_genesis_liquidity(&mut self, amount: Amount) -> MarketResult<()> {
        self.free_liquidity = self.free_liquidity.checked_add(amount).ok_or_else(overflow)?;
        Ok(())
    }

    /// Fails unless a new market can be seeded with `seed`
    pub fn ensure_can_open(&self, market_id: &str, seed: Amount) -> MarketResult<()> {
        if self.markets.contains_key(market_id) {
            return Err(MarketError::InvalidTrade(format!("market {} already has custody", market_id)));
        }
        if seed > self.free_liquidity {
            return Err(MarketError::PoolUnderfunded(format!(
                "free liquidity {} < seed {}",
                self.free_liquidity, seed
            )));
        }
        Ok(())
    }

    /// Allocate seed liquidity from free balance into a new market partition
    pub fn open_market(&mut self, market_id: &str, seed: Amount) -> MarketResult<()> {
        self.ensure_can_open(market_id, seed)?;
        self.free_liquidity -= seed;
        self.markets.insert(
            market_id.to_string(),
            MarketCustody { collateral_locked: seed, seed, ..Default::default() },
        );
        debug!("🏦 Seeded market {} with {}", market_id, seed);
        Ok(())
    }

    /// Pull `amount` from `payer` into the market's partition
    pub fn lock_collateral(
        &mut self,
        ledger: &mut CollateralLedger,
        market_id: &str,
        payer: &str,
        amount: Amount,
    ) -> MarketResult<Amount> {
        let custody = self.custody(market_id)?;
        let locked = custody.collateral_locked.checked_add(amount).ok_or_else(overflow)?;
        let total_in = custody.total_locked_in.checked_add(amount).ok_or_else(overflow)?;

        ledger
            .transfer(payer, &self.account, amount)
            .map_err(|e| MarketError::PoolUnderfunded(format!("collateral transfer failed: {}", e)))?;

        let custody = self.custody_mut(market_id)?;
        custody.collateral_locked = locked;
        custody.total_locked_in = total_in;
        Ok(locked)
    }

    /// Pay `amount` out of the market's partition to `to`
    pub fn release_collateral(
        &mut self,
        ledger: &mut CollateralLedger,
        market_id: &str,
        to: &str,
        amount: Amount,
    ) -> MarketResult<Amount> {
        let custody = self.custody(market_id)?;
        if amount > custody.collateral_locked {
            return Err(MarketError::PoolUnderfunded(format!(
                "market {} holds {} < release {}",
                market_id, custody.collateral_locked, amount
            )));
        }
        if amount == 0 {
            return Ok(custody.collateral_locked);
        }

        ledger.transfer(&self.account, to, amount)?;

        let custody = self.custody_mut(market_id)?;
        custody.collateral_locked -= amount;
        custody.total_released += amount;
        Ok(custody.collateral_locked)
    }

    /// Return collateral a settled market no longer needs to free liquidity
    pub fn reclaim(&mut self, market_id: &str, amount: Amount) -> MarketResult<Amount> {
        let custody = self.custody(market_id)?;
        if amount > custody.collateral_locked {
            return Err(MarketError::PoolUnderfunded(format!(
                "market {} holds {} < reclaim {}",
                market_id, custody.collateral_locked, amount
            )));
        }
        let free = self.free_liquidity.checked_add(amount).ok_or_else(overflow)?;

        self.custody_mut(market_id)?.collateral_locked -= amount;
        self.free_liquidity = free;
        info!("🏦 Reclaimed {} from market {} (free {})", amount, market_id, self.free_liquidity);
        Ok(free)
    }

    fn custody(&self, market_id: &str) -> MarketResult<MarketCustody> {
        self.markets
            .get(market_id)
            .copied()
            .ok_or_else(|| MarketError::MarketNotFound(market_id.to_string()))
    }

    fn custody_mut(&mut self, market_id: &str) -> MarketResult<&mut MarketCustody> {
        self.markets
            .get_mut(market_id)
            .ok_or_else(|| MarketError::MarketNotFound(market_id.to_string()))
    }
}

fn overflow() -> MarketError {
    MarketError::InvalidAmount("pool amount overflow".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (CollateralLedger, LiquidityPool) {
        let mut ledger = CollateralLedger::new("uUSD", 18, "admin");
        ledger.mint("admin", "lp", 10_000).unwrap();
        ledger.mint("admin", "alice", 500).unwrap();
        (ledger, LiquidityPool::new("pool"))
    }

    #[test]
    fn test_deposit_and_open_market() {
        let (mut ledger, mut pool) = setup();
        pool.deposit_liquidity(&mut ledger, "lp", 5_000).unwrap();
        pool.open_market("m1", 1_000).unwrap();

        assert_eq!(pool.free_liquidity(), 4_000);
        assert_eq!(pool.reserve_of("m1").unwrap().collateral_locked, 1_000);
        assert_eq!(ledger.balance_of("pool"), pool.total_custody());
    }

    #[test]
    fn test_open_market_underfunded() {
        let (_, mut pool) = setup();
        assert!(matches!(pool.open_market("m1", 1), Err(MarketError::PoolUnderfunded(_))));
        assert!(pool.reserve_of("m1").is_none());
    }

    #[test]
    fn test_lock_failure_maps_to_underfunded() {
        let (mut ledger, mut pool) = setup();
        pool.deposit_liquidity(&mut ledger, "lp", 1_000).unwrap();
        pool.open_market("m1", 1_000).unwrap();

        let err = pool.lock_collateral(&mut ledger, "m1", "alice", 501).unwrap_err();
        assert!(matches!(err, MarketError::PoolUnderfunded(_)));
        assert_eq!(ledger.balance_of("alice"), 500);
        assert_eq!(pool.reserve_of("m1").unwrap().collateral_locked, 1_000);
    }

    #[test]
    fn test_markets_are_partitioned() {
        let (mut ledger, mut pool) = setup();
        pool.deposit_liquidity(&mut ledger, "lp", 2_000).unwrap();
        pool.open_market("m1", 1_000).unwrap();
        pool.open_market("m2", 1_000).unwrap();
        pool.lock_collateral(&mut ledger, "m1", "alice", 200).unwrap();

        // m2 cannot release more than its own partition
        let err = pool.release_collateral(&mut ledger, "m2", "alice", 1_100).unwrap_err();
        assert!(matches!(err, MarketError::PoolUnderfunded(_)));

        pool.release_collateral(&mut ledger, "m1", "alice", 1_200).unwrap();
        assert_eq!(pool.reserve_of("m1").unwrap().collateral_locked, 0);
        assert_eq!(pool.reserve_of("m2").unwrap().collateral_locked, 1_000);
        assert_eq!(ledger.balance_of("pool"), pool.total_custody());
    }

    #[test]
    fn test_withdraw_limited_to_contribution() {
        let (mut ledger, mut pool) = setup();
        ledger.mint("admin", "lp2", 100).unwrap();
        pool.deposit_liquidity(&mut ledger, "lp", 1_000).unwrap();
        pool.deposit_liquidity(&mut ledger, "lp2", 100).unwrap();

        assert!(matches!(
            pool.withdraw_liquidity(&mut ledger, "lp2", 101),
            Err(MarketError::InsufficientBalance { .. })
        ));

        pool.open_market("m1", 1_000).unwrap();
        assert!(matches!(
            pool.withdraw_liquidity(&mut ledger, "lp", 500),
            Err(MarketError::PoolUnderfunded(_))
        ));

        assert_eq!(pool.withdraw_liquidity(&mut ledger, "lp2", 100).unwrap(), 0);
        assert_eq!(ledger.balance_of("lp2"), 100);
    }

    #[test]
    fn test_reclaim_moves_to_free() {
        let (mut ledger, mut pool) = setup();
        pool.deposit_liquidity(&mut ledger, "lp", 1_000).unwrap();
        pool.open_market("m1", 1_000).unwrap();

        pool.reclaim("m1", 400).unwrap();
        assert_eq!(pool.free_liquidity(), 400);
        assert_eq!(pool.reserve_of("m1").unwrap().collateral_locked, 600);
        assert!(pool.reclaim("m1", 601).is_err());
        assert_eq!(ledger.balance_of("pool"), pool.total_custody());
    }
}
