/// Collateral Ledger
///
/// Fungible balance accounting for the collateral token (uUSD by default):
/// - Mint/burn restricted to the minter role
/// - Atomic transfers between accounts
/// - Journal of the most recent balance changes (bounded by JOURNAL_CAPACITY)
///
/// INVARIANT: sum(balances) == total_minted - total_burned

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, info};

use crate::errors::{MarketError, MarketResult};
use crate::market_resolve::fixed::Amount;

/// Journal entries kept in memory; older entries are dropped first
pub const JOURNAL_CAPACITY: usize = 10_000;

// ============================================================================
// TRANSACTIONS
// ============================================================================

/// Transaction types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TxType {
    Mint,
    Burn,
    Transfer,
}

/// A single journal entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub tx_type: TxType,
    pub from: Option<String>,
    pub to: Option<String>,
    pub amount: Amount,
    /// Position of this entry in the ledger's history
    pub block_number: u64,
}

impl Transaction {
    fn new(tx_type: TxType, from: Option<&str>, to: Option<&str>, amount: Amount, block_number: u64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tx_type,
            from: from.map(str::to_string),
            to: to.map(str::to_string),
            amount,
            block_number,
        }
    }
}

// ============================================================================
// LEDGER
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollateralLedger {
    pub symbol: String,
    pub decimals: u8,
    admin: String,
    minters: BTreeSet<String>,
    balances: BTreeMap<String, Amount>,
    total_minted: Amount,
    total_burned: Amount,
    transactions: VecDeque<Transaction>,
    block: u64,
}

impl CollateralLedger {
    /// Genesis: the admin starts out as the only minter
    pub fn new(symbol: &str, decimals: u8, admin: &str) -> Self {
        let mut minters = BTreeSet::new();
        minters.insert(admin.to_string());

        info!("📒 Collateral ledger initialized ({}, {} decimals, admin {})", symbol, decimals, admin);

        Self {
            symbol: symbol.to_string(),
            decimals,
            admin: admin.to_string(),
            minters,
            balances: BTreeMap::new(),
            total_minted: 0,
            total_burned: 0,
            transactions: VecDeque::new(),
            block: 0,
        }
    }

    pub fn admin(&self) -> &str {
        &self.admin
    }

    pub fn is_minter(&self, account: &str) -> bool {
        self.minters.contains(account)
    }

    pub fn grant_minter(&mut self, caller: &str, account: &str) -> MarketResult<()> {
        self.require_admin(caller)?;
        self.minters.insert(account.to_string());
        info!("🔑 Minter role granted to {}", account);
        Ok(())
    }

    pub fn revoke_minter(&mut self, caller: &str, account: &str) -> MarketResult<()> {
        self.require_admin(caller)?;
        self.minters.remove(account);
        info!("🔒 Minter role revoked from {}", account);
        Ok(())
    }

    pub fn balance_of(&self, account: &str) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> Amount {
        self.total_minted - self.total_burned
    }

    pub fn total_minted(&self) -> Amount {
        self.total_minted
    }

    pub fn total_burned(&self) -> Amount {
        self.total_burned
    }

    /// Fails unless `account` can pay `amount`
    pub fn ensure_balance(&self, account: &str, amount: Amount) -> MarketResult<()> {
        let available = self.balance_of(account);
        if available < amount {
            return Err(MarketError::InsufficientBalance { available, required: amount });
        }
        Ok(())
    }

    /// Create new collateral in `account`
    pub fn mint(&mut self, caller: &str, account: &str, amount: Amount) -> MarketResult<Amount> {
        self.require_minter(caller)?;
        require_positive(amount)?;

        let total_minted = self
            .total_minted
            .checked_add(amount)
            .ok_or_else(|| MarketError::InvalidAmount("total supply overflow".to_string()))?;
        let new_balance = self
            .balance_of(account)
            .checked_add(amount)
            .ok_or_else(|| MarketError::InvalidAmount("balance overflow".to_string()))?;

        self.total_minted = total_minted;
        self.balances.insert(account.to_string(), new_balance);
        self.record(TxType::Mint, None, Some(account), amount);

        info!("📥 Mint: {} received {} {}", account, amount, self.symbol);
        Ok(new_balance)
    }

    /// Destroy collateral held by `account`
    pub fn burn(&mut self, caller: &str, account: &str, amount: Amount) -> MarketResult<Amount> {
        self.require_minter(caller)?;
        require_positive(amount)?;
        self.ensure_balance(account, amount)?;

        let new_balance = self.balance_of(account) - amount;
        self.set_balance(account, new_balance);
        self.total_burned += amount;
        self.record(TxType::Burn, Some(account), None, amount);

        info!("🔥 Burn: {} destroyed {} {}", account, amount, self.symbol);
        Ok(new_balance)
    }

    /// Move collateral between accounts; all or nothing
    pub fn transfer(&mut self, from: &str, to: &str, amount: Amount) -> MarketResult<()> {
        require_positive(amount)?;
        self.ensure_balance(from, amount)?;

        if from != to {
            let credited = self
                .balance_of(to)
                .checked_add(amount)
                .ok_or_else(|| MarketError::InvalidAmount("balance overflow".to_string()))?;
            let debited = self.balance_of(from) - amount;
            self.set_balance(from, debited);
            self.balances.insert(to.to_string(), credited);
        }
        self.record(TxType::Transfer, Some(from), Some(to), amount);

        debug!("💸 Transfer: {} -> {} ({} {})", from, to, amount, self.symbol);
        Ok(())
    }

    /// Retained journal entries touching an account
    pub fn transactions_for(&self, account: &str) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|tx| tx.from.as_deref() == Some(account) || tx.to.as_deref() == Some(account))
            .collect()
    }

    /// Most recent journal entries, newest first
    pub fn recent_transactions(&self, limit: usize) -> Vec<&Transaction> {
        self.transactions.iter().rev().take(limit).collect()
    }

    pub fn block(&self) -> u64 {
        self.block
    }

    pub fn stats(&self) -> LedgerStats {
        LedgerStats {
            accounts: self.balances.len(),
            transactions: self.transactions.len(),
            block: self.block,
            total_supply: self.total_supply(),
            total_minted: self.total_minted,
            total_burned: self.total_burned,
        }
    }

    fn set_balance(&mut self, account: &str, balance: Amount) {
        if balance == 0 {
            self.balances.remove(account);
        } else {
            self.balances.insert(account.to_string(), balance);
        }
    }

    fn record(&mut self, tx_type: TxType, from: Option<&str>, to: Option<&str>, amount: Amount) {
        self.block += 1;
        if self.transactions.len() == JOURNAL_CAPACITY {
            self.transactions.pop_front();
        }
        self.transactions.push_back(Transaction::new(tx_type, from, to, amount, self.block));
    }

    fn require_admin(&self, caller: &str) -> MarketResult<()> {
        if caller != self.admin {
            return Err(MarketError::Unauthorized(format!("{} is not the ledger admin", caller)));
        }
        Ok(())
    }

    fn require_minter(&self, caller: &str) -> MarketResult<()> {
        if !self.is_minter(caller) {
            return Err(MarketError::Unauthorized(format!("{} lacks the minter role", caller)));
        }
        Ok(())
    }
}

fn require_positive(amount: Amount) -> MarketResult<()> {
    if amount == 0 {
        return Err(MarketError::InvalidAmount("amount must be positive".to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerStats {
    pub accounts: usize,
    /// Journal entries currently retained; `block` counts every change
    pub transactions: usize,
    pub block: u64,
    pub total_supply: Amount,
    pub total_minted: Amount,
    pub total_burned: Amount,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> CollateralLedger {
        CollateralLedger::new("uUSD", 18, "owner")
    }

    fn sum_of_balances(ledger: &CollateralLedger) -> Amount {
        ledger.balances.values().sum()
    }

    #[test]
    fn test_mint_and_burn() {
        let mut ledger = ledger();
        ledger.mint("owner", "owner", 1000).unwrap();
        assert_eq!(ledger.balance_of("owner"), 1000);

        ledger.burn("owner", "owner", 500).unwrap();
        assert_eq!(ledger.balance_of("owner"), 500);
        assert_eq!(ledger.total_supply(), 500);
    }

    #[test]
    fn test_mint_then_burn_round_trip() {
        let mut ledger = ledger();
        ledger.mint("owner", "alice", 42).unwrap();
        let before = ledger.balance_of("alice");

        ledger.mint("owner", "alice", 1_000).unwrap();
        ledger.burn("owner", "alice", 1_000).unwrap();
        assert_eq!(ledger.balance_of("alice"), before);
    }

    #[test]
    fn test_only_minters_mint_or_burn() {
        let mut ledger = ledger();
        ledger.mint("owner", "alice", 100).unwrap();

        assert!(matches!(ledger.mint("alice", "alice", 1), Err(MarketError::Unauthorized(_))));
        assert!(matches!(ledger.burn("alice", "alice", 1), Err(MarketError::Unauthorized(_))));

        ledger.grant_minter("owner", "bridge").unwrap();
        ledger.mint("bridge", "alice", 5).unwrap();
        assert_eq!(ledger.balance_of("alice"), 105);

        ledger.revoke_minter("owner", "bridge").unwrap();
        assert!(ledger.mint("bridge", "alice", 5).is_err());
        assert!(matches!(ledger.grant_minter("alice", "alice"), Err(MarketError::Unauthorized(_))));
    }

    #[test]
    fn test_burn_more_than_balance_fails() {
        let mut ledger = ledger();
        ledger.mint("owner", "alice", 10).unwrap();
        let err = ledger.burn("owner", "alice", 11).unwrap_err();
        assert_eq!(err, MarketError::InsufficientBalance { available: 10, required: 11 });
        assert_eq!(ledger.balance_of("alice"), 10);
    }

    #[test]
    fn test_transfer_is_all_or_nothing() {
        let mut ledger = ledger();
        ledger.mint("owner", "alice", 100).unwrap();

        ledger.transfer("alice", "bob", 60).unwrap();
        assert_eq!(ledger.balance_of("alice"), 40);
        assert_eq!(ledger.balance_of("bob"), 60);

        assert!(ledger.transfer("alice", "bob", 41).is_err());
        assert_eq!(ledger.balance_of("alice"), 40);
        assert_eq!(ledger.balance_of("bob"), 60);
        assert_eq!(sum_of_balances(&ledger), ledger.total_supply());
    }

    #[test]
    fn test_zero_amounts_rejected() {
        let mut ledger = ledger();
        assert!(matches!(ledger.mint("owner", "alice", 0), Err(MarketError::InvalidAmount(_))));
        assert!(matches!(ledger.transfer("alice", "bob", 0), Err(MarketError::InvalidAmount(_))));
    }

    #[test]
    fn test_self_transfer_keeps_balance() {
        let mut ledger = ledger();
        ledger.mint("owner", "alice", 10).unwrap();
        ledger.transfer("alice", "alice", 10).unwrap();
        assert_eq!(ledger.balance_of("alice"), 10);
    }

    #[test]
    fn test_journal_records_every_change() {
        let mut ledger = ledger();
        ledger.mint("owner", "alice", 100).unwrap();
        ledger.transfer("alice", "bob", 30).unwrap();
        ledger.burn("owner", "bob", 10).unwrap();

        assert_eq!(ledger.block(), 3);
        assert_eq!(ledger.transactions_for("bob").len(), 2);
        let recent = ledger.recent_transactions(1);
        assert_eq!(recent[0].tx_type, TxType::Burn);
        assert_eq!(recent[0].block_number, 3);

        let stats = ledger.stats();
        assert_eq!(stats.total_supply, 90);
        assert_eq!(stats.accounts, 2);
    }

    #[test]
    fn test_journal_is_bounded() {
        let mut ledger = ledger();
        ledger.mint("owner", "alice", 1).unwrap();
        for _ in 0..JOURNAL_CAPACITY {
            ledger.transfer("alice", "alice", 1).unwrap();
        }

        assert_eq!(ledger.block(), JOURNAL_CAPACITY as u64 + 1);
        assert_eq!(ledger.stats().transactions, JOURNAL_CAPACITY);
        // the mint was the oldest entry and has been dropped
        assert!(ledger.transactions_for("alice").iter().all(|tx| tx.tx_type == TxType::Transfer));
        assert_eq!(ledger.recent_transactions(1)[0].block_number, JOURNAL_CAPACITY as u64 + 1);
    }
}
