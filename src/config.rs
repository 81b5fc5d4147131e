//! Engine configuration, read from the environment (and `.env` when present).

use std::path::PathBuf;
use tracing::warn;

use crate::market_resolve::fixed::Amount;

/// One whole unit of an 18-decimal collateral token
pub const COLLATERAL_UNIT: Amount = 1_000_000_000_000_000_000;

pub const DEFAULT_ADMIN: &str = "admin";
pub const DEFAULT_POOL_ACCOUNT: &str = "unified-pool";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:1234";
pub const DEFAULT_STATE_PATH: &str = "data/engine_state.json";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Account holding the admin role for the ledger, oracle and pool
    pub admin: String,
    /// Ledger account that custodies all pooled collateral
    pub pool_account: String,
    /// Collateral moved from free pool liquidity into each new market's curve
    pub seed_liquidity: Amount,
    /// Collateral minted straight into the pool at genesis
    pub genesis_pool_liquidity: Amount,
    pub collateral_symbol: String,
    pub collateral_decimals: u8,
    pub bind_addr: String,
    pub state_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            admin: DEFAULT_ADMIN.to_string(),
            pool_account: DEFAULT_POOL_ACCOUNT.to_string(),
            seed_liquidity: 1_000 * COLLATERAL_UNIT,
            genesis_pool_liquidity: 0,
            collateral_symbol: "uUSD".to_string(),
            collateral_decimals: 18,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
        }
    }
}

impl EngineConfig {
    /// Load from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        let defaults = Self::default();

        Self {
            admin: std::env::var("MARKET_ADMIN").unwrap_or(defaults.admin),
            pool_account: std::env::var("POOL_ACCOUNT").unwrap_or(defaults.pool_account),
            seed_liquidity: parse_var("SEED_LIQUIDITY", defaults.seed_liquidity),
            genesis_pool_liquidity: parse_var("GENESIS_POOL_LIQUIDITY", defaults.genesis_pool_liquidity),
            collateral_symbol: std::env::var("COLLATERAL_SYMBOL").unwrap_or(defaults.collateral_symbol),
            collateral_decimals: parse_var("COLLATERAL_DECIMALS", defaults.collateral_decimals),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            state_path: std::env::var("STATE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.state_path),
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("⚠️  {}={:?} is not valid, using {}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}
