//! On-disk engine state (`serde_json`), loaded at startup and written on shutdown.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::errors::{MarketError, MarketResult};
use crate::ledger::CollateralLedger;
use crate::market_resolve::{LiquidityPool, Market};
use crate::oracle::OracleModule;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub version: u32,
    pub taken_at: u64,
    pub ledger: CollateralLedger,
    pub pool: LiquidityPool,
    pub oracle: OracleModule,
    /// Markets in creation order
    pub markets: Vec<Market>,
    pub factory_nonce: u64,
}

impl EngineSnapshot {
    pub fn save(&self, path: &Path) -> MarketResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| MarketError::Persistence(format!("Failed to create {}: {}", parent.display(), e)))?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| MarketError::Persistence(format!("Failed to serialize state: {}", e)))?;
        fs::write(path, json)
            .map_err(|e| MarketError::Persistence(format!("Failed to write state file: {}", e)))?;

        info!("💾 State saved to {} ({} markets)", path.display(), self.markets.len());
        Ok(())
    }

    pub fn load(path: &Path) -> MarketResult<Self> {
        let json = fs::read_to_string(path)
            .map_err(|e| MarketError::Persistence(format!("Failed to read {}: {}", path.display(), e)))?;
        let snapshot: Self = serde_json::from_str(&json)
            .map_err(|e| MarketError::Persistence(format!("Failed to parse state: {}", e)))?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(MarketError::Persistence(format!(
                "unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }
        info!("📂 Loaded state from {} ({} markets)", path.display(), snapshot.markets.len());
        Ok(snapshot)
    }
}
