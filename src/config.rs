//! Process-wide configuration, read once at startup as an immutable record;
//! no hot reload. `clap::Parser` with `env` attributes, falling back to
//! hardcoded defaults, flattened to a single chain since Sidebet talks to
//! exactly one settlement chain per deployment.

use crate::types::Addr;
use alloy_primitives::{B256, hex};
use std::net::IpAddr;
use std::str::FromStr;
use url::Url;

#[derive(Debug, Clone, clap::Parser)]
#[command(name = "sidebet-relayer")]
#[command(about = "Off-chain coordination backend for Sidebet prediction markets")]
pub struct Config {
    #[arg(long, env = "PORT", default_value_t = config_defaults::DEFAULT_PORT)]
    pub port: u16,

    #[arg(long, env = "HOST", default_value = config_defaults::DEFAULT_HOST)]
    pub host: IpAddr,

    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    #[arg(long, env = "RPC_URL")]
    pub rpc_url: Url,

    #[arg(long, env = "CHAIN_ID")]
    pub chain_id: u64,

    /// Hex-encoded (0x-prefixed) private key for the relayer's hot wallet,
    /// used only to submit the finalize transaction.
    #[arg(long, env = "RELAYER_PRIVATE_KEY")]
    pub relayer_private_key: RelayerKey,

    #[arg(long, env = "FACTORY_ADDRESS")]
    pub factory_address: Option<Addr>,

    #[arg(long, env = "MIN_SIGNATURES_THRESHOLD", default_value_t = 3)]
    pub min_signatures_threshold: i64,

    #[arg(long, env = "MAX_PROPOSAL_AGE_HOURS", default_value_t = 24)]
    pub max_proposal_age_hours: i64,

    #[arg(long, env = "RATE_LIMIT_WINDOW_MS", default_value_t = 60_000)]
    pub rate_limit_window_ms: u64,

    #[arg(long, env = "RATE_LIMIT_MAX_REQUESTS", default_value_t = 100)]
    pub rate_limit_max_requests: u32,

    #[arg(long, env = "ALLOWED_ORIGINS", value_delimiter = ',', default_value = "")]
    pub allowed_origins: Vec<String>,

    /// Environment name; gates the dev-only `DELETE /api/attestations/:market`
    /// endpoint.
    #[arg(long, env = "NODE_ENV", default_value = "production")]
    pub node_env: String,

    /// A market is stale once this long has passed since its last sync.
    #[arg(long, env = "MARKET_STALE_AFTER_SECS", default_value_t = 300)]
    pub market_stale_after_secs: i64,

    /// Scheduler cadences, each overridable independently.
    #[arg(long, env = "SYNC_INTERVAL_SECS", default_value_t = 300)]
    pub sync_interval_secs: u64,

    #[arg(long, env = "DISPUTE_SWEEP_INTERVAL_SECS", default_value_t = 120)]
    pub dispute_sweep_interval_secs: u64,

    #[arg(long, env = "FINALIZATION_SWEEP_INTERVAL_SECS", default_value_t = 60)]
    pub finalization_sweep_interval_secs: u64,

    #[arg(long, env = "STALE_PROPOSAL_SWEEP_INTERVAL_SECS", default_value_t = 3_600)]
    pub stale_proposal_sweep_interval_secs: u64,

    #[arg(long, env = "LOG_CLEANUP_INTERVAL_SECS", default_value_t = 86_400)]
    pub log_cleanup_interval_secs: u64,

    /// Sync log rows older than this are deleted by the log cleanup job.
    #[arg(long, env = "LOG_RETENTION_DAYS", default_value_t = 30)]
    pub log_retention_days: i64,

    /// Grace period before an in-flight request is abandoned on shutdown.
    #[arg(long, env = "SHUTDOWN_GRACE_SECS", default_value_t = 10)]
    pub shutdown_grace_secs: u64,
}

impl Config {
    pub fn is_development(&self) -> bool {
        self.node_env == "development"
    }

    /// Load configuration from `.env` (if present), CLI args, and environment
    /// variables, in that order of increasing precedence handled by `clap`.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        <Config as clap::Parser>::try_parse().map_err(ConfigError::Parse)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] clap::Error),
}

/// Wrapper around the relayer's signing key so it never appears in `Debug`
/// output (e.g. accidental `tracing::info!(config = ?cfg)` calls).
#[derive(Clone)]
pub struct RelayerKey(pub B256);

impl std::fmt::Debug for RelayerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RelayerKey(<redacted>)")
    }
}

impl FromStr for RelayerKey {
    type Err = RelayerKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|_| RelayerKeyParseError)?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| RelayerKeyParseError)?;
        Ok(RelayerKey(B256::from(arr)))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("RELAYER_PRIVATE_KEY must be a 0x-prefixed 32-byte hex string")]
pub struct RelayerKeyParseError;

mod config_defaults {
    pub const DEFAULT_PORT: u16 = 8080;
    pub const DEFAULT_HOST: &str = "0.0.0.0";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relayer_key_parses_with_or_without_prefix() {
        let hex = "11".repeat(32);
        let with_prefix: RelayerKey = format!("0x{hex}").parse().unwrap();
        let without_prefix: RelayerKey = hex.parse().unwrap();
        assert_eq!(with_prefix.0, without_prefix.0);
    }

    #[test]
    fn relayer_key_rejects_wrong_length() {
        assert!("0x1234".parse::<RelayerKey>().is_err());
    }

    #[test]
    fn relayer_key_debug_never_prints_the_secret() {
        let key: RelayerKey = "11".repeat(32).parse().unwrap();
        assert_eq!(format!("{key:?}"), "RelayerKey(<redacted>)");
    }
}
