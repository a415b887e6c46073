//! Wellgate Configuration
//!
//! Configuration for chain verification, payment gating, redemption and
//! weekly pool distribution. Supports loading from environment variables
//! with WELLGATE_ prefix.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;

/// Chain RPC configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// JSON-RPC endpoint URL
    pub rpc_url: String,
    /// Expected chain ID
    pub chain_id: u64,
    /// Recipient address for payments (lowercase hex)
    pub pay_to: String,
    /// ERC-20 asset contract accepted for payment (None = native coin)
    pub asset: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,
}

fn default_rpc_timeout() -> u64 {
    15
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            chain_id: 8453,
            pay_to: String::new(),
            asset: None,
            timeout_secs: 15,
        }
    }
}

impl ChainConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - WELLGATE_RPC_URL: JSON-RPC endpoint URL
    /// - WELLGATE_CHAIN_ID: Expected chain ID
    /// - WELLGATE_PAY_TO: Payment recipient address
    /// - WELLGATE_ASSET: ERC-20 contract address (optional, native if unset)
    /// - WELLGATE_RPC_TIMEOUT: Request timeout in seconds
    pub fn from_env() -> Self {
        Self {
            rpc_url: env::var("WELLGATE_RPC_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8545".to_string()),
            chain_id: env::var("WELLGATE_CHAIN_ID")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8453),
            pay_to: env::var("WELLGATE_PAY_TO").unwrap_or_default(),
            asset: env::var("WELLGATE_ASSET").ok(),
            timeout_secs: env::var("WELLGATE_RPC_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(15),
        }
    }
}

/// Payment gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Free uses per user per resource per UTC day
    pub free_daily_uses: u32,
    /// Default price in the chain's smallest unit for resources not
    /// listed in `resource_prices`
    pub price: u128,
    /// Per-resource price overrides; a price of 0 makes the resource
    /// statically free
    #[serde(default)]
    pub resource_prices: HashMap<String, u128>,
    /// Prepaid credits granted per settled payment
    pub credits_per_payment: u32,
    /// Payment challenge time-to-live in seconds
    pub challenge_ttl_secs: u64,
    /// Tolerance for transfers mined before the request, in seconds
    pub proof_tolerance_secs: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            free_daily_uses: 3,
            price: 1_000_000_000_000_000,
            resource_prices: HashMap::new(),
            credits_per_payment: 10,
            challenge_ttl_secs: 1800,
            proof_tolerance_secs: 300,
        }
    }
}

impl GateConfig {
    /// Price of a resource in the chain's smallest unit
    pub fn price_for(&self, resource: &str) -> u128 {
        self.resource_prices
            .get(resource)
            .copied()
            .unwrap_or(self.price)
    }

    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - WELLGATE_FREE_DAILY_USES: Free uses per user per resource per day
    /// - WELLGATE_PRICE: Default price in smallest unit
    /// - WELLGATE_RESOURCE_PRICES: Comma-separated `resource=price` overrides
    /// - WELLGATE_CREDITS_PER_PAYMENT: Credits granted per payment
    /// - WELLGATE_CHALLENGE_TTL: Challenge TTL in seconds
    /// - WELLGATE_PROOF_TOLERANCE: Stale proof tolerance in seconds
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            free_daily_uses: env::var("WELLGATE_FREE_DAILY_USES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.free_daily_uses),
            price: env::var("WELLGATE_PRICE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.price),
            resource_prices: env::var("WELLGATE_RESOURCE_PRICES")
                .ok()
                .map(|s| parse_resource_prices(&s))
                .unwrap_or(defaults.resource_prices),
            credits_per_payment: env::var("WELLGATE_CREDITS_PER_PAYMENT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.credits_per_payment),
            challenge_ttl_secs: env::var("WELLGATE_CHALLENGE_TTL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.challenge_ttl_secs),
            proof_tolerance_secs: env::var("WELLGATE_PROOF_TOLERANCE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.proof_tolerance_secs),
        }
    }
}

fn parse_resource_prices(raw: &str) -> HashMap<String, u128> {
    raw.split(',')
        .filter_map(|pair| {
            let (name, price) = pair.split_once('=')?;
            let price = price.trim().parse().ok()?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), price))
        })
        .collect()
}

/// Redemption configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemConfig {
    /// Minimum XP per redemption
    pub min_xp: u64,
    /// XP required per token at the base rate
    pub xp_per_token: u64,
    /// Maximum tokens redeemable per rolling 24h window
    pub daily_cap_tokens: u64,
}

impl Default for RedeemConfig {
    fn default() -> Self {
        Self {
            min_xp: 100,
            xp_per_token: 10,
            daily_cap_tokens: 250,
        }
    }
}

impl RedeemConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - WELLGATE_REDEEM_MIN_XP: Minimum XP per redemption
    /// - WELLGATE_XP_PER_TOKEN: XP per token at base rate
    /// - WELLGATE_DAILY_CAP: Token cap per rolling 24h window
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            min_xp: env::var("WELLGATE_REDEEM_MIN_XP")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.min_xp),
            xp_per_token: env::var("WELLGATE_XP_PER_TOKEN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.xp_per_token),
            daily_cap_tokens: env::var("WELLGATE_DAILY_CAP")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.daily_cap_tokens),
        }
    }
}

/// Weekly pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Token amount distributed per week
    pub weekly_amount: u64,
    /// Distribution claim lease in seconds
    pub claim_lease_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            weekly_amount: 50_000,
            claim_lease_secs: 300,
        }
    }
}

impl PoolConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - WELLGATE_POOL_AMOUNT: Tokens distributed per week
    /// - WELLGATE_POOL_CLAIM_LEASE: Distribution lease in seconds
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            weekly_amount: env::var("WELLGATE_POOL_AMOUNT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.weekly_amount),
            claim_lease_secs: env::var("WELLGATE_POOL_CLAIM_LEASE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.claim_lease_secs),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Chain RPC settings
    pub chain: ChainConfig,
    /// Payment gate settings
    pub gate: GateConfig,
    /// Redemption settings
    pub redeem: RedeemConfig,
    /// Weekly pool settings
    pub pool: PoolConfig,
}

impl AppConfig {
    /// Load all sections from environment variables
    pub fn from_env() -> Self {
        Self {
            chain: ChainConfig::from_env(),
            gate: GateConfig::from_env(),
            redeem: RedeemConfig::from_env(),
            pool: PoolConfig::from_env(),
        }
    }

    /// Create a development configuration (local node, tiny price)
    pub fn development() -> Self {
        Self {
            chain: ChainConfig {
                rpc_url: "http://127.0.0.1:8545".to_string(),
                chain_id: 31337,
                pay_to: "0x00000000000000000000000000000000000000a1".to_string(),
                asset: None,
                timeout_secs: 5,
            },
            gate: GateConfig {
                free_daily_uses: 3,
                price: 1_000,
                resource_prices: HashMap::new(),
                credits_per_payment: 10,
                challenge_ttl_secs: 1800,
                proof_tolerance_secs: 300,
            },
            redeem: RedeemConfig::default(),
            pool: PoolConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.gate.free_daily_uses, 3);
        assert_eq!(config.gate.challenge_ttl_secs, 1800);
        assert_eq!(config.redeem.min_xp, 100);
        assert_eq!(config.redeem.daily_cap_tokens, 250);
        assert_eq!(config.pool.weekly_amount, 50_000);
    }

    #[test]
    fn test_resource_price_overrides() {
        let prices = parse_resource_prices("lobby=0, agent_message=2000,bad");
        assert_eq!(prices.len(), 2);

        let config = GateConfig {
            price: 1_000,
            resource_prices: prices,
            ..GateConfig::default()
        };
        assert_eq!(config.price_for("lobby"), 0);
        assert_eq!(config.price_for("agent_message"), 2_000);
        assert_eq!(config.price_for("anything_else"), 1_000);
    }

    #[test]
    fn test_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.chain.chain_id, 31337);
        assert!(config.chain.asset.is_none());
    }
}
