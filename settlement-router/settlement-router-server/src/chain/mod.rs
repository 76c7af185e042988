//! Static per-chain metadata: tokens, routers, oracle feeds and Curve pools

mod mainnet;
pub mod pools;

use std::{collections::HashMap, sync::Arc};

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use settlement_router_api::token::{TokenInfo, NATIVE_TOKEN_ADDRESS};
use tracing::info;

use crate::error::SettlementError;

pub use mainnet::mainnet;
use pools::CurvePoolData;

/// The chain id of Optimism, which charges a separate L1 data fee
pub const OPTIMISM_CHAIN_ID: u64 = 10;

/// The settlement router contract generation
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouterVersion {
    /// The legacy router, direct payments only
    V1,
    /// The current router, with Uniswap and Curve swaps
    V2,
}

impl std::str::FromStr for RouterVersion {
    type Err = SettlementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "v1" | "0.1" => Ok(RouterVersion::V1),
            "v2" | "0.2" => Ok(RouterVersion::V2),
            _ => Err(SettlementError::config(format!("unknown router version: {s}"))),
        }
    }
}

/// A chain's native coin
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeCurrency {
    /// The coin's ticker
    pub symbol: String,
    /// The coin's decimals
    pub decimals: u8,
}

/// Static metadata for a single chain
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainInfo {
    /// The chain id
    pub chain_id: u64,
    /// A human-readable name
    pub name: String,
    /// The native coin
    pub native_currency: NativeCurrency,
    /// The wrapped form of the native coin that AMM pools trade
    pub wrapped_native_token: Address,
    /// The settlement router deployments, by version
    #[serde(default)]
    pub router_addresses: HashMap<RouterVersion, Address>,
    /// The Curve registry exchange exposing `get_best_rate`
    #[serde(default)]
    pub curve_router_address: Option<Address>,
    /// Oracle feeds quoting each currency against USD
    #[serde(default)]
    pub price_feeds: HashMap<String, Address>,
    /// The tokens known on this chain
    #[serde(default)]
    pub tokens: Vec<TokenInfo>,
    /// The Curve pool registry
    #[serde(default)]
    pub curve_pools: Vec<CurvePoolData>,
}

impl ChainInfo {
    /// Look up a token by address
    pub fn token(&self, address: &Address) -> Option<&TokenInfo> {
        self.tokens.iter().find(|t| &t.address == address)
    }

    /// Look up a Curve pool by its swap address
    pub fn curve_pool(&self, swap_address: &Address) -> Option<&CurvePoolData> {
        self.curve_pools.iter().find(|p| &p.swap_address == swap_address)
    }

    /// Look up a Curve pool by its registry id
    pub fn curve_pool_by_id(&self, id: &str) -> Option<&CurvePoolData> {
        self.curve_pools.iter().find(|p| p.id == id)
    }

    /// The router deployment for a version
    pub fn router_address(&self, version: RouterVersion) -> Option<Address> {
        self.router_addresses.get(&version).copied()
    }

    /// Whether a token is this chain's native coin
    pub fn is_native(&self, token: &TokenInfo) -> bool {
        token.is_native() || token.symbol == self.native_currency.symbol
    }

    /// Substitute the wrapped-native address for the native sentinel
    pub fn wrap_native(&self, address: Address) -> Address {
        if address == NATIVE_TOKEN_ADDRESS {
            self.wrapped_native_token
        } else {
            address
        }
    }
}

/// The set of chains the router can settle on
#[derive(Clone, Debug, Default)]
pub struct ChainRegistry {
    /// The chains, keyed by id
    chains: HashMap<u64, Arc<ChainInfo>>,
}

impl ChainRegistry {
    /// A registry holding the built-in chain tables
    pub fn builtin() -> Self {
        let mut registry = Self::default();
        registry.insert(mainnet());
        registry
    }

    /// Insert or replace a chain
    pub fn insert(&mut self, chain: ChainInfo) {
        self.chains.insert(chain.chain_id, Arc::new(chain));
    }

    /// Extend the registry from a JSON array of chain records, replacing
    /// built-in entries with the same id
    pub fn extend_from_json(&mut self, json: &str) -> Result<(), SettlementError> {
        let chains: Vec<ChainInfo> = serde_json::from_str(json).map_err(SettlementError::config)?;
        for chain in chains {
            info!("loaded chain config for chain {} ({})", chain.chain_id, chain.name);
            self.insert(chain);
        }

        Ok(())
    }

    /// Look up a chain by id
    pub fn get(&self, chain_id: u64) -> Option<Arc<ChainInfo>> {
        self.chains.get(&chain_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::address;

    use super::*;

    /// Test that a JSON chain record overrides the built-in table
    #[test]
    fn test_extend_from_json() {
        let json = r#"[{
            "chainId": 1,
            "name": "Local fork",
            "nativeCurrency": { "symbol": "ETH", "decimals": 18 },
            "wrappedNativeToken": "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2",
            "routerAddresses": { "v2": "0x6dcbc91229d812910b54df91b5c2b592572cd6b0" }
        }]"#;

        let mut registry = ChainRegistry::builtin();
        registry.extend_from_json(json).unwrap();

        let chain = registry.get(1).unwrap();
        assert_eq!(chain.name, "Local fork");
        assert_eq!(
            chain.router_address(RouterVersion::V2),
            Some(address!("6dcbc91229d812910b54df91b5c2b592572cd6b0"))
        );
        assert!(chain.router_address(RouterVersion::V1).is_none());
        assert!(chain.tokens.is_empty());
    }

    /// Test the native-coin substitution
    #[test]
    fn test_wrap_native() {
        let chain = mainnet();
        let usdc = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
        assert_eq!(chain.wrap_native(NATIVE_TOKEN_ADDRESS), chain.wrapped_native_token);
        assert_eq!(chain.wrap_native(usdc), usdc);
    }
}
