//! Curve pool registry records

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// Registry metadata for a single Curve pool
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurvePoolData {
    /// The registry id, e.g. `3pool`
    pub id: String,
    /// The pool's swap contract
    pub swap_address: Address,
    /// The coins the pool holds directly
    pub wrapped_coin_addresses: Vec<Address>,
    /// The coins the pool can exchange through its underlying path
    pub underlying_coin_addresses: Vec<Address>,
    /// The id of the base pool, for meta-pools
    #[serde(default)]
    pub base_pool: Option<String>,
    /// Whether the pool is a meta-pool over a base pool
    #[serde(default)]
    pub is_meta: bool,
    /// Whether the pool uses the crypto (non-stable) invariant
    #[serde(default)]
    pub is_crypto: bool,
    /// Whether the pool is a plain pool with no underlying path
    #[serde(default)]
    pub is_plain: bool,
    /// Whether the pool is a lending pool
    #[serde(default)]
    pub is_lending: bool,
    /// Whether the pool was created by a factory
    #[serde(default)]
    pub is_factory: bool,
    /// Whether the pool is a fake wrapper over its underlying coins
    #[serde(default)]
    pub is_fake: bool,
}
