//! Invoice types, consumed read-only by the router

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::{quote::Venue, serialization::u256_string_serialization};

/// The maximum encoded length of an invoice memo
pub const MAX_MEMO_BYTES: usize = 32;

/// A per-token receiver override within a chain's accepted-coin config
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenConfig {
    /// The symbol of the accepted token
    pub symbol: String,
    /// The address payments in this token should be sent to
    #[serde(default)]
    pub address: Option<Address>,
}

/// The accepted-coin configuration for one chain
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinConfig {
    /// The chain this config applies to
    pub chain_id: u64,
    /// The default receiver on this chain
    #[serde(default)]
    pub default_address: Option<Address>,
    /// Per-token overrides
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
}

/// An invoice to be settled
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    /// The invoice currency code, e.g. `USD`
    pub currency: String,
    /// The invoice amount in minor units, with 2 implied decimals
    #[serde(with = "u256_string_serialization")]
    pub amount_in_minor: U256,
    /// The top-level recipient
    #[serde(default)]
    pub recipient_address: Option<Address>,
    /// The receiver of the optional extra fee
    #[serde(default)]
    pub extra_fee_address: Option<Address>,
    /// The extra fee in basis points
    #[serde(default)]
    pub extra_fee_bps: Option<u32>,
    /// The accepted coins, per chain
    #[serde(default)]
    pub coins: Vec<CoinConfig>,
    /// Venues the payer may not be routed through
    #[serde(default)]
    pub exclude_venues: Vec<Venue>,
    /// A free-form memo attached to the payment
    #[serde(default)]
    pub memo: Option<String>,
}

impl Invoice {
    /// The accepted-coin config for a chain, if any
    pub fn coin_config(&self, chain_id: u64) -> Option<&CoinConfig> {
        self.coins.iter().find(|c| c.chain_id == chain_id)
    }
}
