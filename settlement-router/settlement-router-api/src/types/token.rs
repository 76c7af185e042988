//! Token descriptors shared by quoting and payload construction

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};

/// The sentinel address used to denote a chain's native coin
pub const NATIVE_TOKEN_ADDRESS: Address = address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

/// Currency codes with special handling in cost conversion
pub mod currency {
    /// US dollars, the pivot currency of all oracle feeds
    pub const USD: &str = "USD";
    /// Ether, for invoices denominated in the native coin
    pub const ETH: &str = "ETH";
}

/// A token known to the router
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    /// The chain the token lives on
    pub chain_id: u64,
    /// The token's contract address, or the native sentinel
    pub address: Address,
    /// The ticker symbol
    pub symbol: String,
    /// The number of decimals in the token's minor unit
    pub decimals: u8,
    /// The fiat or crypto currency the token tracks, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl TokenInfo {
    /// Whether this token is the chain's native coin
    pub fn is_native(&self) -> bool {
        self.address == NATIVE_TOKEN_ADDRESS
    }
}
