//! Gas- and remainder-adjusted cost estimates for candidate routes

use alloy_primitives::{I256, U256};
use serde::{Deserialize, Serialize};

use crate::{
    quote::{Quote, Venue},
    serialization::{i256_string_serialization, u256_string_serialization},
    token::TokenInfo,
};

/// The simulated cost of settling through one candidate route
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimationResult {
    /// The candidate quote
    pub quote: Quote,
    /// The candidate's venue
    pub venue: Venue,
    /// The estimated gas units
    #[serde(with = "u256_string_serialization")]
    pub gas: U256,
    /// The gas price at estimation time
    #[serde(with = "u256_string_serialization")]
    pub gas_price: U256,
    /// The gas cost in the invoice currency
    #[serde(with = "u256_string_serialization")]
    pub gas_in_invoice_currency: U256,
    /// The gas cost in USD, in the output token's decimals
    #[serde(with = "u256_string_serialization")]
    pub gas_in_usd: U256,
    /// The settlement remainder in the invoice currency
    #[serde(with = "i256_string_serialization")]
    pub remainder_in_invoice_currency: I256,
    /// The flat cost of returning the remainder to the payer
    #[serde(with = "u256_string_serialization")]
    pub return_remainder_cost: U256,
    /// `remainder - cost`
    #[serde(with = "i256_string_serialization")]
    pub return_remainder_delta: I256,
    /// Whether returning the remainder is worth its cost
    pub should_return_remainder: bool,
    /// The token the receiver is paid in
    pub token_out: TokenInfo,
}
