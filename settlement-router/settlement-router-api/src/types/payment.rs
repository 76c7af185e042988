//! Payment-side types: price feed conversion details and built payloads

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

use crate::{serialization::u256_string_serialization, token::TokenInfo};

/// The decimal precision of `PriceFeedDetails::approximate_rate`
pub const APPROXIMATE_RATE_DECIMALS: u8 = 8;

/// The direction in which a price feed conversion is applied
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    /// Convert the invoice currency into the token paid directly
    Direct,
    /// Convert the swap's output token into the invoice currency
    Swap,
}

/// The oracle conversion attached to a payment
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceFeedDetails {
    /// Up to two feed addresses, the zero address meaning no conversion at
    /// that position
    pub feed_addresses: Vec<Address>,
    /// The conversion rate as a fixed 8-decimal fraction
    #[serde(with = "u256_string_serialization")]
    pub approximate_rate: U256,
    /// The invoice amount after conversion
    #[serde(with = "u256_string_serialization")]
    pub converted_amount: U256,
    /// The decimal base of `converted_amount`
    pub decimals: u8,
}

impl PriceFeedDetails {
    /// The feed pair in the router's `address[2]` layout, zero-padded
    pub fn feed_pair(&self) -> [Address; 2] {
        let mut pair = [Address::ZERO; 2];
        for (slot, feed) in pair.iter_mut().zip(self.feed_addresses.iter()) {
            *slot = *feed;
        }
        pair
    }
}

/// A built payment call, as returned to API consumers
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayloadResponse {
    /// The token the receiver is paid in
    pub token_out: TokenInfo,
    /// The router function to call
    pub contract_function_name: String,
    /// The ordered call arguments, rendered as JSON
    pub contract_args: Vec<serde_json::Value>,
    /// The native value to attach
    #[serde(with = "u256_string_serialization")]
    pub value: U256,
    /// Whether the payment swaps
    pub is_swap: bool,
    /// The ABI-encoded calldata
    pub calldata: Bytes,
}
