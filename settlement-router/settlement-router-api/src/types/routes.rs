//! Routes and request bodies for the settlement router HTTP surface

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::{
    invoice::Invoice,
    payment::{PaymentType, PriceFeedDetails},
    quote::{Quote, Venue},
    serialization::{option_u256_string_serialization, u256_string_serialization},
};

// --------------
// | Api Routes |
// --------------

/// The route to fetch every venue's quote for a swap
pub const QUOTES_ROUTE: &str = "quotes";
/// The route to fetch the single cheapest swap route
pub const SWAP_QUOTE_ROUTE: &str = "swap-quote";
/// The route to estimate gas and remainder costs for candidate routes
pub const ESTIMATES_ROUTE: &str = "estimates";
/// The route to build a payment payload
pub const PAYLOAD_ROUTE: &str = "payload";
/// The route to resolve the oracle conversion for a payment
pub const PRICE_FEED_ROUTE: &str = "price-feed";
/// The route to resolve Curve swap parameters
///
/// Expected query parameters:
/// - chainId: The chain the pool lives on
/// - pool: The pool's swap address
/// - tokenIn: The token sold into the pool
/// - tokenOut: The token bought from the pool
pub const SWAP_PARAMS_ROUTE: &str = "swap-params";

// -------------
// | Api Types |
// -------------

/// The request body for fetching all venue quotes
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotesRequest {
    /// The chain to quote on
    pub chain_id: u64,
    /// The exact amount of `token_out` required
    #[serde(with = "u256_string_serialization")]
    pub amount_out: U256,
    /// The token the payer sells
    pub token_in: Address,
    /// The token the receiver is paid in
    pub token_out: Address,
    /// The slippage allowance in basis points
    #[serde(default)]
    pub slippage_bps: Option<u32>,
    /// Venues to skip
    #[serde(default)]
    pub exclude_venues: Vec<Venue>,
}

/// The request body for fetching the cheapest swap route
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuoteRequest {
    /// The paying address
    pub sender: Address,
    /// The invoice being settled
    pub invoice: Invoice,
    /// The venue quote parameters
    #[serde(flatten)]
    pub quotes: QuotesRequest,
    /// The native coin's USD price, enabling gas-aware selection
    #[serde(default, with = "option_u256_string_serialization")]
    pub native_token_price: Option<U256>,
    /// The decimals of `native_token_price`
    #[serde(default)]
    pub native_token_price_decimals: Option<u8>,
    /// The invoice-to-token price conversion, if any
    #[serde(default)]
    pub price_feed_details: Option<PriceFeedDetails>,
}

/// The request body for estimating candidate route costs
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimatesRequest {
    /// The paying address
    pub sender: Address,
    /// The chain to simulate on
    pub chain_id: u64,
    /// The invoice being settled
    pub invoice: Invoice,
    /// The token the payer sells
    pub token_in: Address,
    /// The token the receiver is paid in
    pub token_out: Address,
    /// The candidate routes
    pub candidates: Vec<(Quote, Venue)>,
    /// The native coin's USD price
    #[serde(with = "u256_string_serialization")]
    pub native_token_price: U256,
    /// The decimals of `native_token_price`
    pub native_token_price_decimals: u8,
    /// The invoice-to-token price conversion, if any
    #[serde(default)]
    pub price_feed_details: Option<PriceFeedDetails>,
}

/// The request body for building a payment payload
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadRequest {
    /// The paying address
    pub sender: Address,
    /// The chain to pay on
    pub chain_id: u64,
    /// The token the payer sells
    pub token_in: Address,
    /// The invoice being settled
    pub invoice: Invoice,
    /// The chosen route, absent for a direct payment
    #[serde(default)]
    pub quote: Option<Quote>,
    /// The chosen venue, absent for a direct payment
    #[serde(default)]
    pub venue: Option<Venue>,
    /// Whether the settlement contract should return any remainder
    #[serde(default)]
    pub return_remainder: bool,
    /// The invoice-to-token price conversion, if any
    #[serde(default)]
    pub price_feed_details: Option<PriceFeedDetails>,
}

/// The request body for resolving a payment's oracle conversion
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceFeedRequest {
    /// The chain to pay on
    pub chain_id: u64,
    /// The invoice being settled
    pub invoice: Invoice,
    /// The token paid directly, or the swap's output token
    pub token: Address,
    /// The direction of the conversion
    pub payment_type: PaymentType,
}

/// The query parameters for resolving Curve swap parameters
///
/// Token and pool addresses are left as strings so that malformed addresses
/// surface as validation errors rather than query parse failures
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapParamsQuery {
    /// The chain the pool lives on
    pub chain_id: u64,
    /// The pool's swap address
    pub pool: String,
    /// The token sold into the pool
    pub token_in: String,
    /// The token bought from the pool
    pub token_out: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test that a swap quote request flattens the quote parameters
    #[test]
    fn test_swap_quote_request_flattened() {
        let json = serde_json::json!({
            "sender": "0x0000000000000000000000000000000000001337",
            "invoice": { "currency": "USD", "amountInMinor": "100" },
            "chainId": 1,
            "amountOut": "1000000",
            "tokenIn": "0xdAC17F958D2ee523a2206206994597C13D831ec7",
            "tokenOut": "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
            "slippageBps": 50,
        });

        let req: SwapQuoteRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.quotes.chain_id, 1);
        assert_eq!(req.quotes.amount_out, U256::from(1_000_000u64));
        assert_eq!(req.quotes.slippage_bps, Some(50));
        assert!(req.quotes.exclude_venues.is_empty());
        assert!(req.native_token_price.is_none());
        assert_eq!(req.invoice.amount_in_minor, U256::from(100u64));
    }
}
