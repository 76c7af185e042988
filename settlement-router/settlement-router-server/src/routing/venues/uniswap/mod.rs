//! Exact-output quotes from the Uniswap routing API

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use reqwest::Client;
use settlement_router_api::quote::Quote;
use tracing::instrument;

use crate::error::SettlementError;

use self::api_types::{UniswapErrorResponse, UniswapQuoteParams, UniswapQuoteResponse};

pub mod api_types;

// -------------
// | Constants |
// -------------

/// The default base URL for the Uniswap routing API
pub const DEFAULT_UNISWAP_BASE_URL: &str = "https://api.uniswap.org/v1";

/// The endpoint for getting a quote
const UNISWAP_QUOTE_ENDPOINT: &str = "quote";

/// The protocols to route through
const UNISWAP_PROTOCOLS: &str = "v3";

/// The exact-output trade type
const EXACT_OUT: &str = "exactOut";

// ----------
// | Client |
// ----------

/// A source of exact-output quotes over concentrated-liquidity pools
#[async_trait]
pub trait UniswapQuoter: Send + Sync {
    /// Quote the input needed to buy exactly `amount_out` of `token_out`
    async fn quote_exact_output(
        &self,
        chain_id: u64,
        token_in: Address,
        token_out: Address,
        amount_out: U256,
    ) -> Result<Quote, SettlementError>;
}

/// A client for the Uniswap routing API
#[derive(Clone)]
pub struct UniswapClient {
    /// The base URL of the routing API
    base_url: String,
    /// The underlying HTTP client
    http_client: Client,
}

impl UniswapClient {
    /// Create a new client
    pub fn new(base_url: String) -> Self {
        Self { base_url: base_url.trim_end_matches('/').to_string(), http_client: Client::new() }
    }
}

#[async_trait]
impl UniswapQuoter for UniswapClient {
    #[instrument(skip_all, fields(chain_id, token_in = %token_in, token_out = %token_out))]
    async fn quote_exact_output(
        &self,
        chain_id: u64,
        token_in: Address,
        token_out: Address,
        amount_out: U256,
    ) -> Result<Quote, SettlementError> {
        let url = format!("{}/{UNISWAP_QUOTE_ENDPOINT}", self.base_url);
        let params = UniswapQuoteParams {
            protocols: UNISWAP_PROTOCOLS.to_string(),
            token_in_address: token_in.to_string(),
            token_in_chain_id: chain_id,
            token_out_address: token_out.to_string(),
            token_out_chain_id: chain_id,
            amount: amount_out.to_string(),
            trade_type: EXACT_OUT.to_string(),
        };

        let response = self.http_client.get(url).query(&params).send().await?;
        if !response.status().is_success() {
            let body: UniswapErrorResponse = response.json().await.unwrap_or_default();
            return Err(SettlementError::quote(body.code()));
        }

        let body: UniswapQuoteResponse = response.json().await?;
        body.into_quote()
    }
}
