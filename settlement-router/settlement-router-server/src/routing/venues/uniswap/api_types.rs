//! Uniswap routing API type definitions

use std::str::FromStr;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use settlement_router_api::quote::{Pool, Quote};

use crate::error::SettlementError;

/// The error code reported when the API body carries none
pub const UNKNOWN_ERROR: &str = "UNKNOWN_ERROR";

/// The query parameters of an exact-output quote request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UniswapQuoteParams {
    /// The protocols to route through
    pub protocols: String,
    /// The token sold
    pub token_in_address: String,
    /// The chain of the token sold
    pub token_in_chain_id: u64,
    /// The token bought
    pub token_out_address: String,
    /// The chain of the token bought
    pub token_out_chain_id: u64,
    /// The exact output amount, in minor units
    pub amount: String,
    /// The trade type
    #[serde(rename = "type")]
    pub trade_type: String,
}

/// A token as reported in a route hop
#[derive(Debug, Deserialize)]
pub struct UniswapToken {
    /// The token contract address
    address: String,
}

/// A single pool in a Uniswap route
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniswapPool {
    /// The pool contract address
    address: String,
    /// The token sold into the pool
    token_in: UniswapToken,
    /// The token bought from the pool
    token_out: UniswapToken,
    /// The fee tier, in hundredths of a basis point
    fee: serde_json::Value,
    /// The amount sold into the pool; only set on the first hop
    #[serde(default)]
    amount_in: Option<String>,
    /// The amount bought from the pool; only set on the last hop
    #[serde(default)]
    amount_out: Option<String>,
}

impl UniswapPool {
    /// Convert the API hop into a route hop
    fn to_pool(&self) -> Result<Pool, SettlementError> {
        let mut pool = Pool::new(
            parse_address(&self.address)?,
            parse_address(&self.token_in.address)?,
            parse_address(&self.token_out.address)?,
        );
        pool.pool_fee = match &self.fee {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        pool.amount_in = self.amount_in.as_deref().map(parse_amount).transpose()?;
        pool.amount_out = self.amount_out.as_deref().map(parse_amount).transpose()?;

        Ok(pool)
    }
}

/// A successful quote response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniswapQuoteResponse {
    /// The candidate routes; only the first is used
    route: Vec<Vec<UniswapPool>>,
    /// The fractional price impact
    #[serde(default)]
    price_impact: Option<serde_json::Value>,
}

impl UniswapQuoteResponse {
    /// Convert the response into a quote over its first route
    pub fn into_quote(self) -> Result<Quote, SettlementError> {
        let hops = self
            .route
            .first()
            .filter(|hops| !hops.is_empty())
            .ok_or_else(|| SettlementError::quote("Uniswap response contains no route"))?;
        let path = hops.iter().map(UniswapPool::to_pool).collect::<Result<Vec<_>, _>>()?;

        let amount_in = path[0]
            .amount_in
            .ok_or_else(|| SettlementError::quote("Uniswap route has no input amount"))?;
        let amount_out = path
            .last()
            .and_then(|hop| hop.amount_out)
            .ok_or_else(|| SettlementError::quote("Uniswap route has no output amount"))?;

        Ok(Quote {
            path,
            amount_in,
            amount_out,
            slippage: None,
            price_impact: self.price_impact.as_ref().and_then(parse_price_impact),
        })
    }
}

/// A failed quote response
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniswapErrorResponse {
    /// The machine-readable error code
    #[serde(default)]
    pub error_code: Option<String>,
}

impl UniswapErrorResponse {
    /// The error code, or `UNKNOWN_ERROR` when absent
    pub fn code(&self) -> &str {
        self.error_code.as_deref().unwrap_or(UNKNOWN_ERROR)
    }
}

/// Parse a hex address from the API
fn parse_address(s: &str) -> Result<Address, SettlementError> {
    Address::from_str(s).map_err(SettlementError::parse)
}

/// Parse a decimal amount from the API
fn parse_amount(s: &str) -> Result<U256, SettlementError> {
    U256::from_str_radix(s, 10).map_err(SettlementError::parse)
}

/// The API reports price impact as either a number or a numeric string
fn parse_price_impact(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
