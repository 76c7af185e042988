//! Multi-hop Curve quotes through an external router client
//!
//! The client speaks decimal token units, so amounts are converted at this
//! boundary

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use settlement_router_api::{
    quote::{CurveSwapParams, Pool, Quote},
    token::TokenInfo,
};
use tracing::{instrument, warn};

use crate::{
    error::SettlementError,
    fixed_point::{decimal_to_units, units_to_decimal},
    helpers::handle_http_response,
    routing::convergence::{converge_exact_output, ConvergenceConfig},
};

/// The endpoint for the best route
const ROUTE_ENDPOINT: &str = "route";
/// The endpoint for a route's price impact
const PRICE_IMPACT_ENDPOINT: &str = "price-impact";

// ---------
// | Types |
// ---------

/// A single step of a router-client route
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurveRouteStep {
    /// The pool traded through
    pub pool_address: Address,
    /// The coin sold
    pub input_coin_address: Address,
    /// The coin bought
    pub output_coin_address: Address,
    /// The index of the coin sold
    pub i: u32,
    /// The index of the coin bought
    pub j: u32,
    /// The router swap-mode code
    pub swap_type: u8,
    /// The swap contract, for factory pools
    pub swap_address: Address,
}

impl CurveRouteStep {
    /// Convert the step into a route hop
    fn to_pool(&self) -> Pool {
        let mut pool = Pool::new(self.pool_address, self.input_coin_address, self.output_coin_address);
        pool.swap_params =
            Some(CurveSwapParams { in_index: self.i, out_index: self.j, swap_type: self.swap_type });
        pool.factory_address = Some(self.swap_address);
        pool
    }
}

/// The best route and its output, in decimal token units
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CurveRouteOutput {
    /// The route steps
    pub route: Vec<CurveRouteStep>,
    /// The output amount as a decimal string
    pub output: String,
}

/// The price impact response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceImpactResponse {
    /// The fractional price impact
    price_impact: f64,
}

/// A client for a multi-hop Curve router
#[async_trait]
pub trait CurveRouterClient: Send + Sync {
    /// The best route for selling `amount` of `token_in`
    async fn get_best_route_and_output(
        &self,
        token_in: Address,
        token_out: Address,
        amount: &str,
    ) -> Result<CurveRouteOutput, SettlementError>;

    /// The price impact of selling `amount` of `token_in`
    async fn price_impact(
        &self,
        token_in: Address,
        token_out: Address,
        amount: &str,
    ) -> Result<f64, SettlementError>;
}

/// A router client served over HTTP
#[derive(Clone)]
pub struct HttpCurveRouterClient {
    /// The base URL of the router service
    base_url: String,
    /// The chain being routed
    chain_id: u64,
    /// The underlying HTTP client
    http_client: Client,
}

impl HttpCurveRouterClient {
    /// Create a new client
    pub fn new(base_url: String, chain_id: u64) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            chain_id,
            http_client: Client::new(),
        }
    }

    /// Send a get request to the router service
    async fn send_get_request<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        token_in: Address,
        token_out: Address,
        amount: &str,
    ) -> Result<T, SettlementError> {
        let url = format!("{}/{endpoint}", self.base_url);
        let params = [
            ("chainId", self.chain_id.to_string()),
            ("tokenIn", token_in.to_string()),
            ("tokenOut", token_out.to_string()),
            ("amount", amount.to_string()),
        ];

        let response = self.http_client.get(url).query(&params).send().await?;
        handle_http_response(response).await
    }
}

#[async_trait]
impl CurveRouterClient for HttpCurveRouterClient {
    async fn get_best_route_and_output(
        &self,
        token_in: Address,
        token_out: Address,
        amount: &str,
    ) -> Result<CurveRouteOutput, SettlementError> {
        self.send_get_request(ROUTE_ENDPOINT, token_in, token_out, amount).await
    }

    async fn price_impact(
        &self,
        token_in: Address,
        token_out: Address,
        amount: &str,
    ) -> Result<f64, SettlementError> {
        let resp: PriceImpactResponse =
            self.send_get_request(PRICE_IMPACT_ENDPOINT, token_in, token_out, amount).await?;
        Ok(resp.price_impact)
    }
}

// ----------
// | Source |
// ----------

/// Produces multi-hop quotes through the router client
#[derive(Clone)]
pub struct CurveRouterSource {
    /// The router client
    client: Arc<dyn CurveRouterClient>,
}

impl CurveRouterSource {
    /// Create a new source
    pub fn new(client: Arc<dyn CurveRouterClient>) -> Self {
        Self { client }
    }

    /// Quote selling exactly `amount` of `token_in`
    async fn quote_exact_input(
        &self,
        amount: U256,
        token_in: &TokenInfo,
        token_out: &TokenInfo,
    ) -> Result<Quote, SettlementError> {
        let amount_str = units_to_decimal(amount, token_in.decimals)?;
        let res = self
            .client
            .get_best_route_and_output(token_in.address, token_out.address, &amount_str)
            .await?;
        if res.route.is_empty() {
            return Err(SettlementError::quote("Curve router returned an empty route"));
        }

        let amount_out = decimal_to_units(&res.output, token_out.decimals)?;
        let path = res.route.iter().map(CurveRouteStep::to_pool).collect();
        Ok(Quote { path, amount_in: amount, amount_out, slippage: None, price_impact: None })
    }

    /// Quote the input needed to buy at least `amount_out` of `token_out`
    ///
    /// The token addresses must already carry any wrapped-native substitution
    #[instrument(skip_all, fields(token_in = %token_in.symbol, token_out = %token_out.symbol))]
    pub async fn quote_exact_output(
        &self,
        amount_out: U256,
        token_in: &TokenInfo,
        token_out: &TokenInfo,
        config: &ConvergenceConfig,
    ) -> Result<Quote, SettlementError> {
        let inverse = self.quote_exact_input(amount_out, token_out, token_in).await?;
        let mut quote = converge_exact_output(amount_out, inverse.amount_out, config, |amount_in| {
            self.quote_exact_input(amount_in, token_in, token_out)
        })
        .await?;

        let amount_str = units_to_decimal(quote.amount_in, token_in.decimals)?;
        match self.client.price_impact(token_in.address, token_out.address, &amount_str).await {
            Ok(impact) => quote.price_impact = Some(impact),
            Err(e) => warn!("failed to fetch Curve price impact: {e}"),
        }

        Ok(quote)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use alloy_primitives::address;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    use super::*;
    use crate::chain::mainnet;

    /// The pool used by the mock client's routes
    pub(crate) const MOCK_ROUTER_POOL: Address = address!("DcEF968d416a41Cdac0ED8702fAC8128A64241A2");

    /// A router client that prices every swap at a fixed decimal rate
    pub(crate) struct FixedRateRouterClient {
        /// The output per unit of input
        pub rate: BigDecimal,
    }

    #[async_trait]
    impl CurveRouterClient for FixedRateRouterClient {
        async fn get_best_route_and_output(
            &self,
            token_in: Address,
            token_out: Address,
            amount: &str,
        ) -> Result<CurveRouteOutput, SettlementError> {
            let output = BigDecimal::from_str(amount).unwrap() * &self.rate;
            let step = CurveRouteStep {
                pool_address: MOCK_ROUTER_POOL,
                input_coin_address: token_in,
                output_coin_address: token_out,
                i: 1,
                j: 0,
                swap_type: 1,
                swap_address: Address::ZERO,
            };
            Ok(CurveRouteOutput { route: vec![step], output: output.to_string() })
        }

        async fn price_impact(
            &self,
            _token_in: Address,
            _token_out: Address,
            _amount: &str,
        ) -> Result<f64, SettlementError> {
            Ok(0.0005)
        }
    }

    /// Test that the route steps carry their swap params and amounts are
    /// converted back into minor units
    #[tokio::test]
    async fn test_router_exact_output() {
        let chain = mainnet();
        let usdc = chain.tokens[2].clone();
        let dai = chain.tokens[4].clone();
        let client = FixedRateRouterClient { rate: BigDecimal::from_str("0.999").unwrap() };
        let source = CurveRouterSource::new(Arc::new(client));

        let target = U256::from(1_000_000u64);
        let quote = source
            .quote_exact_output(target, &dai, &usdc, &ConvergenceConfig::default())
            .await
            .unwrap();

        assert!(quote.amount_out >= target);
        assert_eq!(quote.price_impact, Some(0.0005));
        let hop = &quote.path[0];
        assert_eq!(hop.pool_address, MOCK_ROUTER_POOL);
        assert_eq!(hop.token_in, dai.address);
        assert_eq!(
            hop.swap_params,
            Some(CurveSwapParams { in_index: 1, out_index: 0, swap_type: 1 })
        );
        assert_eq!(hop.factory_address, Some(Address::ZERO));
    }
}
