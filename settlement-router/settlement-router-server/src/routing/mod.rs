//! Fans out exact-output quote requests across venues and normalizes the
//! results

pub mod convergence;
pub mod venues;

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use futures::{
    future::{join_all, BoxFuture},
    FutureExt,
};
use settlement_router_api::{
    quote::{Quote, Venue},
    token::TokenInfo,
};
use tracing::{info, instrument, warn};

use crate::{
    chain::ChainInfo,
    error::SettlementError,
    fixed_point::apply_slippage,
};

use self::{
    convergence::ConvergenceConfig,
    venues::{
        curve::{
            router_client::CurveRouterSource, swap_params::resolve_swap_params,
            CurveSinglePoolSource,
        },
        uniswap::UniswapQuoter,
        QuoteSource,
    },
};

/// The outcome of querying a single source
type SourceResult = (QuoteSource, Result<Quote, SettlementError>);

/// Queries every venue for a chain and returns their normalized quotes
#[derive(Clone)]
pub struct QuoteAggregator {
    /// The chain being quoted
    chain: Arc<ChainInfo>,
    /// The Uniswap quote source
    uniswap: Arc<dyn UniswapQuoter>,
    /// The Curve single-pool source
    curve_single: CurveSinglePoolSource,
    /// The Curve router-client source, if configured
    curve_router: Option<CurveRouterSource>,
    /// The exact-output search parameters for the Curve sources
    convergence: ConvergenceConfig,
}

impl QuoteAggregator {
    /// Create a new aggregator
    pub fn new(
        chain: Arc<ChainInfo>,
        uniswap: Arc<dyn UniswapQuoter>,
        curve_single: CurveSinglePoolSource,
        curve_router: Option<CurveRouterSource>,
        convergence: ConvergenceConfig,
    ) -> Self {
        Self { chain, uniswap, curve_single, curve_router, convergence }
    }

    /// The chain this aggregator quotes on
    pub fn chain(&self) -> &Arc<ChainInfo> {
        &self.chain
    }

    /// Fetch an exact-output quote from every non-excluded venue
    ///
    /// Sources are queried concurrently and a failing source only drops its
    /// own quote. Results are ordered Uniswap, Curve single-pool, Curve
    /// router, and each carries `slippage_bps` of input allowance
    #[instrument(skip_all, fields(
        token_in = %token_in.symbol,
        token_out = %token_out.symbol,
        amount_out = %amount_out,
    ))]
    pub async fn fetch_all_quotes(
        &self,
        amount_out: U256,
        token_in: &TokenInfo,
        token_out: &TokenInfo,
        slippage_bps: u32,
        excluded_venues: &[Venue],
    ) -> Vec<(Quote, Venue)> {
        let sources = self.build_source_futures(amount_out, token_in, token_out, excluded_venues);
        let results = join_all(sources).await;

        let mut quotes = Vec::new();
        for (source, quote_res) in results {
            let quote = match quote_res.and_then(|q| {
                self.normalize_quote(source, q, token_in, token_out, slippage_bps)
            }) {
                Ok(quote) => quote,
                Err(e) => {
                    warn!("Error getting quote from {source}: {e}");
                    continue;
                },
            };

            if !quote.is_valid() {
                warn!("Discarding empty quote from {source}");
                continue;
            }

            info!("{source} quote: {} in for {} out", quote.amount_in, quote.amount_out);
            quotes.push((quote, source.venue()));
        }

        quotes
    }

    /// Build the quote future of every non-excluded source, in output order
    fn build_source_futures<'a>(
        &'a self,
        amount_out: U256,
        token_in: &'a TokenInfo,
        token_out: &'a TokenInfo,
        excluded_venues: &[Venue],
    ) -> Vec<BoxFuture<'a, SourceResult>> {
        let wrapped_in = self.chain.wrap_native(token_in.address);
        let convergence = self.convergence;
        let mut futures: Vec<BoxFuture<'a, SourceResult>> = Vec::new();

        if !excluded_venues.contains(&Venue::Uniswap) {
            let chain_id = self.chain.chain_id;
            let wrapped_out = self.chain.wrap_native(token_out.address);
            futures.push(
                async move {
                    let res = self
                        .uniswap
                        .quote_exact_output(chain_id, wrapped_in, wrapped_out, amount_out)
                        .await;
                    (QuoteSource::Uniswap, res)
                }
                .boxed(),
            );
        }

        if excluded_venues.contains(&Venue::Curve) {
            return futures;
        }

        futures.push(
            async move {
                let res = self
                    .curve_single
                    .quote_exact_output(amount_out, wrapped_in, token_out.address, &convergence)
                    .await;
                (QuoteSource::CurveSinglePool, res)
            }
            .boxed(),
        );

        if let Some(router) = &self.curve_router {
            let wrapped_token_in = TokenInfo { address: wrapped_in, ..token_in.clone() };
            futures.push(
                async move {
                    let res = router
                        .quote_exact_output(amount_out, &wrapped_token_in, token_out, &convergence)
                        .await;
                    (QuoteSource::CurveRouter, res)
                }
                .boxed(),
            );
        }

        futures
    }

    /// Apply slippage and restore the caller's token addresses on a raw
    /// source quote
    fn normalize_quote(
        &self,
        source: QuoteSource,
        mut quote: Quote,
        token_in: &TokenInfo,
        token_out: &TokenInfo,
        slippage_bps: u32,
    ) -> Result<Quote, SettlementError> {
        let (amount_in, slippage) = apply_slippage(quote.amount_in, slippage_bps);
        quote.amount_in = amount_in;
        quote.slippage = Some(slippage);

        let first_hop = quote
            .path
            .first_mut()
            .ok_or_else(|| SettlementError::quote(format!("{source} returned an empty path")))?;
        first_hop.amount_in = Some(amount_in);

        if source == QuoteSource::CurveSinglePool {
            let params = resolve_swap_params(
                &self.chain,
                first_hop.pool_address,
                first_hop.token_in,
                first_hop.token_out,
            )?;
            first_hop.swap_params = Some(params);
            first_hop.factory_address = Some(Address::ZERO);
        }
        first_hop.token_in = token_in.address;

        if source == QuoteSource::Uniswap {
            if let Some(last_hop) = quote.path.last_mut() {
                last_hop.token_out = token_out.address;
            }
        }

        Ok(quote)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{str::FromStr, sync::Mutex};

    use alloy_primitives::address;
    use alloy_sol_types::SolType;
    use async_trait::async_trait;
    use bigdecimal::BigDecimal;
    use settlement_router_api::{
        quote::{CurveSwapParams, Pool},
        token::NATIVE_TOKEN_ADDRESS,
    };

    use super::*;
    use crate::{
        chain::mainnet,
        payload::{
            create_payload,
            tests::{token, usd_invoice, SENDER},
            PaymentCall, PaymentParams, SingleHopPath,
        },
        routing::venues::curve::{
            router_client::tests::FixedRateRouterClient,
            tests::FixedRateReader,
            CurveRateReader,
        },
    };

    /// A Uniswap pool used by the mock quoter
    pub(crate) const MOCK_UNISWAP_POOL: Address = address!("88e6A0c2dDD26FEEb64F039a2c41296FcB3f5640");

    /// A Uniswap quoter returning a one-hop quote at a fixed input, or an
    /// error when none is configured
    pub(crate) struct MockUniswap {
        /// The input amount to quote
        pub amount_in: Option<U256>,
        /// The token pairs of every call
        pub calls: Mutex<Vec<(Address, Address)>>,
    }

    impl MockUniswap {
        /// A quoter that always quotes `amount_in`
        pub(crate) fn quoting(amount_in: u64) -> Self {
            Self { amount_in: Some(U256::from(amount_in)), calls: Mutex::new(Vec::new()) }
        }

        /// A quoter that always fails
        pub(crate) fn failing() -> Self {
            Self { amount_in: None, calls: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl UniswapQuoter for MockUniswap {
        async fn quote_exact_output(
            &self,
            _chain_id: u64,
            token_in: Address,
            token_out: Address,
            amount_out: U256,
        ) -> Result<Quote, SettlementError> {
            self.calls.lock().unwrap().push((token_in, token_out));
            let amount_in = self.amount_in.ok_or_else(|| SettlementError::quote("NO_ROUTE"))?;

            let mut pool = Pool::new(MOCK_UNISWAP_POOL, token_in, token_out);
            pool.pool_fee = "500".to_string();
            pool.amount_in = Some(amount_in);
            pool.amount_out = Some(amount_out);
            Ok(Quote { path: vec![pool], amount_in, amount_out, slippage: None, price_impact: None })
        }
    }

    /// A Curve reader that always fails
    struct FailingReader;

    #[async_trait]
    impl CurveRateReader for FailingReader {
        async fn get_best_rate(
            &self,
            _exchange: Address,
            _token_in: Address,
            _token_out: Address,
            _amount: U256,
        ) -> Result<(Address, U256), SettlementError> {
            Err(SettlementError::onchain("execution reverted"))
        }
    }

    /// Build an aggregator over mainnet with the given sources
    fn aggregator(
        uniswap: Arc<dyn UniswapQuoter>,
        reader: Arc<dyn CurveRateReader>,
        with_router: bool,
    ) -> QuoteAggregator {
        let chain = Arc::new(mainnet());
        let router = with_router.then(|| {
            CurveRouterSource::new(Arc::new(FixedRateRouterClient {
                rate: BigDecimal::from_str("0.999").unwrap(),
            }))
        });

        QuoteAggregator::new(
            chain.clone(),
            uniswap,
            CurveSinglePoolSource::new(chain, reader),
            router,
            ConvergenceConfig::default(),
        )
    }

    /// Test that every source contributes a quote, in order, with slippage
    #[tokio::test]
    async fn test_all_sources() {
        let agg = aggregator(
            Arc::new(MockUniswap::quoting(1_010_000)),
            Arc::new(FixedRateReader::new(998)),
            true, // with_router
        );
        let (usdt, usdc) = (token("USDT"), token("USDC"));

        let quotes = agg.fetch_all_quotes(U256::from(1_000_000u64), &usdt, &usdc, 50, &[]).await;
        let venues: Vec<Venue> = quotes.iter().map(|(_, v)| *v).collect();
        assert_eq!(venues, vec![Venue::Uniswap, Venue::Curve, Venue::Curve]);

        let (uniswap, _) = &quotes[0];
        assert_eq!(uniswap.amount_in, U256::from(1_015_050u64));
        assert_eq!(uniswap.slippage, Some(U256::from(5_050u64)));
        assert_eq!(uniswap.path[0].amount_in, Some(uniswap.amount_in));

        // The single-pool hop resolves against the plain 3pool
        let (single, _) = &quotes[1];
        let hop = &single.path[0];
        assert_eq!(hop.swap_params, Some(CurveSwapParams { in_index: 2, out_index: 1, swap_type: 1 }));
        assert_eq!(hop.factory_address, Some(Address::ZERO));
        for (quote, _) in &quotes {
            assert_eq!(quote.path[0].token_in, usdt.address);
        }
    }

    /// Test that a failing source drops only its own quote
    #[tokio::test]
    async fn test_source_isolation() {
        let agg = aggregator(
            Arc::new(MockUniswap::failing()),
            Arc::new(FixedRateReader::new(998)),
            false, // with_router
        );
        let (usdt, usdc) = (token("USDT"), token("USDC"));

        let quotes = agg.fetch_all_quotes(U256::from(1_000_000u64), &usdt, &usdc, 0, &[]).await;
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].1, Venue::Curve);

        let agg = aggregator(
            Arc::new(MockUniswap::quoting(1_010_000)),
            Arc::new(FailingReader),
            false, // with_router
        );
        let quotes = agg.fetch_all_quotes(U256::from(1_000_000u64), &usdt, &usdc, 0, &[]).await;
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].1, Venue::Uniswap);
    }

    /// Test that excluded venues are never queried
    #[tokio::test]
    async fn test_excluded_venues() {
        let uniswap = Arc::new(MockUniswap::quoting(1_010_000));
        let agg = aggregator(uniswap.clone(), Arc::new(FixedRateReader::new(998)), true);
        let (usdt, usdc) = (token("USDT"), token("USDC"));

        let quotes = agg
            .fetch_all_quotes(U256::from(1_000_000u64), &usdt, &usdc, 0, &[Venue::Uniswap])
            .await;
        assert!(uniswap.calls.lock().unwrap().is_empty());
        assert!(quotes.iter().all(|(_, v)| *v == Venue::Curve));

        let quotes = agg
            .fetch_all_quotes(U256::from(1_000_000u64), &usdt, &usdc, 0, &[Venue::Uniswap, Venue::Curve])
            .await;
        assert!(quotes.is_empty());
    }

    /// Test that native tokens are quoted in their wrapped form and restored
    /// in the returned path
    #[tokio::test]
    async fn test_native_substitution() {
        let uniswap = Arc::new(MockUniswap::quoting(500_000_000_000_000));
        let agg = aggregator(uniswap.clone(), Arc::new(FailingReader), false);
        let (eth, usdc, weth) = (token("ETH"), token("USDC"), token("WETH"));

        let quotes = agg.fetch_all_quotes(U256::from(1_000_000u64), &eth, &usdc, 0, &[]).await;
        assert_eq!(uniswap.calls.lock().unwrap()[0], (weth.address, usdc.address));
        assert_eq!(quotes[0].0.path[0].token_in, NATIVE_TOKEN_ADDRESS);

        let quotes = agg.fetch_all_quotes(U256::from(1_000_000u64), &usdc, &eth, 0, &[]).await;
        assert_eq!(uniswap.calls.lock().unwrap()[1], (usdc.address, weth.address));
        assert_eq!(quotes[0].0.last_hop().unwrap().token_out, NATIVE_TOKEN_ADDRESS);
    }

    /// Test that a native output restored by the aggregator reaches the
    /// encoded Uniswap path
    #[tokio::test]
    async fn test_native_output_payload() {
        let agg = aggregator(
            Arc::new(MockUniswap::quoting(2_000_000)),
            Arc::new(FailingReader),
            false, // with_router
        );
        let (usdc, eth) = (token("USDC"), token("ETH"));
        let invoice = usd_invoice();

        let quotes = agg.fetch_all_quotes(U256::from(1_000_000u64), &usdc, &eth, 0, &[]).await;
        let (quote, venue) = &quotes[0];
        assert_eq!(*venue, Venue::Uniswap);

        let payload = create_payload(&PaymentParams {
            chain: agg.chain(),
            sender: SENDER,
            token_in: &usdc,
            invoice: &invoice,
            quote: Some(quote),
            venue: Some(*venue),
            return_remainder: false,
            price_feed_details: None,
        })
        .unwrap();
        let PaymentCall::Uniswap(call) = &payload.call else { panic!("expected uniswap call") };

        let (path_out, _, path_in) = SingleHopPath::abi_decode_params(&call.params.path).unwrap();
        assert_eq!(path_out, NATIVE_TOKEN_ADDRESS);
        assert_eq!(path_in, usdc.address);
        assert_eq!(payload.token_out, eth);
    }

    /// Test that a single-pool quote through an unregistered pool is dropped
    #[tokio::test]
    async fn test_unresolvable_pool_dropped() {
        let agg = aggregator(
            Arc::new(MockUniswap::failing()),
            Arc::new(FixedRateReader::new(998)),
            false, // with_router
        );
        // WBTC is not part of the mock pool
        let (wbtc, usdc) = (token("WBTC"), token("USDC"));

        let quotes = agg.fetch_all_quotes(U256::from(1_000_000u64), &wbtc, &usdc, 0, &[]).await;
        assert!(quotes.is_empty());
    }
}
