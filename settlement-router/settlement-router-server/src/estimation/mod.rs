//! Gas- and remainder-adjusted cost estimation for candidate routes

pub mod chain_client;
pub mod selection;

use std::sync::Arc;

use alloy_primitives::{I256, U256};
use futures::future::join_all;
use settlement_router_api::{
    estimate::EstimationResult,
    invoice::Invoice,
    payment::{PriceFeedDetails, APPROXIMATE_RATE_DECIMALS},
    quote::{Quote, Venue},
    token::{currency, TokenInfo},
};
use tracing::{info, instrument, warn};

use crate::{
    chain::{ChainInfo, RouterVersion},
    error::SettlementError,
    fixed_point::{pow10, scale_minor_units, to_signed},
    payload::{create_payload, PaymentParams},
    price_feeds::PriceFeedReader,
};

use self::chain_client::{ChainSimulator, TrialTransaction};

// -------------
// | Constants |
// -------------

/// The flat gas-unit estimate for returning a settlement remainder to the
/// payer. A documented heuristic, not a measured cost
pub const RETURN_REMAINDER_COST: u64 = 50_000;

/// The identity USD price used for USD invoices
const USD_FEED_PRICE: u64 = 100_000_000;
/// The decimals of `USD_FEED_PRICE`
const USD_FEED_DECIMALS: u8 = 8;

// ---------
// | Types |
// ---------

/// The USD price of a chain's native coin
#[derive(Copy, Clone, Debug)]
pub struct NativePrice {
    /// The price, as a fixed-point integer
    pub price: U256,
    /// The decimals of `price`
    pub decimals: u8,
}

impl NativePrice {
    /// Build a price from optional request fields; a missing or zero field
    /// means gas data is unavailable
    pub fn from_parts(price: Option<U256>, decimals: Option<u8>) -> Option<Self> {
        match (price, decimals) {
            (Some(price), Some(decimals)) if !price.is_zero() && decimals != 0 => {
                Some(Self { price, decimals })
            },
            _ => None,
        }
    }
}

/// The shared inputs of a round of estimation
#[derive(Clone, Copy, Debug)]
pub struct EstimationContext<'a> {
    /// The chain being settled on
    pub chain: &'a ChainInfo,
    /// The paying address
    pub sender: alloy_primitives::Address,
    /// The invoice being settled
    pub invoice: &'a Invoice,
    /// The token the payer sells
    pub token_in: &'a TokenInfo,
    /// The token the receiver is paid in
    pub token_out: &'a TokenInfo,
    /// The native coin's USD price
    pub native_price: NativePrice,
    /// The oracle conversion, if any
    pub price_feed_details: Option<&'a PriceFeedDetails>,
}

impl EstimationContext<'_> {
    /// Whether the invoice is denominated in the chain's native coin
    fn invoice_in_native(&self) -> bool {
        self.invoice.currency == self.chain.native_currency.symbol
    }

    /// Convert a wei amount to USD, in the output token's decimals
    fn gas_cost_in_usd(&self, wei: U256) -> U256 {
        let usd = wei * self.native_price.price / pow10(self.native_price.decimals);
        let native_decimals = self.chain.native_currency.decimals;
        let out_decimals = self.token_out.decimals;
        if native_decimals >= out_decimals {
            usd / pow10(native_decimals - out_decimals)
        } else {
            usd * pow10(out_decimals - native_decimals)
        }
    }
}

// -------------
// | Evaluator |
// -------------

/// Dry-runs candidate routes and prices their settlement cost
#[derive(Clone)]
pub struct CostEvaluator {
    /// The chain simulator
    simulator: Arc<dyn ChainSimulator>,
    /// The oracle reader, for the invoice currency's USD price
    feeds: Arc<dyn PriceFeedReader>,
}

impl CostEvaluator {
    /// Create a new evaluator
    pub fn new(simulator: Arc<dyn ChainSimulator>, feeds: Arc<dyn PriceFeedReader>) -> Self {
        Self { simulator, feeds }
    }

    /// Estimate the cost of every candidate concurrently
    ///
    /// A failing candidate is dropped without affecting the others, so an
    /// empty result means gas data is unavailable for every candidate
    #[instrument(skip_all, fields(candidates = candidates.len()))]
    pub async fn fetch_estimates(
        &self,
        candidates: &[(Quote, Venue)],
        ctx: &EstimationContext<'_>,
    ) -> Result<Vec<EstimationResult>, SettlementError> {
        if ctx.chain.router_address(RouterVersion::V2).is_none() {
            return Err(SettlementError::config(
                "Could not fetch YODL router address for the given chain.",
            ));
        }

        let futures = candidates.iter().map(|(quote, venue)| async move {
            (*venue, self.simulate_transaction(quote, *venue, ctx).await)
        });
        let results = join_all(futures).await;

        let mut estimates = Vec::new();
        for (venue, res) in results {
            match res {
                Ok(estimate) => estimates.push(estimate),
                Err(e) => warn!("Error estimating {venue} route: {e}"),
            }
        }

        Ok(estimates)
    }

    /// Dry-run a single candidate and price its gas and remainder
    pub async fn simulate_transaction(
        &self,
        quote: &Quote,
        venue: Venue,
        ctx: &EstimationContext<'_>,
    ) -> Result<EstimationResult, SettlementError> {
        if quote.amount_in.is_zero() {
            return Err(SettlementError::simulation("quote has no input amount"));
        }

        let router = ctx.chain.router_address(RouterVersion::V2).ok_or_else(|| {
            SettlementError::config("Could not fetch YODL router address for the given chain.")
        })?;
        let (feed_price, feed_decimals) = self.invoice_feed_price(ctx).await?;

        // Trial payloads never return the remainder
        let payload = create_payload(&PaymentParams {
            chain: ctx.chain,
            sender: ctx.sender,
            token_in: ctx.token_in,
            invoice: ctx.invoice,
            quote: Some(quote),
            venue: Some(venue),
            return_remainder: false,
            price_feed_details: ctx.price_feed_details,
        })?;
        let tx = TrialTransaction {
            from: ctx.sender,
            to: router,
            value: payload.value,
            calldata: payload.call.calldata(),
        };

        let gas_price = self.simulator.gas_price().await?;
        let (gas, simulated, l1_fee) = tokio::try_join!(
            self.simulator.estimate_gas(&tx),
            self.simulator.simulate(&tx),
            self.simulator.l1_fee(ctx.chain.chain_id, &tx, gas_price),
        )?;

        let invoice_amount = scale_minor_units(ctx.invoice.amount_in_minor, ctx.token_out.decimals);
        let remainder_in_invoice_currency =
            remainder_in_invoice_currency(quote, venue, simulated, invoice_amount, ctx);

        let feed_scale = pow10(feed_decimals);
        let remainder_gas_wei = U256::from(RETURN_REMAINDER_COST) * gas_price;
        let gas_wei = gas * gas_price + l1_fee;
        let gas_in_usd = ctx.gas_cost_in_usd(gas_wei);

        let (return_remainder_cost, gas_in_invoice_currency) = if ctx.invoice_in_native() {
            (remainder_gas_wei, gas_wei)
        } else {
            (
                ctx.gas_cost_in_usd(remainder_gas_wei) * feed_price / feed_scale,
                gas_in_usd * feed_price / feed_scale,
            )
        };

        let signed_cost = to_signed(return_remainder_cost);
        info!(
            "{venue} route: gas={gas}, gas_price={gas_price}, l1_fee={l1_fee}, remainder={remainder_in_invoice_currency}"
        );

        Ok(EstimationResult {
            quote: quote.clone(),
            venue,
            gas,
            gas_price,
            gas_in_invoice_currency,
            gas_in_usd,
            remainder_in_invoice_currency,
            return_remainder_cost,
            return_remainder_delta: remainder_in_invoice_currency - signed_cost,
            should_return_remainder: remainder_in_invoice_currency > signed_cost,
            token_out: ctx.token_out.clone(),
        })
    }

    /// The USD price of the invoice currency
    async fn invoice_feed_price(
        &self,
        ctx: &EstimationContext<'_>,
    ) -> Result<(U256, u8), SettlementError> {
        let currency = ctx.invoice.currency.as_str();
        if currency == currency::USD || ctx.invoice_in_native() {
            return Ok((U256::from(USD_FEED_PRICE), USD_FEED_DECIMALS));
        }

        let feed = ctx.chain.price_feeds.get(currency).ok_or_else(|| {
            SettlementError::validation("Feed address not present for invoice currency")
        })?;
        self.feeds.latest_rate(*feed).await
    }
}

/// The settlement remainder, expressed in invoice-currency units
///
/// Uniswap legs spend at most the quoted input, leaving input-token change;
/// Curve legs receive at least the required output, leaving output-token
/// surplus
fn remainder_in_invoice_currency(
    quote: &Quote,
    venue: Venue,
    simulated: U256,
    invoice_amount: U256,
    ctx: &EstimationContext<'_>,
) -> I256 {
    let (remainder, mut in_invoice_currency) = match venue {
        Venue::Uniswap => {
            let remainder = to_signed(quote.amount_in) - to_signed(simulated);
            let projected = remainder * to_signed(quote.amount_out) / to_signed(quote.amount_in);
            (remainder, projected)
        },
        Venue::Curve => {
            let remainder = to_signed(simulated) - to_signed(invoice_amount);
            (remainder, remainder)
        },
        Venue::None => (I256::ZERO, I256::ZERO),
    };

    let rate = ctx.price_feed_details.map(|d| d.approximate_rate).unwrap_or_default();
    if !rate.is_zero() && !ctx.invoice_in_native() {
        in_invoice_currency =
            remainder * to_signed(rate) / to_signed(pow10(APPROXIMATE_RATE_DECIMALS));
    }

    in_invoice_currency
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{collections::HashMap, sync::Mutex};

    use alloy_primitives::{address, Address};
    use alloy_sol_types::SolCall;
    use async_trait::async_trait;
    use settlement_router_api::quote::{CurveSwapParams, Pool};

    use super::*;
    use crate::{
        chain::mainnet,
        payload::{
            abi::IYodlRouterV2::{payWithCurveCall, payWithUniswapCall},
            tests::{token, usd_invoice, SENDER},
        },
        price_feeds::tests::MockFeeds,
    };

    /// The router deployment used in tests
    pub(crate) const ROUTER: Address = address!("6dcbc91229d812910b54df91b5c2b592572cd6b0");

    /// Mainnet with a router deployment
    pub(crate) fn chain_with_router() -> ChainInfo {
        let mut chain = mainnet();
        chain.router_addresses.insert(RouterVersion::V2, ROUTER);
        chain
    }

    /// The four-byte selector of a router call
    pub(crate) type Selector = [u8; 4];

    /// A simulator returning fixed results, keyed by the router function
    /// a trial calls
    pub(crate) struct MockSimulator {
        /// The gas price in wei
        pub gas_price: U256,
        /// The gas units per router function
        pub gas: HashMap<Selector, U256>,
        /// The simulated return value
        pub simulated: U256,
        /// Router functions whose trials revert
        pub reverting: Vec<Selector>,
        /// The number of simulated calls
        pub calls: Mutex<usize>,
    }

    impl MockSimulator {
        /// A simulator pricing both swap functions identically
        pub(crate) fn new(gas_price: u64, gas: u64, simulated: u64) -> Self {
            let gas = U256::from(gas);
            Self {
                gas_price: U256::from(gas_price),
                gas: HashMap::from([
                    (payWithUniswapCall::SELECTOR, gas),
                    (payWithCurveCall::SELECTOR, gas),
                ]),
                simulated: U256::from(simulated),
                reverting: vec![],
                calls: Mutex::new(0),
            }
        }
    }

    /// The selector of a trial transaction
    fn selector(tx: &TrialTransaction) -> Selector {
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&tx.calldata[..4]);
        selector
    }

    #[async_trait]
    impl ChainSimulator for MockSimulator {
        async fn gas_price(&self) -> Result<U256, SettlementError> {
            Ok(self.gas_price)
        }

        async fn estimate_gas(&self, tx: &TrialTransaction) -> Result<U256, SettlementError> {
            let selector = selector(tx);
            if self.reverting.contains(&selector) {
                return Err(SettlementError::simulation("execution reverted"));
            }
            self.gas
                .get(&selector)
                .copied()
                .ok_or_else(|| SettlementError::simulation("unknown router function"))
        }

        async fn simulate(&self, _tx: &TrialTransaction) -> Result<U256, SettlementError> {
            *self.calls.lock().unwrap() += 1;
            Ok(self.simulated)
        }

        async fn l1_fee(
            &self,
            _chain_id: u64,
            _tx: &TrialTransaction,
            _gas_price: U256,
        ) -> Result<U256, SettlementError> {
            Ok(U256::ZERO)
        }
    }

    /// A Uniswap pool used in estimation tests
    pub(crate) const UNI_POOL: Address = address!("3416cF6C708Da44DB2624D63ea0AAef7113527C6");
    /// A Curve pool used in estimation tests
    pub(crate) const CURVE_POOL: Address = address!("bEbc44782C7dB0a1A60Cb6fe97d0b483032FF1C7");

    /// A one-hop Uniswap USDT -> USDC quote
    pub(crate) fn uniswap_quote(amount_in: u64) -> Quote {
        let (usdt, usdc) = (token("USDT"), token("USDC"));
        let mut hop = Pool::new(UNI_POOL, usdt.address, usdc.address);
        hop.pool_fee = "100".to_string();
        Quote {
            path: vec![hop],
            amount_in: U256::from(amount_in),
            amount_out: U256::from(100_000_000u64),
            slippage: None,
            price_impact: None,
        }
    }

    /// A one-hop Curve USDT -> USDC quote
    pub(crate) fn curve_quote(amount_in: u64) -> Quote {
        let (usdt, usdc) = (token("USDT"), token("USDC"));
        let mut hop = Pool::new(CURVE_POOL, usdt.address, usdc.address);
        hop.swap_params = Some(CurveSwapParams {
            in_index: 2,
            out_index: 1,
            swap_type: 1,
        });
        hop.factory_address = Some(Address::ZERO);
        Quote {
            path: vec![hop],
            amount_in: U256::from(amount_in),
            amount_out: U256::from(100_000_000u64),
            slippage: None,
            price_impact: None,
        }
    }

    /// A $100 invoice
    pub(crate) fn hundred_dollar_invoice() -> Invoice {
        let mut invoice = usd_invoice();
        invoice.amount_in_minor = U256::from(10_000u64);
        invoice
    }

    /// ETH at $2000 with 8 decimals
    pub(crate) const ETH_PRICE: NativePrice =
        NativePrice { price: U256::from_limbs([200_000_000_000, 0, 0, 0]), decimals: 8 };

    /// Test the cost of a Uniswap candidate on a USD invoice
    #[tokio::test]
    async fn test_uniswap_estimate() {
        let chain = chain_with_router();
        let (usdt, usdc) = (token("USDT"), token("USDC"));
        let invoice = hundred_dollar_invoice();
        // 10 gwei
        let simulator = MockSimulator::new(10_000_000_000, 150_000, 99_900_000);
        let evaluator = CostEvaluator::new(Arc::new(simulator), Arc::new(MockFeeds::default()));
        let ctx = EstimationContext {
            chain: &chain,
            sender: SENDER,
            invoice: &invoice,
            token_in: &usdt,
            token_out: &usdc,
            native_price: ETH_PRICE,
            price_feed_details: None,
        };

        let quote = uniswap_quote(100_100_000);
        let est = evaluator.simulate_transaction(&quote, Venue::Uniswap, &ctx).await.unwrap();

        // 150k gas at 10 gwei is 0.0015 ETH, $3 at $2000
        assert_eq!(est.gas, U256::from(150_000u64));
        assert_eq!(est.gas_in_usd, U256::from(3_000_000u64));
        assert_eq!(est.gas_in_invoice_currency, U256::from(3_000_000u64));
        // 50k gas at 10 gwei is $1
        assert_eq!(est.return_remainder_cost, U256::from(1_000_000u64));
        // 0.2 USDT of change, projected at 100 / 100.1
        assert_eq!(est.remainder_in_invoice_currency, I256::try_from(199_800i64).unwrap());
        assert!(!est.should_return_remainder);
        assert_eq!(est.return_remainder_delta, I256::try_from(-800_200i64).unwrap());
    }

    /// Test the Curve remainder and the invoice feed conversion
    #[tokio::test]
    async fn test_curve_estimate_eur_invoice() {
        let chain = chain_with_router();
        let (usdt, usdc) = (token("USDT"), token("USDC"));
        let mut invoice = hundred_dollar_invoice();
        invoice.currency = "EUR".to_string();

        let simulator = MockSimulator::new(10_000_000_000, 150_000, 103_000_000);
        // EUR at $1.10
        let feeds = MockFeeds::with_rate(
            address!("b49f677943BC038e9857d61E7d053CaA2C1734C1"),
            U256::from(110_000_000u64),
            8,
        );
        let evaluator = CostEvaluator::new(Arc::new(simulator), Arc::new(feeds));
        let ctx = EstimationContext {
            chain: &chain,
            sender: SENDER,
            invoice: &invoice,
            token_in: &usdt,
            token_out: &usdc,
            native_price: ETH_PRICE,
            price_feed_details: None,
        };

        let quote = curve_quote(100_200_000);
        let est = evaluator.simulate_transaction(&quote, Venue::Curve, &ctx).await.unwrap();

        assert_eq!(est.gas_in_invoice_currency, U256::from(3_300_000u64));
        assert_eq!(est.return_remainder_cost, U256::from(1_100_000u64));
        assert_eq!(est.remainder_in_invoice_currency, I256::try_from(3_000_000i64).unwrap());
        assert!(est.should_return_remainder);
    }

    /// Test that an invoice currency without a feed fails the candidate
    #[tokio::test]
    async fn test_missing_invoice_feed() {
        let chain = chain_with_router();
        let (usdt, usdc) = (token("USDT"), token("USDC"));
        let mut invoice = hundred_dollar_invoice();
        invoice.currency = "CHF".to_string();

        let simulator = MockSimulator::new(1, 1, 0);
        let evaluator = CostEvaluator::new(Arc::new(simulator), Arc::new(MockFeeds::default()));
        let ctx = EstimationContext {
            chain: &chain,
            sender: SENDER,
            invoice: &invoice,
            token_in: &usdt,
            token_out: &usdc,
            native_price: ETH_PRICE,
            price_feed_details: None,
        };

        let err =
            evaluator.simulate_transaction(&curve_quote(1), Venue::Curve, &ctx).await.unwrap_err();
        assert_eq!(err, SettlementError::validation("Feed address not present for invoice currency"));
    }

    /// Test that a reverting candidate is dropped and a missing router fails
    #[tokio::test]
    async fn test_fetch_estimates_isolation() {
        let chain = chain_with_router();
        let (usdt, usdc) = (token("USDT"), token("USDC"));
        let invoice = hundred_dollar_invoice();

        let mut simulator = MockSimulator::new(10_000_000_000, 150_000, 99_900_000);
        simulator.reverting.push(payWithCurveCall::SELECTOR);
        let evaluator = CostEvaluator::new(Arc::new(simulator), Arc::new(MockFeeds::default()));
        let ctx = EstimationContext {
            chain: &chain,
            sender: SENDER,
            invoice: &invoice,
            token_in: &usdt,
            token_out: &usdc,
            native_price: ETH_PRICE,
            price_feed_details: None,
        };

        let candidates =
            vec![(uniswap_quote(100_100_000), Venue::Uniswap), (curve_quote(100_200_000), Venue::Curve)];
        let estimates = evaluator.fetch_estimates(&candidates, &ctx).await.unwrap();
        assert_eq!(estimates.len(), 1);
        assert_eq!(estimates[0].venue, Venue::Uniswap);

        let no_router = mainnet();
        let ctx = EstimationContext { chain: &no_router, ..ctx };
        let err = evaluator.fetch_estimates(&candidates, &ctx).await.unwrap_err();
        assert_eq!(
            err,
            SettlementError::config("Could not fetch YODL router address for the given chain.")
        );
    }
}
