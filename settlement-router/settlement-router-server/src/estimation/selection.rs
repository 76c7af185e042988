//! Picks the cheapest candidate route

use alloy_primitives::{Address, I256, U256};
use settlement_router_api::{
    estimate::EstimationResult,
    invoice::Invoice,
    payment::PriceFeedDetails,
    quote::{Quote, Venue},
    token::TokenInfo,
};
use tracing::{info, instrument, warn};

use crate::{error::SettlementError, fixed_point::to_signed, routing::QuoteAggregator};

use super::{CostEvaluator, EstimationContext, NativePrice};

/// The inputs to a best-route search
#[derive(Clone, Copy, Debug)]
pub struct SwapQuoteParams<'a> {
    /// The paying address
    pub sender: Address,
    /// The invoice being settled
    pub invoice: &'a Invoice,
    /// The exact amount of `token_out` required
    pub amount_out: U256,
    /// The token the payer sells
    pub token_in: &'a TokenInfo,
    /// The token the receiver is paid in
    pub token_out: &'a TokenInfo,
    /// The slippage allowance in basis points
    pub slippage_bps: u32,
    /// Venues to skip
    pub excluded_venues: &'a [Venue],
    /// The native coin's USD price; without it selection ignores gas
    pub native_price: Option<NativePrice>,
    /// The oracle conversion, if any
    pub price_feed_details: Option<&'a PriceFeedDetails>,
}

/// The all-in cost of a candidate, in input-token units
///
/// `amount_in + gas * amount_in / amount_out`, plus the remainder delta
/// converted the same way when the remainder would be returned
pub fn effective_cost(estimate: &EstimationResult) -> I256 {
    let amount_in = to_signed(estimate.quote.amount_in);
    let amount_out = to_signed(estimate.quote.amount_out);
    if amount_out.is_zero() {
        return I256::MAX;
    }

    let gas = to_signed(estimate.gas_in_invoice_currency) * amount_in / amount_out;
    let remainder = if estimate.should_return_remainder {
        estimate.return_remainder_delta * amount_in / amount_out
    } else {
        I256::ZERO
    };

    amount_in + gas + remainder
}

/// The estimate with the lowest effective cost; ties go to the later one
pub fn determine_cheapest_swap_with_gas(
    estimates: &[EstimationResult],
) -> Option<&EstimationResult> {
    estimates.iter().reduce(|best, next| {
        if effective_cost(best) < effective_cost(next) {
            best
        } else {
            next
        }
    })
}

/// The quote with the lowest input amount; ties go to the later one
pub fn determine_cheapest_swap_without_gas(
    quotes: &[(Quote, Venue)],
) -> Option<&(Quote, Venue)> {
    quotes.iter().reduce(|best, next| {
        if best.0.amount_in < next.0.amount_in {
            best
        } else {
            next
        }
    })
}

/// Fetch every venue's quote and return the cheapest
///
/// With a native price the candidates are ranked by their gas- and
/// remainder-adjusted cost; without one, or when no candidate could be
/// estimated, the lowest input amount wins
#[instrument(skip_all, fields(
    token_in = %params.token_in.symbol,
    token_out = %params.token_out.symbol,
))]
pub async fn fetch_swap_quote(
    aggregator: &QuoteAggregator,
    evaluator: &CostEvaluator,
    params: &SwapQuoteParams<'_>,
) -> Result<(Quote, Venue), SettlementError> {
    let quotes = aggregator
        .fetch_all_quotes(
            params.amount_out,
            params.token_in,
            params.token_out,
            params.slippage_bps,
            params.excluded_venues,
        )
        .await;

    match quotes.len() {
        0 => {
            return Err(SettlementError::quote(
                "Failed to get quotes for both Uniswap and Curve in `fetchSwapQuotes`",
            ))
        },
        1 => return Ok(quotes[0].clone()),
        _ => {},
    }

    if let Some(native_price) = params.native_price {
        let ctx = EstimationContext {
            chain: aggregator.chain(),
            sender: params.sender,
            invoice: params.invoice,
            token_in: params.token_in,
            token_out: params.token_out,
            native_price,
            price_feed_details: params.price_feed_details,
        };

        let estimates = evaluator.fetch_estimates(&quotes, &ctx).await?;
        if let Some(best) = determine_cheapest_swap_with_gas(&estimates) {
            info!("selected {} route at effective cost {}", best.venue, effective_cost(best));
            return Ok((best.quote.clone(), best.venue));
        }
        warn!("no candidate could be estimated, selecting without gas");
    }

    determine_cheapest_swap_without_gas(&quotes)
        .cloned()
        .ok_or_else(|| SettlementError::quote("no quote to select from"))
}
