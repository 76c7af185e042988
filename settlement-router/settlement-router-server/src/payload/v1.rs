//! Payload construction for the legacy router, which only supports direct
//! token payments with at most one price feed

use alloy_primitives::{Address, U256};
use settlement_router_api::payment::PriceFeedDetails;
use tracing::instrument;

use crate::{
    error::SettlementError,
    fixed_point::{scale_minor_units, BPS_DENOMINATOR},
};

use super::{
    abi::IYodlRouterV1::payWithTokenCall, encode_memo, resolve_receiver, PaymentCall,
    PaymentParams, PaymentPayload,
};

/// Convert an extra fee in basis points into the legacy router's divisor,
/// `round(10000 / bps)`, with zero meaning no fee
pub fn extra_fee_divisor(extra_fee_bps: u32) -> U256 {
    if extra_fee_bps == 0 {
        return U256::ZERO;
    }

    // Half-up rounding of 10000 / bps
    let bps = u64::from(extra_fee_bps);
    U256::from((2 * BPS_DENOMINATOR + bps) / (2 * bps))
}

/// Build the legacy-router call for a direct payment
#[instrument(skip_all, fields(token_in = %params.token_in.symbol))]
pub fn create_payload_v1(params: &PaymentParams<'_>) -> Result<PaymentPayload, SettlementError> {
    if params.quote.is_some() || params.is_swap() {
        return Err(SettlementError::validation("Swaps are not supported with the V1 router."));
    }

    let has_second_feed = params
        .price_feed_details
        .map(|d| d.feed_addresses.get(1).is_some_and(|feed| !feed.is_zero()))
        .unwrap_or(false);
    if has_second_feed {
        return Err(SettlementError::validation(
            "Multiple or inverse price feeds are not supported in the V1 router.",
        ));
    }

    let token_in = params.token_in;
    if params.chain.is_native(token_in) {
        return Err(SettlementError::validation(
            "ETH payments are not supported in the V1 router.",
        ));
    }

    let invoice = params.invoice;
    let receiver = resolve_receiver(params.chain.chain_id, token_in, invoice, params.sender);
    let price_feeds: Vec<Address> = params
        .price_feed_details
        .map(|d| vec![PriceFeedDetails::feed_pair(d)[0]])
        .unwrap_or_default();

    let call = payWithTokenCall {
        memo: encode_memo(invoice.memo.as_deref())?,
        amount: scale_minor_units(invoice.amount_in_minor, token_in.decimals),
        priceFeeds: price_feeds,
        token: token_in.address,
        receiver,
        extraFeeReceiver: invoice.extra_fee_address.unwrap_or(Address::ZERO),
        extraFeeDivisor: extra_fee_divisor(invoice.extra_fee_bps.unwrap_or_default()),
    };

    Ok(PaymentPayload {
        token_out: token_in.clone(),
        call: PaymentCall::DirectV1(call),
        value: U256::ZERO,
        is_swap: false,
    })
}
