//! Builds the settlement router call for a chosen payment route

pub mod abi;
pub mod v1;

use alloy_primitives::{aliases::U24, Address, Bytes, B256, U256};
use alloy_sol_types::{sol_data, SolCall, SolType};
use serde_json::json;
use settlement_router_api::{
    invoice::{Invoice, MAX_MEMO_BYTES},
    payment::{PaymentPayloadResponse, PriceFeedDetails},
    quote::{Quote, Venue},
    token::TokenInfo,
};
use tracing::instrument;

use crate::{chain::ChainInfo, error::SettlementError, fixed_point::scale_minor_units};

use self::abi::{
    IYodlRouterV1,
    IYodlRouterV2::{
        payWithCurveCall, payWithTokenCall, payWithUniswapCall, YodlCurveParams,
        YodlUniswapParams,
    },
};

// -------------
// | Constants |
// -------------

/// The maximum number of hops in a Uniswap exact-output path
const MAX_UNISWAP_HOPS: usize = 2;
/// The maximum number of hops the Curve router accepts
const MAX_CURVE_HOPS: usize = 4;
/// The length of the Curve router's flattened route
const CURVE_ROUTE_LEN: usize = 2 * MAX_CURVE_HOPS + 1;

/// The Uniswap swap type of a single-pool swap
const UNISWAP_SINGLE_HOP: u8 = 0;
/// The Uniswap swap type of a multi-pool swap
const UNISWAP_MULTI_HOP: u8 = 1;

/// The ABI layout of a single-hop exact-output path: `tokenOut, fee, tokenIn`
pub(crate) type SingleHopPath = (sol_data::Address, sol_data::Uint<24>, sol_data::Address);
/// The ABI layout of a two-hop exact-output path, reversed from the trade
/// direction
pub(crate) type TwoHopPath = (
    sol_data::Address,
    sol_data::Uint<24>,
    sol_data::Address,
    sol_data::Uint<24>,
    sol_data::Address,
);

// ---------
// | Types |
// ---------

/// The inputs to payload construction
#[derive(Clone, Copy, Debug)]
pub struct PaymentParams<'a> {
    /// The chain the payment settles on
    pub chain: &'a ChainInfo,
    /// The paying address
    pub sender: Address,
    /// The token the payer sells
    pub token_in: &'a TokenInfo,
    /// The invoice being settled
    pub invoice: &'a Invoice,
    /// The chosen route, absent for a direct payment
    pub quote: Option<&'a Quote>,
    /// The chosen venue, absent for a direct payment
    pub venue: Option<Venue>,
    /// Whether the router should return any swap remainder to the payer
    pub return_remainder: bool,
    /// The oracle conversion, if any
    pub price_feed_details: Option<&'a PriceFeedDetails>,
}

impl PaymentParams<'_> {
    /// Whether the params describe a swap rather than a direct payment
    pub fn is_swap(&self) -> bool {
        !matches!(self.venue, None | Some(Venue::None))
    }

    /// The feed pair to pass to the router, zero-filled when no conversion
    /// applies
    fn feed_pair(&self) -> [Address; 2] {
        self.price_feed_details.map(PriceFeedDetails::feed_pair).unwrap_or_default()
    }

    /// The extra fee receiver, zero when absent
    fn extra_fee_receiver(&self) -> Address {
        self.invoice.extra_fee_address.unwrap_or(Address::ZERO)
    }
}

/// A typed router call
#[derive(Clone, Debug)]
pub enum PaymentCall {
    /// A direct payment through the current router
    Direct(payWithTokenCall),
    /// A Uniswap swap payment
    Uniswap(payWithUniswapCall),
    /// A Curve swap payment
    Curve(payWithCurveCall),
    /// A direct payment through the legacy router
    DirectV1(IYodlRouterV1::payWithTokenCall),
}

impl PaymentCall {
    /// The router function name
    pub fn function_name(&self) -> &'static str {
        match self {
            PaymentCall::Direct(_) | PaymentCall::DirectV1(_) => "payWithToken",
            PaymentCall::Uniswap(_) => "payWithUniswap",
            PaymentCall::Curve(_) => "payWithCurve",
        }
    }

    /// The ABI-encoded calldata, selector included
    pub fn calldata(&self) -> Bytes {
        let data = match self {
            PaymentCall::Direct(call) => call.abi_encode(),
            PaymentCall::Uniswap(call) => call.abi_encode(),
            PaymentCall::Curve(call) => call.abi_encode(),
            PaymentCall::DirectV1(call) => call.abi_encode(),
        };
        Bytes::from(data)
    }

    /// The ordered call arguments, with integers rendered as decimal strings
    pub fn contract_args(&self) -> Vec<serde_json::Value> {
        match self {
            PaymentCall::Direct(call) => vec![
                json!(call.memo),
                json!(call.amount.to_string()),
                json!(call.priceFeeds),
                json!(call.token),
                json!(call.receiver),
                json!(call.extraFeeReceiver),
                json!(call.extraFeeBps.to_string()),
            ],
            PaymentCall::DirectV1(call) => vec![
                json!(call.memo),
                json!(call.amount.to_string()),
                json!(call.priceFeeds),
                json!(call.token),
                json!(call.receiver),
                json!(call.extraFeeReceiver),
                json!(call.extraFeeDivisor.to_string()),
            ],
            PaymentCall::Uniswap(call) => {
                let p = &call.params;
                vec![json!({
                    "sender": p.sender,
                    "receiver": p.receiver,
                    "amountIn": p.amountIn.to_string(),
                    "amountOut": p.amountOut.to_string(),
                    "memo": p.memo,
                    "path": p.path,
                    "priceFeeds": p.priceFeeds,
                    "extraFeeReceiver": p.extraFeeReceiver,
                    "extraFeeBps": p.extraFeeBps.to_string(),
                    "returnRemainder": p.returnRemainder,
                    "swapType": p.swapType,
                })]
            },
            PaymentCall::Curve(call) => {
                let p = &call.params;
                let swap_params: Vec<Vec<String>> = p
                    .swapParams
                    .iter()
                    .map(|hop| hop.iter().map(U256::to_string).collect())
                    .collect();
                vec![json!({
                    "sender": p.sender,
                    "receiver": p.receiver,
                    "amountIn": p.amountIn.to_string(),
                    "amountOut": p.amountOut.to_string(),
                    "memo": p.memo,
                    "route": p.route,
                    "swapParams": swap_params,
                    "factoryAddresses": p.factoryAddresses,
                    "priceFeeds": p.priceFeeds,
                    "extraFeeReceiver": p.extraFeeReceiver,
                    "extraFeeBps": p.extraFeeBps.to_string(),
                    "returnRemainder": p.returnRemainder,
                })]
            },
        }
    }
}

/// A fully built payment
#[derive(Clone, Debug)]
pub struct PaymentPayload {
    /// The token the receiver is paid in
    pub token_out: TokenInfo,
    /// The router call
    pub call: PaymentCall,
    /// The native value to attach
    pub value: U256,
    /// Whether the payment swaps
    pub is_swap: bool,
}

impl PaymentPayload {
    /// Render the payload for API consumers
    pub fn to_response(&self) -> PaymentPayloadResponse {
        PaymentPayloadResponse {
            token_out: self.token_out.clone(),
            contract_function_name: self.call.function_name().to_string(),
            contract_args: self.call.contract_args(),
            value: self.value,
            is_swap: self.is_swap,
            calldata: self.call.calldata(),
        }
    }
}

// -----------
// | Helpers |
// -----------

/// Encode a memo as a right-padded 32-byte word
pub fn encode_memo(memo: Option<&str>) -> Result<B256, SettlementError> {
    let bytes = memo.unwrap_or_default().as_bytes();
    if bytes.len() > MAX_MEMO_BYTES {
        return Err(SettlementError::validation(format!(
            "Memo exceeds {MAX_MEMO_BYTES} bytes."
        )));
    }

    Ok(B256::right_padding_from(bytes))
}

/// Resolve the address that receives a payment in `token_in`
///
/// Per-chain token overrides take precedence over the chain default, which
/// takes precedence over the invoice recipient. An absent or zero result
/// falls back to the sender
pub fn resolve_receiver(
    chain_id: u64,
    token_in: &TokenInfo,
    invoice: &Invoice,
    sender: Address,
) -> Address {
    let receiver = match invoice.coin_config(chain_id) {
        Some(config) => config
            .tokens
            .iter()
            .find(|t| t.symbol == token_in.symbol)
            .and_then(|t| t.address)
            .or(config.default_address)
            .or(invoice.recipient_address),
        None => invoice.recipient_address,
    };

    receiver.filter(|addr| !addr.is_zero()).unwrap_or(sender)
}

// ------------
// | Builders |
// ------------

/// Build the current-router call for a payment
#[instrument(skip_all, fields(token_in = %params.token_in.symbol, venue = ?params.venue))]
pub fn create_payload(params: &PaymentParams<'_>) -> Result<PaymentPayload, SettlementError> {
    let receiver =
        resolve_receiver(params.chain.chain_id, params.token_in, params.invoice, params.sender);
    let memo = encode_memo(params.invoice.memo.as_deref())?;

    if !params.is_swap() {
        return create_direct_payload(params, receiver, memo);
    }

    let quote = params.quote.ok_or_else(|| {
        SettlementError::validation("swapQuote is not present for a payment that should be a swap.")
    })?;
    let token_out_address = quote.last_hop().map(|hop| hop.token_out).unwrap_or_default();
    let token_out = params
        .chain
        .token(&token_out_address)
        .ok_or_else(|| SettlementError::validation("Could not find token out in tokenslist."))?
        .clone();

    // The swap output is denominated in the token the receiver is paid in
    let amount_out = scale_minor_units(params.invoice.amount_in_minor, token_out.decimals);
    let call = match params.venue {
        Some(Venue::Uniswap) => PaymentCall::Uniswap(build_uniswap_call(
            params, quote, receiver, memo, amount_out,
        )?),
        Some(Venue::Curve) => {
            PaymentCall::Curve(build_curve_call(params, quote, receiver, memo, amount_out)?)
        },
        _ => return Err(SettlementError::validation("Invalid swapVenue provided.")),
    };

    let value =
        if params.chain.is_native(params.token_in) { quote.amount_in } else { U256::ZERO };
    Ok(PaymentPayload { token_out, call, value, is_swap: true })
}

/// Build a direct `payWithToken` call
fn create_direct_payload(
    params: &PaymentParams<'_>,
    receiver: Address,
    memo: B256,
) -> Result<PaymentPayload, SettlementError> {
    let token_in = params.token_in;
    let amount = scale_minor_units(params.invoice.amount_in_minor, token_in.decimals);

    let call = payWithTokenCall {
        memo,
        amount,
        priceFeeds: params.feed_pair(),
        token: token_in.address,
        receiver,
        extraFeeReceiver: params.extra_fee_receiver(),
        extraFeeBps: U256::from(params.invoice.extra_fee_bps.unwrap_or_default()),
    };

    // Native payments carry the converted amount as value
    let value = if params.chain.is_native(token_in) {
        params.price_feed_details.map(|d| d.converted_amount).unwrap_or(amount)
    } else {
        U256::ZERO
    };

    Ok(PaymentPayload {
        token_out: token_in.clone(),
        call: PaymentCall::Direct(call),
        value,
        is_swap: false,
    })
}

/// Build a `payWithUniswap` call
fn build_uniswap_call(
    params: &PaymentParams<'_>,
    quote: &Quote,
    receiver: Address,
    memo: B256,
    amount_out: U256,
) -> Result<payWithUniswapCall, SettlementError> {
    let path = encode_uniswap_path(params.chain, quote)?;
    let swap_type = if quote.path.len() == 1 { UNISWAP_SINGLE_HOP } else { UNISWAP_MULTI_HOP };

    let uniswap_params = YodlUniswapParams {
        sender: params.sender,
        receiver,
        amountIn: quote.amount_in,
        amountOut: amount_out,
        memo,
        path,
        priceFeeds: params.feed_pair(),
        extraFeeReceiver: Address::ZERO,
        extraFeeBps: U256::ZERO,
        returnRemainder: params.return_remainder,
        swapType: swap_type,
    };

    Ok(payWithUniswapCall { params: uniswap_params })
}

/// Encode a quote as an exact-output path, ordered from output to input
///
/// Only the originating input is wrapped. A native terminal output stays the
/// native sentinel, which the router unwraps before paying the receiver
fn encode_uniswap_path(chain: &ChainInfo, quote: &Quote) -> Result<Bytes, SettlementError> {
    let hop_fee = |i: usize| -> Result<U24, SettlementError> {
        let fee = &quote.path[i].pool_fee;
        fee.parse()
            .map_err(|_| SettlementError::validation(format!("Invalid Uniswap pool fee: {fee}")))
    };

    let encoded = match quote.path.as_slice() {
        [hop] => SingleHopPath::abi_encode_params(&(
            hop.token_out,
            hop_fee(0)?,
            chain.wrap_native(hop.token_in),
        )),
        [first, second] => TwoHopPath::abi_encode_params(&(
            second.token_out,
            hop_fee(1)?,
            second.token_in,
            hop_fee(0)?,
            chain.wrap_native(first.token_in),
        )),
        hops if hops.len() > MAX_UNISWAP_HOPS => {
            return Err(SettlementError::validation(
                "Invalid Uniswap path with more than two pools",
            ))
        },
        _ => return Err(SettlementError::validation("Uniswap path is empty")),
    };

    Ok(Bytes::from(encoded))
}

/// Build a `payWithCurve` call
fn build_curve_call(
    params: &PaymentParams<'_>,
    quote: &Quote,
    receiver: Address,
    memo: B256,
    amount_out: U256,
) -> Result<payWithCurveCall, SettlementError> {
    if quote.path.len() > MAX_CURVE_HOPS {
        return Err(SettlementError::validation("Swap path is too long."));
    }

    let mut route = [Address::ZERO; CURVE_ROUTE_LEN];
    let mut swap_params = [[U256::ZERO; 3]; MAX_CURVE_HOPS];
    let mut factory_addresses = [Address::ZERO; MAX_CURVE_HOPS];
    for (i, hop) in quote.path.iter().enumerate() {
        // The router wraps native input before the first hop
        if i == 0 {
            route[0] = params.chain.wrap_native(hop.token_in);
        }
        route[2 * i + 1] = hop.pool_address;
        route[2 * i + 2] = hop.token_out;
        swap_params[i] = hop.swap_params.unwrap_or_default().to_words();
        factory_addresses[i] = hop.factory_address.unwrap_or_default();
    }

    let first_params_zero = swap_params[0].iter().all(U256::is_zero);
    if route[..3].iter().any(|a| a.is_zero()) || first_params_zero {
        return Err(SettlementError::validation(
            "Failed to get valid values for route and/or swapParams.",
        ));
    }

    let curve_params = YodlCurveParams {
        sender: params.sender,
        receiver,
        amountIn: quote.amount_in,
        amountOut: amount_out,
        memo,
        route,
        swapParams: swap_params,
        factoryAddresses: factory_addresses,
        priceFeeds: params.feed_pair(),
        extraFeeReceiver: Address::ZERO,
        extraFeeBps: U256::ZERO,
        returnRemainder: params.return_remainder,
    };

    Ok(payWithCurveCall { params: curve_params })
}
