//! Route handlers for the settlement router

use std::sync::Arc;

use itertools::Itertools;
use settlement_router_api::{
    payment::PaymentPayloadResponse,
    routes::{
        EstimatesRequest, PayloadRequest, PriceFeedRequest, QuotesRequest, SwapParamsQuery,
        SwapQuoteRequest,
    },
};
use warp::reply::Json;

use crate::{
    chain::RouterVersion,
    error::ApiError,
    estimation::{
        selection::{fetch_swap_quote, SwapQuoteParams},
        EstimationContext, NativePrice,
    },
    payload::{create_payload, v1::create_payload_v1, PaymentParams},
    price_feeds::resolve_price_feed_details,
    routing::venues::curve::swap_params::determine_swap_params,
    server::Server,
};

/// Convert an API error into a rejection
fn reject(e: ApiError) -> warp::Rejection {
    warp::reject::custom(e)
}

/// Handler for fetching every venue's quote
pub async fn quotes_handler(
    req: QuotesRequest,
    server: Arc<Server>,
) -> Result<Json, warp::Rejection> {
    server.chain_for(req.chain_id).map_err(reject)?;
    let token_in = server.token(&req.token_in).map_err(reject)?;
    let token_out = server.token(&req.token_out).map_err(reject)?;
    let slippage_bps = server.slippage_bps(req.slippage_bps, &token_in, &token_out);

    let quotes = server
        .aggregator
        .fetch_all_quotes(req.amount_out, &token_in, &token_out, slippage_bps, &req.exclude_venues)
        .await;
    Ok(warp::reply::json(&quotes))
}

/// Handler for fetching the cheapest swap route
pub async fn swap_quote_handler(
    req: SwapQuoteRequest,
    server: Arc<Server>,
) -> Result<Json, warp::Rejection> {
    let quotes = &req.quotes;
    server.chain_for(quotes.chain_id).map_err(reject)?;
    let token_in = server.token(&quotes.token_in).map_err(reject)?;
    let token_out = server.token(&quotes.token_out).map_err(reject)?;

    // Both the request and the invoice may exclude venues
    let excluded_venues = quotes
        .exclude_venues
        .iter()
        .chain(req.invoice.exclude_venues.iter())
        .copied()
        .unique()
        .collect_vec();

    let params = SwapQuoteParams {
        sender: req.sender,
        invoice: &req.invoice,
        amount_out: quotes.amount_out,
        token_in: &token_in,
        token_out: &token_out,
        slippage_bps: server.slippage_bps(quotes.slippage_bps, &token_in, &token_out),
        excluded_venues: &excluded_venues,
        native_price: NativePrice::from_parts(
            req.native_token_price,
            req.native_token_price_decimals,
        ),
        price_feed_details: req.price_feed_details.as_ref(),
    };

    let best = fetch_swap_quote(&server.aggregator, &server.evaluator, &params).await?;
    Ok(warp::reply::json(&best))
}

/// Handler for estimating candidate route costs
pub async fn estimates_handler(
    req: EstimatesRequest,
    server: Arc<Server>,
) -> Result<Json, warp::Rejection> {
    let chain = server.chain_for(req.chain_id).map_err(reject)?;
    let token_in = server.token(&req.token_in).map_err(reject)?;
    let token_out = server.token(&req.token_out).map_err(reject)?;
    let native_price = NativePrice::from_parts(
        Some(req.native_token_price),
        Some(req.native_token_price_decimals),
    )
    .ok_or_else(|| reject(ApiError::BadRequest("A native token price is required".to_string())))?;

    let ctx = EstimationContext {
        chain,
        sender: req.sender,
        invoice: &req.invoice,
        token_in: &token_in,
        token_out: &token_out,
        native_price,
        price_feed_details: req.price_feed_details.as_ref(),
    };
    let estimates = server.evaluator.fetch_estimates(&req.candidates, &ctx).await?;
    Ok(warp::reply::json(&estimates))
}

/// Handler for building a payment payload
pub async fn payload_handler(
    req: PayloadRequest,
    server: Arc<Server>,
) -> Result<Json, warp::Rejection> {
    let chain = server.chain_for(req.chain_id).map_err(reject)?;
    let token_in = server.token(&req.token_in).map_err(reject)?;

    let params = PaymentParams {
        chain,
        sender: req.sender,
        token_in: &token_in,
        invoice: &req.invoice,
        quote: req.quote.as_ref(),
        venue: req.venue,
        return_remainder: req.return_remainder,
        price_feed_details: req.price_feed_details.as_ref(),
    };
    let payload = match server.router_version {
        RouterVersion::V1 => create_payload_v1(&params)?,
        RouterVersion::V2 => create_payload(&params)?,
    };

    let resp: PaymentPayloadResponse = payload.to_response();
    Ok(warp::reply::json(&resp))
}

/// Handler for resolving a payment's oracle conversion
pub async fn price_feed_handler(
    req: PriceFeedRequest,
    server: Arc<Server>,
) -> Result<Json, warp::Rejection> {
    let chain = server.chain_for(req.chain_id).map_err(reject)?;
    let token = server.token(&req.token).map_err(reject)?;

    let details = resolve_price_feed_details(
        server.feeds.as_ref(),
        chain,
        server.router_version,
        &req.invoice,
        &token,
        req.payment_type,
    )
    .await?;
    Ok(warp::reply::json(&details))
}

/// Handler for resolving a Curve hop's swap parameters
pub async fn swap_params_handler(
    query: SwapParamsQuery,
    server: Arc<Server>,
) -> Result<Json, warp::Rejection> {
    let chain = server.chain_for(query.chain_id).map_err(reject)?;
    let params = determine_swap_params(chain, &query.pool, &query.token_in, &query.token_out)?;

    let resp = [params.in_index, params.out_index, u32::from(params.swap_type)];
    Ok(warp::reply::json(&resp))
}
