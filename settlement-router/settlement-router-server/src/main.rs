//! The settlement router server
#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]
#![deny(unsafe_code)]

use std::{error::Error, sync::Arc};

use clap::Parser;
use settlement_router::{
    cli::Cli,
    error::ApiError,
    handlers::{
        estimates_handler, payload_handler, price_feed_handler, quotes_handler,
        swap_params_handler, swap_quote_handler,
    },
    middleware::{identity, with_json_body, with_server},
    server::Server,
    telemetry::setup_logging,
};
use settlement_router_api::{
    routes::{
        EstimatesRequest, PayloadRequest, PriceFeedRequest, QuotesRequest, SwapParamsQuery,
        SwapQuoteRequest, ESTIMATES_ROUTE, PAYLOAD_ROUTE, PRICE_FEED_ROUTE, QUOTES_ROUTE,
        SWAP_PARAMS_ROUTE, SWAP_QUOTE_ROUTE,
    },
    PING_ROUTE,
};
use tracing::{error, info};
use warp::Filter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    setup_logging(cli.json_logs);

    let port = cli.port;
    let server = Arc::new(Server::build_from_cli(&cli).await?);

    // ----------
    // | Routes |
    // ----------

    let ping = warp::get()
        .and(warp::path(PING_ROUTE))
        .map(|| warp::reply::with_status("PONG", warp::http::StatusCode::OK));

    let quotes = warp::post()
        .and(warp::path(QUOTES_ROUTE))
        .and(warp::body::bytes())
        .map(with_json_body::<QuotesRequest>)
        .and_then(identity)
        .and(with_server(server.clone()))
        .and_then(quotes_handler);

    let swap_quote = warp::post()
        .and(warp::path(SWAP_QUOTE_ROUTE))
        .and(warp::body::bytes())
        .map(with_json_body::<SwapQuoteRequest>)
        .and_then(identity)
        .and(with_server(server.clone()))
        .and_then(swap_quote_handler);

    let estimates = warp::post()
        .and(warp::path(ESTIMATES_ROUTE))
        .and(warp::body::bytes())
        .map(with_json_body::<EstimatesRequest>)
        .and_then(identity)
        .and(with_server(server.clone()))
        .and_then(estimates_handler);

    let payload = warp::post()
        .and(warp::path(PAYLOAD_ROUTE))
        .and(warp::body::bytes())
        .map(with_json_body::<PayloadRequest>)
        .and_then(identity)
        .and(with_server(server.clone()))
        .and_then(payload_handler);

    let price_feed = warp::post()
        .and(warp::path(PRICE_FEED_ROUTE))
        .and(warp::body::bytes())
        .map(with_json_body::<PriceFeedRequest>)
        .and_then(identity)
        .and(with_server(server.clone()))
        .and_then(price_feed_handler);

    let swap_params = warp::get()
        .and(warp::path(SWAP_PARAMS_ROUTE))
        .and(warp::query::<SwapParamsQuery>())
        .and(with_server(server.clone()))
        .and_then(swap_params_handler);

    let routes = ping
        .or(quotes)
        .or(swap_quote)
        .or(estimates)
        .or(payload)
        .or(price_feed)
        .or(swap_params)
        .recover(handle_rejection);

    info!("listening on port {port}");
    warp::serve(routes).run(([0, 0, 0, 0], port)).await;

    Ok(())
}

// -----------
// | Helpers |
// -----------

/// Handle a rejection from an endpoint handler
async fn handle_rejection(err: warp::Rejection) -> Result<impl warp::Reply, warp::Rejection> {
    if let Some(api_error) = err.find::<ApiError>() {
        let (code, message) = match api_error {
            ApiError::BadRequest(msg) => (warp::http::StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (warp::http::StatusCode::NOT_FOUND, msg),
            ApiError::InternalError(msg) => (warp::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        error!("API Error: {:?}", api_error);
        Ok(warp::reply::with_status(message.clone(), code))
    } else {
        error!("Unhandled rejection: {:?}", err);
        Err(err)
    }
}
