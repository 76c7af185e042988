//! Shared helpers for RPC and HTTP plumbing

use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use reqwest::{Response, Url};
use serde::Deserialize;

use crate::error::SettlementError;

/// Build a read-only provider over HTTP
pub fn build_provider(rpc_url: &str) -> Result<DynProvider, SettlementError> {
    let url = Url::parse(rpc_url).map_err(SettlementError::config)?;
    let provider = ProviderBuilder::new().connect_http(url);
    Ok(provider.erased())
}

/// Deserialize a successful response body, or surface the failure status
pub async fn handle_http_response<T: for<'de> Deserialize<'de>>(
    response: Response,
) -> Result<T, SettlementError> {
    if !response.status().is_success() {
        let status = response.status();
        let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        return Err(SettlementError::http(format!("Status {status}: {message}")));
    }

    response.json::<T>().await.map_err(SettlementError::http)
}
