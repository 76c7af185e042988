//! Defines the server which encapsulates all dependencies for quoting,
//! estimation and payload construction

use std::sync::Arc;

use alloy_primitives::Address;
use settlement_router_api::token::TokenInfo;
use tracing::info;

use crate::{
    chain::{ChainInfo, ChainRegistry, RouterVersion},
    cli::Cli,
    error::{ApiError, SettlementError},
    estimation::{chain_client::RpcChainSimulator, CostEvaluator},
    helpers::build_provider,
    price_feeds::{OnChainPriceFeedReader, PriceFeedReader},
    routing::{
        venues::{
            curve::{
                router_client::{CurveRouterSource, HttpCurveRouterClient},
                CurveSinglePoolSource, OnChainCurveReader,
            },
            uniswap::UniswapClient,
        },
        QuoteAggregator,
    },
    session::default_slippage_bps,
};

/// The server
#[derive(Clone)]
pub struct Server {
    /// The chain this server settles on
    pub chain: Arc<ChainInfo>,
    /// The router generation payloads are built for
    pub router_version: RouterVersion,
    /// The venue quote aggregator
    pub aggregator: QuoteAggregator,
    /// The candidate cost evaluator
    pub evaluator: CostEvaluator,
    /// The oracle feed reader
    pub feeds: Arc<dyn PriceFeedReader>,
    /// The operator's slippage override, in basis points
    pub default_slippage_bps: Option<u32>,
}

impl Server {
    /// Build a server from the CLI
    pub async fn build_from_cli(args: &Cli) -> Result<Self, SettlementError> {
        let mut registry = ChainRegistry::builtin();
        if let Some(path) = &args.chain_config_path {
            let json = tokio::fs::read_to_string(path).await.map_err(SettlementError::config)?;
            registry.extend_from_json(&json)?;
        }

        let chain = registry.get(args.chain_id).ok_or_else(|| {
            SettlementError::config(format!("no chain config for chain {}", args.chain_id))
        })?;
        let chain = match args.router_address {
            Some(address) => {
                let mut chain = (*chain).clone();
                chain.router_addresses.insert(args.router_version, address);
                Arc::new(chain)
            },
            None => chain,
        };
        info!(
            "settling on {} (chain {}) with router {:?}",
            chain.name, chain.chain_id, args.router_version
        );

        let provider = build_provider(&args.rpc_url)?;
        let curve_router = args.curve_router_url.clone().map(|url| {
            CurveRouterSource::new(Arc::new(HttpCurveRouterClient::new(url, chain.chain_id)))
        });
        let aggregator = QuoteAggregator::new(
            chain.clone(),
            Arc::new(UniswapClient::new(args.uniswap_base_url.clone())),
            CurveSinglePoolSource::new(
                chain.clone(),
                Arc::new(OnChainCurveReader::new(provider.clone())),
            ),
            curve_router,
            args.convergence(),
        );

        let feeds: Arc<dyn PriceFeedReader> = Arc::new(OnChainPriceFeedReader::new(provider.clone()));
        let evaluator = CostEvaluator::new(Arc::new(RpcChainSimulator::new(provider)), feeds.clone());

        Ok(Self {
            chain,
            router_version: args.router_version,
            aggregator,
            evaluator,
            feeds,
            default_slippage_bps: args.default_slippage_bps,
        })
    }

    /// The chain with the given id, if this server settles on it
    pub fn chain_for(&self, chain_id: u64) -> Result<&Arc<ChainInfo>, ApiError> {
        if chain_id != self.chain.chain_id {
            return Err(ApiError::NotFound(format!("Chain {chain_id} is not supported.")));
        }

        Ok(&self.chain)
    }

    /// The slippage for a quote request, in basis points
    pub fn slippage_bps(
        &self,
        requested: Option<u32>,
        token_in: &TokenInfo,
        token_out: &TokenInfo,
    ) -> u32 {
        requested
            .or(self.default_slippage_bps)
            .unwrap_or_else(|| default_slippage_bps(token_in, token_out))
    }

    /// Look up a token on the server's chain
    pub fn token(&self, address: &Address) -> Result<TokenInfo, ApiError> {
        self.chain.token(address).cloned().ok_or_else(|| {
            ApiError::NotFound(format!(
                "Token {address:#x} is not known on chain {}.",
                self.chain.chain_id
            ))
        })
    }
}
