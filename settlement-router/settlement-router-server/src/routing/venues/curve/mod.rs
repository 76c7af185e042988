//! Curve quote sources: single-pool quotes from the on-chain registry
//! exchange, and multi-hop quotes from an injected router client

use std::sync::Arc;

use alloy::{providers::DynProvider, sol};
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use settlement_router_api::quote::{Pool, Quote};
use tracing::instrument;

use crate::{
    chain::ChainInfo,
    error::SettlementError,
    routing::convergence::{converge_exact_output, ConvergenceConfig},
};

pub mod router_client;
pub mod swap_params;

sol! {
    #[sol(rpc)]
    interface ICurveRegistryExchange {
        function get_best_rate(address _from, address _to, uint256 _amount) external view returns (address pool, uint256 amountOut);
    }
}

/// Reads the best single-pool rate from a Curve registry exchange
#[async_trait]
pub trait CurveRateReader: Send + Sync {
    /// Find the pool giving the most `token_out` for `amount` of `token_in`
    async fn get_best_rate(
        &self,
        exchange: Address,
        token_in: Address,
        token_out: Address,
        amount: U256,
    ) -> Result<(Address, U256), SettlementError>;
}

/// A rate reader that calls the registry exchange over RPC
#[derive(Clone)]
pub struct OnChainCurveReader {
    /// The RPC provider
    provider: DynProvider,
}

impl OnChainCurveReader {
    /// Create a new reader
    pub fn new(provider: DynProvider) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl CurveRateReader for OnChainCurveReader {
    async fn get_best_rate(
        &self,
        exchange: Address,
        token_in: Address,
        token_out: Address,
        amount: U256,
    ) -> Result<(Address, U256), SettlementError> {
        let contract = ICurveRegistryExchange::new(exchange, self.provider.clone());
        let res = contract
            .get_best_rate(token_in, token_out, amount)
            .call()
            .await
            .map_err(SettlementError::onchain)?;

        Ok((res.pool, res.amountOut))
    }
}

/// Produces single-hop quotes through the best registry pool
#[derive(Clone)]
pub struct CurveSinglePoolSource {
    /// The chain being quoted
    chain: Arc<ChainInfo>,
    /// The registry reader
    reader: Arc<dyn CurveRateReader>,
}

impl CurveSinglePoolSource {
    /// Create a new source
    pub fn new(chain: Arc<ChainInfo>, reader: Arc<dyn CurveRateReader>) -> Self {
        Self { chain, reader }
    }

    /// Quote selling exactly `amount` of `token_in`
    pub async fn quote_exact_input(
        &self,
        amount: U256,
        token_in: Address,
        token_out: Address,
    ) -> Result<Quote, SettlementError> {
        let exchange = self.chain.curve_router_address.ok_or_else(|| {
            SettlementError::quote(format!(
                "No Curve router address for chain {}",
                self.chain.chain_id
            ))
        })?;

        let (pool_address, amount_out) =
            self.reader.get_best_rate(exchange, token_in, token_out, amount).await?;
        if amount_out.is_zero() || pool_address == Address::ZERO {
            return Err(SettlementError::quote("Invalid Curve router 'get_best_rate' response"));
        }

        let mut pool = Pool::new(pool_address, token_in, token_out);
        pool.amount_in = Some(amount);
        pool.amount_out = Some(amount_out);

        Ok(Quote { path: vec![pool], amount_in: amount, amount_out, slippage: None, price_impact: None })
    }

    /// Quote the input needed to buy at least `amount_out` of `token_out`
    #[instrument(skip_all, fields(token_in = %token_in, token_out = %token_out))]
    pub async fn quote_exact_output(
        &self,
        amount_out: U256,
        token_in: Address,
        token_out: Address,
        config: &ConvergenceConfig,
    ) -> Result<Quote, SettlementError> {
        let inverse = self.quote_exact_input(amount_out, token_out, token_in).await?;
        converge_exact_output(amount_out, inverse.amount_out, config, |amount_in| {
            self.quote_exact_input(amount_in, token_in, token_out)
        })
        .await
    }
}
