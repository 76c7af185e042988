//! Read-only chain access for dry-running settlement calls

use alloy::{
    consensus::{SignableTransaction, TxLegacy},
    network::TransactionBuilder,
    primitives::TxKind,
    providers::{DynProvider, Provider},
    rpc::types::TransactionRequest,
    sol,
};
use alloy_primitives::{address, Address, Bytes, U256};
use alloy_sol_types::SolValue;
use async_trait::async_trait;

use crate::{chain::OPTIMISM_CHAIN_ID, error::SettlementError};

/// The address of the L1 gas price oracle predeploy on OP-stack chains
pub const GAS_PRICE_ORACLE_ADDRESS: Address = address!("420000000000000000000000000000000000000F");

sol! {
    #[sol(rpc)]
    contract GasPriceOracle {
        function getL1Fee(bytes data) external view returns (uint256);
    }
}

/// A trial call against the settlement router
#[derive(Clone, Debug)]
pub struct TrialTransaction {
    /// The paying address
    pub from: Address,
    /// The settlement router
    pub to: Address,
    /// The native value attached
    pub value: U256,
    /// The router calldata
    pub calldata: Bytes,
}

impl TrialTransaction {
    /// Convert into an RPC transaction request
    fn to_request(&self) -> TransactionRequest {
        TransactionRequest::default()
            .with_from(self.from)
            .with_to(self.to)
            .with_value(self.value)
            .with_input(self.calldata.clone())
    }
}

/// Dry-runs settlement calls
#[async_trait]
pub trait ChainSimulator: Send + Sync {
    /// The current gas price, in wei
    async fn gas_price(&self) -> Result<U256, SettlementError>;

    /// Estimate the gas units a call consumes
    async fn estimate_gas(&self, tx: &TrialTransaction) -> Result<U256, SettlementError>;

    /// Simulate a call and decode its `uint256` return value
    async fn simulate(&self, tx: &TrialTransaction) -> Result<U256, SettlementError>;

    /// The L1 data fee of a call, in wei; zero on chains without one
    async fn l1_fee(
        &self,
        chain_id: u64,
        tx: &TrialTransaction,
        gas_price: U256,
    ) -> Result<U256, SettlementError>;
}

/// A simulator backed by an RPC provider
#[derive(Clone)]
pub struct RpcChainSimulator {
    /// The RPC provider
    provider: DynProvider,
}

impl RpcChainSimulator {
    /// Create a new simulator
    pub fn new(provider: DynProvider) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ChainSimulator for RpcChainSimulator {
    async fn gas_price(&self) -> Result<U256, SettlementError> {
        let gas_price = self.provider.get_gas_price().await.map_err(SettlementError::onchain)?;
        Ok(U256::from(gas_price))
    }

    async fn estimate_gas(&self, tx: &TrialTransaction) -> Result<U256, SettlementError> {
        let gas =
            self.provider.estimate_gas(tx.to_request()).await.map_err(SettlementError::simulation)?;
        Ok(U256::from(gas))
    }

    async fn simulate(&self, tx: &TrialTransaction) -> Result<U256, SettlementError> {
        let ret = self.provider.call(tx.to_request()).await.map_err(SettlementError::simulation)?;
        U256::abi_decode(&ret).map_err(SettlementError::simulation)
    }

    async fn l1_fee(
        &self,
        chain_id: u64,
        tx: &TrialTransaction,
        gas_price: U256,
    ) -> Result<U256, SettlementError> {
        if chain_id != OPTIMISM_CHAIN_ID {
            return Ok(U256::ZERO);
        }

        // The oracle prices the unsigned legacy encoding of the call
        let legacy = TxLegacy {
            chain_id: Some(chain_id),
            nonce: 0,
            gas_price: gas_price.saturating_to(),
            gas_limit: 0,
            to: TxKind::Call(tx.to),
            value: tx.value,
            input: tx.calldata.clone(),
        };
        let encoded = legacy.encoded_for_signing();

        let oracle = GasPriceOracle::new(GAS_PRICE_ORACLE_ADDRESS, self.provider.clone());
        oracle.getL1Fee(encoded.into()).call().await.map_err(SettlementError::onchain)
    }
}
