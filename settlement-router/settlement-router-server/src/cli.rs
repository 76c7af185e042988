//! Defines the command-line arguments for the settlement router

use alloy_primitives::Address;
use clap::Parser;

use crate::{
    chain::RouterVersion,
    routing::{
        convergence::{ConvergenceConfig, DEFAULT_MAX_ATTEMPTS, DEFAULT_STEP_PER_MILLE},
        venues::uniswap::DEFAULT_UNISWAP_BASE_URL,
    },
};

/// The CLI for the settlement router
#[rustfmt::skip]
#[derive(Parser)]
#[clap(about = "Settlement router server")]
pub struct Cli {
    // --- Chain --- //

    /// The RPC url of the chain to settle on
    #[clap(short, long, env = "RPC_URL")]
    pub rpc_url: String,
    /// The id of the chain to settle on
    #[clap(long, default_value = "1", env = "CHAIN_ID")]
    pub chain_id: u64,
    /// A JSON file of chain records extending the built-in chain tables
    #[clap(long, env = "CHAIN_CONFIG_PATH")]
    pub chain_config_path: Option<String>,
    /// The settlement router generation to build payloads for
    #[clap(long, default_value = "v2", env = "ROUTER_VERSION")]
    pub router_version: RouterVersion,
    /// The settlement router address, overriding the chain table's
    #[clap(long, env = "ROUTER_ADDRESS")]
    pub router_address: Option<Address>,

    // --- Quote Sources --- //

    /// The base url of the Uniswap routing API
    #[clap(long, default_value = DEFAULT_UNISWAP_BASE_URL, env = "UNISWAP_BASE_URL")]
    pub uniswap_base_url: String,
    /// The base url of the Curve routing service
    ///
    /// The Curve router source is disabled if this is omitted
    #[clap(long, env = "CURVE_ROUTER_URL")]
    pub curve_router_url: Option<String>,
    /// The per-round input increase of the Curve exact-output search, in
    /// tenths of a percent
    #[clap(long, default_value_t = DEFAULT_STEP_PER_MILLE, env = "CONVERGENCE_STEP_PER_MILLE")]
    pub convergence_step_per_mille: u64,
    /// The maximum number of quoting rounds of the Curve exact-output search
    #[clap(long, default_value_t = DEFAULT_MAX_ATTEMPTS, env = "CONVERGENCE_MAX_ATTEMPTS")]
    pub convergence_max_attempts: usize,
    /// The slippage applied to quotes whose request names none, in basis points
    ///
    /// Falls back to the stablecoin or non-stablecoin default per token pair
    #[clap(long, env = "DEFAULT_SLIPPAGE_BPS")]
    pub default_slippage_bps: Option<u32>,

    // --- Server Config --- //

    /// The port to run the server on
    #[clap(long, default_value = "3000", env = "PORT")]
    pub port: u16,

    // --- Telemetry --- //

    /// Whether to emit JSON formatted logs
    #[clap(long, env = "ENABLE_JSON_LOGS")]
    pub json_logs: bool,
}

impl Cli {
    /// The exact-output search parameters
    pub fn convergence(&self) -> ConvergenceConfig {
        ConvergenceConfig {
            step_per_mille: self.convergence_step_per_mille,
            max_attempts: self.convergence_max_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test the defaults of a minimal invocation
    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["settlement-router", "--rpc-url", "http://localhost:8545"]);
        assert_eq!(cli.chain_id, 1);
        assert_eq!(cli.router_version, RouterVersion::V2);
        assert_eq!(cli.uniswap_base_url, DEFAULT_UNISWAP_BASE_URL);
        assert!(cli.curve_router_url.is_none());
        assert!(cli.default_slippage_bps.is_none());
        assert_eq!(cli.convergence().max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert!(!cli.json_logs);
    }

    /// Test parsing the legacy router version and an address override
    #[test]
    fn test_router_overrides() {
        let cli = Cli::parse_from([
            "settlement-router",
            "--rpc-url",
            "http://localhost:8545",
            "--router-version",
            "0.1",
            "--router-address",
            "0x6dcbc91229d812910b54df91b5c2b592572cd6b0",
        ]);
        assert_eq!(cli.router_version, RouterVersion::V1);
        assert!(cli.router_address.is_some());
    }
}
