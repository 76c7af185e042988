//! Resolves the swap-mode triple the generic Curve router's
//! `exchange_multiple` expects for a single pool hop

use std::str::FromStr;

use alloy_primitives::Address;
use settlement_router_api::{quote::CurveSwapParams, token::NATIVE_TOKEN_ADDRESS};

use crate::{
    chain::{pools::CurvePoolData, ChainInfo},
    error::SettlementError,
};

// -------------
// | Constants |
// -------------

/// Stableswap `exchange`
pub const SWAP_TYPE_STABLE: u8 = 1;
/// Stableswap `exchange_underlying`
pub const SWAP_TYPE_STABLE_UNDERLYING: u8 = 2;
/// Cryptoswap `exchange`
pub const SWAP_TYPE_CRYPTO: u8 = 3;
/// Cryptoswap `exchange_underlying`
pub const SWAP_TYPE_CRYPTO_UNDERLYING: u8 = 4;
/// Factory meta-pool over a lending base pool, `exchange_underlying`
pub const SWAP_TYPE_FACTORY_LENDING_META: u8 = 5;
/// Factory crypto meta-pool, `exchange_underlying`
pub const SWAP_TYPE_FACTORY_CRYPTO_META: u8 = 6;

/// The legacy pool whose native-coin legs route through the underlying
/// exchange rather than the crypto exchange
const EXCLUDED_NATIVE_POOL_ID: &str = "avaxcrypto";

// ---------
// | Types |
// ---------

/// The position of a token within each of a pool's coin lists
#[derive(Debug, Default)]
struct CoinIndices {
    /// The index within the wrapped coins
    wrapped: Option<usize>,
    /// The index within the underlying coins
    underlying: Option<usize>,
    /// The index within the base pool's underlying coins
    meta: Option<usize>,
}

impl CoinIndices {
    /// Locate a token within a pool and, for meta-pools, its base pool
    fn find(pool: &CurvePoolData, base_pool: Option<&CurvePoolData>, token: &Address) -> Self {
        let position = |coins: &[Address]| coins.iter().position(|c| c == token);
        Self {
            wrapped: position(&pool.wrapped_coin_addresses),
            underlying: position(&pool.underlying_coin_addresses),
            meta: base_pool.and_then(|b| position(&b.underlying_coin_addresses)),
        }
    }

    /// The index in the first list containing the token
    fn first(&self) -> Option<usize> {
        self.wrapped.or(self.underlying).or(self.meta)
    }
}

// --------------
// | Resolution |
// --------------

/// Determine the swap parameters for a hop from unvalidated address strings
pub fn determine_swap_params(
    chain: &ChainInfo,
    pool_address: &str,
    token_in: &str,
    token_out: &str,
) -> Result<CurveSwapParams, SettlementError> {
    let (token_in, token_out) = match (Address::from_str(token_in), Address::from_str(token_out)) {
        (Ok(token_in), Ok(token_out)) => (token_in, token_out),
        _ => return Err(SettlementError::validation("One of the token addresses is invalid.")),
    };
    let pool_address = Address::from_str(pool_address)
        .map_err(|_| SettlementError::validation("Failed to find Curve pool."))?;

    resolve_swap_params(chain, pool_address, token_in, token_out)
}

/// Determine the swap parameters for a hop through a registered pool
pub fn resolve_swap_params(
    chain: &ChainInfo,
    pool_address: Address,
    token_in: Address,
    token_out: Address,
) -> Result<CurveSwapParams, SettlementError> {
    if token_in == token_out {
        return Err(SettlementError::validation("Tokens must not be equal."));
    }

    // Factory pools created by users are not registered
    let pool = chain
        .curve_pool(&pool_address)
        .ok_or_else(|| SettlementError::validation("Failed to find Curve pool."))?;
    let base_pool = if pool.is_meta {
        pool.base_pool.as_deref().and_then(|id| chain.curve_pool_by_id(id))
    } else {
        None
    };

    let in_indices = CoinIndices::find(pool, base_pool, &token_in);
    let out_indices = CoinIndices::find(pool, base_pool, &token_out);
    let (in_index, out_index) = match (in_indices.first(), out_indices.first()) {
        (Some(i), Some(j)) => (i, j),
        _ => {
            return Err(SettlementError::validation(
                "One or both of the tokens is not part of the pool.",
            ))
        },
    };

    let mut swap_type = 0;
    if in_indices.wrapped.is_some() && !pool.is_fake {
        swap_type = if pool.is_crypto { SWAP_TYPE_CRYPTO } else { SWAP_TYPE_STABLE };
    }

    if !pool.is_plain && in_indices.underlying.is_some() {
        let has_native = token_in == NATIVE_TOKEN_ADDRESS || token_out == NATIVE_TOKEN_ADDRESS;
        let lending_base = base_pool.map(|b| b.is_lending).unwrap_or(false);

        swap_type = if pool.is_crypto && pool.is_meta && pool.is_factory {
            SWAP_TYPE_FACTORY_CRYPTO_META
        } else if lending_base && pool.is_factory {
            SWAP_TYPE_FACTORY_LENDING_META
        } else if has_native && pool.id != EXCLUDED_NATIVE_POOL_ID {
            SWAP_TYPE_CRYPTO
        } else if pool.is_crypto {
            SWAP_TYPE_CRYPTO_UNDERLYING
        } else {
            SWAP_TYPE_STABLE_UNDERLYING
        };
    }

    if swap_type == 0 {
        return Err(SettlementError::validation("Could not find a valid swap type for the pool."));
    }

    Ok(CurveSwapParams { in_index: in_index as u32, out_index: out_index as u32, swap_type })
}

#[cfg(test)]
mod tests {
    use alloy_primitives::address;

    use super::*;
    use crate::chain::mainnet;

    /// 3pool on mainnet
    const THREE_POOL: &str = "0xbebc44782c7db0a1a60cb6fe97d0b483032ff1c7";
    /// tricrypto2 on mainnet
    const TRICRYPTO2: &str = "0xd51a44d3fae010294c616388b506acda1bfaae46";
    /// USDC on mainnet
    const USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
    /// USDT on mainnet
    const USDT: &str = "0xdAC17F958D2ee523a2206206994597C13D831ec7";
    /// WBTC on mainnet
    const WBTC: &str = "0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599";
    /// WETH on mainnet
    const WETH: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";
    /// The native sentinel
    const ETH: &str = "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE";

    /// Build a chain holding a non-plain stable meta-pool and its base pool
    fn chain_with_meta_pool(is_factory: bool, lending_base: bool) -> ChainInfo {
        let mut chain = mainnet();
        let base = CurvePoolData {
            id: "base".to_string(),
            swap_address: address!("00000000000000000000000000000000000000b0"),
            wrapped_coin_addresses: vec![address!("00000000000000000000000000000000000000c1")],
            underlying_coin_addresses: vec![
                address!("00000000000000000000000000000000000000d1"),
                address!("00000000000000000000000000000000000000d2"),
                address!("00000000000000000000000000000000000000d3"),
            ],
            is_lending: lending_base,
            ..Default::default()
        };
        let meta = CurvePoolData {
            id: "meta".to_string(),
            swap_address: address!("00000000000000000000000000000000000000a0"),
            wrapped_coin_addresses: vec![
                address!("00000000000000000000000000000000000000e1"),
                address!("00000000000000000000000000000000000000c1"),
            ],
            underlying_coin_addresses: vec![
                address!("00000000000000000000000000000000000000e1"),
                address!("00000000000000000000000000000000000000d1"),
                address!("00000000000000000000000000000000000000d2"),
            ],
            base_pool: Some("base".to_string()),
            is_meta: true,
            is_factory,
            ..Default::default()
        };
        chain.curve_pools.extend([base, meta]);
        chain
    }

    /// Test a stable swap through a plain pool
    #[test]
    fn test_plain_stable_pool() {
        let params = determine_swap_params(&mainnet(), THREE_POOL, USDC, USDT).unwrap();
        assert_eq!(params, CurveSwapParams { in_index: 1, out_index: 2, swap_type: 1 });
    }

    /// Test a wrapped crypto swap
    #[test]
    fn test_crypto_wrapped_coin() {
        let params = determine_swap_params(&mainnet(), TRICRYPTO2, WETH, USDT).unwrap();
        assert_eq!(params, CurveSwapParams { in_index: 2, out_index: 0, swap_type: 3 });
    }

    /// Test that a token in both coin lists of a non-plain pool takes the
    /// underlying swap type
    #[test]
    fn test_underlying_overrides_wrapped() {
        let params = determine_swap_params(&mainnet(), TRICRYPTO2, USDT, WBTC).unwrap();
        assert_eq!(params, CurveSwapParams { in_index: 0, out_index: 1, swap_type: 4 });

        let params = determine_swap_params(&mainnet(), TRICRYPTO2, USDT, ETH).unwrap();
        assert_eq!(params, CurveSwapParams { in_index: 0, out_index: 2, swap_type: 3 });
    }

    /// Test a native-coin input, present only in the underlying coins
    #[test]
    fn test_native_input() {
        let params = determine_swap_params(&mainnet(), TRICRYPTO2, ETH, WBTC).unwrap();
        assert_eq!(params, CurveSwapParams { in_index: 2, out_index: 1, swap_type: 3 });
    }

    /// Test meta-pool swap types
    #[test]
    fn test_meta_pool_swap_types() {
        let pool = "0x00000000000000000000000000000000000000a0";
        let token_in = "0x00000000000000000000000000000000000000e1";
        let base_coin = "0x00000000000000000000000000000000000000d2";

        let chain = chain_with_meta_pool(false /* is_factory */, false /* lending_base */);
        let params = determine_swap_params(&chain, pool, token_in, base_coin).unwrap();
        assert_eq!(params, CurveSwapParams { in_index: 0, out_index: 2, swap_type: 2 });

        let chain = chain_with_meta_pool(true /* is_factory */, true /* lending_base */);
        let params = determine_swap_params(&chain, pool, token_in, base_coin).unwrap();
        assert_eq!(params.swap_type, 5);
    }

    /// Test a base-pool coin only reachable through the meta coin list
    #[test]
    fn test_meta_coin_index() {
        let chain = chain_with_meta_pool(false, false);
        let params = determine_swap_params(
            &chain,
            "0x00000000000000000000000000000000000000a0",
            "0x00000000000000000000000000000000000000e1",
            "0x00000000000000000000000000000000000000d3",
        )
        .unwrap();

        assert_eq!(params, CurveSwapParams { in_index: 0, out_index: 2, swap_type: 2 });
    }

    /// Test the validation failures, in order
    #[test]
    fn test_validation_failures() {
        let chain = mainnet();
        let err = determine_swap_params(&chain, THREE_POOL, "0x1234", USDT).unwrap_err();
        assert_eq!(err, SettlementError::validation("One of the token addresses is invalid."));

        let err = determine_swap_params(&chain, THREE_POOL, USDT, USDT).unwrap_err();
        assert_eq!(err, SettlementError::validation("Tokens must not be equal."));

        let unknown_pool = "0x0000000000000000000000000000000000000001";
        let err = determine_swap_params(&chain, unknown_pool, USDC, USDT).unwrap_err();
        assert_eq!(err, SettlementError::validation("Failed to find Curve pool."));

        let err = determine_swap_params(&chain, THREE_POOL, USDC, WETH).unwrap_err();
        assert_eq!(
            err,
            SettlementError::validation("One or both of the tokens is not part of the pool.")
        );
    }

    /// Test that a fake pool with only wrapped coins yields no swap type
    #[test]
    fn test_fake_pool_has_no_swap_type() {
        let mut chain = mainnet();
        for pool in chain.curve_pools.iter_mut() {
            pool.is_fake = true;
        }

        let err = determine_swap_params(&chain, THREE_POOL, USDC, USDT).unwrap_err();
        assert_eq!(err, SettlementError::validation("Could not find a valid swap type for the pool."));
    }

    /// Test that resolution is deterministic
    #[test]
    fn test_deterministic() {
        let chain = mainnet();
        let first = determine_swap_params(&chain, TRICRYPTO2, USDT, WBTC).unwrap();
        let second = determine_swap_params(&chain, TRICRYPTO2, USDT, WBTC).unwrap();
        assert_eq!(first, second);
    }
}
