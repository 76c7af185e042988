//! Built-in Ethereum mainnet metadata

use std::collections::HashMap;

use alloy_primitives::{address, Address};
use settlement_router_api::token::{currency, TokenInfo, NATIVE_TOKEN_ADDRESS};

use super::{pools::CurvePoolData, ChainInfo, NativeCurrency};

/// The mainnet chain id
const CHAIN_ID: u64 = 1;

/// USDC
const USDC: Address = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
/// Tether USD
const USDT: Address = address!("dAC17F958D2ee523a2206206994597C13D831ec7");
/// DAI
const DAI: Address = address!("6B175474E89094C44Da98b954EedeAC495271d0F");
/// Wrapped ether
const WETH: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
/// Wrapped bitcoin
const WBTC: Address = address!("2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599");

/// The Curve registry exchange
const CURVE_REGISTRY_EXCHANGE: Address = address!("99a58482BD75cbab83b27EC03CA68fF489b5788f");

/// The Chainlink ETH/USD feed
const ETH_USD_FEED: Address = address!("5f4eC3Df9cbd43714FE2740f5E3616155c5b8419");
/// The Chainlink EUR/USD feed
const EUR_USD_FEED: Address = address!("b49f677943BC038e9857d61E7d053CaA2C1734C1");

/// Build a mainnet token record
fn token(address: Address, symbol: &str, decimals: u8, currency: Option<&str>) -> TokenInfo {
    TokenInfo {
        chain_id: CHAIN_ID,
        address,
        symbol: symbol.to_string(),
        decimals,
        currency: currency.map(str::to_string),
    }
}

/// The built-in mainnet table
pub fn mainnet() -> ChainInfo {
    let tokens = vec![
        token(NATIVE_TOKEN_ADDRESS, "ETH", 18, Some(currency::ETH)),
        token(WETH, "WETH", 18, Some(currency::ETH)),
        token(USDC, "USDC", 6, Some(currency::USD)),
        token(USDT, "USDT", 6, Some(currency::USD)),
        token(DAI, "DAI", 18, Some(currency::USD)),
        token(WBTC, "WBTC", 8, None),
    ];

    let curve_pools = vec![
        CurvePoolData {
            id: "3pool".to_string(),
            swap_address: address!("bEbc44782C7dB0a1A60Cb6fe97d0b483032FF1C7"),
            wrapped_coin_addresses: vec![DAI, USDC, USDT],
            underlying_coin_addresses: vec![DAI, USDC, USDT],
            is_plain: true,
            ..Default::default()
        },
        CurvePoolData {
            id: "tricrypto2".to_string(),
            swap_address: address!("D51a44d3FaE010294C616388b506AcdA1bfAAE46"),
            wrapped_coin_addresses: vec![USDT, WBTC, WETH],
            underlying_coin_addresses: vec![USDT, WBTC, NATIVE_TOKEN_ADDRESS],
            is_crypto: true,
            ..Default::default()
        },
    ];

    let price_feeds = HashMap::from([
        (currency::ETH.to_string(), ETH_USD_FEED),
        ("EUR".to_string(), EUR_USD_FEED),
    ]);

    ChainInfo {
        chain_id: CHAIN_ID,
        name: "Ethereum".to_string(),
        native_currency: NativeCurrency { symbol: "ETH".to_string(), decimals: 18 },
        wrapped_native_token: WETH,
        router_addresses: HashMap::new(),
        curve_router_address: Some(CURVE_REGISTRY_EXCHANGE),
        price_feeds,
        tokens,
        curve_pools,
    }
}
