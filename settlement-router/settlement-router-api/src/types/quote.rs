//! Quote types produced by the aggregator and consumed by the cost evaluator
//! and payload builder

use std::fmt::Display;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::serialization::{option_u256_string_serialization, u256_string_serialization};

/// A settlement venue
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    /// A direct payment, no swap involved
    #[default]
    None,
    /// A Uniswap-style exact-output swap
    Uniswap,
    /// A Curve-style swap through the generic router
    Curve,
}

impl Display for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Venue::None => "none",
            Venue::Uniswap => "uniswap",
            Venue::Curve => "curve",
        };
        write!(f, "{name}")
    }
}

/// The swap-mode triple the generic Curve router expects for a hop
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurveSwapParams {
    /// The index of the input coin within the pool
    pub in_index: u32,
    /// The index of the output coin within the pool
    pub out_index: u32,
    /// The router's swap-mode code
    pub swap_type: u8,
}

impl CurveSwapParams {
    /// The params in the router's `uint256[3]` layout
    pub fn to_words(&self) -> [U256; 3] {
        [U256::from(self.in_index), U256::from(self.out_index), U256::from(self.swap_type)]
    }
}

/// A single routing hop
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    /// The pool the hop trades through
    pub pool_address: Address,
    /// The token sold into the pool
    pub token_in: Address,
    /// The token bought from the pool
    pub token_out: Address,
    /// The fee tier, empty for venues without fee tiers
    #[serde(default)]
    pub pool_fee: String,
    /// The amount sold into this hop
    #[serde(default, with = "option_u256_string_serialization")]
    pub amount_in: Option<U256>,
    /// The amount bought from this hop
    #[serde(default, with = "option_u256_string_serialization")]
    pub amount_out: Option<U256>,
    /// The Curve swap-mode triple, if resolved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap_params: Option<CurveSwapParams>,
    /// The Curve factory address, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory_address: Option<Address>,
}

impl Pool {
    /// Construct a hop with no per-hop amounts or Curve metadata
    pub fn new(pool_address: Address, token_in: Address, token_out: Address) -> Self {
        Self {
            pool_address,
            token_in,
            token_out,
            pool_fee: String::new(),
            amount_in: None,
            amount_out: None,
            swap_params: None,
            factory_address: None,
        }
    }
}

/// A priced route from a single venue
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// The ordered hops of the route
    pub path: Vec<Pool>,
    /// The amount of the source token sold, in its minor units
    #[serde(with = "u256_string_serialization")]
    pub amount_in: U256,
    /// The amount of the destination token bought, in its minor units
    #[serde(with = "u256_string_serialization")]
    pub amount_out: U256,
    /// The amount added to `amount_in` as slippage allowance
    #[serde(default, with = "option_u256_string_serialization")]
    pub slippage: Option<U256>,
    /// The fractional price impact reported by the venue
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_impact: Option<f64>,
}

impl Quote {
    /// The route's terminal hop
    pub fn last_hop(&self) -> Option<&Pool> {
        self.path.last()
    }

    /// Whether the quote is usable: nonempty path and positive amounts
    pub fn is_valid(&self) -> bool {
        !self.path.is_empty() && !self.amount_in.is_zero() && !self.amount_out.is_zero()
    }
}
