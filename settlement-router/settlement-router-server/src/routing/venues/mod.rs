//! Venue-specific quote sources

use std::fmt::Display;

use settlement_router_api::quote::Venue;

pub mod curve;
pub mod uniswap;

/// The quote sources queried by the aggregator, in output order
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum QuoteSource {
    /// The Uniswap routing API
    Uniswap,
    /// The Curve registry exchange's best single pool
    CurveSinglePool,
    /// The multi-hop Curve router client
    CurveRouter,
}

impl QuoteSource {
    /// The settlement venue a source's quotes are executed through
    pub fn venue(&self) -> Venue {
        match self {
            QuoteSource::Uniswap => Venue::Uniswap,
            QuoteSource::CurveSinglePool | QuoteSource::CurveRouter => Venue::Curve,
        }
    }
}

impl Display for QuoteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuoteSource::Uniswap => write!(f, "Uniswap"),
            QuoteSource::CurveSinglePool => write!(f, "Curve (single pool)"),
            QuoteSource::CurveRouter => write!(f, "Curve (router)"),
        }
    }
}
