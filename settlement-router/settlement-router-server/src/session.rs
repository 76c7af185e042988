//! Pricing state for a single payment session, guarded against stale
//! responses
//!
//! Every pricing request is tagged with a [`Generation`] scoped to its
//! context. A response is committed only while its generation is the latest
//! issued for that context; a superseded response is dropped without side
//! effects. In-flight requests are never aborted

use std::collections::HashMap;

use alloy_primitives::I256;
use settlement_router_api::{
    estimate::EstimationResult,
    payment::PriceFeedDetails,
    quote::{Quote, Venue},
    token::{currency, TokenInfo},
};
use tracing::debug;

use crate::estimation::selection::determine_cheapest_swap_with_gas;

// -------------
// | Constants |
// -------------

/// The slippage allowance for swaps between two fiat-tracking tokens
pub const STABLECOIN_SLIPPAGE_BPS: u32 = 10;
/// The slippage allowance for every other swap
pub const NON_STABLECOIN_SLIPPAGE_BPS: u32 = 50;

/// The default slippage allowance for a swap
///
/// Stable pools generally price tighter, so a swap whose tokens both track a
/// fiat currency gets the smaller allowance. Intermediate hops are not
/// considered
pub fn default_slippage_bps(token_in: &TokenInfo, token_out: &TokenInfo) -> u32 {
    let is_fiat = |t: &TokenInfo| t.currency.as_deref().is_some_and(|c| c != currency::ETH);
    if is_fiat(token_in) && is_fiat(token_out) {
        STABLECOIN_SLIPPAGE_BPS
    } else {
        NON_STABLECOIN_SLIPPAGE_BPS
    }
}

// ---------------
// | Generations |
// ---------------

/// A logical request context, each with its own generation sequence
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RequestContext {
    /// Quotes for the current token selection
    Quotes,
    /// Gas and remainder estimates for the current candidates
    Estimates,
    /// The invoice-to-token price conversion
    PriceFeed,
}

/// A request tag
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Generation {
    /// The context the tag was issued for
    context: RequestContext,
    /// The tag's position in its context's sequence
    seq: u64,
}

/// Issues generations and checks them for staleness
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestGeneration {
    /// The latest sequence number issued per context
    latest: HashMap<RequestContext, u64>,
}

impl RequestGeneration {
    /// Issue the next generation for a context, superseding all earlier ones
    pub fn issue(&mut self, context: RequestContext) -> Generation {
        let seq = self.latest.entry(context).or_default();
        *seq += 1;
        Generation { context, seq: *seq }
    }

    /// Whether a generation is the latest issued for its context
    pub fn is_current(&self, generation: Generation) -> bool {
        self.latest.get(&generation.context) == Some(&generation.seq)
    }

    /// Supersede every outstanding generation
    fn invalidate_all(&mut self) {
        for seq in self.latest.values_mut() {
            *seq += 1;
        }
    }
}

// ---------
// | State |
// ---------

/// A piece of asynchronously loaded state
#[derive(Clone, Debug, PartialEq)]
pub struct Slot<T> {
    /// The loaded value
    pub data: Option<T>,
    /// Whether a request is in flight
    pub loading: bool,
    /// The last request's error
    pub error: Option<String>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self { data: None, loading: false, error: None }
    }
}

impl<T> Slot<T> {
    /// Mark a request as in flight
    fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// Commit a request's outcome
    fn settle(&mut self, result: Result<T, String>) {
        self.loading = false;
        match result {
            Ok(data) => {
                self.data = Some(data);
                self.error = None;
            },
            Err(e) => {
                self.data = None;
                self.error = Some(e);
            },
        }
    }
}

/// Whether and how much remainder the selected route leaves
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemainderDetails {
    /// The venue of the selected route
    pub venue: Venue,
    /// The remainder in invoice-currency units
    pub remainder: I256,
    /// `remainder - return cost`
    pub delta: I256,
    /// Whether returning the remainder is worth its cost
    pub should_return: bool,
}

impl From<&EstimationResult> for RemainderDetails {
    fn from(est: &EstimationResult) -> Self {
        Self {
            venue: est.venue,
            remainder: est.remainder_in_invoice_currency,
            delta: est.return_remainder_delta,
            should_return: est.should_return_remainder,
        }
    }
}

/// A state transition
#[derive(Clone, Debug)]
pub enum PricingAction {
    /// Override the slippage allowance
    SetSlippage(u32),
    /// The outcome of a best-swap search
    BestSwap {
        /// The request's tag
        generation: Generation,
        /// The selected route, or the failure message
        result: Result<(Quote, Venue), String>,
    },
    /// The outcome of an estimation round
    Estimates {
        /// The request's tag
        generation: Generation,
        /// The estimates, or the failure message
        result: Result<Vec<EstimationResult>, String>,
    },
    /// The outcome of a price feed conversion
    PriceFeed {
        /// The request's tag
        generation: Generation,
        /// The conversion, or the failure message
        result: Result<PriceFeedDetails, String>,
    },
    /// Clear the swap selection
    ResetSwap,
    /// Clear the estimates and remainder details
    ResetGas,
    /// Clear the price feed conversion
    ResetPriceFeed,
    /// Return to the initial state, superseding all in-flight requests
    Reset,
}

/// The pricing state of a payment session
#[derive(Clone, Debug, PartialEq)]
pub struct PricingState {
    /// The selected route
    pub best_swap: Slot<(Quote, Venue)>,
    /// The estimates of every candidate
    pub estimates: Slot<Vec<EstimationResult>>,
    /// The remainder of the cheapest estimated route
    pub remainder: Option<RemainderDetails>,
    /// The invoice-to-token conversion
    pub price_feed: Slot<PriceFeedDetails>,
    /// The slippage allowance in basis points
    pub slippage_bps: u32,
    /// The request tags
    generations: RequestGeneration,
}

impl Default for PricingState {
    fn default() -> Self {
        Self {
            best_swap: Slot::default(),
            estimates: Slot::default(),
            remainder: None,
            price_feed: Slot::default(),
            slippage_bps: STABLECOIN_SLIPPAGE_BPS,
            generations: RequestGeneration::default(),
        }
    }
}

impl PricingState {
    /// Start a request in a context, returning the new state and the tag its
    /// response must carry
    pub fn begin(&self, context: RequestContext) -> (Self, Generation) {
        let mut next = self.clone();
        let generation = next.generations.issue(context);
        match context {
            RequestContext::Quotes => next.best_swap.begin(),
            RequestContext::Estimates => next.estimates.begin(),
            RequestContext::PriceFeed => next.price_feed.begin(),
        }

        (next, generation)
    }

    /// Whether a response tagged `generation` would be committed
    pub fn is_current(&self, generation: Generation) -> bool {
        self.generations.is_current(generation)
    }

    /// Apply a transition
    pub fn apply(&self, action: PricingAction) -> Self {
        let mut next = self.clone();
        match action {
            PricingAction::SetSlippage(bps) => next.slippage_bps = bps,
            PricingAction::BestSwap { generation, result } => {
                if !self.accepts(generation) {
                    return next;
                }
                next.best_swap.settle(result);
            },
            PricingAction::Estimates { generation, result } => {
                if !self.accepts(generation) {
                    return next;
                }
                next.remainder = result
                    .as_ref()
                    .ok()
                    .and_then(|estimates| determine_cheapest_swap_with_gas(estimates))
                    .map(RemainderDetails::from);
                next.estimates.settle(result);
            },
            PricingAction::PriceFeed { generation, result } => {
                if !self.accepts(generation) {
                    return next;
                }
                next.price_feed.settle(result);
            },
            PricingAction::ResetSwap => next.best_swap = Slot::default(),
            PricingAction::ResetGas => {
                next.estimates = Slot::default();
                next.remainder = None;
            },
            PricingAction::ResetPriceFeed => next.price_feed = Slot::default(),
            PricingAction::Reset => {
                let mut generations = next.generations;
                generations.invalidate_all();
                next = Self { generations, ..Self::default() };
            },
        }

        next
    }

    /// Whether a response should be committed, logging it if not
    fn accepts(&self, generation: Generation) -> bool {
        let current = self.generations.is_current(generation);
        if !current {
            debug!("discarding stale {:?} response", generation.context);
        }
        current
    }
}
