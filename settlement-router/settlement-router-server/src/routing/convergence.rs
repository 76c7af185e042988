//! Inverts an exact-input quoting primitive into an exact-output answer

use std::future::Future;

use alloy_primitives::U256;
use settlement_router_api::quote::Quote;
use tracing::debug;

use crate::error::SettlementError;

// -------------
// | Constants |
// -------------

/// The default per-round input increase, in tenths of a percent
pub const DEFAULT_STEP_PER_MILLE: u64 = 1;
/// The default cap on quoting rounds
pub const DEFAULT_MAX_ATTEMPTS: usize = 10;
/// The denominator of a per-mille fraction
const PER_MILLE: u64 = 1_000;

/// Parameters of the exact-output search
#[derive(Copy, Clone, Debug)]
pub struct ConvergenceConfig {
    /// The input increase applied per round, in tenths of a percent
    pub step_per_mille: u64,
    /// The maximum number of forward quotes before giving up
    pub max_attempts: usize,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self { step_per_mille: DEFAULT_STEP_PER_MILLE, max_attempts: DEFAULT_MAX_ATTEMPTS }
    }
}

/// Find an input amount whose forward quote covers `target`
///
/// `inverse_amount` is the input estimate obtained by quoting the reverse
/// direction. Round `k` (from zero) quotes
/// `inverse_amount * (1000 + k * step) / 1000`, stopping at the first quote
/// whose output reaches `target`
pub async fn converge_exact_output<F, Fut>(
    target: U256,
    inverse_amount: U256,
    config: &ConvergenceConfig,
    mut quote_fn: F,
) -> Result<Quote, SettlementError>
where
    F: FnMut(U256) -> Fut,
    Fut: Future<Output = Result<Quote, SettlementError>>,
{
    let mut quote = quote_fn(inverse_amount).await?;
    let mut attempts = 1;
    while quote.amount_out < target {
        if attempts >= config.max_attempts {
            return Err(SettlementError::convergence(format!(
                "output {} still short of {target} after {attempts} attempts",
                quote.amount_out
            )));
        }

        let per_mille = U256::from(PER_MILLE + config.step_per_mille * attempts as u64);
        let amount_in = inverse_amount * per_mille / U256::from(PER_MILLE);
        debug!("quoting {amount_in} after output {} fell short of {target}", quote.amount_out);

        quote = quote_fn(amount_in).await?;
        attempts += 1;
    }

    Ok(quote)
}
