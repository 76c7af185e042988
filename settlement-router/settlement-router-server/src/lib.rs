//! The settlement router: quotes invoice payments across swap venues, prices
//! each candidate route's gas and remainder, and builds the settlement call
#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]
#![deny(unsafe_code)]
#![deny(clippy::needless_pass_by_ref_mut)]

pub mod chain;
pub mod cli;
pub mod error;
pub mod estimation;
pub mod fixed_point;
pub mod handlers;
pub mod helpers;
pub mod middleware;
pub mod payload;
pub mod price_feeds;
pub mod routing;
pub mod server;
pub mod session;
pub mod telemetry;
