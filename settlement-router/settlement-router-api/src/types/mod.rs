//! API types for the settlement router

pub mod estimate;
pub mod invoice;
pub mod payment;
pub mod quote;
pub mod routes;
pub mod token;

/// The ping route
pub const PING_ROUTE: &str = "ping";
