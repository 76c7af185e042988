//! The API for the settlement router
#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod serialization;
mod types;
pub use types::*;
