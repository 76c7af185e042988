//! Error types for the settlement router

use std::{error::Error, fmt::Display};

use warp::reject::Reject;

/// The error type emitted by the settlement engine
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettlementError {
    /// A malformed or unsupported combination of inputs; never retried
    #[error("validation error: {0}")]
    Validation(String),
    /// A single venue failed to produce a quote
    #[error("quote error: {0}")]
    Quote(String),
    /// The exact-output search exhausted its attempt cap
    #[error("convergence error: {0}")]
    Convergence(String),
    /// A candidate's dry-run reverted or errored
    #[error("simulation error: {0}")]
    Simulation(String),
    /// An error executing an HTTP request
    #[error("http error: {0}")]
    Http(String),
    /// An error reading on-chain state
    #[error("on-chain error: {0}")]
    OnChain(String),
    /// An error parsing a value
    #[error("parse error: {0}")]
    Parse(String),
    /// An error loading configuration
    #[error("config error: {0}")]
    Config(String),
}

#[allow(clippy::needless_pass_by_value)]
impl SettlementError {
    /// Create a validation error
    pub fn validation<T: ToString>(msg: T) -> Self {
        SettlementError::Validation(msg.to_string())
    }

    /// Create a quote error
    pub fn quote<T: ToString>(msg: T) -> Self {
        SettlementError::Quote(msg.to_string())
    }

    /// Create a convergence error
    pub fn convergence<T: ToString>(msg: T) -> Self {
        SettlementError::Convergence(msg.to_string())
    }

    /// Create a simulation error
    pub fn simulation<T: ToString>(msg: T) -> Self {
        SettlementError::Simulation(msg.to_string())
    }

    /// Create an HTTP error
    pub fn http<T: ToString>(msg: T) -> Self {
        SettlementError::Http(msg.to_string())
    }

    /// Create an on-chain error
    pub fn onchain<T: ToString>(msg: T) -> Self {
        SettlementError::OnChain(msg.to_string())
    }

    /// Create a parse error
    pub fn parse<T: ToString>(msg: T) -> Self {
        SettlementError::Parse(msg.to_string())
    }

    /// Create a config error
    pub fn config<T: ToString>(msg: T) -> Self {
        SettlementError::Config(msg.to_string())
    }

    /// Whether the error is a deterministic input-validation failure
    pub fn is_validation(&self) -> bool {
        matches!(self, SettlementError::Validation(_))
    }
}

impl From<reqwest::Error> for SettlementError {
    fn from(e: reqwest::Error) -> Self {
        SettlementError::http(e)
    }
}

/// API-specific error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request error
    BadRequest(String),
    /// The requested chain or token is unknown
    NotFound(String),
    /// Internal server error
    InternalError(String),
}

impl Reject for ApiError {}

impl Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::BadRequest(e) => write!(f, "Bad request: {}", e),
            ApiError::NotFound(e) => write!(f, "Not found: {}", e),
            ApiError::InternalError(e) => write!(f, "Internal error: {}", e),
        }
    }
}

impl Error for ApiError {}

impl From<SettlementError> for ApiError {
    fn from(e: SettlementError) -> Self {
        match e {
            SettlementError::Validation(msg) => ApiError::BadRequest(msg),
            e => ApiError::InternalError(e.to_string()),
        }
    }
}

impl From<SettlementError> for warp::Rejection {
    fn from(e: SettlementError) -> Self {
        warp::reject::custom(ApiError::from(e))
    }
}
