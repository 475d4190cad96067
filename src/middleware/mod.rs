//! Middleware module - client identity and rate limiting

pub mod client_id;
pub mod rate_limit;

pub use client_id::ClientId;
pub use rate_limit::RateLimitLayer;
