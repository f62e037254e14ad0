//! Rate limiting for public write endpoints.

mod memory;

pub use memory::{InMemoryRateLimiter, RateLimitConfig};
