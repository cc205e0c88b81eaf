//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs (security headers on every response)
//!     → cors.rs (OPTIONS short-circuit)
//!     → rate_limit.rs (per-client fixed window)
//!     → cors.rs (origin allow-list on /api/)
//!     → Pass to route dispatch
//!
//! Outbound image fetch:
//!     → ssrf.rs (hostname check, then resolved-address check)
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - No trust in client input beyond the forwarded-for key

pub mod cors;
pub mod headers;
pub mod rate_limit;
pub mod ssrf;

pub use cors::{CorsDecision, OriginGate};
pub use rate_limit::{RateDecision, RateLimiter};
