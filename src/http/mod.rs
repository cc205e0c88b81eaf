//! HTTP surface of the edge server.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware order, graceful shutdown)
//!     → request.rs (request ID, per-route metrics)
//!     → handlers.rs (content API, image proxy, health, static fallback)
//!     → error.rs (status mapping; JSON for the content API, text elsewhere)
//! ```

pub mod error;
pub mod handlers;
pub mod request;
pub mod server;

pub use error::{ApiError, EdgeError};
pub use request::X_REQUEST_ID;
pub use server::{AppState, EdgeServer, ServerError};
