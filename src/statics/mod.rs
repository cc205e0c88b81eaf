//! Static frontend files.
//!
//! # Data Flow
//! ```text
//! GET /some/path
//!     → resolver.rs (normalize, confine to root, file check, extension check)
//!     → mime.rs (content type from extension)
//!     → bytes read with tokio::fs
//! ```

pub mod mime;
pub mod resolver;

pub use resolver::{ResolveError, ResolvedFile, StaticResolver};
