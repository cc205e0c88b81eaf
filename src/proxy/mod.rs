//! Image reverse-proxy subsystem.
//!
//! # Data Flow
//! ```text
//! GET /api/image/{encoded url}
//!     → image.rs (URL rules, SSRF host check, domain allow-list)
//!     → dns.rs (resolved addresses checked before connecting)
//!     → upstream GET, header checks (type, declared length)
//!     → body.rs (bounded pipe to the client)
//! ```

pub mod body;
pub mod dns;
pub mod image;

pub use image::{ImageProxy, ProxiedImage};
