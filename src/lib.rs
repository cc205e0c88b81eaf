//! Edge server for a small publishing site: content API, guarded image
//! proxy and static frontend behind one listener.

pub mod config;
pub mod content;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod security;
pub mod statics;

pub use config::schema::EdgeConfig;
pub use http::EdgeServer;
pub use lifecycle::Shutdown;
