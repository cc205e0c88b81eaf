//! Content API collaborator.
//!
//! # Data Flow
//! ```text
//! GET /api/textes, /api/texte/{slug}
//!     → service.rs (TTL cache, fallback chain)
//!     → source.rs trait
//!         → notion.rs (search, database filter, publish tag filter)
//!         → mapping.rs (field aliases, text extraction, slugs)
//!     → fixtures.rs when no source is configured or nothing else is available
//! ```

pub mod fixtures;
pub mod mapping;
pub mod notion;
pub mod service;
pub mod source;
pub mod types;

pub use notion::NotionSource;
pub use service::ContentService;
pub use source::ContentSource;
pub use types::{ContentError, ContentItem};
