//! Request path to on-disk file resolution.
//!
//! Order of checks:
//! 1. Percent-decode and normalize the path; climbing above the root is forbidden.
//! 2. Canonicalize and confirm the target is still inside the canonical root
//!    (catches symlinks pointing outside).
//! 3. The target must be a regular file.
//! 4. The extension must be allow-listed.

use std::io;
use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;
use thiserror::Error;

use crate::http::error::EdgeError;
use crate::statics::mime;

/// Why a path could not be served.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Path escapes the document root")]
    Traversal,

    #[error("File type not permitted")]
    DisallowedExtension,

    #[error("File not found")]
    NotFound,
}

impl From<ResolveError> for EdgeError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Traversal | ResolveError::DisallowedExtension => {
                EdgeError::Forbidden(err.to_string())
            }
            ResolveError::NotFound => EdgeError::NotFound(err.to_string()),
        }
    }
}

/// A file that passed every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub path: PathBuf,
    pub content_type: &'static str,
}

/// Resolves request paths inside a single document root.
#[derive(Debug, Clone)]
pub struct StaticResolver {
    root: PathBuf,
    index_file: String,
}

impl StaticResolver {
    pub fn new(root: impl Into<PathBuf>, index_file: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            index_file: index_file.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a URL path to a servable file.
    pub async fn resolve(&self, request_path: &str) -> Result<ResolvedFile, ResolveError> {
        let relative = normalize(request_path)?;
        let relative = if relative.as_os_str().is_empty() {
            PathBuf::from(&self.index_file)
        } else {
            relative
        };

        let root = tokio::fs::canonicalize(&self.root)
            .await
            .map_err(|_| ResolveError::NotFound)?;
        let target = tokio::fs::canonicalize(root.join(&relative))
            .await
            .map_err(|_| ResolveError::NotFound)?;

        if !target.starts_with(&root) {
            return Err(ResolveError::Traversal);
        }

        let metadata = tokio::fs::metadata(&target)
            .await
            .map_err(|_| ResolveError::NotFound)?;
        if !metadata.is_file() {
            return Err(ResolveError::NotFound);
        }

        let content_type = target
            .extension()
            .and_then(|e| e.to_str())
            .and_then(mime::for_allowed_extension)
            .ok_or(ResolveError::DisallowedExtension)?;

        Ok(ResolvedFile {
            path: target,
            content_type,
        })
    }

    /// Resolve and read in one step.
    pub async fn load(&self, request_path: &str) -> Result<(ResolvedFile, Vec<u8>), EdgeError> {
        let file = self.resolve(request_path).await?;
        let bytes = tokio::fs::read(&file.path).await.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => EdgeError::from(ResolveError::NotFound),
            _ => EdgeError::Upstream(format!("read {}: {e}", file.path.display())),
        })?;
        Ok((file, bytes))
    }
}

/// Percent-decode the URL path and collapse `.`/`..` without touching the
/// filesystem. Any `..` that would leave the root is a traversal.
pub fn normalize(request_path: &str) -> Result<PathBuf, ResolveError> {
    let path_only = request_path.split(['?', '#']).next().unwrap_or_default();
    let decoded = percent_decode_str(path_only)
        .decode_utf8()
        .map_err(|_| ResolveError::NotFound)?;

    if decoded.contains('\0') || decoded.contains('\\') {
        return Err(ResolveError::Traversal);
    }

    let mut parts: Vec<&str> = Vec::new();
    for component in Path::new(decoded.as_ref()).components() {
        match component {
            Component::RootDir | Component::CurDir => {}
            Component::Normal(part) => match part.to_str() {
                Some(part) => parts.push(part),
                None => return Err(ResolveError::NotFound),
            },
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return Err(ResolveError::Traversal);
                }
            }
            Component::Prefix(_) => return Err(ResolveError::Traversal),
        }
    }

    Ok(parts.iter().collect())
}
