//! DNS resolution that refuses private destinations.
//!
//! The image client resolves through [`GuardedResolver`], which wraps a
//! lookup (the system one by default). Every address a name resolves to is
//! checked before any of them is handed to the connector, and the connector
//! only ever sees checked addresses.

use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use thiserror::Error;

use crate::security::ssrf::is_private_addr;

/// A hostname resolved to an internal address.
#[derive(Debug, Error)]
#[error("{host} resolves to a private address")]
pub struct PrivateDestination {
    pub host: String,
}

/// Plain system lookup through the tokio resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl Resolve for SystemResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let host = name.as_str().to_string();
        Box::pin(async move {
            let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host.as_str(), 0))
                .await?
                .collect();
            Ok::<Addrs, Box<dyn StdError + Send + Sync>>(Box::new(addrs.into_iter()))
        })
    }
}

/// Resolver used by the image client: checks every answer of `inner`.
#[derive(Clone)]
pub struct GuardedResolver {
    inner: Arc<dyn Resolve>,
}

impl GuardedResolver {
    pub fn new(inner: Arc<dyn Resolve>) -> Self {
        Self { inner }
    }

    pub fn system() -> Self {
        Self::new(Arc::new(SystemResolver))
    }
}

impl Default for GuardedResolver {
    fn default() -> Self {
        Self::system()
    }
}

impl Resolve for GuardedResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let host = name.as_str().to_string();
        let lookup = self.inner.resolve(name);
        Box::pin(async move {
            let resolved: Vec<SocketAddr> = lookup.await?.collect();
            let addrs = check_resolved(&host, resolved)?;
            Ok::<Addrs, Box<dyn StdError + Send + Sync>>(Box::new(addrs.into_iter()))
        })
    }
}

/// Reject the whole answer if any address is private.
pub fn check_resolved(
    host: &str,
    addrs: Vec<SocketAddr>,
) -> Result<Vec<SocketAddr>, PrivateDestination> {
    if let Some(bad) = addrs.iter().find(|addr| is_private_addr(addr.ip())) {
        tracing::warn!(host = %host, address = %bad.ip(), "Refusing private destination");
        return Err(PrivateDestination {
            host: host.to_string(),
        });
    }
    Ok(addrs)
}

/// Whether a client error was caused by [`PrivateDestination`].
pub fn is_private_destination(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if err.is::<PrivateDestination>() {
            return true;
        }
        current = err.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(raw: &str) -> SocketAddr {
        raw.parse().unwrap()
    }

    #[test]
    fn public_answers_pass_through() {
        let addrs = vec![addr("93.184.216.34:0"), addr("[2606:2800:220:1::1]:0")];
        assert_eq!(check_resolved("example.com", addrs.clone()).unwrap(), addrs);
    }

    #[test]
    fn any_private_answer_rejects_all() {
        let addrs = vec![addr("93.184.216.34:0"), addr("10.0.0.7:0")];
        let err = check_resolved("rebind.example", addrs).unwrap_err();
        assert_eq!(err.host, "rebind.example");
    }

    #[test]
    fn detects_cause_in_chain() {
        #[derive(Debug, Error)]
        #[error("connect failed")]
        struct Wrapper(#[source] PrivateDestination);

        let wrapped = Wrapper(PrivateDestination { host: "x".into() });
        assert!(is_private_destination(&wrapped));

        let other = std::io::Error::other("refused");
        assert!(!is_private_destination(&other));
    }
}
