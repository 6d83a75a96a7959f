// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Read-only links from records to an external IPAM system.
//!
//! The IPAM system is an opaque store of IP address objects keyed by
//! [`IpamAddressId`]. Records may carry such an identifier; the
//! [`IpamLinker`] resolves it on demand. The link is informational only, so
//! every failure (timeout, collaborator error, address deleted externally)
//! degrades to `None` and is logged instead of propagated.
//!
//! Lookups are never made while the engine holds its write lock.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use ptrsync::ipam::{IpamAddress, IpamLinker, StaticIpam};
//! use ptrsync::model::IpamAddressId;
//!
//! # async fn example() {
//! let source = StaticIpam::new([IpamAddress::new(IpamAddressId(7), "192.0.2.10/24")]);
//! let linker = IpamLinker::new(Arc::new(source), Duration::from_secs(2));
//! let address = linker.lookup_id(IpamAddressId(7)).await;
//! assert!(address.is_some());
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::dns_errors::IpamError;
use crate::metrics;
use crate::model::{IpamAddressId, Record};

/// An IP address object as reported by the IPAM system.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpamAddress {
    pub id: IpamAddressId,
    /// Address with prefix length, e.g. `192.0.2.10/24`.
    pub address: String,
    #[serde(default)]
    pub dns_name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub description: String,
}

impl IpamAddress {
    #[must_use]
    pub fn new(id: IpamAddressId, address: impl Into<String>) -> Self {
        Self {
            id,
            address: address.into(),
            dns_name: String::new(),
            status: "active".to_string(),
            description: String::new(),
        }
    }

    #[must_use]
    pub fn with_dns_name(mut self, dns_name: impl Into<String>) -> Self {
        self.dns_name = dns_name.into();
        self
    }
}

/// The external IPAM collaborator.
#[async_trait::async_trait]
pub trait IpamSource: Send + Sync {
    /// Fetches an address object, `Ok(None)` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the IPAM system cannot be queried.
    async fn get_ip_address(&self, id: IpamAddressId) -> Result<Option<IpamAddress>>;
}

/// An in-memory [`IpamSource`], used by the import loader and in tests.
#[derive(Debug, Default)]
pub struct StaticIpam {
    addresses: RwLock<HashMap<IpamAddressId, IpamAddress>>,
}

impl StaticIpam {
    pub fn new(addresses: impl IntoIterator<Item = IpamAddress>) -> Self {
        Self {
            addresses: RwLock::new(
                addresses
                    .into_iter()
                    .map(|address| (address.id, address))
                    .collect(),
            ),
        }
    }

    pub async fn insert(&self, address: IpamAddress) {
        self.addresses.write().await.insert(address.id, address);
    }

    pub async fn remove(&self, id: IpamAddressId) -> Option<IpamAddress> {
        self.addresses.write().await.remove(&id)
    }
}

#[async_trait::async_trait]
impl IpamSource for StaticIpam {
    async fn get_ip_address(&self, id: IpamAddressId) -> Result<Option<IpamAddress>> {
        Ok(self.addresses.read().await.get(&id).cloned())
    }
}

/// Resolves `ipam_ip_address` references with a bounded wait.
#[derive(Clone)]
pub struct IpamLinker {
    source: Arc<dyn IpamSource>,
    timeout: Duration,
}

impl std::fmt::Debug for IpamLinker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpamLinker")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl IpamLinker {
    #[must_use]
    pub fn new(source: Arc<dyn IpamSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    /// Resolves the IPAM address linked to `record`, if any.
    pub async fn lookup(&self, record: &Record) -> Option<IpamAddress> {
        let id = record.ipam_ip_address?;
        self.lookup_id(id).await
    }

    /// Resolves an IPAM address by identifier, degrading every failure to `None`.
    pub async fn lookup_id(&self, id: IpamAddressId) -> Option<IpamAddress> {
        match self.try_lookup(id).await {
            Ok(address) => {
                debug!(ipam = %id, address = %address.address, "Resolved IPAM address");
                metrics::record_ipam_lookup("found");
                Some(address)
            }
            Err(err @ IpamError::AddressNotFound { .. }) => {
                warn!(ipam = %id, reason = err.reason(), "{err}");
                metrics::record_ipam_lookup("missing");
                None
            }
            Err(err) => {
                warn!(ipam = %id, reason = err.reason(), "{err}");
                metrics::record_ipam_lookup("degraded");
                metrics::record_error(err.reason());
                None
            }
        }
    }

    /// Resolves the links of many records concurrently, in input order.
    pub async fn lookup_many(&self, records: &[Record]) -> Vec<Option<IpamAddress>> {
        join_all(records.iter().map(|record| self.lookup(record))).await
    }

    async fn try_lookup(&self, id: IpamAddressId) -> Result<IpamAddress, IpamError> {
        let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
        match tokio::time::timeout(self.timeout, self.source.get_ip_address(id)).await {
            Err(_) => Err(IpamError::LookupTimeout { id, timeout_ms }),
            Ok(Err(e)) => Err(IpamError::Unavailable {
                reason: format!("{e:#}"),
            }),
            Ok(Ok(None)) => Err(IpamError::AddressNotFound { id }),
            Ok(Ok(Some(address))) => Ok(address),
        }
    }
}

#[cfg(test)]
#[path = "ipam_tests.rs"]
mod ipam_tests;
