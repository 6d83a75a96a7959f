// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # ptrsync - DNS reverse-mapping synchronization engine
//!
//! ptrsync keeps PTR records consistent with the A and AAAA records that
//! refer to them. Every address record with a reverse zone gets exactly one
//! system-managed PTR record; classless delegations of sub-/24 IPv4 networks
//! (RFC 2317) get their parent-zone CNAME aliases maintained as well.
//!
//! ## Overview
//!
//! - Zones are organised in views and resolved by longest suffix match
//! - Managed records are generated, updated and removed only by the engine
//! - Every mutation is transactional: forward record, PTR record and alias
//!   change together or not at all
//! - Records may reference an address object in an external IPAM system;
//!   lookups are bounded and degrade to "no data"
//!
//! ## Modules
//!
//! - [`engine`] - The transactional service API
//! - [`zone_registry`] - Zones, views and reverse zone lookup
//! - [`rfc2317`] - Reverse names and classless delegation arithmetic
//! - [`ptr_sync`] - The PTR synchronization state machine
//! - [`record_store`] - Record storage, indexes and the undo journal
//! - [`ipam`] - External IPAM collaborator
//! - [`import`] - Bulk import of YAML/JSON documents
//!
//! ## Example
//!
//! ```rust
//! use ptrsync::engine::DnsEngine;
//! use ptrsync::model::{RecordSpec, RecordType, ZoneSpec};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> ptrsync::dns_errors::Result<()> {
//! let engine = DnsEngine::default();
//! let forward = engine.create_zone(ZoneSpec::new("example.com")).await?.zone;
//! engine.create_zone(ZoneSpec::new("2.0.192.in-addr.arpa")).await?;
//! engine
//!     .create_zone(
//!         ZoneSpec::new("0-15.2.0.192.in-addr.arpa")
//!             .with_rfc2317_prefix("192.0.2.0/28".parse().unwrap()),
//!     )
//!     .await?;
//!
//! let report = engine
//!     .create_record(RecordSpec::new(forward.id, "host1", RecordType::A, "192.0.2.10"))
//!     .await?;
//! let ptr = engine
//!     .record_detail(report.ptr.unwrap().ptr_record.unwrap())
//!     .await
//!     .unwrap();
//! assert_eq!(ptr.fqdn, "10.0-15.2.0.192.in-addr.arpa");
//! assert!(ptr.rfc2317_cname_record.is_some());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod dns_errors;
pub mod engine;
pub mod filter;
pub mod import;
pub mod ipam;
pub mod metrics;
pub mod model;
pub mod names;
pub mod ptr_sync;
pub mod record_store;
pub mod rfc2317;
pub mod status_reasons;
pub mod zone_registry;

#[cfg(test)]
mod dns_errors_tests;
