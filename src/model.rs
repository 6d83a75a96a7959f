// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Domain types for zones and resource records.
//!
//! This module defines the data model shared by the zone registry, the record
//! store and the PTR synchronizer.
//!
//! # Resource Types
//!
//! - [`Zone`] - An authoritative forward or reverse zone inside a view
//! - [`Record`] - A resource record owned by exactly one zone
//!
//! # Ownership
//!
//! Every record is either [`Ownership::UserOwned`] or [`Ownership::Managed`].
//! Managed records are generated by the engine (PTR records for address
//! records, CNAME aliases for RFC 2317 delegations) and cannot be edited or
//! deleted directly. The managed source doubles as the weak back-reference
//! from a PTR record to the address record that generated it.
//!
//! # Example: Describing a record
//!
//! ```rust
//! use ptrsync::model::{RecordSpec, RecordType, ZoneId};
//!
//! let spec = RecordSpec::new(ZoneId(1), "host1", RecordType::A, "192.0.2.10").with_ttl(300);
//! assert_eq!(spec.name, "host1");
//! assert!(!spec.disable_ptr);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

use crate::constants::{APEX_NAME, DEFAULT_ZONE_TTL_SECS, IPV4_REVERSE_SUFFIX, IPV6_REVERSE_SUFFIX};
use crate::rfc2317::Rfc2317Prefix;

pub use hickory_proto::rr::RecordType;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $route:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Stable reference usable by a presentation layer to build links.
            #[must_use]
            pub fn reference(&self) -> String {
                format!(concat!($route, "/{}"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Identifier of a [`Zone`].
    ZoneId,
    "zone"
);
define_id!(
    /// Identifier of a [`Record`].
    RecordId,
    "record"
);
define_id!(
    /// Identifier of an IP address object in the external IPAM system.
    IpamAddressId,
    "ipam/ip-address"
);

/// Returns true for the record types that drive PTR synchronization.
#[must_use]
pub fn is_address_type(record_type: RecordType) -> bool {
    matches!(record_type, RecordType::A | RecordType::AAAA)
}

/// Whether a zone maps names to data or addresses to names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneKind {
    Forward,
    Reverse,
}

/// Operational status of a zone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneStatus {
    #[default]
    Active,
    Reserved,
    Deprecated,
    Parked,
    Dynamic,
}

impl ZoneStatus {
    /// Zones in these states take part in PTR synchronization.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active | Self::Dynamic)
    }
}

/// Status of a record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Active,
    Inactive,
}

/// What generated a managed record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagedSource {
    /// A PTR record generated for the A/AAAA record with this id.
    AddressRecord(RecordId),
    /// A CNAME alias in a full-octet reverse zone serving this RFC 2317 zone.
    Rfc2317Delegation(ZoneId),
}

/// Who owns the lifecycle of a record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Ownership {
    #[default]
    UserOwned,
    Managed { source: ManagedSource },
}

/// An authoritative zone.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub view: String,
    /// Lowercase zone name without the trailing dot.
    pub name: String,
    pub status: ZoneStatus,
    pub default_ttl: u32,
    #[serde(default)]
    pub description: String,
    /// IPv4 sub-/24 network this zone is the RFC 2317 delegation target for.
    #[serde(default)]
    pub rfc2317_prefix: Option<Rfc2317Prefix>,
    /// Whether the CNAME aliases in the parent full-octet zone are maintained here.
    #[serde(default)]
    pub rfc2317_parent_managed: bool,
    pub created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Zone {
    #[must_use]
    pub fn kind(&self) -> ZoneKind {
        if is_reverse_name(&self.name) {
            ZoneKind::Reverse
        } else {
            ZoneKind::Forward
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    #[must_use]
    pub fn is_rfc2317(&self) -> bool {
        self.rfc2317_prefix.is_some()
    }

    /// Absolute zone name with the trailing dot.
    #[must_use]
    pub fn fqdn(&self) -> String {
        format!("{}.", self.name)
    }
}

/// Returns true if `name` lies in the `in-addr.arpa` or `ip6.arpa` tree.
#[must_use]
pub fn is_reverse_name(name: &str) -> bool {
    let name = name.trim_end_matches('.');
    [IPV4_REVERSE_SUFFIX, IPV6_REVERSE_SUFFIX].iter().any(|suffix| {
        name == *suffix
            || name
                .strip_suffix(suffix)
                .is_some_and(|rest| rest.ends_with('.'))
    })
}

/// Input for creating a zone.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ZoneSpec {
    pub name: String,
    #[serde(default)]
    pub view: Option<String>,
    #[serde(default)]
    pub status: ZoneStatus,
    #[serde(default)]
    pub default_ttl: Option<u32>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub rfc2317_prefix: Option<Rfc2317Prefix>,
    #[serde(default = "default_parent_managed")]
    pub rfc2317_parent_managed: bool,
}

fn default_parent_managed() -> bool {
    true
}

impl ZoneSpec {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            view: None,
            status: ZoneStatus::Active,
            default_ttl: None,
            description: String::new(),
            rfc2317_prefix: None,
            rfc2317_parent_managed: true,
        }
    }

    #[must_use]
    pub fn with_view(mut self, view: impl Into<String>) -> Self {
        self.view = Some(view.into());
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: ZoneStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_default_ttl(mut self, ttl: u32) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn with_rfc2317_prefix(mut self, prefix: Rfc2317Prefix) -> Self {
        self.rfc2317_prefix = Some(prefix);
        self
    }

    #[must_use]
    pub fn with_rfc2317_parent_managed(mut self, managed: bool) -> Self {
        self.rfc2317_parent_managed = managed;
        self
    }

    pub(crate) fn effective_default_ttl(&self) -> u32 {
        self.default_ttl.unwrap_or(DEFAULT_ZONE_TTL_SECS)
    }
}

/// A resource record.
///
/// The weak references of the data model are split between stored fields and
/// store indexes: `address_record` is carried by [`Ownership`],
/// `rfc2317_cname_record` is stored here, and the inverse sides
/// (`ptr_record`, `rfc2317_ptr_records`) are answered by the record store's
/// secondary indexes so they can never go stale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub zone: ZoneId,
    /// Lowercase name relative to the zone (`@` for the apex).
    pub name: String,
    #[serde(rename = "type", with = "record_type_serde")]
    pub record_type: RecordType,
    pub value: String,
    pub ttl: Option<u32>,
    pub status: RecordStatus,
    pub ownership: Ownership,
    pub disable_ptr: bool,
    #[serde(default)]
    pub description: String,
    pub rfc2317_cname_record: Option<RecordId>,
    pub ipam_ip_address: Option<IpamAddressId>,
    /// Warnings from the last PTR synchronization of this record.
    #[serde(default)]
    pub warnings: Vec<String>,
    pub created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Record {
    #[must_use]
    pub fn managed(&self) -> bool {
        matches!(self.ownership, Ownership::Managed { .. })
    }

    /// The A/AAAA record that generated this PTR record, if any.
    #[must_use]
    pub fn address_record(&self) -> Option<RecordId> {
        match self.ownership {
            Ownership::Managed {
                source: ManagedSource::AddressRecord(id),
            } => Some(id),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_address_record(&self) -> bool {
        is_address_type(self.record_type)
    }

    /// Parsed address of an A/AAAA record.
    #[must_use]
    pub fn ip_address(&self) -> Option<IpAddr> {
        if !self.is_address_record() {
            return None;
        }
        self.value.parse().ok()
    }

    /// Absolute owner name of the record inside `zone`, with the trailing dot.
    #[must_use]
    pub fn fqdn(&self, zone: &Zone) -> String {
        if self.name == APEX_NAME {
            zone.fqdn()
        } else {
            format!("{}.{}.", self.name, zone.name)
        }
    }

    /// TTL of the record, falling back to the zone default.
    #[must_use]
    pub fn effective_ttl(&self, zone: &Zone) -> u32 {
        self.ttl.unwrap_or(zone.default_ttl)
    }
}

/// Input for creating a user-owned record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordSpec {
    pub zone: ZoneId,
    pub name: String,
    #[serde(rename = "type", with = "record_type_serde")]
    pub record_type: RecordType,
    pub value: String,
    #[serde(default)]
    pub ttl: Option<u32>,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default)]
    pub disable_ptr: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ipam_ip_address: Option<IpamAddressId>,
}

impl RecordSpec {
    #[must_use]
    pub fn new(
        zone: ZoneId,
        name: impl Into<String>,
        record_type: RecordType,
        value: impl Into<String>,
    ) -> Self {
        Self {
            zone,
            name: name.into(),
            record_type,
            value: value.into(),
            ttl: None,
            status: RecordStatus::Active,
            disable_ptr: false,
            description: String::new(),
            ipam_ip_address: None,
        }
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: RecordStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_disable_ptr(mut self, disable_ptr: bool) -> Self {
        self.disable_ptr = disable_ptr;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_ipam_ip_address(mut self, id: IpamAddressId) -> Self {
        self.ipam_ip_address = Some(id);
        self
    }
}

/// Partial update of a user-owned record. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RecordUpdate {
    #[serde(default)]
    pub zone: Option<ZoneId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub ttl: Option<Option<u32>>,
    #[serde(default)]
    pub status: Option<RecordStatus>,
    #[serde(default)]
    pub disable_ptr: Option<bool>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ipam_ip_address: Option<Option<IpamAddressId>>,
}

impl RecordUpdate {
    #[must_use]
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn zone(mut self, zone: ZoneId) -> Self {
        self.zone = Some(zone);
        self
    }

    #[must_use]
    pub fn ttl(mut self, ttl: Option<u32>) -> Self {
        self.ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn status(mut self, status: RecordStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn disable_ptr(mut self, disable_ptr: bool) -> Self {
        self.disable_ptr = Some(disable_ptr);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn ipam_ip_address(mut self, id: Option<IpamAddressId>) -> Self {
        self.ipam_ip_address = Some(id);
        self
    }
}

/// Read-only projection of a record with all of its references resolved.
///
/// This is what a presentation layer consumes: every weak reference is given
/// as an identifier, `rfc2317_ptr_records` as an ordered list.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecordDetail {
    pub record: Record,
    pub zone_name: String,
    pub view: String,
    pub fqdn: String,
    pub ptr_record: Option<RecordId>,
    pub address_record: Option<RecordId>,
    pub rfc2317_cname_record: Option<RecordId>,
    pub rfc2317_ptr_records: Vec<RecordId>,
    pub ipam_ip_address: Option<IpamAddressId>,
}

pub(crate) mod record_type_serde {
    use hickory_proto::rr::RecordType;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(value: &RecordType, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<RecordType, D::Error> {
        let raw = String::deserialize(deserializer)?;
        RecordType::from_str(&raw.to_ascii_uppercase()).map_err(serde::de::Error::custom)
    }
}
