// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for zone, record and IPAM operations.
//!
//! This module provides specialized error types for:
//! - Zone registry lookups and zone configuration (including RFC 2317 delegations)
//! - Record store mutations and PTR synchronization
//! - External IPAM lookups (recovered locally, never propagated to callers)
//!
//! Every error exposes a stable [`reason`](DnsError::reason) string that is used
//! as the warning reason on records and as a metrics label.

use thiserror::Error;

use crate::model::{IpamAddressId, RecordId, ZoneId};
use crate::status_reasons::{
    REASON_CNAME_CONFLICT, REASON_DELEGATION_CONFLICT, REASON_DUPLICATE_RECORD,
    REASON_INVALID_RECORD_DATA, REASON_INVALID_ZONE_CONFIGURATION, REASON_IPAM_ADDRESS_NOT_FOUND,
    REASON_IPAM_LOOKUP_TIMEOUT, REASON_IPAM_UNAVAILABLE, REASON_MANAGED_RECORD_IMMUTABLE,
    REASON_NO_ZONE_FOUND, REASON_PTR_NAME_COLLISION, REASON_RECORD_NOT_FOUND,
    REASON_ZONE_ALREADY_EXISTS, REASON_ZONE_NOT_FOUND,
};

/// Errors raised by the zone registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ZoneError {
    /// No zone in the view is a suffix of the requested name.
    ///
    /// Fatal to the triggering operation.
    #[error("No zone found for '{name}' in view '{view}'")]
    NoZoneFound {
        /// The name that was resolved
        name: String,
        /// The view that was searched
        view: String,
    },

    /// A zone identifier does not refer to a known zone.
    #[error("Zone {id} not found")]
    ZoneNotFound {
        /// The unknown zone identifier
        id: ZoneId,
    },

    /// A zone with the same name already exists in the view.
    #[error("Zone '{name}' already exists in view '{view}'")]
    ZoneAlreadyExists {
        /// The duplicated zone name
        name: String,
        /// The view containing the existing zone
        view: String,
    },

    /// The zone definition is malformed.
    ///
    /// This includes invalid zone names, RFC 2317 prefixes on forward zones and
    /// out-of-range TTL values.
    #[error("Invalid zone configuration for '{zone}': {reason}")]
    InvalidZoneConfiguration {
        /// The zone name with invalid configuration
        zone: String,
        /// Explanation of what is invalid
        reason: String,
    },

    /// Two RFC 2317 delegations cover overlapping address ranges.
    ///
    /// This is never resolved automatically and must be surfaced to the operator.
    #[error(
        "RFC2317 delegation {prefix} of zone '{zone}' conflicts with {conflicting_prefix} of zone '{conflicting_zone}'"
    )]
    DelegationConflict {
        /// The zone whose delegation was being added or resolved
        zone: String,
        /// Its RFC 2317 prefix
        prefix: String,
        /// The zone already holding an overlapping delegation
        conflicting_zone: String,
        /// The overlapping prefix
        conflicting_prefix: String,
    },
}

impl ZoneError {
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NoZoneFound { .. } => REASON_NO_ZONE_FOUND,
            Self::ZoneNotFound { .. } => REASON_ZONE_NOT_FOUND,
            Self::ZoneAlreadyExists { .. } => REASON_ZONE_ALREADY_EXISTS,
            Self::InvalidZoneConfiguration { .. } => REASON_INVALID_ZONE_CONFIGURATION,
            Self::DelegationConflict { .. } => REASON_DELEGATION_CONFLICT,
        }
    }
}

/// Errors raised by record mutations and PTR synchronization.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// A record identifier does not refer to a known record.
    #[error("Record {id} not found")]
    RecordNotFound {
        /// The unknown record identifier
        id: RecordId,
    },

    /// Invalid record data (malformed IP, invalid name, out-of-range TTL, etc.)
    #[error("Invalid record data for '{name}' in zone '{zone}': {reason}")]
    InvalidRecordData {
        /// The record name with invalid data
        name: String,
        /// The zone containing the record
        zone: String,
        /// Explanation of what is invalid
        reason: String,
    },

    /// An identical record (zone, name, type and value) already exists.
    #[error("Duplicate {record_type} record '{name}' in zone '{zone}' with value '{value}'")]
    DuplicateRecord {
        /// The record name
        name: String,
        /// The zone containing the record
        zone: String,
        /// The record type
        record_type: String,
        /// The duplicated value
        value: String,
    },

    /// A CNAME would share its owner name with other data.
    #[error("CNAME at '{name}' in zone '{zone}' cannot coexist with other records")]
    CnameConflict {
        /// The owner name
        name: String,
        /// The zone containing the name
        zone: String,
    },

    /// A direct edit or delete was attempted on a system-generated record.
    #[error("Record {id} ('{name}' in zone '{zone}') is managed and cannot be modified directly")]
    ManagedRecordImmutable {
        /// The managed record identifier
        id: RecordId,
        /// The managed record name
        name: String,
        /// The zone containing the record
        zone: String,
    },

    /// The computed reverse name is already occupied.
    ///
    /// The forward operation still succeeds; PTR generation is skipped and this
    /// error is attached to the forward record as a warning.
    #[error("Reverse name '{name}' in zone '{zone}' is already occupied by record {existing}")]
    PtrNameCollision {
        /// The reverse name relative to the zone
        name: String,
        /// The reverse zone
        zone: String,
        /// The record occupying the name
        existing: RecordId,
    },
}

impl RecordError {
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::RecordNotFound { .. } => REASON_RECORD_NOT_FOUND,
            Self::InvalidRecordData { .. } => REASON_INVALID_RECORD_DATA,
            Self::DuplicateRecord { .. } => REASON_DUPLICATE_RECORD,
            Self::CnameConflict { .. } => REASON_CNAME_CONFLICT,
            Self::ManagedRecordImmutable { .. } => REASON_MANAGED_RECORD_IMMUTABLE,
            Self::PtrNameCollision { .. } => REASON_PTR_NAME_COLLISION,
        }
    }
}

/// Errors from the external IPAM collaborator.
///
/// These never leave the IPAM linker; a failed lookup degrades to "no address".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IpamError {
    /// The lookup did not complete within the configured timeout.
    #[error("IPAM lookup of address {id} timed out after {timeout_ms}ms")]
    LookupTimeout {
        /// The IPAM address identifier
        id: IpamAddressId,
        /// Timeout duration in milliseconds
        timeout_ms: u64,
    },

    /// The address no longer exists in IPAM (deleted externally).
    #[error("IPAM address {id} not found")]
    AddressNotFound {
        /// The IPAM address identifier
        id: IpamAddressId,
    },

    /// The IPAM system reported an error.
    #[error("IPAM unavailable: {reason}")]
    Unavailable {
        /// Error reported by the collaborator
        reason: String,
    },
}

impl IpamError {
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::LookupTimeout { .. } => REASON_IPAM_LOOKUP_TIMEOUT,
            Self::AddressNotFound { .. } => REASON_IPAM_ADDRESS_NOT_FOUND,
            Self::Unavailable { .. } => REASON_IPAM_UNAVAILABLE,
        }
    }
}

/// Any error surfaced by the engine's public API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DnsError {
    #[error(transparent)]
    Zone(#[from] ZoneError),

    #[error(transparent)]
    Record(#[from] RecordError),
}

impl DnsError {
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Zone(e) => e.reason(),
            Self::Record(e) => e.reason(),
        }
    }
}

/// Result type used throughout the engine.
pub type Result<T, E = DnsError> = std::result::Result<T, E>;
