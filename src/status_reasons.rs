// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Standard reason codes for ptrsync errors and synchronization warnings.
//!
//! Reasons are programmatic identifiers in CamelCase that explain why an
//! operation failed or why PTR synchronization was skipped. They are attached
//! to forward records as warnings and used as the `reason` label of the error
//! metrics.
//!
//! # Example Warning
//!
//! ```yaml
//! warnings:
//!   - "PtrNameCollision: Reverse name '10' in zone '2.0.192.in-addr.arpa' is already occupied by record 7"
//! ```

// ============================================================================
// Zone Registry Reasons
// ============================================================================

/// No zone matches a name (longest-suffix lookup failed).
pub const REASON_NO_ZONE_FOUND: &str = "NoZoneFound";

/// A zone identifier does not refer to a known zone.
pub const REASON_ZONE_NOT_FOUND: &str = "ZoneNotFound";

/// A zone with the same name already exists in the view.
pub const REASON_ZONE_ALREADY_EXISTS: &str = "ZoneAlreadyExists";

/// Zone definition failed validation.
pub const REASON_INVALID_ZONE_CONFIGURATION: &str = "InvalidZoneConfiguration";

/// Overlapping RFC 2317 delegations.
///
/// Never resolved automatically; the operator has to remove or narrow one of
/// the conflicting zones.
pub const REASON_DELEGATION_CONFLICT: &str = "DelegationConflict";

// ============================================================================
// Record Store Reasons
// ============================================================================

/// A record identifier does not refer to a known record.
pub const REASON_RECORD_NOT_FOUND: &str = "RecordNotFound";

/// Record data failed validation.
pub const REASON_INVALID_RECORD_DATA: &str = "InvalidRecordData";

/// An identical record already exists.
pub const REASON_DUPLICATE_RECORD: &str = "DuplicateRecord";

/// A CNAME would share its owner name with other data.
pub const REASON_CNAME_CONFLICT: &str = "CnameConflict";

/// Direct edit or delete of a managed record was rejected.
pub const REASON_MANAGED_RECORD_IMMUTABLE: &str = "ManagedRecordImmutable";

// ============================================================================
// PTR Synchronization Reasons
// ============================================================================

/// The computed reverse name is occupied; PTR generation was skipped.
///
/// **Usage:**
/// - Attached as a warning to the forward record
/// - The forward mutation itself still succeeds
pub const REASON_PTR_NAME_COLLISION: &str = "PtrNameCollision";

// ============================================================================
// IPAM Reasons
// ============================================================================

/// The IPAM lookup exceeded its timeout.
pub const REASON_IPAM_LOOKUP_TIMEOUT: &str = "IpamLookupTimeout";

/// The referenced IPAM address no longer exists.
pub const REASON_IPAM_ADDRESS_NOT_FOUND: &str = "IpamAddressNotFound";

/// The IPAM collaborator returned an error.
pub const REASON_IPAM_UNAVAILABLE: &str = "IpamUnavailable";

/// Formats a warning message the way it is stored on a record.
#[must_use]
pub fn format_warning(reason: &str, message: &str) -> String {
    format!("{reason}: {message}")
}
