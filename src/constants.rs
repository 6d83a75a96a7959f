// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the ptrsync engine.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// DNS Naming Constants
// ============================================================================

/// Suffix of the IPv4 reverse mapping tree
pub const IPV4_REVERSE_SUFFIX: &str = "in-addr.arpa";

/// Suffix of the IPv6 reverse mapping tree
pub const IPV6_REVERSE_SUFFIX: &str = "ip6.arpa";

/// Relative name that denotes the zone apex
pub const APEX_NAME: &str = "@";

/// Maximum length of a single DNS label in octets (RFC 1035)
pub const MAX_LABEL_LENGTH: usize = 63;

/// Maximum length of a presentation-format domain name without the trailing dot
pub const MAX_NAME_LENGTH: usize = 253;

/// Maximum TTL value accepted for records (RFC 2181 §8)
pub const MAX_TTL_SECS: u32 = 2_147_483_647;

// ============================================================================
// Zone Defaults
// ============================================================================

/// Default TTL for zones (1 hour)
pub const DEFAULT_ZONE_TTL_SECS: u32 = 3600;

/// Name of the view zones belong to when none is given
pub const DEFAULT_VIEW_NAME: &str = "_default_";

// ============================================================================
// RFC 2317 Constants
// ============================================================================

/// Shortest prefix length that can be delegated with RFC 2317 (sub-/24 only)
pub const RFC2317_MIN_PREFIX_LEN: u8 = 25;

/// Longest IPv4 prefix length
pub const IPV4_MAX_PREFIX_LEN: u8 = 32;

/// Longest IPv6 prefix length
pub const IPV6_MAX_PREFIX_LEN: u8 = 128;

// ============================================================================
// IPAM Constants
// ============================================================================

/// Default timeout for a single IPAM lookup (2 seconds)
pub const DEFAULT_IPAM_TIMEOUT_MILLIS: u64 = 2000;

// ============================================================================
// Environment Variables
// ============================================================================

/// Environment variable overriding the IPAM lookup timeout in milliseconds
pub const ENV_IPAM_TIMEOUT_MS: &str = "PTRSYNC_IPAM_TIMEOUT_MS";

/// Environment variable selecting the RFC 2317 zone naming convention
pub const ENV_RFC2317_NAMING: &str = "PTRSYNC_RFC2317_NAMING";

/// Environment variable overriding the default view name
pub const ENV_DEFAULT_VIEW: &str = "PTRSYNC_DEFAULT_VIEW";

// ============================================================================
// Metrics Constants
// ============================================================================

/// Namespace prefix for all ptrsync metrics (prometheus-safe)
pub const METRICS_NAMESPACE: &str = "ptrsync";
