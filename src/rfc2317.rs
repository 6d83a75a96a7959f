// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! RFC 2317 classless reverse delegation.
//!
//! Authority over the reverse mapping of an IPv4 block smaller than a /24 is
//! delegated by creating a child zone below the full-octet reverse zone and
//! placing one CNAME per address in the parent zone that points into it:
//!
//! ```text
//! ; parent zone 2.0.192.in-addr.arpa
//! 10          IN CNAME 10.0-15.2.0.192.in-addr.arpa.
//! ; child zone 0-15.2.0.192.in-addr.arpa
//! 10          IN PTR   host1.example.com.
//! ```
//!
//! The child zone label is either a hyphenated range (`0-15`) or the network
//! in CIDR notation (`0/28`); see [`Rfc2317Naming`].
//!
//! # Example
//!
//! ```rust
//! use ptrsync::rfc2317::{compute_delegation, Rfc2317Naming};
//!
//! let delegation =
//!     compute_delegation("192.0.2.10".parse().unwrap(), 28, Rfc2317Naming::Hyphenated).unwrap();
//! assert_eq!(delegation.child_zone_name, "0-15.2.0.192.in-addr.arpa");
//! assert_eq!(delegation.alias_name, "10");
//! assert_eq!(delegation.alias_target, "10.0-15.2.0.192.in-addr.arpa.");
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use thiserror::Error;

use crate::constants::{
    IPV4_MAX_PREFIX_LEN, IPV4_REVERSE_SUFFIX, IPV6_REVERSE_SUFFIX, RFC2317_MIN_PREFIX_LEN,
};
use crate::model::Zone;
use crate::names::strip_zone;

/// Errors from parsing or constructing an [`Rfc2317Prefix`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrefixError {
    #[error("'{0}' is not an IPv4 network in CIDR notation")]
    InvalidNetwork(String),

    #[error("prefix length {0} is outside the RFC2317 range 25-32")]
    InvalidLength(u8),

    #[error("{network}/{len} has host bits set")]
    HostBitsSet { network: Ipv4Addr, len: u8 },
}

/// An IPv4 network with a prefix length between 25 and 32.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rfc2317Prefix {
    network: Ipv4Addr,
    len: u8,
}

impl Rfc2317Prefix {
    /// Creates a prefix from its network address.
    ///
    /// # Errors
    ///
    /// Fails if the length is not sub-/24 or the address has host bits set.
    pub fn new(network: Ipv4Addr, len: u8) -> Result<Self, PrefixError> {
        if !(RFC2317_MIN_PREFIX_LEN..=IPV4_MAX_PREFIX_LEN).contains(&len) {
            return Err(PrefixError::InvalidLength(len));
        }
        if u32::from(network) & !mask(len) != 0 {
            return Err(PrefixError::HostBitsSet { network, len });
        }
        Ok(Self { network, len })
    }

    /// Creates the prefix of length `len` that contains `address`.
    ///
    /// # Errors
    ///
    /// Fails if the length is not sub-/24.
    pub fn containing(address: Ipv4Addr, len: u8) -> Result<Self, PrefixError> {
        if !(RFC2317_MIN_PREFIX_LEN..=IPV4_MAX_PREFIX_LEN).contains(&len) {
            return Err(PrefixError::InvalidLength(len));
        }
        Self::new(Ipv4Addr::from(u32::from(address) & mask(len)), len)
    }

    #[must_use]
    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    #[must_use]
    pub fn len(&self) -> u8 {
        self.len
    }

    #[must_use]
    pub fn contains(&self, address: Ipv4Addr) -> bool {
        u32::from(address) & mask(self.len) == u32::from(self.network)
    }

    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.contains(other.network) || other.contains(self.network)
    }

    /// Last octet of the first address in the block.
    #[must_use]
    pub fn first_octet(&self) -> u8 {
        self.network.octets()[3]
    }

    /// Last octet of the last address in the block.
    #[must_use]
    pub fn last_octet(&self) -> u8 {
        let broadcast = u32::from(self.network) | !mask(self.len);
        Ipv4Addr::from(broadcast).octets()[3]
    }

    /// Name of the full-octet reverse zone the block lives in.
    #[must_use]
    pub fn parent_zone_name(&self) -> String {
        let [a, b, c, _] = self.network.octets();
        format!("{c}.{b}.{a}.{IPV4_REVERSE_SUFFIX}")
    }

    /// Conventional name of the child zone the block is delegated to.
    #[must_use]
    pub fn child_zone_name(&self, naming: Rfc2317Naming) -> String {
        let label = match naming {
            Rfc2317Naming::Hyphenated => format!("{}-{}", self.first_octet(), self.last_octet()),
            Rfc2317Naming::Cidr => format!("{}/{}", self.first_octet(), self.len),
        };
        format!("{label}.{}", self.parent_zone_name())
    }

    /// Maps a name inside the child zone (the host octet) back to its address.
    #[must_use]
    pub fn address_for_label(&self, label: &str) -> Option<Ipv4Addr> {
        let octet: u8 = label.parse().ok()?;
        if octet.to_string() != label {
            return None;
        }
        let [a, b, c, _] = self.network.octets();
        let address = Ipv4Addr::new(a, b, c, octet);
        self.contains(address).then_some(address)
    }
}

fn mask(len: u8) -> u32 {
    if len == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(len))
    }
}

impl fmt::Display for Rfc2317Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.len)
    }
}

impl FromStr for Rfc2317Prefix {
    type Err = PrefixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (network, len) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| PrefixError::InvalidNetwork(s.to_string()))?;
        let network: Ipv4Addr = network
            .parse()
            .map_err(|_| PrefixError::InvalidNetwork(s.to_string()))?;
        let len: u8 = len
            .parse()
            .map_err(|_| PrefixError::InvalidNetwork(s.to_string()))?;
        Self::new(network, len)
    }
}

impl Serialize for Rfc2317Prefix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rfc2317Prefix {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Convention for the first label of an RFC 2317 child zone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rfc2317Naming {
    /// `0-15.2.0.192.in-addr.arpa`
    #[default]
    Hyphenated,
    /// `0/28.2.0.192.in-addr.arpa`
    Cidr,
}

impl Rfc2317Naming {
    /// Infers the convention used by an existing child zone name.
    #[must_use]
    pub fn detect(zone_name: &str) -> Option<Self> {
        let first_label = zone_name.split('.').next()?;
        if first_label.contains('/') {
            Some(Self::Cidr)
        } else if first_label.contains('-') {
            Some(Self::Hyphenated)
        } else {
            None
        }
    }
}

impl fmt::Display for Rfc2317Naming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Hyphenated => "hyphenated",
            Self::Cidr => "cidr",
        })
    }
}

impl FromStr for Rfc2317Naming {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hyphenated" | "hyphen" | "range" => Ok(Self::Hyphenated),
            "cidr" | "slash" => Ok(Self::Cidr),
            other => Err(format!(
                "unknown RFC2317 naming convention '{other}' (expected 'hyphenated' or 'cidr')"
            )),
        }
    }
}

/// The names involved in delegating one address of an RFC 2317 block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Rfc2317Delegation {
    pub prefix: Rfc2317Prefix,
    /// Full-octet reverse zone holding the alias.
    pub parent_zone_name: String,
    /// Child zone the block is delegated to.
    pub child_zone_name: String,
    /// CNAME owner name, relative to the parent zone.
    pub alias_name: String,
    /// Absolute CNAME target inside the child zone.
    pub alias_target: String,
}

/// Computes the classless delegation for `address` inside a `/prefix_len` block.
///
/// Returns `None` for /24 or coarser blocks, where no delegation is needed.
#[must_use]
pub fn compute_delegation(
    address: Ipv4Addr,
    prefix_len: u8,
    naming: Rfc2317Naming,
) -> Option<Rfc2317Delegation> {
    let prefix = Rfc2317Prefix::containing(address, prefix_len).ok()?;
    let child_zone_name = prefix.child_zone_name(naming);
    let alias_name = address.octets()[3].to_string();
    let alias_target = format!("{alias_name}.{child_zone_name}.");
    Some(Rfc2317Delegation {
        prefix,
        parent_zone_name: prefix.parent_zone_name(),
        child_zone_name,
        alias_name,
        alias_target,
    })
}

/// Full reverse-mapping name of an address, without the trailing dot.
#[must_use]
pub fn reverse_pointer_name(address: IpAddr) -> String {
    match address {
        IpAddr::V4(v4) => {
            let [a, b, c, d] = v4.octets();
            format!("{d}.{c}.{b}.{a}.{IPV4_REVERSE_SUFFIX}")
        }
        IpAddr::V6(v6) => {
            let mut labels: Vec<String> = v6
                .octets()
                .iter()
                .flat_map(|byte| [byte >> 4, byte & 0x0f])
                .map(|nibble| format!("{nibble:x}"))
                .collect();
            labels.reverse();
            format!("{}.{IPV6_REVERSE_SUFFIX}", labels.join("."))
        }
    }
}

/// Parses a complete reverse-mapping name back into its address.
#[must_use]
pub fn address_from_reverse_name(name: &str) -> Option<IpAddr> {
    let name = name.trim_end_matches('.').to_ascii_lowercase();
    if let Some(rest) = name.strip_suffix(IPV4_REVERSE_SUFFIX) {
        let mut octets = rest
            .strip_suffix('.')?
            .split('.')
            .map(|label| {
                let octet = label.parse::<u8>().ok()?;
                (octet.to_string() == label).then_some(octet)
            })
            .collect::<Option<Vec<u8>>>()?;
        octets.reverse();
        let octets: [u8; 4] = octets.try_into().ok()?;
        return Some(IpAddr::V4(Ipv4Addr::from(octets)));
    }
    let rest = name.strip_suffix(IPV6_REVERSE_SUFFIX)?.strip_suffix('.')?;
    let mut nibbles = rest
        .split('.')
        .map(|label| match label.len() {
            1 => u8::from_str_radix(label, 16).ok(),
            _ => None,
        })
        .collect::<Option<Vec<u8>>>()?;
    if nibbles.len() != 32 {
        return None;
    }
    nibbles.reverse();
    let mut bytes = [0u8; 16];
    for (byte, pair) in bytes.iter_mut().zip(nibbles.chunks(2)) {
        *byte = (pair[0] << 4) | pair[1];
    }
    Some(IpAddr::V6(bytes.into()))
}

/// Name of the PTR record for `address` relative to `zone`.
///
/// In an RFC 2317 child zone this is the host octet; in a standard reverse
/// zone it is the reverse path below the zone apex (`10` in a /24 zone, `10.2`
/// in a /16 zone). Returns `None` if the address does not belong to the zone.
#[must_use]
pub fn reverse_name_for(address: IpAddr, zone: &Zone) -> Option<String> {
    match (zone.rfc2317_prefix, address) {
        (Some(prefix), IpAddr::V4(v4)) => prefix
            .contains(v4)
            .then(|| v4.octets()[3].to_string()),
        (Some(_), IpAddr::V6(_)) => None,
        (None, _) => strip_zone(&reverse_pointer_name(address), &zone.name)
            .filter(|name| name != crate::constants::APEX_NAME),
    }
}

#[cfg(test)]
#[path = "rfc2317_tests.rs"]
mod rfc2317_tests;
