// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Zone registry: the set of authoritative zones and name-to-zone resolution.
//!
//! Zones are unique per view. Resolution is the classic "closest enclosing
//! zone" search: walk the ancestors of a name from the longest to the
//! shortest and return the first zone found. Reverse lookups for IPv4
//! addresses additionally honor RFC 2317 child zones, which are matched by
//! their delegated prefix rather than by name.

use std::collections::{BTreeMap, HashMap};
use std::net::{IpAddr, Ipv4Addr};

use chrono::Utc;
use tracing::debug;

use crate::constants::{
    IPV4_MAX_PREFIX_LEN, IPV4_REVERSE_SUFFIX, IPV6_MAX_PREFIX_LEN, IPV6_REVERSE_SUFFIX,
    MAX_TTL_SECS,
};
use crate::dns_errors::ZoneError;
use crate::model::{is_reverse_name, Zone, ZoneId, ZoneSpec};
use crate::names::{ancestors, normalize_name, validate_domain_name};
use crate::rfc2317::{reverse_pointer_name, Rfc2317Naming};

/// In-memory registry of zones.
#[derive(Clone, Debug, Default)]
pub struct ZoneRegistry {
    zones: BTreeMap<ZoneId, Zone>,
    by_name: HashMap<(String, String), ZoneId>,
    next_id: u64,
}

impl ZoneRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and adds a zone.
    ///
    /// # Errors
    ///
    /// - [`ZoneError::InvalidZoneConfiguration`] for malformed names, TTLs or prefixes
    /// - [`ZoneError::ZoneAlreadyExists`] if the view already has a zone of that name
    /// - [`ZoneError::DelegationConflict`] if the RFC 2317 prefix overlaps another delegation
    pub fn add(&mut self, spec: ZoneSpec, default_view: &str) -> Result<&Zone, ZoneError> {
        let name = normalize_name(&spec.name);
        let view = spec
            .view
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(default_view)
            .to_string();

        let invalid = |reason: String| ZoneError::InvalidZoneConfiguration {
            zone: name.clone(),
            reason,
        };

        validate_domain_name(&name).map_err(invalid)?;
        let default_ttl = spec.effective_default_ttl();
        if default_ttl == 0 || default_ttl > MAX_TTL_SECS {
            return Err(invalid(format!(
                "default TTL {default_ttl} is outside 1-{MAX_TTL_SECS}"
            )));
        }

        if let Some(prefix) = spec.rfc2317_prefix {
            if !name.ends_with(IPV4_REVERSE_SUFFIX) {
                return Err(invalid(format!(
                    "RFC2317 prefix {prefix} requires an {IPV4_REVERSE_SUFFIX} zone"
                )));
            }
            let conflict = self.zones.values().find(|zone| {
                zone.view == view && zone.rfc2317_prefix.is_some_and(|p| p.overlaps(&prefix))
            });
            if let Some(existing) = conflict {
                return Err(ZoneError::DelegationConflict {
                    zone: name,
                    prefix: prefix.to_string(),
                    conflicting_zone: existing.name.clone(),
                    conflicting_prefix: existing
                        .rfc2317_prefix
                        .map(|p| p.to_string())
                        .unwrap_or_default(),
                });
            }
        } else {
            validate_reverse_zone_name(&name).map_err(invalid)?;
        }

        let key = (view.clone(), name.clone());
        if self.by_name.contains_key(&key) {
            return Err(ZoneError::ZoneAlreadyExists { name, view });
        }

        self.next_id += 1;
        let id = ZoneId(self.next_id);
        let now = Utc::now();
        let zone = Zone {
            id,
            view,
            name,
            status: spec.status,
            default_ttl,
            description: spec.description,
            rfc2317_prefix: spec.rfc2317_prefix,
            rfc2317_parent_managed: spec.rfc2317_prefix.is_some() && spec.rfc2317_parent_managed,
            created: now,
            last_updated: now,
        };
        debug!(zone = %zone.name, view = %zone.view, id = %id, "Registered zone");

        self.by_name.insert(key, id);
        Ok(self.zones.entry(id).or_insert(zone))
    }

    /// Removes a zone from the registry.
    ///
    /// # Errors
    ///
    /// Returns [`ZoneError::ZoneNotFound`] if the id is unknown.
    pub fn remove(&mut self, id: ZoneId) -> Result<Zone, ZoneError> {
        let zone = self.zones.remove(&id).ok_or(ZoneError::ZoneNotFound { id })?;
        self.by_name.remove(&(zone.view.clone(), zone.name.clone()));
        Ok(zone)
    }

    #[must_use]
    pub fn get(&self, id: ZoneId) -> Option<&Zone> {
        self.zones.get(&id)
    }

    /// Like [`get`](Self::get) but fails with [`ZoneError::ZoneNotFound`].
    ///
    /// # Errors
    ///
    /// Returns an error if the id is unknown.
    pub fn require(&self, id: ZoneId) -> Result<&Zone, ZoneError> {
        self.zones.get(&id).ok_or(ZoneError::ZoneNotFound { id })
    }

    #[must_use]
    pub fn get_by_name(&self, view: &str, name: &str) -> Option<&Zone> {
        self.by_name
            .get(&(view.to_string(), normalize_name(name)))
            .and_then(|id| self.zones.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.zones.values()
    }

    pub fn in_view<'a, 'v>(&'a self, view: &'v str) -> impl Iterator<Item = &'a Zone> + 'v
    where
        'a: 'v,
    {
        self.zones.values().filter(move |zone| zone.view == view)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Returns the zone that is the longest-suffix match for `name` in `view`.
    ///
    /// # Errors
    ///
    /// Returns [`ZoneError::NoZoneFound`] if no zone encloses the name.
    pub fn resolve_zone(&self, view: &str, name: &str) -> Result<&Zone, ZoneError> {
        let name = normalize_name(name);
        let found = ancestors(&name)
            .find_map(|candidate| self.get_by_name(view, candidate))
            .ok_or_else(|| ZoneError::NoZoneFound {
                name: name.clone(),
                view: view.to_string(),
            });
        found
    }

    /// Finds the reverse zone that should hold the PTR record for `address`.
    ///
    /// An RFC 2317 zone whose prefix contains the address (and is not longer
    /// than `prefix_len`) wins over the full-octet zone. Otherwise the most
    /// specific standard reverse zone covering at most `prefix_len` bits is
    /// returned. `prefix_len` is clamped to the address family's maximum.
    ///
    /// # Errors
    ///
    /// Returns [`ZoneError::DelegationConflict`] if more than one RFC 2317
    /// zone claims the address.
    pub fn reverse_zone_for(
        &self,
        view: &str,
        address: IpAddr,
        prefix_len: u8,
    ) -> Result<Option<&Zone>, ZoneError> {
        let max = match address {
            IpAddr::V4(_) => IPV4_MAX_PREFIX_LEN,
            IpAddr::V6(_) => IPV6_MAX_PREFIX_LEN,
        };
        let prefix_len = prefix_len.min(max);

        if let IpAddr::V4(v4) = address {
            let mut delegated = self.in_view(view).filter(|zone| {
                zone.rfc2317_prefix
                    .is_some_and(|p| p.contains(v4) && p.len() <= prefix_len)
            });
            if let Some(first) = delegated.next() {
                if let Some(second) = delegated.next() {
                    return Err(ZoneError::DelegationConflict {
                        zone: first.name.clone(),
                        prefix: prefix_string(first),
                        conflicting_zone: second.name.clone(),
                        conflicting_prefix: prefix_string(second),
                    });
                }
                return Ok(Some(first));
            }
        }

        let reverse_name = reverse_pointer_name(address);
        let found = ancestors(&reverse_name).find_map(|candidate| {
            self.get_by_name(view, candidate).filter(|zone| {
                !zone.is_rfc2317()
                    && covered_prefix_len(&zone.name).is_some_and(|len| len <= prefix_len)
            })
        });
        Ok(found)
    }

    /// The full-octet reverse zone that holds the CNAME alias for `address`.
    #[must_use]
    pub fn rfc2317_parent_zone(&self, view: &str, address: Ipv4Addr) -> Option<&Zone> {
        let reverse_name = reverse_pointer_name(IpAddr::V4(address));
        let found = ancestors(&reverse_name)
            .skip(1)
            .find_map(|candidate| {
                self.get_by_name(view, candidate)
                    .filter(|zone| !zone.is_rfc2317())
            });
        found
    }

    /// The RFC 2317 naming convention already in use, or `fallback`.
    ///
    /// Only zones named below their parent full-octet zone are considered.
    #[must_use]
    pub fn rfc2317_naming(&self, fallback: Rfc2317Naming) -> Rfc2317Naming {
        self.zones
            .values()
            .filter_map(|zone| {
                let prefix = zone.rfc2317_prefix?;
                let (label, parent) = zone.name.split_once('.')?;
                (parent == prefix.parent_zone_name()).then_some(label)
            })
            .find_map(Rfc2317Naming::detect)
            .unwrap_or(fallback)
    }
}

fn prefix_string(zone: &Zone) -> String {
    zone.rfc2317_prefix
        .map(|p| p.to_string())
        .unwrap_or_default()
}

/// Number of address bits a standard reverse zone name covers.
fn covered_prefix_len(zone_name: &str) -> Option<u8> {
    let (rest, step) = if let Some(rest) = zone_name.strip_suffix(IPV4_REVERSE_SUFFIX) {
        (rest, 8)
    } else if let Some(rest) = zone_name.strip_suffix(IPV6_REVERSE_SUFFIX) {
        (rest, 4)
    } else {
        return None;
    };
    let rest = rest.trim_end_matches('.');
    let labels = if rest.is_empty() {
        0
    } else {
        rest.split('.').count()
    };
    u8::try_from(labels * step).ok()
}

/// Checks that a non-RFC 2317 reverse zone name is a valid octet/nibble path.
fn validate_reverse_zone_name(name: &str) -> Result<(), String> {
    if !is_reverse_name(name) {
        return Ok(());
    }

    let (rest, max_labels, ipv4) = match name.strip_suffix(IPV4_REVERSE_SUFFIX) {
        Some(rest) => (rest, 4, true),
        None => (name.strip_suffix(IPV6_REVERSE_SUFFIX).unwrap_or_default(), 32, false),
    };
    let labels: Vec<&str> = rest.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() > max_labels {
        return Err(format!("'{name}' has more than {max_labels} address labels"));
    }

    let bad = if ipv4 {
        labels
            .iter()
            .find(|l| l.parse::<u8>().map_or(true, |octet| octet.to_string() != **l))
    } else {
        labels
            .iter()
            .find(|l| l.len() != 1 || !l.chars().all(|c| c.is_ascii_hexdigit()))
    };
    match bad {
        Some(label) => Err(format!("'{label}' is not a valid address label in '{name}'")),
        None => Ok(()),
    }
}

#[cfg(test)]
#[path = "zone_registry_tests.rs"]
mod zone_registry_tests;
