// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `zone_registry.rs`

use super::*;
use crate::model::ZoneStatus;

const VIEW: &str = "_default_";

fn registry_with(names: &[&str]) -> ZoneRegistry {
    let mut registry = ZoneRegistry::new();
    for name in names {
        registry.add(ZoneSpec::new(*name), VIEW).unwrap();
    }
    registry
}

fn add_rfc2317(registry: &mut ZoneRegistry, name: &str, prefix: &str) -> Result<ZoneId, ZoneError> {
    registry
        .add(
            ZoneSpec::new(name).with_rfc2317_prefix(prefix.parse().unwrap()),
            VIEW,
        )
        .map(|zone| zone.id)
}

#[test]
fn test_add_normalizes_and_assigns_ids() {
    let mut registry = ZoneRegistry::new();
    let first = registry.add(ZoneSpec::new("Example.COM."), VIEW).unwrap().id;
    let second = registry.add(ZoneSpec::new("example.org"), VIEW).unwrap().id;

    assert_ne!(first, second);
    let zone = registry.get(first).unwrap();
    assert_eq!(zone.name, "example.com");
    assert_eq!(zone.view, VIEW);
    assert_eq!(zone.default_ttl, 3600);
    assert_eq!(zone.kind(), crate::model::ZoneKind::Forward);
}

#[test]
fn test_add_rejects_duplicate_in_same_view() {
    let mut registry = registry_with(&["example.com"]);
    let err = registry.add(ZoneSpec::new("example.com"), VIEW).unwrap_err();
    assert_eq!(
        err,
        ZoneError::ZoneAlreadyExists {
            name: "example.com".to_string(),
            view: VIEW.to_string(),
        }
    );

    // Same name in another view is fine
    assert!(registry
        .add(ZoneSpec::new("example.com").with_view("internal"), VIEW)
        .is_ok());
}

#[test]
fn test_add_rejects_invalid_reverse_names() {
    let mut registry = ZoneRegistry::new();
    assert!(matches!(
        registry.add(ZoneSpec::new("300.0.192.in-addr.arpa"), VIEW),
        Err(ZoneError::InvalidZoneConfiguration { .. })
    ));
    assert!(matches!(
        registry.add(ZoneSpec::new("1.2.3.4.5.in-addr.arpa"), VIEW),
        Err(ZoneError::InvalidZoneConfiguration { .. })
    ));
    assert!(matches!(
        registry.add(ZoneSpec::new("xy.8.b.d.0.1.0.0.2.ip6.arpa"), VIEW),
        Err(ZoneError::InvalidZoneConfiguration { .. })
    ));
    assert!(registry
        .add(ZoneSpec::new("8.b.d.0.1.0.0.2.ip6.arpa"), VIEW)
        .is_ok());
}

#[test]
fn test_add_rejects_rfc2317_prefix_on_forward_zone() {
    let mut registry = ZoneRegistry::new();
    let err = add_rfc2317(&mut registry, "example.com", "192.0.2.0/28").unwrap_err();
    assert!(matches!(err, ZoneError::InvalidZoneConfiguration { .. }));
}

#[test]
fn test_add_rejects_zero_ttl() {
    let mut registry = ZoneRegistry::new();
    let err = registry
        .add(ZoneSpec::new("example.com").with_default_ttl(0), VIEW)
        .unwrap_err();
    assert!(matches!(err, ZoneError::InvalidZoneConfiguration { .. }));
}

#[test]
fn test_overlapping_delegations_conflict() {
    let mut registry = ZoneRegistry::new();
    add_rfc2317(&mut registry, "0-127.2.0.192.in-addr.arpa", "192.0.2.0/25").unwrap();

    let err = add_rfc2317(&mut registry, "0-15.2.0.192.in-addr.arpa", "192.0.2.0/28").unwrap_err();
    assert_eq!(
        err,
        ZoneError::DelegationConflict {
            zone: "0-15.2.0.192.in-addr.arpa".to_string(),
            prefix: "192.0.2.0/28".to_string(),
            conflicting_zone: "0-127.2.0.192.in-addr.arpa".to_string(),
            conflicting_prefix: "192.0.2.0/25".to_string(),
        }
    );
    assert_eq!(err.reason(), "DelegationConflict");

    // The other half of the /24 is fine
    assert!(add_rfc2317(&mut registry, "128-255.2.0.192.in-addr.arpa", "192.0.2.128/25").is_ok());
}

#[test]
fn test_resolve_zone_longest_suffix() {
    let registry = registry_with(&["example.com", "sub.example.com", "com"]);

    assert_eq!(
        registry.resolve_zone(VIEW, "host.sub.example.com").unwrap().name,
        "sub.example.com"
    );
    assert_eq!(
        registry.resolve_zone(VIEW, "Host.Example.com.").unwrap().name,
        "example.com"
    );
    assert_eq!(
        registry.resolve_zone(VIEW, "example.net.com").unwrap().name,
        "com"
    );
}

#[test]
fn test_resolve_zone_no_match() {
    let registry = registry_with(&["example.com"]);
    assert_eq!(
        registry.resolve_zone(VIEW, "www.example.org"),
        Err(ZoneError::NoZoneFound {
            name: "www.example.org".to_string(),
            view: VIEW.to_string(),
        })
    );
    assert!(registry.resolve_zone("other", "www.example.com").is_err());
}

#[test]
fn test_reverse_zone_for_full_octet() {
    let registry = registry_with(&["0.192.in-addr.arpa", "2.0.192.in-addr.arpa"]);
    let zone = registry
        .reverse_zone_for(VIEW, "192.0.2.10".parse().unwrap(), 32)
        .unwrap()
        .unwrap();
    assert_eq!(zone.name, "2.0.192.in-addr.arpa");

    let zone = registry
        .reverse_zone_for(VIEW, "192.0.3.10".parse().unwrap(), 32)
        .unwrap()
        .unwrap();
    assert_eq!(zone.name, "0.192.in-addr.arpa");

    assert!(registry
        .reverse_zone_for(VIEW, "198.51.100.1".parse().unwrap(), 32)
        .unwrap()
        .is_none());
}

#[test]
fn test_reverse_zone_for_honors_prefix_len() {
    let registry = registry_with(&["0.192.in-addr.arpa", "2.0.192.in-addr.arpa"]);
    let zone = registry
        .reverse_zone_for(VIEW, "192.0.2.0".parse().unwrap(), 16)
        .unwrap()
        .unwrap();
    assert_eq!(zone.name, "0.192.in-addr.arpa");
}

#[test]
fn test_reverse_zone_for_prefers_rfc2317_delegation() {
    let mut registry = registry_with(&["2.0.192.in-addr.arpa"]);
    add_rfc2317(&mut registry, "0-15.2.0.192.in-addr.arpa", "192.0.2.0/28").unwrap();

    let zone = registry
        .reverse_zone_for(VIEW, "192.0.2.10".parse().unwrap(), 32)
        .unwrap()
        .unwrap();
    assert_eq!(zone.name, "0-15.2.0.192.in-addr.arpa");

    // Outside the delegation falls back to the full-octet zone
    let zone = registry
        .reverse_zone_for(VIEW, "192.0.2.20".parse().unwrap(), 32)
        .unwrap()
        .unwrap();
    assert_eq!(zone.name, "2.0.192.in-addr.arpa");

    // A /24 network lookup must not pick the /28 delegation
    let zone = registry
        .reverse_zone_for(VIEW, "192.0.2.0".parse().unwrap(), 24)
        .unwrap()
        .unwrap();
    assert_eq!(zone.name, "2.0.192.in-addr.arpa");
}

#[test]
fn test_reverse_zone_for_ipv6() {
    let registry = registry_with(&["8.b.d.0.1.0.0.2.ip6.arpa"]);
    let zone = registry
        .reverse_zone_for(VIEW, "2001:db8::1".parse().unwrap(), 128)
        .unwrap()
        .unwrap();
    assert_eq!(zone.name, "8.b.d.0.1.0.0.2.ip6.arpa");
}

#[test]
fn test_reverse_zone_for_ignores_other_views() {
    let mut registry = ZoneRegistry::new();
    registry
        .add(ZoneSpec::new("2.0.192.in-addr.arpa").with_view("internal"), VIEW)
        .unwrap();
    assert!(registry
        .reverse_zone_for(VIEW, "192.0.2.10".parse().unwrap(), 32)
        .unwrap()
        .is_none());
}

#[test]
fn test_rfc2317_parent_zone() {
    let mut registry = registry_with(&["2.0.192.in-addr.arpa"]);
    add_rfc2317(&mut registry, "0-15.2.0.192.in-addr.arpa", "192.0.2.0/28").unwrap();

    let parent = registry
        .rfc2317_parent_zone(VIEW, "192.0.2.10".parse().unwrap())
        .unwrap();
    assert_eq!(parent.name, "2.0.192.in-addr.arpa");
}

#[test]
fn test_rfc2317_naming_detects_existing_convention() {
    let mut registry = registry_with(&["2.0.192.in-addr.arpa"]);
    assert_eq!(
        registry.rfc2317_naming(Rfc2317Naming::Hyphenated),
        Rfc2317Naming::Hyphenated
    );

    add_rfc2317(&mut registry, "0/28.2.0.192.in-addr.arpa", "192.0.2.0/28").unwrap();
    assert_eq!(
        registry.rfc2317_naming(Rfc2317Naming::Hyphenated),
        Rfc2317Naming::Cidr
    );
}

#[test]
fn test_remove_zone() {
    let mut registry = registry_with(&["example.com"]);
    let id = registry.get_by_name(VIEW, "example.com").unwrap().id;

    let removed = registry.remove(id).unwrap();
    assert_eq!(removed.name, "example.com");
    assert!(registry.get_by_name(VIEW, "example.com").is_none());
    assert_eq!(registry.remove(id), Err(ZoneError::ZoneNotFound { id }));
}

#[test]
fn test_zone_status_activity() {
    let mut registry = ZoneRegistry::new();
    let zone = registry
        .add(
            ZoneSpec::new("example.com").with_status(ZoneStatus::Parked),
            VIEW,
        )
        .unwrap();
    assert!(!zone.is_active());
}
