// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for DNS error types.

#[cfg(test)]
mod tests {
    use crate::dns_errors::*;
    use crate::model::{IpamAddressId, RecordId, ZoneId};

    #[test]
    fn test_no_zone_found_error() {
        let error = ZoneError::NoZoneFound {
            name: "host1.example.org".to_string(),
            view: "_default_".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "No zone found for 'host1.example.org' in view '_default_'"
        );
        assert_eq!(error.reason(), "NoZoneFound");
    }

    #[test]
    fn test_zone_already_exists_error() {
        let error = ZoneError::ZoneAlreadyExists {
            name: "example.com".to_string(),
            view: "internal".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Zone 'example.com' already exists in view 'internal'"
        );
    }

    #[test]
    fn test_delegation_conflict_error() {
        let error = ZoneError::DelegationConflict {
            zone: "0-31.2.0.192.in-addr.arpa".to_string(),
            prefix: "192.0.2.0/27".to_string(),
            conflicting_zone: "0-15.2.0.192.in-addr.arpa".to_string(),
            conflicting_prefix: "192.0.2.0/28".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "RFC2317 delegation 192.0.2.0/27 of zone '0-31.2.0.192.in-addr.arpa' conflicts with 192.0.2.0/28 of zone '0-15.2.0.192.in-addr.arpa'"
        );
        assert_eq!(error.reason(), "DelegationConflict");
    }

    #[test]
    fn test_zone_not_found_error() {
        let error = ZoneError::ZoneNotFound { id: ZoneId(4) };
        assert_eq!(error.to_string(), "Zone 4 not found");
        assert_eq!(error.reason(), "ZoneNotFound");
    }

    #[test]
    fn test_managed_record_immutable_error() {
        let error = RecordError::ManagedRecordImmutable {
            id: RecordId(12),
            name: "10".to_string(),
            zone: "2.0.192.in-addr.arpa".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Record 12 ('10' in zone '2.0.192.in-addr.arpa') is managed and cannot be modified directly"
        );
        assert_eq!(error.reason(), "ManagedRecordImmutable");
    }

    #[test]
    fn test_ptr_name_collision_error() {
        let error = RecordError::PtrNameCollision {
            name: "10".to_string(),
            zone: "2.0.192.in-addr.arpa".to_string(),
            existing: RecordId(7),
        };

        assert_eq!(
            error.to_string(),
            "Reverse name '10' in zone '2.0.192.in-addr.arpa' is already occupied by record 7"
        );
        assert_eq!(error.reason(), "PtrNameCollision");
    }

    #[test]
    fn test_duplicate_record_error() {
        let error = RecordError::DuplicateRecord {
            name: "host1".to_string(),
            zone: "example.com".to_string(),
            record_type: "A".to_string(),
            value: "192.0.2.10".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Duplicate A record 'host1' in zone 'example.com' with value '192.0.2.10'"
        );
    }

    #[test]
    fn test_ipam_errors() {
        let timeout = IpamError::LookupTimeout {
            id: IpamAddressId(3),
            timeout_ms: 2000,
        };
        assert_eq!(
            timeout.to_string(),
            "IPAM lookup of address 3 timed out after 2000ms"
        );
        assert_eq!(timeout.reason(), "IpamLookupTimeout");

        let missing = IpamError::AddressNotFound { id: IpamAddressId(3) };
        assert_eq!(missing.reason(), "IpamAddressNotFound");

        let down = IpamError::Unavailable {
            reason: "connection refused".to_string(),
        };
        assert_eq!(down.to_string(), "IPAM unavailable: connection refused");
        assert_eq!(down.reason(), "IpamUnavailable");
    }

    #[test]
    fn test_dns_error_is_transparent() {
        let inner = RecordError::CnameConflict {
            name: "www".to_string(),
            zone: "example.com".to_string(),
        };
        let error: DnsError = inner.clone().into();

        assert_eq!(error.to_string(), inner.to_string());
        assert_eq!(error.reason(), "CnameConflict");
        assert_eq!(error, DnsError::Record(inner));
    }

    #[test]
    fn test_error_is_std_error() {
        let error: Box<dyn std::error::Error> = Box::new(DnsError::from(ZoneError::ZoneNotFound {
            id: ZoneId(1),
        }));
        assert!(error.to_string().contains("not found"));
    }
}
