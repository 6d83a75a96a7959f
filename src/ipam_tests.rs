// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `ipam.rs`

use super::*;
use crate::model::{Ownership, RecordId, RecordStatus, RecordType, ZoneId};
use chrono::Utc;

struct SlowIpam;

#[async_trait::async_trait]
impl IpamSource for SlowIpam {
    async fn get_ip_address(&self, id: IpamAddressId) -> Result<Option<IpamAddress>> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Some(IpamAddress::new(id, "192.0.2.10/24")))
    }
}

struct BrokenIpam;

#[async_trait::async_trait]
impl IpamSource for BrokenIpam {
    async fn get_ip_address(&self, _id: IpamAddressId) -> Result<Option<IpamAddress>> {
        anyhow::bail!("connection refused")
    }
}

fn linked_record(ipam: Option<IpamAddressId>) -> Record {
    Record {
        id: RecordId(1),
        zone: ZoneId(1),
        name: "host1".to_string(),
        record_type: RecordType::A,
        value: "192.0.2.10".to_string(),
        ttl: None,
        status: RecordStatus::Active,
        ownership: Ownership::UserOwned,
        disable_ptr: false,
        description: String::new(),
        rfc2317_cname_record: None,
        ipam_ip_address: ipam,
        warnings: Vec::new(),
        created: Utc::now(),
        last_updated: Utc::now(),
    }
}

fn static_linker() -> (Arc<StaticIpam>, IpamLinker) {
    let source = Arc::new(StaticIpam::new([IpamAddress::new(
        IpamAddressId(7),
        "192.0.2.10/24",
    )
    .with_dns_name("host1.example.com")]));
    let linker = IpamLinker::new(source.clone(), Duration::from_secs(2));
    (source, linker)
}

#[tokio::test]
async fn test_lookup_found() {
    let (_, linker) = static_linker();
    let address = linker
        .lookup(&linked_record(Some(IpamAddressId(7))))
        .await
        .unwrap();
    assert_eq!(address.address, "192.0.2.10/24");
    assert_eq!(address.dns_name, "host1.example.com");
}

#[tokio::test]
async fn test_lookup_without_link() {
    let (_, linker) = static_linker();
    assert!(linker.lookup(&linked_record(None)).await.is_none());
}

#[tokio::test]
async fn test_lookup_after_external_delete_degrades() {
    let (source, linker) = static_linker();
    source.remove(IpamAddressId(7)).await;
    assert!(linker
        .lookup(&linked_record(Some(IpamAddressId(7))))
        .await
        .is_none());

    source
        .insert(IpamAddress::new(IpamAddressId(7), "192.0.2.11/24"))
        .await;
    assert_eq!(
        linker.lookup_id(IpamAddressId(7)).await.unwrap().address,
        "192.0.2.11/24"
    );
}

#[tokio::test]
async fn test_lookup_timeout_degrades() {
    let linker = IpamLinker::new(Arc::new(SlowIpam), Duration::from_millis(20));
    assert_eq!(
        linker.try_lookup(IpamAddressId(1)).await,
        Err(IpamError::LookupTimeout {
            id: IpamAddressId(1),
            timeout_ms: 20,
        })
    );
    assert!(linker.lookup_id(IpamAddressId(1)).await.is_none());
}

#[tokio::test]
async fn test_lookup_error_degrades() {
    let linker = IpamLinker::new(Arc::new(BrokenIpam), Duration::from_secs(1));
    let err = linker.try_lookup(IpamAddressId(1)).await.unwrap_err();
    assert_eq!(
        err,
        IpamError::Unavailable {
            reason: "connection refused".to_string()
        }
    );
    assert_eq!(err.reason(), "IpamUnavailable");
    assert!(linker.lookup_id(IpamAddressId(1)).await.is_none());
}

#[tokio::test]
async fn test_lookup_many_keeps_order() {
    let (_, linker) = static_linker();
    let records = vec![
        linked_record(None),
        linked_record(Some(IpamAddressId(7))),
        linked_record(Some(IpamAddressId(99))),
    ];
    let results = linker.lookup_many(&records).await;
    assert_eq!(results.len(), 3);
    assert!(results[0].is_none());
    assert_eq!(results[1].as_ref().unwrap().id, IpamAddressId(7));
    assert!(results[2].is_none());
}

#[test]
fn test_ipam_address_deserializes_with_defaults() {
    let address: IpamAddress =
        serde_yaml::from_str("id: 3\naddress: 198.51.100.1/24\n").unwrap();
    assert_eq!(address.id, IpamAddressId(3));
    assert_eq!(address.dns_name, "");
}
