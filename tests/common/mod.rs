// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

// Common test utilities for integration tests

#![allow(dead_code)]

use ptrsync::engine::{DnsEngine, MutationReport};
use ptrsync::filter::RecordFilter;
use ptrsync::model::{Record, RecordSpec, RecordType, ZoneId, ZoneSpec};

pub const FORWARD_ZONE: &str = "example.com";
pub const REVERSE_ZONE: &str = "2.0.192.in-addr.arpa";
pub const CHILD_ZONE: &str = "0-15.2.0.192.in-addr.arpa";
pub const CHILD_PREFIX: &str = "192.0.2.0/28";

/// An engine with `example.com` and `2.0.192.in-addr.arpa`.
pub async fn standard_engine() -> (DnsEngine, ZoneId) {
    let engine = DnsEngine::default();
    let forward = engine
        .create_zone(ZoneSpec::new(FORWARD_ZONE))
        .await
        .expect("forward zone")
        .zone
        .id;
    engine
        .create_zone(ZoneSpec::new(REVERSE_ZONE))
        .await
        .expect("reverse zone");
    (engine, forward)
}

/// Adds the `192.0.2.0/28` classless delegation.
pub async fn add_child_zone(engine: &DnsEngine) -> ZoneId {
    engine
        .create_zone(
            ZoneSpec::new(CHILD_ZONE).with_rfc2317_prefix(CHILD_PREFIX.parse().expect("prefix")),
        )
        .await
        .expect("child zone")
        .zone
        .id
}

pub async fn create_a(engine: &DnsEngine, zone: ZoneId, name: &str, address: &str) -> MutationReport {
    engine
        .create_record(RecordSpec::new(zone, name, RecordType::A, address))
        .await
        .expect("A record")
}

pub async fn records_of(engine: &DnsEngine, record_type: RecordType) -> Vec<Record> {
    engine
        .filter_records(&RecordFilter::new().record_type(record_type))
        .await
}

pub async fn managed_records(engine: &DnsEngine) -> Vec<Record> {
    engine
        .filter_records(&RecordFilter::new().managed(true))
        .await
}

/// Checks the bidirectional links between every address record and its PTR.
pub async fn assert_links_consistent(engine: &DnsEngine) {
    for record in engine.records().await {
        let detail = engine.record_detail(record.id).await.expect("detail");
        if let Some(ptr) = detail.ptr_record {
            let ptr = engine.record_detail(ptr).await.expect("ptr detail");
            assert_eq!(ptr.address_record, Some(record.id));
        }
        if let Some(address) = detail.address_record {
            let forward = engine.record_detail(address).await.expect("address record");
            assert_eq!(forward.ptr_record, Some(record.id));
        }
        if let Some(alias) = detail.rfc2317_cname_record {
            let alias = engine.record_detail(alias).await.expect("alias");
            assert!(alias.rfc2317_ptr_records.contains(&record.id));
        }
    }
}
