// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `ptr_sync.rs`

use super::*;
use crate::model::ZoneSpec;
use crate::record_store::RecordStore;

const VIEW: &str = "_default_";

struct Fixture {
    zones: ZoneRegistry,
    store: RecordStore,
    forward: ZoneId,
}

impl Fixture {
    fn new(reverse_zones: &[&str]) -> Self {
        let mut zones = ZoneRegistry::new();
        let forward = zones.add(ZoneSpec::new("example.com"), VIEW).unwrap().id;
        for name in reverse_zones {
            zones.add(ZoneSpec::new(*name), VIEW).unwrap();
        }
        Self {
            zones,
            store: RecordStore::new(),
            forward,
        }
    }

    fn add_rfc2317(&mut self, name: &str, prefix: &str) -> ZoneId {
        self.zones
            .add(
                ZoneSpec::new(name).with_rfc2317_prefix(prefix.parse().unwrap()),
                VIEW,
            )
            .unwrap()
            .id
    }

    fn zone_id(&self, name: &str) -> ZoneId {
        self.zones.get_by_name(VIEW, name).unwrap().id
    }

    /// Inserts a user record and runs the created event for it.
    fn create(&mut self, zone: ZoneId, name: &str, record_type: RecordType, value: &str) -> (Record, PtrSyncResult) {
        let sync = PtrSynchronizer::new(&self.zones);
        let mut txn = Txn::new(&mut self.store);
        let id = txn.allocate_id();
        let now = Utc::now();
        let record = Record {
            id,
            zone,
            name: name.to_string(),
            record_type,
            value: value.to_string(),
            ttl: None,
            status: RecordStatus::Active,
            ownership: Ownership::UserOwned,
            disable_ptr: false,
            description: String::new(),
            rfc2317_cname_record: None,
            ipam_ip_address: None,
            warnings: Vec::new(),
            created: now,
            last_updated: now,
        };
        txn.insert(record.clone());
        let result = if record_type == RecordType::PTR {
            sync.sync_user_ptr(&mut txn, id).unwrap();
            PtrSyncResult::new(PtrAction::NotApplicable, None)
        } else {
            sync.handle(&mut txn, &record, AddressEvent::Created).unwrap()
        };
        txn.commit();
        (self.store.get(id).unwrap().clone(), result)
    }

    fn create_a(&mut self, name: &str, value: &str) -> (Record, PtrSyncResult) {
        let forward = self.forward;
        self.create(forward, name, RecordType::A, value)
    }

    /// Applies `change` to a stored record and runs the updated event.
    fn update(&mut self, id: RecordId, change: impl FnOnce(&mut Record)) -> PtrSyncResult {
        let sync = PtrSynchronizer::new(&self.zones);
        let mut txn = Txn::new(&mut self.store);
        let mut record = txn.get(id).unwrap().clone();
        let old_value = record.value.clone();
        change(&mut record);
        let value_changed = record.value != old_value;
        txn.replace(record.clone()).unwrap();
        let result = sync
            .handle(&mut txn, &record, AddressEvent::Updated { value_changed })
            .unwrap();
        txn.commit();
        result
    }

    fn delete(&mut self, id: RecordId) -> PtrSyncResult {
        let sync = PtrSynchronizer::new(&self.zones);
        let mut txn = Txn::new(&mut self.store);
        let record = txn.remove(id).unwrap();
        let result = sync.handle(&mut txn, &record, AddressEvent::Deleted).unwrap();
        txn.commit();
        result
    }

    fn ptr_of(&self, id: RecordId) -> Option<&Record> {
        self.store.ptr_record(id).and_then(|ptr| self.store.get(ptr))
    }
}

#[test]
fn test_created_generates_managed_ptr() {
    let mut fx = Fixture::new(&["2.0.192.in-addr.arpa"]);
    let (record, result) = fx.create_a("host1", "192.0.2.10");

    assert_eq!(result.action, PtrAction::Created);
    let ptr = fx.ptr_of(record.id).unwrap();
    assert_eq!(Some(ptr.id), result.ptr_record);
    assert_eq!(ptr.zone, fx.zone_id("2.0.192.in-addr.arpa"));
    assert_eq!(ptr.name, "10");
    assert_eq!(ptr.record_type, RecordType::PTR);
    assert_eq!(ptr.value, "host1.example.com.");
    assert!(ptr.managed());
    assert_eq!(ptr.address_record(), Some(record.id));
    assert_eq!(ptr.rfc2317_cname_record, None);
}

#[test]
fn test_ptr_copies_ttl() {
    let mut fx = Fixture::new(&["2.0.192.in-addr.arpa"]);
    let (record, _) = fx.create_a("host1", "192.0.2.10");
    let result = fx.update(record.id, |r| r.ttl = Some(300));

    assert_eq!(result.action, PtrAction::Updated);
    assert_eq!(fx.ptr_of(record.id).unwrap().ttl, Some(300));
}

#[test]
fn test_reconcile_is_idempotent() {
    let mut fx = Fixture::new(&["2.0.192.in-addr.arpa"]);
    let (record, created) = fx.create_a("host1", "192.0.2.10");

    let result = fx.update(record.id, |_| {});
    assert_eq!(result.action, PtrAction::Unchanged);
    assert_eq!(result.ptr_record, created.ptr_record);
    assert_eq!(fx.store.len(), 2);
}

#[test]
fn test_no_reverse_zone_skips() {
    let mut fx = Fixture::new(&[]);
    let (record, result) = fx.create_a("host1", "192.0.2.10");
    assert_eq!(result.action, PtrAction::Skipped);
    assert!(fx.ptr_of(record.id).is_none());
    assert!(record.warnings.is_empty());
}

#[test]
fn test_non_address_records_are_not_applicable() {
    let mut fx = Fixture::new(&["2.0.192.in-addr.arpa"]);
    let forward = fx.forward;
    let (_, result) = fx.create(forward, "www", RecordType::CNAME, "host1.example.com.");
    assert_eq!(result.action, PtrAction::NotApplicable);
    assert_eq!(fx.store.len(), 1);
}

#[test]
fn test_value_change_recreates_ptr() {
    let mut fx = Fixture::new(&["2.0.192.in-addr.arpa", "100.51.198.in-addr.arpa"]);
    let (record, created) = fx.create_a("host1", "192.0.2.10");

    let result = fx.update(record.id, |r| r.value = "198.51.100.7".to_string());
    assert_eq!(result.action, PtrAction::Recreated);
    assert_ne!(result.ptr_record, created.ptr_record);

    let ptr = fx.ptr_of(record.id).unwrap();
    assert_eq!(ptr.zone, fx.zone_id("100.51.198.in-addr.arpa"));
    assert_eq!(ptr.name, "7");
    assert!(fx.store.get(created.ptr_record.unwrap()).is_none());
}

#[test]
fn test_value_change_out_of_reverse_space_removes_ptr() {
    let mut fx = Fixture::new(&["2.0.192.in-addr.arpa"]);
    let (record, _) = fx.create_a("host1", "192.0.2.10");

    let result = fx.update(record.id, |r| r.value = "203.0.113.1".to_string());
    assert_eq!(result.action, PtrAction::Removed);
    assert!(fx.ptr_of(record.id).is_none());
    assert_eq!(fx.store.len(), 1);
}

#[test]
fn test_disable_ptr_toggle_restores_content() {
    let mut fx = Fixture::new(&["2.0.192.in-addr.arpa"]);
    let (record, _) = fx.create_a("host1", "192.0.2.10");
    let before = fx.ptr_of(record.id).unwrap().clone();

    let result = fx.update(record.id, |r| r.disable_ptr = true);
    assert_eq!(result.action, PtrAction::Removed);
    assert!(fx.ptr_of(record.id).is_none());
    assert!(fx.store.get(before.id).is_none());

    let result = fx.update(record.id, |r| r.disable_ptr = false);
    assert_eq!(result.action, PtrAction::Created);
    let after = fx.ptr_of(record.id).unwrap();
    assert_eq!(after.zone, before.zone);
    assert_eq!(after.name, before.name);
    assert_eq!(after.value, before.value);
    assert_eq!(after.ttl, before.ttl);
    assert_eq!(after.ownership, before.ownership);
}

#[test]
fn test_inactive_status_removes_ptr() {
    let mut fx = Fixture::new(&["2.0.192.in-addr.arpa"]);
    let (record, _) = fx.create_a("host1", "192.0.2.10");

    let result = fx.update(record.id, |r| r.status = RecordStatus::Inactive);
    assert_eq!(result.action, PtrAction::Removed);
    assert!(fx.ptr_of(record.id).is_none());
}

#[test]
fn test_delete_cascades() {
    let mut fx = Fixture::new(&["2.0.192.in-addr.arpa"]);
    let (record, _) = fx.create_a("host1", "192.0.2.10");

    let result = fx.delete(record.id);
    assert_eq!(result.action, PtrAction::Removed);
    assert!(fx.store.is_empty());
    assert_eq!(fx.store.ptr_record(record.id), None);
}

#[test]
fn test_collision_with_managed_ptr() {
    let mut fx = Fixture::new(&["2.0.192.in-addr.arpa"]);
    let (first, _) = fx.create_a("host1", "192.0.2.10");
    let (second, result) = fx.create_a("host2", "192.0.2.10");

    assert_eq!(result.action, PtrAction::Skipped);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].starts_with("PtrNameCollision: "));
    assert_eq!(second.warnings, result.warnings);
    assert!(fx.ptr_of(second.id).is_none());
    assert!(fx.ptr_of(first.id).is_some());
}

#[test]
fn test_collision_with_user_ptr_leaves_user_data() {
    let mut fx = Fixture::new(&["2.0.192.in-addr.arpa"]);
    let reverse = fx.zone_id("2.0.192.in-addr.arpa");
    let (user_ptr, _) = fx.create(reverse, "10", RecordType::PTR, "custom.example.net.");
    let (record, result) = fx.create_a("host1", "192.0.2.10");

    assert_eq!(result.action, PtrAction::Skipped);
    assert!(result.warnings[0].contains(&format!("occupied by record {}", user_ptr.id)));
    assert!(fx.ptr_of(record.id).is_none());
    assert_eq!(fx.store.get(user_ptr.id).unwrap().value, "custom.example.net.");
}

#[test]
fn test_reconcile_clears_collision_once_name_is_free() {
    let mut fx = Fixture::new(&["2.0.192.in-addr.arpa"]);
    let (first, _) = fx.create_a("host1", "192.0.2.10");
    let (second, _) = fx.create_a("host2", "192.0.2.10");

    fx.delete(first.id);
    let result = fx.update(second.id, |_| {});
    assert_eq!(result.action, PtrAction::Created);
    assert!(fx.store.get(second.id).unwrap().warnings.is_empty());
}

#[test]
fn test_rfc2317_creates_alias_in_parent() {
    let mut fx = Fixture::new(&["2.0.192.in-addr.arpa"]);
    let child = fx.add_rfc2317("0-15.2.0.192.in-addr.arpa", "192.0.2.0/28");
    let parent = fx.zone_id("2.0.192.in-addr.arpa");

    let (record, result) = fx.create_a("host1", "192.0.2.10");
    assert_eq!(result.action, PtrAction::Created);

    let ptr = fx.ptr_of(record.id).unwrap().clone();
    assert_eq!(ptr.zone, child);
    assert_eq!(ptr.name, "10");

    let alias_id = ptr.rfc2317_cname_record.unwrap();
    let alias = fx.store.get(alias_id).unwrap();
    assert_eq!(alias.zone, parent);
    assert_eq!(alias.name, "10");
    assert_eq!(alias.record_type, RecordType::CNAME);
    assert_eq!(alias.value, "10.0-15.2.0.192.in-addr.arpa.");
    assert_eq!(
        alias.ownership,
        Ownership::Managed {
            source: ManagedSource::Rfc2317Delegation(child)
        }
    );
    assert_eq!(fx.store.rfc2317_ptr_records(alias_id), vec![ptr.id]);
}

#[test]
fn test_rfc2317_alias_reused_and_released() {
    let mut fx = Fixture::new(&["2.0.192.in-addr.arpa"]);
    let child = fx.add_rfc2317("0-15.2.0.192.in-addr.arpa", "192.0.2.0/28");

    let (record, _) = fx.create_a("host1", "192.0.2.10");
    let alias_id = fx.ptr_of(record.id).unwrap().rfc2317_cname_record.unwrap();

    // A user PTR at the same name shares the alias
    let (user_ptr, _) = fx.create(child, "10", RecordType::PTR, "other.example.com.");
    assert_eq!(user_ptr.rfc2317_cname_record, Some(alias_id));
    assert_eq!(fx.store.rfc2317_ptr_records(alias_id).len(), 2);

    fx.delete(record.id);
    assert!(fx.store.get(alias_id).is_some(), "alias still serves the user PTR");

    let sync = PtrSynchronizer::new(&fx.zones);
    let mut txn = Txn::new(&mut fx.store);
    txn.remove(user_ptr.id).unwrap();
    assert!(sync.release_alias(&mut txn, alias_id).unwrap());
    txn.commit();
    assert!(fx.store.is_empty());
}

#[test]
fn test_rfc2317_without_parent_zone_has_no_alias() {
    let mut fx = Fixture::new(&[]);
    let child = fx.add_rfc2317("0-15.2.0.192.in-addr.arpa", "192.0.2.0/28");

    let (record, result) = fx.create_a("host1", "192.0.2.10");
    assert_eq!(result.action, PtrAction::Created);
    let ptr = fx.ptr_of(record.id).unwrap();
    assert_eq!(ptr.zone, child);
    assert_eq!(ptr.rfc2317_cname_record, None);
}

#[test]
fn test_rfc2317_parent_not_managed() {
    let mut fx = Fixture::new(&["2.0.192.in-addr.arpa"]);
    fx.zones
        .add(
            ZoneSpec::new("0-15.2.0.192.in-addr.arpa")
                .with_rfc2317_prefix("192.0.2.0/28".parse().unwrap())
                .with_rfc2317_parent_managed(false),
            VIEW,
        )
        .unwrap();

    let (record, _) = fx.create_a("host1", "192.0.2.10");
    assert_eq!(fx.ptr_of(record.id).unwrap().rfc2317_cname_record, None);
    assert_eq!(fx.store.len(), 2);
}

#[test]
fn test_rfc2317_alias_name_occupied() {
    let mut fx = Fixture::new(&["2.0.192.in-addr.arpa"]);
    let parent = fx.zone_id("2.0.192.in-addr.arpa");
    fx.add_rfc2317("0-15.2.0.192.in-addr.arpa", "192.0.2.0/28");
    let (blocker, _) = fx.create(parent, "10", RecordType::TXT, "\"reserved\"");

    let (record, result) = fx.create_a("host1", "192.0.2.10");
    assert_eq!(result.action, PtrAction::Created);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains(&blocker.id.to_string()));
    assert_eq!(fx.ptr_of(record.id).unwrap().rfc2317_cname_record, None);
}

#[test]
fn test_ipv6_ptr() {
    let mut fx = Fixture::new(&["8.b.d.0.1.0.0.2.ip6.arpa"]);
    let (record, result) = fx.create_a_v6("host6", "2001:db8::1");
    assert_eq!(result.action, PtrAction::Created);
    let ptr = fx.ptr_of(record.id).unwrap();
    assert_eq!(
        ptr.name,
        "1.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0"
    );
    assert_eq!(ptr.value, "host6.example.com.");
}

#[test]
fn test_desired_ptr_for_apex_record() {
    let mut fx = Fixture::new(&["2.0.192.in-addr.arpa"]);
    let (record, _) = fx.create_a("@", "192.0.2.1");
    let target = PtrSynchronizer::new(&fx.zones)
        .desired_ptr(&record)
        .unwrap()
        .unwrap();
    assert_eq!(target.value, "example.com.");
    assert_eq!(target.name, "1");
}

#[test]
fn test_sync_report_counts() {
    let report = SyncReport {
        entries: vec![
            SyncEntry {
                record: RecordId(1),
                result: PtrSyncResult::new(PtrAction::Created, Some(RecordId(2))),
            },
            SyncEntry {
                record: RecordId(3),
                result: PtrSyncResult {
                    action: PtrAction::Skipped,
                    ptr_record: None,
                    warnings: vec!["PtrNameCollision: taken".to_string()],
                },
            },
        ],
    };
    assert_eq!(report.changes(), 1);
    assert_eq!(report.warnings().collect::<Vec<_>>(), vec!["PtrNameCollision: taken"]);
}

impl Fixture {
    fn create_a_v6(&mut self, name: &str, value: &str) -> (Record, PtrSyncResult) {
        let forward = self.forward;
        self.create(forward, name, RecordType::AAAA, value)
    }
}
