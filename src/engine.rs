// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The transactional engine: zones, records and PTR synchronization behind
//! one service API.
//!
//! Every mutation runs under the engine's write lock and inside a record
//! [`Txn`]. The forward change, the PTR synchronization it triggers and any
//! RFC 2317 alias changes either all become visible together or, when any
//! step fails, are rolled back together. Readers never observe an address
//! record without its managed PTR record or the other way round.
//!
//! The write lock is also the serialization point for reverse name
//! allocation: of two concurrent creates that map to the same reverse name,
//! the second one sees the first one's PTR record and reports
//! `PtrNameCollision` while its own forward record is still created.
//!
//! IPAM lookups never run under the lock.
//!
//! # Example
//!
//! ```rust
//! use ptrsync::engine::DnsEngine;
//! use ptrsync::model::{RecordSpec, RecordType, ZoneSpec};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> ptrsync::dns_errors::Result<()> {
//! let engine = DnsEngine::default();
//! let forward = engine.create_zone(ZoneSpec::new("example.com")).await?.zone;
//! engine.create_zone(ZoneSpec::new("2.0.192.in-addr.arpa")).await?;
//!
//! let report = engine
//!     .create_record(RecordSpec::new(forward.id, "host1", RecordType::A, "192.0.2.10"))
//!     .await?;
//! let ptr = engine.get_record(report.ptr.unwrap().ptr_record.unwrap()).await.unwrap();
//! assert_eq!(ptr.name, "10");
//! assert_eq!(ptr.value, "host1.example.com.");
//! assert!(ptr.managed());
//! # Ok(())
//! # }
//! ```

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::constants::{APEX_NAME, MAX_TTL_SECS};
use crate::dns_errors::{DnsError, RecordError, Result};
use crate::filter::RecordFilter;
use crate::ipam::{IpamAddress, IpamLinker, IpamSource};
use crate::metrics;
use crate::model::{
    ManagedSource, Ownership, Record, RecordDetail, RecordId, RecordSpec, RecordType,
    RecordUpdate, Zone, ZoneId, ZoneSpec,
};
use crate::names::{normalize_name, relative_name, validate_domain_name};
use crate::ptr_sync::{AddressEvent, PtrAction, PtrSyncResult, PtrSynchronizer, SyncEntry, SyncReport};
use crate::record_store::{RecordStore, Txn};
use crate::rfc2317::{compute_delegation, Rfc2317Delegation};
use crate::zone_registry::ZoneRegistry;

/// Outcome of a record mutation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MutationReport {
    /// The record after the mutation, or the deleted record.
    pub record: Record,
    /// PTR synchronization outcome for A/AAAA records.
    pub ptr: Option<PtrSyncResult>,
    /// Non-fatal problems, e.g. a `PtrNameCollision`.
    pub warnings: Vec<String>,
}

/// Outcome of a zone creation or deletion.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ZoneReport {
    pub zone: Zone,
    /// Records of the zone deleted along with it.
    pub removed_records: Vec<RecordId>,
    /// Resynchronization of the zone's view.
    pub sync: SyncReport,
}

#[derive(Debug, Default)]
struct EngineState {
    zones: ZoneRegistry,
    records: RecordStore,
}

/// The DNS record and reverse-mapping synchronization engine.
#[derive(Debug, Default)]
pub struct DnsEngine {
    state: RwLock<EngineState>,
    config: EngineConfig,
    ipam: Option<IpamLinker>,
}

impl DnsEngine {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            state: RwLock::new(EngineState::default()),
            config,
            ipam: None,
        }
    }

    /// Attaches an IPAM collaborator, bounded by the configured timeout.
    #[must_use]
    pub fn with_ipam(mut self, source: Arc<dyn IpamSource>) -> Self {
        self.ipam = Some(IpamLinker::new(source, self.config.ipam_timeout));
        self
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Zones
    // ------------------------------------------------------------------

    /// Registers a zone and resynchronizes the PTR records of its view.
    ///
    /// # Errors
    ///
    /// Fails with a [`ZoneError`](crate::dns_errors::ZoneError) if the zone
    /// is invalid, exists already or overlaps another RFC 2317 delegation.
    pub async fn create_zone(&self, spec: ZoneSpec) -> Result<ZoneReport> {
        let default_view = self.config.default_view.clone();
        let report = self
            .write("create_zone", |state| state.create_zone(spec, &default_view))
            .await?;
        info!(
            zone = %report.zone.name,
            view = %report.zone.view,
            id = %report.zone.id,
            changes = report.sync.changes(),
            "Created zone"
        );
        Ok(report)
    }

    /// Deletes a zone with all of its records and resynchronizes its view.
    ///
    /// # Errors
    ///
    /// Fails with `ZoneNotFound` if the id is unknown.
    pub async fn delete_zone(&self, id: ZoneId) -> Result<ZoneReport> {
        let report = self
            .write("delete_zone", |state| state.delete_zone(id))
            .await?;
        info!(
            zone = %report.zone.name,
            view = %report.zone.view,
            removed = report.removed_records.len(),
            "Deleted zone"
        );
        Ok(report)
    }

    pub async fn get_zone(&self, id: ZoneId) -> Option<Zone> {
        self.state.read().await.zones.get(id).cloned()
    }

    /// Exact zone lookup; `view` defaults to the configured view.
    pub async fn zone_by_name(&self, view: Option<&str>, name: &str) -> Option<Zone> {
        let view = view.unwrap_or(&self.config.default_view);
        self.state
            .read()
            .await
            .zones
            .get_by_name(view, name)
            .cloned()
    }

    pub async fn zones(&self) -> Vec<Zone> {
        self.state.read().await.zones.iter().cloned().collect()
    }

    /// Longest-suffix zone for `name`; `view` defaults to the configured view.
    ///
    /// # Errors
    ///
    /// Fails with `NoZoneFound` if no zone encloses the name.
    pub async fn resolve_zone(&self, view: Option<&str>, name: &str) -> Result<Zone> {
        let view = view.unwrap_or(&self.config.default_view);
        let state = self.state.read().await;
        Ok(state.zones.resolve_zone(view, name)?.clone())
    }

    /// Reverse zone that holds the PTR record for `address`.
    ///
    /// # Errors
    ///
    /// Fails with `DelegationConflict` if overlapping delegations claim the address.
    pub async fn reverse_zone_for(
        &self,
        view: Option<&str>,
        address: IpAddr,
        prefix_len: u8,
    ) -> Result<Option<Zone>> {
        let view = view.unwrap_or(&self.config.default_view);
        let state = self.state.read().await;
        Ok(state
            .zones
            .reverse_zone_for(view, address, prefix_len)?
            .cloned())
    }

    /// RFC 2317 delegation names for `address`, following the naming
    /// convention of the existing RFC 2317 zones.
    pub async fn delegation_for(
        &self,
        address: Ipv4Addr,
        prefix_len: u8,
    ) -> Option<Rfc2317Delegation> {
        let naming = self
            .state
            .read()
            .await
            .zones
            .rfc2317_naming(self.config.rfc2317_naming);
        compute_delegation(address, prefix_len, naming)
    }

    // ------------------------------------------------------------------
    // Records
    // ------------------------------------------------------------------

    /// Creates a user-owned record and synchronizes its PTR record.
    ///
    /// # Errors
    ///
    /// Fails on unknown zones, invalid data, duplicates and CNAME conflicts.
    /// Nothing is stored when an error is returned.
    pub async fn create_record(&self, spec: RecordSpec) -> Result<MutationReport> {
        let report = self
            .write("create_record", |state| state.create_record(spec))
            .await?;
        Self::log_mutation("create", &report);
        Ok(report)
    }

    /// Applies a partial update to a user-owned record.
    ///
    /// # Errors
    ///
    /// Fails with `ManagedRecordImmutable` for managed records, otherwise as
    /// [`create_record`](Self::create_record).
    pub async fn update_record(&self, id: RecordId, update: RecordUpdate) -> Result<MutationReport> {
        let report = self
            .write("update_record", |state| state.update_record(id, update))
            .await?;
        Self::log_mutation("update", &report);
        Ok(report)
    }

    /// Deletes a user-owned record together with its managed PTR record.
    ///
    /// # Errors
    ///
    /// Fails with `RecordNotFound` or `ManagedRecordImmutable`.
    pub async fn delete_record(&self, id: RecordId) -> Result<MutationReport> {
        let report = self
            .write("delete_record", |state| state.delete_record(id))
            .await?;
        Self::log_mutation("delete", &report);
        Ok(report)
    }

    /// Re-runs synchronization for every record. Idempotent.
    ///
    /// # Errors
    ///
    /// Fails only on conflicting RFC 2317 delegations; nothing is changed then.
    pub async fn resync(&self) -> Result<SyncReport> {
        let report = self
            .write("resync", |state| {
                let mut txn = Txn::new(&mut state.records);
                let report = resync_records(&state.zones, &mut txn, None)?;
                txn.commit();
                Ok(report)
            })
            .await?;
        info!(
            records = report.entries.len(),
            changes = report.changes(),
            "Resynchronized PTR records"
        );
        Ok(report)
    }

    pub async fn get_record(&self, id: RecordId) -> Option<Record> {
        self.state.read().await.records.get(id).cloned()
    }

    /// The record with all of its references resolved.
    pub async fn record_detail(&self, id: RecordId) -> Option<RecordDetail> {
        self.state.read().await.detail(id)
    }

    /// Records of `record_type` at `name` in `zone`. Absolute names are accepted.
    pub async fn find_records(&self, zone: ZoneId, name: &str, record_type: RecordType) -> Vec<Record> {
        let state = self.state.read().await;
        let Some(zone) = state.zones.get(zone) else {
            return Vec::new();
        };
        let Ok(name) = relative_name(name, &zone.name) else {
            return Vec::new();
        };
        state
            .records
            .find(zone.id, &name, record_type)
            .cloned()
            .collect()
    }

    /// All records, ordered by id.
    pub async fn records(&self) -> Vec<Record> {
        self.state.read().await.records.iter().cloned().collect()
    }

    /// Records matching `filter`, ordered by id.
    pub async fn filter_records(&self, filter: &RecordFilter) -> Vec<Record> {
        let state = self.state.read().await;
        state
            .records
            .iter()
            .filter(|record| {
                state
                    .zones
                    .get(record.zone)
                    .is_some_and(|zone| filter.matches(record, zone, &state.records))
            })
            .cloned()
            .collect()
    }

    /// Resolves the record's IPAM link. Degrades to `None` on any failure.
    pub async fn ipam_address(&self, id: RecordId) -> Option<IpamAddress> {
        let linker = self.ipam.as_ref()?;
        let record = self.get_record(id).await?;
        linker.lookup(&record).await
    }

    /// Resolves the IPAM links of `records` concurrently, in input order.
    pub async fn ipam_addresses(&self, records: &[Record]) -> Vec<Option<IpamAddress>> {
        match &self.ipam {
            Some(linker) => linker.lookup_many(records).await,
            None => vec![None; records.len()],
        }
    }

    async fn write<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut EngineState) -> Result<T>,
    ) -> Result<T> {
        let mut state = self.state.write().await;
        let started = Instant::now();
        let result = f(&mut *state);
        metrics::record_transaction(operation, started.elapsed());
        if let Err(e) = &result {
            warn!(operation, reason = e.reason(), "{e}");
            metrics::record_error(e.reason());
        }
        result
    }

    fn log_mutation(operation: &'static str, report: &MutationReport) {
        let record = &report.record;
        metrics::record_mutation(operation, &record.record_type.to_string());
        info!(
            operation,
            record = %record.id,
            name = %record.name,
            r#type = %record.record_type,
            value = %record.value,
            ptr = ?report.ptr.as_ref().map(|p| p.action),
            "Record mutation committed"
        );
        for warning in &report.warnings {
            warn!(record = %record.id, "{warning}");
        }
    }
}

impl EngineState {
    fn create_zone(&mut self, spec: ZoneSpec, default_view: &str) -> Result<ZoneReport> {
        let saved = self.zones.clone();
        let zone = self.zones.add(spec, default_view)?.clone();

        let mut txn = Txn::new(&mut self.records);
        match resync_records(&self.zones, &mut txn, Some(&zone.view)) {
            Ok(sync) => {
                txn.commit();
                Ok(ZoneReport {
                    zone,
                    removed_records: Vec::new(),
                    sync,
                })
            }
            Err(e) => {
                drop(txn);
                self.zones = saved;
                Err(e)
            }
        }
    }

    fn delete_zone(&mut self, id: ZoneId) -> Result<ZoneReport> {
        let saved = self.zones.clone();
        let zone = self.zones.require(id)?.clone();

        let mut txn = Txn::new(&mut self.records);
        let result = (|| {
            let removed_records = remove_zone_records(&self.zones, &mut txn, id)?;
            self.zones.remove(id)?;
            let sync = resync_records(&self.zones, &mut txn, Some(&zone.view))?;
            Ok::<_, DnsError>((removed_records, sync))
        })();

        match result {
            Ok((removed_records, sync)) => {
                txn.commit();
                Ok(ZoneReport {
                    zone,
                    removed_records,
                    sync,
                })
            }
            Err(e) => {
                drop(txn);
                self.zones = saved;
                Err(e)
            }
        }
    }

    fn create_record(&mut self, spec: RecordSpec) -> Result<MutationReport> {
        let zone = self.zones.require(spec.zone)?;
        let (name, value) = validate_record(zone, &spec.name, spec.record_type, &spec.value, spec.ttl)?;

        let mut txn = Txn::new(&mut self.records);
        check_conflicts(&txn, zone, &name, spec.record_type, &value, None)?;

        let now = Utc::now();
        let id = txn.allocate_id();
        let record = Record {
            id,
            zone: zone.id,
            name,
            record_type: spec.record_type,
            value,
            ttl: spec.ttl,
            status: spec.status,
            ownership: Ownership::UserOwned,
            disable_ptr: spec.disable_ptr,
            description: spec.description,
            rfc2317_cname_record: None,
            ipam_ip_address: spec.ipam_ip_address,
            warnings: Vec::new(),
            created: now,
            last_updated: now,
        };
        txn.insert(record.clone());

        let sync = PtrSynchronizer::new(&self.zones);
        evict_managed_ptrs(&sync, &mut txn, &record)?;
        let ptr = sync_after_write(&sync, &mut txn, &record, AddressEvent::Created)?;
        finish(txn, id, ptr)
    }

    fn update_record(&mut self, id: RecordId, update: RecordUpdate) -> Result<MutationReport> {
        let current = self.records.require(id)?.clone();
        self.ensure_user_owned(&current)?;

        let zone = self.zones.require(update.zone.unwrap_or(current.zone))?;
        let raw_name = update.name.unwrap_or_else(|| current.name.clone());
        let raw_value = update.value.unwrap_or_else(|| current.value.clone());
        let ttl = update.ttl.unwrap_or(current.ttl);
        let (name, value) = validate_record(zone, &raw_name, current.record_type, &raw_value, ttl)?;

        let mut txn = Txn::new(&mut self.records);
        check_conflicts(&txn, zone, &name, current.record_type, &value, Some(id))?;

        let value_changed = value != current.value;
        let mut updated = current.clone();
        updated.zone = zone.id;
        updated.name = name;
        updated.value = value;
        updated.ttl = ttl;
        if let Some(status) = update.status {
            updated.status = status;
        }
        if let Some(disable_ptr) = update.disable_ptr {
            updated.disable_ptr = disable_ptr;
        }
        if let Some(description) = update.description {
            updated.description = description;
        }
        if let Some(ipam) = update.ipam_ip_address {
            updated.ipam_ip_address = ipam;
        }
        updated.last_updated = Utc::now();
        txn.replace(updated.clone())?;

        let sync = PtrSynchronizer::new(&self.zones);
        evict_managed_ptrs(&sync, &mut txn, &updated)?;
        let ptr = sync_after_write(
            &sync,
            &mut txn,
            &updated,
            AddressEvent::Updated { value_changed },
        )?;
        if updated.record_type == RecordType::CNAME {
            relink_alias_consumers(&sync, &mut txn, id)?;
        }
        for view in affected_views(&self.zones, &[current.zone, updated.zone]) {
            retry_blocked(&self.zones, &sync, &mut txn, &view, Some(id))?;
        }
        finish(txn, id, ptr)
    }

    fn delete_record(&mut self, id: RecordId) -> Result<MutationReport> {
        let current = self.records.require(id)?.clone();
        self.ensure_user_owned(&current)?;

        let mut txn = Txn::new(&mut self.records);
        let record = txn.remove(id)?;
        let sync = PtrSynchronizer::new(&self.zones);

        let ptr = if record.is_address_record() {
            Some(sync.handle(&mut txn, &record, AddressEvent::Deleted)?)
        } else {
            None
        };
        if let Some(alias) = record.rfc2317_cname_record {
            sync.release_alias(&mut txn, alias)?;
        }
        if record.record_type == RecordType::CNAME {
            relink_alias_consumers(&sync, &mut txn, id)?;
        }
        for view in affected_views(&self.zones, &[record.zone]) {
            retry_blocked(&self.zones, &sync, &mut txn, &view, None)?;
        }
        txn.commit();

        Ok(MutationReport {
            record,
            ptr,
            warnings: Vec::new(),
        })
    }

    fn ensure_user_owned(&self, record: &Record) -> Result<()> {
        if !record.managed() {
            return Ok(());
        }
        let zone = self
            .zones
            .get(record.zone)
            .map(|zone| zone.name.clone())
            .unwrap_or_default();
        Err(RecordError::ManagedRecordImmutable {
            id: record.id,
            name: record.name.clone(),
            zone,
        }
        .into())
    }

    fn detail(&self, id: RecordId) -> Option<RecordDetail> {
        let record = self.records.get(id)?.clone();
        let zone = self.zones.get(record.zone)?;
        Some(RecordDetail {
            zone_name: zone.name.clone(),
            view: zone.view.clone(),
            fqdn: record.fqdn(zone),
            ptr_record: self.records.ptr_record(id),
            address_record: record.address_record(),
            rfc2317_cname_record: record.rfc2317_cname_record,
            rfc2317_ptr_records: self.records.rfc2317_ptr_records(id),
            ipam_ip_address: record.ipam_ip_address,
            record,
        })
    }
}

/// Runs the synchronization a user record write requires.
fn sync_after_write(
    sync: &PtrSynchronizer<'_>,
    txn: &mut Txn<'_>,
    record: &Record,
    event: AddressEvent,
) -> Result<Option<PtrSyncResult>> {
    if record.is_address_record() {
        return sync.handle(txn, record, event).map(Some);
    }
    if record.record_type == RecordType::PTR {
        sync.sync_user_ptr(txn, record.id)?;
    }
    Ok(None)
}

fn finish(txn: Txn<'_>, id: RecordId, ptr: Option<PtrSyncResult>) -> Result<MutationReport> {
    let record = txn.require(id)?.clone();
    txn.commit();
    Ok(MutationReport {
        warnings: record.warnings.clone(),
        record,
        ptr,
    })
}

/// Re-links the PTR records served by a CNAME that was changed or deleted.
fn relink_alias_consumers(
    sync: &PtrSynchronizer<'_>,
    txn: &mut Txn<'_>,
    alias: RecordId,
) -> Result<()> {
    for consumer in txn.rfc2317_ptr_records(alias) {
        let Some(ptr) = txn.get(consumer).cloned() else {
            continue;
        };
        match ptr.address_record() {
            Some(source) => {
                if let Some(record) = txn.get(source).cloned() {
                    sync.handle(txn, &record, AddressEvent::Updated { value_changed: false })?;
                }
            }
            None => {
                sync.sync_user_ptr(txn, consumer)?;
            }
        }
    }
    Ok(())
}

/// True for the managed PTR record of an address record.
fn is_managed_ptr(record: &Record) -> bool {
    matches!(
        record.ownership,
        Ownership::Managed {
            source: ManagedSource::AddressRecord(_)
        }
    )
}

/// Removes the managed PTR records at the owner name of a user PTR or CNAME
/// record. Their address records are resynchronized and report the collision.
fn evict_managed_ptrs(
    sync: &PtrSynchronizer<'_>,
    txn: &mut Txn<'_>,
    record: &Record,
) -> Result<()> {
    if !matches!(record.record_type, RecordType::PTR | RecordType::CNAME) {
        return Ok(());
    }
    let evicted: Vec<Record> = txn
        .at_name(record.zone, &record.name)
        .filter(|&other| other.id != record.id && is_managed_ptr(other))
        .cloned()
        .collect();
    for ptr in evicted {
        info!(ptr = %ptr.id, record = %record.id, name = %ptr.name, "Evicting managed PTR record");
        sync.remove_managed_ptr(txn, &ptr)?;
        let Some(address) = ptr.address_record().and_then(|id| txn.get(id)).cloned() else {
            continue;
        };
        sync.handle(txn, &address, AddressEvent::Updated { value_changed: false })?;
    }
    Ok(())
}

/// Distinct views of `zones_of`, skipping unknown zones.
fn affected_views(zones: &ZoneRegistry, zones_of: &[ZoneId]) -> Vec<String> {
    let mut views: Vec<String> = Vec::new();
    for view in zones_of.iter().filter_map(|id| zones.get(*id)).map(|zone| &zone.view) {
        if !views.contains(view) {
            views.push(view.clone());
        }
    }
    views
}

/// Re-runs synchronization for the user records of `view` that carry
/// warnings. A mutation that frees a reverse name or an alias name lets the
/// records it blocked claim it.
fn retry_blocked(
    zones: &ZoneRegistry,
    sync: &PtrSynchronizer<'_>,
    txn: &mut Txn<'_>,
    view: &str,
    skip: Option<RecordId>,
) -> Result<()> {
    let blocked: Vec<RecordId> = txn
        .iter()
        .filter(|&r| Some(r.id) != skip && !r.managed() && !r.warnings.is_empty())
        .filter(|&r| zones.get(r.zone).is_some_and(|zone| zone.view == view))
        .map(|r| r.id)
        .collect();
    for id in blocked {
        let Some(record) = txn.get(id).cloned() else {
            continue;
        };
        if record.is_address_record() {
            let result = sync.handle(txn, &record, AddressEvent::Updated { value_changed: false })?;
            debug!(record = %id, action = %result.action, "Retried blocked PTR record");
        } else if record.record_type == RecordType::PTR {
            sync.sync_user_ptr(txn, id)?;
        }
    }
    Ok(())
}

/// Deletes every record of a zone, cascading to managed records elsewhere.
fn remove_zone_records(
    zones: &ZoneRegistry,
    txn: &mut Txn<'_>,
    zone: ZoneId,
) -> Result<Vec<RecordId>> {
    let sync = PtrSynchronizer::new(zones);
    let ids: Vec<RecordId> = txn.in_zone(zone).map(|record| record.id).collect();
    let mut removed = Vec::with_capacity(ids.len());

    for id in ids {
        let Some(record) = txn.get(id).cloned() else {
            continue;
        };
        match record.ownership {
            Ownership::Managed {
                source: ManagedSource::AddressRecord(_),
            } => sync.remove_managed_ptr(txn, &record)?,
            Ownership::Managed {
                source: ManagedSource::Rfc2317Delegation(_),
            } => {
                txn.remove(id)?;
            }
            Ownership::UserOwned => {
                txn.remove(id)?;
                if record.is_address_record() {
                    sync.handle(txn, &record, AddressEvent::Deleted)?;
                }
                if let Some(alias) = record.rfc2317_cname_record {
                    sync.release_alias(txn, alias)?;
                }
            }
        }
        removed.push(id);
    }
    Ok(removed)
}

/// Reconciles every user record of `view` (all views if `None`) and sweeps
/// managed records left without a source.
fn resync_records(
    zones: &ZoneRegistry,
    txn: &mut Txn<'_>,
    view: Option<&str>,
) -> Result<SyncReport> {
    let sync = PtrSynchronizer::new(zones);
    let in_scope = |record: &Record| {
        zones
            .get(record.zone)
            .is_some_and(|zone| view.map_or(true, |view| zone.view == view))
    };
    let address_records: Vec<RecordId> = txn
        .iter()
        .filter(|&r| !r.managed() && r.is_address_record() && in_scope(r))
        .map(|r| r.id)
        .collect();
    let user_ptrs: Vec<RecordId> = txn
        .iter()
        .filter(|&r| !r.managed() && r.record_type == RecordType::PTR && in_scope(r))
        .map(|r| r.id)
        .collect();

    let mut report = SyncReport::default();
    for id in address_records {
        let Some(record) = txn.get(id).cloned() else {
            continue;
        };
        let result = sync.handle(txn, &record, AddressEvent::Updated { value_changed: false })?;
        report.entries.push(SyncEntry { record: id, result });
    }
    for id in user_ptrs {
        let warnings = sync.sync_user_ptr(txn, id)?;
        if !warnings.is_empty() {
            report.entries.push(SyncEntry {
                record: id,
                result: PtrSyncResult {
                    action: PtrAction::NotApplicable,
                    ptr_record: None,
                    warnings,
                },
            });
        }
    }

    let orphans: Vec<Record> = txn
        .iter()
        .filter(|r| match r.ownership {
            Ownership::Managed {
                source: ManagedSource::AddressRecord(source),
            } => txn.get(source).is_none(),
            _ => false,
        })
        .cloned()
        .collect();
    for ptr in orphans {
        debug!(ptr = %ptr.id, "Removing managed PTR record without address record");
        sync.remove_managed_ptr(txn, &ptr)?;
    }
    let aliases: Vec<RecordId> = txn
        .iter()
        .filter(|r| {
            matches!(
                r.ownership,
                Ownership::Managed {
                    source: ManagedSource::Rfc2317Delegation(_)
                }
            )
        })
        .map(|r| r.id)
        .collect();
    for alias in aliases {
        sync.release_alias(txn, alias)?;
    }

    Ok(report)
}

/// Validates user input for a record and returns its stored name and value.
fn validate_record(
    zone: &Zone,
    raw_name: &str,
    record_type: RecordType,
    raw_value: &str,
    ttl: Option<u32>,
) -> Result<(String, String), RecordError> {
    let invalid = |reason: String| RecordError::InvalidRecordData {
        name: raw_name.to_string(),
        zone: zone.name.clone(),
        reason,
    };

    let name = relative_name(raw_name, &zone.name).map_err(invalid)?;
    if let Some(ttl) = ttl.filter(|ttl| *ttl > MAX_TTL_SECS) {
        return Err(invalid(format!("TTL {ttl} exceeds {MAX_TTL_SECS}")));
    }

    let trimmed = raw_value.trim();
    let value = match record_type {
        RecordType::A => trimmed
            .parse::<Ipv4Addr>()
            .map(|address| address.to_string())
            .map_err(|_| invalid(format!("'{trimmed}' is not an IPv4 address")))?,
        RecordType::AAAA => trimmed
            .parse::<Ipv6Addr>()
            .map(|address| address.to_string())
            .map_err(|_| invalid(format!("'{trimmed}' is not an IPv6 address")))?,
        RecordType::CNAME | RecordType::PTR | RecordType::NS => {
            let target = normalize_name(trimmed);
            validate_domain_name(&target).map_err(invalid)?;
            format!("{target}.")
        }
        RecordType::SOA => return Err(invalid("SOA records are maintained by the zone".to_string())),
        _ if trimmed.is_empty() => return Err(invalid("value is empty".to_string())),
        _ => trimmed.to_string(),
    };

    if record_type == RecordType::CNAME && name == APEX_NAME {
        return Err(invalid("CNAME is not allowed at the zone apex".to_string()));
    }
    Ok((name, value))
}

/// Enforces uniqueness and the CNAME exclusivity rule at an owner name.
///
/// Managed PTR records do not block user PTR or CNAME records; they are
/// evicted once the user record is stored.
fn check_conflicts(
    store: &RecordStore,
    zone: &Zone,
    name: &str,
    record_type: RecordType,
    value: &str,
    exclude: Option<RecordId>,
) -> Result<(), RecordError> {
    let yields = |other: &Record| {
        matches!(record_type, RecordType::PTR | RecordType::CNAME) && is_managed_ptr(other)
    };
    for other in store
        .at_name(zone.id, name)
        .filter(|&r| Some(r.id) != exclude && !yields(r))
    {
        if other.record_type == record_type && other.value.eq_ignore_ascii_case(value) {
            return Err(RecordError::DuplicateRecord {
                name: name.to_string(),
                zone: zone.name.clone(),
                record_type: record_type.to_string(),
                value: value.to_string(),
            });
        }
        if record_type == RecordType::CNAME || other.record_type == RecordType::CNAME {
            return Err(RecordError::CnameConflict {
                name: name.to_string(),
                zone: zone.name.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod engine_tests;
