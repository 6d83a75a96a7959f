// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! PTR synchronization for A/AAAA records.
//!
//! Every active A/AAAA record with `disable_ptr = false` whose address falls
//! into a known reverse zone owns exactly one managed PTR record. The
//! synchronizer keeps that PTR record, and the RFC 2317 CNAME alias serving
//! it, in step with the address record.
//!
//! # State machine
//!
//! | Event                         | Effect                                        |
//! |-------------------------------|-----------------------------------------------|
//! | created                       | create the PTR record (and alias)             |
//! | updated, value changed        | delete the PTR record, then create it again   |
//! | updated, `disable_ptr` set    | delete the PTR record                         |
//! | updated, `disable_ptr` clear  | create the PTR record                         |
//! | updated, status or TTL        | refresh or delete the PTR record              |
//! | deleted                       | delete the PTR record and any orphaned alias  |
//!
//! All other updates reconcile the existing PTR record against the computed
//! target: same zone and name means refresh in place (or nothing at all when
//! nothing changed), a different target means delete and create.
//!
//! A managed PTR record is never written over existing data. If a PTR or
//! CNAME record already occupies the reverse name, generation is skipped and
//! a `PtrNameCollision` warning is returned for the forward record.
//!
//! The synchronizer works on a [`Txn`], so every change it makes is rolled
//! back together with the forward mutation that triggered it.

use std::fmt;
use std::net::IpAddr;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::dns_errors::{RecordError, Result, ZoneError};
use crate::metrics;
use crate::model::{
    ManagedSource, Ownership, Record, RecordId, RecordStatus, RecordType, Zone, ZoneId,
};
use crate::names::normalize_name;
use crate::record_store::Txn;
use crate::rfc2317::reverse_name_for;
use crate::status_reasons::format_warning;
use crate::zone_registry::ZoneRegistry;

/// What happened to the managed PTR record of an address record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PtrAction {
    Created,
    Updated,
    /// Deleted and created again in a different place.
    Recreated,
    Removed,
    Unchanged,
    /// No PTR record is wanted, or generation was prevented by a collision.
    Skipped,
    /// The record is not an A/AAAA record.
    NotApplicable,
}

impl PtrAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Recreated => "recreated",
            Self::Removed => "removed",
            Self::Unchanged => "unchanged",
            Self::Skipped => "skipped",
            Self::NotApplicable => "not_applicable",
        }
    }

    /// True if the store was changed.
    #[must_use]
    pub fn is_change(self) -> bool {
        matches!(
            self,
            Self::Created | Self::Updated | Self::Recreated | Self::Removed
        )
    }
}

impl fmt::Display for PtrAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of synchronizing one address record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PtrSyncResult {
    pub action: PtrAction,
    /// The managed PTR record after synchronization.
    pub ptr_record: Option<RecordId>,
    pub warnings: Vec<String>,
}

impl PtrSyncResult {
    fn new(action: PtrAction, ptr_record: Option<RecordId>) -> Self {
        Self {
            action,
            ptr_record,
            warnings: Vec::new(),
        }
    }
}

/// A change to an address record that requires synchronization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressEvent {
    Created,
    Updated { value_changed: bool },
    Deleted,
}

/// Where the managed PTR record of an address record belongs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PtrTarget {
    pub zone: ZoneId,
    pub zone_name: String,
    /// Name relative to the reverse zone.
    pub name: String,
    /// Absolute owner name of the address record, with the trailing dot.
    pub value: String,
    pub ttl: Option<u32>,
}

/// Result of a full or per-view resynchronization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub entries: Vec<SyncEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SyncEntry {
    pub record: RecordId,
    #[serde(flatten)]
    pub result: PtrSyncResult,
}

impl SyncReport {
    /// Number of entries that changed the store.
    #[must_use]
    pub fn changes(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.result.action.is_change())
            .count()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .flat_map(|entry| entry.result.warnings.iter().map(String::as_str))
    }
}

/// Computes and applies managed PTR records against a zone registry snapshot.
#[derive(Clone, Copy, Debug)]
pub struct PtrSynchronizer<'a> {
    zones: &'a ZoneRegistry,
}

impl<'a> PtrSynchronizer<'a> {
    #[must_use]
    pub fn new(zones: &'a ZoneRegistry) -> Self {
        Self { zones }
    }

    /// Computes where the PTR record of `record` belongs.
    ///
    /// Returns `None` when no PTR record is wanted: the record is not an
    /// active A/AAAA record, `disable_ptr` is set, either zone is inactive,
    /// or no reverse zone covers the address.
    ///
    /// # Errors
    ///
    /// Fails if the forward zone is unknown or the address is claimed by
    /// overlapping RFC 2317 delegations.
    pub fn desired_ptr(&self, record: &Record) -> Result<Option<PtrTarget>, ZoneError> {
        if !record.is_address_record()
            || record.disable_ptr
            || record.status != RecordStatus::Active
        {
            return Ok(None);
        }
        let zone = self.zones.require(record.zone)?;
        if !zone.is_active() {
            return Ok(None);
        }
        let Some(address) = record.ip_address() else {
            return Ok(None);
        };
        let prefix_len = match address {
            IpAddr::V4(_) => crate::constants::IPV4_MAX_PREFIX_LEN,
            IpAddr::V6(_) => crate::constants::IPV6_MAX_PREFIX_LEN,
        };
        let Some(reverse) = self.zones.reverse_zone_for(&zone.view, address, prefix_len)? else {
            debug!(record = %record.id, address = %address, view = %zone.view, "No reverse zone for address");
            return Ok(None);
        };
        if !reverse.is_active() {
            debug!(record = %record.id, zone = %reverse.name, "Reverse zone is not active");
            return Ok(None);
        }
        let Some(name) = reverse_name_for(address, reverse) else {
            return Ok(None);
        };
        Ok(Some(PtrTarget {
            zone: reverse.id,
            zone_name: reverse.name.clone(),
            name,
            value: record.fqdn(zone),
            ttl: record.ttl,
        }))
    }

    /// Runs the state machine for one address record event.
    ///
    /// For [`AddressEvent::Deleted`] `record` is the snapshot of the removed
    /// record; otherwise it must be the current version in the store. The
    /// resulting warnings replace the forward record's `warnings`.
    ///
    /// # Errors
    ///
    /// Fails on unknown zones or conflicting RFC 2317 delegations. Name
    /// collisions are reported as warnings, not errors.
    pub fn handle(
        &self,
        txn: &mut Txn<'_>,
        record: &Record,
        event: AddressEvent,
    ) -> Result<PtrSyncResult> {
        if !record.is_address_record() {
            return Ok(PtrSyncResult::new(PtrAction::NotApplicable, None));
        }

        let existing = txn
            .ptr_record(record.id)
            .and_then(|id| txn.get(id))
            .cloned();

        let result = match event {
            AddressEvent::Deleted => match existing {
                Some(ptr) => {
                    self.remove_managed_ptr(txn, &ptr)?;
                    PtrSyncResult::new(PtrAction::Removed, None)
                }
                None => PtrSyncResult::new(PtrAction::Skipped, None),
            },
            AddressEvent::Updated {
                value_changed: true,
            } if existing.is_some() => {
                if let Some(ptr) = &existing {
                    self.remove_managed_ptr(txn, ptr)?;
                }
                let mut result = self.reconcile(txn, record)?;
                result.action = match result.action {
                    PtrAction::Created => PtrAction::Recreated,
                    _ => PtrAction::Removed,
                };
                result
            }
            _ => self.reconcile(txn, record)?,
        };

        if event != AddressEvent::Deleted {
            store_warnings(txn, record.id, &result.warnings)?;
        }
        metrics::record_ptr_sync(result.action.as_str());
        Ok(result)
    }

    /// Brings the managed PTR record of `record` in line with its target.
    ///
    /// Running this twice in a row yields [`PtrAction::Unchanged`] the second time.
    ///
    /// # Errors
    ///
    /// See [`handle`](Self::handle).
    pub fn reconcile(&self, txn: &mut Txn<'_>, record: &Record) -> Result<PtrSyncResult> {
        let existing = txn
            .ptr_record(record.id)
            .and_then(|id| txn.get(id))
            .cloned();

        let Some(target) = self.desired_ptr(record)? else {
            return Ok(match existing {
                Some(ptr) => {
                    self.remove_managed_ptr(txn, &ptr)?;
                    PtrSyncResult::new(PtrAction::Removed, None)
                }
                None => PtrSyncResult::new(PtrAction::Skipped, None),
            });
        };

        match existing {
            Some(ptr) if ptr.zone == target.zone && ptr.name == target.name => {
                self.refresh_ptr(txn, ptr, &target)
            }
            Some(ptr) => {
                self.remove_managed_ptr(txn, &ptr)?;
                let mut result = self.create_ptr(txn, record, &target)?;
                if result.action == PtrAction::Created {
                    result.action = PtrAction::Recreated;
                } else {
                    result.action = PtrAction::Removed;
                }
                Ok(result)
            }
            None => self.create_ptr(txn, record, &target),
        }
    }

    fn create_ptr(
        &self,
        txn: &mut Txn<'_>,
        record: &Record,
        target: &PtrTarget,
    ) -> Result<PtrSyncResult> {
        let occupant = txn
            .at_name(target.zone, &target.name)
            .find(|r| matches!(r.record_type, RecordType::PTR | RecordType::CNAME))
            .map(|r| r.id);
        if let Some(existing) = occupant {
            let err = RecordError::PtrNameCollision {
                name: target.name.clone(),
                zone: target.zone_name.clone(),
                existing,
            };
            warn!(record = %record.id, error = %err, "Skipping PTR record generation");
            metrics::record_error(err.reason());
            let mut result = PtrSyncResult::new(PtrAction::Skipped, None);
            result.warnings.push(format_warning(err.reason(), &err.to_string()));
            return Ok(result);
        }

        let zone = self.zones.require(target.zone)?;
        let (alias, warnings) = self.ensure_alias(txn, zone, &target.name, target.ttl)?;

        let now = Utc::now();
        let id = txn.allocate_id();
        txn.insert(Record {
            id,
            zone: target.zone,
            name: target.name.clone(),
            record_type: RecordType::PTR,
            value: target.value.clone(),
            ttl: target.ttl,
            status: RecordStatus::Active,
            ownership: Ownership::Managed {
                source: ManagedSource::AddressRecord(record.id),
            },
            disable_ptr: false,
            description: String::new(),
            rfc2317_cname_record: alias,
            ipam_ip_address: None,
            warnings: Vec::new(),
            created: now,
            last_updated: now,
        });
        info!(
            record = %record.id,
            ptr = %id,
            name = %target.name,
            zone = %target.zone_name,
            value = %target.value,
            "Created managed PTR record"
        );

        Ok(PtrSyncResult {
            action: PtrAction::Created,
            ptr_record: Some(id),
            warnings,
        })
    }

    fn refresh_ptr(
        &self,
        txn: &mut Txn<'_>,
        ptr: Record,
        target: &PtrTarget,
    ) -> Result<PtrSyncResult> {
        let zone = self.zones.require(target.zone)?;
        let (alias, warnings) = self.ensure_alias(txn, zone, &target.name, target.ttl)?;

        if ptr.value == target.value && ptr.ttl == target.ttl && ptr.rfc2317_cname_record == alias {
            debug!(ptr = %ptr.id, zone = %target.zone_name, "Managed PTR record is up to date");
            let mut result = PtrSyncResult::new(PtrAction::Unchanged, Some(ptr.id));
            result.warnings = warnings;
            return Ok(result);
        }

        let previous_alias = ptr.rfc2317_cname_record;
        let mut updated = ptr;
        updated.value = target.value.clone();
        updated.ttl = target.ttl;
        updated.rfc2317_cname_record = alias;
        updated.last_updated = Utc::now();
        let id = updated.id;
        txn.replace(updated)?;
        if let Some(old) = previous_alias.filter(|old| Some(*old) != alias) {
            self.release_alias(txn, old)?;
        }
        info!(ptr = %id, zone = %target.zone_name, value = %target.value, "Updated managed PTR record");

        Ok(PtrSyncResult {
            action: PtrAction::Updated,
            ptr_record: Some(id),
            warnings,
        })
    }

    /// Deletes a managed PTR record and releases its RFC 2317 alias.
    ///
    /// # Errors
    ///
    /// Fails if the record is no longer in the store.
    pub fn remove_managed_ptr(&self, txn: &mut Txn<'_>, ptr: &Record) -> Result<()> {
        txn.remove(ptr.id)?;
        info!(ptr = %ptr.id, name = %ptr.name, "Removed managed PTR record");
        if let Some(alias) = ptr.rfc2317_cname_record {
            self.release_alias(txn, alias)?;
        }
        Ok(())
    }

    /// Finds or creates the parent-zone CNAME alias for a PTR record at
    /// `ptr_name` inside the RFC 2317 zone `zone`.
    ///
    /// Returns the alias (if any) and warnings. Nothing is done for zones
    /// that are not RFC 2317 delegations, that do not manage their parent
    /// aliases, or whose parent full-octet zone is missing or inactive.
    ///
    /// # Errors
    ///
    /// Fails only if the store rejects the write.
    pub fn ensure_alias(
        &self,
        txn: &mut Txn<'_>,
        zone: &Zone,
        ptr_name: &str,
        ttl: Option<u32>,
    ) -> Result<(Option<RecordId>, Vec<String>)> {
        let Some(prefix) = zone.rfc2317_prefix.filter(|_| zone.rfc2317_parent_managed) else {
            return Ok((None, Vec::new()));
        };
        let Some(address) = prefix.address_for_label(ptr_name) else {
            return Ok((None, Vec::new()));
        };
        let Some(parent) = self
            .zones
            .rfc2317_parent_zone(&zone.view, address)
            .filter(|parent| parent.is_active())
        else {
            debug!(zone = %zone.name, address = %address, "No active parent zone for RFC2317 alias");
            return Ok((None, Vec::new()));
        };
        let Some(alias_name) = reverse_name_for(IpAddr::V4(address), parent) else {
            return Ok((None, Vec::new()));
        };
        let alias_target = format!("{ptr_name}.{}.", zone.name);

        let reusable = txn
            .at_name(parent.id, &alias_name)
            .find(|r| {
                r.record_type == RecordType::CNAME
                    && normalize_name(&r.value) == normalize_name(&alias_target)
            })
            .cloned();
        if let Some(cname) = reusable {
            let id = cname.id;
            // Managed aliases follow the TTL of the PTR record they serve.
            if cname.managed() && cname.ttl != ttl {
                let mut updated = cname;
                updated.ttl = ttl;
                updated.last_updated = Utc::now();
                txn.replace(updated)?;
                debug!(alias = %id, ttl = ?ttl, "Updated RFC2317 alias TTL");
            }
            return Ok((Some(id), Vec::new()));
        }
        if let Some(occupant) = txn.at_name(parent.id, &alias_name).next().map(|r| r.id) {
            let err = RecordError::PtrNameCollision {
                name: alias_name,
                zone: parent.name.clone(),
                existing: occupant,
            };
            warn!(zone = %zone.name, error = %err, "Cannot create RFC2317 alias");
            metrics::record_error(err.reason());
            return Ok((None, vec![format_warning(err.reason(), &err.to_string())]));
        }

        let now = Utc::now();
        let id = txn.allocate_id();
        txn.insert(Record {
            id,
            zone: parent.id,
            name: alias_name.clone(),
            record_type: RecordType::CNAME,
            value: alias_target.clone(),
            ttl,
            status: RecordStatus::Active,
            ownership: Ownership::Managed {
                source: ManagedSource::Rfc2317Delegation(zone.id),
            },
            disable_ptr: false,
            description: String::new(),
            rfc2317_cname_record: None,
            ipam_ip_address: None,
            warnings: Vec::new(),
            created: now,
            last_updated: now,
        });
        info!(
            alias = %id,
            name = %alias_name,
            zone = %parent.name,
            target = %alias_target,
            "Created RFC2317 alias"
        );
        Ok((Some(id), Vec::new()))
    }

    /// Deletes a managed alias once no PTR record references it.
    ///
    /// Returns true if the alias was deleted.
    ///
    /// # Errors
    ///
    /// Fails only if the store rejects the write.
    pub fn release_alias(&self, txn: &mut Txn<'_>, alias: RecordId) -> Result<bool> {
        if !txn.rfc2317_ptr_records(alias).is_empty() {
            return Ok(false);
        }
        match txn.get(alias) {
            Some(record) if record.managed() => {}
            _ => return Ok(false),
        }
        let removed = txn.remove(alias)?;
        info!(alias = %alias, name = %removed.name, "Removed orphaned RFC2317 alias");
        Ok(true)
    }

    /// Links a user-owned PTR record to its RFC 2317 alias, creating the
    /// alias if needed, and stores the resulting warnings on the record.
    ///
    /// # Errors
    ///
    /// Fails if the record or its zone is unknown.
    pub fn sync_user_ptr(&self, txn: &mut Txn<'_>, id: RecordId) -> Result<Vec<String>> {
        let ptr = txn.require(id)?.clone();
        if ptr.managed() || ptr.record_type != RecordType::PTR {
            return Ok(Vec::new());
        }
        let zone = self.zones.require(ptr.zone)?;
        let (alias, warnings) = if zone.is_active() && ptr.status == RecordStatus::Active {
            self.ensure_alias(txn, zone, &ptr.name, ptr.ttl)?
        } else {
            (None, Vec::new())
        };

        if alias != ptr.rfc2317_cname_record || warnings != ptr.warnings {
            let previous_alias = ptr.rfc2317_cname_record;
            let mut updated = ptr;
            updated.rfc2317_cname_record = alias;
            updated.warnings.clone_from(&warnings);
            txn.replace(updated)?;
            if let Some(old) = previous_alias.filter(|old| Some(*old) != alias) {
                self.release_alias(txn, old)?;
            }
            debug!(ptr = %id, alias = ?alias, "Relinked user PTR record");
        }
        Ok(warnings)
    }
}

fn store_warnings(txn: &mut Txn<'_>, id: RecordId, warnings: &[String]) -> Result<()> {
    let Some(record) = txn.get(id) else {
        return Ok(());
    };
    if record.warnings == warnings {
        return Ok(());
    }
    let mut updated = record.clone();
    updated.warnings = warnings.to_vec();
    txn.replace(updated)?;
    Ok(())
}

#[cfg(test)]
#[path = "ptr_sync_tests.rs"]
mod ptr_sync_tests;
