// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Storage for resource records.
//!
//! [`RecordStore`] owns every record, forward and reverse, and maintains the
//! secondary indexes that answer the inverse side of the weak references:
//!
//! - `(zone, name)` to the records at that owner name
//! - zone to its records
//! - address record to the managed PTR record generated for it (`ptr_record`)
//! - RFC 2317 alias to the PTR records it serves (`rfc2317_ptr_records`)
//!
//! All writes go through a [`Txn`], which journals every change and undoes
//! them in reverse order when dropped without [`Txn::commit`]. A mutation that
//! fails halfway therefore never leaves a forward record without its PTR
//! record, or a PTR record pointing at a record that no longer exists.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Deref;

use tracing::debug;

use crate::dns_errors::RecordError;
use crate::model::{Record, RecordId, RecordType, ZoneId};

/// In-memory record storage with secondary indexes.
#[derive(Clone, Debug, Default)]
pub struct RecordStore {
    records: BTreeMap<RecordId, Record>,
    by_owner: HashMap<(ZoneId, String), BTreeSet<RecordId>>,
    by_zone: HashMap<ZoneId, BTreeSet<RecordId>>,
    ptr_by_address: HashMap<RecordId, RecordId>,
    ptrs_by_alias: HashMap<RecordId, BTreeSet<RecordId>>,
    next_id: u64,
}

impl RecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.records.get(&id)
    }

    /// Like [`get`](Self::get) but fails with [`RecordError::RecordNotFound`].
    ///
    /// # Errors
    ///
    /// Returns an error if the id is unknown.
    pub fn require(&self, id: RecordId) -> Result<&Record, RecordError> {
        self.records.get(&id).ok_or(RecordError::RecordNotFound { id })
    }

    /// Records of `record_type` at the relative `name` in `zone`.
    pub fn find<'a>(
        &'a self,
        zone: ZoneId,
        name: &str,
        record_type: RecordType,
    ) -> impl Iterator<Item = &'a Record> + 'a {
        self.at_name(zone, name)
            .filter(move |record| record.record_type == record_type)
    }

    /// All records at the relative `name` in `zone`, ordered by id.
    pub fn at_name<'a>(&'a self, zone: ZoneId, name: &str) -> impl Iterator<Item = &'a Record> + 'a {
        self.by_owner
            .get(&(zone, name.to_ascii_lowercase()))
            .into_iter()
            .flatten()
            .filter_map(|id| self.records.get(id))
    }

    pub fn in_zone(&self, zone: ZoneId) -> impl Iterator<Item = &Record> {
        self.by_zone
            .get(&zone)
            .into_iter()
            .flatten()
            .filter_map(|id| self.records.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The managed PTR record generated for an A/AAAA record.
    #[must_use]
    pub fn ptr_record(&self, address_record: RecordId) -> Option<RecordId> {
        self.ptr_by_address.get(&address_record).copied()
    }

    /// PTR records linked to an RFC 2317 alias, ordered by id.
    #[must_use]
    pub fn rfc2317_ptr_records(&self, alias: RecordId) -> Vec<RecordId> {
        self.ptrs_by_alias
            .get(&alias)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Reserves a fresh identifier. Identifiers are never reused.
    pub fn allocate_id(&mut self) -> RecordId {
        self.next_id += 1;
        RecordId(self.next_id)
    }

    fn index(&mut self, record: &Record) {
        self.by_owner
            .entry((record.zone, record.name.clone()))
            .or_default()
            .insert(record.id);
        self.by_zone.entry(record.zone).or_default().insert(record.id);
        if let Some(address) = record.address_record() {
            self.ptr_by_address.insert(address, record.id);
        }
        if let Some(alias) = record.rfc2317_cname_record {
            self.ptrs_by_alias.entry(alias).or_default().insert(record.id);
        }
    }

    fn unindex(&mut self, record: &Record) {
        let owner = (record.zone, record.name.clone());
        if let Some(ids) = self.by_owner.get_mut(&owner) {
            ids.remove(&record.id);
            if ids.is_empty() {
                self.by_owner.remove(&owner);
            }
        }
        if let Some(ids) = self.by_zone.get_mut(&record.zone) {
            ids.remove(&record.id);
            if ids.is_empty() {
                self.by_zone.remove(&record.zone);
            }
        }
        if let Some(address) = record.address_record() {
            if self.ptr_by_address.get(&address) == Some(&record.id) {
                self.ptr_by_address.remove(&address);
            }
        }
        if let Some(alias) = record.rfc2317_cname_record {
            if let Some(ids) = self.ptrs_by_alias.get_mut(&alias) {
                ids.remove(&record.id);
                if ids.is_empty() {
                    self.ptrs_by_alias.remove(&alias);
                }
            }
        }
    }

    fn put(&mut self, record: Record) -> Option<Record> {
        let previous = self.take(record.id);
        self.index(&record);
        self.records.insert(record.id, record);
        previous
    }

    fn take(&mut self, id: RecordId) -> Option<Record> {
        let record = self.records.remove(&id)?;
        self.unindex(&record);
        Some(record)
    }
}

#[derive(Debug)]
enum Undo {
    Inserted(RecordId),
    Removed(Record),
    Replaced(Record),
}

/// A write transaction over a [`RecordStore`].
///
/// Reads go through `Deref` and see the transaction's own writes. Dropping a
/// transaction that was not committed rolls every change back.
#[derive(Debug)]
pub struct Txn<'a> {
    store: &'a mut RecordStore,
    journal: Vec<Undo>,
    committed: bool,
}

impl<'a> Txn<'a> {
    pub fn new(store: &'a mut RecordStore) -> Self {
        Self {
            store,
            journal: Vec::new(),
            committed: false,
        }
    }

    pub fn allocate_id(&mut self) -> RecordId {
        self.store.allocate_id()
    }

    /// Inserts a new record. The id must come from [`allocate_id`](Self::allocate_id).
    pub fn insert(&mut self, record: Record) -> RecordId {
        let id = record.id;
        if let Some(previous) = self.store.put(record) {
            self.journal.push(Undo::Replaced(previous));
        } else {
            self.journal.push(Undo::Inserted(id));
        }
        id
    }

    /// Replaces an existing record, returning the previous version.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::RecordNotFound`] if no record has that id.
    pub fn replace(&mut self, record: Record) -> Result<Record, RecordError> {
        let id = record.id;
        match self.store.put(record) {
            Some(previous) => {
                self.journal.push(Undo::Replaced(previous.clone()));
                Ok(previous)
            }
            None => {
                self.store.take(id);
                Err(RecordError::RecordNotFound { id })
            }
        }
    }

    /// Removes a record.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::RecordNotFound`] if no record has that id.
    pub fn remove(&mut self, id: RecordId) -> Result<Record, RecordError> {
        let record = self.store.take(id).ok_or(RecordError::RecordNotFound { id })?;
        self.journal.push(Undo::Removed(record.clone()));
        Ok(record)
    }

    /// Makes all changes permanent.
    pub fn commit(mut self) {
        debug!(changes = self.journal.len(), "Committing record transaction");
        self.committed = true;
    }

    fn rollback(&mut self) {
        if self.journal.is_empty() {
            return;
        }
        debug!(changes = self.journal.len(), "Rolling back record transaction");
        while let Some(undo) = self.journal.pop() {
            match undo {
                Undo::Inserted(id) => {
                    self.store.take(id);
                }
                Undo::Removed(record) | Undo::Replaced(record) => {
                    self.store.put(record);
                }
            }
        }
    }
}

impl Deref for Txn<'_> {
    type Target = RecordStore;

    fn deref(&self) -> &Self::Target {
        self.store
    }
}

impl Drop for Txn<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.rollback();
        }
    }
}

#[cfg(test)]
#[path = "record_store_tests.rs"]
mod record_store_tests;
