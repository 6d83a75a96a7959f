// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Record filtering for listings.
//!
//! A [`RecordFilter`] is a conjunction of optional criteria; an empty filter
//! matches every record. The `ip_address` criterion matches A/AAAA records by
//! value and PTR records by the address their reverse name encodes, so one
//! query returns both sides of a forward/reverse pair.
//!
//! The link criteria answer the reverse-mapping questions directly: the
//! managed PTR record of an address record (`address_record`), the address
//! record of a PTR record (`ptr_record`) and the PTR records served by an
//! RFC 2317 alias (`rfc2317_cname_record`).

use std::net::IpAddr;

use crate::model::{IpamAddressId, Record, RecordId, RecordStatus, RecordType, Zone, ZoneId};
use crate::record_store::RecordStore;
use crate::rfc2317::address_from_reverse_name;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Any of these types; empty means all.
    pub record_types: Vec<RecordType>,
    pub zone: Option<ZoneId>,
    pub view: Option<String>,
    pub status: Option<RecordStatus>,
    pub managed: Option<bool>,
    pub disable_ptr: Option<bool>,
    /// Any of these addresses; empty means all.
    pub ip_addresses: Vec<IpAddr>,
    /// PTR records managed for this address record.
    pub address_record: Option<RecordId>,
    /// The address record owning this managed PTR record.
    pub ptr_record: Option<RecordId>,
    /// PTR records linked to this RFC 2317 alias.
    pub rfc2317_cname_record: Option<RecordId>,
    pub ipam_ip_address: Option<IpamAddressId>,
    /// Case-insensitive substring of the name, value or zone name.
    pub search: Option<String>,
}

impl RecordFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn record_type(mut self, record_type: RecordType) -> Self {
        self.record_types.push(record_type);
        self
    }

    #[must_use]
    pub fn zone(mut self, zone: ZoneId) -> Self {
        self.zone = Some(zone);
        self
    }

    #[must_use]
    pub fn view(mut self, view: impl Into<String>) -> Self {
        self.view = Some(view.into());
        self
    }

    #[must_use]
    pub fn status(mut self, status: RecordStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn managed(mut self, managed: bool) -> Self {
        self.managed = Some(managed);
        self
    }

    #[must_use]
    pub fn disable_ptr(mut self, disable_ptr: bool) -> Self {
        self.disable_ptr = Some(disable_ptr);
        self
    }

    #[must_use]
    pub fn ip_address(mut self, address: IpAddr) -> Self {
        self.ip_addresses.push(address);
        self
    }

    #[must_use]
    pub fn address_record(mut self, id: RecordId) -> Self {
        self.address_record = Some(id);
        self
    }

    #[must_use]
    pub fn ptr_record(mut self, id: RecordId) -> Self {
        self.ptr_record = Some(id);
        self
    }

    #[must_use]
    pub fn rfc2317_cname_record(mut self, id: RecordId) -> Self {
        self.rfc2317_cname_record = Some(id);
        self
    }

    #[must_use]
    pub fn ipam_ip_address(mut self, id: IpamAddressId) -> Self {
        self.ipam_ip_address = Some(id);
        self
    }

    #[must_use]
    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    /// Returns true if `record`, owned by `zone`, satisfies every criterion.
    /// `store` resolves the inverse PTR link.
    #[must_use]
    pub fn matches(&self, record: &Record, zone: &Zone, store: &RecordStore) -> bool {
        if !self.record_types.is_empty() && !self.record_types.contains(&record.record_type) {
            return false;
        }
        if self.zone.is_some_and(|id| id != record.zone) {
            return false;
        }
        if self.view.as_ref().is_some_and(|view| *view != zone.view) {
            return false;
        }
        if self.status.is_some_and(|status| status != record.status) {
            return false;
        }
        if self.managed.is_some_and(|managed| managed != record.managed()) {
            return false;
        }
        if self.disable_ptr.is_some_and(|disable_ptr| disable_ptr != record.disable_ptr) {
            return false;
        }
        if !self.ip_addresses.is_empty()
            && !record_address(record, zone).is_some_and(|address| self.ip_addresses.contains(&address))
        {
            return false;
        }
        if self.address_record.is_some() && self.address_record != record.address_record() {
            return false;
        }
        if self.ptr_record.is_some() && self.ptr_record != store.ptr_record(record.id) {
            return false;
        }
        if self.rfc2317_cname_record.is_some()
            && self.rfc2317_cname_record != record.rfc2317_cname_record
        {
            return false;
        }
        if self.ipam_ip_address.is_some() && self.ipam_ip_address != record.ipam_ip_address {
            return false;
        }
        if let Some(term) = self.search.as_deref().map(str::to_ascii_lowercase) {
            let hit = [record.name.as_str(), record.value.as_str(), zone.name.as_str()]
                .iter()
                .any(|field| field.to_ascii_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }
        true
    }
}

/// The address an A/AAAA or PTR record refers to.
#[must_use]
pub fn record_address(record: &Record, zone: &Zone) -> Option<IpAddr> {
    match record.record_type {
        RecordType::A | RecordType::AAAA => record.ip_address(),
        RecordType::PTR => match zone.rfc2317_prefix {
            Some(prefix) => prefix.address_for_label(&record.name).map(IpAddr::V4),
            None => address_from_reverse_name(&record.fqdn(zone)),
        },
        _ => None,
    }
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod filter_tests;
