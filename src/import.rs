// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Bulk import of zones, records and IPAM addresses.
//!
//! An import document is YAML or JSON:
//!
//! ```yaml
//! zones:
//!   - name: example.com
//!   - name: 2.0.192.in-addr.arpa
//!   - name: 0-15.2.0.192.in-addr.arpa
//!     rfc2317_prefix: 192.0.2.0/28
//! ipam:
//!   - id: 1
//!     address: 192.0.2.10/24
//! records:
//!   - zone: example.com
//!     name: host1
//!     type: A
//!     value: 192.0.2.10
//!     ipam_ip_address: 1
//!   - name: www.example.com.
//!     type: CNAME
//!     value: host1.example.com.
//! ```
//!
//! Zones are created first, then records in document order, all through the
//! public [`DnsEngine`] API. A record without `zone` must have an absolute
//! name and is placed in the closest enclosing zone of its view. A failing
//! item is reported in the [`ImportReport`] and does not stop the import.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dns_errors::{DnsError, RecordError, ZoneError};
use crate::engine::DnsEngine;
use crate::ipam::{IpamAddress, StaticIpam};
use crate::model::{
    record_type_serde, IpamAddressId, RecordSpec, RecordStatus, RecordType, Zone, ZoneId, ZoneSpec,
};
use crate::status_reasons::{format_warning, REASON_IPAM_ADDRESS_NOT_FOUND};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ImportDocument {
    #[serde(default)]
    pub zones: Vec<ZoneSpec>,
    #[serde(default)]
    pub records: Vec<ImportRecord>,
    #[serde(default)]
    pub ipam: Vec<IpamAddress>,
}

/// A record as written in an import document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImportRecord {
    /// Zone name; if absent `name` must be absolute.
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub view: Option<String>,
    pub name: String,
    #[serde(rename = "type", with = "record_type_serde")]
    pub record_type: RecordType,
    pub value: String,
    #[serde(default)]
    pub ttl: Option<u32>,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default)]
    pub disable_ptr: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ipam_ip_address: Option<IpamAddressId>,
}

impl ImportRecord {
    fn label(&self) -> String {
        match &self.zone {
            Some(zone) => format!("record {} {} in {zone}", self.name, self.record_type),
            None => format!("record {} {}", self.name, self.record_type),
        }
    }

    fn to_spec(&self, zone: ZoneId) -> RecordSpec {
        RecordSpec {
            zone,
            name: self.name.clone(),
            record_type: self.record_type,
            value: self.value.clone(),
            ttl: self.ttl,
            status: self.status,
            disable_ptr: self.disable_ptr,
            description: self.description.clone(),
            ipam_ip_address: self.ipam_ip_address,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ImportFailure {
    /// Human readable description of the failed item.
    pub item: String,
    pub reason: String,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub zones_created: usize,
    pub records_created: usize,
    pub failures: Vec<ImportFailure>,
    pub warnings: Vec<String>,
}

impl ImportReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, item: String, error: &DnsError) {
        warn!(item = %item, reason = error.reason(), "Import item failed: {error}");
        self.failures.push(ImportFailure {
            item,
            reason: error.reason().to_string(),
            message: error.to_string(),
        });
    }
}

impl ImportDocument {
    /// Reads a document, as JSON if the extension is `.json` and YAML otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read import file {}", path.display()))?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON import file {}", path.display()))
        } else {
            serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML import file {}", path.display()))
        }
    }

    /// An IPAM source holding the document's addresses.
    #[must_use]
    pub fn ipam_source(&self) -> Arc<StaticIpam> {
        Arc::new(StaticIpam::new(self.ipam.iter().cloned()))
    }

    /// Applies the document to `engine`.
    pub async fn apply(&self, engine: &DnsEngine) -> ImportReport {
        let mut report = ImportReport::default();

        for spec in &self.zones {
            match engine.create_zone(spec.clone()).await {
                Ok(created) => {
                    report.zones_created += 1;
                    report
                        .warnings
                        .extend(created.sync.warnings().map(str::to_string));
                }
                Err(e) => report.fail(format!("zone {}", spec.name), &e),
            }
        }

        let known: HashSet<IpamAddressId> = self.ipam.iter().map(|address| address.id).collect();
        for item in &self.records {
            let label = item.label();
            let zone = match resolve_zone(engine, item).await {
                Ok(zone) => zone,
                Err(e) => {
                    report.fail(label, &e);
                    continue;
                }
            };
            if let Some(id) = item.ipam_ip_address.filter(|id| !known.contains(id)) {
                report.warnings.push(format_warning(
                    REASON_IPAM_ADDRESS_NOT_FOUND,
                    &format!("{label} links IPAM address {id} which is not in the document"),
                ));
            }
            match engine.create_record(item.to_spec(zone.id)).await {
                Ok(created) => {
                    report.records_created += 1;
                    report
                        .warnings
                        .extend(created.warnings.iter().map(|w| format!("{label}: {w}")));
                }
                Err(e) => report.fail(label, &e),
            }
        }

        info!(
            zones = report.zones_created,
            records = report.records_created,
            failures = report.failures.len(),
            warnings = report.warnings.len(),
            "Import finished"
        );
        report
    }
}

async fn resolve_zone(engine: &DnsEngine, item: &ImportRecord) -> Result<Zone, DnsError> {
    let view = item.view.as_deref();
    if let Some(name) = &item.zone {
        return engine.zone_by_name(view, name).await.ok_or_else(|| {
            ZoneError::NoZoneFound {
                name: name.clone(),
                view: view.unwrap_or(&engine.config().default_view).to_string(),
            }
            .into()
        });
    }
    if !item.name.trim().ends_with('.') {
        return Err(RecordError::InvalidRecordData {
            name: item.name.clone(),
            zone: String::new(),
            reason: "relative name requires a zone".to_string(),
        }
        .into());
    }
    engine.resolve_zone(view, &item.name).await
}

#[cfg(test)]
#[path = "import_tests.rs"]
mod import_tests;
