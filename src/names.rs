// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Domain name helpers.
//!
//! Names are kept in presentation format, lowercased and without the trailing
//! dot. Record names are stored relative to their zone, with `@` for the apex.

use crate::constants::{APEX_NAME, MAX_LABEL_LENGTH, MAX_NAME_LENGTH};

/// Lowercases `name` and strips surrounding whitespace and the trailing dot.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// Checks that `name` is a syntactically valid domain name.
///
/// Labels may contain any printable ASCII character except whitespace, so
/// wildcard (`*`), service (`_tcp`) and RFC 2317 CIDR (`0/26`) labels pass.
///
/// # Errors
///
/// Returns a description of the first problem found.
pub fn validate_domain_name(name: &str) -> Result<(), String> {
    let name = name.trim_end_matches('.');
    if name.is_empty() {
        return Err("name is empty".to_string());
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(format!(
            "name is {} characters long, maximum is {MAX_NAME_LENGTH}",
            name.len()
        ));
    }
    for label in name.split('.') {
        if label.is_empty() {
            return Err(format!("name '{name}' contains an empty label"));
        }
        if label.len() > MAX_LABEL_LENGTH {
            return Err(format!(
                "label '{label}' is longer than {MAX_LABEL_LENGTH} characters"
            ));
        }
        if let Some(c) = label.chars().find(|c| !c.is_ascii_graphic()) {
            return Err(format!("label '{label}' contains invalid character {c:?}"));
        }
    }
    Ok(())
}

/// Returns `name` relative to `zone`, or `None` if it is outside the zone.
#[must_use]
pub fn strip_zone(name: &str, zone: &str) -> Option<String> {
    if name == zone {
        return Some(APEX_NAME.to_string());
    }
    name.strip_suffix(zone)
        .and_then(|rest| rest.strip_suffix('.'))
        .filter(|rest| !rest.is_empty())
        .map(str::to_string)
}

/// Converts a user supplied record name into its stored relative form.
///
/// Names ending with a dot are absolute and must lie inside `zone`; all other
/// names are taken as relative. An empty name denotes the apex.
///
/// # Errors
///
/// Returns a description if the name is invalid or outside the zone.
pub fn relative_name(name: &str, zone: &str) -> Result<String, String> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed == APEX_NAME {
        return Ok(APEX_NAME.to_string());
    }
    let normalized = normalize_name(trimmed);
    if trimmed.ends_with('.') {
        validate_domain_name(&normalized)?;
        return strip_zone(&normalized, zone)
            .ok_or_else(|| format!("'{trimmed}' is not inside zone '{zone}'"));
    }
    validate_domain_name(&normalized)?;
    let absolute = absolute_name(&normalized, zone);
    validate_domain_name(&absolute)?;
    Ok(normalized)
}

/// Joins a relative record name and its zone (without the trailing dot).
#[must_use]
pub fn absolute_name(relative: &str, zone: &str) -> String {
    if relative == APEX_NAME {
        zone.to_string()
    } else {
        format!("{relative}.{zone}")
    }
}

/// Iterates over `name` and all of its ancestors, longest first.
pub fn ancestors(name: &str) -> impl Iterator<Item = &str> {
    let mut next = Some(name);
    std::iter::from_fn(move || {
        let current = next?;
        next = current.split_once('.').map(|(_, parent)| parent);
        Some(current)
    })
}

#[cfg(test)]
#[path = "names_tests.rs"]
mod names_tests;
