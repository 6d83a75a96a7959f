// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Engine configuration.
//!
//! Values come from defaults, then the environment, then command line flags.
//! Unparsable environment values are logged and ignored.
//!
//! | Variable                  | Default      |
//! |---------------------------|--------------|
//! | `PTRSYNC_IPAM_TIMEOUT_MS` | `2000`       |
//! | `PTRSYNC_RFC2317_NAMING`  | `hyphenated` |
//! | `PTRSYNC_DEFAULT_VIEW`    | `_default_`  |

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::{
    DEFAULT_IPAM_TIMEOUT_MILLIS, DEFAULT_VIEW_NAME, ENV_DEFAULT_VIEW, ENV_IPAM_TIMEOUT_MS,
    ENV_RFC2317_NAMING,
};
use crate::rfc2317::Rfc2317Naming;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound for a single IPAM lookup.
    pub ipam_timeout: Duration,
    /// Child zone naming used when no RFC 2317 zone exists yet.
    pub rfc2317_naming: Rfc2317Naming,
    /// View assigned to zones created without one.
    pub default_view: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ipam_timeout: Duration::from_millis(DEFAULT_IPAM_TIMEOUT_MILLIS),
            rfc2317_naming: Rfc2317Naming::default(),
            default_view: DEFAULT_VIEW_NAME.to_string(),
        }
    }
}

impl EngineConfig {
    /// Reads the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_IPAM_TIMEOUT_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => config.ipam_timeout = Duration::from_millis(ms),
                _ => warn!(
                    variable = ENV_IPAM_TIMEOUT_MS,
                    value = %raw,
                    "Ignoring invalid IPAM timeout, using {DEFAULT_IPAM_TIMEOUT_MILLIS}ms"
                ),
            }
        }

        if let Some(raw) = lookup(ENV_RFC2317_NAMING) {
            match raw.parse::<Rfc2317Naming>() {
                Ok(naming) => config.rfc2317_naming = naming,
                Err(e) => warn!(variable = ENV_RFC2317_NAMING, "{e}"),
            }
        }

        if let Some(raw) = lookup(ENV_DEFAULT_VIEW) {
            let view = raw.trim();
            if view.is_empty() {
                warn!(variable = ENV_DEFAULT_VIEW, "Ignoring empty default view");
            } else {
                config.default_view = view.to_string();
            }
        }

        config
    }

    #[must_use]
    pub fn with_rfc2317_naming(mut self, naming: Rfc2317Naming) -> Self {
        self.rfc2317_naming = naming;
        self
    }

    #[must_use]
    pub fn with_ipam_timeout(mut self, timeout: Duration) -> Self {
        self.ipam_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.ipam_timeout, Duration::from_millis(2000));
        assert_eq!(config.rfc2317_naming, Rfc2317Naming::Hyphenated);
        assert_eq!(config.default_view, "_default_");
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("PTRSYNC_IPAM_TIMEOUT_MS", "250"),
            ("PTRSYNC_RFC2317_NAMING", "cidr"),
            ("PTRSYNC_DEFAULT_VIEW", "internal"),
        ]));
        assert_eq!(config.ipam_timeout, Duration::from_millis(250));
        assert_eq!(config.rfc2317_naming, Rfc2317Naming::Cidr);
        assert_eq!(config.default_view, "internal");
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("PTRSYNC_IPAM_TIMEOUT_MS", "soon"),
            ("PTRSYNC_RFC2317_NAMING", "dotted"),
            ("PTRSYNC_DEFAULT_VIEW", "  "),
        ]));
        assert_eq!(config, EngineConfig::default());

        let zero = EngineConfig::from_lookup(lookup_from(&[("PTRSYNC_IPAM_TIMEOUT_MS", "0")]));
        assert_eq!(zero.ipam_timeout, Duration::from_millis(2000));
    }
}
