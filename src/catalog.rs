//! Metric catalog
//!
//! Names the measurements foamtail can collect. A metric is addressed by a
//! four-segment namespace `{vendor}/{plugin}/{variable}/{kind}`, e.g.
//! `intel/openfoam/Ux/final`. The catalog is an immutable value built from
//! configuration and handed to the collector; nothing here is global state.

use crate::config::CatalogConfig;
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default vendor segment
pub const DEFAULT_VENDOR: &str = "intel";

/// Default plugin segment
pub const DEFAULT_PLUGIN: &str = "openfoam";

/// Field variables reported by a typical k-omega simpleFoam run
pub const DEFAULT_VARIABLES: [&str; 6] = ["k", "p", "Ux", "Uy", "Uz", "omega"];

/// Which of the two residuals in a solver record to report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResidualKind {
    /// Residual before the iteration's linear solve
    Initial,
    /// Residual after the iteration's linear solve
    Final,
}

impl ResidualKind {
    /// Both kinds, in catalog order
    pub const ALL: [ResidualKind; 2] = [ResidualKind::Initial, ResidualKind::Final];

    /// Namespace segment and Prometheus label for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ResidualKind::Initial => "initial",
            ResidualKind::Final => "final",
        }
    }
}

impl fmt::Display for ResidualKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResidualKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initial" => Ok(ResidualKind::Initial),
            "final" => Ok(ResidualKind::Final),
            other => Err(format!(
                "unknown residual kind '{}', expected 'initial' or 'final'",
                other
            )),
        }
    }
}

/// Identifies one requested measurement: a field variable and a residual kind
///
/// The variable is not restricted to the catalog's list. Asking for a
/// variable the solver never reports is an extraction-time `NotFound`, not a
/// key error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricKey {
    variable: String,
    kind: ResidualKind,
}

impl MetricKey {
    pub fn new(variable: impl Into<String>, kind: ResidualKind) -> Self {
        Self {
            variable: variable.into(),
            kind,
        }
    }

    /// Field variable name as it appears in the solver log (e.g. "Ux")
    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn kind(&self) -> ResidualKind {
        self.kind
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.variable, self.kind)
    }
}

/// Immutable set of metrics this collector advertises
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    vendor: String,
    plugin: String,
    variables: Vec<String>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            vendor: DEFAULT_VENDOR.to_string(),
            plugin: DEFAULT_PLUGIN.to_string(),
            variables: DEFAULT_VARIABLES.iter().map(|v| v.to_string()).collect(),
        }
    }
}

impl From<&CatalogConfig> for Catalog {
    fn from(config: &CatalogConfig) -> Self {
        Self {
            vendor: config.vendor().to_string(),
            plugin: config.plugin().to_string(),
            variables: config.variables().to_vec(),
        }
    }
}

impl Catalog {
    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Whether `variable` is one of the advertised variables
    pub fn contains(&self, variable: &str) -> bool {
        self.variables.iter().any(|v| v == variable)
    }

    /// Enumerate every metric key: each variable crossed with both residual kinds
    pub fn metric_keys(&self) -> Vec<MetricKey> {
        self.variables
            .iter()
            .flat_map(|variable| {
                ResidualKind::ALL
                    .iter()
                    .map(move |kind| MetricKey::new(variable.clone(), *kind))
            })
            .collect()
    }

    /// Full namespace string for a key, e.g. `intel/openfoam/Ux/final`
    pub fn namespace(&self, key: &MetricKey) -> String {
        format!(
            "{}/{}/{}/{}",
            self.vendor,
            self.plugin,
            key.variable(),
            key.kind()
        )
    }

    /// Parse a namespace string into a metric key
    ///
    /// A single leading `/` is tolerated. Vendor and plugin must match this
    /// catalog; the variable may be any non-empty segment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidMetricKey` if the namespace does not have
    /// four segments, names another vendor or plugin, has an empty variable,
    /// or an unknown residual kind.
    pub fn parse_namespace(&self, namespace: &str) -> AppResult<MetricKey> {
        let invalid = |reason: String| AppError::InvalidMetricKey {
            namespace: namespace.to_string(),
            reason,
        };

        let trimmed = namespace.strip_prefix('/').unwrap_or(namespace);
        let segments: Vec<&str> = trimmed.split('/').collect();
        let [vendor, plugin, variable, kind] = segments.as_slice() else {
            return Err(invalid(format!(
                "expected 4 segments ({{vendor}}/{{plugin}}/{{variable}}/{{kind}}), got {}",
                segments.len()
            )));
        };

        if *vendor != self.vendor || *plugin != self.plugin {
            return Err(invalid(format!(
                "namespace must start with {}/{}",
                self.vendor, self.plugin
            )));
        }
        if variable.is_empty() {
            return Err(invalid("variable segment is empty".to_string()));
        }
        let kind = kind.parse::<ResidualKind>().map_err(invalid)?;

        Ok(MetricKey::new(*variable, kind))
    }
}
