//! Synthetic incident generation: record type, severity weighting, and
//! the template registry.

pub mod metric;
pub mod registry;
pub mod scenario;

use chrono::{SecondsFormat, Utc};
use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

pub use registry::{Generator, TemplateRegistry, TemplateSelection};

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("unknown template '{name}' (available: {available})")]
    Unknown { name: String, available: String },

    #[error("template registry has no templates for selection '{selection}'")]
    Empty { selection: String },

    #[error("template '{name}' is already registered")]
    Duplicate { name: String },
}

/// Severity levels carried by generated incidents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warn,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relative weights used when picking a severity at random.
pub const SEVERITY_WEIGHTS: [(Severity, u32); 4] = [
    (Severity::Info, 10),
    (Severity::Warn, 30),
    (Severity::Error, 40),
    (Severity::Critical, 20),
];

/// Pick a severity according to [`SEVERITY_WEIGHTS`].
pub fn weighted_severity(rng: &mut dyn RngCore) -> Severity {
    // Weights are constant and non-zero, so the index is always valid.
    match WeightedIndex::new(SEVERITY_WEIGHTS.iter().map(|(_, w)| *w)) {
        Ok(dist) => SEVERITY_WEIGHTS[dist.sample(rng)].0,
        Err(_) => Severity::Error,
    }
}

/// Canonical record timestamp: RFC 3339, UTC, millisecond precision.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Uniform float in `[lo, hi]` rounded to `places` decimal places.
pub fn rounded(rng: &mut dyn RngCore, lo: f64, hi: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    let v = (rng.gen_range(lo..=hi) * factor).round() / factor;
    v.clamp(lo, hi)
}

/// Uniform choice over a non-empty static list.
pub fn pick<'a>(rng: &mut dyn RngCore, items: &'a [&'a str]) -> &'a str {
    items[rng.gen_range(0..items.len())]
}

/// Version 4 UUID drawn from `rng`, so seeded runs repeat their ids.
pub fn random_uuid(rng: &mut dyn RngCore) -> Uuid {
    uuid::Builder::from_random_bytes(rng.gen()).into_uuid()
}

/// A single synthetic incident payload.
///
/// The field set depends on the template that produced it; the only fields
/// every record is guaranteed to carry are `eventType` and `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct IncidentRecord {
    fields: Map<String, Value>,
}

impl IncidentRecord {
    /// Wrap a JSON object produced by a template.
    ///
    /// Non-object values are stored under a `payload` key so the record is
    /// still an object on the wire.
    pub fn from_value(value: Value) -> Self {
        let fields = match value {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("payload".to_string(), other);
                map
            }
        };
        Self { fields }
    }

    pub fn event_type(&self) -> Option<&str> {
        self.fields.get("eventType").and_then(Value::as_str)
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.fields.get("timestamp").and_then(Value::as_str)
    }

    /// `incidentId` if the template assigns one.
    pub fn incident_id(&self) -> Option<&str> {
        self.fields.get("incidentId").and_then(Value::as_str)
    }

    /// Short label used in log lines: the incident id when present, else the
    /// event type.
    pub fn label(&self) -> &str {
        self.incident_id()
            .or_else(|| self.event_type())
            .unwrap_or("unlabelled")
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Look up a nested field by a `/`-separated path, e.g. `details/restartCount`.
    pub fn pointer(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('/');
        let first = parts.next()?;
        parts.try_fold(self.fields.get(first)?, |v, key| v.get(key))
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&self.fields)
    }
}

/// A named record shape.
pub trait Template: Send + Sync {
    /// Registry key, e.g. `"crash-loop"`.
    fn name(&self) -> &'static str;

    /// One-line description for `incidentsim templates`.
    fn description(&self) -> &'static str;

    /// Whether this template belongs to the failure-scenario family.
    fn is_scenario(&self) -> bool {
        true
    }

    fn generate(&self, rng: &mut dyn RngCore) -> IncidentRecord;
}
