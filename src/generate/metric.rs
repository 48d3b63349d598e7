//! Generic metric-style incident template.

use rand::{Rng, RngCore};
use serde_json::json;

use super::{pick, random_uuid, rounded, timestamp_now, weighted_severity, IncidentRecord, Template};

pub const SERVICES: [&str; 5] = [
    "auth-service",
    "payment-gateway",
    "search-engine",
    "inventory-db",
    "frontend-ui",
];

pub const EVENT_TYPES: [&str; 5] = [
    "LatencySpike",
    "ErrorRateIncrease",
    "Timeouts",
    "ResourceExhaustion",
    "ServiceDown",
];

pub const ERROR_RATE: (f64, f64) = (0.0, 0.5);
pub const LATENCY_MS: (u64, u64) = (50, 1500);
pub const CPU_PERCENT: (f64, f64) = (10.0, 90.0);
pub const MEMORY_PERCENT: (f64, f64) = (10.0, 90.0);

const MESSAGE: &str = "Synthetic alert generated for testing the alert pipeline";

/// Metric-based alert with a UUID, a weighted severity and a `metrics` block.
///
/// `metricValue` is set for event types that have an obvious headline
/// metric and omitted otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricTemplate;

impl Template for MetricTemplate {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn description(&self) -> &'static str {
        "metric-style alert (error rate, latency, CPU, memory) with weighted severity"
    }

    fn is_scenario(&self) -> bool {
        false
    }

    fn generate(&self, rng: &mut dyn RngCore) -> IncidentRecord {
        let event_type = pick(rng, &EVENT_TYPES);
        let error_rate = rounded(rng, ERROR_RATE.0, ERROR_RATE.1, 3);
        let latency_ms = rng.gen_range(LATENCY_MS.0..=LATENCY_MS.1);
        let cpu = rounded(rng, CPU_PERCENT.0, CPU_PERCENT.1, 2);
        let memory = rounded(rng, MEMORY_PERCENT.0, MEMORY_PERCENT.1, 2);

        let mut record = json!({
            "incidentId": random_uuid(rng).to_string(),
            "timestamp": timestamp_now(),
            "service": pick(rng, &SERVICES),
            "severity": weighted_severity(rng).as_str(),
            "eventType": event_type,
            "metrics": {
                "errorRate": error_rate,
                "latencyMs": latency_ms,
                "cpuUsagePercent": cpu,
                "memoryUsagePercent": memory,
            },
            "message": MESSAGE,
        });

        let headline = match event_type {
            "LatencySpike" | "Timeouts" => Some(json!(latency_ms)),
            "ErrorRateIncrease" => Some(json!(error_rate)),
            "ResourceExhaustion" => Some(json!(cpu)),
            _ => None,
        };
        if let (Some(value), Some(obj)) = (headline, record.as_object_mut()) {
            obj.insert("metricValue".to_string(), value);
        }

        IncidentRecord::from_value(record)
    }
}
