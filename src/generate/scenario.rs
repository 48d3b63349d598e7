//! Failure-scenario templates.
//!
//! Each scenario is a log-style record with a fixed field set and numeric
//! ranges narrow enough to look like the failure it simulates. Key names
//! deliberately differ between scenarios (`service` vs `serviceName`,
//! `level` vs `severity`, `msg` vs `reason`) so downstream normalizers see
//! the variety they meet in production.

use rand::{Rng, RngCore};
use serde_json::json;

use super::{pick, random_uuid, rounded, timestamp_now, IncidentRecord, Template};

const HOSTS: [&str; 4] = ["ip-10-0-1-17", "ip-10-0-2-41", "ip-10-0-3-88", "ip-10-0-4-12"];

// ---------------------------------------------------------------------------
// CPU spike
// ---------------------------------------------------------------------------

pub const CPU_UTILIZATION: (f64, f64) = (92.0, 99.5);
pub const CPU_LOAD_AVERAGE: (f64, f64) = (8.0, 32.0);
pub const CPU_DURATION_SECS: (u64, u64) = (120, 900);

#[derive(Debug, Default, Clone, Copy)]
pub struct CpuSpike;

impl Template for CpuSpike {
    fn name(&self) -> &'static str {
        "cpu-spike"
    }

    fn description(&self) -> &'static str {
        "sustained CPU saturation on a single host"
    }

    fn generate(&self, rng: &mut dyn RngCore) -> IncidentRecord {
        let service = pick(rng, &["order-service", "checkout-api", "recommendation-engine"]);
        let cpu = rounded(rng, CPU_UTILIZATION.0, CPU_UTILIZATION.1, 1);
        IncidentRecord::from_value(json!({
            "timestamp": timestamp_now(),
            "serviceName": service,
            "severity": "CRITICAL",
            "eventType": "ResourceExhaustion",
            "msg": format!("CPU utilization at {cpu}% on {service}"),
            "details": {
                "resource": "cpu",
                "host": pick(rng, &HOSTS),
                "cpuUtilization": cpu,
                "loadAverage1m": rounded(rng, CPU_LOAD_AVERAGE.0, CPU_LOAD_AVERAGE.1, 2),
                "durationSeconds": rng.gen_range(CPU_DURATION_SECS.0..=CPU_DURATION_SECS.1),
            },
        }))
    }
}

// ---------------------------------------------------------------------------
// Crash loop
// ---------------------------------------------------------------------------

pub const RESTART_COUNT: (u64, u64) = (6, 15);
pub const EXIT_CODES: [i64; 4] = [1, 137, 139, 143];

#[derive(Debug, Default, Clone, Copy)]
pub struct CrashLoop;

impl Template for CrashLoop {
    fn name(&self) -> &'static str {
        "crash-loop"
    }

    fn description(&self) -> &'static str {
        "container restarting repeatedly (CrashLoopBackOff)"
    }

    fn generate(&self, rng: &mut dyn RngCore) -> IncidentRecord {
        let service = pick(rng, &["payment-worker", "notification-service", "inventory-sync"]);
        let pod_suffix: u32 = rng.gen_range(0x1000..0xffff);
        IncidentRecord::from_value(json!({
            "timestamp": timestamp_now(),
            "service": service,
            "level": "ERROR",
            "reason": "CrashLoopBackOff",
            "eventType": "PodCrashLoop",
            "details": {
                "namespace": pick(rng, &["prod", "payments", "platform"]),
                "pod": format!("{service}-{pod_suffix:x}"),
                "restartCount": rng.gen_range(RESTART_COUNT.0..=RESTART_COUNT.1),
                "exitCode": EXIT_CODES[rng.gen_range(0..EXIT_CODES.len())],
                "lastState": "Terminated",
            },
        }))
    }
}

// ---------------------------------------------------------------------------
// API error
// ---------------------------------------------------------------------------

pub const API_STATUS_CODES: [u16; 4] = [500, 502, 503, 504];
pub const API_ERROR_RATE: (f64, f64) = (0.15, 0.60);
pub const API_P95_LATENCY_MS: (u64, u64) = (1200, 8000);

#[derive(Debug, Default, Clone, Copy)]
pub struct ApiError;

impl Template for ApiError {
    fn name(&self) -> &'static str {
        "api-error"
    }

    fn description(&self) -> &'static str {
        "upstream API returning 5xx responses"
    }

    fn generate(&self, rng: &mut dyn RngCore) -> IncidentRecord {
        let status = API_STATUS_CODES[rng.gen_range(0..API_STATUS_CODES.len())];
        let endpoint = pick(rng, &["/v1/orders", "/v1/payments/authorize", "/v2/search", "/v1/login"]);
        IncidentRecord::from_value(json!({
            "timestamp": timestamp_now(),
            "service": pick(rng, &["api-gateway", "payment-gateway", "auth-service"]),
            "level": "ERROR",
            "msg": format!("HTTP {status} returned from {endpoint}"),
            "eventType": "ApiError",
            "details": {
                "endpoint": endpoint,
                "method": pick(rng, &["GET", "POST", "PUT"]),
                "statusCode": status,
                "errorRate": rounded(rng, API_ERROR_RATE.0, API_ERROR_RATE.1, 3),
                "p95LatencyMs": rng.gen_range(API_P95_LATENCY_MS.0..=API_P95_LATENCY_MS.1),
                "requestId": random_uuid(rng).to_string(),
            },
        }))
    }
}

// ---------------------------------------------------------------------------
// Database latency
// ---------------------------------------------------------------------------

pub const DB_QUERY_P99_MS: (u64, u64) = (800, 5000);
pub const DB_ACTIVE_CONNECTIONS: (u64, u64) = (80, 200);
pub const DB_SLOW_QUERIES: (u64, u64) = (5, 50);

#[derive(Debug, Default, Clone, Copy)]
pub struct DbLatency;

impl Template for DbLatency {
    fn name(&self) -> &'static str {
        "db-latency"
    }

    fn description(&self) -> &'static str {
        "database queries slowing down under connection pressure"
    }

    fn generate(&self, rng: &mut dyn RngCore) -> IncidentRecord {
        let database = pick(rng, &["orders-postgres", "inventory-db", "users-mysql"]);
        let p99 = rng.gen_range(DB_QUERY_P99_MS.0..=DB_QUERY_P99_MS.1);
        IncidentRecord::from_value(json!({
            "timestamp": timestamp_now(),
            "serviceName": pick(rng, &["inventory-service", "order-service", "user-profile"]),
            "severity": "WARN",
            "eventType": "DatabaseLatency",
            "msg": format!("p99 query latency {p99}ms on {database}"),
            "details": {
                "database": database,
                "queryP99Ms": p99,
                "activeConnections": rng.gen_range(DB_ACTIVE_CONNECTIONS.0..=DB_ACTIVE_CONNECTIONS.1),
                "slowQueries": rng.gen_range(DB_SLOW_QUERIES.0..=DB_SLOW_QUERIES.1),
            },
        }))
    }
}

// ---------------------------------------------------------------------------
// DNS failure
// ---------------------------------------------------------------------------

pub const DNS_FAILED_LOOKUPS: (u64, u64) = (20, 300);
pub const DNS_ERROR_CODES: [&str; 4] = ["NXDOMAIN", "SERVFAIL", "TIMEOUT", "REFUSED"];

#[derive(Debug, Default, Clone, Copy)]
pub struct DnsFailure;

impl Template for DnsFailure {
    fn name(&self) -> &'static str {
        "dns-failure"
    }

    fn description(&self) -> &'static str {
        "service unable to resolve a dependency hostname"
    }

    fn generate(&self, rng: &mut dyn RngCore) -> IncidentRecord {
        let domain = pick(rng, &["payments.internal", "auth.internal", "api.partner.example.com"]);
        IncidentRecord::from_value(json!({
            "timestamp": timestamp_now(),
            "service": pick(rng, &["checkout-api", "frontend-ui", "search-engine"]),
            "level": "CRITICAL",
            "reason": format!("DNS resolution failed for {domain}"),
            "eventType": "DnsFailure",
            "details": {
                "domain": domain,
                "resolver": pick(rng, &["10.0.0.2", "169.254.169.253", "8.8.8.8"]),
                "errorCode": pick(rng, &DNS_ERROR_CODES),
                "failedLookups": rng.gen_range(DNS_FAILED_LOOKUPS.0..=DNS_FAILED_LOOKUPS.1),
            },
        }))
    }
}
