//! Typed model for benchmark run artifacts.
//!
//! A run artifact carries scalar results (worker count, batching setup,
//! throughput, latency) plus an optional timeseries of server runtime
//! statistics keyed by nanosecond timestamp and then by hostname.
//!
//! Runtime statistics are kept as loosely typed JSON because servers report
//! them inconsistently: Redis-style `INFO` fields arrive as strings
//! (`"12.345"`), other collectors emit plain numbers. Typed accessors are
//! provided for the cumulative CPU counters used for attribution.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::ops::{Add, Sub};
use std::path::PathBuf;

pub const MAIN_THREAD_CPU_SYS: &str = "ai_main_thread_used_cpu_sys";
pub const MAIN_THREAD_CPU_USER: &str = "ai_main_thread_used_cpu_user";
pub const BACKGROUND_THREAD_CPU_TOTAL: &str = "ai_queue_CPU_bthread_n1_used_cpu_total";
pub const SELF_CPU_SYS: &str = "ai_self_used_cpu_sys";
pub const SELF_CPU_USER: &str = "ai_self_used_cpu_user";

// ────────────────────────────────────────────────────────────────────────────
// Counters
// ────────────────────────────────────────────────────────────────────────────

/// Flat mapping of named runtime statistics for one host at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CounterSet {
    stats: Map<String, Value>,
}

/// Point-in-time value of a named statistic.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatValue {
    Number(f64),
    Text(String),
}

impl StatValue {
    fn from_json(value: &Value) -> Self {
        match value {
            Value::Number(n) => n.as_f64().map_or_else(|| Self::Text(n.to_string()), Self::Number),
            Value::String(s) => Self::Text(s.clone()),
            other => Self::Text(other.to_string()),
        }
    }
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n:.3}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl CounterSet {
    #[must_use]
    pub const fn new(stats: Map<String, Value>) -> Self {
        Self { stats }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<StatValue> {
        self.stats.get(name).map(StatValue::from_json)
    }

    /// Numeric view of a statistic: JSON numbers, or strings that parse as `f64`.
    #[must_use]
    pub fn numeric(&self, name: &str) -> Option<f64> {
        match self.stats.get(name)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.stats.keys().map(String::as_str)
    }

    /// Extract the cumulative CPU counters, or the name of the first missing one.
    pub fn cpu_counters(&self) -> std::result::Result<CpuCounters, &'static str> {
        let read = |name: &'static str| self.numeric(name).ok_or(name);
        Ok(CpuCounters {
            main_thread_sys: read(MAIN_THREAD_CPU_SYS)?,
            main_thread_user: read(MAIN_THREAD_CPU_USER)?,
            background_thread_total: read(BACKGROUND_THREAD_CPU_TOTAL)?,
            self_sys: read(SELF_CPU_SYS)?,
            self_user: read(SELF_CPU_USER)?,
        })
    }
}

/// Cumulative CPU seconds since process start.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuCounters {
    pub main_thread_sys: f64,
    pub main_thread_user: f64,
    pub background_thread_total: f64,
    pub self_sys: f64,
    pub self_user: f64,
}

impl CpuCounters {
    #[must_use]
    pub fn main_thread(&self) -> f64 {
        self.main_thread_sys + self.main_thread_user
    }

    #[must_use]
    pub fn process_total(&self) -> f64 {
        self.self_sys + self.self_user
    }
}

impl Add for CpuCounters {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            main_thread_sys: self.main_thread_sys + rhs.main_thread_sys,
            main_thread_user: self.main_thread_user + rhs.main_thread_user,
            background_thread_total: self.background_thread_total + rhs.background_thread_total,
            self_sys: self.self_sys + rhs.self_sys,
            self_user: self.self_user + rhs.self_user,
        }
    }
}

impl Sub for CpuCounters {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            main_thread_sys: self.main_thread_sys - rhs.main_thread_sys,
            main_thread_user: self.main_thread_user - rhs.main_thread_user,
            background_thread_total: self.background_thread_total - rhs.background_thread_total,
            self_sys: self.self_sys - rhs.self_sys,
            self_user: self.self_user - rhs.self_user,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Samples
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostCounters {
    pub host: String,
    pub counters: CounterSet,
}

/// One timestamped observation of server-wide counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuntimeSample {
    /// Nanoseconds since the Unix epoch.
    pub timestamp: u64,
    /// Per-host counters in document order.
    pub host_counters: Vec<HostCounters>,
}

impl RuntimeSample {
    #[must_use]
    pub const fn new(timestamp: u64, host_counters: Vec<HostCounters>) -> Self {
        Self {
            timestamp,
            host_counters,
        }
    }

    #[must_use]
    pub fn first_host(&self) -> Option<&HostCounters> {
        self.host_counters.first()
    }

    /// Sum CPU counters across every host, treating the hosts as one server.
    pub fn aggregate_cpu(&self) -> Result<CpuCounters> {
        if self.host_counters.is_empty() {
            return Err(Error::MissingCounter {
                timestamp: self.timestamp,
                host: "<none>".to_string(),
                counter: MAIN_THREAD_CPU_SYS.to_string(),
            });
        }
        self.host_counters
            .iter()
            .try_fold(CpuCounters::default(), |acc, entry| {
                entry
                    .counters
                    .cpu_counters()
                    .map(|counters| acc + counters)
                    .map_err(|counter| Error::MissingCounter {
                        timestamp: self.timestamp,
                        host: entry.host.clone(),
                        counter: counter.to_string(),
                    })
            })
    }

    /// Decode a `ServerRunTimeStats` object into samples, keeping document order.
    ///
    /// Keys are decimal nanosecond timestamps. A `null` snapshot (the collector
    /// failed for that tick) becomes a sample without hosts.
    pub fn parse_series(stats: &Map<String, Value>) -> std::result::Result<Vec<Self>, String> {
        stats
            .iter()
            .map(|(key, snapshot)| {
                let timestamp: u64 = key
                    .trim()
                    .parse()
                    .map_err(|_| format!("runtime stats key '{key}' is not a nanosecond timestamp"))?;
                let host_counters = match snapshot {
                    Value::Null => Vec::new(),
                    Value::Object(hosts) => hosts
                        .iter()
                        .map(|(host, counters)| match counters {
                            Value::Object(stats) => Ok(HostCounters {
                                host: host.clone(),
                                counters: CounterSet::new(stats.clone()),
                            }),
                            _ => Err(format!(
                                "runtime stats for host '{host}' at {timestamp} is not an object"
                            )),
                        })
                        .collect::<std::result::Result<Vec<_>, _>>()?,
                    _ => {
                        return Err(format!("runtime stats at {timestamp} is not an object"));
                    }
                };
                Ok(Self::new(timestamp, host_counters))
            })
            .collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Runs
// ────────────────────────────────────────────────────────────────────────────

/// One benchmark-run artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub source_path: PathBuf,
    pub workers: u32,
    /// Raw `MetadataAutobatching` value; zero means disabled.
    pub autobatching: i64,
    pub tensor_batch_size: u64,
    pub overall_ops_rate: f64,
    pub p50_latency_ms: f64,
    #[serde(skip)]
    pub runtime_samples: Vec<RuntimeSample>,
    pub test_description: Option<String>,
    pub duration_millis: Option<i64>,
    pub limit: Option<u64>,
    pub max_rps: Option<u64>,
}

impl RunSummary {
    #[must_use]
    pub const fn autobatching_enabled(&self) -> bool {
        self.autobatching != 0
    }

    #[must_use]
    pub fn last_sample(&self) -> Option<&RuntimeSample> {
        self.runtime_samples.last()
    }

    /// Drop the runtime timeseries, keeping only scalar results and provenance.
    #[must_use]
    pub fn without_samples(mut self) -> Self {
        self.runtime_samples = Vec::new();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn counters(value: Value) -> CounterSet {
        match value {
            Value::Object(map) => CounterSet::new(map),
            _ => panic!("expected object"),
        }
    }

    fn cpu_json(main_sys: f64, main_user: f64, bg: f64, self_sys: f64, self_user: f64) -> Value {
        let mut map = Map::new();
        map.insert(MAIN_THREAD_CPU_SYS.into(), Value::String(main_sys.to_string()));
        map.insert(MAIN_THREAD_CPU_USER.into(), json!(main_user));
        map.insert(BACKGROUND_THREAD_CPU_TOTAL.into(), json!(bg));
        map.insert(SELF_CPU_SYS.into(), json!(self_sys));
        map.insert(SELF_CPU_USER.into(), Value::String(format!("{self_user}")));
        Value::Object(map)
    }

    #[test]
    fn numeric_accepts_numbers_and_numeric_strings() {
        let set = counters(json!({"a": 1.5, "b": " 2.25 ", "c": "1.2G", "d": true}));
        assert_eq!(set.numeric("a"), Some(1.5));
        assert_eq!(set.numeric("b"), Some(2.25));
        assert_eq!(set.numeric("c"), None);
        assert_eq!(set.numeric("d"), None);
        assert_eq!(set.numeric("missing"), None);
    }

    #[test]
    fn stat_value_display() {
        assert_eq!(StatValue::Number(1.0).to_string(), "1.000");
        assert_eq!(StatValue::Text("1.07M".into()).to_string(), "1.07M");
        let set = counters(json!({"flag": null}));
        assert_eq!(set.get("flag"), Some(StatValue::Text("null".into())));
    }

    #[test]
    fn aggregate_cpu_sums_hosts() {
        let sample = RuntimeSample::new(
            10,
            vec![
                HostCounters {
                    host: "a".into(),
                    counters: counters(cpu_json(1.0, 2.0, 3.0, 4.0, 5.0)),
                },
                HostCounters {
                    host: "b".into(),
                    counters: counters(cpu_json(10.0, 20.0, 30.0, 40.0, 50.0)),
                },
            ],
        );
        let sum = sample.aggregate_cpu().expect("aggregate");
        assert!((sum.main_thread() - 33.0).abs() < 1e-9);
        assert!((sum.background_thread_total - 33.0).abs() < 1e-9);
        assert!((sum.process_total() - 99.0).abs() < 1e-9);
    }

    #[test]
    fn aggregate_cpu_reports_missing_counter() {
        let sample = RuntimeSample::new(
            7,
            vec![HostCounters {
                host: "redis-1".into(),
                counters: counters(json!({"ai_main_thread_used_cpu_sys": 1.0})),
            }],
        );
        let err = sample.aggregate_cpu().unwrap_err();
        match err {
            Error::MissingCounter {
                timestamp,
                host,
                counter,
            } => {
                assert_eq!(timestamp, 7);
                assert_eq!(host, "redis-1");
                assert_eq!(counter, MAIN_THREAD_CPU_USER);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn parse_series_keeps_document_order() {
        let raw: Map<String, Value> = serde_json::from_str(
            r#"{
                "1600000000300000000": {"h": {"x": 3}},
                "1600000000100000000": null,
                "1600000000200000000": {"h": {"x": 2}, "g": {"x": 1}}
            }"#,
        )
        .unwrap();
        let samples = RuntimeSample::parse_series(&raw).expect("parse");
        let stamps: Vec<u64> = samples.iter().map(|s| s.timestamp).collect();
        assert_eq!(
            stamps,
            vec![1_600_000_000_300_000_000, 1_600_000_000_100_000_000, 1_600_000_000_200_000_000]
        );
        assert!(samples[1].host_counters.is_empty());
        assert_eq!(samples[2].first_host().unwrap().host, "h");
    }

    #[test]
    fn parse_series_rejects_bad_timestamp() {
        let raw: Map<String, Value> = serde_json::from_str(r#"{"soon": {}}"#).unwrap();
        let err = RuntimeSample::parse_series(&raw).unwrap_err();
        assert!(err.contains("soon"), "{err}");
    }
}
