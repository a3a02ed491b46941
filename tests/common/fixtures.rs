//! Builders for benchmark result artifacts.

#![allow(dead_code)]

use serde_json::{Map, Value, json};

/// Counter snapshot for one host carrying the five CPU counters.
pub fn cpu_snapshot(main_sys: f64, main_user: f64, bthread: f64, self_sys: f64, self_user: f64) -> Value {
    json!({
        "ai_main_thread_used_cpu_sys": main_sys,
        "ai_main_thread_used_cpu_user": main_user,
        "ai_queue_CPU_bthread_n1_used_cpu_total": bthread,
        "ai_self_used_cpu_sys": self_sys,
        "ai_self_used_cpu_user": self_user,
    })
}

#[derive(Debug, Clone)]
pub struct ArtifactBuilder {
    workers: u32,
    autobatching: Value,
    tensor_batch_size: u64,
    ops_rate: f64,
    p50: f64,
    stats: Option<Map<String, Value>>,
}

impl ArtifactBuilder {
    pub fn new(workers: u32, autobatching: i64, tensor_batch_size: u64) -> Self {
        Self {
            workers,
            autobatching: json!(autobatching),
            tensor_batch_size,
            ops_rate: 0.0,
            p50: 0.0,
            stats: None,
        }
    }

    /// Write `MetadataAutobatching` as a JSON boolean.
    #[must_use]
    pub fn autobatching_flag(mut self, enabled: bool) -> Self {
        self.autobatching = json!(enabled);
        self
    }

    #[must_use]
    pub fn ops_rate(mut self, rate: f64) -> Self {
        self.ops_rate = rate;
        self
    }

    #[must_use]
    pub fn p50(mut self, millis: f64) -> Self {
        self.p50 = millis;
        self
    }

    /// Append a runtime snapshot for a single host at `timestamp_ns`.
    #[must_use]
    pub fn sample(self, timestamp_ns: u64, host: &str, counters: Value) -> Self {
        let mut hosts = Map::new();
        hosts.insert(host.to_string(), counters);
        self.raw_sample(timestamp_ns, Value::Object(hosts))
    }

    /// Append a runtime snapshot with an arbitrary body (e.g. `null`).
    #[must_use]
    pub fn raw_sample(mut self, timestamp_ns: u64, snapshot: Value) -> Self {
        self.stats
            .get_or_insert_with(Map::new)
            .insert(timestamp_ns.to_string(), snapshot);
        self
    }

    pub fn build(&self) -> Value {
        let mut doc = json!({
            "TestDescription": "inference benchmark",
            "Workers": self.workers,
            "MetadataAutobatching": self.autobatching,
            "TensorBatchSize": self.tensor_batch_size,
            "DurationMillis": 60_000,
            "Limit": 100_000,
            "MaxRps": 0,
            "OverallRates": { "overallOpsRate": self.ops_rate },
            "OverallQuantiles": {
                "AllQueries": { "q0": 0.1, "q50": self.p50, "q100": self.p50 * 4.0 }
            },
        });
        if let (Some(stats), Value::Object(map)) = (&self.stats, &mut doc) {
            map.insert("ServerRunTimeStats".into(), Value::Object(stats.clone()));
        }
        doc
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.build()).expect("serialize artifact")
    }
}
