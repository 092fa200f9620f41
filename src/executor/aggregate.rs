//! Merging per-worker reports into scenario metrics.

use std::collections::BTreeMap;

pub type Metrics = BTreeMap<String, f64>;

fn get(metrics: &Metrics, name: &str) -> f64 {
    metrics.get(name).copied().unwrap_or(0.0)
}

/// Combine worker snapshots (`calls`, `errors`, `latency_*`) into the
/// concurrency metric set. `throughput` is added for load scenarios.
pub fn combine(workers: &[Metrics], elapsed: f64, with_throughput: bool) -> Metrics {
    let total_calls: f64 = workers.iter().map(|w| get(w, "calls")).sum();
    let error_count: f64 = workers.iter().map(|w| get(w, "errors")).sum();
    let latency_sum: f64 = workers.iter().map(|w| get(w, "latency_sum")).sum();

    let active = || workers.iter().filter(|w| get(w, "calls") > 0.0);
    let latency_min = active()
        .map(|w| get(w, "latency_min"))
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))))
        .unwrap_or(0.0);
    let latency_max = active().map(|w| get(w, "latency_max")).fold(0.0, f64::max);

    let mut metrics = Metrics::new();
    metrics.insert("total_calls".into(), total_calls);
    metrics.insert("error_count".into(), error_count);
    metrics.insert(
        "error_rate".into(),
        if total_calls > 0.0 {
            error_count / total_calls
        } else {
            0.0
        },
    );
    metrics.insert("latency_min".into(), latency_min);
    metrics.insert(
        "latency_avg".into(),
        if total_calls > 0.0 {
            latency_sum / total_calls
        } else {
            0.0
        },
    );
    metrics.insert("latency_max".into(), latency_max);
    metrics.insert("workers".into(), workers.len() as f64);
    metrics.insert("execution_time".into(), elapsed);
    if with_throughput {
        metrics.insert(
            "throughput".into(),
            if elapsed > 0.0 {
                total_calls / elapsed
            } else {
                0.0
            },
        );
    }
    metrics
}

/// Split `total` into `parts` near-equal shares, larger shares first.
pub fn split_evenly(total: u64, parts: usize) -> Vec<u64> {
    if parts == 0 {
        return Vec::new();
    }
    let parts_u64 = parts as u64;
    let base = total / parts_u64;
    let remainder = total % parts_u64;
    (0..parts_u64)
        .map(|i| base + u64::from(i < remainder))
        .collect()
}
