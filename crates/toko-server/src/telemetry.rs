// SPDX-License-Identifier: Apache-2.0

use axum::http::StatusCode;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;

const LATENCY_WINDOW: usize = 2048;

fn percentile_ns(values: &[u64], pct: f64) -> u64 {
    if values.is_empty() {
        return 0;
    }
    let mut v = values.to_vec();
    v.sort_unstable();
    let idx = ((v.len() as f64 - 1.0) * pct).round() as usize;
    v[idx.min(v.len() - 1)]
}

/// Per-route request counters and a bounded latency window, rendered as
/// plain text for `/metrics`.
#[derive(Default)]
pub struct RequestMetrics {
    counts: Mutex<HashMap<(String, u16), u64>>,
    latency_ns: Mutex<HashMap<String, VecDeque<u64>>>,
}

impl RequestMetrics {
    pub(crate) async fn observe_request(&self, route: &str, status: StatusCode, latency: Duration) {
        let mut counts = self.counts.lock().await;
        *counts
            .entry((route.to_string(), status.as_u16()))
            .or_insert(0) += 1;
        drop(counts);

        let mut latency_map = self.latency_ns.lock().await;
        let window = latency_map.entry(route.to_string()).or_default();
        window.push_back(latency.as_nanos() as u64);
        while window.len() > LATENCY_WINDOW {
            window.pop_front();
        }
    }

    pub(crate) async fn render(&self) -> String {
        let counts = self.counts.lock().await;
        let ordered: BTreeMap<(String, u16), u64> =
            counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
        drop(counts);

        let mut body = String::new();
        for ((route, status), count) in &ordered {
            body.push_str(&format!(
                "toko_requests_total{{route=\"{route}\",status=\"{status}\"}} {count}\n"
            ));
        }

        let latency_map = self.latency_ns.lock().await;
        let routes: BTreeMap<String, Vec<u64>> = latency_map
            .iter()
            .map(|(route, window)| (route.clone(), window.iter().copied().collect()))
            .collect();
        drop(latency_map);

        for (route, samples) in &routes {
            let p50 = percentile_ns(samples, 0.50) / 1_000_000;
            let p95 = percentile_ns(samples, 0.95) / 1_000_000;
            body.push_str(&format!(
                "toko_request_latency_ms{{route=\"{route}\",quantile=\"0.5\"}} {p50}\n"
            ));
            body.push_str(&format!(
                "toko_request_latency_ms{{route=\"{route}\",quantile=\"0.95\"}} {p95}\n"
            ));
        }
        body
    }
}
