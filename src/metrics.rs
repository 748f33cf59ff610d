//! Metrics (§4.13): counters, gauges, histograms with windowed aggregation.
//!
//! A ring of per-second buckets backs windowed queries, owned exclusively by
//! the metrics actor (§5) — callers only ever see snapshots, never the
//! internal ring, via [`Metrics::snapshot`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const DEFAULT_WINDOW_SECONDS: usize = 60;

#[derive(Debug, Clone, Default)]
struct Bucket {
    counters: HashMap<String, u64>,
    gauges: HashMap<String, f64>,
    histograms: HashMap<String, Vec<f64>>,
}

struct Ring {
    buckets: Vec<Bucket>,
    started_at: Instant,
    cursor: usize,
    last_second: u64,
}

impl Ring {
    fn new(capacity: usize) -> Ring {
        Ring {
            buckets: vec![Bucket::default(); capacity],
            started_at: Instant::now(),
            cursor: 0,
            last_second: 0,
        }
    }

    fn current_bucket(&mut self) -> &mut Bucket {
        let elapsed_secs = self.started_at.elapsed().as_secs();
        if elapsed_secs != self.last_second {
            let advance = (elapsed_secs - self.last_second).min(self.buckets.len() as u64);
            for _ in 0..advance {
                self.cursor = (self.cursor + 1) % self.buckets.len();
                self.buckets[self.cursor] = Bucket::default();
            }
            self.last_second = elapsed_secs;
        }
        &mut self.buckets[self.cursor]
    }

    /// The last `n` buckets, oldest first.
    fn window(&self, n: usize) -> Vec<&Bucket> {
        let n = n.min(self.buckets.len());
        (0..n)
            .rev()
            .map(|back| {
                let idx = (self.cursor + self.buckets.len() - back) % self.buckets.len();
                &self.buckets[idx]
            })
            .collect()
    }
}

/// Point-in-time view of a window's aggregated values, decoupled from the
/// ring's internal representation so a host's dashboard layer (out of scope
/// here) can consume it without coupling to `Metrics` internals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub counters: HashMap<String, u64>,
    pub gauges: HashMap<String, f64>,
    pub histogram_counts: HashMap<String, usize>,
    pub histogram_sums: HashMap<String, f64>,
}

impl std::fmt::Display for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (name, value) in &self.counters {
            writeln!(f, "counter {name}={value}")?;
        }
        for (name, value) in &self.gauges {
            writeln!(f, "gauge {name}={value}")?;
        }
        for (name, count) in &self.histogram_counts {
            let sum = self.histogram_sums.get(name).copied().unwrap_or(0.0);
            let avg = if *count == 0 { 0.0 } else { sum / *count as f64 };
            writeln!(f, "histogram {name} count={count} avg={avg:.3}")?;
        }
        Ok(())
    }
}

/// Counters, gauges, and histograms aggregated over a rolling window.
pub struct Metrics {
    ring: Mutex<Ring>,
}

impl Metrics {
    pub fn new() -> Metrics {
        Metrics::with_window(DEFAULT_WINDOW_SECONDS)
    }

    pub fn with_window(seconds: usize) -> Metrics {
        Metrics {
            ring: Mutex::new(Ring::new(seconds.max(1))),
        }
    }

    pub fn incr(&self, name: &str, delta: u64) {
        let mut ring = self.ring.lock().unwrap();
        *ring.current_bucket().counters.entry(name.to_string()).or_insert(0) += delta;
    }

    pub fn gauge(&self, name: &str, value: f64) {
        let mut ring = self.ring.lock().unwrap();
        ring.current_bucket().gauges.insert(name.to_string(), value);
    }

    pub fn observe(&self, name: &str, value: f64) {
        let mut ring = self.ring.lock().unwrap();
        ring.current_bucket()
            .histograms
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    /// Time an async call and record its duration (ms) as a histogram
    /// observation under `name`.
    pub async fn time<F, Fut, T>(&self, name: &str, call: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let started = Instant::now();
        let result = call().await;
        self.observe(name, duration_ms(started.elapsed()));
        result
    }

    /// Summary across the last `n` seconds.
    pub fn snapshot(&self, window_seconds: usize) -> Snapshot {
        let mut ring = self.ring.lock().unwrap();
        let buckets = ring.window(window_seconds);
        let mut snap = Snapshot::default();
        for bucket in buckets {
            for (k, v) in &bucket.counters {
                *snap.counters.entry(k.clone()).or_insert(0) += v;
            }
            for (k, v) in &bucket.gauges {
                snap.gauges.insert(k.clone(), *v);
            }
            for (k, vs) in &bucket.histograms {
                *snap.histogram_counts.entry(k.clone()).or_insert(0) += vs.len();
                *snap.histogram_sums.entry(k.clone()).or_insert(0.0) += vs.iter().sum::<f64>();
            }
        }
        snap
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Metrics::new()
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_accumulates_within_a_bucket() {
        let metrics = Metrics::new();
        metrics.incr("requests", 1);
        metrics.incr("requests", 2);
        let snap = metrics.snapshot(60);
        assert_eq!(snap.counters.get("requests"), Some(&3));
    }

    #[test]
    fn gauge_keeps_last_value() {
        let metrics = Metrics::new();
        metrics.gauge("pool.available", 3.0);
        metrics.gauge("pool.available", 5.0);
        let snap = metrics.snapshot(60);
        assert_eq!(snap.gauges.get("pool.available"), Some(&5.0));
    }

    #[test]
    fn histogram_tracks_count_and_sum() {
        let metrics = Metrics::new();
        metrics.observe("latency", 10.0);
        metrics.observe("latency", 20.0);
        let snap = metrics.snapshot(60);
        assert_eq!(snap.histogram_counts.get("latency"), Some(&2));
        assert_eq!(snap.histogram_sums.get("latency"), Some(&30.0));
    }

    #[tokio::test]
    async fn time_records_duration_as_histogram_observation() {
        let metrics = Metrics::new();
        metrics
            .time("op", || async {
                tokio::time::sleep(Duration::from_millis(5)).await;
            })
            .await;
        let snap = metrics.snapshot(60);
        assert_eq!(snap.histogram_counts.get("op"), Some(&1));
        assert!(snap.histogram_sums.get("op").copied().unwrap_or(0.0) > 0.0);
    }

    #[test]
    fn display_formats_human_readable_summary() {
        let metrics = Metrics::new();
        metrics.incr("requests", 1);
        let snap = metrics.snapshot(60);
        let text = snap.to_string();
        assert!(text.contains("counter requests=1"));
    }
}
