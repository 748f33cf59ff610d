//! Circuit breaker (§4.11): per-target three-state FSM with failure
//! isolation.
//!
//! Per-target state lives in a `DashMap`, the same concurrent-map pattern
//! used for the name registry (C5) — independent keys update without
//! contending on each other's locks, satisfying the per-target isolation
//! requirement (P7-adjacent: breaker state for target A never affects B).

use std::future::Future;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::error::SnmpError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    pub half_open_max_calls: u32,
    pub required_successes: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        BreakerConfig {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            half_open_max_calls: 1,
            required_successes: 3,
        }
    }
}

#[derive(Debug, Clone)]
struct Record {
    state: BreakerState,
    failure_count: u32,
    success_count: u32,
    opened_at: Option<Instant>,
    half_open_probes: u32,
}

impl Record {
    fn new() -> Record {
        Record {
            state: BreakerState::Closed,
            failure_count: 0,
            success_count: 0,
            opened_at: None,
            half_open_probes: 0,
        }
    }
}

/// A per-target circuit breaker table.
pub struct Breaker {
    records: DashMap<String, Record>,
    config: BreakerConfig,
}

impl Breaker {
    pub fn new(config: BreakerConfig) -> Breaker {
        Breaker {
            records: DashMap::new(),
            config,
        }
    }

    pub fn state(&self, key: &str) -> BreakerState {
        self.records.get(key).map(|r| r.state).unwrap_or(BreakerState::Closed)
    }

    /// Manually force a target's breaker open.
    pub fn force_open(&self, key: &str) {
        let mut entry = self.records.entry(key.to_string()).or_insert_with(Record::new);
        entry.state = BreakerState::Open;
        entry.opened_at = Some(Instant::now());
    }

    /// Manually force a target's breaker closed, resetting counters.
    pub fn force_close(&self, key: &str) {
        self.records.insert(key.to_string(), Record::new());
    }

    /// Reset every target's breaker to closed.
    pub fn reset_all(&self) {
        self.records.clear();
    }

    /// Run `call` through the breaker for `key`, applying `timeout` to the
    /// call itself (a timed-out call counts as a failure).
    pub async fn call<F, Fut, T>(&self, key: &str, timeout: Duration, call: F) -> Result<T, SnmpError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, SnmpError>>,
    {
        if !self.admit(key) {
            return Err(SnmpError::CircuitOpen);
        }

        let outcome = match tokio::time::timeout(timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(SnmpError::Timeout { target: None }),
        };

        match &outcome {
            Ok(_) => self.record_success(key),
            Err(e) => self.record_failure(key, counts_as_failure(e)),
        }
        outcome
    }

    /// Whether a call for `key` may proceed right now, transitioning
    /// open→half-open when `recovery_timeout` has elapsed.
    fn admit(&self, key: &str) -> bool {
        let mut entry = self.records.entry(key.to_string()).or_insert_with(Record::new);
        match entry.state {
            BreakerState::Closed => true,
            BreakerState::Open => {
                let elapsed = entry.opened_at.map(|t| t.elapsed()).unwrap_or(Duration::ZERO);
                if elapsed >= self.config.recovery_timeout {
                    entry.state = BreakerState::HalfOpen;
                    entry.half_open_probes = 1;
                    entry.success_count = 0;
                    true
                } else {
                    false
                }
            }
            // half_open_probes counts probes currently in flight, not probes
            // admitted cumulatively — it's decremented on completion in
            // record_success/record_failure so later sequential probes keep
            // getting admitted until required_successes is reached.
            BreakerState::HalfOpen => {
                if entry.half_open_probes < self.config.half_open_max_calls {
                    entry.half_open_probes += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    fn record_success(&self, key: &str) {
        let mut entry = self.records.entry(key.to_string()).or_insert_with(Record::new);
        match entry.state {
            BreakerState::Closed => {
                entry.failure_count = 0;
            }
            BreakerState::HalfOpen => {
                entry.half_open_probes = entry.half_open_probes.saturating_sub(1);
                entry.success_count += 1;
                if entry.success_count >= self.config.required_successes {
                    *entry = Record::new();
                }
            }
            BreakerState::Open => {}
        }
    }

    fn record_failure(&self, key: &str, counts: bool) {
        if !counts {
            return;
        }
        let mut entry = self.records.entry(key.to_string()).or_insert_with(Record::new);
        match entry.state {
            BreakerState::Closed => {
                entry.failure_count += 1;
                if entry.failure_count >= self.config.failure_threshold {
                    entry.state = BreakerState::Open;
                    entry.opened_at = Some(Instant::now());
                }
            }
            BreakerState::HalfOpen => {
                entry.state = BreakerState::Open;
                entry.opened_at = Some(Instant::now());
                entry.success_count = 0;
                entry.half_open_probes = 0;
            }
            BreakerState::Open => {}
        }
    }
}

/// Terminal protocol/data errors don't indicate target ill-health, per §4.11.
fn counts_as_failure(err: &SnmpError) -> bool {
    !matches!(
        err,
        SnmpError::InvalidOid { .. } | SnmpError::NoSuchName { .. } | SnmpError::BadValue { .. }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> BreakerConfig {
        BreakerConfig {
            failure_threshold: 3,
            recovery_timeout: Duration::from_millis(20),
            half_open_max_calls: 1,
            required_successes: 2,
        }
    }

    #[tokio::test]
    async fn opens_after_threshold_failures() {
        let breaker = Breaker::new(fast_config());
        for _ in 0..3 {
            let _ = breaker
                .call("t1", Duration::from_secs(1), || async { Err::<(), _>(SnmpError::GenErr { index: 0 }) })
                .await;
        }
        assert_eq!(breaker.state("t1"), BreakerState::Open);
    }

    #[tokio::test]
    async fn fails_fast_while_open() {
        let breaker = Breaker::new(fast_config());
        breaker.force_open("t1");
        let result = breaker.call("t1", Duration::from_secs(1), || async { Ok::<_, SnmpError>(()) }).await;
        assert!(matches!(result, Err(SnmpError::CircuitOpen)));
    }

    #[tokio::test]
    async fn half_open_probe_success_closes_after_required_successes() {
        let breaker = Breaker::new(fast_config());
        breaker.force_open("t1");
        tokio::time::sleep(Duration::from_millis(30)).await;
        for _ in 0..2 {
            let result = breaker.call("t1", Duration::from_secs(1), || async { Ok::<_, SnmpError>(()) }).await;
            assert!(result.is_ok());
            tokio::time::sleep(Duration::from_millis(30)).await;
        }
        assert_eq!(breaker.state("t1"), BreakerState::Closed);
    }

    #[tokio::test]
    async fn half_open_probe_failure_reopens() {
        let breaker = Breaker::new(fast_config());
        breaker.force_open("t1");
        tokio::time::sleep(Duration::from_millis(30)).await;
        let _ = breaker
            .call("t1", Duration::from_secs(1), || async { Err::<(), _>(SnmpError::GenErr { index: 0 }) })
            .await;
        assert_eq!(breaker.state("t1"), BreakerState::Open);
    }

    #[tokio::test]
    async fn per_target_isolation() {
        let breaker = Breaker::new(fast_config());
        for _ in 0..3 {
            let _ = breaker
                .call("bad-target", Duration::from_secs(1), || async {
                    Err::<(), _>(SnmpError::GenErr { index: 0 })
                })
                .await;
        }
        assert_eq!(breaker.state("bad-target"), BreakerState::Open);
        assert_eq!(breaker.state("good-target"), BreakerState::Closed);
    }

    #[tokio::test]
    async fn terminal_errors_do_not_count_as_failures() {
        let breaker = Breaker::new(fast_config());
        for _ in 0..5 {
            let _ = breaker
                .call("t1", Duration::from_secs(1), || async {
                    Err::<(), _>(SnmpError::InvalidOid { reason: "x".into() })
                })
                .await;
        }
        assert_eq!(breaker.state("t1"), BreakerState::Closed);
    }

    #[test]
    fn reset_all_clears_every_record() {
        let breaker = Breaker::new(fast_config());
        breaker.force_open("t1");
        breaker.force_open("t2");
        breaker.reset_all();
        assert_eq!(breaker.state("t1"), BreakerState::Closed);
        assert_eq!(breaker.state("t2"), BreakerState::Closed);
    }
}
