//! Router (§4.12): strategy-based distribution of work across engine
//! instances.
//!
//! Affinity tracking uses a `DashMap<String, usize>` target→engine-index
//! table, the same concurrent-map shape used elsewhere in the crate for
//! independently-keyed per-target state (C5, C11).

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use dashmap::DashMap;
use rand::Rng;

use crate::error::SnmpError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteStrategy {
    RoundRobin,
    LeastConnections,
    Weighted,
    Affinity,
}

struct EngineSlot {
    weight: u32,
    error_count: AtomicU32,
    outstanding: AtomicU32,
    unhealthy_threshold: u32,
}

impl EngineSlot {
    fn is_healthy(&self) -> bool {
        self.error_count.load(Ordering::Relaxed) < self.unhealthy_threshold
    }
}

/// Distributes requests across a fixed set of engine instances (referenced
/// by index; the router doesn't own the engines themselves — ownership stays
/// with whatever constructed them, per the explicit-handle design note).
pub struct Router {
    slots: Vec<EngineSlot>,
    strategy: RouteStrategy,
    round_robin_cursor: AtomicUsize,
    affinity: DashMap<String, usize>,
    unhealthy_threshold: u32,
}

impl Router {
    pub fn new(weights: Vec<u32>, strategy: RouteStrategy, unhealthy_threshold: u32) -> Router {
        let slots = weights
            .into_iter()
            .map(|weight| EngineSlot {
                weight,
                error_count: AtomicU32::new(0),
                outstanding: AtomicU32::new(0),
                unhealthy_threshold,
            })
            .collect();
        Router {
            slots,
            strategy,
            round_robin_cursor: AtomicUsize::new(0),
            affinity: DashMap::new(),
            unhealthy_threshold,
        }
    }

    pub fn engine_count(&self) -> usize {
        self.slots.len()
    }

    /// Pick an engine index for `target_key` per the configured strategy.
    pub fn route(&self, target_key: &str) -> Result<usize, SnmpError> {
        match self.strategy {
            RouteStrategy::RoundRobin => self.route_round_robin(),
            RouteStrategy::LeastConnections => self.route_least_connections(),
            RouteStrategy::Weighted => self.route_weighted(),
            RouteStrategy::Affinity => self.route_affinity(target_key),
        }
    }

    fn healthy_indices(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_healthy())
            .map(|(i, _)| i)
            .collect()
    }

    fn route_round_robin(&self) -> Result<usize, SnmpError> {
        let healthy = self.healthy_indices();
        if healthy.is_empty() {
            return Err(SnmpError::NoHealthyEngine);
        }
        let cursor = self.round_robin_cursor.fetch_add(1, Ordering::Relaxed);
        Ok(healthy[cursor % healthy.len()])
    }

    fn route_least_connections(&self) -> Result<usize, SnmpError> {
        self.healthy_indices()
            .into_iter()
            .min_by_key(|&i| self.slots[i].outstanding.load(Ordering::Relaxed))
            .ok_or(SnmpError::NoHealthyEngine)
    }

    fn route_weighted(&self) -> Result<usize, SnmpError> {
        let healthy = self.healthy_indices();
        if healthy.is_empty() {
            return Err(SnmpError::NoHealthyEngine);
        }
        let total_weight: u32 = healthy.iter().map(|&i| self.slots[i].weight.max(1)).sum();
        let mut pick = rand::thread_rng().gen_range(0..total_weight.max(1));
        for &i in &healthy {
            let w = self.slots[i].weight.max(1);
            if pick < w {
                return Ok(i);
            }
            pick -= w;
        }
        Ok(*healthy.last().unwrap())
    }

    fn route_affinity(&self, target_key: &str) -> Result<usize, SnmpError> {
        if let Some(index) = self.affinity.get(target_key) {
            if self.slots[*index].is_healthy() {
                return Ok(*index);
            }
        }
        let chosen = self.route_least_connections()?;
        self.affinity.insert(target_key.to_string(), chosen);
        Ok(chosen)
    }

    /// Mark the start of a request routed to `index` (for least-connections).
    pub fn begin(&self, index: usize) {
        if let Some(slot) = self.slots.get(index) {
            slot.outstanding.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Mark the end of a request, recording success or failure for health
    /// tracking.
    pub fn finish(&self, index: usize, succeeded: bool) {
        if let Some(slot) = self.slots.get(index) {
            slot.outstanding.fetch_sub(1, Ordering::Relaxed);
            if succeeded {
                slot.error_count.store(0, Ordering::Relaxed);
            } else {
                slot.error_count.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Periodic health check restoring engines back to healthy; called by a
    /// background task the caller owns (teacher's `backend/scheduler.rs`
    /// lifecycle pattern — explicit spawn, explicit `.abort()` on shutdown).
    pub fn reset_health(&self, index: usize) {
        if let Some(slot) = self.slots.get(index) {
            slot.error_count.store(0, Ordering::Relaxed);
        }
    }

    pub fn is_healthy(&self, index: usize) -> bool {
        self.slots.get(index).map(|s| s.is_healthy()).unwrap_or(false)
    }

    pub fn unhealthy_threshold(&self) -> u32 {
        self.unhealthy_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_robin_cycles_through_engines() {
        let router = Router::new(vec![1, 1, 1], RouteStrategy::RoundRobin, 3);
        let picks: Vec<usize> = (0..6).map(|_| router.route("x").unwrap()).collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn least_connections_picks_idlest_engine() {
        let router = Router::new(vec![1, 1], RouteStrategy::LeastConnections, 3);
        router.begin(0);
        router.begin(0);
        router.begin(1);
        assert_eq!(router.route("x").unwrap(), 1);
    }

    #[test]
    fn affinity_is_stable_for_same_target() {
        let router = Router::new(vec![1, 1, 1], RouteStrategy::Affinity, 3);
        let first = router.route("device-a").unwrap();
        for _ in 0..5 {
            assert_eq!(router.route("device-a").unwrap(), first);
        }
    }

    #[test]
    fn affinity_falls_back_when_engine_unhealthy() {
        let router = Router::new(vec![1, 1], RouteStrategy::Affinity, 1);
        let first = router.route("device-a").unwrap();
        router.finish(first, false);
        router.finish(first, false);
        assert!(!router.is_healthy(first));
        let next = router.route("device-a").unwrap();
        assert_ne!(next, first);
    }

    #[test]
    fn no_healthy_engine_errors() {
        let router = Router::new(vec![1], RouteStrategy::RoundRobin, 1);
        router.finish(0, false);
        router.finish(0, false);
        assert!(matches!(router.route("x"), Err(SnmpError::NoHealthyEngine)));
    }

    #[test]
    fn weighted_routing_only_returns_healthy_indices() {
        let router = Router::new(vec![10, 0], RouteStrategy::Weighted, 3);
        router.finish(1, false);
        router.finish(1, false);
        router.finish(1, false);
        for _ in 0..20 {
            assert_eq!(router.route("x").unwrap(), 0);
        }
    }
}
