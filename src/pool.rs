//! Connection pool (§4.7): checkout/check-in of pooled UDP endpoints.
//!
//! The pool is a single actor-like owner of its endpoint table, serialized
//! behind a `tokio::sync::Mutex` per the concurrency-model notes in §5 — one
//! coarse-grained shared resource, all access via checkout/check-in (I5).

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::error::SnmpError;
use crate::transport::Transport;

const ERROR_EVICTION_THRESHOLD: u32 = 5;

struct Endpoint {
    transport: Arc<Transport>,
    in_use: bool,
    created_at: Instant,
    last_used_at: Instant,
    usage_count: u64,
    error_count: u32,
}

/// Configuration for a [`Pool`].
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub pool_size: usize,
    pub max_idle_time: Duration,
    pub cleanup_interval: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            pool_size: 16,
            max_idle_time: Duration::from_secs(300),
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

/// Endpoints live in stable slots: eviction tombstones a slot with `None`
/// rather than removing it, so an outstanding [`Checkout`]'s `index` — taken
/// before the eviction — never ends up pointing at a different endpoint.
struct PoolInner {
    endpoints: Vec<Option<Endpoint>>,
}

/// A pool of UDP endpoints, checked out exclusively per in-flight request.
pub struct Pool {
    inner: Mutex<PoolInner>,
    config: PoolConfig,
}

/// A live checkout. Must be returned via [`Pool::check_in`] or
/// [`Pool::check_in_error`] exactly once; if dropped without an explicit
/// return, the endpoint is recovered on a best-effort basis via the fallback
/// channel registered at checkout time (async `Drop` isn't expressible in
/// Rust, so this is the idiomatic safety net rather than the primary path).
pub struct Checkout {
    index: usize,
    transport: Arc<Transport>,
    released: bool,
    fallback: Option<tokio::sync::oneshot::Sender<bool>>,
}

impl Checkout {
    pub fn transport(&self) -> &Transport {
        &self.transport
    }
}

impl Drop for Checkout {
    fn drop(&mut self) {
        if !self.released {
            // Best-effort: treat an unreturned checkout as erroring, since we
            // can't know whether the caller's request actually succeeded.
            // `oneshot::Sender::send` is synchronous, so it's safe to call
            // from `Drop`, unlike awaiting the pool's mutex directly here.
            if let Some(tx) = self.fallback.take() {
                let _ = tx.send(true);
            }
        }
    }
}

impl Pool {
    pub fn new(config: PoolConfig) -> Arc<Pool> {
        Arc::new(Pool {
            inner: Mutex::new(PoolInner {
                endpoints: Vec::new(),
            }),
            config,
        })
    }

    /// Total, available, and in-use counts (P8 accounting).
    pub async fn stats(&self) -> PoolStats {
        let inner = self.inner.lock().await;
        let live = inner.endpoints.iter().flatten();
        let total = live.clone().count();
        let in_use = live.filter(|e| e.in_use).count();
        PoolStats {
            total,
            in_use,
            available: total - in_use,
        }
    }

    /// Check out an available endpoint, or allocate a new one up to
    /// `pool_size`. Fails with [`SnmpError::PoolExhausted`] otherwise.
    pub async fn checkout(self: &Arc<Self>) -> Result<Checkout, SnmpError> {
        let mut inner = self.inner.lock().await;
        if let Some((index, endpoint)) = inner
            .endpoints
            .iter_mut()
            .enumerate()
            .find_map(|(i, slot)| slot.as_mut().filter(|e| !e.in_use).map(|e| (i, e)))
        {
            endpoint.in_use = true;
            endpoint.last_used_at = Instant::now();
            let transport = endpoint.transport.clone();
            return Ok(self.make_checkout(index, transport));
        }
        let live_count = inner.endpoints.iter().flatten().count();
        if live_count >= self.config.pool_size {
            return Err(SnmpError::PoolExhausted);
        }
        let transport = Arc::new(Transport::bind_ephemeral().await?);
        let now = Instant::now();
        let endpoint = Endpoint {
            transport: transport.clone(),
            in_use: true,
            created_at: now,
            last_used_at: now,
            usage_count: 0,
            error_count: 0,
        };
        // Reuse a tombstoned slot if one exists, so the table doesn't grow
        // without bound across many eviction/reallocation cycles.
        let index = match inner.endpoints.iter().position(|slot| slot.is_none()) {
            Some(i) => {
                inner.endpoints[i] = Some(endpoint);
                i
            }
            None => {
                inner.endpoints.push(Some(endpoint));
                inner.endpoints.len() - 1
            }
        };
        Ok(self.make_checkout(index, transport))
    }

    fn make_checkout(self: &Arc<Self>, index: usize, transport: Arc<Transport>) -> Checkout {
        let (tx, rx) = tokio::sync::oneshot::channel::<bool>();
        let pool = self.clone();
        tokio::spawn(async move {
            if let Ok(errored) = rx.await {
                pool.release(index, errored).await;
            }
        });
        Checkout {
            index,
            transport,
            released: false,
            fallback: Some(tx),
        }
    }

    /// Return an endpoint successfully used.
    pub async fn check_in(&self, mut checkout: Checkout) {
        checkout.released = true;
        self.release(checkout.index, false).await;
    }

    /// Return an endpoint that errored during use; increments its error
    /// count and evicts it past [`ERROR_EVICTION_THRESHOLD`].
    pub async fn check_in_error(&self, mut checkout: Checkout) {
        checkout.released = true;
        self.release(checkout.index, true).await;
    }

    async fn release(&self, index: usize, errored: bool) {
        let mut inner = self.inner.lock().await;
        if let Some(slot) = inner.endpoints.get_mut(index) {
            let evict = if let Some(endpoint) = slot {
                endpoint.in_use = false;
                endpoint.usage_count += 1;
                endpoint.last_used_at = Instant::now();
                if errored {
                    endpoint.error_count += 1;
                }
                endpoint.error_count >= ERROR_EVICTION_THRESHOLD
            } else {
                false
            };
            if evict {
                *slot = None;
            }
        }
    }

    /// Tombstone endpoints idle past `max_idle_time`. Intended to be driven
    /// by a periodic background task at `cleanup_interval` (see
    /// [`Pool::spawn_sweeper`]). Slots are tombstoned in place rather than
    /// removed so outstanding [`Checkout`] indices stay valid.
    pub async fn sweep_idle(&self) {
        let mut inner = self.inner.lock().await;
        let max_idle = self.config.max_idle_time;
        for slot in inner.endpoints.iter_mut() {
            let expire = matches!(slot, Some(e) if !e.in_use && e.last_used_at.elapsed() >= max_idle);
            if expire {
                *slot = None;
            }
        }
    }

    /// Spawn the periodic idle-eviction sweep, returning a handle the caller
    /// owns and can `.abort()` for explicit shutdown (teacher's
    /// `backend/scheduler.rs` lifecycle pattern).
    pub fn spawn_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let pool = self.clone();
        let interval = pool.config.cleanup_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                pool.sweep_idle().await;
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub total: usize,
    pub in_use: usize,
    pub available: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn checkout_allocates_up_to_pool_size_then_exhausts() {
        let pool = Pool::new(PoolConfig {
            pool_size: 2,
            ..Default::default()
        });
        let a = pool.checkout().await.unwrap();
        let b = pool.checkout().await.unwrap();
        assert!(matches!(pool.checkout().await, Err(SnmpError::PoolExhausted)));
        pool.check_in(a).await;
        pool.check_in(b).await;
    }

    #[tokio::test]
    async fn check_in_returns_endpoint_for_reuse() {
        let pool = Pool::new(PoolConfig {
            pool_size: 1,
            ..Default::default()
        });
        let a = pool.checkout().await.unwrap();
        pool.check_in(a).await;
        let stats = pool.stats().await;
        assert_eq!(stats, PoolStats { total: 1, in_use: 0, available: 1 });
        let b = pool.checkout().await.unwrap();
        pool.check_in(b).await;
    }

    #[tokio::test]
    async fn repeated_errors_evict_endpoint() {
        let pool = Pool::new(PoolConfig {
            pool_size: 1,
            ..Default::default()
        });
        for _ in 0..ERROR_EVICTION_THRESHOLD {
            let c = pool.checkout().await.unwrap();
            pool.check_in_error(c).await;
        }
        let stats = pool.stats().await;
        assert_eq!(stats.total, 0);
    }

    #[tokio::test]
    async fn accounting_invariant_holds() {
        let pool = Pool::new(PoolConfig {
            pool_size: 3,
            ..Default::default()
        });
        let a = pool.checkout().await.unwrap();
        let b = pool.checkout().await.unwrap();
        let stats = pool.stats().await;
        assert_eq!(stats.total, stats.available + stats.in_use);
        pool.check_in(a).await;
        pool.check_in(b).await;
    }
}
