//! Multi-target dispatcher (§4.10): fan out requests across targets
//! concurrently, bounded by `max_concurrent`.
//!
//! Each per-target call runs in its own task; failures are caught at the
//! task boundary so one target's error never prevents another's result from
//! completing (P7).

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::codec::Varbind;
use crate::engine::{Engine, RequestOptions};
use crate::error::SnmpError;
use crate::target::Target;

/// A single per-target request item for [`dispatch_get`]/[`dispatch_bulk`].
#[derive(Debug, Clone)]
pub struct TargetRequest {
    pub target: Target,
    pub oid: String,
    pub opts: RequestOptions,
}

/// Bounded fan-out over `requests`, preserving input order in the output.
pub async fn dispatch<F, Fut, T>(
    requests: Vec<TargetRequest>,
    max_concurrent: usize,
    call: Arc<F>,
) -> Vec<Result<T, SnmpError>>
where
    F: Fn(TargetRequest) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<T, SnmpError>> + Send + 'static,
    T: Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut handles = Vec::with_capacity(requests.len());
    for req in requests {
        let permit = semaphore.clone();
        let call = call.clone();
        handles.push(tokio::spawn(async move {
            let _permit = permit.acquire_owned().await.expect("semaphore never closed");
            call(req).await
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(result) => results.push(result),
            Err(_) => results.push(Err(SnmpError::Cancelled)),
        }
    }
    results
}

/// GET the same OID across many targets.
pub async fn dispatch_get(engine: Arc<Engine>, requests: Vec<TargetRequest>, max_concurrent: usize) -> Vec<Result<Varbind, SnmpError>> {
    let call = Arc::new(move |req: TargetRequest| {
        let engine = engine.clone();
        async move { engine.get(&req.target, &req.oid, &req.opts).await }
    });
    dispatch(requests, max_concurrent, call).await
}

/// GETBULK the same OID across many targets.
pub async fn dispatch_bulk(
    engine: Arc<Engine>,
    requests: Vec<TargetRequest>,
    max_concurrent: usize,
) -> Vec<Result<Vec<Varbind>, SnmpError>> {
    let call = Arc::new(move |req: TargetRequest| {
        let engine = engine.clone();
        async move { engine.get_bulk(&req.target, &req.oid, &req.opts).await }
    });
    dispatch(requests, max_concurrent, call).await
}

/// Walk the same root across many targets.
pub async fn dispatch_walk(
    engine: Arc<Engine>,
    requests: Vec<TargetRequest>,
    walk_opts: crate::walk::WalkOptions,
    max_concurrent: usize,
) -> Vec<Result<Vec<Varbind>, SnmpError>> {
    let call = Arc::new(move |req: TargetRequest| {
        let engine = engine.clone();
        async move { crate::walk::walk(&engine, &req.target, &req.oid, &req.opts, &walk_opts).await }
    });
    dispatch(requests, max_concurrent, call).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn preserves_input_order_and_isolates_failures() {
        let requests: Vec<TargetRequest> = (0..5)
            .map(|i| TargetRequest {
                target: Target::parse("127.0.0.1").unwrap(),
                oid: i.to_string(),
                opts: RequestOptions::default(),
            })
            .collect();

        let call = Arc::new(|req: TargetRequest| async move {
            let i: i32 = req.oid.parse().unwrap();
            if i == 2 {
                Err(SnmpError::Timeout { target: None })
            } else {
                Ok(i)
            }
        });

        let results = dispatch(requests, 2, call).await;
        assert_eq!(results.len(), 5);
        assert_eq!(results[0].as_ref().unwrap(), &0);
        assert_eq!(results[1].as_ref().unwrap(), &1);
        assert!(results[2].is_err());
        assert_eq!(results[3].as_ref().unwrap(), &3);
        assert_eq!(results[4].as_ref().unwrap(), &4);
    }

    #[tokio::test]
    async fn bounds_concurrency_to_max_concurrent() {
        let inflight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let requests: Vec<TargetRequest> = (0..8)
            .map(|i| TargetRequest {
                target: Target::parse("127.0.0.1").unwrap(),
                oid: i.to_string(),
                opts: RequestOptions::default(),
            })
            .collect();

        let inflight_cl = inflight.clone();
        let max_seen_cl = max_seen.clone();
        let call = Arc::new(move |_req: TargetRequest| {
            let inflight = inflight_cl.clone();
            let max_seen = max_seen_cl.clone();
            async move {
                let now = inflight.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                inflight.fetch_sub(1, Ordering::SeqCst);
                Ok::<(), SnmpError>(())
            }
        });

        let _ = dispatch(requests, 3, call).await;
        assert!(max_seen.load(Ordering::SeqCst) <= 3);
    }
}
