//! End-to-end scenarios from spec §8. S3 needs no live agent (it must fail
//! before any packet is sent) and runs unconditionally; S1/S2/S4 require a
//! real or simulated SNMP agent on the configured target and are marked
//! `#[ignore]`, following the teacher's pattern of keeping externally-
//! dependent tests clearly marked rather than silently skipped.

use std::sync::Once;
use std::time::Duration;

use snmp_manager::engine::{Engine, RequestOptions, SnmpVersion};
use snmp_manager::error::SnmpError;
use snmp_manager::pool::{Pool, PoolConfig};
use snmp_manager::registry::NameRegistry;
use snmp_manager::target::Target;

static TRACING_INIT: Once = Once::new();

/// Emit `tracing::debug!` output (retry attempts, discarded datagrams) to
/// stderr so a failing live-agent test shows what the engine actually did.
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).try_init();
    });
}

fn test_engine() -> std::sync::Arc<Engine> {
    init_tracing();
    let pool = Pool::new(PoolConfig::default());
    let registry = std::sync::Arc::new(NameRegistry::new());
    Engine::new(pool, registry)
}

/// S3: GETBULK over v1 fails with `getbulk_requires_v2c`, no packet sent.
#[tokio::test]
async fn s3_get_bulk_requires_v2c() {
    let engine = test_engine();
    let target = Target::parse("127.0.0.1:1").unwrap(); // port 1: nothing should ever be sent here
    let opts = RequestOptions {
        version: SnmpVersion::V1,
        ..RequestOptions::default()
    };
    let result = engine.get_bulk(&target, "1.3.6.1.2.1.1", &opts).await;
    assert!(matches!(result, Err(SnmpError::GetBulkRequiresV2c)));
}

/// S1: basic GET of sysDescr.0 against a local SNMP simulator.
#[tokio::test]
#[ignore = "requires a live SNMP agent at 127.0.0.1:1161 with community 'public'"]
async fn s1_basic_get() {
    let engine = test_engine();
    let target = Target::parse("127.0.0.1:1161").unwrap();
    let opts = RequestOptions::default();
    let vb = engine.get(&target, "1.3.6.1.2.1.1.1.0", &opts).await.unwrap();
    assert!(!vb.value.display_text().is_empty());
}

/// S2: wrong community yields a timeout (agents silently drop bad-community
/// requests rather than returning an authentication error over v1/v2c).
#[tokio::test]
#[ignore = "requires a live SNMP agent at 127.0.0.1:1161"]
async fn s2_wrong_community_times_out() {
    let engine = test_engine();
    let target = Target::parse("127.0.0.1:1161").unwrap();
    let opts = RequestOptions {
        community: b"wrong".to_vec(),
        timeout: Duration::from_millis(500),
        retries: 0,
        ..RequestOptions::default()
    };
    let result = engine.get(&target, "1.3.6.1.2.1.1.1.0", &opts).await;
    assert!(matches!(result, Err(SnmpError::Timeout { .. })));
}

/// S4: walking the system group yields >= 5 varbinds, all under the root,
/// strictly ascending.
#[tokio::test]
#[ignore = "requires a live SNMP agent at 127.0.0.1:1161"]
async fn s4_walk_system_group() {
    use snmp_manager::oid::Oid;
    use snmp_manager::walk::{walk, WalkOptions};

    let engine = test_engine();
    let target = Target::parse("127.0.0.1:1161").unwrap();
    let opts = RequestOptions::default();
    let varbinds = walk(&engine, &target, "1.3.6.1.2.1.1", &opts, &WalkOptions::default())
        .await
        .unwrap();

    assert!(varbinds.len() >= 5);
    let root = Oid::parse("1.3.6.1.2.1.1").unwrap();
    let mut last: Option<Oid> = None;
    for vb in &varbinds {
        assert!(root.is_prefix_of(&vb.oid));
        if let Some(prev) = &last {
            assert!(prev < &vb.oid);
        }
        last = Some(vb.oid.clone());
    }
}
