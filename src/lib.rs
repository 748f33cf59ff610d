//! Client-side SNMP v1/v2c manager library.
//!
//! Wire codec, request engine, walk orchestration, and a concurrency/
//! resilience layer (connection pool, circuit breaker, router, metrics) for
//! polling large device fleets. No SNMPv3, no agent/trap side, no MIB-text
//! parsing, no TCP transport.

pub mod breaker;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod oid;
pub mod pool;
pub mod registry;
pub mod router;
pub mod table;
pub mod target;
pub mod transport;
pub mod value;
pub mod walk;

pub use engine::{Engine, RequestOptions, SnmpVersion};
pub use error::SnmpError;
pub use oid::Oid;
pub use target::Target;
pub use value::{HostValue, SmiType, Value};
