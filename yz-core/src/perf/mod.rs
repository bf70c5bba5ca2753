//! Performance Utilities
//!
//! - **Object pools**: slab allocation with generational handles for hot paths
//! - **Metrics**: cache-padded atomic counters for the event loop
//! - **CPU affinity**: worker pinning and real-time priority

pub mod cpu;
pub mod metrics;
pub mod pools;

pub use cpu::{num_cores, pin_to_core, set_realtime_priority, WorkerAffinity};
pub use metrics::{EngineMetrics, MetricsSnapshot};
pub use pools::{ObjectPool, PoolHandle, PoolStats, BLOCK_SLOTS};
