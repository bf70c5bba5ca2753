//! Lock-Free Engine Metrics
//!
//! One cache-padded atomic per counter so the worker thread and adapter
//! threads never false-share. All counters use relaxed ordering.

use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicU64, Ordering};

/// Event-loop counters shared between the worker and observers
#[derive(Default)]
pub struct EngineMetrics {
    /// Market events taken off the parser channel
    pub events_received: CachePadded<AtomicU64>,

    /// Signals emitted by strategy engines
    pub signals_generated: CachePadded<AtomicU64>,

    /// Signals refused by the action policy
    pub signals_rejected: CachePadded<AtomicU64>,

    /// Order requests accepted by a trader adapter
    pub orders_routed: CachePadded<AtomicU64>,

    /// Approved signals that could not be carried out
    pub routing_failures: CachePadded<AtomicU64>,

    /// Order-status updates received from traders
    pub order_events: CachePadded<AtomicU64>,

    /// Cumulative per-event processing time in nanoseconds
    pub total_latency_ns: CachePadded<AtomicU64>,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn inc_events(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_signals(&self) {
        self.signals_generated.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_rejected(&self) {
        self.signals_rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_routed(&self) {
        self.orders_routed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_routing_failures(&self) {
        self.routing_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_order_events(&self) {
        self.order_events.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn add_latency(&self, latency_ns: u64) {
        self.total_latency_ns.fetch_add(latency_ns, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            signals_generated: self.signals_generated.load(Ordering::Relaxed),
            signals_rejected: self.signals_rejected.load(Ordering::Relaxed),
            orders_routed: self.orders_routed.load(Ordering::Relaxed),
            routing_failures: self.routing_failures.load(Ordering::Relaxed),
            order_events: self.order_events.load(Ordering::Relaxed),
            total_latency_ns: self.total_latency_ns.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.events_received,
            &self.signals_generated,
            &self.signals_rejected,
            &self.orders_routed,
            &self.routing_failures,
            &self.order_events,
            &self.total_latency_ns,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub events_received: u64,
    pub signals_generated: u64,
    pub signals_rejected: u64,
    pub orders_routed: u64,
    pub routing_failures: u64,
    pub order_events: u64,
    pub total_latency_ns: u64,
}

impl MetricsSnapshot {
    /// Average processing time per market event
    pub fn avg_latency_ns(&self) -> f64 {
        if self.events_received > 0 {
            self.total_latency_ns as f64 / self.events_received as f64
        } else {
            0.0
        }
    }

    /// Fraction of signals refused by the policy
    pub fn rejection_rate(&self) -> f64 {
        if self.signals_generated > 0 {
            self.signals_rejected as f64 / self.signals_generated as f64
        } else {
            0.0
        }
    }
}
