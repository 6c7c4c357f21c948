//! Engine metrics
//!
//! A `MetricsCollector` instance is created at startup and injected into
//! every component that records into it. There is no process-global
//! collector: tests get their own isolated instance.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::Serialize;

use types::ids::Symbol;
use types::trade::Trade;

/// Aggregated counters for the matching core
///
/// Scalar counters are lock-free atomics; per-symbol volume uses a
/// sharded map keyed by symbol.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    orders_received: AtomicU64,
    trades_executed: AtomicU64,
    rejected_orders: AtomicU64,
    total_latency_nanos: AtomicU64,
    latency_samples: AtomicU64,
    /// Traded quantity per symbol
    volume_by_symbol: DashMap<Symbol, Decimal>,
    /// Orders routed per engine kind ("standard" or "ring")
    orders_by_engine: DashMap<String, u64>,
}

/// Point-in-time copy of the scalar counters
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub orders_received: u64,
    pub trades_executed: u64,
    pub rejected_orders: u64,
    pub average_latency_nanos: Option<u64>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one order accepted into the matching core
    pub fn record_order_received(&self) {
        self.orders_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the trades produced by one matching pass
    pub fn record_trades(&self, trades: &[Trade]) {
        if trades.is_empty() {
            return;
        }
        self.trades_executed
            .fetch_add(trades.len() as u64, Ordering::Relaxed);
        for trade in trades {
            let mut volume = self
                .volume_by_symbol
                .entry(trade.symbol.clone())
                .or_insert(Decimal::ZERO);
            *volume += trade.quantity.as_decimal();
        }
    }

    /// Record an order rejected without touching the book (e.g. FOK)
    pub fn record_rejected_order(&self) {
        self.rejected_orders.fetch_add(1, Ordering::Relaxed);
    }

    /// Record which engine kind handled an order
    pub fn record_engine_use(&self, engine_kind: &str) {
        *self
            .orders_by_engine
            .entry(engine_kind.to_string())
            .or_insert(0) += 1;
    }

    /// Record one end-to-end processing latency sample
    pub fn record_latency_nanos(&self, nanos: u64) {
        self.total_latency_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.latency_samples.fetch_add(1, Ordering::Relaxed);
    }

    pub fn orders_received(&self) -> u64 {
        self.orders_received.load(Ordering::Relaxed)
    }

    pub fn trades_executed(&self) -> u64 {
        self.trades_executed.load(Ordering::Relaxed)
    }

    pub fn rejected_orders(&self) -> u64 {
        self.rejected_orders.load(Ordering::Relaxed)
    }

    /// Number of latency samples recorded
    pub fn latency_samples(&self) -> u64 {
        self.latency_samples.load(Ordering::Relaxed)
    }

    /// Mean processing latency across recorded samples
    pub fn average_latency_nanos(&self) -> Option<u64> {
        let samples = self.latency_samples.load(Ordering::Relaxed);
        if samples == 0 {
            return None;
        }
        Some(self.total_latency_nanos.load(Ordering::Relaxed) / samples)
    }

    /// Total traded quantity for a symbol
    pub fn volume(&self, symbol: &Symbol) -> Decimal {
        self.volume_by_symbol
            .get(symbol)
            .map(|volume| *volume)
            .unwrap_or(Decimal::ZERO)
    }

    /// Orders handled by the given engine kind
    pub fn engine_usage(&self, engine_kind: &str) -> u64 {
        self.orders_by_engine
            .get(engine_kind)
            .map(|count| *count)
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            orders_received: self.orders_received(),
            trades_executed: self.trades_executed(),
            rejected_orders: self.rejected_orders(),
            average_latency_nanos: self.average_latency_nanos(),
        }
    }
}
