//! Order lifecycle events and the event store
//!
//! Every order produces a `Received` event on entry; matching passes that
//! execute trades add `Matched`, and all-or-nothing failures add
//! `Rejected`. The store is an append-only audit trail, injected so tests
//! and deployments choose their own backing.

use parking_lot::RwLock;
use serde::Serialize;

use types::ids::{OrderId, Symbol};
use types::numeric::{Price, Quantity};
use types::order::Side;

/// One step in an order's lifecycle
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    Received {
        order_id: OrderId,
        symbol: Symbol,
        side: Side,
        /// Absent for market orders
        price: Option<Price>,
        quantity: Quantity,
        timestamp: i64,
    },
    Matched {
        order_id: OrderId,
        symbol: Symbol,
        trade_count: usize,
        filled_quantity: Quantity,
        timestamp: i64,
    },
    Rejected {
        order_id: OrderId,
        symbol: Symbol,
        reason: String,
        timestamp: i64,
    },
}

impl OrderEvent {
    pub fn order_id(&self) -> &OrderId {
        match self {
            OrderEvent::Received { order_id, .. }
            | OrderEvent::Matched { order_id, .. }
            | OrderEvent::Rejected { order_id, .. } => order_id,
        }
    }

    pub fn symbol(&self) -> &Symbol {
        match self {
            OrderEvent::Received { symbol, .. }
            | OrderEvent::Matched { symbol, .. }
            | OrderEvent::Rejected { symbol, .. } => symbol,
        }
    }
}

/// Append-only sink for order lifecycle events
pub trait EventStore: Send + Sync {
    fn append(&self, event: OrderEvent);
    /// All events in append order
    fn events(&self) -> Vec<OrderEvent>;
}

/// In-memory event store
///
/// Appends take the write lock briefly; reads copy the log so callers
/// never hold the lock while iterating.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: RwLock<Vec<OrderEvent>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events for one order, in append order
    pub fn events_for_order(&self, order_id: &OrderId) -> Vec<OrderEvent> {
        self.events
            .read()
            .iter()
            .filter(|event| event.order_id() == order_id)
            .cloned()
            .collect()
    }

    /// Events for one symbol, in append order
    pub fn events_for_symbol(&self, symbol: &Symbol) -> Vec<OrderEvent> {
        self.events
            .read()
            .iter()
            .filter(|event| event.symbol() == symbol)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

impl EventStore for InMemoryEventStore {
    fn append(&self, event: OrderEvent) {
        self.events.write().push(event);
    }

    fn events(&self) -> Vec<OrderEvent> {
        self.events.read().clone()
    }
}
