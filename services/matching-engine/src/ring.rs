//! Single-consumer ring buffer engine for high-volume pairs
//!
//! Pre-allocates a power-of-two slot ring. Producers claim sequences with
//! one atomic fetch-add, write their event into the claimed slot, then
//! stamp the slot's sequence with a release store. A dedicated consumer
//! thread walks sequences in order, waiting on each slot's stamp with an
//! acquire load, so every order is matched exactly once and in claim
//! order. Backpressure is blocking: a producer whose sequence is a full
//! ring ahead of the consumer spins (with backoff) until space frees up.
//!
//! Shutdown is a three-step handshake: the shutdown flag turns away new
//! producers, then shutdown waits for every in-flight producer to publish
//! its claimed slot, and only then fixes the consumer's drain point. The
//! consumer therefore drains every claimed sequence before exiting and no
//! completion channel is ever abandoned.
//!
//! A matching panic is contained to its slot: the consumer reports the
//! failure on that order's completion channel and moves on.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam::utils::Backoff;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{error, info};

use types::errors::EngineError;
use types::ids::{OrderId, Symbol};
use types::numeric::{Price, Quantity};
use types::order::Order;
use types::trade::Trade;

use crate::book::depth::BookDepth;
use crate::engine::MatchingEngine;
use crate::events::EventStore;
use crate::metrics::MetricsCollector;
use crate::publish::EventPublisher;

/// Default ring capacity; must be a power of two
pub const DEFAULT_RING_CAPACITY: usize = 65_536;

/// Stamp value of a slot that has never been published
const SLOT_EMPTY: u64 = u64::MAX;

struct RingEvent {
    order: Order,
    completion: oneshot::Sender<Result<Vec<Trade>, EngineError>>,
    enqueued_at: Instant,
}

struct Slot {
    /// Sequence last published into this slot; `SLOT_EMPTY` before first use
    sequence: AtomicU64,
    event: Mutex<Option<RingEvent>>,
}

impl Slot {
    fn new() -> Self {
        Self {
            sequence: AtomicU64::new(SLOT_EMPTY),
            event: Mutex::new(None),
        }
    }
}

struct RingShared {
    slots: Vec<Slot>,
    mask: u64,
    capacity: u64,
    /// Next sequence to hand to a producer
    claim: AtomicU64,
    /// Next sequence the consumer will process; everything below is done
    consumed: AtomicU64,
    /// Producers between claim gate and slot publication
    producers: AtomicU64,
    /// Turns away new producers; claimed slots are still drained
    shutdown: AtomicBool,
    /// Set once `claim` is final; the consumer may exit at this cursor
    closed: AtomicBool,
}

/// High-volume matching engine with a lock-free submission path
pub struct RingBufferEngine {
    engine: Arc<MatchingEngine>,
    shared: Arc<RingShared>,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

impl RingBufferEngine {
    pub fn new(symbol: Symbol, metrics: Arc<MetricsCollector>) -> Result<Self, EngineError> {
        Self::with_capacity(symbol, DEFAULT_RING_CAPACITY, metrics)
    }

    /// Create an engine with a specific ring capacity
    ///
    /// Capacity is rounded up to the next power of two so slot lookup is a
    /// mask instead of a modulo.
    pub fn with_capacity(
        symbol: Symbol,
        capacity: usize,
        metrics: Arc<MetricsCollector>,
    ) -> Result<Self, EngineError> {
        let capacity = capacity.max(2).next_power_of_two();
        let engine = Arc::new(MatchingEngine::new(symbol.clone(), metrics.clone()));

        let shared = Arc::new(RingShared {
            slots: (0..capacity).map(|_| Slot::new()).collect(),
            mask: capacity as u64 - 1,
            capacity: capacity as u64,
            claim: AtomicU64::new(0),
            consumed: AtomicU64::new(0),
            producers: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        });

        let consumer = std::thread::Builder::new()
            .name(format!("ring-{symbol}"))
            .spawn({
                let shared = shared.clone();
                let engine = engine.clone();
                let metrics = metrics.clone();
                move || Self::consume(shared, engine, metrics)
            })
            .map_err(|e| EngineError::Pool {
                message: format!("failed to spawn ring consumer: {e}"),
            })?;

        info!(symbol = %symbol, capacity, "Ring buffer engine started");
        Ok(Self {
            engine,
            shared,
            consumer: Mutex::new(Some(consumer)),
        })
    }

    pub fn symbol(&self) -> &Symbol {
        self.engine.symbol()
    }

    pub fn set_publisher(&self, publisher: Arc<dyn EventPublisher>) {
        self.engine.set_publisher(publisher);
    }

    pub fn set_event_store(&self, store: Arc<dyn EventStore>) {
        self.engine.set_event_store(store);
    }

    /// Submit an order through the ring and await its trades
    ///
    /// Blocks (spinning with backoff) while the ring is full. Fails with
    /// `Shutdown` if the engine stopped before the order was accepted.
    pub async fn process_order(&self, order: Order) -> Result<Vec<Trade>, EngineError> {
        let symbol = order.symbol.to_string();
        order.validate()?;

        // Entry gate, SeqCst-paired with the store/wait in shutdown():
        // either shutdown sees our registration and waits for our slot to
        // publish, or we see the shutdown flag and back out unclaimed.
        self.shared.producers.fetch_add(1, Ordering::SeqCst);
        if self.shared.shutdown.load(Ordering::SeqCst) {
            self.shared.producers.fetch_sub(1, Ordering::Release);
            return Err(EngineError::Shutdown { symbol });
        }

        let sequence = self.shared.claim.fetch_add(1, Ordering::Relaxed);

        // Wait until the slot a full ring behind us has been consumed.
        // The consumer cannot exit while we are registered, so this
        // always makes progress.
        let backoff = Backoff::new();
        while sequence - self.shared.consumed.load(Ordering::Acquire) >= self.shared.capacity {
            backoff.snooze();
        }

        let (sender, receiver) = oneshot::channel();
        let slot = &self.shared.slots[(sequence & self.shared.mask) as usize];
        *slot.event.lock() = Some(RingEvent {
            order,
            completion: sender,
            enqueued_at: Instant::now(),
        });
        slot.sequence.store(sequence, Ordering::Release);
        self.shared.producers.fetch_sub(1, Ordering::Release);

        match receiver.await {
            Ok(result) => result,
            Err(_) => Err(EngineError::Shutdown { symbol }),
        }
    }

    fn consume(shared: Arc<RingShared>, engine: Arc<MatchingEngine>, metrics: Arc<MetricsCollector>) {
        let mut next: u64 = 0;
        let backoff = Backoff::new();

        loop {
            let slot = &shared.slots[(next & shared.mask) as usize];
            if slot.sequence.load(Ordering::Acquire) == next {
                if let Some(event) = slot.event.lock().take() {
                    Self::process_slot(&engine, &metrics, event);
                }
                next += 1;
                shared.consumed.store(next, Ordering::Release);
                backoff.reset();
            } else if shared.closed.load(Ordering::Acquire)
                && next >= shared.claim.load(Ordering::Acquire)
            {
                // `closed` is set only after the last producer published,
                // so this claim read is the final one.
                break;
            } else {
                backoff.snooze();
            }
        }
    }

    fn process_slot(engine: &MatchingEngine, metrics: &MetricsCollector, event: RingEvent) {
        let RingEvent {
            order,
            completion,
            enqueued_at,
        } = event;
        let order_id = order.order_id.clone();

        let result =
            match panic::catch_unwind(AssertUnwindSafe(|| engine.process_order(order))) {
                Ok(trades) => Ok(trades),
                Err(_) => {
                    error!(
                        symbol = %engine.symbol(),
                        order_id = %order_id,
                        "Matching pass panicked; order failed"
                    );
                    Err(EngineError::Pipeline {
                        order_id: order_id.to_string(),
                        message: "matching pass panicked".to_string(),
                    })
                }
            };

        metrics.record_latency_nanos(enqueued_at.elapsed().as_nanos() as u64);
        // Caller may have given up on the completion; that is not an error.
        let _ = completion.send(result);
    }

    /// Cancels bypass the ring; the book serializes against the consumer
    pub fn cancel_order(&self, order_id: &OrderId) -> bool {
        self.engine.cancel_order(order_id)
    }

    pub fn modify_order(
        &self,
        order_id: &OrderId,
        new_price: Option<Price>,
        new_quantity: Option<Quantity>,
    ) -> Option<Order> {
        self.engine.modify_order(order_id, new_price, new_quantity)
    }

    pub fn depth_snapshot(&self, depth: usize) -> Option<BookDepth> {
        Some(self.engine.depth_snapshot(depth))
    }

    pub fn resting_orders(&self) -> usize {
        self.engine.resting_orders()
    }

    /// Drain every claimed sequence, then stop the consumer. Idempotent.
    pub fn shutdown(&self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.consumer.lock().take() {
            info!(symbol = %self.engine.symbol(), "Ring buffer engine shutting down");

            // Wait for in-flight producers to publish their claimed
            // slots; afterwards the claim cursor is final and the
            // consumer may exit once it has drained up to it.
            let backoff = Backoff::new();
            while self.shared.producers.load(Ordering::SeqCst) != 0 {
                backoff.snooze();
            }
            self.shared.closed.store(true, Ordering::Release);

            if handle.join().is_err() {
                error!(symbol = %self.engine.symbol(), "Ring consumer thread panicked");
            }
        }
    }
}

impl Drop for RingBufferEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
