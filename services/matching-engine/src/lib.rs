//! Matching engine service
//!
//! The matching core of the venue: per-symbol order books with
//! price-time priority, wrapped in two execution paths.
//!
//! - The standard path runs books behind a reader-writer lock on
//!   fixed-size worker pools, one engine per symbol created on demand.
//! - The high-volume path runs a pre-allocated single-consumer ring
//!   buffer per symbol, with lock-free claim on the producer side.
//!
//! [`HybridEngineManager`] is the single entry point that routes each
//! order to its pair's configured path; matching semantics are identical
//! on both.

pub mod book;
pub mod config;
pub mod engine;
pub mod events;
pub mod hybrid;
pub mod manager;
pub mod metrics;
pub mod pool;
pub mod publish;
pub mod ring;

pub use book::{BookDepth, DepthLevel, OrderBook, PriceLevel};
pub use config::PairConfigurationManager;
pub use engine::MatchingEngine;
pub use events::{EventStore, InMemoryEventStore, OrderEvent};
pub use hybrid::HybridEngineManager;
pub use manager::{EngineManager, HIGH_VOLUME_POOL_SIZE, STANDARD_POOL_SIZE};
pub use metrics::{MetricsCollector, MetricsSnapshot};
pub use pool::EnginePool;
pub use publish::{ChannelPublisher, EventPublisher, MarketEvent};
pub use ring::{RingBufferEngine, DEFAULT_RING_CAPACITY};
