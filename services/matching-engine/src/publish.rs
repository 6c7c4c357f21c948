//! Publish boundary for market data
//!
//! The book calls into an injected `EventPublisher` after each completed
//! mutation, never while holding its write lock. The default
//! implementation fans events into a bounded channel; a full channel
//! drops the event with a warning rather than stalling matching.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::warn;

use types::ids::Symbol;
use types::trade::Trade;

use crate::book::depth::BookDepth;

/// Outbound market data event
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketEvent {
    TradeExecution { symbol: Symbol, trades: Vec<Trade> },
    OrderBookUpdate { symbol: Symbol, depth: BookDepth },
}

/// Sink for market data produced by the matching core
pub trait EventPublisher: Send + Sync {
    fn publish_trade_execution(&self, symbol: &Symbol, trades: &[Trade]);
    fn publish_order_book_update(&self, symbol: &Symbol, depth: &BookDepth);
}

/// Publisher backed by a bounded mpsc channel
///
/// Matching never blocks on downstream consumers: when the channel is
/// full the event is dropped and counted against the symbol in the log.
pub struct ChannelPublisher {
    sender: mpsc::Sender<MarketEvent>,
}

impl ChannelPublisher {
    /// Create a publisher and the receiving end of its channel
    pub fn new(capacity: usize) -> (Arc<Self>, mpsc::Receiver<MarketEvent>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Arc::new(Self { sender }), receiver)
    }

    fn send(&self, symbol: &Symbol, event: MarketEvent) {
        if self.sender.try_send(event).is_err() {
            warn!(symbol = %symbol, "Market data channel full, dropping event");
        }
    }
}

impl EventPublisher for ChannelPublisher {
    fn publish_trade_execution(&self, symbol: &Symbol, trades: &[Trade]) {
        self.send(
            symbol,
            MarketEvent::TradeExecution {
                symbol: symbol.clone(),
                trades: trades.to_vec(),
            },
        );
    }

    fn publish_order_book_update(&self, symbol: &Symbol, depth: &BookDepth) {
        self.send(
            symbol,
            MarketEvent::OrderBookUpdate {
                symbol: symbol.clone(),
                depth: depth.clone(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::{OrderId, UserId};
    use types::numeric::{Price, Quantity};
    use types::time::now_nanos;

    fn sample_trade() -> Trade {
        Trade::new(
            1,
            Symbol::new("BTC/USDT"),
            OrderId::from("b"),
            OrderId::from("s"),
            OrderId::from("s"),
            OrderId::from("b"),
            UserId::from("buyer"),
            UserId::from("seller"),
            Price::from_u64(100),
            Quantity::from_u64(2),
            now_nanos(),
        )
    }

    #[test]
    fn test_trade_execution_delivered() {
        let (publisher, mut receiver) = ChannelPublisher::new(4);
        let symbol = Symbol::new("BTC/USDT");
        publisher.publish_trade_execution(&symbol, &[sample_trade()]);

        match receiver.try_recv() {
            Ok(MarketEvent::TradeExecution { symbol, trades }) => {
                assert_eq!(symbol, Symbol::new("BTC/USDT"));
                assert_eq!(trades.len(), 1);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_full_channel_drops_without_blocking() {
        let (publisher, mut receiver) = ChannelPublisher::new(1);
        let symbol = Symbol::new("BTC/USDT");
        publisher.publish_trade_execution(&symbol, &[sample_trade()]);
        publisher.publish_trade_execution(&symbol, &[sample_trade()]);

        assert!(receiver.try_recv().is_ok());
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let event = MarketEvent::TradeExecution {
            symbol: Symbol::new("BTC/USDT"),
            trades: vec![sample_trade()],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "trade_execution");
        assert_eq!(json["symbol"], "BTC/USDT");
    }
}
