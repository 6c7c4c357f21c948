//! Order book data structures

pub mod depth;
pub mod order_book;
pub mod price_level;

pub use depth::{BookDepth, DepthLevel};
pub use order_book::OrderBook;
pub use price_level::PriceLevel;
