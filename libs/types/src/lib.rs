//! Types library for the matching venue
//!
//! This library provides the core type definitions shared across the
//! matching core, ensuring type safety and deterministic behavior.
//!
//! # Modules
//! - `ids`: Unique identifiers (OrderId, UserId, Symbol)
//! - `numeric`: Fixed-point decimal types (Price, Quantity)
//! - `order`: Order lifecycle types
//! - `trade`: Trade execution types
//! - `errors`: Error taxonomy
//! - `time`: Timestamp helpers

// Public modules
pub mod errors;
pub mod ids;
pub mod numeric;
pub mod order;
pub mod time;
pub mod trade;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::errors::*;
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::order::*;
    pub use crate::time::*;
    pub use crate::trade::*;
}
