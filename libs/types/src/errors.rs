//! Error types for the matching core
//!
//! Expected outcomes are not errors: a Fill-Or-Kill rejection returns an
//! empty trade list, and cancel/modify on an unknown order return
//! false/None. This taxonomy covers actual processing faults.

use thiserror::Error;

/// Top-level engine error
///
/// Not-found outcomes deliberately have no variant here: cancel and
/// modify return false/None and the caller decides how to surface that.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Engine is shut down: {symbol}")]
    Shutdown { symbol: String },

    #[error("Worker pool failure: {message}")]
    Pool { message: String },

    #[error("Pipeline failure for order {order_id}: {message}")]
    Pipeline { order_id: String, message: String },

    #[error("Invalid order: {reason}")]
    InvalidOrder { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::InvalidOrder {
            reason: "LIMIT order requires a price".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid order: LIMIT order requires a price"
        );
    }

    #[test]
    fn test_shutdown_error_names_symbol() {
        let err = EngineError::Shutdown {
            symbol: "BTC/USDT".to_string(),
        };
        assert!(err.to_string().contains("BTC/USDT"));
    }
}
