//! Error types for haggle

use crate::fsm::NegotiationState;
use thiserror::Error;

/// Main error type for haggle
#[derive(Error, Debug)]
pub enum HaggleError {
    // Validation errors
    #[error("Price must be positive and finite, got {0}")]
    InvalidPrice(f64),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    // State machine errors
    #[error("Invalid state transition: cannot {action} from {from:?}")]
    InvalidStateTransition {
        from: NegotiationState,
        action: &'static str,
    },

    // Strategy errors
    #[error("Strategy error: {0}")]
    Strategy(String),

    // Grounded context errors
    #[error("Unknown product: {0}")]
    UnknownProduct(String),

    #[error("Grounded context lookup failed: {0}")]
    Grounding(String),

    #[error("Grounded context lookup timed out after {millis}ms")]
    GroundingTimeout { millis: u64 },

    // Execution engine errors
    #[error("Execution engine exceeded its step limit ({limit})")]
    EngineStalled { limit: usize },

    #[error("Graph has no edge from {node} on {route}")]
    MissingEdge { node: String, route: String },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid configuration value: {0}")]
    InvalidConfig(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for haggle operations
pub type Result<T> = std::result::Result<T, HaggleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = HaggleError::UnknownProduct("widget".to_string());
        assert_eq!(err.to_string(), "Unknown product: widget");
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = HaggleError::InvalidStateTransition {
            from: NegotiationState::Idle,
            action: "agree",
        };
        assert_eq!(
            err.to_string(),
            "Invalid state transition: cannot agree from Idle"
        );
    }

    #[test]
    fn test_error_conversion() {
        fn io_error_function() -> Result<()> {
            std::fs::read_to_string("/nonexistent/file")?;
            Ok(())
        }

        let result = io_error_function();
        assert!(matches!(result.unwrap_err(), HaggleError::Io(_)));
    }

    #[test]
    fn test_timeout_error() {
        let err = HaggleError::GroundingTimeout { millis: 250 };
        assert_eq!(
            err.to_string(),
            "Grounded context lookup timed out after 250ms"
        );
    }
}
