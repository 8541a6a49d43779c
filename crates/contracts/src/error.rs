//! Layered error definitions
//!
//! Categorized by source: config / agent ingestion / store / policy

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Ingestion Errors =====
    /// Non-player agent record is missing fields or carries invalid values
    #[error("malformed agent record (id={id:?}): {message}")]
    MalformedAgent { id: Option<u32>, message: String },

    // ===== Store Errors =====
    /// Episode store write error
    #[error("store '{store}' write error: {message}")]
    StoreWrite { store: String, message: String },

    // ===== Policy Errors =====
    /// Drive policy prediction failed
    #[error("drive policy error: {message}")]
    Policy { message: String },
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create malformed agent error
    pub fn malformed_agent(id: Option<u32>, message: impl Into<String>) -> Self {
        Self::MalformedAgent {
            id,
            message: message.into(),
        }
    }

    /// Create store write error
    pub fn store_write(store: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StoreWrite {
            store: store.into(),
            message: message.into(),
        }
    }

    /// Create policy error
    pub fn policy(message: impl Into<String>) -> Self {
        Self::Policy {
            message: message.into(),
        }
    }
}
