//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds > 0, timeouts ordered)
//! - Check required secrets are present
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - The tool server URL is checked at connect time, not here

use std::fmt;

use crate::config::schema::ServiceConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate a deserialized configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.trim().is_empty() {
        errors.push(ValidationError::new("listener.bind_address", "must not be empty"));
    }

    let resilience = &config.resilience;
    if resilience.failure_threshold == 0 {
        errors.push(ValidationError::new("resilience.failure_threshold", "must be greater than 0"));
    }
    if resilience.max_attempts == 0 {
        errors.push(ValidationError::new("resilience.max_attempts", "must be greater than 0"));
    }
    if resilience.connect_timeout_secs == 0 {
        errors.push(ValidationError::new("resilience.connect_timeout_secs", "must be greater than 0"));
    }
    if resilience.request_timeout_secs <= resilience.connect_timeout_secs {
        errors.push(ValidationError::new(
            "resilience.request_timeout_secs",
            format!(
                "must be larger than connect_timeout_secs ({})",
                resilience.connect_timeout_secs
            ),
        ));
    }
    if resilience.max_delay_ms < resilience.base_delay_ms {
        errors.push(ValidationError::new("resilience.max_delay_ms", "must be at least base_delay_ms"));
    }
    if !(0.0..=1.0).contains(&resilience.jitter_ratio) {
        errors.push(ValidationError::new("resilience.jitter_ratio", "must be within 0.0..=1.0"));
    }

    if config.chat.max_user_messages == 0 {
        errors.push(ValidationError::new("chat.max_user_messages", "must be greater than 0"));
    }

    if config.tool_server.command.trim().is_empty() {
        errors.push(ValidationError::new("tool_server.command", "must not be empty"));
    }

    if config.agent.api_key.trim().is_empty() {
        errors.push(ValidationError::new(
            "agent.api_key",
            "is required (set OPENAI_API_KEY)",
        ));
    }
    if config.agent.max_tool_rounds == 0 {
        errors.push(ValidationError::new("agent.max_tool_rounds", "must be greater than 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
