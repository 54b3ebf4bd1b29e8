//! User-facing text for degraded outcomes.
//!
//! Errors are mapped by kind first. Only invocation and unclassified errors,
//! whose cause is known only from their message, fall back to keyword
//! matching. Raw error text is returned only by the generic advisory.

use crate::error::{ErrorKind, ServiceError};

pub const SLOW_SERVICE: &str = "The task service is taking longer than expected to respond. \
    Please try again in a moment.";

pub const CIRCUIT_OPEN: &str = "The task service is temporarily unavailable after repeated failures. \
    Please try again in about a minute.";

pub const CONNECTION: &str = "I'm having trouble connecting to the task service right now. \
    Please try again shortly.";

pub const INVALID_CONFIGURATION: &str = "The task service is not configured correctly. \
    Please contact support if this continues.";

pub const TECHNICAL_DIFFICULTIES: &str = "I'm sorry, I'm experiencing technical difficulties right now. \
    Please try again later.";

/// Category of a degraded response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    CircuitOpen,
    Timeout,
    Connection,
    InvalidConfiguration,
    Generic,
}

impl Advisory {
    /// Response text, with `detail` appended only for [`Advisory::Generic`].
    pub fn message(self, detail: &str) -> String {
        match self {
            Advisory::CircuitOpen => CIRCUIT_OPEN.to_string(),
            Advisory::Timeout => SLOW_SERVICE.to_string(),
            Advisory::Connection => CONNECTION.to_string(),
            Advisory::InvalidConfiguration => INVALID_CONFIGURATION.to_string(),
            Advisory::Generic => format!(
                "I'm sorry, I couldn't complete your request. Please try again. (Details: {detail})"
            ),
        }
    }
}

pub fn limit_reached(max: usize) -> String {
    format!(
        "This conversation has reached the maximum limit of {max} user messages. \
         Please start a new conversation."
    )
}

pub fn classify(err: &ServiceError) -> Advisory {
    match err.kind() {
        ErrorKind::ServiceUnavailable => Advisory::CircuitOpen,
        ErrorKind::OperationTimeout => Advisory::Timeout,
        ErrorKind::ConnectionFailed => Advisory::Connection,
        ErrorKind::ConfigurationError => Advisory::InvalidConfiguration,
        ErrorKind::InvocationError | ErrorKind::Unclassified => classify_message(&err.to_string()),
    }
}

/// Case-insensitive keyword classification of an error message.
pub fn classify_message(message: &str) -> Advisory {
    let lower = message.to_lowercase();
    if lower.contains("circuit breaker") || lower.contains("unavailable") {
        Advisory::CircuitOpen
    } else if lower.contains("timeout") || lower.contains("timed out") {
        Advisory::Timeout
    } else if lower.contains("connection") || lower.contains("connect") {
        Advisory::Connection
    } else if lower.contains("invalid url") || lower.contains("configuration") {
        Advisory::InvalidConfiguration
    } else {
        Advisory::Generic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::CircuitState;
    use crate::tools::ToolError;

    #[test]
    fn test_typed_kinds() {
        let cases = [
            (ServiceError::ServiceUnavailable { state: CircuitState::Open }, Advisory::CircuitOpen),
            (ServiceError::OperationTimeout { secs: 180 }, Advisory::Timeout),
            (
                ServiceError::ConnectionFailed {
                    attempts: 3,
                    source: ToolError::Spawn("No such file or directory".into()),
                },
                Advisory::Connection,
            ),
            (ServiceError::Configuration("relative URL without a base".into()), Advisory::InvalidConfiguration),
        ];
        for (err, expected) in cases {
            assert_eq!(classify(&err), expected, "{err}");
        }
    }

    #[test]
    fn test_message_fallback() {
        assert_eq!(
            classify(&ServiceError::Invocation("Model API error: Connection reset by peer".into())),
            Advisory::Connection
        );
        assert_eq!(
            classify(&ServiceError::Unclassified("request TIMED OUT upstream".into())),
            Advisory::Timeout
        );
        assert_eq!(
            classify(&ServiceError::Invocation("Model API error: 429 rate limited".into())),
            Advisory::Generic
        );
        assert_eq!(classify_message("Invalid URL: missing scheme"), Advisory::InvalidConfiguration);
    }

    #[test]
    fn test_only_generic_carries_detail() {
        assert_eq!(Advisory::Connection.message("secret internals"), CONNECTION);
        let generic = Advisory::Generic.message("boom");
        assert!(generic.starts_with("I'm sorry, I couldn't complete your request."));
        assert!(generic.ends_with("(Details: boom)"));
    }

    #[test]
    fn test_limit_text() {
        assert_eq!(
            limit_reached(5),
            "This conversation has reached the maximum limit of 5 user messages. Please start a new conversation."
        );
    }
}
