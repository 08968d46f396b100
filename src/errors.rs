use thiserror::Error;

/// Every failure the generation pipeline can hand back to its caller.
///
/// The display text is what the UI shows verbatim; `retryable` tells it whether
/// the same request may be resubmitted as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("{0}")] Validation(String),
    #[error("{0}")] Configuration(String),
    #[error("AI returned an invalid response. Please try again.")] Parse { detail: String },
    #[error("AI response was missing required fields ({missing}). Please try again.")] Schema { missing: String },
    #[error("{0}")] Unexpected(String),
}

impl GenerationError {
    pub fn missing_fields() -> Self {
        GenerationError::Validation("Missing required fields".into())
    }

    pub fn retryable(&self) -> bool {
        matches!(self, GenerationError::Parse { .. } | GenerationError::Schema { .. })
    }

    pub fn status_code(&self) -> u16 {
        match self {
            GenerationError::Validation(_) => 400,
            _ => 500,
        }
    }

    /// Underlying parser message for parse failures; not shown to users.
    pub fn detail(&self) -> Option<&str> {
        match self {
            GenerationError::Parse { detail } => Some(detail.as_str()),
            _ => None,
        }
    }

    /// Short machine-friendly name, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::Validation(_) => "validation",
            GenerationError::Configuration(_) => "configuration",
            GenerationError::Parse { .. } => "parse",
            GenerationError::Schema { .. } => "schema",
            GenerationError::Unexpected(_) => "unexpected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_model_output_failures_are_retryable() {
        assert!(GenerationError::Parse { detail: "eof".into() }.retryable());
        assert!(GenerationError::Schema { missing: "pages".into() }.retryable());
        assert!(!GenerationError::missing_fields().retryable());
        assert!(!GenerationError::Configuration("no key".into()).retryable());
        assert!(!GenerationError::Unexpected("timeout".into()).retryable());
    }

    #[test]
    fn validation_maps_to_bad_request() {
        assert_eq!(GenerationError::missing_fields().status_code(), 400);
        assert_eq!(GenerationError::Unexpected("x".into()).status_code(), 500);
        assert_eq!(GenerationError::missing_fields().to_string(), "Missing required fields");
    }

    #[test]
    fn parse_error_message_is_user_facing() {
        let err = GenerationError::Parse { detail: "expected value at line 1".into() };
        assert!(err.to_string().starts_with("AI returned an invalid response"));
    }
}
