//! Agent error types.
//!
//! All agent subsystems surface errors through [`AgentError`].  Only a few
//! variants ever escape a loop run: gateway unavailability, cancellation and
//! deadline expiry.  Tool-level failures are folded into observations by the
//! runtime and never reach the caller.

/// Unified error type for the agent runtime.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    // -- LLM errors ----------------------------------------------------------
    /// An HTTP request to the LLM provider failed.
    #[error("llm request failed: {reason}")]
    LlmRequestFailed { reason: String },

    /// The LLM response could not be parsed into the expected format.
    #[error("llm response parse error: {reason}")]
    LlmParseFailed { reason: String },

    /// The API key is missing for a provider that requires one.
    #[error("missing api key for provider: {provider}")]
    MissingApiKey { provider: String },

    /// No backend in the provider chain has a credential.
    #[error("no model backend configured (set one of: {expected})")]
    NoBackendConfigured { expected: String },

    /// Every configured backend was tried and every one failed.
    #[error("all model backends failed: {}", .attempts.join("; "))]
    AllBackendsFailed { attempts: Vec<String> },

    // -- Tool errors ---------------------------------------------------------
    /// A tool invocation failed.
    #[error("tool execution failed for `{tool_name}`: {reason}")]
    ToolExecutionFailed { tool_name: String, reason: String },

    /// Two tools with the same name were registered in one registry.
    #[error("duplicate tool name: {tool_name}")]
    DuplicateTool { tool_name: String },

    // -- Runtime errors ------------------------------------------------------
    /// The run was cancelled through its cancellation token.
    #[error("agent run cancelled")]
    Cancelled,

    /// The run did not finish before its deadline.
    #[error("agent run exceeded its deadline of {millis}ms")]
    DeadlineExceeded { millis: u64 },

    // -- Configuration errors ------------------------------------------------
    /// Configuration validation or loading failed.
    #[error("config error: {reason}")]
    ConfigError { reason: String },

    /// Validation failed for input data.
    #[error("validation error: {reason}")]
    ValidationError { reason: String },
}

/// Convenience alias used throughout the agent crate.
pub type Result<T> = std::result::Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_backends_failed_joins_attempts() {
        let err = AgentError::AllBackendsFailed {
            attempts: vec!["anthropic: 401".into(), "openai: timeout".into()],
        };
        assert_eq!(
            err.to_string(),
            "all model backends failed: anthropic: 401; openai: timeout"
        );
    }

    #[test]
    fn no_backend_names_expected_configuration() {
        let err = AgentError::NoBackendConfigured {
            expected: "ANTHROPIC_API_KEY, OPENAI_API_KEY".into(),
        };
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn sub_second_deadline_is_reported_in_millis() {
        let err = AgentError::DeadlineExceeded { millis: 250 };
        assert_eq!(err.to_string(), "agent run exceeded its deadline of 250ms");
    }
}
