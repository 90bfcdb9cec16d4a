use thiserror::Error;

/// Convenience alias for Results with [`OrchestratorError`]
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Taxonomy buckets from spec section 7. Retry and propagation policy are
/// decided from the `kind()`, never from matching on error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Unsupported,
    NoAvailable,
    CapabilityMismatch,
    Timeout,
    Transient,
    Fatal,
    Concurrency,
}

/// Main error type for the orchestrator core.
#[derive(Error, Debug, Clone)]
pub enum OrchestratorError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported intent action '{action}'")]
    UnsupportedIntent {
        action: String,
        supported: Vec<String>,
    },

    #[error("no available candidate: {message}")]
    NoAvailable {
        message: String,
        suggestions: Vec<String>,
    },

    #[error("capability mismatch: {0}")]
    CapabilityMismatch(String),

    #[error("operation timed out after {0}ms")]
    Timeout(u64),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("fatal failure: {0}")]
    Fatal(String),

    #[error("duplicate id: {0}")]
    DuplicateId(String),

    #[error("no handler registered for message type {0}")]
    NoHandler(String),

    #[error("unknown adapter family: {0}")]
    UnknownAdapterFamily(String),

    #[error("work queued: gate saturated ({0})")]
    Concurrency(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl OrchestratorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrchestratorError::Validation(_) => ErrorKind::Validation,
            OrchestratorError::UnsupportedIntent { .. } => ErrorKind::Unsupported,
            OrchestratorError::UnknownAdapterFamily(_) => ErrorKind::Unsupported,
            OrchestratorError::NoAvailable { .. } => ErrorKind::NoAvailable,
            OrchestratorError::CapabilityMismatch(_) => ErrorKind::CapabilityMismatch,
            OrchestratorError::Timeout(_) => ErrorKind::Timeout,
            OrchestratorError::Transient(_) => ErrorKind::Transient,
            OrchestratorError::Fatal(_) => ErrorKind::Fatal,
            OrchestratorError::DuplicateId(_) => ErrorKind::Fatal,
            OrchestratorError::NoHandler(_) => ErrorKind::Fatal,
            OrchestratorError::Concurrency(_) => ErrorKind::Concurrency,
            OrchestratorError::Configuration(_) => ErrorKind::Fatal,
            OrchestratorError::Internal(_) => ErrorKind::Fatal,
        }
    }

    /// Stable, user-visible error code per spec section 7.
    pub fn code(&self) -> &'static str {
        match self {
            OrchestratorError::Validation(_) => "VALIDATION_ERROR",
            OrchestratorError::UnsupportedIntent { .. } => "UNSUPPORTED_INTENT",
            OrchestratorError::UnknownAdapterFamily(_) => "UNSUPPORTED_INTENT",
            OrchestratorError::NoAvailable { .. } => "NO_AVAILABLE_AGENTS",
            OrchestratorError::CapabilityMismatch(_) => "CAPABILITY_MISMATCH",
            OrchestratorError::Timeout(_) => "TIMEOUT",
            OrchestratorError::Transient(_) => "MCP_EXECUTION_FAILED",
            OrchestratorError::Fatal(_) => "MCP_EXECUTION_FAILED",
            OrchestratorError::DuplicateId(_) => "DUPLICATE_ID",
            OrchestratorError::NoHandler(_) => "NO_HANDLER",
            OrchestratorError::Concurrency(_) => "MCP_EXECUTION_FAILED",
            OrchestratorError::Configuration(_) => "MCP_EXECUTION_FAILED",
            OrchestratorError::Internal(_) => "MCP_EXECUTION_FAILED",
        }
    }

    /// Whether a `TaskResult.error` built from this is recoverable, per the
    /// taxonomy's default retry semantics (not string matching).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Timeout | ErrorKind::Transient | ErrorKind::Concurrency
        )
    }
}
