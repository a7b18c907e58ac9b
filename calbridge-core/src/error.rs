//! Error types for calbridge.

use thiserror::Error;

/// Boxed cause carried by [`CalendarError::Runtime`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while building calendars or converting them.
#[derive(Error, Debug)]
pub enum CalendarError {
    /// Bad or missing input: empty calendar name, unknown source, a kind
    /// registered under the wrong contract, unknown converter format.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An underlying failure while fetching, building or converting.
    #[error("{context}. Reason: {source}")]
    Runtime {
        context: String,
        #[source]
        source: BoxError,
    },

    #[error("Calendar '{calendar}' has no source named '{name}'")]
    UnknownSource { calendar: String, name: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CalendarError {
    pub fn runtime(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        CalendarError::Runtime {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, CalendarError::InvalidArgument(_))
    }

    pub fn is_runtime(&self) -> bool {
        matches!(self, CalendarError::Runtime { .. })
    }
}

impl From<serde_json::Error> for CalendarError {
    fn from(e: serde_json::Error) -> Self {
        CalendarError::Serialization(e.to_string())
    }
}

/// Result type alias for calbridge operations.
pub type CalendarResult<T> = Result<T, CalendarError>;
