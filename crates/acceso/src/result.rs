//! Result and error types for Acceso.

use thiserror::Error;

/// Result type for Acceso operations
pub type AccesoResult<T> = Result<T, AccesoError>;

/// How a failure should be reported to the runner.
///
/// Every [`AccesoError`] maps onto exactly one kind via [`AccesoError::kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// A fixture could not reach its ready state; dependent tests must abort.
    Setup,
    /// An expected condition was false.
    Assertion,
    /// A bounded wait was exceeded.
    Timeout,
    /// Fixture data missing, malformed, or indexed out of range.
    Data,
    /// Environment profile missing or malformed.
    Config,
    /// The browser driver failed (launch, navigation, evaluation).
    Driver,
    /// The HTTP transport failed before a response existed.
    Transport,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Setup => "setup",
            Self::Assertion => "assertion",
            Self::Timeout => "timeout",
            Self::Data => "data",
            Self::Config => "config",
            Self::Driver => "driver",
            Self::Transport => "transport",
        };
        f.write_str(name)
    }
}

/// Errors that can occur in Acceso
#[derive(Debug, Error)]
pub enum AccesoError {
    /// Fixture data file does not exist
    #[error("Test data file not found: {path}")]
    NotFound {
        /// Path that was looked up
        path: String,
    },

    /// Fixture data is not valid for the expected shape
    #[error("Test data file {path} is malformed: {message}")]
    Parse {
        /// Path of the offending file
        path: String,
        /// Parser message
        message: String,
    },

    /// Requested record index exceeds the set length
    #[error("Index {index} out of range for {set} users (len {len})")]
    IndexOutOfRange {
        /// Which set was indexed ("valid" or "invalid")
        set: &'static str,
        /// Requested index
        index: usize,
        /// Set length at the time of the request
        len: usize,
    },

    /// Bounded wait exceeded
    #[error("Timed out after {ms}ms waiting to {action} {target}")]
    Timeout {
        /// What was being attempted (e.g. "click", "reach URL")
        action: String,
        /// What was awaited (locator name or URL pattern)
        target: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Assertion failed
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// Fixture setup failed; the wrapped error says why
    #[error("Fixture '{fixture}' setup failed: {source}")]
    SetupFailed {
        /// Fixture name
        fixture: String,
        /// Underlying failure
        #[source]
        source: Box<AccesoError>,
    },

    /// Fixture teardown failed
    #[error("Fixture '{fixture}' teardown failed: {message}")]
    TeardownFailed {
        /// Fixture name
        fixture: String,
        /// Error message
        message: String,
    },

    /// Page object asked for a locator it never registered
    #[error("Locator '{name}' is not registered on {page}")]
    UnknownLocator {
        /// Page name
        page: String,
        /// Locator name
        name: String,
    },

    /// Environment profile error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Driver-level failure while talking to the page
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Caller supplied a header that is not valid HTTP
    #[error("Invalid header {name}: {message}")]
    InvalidHeader {
        /// Header name as supplied
        name: String,
        /// Error message
        message: String,
    },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AccesoError {
    /// Classify this error for reporting.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::SetupFailed { .. } | Self::TeardownFailed { .. } => FailureKind::Setup,
            Self::AssertionFailed { .. } => FailureKind::Assertion,
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::NotFound { .. } | Self::Parse { .. } | Self::IndexOutOfRange { .. } => {
                FailureKind::Data
            }
            Self::Config { .. } => FailureKind::Config,
            Self::BrowserLaunch { .. }
            | Self::Navigation { .. }
            | Self::Driver { .. }
            | Self::UnknownLocator { .. } => FailureKind::Driver,
            Self::Http(_) | Self::InvalidHeader { .. } => FailureKind::Transport,
            Self::Io(_) | Self::Json(_) => FailureKind::Data,
        }
    }

    /// Build a timeout error.
    pub fn timeout(action: impl Into<String>, target: impl Into<String>, ms: u64) -> Self {
        Self::Timeout {
            action: action.into(),
            target: target.into(),
            ms,
        }
    }

    /// Build an assertion failure.
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Wrap an error as a setup failure of the named fixture.
    pub fn setup(fixture: impl Into<String>, source: Self) -> Self {
        Self::SetupFailed {
            fixture: fixture.into(),
            source: Box::new(source),
        }
    }

    /// Build a driver error.
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }
}
