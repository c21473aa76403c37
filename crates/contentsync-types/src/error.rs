//! Error types and handling for ContentSync
//!
//! Failures are split by how far they are allowed to travel. A scan failure
//! aborts the whole run, while comparison and file operation failures are
//! recorded against a single item and the run carries on.

use std::path::PathBuf;

/// Error severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Low severity - a single item was skipped
    Low,
    /// Medium severity - operation should be retried
    Medium,
    /// High severity - the run should be aborted
    High,
    /// Critical severity - entire process should be terminated
    Critical,
}

/// Main error type for ContentSync operations
#[derive(thiserror::Error, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        /// Error message from the I/O operation
        message: String,
    },

    /// Enumerating a root directory failed
    #[error("Unable to scan {}: {message}", root.display())]
    Scan {
        /// Root that was being scanned
        root: PathBuf,
        /// Error message describing the failure
        message: String,
    },

    /// A file pair could not be compared
    #[error("Unable to compare {}: {message}", path.display())]
    Compare {
        /// Left-hand path of the pair
        path: PathBuf,
        /// Error message describing the failure
        message: String,
    },

    /// A single filesystem mutation failed
    #[error("Unable to {operation} {}: {message}", path.display())]
    FileOp {
        /// Operation verb, e.g. "copy" or "delete"
        operation: String,
        /// Path the operation targeted
        path: PathBuf,
        /// Error message describing the failure
        message: String,
    },

    /// Listing cache error
    #[error("Listing cache error: {message}")]
    Cache {
        /// Error message describing the cache issue
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Operation cancelled
    #[error("Operation cancelled")]
    Cancelled,

    /// Generic error with custom message
    #[error("{message}")]
    Other {
        /// Custom error message
        message: String,
    },
}

/// Error kind for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// I/O related errors
    Io,
    /// Directory enumeration errors
    Scan,
    /// Content comparison errors
    Compare,
    /// File operation errors
    FileOp,
    /// Listing cache errors
    Cache,
    /// Configuration errors
    Config,
    /// Cancellation
    Cancelled,
    /// Other errors
    Other,
}

impl Error {
    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } => ErrorKind::Io,
            Self::Scan { .. } => ErrorKind::Scan,
            Self::Compare { .. } => ErrorKind::Compare,
            Self::FileOp { .. } => ErrorKind::FileOp,
            Self::Cache { .. } => ErrorKind::Cache,
            Self::Config { .. } => ErrorKind::Config,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Other { .. } => ErrorKind::Other,
        }
    }

    /// Get the error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Io { .. } => ErrorSeverity::Medium,
            Self::Scan { .. } => ErrorSeverity::High,
            Self::Compare { .. } | Self::FileOp { .. } => ErrorSeverity::Low,
            Self::Cache { .. } => ErrorSeverity::Low,
            Self::Config { .. } => ErrorSeverity::High,
            Self::Cancelled => ErrorSeverity::Low,
            Self::Other { .. } => ErrorSeverity::Medium,
        }
    }

    /// Whether this error ends the whole run rather than a single item
    ///
    /// Item-level failures are logged and counted; the rest are propagated
    /// to the caller.
    pub fn aborts_run(&self) -> bool {
        self.severity() >= ErrorSeverity::High || matches!(self, Self::Io { .. })
    }

    /// Create a new scan error
    pub fn scan<P: Into<PathBuf>, S: Into<String>>(root: P, message: S) -> Self {
        Self::Scan {
            root: root.into(),
            message: message.into(),
        }
    }

    /// Create a new comparison error
    pub fn compare<P: Into<PathBuf>, S: Into<String>>(path: P, message: S) -> Self {
        Self::Compare {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new file operation error
    pub fn file_op<O, P, S>(operation: O, path: P, message: S) -> Self
    where
        O: Into<String>,
        P: Into<PathBuf>,
        S: Into<String>,
    {
        Self::FileOp {
            operation: operation.into(),
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new cache error
    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: error.to_string(),
        }
    }
}
