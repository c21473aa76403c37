//! Result type alias for ContentSync operations

use crate::Error;

/// Result type alias for ContentSync operations
pub type Result<T> = std::result::Result<T, Error>;
