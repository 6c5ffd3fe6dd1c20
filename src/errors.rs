use thiserror::Error;

/// Stable error categories surfaced to transport layers.
///
/// Every [`Error`] maps onto exactly one kind so a gRPC or HTTP adapter can
/// pick a status code without matching on messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Absence type, leave request or allowance missing
    NotFound,
    /// Duplicate allowance tuple or absence type name
    AlreadyExists,
    /// End date before start date
    InvalidDateRange,
    /// Another non-terminal request intersects the range
    OverlapExists,
    /// No allowance row, or not enough days remaining
    InsufficientAllowance,
    /// Illegal transition or malformed input
    BadRequest,
    /// Store, gateway or configuration failure
    Internal,
}

/// Unified error type for the leave service.
#[derive(Debug, Error)]
pub enum Error {
    /// An entity could not be found in the caller's tenant
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind, e.g. "leave request"
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Unique constraint on a configuration entity
    #[error("{message}")]
    AlreadyExists {
        /// Which uniqueness rule was hit
        message: String,
    },

    /// Deleting an absence type that leave requests still reference
    #[error("absence type has {count} leave requests")]
    AbsenceTypeInUse {
        /// Number of referencing requests
        count: u64,
    },

    /// End date precedes start date
    #[error("end date must not be before start date")]
    InvalidDateRange,

    /// The requested range intersects an existing non-terminal request
    #[error("overlapping leave request exists for this period")]
    OverlapExists,

    /// No allowance row exists for the user, type and year
    #[error("no leave allowance configured for this type and year")]
    NoAllowance,

    /// Requested days exceed what remains on the allowance
    #[error("insufficient allowance: {requested:.1} days requested, {remaining:.1} days remaining")]
    InsufficientAllowance {
        /// Days the request would consume
        requested: f64,
        /// Days left on the allowance
        remaining: f64,
    },

    /// Illegal state transition or invalid input
    #[error("{message}")]
    BadRequest {
        /// Human-readable reason
        message: String,
    },

    /// Failure that is not otherwise classified (e.g. signing gateway)
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable reason
        message: String,
    },

    /// Configuration file or environment problem
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Any error bubbling up from the record store
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Malformed JSON on the event feed or in metadata
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error while reading configuration or the feed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a bad-request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Shorthand for an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// The stable category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::InvalidDateRange => ErrorKind::InvalidDateRange,
            Self::OverlapExists => ErrorKind::OverlapExists,
            Self::NoAllowance | Self::InsufficientAllowance { .. } => {
                ErrorKind::InsufficientAllowance
            }
            Self::BadRequest { .. } | Self::AbsenceTypeInUse { .. } => ErrorKind::BadRequest,
            Self::Internal { .. }
            | Self::Config { .. }
            | Self::Database(_)
            | Self::Serialization(_)
            | Self::Io(_) => ErrorKind::Internal,
        }
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_distinct_for_domain_errors() {
        assert_eq!(
            Error::NotFound {
                entity: "leave request",
                id: "x".to_string()
            }
            .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(Error::OverlapExists.kind(), ErrorKind::OverlapExists);
        assert_eq!(Error::NoAllowance.kind(), ErrorKind::InsufficientAllowance);
        assert_eq!(
            Error::InsufficientAllowance {
                requested: 3.0,
                remaining: 1.0
            }
            .kind(),
            ErrorKind::InsufficientAllowance
        );
        assert_eq!(Error::bad_request("nope").kind(), ErrorKind::BadRequest);
        assert_eq!(
            Error::Database(sea_orm::DbErr::Custom("boom".to_string())).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_insufficient_allowance_message() {
        let err = Error::InsufficientAllowance {
            requested: 3.0,
            remaining: 1.5,
        };
        assert_eq!(
            err.to_string(),
            "insufficient allowance: 3.0 days requested, 1.5 days remaining"
        );
    }
}
