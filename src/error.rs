//! Errors surfaced by the segment service.
//!
//! Domain errors display as short stable strings that clients match on.
//! Store failures display as `internal error`; the underlying `sqlx::Error`
//! stays reachable through `source()` for logging.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("name empty")]
    NameEmpty,

    #[error("name taken")]
    NameTaken,

    #[error("name free")]
    NameFree,

    #[error("segment deleted")]
    AlreadyDeleted,

    #[error("bad percent")]
    BadPercent,

    #[error("bad time")]
    BadTime,

    #[error("internal error")]
    Store(#[from] sqlx::Error),
}

impl SegmentError {
    /// True for expected, user-facing failures
    pub fn is_domain(&self) -> bool {
        !matches!(self, SegmentError::Store(_))
    }

    /// Message with the underlying cause, for logs only
    pub fn detail(&self) -> String {
        match self {
            SegmentError::Store(e) => format!("{}: {}", self, e),
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SegmentError>;
