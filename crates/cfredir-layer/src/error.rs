use thiserror::Error;

use crate::symbols::Symbol;
use crate::translate::{ERROR_FILENAME_EXCED_RANGE, ERROR_INVALID_PARAMETER};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectError {
    /// A required entry point could not be resolved; the caller must use the
    /// legacy path instead.
    #[error("entry point {0} is unavailable")]
    SymbolUnavailable(Symbol),

    #[error("unknown creation disposition {0}")]
    InvalidDisposition(u32),

    #[error("native path of {0} bytes does not fit a UNICODE_STRING")]
    PathTooLong(usize),
}

pub type Result<T> = std::result::Result<T, RedirectError>;

impl RedirectError {
    /// Legacy error code a caller observes for this failure, or None when the
    /// failure is resolved by falling back rather than surfaced.
    pub fn legacy_error(&self) -> Option<u32> {
        match self {
            RedirectError::SymbolUnavailable(_) => None,
            RedirectError::InvalidDisposition(_) => Some(ERROR_INVALID_PARAMETER),
            RedirectError::PathTooLong(_) => Some(ERROR_FILENAME_EXCED_RANGE),
        }
    }
}
