//! Error types for the parameter filters
use thiserror::Error;

/// Errors raised by a field filter before any backend call is made.
///
/// A filter failure is always all-or-nothing: no partial sub-record is
/// produced, and nothing has been forwarded to a collaborator.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum FilterError {
    /// A required field is absent from the input record.
    #[error("{filter} record is missing required field '{field}'")]
    MissingField {
        /// Name of the filter that rejected the record
        filter: &'static str,
        /// The required field that was absent
        field: &'static str,
    },

    /// A required field is present but null or empty.
    #[error("{filter} record has empty required field '{field}'")]
    EmptyField {
        filter: &'static str,
        field: &'static str,
    },

    /// A required field is present but not a string value.
    #[error("{filter} record field '{field}' must be a string")]
    NotAString {
        filter: &'static str,
        field: &'static str,
    },
}

impl FilterError {
    /// The filter that produced this error.
    pub fn filter(&self) -> &'static str {
        match self {
            FilterError::MissingField { filter, .. }
            | FilterError::EmptyField { filter, .. }
            | FilterError::NotAString { filter, .. } => filter,
        }
    }

    /// The field this error is about.
    pub fn field(&self) -> &'static str {
        match self {
            FilterError::MissingField { field, .. }
            | FilterError::EmptyField { field, .. }
            | FilterError::NotAString { field, .. } => field,
        }
    }
}

impl From<FilterError> for crate::Error {
    fn from(err: FilterError) -> Self {
        crate::Error::Filter(err)
    }
}
