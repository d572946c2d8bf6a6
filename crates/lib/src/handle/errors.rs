//! Error types for user handle operations
use thiserror::Error;

use super::Tier;

/// Errors raised by tier-inappropriate handle operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum HandleError {
    /// The operation needs a backing user record, which only logged-in
    /// handles carry.
    #[error("'{operation}' requires a logged-in handle, this one is {tier:?}")]
    NoProfile {
        /// The operation that was attempted
        operation: &'static str,
        /// The handle's actual tier
        tier: Tier,
    },
}

impl From<HandleError> for crate::Error {
    fn from(err: HandleError) -> Self {
        crate::Error::Handle(err)
    }
}
