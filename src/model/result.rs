//! Outcome of unlock, delete and unlock-and-delete calls.

use crate::error::UnlatchError;

/// Tagged outcome of a mutating operation.
///
/// `Cancelled` takes precedence over `Failure`: converting
/// [`UnlatchError::Cancelled`] always yields [`OperationResult::Cancelled`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    Success { message: String },
    Failure { reason: UnlatchError },
    Cancelled,
}

impl OperationResult {
    pub fn success(message: impl Into<String>) -> Self {
        OperationResult::Success {
            message: message.into(),
        }
    }

    pub fn failure(reason: UnlatchError) -> Self {
        OperationResult::from(reason)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, OperationResult::Success { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, OperationResult::Cancelled)
    }

    /// The failure reason, if any.
    pub fn reason(&self) -> Option<&UnlatchError> {
        match self {
            OperationResult::Failure { reason } => Some(reason),
            _ => None,
        }
    }

    /// Apply the cancellation precedence rule to a finished result.
    pub fn cancelled_if(self, cancelled: bool) -> Self {
        match self {
            OperationResult::Failure { .. } if cancelled => OperationResult::Cancelled,
            other => other,
        }
    }

    /// Convert into a `Result`, keeping the success message.
    pub fn into_result(self) -> crate::error::Result<String> {
        match self {
            OperationResult::Success { message } => Ok(message),
            OperationResult::Failure { reason } => Err(reason),
            OperationResult::Cancelled => Err(UnlatchError::Cancelled),
        }
    }
}

impl From<UnlatchError> for OperationResult {
    fn from(err: UnlatchError) -> Self {
        match err {
            UnlatchError::Cancelled => OperationResult::Cancelled,
            reason => OperationResult::Failure { reason },
        }
    }
}
