//! Uniform operation outcome
//!
//! Orchestrator-level operations never hand raw errors back to callers.
//! They return an [`OpResult`] so business failures (wrong passphrase, no
//! cloud backups) are ordinary values that every call site must match on.

use crate::error::{VaultError, VaultResult};

/// Outcome of a backup-level operation
#[derive(Debug)]
#[must_use]
pub enum OpResult<T> {
    /// The operation completed
    Success(T),
    /// The operation failed with a typed error
    Error(VaultError),
    /// A collaborator has not finished yet (e.g. a remote listing still syncing)
    Pending,
}

impl<T> OpResult<T> {
    /// Whether this is a success
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Whether this is an error
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Borrow the error, if any
    pub fn error(&self) -> Option<&VaultError> {
        match self {
            Self::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Transform the success value
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> OpResult<U> {
        match self {
            Self::Success(value) => OpResult::Success(f(value)),
            Self::Error(e) => OpResult::Error(e),
            Self::Pending => OpResult::Pending,
        }
    }

    /// Convert into a plain `Result`, treating `Pending` as `None`
    pub fn into_result(self) -> VaultResult<Option<T>> {
        match self {
            Self::Success(value) => Ok(Some(value)),
            Self::Error(e) => Err(e),
            Self::Pending => Ok(None),
        }
    }
}

impl<T> From<VaultResult<T>> for OpResult<T> {
    fn from(result: VaultResult<T>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(e) => Self::Error(e),
        }
    }
}
