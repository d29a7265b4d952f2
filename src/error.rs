//! Custom error types for finvault
//!
//! This module defines the error hierarchy using thiserror. Every failure is
//! also classified into an [`ErrorCategory`] so callers can pick the right
//! remediation (re-enter a passphrase, pick another file, retry later).

use thiserror::Error;

/// Security failures with stable, user-facing messages
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityError {
    /// No explicit passphrase and none stored
    #[error("Backup passphrase not set")]
    PassphraseNotSet,

    /// AEAD tag check failed: wrong passphrase or tampered ciphertext
    #[error("Wrong passphrase or corrupted backup")]
    AuthenticationFailed,

    /// Decrypted plaintext does not match the stored digest
    #[error("Backup checksum mismatch")]
    ChecksumMismatch,
}

/// Coarse error taxonomy exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Security,
    Network,
    Unknown,
}

/// The main error type for finvault operations
#[derive(Error, Debug)]
pub enum VaultError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Malformed envelopes, unsupported versions, bad import payloads
    #[error("Validation error: {0}")]
    Validation(String),

    /// Passphrase and integrity failures
    #[error("Security error: {0}")]
    Security(#[from] SecurityError),

    /// Remote backup store failures
    #[error("Network error: {0}")]
    Network(String),

    /// Data store and secure store failures
    #[error("Storage error: {0}")]
    Storage(String),

    /// Anything unanticipated, with the original cause preserved
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl VaultError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Classify this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Security(_) => ErrorCategory::Security,
            Self::Network(_) => ErrorCategory::Network,
            Self::Config(_) | Self::Io(_) | Self::Json(_) | Self::Storage(_) | Self::Unknown(_) => {
                ErrorCategory::Unknown
            }
        }
    }

    /// Check if this is a security error
    pub fn is_security(&self) -> bool {
        matches!(self, Self::Security(_))
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// The security reason, if any
    pub fn security_reason(&self) -> Option<SecurityError> {
        match self {
            Self::Security(reason) => Some(*reason),
            _ => None,
        }
    }
}

impl From<std::io::Error> for VaultError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<tokio::task::JoinError> for VaultError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Unknown(format!("Background task failed: {}", err))
    }
}

/// Result type alias for finvault operations
pub type VaultResult<T> = Result<T, VaultError>;
