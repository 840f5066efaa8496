use ethers::types::Bytes;
use thiserror::Error;

/// Safe account errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SafeAccountError {
    /// Malformed or out of range input, detected before any encoding happens
    #[error("validation error: {inner}")]
    Validation {
        /// The inner error message
        inner: String,
    },

    /// Data that can't be decoded (unknown executor, truncated multisend payload ...)
    #[error("bad data: {inner} (data: {data})")]
    BadData {
        /// The inner error message
        inner: String,
        /// The offending bytes
        data: Bytes,
    },

    /// A value is neither overridden nor obtainable because no provider was supplied
    #[error("{field} is not overridden and no provider was supplied")]
    MissingProvider {
        /// The value that could not be resolved
        field: String,
    },

    /// Provider (node, bundler) error
    #[error("provider error: {inner}")]
    Provider {
        /// The inner error message
        inner: String,
    },

    /// ABI error
    #[error("abi error: {inner}")]
    Abi {
        /// The inner error message
        inner: String,
    },
}

impl SafeAccountError {
    pub fn validation(inner: impl Into<String>) -> Self {
        Self::Validation { inner: inner.into() }
    }

    pub fn bad_data(inner: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self::BadData { inner: inner.into(), data: data.into() }
    }

    pub fn missing_provider(field: impl Into<String>) -> Self {
        Self::MissingProvider { field: field.into() }
    }

    pub fn provider(inner: impl ToString) -> Self {
        Self::Provider { inner: inner.to_string() }
    }
}

impl From<ethers::abi::Error> for SafeAccountError {
    fn from(err: ethers::abi::Error) -> Self {
        Self::Abi { inner: err.to_string() }
    }
}

pub type SafeAccountResult<T> = Result<T, SafeAccountError>;
