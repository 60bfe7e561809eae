//! Standardized error types shared across the uCaptcha crates.

use thiserror::Error;

/// Standard result type used throughout uCaptcha.
pub type CaptchaResult<T> = std::result::Result<T, CaptchaError>;

/// The four client-observable verification outcomes, plus `Success`,
/// collapsed into the numeric status codes the HTTP layer maps to
/// response codes (see the HTTP surface table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyStatus {
    /// `y` matches the expected residues; status 1, HTTP 200.
    Success,
    /// `y` does not match; status 0, HTTP 401.
    Failure,
    /// No challenge with that id; status 2, HTTP 404.
    ChallengeNotFound,
    /// `y` did not parse as a base-10 non-negative integer; status 3, HTTP 400.
    InvalidY,
    /// The key the challenge was bound to has been rotated out; status 4, HTTP 500.
    KeyMissing,
}

impl VerifyStatus {
    /// The numeric status code used in the original wire protocol and in tests.
    pub fn code(self) -> i8 {
        match self {
            VerifyStatus::Failure => 0,
            VerifyStatus::Success => 1,
            VerifyStatus::ChallengeNotFound => 2,
            VerifyStatus::InvalidY => 3,
            VerifyStatus::KeyMissing => 4,
        }
    }
}

/// Comprehensive error type for all uCaptcha operations.
#[derive(Error, Debug)]
pub enum CaptchaError {
    /// A storage backend (memory or Redis) failed to complete an operation.
    #[error("storage error: {0}")]
    StorageFailure(String),

    /// The key pool is empty and a new key could not be generated.
    #[error("no key available")]
    NoKeyAvailable,

    /// RSA key generation (safe-prime search) failed.
    #[error("key generation failed: {0}")]
    KeyGenerationFailed(String),

    /// A caller-supplied parameter was out of range (e.g. `n <= 4`).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Configuration failed to load or validate.
    #[error("config error: {0}")]
    Config(String),

    /// Redis client error.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// JSON (de)serialization error.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for errors from libraries without a dedicated variant.
    #[error("external error: {0}")]
    External(#[from] anyhow::Error),
}

impl CaptchaError {
    /// Construct a [`CaptchaError::StorageFailure`] from any displayable error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StorageFailure(msg.into())
    }

    /// Construct a [`CaptchaError::KeyGenerationFailed`].
    pub fn key_generation(msg: impl Into<String>) -> Self {
        Self::KeyGenerationFailed(msg.into())
    }

    /// Construct a [`CaptchaError::InvalidParameter`].
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Construct a [`CaptchaError::Config`].
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Convenience macro for creating [`CaptchaError`] instances.
#[macro_export]
macro_rules! captcha_error {
    ($variant:ident, $($arg:tt)*) => {
        $crate::error::CaptchaError::$variant(format!($($arg)*))
    };
}

/// Convenience macro for returning early with a [`CaptchaError`].
#[macro_export]
macro_rules! captcha_bail {
    ($variant:ident, $($arg:tt)*) => {
        return Err($crate::captcha_error!($variant, $($arg)*))
    };
}
