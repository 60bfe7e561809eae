//! # uCaptcha Common
//!
//! Shared error types, configuration loading, the arbitrary-precision
//! arithmetic facade, and the id/random-sampling utilities used by every
//! other uCaptcha crate. This crate has no dependency on any other crate
//! in the workspace, preventing circular dependencies.
//!
//! ## Modules
//!
//! - **arithmetic**: a `rug::Integer`-backed facade (`mod_exp`, rejection
//!   sampling, primality testing) so callers never touch GMP directly.
//! - **random**: challenge id generation and quadratic-residue puzzle base
//!   sampling.
//! - **error**: the crate-wide `CaptchaError` enum and `VerifyStatus`.
//! - **config**: layered YAML + environment configuration.

#![warn(missing_docs)]

pub mod arithmetic;
pub mod config;
pub mod error;
pub mod random;
pub mod time;
pub mod types;

/// Re-export of commonly used types.
pub mod prelude {
    pub use crate::arithmetic::BigUint;
    pub use crate::config::{Config, RedisConfig, StorageBackend};
    pub use crate::error::{CaptchaError, CaptchaResult, VerifyStatus};
    pub use crate::random::{generate_challenge_id, generate_valid_g, is_valid_challenge_id};
    pub use crate::time::unix_now;
    pub use crate::types::{Challenge, ChallengeView, KeyPair, RsaComponents};
}

/// uCaptcha Common crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
