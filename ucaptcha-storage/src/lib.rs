//! # uCaptcha Storage
//!
//! The [`KeyStorage`] and [`ChallengeStorage`] contracts, plus two
//! implementations of each: an in-memory backend for single-process
//! deployments and tests, and a Redis-backed external backend for
//! multi-process deployments that need shared, TTL-bounded storage.

#![warn(missing_docs)]

pub mod memory;
pub mod redis_backend;
pub mod traits;

pub use memory::{MemoryChallengeStorage, MemoryKeyStorage};
pub use redis_backend::{RedisChallengeStorage, RedisKeyStorage};
pub use traits::{ChallengeStorage, KeyStorage};

use std::sync::Arc;
use ucaptcha_common::config::{Config, StorageBackend};
use ucaptcha_common::error::CaptchaResult;

/// Build the configured key storage backend as a trait object.
pub fn build_key_storage(config: &Config) -> CaptchaResult<Arc<dyn KeyStorage>> {
    Ok(match config.keys_storage {
        StorageBackend::Memory => Arc::new(MemoryKeyStorage::new()),
        StorageBackend::Redis => Arc::new(RedisKeyStorage::new(&config.redis)?),
    })
}

/// Build the configured challenge storage backend as a trait object.
pub fn build_challenge_storage(config: &Config) -> CaptchaResult<Arc<dyn ChallengeStorage>> {
    Ok(match config.challenge_storage {
        StorageBackend::Memory => Arc::new(MemoryChallengeStorage::new()),
        StorageBackend::Redis => Arc::new(RedisChallengeStorage::new(&config.redis)?),
    })
}
