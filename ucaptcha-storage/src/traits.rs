//! Storage contracts. Both are `async_trait`s so the external-KV backend
//! can await network I/O without blocking a worker thread, and both MUST
//! be safe under concurrent access from multiple request handlers.

use async_trait::async_trait;
use ucaptcha_common::error::CaptchaResult;
use ucaptcha_common::types::{Challenge, KeyPair};

/// CRUD over `KeyPair`s, plus enumeration, count and best-effort random
/// selection. Keys are persisted without TTL.
#[async_trait]
pub trait KeyStorage: Send + Sync {
    /// Full-overwrite save.
    async fn save(&self, key: &KeyPair) -> CaptchaResult<()>;
    /// Fetch a fresh snapshot by id, or `None` if absent.
    async fn get(&self, id: &str) -> CaptchaResult<Option<KeyPair>>;
    /// Remove by id. Removing an absent id is not an error.
    async fn delete(&self, id: &str) -> CaptchaResult<()>;
    /// Snapshot of every key currently stored.
    async fn list_all(&self) -> CaptchaResult<Vec<KeyPair>>;
    /// Number of keys currently stored.
    async fn count(&self) -> CaptchaResult<usize>;
    /// Best-effort random selection; any implementation that returns *a*
    /// key when the store is non-empty is acceptable — the pool manager
    /// performs true randomization where it matters.
    async fn random(&self) -> CaptchaResult<Option<KeyPair>>;
}

/// CRUD over `Challenge`s. Save is full-overwrite; `get` returns a fresh
/// snapshot. External backends SHOULD set a TTL (~5 minutes) so abandoned
/// challenges are reclaimed; the in-memory backend never expires entries
/// on its own — the challenge manager is the sole reaper.
#[async_trait]
pub trait ChallengeStorage: Send + Sync {
    /// Full-overwrite save.
    async fn save(&self, challenge: &Challenge) -> CaptchaResult<()>;
    /// Fetch a fresh snapshot by id, or `None` if absent or expired.
    async fn get(&self, id: &str) -> CaptchaResult<Option<Challenge>>;
    /// Remove by id. Removing an absent id is not an error.
    async fn delete(&self, id: &str) -> CaptchaResult<()>;
}
