//! Challenge lifecycle: issuance, persistence, and one-shot verification.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use tracing::{info, warn};
use ucaptcha_common::arithmetic::BigUint;
use ucaptcha_common::error::{CaptchaError, CaptchaResult, VerifyStatus};
use ucaptcha_common::random::{generate_challenge_id, generate_valid_g};
use ucaptcha_common::time::unix_now;
use ucaptcha_common::types::{Challenge, ChallengeView};
use ucaptcha_keys::KeyPoolManager;
use ucaptcha_storage::ChallengeStorage;

use crate::verify::fast_verify;

/// Issues and verifies RSW time-lock puzzle challenges.
///
/// Holds a challenge store, a reference to the key pool manager (for
/// pulling a random key to bind a new challenge to, and for resolving a
/// challenge's bound key by id at verification time), and the
/// process-wide default difficulty as an atomic so `PUT /difficulty` can
/// update it without synchronizing with in-flight requests.
pub struct ChallengeManager {
    challenge_storage: Arc<dyn ChallengeStorage>,
    key_pool: Arc<KeyPoolManager>,
    default_difficulty: AtomicI64,
}

impl ChallengeManager {
    /// Build a challenge manager over the given challenge store and key
    /// pool, with the given starting default difficulty.
    pub fn new(
        challenge_storage: Arc<dyn ChallengeStorage>,
        key_pool: Arc<KeyPoolManager>,
        default_difficulty: i64,
    ) -> Self {
        Self {
            challenge_storage,
            key_pool,
            default_difficulty: AtomicI64::new(default_difficulty),
        }
    }

    /// The difficulty currently used by `new_challenge` calls that omit an
    /// explicit value.
    pub fn default_difficulty(&self) -> i64 {
        self.default_difficulty.load(Ordering::Relaxed)
    }

    /// Atomically update the process-wide default difficulty. Existing
    /// challenges are unaffected; only subsequent `new_challenge` calls
    /// that omit an explicit difficulty observe the new value.
    pub fn set_default_difficulty(&self, t: i64) {
        self.default_difficulty.store(t, Ordering::Relaxed);
    }

    /// Issue a new challenge bound to a randomly-selected (or freshly
    /// generated, if the pool is empty) key.
    ///
    /// `difficulty` overrides the process-wide default for this challenge
    /// only. Secret material (`p`, `q`) and even the bound `key_id` never
    /// leave this function; only the public view is returned.
    pub async fn new_challenge(&self, difficulty: Option<i64>) -> CaptchaResult<ChallengeView> {
        let key = self.key_pool.get_random().await.map_err(|e| {
            warn!(error = %e, "failed to obtain a key for a new challenge");
            CaptchaError::NoKeyAvailable
        })?;

        let id = generate_challenge_id();
        let g = generate_valid_g(&key.components.n)?;
        let t = difficulty.unwrap_or_else(|| self.default_difficulty());
        if t < 0 {
            return Err(CaptchaError::invalid_parameter(
                "difficulty must be non-negative",
            ));
        }

        let challenge = Challenge {
            id,
            g,
            n: key.components.n.clone(),
            t,
            created_at: unix_now(),
            key_id: key.id.clone(),
        };

        self.challenge_storage.save(&challenge).await?;
        info!(challenge_id = %challenge.id, key_id = %challenge.key_id, t = challenge.t, "issued challenge");

        Ok(ChallengeView::from(&challenge))
    }

    /// Verify a client's solution `y_str` (a base-10 non-negative integer)
    /// against the challenge identified by `id`.
    ///
    /// On a terminal outcome (`Success` or `Failure`) the challenge record
    /// is deleted unconditionally, giving at-most-one verification attempt
    /// semantics; `InvalidY` and `KeyMissing` leave the record in place so
    /// the client may retry with corrected input while the challenge's TTL
    /// still holds. Storage delete errors after a terminal outcome are
    /// logged, never surfaced — the verification result already computed
    /// is authoritative.
    pub async fn verify_challenge(&self, id: &str, y_str: &str) -> CaptchaResult<VerifyStatus> {
        let challenge = match self.challenge_storage.get(id).await? {
            Some(c) => c,
            None => return Ok(VerifyStatus::ChallengeNotFound),
        };

        let key = self.key_pool.get(&challenge.key_id).await?;
        let key = match key {
            Some(k) => k,
            None => {
                warn!(challenge_id = %id, key_id = %challenge.key_id, "challenge's key was rotated out before verification");
                return Ok(VerifyStatus::KeyMissing);
            }
        };

        let y = match BigUint::from_decimal_str(y_str) {
            Ok(y) => y,
            Err(_) => return Ok(VerifyStatus::InvalidY),
        };

        let status = if fast_verify(&key.components, &challenge.g, challenge.t, &y) {
            VerifyStatus::Success
        } else {
            VerifyStatus::Failure
        };

        if let Err(e) = self.challenge_storage.delete(id).await {
            warn!(challenge_id = %id, error = %e, "failed to delete challenge after verification");
        }
        info!(challenge_id = %id, status = status.code(), "verified challenge");

        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ucaptcha_storage::{MemoryChallengeStorage, MemoryKeyStorage};

    fn manager() -> (ChallengeManager, Arc<KeyPoolManager>) {
        let key_storage = Arc::new(MemoryKeyStorage::new());
        let pool = Arc::new(KeyPoolManager::new(key_storage, 512));
        let challenges = Arc::new(MemoryChallengeStorage::new());
        let mgr = ChallengeManager::new(challenges, pool.clone(), 1_000);
        (mgr, pool)
    }

    #[tokio::test]
    async fn happy_path_success_then_consumed() {
        let (mgr, pool) = manager();
        pool.add_key().await.unwrap();
        let view = mgr.new_challenge(Some(5)).await.unwrap();

        let mut y = view.g.clone();
        for _ in 0..5 {
            y = y.mod_exp(&BigUint::from_u64(2), &view.n);
        }

        let status = mgr
            .verify_challenge(&view.id, &y.to_decimal_string())
            .await
            .unwrap();
        assert_eq!(status, VerifyStatus::Success);

        // consumed: a second verification attempt finds nothing
        let second = mgr
            .verify_challenge(&view.id, &y.to_decimal_string())
            .await
            .unwrap();
        assert_eq!(second, VerifyStatus::ChallengeNotFound);
    }

    #[tokio::test]
    async fn wrong_y_fails_and_is_consumed() {
        let (mgr, pool) = manager();
        pool.add_key().await.unwrap();
        let view = mgr.new_challenge(Some(3)).await.unwrap();
        let wrong = view.g.add_one();

        let status = mgr
            .verify_challenge(&view.id, &wrong.to_decimal_string())
            .await
            .unwrap();
        assert_eq!(status, VerifyStatus::Failure);

        let second = mgr.verify_challenge(&view.id, "0").await.unwrap();
        assert_eq!(second, VerifyStatus::ChallengeNotFound);
    }

    #[tokio::test]
    async fn invalid_y_does_not_consume_the_challenge() {
        let (mgr, pool) = manager();
        pool.add_key().await.unwrap();
        let view = mgr.new_challenge(Some(3)).await.unwrap();

        let status = mgr.verify_challenge(&view.id, "not-a-number").await.unwrap();
        assert_eq!(status, VerifyStatus::InvalidY);

        // still present: a retry with corrected input is possible
        let retry = mgr.verify_challenge(&view.id, "0").await.unwrap();
        assert_ne!(retry, VerifyStatus::ChallengeNotFound);
    }

    #[tokio::test]
    async fn missing_challenge_id_reports_not_found() {
        let (mgr, _pool) = manager();
        let status = mgr
            .verify_challenge("zzzzzzzzzz", "123")
            .await
            .unwrap();
        assert_eq!(status, VerifyStatus::ChallengeNotFound);
    }

    #[tokio::test]
    async fn key_rotated_out_reports_key_missing() {
        let (mgr, pool) = manager();
        let key = pool.add_key().await.unwrap();
        let view = mgr.new_challenge(Some(3)).await.unwrap();

        pool.remove_key(&key.id).await.unwrap();

        let status = mgr.verify_challenge(&view.id, "123").await.unwrap();
        assert_eq!(status, VerifyStatus::KeyMissing);
    }

    #[tokio::test]
    async fn default_difficulty_is_used_when_omitted() {
        let (mgr, pool) = manager();
        pool.add_key().await.unwrap();
        let view = mgr.new_challenge(None).await.unwrap();
        assert_eq!(view.t, 1_000);

        mgr.set_default_difficulty(42);
        let view2 = mgr.new_challenge(None).await.unwrap();
        assert_eq!(view2.t, 42);
        // the first challenge is unaffected by the later default change
        assert_eq!(view.t, 1_000);
    }
}
