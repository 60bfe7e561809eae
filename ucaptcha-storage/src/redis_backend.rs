//! External key-value storage backed by Redis, matching the key layout in
//! the configuration/persistence reference: `ucaptcha:key:<id>` (plain
//! JSON, no TTL) and `ucaptcha:challenge:<id>` (hash, TTL ~5 minutes).

use std::collections::HashMap;

use async_trait::async_trait;
use rand::seq::IteratorRandom;
use redis::AsyncCommands;
use tracing::warn;
use ucaptcha_common::arithmetic::BigUint;
use ucaptcha_common::config::RedisConfig;
use ucaptcha_common::error::{CaptchaError, CaptchaResult};
use ucaptcha_common::types::{Challenge, KeyPair};

use crate::traits::{ChallengeStorage, KeyStorage};

const KEY_PREFIX: &str = "ucaptcha:key:";
const CHALLENGE_PREFIX: &str = "ucaptcha:challenge:";
const CHALLENGE_TTL_SECS: i64 = 300;

fn connection_url(cfg: &RedisConfig) -> String {
    // `cfg.addr` is `redis://host:port`; splice in auth and the db index.
    let without_scheme = cfg.addr.trim_start_matches("redis://");
    match &cfg.password {
        Some(pw) if !pw.is_empty() => {
            format!("redis://:{pw}@{without_scheme}/{}", cfg.db)
        }
        _ => format!("redis://{without_scheme}/{}", cfg.db),
    }
}

/// Shared Redis client wrapper; cheap to clone (wraps an `Arc` internally
/// via `redis::Client`).
#[derive(Clone)]
pub struct RedisConnection {
    client: redis::Client,
}

impl RedisConnection {
    /// Open a client for the given configuration. Does not eagerly connect;
    /// connection errors surface on first use.
    pub fn new(cfg: &RedisConfig) -> CaptchaResult<Self> {
        let client = redis::Client::open(connection_url(cfg)).map_err(CaptchaError::from)?;
        Ok(Self { client })
    }

    async fn conn(&self) -> CaptchaResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(CaptchaError::from)
    }
}

/// Redis-backed key store. Keys are persisted as whole JSON blobs with no
/// TTL, per the persisted-state layout.
pub struct RedisKeyStorage {
    conn: RedisConnection,
}

impl RedisKeyStorage {
    /// Build a key store over the given Redis configuration.
    pub fn new(cfg: &RedisConfig) -> CaptchaResult<Self> {
        Ok(Self {
            conn: RedisConnection::new(cfg)?,
        })
    }
}

fn key_redis_key(id: &str) -> String {
    format!("{KEY_PREFIX}{id}")
}

#[async_trait]
impl KeyStorage for RedisKeyStorage {
    async fn save(&self, key: &KeyPair) -> CaptchaResult<()> {
        let mut conn = self.conn.conn().await?;
        let payload = serde_json::to_string(key)?;
        let _: () = conn.set(key_redis_key(&key.id), payload).await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> CaptchaResult<Option<KeyPair>> {
        let mut conn = self.conn.conn().await?;
        let raw: Option<String> = conn.get(key_redis_key(id)).await?;
        match raw {
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &str) -> CaptchaResult<()> {
        let mut conn = self.conn.conn().await?;
        let _: () = conn.del(key_redis_key(id)).await?;
        Ok(())
    }

    async fn list_all(&self) -> CaptchaResult<Vec<KeyPair>> {
        let mut conn = self.conn.conn().await?;
        let ids: Vec<String> = conn.keys(format!("{KEY_PREFIX}*")).await?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let raw: Option<String> = conn.get(&id).await?;
            match raw {
                Some(raw) => out.push(serde_json::from_str(&raw)?),
                None => warn!(redis_key = %id, "key vanished between KEYS and GET"),
            }
        }
        Ok(out)
    }

    async fn count(&self) -> CaptchaResult<usize> {
        let mut conn = self.conn.conn().await?;
        let ids: Vec<String> = conn.keys(format!("{KEY_PREFIX}*")).await?;
        Ok(ids.len())
    }

    async fn random(&self) -> CaptchaResult<Option<KeyPair>> {
        // best-effort: fetch all ids and pick one uniformly, rather than
        // relying on a single SCAN cursor position (which would bias
        // toward whatever Redis happens to return first).
        let all = self.list_all().await?;
        let mut rng = rand::thread_rng();
        Ok(all.into_iter().choose(&mut rng))
    }
}

/// Redis-backed challenge store. Stores each challenge as a hash with TTL
/// `CHALLENGE_TTL_SECS` so abandoned challenges are reclaimed automatically.
pub struct RedisChallengeStorage {
    conn: RedisConnection,
}

impl RedisChallengeStorage {
    /// Build a challenge store over the given Redis configuration.
    pub fn new(cfg: &RedisConfig) -> CaptchaResult<Self> {
        Ok(Self {
            conn: RedisConnection::new(cfg)?,
        })
    }
}

fn challenge_redis_key(id: &str) -> String {
    format!("{CHALLENGE_PREFIX}{id}")
}

#[async_trait]
impl ChallengeStorage for RedisChallengeStorage {
    async fn save(&self, challenge: &Challenge) -> CaptchaResult<()> {
        let mut conn = self.conn.conn().await?;
        let key = challenge_redis_key(&challenge.id);
        let fields: Vec<(&str, String)> = vec![
            ("id", challenge.id.clone()),
            ("KeyID", challenge.key_id.clone()),
            ("g", challenge.g.to_decimal_string()),
            ("n", challenge.n.to_decimal_string()),
            ("t", challenge.t.to_string()),
            ("created_at", challenge.created_at.to_string()),
        ];
        let _: () = conn.hset_multiple(&key, &fields).await?;
        let _: () = conn.expire(&key, CHALLENGE_TTL_SECS).await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> CaptchaResult<Option<Challenge>> {
        let mut conn = self.conn.conn().await?;
        let map: HashMap<String, String> = conn.hgetall(challenge_redis_key(id)).await?;
        if map.is_empty() {
            return Ok(None);
        }
        let field = |name: &str| {
            map.get(name).cloned().ok_or_else(|| {
                warn!(challenge_id = id, field = name, "challenge hash missing field");
                CaptchaError::storage(format!("missing field {name}"))
            })
        };
        Ok(Some(Challenge {
            id: field("id")?,
            key_id: field("KeyID")?,
            g: BigUint::from_decimal_str(&field("g")?)?,
            n: BigUint::from_decimal_str(&field("n")?)?,
            t: field("t")?.parse().map_err(|_| {
                warn!(challenge_id = id, "corrupt t field in challenge hash");
                CaptchaError::storage("corrupt t field")
            })?,
            created_at: field("created_at")?.parse().map_err(|_| {
                warn!(challenge_id = id, "corrupt created_at field in challenge hash");
                CaptchaError::storage("corrupt created_at field")
            })?,
        }))
    }

    async fn delete(&self, id: &str) -> CaptchaResult<()> {
        let mut conn = self.conn.conn().await?;
        let _: () = conn.del(challenge_redis_key(id)).await?;
        Ok(())
    }
}
