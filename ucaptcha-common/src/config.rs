//! Layered configuration: built-in defaults, then an optional YAML file,
//! then environment variables (`UCAPTCHA_` prefix), in that precedence
//! order — the highest layer wins.

use serde::{Deserialize, Serialize};

use crate::error::{CaptchaError, CaptchaResult};

/// Which storage implementation backs a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local, non-persistent storage.
    Memory,
    /// Redis-backed external key-value storage.
    Redis,
}

/// Redis connection parameters, used only when a [`StorageBackend::Redis`]
/// backend is selected for either contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// `redis://host:port` style connection string.
    pub addr: String,
    /// Optional `AUTH` password.
    pub password: Option<String>,
    /// Logical database index.
    pub db: i64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            addr: "redis://127.0.0.1:6379".to_string(),
            password: None,
            db: 0,
        }
    }
}

/// Process-wide configuration. Everything except `default_difficulty`
/// (mutable at runtime via `PUT /difficulty`) is fixed for the lifetime of
/// the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Bind host for the HTTP listener.
    pub host: String,
    /// Bind port for the HTTP listener.
    pub port: u16,
    /// RSA modulus bit length for newly generated keys.
    pub key_length: u32,
    /// Target steady-state number of keys in the pool.
    pub key_pool_size: usize,
    /// Period, in seconds, of the background rotation task.
    pub key_rotation_interval_secs: u64,
    /// Default puzzle difficulty (number of squarings) when a request omits one.
    pub default_difficulty: i64,
    /// Backend for the challenge store.
    pub challenge_storage: StorageBackend,
    /// Backend for the key store.
    pub keys_storage: StorageBackend,
    /// Redis connection parameters, used if either store is `redis`.
    pub redis: RedisConfig,
    /// `tracing_subscriber::EnvFilter` directive, e.g. `"info"` or `"ucaptcha=debug,info"`.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            key_length: 2048,
            key_pool_size: 5,
            key_rotation_interval_secs: 3600,
            default_difficulty: 1_000_000,
            challenge_storage: StorageBackend::Memory,
            keys_storage: StorageBackend::Memory,
            redis: RedisConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from built-in defaults, optionally overridden by
    /// the YAML file at `path` (if it exists) and then by `UCAPTCHA_*`
    /// environment variables (double underscore as the nesting separator,
    /// e.g. `UCAPTCHA_REDIS__ADDR`).
    pub fn load(path: Option<&str>) -> CaptchaResult<Self> {
        let defaults = Config::default();
        let mut builder = config::Config::builder()
            .set_default("host", defaults.host.clone())
            .map_err(config_err)?
            .set_default("port", defaults.port as i64)
            .map_err(config_err)?
            .set_default("key_length", defaults.key_length as i64)
            .map_err(config_err)?
            .set_default("key_pool_size", defaults.key_pool_size as i64)
            .map_err(config_err)?
            .set_default(
                "key_rotation_interval_secs",
                defaults.key_rotation_interval_secs as i64,
            )
            .map_err(config_err)?
            .set_default("default_difficulty", defaults.default_difficulty)
            .map_err(config_err)?
            .set_default("challenge_storage", "memory")
            .map_err(config_err)?
            .set_default("keys_storage", "memory")
            .map_err(config_err)?
            .set_default("redis.addr", defaults.redis.addr.clone())
            .map_err(config_err)?
            .set_default("redis.db", defaults.redis.db)
            .map_err(config_err)?
            .set_default("log_level", defaults.log_level.clone())
            .map_err(config_err)?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("UCAPTCHA")
                .separator("__")
                .try_parsing(true),
        );

        let parsed = builder.build().map_err(config_err)?;
        let cfg: Config = parsed.try_deserialize().map_err(config_err)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject out-of-range values before the process proceeds to bind a
    /// port or touch storage.
    pub fn validate(&self) -> CaptchaResult<()> {
        if self.key_length < 512 {
            return Err(CaptchaError::config(
                "key_length must be at least 512 bits",
            ));
        }
        if self.key_length % 2 != 0 {
            return Err(CaptchaError::config("key_length must be even"));
        }
        if self.key_rotation_interval_secs == 0 {
            return Err(CaptchaError::config(
                "key_rotation_interval_secs must be greater than 0",
            ));
        }
        if self.default_difficulty < 0 {
            return Err(CaptchaError::config("default_difficulty must be >= 0"));
        }
        if self.port == 0 {
            return Err(CaptchaError::config("port must be nonzero"));
        }
        Ok(())
    }

    /// The rotation interval as a [`std::time::Duration`].
    pub fn key_rotation_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.key_rotation_interval_secs)
    }
}

fn config_err(e: config::ConfigError) -> CaptchaError {
    CaptchaError::config(e.to_string())
}
