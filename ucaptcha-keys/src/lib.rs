//! # uCaptcha Keys
//!
//! Safe-prime RSA key generation and the key pool manager: lazy
//! provisioning under a reader-writer lock, plus the periodic
//! add-newest/evict-oldest rotation protocol.

#![warn(missing_docs)]

pub mod generate;
pub mod pool;

pub use generate::{generate_key_pair, generate_rsa_components};
pub use pool::KeyPoolManager;
