//! Safe-prime RSA key generation.
//!
//! The data model requires `p ≡ q ≡ 3 (mod 4)` with `(p-1)/2` and `(q-1)/2`
//! themselves prime, because the fast CRT verification path reduces the
//! sequential-squaring exponent modulo `p' = (p-1)/2` and `q' = (q-1)/2`
//! directly rather than modulo the full Carmichael function `λ(n)`. Plain
//! `rsa.GenerateKey`-style generation does not guarantee this, so this
//! module performs an explicit safe-prime search instead.

use tracing::debug;
use ucaptcha_common::arithmetic::BigUint;
use ucaptcha_common::error::{CaptchaError, CaptchaResult};
use ucaptcha_common::time::unix_now;
use ucaptcha_common::types::{KeyPair, RsaComponents};

/// Number of Miller-Rabin rounds used for primality testing. 25 rounds
/// gives a false-positive probability below 2^-50, a conservative margin
/// for primes this size.
const MILLER_RABIN_ROUNDS: u32 = 25;

/// Upper bound on search iterations before giving up; generation at 2048
/// bits typically finds a safe prime within a few hundred candidates.
const MAX_SEARCH_ITERATIONS: usize = 200_000;

/// Search for a safe prime of exactly `bits` significant bits: a prime `p`
/// such that `p ≡ 3 (mod 4)` and `(p-1)/2` is also prime.
///
/// Strategy: sample a random odd candidate `q'` of `bits - 1` bits, form
/// `p = 2*q' + 1`, and test both `q'` and `p` for primality. Repeat until
/// both succeed. This is the standard safe-prime construction; testing
/// `q'` first is cheap and prunes most candidates before the more
/// expensive full-size test.
fn find_safe_prime(bits: u32) -> CaptchaResult<BigUint> {
    let sub_bits = bits - 1;
    for _ in 0..MAX_SEARCH_ITERATIONS {
        let q_prime = BigUint::random_bits(sub_bits);
        if !q_prime.is_probably_prime(MILLER_RABIN_ROUNDS) {
            continue;
        }
        let p = q_prime.mul(&BigUint::from_u64(2)).add_one();
        if p.mod4() != 3 {
            continue;
        }
        if p.is_probably_prime(MILLER_RABIN_ROUNDS) {
            return Ok(p);
        }
    }
    Err(CaptchaError::key_generation(format!(
        "no safe prime of {bits} bits found within {MAX_SEARCH_ITERATIONS} iterations"
    )))
}

/// Generate a fresh `RsaComponents` with modulus bit-length ≈ `key_length`.
/// Each of `p`, `q` is a safe prime of `key_length / 2` bits; resamples `q`
/// if it happens to equal `p` (astronomically unlikely, but `p != q` is an
/// explicit invariant).
pub fn generate_rsa_components(key_length: u32) -> CaptchaResult<RsaComponents> {
    if key_length < 512 || key_length % 2 != 0 {
        return Err(CaptchaError::invalid_parameter(
            "key_length must be even and at least 512 bits".to_string(),
        ));
    }
    let half = key_length / 2;
    let p = find_safe_prime(half)?;
    let mut q = find_safe_prime(half)?;
    while q.eq_big(&p) {
        debug!("resampling q: collided with p");
        q = find_safe_prime(half)?;
    }
    let n = p.mul(&q);
    Ok(RsaComponents { p, q, n })
}

/// Generate a full `KeyPair`: components, a fresh UUIDv4 id, and the
/// current Unix timestamp.
pub fn generate_key_pair(key_length: u32) -> CaptchaResult<KeyPair> {
    let components = generate_rsa_components(key_length)?;
    let id = uuid::Uuid::new_v4().to_string();
    let generated_at = unix_now();
    Ok(KeyPair {
        id,
        components,
        generated_at,
    })
}
