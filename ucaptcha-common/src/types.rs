//! The core domain types shared by every layer above the storage
//! contracts: the factored RSA-style modulus, the key pair that owns it,
//! and the public challenge record.

use serde::{Deserialize, Serialize};

use crate::arithmetic::BigUint;

/// A factored modulus `n = p * q` where `p`, `q` are safe primes
/// (`p ≡ q ≡ 3 (mod 4)`, `(p-1)/2` and `(q-1)/2` prime). `p` and `q` are
/// secret; `n` is public.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RsaComponents {
    /// Secret prime factor.
    pub p: BigUint,
    /// Secret prime factor.
    pub q: BigUint,
    /// Public modulus `p * q`.
    pub n: BigUint,
}

/// A generated key pair: the factorization plus bookkeeping metadata.
/// Everything except `components.n` is secret and must never cross the
/// HTTP boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyPair {
    /// Stable 128-bit random identifier (a UUIDv4), textual.
    pub id: String,
    /// The factorization.
    pub components: RsaComponents,
    /// Unix timestamp (seconds) at generation time; the rotation
    /// eviction policy is "oldest by this field".
    pub generated_at: i64,
}

/// A puzzle issued to a client: the public tuple `(id, g, n, t)` plus the
/// bookkeeping needed to verify it later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    /// Opaque 10-character textual identifier drawn from the 55-character alphabet.
    pub id: String,
    /// Puzzle base, a quadratic residue mod `n` not in `{0, 1, n-1}`.
    pub g: BigUint,
    /// Public modulus, copied from the bound key's `components.n`.
    pub n: BigUint,
    /// Difficulty: the number of sequential squarings the client must perform.
    pub t: i64,
    /// Unix timestamp (seconds) at creation time.
    pub created_at: i64,
    /// Reference to the `KeyPair` used to construct this challenge — the
    /// only link to the secret factorization. Never returned to clients.
    pub key_id: String,
}

/// The public view of a freshly issued challenge, i.e. everything a
/// client is allowed to see.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeView {
    /// Challenge id, used to submit a solution.
    pub id: String,
    /// Puzzle base.
    pub g: BigUint,
    /// Public modulus.
    pub n: BigUint,
    /// Difficulty.
    pub t: i64,
}

impl From<&Challenge> for ChallengeView {
    fn from(c: &Challenge) -> Self {
        ChallengeView {
            id: c.id.clone(),
            g: c.g.clone(),
            n: c.n.clone(),
            t: c.t,
        }
    }
}
