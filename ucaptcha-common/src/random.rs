//! Identifier and puzzle-base sampling utilities.

use rand::RngCore;

use crate::arithmetic::BigUint;
use crate::error::{CaptchaError, CaptchaResult};

/// 55 glyphs with ambiguous characters (`0 O o I l 1`, etc.) removed, used
/// to render challenge ids as short, unambiguous, human-transcribable text.
const ID_ALPHABET: &[u8] = b"abcdefghijkmnpqrstuvwxyz23456789ABCDEFGHJKLMNPQRSTUVWXYZ";

/// Number of characters in a challenge id.
pub const CHALLENGE_ID_LEN: usize = 10;

/// Generate a 10-character challenge id by indexing into [`ID_ALPHABET`]
/// with cryptographically random bytes reduced mod 55.
///
/// Collision probability (55^10 ≈ 2^58 possibilities) must be monitored by
/// callers that mint many ids against the same store; this routine makes no
/// uniqueness guarantee of its own.
pub fn generate_challenge_id() -> String {
    let mut rng = rand::rngs::OsRng;
    let mut raw = [0u8; CHALLENGE_ID_LEN];
    rng.fill_bytes(&mut raw);
    raw.iter()
        .map(|b| ID_ALPHABET[(*b as usize) % ID_ALPHABET.len()] as char)
        .collect()
}

/// Returns `true` iff every character of `id` is drawn from the 55-character
/// alphabet and its length is exactly [`CHALLENGE_ID_LEN`].
pub fn is_valid_challenge_id(id: &str) -> bool {
    id.chars().count() == CHALLENGE_ID_LEN
        && id.bytes().all(|b| ID_ALPHABET.contains(&b))
}

/// Sample a valid quadratic-residue puzzle base `g` for modulus `n`.
///
/// Requires `n > 4`. Repeatedly samples `r ∈ [2, n-1]`, computes
/// `g = r² mod n`, and accepts the first `g` not in `{0, 1, n-1}`. This
/// guarantees `g` is a quadratic residue and excludes the trivial elements
/// that would make the RSW puzzle degenerate. Expected iteration count is
/// about 1.
pub fn generate_valid_g(n: &BigUint) -> CaptchaResult<BigUint> {
    let four = BigUint::from_u64(4);
    if !n.gt(&four) {
        return Err(CaptchaError::invalid_parameter(
            "generate_valid_g: n must be > 4".to_string(),
        ));
    }
    let two = BigUint::from_u64(2);
    let n_minus_1 = n.sub(&BigUint::from_u64(1));
    let zero = BigUint::from_u64(0);
    let one = BigUint::from_u64(1);

    loop {
        let r = BigUint::random_in_range(&two, &n_minus_1)?;
        let g = r.mod_exp(&two, n);
        if !g.eq_big(&zero) && !g.eq_big(&one) && !g.eq_big(&n_minus_1) {
            return Ok(g);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_id_has_expected_shape() {
        for _ in 0..50 {
            let id = generate_challenge_id();
            assert!(is_valid_challenge_id(&id), "id {id:?} failed validation");
        }
    }

    #[test]
    fn generate_valid_g_avoids_trivial_elements() {
        let n = BigUint::from_u64(253); // 23 * 11
        for _ in 0..100 {
            let g = generate_valid_g(&n).unwrap();
            assert!(!g.eq_big(&BigUint::from_u64(0)));
            assert!(!g.eq_big(&BigUint::from_u64(1)));
            assert!(!g.eq_big(&n.sub(&BigUint::from_u64(1))));
        }
    }

    #[test]
    fn generate_valid_g_rejects_small_n() {
        assert!(generate_valid_g(&BigUint::from_u64(4)).is_err());
    }
}
