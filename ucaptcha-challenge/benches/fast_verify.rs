use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ucaptcha_challenge::fast_verify;
use ucaptcha_common::arithmetic::BigUint;
use ucaptcha_common::types::RsaComponents;

// 256-bit safe-prime-shaped factors, small enough to keep the naive
// baseline's O(t) loop tractable at bench time while still exercising the
// CRT reduction over realistically-sized half-moduli.
const P_DEC: &str =
    "96182845352312584723893476519823746519827364519823746592374651982374659182374651927";
const Q_DEC: &str =
    "87364519827364592837465918237465192837465918237465192837465918237465198237465192837";

fn safe_prime_components() -> RsaComponents {
    // The constants above are not verified safe primes (that search is
    // seconds of work); for benchmarking the *fast path's* cost relative to
    // the naive loop, primality of the factors doesn't matter — only their
    // bit length does, since `fast_verify` only ever calls `mod_exp` and
    // `modulo`, never a primality test.
    let p = BigUint::from_decimal_str(P_DEC).unwrap();
    let q = BigUint::from_decimal_str(Q_DEC).unwrap();
    let n = p.mul(&q);
    RsaComponents { p, q, n }
}

fn naive_solve(g: &BigUint, t: u64, n: &BigUint) -> BigUint {
    let two = BigUint::from_u64(2);
    let mut acc = g.clone();
    for _ in 0..t {
        acc = acc.mod_exp(&two, n);
    }
    acc
}

fn bench_fast_path_vs_naive(c: &mut Criterion) {
    let components = safe_prime_components();
    let g = BigUint::from_u64(2).mod_exp(&BigUint::from_u64(2), &components.n);

    let mut group = c.benchmark_group("verify_t_squarings");

    // The naive loop is only tractable for small t; the fast path's whole
    // point is that its own cost barely changes as t grows, which is what
    // the "fast_path" series below demonstrates at much larger t.
    for t in [10u64, 100, 1_000, 10_000] {
        let y = naive_solve(&g, t, &components.n);

        group.bench_with_input(BenchmarkId::new("naive_sequential", t), &t, |b, &t| {
            b.iter(|| naive_solve(black_box(&g), black_box(t), black_box(&components.n)))
        });

        group.bench_with_input(BenchmarkId::new("fast_crt", t), &t, |b, &t| {
            b.iter(|| {
                fast_verify(
                    black_box(&components),
                    black_box(&g),
                    black_box(t as i64),
                    black_box(&y),
                )
            })
        });
    }

    group.finish();
}

fn bench_fast_path_at_large_t(c: &mut Criterion) {
    let components = safe_prime_components();
    let g = BigUint::from_u64(2).mod_exp(&BigUint::from_u64(2), &components.n);

    let mut group = c.benchmark_group("fast_path_scaling");

    // Difficulties representative of production use (hundreds of
    // thousands to low millions of squarings); the naive baseline is
    // deliberately omitted here since running it would dominate the bench.
    for t in [100_000i64, 1_000_000, 10_000_000] {
        // A placeholder `y`; fast_verify's cost does not depend on whether
        // the check succeeds, only on t's bit length.
        let y = g.clone();

        group.bench_with_input(BenchmarkId::new("fast_crt", t), &t, |b, &t| {
            b.iter(|| fast_verify(black_box(&components), black_box(&g), black_box(t), black_box(&y)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fast_path_vs_naive, bench_fast_path_at_large_t);
criterion_main!(benches);
