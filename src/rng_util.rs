/// Create a generator from an optional seed.
pub(crate) fn from_seed(seed: Option<u64>) -> fastrand::Rng {
    seed.map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed)
}

/// Generate a random `f64` in the range `[low, high)`.
#[inline]
pub(crate) fn f64_range(rng: &mut fastrand::Rng, low: f64, high: f64) -> f64 {
    low + rng.f64() * (high - low)
}

/// Draw `k` distinct indices from `0..n` (fewer if `n < k`).
pub(crate) fn distinct_indices(rng: &mut fastrand::Rng, n: usize, k: usize, exclude: &[usize]) -> Vec<usize> {
    let mut pool: Vec<usize> = (0..n).filter(|i| !exclude.contains(i)).collect();
    rng.shuffle(&mut pool);
    pool.truncate(k);
    pool
}
