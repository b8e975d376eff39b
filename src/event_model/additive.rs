//! Additive extension of a limited-domain δ function.
//!
//! A user- or trace-supplied `δ⁻`/`δ⁺` is only known on some finite
//! domain `[0, Q]`. Beyond `Q`, we extend it conservatively by
//! exploiting super-additivity of `δ⁻` (any split `n = k + (n−k)`
//! gives a valid lower bound `δ⁻(k) + δ⁻(n−k) ≤ δ⁻(n)`, so the maximum
//! over all splits is the tightest lower bound we can state without
//! more information) and sub-additivity of `δ⁺` (dually, the minimum
//! over all splits is the tightest upper bound).

use std::cell::RefCell;
use std::collections::HashMap;

use crate::time::Duration;

/// Extend a super-additive (`δ⁻`-like) function beyond its known
/// domain. `get` must already resolve recursively (i.e. it is the
/// owning model's own `delta_min`, not just the raw domain-limited
/// function), so that extending `n` can itself depend on previously
/// extended values.
pub fn max_additive(
    get: impl Fn(u64) -> Duration,
    n: u64,
    limit_q: u64,
    cache: &RefCell<HashMap<u64, Duration>>,
) -> Duration {
    if let Some(v) = cache.borrow().get(&n) {
        return *v;
    }
    let q_max = limit_q.min(n.saturating_sub(1)).max(1);
    let v = (1..=q_max)
        .map(|k| get(k) + get(n - k))
        .max()
        .unwrap_or_else(Duration::zero);
    cache.borrow_mut().insert(n, v);
    v
}

/// Extend a sub-additive (`δ⁺`-like) function beyond its known
/// domain; dual of [max_additive].
pub fn min_additive(
    get: impl Fn(u64) -> Duration,
    n: u64,
    limit_q: u64,
    cache: &RefCell<HashMap<u64, Duration>>,
) -> Duration {
    if let Some(v) = cache.borrow().get(&n) {
        return *v;
    }
    let q_max = limit_q.min(n.saturating_sub(1)).max(1);
    let v = (1..=q_max)
        .map(|k| get(k) + get(n - k))
        .min()
        .unwrap_or_else(Duration::zero);
    cache.borrow_mut().insert(n, v);
    v
}
