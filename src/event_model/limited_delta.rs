use std::cell::RefCell;
use std::collections::HashMap;

use super::{max_additive, min_additive, EventModel};
use crate::time::Duration;

/// An event model defined directly by caller-supplied `δ⁻`/`δ⁺`
/// functions, but only on a limited domain `[0, Q]`. Beyond `Q`, the
/// value is obtained by the conservative additive extension (see
/// [crate::event_model::additive]).
///
/// This is the building block behind [super::Trace]: both user-supplied
/// closed-form bounds and trace-derived bounds are "valid on a prefix,
/// extrapolated beyond it."
pub struct LimitedDelta {
    description: String,
    limit_q_min: u64,
    limit_q_plus: u64,
    raw_delta_min: Box<dyn Fn(u64) -> Duration>,
    raw_delta_plus: Box<dyn Fn(u64) -> Duration>,
    extension_min_cache: RefCell<HashMap<u64, Duration>>,
    extension_plus_cache: RefCell<HashMap<u64, Duration>>,
}

impl std::fmt::Debug for LimitedDelta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LimitedDelta")
            .field("description", &self.description)
            .field("limit_q_min", &self.limit_q_min)
            .field("limit_q_plus", &self.limit_q_plus)
            .finish()
    }
}

impl LimitedDelta {
    pub fn new(
        description: impl Into<String>,
        limit_q_min: u64,
        limit_q_plus: u64,
        raw_delta_min: impl Fn(u64) -> Duration + 'static,
        raw_delta_plus: impl Fn(u64) -> Duration + 'static,
    ) -> Self {
        LimitedDelta {
            description: description.into(),
            limit_q_min,
            limit_q_plus,
            raw_delta_min: Box::new(raw_delta_min),
            raw_delta_plus: Box::new(raw_delta_plus),
            extension_min_cache: RefCell::new(HashMap::new()),
            extension_plus_cache: RefCell::new(HashMap::new()),
        }
    }
}

impl EventModel for LimitedDelta {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn delta_min(&self, n: u64) -> Duration {
        if n < 2 {
            return Duration::zero();
        }
        if n <= self.limit_q_min {
            (self.raw_delta_min)(n)
        } else {
            max_additive(
                |k| self.delta_min(k),
                n,
                self.limit_q_min.saturating_sub(1),
                &self.extension_min_cache,
            )
        }
    }

    fn delta_plus(&self, n: u64) -> Duration {
        if n < 2 {
            return Duration::zero();
        }
        if n <= self.limit_q_plus {
            (self.raw_delta_plus)(n)
        } else {
            min_additive(
                |k| self.delta_plus(k),
                n,
                self.limit_q_plus.saturating_sub(1),
                &self.extension_plus_cache,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extrapolates_beyond_the_known_domain() {
        // known only for n in [0,4]: a plain arithmetic progression of step 5
        let m = LimitedDelta::new(
            "test",
            4,
            4,
            |n| Duration::from((n - 1) * 5),
            |n| Duration::from((n - 1) * 5),
        );
        for n in 2..=4u64 {
            assert_eq!(m.delta_min(n), Duration::from((n - 1) * 5));
        }
        // beyond the domain, extension must remain monotone and conservative
        for n in 5..40u64 {
            assert!(m.delta_min(n) >= m.delta_min(n - 1));
            assert!(m.delta_plus(n) >= m.delta_plus(n - 1));
            assert!(m.delta_min(n) <= m.delta_plus(n));
        }
    }
}
