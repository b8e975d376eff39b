use std::cell::RefCell;
use std::collections::HashMap;

use super::{eta_minus_from_delta_plus, eta_plus_from_delta_min, EventModel};
use crate::time::Duration;

/// Wraps any [EventModel] with the six memo tables every model is
/// required to own (`delta_min`, `delta_plus`, `eta_plus`,
/// `eta_minus`, `eta_plus_closed`, `eta_minus_closed`), grounded on
/// the `Rc<RefCell<..>>` interior-mutability pattern used elsewhere in
/// this crate for lazily-extrapolated curves.
///
/// Caching is purely an optimization over a model that is otherwise
/// pure and immutable; [Cached::flush_cache] must be called by the
/// orchestrator whenever an upstream model this one depends on
/// changes.
#[derive(Debug)]
pub struct Cached<M> {
    inner: M,
    delta_min_cache: RefCell<HashMap<u64, Duration>>,
    delta_plus_cache: RefCell<HashMap<u64, Duration>>,
    eta_plus_cache: RefCell<HashMap<Duration, u64>>,
    eta_minus_cache: RefCell<HashMap<Duration, u64>>,
    eta_plus_closed_cache: RefCell<HashMap<Duration, u64>>,
    eta_minus_closed_cache: RefCell<HashMap<Duration, u64>>,
}

impl<M: EventModel> Cached<M> {
    pub fn new(inner: M) -> Self {
        Cached {
            inner,
            delta_min_cache: RefCell::new(HashMap::new()),
            delta_plus_cache: RefCell::new(HashMap::new()),
            eta_plus_cache: RefCell::new(HashMap::new()),
            eta_minus_cache: RefCell::new(HashMap::new()),
            eta_plus_closed_cache: RefCell::new(HashMap::new()),
            eta_minus_closed_cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }

    pub fn into_inner(self) -> M {
        self.inner
    }

    /// Invalidate all six memo tables. Must be called whenever the
    /// wrapped model (or anything it was derived from) changes.
    pub fn flush_cache(&self) {
        self.delta_min_cache.borrow_mut().clear();
        self.delta_plus_cache.borrow_mut().clear();
        self.eta_plus_cache.borrow_mut().clear();
        self.eta_minus_cache.borrow_mut().clear();
        self.eta_plus_closed_cache.borrow_mut().clear();
        self.eta_minus_closed_cache.borrow_mut().clear();
    }
}

macro_rules! memoize {
    ($cache:expr, $key:expr, $compute:expr) => {{
        if let Some(v) = $cache.borrow().get(&$key) {
            return *v;
        }
        let v = $compute;
        $cache.borrow_mut().insert($key, v);
        v
    }};
}

impl<M: EventModel> EventModel for Cached<M> {
    fn description(&self) -> String {
        self.inner.description()
    }

    fn delta_min(&self, n: u64) -> Duration {
        memoize!(self.delta_min_cache, n, self.inner.delta_min(n))
    }

    fn delta_plus(&self, n: u64) -> Duration {
        memoize!(self.delta_plus_cache, n, self.inner.delta_plus(n))
    }

    fn eta_plus(&self, w: Duration) -> u64 {
        memoize!(
            self.eta_plus_cache,
            w,
            eta_plus_from_delta_min(|n| self.delta_min(n), w, false)
        )
    }

    fn eta_plus_closed(&self, w: Duration) -> u64 {
        memoize!(
            self.eta_plus_closed_cache,
            w,
            eta_plus_from_delta_min(|n| self.delta_min(n), w, true)
        )
    }

    fn eta_minus(&self, w: Duration) -> u64 {
        memoize!(
            self.eta_minus_cache,
            w,
            eta_minus_from_delta_plus(|n| self.delta_plus(n), w, false)
        )
    }

    fn eta_minus_closed(&self, w: Duration) -> u64 {
        memoize!(
            self.eta_minus_closed_cache,
            w,
            eta_minus_from_delta_plus(|n| self.delta_plus(n), w, true)
        )
    }
}
