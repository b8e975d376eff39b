use super::EventModel;
use crate::time::Duration;

/// Periodic activation with jitter and a minimum inter-arrival
/// distance (`P`, `J`, `d`). The workhorse constructor of the
/// algebra: `δ⁻(n) = max((n−1)·d, (n−1)·P − J)`,
/// `δ⁺(n) = (n−1)·P + J`.
///
/// Equations 1 and 2 of Schliecker & Ernst, "A Recursive Approach to
/// End-to-End Path Latency Computation in Heterogeneous Multiprocessor
/// Systems" (2008).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pjd {
    pub period: Duration,
    pub jitter: Duration,
    pub min_distance: Duration,
    /// Phase/offset, tracked for offset-aware analyses but not
    /// evaluated by every scheduler.
    pub phase: Duration,
}

impl Pjd {
    pub fn new(period: Duration, jitter: Duration, min_distance: Duration) -> Self {
        Pjd {
            period,
            jitter,
            min_distance,
            phase: Duration::zero(),
        }
    }

    pub fn with_phase(mut self, phase: Duration) -> Self {
        self.phase = phase;
        self
    }

    pub fn zero_jitter(period: Duration) -> Self {
        Self::new(period, Duration::zero(), period)
    }
}

impl EventModel for Pjd {
    fn description(&self) -> String {
        format!(
            "P={:?} J={:?} d={:?}",
            self.period, self.jitter, self.min_distance
        )
    }

    fn delta_min(&self, n: u64) -> Duration {
        if n < 2 {
            return Duration::zero();
        }
        let steps = n - 1;
        let from_min_distance = self.min_distance * steps;
        let from_period = (self.period * steps).saturating_sub(self.jitter);
        from_min_distance.max(from_period)
    }

    fn delta_plus(&self, n: u64) -> Duration {
        if n < 2 {
            return Duration::zero();
        }
        self.period * (n - 1) + self.jitter
    }
}
