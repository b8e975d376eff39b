use super::EventModel;
use crate::error::InvalidInput;
use crate::time::Duration;

/// `c` events every `T` with a minimum inter-arrival distance `d`
/// (the "bursty periodic" model): `δ⁻(n) = (n−1)·d + ⌊(n−1)/c⌋·(T−c·d)`,
/// `δ⁺(n) = +∞` (no maximum separation is assumed).
///
/// Equation 1 of Diemer & Ernst, "Efficient Throughput-Guarantees for
/// Latency-Sensitive Networks-on-Chip" (2010).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CinT {
    pub events_per_period: u64,
    pub period: Duration,
    pub min_distance: Duration,
}

impl CinT {
    pub fn new(events_per_period: u64, period: Duration, min_distance: Duration) -> Result<Self, InvalidInput> {
        if events_per_period > 0 && Duration::from(events_per_period) * min_distance > period {
            return Err(InvalidInput::NegativeTimingParameter {
                description: format!(
                    "c-in-T model: {events_per_period} events of min-distance {min_distance:?} cannot fit in period {period:?}"
                ),
            });
        }
        Ok(CinT {
            events_per_period,
            period,
            min_distance,
        })
    }
}

impl EventModel for CinT {
    fn description(&self) -> String {
        format!(
            "{} every {:?}, dmin={:?}",
            self.events_per_period, self.period, self.min_distance
        )
    }

    fn delta_min(&self, n: u64) -> Duration {
        if n < 2 || self.events_per_period == 0 || self.period.is_infinite() {
            return Duration::zero();
        }
        let steps = n - 1;
        let full_periods = steps / self.events_per_period;
        let per_period_slack = self.period.saturating_sub(self.min_distance * self.events_per_period);
        self.min_distance * steps + per_period_slack * full_periods
    }

    fn delta_plus(&self, _n: u64) -> Duration {
        Duration::infinite()
    }
}
