use super::LimitedDelta;
use crate::time::Duration;

/// Derives a [LimitedDelta] from a finite, sorted sequence of observed
/// event timestamps, by brute-force windowed min/max: for each `n` up
/// to the trace length, `δ⁻(n)`/`δ⁺(n)` are the smallest/largest span
/// covering any `n` consecutive recorded events. Beyond the trace
/// length the bounds are extrapolated additively, same as any other
/// [LimitedDelta].
///
/// Mirrors the reference implementation's windowed-trace event model.
pub fn from_trace(description: impl Into<String>, timestamps: &[Duration]) -> LimitedDelta {
    let mut points = timestamps.to_vec();
    points.sort();
    let len = points.len() as u64;

    let min_table: Vec<Duration> = (0..=len)
        .map(|n| windowed_extreme(&points, n, true))
        .collect();
    let max_table: Vec<Duration> = (0..=len)
        .map(|n| windowed_extreme(&points, n, false))
        .collect();

    let limit = len;
    LimitedDelta::new(
        description,
        limit,
        limit,
        move |n| min_table.get(n as usize).copied().unwrap_or(Duration::zero()),
        move |n| max_table.get(n as usize).copied().unwrap_or(Duration::zero()),
    )
}

fn windowed_extreme(points: &[Duration], n: u64, want_min: bool) -> Duration {
    if n < 2 || (n as usize) > points.len() {
        return Duration::zero();
    }
    let n = n as usize;
    let mut best: Option<Duration> = None;
    for window in points.windows(n) {
        let span = window[n - 1].saturating_sub(window[0]);
        best = Some(match best {
            None => span,
            Some(b) => {
                if want_min {
                    b.min(span)
                } else {
                    b.max(span)
                }
            }
        });
    }
    best.unwrap_or(Duration::zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_model::EventModel;

    #[test]
    fn recovers_regular_spacing() {
        let points: Vec<Duration> = (0..10).map(|i| Duration::from(i * 10)).collect();
        let m = from_trace("regular", &points);
        assert_eq!(m.delta_min(2), Duration::from(10));
        assert_eq!(m.delta_plus(2), Duration::from(10));
        assert_eq!(m.delta_min(5), Duration::from(40));
    }

    #[test]
    fn captures_a_burst() {
        let points = vec![
            Duration::from(0),
            Duration::from(1),
            Duration::from(2),
            Duration::from(100),
        ];
        let m = from_trace("burst", &points);
        // tightest 3-event window is the burst at the start
        assert_eq!(m.delta_min(3), Duration::from(2));
        // widest 3-event window straddles the gap before the last point
        assert_eq!(m.delta_plus(3), Duration::from(100));
    }
}
