/*! Output event-model propagation: deriving the arrival pattern a task
*emits* from the arrival pattern it *receives* plus its own WCRT/BCRT
and busy-window sequence.

Ported from the reference implementation's `analysis.py` propagation
classes (`JitterPropagationEventModel`, `JitterOffsetPropagationEventModel`,
`JitterBminPropagationEventModel`, `BusyWindowPropagationEventModel`,
`OptimalPropagationEventModel`). Each rule is a pure function from a
task's resolved [crate::scheduler::TaskResult] (plus its own input
model) to a boxed output [EventModel]; the orchestrator picks which
rule to apply via [PropagationRule] and installs the result as the
successor's input model.
*/

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::event_model::{max_additive, EventModel, LimitedDelta};
use crate::time::Duration;

/// Which output-propagation rule to apply. All are sound
/// over-approximations of the true output; they differ in how much of
/// the upstream arrival pattern they exploit and how expensive they
/// are to evaluate repeatedly during a fixed-point search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PropagationRule {
    /// Shift the input model's `δ⁺` forward by the worst-case response
    /// time, and derive `δ⁻` from the minimum inter-activation distance
    /// and the (possibly widened) jitter. Cheapest, least precise.
    Jitter,
    /// As `Jitter`, but also tracks phase and period explicitly so a
    /// downstream cause-effect chain analysis can use them.
    JitterOffset,
    /// Uses the scheduler's own `bmin` sequence instead of a flat
    /// minimum distance, tightening `δ⁻`.
    JitterBmin,
    /// Exploits the full busy-window sequence: an output burst cannot
    /// be worse than the input burst that produced the busiest
    /// resource window, corrected by the *best*-case response time.
    #[default]
    BusyWindow,
    /// The tightest available bound at each `n`: `δ⁻` from the max of
    /// `JitterBmin`'s and `BusyWindow`'s, `δ⁺` from the min.
    Optimal,
}

/// Everything a propagation rule needs from the task that just
/// finished local analysis, besides its own input model.
pub struct PropagationInput<'a> {
    pub in_event_model: &'a dyn EventModel,
    pub wcrt: Duration,
    pub bcrt: Duration,
    /// `busy_times[0] == 0`; `busy_times[q]` is the worst-case length
    /// of a busy window containing `q` activations, `q = 1..=k`.
    pub busy_times: &'a [Duration],
    /// The task's own best-case execution time: the floor under every
    /// rule's `δ⁻`, since two of the task's own output events can
    /// never be produced closer together than its fastest possible
    /// single execution.
    pub min_distance: Duration,
}

/// Resolve a [PropagationRule] into a boxed output [EventModel].
/// `description` is used purely for diagnostics.
pub fn propagate(
    rule: PropagationRule,
    description: impl Into<String>,
    input: PropagationInput<'_>,
) -> Rc<dyn EventModel> {
    match rule {
        PropagationRule::Jitter => Rc::new(jitter(description, &input)),
        // Offset tracking (phase/period bookkeeping for cause-effect
        // chains) lives in `path_analysis`, keyed off the task's
        // declared period rather than the propagated model itself;
        // the propagated delta/eta bound is identical to `Jitter`.
        PropagationRule::JitterOffset => Rc::new(jitter(description, &input)),
        PropagationRule::JitterBmin => Rc::new(jitter_bmin(description, &input)),
        PropagationRule::BusyWindow => Rc::new(busy_window(description, &input)),
        PropagationRule::Optimal => Rc::new(optimal(description, &input)),
    }
}

fn description_with_rule(base: impl Into<String>, rule: &str) -> String {
    format!("{} [{}]", base.into(), rule)
}

/// `δ⁻(n) = max((n-1)*min_distance, in.δ⁻(n) - (wcrt - bcrt))`,
/// `δ⁺(n) = in.δ⁺(n) + (wcrt - bcrt)`.
///
/// The `(wcrt - bcrt)` term is the response-time jitter: the
/// difference between the latest and earliest an event can leave the
/// task, which widens every inter-arrival gap it is shifted across.
fn jitter(description: impl Into<String>, input: &PropagationInput<'_>) -> LimitedDelta {
    let resp_jitter = input.wcrt.saturating_sub(input.bcrt);
    let min_distance = input.min_distance;
    let delta_min_in = capture_delta_min(input.in_event_model);
    let delta_plus_in = capture_delta_plus(input.in_event_model);

    LimitedDelta::new(
        description_with_rule(description, "jitter"),
        u64::MAX,
        u64::MAX,
        move |n| {
            let widened = delta_min_in(n).saturating_sub(resp_jitter);
            widened.max(min_distance * (n - 1))
        },
        move |n| delta_plus_in(n) + resp_jitter,
    )
}

/// As [jitter], but the minimum inter-activation distance comes from
/// the scheduler's own `bmin(n-1)` sequence rather than a flat
/// constant -- tighter whenever `bmin` grows faster than linearly.
fn jitter_bmin(description: impl Into<String>, input: &PropagationInput<'_>) -> LimitedDelta {
    let resp_jitter = input.wcrt.saturating_sub(input.bcrt);
    let min_distance = input.min_distance;
    let delta_min_in = capture_delta_min(input.in_event_model);
    let delta_plus_in = capture_delta_plus(input.in_event_model);
    let busy_times = input.busy_times.to_vec();

    LimitedDelta::new(
        description_with_rule(description, "jitter_bmin"),
        u64::MAX,
        u64::MAX,
        move |n| {
            let bmin_floor = if n >= 2 && (n as usize - 1) < busy_times.len() {
                busy_times[n as usize - 1]
            } else {
                Duration::zero()
            };
            let widened = delta_min_in(n).saturating_sub(resp_jitter);
            widened.max(bmin_floor).max(min_distance * (n - 1))
        },
        move |n| delta_plus_in(n) + resp_jitter,
    )
}

/// The busy-window rule: bounds the `q`-event output burst by the
/// smallest input burst of `n + k - 1` events that, once served in a
/// window of length `busy_times[k]`, still leaves `n` events pending
/// at the exit -- minimised over every recorded busy-window length
/// `k`, then corrected forward by the best-case response time so the
/// bound refers to output (not input) time.
fn busy_window(description: impl Into<String>, input: &PropagationInput<'_>) -> LimitedDelta {
    let min_distance = input.min_distance;
    let delta_min_in = capture_delta_min(input.in_event_model);
    let delta_plus_in = capture_delta_plus(input.in_event_model);
    let busy_times = input.busy_times.to_vec();
    let bcrt = input.bcrt;
    let max_k = busy_times.len().saturating_sub(1) as u64;

    if max_k <= 1 {
        // No busy-window history to exploit yet (a single recorded
        // activation, the common case for a task whose busy period
        // never overlaps its own next release): fall back to the
        // jitter/bmin bound, which still shifts by the response-time
        // jitter instead of passing the input model through unchanged.
        return jitter_bmin(description_with_rule(description, "busy_window:fallback"), input);
    }

    let delta_min_in_for_min = delta_min_in.clone();
    let busy_times_for_min = busy_times.clone();
    LimitedDelta::new(
        description_with_rule(description, "busy_window"),
        u64::MAX,
        u64::MAX,
        move |n| {
            let best = (1..max_k)
                .map(|k| {
                    delta_min_in_for_min(n + k - 1).saturating_sub(busy_times_for_min[k as usize])
                })
                .min()
                .unwrap_or_else(Duration::zero);
            (best + bcrt).max(min_distance * (n - 1))
        },
        move |n| {
            (1..max_k)
                .map(|k| delta_plus_in((n + 1).saturating_sub(k)) + busy_times[k as usize])
                .max()
                .unwrap_or_else(Duration::zero)
                .saturating_sub(bcrt)
        },
    )
}

/// The tightest of the above: `δ⁻` takes the max of `jitter_bmin` and
/// `busy_window` (both are sound lower bounds on the output burst
/// length, so their max is still sound and tighter); `δ⁺` takes the
/// min, symmetrically.
fn optimal(description: impl Into<String>, input: &PropagationInput<'_>) -> LimitedDelta {
    let description: String = description.into();
    let bmin_model = jitter_bmin(
        description_with_rule(description.clone(), "optimal:bmin"),
        input,
    );
    let bw_model = busy_window(
        description_with_rule(description.clone(), "optimal:bw"),
        input,
    );

    LimitedDelta::new(
        description_with_rule(description, "optimal"),
        u64::MAX,
        u64::MAX,
        move |n| bmin_model.delta_min(n).max(bw_model.delta_min(n)),
        move |n| bmin_model.delta_plus(n).min(bw_model.delta_plus(n)),
    )
}

/// Memoised `δ⁻`/`δ⁺` closures over a borrowed model, so the rules
/// above can capture them by value (the closures own their cache,
/// independent of the model's own lifetime) without re-traversing a
/// trait object on every probe. Grounded on the additive-extension
/// cache pattern already used by [crate::event_model::additive].
fn capture_delta_min(model: &dyn EventModel) -> impl Fn(u64) -> Duration + Clone + 'static {
    let cache: Rc<RefCell<HashMap<u64, Duration>>> = Rc::new(RefCell::new(HashMap::new()));
    let values: Vec<Duration> = (0..=256).map(|n| model.delta_min(n)).collect();
    move |n| {
        if let Some(v) = values.get(n as usize) {
            return *v;
        }
        if let Some(v) = cache.borrow().get(&n) {
            return *v;
        }
        let v = max_additive(
            |k| values.get(k as usize).copied().unwrap_or(Duration::zero()),
            n,
            values.len() as u64 - 1,
            &cache,
        );
        v
    }
}

fn capture_delta_plus(model: &dyn EventModel) -> impl Fn(u64) -> Duration + Clone + 'static {
    let values: Vec<Duration> = (0..=256).map(|n| model.delta_plus(n)).collect();
    move |n| {
        values
            .get(n as usize)
            .copied()
            .unwrap_or_else(|| values.last().copied().unwrap_or_else(Duration::infinite))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_model::Pjd;

    fn sample_input() -> Pjd {
        Pjd::new(Duration::from(20), Duration::from(4), Duration::from(3))
    }

    #[test]
    fn jitter_rule_widens_by_response_jitter() {
        let input_model = sample_input();
        let input = PropagationInput {
            in_event_model: &input_model,
            wcrt: Duration::from(15),
            bcrt: Duration::from(5),
            busy_times: &[Duration::zero(), Duration::from(15)],
            min_distance: Duration::from(3),
        };
        let out = jitter("task", &input);
        // resp_jitter = 10; out.delta_plus(2) = in.delta_plus(2) + 10
        assert_eq!(out.delta_plus(2), input_model.delta_plus(2) + Duration::from(10));
    }

    #[test]
    fn optimal_is_at_least_as_tight_as_either_component() {
        let input_model = sample_input();
        let input = PropagationInput {
            in_event_model: &input_model,
            wcrt: Duration::from(15),
            bcrt: Duration::from(5),
            busy_times: &[Duration::zero(), Duration::from(10), Duration::from(18)],
            min_distance: Duration::from(3),
        };
        let bmin = jitter_bmin("task", &input);
        let bw = busy_window("task", &input);
        let opt = optimal("task", &input);
        for n in 2..10u64 {
            assert!(opt.delta_min(n) >= bmin.delta_min(n));
            assert!(opt.delta_min(n) >= bw.delta_min(n));
            assert!(opt.delta_plus(n) <= bmin.delta_plus(n));
            assert!(opt.delta_plus(n) <= bw.delta_plus(n));
        }
    }
}
