/*! Junctions: combining several incoming event streams into one
outgoing stream, for tasks or paths with more than one predecessor.

Ported from the reference implementation's `junctions.py`
(`ANDJoin`, `ORJoin`, `SampledInput`) and the `OREventModel` helper in
`model.py`. A junction never schedules anything itself; it only
produces an output [EventModel] from its inputs', plus -- for
AND-join and sampled-input strategies -- a pseudo WCRT/BCRT per input
that downstream path analysis charges as a waiting delay.
*/

use std::rc::Rc;

use crate::error::InvalidInput;
use crate::event_model::EventModel;
use crate::time::Duration;

/// The per-input pseudo response time a junction may impose before an
/// event can contribute to the join's output, charged by path
/// analysis the same way a task's own WCRT/BCRT is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JunctionWait {
    pub bcrt: Duration,
    pub wcrt: Duration,
}

/// One of the three combination strategies a junction can apply.
#[derive(Debug, Clone, Copy)]
pub enum JunctionStrategy {
    /// All inputs must arrive; the output event model is the
    /// pointwise strictest bound, and every non-slowest input pays a
    /// waiting delay for the slowest sibling.
    And,
    /// Any input arriving produces an output event; the output event
    /// model is the union ([OrEventModel]) of every input.
    Or,
    /// One input is a sampling trigger; every other input is read at
    /// the trigger's rate and pays a pseudo response time equal to the
    /// trigger's own minimum inter-arrival distance (the worst-case
    /// staleness of a sample).
    SampledInput { trigger: usize },
}

/// Evaluate a junction's output event model and each input's waiting
/// delay, given every input's resolved event model. Inputs are
/// addressed by position, matching the order they were bound to the
/// junction in the system graph.
pub fn evaluate(
    name: &str,
    strategy: &JunctionStrategy,
    inputs: &[Rc<dyn EventModel>],
) -> Result<(Rc<dyn EventModel>, Vec<JunctionWait>), InvalidInput> {
    if inputs.is_empty() {
        return Err(InvalidInput::EmptyJunction {
            junction: name.to_string(),
        });
    }

    match strategy {
        JunctionStrategy::And => Ok(and_join(inputs)),
        JunctionStrategy::Or => Ok(or_join(inputs)),
        JunctionStrategy::SampledInput { trigger } => Ok(sampled_input(inputs, *trigger)),
    }
}

/// `δ⁻(n) = min_i in_i.δ⁻(n)`, `δ⁺(n) = max_i in_i.δ⁺(n)`: the join
/// can only fire once every input has supplied its `n`-th event, so
/// the earliest possible n-th join output is bounded by the *slowest*
/// input's earliest case, and the latest by the slowest input's
/// latest case.
///
/// Every input but the one that actually determines the bound at a
/// given `n` must wait for it; since that varies with `n`, the waiting
/// delay charged per input (for path analysis, which needs a single
/// number) is the worst case over all inputs: the largest pairwise gap
/// between any two inputs' `δ⁺(2)`.
fn and_join(inputs: &[Rc<dyn EventModel>]) -> (Rc<dyn EventModel>, Vec<JunctionWait>) {
    let out: Rc<dyn EventModel> = Rc::new(AndEventModel {
        inputs: inputs.to_vec(),
    });

    let waits = (0..inputs.len())
        .map(|idx| {
            let worst_sibling = inputs
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != idx)
                .map(|(_, other)| other.delta_plus(2))
                .max()
                .unwrap_or_else(Duration::zero);
            JunctionWait {
                bcrt: Duration::zero(),
                wcrt: worst_sibling,
            }
        })
        .collect();

    (out, waits)
}

#[derive(Debug)]
struct AndEventModel {
    inputs: Vec<Rc<dyn EventModel>>,
}

impl EventModel for AndEventModel {
    fn description(&self) -> String {
        "and-join".to_string()
    }

    fn delta_min(&self, n: u64) -> Duration {
        self.inputs
            .iter()
            .map(|i| i.delta_min(n))
            .min()
            .unwrap_or_else(Duration::zero)
    }

    fn delta_plus(&self, n: u64) -> Duration {
        self.inputs
            .iter()
            .map(|i| i.delta_plus(n))
            .max()
            .unwrap_or_else(Duration::infinite)
    }
}

/// Every input independently contributes events to the output stream;
/// no waiting delay is charged (the output is ready as soon as any
/// one input produces an event).
fn or_join(inputs: &[Rc<dyn EventModel>]) -> (Rc<dyn EventModel>, Vec<JunctionWait>) {
    let out: Rc<dyn EventModel> = Rc::new(OrEventModel {
        inputs: inputs.to_vec(),
    });
    let waits = inputs
        .iter()
        .map(|_| JunctionWait {
            bcrt: Duration::zero(),
            wcrt: Duration::zero(),
        })
        .collect();
    (out, waits)
}

/// The union of several independent event streams: bounds on counts
/// add directly (an `η` over a window is just the sum of how many
/// events each input could contribute in that window), and `δ` is
/// derived back from the summed `η` by the standard duality, since no
/// closed form for the sum of several `δ` functions exists in general.
#[derive(Debug)]
pub struct OrEventModel {
    inputs: Vec<Rc<dyn EventModel>>,
}

impl EventModel for OrEventModel {
    fn description(&self) -> String {
        "or-join".to_string()
    }

    /// `δ⁻(n)` is the smallest window that can possibly contain `n`
    /// events, i.e. the smallest `w` with `η⁺(w) >= n` -- the reverse
    /// direction of the usual η-from-δ search, needed here because the
    /// union's natural closed form is the summed counts, not a δ.
    fn delta_min(&self, n: u64) -> Duration {
        if n < 2 {
            return Duration::zero();
        }
        smallest_w_with_count_at_least(|w| self.eta_plus(w), n)
    }

    /// `δ⁺(n)` is the smallest window guaranteed to contain `n`
    /// events even in the worst case, i.e. the smallest `w` with
    /// `η⁻(w) >= n`.
    fn delta_plus(&self, n: u64) -> Duration {
        if n < 2 {
            return Duration::zero();
        }
        smallest_w_with_count_at_least(|w| self.eta_minus(w), n)
    }

    fn eta_plus(&self, w: Duration) -> u64 {
        self.inputs.iter().map(|i| i.eta_plus(w)).sum()
    }

    fn eta_plus_closed(&self, w: Duration) -> u64 {
        self.inputs.iter().map(|i| i.eta_plus_closed(w)).sum()
    }

    fn eta_minus(&self, w: Duration) -> u64 {
        self.inputs.iter().map(|i| i.eta_minus(w)).sum()
    }

    fn eta_minus_closed(&self, w: Duration) -> u64 {
        self.inputs.iter().map(|i| i.eta_minus_closed(w)).sum()
    }
}

/// Smallest `w` such that `count(w) >= n`, by exponential then binary
/// search; `count` must be non-decreasing in `w`. Mirrors
/// [crate::event_model::search]'s η-from-δ search, run in the
/// opposite direction.
pub(crate) fn smallest_w_with_count_at_least(count: impl Fn(Duration) -> u64, n: u64) -> Duration {
    let mut hi: u64 = 1;
    while count(Duration::from(hi)) < n {
        if hi >= (1u64 << 40) {
            return Duration::infinite();
        }
        hi *= 2;
    }
    let mut lo: u64 = hi / 2;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if count(Duration::from(mid)) >= n {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    Duration::from(hi)
}

/// One input is the sampling trigger; every other input is treated as
/// read, not awaited -- it contributes no events of its own to the
/// output, but pays a staleness delay equal to the trigger's shortest
/// inter-arrival distance (the longest it could have sat unread).
fn sampled_input(
    inputs: &[Rc<dyn EventModel>],
    trigger: usize,
) -> (Rc<dyn EventModel>, Vec<JunctionWait>) {
    let trigger_model = inputs[trigger].clone();
    let sampling_delay = trigger_model.delta_plus(2);

    let waits = inputs
        .iter()
        .enumerate()
        .map(|(i, _)| {
            if i == trigger {
                JunctionWait {
                    bcrt: Duration::zero(),
                    wcrt: Duration::zero(),
                }
            } else {
                JunctionWait {
                    bcrt: Duration::zero(),
                    wcrt: sampling_delay,
                }
            }
        })
        .collect();

    (trigger_model, waits)
}
