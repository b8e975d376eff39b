/*! The scheduler kernel: one generic WCRT/BCRT/backlog loop shared by
every scheduling policy, parameterised by the policy-specific
busy-window recurrence (`b⁺`) and stopping condition, per the
reference algebra. Policies only ever need to supply those two pieces;
everything else -- the outer activation-count loop, the fixed-point
search within each activation, the backlog bound -- lives here once.
*/

pub mod edf;
pub mod priority;
pub mod round_robin;
pub mod rox;
pub mod spnp;
pub mod spp;
pub mod tdma;

use std::rc::Rc;

use crate::error::NotSchedulable;
use crate::event_model::EventModel;
use crate::time::Duration;

/// A task on the same resource as the task under analysis, as seen by a
/// scheduling policy: its own execution cost and its input event model
/// (the only two things every policy's interference term needs).
///
/// Grounded on the reference implementation's `get_resource_interferers()`,
/// which returns the sibling `Task` objects themselves (their `wcet` and
/// `in_event_model` are read directly); this is the minimal slice of a
/// sibling task a policy actually touches.
#[derive(Clone)]
pub struct Interferer {
    pub wcet: Duration,
    pub scheduling_parameter: u64,
    pub in_event_model: Rc<dyn EventModel>,
}

impl Interferer {
    pub fn eta_plus(&self, w: Duration) -> u64 {
        self.in_event_model.eta_plus(w)
    }

    pub fn delta_min(&self, n: u64) -> Duration {
        self.in_event_model.delta_min(n)
    }
}

/// The capability every scheduling policy must provide to plug into
/// the generic kernel below.
///
/// `q` is always a 1-based activation count (the *q*-th activation of
/// the analysed task within its busy period), matching the event-model
/// convention that `n < 2` carries no information.
pub trait Scheduler {
    /// One refinement of the busy-window fixed point: given a trial
    /// window length `w`, return the demand (own plus interference)
    /// that must fit within it. The kernel iterates this until it
    /// reaches a fixed point (`workload(q, w) == w`).
    fn workload(&self, q: u64, w: Duration) -> Duration;

    /// A safe (typically `q * wcet`) starting point for the
    /// fixed-point search at activation `q`.
    fn initial_guess(&self, q: u64) -> Duration;

    /// Minimum busy time for `q` activations, used both as `bmin(t,q)`
    /// and to derive the best-case response time. Defaults to the
    /// common `q * bcet` lower bound; policies with a tighter bound
    /// (e.g. TDMA) override it.
    fn bmin(&self, q: u64) -> Duration;

    /// True once the busy period that started the analysis has ended:
    /// no further activation of the analysed task can still be
    /// pending once the window reaches `w`.
    fn stopping_condition(&self, q: u64, w: Duration) -> bool;

    /// Name of the task under analysis, used only for diagnostics.
    fn task_name(&self) -> &str;
}

/// Result of analysing one task: its worst/best-case response time,
/// the activation at which the worst case occurred, the full
/// busy-window sequence (`busy_times[0] == 0`, `busy_times[q]` for
/// `q = 1..K`, needed verbatim by busy-window propagation), and a
/// backlog bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    pub wcrt: Duration,
    pub bcrt: Duration,
    pub q_wcrt: u64,
    pub busy_times: Vec<Duration>,
    pub max_backlog: u64,
}

/// Iterate the busy-window fixed point for a single activation count
/// `q`: refine a trial window until `workload(q, w) == w`, or fail if
/// it diverges past `max_wcrt` or `max_iterations`.
fn fixed_point_busy_time<S: Scheduler + ?Sized>(
    s: &S,
    q: u64,
    max_iterations: u64,
    max_wcrt: Duration,
) -> Result<Duration, NotSchedulable> {
    let mut w = s.initial_guess(q);
    for _ in 0..max_iterations {
        let next = s.workload(q, w);
        if next == w {
            return Ok(w);
        }
        if next > max_wcrt {
            return Err(NotSchedulable::ResponseTimeLimitExceeded {
                task: s.task_name().to_string(),
                wcrt: next,
                limit: max_wcrt,
            });
        }
        w = next;
    }
    Err(NotSchedulable::IterationLimitExceeded {
        task: s.task_name().to_string(),
        max_iterations,
    })
}

/// Run the generic WCRT/BCRT/backlog loop for a task scheduled by `s`,
/// given its own input event model's `δ⁻` (used to turn a busy window
/// into a response time) and `η⁺` (used for the backlog bound).
pub fn analyze<S: Scheduler + ?Sized>(
    s: &S,
    delta_min_in: impl Fn(u64) -> Duration,
    eta_plus_in: impl Fn(Duration) -> u64,
    output_delay: Duration,
    max_iterations: u64,
    max_wcrt: Duration,
) -> Result<TaskResult, NotSchedulable> {
    let mut busy_times = vec![Duration::zero()];
    let mut wcrt = Duration::zero();
    let mut q_wcrt = 1;
    let mut max_backlog: i64 = 0;
    let mut q = 1u64;

    loop {
        let w = fixed_point_busy_time(s, q, max_iterations, max_wcrt)?;
        busy_times.push(w);

        let rt = w.saturating_sub(delta_min_in(q));
        if rt > wcrt {
            wcrt = rt;
            q_wcrt = q;
        }
        if wcrt > max_wcrt {
            return Err(NotSchedulable::ResponseTimeLimitExceeded {
                task: s.task_name().to_string(),
                wcrt,
                limit: max_wcrt,
            });
        }

        let backlog = eta_plus_in(w + output_delay) as i64 - q as i64 + 1;
        max_backlog = max_backlog.max(backlog);

        if s.stopping_condition(q, w) {
            break;
        }
        q += 1;
        if q > max_iterations {
            return Err(NotSchedulable::GlobalIterationLimitExceeded { max_iterations });
        }
    }

    let bcrt = s.bmin(1);
    Ok(TaskResult {
        wcrt,
        bcrt,
        q_wcrt,
        busy_times,
        max_backlog: max_backlog.max(0) as u64,
    })
}
