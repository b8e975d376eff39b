//! Static-priority non-preemptive scheduling.
//!
//! Ported from the reference implementation's `SPNPScheduler`: the SPP
//! recurrence plus a one-off blocking term (the longest lower-priority
//! job that may already be running non-preemptively when the analysed
//! task arrives) and an optional per-job context-switch overhead and
//! release-jitter-style cycle time folded into the interference count.

use std::rc::Rc;

use super::{Interferer, Scheduler};
use crate::event_model::EventModel;
use crate::time::Duration;

pub struct Spnp {
    task_name: String,
    wcet: Duration,
    bcet: Duration,
    in_event_model: Rc<dyn EventModel>,
    /// Interferers at least as important as the analysed task: each
    /// job of theirs costs `wcet + ctx_switch_overhead` on the
    /// resource.
    higher_or_equal: Vec<Interferer>,
    /// The longest non-preemptive job among lower-priority tasks,
    /// i.e. `max(wcet)` over interferers strictly less important than
    /// the analysed task -- `0` if there are none.
    blocking: Duration,
    ctx_switch_overhead: Duration,
    /// Added to the window before counting higher-priority arrivals,
    /// modelling a dispatch cycle that only samples releases at fixed
    /// boundaries (0 for tick-less dispatch).
    cycle_time: Duration,
}

impl Spnp {
    pub fn new(
        task_name: impl Into<String>,
        wcet: Duration,
        bcet: Duration,
        in_event_model: Rc<dyn EventModel>,
        higher_or_equal: Vec<Interferer>,
        lower_priority: &[Interferer],
        ctx_switch_overhead: Duration,
        cycle_time: Duration,
    ) -> Self {
        let blocking = lower_priority
            .iter()
            .map(|i| i.wcet)
            .max()
            .unwrap_or_else(Duration::zero);
        Spnp {
            task_name: task_name.into(),
            wcet,
            bcet,
            in_event_model,
            higher_or_equal,
            blocking,
            ctx_switch_overhead,
            cycle_time,
        }
    }
}

impl Scheduler for Spnp {
    fn workload(&self, q: u64, w: Duration) -> Duration {
        let own = (self.wcet + self.ctx_switch_overhead) * q;
        let interference: Duration = self
            .higher_or_equal
            .iter()
            .map(|i| (i.wcet + self.ctx_switch_overhead) * i.eta_plus(w + self.cycle_time))
            .sum();
        self.blocking + own + interference
    }

    fn initial_guess(&self, q: u64) -> Duration {
        self.blocking + self.wcet * q
    }

    fn bmin(&self, q: u64) -> Duration {
        self.bcet * q
    }

    fn stopping_condition(&self, q: u64, w: Duration) -> bool {
        self.in_event_model.delta_min(q + 1) >= w
    }

    fn task_name(&self) -> &str {
        &self.task_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_model::Pjd;
    use crate::scheduler::analyze;

    /// With no interferers at all, blocking and interference are both
    /// zero, so SPNP degenerates to plain execution cost -- same shape
    /// as the SPP `isolated` case.
    #[test]
    fn no_interferers_means_wcrt_equals_wcet() {
        let model: Rc<dyn EventModel> =
            Rc::new(Pjd::new(Duration::from(50), Duration::zero(), Duration::from(50)));
        let s = Spnp::new(
            "T",
            Duration::from(7),
            Duration::from(2),
            model.clone(),
            vec![],
            &[],
            Duration::zero(),
            Duration::zero(),
        );
        let r = analyze(
            &s,
            |n| model.delta_min(n),
            |w| model.eta_plus(w),
            Duration::zero(),
            1000,
            Duration::from(10_000),
        )
        .unwrap();
        assert_eq!(r.wcrt, Duration::from(7));
    }

    /// A single lower-priority blocker adds exactly its own wcet as a
    /// one-off delay, regardless of how many activations occur.
    #[test]
    fn lower_priority_blocker_adds_its_wcet_once() {
        let model: Rc<dyn EventModel> =
            Rc::new(Pjd::new(Duration::from(50), Duration::zero(), Duration::from(50)));
        let blocker_model: Rc<dyn EventModel> =
            Rc::new(Pjd::new(Duration::from(1000), Duration::zero(), Duration::from(1000)));
        let blocker = Interferer {
            wcet: Duration::from(4),
            scheduling_parameter: 99,
            in_event_model: blocker_model,
        };
        let s = Spnp::new(
            "T",
            Duration::from(7),
            Duration::from(2),
            model.clone(),
            vec![],
            &[blocker],
            Duration::zero(),
            Duration::zero(),
        );
        let r = analyze(
            &s,
            |n| model.delta_min(n),
            |w| model.eta_plus(w),
            Duration::zero(),
            1000,
            Duration::from(10_000),
        )
        .unwrap();
        assert_eq!(r.wcrt, Duration::from(11));
    }
}
