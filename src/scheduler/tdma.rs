//! Time-division multiple access: a fixed, repeating cycle divided
//! into slots, one slot owned by the analysed task.
//!
//! Ported from the reference implementation's `TDMAScheduler.b_plus`,
//! a closed form rather than an interference sum: the analysed task's
//! own demand is served only during its slot, so a `q`-activation
//! busy window spans `ceil(demand / slot) - 1` full cycles of
//! "downtime" (the rest of the TDMA cycle in which other slots run)
//! plus the demand itself.

use std::rc::Rc;

use super::Scheduler;
use crate::event_model::EventModel;
use crate::time::Duration;

pub struct Tdma {
    task_name: String,
    wcet: Duration,
    bcet: Duration,
    in_event_model: Rc<dyn EventModel>,
    /// Length of this task's own slot within the cycle.
    slot: Duration,
    /// Length of the full TDMA cycle (sum of every task's slot).
    cycle: Duration,
}

impl Tdma {
    pub fn new(
        task_name: impl Into<String>,
        wcet: Duration,
        bcet: Duration,
        in_event_model: Rc<dyn EventModel>,
        slot: Duration,
        cycle: Duration,
    ) -> Self {
        Tdma {
            task_name: task_name.into(),
            wcet,
            bcet,
            in_event_model,
            slot,
            cycle,
        }
    }

    fn downtime(&self) -> Duration {
        self.cycle.saturating_sub(self.slot)
    }
}

fn ceil_div(numerator: Duration, denominator: Duration) -> u64 {
    if denominator.is_zero() {
        return 0;
    }
    let n: u64 = numerator.into();
    let d: u64 = denominator.into();
    (n + d - 1) / d
}

impl Scheduler for Tdma {
    /// TDMA's busy-window recurrence is already closed-form in `q`
    /// alone, so `workload` ignores the trial `w` and returns the
    /// exact answer on the first call; the generic fixed point in
    /// [super::analyze] then converges in a single iteration.
    fn workload(&self, q: u64, _w: Duration) -> Duration {
        let demand = self.wcet * q;
        let slots_needed = ceil_div(demand, self.slot);
        demand + slots_needed * self.downtime()
    }

    fn initial_guess(&self, q: u64) -> Duration {
        self.workload(q, Duration::zero())
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
