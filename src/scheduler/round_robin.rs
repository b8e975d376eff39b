//! Cooperative, slot-size-based round robin.
//!
//! Ported from the reference implementation's `RoundRobinScheduler.b_plus`:
//! every task on the resource owns a fixed slot quantum and is visited
//! once per round; a task runs to completion once it is its turn
//! (cooperative, not preemptible mid-slot). An interferer can delay the
//! analysed task by at most one slot per round it actually has pending
//! work in, so its contribution is capped by both "one slot per round
//! the analysed task itself needs" and its own real demand.

use std::rc::Rc;

use super::{Interferer, Scheduler};
use crate::event_model::EventModel;
use crate::time::Duration;

/// A sibling task on the round-robin resource together with the slot
/// quantum it is allotted.
pub struct RrInterferer {
    pub interferer: Interferer,
    pub slot: Duration,
}

pub struct RoundRobin {
    task_name: String,
    wcet: Duration,
    bcet: Duration,
    slot: Duration,
    in_event_model: Rc<dyn EventModel>,
    interferers: Vec<RrInterferer>,
}

impl RoundRobin {
    pub fn new(
        task_name: impl Into<String>,
        wcet: Duration,
        bcet: Duration,
        slot: Duration,
        in_event_model: Rc<dyn EventModel>,
        interferers: Vec<RrInterferer>,
    ) -> Self {
        RoundRobin {
            task_name: task_name.into(),
            wcet,
            bcet,
            slot,
            in_event_model,
            interferers,
        }
    }
}

/// `ceil(numerator / denominator)` for a non-zero `Duration` denominator.
fn ceil_div(numerator: Duration, denominator: Duration) -> u64 {
    if denominator.is_zero() {
        return 0;
    }
    let n: u64 = numerator.into();
    let d: u64 = denominator.into();
    (n + d - 1) / d
}

impl Scheduler for RoundRobin {
    fn workload(&self, q: u64, w: Duration) -> Duration {
        let own = self.wcet * q;
        let rounds = ceil_div(own, self.slot);
        let interference: Duration = self
            .interferers
            .iter()
            .map(|ri| {
                let by_rounds = ri.slot * rounds;
                let by_demand = ri.interferer.wcet * ri.interferer.eta_plus(w);
                by_rounds.min(by_demand)
            })
            .sum();
        own + interference
    }

    fn initial_guess(&self, q: u64) -> Duration {
        self.wcet * q
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
