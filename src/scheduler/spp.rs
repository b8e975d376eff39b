//! Static-priority-preemptive scheduling.
//!
//! Ported from the reference implementation's `SPPScheduler.b_plus`
//! (Theorem 1 in Lehoczky 1990 / Equation 2.3 in Richter 2005): the
//! classic busy-window recurrence, counting interference from every
//! task at least as important as the analysed one.

use std::rc::Rc;

use super::{Interferer, Scheduler};
use crate::event_model::EventModel;
use crate::scheduler::priority::PriorityOrdering;
use crate::time::Duration;

pub struct Spp {
    task_name: String,
    wcet: Duration,
    bcet: Duration,
    in_event_model: Rc<dyn EventModel>,
    /// Already filtered down to interferers at least as important as the
    /// analysed task under `ordering` — ties interfere too (FCFS among
    /// equal priorities), matching the reference implementation.
    interferers: Vec<Interferer>,
}

impl Spp {
    pub fn new(
        task_name: impl Into<String>,
        wcet: Duration,
        bcet: Duration,
        in_event_model: Rc<dyn EventModel>,
        priority: u64,
        ordering: PriorityOrdering,
        all_other_tasks: impl IntoIterator<Item = Interferer>,
    ) -> Self {
        let interferers = all_other_tasks
            .into_iter()
            .filter(|i| ordering.at_least_as_important(i.scheduling_parameter, priority))
            .collect();
        Spp {
            task_name: task_name.into(),
            wcet,
            bcet,
            in_event_model,
            interferers,
        }
    }
}

impl Scheduler for Spp {
    fn workload(&self, q: u64, w: Duration) -> Duration {
        let interference: Duration = self
            .interferers
            .iter()
            .map(|i| i.wcet * i.eta_plus(w))
            .sum();
        self.wcet * q + interference
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_model::Pjd;
    use crate::scheduler::analyze;

    /// The first seed scenario from the regression suite: two resources,
    /// SPP on both. This test covers just R1 (T11, T12); the full
    /// two-resource scenario (with propagation to R2) lives in
    /// `crate::orchestrator`'s integration tests.
    #[test]
    fn two_tasks_on_one_resource() {
        let t11_model: Rc<dyn EventModel> =
            Rc::new(Pjd::new(Duration::from(30), Duration::from(5), Duration::zero()));
        let t12_model: Rc<dyn EventModel> =
            Rc::new(Pjd::new(Duration::from(15), Duration::from(6), Duration::zero()));

        let t11_wcet = Duration::from(10);
        let t12_wcet = Duration::from(3);

        let t12_as_interferer = Interferer {
            wcet: t12_wcet,
            scheduling_parameter: 2,
            in_event_model: t12_model.clone(),
        };
        let t11_as_interferer = Interferer {
            wcet: t11_wcet,
            scheduling_parameter: 1,
            in_event_model: t11_model.clone(),
        };

        let s11 = Spp::new(
            "T11",
            t11_wcet,
            Duration::from(5),
            t11_model.clone(),
            1,
            PriorityOrdering::LowWinsFifo,
            vec![t12_as_interferer],
        );
        let r11 = analyze(
            &s11,
            |n| t11_model.delta_min(n),
            |w| t11_model.eta_plus(w),
            Duration::zero(),
            1000,
            Duration::from(100_000),
        )
        .unwrap();
        assert_eq!(r11.wcrt, Duration::from(10));

        let s12 = Spp::new(
            "T12",
            t12_wcet,
            Duration::from(1),
            t12_model.clone(),
            2,
            PriorityOrdering::LowWinsFifo,
            vec![t11_as_interferer],
        );
        let r12 = analyze(
            &s12,
            |n| t12_model.delta_min(n),
            |w| t12_model.eta_plus(w),
            Duration::zero(),
            1000,
            Duration::from(100_000),
        )
        .unwrap();
        assert_eq!(r12.wcrt, Duration::from(13));
    }
}
