/*! The system graph: tasks, junctions, resources, paths and
effect chains, wired together by index rather than by reference.

Ported from the reference implementation's `model.py` (`Task`,
`Junction`, `Resource`, `Path`, `System`, `ConstraintsManager`), but
using an arena of stable integer indices instead of the original's
object-graph-with-back-pointers: Rust's aliasing rules make a cyclic
`Task <-> Resource <-> Task` reference graph awkward without
`Rc<RefCell<_>>` on every edge, whereas a handful of `Vec`s indexed by
newtype IDs gives the same connectivity with no interior mutability
except where a value genuinely changes during analysis (a task's
resolved input/output event models and analysis result).
*/

use std::cell::RefCell;
use std::rc::Rc;

use crate::event_model::{EventModel, Maximal};
use crate::junction::JunctionStrategy;
use crate::propagation::PropagationRule;
use crate::scheduler::TaskResult;
use crate::time::Duration;

macro_rules! index_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub usize);
    };
}

index_type!(TaskId);
index_type!(JunctionId);
index_type!(ResourceId);
index_type!(PathId);
index_type!(EffectChainId);
index_type!(MutexId);

/// A successor edge out of a task or junction: either feeds directly
/// into another task's input, or into a junction that combines it
/// with sibling inputs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Successor {
    Task(TaskId),
    Junction(JunctionId),
}

/// An element of a [Path]: most path elements are tasks, but a path
/// may also route through a junction, which contributes its
/// waiting/sampling delay (see [crate::junction::JunctionWait]) to the
/// path's latency instead of a WCRT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathElement {
    Task(TaskId),
    Junction(JunctionId),
}

/// Which scheduling policy a resource's tasks compete under. Carries
/// just enough per-policy configuration to build the right
/// [crate::scheduler::Scheduler] impl once every task's static data
/// (wcet, bcet, priority, deadline) is known; actual construction
/// happens in [crate::orchestrator] where siblings are visible.
#[derive(Debug, Clone)]
pub enum SchedulingPolicy {
    Spp {
        ordering: crate::scheduler::priority::PriorityOrdering,
    },
    Spnp {
        ordering: crate::scheduler::priority::PriorityOrdering,
        ctx_switch_overhead: Duration,
        cycle_time: Duration,
    },
    RoundRobin {
        slots: std::collections::HashMap<TaskId, Duration>,
    },
    Tdma {
        slots: std::collections::HashMap<TaskId, Duration>,
        cycle: Duration,
    },
    EdfP,
    /// SPP with `δ⁻`-correlated interferers ("Rox" in the reference
    /// implementation). `correlated_dmin[(analysed, interferer)]`
    /// is the known minimum distance from an activation of `analysed`
    /// to the corresponding correlated activation of `interferer`;
    /// pairs absent from the map are treated as uncorrelated (plain
    /// SPP interference). `exact` selects the approximate
    /// dmin-shrunk-window bound (`false`, cheaper) or the exact
    /// candidate-sequence search (`true`, tighter but more expensive).
    RoxSpp {
        ordering: crate::scheduler::priority::PriorityOrdering,
        correlated_dmin: std::collections::HashMap<(TaskId, TaskId), Duration>,
        exact: bool,
    },
}

pub struct Task {
    pub name: String,
    pub resource: ResourceId,
    pub wcet: Duration,
    pub bcet: Duration,
    /// Meaning depends on the owning resource's policy: a priority
    /// number for SPP/SPNP, unused for TDMA/round-robin (slot
    /// assignment lives on the resource), unused for EDF-P (which
    /// uses `deadline` instead).
    pub scheduling_parameter: u64,
    /// Relative deadline, used by EDF-P's ordering and by deadline
    /// constraints; `None` for tasks on non-deadline-driven resources.
    pub deadline: Option<Duration>,
    /// Phase/offset at which this task's own activations are released,
    /// tracked alongside the event model for offset-aware propagation
    /// (`JitterOffset`) and cause-effect chain analysis; `zero()` for
    /// tasks whose source is not itself phase-aligned.
    pub phase: Duration,
    /// A logical mutex this task shares with tasks on other resources;
    /// `None` if this task contends for no cross-resource lock.
    pub mutex: Option<MutexId>,
    pub successors: Vec<Successor>,
    /// Explicit per-task override of the propagation rule; `None` means
    /// "use the analysis run's `Config::default_propagation_rule`",
    /// which is how most tasks pick up the process-wide setting.
    pub propagation_rule: Option<PropagationRule>,
    /// `Some` only for fork tasks: one propagation rule per successor
    /// edge (same order as `successors`), letting each downstream edge
    /// see a differently-derived output model instead of one shared
    /// model broadcast to every successor. `None` means "not a fork":
    /// every successor receives the single model produced under
    /// `propagation_rule`.
    pub fork_rules: Option<Vec<PropagationRule>>,
    /// `None` until a predecessor (or the user) supplies one; a task
    /// with no resolved input by the time analysis runs is an
    /// [crate::error::InvalidInput::MissingInputEventModel].
    pub in_event_model: RefCell<Option<Rc<dyn EventModel>>>,
    pub out_event_model: RefCell<Option<Rc<dyn EventModel>>>,
    pub analysis_result: RefCell<Option<TaskResult>>,
}

impl Task {
    fn new(name: impl Into<String>, resource: ResourceId, wcet: Duration, bcet: Duration) -> Self {
        Task {
            name: name.into(),
            resource,
            wcet,
            bcet,
            scheduling_parameter: 0,
            deadline: None,
            phase: Duration::zero(),
            mutex: None,
            successors: Vec::new(),
            propagation_rule: None,
            fork_rules: None,
            in_event_model: RefCell::new(None),
            out_event_model: RefCell::new(None),
            analysis_result: RefCell::new(None),
        }
    }

    /// True if this task is a fork: its successor edges are driven by
    /// a per-successor strategy rather than a single shared output
    /// model, broadcast one-to-one over the successor list.
    pub fn is_fork(&self) -> bool {
        self.fork_rules.is_some()
    }

    pub fn resolved_in_event_model(&self) -> Rc<dyn EventModel> {
        self.in_event_model
            .borrow()
            .clone()
            .unwrap_or_else(|| Rc::new(Maximal))
    }
}

pub struct Junction {
    pub name: String,
    pub strategy: JunctionStrategy,
    /// Ordered predecessor edges; index into this vec is the position
    /// the strategy's `trigger` (for `SampledInput`) or per-input wait
    /// (for `And`) refers to.
    pub inputs: Vec<Successor>,
    pub successors: Vec<Successor>,
    pub in_event_models: RefCell<Vec<Rc<dyn EventModel>>>,
    pub out_event_model: RefCell<Option<Rc<dyn EventModel>>>,
    /// The per-input pseudo response time last computed by
    /// [crate::junction::evaluate], in the same order as `inputs`;
    /// consulted by path analysis when a [Path] routes through this
    /// junction instead of around it.
    pub waits: RefCell<Vec<crate::junction::JunctionWait>>,
    /// Which input positions (index into `inputs`) have received at
    /// least one propagated model; a junction is ready to evaluate
    /// once every input not excluded by cycle-cutting is in this set.
    pub arrived_inputs: RefCell<std::collections::HashSet<usize>>,
}

pub struct Resource {
    pub name: String,
    pub policy: SchedulingPolicy,
    pub tasks: Vec<TaskId>,
}

/// A logical shared resource that serialises execution across tasks on
/// (typically) different compute resources: holding the mutex is
/// mutually exclusive across every task listed here, regardless of
/// which `Resource` each executes on. The mutex itself never executes
/// anything; it only widens the orchestrator's dependency map so that
/// a change to any member's timing dirties every other member.
pub struct Mutex {
    pub name: String,
    pub tasks: Vec<TaskId>,
}

pub struct Path {
    pub name: String,
    pub elements: Vec<PathElement>,
    pub overhead: Duration,
}

impl Path {
    /// The ordered tasks on this path, skipping junction elements --
    /// what most callers (WCRT summation, the first task's input
    /// model) actually need.
    pub fn tasks(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.elements.iter().filter_map(|e| match e {
            PathElement::Task(t) => Some(*t),
            PathElement::Junction(_) => None,
        })
    }

    pub fn first_task(&self) -> Option<TaskId> {
        self.tasks().next()
    }
}

/// A cause-effect chain: like a [Path], but analysed for data-age or
/// reaction-time latency rather than classic/improved path latency
/// (spec component F), which additionally requires every task on the
/// chain to have a strictly periodic (possibly jittered) input model.
pub struct EffectChain {
    pub name: String,
    pub tasks: Vec<TaskId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Deadline { task: TaskId, deadline: Duration },
    PathLatency { path: PathId, n: usize, limit: Duration },
    Backlog { task: TaskId, limit: u64 },
    Load { resource: ResourceId, threshold: f64 },
}

/// The four constraint kinds a user can register, mirroring the
/// reference implementation's `ConstraintsManager`. Kept as a flat
/// `Vec` rather than four separate maps: constraints are checked once
/// per analysis run, not looked up by key during it.
#[derive(Debug, Clone, Default)]
pub struct ConstraintsManager {
    pub constraints: Vec<Constraint>,
}

impl ConstraintsManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_wcrt_constraint(&mut self, task: TaskId, deadline: Duration) {
        self.constraints.push(Constraint::Deadline { task, deadline });
    }

    pub fn add_path_constraint(&mut self, path: PathId, n: usize, limit: Duration) {
        self.constraints
            .push(Constraint::PathLatency { path, n, limit });
    }

    pub fn add_backlog_constraint(&mut self, task: TaskId, limit: u64) {
        self.constraints.push(Constraint::Backlog { task, limit });
    }

    pub fn add_load_constraint(&mut self, resource: ResourceId, threshold: f64) {
        self.constraints.push(Constraint::Load { resource, threshold });
    }
}

/// The whole analysable system: every task, junction, resource, path
/// and effect chain, plus the constraints registered against them.
#[derive(Default)]
pub struct System {
    pub name: String,
    pub tasks: Vec<Task>,
    pub junctions: Vec<Junction>,
    pub resources: Vec<Resource>,
    pub mutexes: Vec<Mutex>,
    pub paths: Vec<Path>,
    pub effect_chains: Vec<EffectChain>,
    pub constraints: ConstraintsManager,
}

impl System {
    pub fn new(name: impl Into<String>) -> Self {
        System {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn add_resource(&mut self, name: impl Into<String>, policy: SchedulingPolicy) -> ResourceId {
        let id = ResourceId(self.resources.len());
        self.resources.push(Resource {
            name: name.into(),
            policy,
            tasks: Vec::new(),
        });
        id
    }

    pub fn add_task(
        &mut self,
        name: impl Into<String>,
        resource: ResourceId,
        wcet: Duration,
        bcet: Duration,
    ) -> TaskId {
        let id = TaskId(self.tasks.len());
        self.tasks.push(Task::new(name, resource, wcet, bcet));
        self.resources[resource.0].tasks.push(id);
        id
    }

    pub fn add_junction(&mut self, name: impl Into<String>, strategy: JunctionStrategy) -> JunctionId {
        let id = JunctionId(self.junctions.len());
        self.junctions.push(Junction {
            name: name.into(),
            strategy,
            inputs: Vec::new(),
            successors: Vec::new(),
            in_event_models: RefCell::new(Vec::new()),
            out_event_model: RefCell::new(None),
            waits: RefCell::new(Vec::new()),
            arrived_inputs: RefCell::new(std::collections::HashSet::new()),
        });
        id
    }

    /// Register a logical mutex shared by `tasks` (typically on
    /// different resources): any change to one member's timing will
    /// dirty every other member in the orchestrator's dependency map.
    pub fn add_mutex(&mut self, name: impl Into<String>, tasks: Vec<TaskId>) -> MutexId {
        let id = MutexId(self.mutexes.len());
        for &t in &tasks {
            self.tasks[t.0].mutex = Some(id);
        }
        self.mutexes.push(Mutex {
            name: name.into(),
            tasks,
        });
        id
    }

    pub fn add_path(&mut self, name: impl Into<String>, elements: Vec<PathElement>, overhead: Duration) -> PathId {
        let id = PathId(self.paths.len());
        self.paths.push(Path {
            name: name.into(),
            elements,
            overhead,
        });
        id
    }

    pub fn add_effect_chain(&mut self, name: impl Into<String>, tasks: Vec<TaskId>) -> EffectChainId {
        let id = EffectChainId(self.effect_chains.len());
        self.effect_chains.push(EffectChain {
            name: name.into(),
            tasks,
        });
        id
    }

    /// Link a task's output to another task's input.
    pub fn link_task_to_task(&mut self, from: TaskId, to: TaskId) {
        self.tasks[from.0].successors.push(Successor::Task(to));
    }

    /// Link a task's output into a junction's input set.
    pub fn link_task_to_junction(&mut self, from: TaskId, to: JunctionId) {
        self.tasks[from.0].successors.push(Successor::Junction(to));
        self.junctions[to.0].inputs.push(Successor::Task(from));
    }

    /// Link a junction's output to a task's input.
    pub fn link_junction_to_task(&mut self, from: JunctionId, to: TaskId) {
        self.junctions[from.0].successors.push(Successor::Task(to));
    }

    /// Give a task an exogenous (externally supplied) input event
    /// model, i.e. one not produced by propagation from a predecessor.
    pub fn set_source_event_model(&mut self, task: TaskId, model: Rc<dyn EventModel>) {
        *self.tasks[task.0].in_event_model.borrow_mut() = Some(model);
    }

    /// Turn `task` into a fork: each of its successor edges (in the
    /// order they were linked) gets its own propagation rule instead
    /// of sharing `propagation_rule`. `rules.len()` must match the
    /// number of successors eventually linked to this task.
    pub fn set_fork_rules(&mut self, task: TaskId, rules: Vec<PropagationRule>) {
        self.tasks[task.0].fork_rules = Some(rules);
    }

    pub fn set_phase(&mut self, task: TaskId, phase: Duration) {
        self.tasks[task.0].phase = phase;
    }

    /// Override the propagation rule used for `task`'s output, in
    /// place of the analysis run's `Config::default_propagation_rule`.
    /// Has no effect on a fork task's successors, which are each
    /// driven by their own entry in `fork_rules` instead.
    pub fn set_propagation_rule(&mut self, task: TaskId, rule: PropagationRule) {
        self.tasks[task.0].propagation_rule = Some(rule);
    }

    pub fn task(&self, id: TaskId) -> &Task {
        &self.tasks[id.0]
    }

    pub fn junction(&self, id: JunctionId) -> &Junction {
        &self.junctions[id.0]
    }

    pub fn resource(&self, id: ResourceId) -> &Resource {
        &self.resources[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_model::Pjd;
    use crate::scheduler::priority::PriorityOrdering;

    #[test]
    fn wiring_a_two_task_chain_on_one_resource() {
        let mut sys = System::new("demo");
        let r = sys.add_resource("R1", SchedulingPolicy::Spp { ordering: PriorityOrdering::LowWinsFifo });
        let t1 = sys.add_task("T1", r, Duration::from(5), Duration::from(2));
        let t2 = sys.add_task("T2", r, Duration::from(3), Duration::from(1));
        sys.link_task_to_task(t1, t2);
        sys.set_source_event_model(
            t1,
            Rc::new(Pjd::new(Duration::from(20), Duration::zero(), Duration::from(20))),
        );

        assert_eq!(sys.resource(r).tasks, vec![t1, t2]);
        assert_eq!(sys.task(t1).successors, vec![Successor::Task(t2)]);
        assert!(sys.task(t2).in_event_model.borrow().is_none());
    }
}
