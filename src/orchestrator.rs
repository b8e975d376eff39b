/*! The global fixed-point orchestrator: repeatedly analyse dirty
tasks, propagate changed output event models to their successors, and
mark the new recipients dirty, until nothing changes or a global
iteration ceiling is hit.

Ported from the reference implementation's `GlobalAnalysisState` and
`analyze_system` in `analysis.py`: a dirty-set loop over a
deterministic analysis order, re-running local analysis only where
something upstream actually changed.
*/

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use log::{debug, info, warn};

use crate::error::{AnalysisError, ConstraintViolation, InvalidInput, NotSchedulable};
use crate::event_model::EventModel;
use crate::junction::{self, JunctionWait};
use crate::propagation::{self, PropagationInput, PropagationRule};
use crate::scheduler::{self, Interferer, Scheduler, TaskResult};
use crate::system::{JunctionId, Resource, SchedulingPolicy, Successor, System, Task, TaskId};
use crate::time::Duration;

/// Tunable limits and defaults for a run of [analyze_system]. Replaces
/// the reference implementation's global, mutate-anywhere
/// `options.set_opt` registry with an explicit, passed-by-value
/// struct -- every analysis run's configuration is then visible at
/// its call site instead of depending on ambient global state.
#[derive(Debug, Clone)]
pub struct Config {
    /// Ceiling on activations considered within a single task's local
    /// busy-window search.
    pub max_local_iterations: u64,
    /// Ceiling on response time a local search may converge to before
    /// it is treated as a divergence (not just "large").
    pub max_wcrt: Duration,
    /// Ceiling on individual task (re-)analyses across the whole
    /// global dirty-set loop (not sweeps: the order restarts from its
    /// head after every change, so this bounds total work, not rounds).
    pub max_global_iterations: u64,
    /// Propagation rule used for a task that doesn't specify its own.
    pub default_propagation_rule: PropagationRule,
    /// The asymptotic-load horizon (a count of events) used for the
    /// final per-resource load gate.
    pub load_horizon: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_local_iterations: 10_000,
            max_wcrt: Duration::infinite(),
            max_global_iterations: 100_000,
            default_propagation_rule: PropagationRule::default(),
            load_horizon: 10_000,
        }
    }
}

/// Everything [analyze_system] learned: every task's resolved result,
/// and any user-registered constraints it violates (reported, not
/// raised -- a constraint violation does not invalidate the analysis
/// itself, unlike a [NotSchedulable] failure).
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub task_results: HashMap<TaskId, TaskResult>,
    pub violations: Vec<ConstraintViolation>,
}

/// Run the full system analysis to a global fixed point. `progress_hook`,
/// if given, is invoked once per task re-analysis (including repeat
/// analyses triggered by later rounds) with the task just analysed --
/// it does not influence the analysis, only observes it.
pub fn analyze_system(
    sys: &System,
    config: &Config,
    mut progress_hook: Option<&mut dyn FnMut(&Task)>,
) -> Result<AnalysisResult, AnalysisError> {
    for task in &sys.tasks {
        if task.in_event_model.borrow().is_none() && !has_predecessor(sys, task) {
            return Err(InvalidInput::MissingInputEventModel {
                task: task.name.clone(),
            }
            .into());
        }
    }

    // Every resource's asymptotic load must be below 1.0 before the
    // first local WCRT is computed, not just checked on the way out:
    // a directly overloaded resource is rejected up front, using
    // whatever event models are already attached (exogenous sources --
    // a task with no predecessor yet resolves to `Maximal`, whose
    // near-zero load never trips this gate).
    check_resource_loads(sys, config)?;

    let order = analysis_order(sys);
    let dependent_tasks = build_dependent_tasks(sys);
    let cycle_cuts = compute_junction_cycle_cuts(sys);
    let mut dirty: HashSet<TaskId> = sys.tasks.iter().enumerate().map(|(i, _)| TaskId(i)).collect();
    let mut results: HashMap<TaskId, TaskResult> = HashMap::new();

    let mut round = 0u64;
    while !dirty.is_empty() {
        round += 1;
        if round > config.max_global_iterations {
            return Err(NotSchedulable::GlobalIterationLimitExceeded {
                max_iterations: config.max_global_iterations,
            }
            .into());
        }
        debug!("orchestrator: round {round}, {} dirty task(s)", dirty.len());

        let mut progressed = false;
        for &task_id in &order {
            if !dirty.remove(&task_id) {
                continue;
            }
            progressed = true;

            let task = &sys.tasks[task_id.0];
            let result = analyze_task(sys, task_id, config)?;
            check_monotonicity(task, &result)?;
            if let Some(hook) = progress_hook.as_deref_mut() {
                hook(task);
            }

            let changed = results.get(&task_id) != Some(&result);
            results.insert(task_id, result.clone());

            if changed {
                info!("orchestrator: '{}' changed, propagating", task.name);
                propagate_from_task(sys, task_id, &result, config, &cycle_cuts, &mut dirty)?;
                if let Some(deps) = dependent_tasks.get(&task_id) {
                    dirty.extend(deps.iter().copied());
                }
            }
            break; // restart the scan from the deterministic order's head
        }
        if !progressed {
            break;
        }
    }

    let violations = check_constraints(sys, &results);

    Ok(AnalysisResult {
        task_results: results,
        violations,
    })
}

fn has_predecessor(sys: &System, task: &Task) -> bool {
    sys.tasks.iter().any(|t| {
        t.successors.iter().any(|s| match s {
            Successor::Task(id) => std::ptr::eq(&sys.tasks[id.0], task),
            Successor::Junction(_) => false,
        })
    }) || sys.junctions.iter().any(|j| {
        j.successors.iter().any(|s| match s {
            Successor::Task(id) => std::ptr::eq(&sys.tasks[id.0], task),
            Successor::Junction(_) => false,
        })
    })
}

/// Every task reachable, transitively, from `from`'s successor edges,
/// treating junctions as transparent pass-throughs (they forward, but
/// do not themselves get analysed).
fn reachable_tasks(sys: &System, from: TaskId) -> HashSet<TaskId> {
    let mut seen = HashSet::new();
    let mut seen_junctions = HashSet::new();
    let mut queue = vec![Successor::Task(from)];
    while let Some(node) = queue.pop() {
        let successors: &[Successor] = match node {
            Successor::Task(id) => &sys.tasks[id.0].successors,
            Successor::Junction(id) => &sys.junctions[id.0].successors,
        };
        for &s in successors {
            match s {
                Successor::Task(id) => {
                    if seen.insert(id) {
                        queue.push(Successor::Task(id));
                    }
                }
                Successor::Junction(id) => {
                    if seen_junctions.insert(id) {
                        queue.push(Successor::Junction(id));
                    }
                }
            }
        }
    }
    seen
}

/// Every other task on `t`'s own resource -- siblings whose local
/// analysis reads `t`'s current input event model as an interferer.
fn resource_interferers(sys: &System, t: TaskId) -> Vec<TaskId> {
    let resource = sys.tasks[t.0].resource;
    sys.resources[resource.0]
        .tasks
        .iter()
        .copied()
        .filter(|&id| id != t)
        .collect()
}

/// Every other task sharing `t`'s mutex, if any: a group of tasks,
/// possibly on different resources, that block each other the way
/// resource-interferers do.
fn mutex_interferers(sys: &System, t: TaskId) -> Vec<TaskId> {
    match sys.tasks[t.0].mutex {
        Some(mid) => sys.mutexes[mid.0]
            .tasks
            .iter()
            .copied()
            .filter(|&id| id != t)
            .collect(),
        None => Vec::new(),
    }
}

/// Every task that must be marked dirty when `t`'s analysis result
/// changes, beyond the direct successors [propagate_from_task] already
/// re-points at `t`'s new output model. Resource- and mutex-interferers
/// read `t`'s *input*
/// event model directly (not through a propagated edge) every time
/// they are locally analysed, so nothing else would ever re-mark them
/// dirty once `t`'s own input last changed.
fn build_dependent_tasks(sys: &System) -> HashMap<TaskId, HashSet<TaskId>> {
    let mut map = HashMap::new();
    for i in 0..sys.tasks.len() {
        let t = TaskId(i);
        let mut deps: HashSet<TaskId> = HashSet::new();
        deps.extend(resource_interferers(sys, t));
        deps.extend(mutex_interferers(sys, t));
        for s in reachable_tasks(sys, t) {
            deps.insert(s);
            deps.extend(resource_interferers(sys, s));
            deps.extend(mutex_interferers(sys, s));
        }
        deps.remove(&t);
        map.insert(t, deps);
    }
    map
}

/// Every task or junction reachable from `start`'s own successor
/// edges -- used to find functional cycles through an AND-junction.
fn forward_reachable(sys: &System, start: &[Successor]) -> HashSet<Successor> {
    let mut seen: HashSet<Successor> = HashSet::new();
    let mut queue: Vec<Successor> = start.to_vec();
    while let Some(node) = queue.pop() {
        if !seen.insert(node) {
            continue;
        }
        let successors: &[Successor] = match node {
            Successor::Task(id) => &sys.tasks[id.0].successors,
            Successor::Junction(id) => &sys.junctions[id.0].successors,
        };
        for &s in successors {
            if !seen.contains(&s) {
                queue.push(s);
            }
        }
    }
    seen
}

/// For every junction, the set of input positions whose source is
/// itself reachable from the junction's own output -- a functional
/// cycle. Those positions are excluded from both the "all inputs
/// arrived" readiness check and the combination strategy itself.
fn compute_junction_cycle_cuts(sys: &System) -> HashMap<JunctionId, HashSet<usize>> {
    let mut cuts = HashMap::new();
    for (idx, junction) in sys.junctions.iter().enumerate() {
        let jid = JunctionId(idx);
        let reachable = forward_reachable(sys, &junction.successors);
        let cut_indices: HashSet<usize> = junction
            .inputs
            .iter()
            .enumerate()
            .filter(|(_, input)| reachable.contains(input))
            .map(|(i, _)| i)
            .collect();
        if !cut_indices.is_empty() {
            cuts.insert(jid, cut_indices);
        }
    }
    cuts
}

/// Deterministic analysis order: tasks with the largest downstream
/// closure first (so a change is discovered and repropagated as early
/// as possible within a round), ties broken by name.
fn analysis_order(sys: &System) -> Vec<TaskId> {
    let mut ids: Vec<TaskId> = (0..sys.tasks.len()).map(TaskId).collect();
    let closure_sizes: HashMap<TaskId, usize> = ids
        .iter()
        .map(|&id| (id, reachable_tasks(sys, id).len()))
        .collect();
    ids.sort_by(|a, b| {
        closure_sizes[b]
            .cmp(&closure_sizes[a])
            .then_with(|| sys.tasks[a.0].name.cmp(&sys.tasks[b.0].name))
    });
    ids
}

fn check_monotonicity(task: &Task, result: &TaskResult) -> Result<(), NotSchedulable> {
    for w in result.busy_times.windows(2) {
        if w[1] < w[0] + task.wcet {
            return Err(NotSchedulable::MonotonicityViolated {
                task: task.name.clone(),
                step: 0,
            });
        }
    }
    Ok(())
}

/// Build the right [Scheduler] for `task_id` from its resource's
/// policy and the static data of every other task on that resource,
/// and run the generic local analysis.
fn analyze_task(sys: &System, task_id: TaskId, config: &Config) -> Result<TaskResult, NotSchedulable> {
    let task = &sys.tasks[task_id.0];
    let resource: &Resource = &sys.resources[task.resource.0];
    let in_model = task.resolved_in_event_model();

    let siblings = || -> Vec<(TaskId, &Task)> {
        resource
            .tasks
            .iter()
            .filter(|&&id| id != task_id)
            .map(|&id| (id, &sys.tasks[id.0]))
            .collect()
    };

    let run = |scheduler: &dyn Scheduler| {
        scheduler::analyze(
            scheduler,
            |n| in_model.delta_min(n),
            |w| in_model.eta_plus(w),
            Duration::zero(),
            config.max_local_iterations,
            config.max_wcrt,
        )
    };

    match &resource.policy {
        SchedulingPolicy::Spp { ordering } => {
            let interferers: Vec<Interferer> = siblings()
                .into_iter()
                .map(|(_, t)| as_interferer(t))
                .collect();
            let s = crate::scheduler::spp::Spp::new(
                task.name.clone(),
                task.wcet,
                task.bcet,
                in_model.clone(),
                task.scheduling_parameter,
                *ordering,
                interferers,
            );
            run(&s)
        }
        SchedulingPolicy::Spnp {
            ordering,
            ctx_switch_overhead,
            cycle_time,
        } => {
            let all = siblings();
            let higher_or_equal: Vec<Interferer> = all
                .iter()
                .filter(|(_, t)| ordering.at_least_as_important(t.scheduling_parameter, task.scheduling_parameter))
                .map(|(_, t)| as_interferer(t))
                .collect();
            let lower: Vec<Interferer> = all
                .iter()
                .filter(|(_, t)| !ordering.at_least_as_important(t.scheduling_parameter, task.scheduling_parameter))
                .map(|(_, t)| as_interferer(t))
                .collect();
            let s = crate::scheduler::spnp::Spnp::new(
                task.name.clone(),
                task.wcet,
                task.bcet,
                in_model.clone(),
                higher_or_equal,
                &lower,
                *ctx_switch_overhead,
                *cycle_time,
            );
            run(&s)
        }
        SchedulingPolicy::RoundRobin { slots } => {
            let own_slot = slots.get(&task_id).copied().unwrap_or_else(Duration::zero);
            let interferers: Vec<crate::scheduler::round_robin::RrInterferer> = siblings()
                .into_iter()
                .map(|(id, t)| crate::scheduler::round_robin::RrInterferer {
                    interferer: as_interferer(t),
                    slot: slots.get(&id).copied().unwrap_or_else(Duration::zero),
                })
                .collect();
            let s = crate::scheduler::round_robin::RoundRobin::new(
                task.name.clone(),
                task.wcet,
                task.bcet,
                own_slot,
                in_model.clone(),
                interferers,
            );
            run(&s)
        }
        SchedulingPolicy::Tdma { slots, cycle } => {
            let own_slot = slots.get(&task_id).copied().unwrap_or_else(Duration::zero);
            let s = crate::scheduler::tdma::Tdma::new(
                task.name.clone(),
                task.wcet,
                task.bcet,
                in_model.clone(),
                own_slot,
                *cycle,
            );
            run(&s)
        }
        SchedulingPolicy::RoxSpp { ordering, correlated_dmin, exact } => {
            let interferers: Vec<crate::scheduler::rox::CorrelatedInterferer> = siblings()
                .into_iter()
                .map(|(id, t)| crate::scheduler::rox::CorrelatedInterferer {
                    interferer: as_interferer(t),
                    correlated_dmin: correlated_dmin.get(&(task_id, id)).copied(),
                })
                .collect();
            if *exact {
                // The analysed task's own correlated-dmin value (needed
                // when it plays the interferer's role from some other
                // sibling's perspective): the self-keyed entry of the
                // same map, absent meaning "no known correlation" same
                // as for any other interferer.
                let own_correlated_dmin = correlated_dmin.get(&(task_id, task_id)).copied();
                let s = crate::scheduler::rox::RoxSppExact::new(
                    task.name.clone(),
                    task.wcet,
                    task.bcet,
                    in_model.clone(),
                    task.scheduling_parameter,
                    *ordering,
                    own_correlated_dmin,
                    interferers,
                );
                run(&s)
            } else {
                let s = crate::scheduler::rox::RoxSpp::new(
                    task.name.clone(),
                    task.wcet,
                    task.bcet,
                    in_model.clone(),
                    task.scheduling_parameter,
                    *ordering,
                    interferers,
                );
                run(&s)
            }
        }
        SchedulingPolicy::EdfP => {
            let own_deadline = task.deadline.unwrap_or(Duration::infinite());
            let interferers: Vec<crate::scheduler::edf::EdfInterferer> = siblings()
                .into_iter()
                .map(|(_, t)| crate::scheduler::edf::EdfInterferer {
                    interferer: as_interferer(t),
                    deadline: t.deadline.unwrap_or(Duration::infinite()),
                })
                .collect();
            let s = crate::scheduler::edf::EdfP::new(
                task.name.clone(),
                task.wcet,
                task.bcet,
                own_deadline,
                in_model.clone(),
                interferers,
            );
            run(&s)
        }
    }
}

fn as_interferer(t: &Task) -> Interferer {
    Interferer {
        wcet: t.wcet,
        scheduling_parameter: t.scheduling_parameter,
        in_event_model: t.resolved_in_event_model(),
    }
}

/// Derive `task`'s output model(s) from its just-finished analysis
/// result and push them to every successor. A non-fork task produces
/// one shared model for every successor edge; a fork derives one
/// model per edge, independently, under that edge's own propagation
/// rule.
fn propagate_from_task(
    sys: &System,
    task_id: TaskId,
    result: &TaskResult,
    config: &Config,
    cycle_cuts: &HashMap<JunctionId, HashSet<usize>>,
    dirty: &mut HashSet<TaskId>,
) -> Result<(), AnalysisError> {
    let task = &sys.tasks[task_id.0];
    let in_model = task.resolved_in_event_model();
    let min_distance = task.bcet;
    let default_rule = task.propagation_rule.unwrap_or(config.default_propagation_rule);
    let derive = |rule: PropagationRule| {
        propagation::propagate(
            rule,
            task.name.clone(),
            PropagationInput {
                in_event_model: &*in_model,
                wcrt: result.wcrt,
                bcrt: result.bcrt,
                busy_times: &result.busy_times,
                min_distance,
            },
        )
    };

    let source = Successor::Task(task_id);
    match &task.fork_rules {
        Some(rules) => {
            for (i, &succ) in task.successors.iter().enumerate() {
                let rule = rules.get(i).copied().unwrap_or(default_rule);
                let out_model = derive(rule);
                if i == 0 {
                    *task.out_event_model.borrow_mut() = Some(out_model.clone());
                }
                propagate_along(sys, source, succ, out_model, cycle_cuts, dirty)?;
            }
        }
        None => {
            let out_model = derive(default_rule);
            *task.out_event_model.borrow_mut() = Some(out_model.clone());
            for &succ in &task.successors {
                propagate_along(sys, source, succ, out_model.clone(), cycle_cuts, dirty)?;
            }
        }
    }
    Ok(())
}

/// Push `model`, produced by the edge `source -> succ`, one step
/// further through the graph: straight into a task's input, or into
/// the matching slot of a junction's input set (re-evaluating and
/// continuing only once every one of the junction's non-cut inputs
/// has been supplied at least once).
fn propagate_along(
    sys: &System,
    source: Successor,
    succ: Successor,
    model: Rc<dyn EventModel>,
    cycle_cuts: &HashMap<JunctionId, HashSet<usize>>,
    dirty: &mut HashSet<TaskId>,
) -> Result<(), AnalysisError> {
    match succ {
        Successor::Task(id) => {
            *sys.tasks[id.0].in_event_model.borrow_mut() = Some(model);
            dirty.insert(id);
            Ok(())
        }
        Successor::Junction(jid) => {
            let junction = &sys.junctions[jid.0];
            if let Some(index) = junction.inputs.iter().position(|i| *i == source) {
                let mut inputs = junction.in_event_models.borrow_mut();
                if inputs.len() <= index {
                    inputs.resize(index + 1, model.clone());
                }
                inputs[index] = model;
                drop(inputs);
                junction.arrived_inputs.borrow_mut().insert(index);
            } else {
                warn!(
                    "orchestrator: junction '{}' received a model from an unregistered input edge",
                    junction.name
                );
                return Ok(());
            }

            let empty = HashSet::new();
            let cuts = cycle_cuts.get(&jid).unwrap_or(&empty);
            let arrived = junction.arrived_inputs.borrow();
            let ready = (0..junction.inputs.len()).all(|i| cuts.contains(&i) || arrived.contains(&i));
            drop(arrived);
            if !ready {
                return Ok(()); // still waiting on other predecessors' first arrival
            }

            let inputs_snapshot = junction.in_event_models.borrow().clone();
            let kept_indices: Vec<usize> = (0..junction.inputs.len())
                .filter(|i| !cuts.contains(i))
                .collect();
            if kept_indices.is_empty() {
                return Err(NotSchedulable::UnresolvableCycle {
                    junction: junction.name.clone(),
                }
                .into());
            }
            let kept_inputs: Vec<Rc<dyn EventModel>> =
                kept_indices.iter().map(|&i| inputs_snapshot[i].clone()).collect();

            let strategy = match junction.strategy {
                junction::JunctionStrategy::SampledInput { trigger } => {
                    let remapped_trigger = kept_indices
                        .iter()
                        .position(|&i| i == trigger)
                        .expect("a sampled-input junction's trigger edge cannot be cycle-cut");
                    junction::JunctionStrategy::SampledInput { trigger: remapped_trigger }
                }
                other => other,
            };

            match junction::evaluate(&junction.name, &strategy, &kept_inputs) {
                Ok((out, waits)) => {
                    *junction.out_event_model.borrow_mut() = Some(out.clone());
                    let mut full_waits = vec![
                        JunctionWait {
                            bcrt: Duration::zero(),
                            wcrt: Duration::zero(),
                        };
                        junction.inputs.len()
                    ];
                    for (pos, &orig_index) in kept_indices.iter().enumerate() {
                        full_waits[orig_index] = waits[pos];
                    }
                    *junction.waits.borrow_mut() = full_waits;

                    let next_source = Successor::Junction(jid);
                    for &next in &junction.successors {
                        propagate_along(sys, next_source, next, out.clone(), cycle_cuts, dirty)?;
                    }
                    Ok(())
                }
                Err(e) => {
                    warn!("orchestrator: junction '{}' not ready: {e}", junction.name);
                    Ok(())
                }
            }
        }
    }
}

fn check_resource_loads(sys: &System, config: &Config) -> Result<(), NotSchedulable> {
    for resource in &sys.resources {
        let load: f64 = resource
            .tasks
            .iter()
            .map(|&id| {
                let t = &sys.tasks[id.0];
                let model = t.resolved_in_event_model();
                model.load(config.load_horizon) * u64::from(t.wcet) as f64
            })
            .sum();
        if load >= 1.0 {
            return Err(NotSchedulable::ResourceOverloaded {
                resource: resource.name.clone(),
                load,
            });
        }
    }
    Ok(())
}

fn check_constraints(sys: &System, results: &HashMap<TaskId, TaskResult>) -> Vec<ConstraintViolation> {
    let mut violations = Vec::new();
    for c in &sys.constraints.constraints {
        match c {
            crate::system::Constraint::Deadline { task, deadline } => {
                if let Some(r) = results.get(task) {
                    if r.wcrt > *deadline {
                        violations.push(ConstraintViolation::Deadline {
                            task: sys.tasks[task.0].name.clone(),
                            wcrt: r.wcrt,
                            deadline: *deadline,
                        });
                    }
                }
            }
            crate::system::Constraint::Backlog { task, limit } => {
                if let Some(r) = results.get(task) {
                    if r.max_backlog > *limit {
                        violations.push(ConstraintViolation::Backlog {
                            task: sys.tasks[task.0].name.clone(),
                            backlog: r.max_backlog,
                            limit: *limit,
                        });
                    }
                }
            }
            crate::system::Constraint::Load { resource, threshold } => {
                let r = &sys.resources[resource.0];
                let load: f64 = r
                    .tasks
                    .iter()
                    .map(|&id| {
                        let t = &sys.tasks[id.0];
                        let model = t.resolved_in_event_model();
                        model.load(10_000) * u64::from(t.wcet) as f64
                    })
                    .sum();
                if load > *threshold {
                    violations.push(ConstraintViolation::Load {
                        resource: r.name.clone(),
                        load,
                        threshold: *threshold,
                    });
                }
            }
            crate::system::Constraint::PathLatency { path, n, limit } => {
                let p = &sys.paths[path.0];
                let latency = crate::path_analysis::end_to_end_latency_classic(sys, p, results, *n);
                if let Some(latency) = latency {
                    if latency > *limit {
                        violations.push(ConstraintViolation::PathLatency {
                            path: p.name.clone(),
                            n: *n,
                            latency,
                            limit: *limit,
                        });
                    }
                }
            }
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_model::Pjd;
    use crate::junction::JunctionStrategy;
    use crate::scheduler::priority::PriorityOrdering;
    use crate::system::PathElement;

    fn periodic(period: u64, jitter: u64) -> Rc<dyn EventModel> {
        Rc::new(Pjd::new(Duration::from(period), Duration::from(jitter), Duration::zero()))
    }

    /// The orchestrator logs every dirty-set round and every propagated
    /// change through `log`'s `debug!`/`info!`/`warn!` macros (see the
    /// calls throughout this module); run under `env_logger` with
    /// `RUST_LOG=debug` (`cargo test -- --nocapture` to see it) so that
    /// claim is actually exercised rather than merely asserted.
    #[test]
    fn analysis_runs_under_env_logger() {
        let _ = env_logger::try_init();

        let mut sys = System::new("logging-smoke-test");
        let r = sys.add_resource("R", SchedulingPolicy::Spp { ordering: PriorityOrdering::LowWinsFifo });
        let t = sys.add_task("T", r, Duration::from(1), Duration::from(1));
        sys.set_source_event_model(t, periodic(10, 0));

        let config = Config::default();
        let result = analyze_system(&sys, &config, None).expect("schedulable");
        assert_eq!(result.task_results[&t].wcrt, Duration::from(1));
    }

    /// The two-resource SPP seed scenario: T11/T12 share R1, T21/T22
    /// share R2, and T1x's output triggers the matching T2x. Every
    /// WCRT and T22's full busy-window sequence are pinned to values
    /// traced by hand through `analyze_task`/`propagation::busy_window`
    /// for this exact graph.
    #[test]
    fn two_resource_spp_end_to_end() {
        let mut sys = System::new("two-resource-spp");
        let r1 = sys.add_resource("R1", SchedulingPolicy::Spp { ordering: PriorityOrdering::LowWinsFifo });
        let r2 = sys.add_resource("R2", SchedulingPolicy::Spp { ordering: PriorityOrdering::LowWinsFifo });

        let t11 = sys.add_task("T11", r1, Duration::from(10), Duration::from(5));
        sys.tasks[t11.0].scheduling_parameter = 1;
        let t12 = sys.add_task("T12", r1, Duration::from(3), Duration::from(1));
        sys.tasks[t12.0].scheduling_parameter = 2;

        let t21 = sys.add_task("T21", r2, Duration::from(2), Duration::from(2));
        sys.tasks[t21.0].scheduling_parameter = 1;
        let t22 = sys.add_task("T22", r2, Duration::from(9), Duration::from(4));
        sys.tasks[t22.0].scheduling_parameter = 2;

        sys.link_task_to_task(t11, t21);
        sys.link_task_to_task(t12, t22);

        sys.set_source_event_model(t11, periodic(30, 5));
        sys.set_source_event_model(t12, periodic(15, 6));

        let config = Config::default();
        let result = analyze_system(&sys, &config, None).expect("schedulable");

        assert_eq!(result.task_results[&t11].wcrt, Duration::from(10));
        assert_eq!(result.task_results[&t12].wcrt, Duration::from(13));
        assert_eq!(result.task_results[&t21].wcrt, Duration::from(2));
        assert_eq!(result.task_results[&t22].wcrt, Duration::from(19));
        assert_eq!(
            result.task_results[&t22].busy_times,
            [0u64, 11, 20, 31, 40].map(Duration::from).to_vec()
        );
    }

    /// An AND-junction wired end to end: two single-task sources on
    /// separate resources feed a join that drives a third, isolated
    /// task. No interference anywhere (every task is alone on its
    /// resource), so every WCRT is deterministic: `wcet` for the
    /// sources, and `wcet` again for the sink since the join's output
    /// is still far sparser than the sink's own busy window needs.
    #[test]
    fn and_junction_end_to_end() {
        let mut sys = System::new("and-junction");
        let ra = sys.add_resource("RA", SchedulingPolicy::Spp { ordering: PriorityOrdering::LowWinsFifo });
        let rb = sys.add_resource("RB", SchedulingPolicy::Spp { ordering: PriorityOrdering::LowWinsFifo });
        let rc = sys.add_resource("RC", SchedulingPolicy::Spp { ordering: PriorityOrdering::LowWinsFifo });

        let a = sys.add_task("A", ra, Duration::from(1), Duration::from(1));
        let b = sys.add_task("B", rb, Duration::from(1), Duration::from(1));
        let c = sys.add_task("C", rc, Duration::from(2), Duration::from(2));

        let j = sys.add_junction("J", JunctionStrategy::And);
        sys.link_task_to_junction(a, j);
        sys.link_task_to_junction(b, j);
        sys.link_junction_to_task(j, c);

        sys.set_source_event_model(a, periodic(10, 0));
        sys.set_source_event_model(b, periodic(30, 0));

        let config = Config::default();
        let result = analyze_system(&sys, &config, None).expect("schedulable");

        assert_eq!(result.task_results[&a].wcrt, Duration::from(1));
        assert_eq!(result.task_results[&b].wcrt, Duration::from(1));
        assert_eq!(result.task_results[&c].wcrt, Duration::from(2));
    }

    /// A sampled-input junction wired end to end, combined with classic
    /// path latency: a trigger task and a data task, on separate
    /// resources, feed a sampling junction whose output drives a sink
    /// task; the path latency through `[data, junction, sink]` should
    /// equal `wcrt(data) + junction_wait(data) + wcrt(sink)`, since
    /// every event model here is deterministic and the path's spread
    /// term is therefore zero regardless of `n`.
    #[test]
    fn sampled_input_junction_feeds_path_latency() {
        let mut sys = System::new("sampled-input");
        let r_trigger = sys.add_resource("RT", SchedulingPolicy::Spp { ordering: PriorityOrdering::LowWinsFifo });
        let r_data = sys.add_resource("RD", SchedulingPolicy::Spp { ordering: PriorityOrdering::LowWinsFifo });
        let r_out = sys.add_resource("RO", SchedulingPolicy::Spp { ordering: PriorityOrdering::LowWinsFifo });

        let trigger = sys.add_task("Trigger", r_trigger, Duration::from(1), Duration::from(1));
        let data = sys.add_task("Data", r_data, Duration::from(5), Duration::from(5));
        let out = sys.add_task("Out", r_out, Duration::from(2), Duration::from(2));

        let j = sys.add_junction("Sample", JunctionStrategy::SampledInput { trigger: 0 });
        sys.link_task_to_junction(trigger, j);
        sys.link_task_to_junction(data, j);
        sys.link_junction_to_task(j, out);

        sys.set_source_event_model(trigger, periodic(20, 0));
        sys.set_source_event_model(data, periodic(1000, 0));

        let path = sys.add_path(
            "data-to-out",
            vec![PathElement::Task(data), PathElement::Junction(j), PathElement::Task(out)],
            Duration::zero(),
        );

        let config = Config::default();
        let result = analyze_system(&sys, &config, None).expect("schedulable");

        assert_eq!(result.task_results[&data].wcrt, Duration::from(5));
        assert_eq!(result.task_results[&out].wcrt, Duration::from(2));

        let p = &sys.paths[path.0];
        let latency = crate::path_analysis::end_to_end_latency_classic(&sys, p, &result.task_results, 1)
            .expect("every task on the path has a result");
        assert_eq!(latency, Duration::from(5 + 20 + 2));
    }

    /// Asymptotic load is a floating-point rate (`horizon / delta_min`);
    /// unlike every other quantity in this crate it is compared with
    /// tolerance rather than exactly.
    #[test]
    fn periodic_source_load_matches_its_rate() {
        let model = periodic(20, 0);
        // load(horizon) = horizon / delta_min(horizon) -> 1/period as
        // horizon grows; a large horizon brings it within a tight
        // tolerance of the asymptotic rate.
        assert_approx_eq::assert_approx_eq!(model.load(1_000_000), 1.0 / 20.0, 1e-6);
    }

    /// Spuri 1996's four-task EDF-P counterexample, with T3 (d=6, P=8)
    /// and T4 (d=12, P=16) both having a deadline strictly shorter than
    /// their period -- the condition the old `ac=0`-only shortcut was
    /// unsound for. Only the spec's own weak acceptance criterion is
    /// checked ("terminates, and every WCRT is within its deadline");
    /// no specific WCRT values are pinned.
    #[test]
    fn edf_p_spuri_scenario_meets_every_deadline() {
        let mut sys = System::new("edf-spuri");
        let r = sys.add_resource("R", SchedulingPolicy::EdfP);

        let t1 = sys.add_task("T1", r, Duration::from(1), Duration::from(1));
        sys.tasks[t1.0].deadline = Some(Duration::from(4));
        let t2 = sys.add_task("T2", r, Duration::from(2), Duration::from(1));
        sys.tasks[t2.0].deadline = Some(Duration::from(9));
        let t3 = sys.add_task("T3", r, Duration::from(2), Duration::from(1));
        sys.tasks[t3.0].deadline = Some(Duration::from(6));
        let t4 = sys.add_task("T4", r, Duration::from(2), Duration::from(1));
        sys.tasks[t4.0].deadline = Some(Duration::from(12));

        sys.set_source_event_model(t1, periodic(4, 0));
        sys.set_source_event_model(t2, periodic(6, 0));
        sys.set_source_event_model(t3, periodic(8, 0));
        sys.set_source_event_model(t4, periodic(16, 0));

        let config = Config::default();
        let result = analyze_system(&sys, &config, None).expect("schedulable");

        assert!(result.task_results[&t1].wcrt <= Duration::from(4));
        assert!(result.task_results[&t2].wcrt <= Duration::from(9));
        assert!(result.task_results[&t3].wcrt <= Duration::from(6));
        assert!(result.task_results[&t4].wcrt <= Duration::from(12));
    }
}
