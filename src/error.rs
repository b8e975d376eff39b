/*! The error taxonomy used throughout the analysis.

Every variant carries the data needed to explain *why* the analysis
failed to a human reading a log, not just a tag for a machine to match
on, in the one-`#[error]`-per-variant `thiserror` style this crate uses
throughout.
*/

use thiserror::Error;

use crate::time::Duration;

/// Raised when a local or global fixed-point search fails to
/// converge, or when a structural precondition of the analysis is
/// violated at run time (as opposed to at construction time, which is
/// [InvalidInput]).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NotSchedulable {
    /// The busy-window search for `task` did not converge within
    /// `max_iterations` activations.
    #[error("analysis of task '{task}' did not converge within {max_iterations} iterations")]
    IterationLimitExceeded { task: String, max_iterations: u64 },

    /// The worst-case response time of `task` exceeded the
    /// configured ceiling.
    #[error("WCRT of task '{task}' ({wcrt}) exceeds the configured ceiling ({limit})")]
    ResponseTimeLimitExceeded {
        task: String,
        wcrt: Duration,
        limit: Duration,
    },

    /// The asymptotic load of `resource` is not below 1.0, so no
    /// local analysis can possibly be schedulable.
    #[error("resource '{resource}' is overloaded: asymptotic load {load} is not < 1.0")]
    ResourceOverloaded { resource: String, load: f64 },

    /// An AND-junction's predecessor set is a functional cycle with
    /// no remaining exogenous input after cycle cutting.
    #[error("junction '{junction}' forms a cycle with no exogenous input")]
    UnresolvableCycle { junction: String },

    /// The scheduler's own fixed-point iteration produced a
    /// `busy_times` sequence that violates the monotonicity
    /// invariant `busy_times[k+1] - busy_times[k] >= wcet`.
    #[error("busy-window sequence of task '{task}' violates monotonicity at step {step}")]
    MonotonicityViolated { task: String, step: usize },

    /// The global orchestrator's dirty-set loop did not reach a fixed
    /// point within the configured global iteration ceiling.
    #[error("global analysis did not converge within {max_iterations} iterations")]
    GlobalIterationLimitExceeded { max_iterations: u64 },
}

/// Raised when the system description itself is malformed, prior to
/// (or independent of) running any fixed-point search.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidInput {
    #[error("task '{task}' has wcet ({wcet}) < bcet ({bcet})")]
    WcetBelowBcet {
        task: String,
        wcet: Duration,
        bcet: Duration,
    },

    #[error("event model '{description}' has a negative period or jitter")]
    NegativeTimingParameter { description: String },

    #[error("event model '{description}' violates monotonicity of delta_min")]
    NonMonotonicEventModel { description: String },

    #[error("task '{task}' has no input event model reachable from a source")]
    MissingInputEventModel { task: String },

    #[error("cause-effect chain '{chain}' is not harmonic: {reason}")]
    NonHarmonicChain { chain: String, reason: String },

    #[error("junction '{junction}' has no input event models")]
    EmptyJunction { junction: String },
}

/// A non-fatal violation of a user-registered constraint, collected
/// and reported after the analysis completes; it does not invalidate
/// the returned results.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintViolation {
    Deadline {
        task: String,
        wcrt: Duration,
        deadline: Duration,
    },
    PathLatency {
        path: String,
        n: usize,
        latency: Duration,
        limit: Duration,
    },
    Backlog {
        task: String,
        backlog: u64,
        limit: u64,
    },
    Load {
        resource: String,
        load: f64,
        threshold: f64,
    },
}

impl std::fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstraintViolation::Deadline { task, wcrt, deadline } => write!(
                f,
                "task '{task}' misses its deadline: wcrt={wcrt} > deadline={deadline}"
            ),
            ConstraintViolation::PathLatency { path, n, latency, limit } => write!(
                f,
                "path '{path}' exceeds its latency bound for n={n}: {latency} > {limit}"
            ),
            ConstraintViolation::Backlog { task, backlog, limit } => write!(
                f,
                "task '{task}' exceeds its backlog bound: {backlog} > {limit}"
            ),
            ConstraintViolation::Load { resource, load, threshold } => write!(
                f,
                "resource '{resource}' exceeds its load threshold: {load:.4} > {threshold:.4}"
            ),
        }
    }
}

/// Top-level error type returned by [crate::orchestrator::analyze_system].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    #[error(transparent)]
    NotSchedulable(#[from] NotSchedulable),

    #[error(transparent)]
    InvalidInput(#[from] InvalidInput),
}
