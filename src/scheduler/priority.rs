//! The four named priority orderings used by static-priority schedulers.
//!
//! Ported from the reference implementation's `prio_high_wins_equal_fifo` /
//! `prio_low_wins_equal_fifo` / `prio_high_wins_equal_domination` /
//! `prio_low_wins_equal_domination` lambdas: a configurable capability
//! rather than a hard-coded "lower number wins" rule, so that equal
//! priorities can interfere (FIFO) or not (domination) independently of
//! which direction "more important" points.

/// How two tasks' `scheduling_parameter`s are compared to decide whether
/// one interferes with (delays) the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriorityOrdering {
    /// Higher numeric value wins; ties interfere (FIFO among equals).
    HighWinsFifo,
    /// Lower numeric value wins; ties interfere (FIFO among equals).
    #[default]
    LowWinsFifo,
    /// Higher numeric value wins; ties do not interfere.
    HighWinsDomination,
    /// Lower numeric value wins; ties do not interfere.
    LowWinsDomination,
}

impl PriorityOrdering {
    /// True if a task with priority `a` is at least as important as (and
    /// therefore interferes with) a task with priority `b`, under this
    /// ordering.
    pub fn at_least_as_important(&self, a: u64, b: u64) -> bool {
        match self {
            PriorityOrdering::HighWinsFifo => a >= b,
            PriorityOrdering::LowWinsFifo => a <= b,
            PriorityOrdering::HighWinsDomination => a > b,
            PriorityOrdering::LowWinsDomination => a < b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_orderings_include_ties() {
        assert!(PriorityOrdering::HighWinsFifo.at_least_as_important(3, 3));
        assert!(PriorityOrdering::LowWinsFifo.at_least_as_important(3, 3));
    }

    #[test]
    fn domination_orderings_exclude_ties() {
        assert!(!PriorityOrdering::HighWinsDomination.at_least_as_important(3, 3));
        assert!(!PriorityOrdering::LowWinsDomination.at_least_as_important(3, 3));
    }

    #[test]
    fn low_wins_prefers_smaller_numbers() {
        assert!(PriorityOrdering::LowWinsDomination.at_least_as_important(1, 2));
        assert!(!PriorityOrdering::LowWinsDomination.at_least_as_important(2, 1));
    }
}
