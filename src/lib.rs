/*!
# Compositional Performance Analysis (CPA)

This crate collects interfaces, definitions, and algorithms for the
compositional schedulability and latency analysis of hard real-time
distributed embedded systems: per-resource worst-case response times
under a choice of scheduling policy, output event-model propagation
between dependent tasks, a global fixed-point orchestrator tying a
whole system together, and end-to-end path / cause-effect-chain
latency analysis on top of the result.

## Scope

The crate does *not* provide a ready-made tool itself, is not specific
to any particular input format or set of assumptions, and does not offer
or require a canonical task representation beyond [system::System]'s
arena-of-indices graph. Rather, it is intended as a low-level library
of reusable definitions and analyses, held together by a bunch of
traits. Based on this foundation, higher-level facilities (and one-off
research tools) may be built.

## Citations

Some of the algorithms and analyses implemented in this crate come from
published papers, as mentioned in the documentation. If you use this
crate for academic work, please cite the paper(s) corresponding to the
analysis that you are using.



*/

pub mod error;
pub mod event_model;
pub mod junction;
pub mod orchestrator;
pub mod path_analysis;
pub mod propagation;
pub mod scheduler;
pub mod system;
pub mod time;
