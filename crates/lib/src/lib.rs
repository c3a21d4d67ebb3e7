//! treadle-lib: a composable incremental build engine
//!
//! The engine reproduces the behavior of Make-, Excel-, Shake- and
//! Bazel-style build systems by binding two orthogonal strategies:
//! - a [`schedule::Scheduler`] decides the order keys are visited and what
//!   happens when a dependency is not yet available
//! - a [`rebuild::Rebuilder`] decides, per key, whether a stored value may be
//!   reused and what metadata to record after recomputation
//!
//! Hosts describe their computations as [`task::Task`] values in a
//! [`task::Rules`] table and keep all durable state in a
//! [`treadle_core::Store`]. See [`build`] for the composer and the named
//! classic compositions.

pub mod build;
pub mod check;
pub mod rebuild;
pub mod schedule;
pub mod task;
pub mod trace;
pub mod track;
pub mod types;
