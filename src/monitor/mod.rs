//! Commit monitor
//!
//! The CommitMonitor polls HEAD of the watched repository and, whenever it
//! moves, decides whether the new commit should be signed: it must be by the
//! watched identity, carry no signature, and not yet be on any remote. Every
//! failure is confined to the tick it happened in.

mod commit_monitor;
mod config;
mod outcome;
mod supervisor;

#[cfg(test)]
pub(crate) mod fake;

pub use commit_monitor::{CommitMonitor, MonitorContext};
pub use config::MonitorConfig;
pub use outcome::{CommitOutcome, MonitorError, Step, StepFailure, TickResult, Verdict};
pub use supervisor::MonitorSupervisor;
