//! Task and result types shared by the pipeline, the sequencer and the CLI.
//!
//! - [`Task`]: one named unit of work (a transform step, clean, watch, server).
//! - [`Target`]: what the CLI can ask for: any task plus the `build` and
//!   `default` composites.
//! - [`StepReport`]: what a transform step wrote and which files failed.

mod report;
mod task;

pub use report::*;
pub use task::*;
