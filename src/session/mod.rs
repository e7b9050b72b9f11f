//! Run lifecycle: accumulation, state machine and per-subject registry.

pub mod accumulator;
pub mod machine;
pub mod registry;

pub use accumulator::ContentAccumulator;
pub use machine::{Step, Suspension, WorkflowRun};
pub use registry::{SessionRegistry, SubjectLease};
