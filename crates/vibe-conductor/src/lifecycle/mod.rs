//! PR lifecycle: state machine, orchestrator and task status sync.

mod context;
pub mod event_log;
mod machine;
mod orchestrator;
mod sync;
#[cfg(test)]
pub(crate) mod testing;

pub use context::{fetch_context, RunContext};
pub use event_log::{Event, EventLog};
pub use machine::{is_valid_transition, LifecycleRun, LifecycleState};
pub use orchestrator::{
    LifecyclePrompts, LifecycleReport, MergeStatus, Orchestrator, PhaseSelection,
};
pub use sync::{sync_task_status, SyncOutcome};
