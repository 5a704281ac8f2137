pub mod launcher;
pub mod stream;

pub use launcher::{
    build_args, new_run_key, phase_session_id, AgentInvoker, AgentPhase, ClaudeCliInvoker,
    InvokeOptions, MockInvoker, MockOutcome, PromptFile, DEFAULT_AGENT_TIMEOUT,
};
pub use stream::{parse_line, StreamEvent, StreamMessage, StreamMonitor, StreamSummary};
