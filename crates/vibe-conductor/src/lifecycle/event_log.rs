//! Structured run events.
//!
//! Every event is logged through `tracing`; with `--json-events` it is also
//! written as one JSON line to stdout.

use super::LifecycleState;
use serde::Serialize;
use std::io::Write;

/// A lifecycle event. Serialized as tagged JSON (`"type": "state_entered"`, etc.).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    RunStart {
        task_id: String,
        attempt_id: String,
        branch: String,
    },
    StateEntered {
        state: LifecycleState,
    },
    PrReady {
        url: String,
        reused: bool,
    },
    AgentFinished {
        phase: String,
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        cost_usd: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    MergeFinished {
        outcome: String,
    },
    StatusSynced {
        outcome: String,
    },
    RunFinished {
        state: LifecycleState,
        duration_ms: u64,
    },
    RunFailed {
        state: LifecycleState,
        error: String,
    },
}

/// Wrapper that adds sequence number and timestamp to each event.
#[derive(Debug, Serialize)]
pub struct FullEvent<'a> {
    pub seq: u32,
    pub ts: String,
    #[serde(flatten)]
    pub event: &'a Event,
}

pub struct EventLog {
    seq: u32,
    sink: Option<Box<dyn Write + Send>>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    /// Tracing only.
    pub fn new() -> Self {
        Self { seq: 0, sink: None }
    }

    pub fn with_stdout_json(self, enabled: bool) -> Self {
        if enabled {
            self.with_writer(std::io::stdout())
        } else {
            self
        }
    }

    pub fn with_writer(mut self, writer: impl Write + Send + 'static) -> Self {
        self.sink = Some(Box::new(writer));
        self
    }

    /// Record an event. JSON output is best-effort.
    pub fn record(&mut self, event: Event) {
        tracing::debug!(seq = self.seq, event = ?event, "lifecycle event");
        if let Some(sink) = self.sink.as_mut() {
            let full = FullEvent {
                seq: self.seq,
                ts: now_rfc3339(),
                event: &event,
            };
            if let Ok(line) = serde_json::to_string(&full) {
                let _ = writeln!(sink, "{line}").and_then(|_| sink.flush());
            }
        }
        self.seq += 1;
    }

    pub fn recorded(&self) -> u32 {
        self.seq
    }
}

pub(crate) fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}
