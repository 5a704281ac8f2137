use crate::agent::stream::{StreamMonitor, StreamSummary};
use crate::AgentError;
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

/// Hard wall-clock limit for one agent invocation unless overridden.
pub const DEFAULT_AGENT_TIMEOUT: Duration = Duration::from_secs(300);

/// Flags the invoker always passes; callers cannot override them.
/// (flag, takes a value)
const BASELINE_FLAGS: &[(&str, bool)] = &[
    ("-p", true),
    ("--print", true),
    ("--dangerously-skip-permissions", false),
    ("--verbose", false),
    ("--output-format", true),
];

/// Which lifecycle step an agent run belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentPhase {
    Task,
    Review,
    MergeDecision,
}

impl AgentPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Review => "review",
            Self::MergeDecision => "merge-decision",
        }
    }
}

impl fmt::Display for AgentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeOptions {
    pub timeout: Duration,
    pub extra_args: Vec<String>,
    pub session_id: Option<Uuid>,
}

impl Default for InvokeOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_AGENT_TIMEOUT,
            extra_args: Vec::new(),
            session_id: None,
        }
    }
}

impl InvokeOptions {
    pub fn with_session(mut self, session_id: Uuid) -> Self {
        self.session_id = Some(session_id);
        self
    }
}

/// Runs the coding agent on a prompt. Implemented by [`ClaudeCliInvoker`]
/// and [`MockInvoker`].
#[async_trait::async_trait]
pub trait AgentInvoker: Send + Sync {
    async fn invoke(
        &self,
        phase: AgentPhase,
        prompt: &str,
        options: &InvokeOptions,
    ) -> Result<StreamSummary, AgentError>;
}

/// Fixed namespace UUID for agent sessions.
const SESSION_NS: Uuid = Uuid::from_bytes([
    0x76, 0x1b, 0xe0, 0x5e, 0x00, 0x00, 0x40, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02,
]);

/// Deterministic session ID per task attempt, phase and lifecycle run.
/// Each run gets its own sessions to avoid "session already in use" errors
/// when the same worktree is processed again.
pub fn phase_session_id(attempt_id: &str, phase: AgentPhase, run_key: &str) -> Uuid {
    Uuid::new_v5(&SESSION_NS, format!("{attempt_id}-{phase}-{run_key}").as_bytes())
}

static RUN_SEQ: AtomicU64 = AtomicU64::new(0);

/// Key that is unique per lifecycle run, across processes and within one.
pub fn new_run_key() -> String {
    format!(
        "{}-{}-{}",
        time::OffsetDateTime::now_utc().unix_timestamp_nanos(),
        std::process::id(),
        RUN_SEQ.fetch_add(1, Ordering::Relaxed)
    )
}

/// Baseline arguments followed by the caller's extras, minus any extra whose
/// key (text before `=`) collides with a baseline flag. A dropped value flag
/// written as two arguments (`--output-format text`) loses its value too.
pub fn build_args(prompt_file: &Path, options: &InvokeOptions) -> Vec<String> {
    let mut args = vec![
        "-p".to_string(),
        format!("Read and execute the instructions in this file: {}", prompt_file.display()),
        "--dangerously-skip-permissions".to_string(),
        "--verbose".to_string(),
        "--output-format=stream-json".to_string(),
    ];
    let mut reserved: Vec<(&str, bool)> = BASELINE_FLAGS.to_vec();
    if let Some(session_id) = options.session_id {
        args.push("--session-id".to_string());
        args.push(session_id.to_string());
        reserved.push(("--session-id", true));
    }
    let mut extras = options.extra_args.iter().peekable();
    while let Some(extra) = extras.next() {
        let (key, inline_value) = match extra.split_once('=') {
            Some((key, _)) => (key, true),
            None => (extra.as_str(), false),
        };
        let Some(&(_, takes_value)) = reserved.iter().find(|(flag, _)| *flag == key) else {
            args.push(extra.clone());
            continue;
        };
        tracing::warn!(arg = %extra, "dropping agent argument that overrides a fixed flag");
        if takes_value && !inline_value {
            if let Some(value) = extras.next_if(|next| !next.starts_with('-')) {
                tracing::warn!(arg = %value, "dropping value of overridden flag");
            }
        }
    }
    args
}

/// Prompt written to a temp file for the lifetime of one invocation.
/// The file is removed on drop, whatever the outcome.
pub struct PromptFile {
    file: tempfile::NamedTempFile,
}

impl PromptFile {
    pub fn create(dir: Option<&Path>, phase: AgentPhase, prompt: &str) -> Result<Self, AgentError> {
        let prefix = format!("vibe-{phase}-");
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix).suffix(".md");
        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(AgentError::PromptFile)?;
        file.write_all(prompt.as_bytes())
            .map_err(AgentError::PromptFile)?;
        file.flush().map_err(AgentError::PromptFile)?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Launches the `claude` CLI in non-interactive stream-json mode.
pub struct ClaudeCliInvoker {
    pub claude_bin: PathBuf,
    pub cwd: PathBuf,
    /// Echo agent stdout to our stdout as it streams.
    pub echo: bool,
    /// Where prompt files go; the system temp dir when unset.
    pub prompt_dir: Option<PathBuf>,
}

impl ClaudeCliInvoker {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            claude_bin: PathBuf::from("claude"),
            cwd: cwd.into(),
            echo: true,
            prompt_dir: None,
        }
    }

    pub fn with_bin(mut self, claude_bin: impl Into<PathBuf>) -> Self {
        self.claude_bin = claude_bin.into();
        self
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn with_prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Check that the Claude CLI binary is reachable.
    pub fn verify_available(&self) -> Result<(), AgentError> {
        let status = std::process::Command::new(&self.claude_bin)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match status {
            Ok(s) if s.success() => Ok(()),
            Ok(s) => Err(AgentError::Exit { code: s.code() }),
            Err(source) => Err(AgentError::Spawn {
                bin: self.claude_bin.display().to_string(),
                source,
            }),
        }
    }

    /// Run the agent on an existing prompt file. Resolves on exit code 0.
    pub async fn invoke_file(
        &self,
        prompt_file: &Path,
        options: &InvokeOptions,
    ) -> Result<StreamSummary, AgentError> {
        let args = build_args(prompt_file, options);
        tracing::debug!(bin = %self.claude_bin.display(), ?args, "spawning agent");

        let mut child = tokio::process::Command::new(&self.claude_bin)
            .args(&args)
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Allow nesting inside another Claude Code session.
            .env_remove("CLAUDECODE")
            .env_remove("CLAUDE_CODE")
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| AgentError::Spawn {
                bin: self.claude_bin.display().to_string(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("agent stdout not captured"))?;
        let stderr_pump = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut out = tokio::io::stderr();
                tokio::io::copy(&mut stderr, &mut out).await
            })
        });

        let mut monitor = StreamMonitor::new(stdout).with_echo(self.echo);
        let deadline = tokio::time::Instant::now() + options.timeout;
        let secs = options.timeout.as_secs();

        let outcome = tokio::select! {
            result = monitor.run() => {
                let summary = result?;
                match tokio::time::timeout_at(deadline, child.wait()).await {
                    Ok(status) => Ok((summary, status?)),
                    Err(_) => Err(AgentError::Timeout { secs }),
                }
            }
            _ = tokio::time::sleep_until(deadline) => Err(AgentError::Timeout { secs }),
        };

        let (summary, status) = match outcome {
            Ok(done) => done,
            Err(e) => {
                if matches!(e, AgentError::Timeout { .. }) {
                    tracing::warn!(secs, "agent timed out, terminating");
                }
                child.kill().await.ok();
                return Err(e);
            }
        };
        if let Some(pump) = stderr_pump {
            pump.await.ok();
        }

        if status.success() {
            tracing::debug!(
                cost_usd = ?summary.cost_usd(),
                tool_uses = summary.tool_uses,
                "agent finished"
            );
            Ok(summary)
        } else {
            Err(AgentError::Exit {
                code: status.code(),
            })
        }
    }
}

#[async_trait::async_trait]
impl AgentInvoker for ClaudeCliInvoker {
    async fn invoke(
        &self,
        phase: AgentPhase,
        prompt: &str,
        options: &InvokeOptions,
    ) -> Result<StreamSummary, AgentError> {
        let file = PromptFile::create(self.prompt_dir.as_deref(), phase, prompt)?;
        tracing::info!(%phase, prompt_file = %file.path().display(), "invoking agent");
        self.invoke_file(file.path(), options).await
    }
}

/// Scripted outcome for [`MockInvoker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOutcome {
    Success,
    Exit(i32),
    Timeout,
}

#[derive(Debug, Clone)]
pub struct Invocation {
    pub phase: AgentPhase,
    pub prompt: String,
    pub options: InvokeOptions,
}

/// Records every invocation and pops scripted outcomes per phase.
/// With nothing scripted (or exhausted), the run succeeds.
#[derive(Default)]
pub struct MockInvoker {
    outcomes: Mutex<HashMap<AgentPhase, Vec<MockOutcome>>>,
    calls: Mutex<Vec<Invocation>>,
}

impl MockInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_outcomes(&self, phase: AgentPhase, outcomes: Vec<MockOutcome>) {
        if let Ok(mut map) = self.outcomes.lock() {
            map.insert(phase, outcomes);
        }
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn calls_for(&self, phase: AgentPhase) -> Vec<Invocation> {
        self.calls()
            .into_iter()
            .filter(|c| c.phase == phase)
            .collect()
    }
}

#[async_trait::async_trait]
impl AgentInvoker for MockInvoker {
    async fn invoke(
        &self,
        phase: AgentPhase,
        prompt: &str,
        options: &InvokeOptions,
    ) -> Result<StreamSummary, AgentError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(Invocation {
                phase,
                prompt: prompt.to_string(),
                options: options.clone(),
            });
        }
        let next = self
            .outcomes
            .lock()
            .ok()
            .and_then(|mut map| {
                map.get_mut(&phase)
                    .filter(|v| !v.is_empty())
                    .map(|v| v.remove(0))
            })
            .unwrap_or(MockOutcome::Success);
        match next {
            MockOutcome::Success => Ok(StreamSummary::default()),
            MockOutcome::Exit(code) => Err(AgentError::Exit { code: Some(code) }),
            MockOutcome::Timeout => Err(AgentError::Timeout {
                secs: options.timeout.as_secs(),
            }),
        }
    }
}
