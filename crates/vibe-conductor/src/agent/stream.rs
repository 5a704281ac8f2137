use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};

/// Relevant fields from Claude Code's stream-json output.
/// Unknown message types land in `Unknown` instead of failing the parse.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum StreamMessage {
    #[serde(rename = "system")]
    System {
        #[serde(default)]
        subtype: Option<String>,
        #[serde(default)]
        session_id: Option<String>,
        #[serde(default)]
        model: Option<String>,
    },
    #[serde(rename = "assistant")]
    Assistant {
        #[serde(default)]
        message: serde_json::Value,
    },
    #[serde(rename = "user")]
    User {
        #[serde(default)]
        message: serde_json::Value,
    },
    #[serde(rename = "result")]
    Result {
        #[serde(default)]
        subtype: Option<String>,
        #[serde(default)]
        is_error: Option<bool>,
        #[serde(default)]
        total_cost_usd: Option<f64>,
        #[serde(default, rename = "result")]
        result_text: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

/// One line of agent stdout.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Message(StreamMessage),
    /// Anything that is not a stream-json message, kept verbatim.
    Text(String),
}

/// Parse one stdout line. Blank lines yield `None`; unparseable lines
/// become [`StreamEvent::Text`].
pub fn parse_line(line: &str) -> Option<StreamEvent> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(match serde_json::from_str::<StreamMessage>(trimmed) {
        Ok(msg) => StreamEvent::Message(msg),
        Err(_) => StreamEvent::Text(trimmed.to_string()),
    })
}

/// Final `result` message of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultInfo {
    pub subtype: Option<String>,
    pub is_error: bool,
    pub total_cost_usd: Option<f64>,
    pub result_text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamSummary {
    pub messages: usize,
    pub text_lines: usize,
    pub tool_uses: usize,
    pub result: Option<ResultInfo>,
}

impl StreamSummary {
    fn observe(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::Text(_) => self.text_lines += 1,
            StreamEvent::Message(msg) => {
                self.messages += 1;
                match msg {
                    StreamMessage::Assistant { message } => {
                        self.tool_uses += count_tool_uses(message);
                    }
                    StreamMessage::Result {
                        subtype,
                        is_error,
                        total_cost_usd,
                        result_text,
                    } => {
                        self.result = Some(ResultInfo {
                            subtype: subtype.clone(),
                            is_error: is_error.unwrap_or(false),
                            total_cost_usd: *total_cost_usd,
                            result_text: result_text.clone(),
                        });
                    }
                    _ => {}
                }
            }
        }
    }

    pub fn cost_usd(&self) -> Option<f64> {
        self.result.as_ref().and_then(|r| r.total_cost_usd)
    }

    /// The agent itself reported failure (process exit may still be 0).
    pub fn reported_error(&self) -> bool {
        self.result.as_ref().is_some_and(|r| {
            r.is_error || r.subtype.as_deref().is_some_and(|s| s.starts_with("error"))
        })
    }
}

fn count_tool_uses(message: &serde_json::Value) -> usize {
    message
        .get("content")
        .and_then(|c| c.as_array())
        .map(|items| {
            items
                .iter()
                .filter(|item| item.get("type").and_then(|t| t.as_str()) == Some("tool_use"))
                .count()
        })
        .unwrap_or(0)
}

/// Reads agent stdout line by line as a lazy sequence of [`StreamEvent`]s,
/// optionally echoing every raw line to our own stdout as it arrives.
pub struct StreamMonitor<R> {
    reader: BufReader<R>,
    echo: bool,
    line: Vec<u8>,
    summary: StreamSummary,
}

impl<R: AsyncRead + Unpin> StreamMonitor<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            echo: false,
            line: Vec::new(),
            summary: StreamSummary::default(),
        }
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Next non-blank line, or `None` at EOF. Invalid UTF-8 is decoded lossily.
    pub async fn next_event(&mut self) -> std::io::Result<Option<StreamEvent>> {
        loop {
            self.line.clear();
            if self.reader.read_until(b'\n', &mut self.line).await? == 0 {
                return Ok(None);
            }
            if self.echo {
                let mut out = tokio::io::stdout();
                out.write_all(&self.line).await?;
                out.flush().await?;
            }
            if let Some(event) = parse_line(&String::from_utf8_lossy(&self.line)) {
                self.summary.observe(&event);
                return Ok(Some(event));
            }
        }
    }

    /// Drain to EOF.
    pub async fn run(&mut self) -> std::io::Result<StreamSummary> {
        while self.next_event().await?.is_some() {}
        Ok(self.summary.clone())
    }

    pub fn summary(&self) -> &StreamSummary {
        &self.summary
    }
}
