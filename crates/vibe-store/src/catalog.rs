//! The fixed set of preference documents and their read/write rules.

use crate::automation::{self, AutomationSettings, AUTOMATIONS_FILE};
use crate::{defaults, merge_shallow, PreferenceStore, StoreError};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Text,
    Json,
}

/// One named preference document.
pub struct Document {
    /// Route key, e.g. `coding-standards`.
    pub key: &'static str,
    pub file_name: &'static str,
    pub kind: DocumentKind,
    pub success_message: &'static str,
    default_content: fn() -> String,
    /// JSON only: how a stored document is merged over the default on read.
    read_merge: Option<fn(&Value, Value) -> Value>,
    preprocess: Option<fn(Value) -> Value>,
    validate: Option<fn(&Value) -> Result<(), String>>,
}

fn default_automations() -> String {
    serde_json::to_value(AutomationSettings::default())
        .and_then(|v| serde_json::to_string_pretty(&v))
        .unwrap_or_else(|_| "{}".into())
}

fn merge_automations(_default: &Value, parsed: Value) -> Value {
    automation::merge_with_defaults(&parsed)
}

fn default_coding_standards() -> String {
    defaults::CODING_STANDARDS.to_string()
}

fn default_project_context() -> String {
    defaults::PROJECT_CONTEXT.to_string()
}

fn default_review_prompt() -> String {
    defaults::REVIEW_PROMPT.to_string()
}

fn default_automerge_prompt() -> String {
    defaults::AUTOMERGE_PROMPT.to_string()
}

pub const DOCUMENTS: &[Document] = &[
    Document {
        key: "automations",
        file_name: AUTOMATIONS_FILE,
        kind: DocumentKind::Json,
        success_message: "Automation settings saved successfully",
        default_content: default_automations,
        read_merge: Some(merge_automations),
        preprocess: Some(automation::preprocess),
        validate: Some(automation::validate),
    },
    Document {
        key: "coding-standards",
        file_name: "coding-standards.md",
        kind: DocumentKind::Text,
        success_message: "Coding standards saved successfully",
        default_content: default_coding_standards,
        read_merge: None,
        preprocess: None,
        validate: None,
    },
    Document {
        key: "project-context",
        file_name: "project-context.md",
        kind: DocumentKind::Text,
        success_message: "Project context saved successfully",
        default_content: default_project_context,
        read_merge: None,
        preprocess: None,
        validate: None,
    },
    Document {
        key: "review-prompt",
        file_name: "review-prompt.md",
        kind: DocumentKind::Text,
        success_message: "Review prompt saved successfully",
        default_content: default_review_prompt,
        read_merge: None,
        preprocess: None,
        validate: None,
    },
    Document {
        key: "pr-prompt",
        file_name: "pr-prompt.md",
        kind: DocumentKind::Text,
        success_message: "PR prompt saved successfully",
        default_content: default_review_prompt,
        read_merge: None,
        preprocess: None,
        validate: None,
    },
    Document {
        key: "automerge-prompt",
        file_name: "automerge-prompt.md",
        kind: DocumentKind::Text,
        success_message: "Automerge prompt saved successfully",
        default_content: default_automerge_prompt,
        read_merge: None,
        preprocess: None,
        validate: None,
    },
];

/// Find a document by route key (`coding-standards`) or file name (`coding-standards.md`).
pub fn lookup(name: &str) -> Option<&'static Document> {
    DOCUMENTS
        .iter()
        .find(|doc| doc.key == name || doc.file_name == name)
}

/// Like [`lookup`], but unknown names are an error.
pub fn require(name: &str) -> Result<&'static Document, StoreError> {
    lookup(name).ok_or_else(|| StoreError::UnknownDocument(name.to_string()))
}

impl Document {
    pub fn default_content(&self) -> String {
        (self.default_content)()
    }

    pub fn content_type(&self) -> &'static str {
        match self.kind {
            DocumentKind::Json => "application/json",
            DocumentKind::Text => "text/markdown; charset=utf-8",
        }
    }

    /// Turn a submitted body into the exact bytes to persist.
    ///
    /// JSON: parse (`Invalid JSON format` on failure), preprocess, validate,
    /// pretty-print. Text is stored verbatim.
    pub fn prepare(&self, body: &str) -> Result<String, StoreError> {
        if self.kind == DocumentKind::Text {
            return Ok(body.to_string());
        }
        let parsed: Value = serde_json::from_str(body)
            .map_err(|_| StoreError::Validation("Invalid JSON format".into()))?;
        let processed = match self.preprocess {
            Some(preprocess) => preprocess(parsed),
            None => parsed,
        };
        if let Some(validate) = self.validate {
            validate(&processed).map_err(StoreError::Validation)?;
        }
        Ok(serde_json::to_string_pretty(&processed)?)
    }
}

impl PreferenceStore {
    /// Content of a catalog document, created with its default when absent.
    ///
    /// Text documents are returned verbatim. JSON documents are merged over
    /// their default and pretty-printed, so fields added since the file was
    /// written are always present.
    pub fn read_document(&self, doc: &Document) -> Result<String, StoreError> {
        match doc.kind {
            DocumentKind::Text => self.read_text(doc.file_name, &doc.default_content()),
            DocumentKind::Json => {
                let default: Value = serde_json::from_str(&doc.default_content())?;
                let merge = doc.read_merge.unwrap_or(merge_shallow);
                let merged = self.read_json_value_with(doc.file_name, &default, merge)?;
                Ok(serde_json::to_string_pretty(&merged)?)
            }
        }
    }

    /// Validate and persist a submitted body; returns the document's success message.
    pub fn write_document(&self, doc: &Document, body: &str) -> Result<&'static str, StoreError> {
        let content = doc.prepare(body)?;
        self.write_text(doc.file_name, &content)?;
        tracing::info!(document = doc.key, bytes = content.len(), "preference saved");
        Ok(doc.success_message)
    }

    /// Review template: `pr-prompt.md` when non-empty, else `review-prompt.md`
    /// (created with its default if absent). `None` when the user blanked it.
    pub fn review_template(&self) -> Result<Option<String>, StoreError> {
        if let Some(text) = self.read_existing("pr-prompt.md")? {
            if !text.trim().is_empty() {
                return Ok(Some(text));
            }
        }
        let text = self.read_document(require("review-prompt")?)?;
        Ok(Some(text).filter(|t| !t.trim().is_empty()))
    }

    /// Merge-judgment template for `claude-decision` mode: the settings'
    /// `claudeMergePrompt`, or `automerge-prompt.md` when that is blank.
    pub fn merge_template(&self, settings: &AutomationSettings) -> Result<String, StoreError> {
        if !settings.claude_merge_prompt.trim().is_empty() {
            return Ok(settings.claude_merge_prompt.clone());
        }
        self.read_document(require("automerge-prompt")?)
    }

    /// Non-empty content of an existing document, if any.
    pub fn read_context(&self, name: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .read_existing(name)?
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty()))
    }
}
