//! Automation settings: the policy document driving PR creation, review and merge.

use crate::{defaults, PreferenceStore, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub const AUTOMATIONS_FILE: &str = "automations.json";

/// Older field names still found in hand-edited documents, mapped to their
/// canonical replacement. Read-only: documents are always saved canonical.
const LEGACY_ALIASES: &[(&str, &str)] = &[
    ("autoMergePR", "automaticallyMergePR"),
    ("autoMergeDecisionMode", "mergeDecisionMode"),
    ("autoMergePrompt", "claudeMergePrompt"),
];

const BOOL_FIELDS: &[&str] = &[
    "automaticallyCreatePR",
    "doCodeReviewBeforeFinishing",
    "automaticTaskPicking",
    "automaticallyMergePR",
];

// ── Types ──

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeDecisionMode {
    /// Merge directly once the PR exists.
    #[default]
    Always,
    /// Hand the PR to the agent, which merges only if it approves.
    ClaudeDecision,
}

impl MergeDecisionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::ClaudeDecision => "claude-decision",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "always" => Some(Self::Always),
            "claude-decision" => Some(Self::ClaudeDecision),
            _ => None,
        }
    }
}

impl fmt::Display for MergeDecisionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationSettings {
    #[serde(rename = "automaticallyCreatePR")]
    pub automatically_create_pr: bool,
    pub do_code_review_before_finishing: bool,
    pub automatic_task_picking: bool,
    pub base_branch: String,
    #[serde(rename = "automaticallyMergePR")]
    pub automatically_merge_pr: bool,
    pub merge_decision_mode: MergeDecisionMode,
    pub claude_merge_prompt: String,
}

impl Default for AutomationSettings {
    fn default() -> Self {
        Self {
            automatically_create_pr: false,
            do_code_review_before_finishing: false,
            automatic_task_picking: false,
            base_branch: "main".into(),
            automatically_merge_pr: false,
            merge_decision_mode: MergeDecisionMode::Always,
            claude_merge_prompt: defaults::CLAUDE_MERGE_PROMPT.into(),
        }
    }
}

impl AutomationSettings {
    /// Load from the store, creating the document with defaults when absent.
    pub fn load(store: &PreferenceStore) -> Result<Self, StoreError> {
        let default = Value::Object(default_fields());
        let merged = store.read_json_value_with(AUTOMATIONS_FILE, &default, |_, parsed| {
            merge_with_defaults(&parsed)
        })?;
        Ok(Self::from_merged(merged))
    }

    /// Build settings from any JSON value, backfilling from defaults.
    pub fn from_document(doc: &Value) -> Self {
        Self::from_merged(merge_with_defaults(doc))
    }

    fn from_merged(merged: Value) -> Self {
        match serde_json::from_value(merged) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(error = %e, "automation settings unusable, using defaults");
                Self::default()
            }
        }
    }

    /// Auto-merge only applies once PR creation is enabled too.
    pub fn merge_enabled(&self) -> bool {
        self.automatically_create_pr && self.automatically_merge_pr
    }
}

// ── Defaulting ──

fn default_fields() -> Map<String, Value> {
    match serde_json::to_value(AutomationSettings::default()) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

fn is_legacy(key: &str) -> bool {
    LEGACY_ALIASES.iter().any(|(legacy, _)| *legacy == key)
}

/// Overlay `doc` onto the defaults. Legacy keys fill their canonical slot
/// only when the canonical key is absent, and are then dropped. Nulls never
/// replace a default. With `strict`, a value whose type does not match the
/// default is ignored with a warning.
fn overlay(doc: &Map<String, Value>, strict: bool) -> Map<String, Value> {
    let mut merged = default_fields();
    let mut incoming: Vec<(String, Value)> = Vec::with_capacity(doc.len());

    for (legacy, canonical) in LEGACY_ALIASES {
        if doc.contains_key(*canonical) {
            continue;
        }
        if let Some(value) = doc.get(*legacy) {
            incoming.push(((*canonical).to_string(), value.clone()));
        }
    }
    for (key, value) in doc {
        if !is_legacy(key) {
            incoming.push((key.clone(), value.clone()));
        }
    }

    for (key, value) in incoming {
        if value.is_null() {
            continue;
        }
        if strict && !acceptable(&key, &value, merged.get(&key)) {
            tracing::warn!(field = %key, found = %value, "ignoring invalid automation setting");
            continue;
        }
        merged.insert(key, value);
    }
    merged
}

fn acceptable(key: &str, value: &Value, default: Option<&Value>) -> bool {
    match key {
        "mergeDecisionMode" => value.as_str().and_then(MergeDecisionMode::parse).is_some(),
        "baseBranch" => value.as_str().is_some_and(|s| !s.trim().is_empty()),
        _ => match default {
            Some(Value::Bool(_)) => value.is_boolean(),
            Some(Value::String(_)) => value.is_string(),
            _ => true,
        },
    }
}

/// The single defaulting rule for automation settings, used by every reader.
///
/// Returns a complete document: every recognised field present, legacy
/// aliases resolved, invalid values replaced by their default.
pub fn merge_with_defaults(doc: &Value) -> Value {
    match doc.as_object() {
        Some(map) => Value::Object(overlay(map, true)),
        None => {
            tracing::warn!(found = %doc, "automation settings are not an object, using defaults");
            Value::Object(default_fields())
        }
    }
}

/// Write-path preprocessor: resolve aliases and backfill missing fields,
/// leaving present values untouched for [`validate`] to judge.
pub fn preprocess(doc: Value) -> Value {
    match doc {
        Value::Object(map) => Value::Object(overlay(&map, false)),
        other => other,
    }
}

/// Structural check applied before persisting a submitted document.
pub fn validate(doc: &Value) -> Result<(), String> {
    let Some(map) = doc.as_object() else {
        return Err("Invalid automation settings format".into());
    };
    for field in BOOL_FIELDS {
        if map.get(*field).is_some_and(|v| !v.is_boolean()) {
            return Err(format!("{field} must be a boolean"));
        }
    }
    match map.get("baseBranch") {
        Some(Value::String(s)) if !s.trim().is_empty() => {}
        Some(_) => return Err("baseBranch must be a non-empty string".into()),
        None => {}
    }
    if let Some(mode) = map.get("mergeDecisionMode") {
        if mode.as_str().and_then(MergeDecisionMode::parse).is_none() {
            return Err(r#"mergeDecisionMode must be either "always" or "claude-decision""#.into());
        }
    }
    if map.get("claudeMergePrompt").is_some_and(|v| !v.is_string()) {
        return Err("claudeMergePrompt must be a string".into());
    }
    Ok(())
}
