use super::template::{fill_template, TemplateVars};
use vibe_store::{PreferenceStore, StoreError};

/// Separator between prepended context sections and the prompt body.
pub const SECTION_DELIMITER: &str = "\n\n---\n\n";

const PROJECT_CONTEXT_HEADING: &str = "# Project Context";
const CODING_STANDARDS_HEADING: &str = "# Coding Standards";

/// Context documents prepended to every agent prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferenceContext {
    pub project_context: Option<String>,
    pub coding_standards: Option<String>,
}

impl PreferenceContext {
    /// Reads `project-context.md` and `coding-standards.md` if they exist.
    /// Missing documents are not created here.
    pub fn load(store: &PreferenceStore) -> Result<Self, StoreError> {
        Ok(Self {
            project_context: store.read_context("project-context.md")?,
            coding_standards: store.read_context("coding-standards.md")?,
        })
    }

    pub fn is_empty(&self) -> bool {
        non_blank(&self.project_context).is_none() && non_blank(&self.coding_standards).is_none()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Prepend project context, then coding standards, to `base`. Empty sections
/// are omitted; with no context at all `base` is returned unchanged.
pub fn compose(base: &str, ctx: &PreferenceContext) -> String {
    let mut out = String::new();
    if let Some(pc) = non_blank(&ctx.project_context) {
        out.push_str(PROJECT_CONTEXT_HEADING);
        out.push_str("\n\n");
        out.push_str(pc);
        out.push_str(SECTION_DELIMITER);
    }
    if let Some(cs) = non_blank(&ctx.coding_standards) {
        out.push_str(CODING_STANDARDS_HEADING);
        out.push_str("\n\n");
        out.push_str(cs);
        out.push_str(SECTION_DELIMITER);
    }
    out.push_str(base);
    out
}

/// Review phase prompt: the task prompt that was executed, followed by the
/// review template.
pub fn review_prompt(task_prompt: &str, template: &str) -> String {
    format!("\n\nThe following task was executed:\n\n{task_prompt}{template}")
}

/// Merge-judgment prompt for `claude-decision` mode.
pub fn merge_prompt(template: &str, vars: &TemplateVars, ctx: &PreferenceContext) -> String {
    let mut vars = vars.clone();
    if vars.project_context.is_none() {
        vars.project_context = ctx.project_context.clone();
    }
    if vars.coding_standards.is_none() {
        vars.coding_standards = ctx.coding_standards.clone();
    }

    let body = match vars.pr_url.as_deref() {
        Some(url) => fill_template(&template.replace("[PR_URL]", url), &vars),
        None => fill_template(template, &vars),
    };

    let header = task_header(&vars);
    let prompt = format!("{header}{SECTION_DELIMITER}{body}");
    if prompt.contains("Project Context") {
        prompt
    } else {
        compose(&prompt, ctx)
    }
}

fn task_header(vars: &TemplateVars) -> String {
    let title = vars
        .task_title
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or("Unknown Task");
    let description = vars
        .task_description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or("No description available");
    let mut header = format!("# Task Under Review\n\n**Title:** {title}\n");
    if let Some(url) = vars.pr_url.as_deref() {
        header.push_str(&format!("**Pull Request:** {url}\n"));
    }
    header.push_str(&format!("\n{description}"));
    header
}
