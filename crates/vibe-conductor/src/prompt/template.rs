/// Values available to prompt templates. Unset values fall back to a fixed
/// literal so the agent never sees an empty slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars {
    pub task_id: Option<String>,
    pub project_id: Option<String>,
    pub task_title: Option<String>,
    pub task_description: Option<String>,
    pub project_context: Option<String>,
    pub coding_standards: Option<String>,
    pub pr_url: Option<String>,
}

/// (camelCase name, UPPER_CASE name, fallback)
const PLACEHOLDERS: &[(&str, &str, &str)] = &[
    ("taskId", "TASK_ID", ""),
    ("projectId", "PROJECT_ID", ""),
    ("taskTitle", "TASK_TITLE", "Unknown Task"),
    ("taskDescription", "TASK_DESCRIPTION", "No description available"),
    ("projectContext", "PROJECT_CONTEXT", "No project context available"),
    ("codingStandards", "CODING_STANDARDS", "No coding standards available"),
    ("prUrl", "PR_URL", ""),
];

impl TemplateVars {
    fn value(&self, camel: &str) -> Option<&str> {
        let value = match camel {
            "taskId" => &self.task_id,
            "projectId" => &self.project_id,
            "taskTitle" => &self.task_title,
            "taskDescription" => &self.task_description,
            "projectContext" => &self.project_context,
            "codingStandards" => &self.coding_standards,
            "prUrl" => &self.pr_url,
            _ => return None,
        };
        value.as_deref().filter(|v| !v.trim().is_empty())
    }
}

/// Literal substitution of `{{camelCase}}` and `{{UPPER_CASE}}` placeholders.
/// Both spellings of a variable receive the same value.
///
/// One left-to-right pass: substituted values are never scanned again, so a
/// value that itself mentions a placeholder is copied through unchanged.
/// Unknown placeholders are left as written.
pub fn fill_template(template: &str, vars: &TemplateVars) -> String {
    if !template.contains("{{") {
        return template.to_string();
    }
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let resolved = after
            .find("}}")
            .and_then(|end| lookup(vars, &after[..end]).map(|value| (value, end)));
        match resolved {
            Some((value, end)) => {
                out.push_str(value);
                rest = &after[end + 2..];
            }
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn lookup<'v>(vars: &'v TemplateVars, name: &str) -> Option<&'v str> {
    PLACEHOLDERS
        .iter()
        .find(|(camel, upper, _)| *camel == name || *upper == name)
        .map(|(camel, _, fallback)| vars.value(camel).unwrap_or(*fallback))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> TemplateVars {
        TemplateVars {
            task_id: Some("t-1".into()),
            task_title: Some("Add login".into()),
            ..Default::default()
        }
    }

    #[test]
    fn no_placeholders_is_identity() {
        let text = "Review the diff. Use {single} braces and [brackets] freely.";
        assert_eq!(fill_template(text, &vars()), text);
        let once = fill_template(text, &vars());
        assert_eq!(fill_template(&once, &vars()), once);
    }

    #[test]
    fn both_spellings_get_same_value() {
        let out = fill_template("{{taskTitle}} / {{TASK_TITLE}} ({{taskId}}={{TASK_ID}})", &vars());
        assert_eq!(out, "Add login / Add login (t-1=t-1)");
    }

    #[test]
    fn missing_optional_values_use_fallbacks() {
        let out = fill_template(
            "{{PROJECT_CONTEXT}}|{{codingStandards}}|{{taskDescription}}|{{projectId}}",
            &vars(),
        );
        assert_eq!(
            out,
            "No project context available|No coding standards available|No description available|"
        );
    }

    #[test]
    fn blank_value_counts_as_missing() {
        let v = TemplateVars {
            project_context: Some("  \n".into()),
            ..Default::default()
        };
        assert_eq!(
            fill_template("{{projectContext}}", &v),
            "No project context available"
        );
    }

    #[test]
    fn unknown_placeholders_are_left_alone() {
        assert_eq!(fill_template("{{somethingElse}}", &vars()), "{{somethingElse}}");
        assert_eq!(
            fill_template("{{{{taskId}} {{unclosed", &vars()),
            "{{t-1 {{unclosed"
        );
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let v = TemplateVars {
            task_description: Some("Document the {{PR_URL}} and {{projectContext}} placeholders".into()),
            pr_url: Some("https://github.com/o/r/pull/1".into()),
            ..Default::default()
        };
        assert_eq!(
            fill_template("Desc: {{taskDescription}} PR: {{prUrl}}", &v),
            "Desc: Document the {{PR_URL}} and {{projectContext}} placeholders PR: https://github.com/o/r/pull/1"
        );
    }
}
