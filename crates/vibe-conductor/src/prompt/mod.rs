//! Prompt assembly for agent phases.

mod compose;
mod template;

pub use compose::{compose, merge_prompt, review_prompt, PreferenceContext, SECTION_DELIMITER};
pub use template::{fill_template, TemplateVars};
