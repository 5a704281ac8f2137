//! Default contents for every preference document.

pub(crate) const CODING_STANDARDS: &str = "# Coding Standards

## General Principles
- Write clean, readable, and maintainable code
- Follow established conventions and patterns
- Prioritize simplicity and clarity

## Code Style
- Use consistent indentation
- Follow naming conventions
- Add meaningful comments where necessary

## File Organization
- Group related files together
- Use descriptive file names
- Maintain consistent directory structure
";

pub(crate) const PROJECT_CONTEXT: &str = "# Project Context

## Project Purpose
Define the main purpose and goals of this project.

## Core Requirements
- List key requirements
- Define success criteria
- Outline constraints

## Target Users
Describe who will use this system and how.

## Technical Constraints
- Performance requirements
- Security considerations
- Compatibility needs
";

pub(crate) const REVIEW_PROMPT: &str = "Your goal is to code review the current project before a PR is being created.

## Analysis Requirements
1. **Assess the codebase thoroughly**
2. **Analyze everything file by file**
3. **Determine how well the task was executed**

## Review Criteria
- Code quality and adherence to standards
- No over engineering
- Everything in the task should be implemented

## Action Items

If the task was not executed well, you should:

- **Fix any errors** you find necessary
- **Improve code quality** where needed
- **Add missing functionality** to complete the task
- **Enhance error handling** and validation
";

pub(crate) const AUTOMERGE_PROMPT: &str = "Review this pull request and decide if it should be automatically merged.

# IMPORTANT
When you choose to merge it WILL throw an error about the branch trying to check out. This is expected and SHOULD BE IGNORED. This is caused by the fact that we're calling this from a worktree.

Task ID: {{TASK_ID}}
Project ID: {{PROJECT_ID}}
Task Title: {{TASK_TITLE}}

## Quick Assessment (Score 1-10):

**1. Code Quality (40%)**
- Clean, readable code
- No obvious bugs or issues
- Follows existing patterns

**2. Safety & Risk (35%)**
- No breaking changes
- No security issues
- Safe to deploy

**3. Completeness (25%)**
- Feature/fix is complete
- No work-in-progress code
- Addresses the requirements

## Decision:

**MERGE if total score >= 7/10**

### If MERGING:
```
SCORE: [X]/10
DECISION: MERGE
REASON: [brief why]

gh pr merge {{PR_URL}} --squash --body \"Auto-merged: [X]/10\" --delete-branch
```

### If NOT MERGING:
```
SCORE: [X]/10
DECISION: DO NOT MERGE
REASON: [main issues]
```

Be pragmatic - focus on shipping working code, not perfection.";

pub(crate) const CLAUDE_MERGE_PROMPT: &str = "Review this pull request and decide if it should be automatically merged.

## Quick Assessment (Score 1-10):

**1. Code Quality (40%)**
- Clean, readable code
- No obvious bugs or issues
- Follows existing patterns

**2. Safety & Risk (35%)**
- No breaking changes
- No security issues
- Safe to deploy

**3. Completeness (25%)**
- Feature/fix is complete
- No work-in-progress code
- Addresses the requirements

## Decision:

**MERGE if total score >= 7/10**

### If MERGING:
```
SCORE: [X]/10
DECISION: MERGE
REASON: [brief why]

gh pr merge {{PR_URL}} --squash --body \"Auto-merged: [X]/10\" --delete-branch
```

### If NOT MERGING:
```
SCORE: [X]/10
DECISION: DO NOT MERGE
REASON: [main issues]
```

Be pragmatic - focus on shipping working code, not perfection.";
