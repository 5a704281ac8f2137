use crate::classify::{classify_merge_failure, classify_stderr, extract_pr_url, mask_secrets};
use crate::host::{GitHost, MergeOutcome, MergeRequest, PrRequest, PrStateFilter, RemoteSync};
use crate::{GitHubError, GitHubErrorCode};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use vibe_kanban_api::{BranchStatus, MergeInfo, MergeKind, PrInfo, PrStatus};

const DEFAULT_BASE_BRANCH: &str = "main";
const PR_JSON_FIELDS: &str = "id,number,url,state,mergedAt,createdAt,baseRefName,mergeCommit";

/// Captured result of one `gh`/`git` run.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// [`GitHost`] backed by the `gh` and `git` binaries, run in one working directory.
#[derive(Debug, Clone)]
pub struct GhCli {
    cwd: PathBuf,
    gh_bin: String,
    git_bin: String,
    attempt_id: String,
}

impl GhCli {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            gh_bin: "gh".into(),
            git_bin: "git".into(),
            attempt_id: String::new(),
        }
    }

    pub fn with_gh_bin(mut self, bin: impl Into<String>) -> Self {
        self.gh_bin = bin.into();
        self
    }

    pub fn with_git_bin(mut self, bin: impl Into<String>) -> Self {
        self.git_bin = bin.into();
        self
    }

    /// Task attempt recorded on every [`MergeInfo`] this client returns.
    pub fn with_attempt(mut self, attempt_id: impl Into<String>) -> Self {
        self.attempt_id = attempt_id.into();
        self
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Run a program to completion. Only spawn failures are errors here;
    /// a non-zero exit is reported through [`CommandOutput::success`].
    pub async fn exec(&self, program: &str, args: &[&str]) -> Result<CommandOutput, GitHubError> {
        let command_line = format!("{program} {}", args.join(" "));
        tracing::debug!(command = %command_line, cwd = %self.cwd.display(), "exec");

        let output = Command::new(program)
            .args(args)
            .current_dir(&self.cwd)
            .env("GH_PAGER", "")
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                let code = if e.kind() == std::io::ErrorKind::NotFound {
                    GitHubErrorCode::NotInstalled
                } else {
                    GitHubErrorCode::CommandFailed
                };
                GitHubError::new(code, format!("failed to run {program}: {e}"))
                    .with_command(command_line.clone())
            })?;

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: mask_secrets(&String::from_utf8_lossy(&output.stderr)),
        })
    }

    /// Run and require success; returns trimmed stdout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<String, GitHubError> {
        let out = self.exec(program, args).await?;
        if out.success {
            return Ok(out.stdout.trim().to_string());
        }
        let code = classify_stderr(&out.stderr).unwrap_or(GitHubErrorCode::CommandFailed);
        Err(command_error(code, program, args, &out))
    }

    async fn gh(&self, args: &[&str]) -> Result<String, GitHubError> {
        self.run(&self.gh_bin, args).await
    }

    async fn git(&self, args: &[&str]) -> Result<String, GitHubError> {
        self.run(&self.git_bin, args).await
    }

    async fn try_list_prs(
        &self,
        branch: &str,
        state: PrStateFilter,
    ) -> Result<Vec<MergeInfo>, GitHubError> {
        let out = self
            .gh(&[
                "pr",
                "list",
                "--head",
                branch,
                "--state",
                state.as_arg(),
                "--json",
                PR_JSON_FIELDS,
            ])
            .await?;
        parse_pr_list(&out, &self.attempt_id).map_err(|e| {
            GitHubError::new(
                GitHubErrorCode::CommandFailed,
                format!("unexpected gh pr list output: {e}"),
            )
        })
    }
}

fn command_error(
    code: GitHubErrorCode,
    program: &str,
    args: &[&str],
    out: &CommandOutput,
) -> GitHubError {
    let first_line = out.stderr.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let exit = out
        .code
        .map(|c| c.to_string())
        .unwrap_or_else(|| "signal".into());
    GitHubError::new(
        code,
        format!("{program} {} failed (exit {exit}): {}", args.first().unwrap_or(&""), first_line.trim()),
    )
    .with_stderr(out.stderr.clone())
    .with_command(format!("{program} {}", args.join(" ")))
}

// ── Output parsing ──

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhPullRequest {
    #[serde(default)]
    id: String,
    number: u64,
    url: String,
    state: String,
    #[serde(default)]
    merged_at: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    base_ref_name: Option<String>,
    #[serde(default)]
    merge_commit: Option<GhCommit>,
}

#[derive(Debug, Deserialize)]
struct GhCommit {
    oid: String,
}

/// `gh` renders unset timestamps as the zero time (`0001-01-01T00:00:00Z`).
fn real_timestamp(ts: Option<String>) -> Option<String> {
    let ts = ts.filter(|t| !t.trim().is_empty())?;
    match time::OffsetDateTime::parse(&ts, &time::format_description::well_known::Rfc3339) {
        Ok(parsed) if parsed.year() <= 1 => None,
        _ => Some(ts),
    }
}

fn parse_pr_list(json: &str, attempt_id: &str) -> Result<Vec<MergeInfo>, serde_json::Error> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    let prs: Vec<GhPullRequest> = serde_json::from_str(json)?;
    Ok(prs
        .into_iter()
        .map(|pr| {
            let status = match pr.state.to_ascii_uppercase().as_str() {
                "MERGED" => PrStatus::Merged,
                "CLOSED" => PrStatus::Closed,
                _ => PrStatus::Open,
            };
            MergeInfo {
                kind: MergeKind::Pr,
                id: if pr.id.is_empty() {
                    pr.number.to_string()
                } else {
                    pr.id
                },
                task_attempt_id: attempt_id.to_string(),
                created_at: real_timestamp(pr.created_at).unwrap_or_default(),
                target_branch_name: pr.base_ref_name.unwrap_or_default(),
                pr_info: PrInfo {
                    number: pr.number,
                    url: pr.url,
                    status,
                    merged_at: real_timestamp(pr.merged_at),
                    merge_commit_sha: pr.merge_commit.map(|c| c.oid).filter(|oid| !oid.is_empty()),
                },
            }
        })
        .collect())
}

/// `git rev-list --left-right --count A...B` prints `<left>\t<right>`.
fn parse_left_right(out: &str) -> Option<(u32, u32)> {
    let mut parts = out.split_whitespace();
    let left = parts.next()?.parse().ok()?;
    let right = parts.next()?.parse().ok()?;
    Some((left, right))
}

/// (uncommitted, untracked) counts from `git status --porcelain`.
fn count_porcelain(out: &str) -> (u32, u32) {
    let mut uncommitted = 0;
    let mut untracked = 0;
    for line in out.lines().filter(|l| !l.trim().is_empty()) {
        if line.starts_with("??") {
            untracked += 1;
        } else {
            uncommitted += 1;
        }
    }
    (uncommitted, untracked)
}

// ── GitHost ──

#[async_trait]
impl GitHost for GhCli {
    async fn check_installed(&self) -> bool {
        matches!(self.exec(&self.gh_bin, &["--version"]).await, Ok(out) if out.success)
    }

    async fn check_authenticated(&self) -> bool {
        matches!(self.exec(&self.gh_bin, &["auth", "status"]).await, Ok(out) if out.success)
    }

    async fn current_branch(&self) -> Result<String, GitHubError> {
        let branch = self.git(&["branch", "--show-current"]).await?;
        if branch.is_empty() {
            return Err(GitHubError::new(
                GitHubErrorCode::BranchNotFound,
                "HEAD is detached; no current branch",
            ));
        }
        Ok(branch)
    }

    async fn remote_sync(&self, branch: &str) -> RemoteSync {
        let range = format!("origin/{branch}...HEAD");
        match self
            .git(&["rev-list", "--left-right", "--count", &range])
            .await
        {
            Ok(out) => match parse_left_right(&out) {
                Some((behind, ahead)) => RemoteSync {
                    ahead: Some(ahead),
                    behind: Some(behind),
                },
                None => {
                    tracing::warn!(output = %out, "unparseable rev-list output, assuming push needed");
                    RemoteSync::default()
                }
            },
            Err(e) => {
                tracing::warn!(branch, error = %e, "cannot compare with remote branch, assuming push needed");
                RemoteSync::default()
            }
        }
    }

    async fn branch_status(&self, base: &str) -> Result<BranchStatus, GitHubError> {
        let head_oid = self.git(&["rev-parse", "HEAD"]).await?;
        let branch = self.current_branch().await?;
        let porcelain = self.git(&["status", "--porcelain"]).await?;
        let (uncommitted, untracked) = count_porcelain(&porcelain);

        let range = format!("{base}...HEAD");
        let base_counts = match self
            .git(&["rev-list", "--left-right", "--count", &range])
            .await
        {
            Ok(out) => parse_left_right(&out),
            Err(e) => {
                tracing::warn!(base, error = %e, "cannot compare with base branch");
                None
            }
        };
        let remote = self.remote_sync(&branch).await;

        Ok(BranchStatus {
            commits_behind: base_counts.map(|(behind, _)| behind),
            commits_ahead: base_counts.map(|(_, ahead)| ahead),
            has_uncommitted_changes: Some(uncommitted + untracked > 0),
            head_oid,
            uncommitted_count: uncommitted,
            untracked_count: untracked,
            base_branch_name: base.to_string(),
            remote_commits_behind: remote.behind,
            remote_commits_ahead: remote.ahead,
            merges: self.list_prs(&branch, PrStateFilter::All).await,
        })
    }

    async fn push_branch(&self, branch: &str) -> Result<(), GitHubError> {
        let args = ["push", "-u", "origin", branch];
        let out = self.exec(&self.git_bin, &args).await?;
        if out.success {
            tracing::info!(branch, "pushed branch");
            return Ok(());
        }
        let code = match classify_stderr(&out.stderr) {
            Some(GitHubErrorCode::NotAuthenticated) => GitHubErrorCode::NotAuthenticated,
            _ => GitHubErrorCode::PushFailed,
        };
        Err(command_error(code, &self.git_bin, &args, &out))
    }

    async fn list_prs(&self, branch: &str, state: PrStateFilter) -> Vec<MergeInfo> {
        match self.try_list_prs(branch, state).await {
            Ok(prs) => prs,
            Err(e) => {
                tracing::warn!(branch, error = %e, "listing pull requests failed");
                Vec::new()
            }
        }
    }

    async fn create_pr(&self, request: &PrRequest) -> Result<String, GitHubError> {
        let head = match &request.head {
            Some(head) => head.clone(),
            None => self.current_branch().await?,
        };
        let base = request.base.as_deref().unwrap_or(DEFAULT_BASE_BRANCH);

        if self.remote_sync(&head).await.needs_push() {
            self.push_branch(&head).await?;
        }

        // gh needs an explicit body to stay non-interactive.
        let body = request.body.as_deref().unwrap_or("");
        let args = [
            "pr",
            "create",
            "--title",
            request.title.as_str(),
            "--body",
            body,
            "--base",
            base,
            "--head",
            head.as_str(),
        ];
        let out = self.exec(&self.gh_bin, &args).await?;
        if out.success {
            let Some(url) = extract_pr_url(&out.stdout) else {
                return Err(GitHubError::new(
                    GitHubErrorCode::CommandFailed,
                    "gh pr create succeeded but printed no pull request URL",
                )
                .with_command(format!("{} {}", self.gh_bin, args.join(" "))));
            };
            tracing::info!(%url, head = %head, base, "created pull request");
            return Ok(url);
        }

        match classify_stderr(&out.stderr) {
            Some(GitHubErrorCode::PrAlreadyExists) => {
                if let Some(url) = extract_pr_url(&out.stderr) {
                    tracing::info!(%url, "pull request already exists");
                    return Ok(url);
                }
                if let Some(existing) = self.list_open_prs(&head).await.into_iter().next() {
                    tracing::info!(url = %existing.pr_info.url, "pull request already exists");
                    return Ok(existing.pr_info.url);
                }
                Err(command_error(
                    GitHubErrorCode::PrAlreadyExists,
                    &self.gh_bin,
                    &args,
                    &out,
                ))
            }
            Some(GitHubErrorCode::NotAuthenticated) => Err(command_error(
                GitHubErrorCode::NotAuthenticated,
                &self.gh_bin,
                &args,
                &out,
            )),
            _ => Err(command_error(
                GitHubErrorCode::CommandFailed,
                &self.gh_bin,
                &args,
                &out,
            )),
        }
    }

    async fn merge_pr(&self, request: &MergeRequest) -> Result<MergeOutcome, GitHubError> {
        let mut args: Vec<&str> = vec!["pr", "merge"];
        if let Some(pr) = request.pr.as_deref() {
            args.push(pr);
        }
        args.push(request.method.flag());
        if let Some(body) = request.body.as_deref() {
            args.extend(["--body", body]);
        }
        if request.delete_branch {
            args.push("--delete-branch");
        }

        let out = self.exec(&self.gh_bin, &args).await?;
        if out.success {
            tracing::info!(pr = ?request.pr, "merged pull request");
            return Ok(MergeOutcome::Merged);
        }
        let kind = classify_merge_failure(&out.stderr);
        if kind.is_benign() {
            tracing::info!(pr = ?request.pr, "merged; local checkout failed in linked worktree (ignored)");
            return Ok(MergeOutcome::MergedWithCheckoutWarning { stderr: out.stderr });
        }
        let mut err = command_error(GitHubErrorCode::CommandFailed, &self.gh_bin, &args, &out);
        err.message = format!("{kind} failure: {}", err.message);
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_gh_pr_list() {
        let json = r#"[
            {"id": "PR_kw1", "number": 12, "url": "https://github.com/o/r/pull/12",
             "state": "MERGED", "mergedAt": "2025-03-01T10:00:00Z",
             "createdAt": "2025-02-28T09:00:00Z", "baseRefName": "main",
             "mergeCommit": {"oid": "abc123"}},
            {"id": "PR_kw2", "number": 13, "url": "https://github.com/o/r/pull/13",
             "state": "OPEN", "mergedAt": null, "createdAt": "2025-03-02T09:00:00Z",
             "baseRefName": "develop", "mergeCommit": null}
        ]"#;
        let prs = parse_pr_list(json, "attempt-1").unwrap();
        assert_eq!(prs.len(), 2);
        assert_eq!(prs[0].pr_info.status, PrStatus::Merged);
        assert_eq!(prs[0].pr_info.merge_commit_sha.as_deref(), Some("abc123"));
        assert_eq!(prs[0].task_attempt_id, "attempt-1");
        assert!(prs[0].pr_info.is_merged());
        assert_eq!(prs[1].pr_info.status, PrStatus::Open);
        assert_eq!(prs[1].target_branch_name, "develop");
        assert!(!prs[1].pr_info.is_merged());
    }

    #[test]
    fn zero_time_is_not_merged() {
        let json = r#"[{"number": 5, "url": "u", "state": "CLOSED",
                        "mergedAt": "0001-01-01T00:00:00Z"}]"#;
        let prs = parse_pr_list(json, "").unwrap();
        assert_eq!(prs[0].pr_info.merged_at, None);
        assert_eq!(prs[0].id, "5");
        assert!(!prs[0].pr_info.is_merged());
    }

    #[test]
    fn empty_output_is_empty_list() {
        assert!(parse_pr_list("  \n", "").unwrap().is_empty());
        assert!(parse_pr_list("not json", "").is_err());
    }

    #[test]
    fn left_right_counts() {
        assert_eq!(parse_left_right("1\t4\n"), Some((1, 4)));
        assert_eq!(parse_left_right("garbage"), None);
    }

    #[test]
    fn porcelain_counts() {
        let out = " M src/lib.rs\nM  Cargo.toml\nA  new.rs\n?? scratch.txt\n\n";
        assert_eq!(count_porcelain(out), (3, 1));
        assert_eq!(count_porcelain(""), (0, 0));
    }

    /// Executable `sh` script standing in for `gh` or `git`.
    #[cfg(unix)]
    fn script(dir: &Path, name: &str, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    /// `git` that reports the branch level with its remote, so nothing is pushed.
    #[cfg(unix)]
    fn synced_git(dir: &Path) -> String {
        script(dir, "git", r#"printf '0\t0\n'"#)
    }

    #[cfg(unix)]
    fn request() -> PrRequest {
        PrRequest {
            title: "Add login page".into(),
            body: Some("Users need to sign in.".into()),
            base: Some("main".into()),
            head: Some("vk/1a2b-add-login".into()),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn create_resolves_existing_pr_url() {
        let dir = tempfile::tempdir().unwrap();
        let gh = script(
            dir.path(),
            "gh",
            r#"echo 'a pull request for branch "vk/1a2b-add-login" into branch "main" already exists:' >&2
echo 'https://github.com/acme/app/pull/5' >&2
exit 1"#,
        );
        let cli = GhCli::new(dir.path())
            .with_gh_bin(gh)
            .with_git_bin(synced_git(dir.path()));
        let url = cli.create_pr(&request()).await.unwrap();
        assert_eq!(url, "https://github.com/acme/app/pull/5");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn create_returns_printed_url() {
        let dir = tempfile::tempdir().unwrap();
        let gh = script(
            dir.path(),
            "gh",
            "echo 'Creating pull request for vk/1a2b-add-login into main'\necho 'https://github.com/acme/app/pull/12'",
        );
        let cli = GhCli::new(dir.path())
            .with_gh_bin(gh)
            .with_git_bin(synced_git(dir.path()));
        assert_eq!(
            cli.create_pr(&request()).await.unwrap(),
            "https://github.com/acme/app/pull/12"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn create_without_url_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let gh = script(dir.path(), "gh", "echo 'Warning: 3 uncommitted changes'");
        let cli = GhCli::new(dir.path())
            .with_gh_bin(gh)
            .with_git_bin(synced_git(dir.path()));
        let err = cli.create_pr(&request()).await.unwrap_err();
        assert_eq!(err.code, GitHubErrorCode::CommandFailed);
        assert!(err.message.contains("no pull request URL"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn merge_checkout_error_counts_as_merged() {
        let dir = tempfile::tempdir().unwrap();
        let gh = script(
            dir.path(),
            "gh",
            r#"echo "failed to run git: fatal: 'main' is already checked out at '/workspace/repo'" >&2
exit 1"#,
        );
        let cli = GhCli::new(dir.path()).with_gh_bin(gh);
        let outcome = cli
            .merge_pr(&MergeRequest {
                pr: Some("https://github.com/acme/app/pull/12".into()),
                delete_branch: true,
                ..Default::default()
            })
            .await
            .unwrap();
        match outcome {
            MergeOutcome::MergedWithCheckoutWarning { stderr } => {
                assert!(stderr.contains("already checked out"))
            }
            other => panic!("expected checkout warning, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn merge_conflict_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let gh = script(
            dir.path(),
            "gh",
            r#"echo 'Pull request acme/app#12 is not mergeable: the merge commit cannot be cleanly created.' >&2
exit 1"#,
        );
        let cli = GhCli::new(dir.path()).with_gh_bin(gh);
        let err = cli.merge_pr(&MergeRequest::default()).await.unwrap_err();
        assert_eq!(err.code, GitHubErrorCode::CommandFailed);
        assert!(err.stderr.contains("not mergeable"));
    }

    #[tokio::test]
    async fn missing_binary_is_not_installed() {
        let cli = GhCli::new(std::env::temp_dir()).with_gh_bin("vibe-no-such-gh-binary");
        assert!(!cli.check_installed().await);
        let err = cli
            .exec("vibe-no-such-gh-binary", &["--version"])
            .await
            .unwrap_err();
        assert_eq!(err.code, GitHubErrorCode::NotInstalled);
        assert!(cli.list_open_prs("main").await.is_empty());
    }
}
