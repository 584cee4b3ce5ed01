use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::Stdio,
};

use tokio::process::Command;
use tracing::{debug, error, info};

use super::{Platform, RunQuery};
use crate::{
    config::{Repository, accepts_branch},
    error::{FetchError, Result},
    workflow::{RunList, WorkflowRun},
};

/// The fields requested from `gh run list`.
const RUN_FIELDS: &str = "databaseId,number,headBranch";

/// A [`Platform`] backed by the GitHub CLI, which takes care of authentication itself.
#[derive(Debug, Clone)]
pub struct GhCli {
    program: PathBuf,
}

impl Default for GhCli {
    fn default() -> Self {
        Self::new()
    }
}

/// What `gh` was asked to do, for interpreting its failures.
#[derive(Debug, Clone, Copy)]
enum Stage<'a> {
    List,
    Download { artifact: &'a str, run: u64 },
}

impl GhCli {
    /// Uses the `gh` found on `PATH`.
    pub fn new() -> Self {
        Self::with_program("gh")
    }

    /// Uses a specific `gh` executable.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn gh(&self, args: Vec<OsString>, stage: Stage<'_>) -> Result<Vec<u8>> {
        let tool = self.program.display().to_string();
        debug!("running {tool} {}…", display_args(&args));

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| {
                error!("failed to run {tool}: {err}");
                FetchError::ExternalTool {
                    tool: tool.clone(),
                    code: None,
                    message: err.to_string(),
                }
            })?;

        if output.status.success() {
            Ok(output.stdout)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("{tool} failed: {}", stderr.trim());
            Err(classify_failure(
                &tool,
                stage,
                output.status.code(),
                stderr.trim(),
            ))
        }
    }
}

impl Platform for GhCli {
    async fn list_successful_runs(&self, query: &RunQuery) -> Result<RunList> {
        let mut args: Vec<OsString> = vec![
            "run".into(),
            "list".into(),
            "--repo".into(),
            query.repository.to_string().into(),
            "--workflow".into(),
            query.workflow.clone().into(),
            "--status".into(),
            "success".into(),
            "--limit".into(),
            query.limit.to_string().into(),
            "--json".into(),
            RUN_FIELDS.into(),
        ];
        if let [branch] = query.branches.as_slice() {
            args.extend([OsString::from("--branch"), OsString::from(branch)]);
        }

        let stdout = self.gh(args, Stage::List).await?;
        let runs: Vec<WorkflowRun> = serde_json::from_slice(&stdout).map_err(|err| {
            error!("failed to parse gh run list output: {err}");
            FetchError::ExternalTool {
                tool: self.program.display().to_string(),
                code: None,
                message: format!("unexpected run list output: {err}"),
            }
        })?;

        let runs: RunList = runs
            .into_iter()
            .filter(|run| accepts_branch(&query.branches, run))
            .collect();
        info!(
            "fetched {} successful runs of {} in {}",
            runs.len(),
            query.workflow,
            query.repository
        );
        Ok(runs)
    }

    async fn download_artifact(
        &self,
        repository: &Repository,
        run: &WorkflowRun,
        artifact_name: &str,
        destination: &Path,
    ) -> Result<()> {
        // gh refuses to overwrite, so download next to the destination and move the files over
        let parent = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let staging = tempfile::Builder::new()
            .prefix(".gh-download-")
            .tempdir_in(parent)
            .map_err(|err| FetchError::io(parent, err))?;

        let args: Vec<OsString> = vec![
            "run".into(),
            "download".into(),
            run.database_id.to_string().into(),
            "--repo".into(),
            repository.to_string().into(),
            "--name".into(),
            artifact_name.into(),
            "--dir".into(),
            staging.path().into(),
        ];

        self.gh(
            args,
            Stage::Download {
                artifact: artifact_name,
                run: run.number,
            },
        )
        .await?;
        move_entries(staging.path(), destination).await?;
        info!(
            "downloaded {artifact_name} of run {} to {}",
            run.number,
            destination.display()
        );
        Ok(())
    }
}

/// Moves everything under `from` into `to`, replacing files that already exist there.
async fn move_entries(from: &Path, to: &Path) -> Result<()> {
    let mut pending = vec![(from.to_path_buf(), to.to_path_buf())];

    while let Some((from, to)) = pending.pop() {
        tokio::fs::create_dir_all(&to)
            .await
            .map_err(|err| FetchError::io(&to, err))?;
        let mut entries = tokio::fs::read_dir(&from)
            .await
            .map_err(|err| FetchError::io(&from, err))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| FetchError::io(&from, err))?
        {
            let source = entry.path();
            let target = to.join(entry.file_name());
            let file_type = entry
                .file_type()
                .await
                .map_err(|err| FetchError::io(&source, err))?;

            if file_type.is_dir() {
                pending.push((source, target));
            } else {
                tokio::fs::rename(&source, &target)
                    .await
                    .map_err(|err| FetchError::io(&target, err))?;
            }
        }
    }

    Ok(())
}

fn display_args(args: &[OsString]) -> String {
    args.iter()
        .map(|arg| arg.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Maps what `gh` printed on failure to the matching [`FetchError`].
fn classify_failure(tool: &str, stage: Stage<'_>, code: Option<i32>, stderr: &str) -> FetchError {
    let lower = stderr.to_lowercase();
    let mentions = |needles: &[&str]| needles.iter().any(|needle| lower.contains(needle));

    if mentions(&[
        "gh auth login",
        "http 401",
        "http 403",
        "bad credentials",
        "authentication",
    ]) {
        return FetchError::authentication(stderr);
    }
    if mentions(&[
        "error connecting",
        "dial tcp",
        "connection refused",
        "no such host",
        "timeout",
        "timed out",
    ]) {
        return FetchError::Network(stderr.to_owned());
    }

    match stage {
        Stage::Download { artifact, run }
            if mentions(&[
                "no artifact",
                "no valid artifacts",
                "http 404",
                "http 410",
                "expired",
                "not found",
            ]) =>
        {
            FetchError::ArtifactNotFound {
                artifact: artifact.to_owned(),
                run,
            }
        }
        Stage::List if mentions(&["http 404", "could not find", "not found"]) => {
            FetchError::not_found(stderr)
        }
        _ => FetchError::ExternalTool {
            tool: tool.to_owned(),
            code,
            message: stderr.to_owned(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOWNLOAD: Stage<'static> = Stage::Download {
        artifact: "run-log",
        run: 10,
    };

    #[test]
    fn classifies_authentication_failures() {
        let err = classify_failure(
            "gh",
            Stage::List,
            Some(4),
            "To get started with GitHub CLI, please run:  gh auth login",
        );
        assert!(matches!(err, FetchError::Authentication { .. }));

        let err = classify_failure("gh", DOWNLOAD, Some(1), "HTTP 401: Bad credentials");
        assert!(matches!(err, FetchError::Authentication { .. }));
    }

    #[test]
    fn classifies_missing_things() {
        let err = classify_failure(
            "gh",
            Stage::List,
            Some(1),
            "could not find any workflows named nope.yml",
        );
        assert!(matches!(err, FetchError::NotFound { .. }));

        let err = classify_failure(
            "gh",
            DOWNLOAD,
            Some(1),
            "no artifact matches any of the names or patterns provided",
        );
        assert!(matches!(
            err,
            FetchError::ArtifactNotFound { run: 10, ref artifact } if artifact == "run-log"
        ));
    }

    #[test]
    fn classifies_network_failures() {
        let err = classify_failure(
            "gh",
            Stage::List,
            Some(1),
            "error connecting to api.github.com",
        );
        assert!(matches!(err, FetchError::Network(_)));
    }

    #[test]
    fn keeps_unknown_failures_with_exit_code() {
        let err = classify_failure("gh", Stage::List, Some(2), "something odd");
        assert!(matches!(
            err,
            FetchError::ExternalTool { code: Some(2), .. }
        ));
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn missing_executable_is_an_external_tool_error() {
        let gh = GhCli::with_program("/nonexistent/run-fetcher/gh");
        let query = RunQuery {
            repository: "g-adopt/g-adopt".parse().unwrap(),
            workflow: "test.yml".into(),
            limit: 1,
            branches: Vec::new(),
        };
        assert!(matches!(
            gh.list_successful_runs(&query).await,
            Err(FetchError::ExternalTool { code: None, .. })
        ));
    }
}
