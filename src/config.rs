//! Configuration of a fetch, built once at startup and passed explicitly.
//!
//! The defaults reproduce the memory-profile plotting setup: the last 10 successful runs of
//! `test.yml` in `g-adopt/g-adopt`, each with its `run-log` artifact.

use std::{
    fmt::Display,
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::{
    error::{FetchError, Result},
    workflow::WorkflowRun,
};

/// Default repository to fetch runs from.
pub const DEFAULT_REPOSITORY: &str = "g-adopt/g-adopt";
/// Default workflow file name.
pub const DEFAULT_WORKFLOW: &str = "test.yml";
/// Default artifact name.
pub const DEFAULT_ARTIFACT: &str = "run-log";
/// Default number of runs.
pub const DEFAULT_RUN_COUNT: u32 = 10;

/// A repository identifier in `owner/name` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    /// The owning user or organization.
    pub owner: String,
    /// The repository name.
    pub name: String,
}

impl FromStr for Repository {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self {
                    owner: owner.to_owned(),
                    name: name.to_owned(),
                })
            }
            _ => Err(FetchError::configuration(format!(
                "invalid repository {s:?}, expected owner/name"
            ))),
        }
    }
}

impl Default for Repository {
    fn default() -> Self {
        DEFAULT_REPOSITORY
            .parse()
            .expect("default repository is in owner/name form")
    }
}

impl Display for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// What to do when downloading the artifact of a single run fails.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort the whole fetch on the first failure.
    #[default]
    FailFast,
    /// Warn, record the failure and continue with the remaining runs.
    SkipFailed,
}

/// Everything a [`crate::RunFetcher`] needs to know.
#[derive(Debug, Clone)]
pub struct Config {
    /// The repository to fetch runs from.
    pub repository: Repository,
    /// The workflow file name, e.g. `test.yml`.
    pub workflow: String,
    /// The name of the artifact to download from each run.
    pub artifact_name: String,
    /// How many of the latest successful runs to fetch.
    pub run_count: u32,
    /// Only consider runs on these branches. Empty means any branch.
    pub branches: Vec<String>,
    /// The directory the per-run directories are created in.
    pub output_dir: PathBuf,
    /// A file every downloaded artifact must contain.
    pub required_file: Option<PathBuf>,
    /// What to do when a download fails.
    pub failure_policy: FailurePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repository: Repository::default(),
            workflow: DEFAULT_WORKFLOW.into(),
            artifact_name: DEFAULT_ARTIFACT.into(),
            run_count: DEFAULT_RUN_COUNT,
            branches: Vec::new(),
            output_dir: PathBuf::from("."),
            required_file: None,
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl Config {
    /// Checks the configuration for values no fetch can work with.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Configuration`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.run_count == 0 {
            return Err(FetchError::configuration("run count must be positive"));
        }
        if self.workflow.trim().is_empty() {
            return Err(FetchError::configuration("workflow must not be empty"));
        }
        if self.artifact_name.trim().is_empty() {
            return Err(FetchError::configuration("artifact name must not be empty"));
        }
        if self.branches.iter().any(|b| b.trim().is_empty()) {
            return Err(FetchError::configuration("branch names must not be empty"));
        }
        if let Some(file) = &self.required_file {
            if file.as_os_str().is_empty() || file.is_absolute() {
                return Err(FetchError::configuration(format!(
                    "required file {file:?} must be a relative path"
                )));
            }
        }
        Ok(())
    }

    /// The directory the artifact of `run` is downloaded into: `<output_dir>/<number>`.
    pub fn run_directory(&self, run: &WorkflowRun) -> PathBuf {
        self.output_dir.join(run.number.to_string())
    }

    /// Whether `run` passes the branch filter.
    pub fn accepts_branch(&self, run: &WorkflowRun) -> bool {
        accepts_branch(&self.branches, run)
    }

    /// The file every artifact must contain, resolved inside `dir`.
    pub fn required_path(&self, dir: &Path) -> Option<PathBuf> {
        self.required_file.as_ref().map(|file| dir.join(file))
    }
}

/// Whether `run` is on one of `branches`, or `branches` is empty.
pub(crate) fn accepts_branch(branches: &[String], run: &WorkflowRun) -> bool {
    branches.is_empty()
        || run
            .head_branch
            .as_ref()
            .is_some_and(|head| branches.iter().any(|b| b == head))
}
