//! Clients of the CI platform that lists workflow runs and serves their artifacts.
//!
//! [`GithubApi`] talks to GitHub REST API directly, [`GhCli`] drives the `gh` executable. Both
//! implement [`Platform`], which is also the seam tests plug in-memory fakes into.

use std::{future::Future, path::Path};

use crate::{
    config::{Config, Repository},
    error::Result,
    workflow::{RunList, WorkflowRun},
};

#[cfg(feature = "gh")]
mod gh;
#[cfg(feature = "rest")]
mod github;

#[cfg(feature = "gh")]
pub use gh::*;
#[cfg(feature = "rest")]
pub use github::*;

/// Which successful runs to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunQuery {
    /// The repository the workflow lives in.
    pub repository: Repository,
    /// The workflow file name.
    pub workflow: String,
    /// The maximum number of runs to return.
    pub limit: u32,
    /// Only return runs on these branches. Empty means any branch.
    pub branches: Vec<String>,
}

impl From<&Config> for RunQuery {
    fn from(config: &Config) -> Self {
        Self {
            repository: config.repository.clone(),
            workflow: config.workflow.clone(),
            limit: config.run_count,
            branches: config.branches.clone(),
        }
    }
}

/// The capabilities needed from the CI platform.
pub trait Platform {
    /// Lists at most `query.limit` successful runs of a workflow, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FetchError::Authentication`], [`crate::FetchError::Network`] or
    /// [`crate::FetchError::NotFound`] if the runs cannot be listed.
    fn list_successful_runs(&self, query: &RunQuery) -> impl Future<Output = Result<RunList>>;

    /// Downloads the artifact named `artifact_name` of `run` into the existing directory `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FetchError::ArtifactNotFound`] if the run has no such artifact, or
    /// [`crate::FetchError::Network`] if the transfer fails.
    fn download_artifact(
        &self,
        repository: &Repository,
        run: &WorkflowRun,
        artifact_name: &str,
        destination: &Path,
    ) -> impl Future<Output = Result<()>>;
}
