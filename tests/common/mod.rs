//! In-memory stand-ins for the CI platform and the plotter.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use run_fetcher::{
    FetchError, Repository, Result, RunList, WorkflowRun,
    platform::{Platform, RunQuery},
    plotter::Plotter,
};

/// Builds a run on `main`.
pub fn run(database_id: u64, number: u64) -> WorkflowRun {
    WorkflowRun {
        database_id,
        number,
        head_branch: Some("main".into()),
    }
}

/// A recorded call to [`FakePlatform::download_artifact`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub database_id: u64,
    pub number: u64,
    pub artifact: String,
    pub destination: PathBuf,
}

/// Serves a fixed list of runs and writes a small artifact per download.
#[derive(Debug, Default)]
pub struct FakePlatform {
    runs: Vec<WorkflowRun>,
    list_failure: Option<fn() -> FetchError>,
    failing_runs: Vec<u64>,
    ignore_limit: bool,
    pub queries: Mutex<Vec<RunQuery>>,
    pub downloads: Mutex<Vec<Download>>,
}

impl FakePlatform {
    pub fn with_runs(runs: Vec<WorkflowRun>) -> Self {
        Self {
            runs,
            ..Self::default()
        }
    }

    /// Makes listing fail with the given error.
    pub fn failing_list(mut self, failure: fn() -> FetchError) -> Self {
        self.list_failure = Some(failure);
        self
    }

    /// Returns every run regardless of the requested limit.
    pub fn ignoring_limit(mut self) -> Self {
        self.ignore_limit = true;
        self
    }

    /// Makes downloading the artifact of run `number` fail.
    pub fn failing_download(mut self, number: u64) -> Self {
        self.failing_runs.push(number);
        self
    }

    pub fn downloaded_numbers(&self) -> Vec<u64> {
        self.downloads.lock().iter().map(|d| d.number).collect()
    }
}

impl Platform for FakePlatform {
    async fn list_successful_runs(&self, query: &RunQuery) -> Result<RunList> {
        self.queries.lock().push(query.clone());
        if let Some(failure) = self.list_failure {
            return Err(failure());
        }
        let limit = if self.ignore_limit {
            usize::MAX
        } else {
            query.limit as usize
        };
        Ok(self.runs.iter().take(limit).cloned().collect())
    }

    async fn download_artifact(
        &self,
        _repository: &Repository,
        run: &WorkflowRun,
        artifact_name: &str,
        destination: &Path,
    ) -> Result<()> {
        self.downloads.lock().push(Download {
            database_id: run.database_id,
            number: run.number,
            artifact: artifact_name.to_owned(),
            destination: destination.to_path_buf(),
        });
        if self.failing_runs.contains(&run.number) {
            return Err(FetchError::ArtifactNotFound {
                artifact: artifact_name.to_owned(),
                run: run.number,
            });
        }

        let file = destination.join("tsp_db.sqlite3");
        std::fs::write(&file, run.database_id.to_string()).map_err(|err| FetchError::io(file, err))
    }
}

/// Records the run numbers it is asked to plot.
#[derive(Debug, Default)]
pub struct RecordingPlotter {
    pub calls: Mutex<Vec<Vec<u64>>>,
    pub exit_code: Option<i32>,
}

impl RecordingPlotter {
    pub fn failing(code: i32) -> Self {
        Self {
            exit_code: Some(code),
            ..Self::default()
        }
    }
}

impl Plotter for RecordingPlotter {
    async fn plot(&self, run_numbers: &[u64]) -> Result<()> {
        self.calls.lock().push(run_numbers.to_vec());
        match self.exit_code {
            Some(code) => Err(FetchError::ExternalTool {
                tool: "plotter".into(),
                code: Some(code),
                message: "failed".into(),
            }),
            None => Ok(()),
        }
    }
}
