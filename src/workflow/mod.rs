//! Data models of GitHub Actions workflow runs.

use serde::Deserialize;

pub mod artifact;

/// A successful workflow run, addressed by its internal id and labelled by its run number.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRun {
    /// The opaque id used to address the run's artifacts.
    pub database_id: u64,
    /// The human-facing sequence number of the run.
    pub number: u64,
    /// The branch the run was triggered on, when known.
    #[serde(default)]
    pub head_branch: Option<String>,
}

/// Workflow runs, most recent first, in the order the platform returned them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunList(Vec<WorkflowRun>);

impl RunList {
    /// Wraps runs without reordering them.
    pub fn new(runs: Vec<WorkflowRun>) -> Self {
        Self(runs)
    }

    /// The run numbers, in list order.
    pub fn numbers(&self) -> Vec<u64> {
        self.0.iter().map(|run| run.number).collect()
    }

    /// The number of runs.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no runs at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the runs in list order.
    pub fn iter(&self) -> std::slice::Iter<'_, WorkflowRun> {
        self.0.iter()
    }

    /// Keeps the first `len` runs.
    pub fn truncate(&mut self, len: usize) {
        self.0.truncate(len);
    }
}

impl From<Vec<WorkflowRun>> for RunList {
    fn from(runs: Vec<WorkflowRun>) -> Self {
        Self(runs)
    }
}

impl FromIterator<WorkflowRun> for RunList {
    fn from_iter<T: IntoIterator<Item = WorkflowRun>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for RunList {
    type Item = WorkflowRun;
    type IntoIter = std::vec::IntoIter<WorkflowRun>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a RunList {
    type Item = &'a WorkflowRun;
    type IntoIter = std::slice::Iter<'a, WorkflowRun>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A page of workflow runs from GitHub REST API.
#[derive(Debug, Deserialize, Clone)]
pub struct WorkflowRuns {
    /// The number of runs matching the query across all pages.
    pub total_count: u64,
    /// The runs of this page.
    pub workflow_runs: Vec<ApiWorkflowRun>,
}

/// Represents a GitHub Actions workflow run from GitHub REST API.
#[derive(Debug, Deserialize, Clone)]
pub struct ApiWorkflowRun {
    /// The run id.
    pub id: u64,
    /// The run number.
    pub run_number: u64,
    /// The branch the run was triggered on.
    pub head_branch: Option<String>,
    /// The commit the run was triggered on.
    #[serde(default)]
    pub head_sha: Option<String>,
    /// The conclusion of a completed run.
    #[serde(default)]
    pub conclusion: Option<String>,
}

impl From<ApiWorkflowRun> for WorkflowRun {
    fn from(run: ApiWorkflowRun) -> Self {
        Self {
            database_id: run.id,
            number: run.run_number,
            head_branch: run.head_branch,
        }
    }
}
