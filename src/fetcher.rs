//! Sequences a fetch: list the runs, download each artifact, then plot once.

use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use crate::{
    config::{Config, FailurePolicy},
    error::{FetchError, Result},
    platform::{Platform, RunQuery},
    plotter::Plotter,
    workflow::{RunList, WorkflowRun},
};

/// What a completed [`RunFetcher::run`] did.
#[derive(Debug, Default)]
pub struct FetchReport {
    /// The runs listed by the platform, most recent first.
    pub runs: RunList,
    /// The runs whose artifact was downloaded, with their directories.
    pub downloaded: Vec<(u64, PathBuf)>,
    /// The runs skipped under [`FailurePolicy::SkipFailed`], with the reason.
    pub failed: Vec<(u64, FetchError)>,
    /// The run numbers handed to the plotter, empty if it was not run.
    pub plotted: Vec<u64>,
}

/// Fetches the artifacts of the latest successful runs and plots them.
///
/// Every step runs to completion before the next one starts.
#[derive(Debug)]
pub struct RunFetcher<P, L> {
    config: Config,
    platform: P,
    plotter: L,
}

impl<P, L> RunFetcher<P, L>
where
    P: Platform,
    L: Plotter,
{
    /// Creates a fetcher after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Configuration`] if `config` is invalid.
    pub fn new(config: Config, platform: P, plotter: L) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            platform,
            plotter,
        })
    }

    /// The configuration in use.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The platform client in use.
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// The plotter in use.
    pub fn plotter(&self) -> &L {
        &self.plotter
    }

    /// Lists at most `run_count` successful runs of the configured workflow, most recent first.
    ///
    /// # Errors
    ///
    /// Returns the platform's error if the runs cannot be listed.
    pub async fn fetch_recent_successful_runs(&self) -> Result<RunList> {
        let query = RunQuery::from(&self.config);
        debug!(
            "fetching {} successful runs of {} in {}…",
            query.limit, query.workflow, query.repository
        );

        let mut runs = self.platform.list_successful_runs(&query).await?;
        let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);
        if runs.len() > limit {
            warn!("platform returned {} runs, keeping {limit}", runs.len());
            runs.truncate(limit);
        }
        if runs.len() < limit {
            info!("only {} of {limit} requested runs available", runs.len());
        }
        Ok(runs)
    }

    /// Downloads the configured artifact of `run` into `<output_dir>/<number>`, returning the directory.
    ///
    /// The directory is created if needed and reused if it exists.
    ///
    /// # Errors
    ///
    /// Returns the platform's error if the download fails, [`FetchError::Io`] if the directory
    /// cannot be created, or [`FetchError::CorruptArtifact`] if the required file is missing.
    pub async fn download_artifact(&self, run: &WorkflowRun) -> Result<PathBuf> {
        let dir = self.config.run_directory(run);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|err| FetchError::io(&dir, err))?;

        info!(
            "downloading {} of run {} ({})…",
            self.config.artifact_name, run.number, run.database_id
        );
        self.platform
            .download_artifact(
                &self.config.repository,
                run,
                &self.config.artifact_name,
                &dir,
            )
            .await?;

        if let Some(required) = self.config.required_path(&dir) {
            match tokio::fs::try_exists(&required).await {
                Ok(true) => {}
                Ok(false) => {
                    return Err(FetchError::CorruptArtifact {
                        run: run.number,
                        message: format!("{} is missing", required.display()),
                    });
                }
                Err(err) => return Err(FetchError::io(required, err)),
            }
        }

        Ok(dir)
    }

    /// Hands `run_numbers` to the plotter, in order.
    ///
    /// # Errors
    ///
    /// Returns the plotter's error.
    pub async fn invoke_plotter(&self, run_numbers: &[u64]) -> Result<()> {
        info!("plotting runs {run_numbers:?}…");
        self.plotter.plot(run_numbers).await
    }

    /// Lists the runs, downloads each artifact in turn, then plots all downloaded runs once.
    ///
    /// Under [`FailurePolicy::FailFast`] the first failed download ends the fetch before anything
    /// else is downloaded or plotted. Under [`FailurePolicy::SkipFailed`] failed runs are left out
    /// of the plot instead.
    ///
    /// # Errors
    ///
    /// Returns the first error that ends the fetch.
    pub async fn run(&self) -> Result<FetchReport> {
        let mut report = FetchReport {
            runs: self.fetch_recent_successful_runs().await?,
            ..FetchReport::default()
        };

        if report.runs.is_empty() {
            warn!(
                "no successful runs of {} in {}, nothing to plot",
                self.config.workflow, self.config.repository
            );
            return Ok(report);
        }

        for run in report.runs.iter() {
            match self.download_artifact(run).await {
                Ok(dir) => report.downloaded.push((run.number, dir)),
                Err(err) => match self.config.failure_policy {
                    FailurePolicy::FailFast => {
                        error!("failed to download run {}: {err}", run.number);
                        return Err(err);
                    }
                    FailurePolicy::SkipFailed => {
                        warn!("skipping run {}: {err}", run.number);
                        report.failed.push((run.number, err));
                    }
                },
            }
        }

        if report.downloaded.is_empty() && !report.failed.is_empty() {
            error!("no artifact could be downloaded");
            return Err(report.failed.swap_remove(0).1);
        }

        let numbers: Vec<u64> = report.downloaded.iter().map(|(n, _)| *n).collect();
        self.invoke_plotter(&numbers).await?;
        report.plotted = numbers;
        Ok(report)
    }
}
