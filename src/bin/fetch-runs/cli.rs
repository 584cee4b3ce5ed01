//! Command line definition, tracing setup and backend selection.

use std::{path::PathBuf, time::Duration};

use clap::{Parser, ValueEnum};
use run_fetcher::{
    Config, FailurePolicy, Repository, Result, WorkflowRun,
    config::{DEFAULT_ARTIFACT, DEFAULT_REPOSITORY, DEFAULT_RUN_COUNT, DEFAULT_WORKFLOW},
    env::RUN_COUNT,
    platform::{GhCli, GithubApi, Platform, RunQuery},
    plotter::{CommandPlotter, DEFAULT_PLOTTER},
    workflow::RunList,
};

/// Fetch the artifacts of the latest successful workflow runs and plot them.
#[derive(Debug, Parser)]
#[command(name = "fetch-runs", version, long_about = None)]
pub(crate) struct Cli {
    /// Repository to fetch runs from, as owner/name.
    #[arg(short, long, default_value = DEFAULT_REPOSITORY)]
    pub repo: String,

    /// Workflow file whose runs are fetched.
    #[arg(short, long, default_value = DEFAULT_WORKFLOW)]
    pub workflow: String,

    /// Artifact to download from each run.
    #[arg(short, long, default_value = DEFAULT_ARTIFACT)]
    pub artifact: String,

    /// Number of successful runs to fetch.
    #[arg(short = 'n', long, env = RUN_COUNT, default_value_t = DEFAULT_RUN_COUNT)]
    pub count: u32,

    /// Only fetch runs on these branches (repeatable or comma separated).
    #[arg(short, long = "branch", value_delimiter = ',')]
    pub branches: Vec<String>,

    /// Directory the per-run directories are created in.
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// File every downloaded artifact must contain, e.g. tsp_db.sqlite3.
    #[arg(long)]
    pub require_file: Option<PathBuf>,

    /// How to talk to GitHub.
    #[arg(long, value_enum, default_value_t = Backend::Gh)]
    pub backend: Backend,

    /// The gh executable used by the gh backend.
    #[arg(long, default_value = "gh")]
    pub gh_program: PathBuf,

    /// API root used by the rest backend.
    #[arg(long, default_value = GithubApi::DEFAULT_BASE_URL)]
    pub api_url: String,

    /// Plotting program, run inside the output directory with the run numbers as trailing arguments.
    #[arg(long, default_value = DEFAULT_PLOTTER)]
    pub plotter: PathBuf,

    /// Extra argument passed to the plotter before the run numbers (repeatable).
    ///
    /// Relative paths given here are resolved inside the output directory.
    #[arg(long = "plotter-arg", allow_hyphen_values = true)]
    pub plotter_args: Vec<String>,

    /// Skip runs whose artifact cannot be downloaded instead of aborting.
    #[arg(long)]
    pub skip_failed: bool,

    /// Give up after this many seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Log format: text (default) or json.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Log output format.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// The platform client to use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum Backend {
    /// The GitHub CLI, using its own authentication.
    Gh,
    /// GitHub REST API, authenticating with GITHUB_TOKEN or GH_TOKEN.
    Rest,
}

impl Cli {
    /// Builds the fetch configuration from the flags.
    pub fn config(&self) -> Result<Config> {
        let config = Config {
            repository: self.repo.parse::<Repository>()?,
            workflow: self.workflow.clone(),
            artifact_name: self.artifact.clone(),
            run_count: self.count,
            branches: self.branches.clone(),
            output_dir: self.output_dir.clone(),
            required_file: self.require_file.clone(),
            failure_policy: if self.skip_failed {
                FailurePolicy::SkipFailed
            } else {
                FailurePolicy::FailFast
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// The plotter, run inside the output directory.
    pub fn plotter(&self, config: &Config) -> CommandPlotter {
        CommandPlotter::new(&self.plotter)
            .args(&self.plotter_args)
            .working_dir(&config.output_dir)
    }

    /// The platform client for the selected backend.
    pub fn platform(&self) -> Result<AnyPlatform> {
        Ok(match self.backend {
            Backend::Gh => AnyPlatform::Gh(GhCli::with_program(&self.gh_program)),
            Backend::Rest => {
                AnyPlatform::Rest(GithubApi::from_env()?.with_base_url(&self.api_url))
            }
        })
    }

    /// The overall time limit, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }
}

/// Either platform client, chosen at runtime.
#[derive(Debug)]
pub(crate) enum AnyPlatform {
    Gh(GhCli),
    Rest(GithubApi),
}

impl Platform for AnyPlatform {
    async fn list_successful_runs(&self, query: &RunQuery) -> Result<RunList> {
        match self {
            Self::Gh(gh) => gh.list_successful_runs(query).await,
            Self::Rest(api) => api.list_successful_runs(query).await,
        }
    }

    async fn download_artifact(
        &self,
        repository: &Repository,
        run: &WorkflowRun,
        artifact_name: &str,
        destination: &std::path::Path,
    ) -> Result<()> {
        match self {
            Self::Gh(gh) => {
                gh.download_artifact(repository, run, artifact_name, destination)
                    .await
            }
            Self::Rest(api) => {
                api.download_artifact(repository, run, artifact_name, destination)
                    .await
            }
        }
    }
}

/// Logs to stderr, honouring `RUST_LOG` over `-v`.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "run_fetcher=info,fetch_runs=info",
        1 => "run_fetcher=debug,fetch_runs=debug",
        _ => "run_fetcher=trace,fetch_runs=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
