//! The downstream plotting program, fed with the run numbers of the downloaded artifacts.

use std::{
    ffi::OsString,
    future::Future,
    path::{Path, PathBuf},
};

use tokio::process::Command;
use tracing::{debug, error, info};

use crate::error::{FetchError, Result};

/// The plotting program run by default.
pub const DEFAULT_PLOTTER: &str = "memprof_plotter";

/// Consumes the run numbers of the downloaded artifacts.
pub trait Plotter {
    /// Plots the runs, given in the order they were fetched.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ExternalTool`] if plotting fails.
    fn plot(&self, run_numbers: &[u64]) -> impl Future<Output = Result<()>>;
}

/// A [`Plotter`] that runs an external program with the run numbers as trailing arguments.
#[derive(Debug, Clone)]
pub struct CommandPlotter {
    program: PathBuf,
    args: Vec<OsString>,
    working_dir: Option<PathBuf>,
}

impl Default for CommandPlotter {
    fn default() -> Self {
        Self::new(DEFAULT_PLOTTER)
    }
}

impl CommandPlotter {
    /// Runs `program` with no extra arguments in the current directory.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    /// Adds arguments placed before the run numbers.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Runs the program in `dir`, where the per-run directories live.
    ///
    /// A relative program path such as `./plot.sh` is resolved against the current directory
    /// first, so it keeps pointing at the same file. Bare names are still looked up on `PATH`.
    #[must_use]
    pub fn working_dir(mut self, dir: impl AsRef<Path>) -> Self {
        if self.program.is_relative() && self.program.components().count() > 1 {
            if let Ok(cwd) = std::env::current_dir() {
                self.program = cwd.join(&self.program);
            }
        }
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// The program that is run.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// The full argument list for `run_numbers`.
    pub fn command_line(&self, run_numbers: &[u64]) -> Vec<OsString> {
        self.args
            .iter()
            .cloned()
            .chain(run_numbers.iter().map(|n| OsString::from(n.to_string())))
            .collect()
    }
}

impl Plotter for CommandPlotter {
    async fn plot(&self, run_numbers: &[u64]) -> Result<()> {
        let tool = self.program.display().to_string();
        let args = self.command_line(run_numbers);
        debug!("running {tool} with {} runs…", run_numbers.len());

        let mut command = Command::new(&self.program);
        command.args(&args).kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let status = command.status().await.map_err(|err| {
            error!("failed to run {tool}: {err}");
            FetchError::ExternalTool {
                tool: tool.clone(),
                code: None,
                message: err.to_string(),
            }
        })?;

        if status.success() {
            info!("plotted {} runs with {tool}", run_numbers.len());
            Ok(())
        } else {
            error!("{tool} exited with {status}");
            Err(FetchError::ExternalTool {
                tool,
                code: status.code(),
                message: format!("exited with {status}"),
            })
        }
    }
}
