//! Downloads the artifacts of the latest successful workflow runs into `./<run number>/` and
//! plots them.

mod cli;

use std::process::ExitCode;

use clap::Parser as _;
use run_fetcher::{FetchError, RunFetcher, shutdown::until_shutdown};
use tracing::{error, info};

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    cli::init_tracing(&cli);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(
                err.downcast_ref::<FetchError>()
                    .map_or(1, FetchError::exit_code),
            )
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config()?;
    let plotter = cli.plotter(&config);
    let platform = cli.platform()?;

    let fetcher = RunFetcher::new(config, platform, plotter)?;
    let report = until_shutdown(fetcher.run(), cli.timeout()).await?;

    info!(
        "fetched {} runs, downloaded {}, skipped {}, plotted {:?}",
        report.runs.len(),
        report.downloaded.len(),
        report.failed.len(),
        report.plotted
    );
    Ok(())
}
