//! Fetches the artifacts of the latest successful workflow runs and hands their run numbers to a plotter.
//!
//! The moving parts are the [`platform::Platform`] that talks to the CI system, the
//! [`plotter::Plotter`] that consumes the downloaded runs, and the [`fetcher::RunFetcher`] that
//! sequences the two according to a [`config::Config`].

pub mod config;
pub mod env;
pub mod error;
pub mod fetcher;
pub mod platform;
pub mod plotter;
pub mod shutdown;
pub mod transactions;
pub mod workflow;

pub use config::{Config, FailurePolicy, Repository};
pub use error::{FetchError, Result};
pub use fetcher::{FetchReport, RunFetcher};
pub use workflow::{RunList, WorkflowRun};
