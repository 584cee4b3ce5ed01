use std::{error::Error as _, path::Path};

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};

use super::{Platform, RunQuery};
use crate::{
    config::{Repository, accepts_branch},
    env::github_token,
    error::{FetchError, Result},
    transactions::download_and_extract_archive,
    workflow::{
        RunList, WorkflowRun, WorkflowRuns,
        artifact::{Artifact, Artifacts, github_api_request_builder},
    },
};

/// The largest page GitHub REST API serves.
const MAX_PER_PAGE: u32 = 100;

/// A [`Platform`] backed by GitHub REST API.
#[derive(Clone)]
pub struct GithubApi {
    client: Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for GithubApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubApi")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GithubApi {
    /// The base URL of the public GitHub REST API.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.github.com";

    /// Creates a client authenticating with `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: Self::DEFAULT_BASE_URL.to_owned(),
            token: token.into(),
        }
    }

    /// Creates a client authenticating with the token from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Authentication`] if no token is set.
    pub fn from_env() -> Result<Self> {
        github_token().map(Self::new)
    }

    /// Points the client at another API root, e.g. a GitHub Enterprise server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    fn request(&self, url: &str) -> RequestBuilder {
        github_api_request_builder(&self.client, url, &self.token)
    }

    async fn send(&self, request: RequestBuilder, url: &str) -> Result<Response> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                error!("failed to request {url}: {err}");
                return Err(FetchError::Network(format!("failed to request {url}: {err}")));
            }
        };

        match response.status() {
            status if status.is_success() => Ok(response),
            status => {
                error!("failed to request {url}: {status}");
                Err(status_error(status, url))
            }
        }
    }

    async fn send_json<T>(&self, request: RequestBuilder, url: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        match self.send(request, url).await?.json::<T>().await {
            Ok(json) => Ok(json),
            Err(err) => {
                error!("failed to parse data from {url}: {err}");

                if let Some(source) = err.source() {
                    error!("{source}")
                }

                Err(FetchError::Network(format!(
                    "failed to parse data from {url}: {err}"
                )))
            }
        }
    }

    /// Fetches the artifacts named `name` of the run `run_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    pub async fn fetch_artifacts(
        &self,
        repository: &Repository,
        run_id: u64,
        name: &str,
    ) -> Result<Vec<Artifact>> {
        let url = format!(
            "{}/repos/{repository}/actions/runs/{run_id}/artifacts",
            self.base_url
        );
        debug!("fetching artifacts named {name} from {url}…");

        let artifacts: Artifacts = self
            .send_json(self.request(&url).query(&[("name", name)]), &url)
            .await?;
        match artifacts.total_count {
            1 => info!("fetched 1 artifact from {url}"),
            count => info!("fetched {count} artifacts from {url}"),
        }
        Ok(artifacts.artifacts)
    }
}

impl Platform for GithubApi {
    async fn list_successful_runs(&self, query: &RunQuery) -> Result<RunList> {
        let url = format!(
            "{}/repos/{}/actions/workflows/{}/runs",
            self.base_url, query.repository, query.workflow
        );
        let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);
        let per_page = query.limit.clamp(1, MAX_PER_PAGE);
        debug!("fetching {} successful runs from {url}…", query.limit);

        let mut runs = Vec::new();
        for page in 1.. {
            let mut request = self.request(&url).query(&[
                ("status", "success"),
                ("per_page", per_page.to_string().as_str()),
                ("page", page.to_string().as_str()),
            ]);
            if let [branch] = query.branches.as_slice() {
                request = request.query(&[("branch", branch)]);
            }

            let workflow_runs: WorkflowRuns = self.send_json(request, &url).await?;
            let fetched = workflow_runs.workflow_runs.len();
            runs.extend(
                workflow_runs
                    .workflow_runs
                    .into_iter()
                    .map(WorkflowRun::from)
                    .filter(|run| accepts_branch(&query.branches, run)),
            );

            if runs.len() >= limit || fetched < per_page as usize {
                break;
            }
        }

        let mut runs = RunList::new(runs);
        runs.truncate(limit);
        info!("fetched {} successful runs from {url}", runs.len());
        Ok(runs)
    }

    async fn download_artifact(
        &self,
        repository: &Repository,
        run: &WorkflowRun,
        artifact_name: &str,
        destination: &Path,
    ) -> Result<()> {
        let not_found = || FetchError::ArtifactNotFound {
            artifact: artifact_name.to_owned(),
            run: run.number,
        };

        let artifact = self
            .fetch_artifacts(repository, run.database_id, artifact_name)
            .await?
            .into_iter()
            .find(|artifact| artifact.name == artifact_name && !artifact.expired)
            .ok_or_else(|| {
                error!("no artifact named {artifact_name} on run {}", run.number);
                not_found()
            })?;

        let url = &artifact.archive_download_url;
        debug!("requesting download from {url}…");
        let response = match self.send(self.request(url), url).await {
            Ok(response) => response,
            Err(FetchError::NotFound { .. }) => {
                error!("failed to request download: artifact expired or removed");
                return Err(not_found());
            }
            Err(err) => return Err(err),
        };
        info!("requested download from {url}");

        download_and_extract_archive(
            run.number,
            Box::pin(response.bytes_stream()),
            artifact.sha256(),
            destination,
        )
        .await
    }
}

fn status_error(status: StatusCode, url: &str) -> FetchError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            FetchError::authentication(format!("{url} answered {status}"))
        }
        StatusCode::NOT_FOUND | StatusCode::GONE => FetchError::not_found(url),
        status => FetchError::Network(format!("{url} answered {status}")),
    }
}
