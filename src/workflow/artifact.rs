//! Artifacts from GitHub REST API and related functions.

#![cfg(feature = "rest")]

use std::fmt::Display;

use reqwest::{Client, RequestBuilder, header};
use serde::Deserialize;

/// The user agent sent with every GitHub REST API request.
pub const USER_AGENT: &str = concat!("run-fetcher/", env!("CARGO_PKG_VERSION"));

/// Represents artifacts from GitHub REST API.
#[derive(Debug, Deserialize, Clone)]
pub struct Artifacts {
    /// The number of artifacts of the run.
    pub total_count: u64,
    /// The artifacts.
    pub artifacts: Vec<Artifact>,
}

/// Represents an artifact from GitHub REST API.
#[derive(Debug, Deserialize, Clone)]
pub struct Artifact {
    /// The artifact id.
    pub id: u64,
    /// The artifact name.
    pub name: String,
    /// The size of the zip archive.
    pub size_in_bytes: u64,
    /// The API URL of the artifact.
    pub url: String,
    /// The URL to download the zip archive from.
    pub archive_download_url: String,
    /// Whether the artifact has expired and can no longer be downloaded.
    pub expired: bool,
    /// The `sha256:`-prefixed digest of the archive, if GitHub computed one.
    #[serde(default)]
    pub digest: Option<String>,
}

impl Artifact {
    /// The hex-encoded SHA-256 of the archive, without its `sha256:` prefix.
    pub fn sha256(&self) -> Option<&str> {
        self.digest
            .as_deref()
            .and_then(|digest| digest.strip_prefix("sha256:"))
    }
}

impl Display for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} at {})",
            self.name, self.id, self.archive_download_url
        )
    }
}

/// Builds a request for GitHub REST API.
pub fn github_api_request_builder(client: &Client, url: &str, token: &str) -> RequestBuilder {
    client
        .get(url)
        .header(header::ACCEPT, "application/vnd.github+json")
        .bearer_auth(token)
        .header("X-GitHub-Api-Version", "2022-11-28")
        .header(header::USER_AGENT, USER_AGENT)
}
