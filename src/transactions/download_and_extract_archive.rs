use std::path::Path;

use crate::{
    error::{FetchError, Result},
    transactions::extract_archive,
};

use async_zip::base::read::stream::ZipFileReader;
use futures::{AsyncReadExt as _, Stream, TryStreamExt as _};
use sha2::Digest as _;
use tokio_util::bytes::Bytes;
use tracing::{info, warn};

enum Case {
    Extracted,
    Failed(String),
    HashUnmatch { expected: String, actual: String },
}

/// Extracts a downloading archive of run `run` into `path`, checking it against `sha256` on the way.
///
/// The directory is left in place whatever the outcome.
///
/// See: [`extract_archive`]
///
/// # Errors
///
/// Returns [`FetchError::CorruptArtifact`] if the archive fails to extract or its digest does not match.
pub async fn download_and_extract_archive<S, P>(
    run: u64,
    stream: S,
    sha256: Option<&str>,
    path: P,
) -> Result<()>
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    info!("extracting artifact of run {run} to {}…", path.display());

    match extract(stream, sha256, path).await {
        Case::Extracted => {
            info!("extracted artifact of run {run} to {}", path.display());
            Ok(())
        }
        Case::HashUnmatch { expected, actual } => Err(FetchError::CorruptArtifact {
            run,
            message: format!("digest mismatch, expected sha256:{expected}, got sha256:{actual}"),
        }),
        Case::Failed(message) => Err(FetchError::CorruptArtifact { run, message }),
    }
}

async fn extract<S>(stream: S, sha256: Option<&str>, path: &Path) -> Case
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin,
{
    let mut sha_hasher = sha2::Sha256::new();

    let extracted = {
        let mut read = stream
            .map_ok(|bytes| {
                sha_hasher.update(&bytes);
                bytes
            })
            .map_err(std::io::Error::other)
            .into_async_read();

        let extracted = extract_archive(ZipFileReader::new(&mut read), path).await;
        if extracted.is_ok() {
            // Reads to end for consuming whole buf to hasher, neglecting the error
            drop(read.read_to_end(&mut Vec::new()).await);
        }
        extracted
    };

    match extracted {
        Ok(()) => match sha256 {
            Some(expected) => {
                let actual = hex::encode(sha_hasher.finalize());
                if actual.eq_ignore_ascii_case(expected) {
                    Case::Extracted
                } else {
                    Case::HashUnmatch {
                        expected: expected.to_owned(),
                        actual,
                    }
                }
            }
            None => {
                warn!("digest not provided for {}", path.display());
                Case::Extracted
            }
        },
        Err(err) => Case::Failed(err.to_string()),
    }
}
