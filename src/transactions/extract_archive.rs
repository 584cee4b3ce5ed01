use async_zip::{
    base::read::stream::{Ready, ZipFileReader},
    error::ZipError,
};
use futures::io::{AsyncBufRead, AsyncWriteExt as _};
use tokio_util::compat::TokioAsyncWriteCompatExt as _;

use std::path::{Path, PathBuf};

/// Extracts an archive of [`ZipFileReader<Ready<R>>`] into a directory, creating it if needed.
///
/// Entry paths are sanitized and intermediate directories are created. Files already present in
/// the directory are overwritten, so a directory left over from an earlier download is reused.
///
/// # Panics
///
/// Panics if the archive reader is [`None`], which is unreachable.
///
/// # Errors
///
/// Returns a [`ZipError`] if the archive fails to extract.
pub async fn extract_archive<R, P>(
    archive: ZipFileReader<Ready<R>>,
    path: P,
) -> Result<(), ZipError>
where
    R: AsyncBufRead + Unpin,
    P: AsRef<Path>,
{
    tokio::fs::create_dir_all(&path).await?;

    let mut a_ready = Some(archive);

    while let Some(mut a_reading) = a_ready
        .take()
        .expect("unreachable")
        .next_with_entry()
        .await?
    {
        let reader = a_reading.reader();
        let Ok(name) = reader.entry().filename().as_str() else {
            a_ready = Some(a_reading.skip().await?);
            continue;
        };
        let p = path.as_ref().join(sanitize_file_path(name));

        if name.ends_with('/') {
            // Is a directory
            if !p.exists() {
                tokio::fs::create_dir_all(&p).await?;
            }
        } else {
            // Entries may come out of order, or without directory entries at all
            if let Some(parent) = p.parent() {
                if !parent.is_dir() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }

            let mut writer = tokio::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&p)
                .await?
                .compat_write();
            futures::io::copy(a_reading.reader_mut(), &mut writer).await?;
            writer.flush().await?;
        }

        a_ready = Some(a_reading.done().await?);
    }

    Ok(())
}

/// Turns an archive entry name into a relative path that cannot escape the extraction directory.
pub fn sanitize_file_path(path: &str) -> PathBuf {
    // Replaces backwards slashes
    path.replace('\\', "/")
        .split('/')
        .filter(|component| !component.is_empty())
        .map(sanitize_filename::sanitize)
        .filter(|component| !component.is_empty())
        .collect()
}
