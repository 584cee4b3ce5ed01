//! Cancels a fetch on Ctrl + C or when it takes too long.
//!
//! See: [`signal`], [`until_shutdown`]

use std::{future::Future, io, time::Duration};

use tokio::signal;
use tracing::{error, info, warn};

use crate::error::{FetchError, Result};

/// Resolves once the process receives Ctrl + C.
///
/// If the signal handler cannot be installed, the error is logged and this never resolves.
pub async fn signal() -> FetchError {
    interrupted_by(signal::ctrl_c()).await
}

async fn interrupted_by<F>(ctrl_c: F) -> FetchError
where
    F: Future<Output = io::Result<()>>,
{
    match ctrl_c.await {
        Ok(()) => {
            info!("received Ctrl + C, stopping…");
            FetchError::Interrupted("received Ctrl + C".into())
        }
        Err(err) => {
            error!("failed to install Ctrl + C signal handler: {err}");
            std::future::pending().await
        }
    }
}

/// Drives `task` until it completes, Ctrl + C is pressed, or `timeout` elapses.
///
/// Directories created by an interrupted task are left in place.
///
/// # Errors
///
/// Returns the error of `task`, or [`FetchError::Interrupted`] if it was cut short.
pub async fn until_shutdown<F, T>(task: F, timeout: Option<Duration>) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let deadline = async {
        match timeout {
            Some(timeout) => {
                tokio::time::sleep(timeout).await;
                warn!("timed out after {timeout:?}");
                FetchError::Interrupted(format!("timed out after {timeout:?}"))
            }
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        result = task => result,
        err = signal() => Err(err),
        err = deadline => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_before_the_deadline() {
        let result = until_shutdown(async { Ok(42) }, Some(Duration::from_secs(5))).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn times_out() {
        let task = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        };
        let result = until_shutdown(task, Some(Duration::from_millis(10))).await;
        assert!(matches!(result, Err(FetchError::Interrupted(_))));
    }

    #[tokio::test]
    async fn ctrl_c_interrupts() {
        let err = interrupted_by(async { Ok(()) }).await;
        assert!(matches!(err, FetchError::Interrupted(_)));
    }

    #[tokio::test]
    async fn broken_signal_handler_never_interrupts() {
        let waiting = interrupted_by(async { Err(io::Error::other("no signal support")) });
        assert!(
            tokio::time::timeout(Duration::from_millis(20), waiting)
                .await
                .is_err()
        );
    }
}
