//! Scoped session lifecycle.
//!
//! [`with_connection`] starts a [`Session`] in the background, waits for it to
//! become ready, runs the caller's work, and always closes the session again.
//! A session that dies before it is ready fails the scope immediately instead
//! of leaving the caller waiting on readiness forever. The session task is
//! aborted if the scope is dropped or the work panics.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, warn};

use crate::contract::Session;
use crate::error::{ApiError, SyncError};

pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
pub struct LifecycleOptions {
    /// How long to wait for the session task to end after `close`.
    pub close_timeout: Duration,
    /// Report a close timeout as [`SyncError::ConnectionTimeout`] instead of
    /// logging it and aborting the session task.
    pub fail_on_close_timeout: bool,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
            fail_on_close_timeout: false,
        }
    }
}

/// The background session task. Aborted when dropped.
struct SessionTask(JoinHandle<Result<(), ApiError>>);

impl Drop for SessionTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Runs `work` against a started, ready session and closes it afterwards.
///
/// Failure priority: the first failure observed is returned. A failure of
/// `work` wins over any failure while closing; the later one is logged.
pub async fn with_connection<S, F, Fut, T>(
    session: Arc<S>,
    options: LifecycleOptions,
    work: F,
) -> Result<T, SyncError>
where
    S: Session + 'static,
    F: FnOnce(Arc<S>) -> Fut,
    Fut: Future<Output = Result<T, SyncError>>,
{
    info!("Starting session");
    let mut task = {
        let session = Arc::clone(&session);
        SessionTask(tokio::spawn(async move { session.start().await }))
    };

    if let Err(startup) = await_ready(session.as_ref(), &mut task).await {
        error!(error = %startup, "Session failed before becoming ready");
        if let Err(e) = session.close().await {
            warn!(error = %e, "Closing a session that failed to start also failed");
        }
        return Err(startup);
    }
    info!("Session is ready");

    let work_session = Arc::clone(&session);
    let outcome = AssertUnwindSafe(async move { work(work_session).await })
        .catch_unwind()
        .await;
    let shutdown = shutdown(session.as_ref(), &mut task, options).await;

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(panic) => {
            if let Err(e) = shutdown {
                warn!(error = %e, "Session shutdown failed after the scoped work panicked");
            }
            std::panic::resume_unwind(panic);
        }
    };
    match (outcome, shutdown) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(later)) => {
            warn!(
                error = %later,
                "Session shutdown failed after the scoped work had already failed"
            );
            Err(e)
        }
    }
}

/// Races readiness against the session task itself.
async fn await_ready<S: Session>(session: &S, task: &mut SessionTask) -> Result<(), SyncError> {
    tokio::select! {
        biased;
        _ = session.wait_until_ready() => Ok(()),
        finished = &mut task.0 => {
            // The session may have become ready and then ended in the same poll.
            let ready = session.is_ready();
            Err(match finished {
                Ok(Err(e)) => SyncError::ConnectionStartup(e),
                Ok(Ok(())) if ready => SyncError::ConnectionStartup(
                    "session ended right after becoming ready".into(),
                ),
                Ok(Ok(())) => SyncError::ConnectionStartup(
                    "session ended before becoming ready".into(),
                ),
                Err(join) => SyncError::ConnectionStartup(join_failure(join)),
            })
        }
    }
}

/// Requests a close, then waits a bounded time for the session task to end.
async fn shutdown<S: Session>(
    session: &S,
    task: &mut SessionTask,
    options: LifecycleOptions,
) -> Result<(), SyncError> {
    info!("Closing session");
    let closed = session.close().await.map_err(SyncError::ConnectionShutdown);

    let ended = match tokio::time::timeout(options.close_timeout, &mut task.0).await {
        Ok(Ok(Ok(()))) => Ok(()),
        Ok(Ok(Err(e))) => Err(SyncError::ConnectionShutdown(e)),
        Ok(Err(join)) => Err(SyncError::ConnectionShutdown(join_failure(join))),
        Err(_) => {
            warn!(
                timeout = ?options.close_timeout,
                "Session did not shut down in time; aborting it"
            );
            task.0.abort();
            if options.fail_on_close_timeout {
                Err(SyncError::ConnectionTimeout(options.close_timeout))
            } else {
                Ok(())
            }
        }
    };

    match (closed, ended) {
        (Ok(()), ended) => ended,
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(later)) => {
            warn!(error = %later, "Session task also failed after a failed close");
            Err(e)
        }
    }
}

fn join_failure(err: JoinError) -> ApiError {
    if err.is_panic() {
        "session task panicked".into()
    } else {
        format!("session task was cancelled: {err}").into()
    }
}
