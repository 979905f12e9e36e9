//! Process supervision
//!
//! Runs the refresh engine in the background and the query service in the
//! foreground. Either one failing cancels the other; a shutdown signal
//! cancels both and waits for them to finish.

use std::sync::Arc;
use std::time::Duration;

use geoping_core::{EngineEvent, Error, GeopingConfig, Prober, RefreshEngine, SnapshotHandle, SnapshotStore};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How long to wait for both tasks once shutdown has begun
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Why the supervisor stopped
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    /// Nothing was served: bad configuration, unreadable inventory, bind failure
    #[error("startup failed: {0}")]
    Startup(Error),
    /// A running task failed
    #[error("runtime failure: {0}")]
    Runtime(Error),
}

/// Run the engine and the query service until `shutdown` or a failure
pub async fn run(
    config: GeopingConfig,
    prober: Arc<dyn Prober>,
    store: Arc<dyn SnapshotStore>,
    shutdown: CancellationToken,
) -> Result<(), SupervisorError> {
    let handle = SnapshotHandle::new();

    let (engine, events) =
        RefreshEngine::new(prober, store, handle.clone(), &config).map_err(SupervisorError::Startup)?;

    // The inventory must be readable before anything is served
    engine.prime().await.map_err(SupervisorError::Startup)?;

    let (listener, router) = geoping_api::prepare(&config.query, handle)
        .await
        .map_err(SupervisorError::Startup)?;
    info!(
        "Serving {} on {}",
        config.query.endpoint, config.query.listen_addr
    );

    let tasks = shutdown.child_token();
    tokio::spawn(log_events(events));

    let mut engine_task: JoinHandle<geoping_core::Result<()>> = {
        let token = tasks.clone();
        tokio::spawn(async move { engine.run(token).await })
    };
    let mut server_task: JoinHandle<geoping_core::Result<()>> =
        tokio::spawn(geoping_api::serve(listener, router, tasks.clone()));

    let failure = tokio::select! {
        _ = shutdown.cancelled() => None,
        joined = &mut engine_task => {
            Some(task_failure("refresh engine", joined))
        }
        joined = &mut server_task => {
            Some(task_failure("query service", joined))
        }
    };

    tasks.cancel();

    match failure {
        None => {
            info!("Shutting down");
            let finished = tokio::time::timeout(SHUTDOWN_GRACE, async {
                let engine = engine_task.await;
                let server = server_task.await;
                (engine, server)
            })
            .await;

            match finished {
                Ok((engine, server)) => {
                    if let Err(e) = flatten(engine) {
                        warn!("Refresh engine reported an error while stopping: {}", e);
                    }
                    if let Err(e) = flatten(server) {
                        warn!("Query service reported an error while stopping: {}", e);
                    }
                    Ok(())
                }
                Err(_) => Err(SupervisorError::Runtime(Error::Other(format!(
                    "Shutdown timeout after {:?}",
                    SHUTDOWN_GRACE
                )))),
            }
        }
        Some(e) => {
            error!("{}", e);
            // Give the survivor a chance to stop cleanly
            let _ = tokio::time::timeout(SHUTDOWN_GRACE, async {
                if !engine_task.is_finished() {
                    let _ = (&mut engine_task).await;
                }
                if !server_task.is_finished() {
                    let _ = (&mut server_task).await;
                }
            })
            .await;
            Err(SupervisorError::Runtime(e))
        }
    }
}

/// Error for a task that ended before shutdown was requested
fn task_failure(
    name: &str,
    joined: Result<geoping_core::Result<()>, tokio::task::JoinError>,
) -> Error {
    match flatten(joined) {
        Err(e) => Error::Other(format!("{} failed: {}", name, e)),
        Ok(()) => Error::Other(format!("{} exited unexpectedly", name)),
    }
}

fn flatten(joined: Result<geoping_core::Result<()>, tokio::task::JoinError>) -> geoping_core::Result<()> {
    joined.map_err(|e| Error::Other(format!("task panicked: {}", e)))?
}

async fn log_events(mut events: mpsc::Receiver<EngineEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            EngineEvent::CycleSkipped {
                cycle,
                consecutive_failures,
                ..
            } => debug!("Cycle {} skipped ({} in a row)", cycle, consecutive_failures),
            other => debug!("Engine event: {:?}", other),
        }
    }
}
