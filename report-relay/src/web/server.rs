//! Webhook listener lifecycle.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use tracing::{debug, error, info, warn};

use super::{router, AppState};

/// How long `stop` waits for in-flight requests before abandoning them.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Owns the listening socket and the serving task.
///
/// `start` binds and begins serving; `stop` shuts down gracefully and frees
/// the socket so the server can be started again. Dropping a running server
/// signals shutdown without waiting.
pub struct WebhookServer {
    state: AppState,
    running: Option<RunningServer>,
}

struct RunningServer {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<io::Result<()>>,
}

impl WebhookServer {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            running: None,
        }
    }

    /// Address the server is listening on, if running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.addr)
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Bind the configured host and port and start serving.
    ///
    /// Calling `start` on a running server keeps the existing listener.
    pub async fn start(&mut self) -> io::Result<SocketAddr> {
        if let Some(running) = &self.running {
            warn!(address = %running.addr, "webhook_server_already_running");
            return Ok(running.addr);
        }

        let config = &self.state.config;
        let listener =
            TcpListener::bind((config.webhook_host.as_str(), config.webhook_port)).await?;
        let addr = listener.local_addr()?;

        let app = router(self.state.clone());
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    // A dropped sender also means shut down.
                    let _ = shutdown_rx.await;
                })
                .await
        });

        info!(
            address = %addr,
            path = %config.webhook_path,
            signature_verification = config.enable_signature_verification,
            "webhook_server_listening"
        );

        self.running = Some(RunningServer {
            addr,
            shutdown,
            task,
        });

        Ok(addr)
    }

    /// Stop accepting connections and release the socket.
    ///
    /// Waits up to a grace period for in-flight requests, then aborts them.
    /// Errors are logged, never returned.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            debug!("webhook_server_not_running");
            return;
        };

        let RunningServer {
            addr,
            shutdown,
            mut task,
        } = running;

        if shutdown.send(()).is_err() {
            warn!(address = %addr, "webhook_server_already_exited");
        }

        match tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await {
            Ok(Ok(Ok(()))) => info!(address = %addr, "webhook_server_stopped"),
            Ok(Ok(Err(e))) => error!(address = %addr, error = %e, "webhook_server_error"),
            Ok(Err(e)) => error!(address = %addr, error = %e, "webhook_server_task_failed"),
            Err(_) => {
                task.abort();
                warn!(
                    address = %addr,
                    grace_seconds = SHUTDOWN_GRACE.as_secs(),
                    "webhook_server_stop_timed_out"
                );
            }
        }
    }
}

impl Drop for WebhookServer {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            let _ = running.shutdown.send(());
        }
    }
}
