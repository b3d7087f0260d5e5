//! Lifecycle controller (component J, §4.8): binds and tears down the
//! HTTP/2 listener, independent of whatever methods are registered.

use crate::error::ApiError;
use rpc_resilience_bulkhead::BulkheadRegistry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

pub(crate) struct Lifecycle {
    listening: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    handle: Mutex<Option<JoinHandle<()>>>,
    local_addr: Mutex<Option<std::net::SocketAddr>>,
}

impl Lifecycle {
    pub fn new(listening: Arc<AtomicBool>) -> Self {
        Self {
            listening,
            shutdown: Arc::new(Notify::new()),
            handle: Mutex::new(None),
            local_addr: Mutex::new(None),
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Acquire)
    }

    pub fn local_addr(&self) -> Option<std::net::SocketAddr> {
        *self.local_addr.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Binds the listener and resolves once it is accepting connections,
    /// or fails on bind error.
    pub async fn start(
        &self,
        host: &str,
        port: u32,
        router: axum::Router,
        install_signal_handlers: bool,
    ) -> Result<(), ApiError> {
        if self.is_listening() {
            return Ok(());
        }

        let listener = TcpListener::bind((host, port as u16))
            .await
            .map_err(|e| ApiError::Internal(format!("failed to bind {host}:{port}: {e}")))?;
        *self.local_addr.lock().unwrap_or_else(|e| e.into_inner()) = listener.local_addr().ok();
        self.listening.store(true, Ordering::Release);

        let shutdown = Arc::clone(&self.shutdown);
        let listening_flag = Arc::clone(&self.listening);
        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, router.into_make_service())
                .with_graceful_shutdown(async move { shutdown.notified().await })
                .await;
            if let Err(err) = result {
                tracing::error!(error = %err, "server task exited with an error");
            }
            listening_flag.store(false, Ordering::Release);
        });
        *self.handle.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);

        // §9: the core does not install global signal handlers unless an
        // explicit lifecycle flag requests it — tests suppress this.
        if install_signal_handlers {
            let shutdown = Arc::clone(&self.shutdown);
            tokio::spawn(async move {
                let _ = tokio::signal::ctrl_c().await;
                shutdown.notify_waiters();
            });
        }

        Ok(())
    }

    /// Idempotent: calling `stop` on a not-started endpoint succeeds
    /// silently (§4.8). Drains in-flight bulkhead permits before the
    /// force-close fallback fires at `timeout`.
    pub async fn stop(&self, timeout: Duration, bulkheads: &BulkheadRegistry) {
        let handle = self.handle.lock().unwrap_or_else(|e| e.into_inner()).take();
        let Some(handle) = handle else {
            return;
        };

        self.shutdown.notify_waiters();

        let drain = async {
            while bulkheads.snapshots().iter().any(|(_, active, _, _)| *active > 0) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        let _ = tokio::time::timeout(timeout, drain).await;

        if tokio::time::timeout(timeout, handle).await.is_err() {
            tracing::warn!("graceful shutdown did not complete in time; forcing close");
        }
        self.listening.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stop_on_unstarted_endpoint_is_a_silent_no_op() {
        let lifecycle = Lifecycle::new(Arc::new(AtomicBool::new(false)));
        lifecycle.stop(Duration::from_millis(50), &BulkheadRegistry::new()).await;
        assert!(!lifecycle.is_listening());
    }

    #[tokio::test]
    async fn start_then_stop_round_trips_listening_flag() {
        let lifecycle = Lifecycle::new(Arc::new(AtomicBool::new(false)));
        let router = axum::Router::new();
        lifecycle.start("127.0.0.1", 0, router, false).await.unwrap();
        assert!(lifecycle.is_listening());
        lifecycle.stop(Duration::from_millis(500), &BulkheadRegistry::new()).await;
        assert!(!lifecycle.is_listening());
    }
}
