//! Fallback queue poller run inside the API server.
//!
//! Live-mode submissions rely on the remote build trigger. When that
//! trigger is down the job still sits in the queue, and this poller drains
//! it on a fixed interval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use pressroom_core::Worker;

pub struct QueuePoller {
    worker: Arc<Worker>,
    interval: Duration,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl QueuePoller {
    pub fn new(worker: Arc<Worker>, interval: Duration) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            worker,
            interval,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            handle: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Spawn the polling loop.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Queue poller already running");
            return;
        }

        let worker = Arc::clone(&self.worker);
        let running = Arc::clone(&self.running);
        let interval = self.interval;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "Queue poller started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Queue poller received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        if let Err(e) = worker.drain().await {
                            warn!("Queue poller drain error: {}", e);
                        }
                    }
                }
            }
            info!("Queue poller stopped");
        });

        *self.handle.lock().await = Some(handle);
    }

    /// Signal the loop and wait for an in-progress drain to finish.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Queue poller not running");
            return;
        }

        let _ = self.shutdown_tx.send(());

        if let Some(handle) = self.handle.lock().await.take() {
            if let Err(e) = handle.await {
                warn!("Queue poller task ended abnormally: {}", e);
            }
        }
    }
}
