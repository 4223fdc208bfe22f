//! External control of a running batch loop
//!
//! SIGINT and SIGTERM request a stop; a second stop signal exits the process
//! immediately. On unix, SIGUSR1 toggles an operator pause.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Stop and pause switches shared between signal handlers and the orchestrator
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    cancel_token: CancellationToken,
    paused: Arc<AtomicBool>,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns the signal listeners; must be called inside a tokio runtime
    pub fn register_handlers(&self) {
        let control = self.clone();
        tokio::spawn(async move {
            loop {
                if let Err(e) = wait_for_stop_signal().await {
                    warn!("Could not listen for stop signals: {}", e);
                    return;
                }

                if control.is_stop_requested() {
                    warn!("Forced shutdown requested, exiting immediately");
                    std::process::exit(1);
                }

                info!("Stop signal received, will stop at the next safe point");
                control.request_stop();
            }
        });

        #[cfg(unix)]
        {
            let control = self.clone();
            tokio::spawn(async move {
                let mut usr1 = match signal::unix::signal(signal::unix::SignalKind::user_defined1())
                {
                    Ok(usr1) => usr1,
                    Err(e) => {
                        warn!("Could not install SIGUSR1 handler: {}", e);
                        return;
                    }
                };

                while usr1.recv().await.is_some() {
                    let paused = control.toggle_pause();
                    info!("Run {} via signal", if paused { "paused" } else { "resumed" });
                }
            });
        }
    }

    /// Requests that the loop stop at its next safe point
    pub fn request_stop(&self) {
        self.cancel_token.cancel();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Completes once a stop has been requested
    pub async fn stopped(&self) {
        self.cancel_token.cancelled().await
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    /// Flips the operator pause and returns the new value
    pub fn toggle_pause(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::SeqCst)
    }
}

#[cfg(unix)]
async fn wait_for_stop_signal() -> std::io::Result<()> {
    let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    tokio::select! {
        result = signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_stop_signal() -> std::io::Result<()> {
    signal::ctrl_c().await
}
