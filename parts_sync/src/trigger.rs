//! Single-slot scrape trigger between the control surface and the worker
//!
//! At most one request is ever pending. Asking again while one is queued is a
//! no-op, so repeated clicks never stack up batch runs.

use tokio::sync::mpsc::{self, error::TrySendError};

/// Create a connected trigger/receiver pair
pub fn scrape_signal() -> (ScrapeTrigger, ScrapeRequests) {
    let (tx, rx) = mpsc::channel(1);
    (ScrapeTrigger { tx }, ScrapeRequests { rx })
}

/// Sending half, cloned into every request handler
#[derive(Debug, Clone)]
pub struct ScrapeTrigger {
    tx: mpsc::Sender<()>,
}

impl ScrapeTrigger {
    /// Queue a scrape; returns false when one is already pending
    pub fn request(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => {
                log::info!("Scrape requested");
                true
            }
            Err(TrySendError::Full(())) => {
                log::info!("Scrape already pending");
                false
            }
            Err(TrySendError::Closed(())) => {
                log::warn!("Scrape worker is not running");
                false
            }
        }
    }
}

/// Receiving half, owned by the worker thread
#[derive(Debug)]
pub struct ScrapeRequests {
    rx: mpsc::Receiver<()>,
}

impl ScrapeRequests {
    /// Block until a scrape is requested.
    ///
    /// Returns false once every trigger has been dropped. Must not be called
    /// from inside the async runtime.
    pub fn wait(&mut self) -> bool {
        self.rx.blocking_recv().is_some()
    }

    /// Take a pending request without blocking
    pub fn try_take(&mut self) -> bool {
        self.rx.try_recv().is_ok()
    }
}
