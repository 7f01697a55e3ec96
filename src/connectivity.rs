use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::info;

/// Connectivity as reported by the embedder's signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    Online,
    Offline,
}

/// Result of feeding one connectivity signal into the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    WentOnline,
    WentOffline,
}

/// Tracks the online/offline state machine and guards queue drains.
///
/// Edges are level-deduplicated: repeated `online` signals produce a single
/// `WentOnline`. The drain permit makes the drain a critical section; a
/// second online edge while a drain runs cannot start another one.
pub struct ConnectivityMonitor {
    state: watch::Sender<Connectivity>,
    draining: AtomicBool,
}

impl ConnectivityMonitor {
    pub fn new(initial: Connectivity) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            state,
            draining: AtomicBool::new(false),
        }
    }

    pub fn current(&self) -> Connectivity {
        *self.state.borrow()
    }

    pub fn is_offline(&self) -> bool {
        self.current() == Connectivity::Offline
    }

    /// Watch the connectivity state (for UI badges and tests).
    pub fn subscribe(&self) -> watch::Receiver<Connectivity> {
        self.state.subscribe()
    }

    /// Feed one signal in; reports whether an edge occurred.
    pub fn apply(&self, next: Connectivity) -> Transition {
        let previous = self.state.send_replace(next);
        match (previous, next) {
            (Connectivity::Offline, Connectivity::Online) => {
                info!("Connectivity restored; queued submissions eligible for drain");
                Transition::WentOnline
            }
            (Connectivity::Online, Connectivity::Offline) => {
                info!("Connectivity lost; subsequent submissions will queue locally");
                Transition::WentOffline
            }
            _ => Transition::Unchanged,
        }
    }

    /// Claim the drain critical section. `None` means a drain is already
    /// running and the caller must back off.
    pub fn begin_drain(&self) -> Option<DrainPermit<'_>> {
        self.draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| DrainPermit { monitor: self })
    }

    pub fn drain_in_progress(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(Connectivity::Online)
    }
}

/// Exclusive right to run one queue drain; released on drop.
pub struct DrainPermit<'a> {
    monitor: &'a ConnectivityMonitor,
}

impl Drop for DrainPermit<'_> {
    fn drop(&mut self) {
        self.monitor.draining.store(false, Ordering::SeqCst);
    }
}
