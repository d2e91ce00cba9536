use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

/// Shared online/offline flag.
///
/// `is_online` is a synchronous read. `subscribe` gives an edge-triggered
/// stream that fires on every offline-to-online transition. Clones share state.
#[derive(Clone, Debug)]
pub struct Connectivity {
    tx: Arc<watch::Sender<bool>>,
}

impl Connectivity {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Record the current connectivity. Returns true if the value changed.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            info!(online, "Connectivity changed");
        }
        changed
    }

    pub fn subscribe(&self) -> BecameOnline {
        let rx = self.tx.subscribe();
        let was_online = *rx.borrow();
        BecameOnline { rx, was_online }
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Fires once per offline-to-online edge.
pub struct BecameOnline {
    rx: watch::Receiver<bool>,
    was_online: bool,
}

impl BecameOnline {
    /// Wait for the next time connectivity comes back. Returns false once
    /// every `Connectivity` handle has been dropped.
    pub async fn next(&mut self) -> bool {
        loop {
            if self.rx.changed().await.is_err() {
                return false;
            }
            let online = *self.rx.borrow_and_update();
            let edge = online && !self.was_online;
            self.was_online = online;
            if edge {
                return true;
            }
        }
    }
}
