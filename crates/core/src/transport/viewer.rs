use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use serde::Serialize;
use tokio::sync::mpsc;

use super::TransportEvent;
use crate::{DanceError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ViewerId(pub u64);

impl fmt::Display for ViewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "viewer-{}", self.0)
    }
}

/// A connected party that receives transport notifications.
pub trait Viewer: Send + Sync {
    fn id(&self) -> ViewerId;

    /// Hands the event to the viewer. An error means the viewer is gone.
    fn deliver(&self, event: &TransportEvent) -> Result<()>;
}

/// Viewer backed by an unbounded channel; the connection task owns the
/// receiving half and forwards events to its socket.
#[derive(Debug, Clone)]
pub struct ChannelViewer {
    id: ViewerId,
    sender: mpsc::UnboundedSender<TransportEvent>,
}

impl ChannelViewer {
    pub fn pair(id: ViewerId) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { id, sender }, receiver)
    }
}

impl Viewer for ChannelViewer {
    fn id(&self) -> ViewerId {
        self.id
    }

    fn deliver(&self, event: &TransportEvent) -> Result<()> {
        self.sender
            .send(event.clone())
            .map_err(|_| DanceError::Disconnected)
    }
}

/// Outcome of one fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub pruned: Vec<ViewerId>,
}

#[derive(Default)]
pub struct ViewerRegistry {
    next_id: AtomicU64,
    viewers: Mutex<Vec<Arc<dyn Viewer>>>,
}

impl ViewerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> ViewerId {
        ViewerId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    pub fn register(&self, viewer: Arc<dyn Viewer>) -> Result<()> {
        let id = viewer.id();
        self.lock()?.push(viewer);
        tracing::info!(viewer = %id, "viewer registered");
        Ok(())
    }

    /// Returns whether the viewer was still registered.
    pub fn unregister(&self, id: ViewerId) -> Result<bool> {
        let mut viewers = self.lock()?;
        let before = viewers.len();
        viewers.retain(|viewer| viewer.id() != id);
        let removed = viewers.len() != before;
        if removed {
            tracing::debug!(viewer = %id, "viewer unregistered");
        }
        Ok(removed)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    pub fn ids(&self) -> Result<Vec<ViewerId>> {
        Ok(self.lock()?.iter().map(|viewer| viewer.id()).collect())
    }

    /// Delivers `event` to every viewer. Viewers whose delivery fails are
    /// removed; the rest still receive the event.
    pub fn broadcast(&self, event: &TransportEvent) -> Result<BroadcastReport> {
        let mut viewers = self.lock()?;
        let mut report = BroadcastReport::default();

        for viewer in viewers.iter() {
            match viewer.deliver(event) {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    tracing::warn!(viewer = %viewer.id(), event = event.kind(), %err, "dropping viewer");
                    report.pruned.push(viewer.id());
                }
            }
        }

        if !report.pruned.is_empty() {
            viewers.retain(|viewer| !report.pruned.contains(&viewer.id()));
        }

        Ok(report)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<Arc<dyn Viewer>>>> {
        self.viewers
            .lock()
            .map_err(|_| DanceError::msg("viewer registry has been poisoned"))
    }
}

impl fmt::Debug for ViewerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.viewers.lock().map(|v| v.len()).unwrap_or_default();
        f.debug_struct("ViewerRegistry")
            .field("viewers", &count)
            .finish()
    }
}
