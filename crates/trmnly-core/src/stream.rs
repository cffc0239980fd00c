// ── Reactive snapshot streams ──
//
// Subscription type for consuming State Cache changes.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::DeviceSnapshot;

type Snapshots = Arc<Vec<Arc<DeviceSnapshot>>>;

/// A subscription to the cached device snapshots.
///
/// Provides both point-in-time access and change notification via
/// `changed()` or by converting to a `Stream`.
pub struct SnapshotStream {
    current: Snapshots,
    receiver: watch::Receiver<Snapshots>,
}

impl SnapshotStream {
    pub(crate) fn new(receiver: watch::Receiver<Snapshots>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Snapshots captured at creation (or at the last `changed()`).
    pub fn current(&self) -> &Snapshots {
        &self.current
    }

    /// Latest snapshots, which may be newer than `current()`.
    pub fn latest(&self) -> Snapshots {
        self.receiver.borrow().clone()
    }

    /// Wait for the next successful poll, returning the new snapshots.
    /// Returns `None` if the cache has been dropped.
    pub async fn changed(&mut self) -> Option<Snapshots> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> SnapshotWatchStream {
        SnapshotWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct SnapshotWatchStream {
    inner: WatchStream<Snapshots>,
}

impl Stream for SnapshotWatchStream {
    type Item = Snapshots;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
