// ── Reactive machine stream ──
//
// Subscription type for consuming snapshot changes from the MachineStore.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::store::Snapshot;

/// A subscription to the machine list.
///
/// Provides both point-in-time snapshot access and change notification via
/// [`changed()`](Self::changed) or by converting into a `Stream`.
pub struct MachineStream {
    current: Snapshot,
    receiver: watch::Receiver<Snapshot>,
}

impl MachineStream {
    pub(crate) fn new(receiver: watch::Receiver<Snapshot>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot captured at creation time (or at the last `changed()`).
    pub fn current(&self) -> &Snapshot {
        &self.current
    }

    /// Whether a snapshot was published since the last `changed()`.
    pub fn has_changed(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }

    /// Wait for the next change, returning the new snapshot.
    /// Returns `None` once the store has been dropped.
    pub async fn changed(&mut self) -> Option<Snapshot> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    ///
    /// The stream yields the current snapshot first, then every change.
    pub fn into_stream(self) -> MachineWatchStream {
        MachineWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct MachineWatchStream {
    inner: WatchStream<Snapshot>,
}

impl Stream for MachineWatchStream {
    type Item = Snapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures_util::StreamExt;

    use crate::model::Machine;
    use crate::store::MachineStore;

    #[tokio::test]
    async fn stream_yields_current_then_changes() {
        let store = MachineStore::new();
        store.apply_snapshot(vec![Machine::named("a")]);

        let mut stream = store.subscribe().into_stream();
        let first = stream.next().await.unwrap();
        assert_eq!(first[0].name, "a");

        store.apply_snapshot(vec![Machine::named("b")]);
        let second = stream.next().await.unwrap();
        assert_eq!(second[0].name, "b");
    }

    #[tokio::test]
    async fn changed_ends_when_store_drops() {
        let store = MachineStore::new();
        let mut stream = store.subscribe();
        drop(store);
        assert!(stream.changed().await.is_none());
    }
}
