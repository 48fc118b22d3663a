// ── Reactive graph streams ──
//
// Subscription type for consuming home graph publications from the store.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::store::HomeGraph;

/// A subscription to the home graph.
///
/// Provides both point-in-time access and change notification via
/// [`changed()`](Self::changed) or by converting into a `Stream`.
pub struct GraphStream {
    current: Arc<HomeGraph>,
    receiver: watch::Receiver<Arc<HomeGraph>>,
}

impl GraphStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<HomeGraph>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The graph captured at creation time (or at the last `changed()`).
    pub fn current(&self) -> &Arc<HomeGraph> {
        &self.current
    }

    /// The latest published graph.
    pub fn latest(&self) -> Arc<HomeGraph> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next publication.
    /// Returns `None` if the store has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<HomeGraph>> {
        self.receiver.changed().await.ok()?;
        let graph = self.receiver.borrow_and_update().clone();
        self.current = Arc::clone(&graph);
        Some(graph)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> GraphWatchStream {
        GraphWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter yielding each published graph.
pub struct GraphWatchStream {
    inner: WatchStream<Arc<HomeGraph>>,
}

impl Stream for GraphWatchStream {
    type Item = Arc<HomeGraph>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio_test::{assert_pending, assert_ready, task};

    use crate::store::HomeStore;

    #[test]
    fn changed_waits_for_a_publication() {
        let store = HomeStore::new();
        let mut graphs = store.subscribe();
        let before = graphs.latest();

        let mut changed = task::spawn(graphs.changed());
        assert_pending!(changed.poll());

        store.modify(|_| ());
        assert!(changed.is_woken());
        let next = assert_ready!(changed.poll()).unwrap();
        drop(changed);

        assert!(!std::sync::Arc::ptr_eq(&before, &next));
        assert!(std::sync::Arc::ptr_eq(graphs.current(), &next));
    }

    #[test]
    fn stream_yields_current_graph_first() {
        let store = HomeStore::new();
        let mut stream = task::spawn(store.subscribe().into_stream());
        let first = assert_ready!(stream.poll_next());
        assert!(first.is_some());
        assert_pending!(stream.poll_next());
    }
}
