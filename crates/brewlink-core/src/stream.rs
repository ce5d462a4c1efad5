// ── Reactive value streams ──
//
// Subscription types for consuming adapter state changes.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// A replay-last subscription to a single evolving value.
///
/// New subscribers immediately observe the most recent value (if one has
/// been published) and are then notified of every subsequent change.
/// `None` means nothing has been published yet in this connection cycle.
pub struct ValueStream<T: Clone + Send + Sync + 'static> {
    receiver: watch::Receiver<Option<Arc<T>>>,
}

impl<T: Clone + Send + Sync + 'static> ValueStream<T> {
    pub(crate) fn new(receiver: watch::Receiver<Option<Arc<T>>>) -> Self {
        Self { receiver }
    }

    /// Get the latest published value, or `None` before the first publish.
    pub fn latest(&self) -> Option<Arc<T>> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next publish, returning the new value.
    /// Returns `None` once the publishing adapter has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<T>> {
        loop {
            self.receiver.changed().await.ok()?;
            if let Some(value) = self.receiver.borrow_and_update().clone() {
                return Some(value);
            }
        }
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    /// Resets published by a disconnect are filtered out.
    pub fn into_stream(self) -> ValueWatchStream<T> {
        ValueWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
///
/// Yields the latest `Arc<T>` each time a new value is published,
/// starting with the current value when one exists.
pub struct ValueWatchStream<T: Clone + Send + Sync + 'static> {
    inner: WatchStream<Option<Arc<T>>>,
}

impl<T: Clone + Send + Sync + 'static> Stream for ValueWatchStream<T> {
    type Item = Arc<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Some(value))) => return Poll::Ready(Some(value)),
                // Skip the pre-publish / post-disconnect None.
                Poll::Ready(Some(None)) => continue,
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn late_subscriber_sees_last_value() {
        let (tx, rx) = watch::channel(None);
        tx.send(Some(Arc::new(7_u32))).unwrap();

        let stream = ValueStream::new(rx);
        assert_eq!(stream.latest().as_deref(), Some(&7));
    }

    #[tokio::test]
    async fn changed_skips_resets() {
        let (tx, rx) = watch::channel(Some(Arc::new(1_u32)));
        let mut stream = ValueStream::new(rx);

        tx.send(None).unwrap();
        tx.send(Some(Arc::new(2))).unwrap();

        assert_eq!(stream.changed().await.as_deref(), Some(&2));
    }

    #[tokio::test]
    async fn changed_ends_when_publisher_drops() {
        let (tx, rx) = watch::channel::<Option<Arc<u32>>>(None);
        let mut stream = ValueStream::new(rx);
        drop(tx);

        assert!(stream.changed().await.is_none());
    }
}
