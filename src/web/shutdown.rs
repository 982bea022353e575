//! Forced closure of requests that outlive a stop's grace period.

use std::io;

use futures::stream::{self, Stream, StreamExt};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Per-run signal that in-flight requests must end now.
///
/// Each server run gets a fresh token via [`ForceClose::rearm`]. Handlers
/// take the current token when a request starts.
#[derive(Debug)]
pub struct ForceClose {
    current: watch::Sender<CancellationToken>,
}

impl ForceClose {
    /// Create a signal with an unfired token.
    pub fn new() -> Self {
        Self {
            current: watch::channel(CancellationToken::new()).0,
        }
    }

    /// Token for the current run.
    pub fn token(&self) -> CancellationToken {
        self.current.borrow().clone()
    }

    /// Install and return a fresh token for a new run.
    pub(crate) fn rearm(&self) -> CancellationToken {
        let token = CancellationToken::new();
        self.current.send_replace(token.clone());
        token
    }
}

impl Default for ForceClose {
    fn default() -> Self {
        Self::new()
    }
}

/// Pass `inner` through until `force` fires, then fail the stream.
///
/// A body stream that errors makes hyper drop the connection instead of
/// ending the response cleanly.
pub(crate) fn until_forced<S, T>(
    inner: S,
    force: CancellationToken,
) -> impl Stream<Item = io::Result<T>> + Send + 'static
where
    S: Stream<Item = io::Result<T>> + Send + Unpin + 'static,
    T: Send + 'static,
{
    stream::unfold(Some((inner, force)), |state| async move {
        let (mut inner, force) = state?;
        tokio::select! {
            biased;
            _ = force.cancelled() => Some((
                Err(io::Error::new(io::ErrorKind::ConnectionAborted, "file server stopped")),
                None,
            )),
            item = inner.next() => item.map(|item| (item, Some((inner, force)))),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_until_forced_passes_items_through() {
        let items = stream::iter(vec![Ok::<_, io::Error>(1), Ok(2)]);
        let collected: Vec<_> = until_forced(items, CancellationToken::new())
            .map(|item| item.unwrap())
            .collect()
            .await;
        assert_eq!(collected, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_until_forced_fails_pending_stream() {
        let force = CancellationToken::new();
        let mut cut = Box::pin(until_forced(
            stream::pending::<io::Result<u8>>(),
            force.clone(),
        ));

        force.cancel();
        let err = cut.next().await.unwrap().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionAborted);
        assert!(cut.next().await.is_none());
    }

    #[test]
    fn test_rearm_replaces_fired_token() {
        let force = ForceClose::new();
        force.token().cancel();
        assert!(force.token().is_cancelled());

        let fresh = force.rearm();
        assert!(!fresh.is_cancelled());
        assert!(!force.token().is_cancelled());
    }
}
