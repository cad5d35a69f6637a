//! Awaited-request adapter.
//!
//! The host protocol is callback-driven; this module turns it into futures
//! in one place. Every higher-level operation issues its requests through
//! [`issue`]/[`settle`] instead of re-deriving completion plumbing per call
//! site.

use cubby_core::{Done, Error, Result};
use tokio::sync::oneshot;

/// Issue a host request, returning a receiver for its single reply.
pub(crate) fn issue<T, F>(request: F) -> oneshot::Receiver<T>
where
    T: Send + 'static,
    F: FnOnce(Done<T>),
{
    let (reply, receiver) = oneshot::channel();
    request(Box::new(move |value| {
        let _ = reply.send(value);
    }));
    receiver
}

/// Issue a host request and await its reply.
///
/// A host that drops the callback without invoking it surfaces as
/// [`Error::Disconnected`].
pub(crate) async fn settle<T, F>(request: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(Done<T>),
{
    issue(request).await.map_err(|_| Error::Disconnected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_settle_resolves_with_callback_value() {
        let value = settle(|done: Done<u32>| done(7)).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_settle_fails_when_callback_is_dropped() {
        let outcome = settle(|done: Done<u32>| drop(done)).await;
        assert!(matches!(outcome, Err(Error::Disconnected)));
    }
}
