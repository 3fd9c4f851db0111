pub mod hashtag;
pub mod muteable;
pub mod user;

use std::future::Future;
use std::pin::Pin;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Approximates the upstream source's unbuffered subscriber channel —
/// tokio has no true zero-capacity `mpsc`, so a capacity-1 channel stands
/// in for it.
pub(crate) const SUBSCRIBER_CHANNEL_CAPACITY: usize = 1;

/// A one-shot handle returned alongside a subscriber's receiver. Calling
/// it removes the subscriber from its bus; for a hashtag subscription it
/// additionally tears down the per-hashtag bus once its last subscriber
/// leaves.
pub struct Unsubscribe {
    inner: Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>,
}

impl Unsubscribe {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self { inner: Box::new(move || Box::pin(f())) }
    }

    pub async fn call(self) {
        (self.inner)().await
    }
}
