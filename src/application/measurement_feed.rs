// Measurement feed - "new measurements available" notifications
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

pub type FeedCallback = Box<dyn Fn() + Send + Sync + 'static>;

/// Source of "a new measurement batch is available" events. The event carries
/// no payload; listeners re-fetch whatever they display.
pub trait MeasurementFeed: Send + Sync {
    fn on_new_measurements(&self, callback: FeedCallback) -> Subscription;
}

/// Handle to a registered callback. Unsubscribes when dropped.
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Fans one event source out to every subscriber.
#[derive(Clone)]
pub struct FeedHub {
    sender: broadcast::Sender<()>,
}

impl FeedHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Announce a new batch. Returns how many subscribers were listening.
    pub fn publish(&self) -> usize {
        self.sender.send(()).unwrap_or(0)
    }

    pub fn receiver(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }
}

impl Default for FeedHub {
    fn default() -> Self {
        Self::new(16)
    }
}

impl MeasurementFeed for FeedHub {
    fn on_new_measurements(&self, callback: FeedCallback) -> Subscription {
        let mut rx = self.sender.subscribe();
        let listener = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(()) => callback(),
                    Err(RecvError::Lagged(missed)) => {
                        // Events carry no data, so missed ones collapse into one.
                        tracing::debug!("Measurement listener lagged by {} events", missed);
                        callback();
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        Subscription::new(move || listener.abort())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counter() -> (Arc<AtomicUsize>, FeedCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        (count, Box::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        }))
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_callback_runs_per_event() {
        let hub = FeedHub::default();
        let (count, callback) = counter();
        let _subscription = hub.on_new_measurements(callback);
        settle().await;

        hub.publish();
        settle().await;
        hub.publish();
        settle().await;

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_callbacks() {
        let hub = FeedHub::default();
        let (count, callback) = counter();
        let subscription = hub.on_new_measurements(callback);
        settle().await;

        hub.publish();
        settle().await;
        subscription.unsubscribe();
        settle().await;
        hub.publish();
        settle().await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let hub = FeedHub::default();
        let (count, callback) = counter();
        drop(hub.on_new_measurements(callback));
        settle().await;

        assert_eq!(hub.publish(), 0);
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_manual_subscription_cancels_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let subscription = Subscription::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        subscription.unsubscribe();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
