// Socket.io listener for backend measurement announcements
use crate::application::measurement_feed::{FeedCallback, FeedHub, MeasurementFeed, Subscription};
use anyhow::Context;
use futures::FutureExt;
use rust_socketio::asynchronous::ClientBuilder;
use rust_socketio::{Event, Payload};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

pub const NEW_MEASUREMENTS_EVENT: &str = "new-measurements";

/// Keeps one socket.io connection to the backend open and republishes every
/// `new-measurements` announcement into a [`FeedHub`]. Reconnects after a
/// fixed delay once the socket closes or fails to connect.
pub struct SocketMeasurementFeed {
    hub: FeedHub,
    task: JoinHandle<()>,
}

impl SocketMeasurementFeed {
    pub fn spawn(hub: FeedHub, url: String, connect_timeout: Duration, reconnect: Duration) -> Self {
        let task = tokio::spawn(run(url, connect_timeout, reconnect, hub.clone()));
        Self { hub, task }
    }
}

impl MeasurementFeed for SocketMeasurementFeed {
    fn on_new_measurements(&self, callback: FeedCallback) -> Subscription {
        self.hub.on_new_measurements(callback)
    }
}

impl Drop for SocketMeasurementFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// The announcement carries no data worth reading; listeners re-fetch.
fn announce(hub: &FeedHub, payload: &Payload) -> usize {
    if let Payload::Binary(bytes) = payload {
        tracing::debug!("Ignoring {} bytes of binary announcement payload", bytes.len());
    }
    hub.publish()
}

async fn run(url: String, connect_timeout: Duration, reconnect: Duration, hub: FeedHub) {
    loop {
        match listen(&url, connect_timeout, &hub).await {
            Ok(()) => tracing::info!("Measurement socket {} closed", url),
            Err(e) => tracing::warn!("Measurement socket {} failed: {:#}", url, e),
        }
        tokio::time::sleep(reconnect).await;
    }
}

async fn listen(url: &str, connect_timeout: Duration, hub: &FeedHub) -> anyhow::Result<()> {
    let closed = Arc::new(Notify::new());
    let on_close = closed.clone();
    let publisher = hub.clone();

    let connecting = ClientBuilder::new(url)
        .on(NEW_MEASUREMENTS_EVENT, move |payload, _| {
            let listeners = announce(&publisher, &payload);
            async move {
                tracing::debug!("New measurements announced to {} listeners", listeners);
            }
            .boxed()
        })
        .on(Event::Close, move |_, _| {
            on_close.notify_one();
            async {}.boxed()
        })
        .on(Event::Error, |payload, _| {
            async move {
                tracing::warn!("Measurement socket error: {:?}", payload);
            }
            .boxed()
        })
        .connect();

    let client = tokio::time::timeout(connect_timeout, connecting)
        .await
        .context("connect timed out")?
        .context("connect")?;
    tracing::info!("Listening for new measurements on {}", url);

    closed.notified().await;
    if let Err(e) = client.disconnect().await {
        tracing::debug!("Measurement socket disconnect: {}", e);
    }
    Ok(())
}
