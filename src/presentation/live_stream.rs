// Server-sent event relay of watched view state
use async_stream::stream;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use serde::Serialize;
use std::convert::Infallible;
use tokio::sync::watch;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::WatchStream;

/// Emit the current state immediately, then every change, as `event` frames.
pub fn state_events<T>(
    event: &'static str,
    receiver: watch::Receiver<T>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    T: Serialize + Clone + Send + Sync + 'static,
{
    let events = stream! {
        let mut states = WatchStream::new(receiver);
        while let Some(state) = states.next().await {
            match Event::default().event(event).json_data(&state) {
                Ok(frame) => yield Ok(frame),
                Err(e) => tracing::warn!("Dropping unserializable {} frame: {}", event, e),
            }
        }
    };
    Sse::new(events).keep_alive(KeepAlive::default())
}
