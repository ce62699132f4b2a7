// Chart panel - Per-session historical chart view
use crate::application::error::{DashboardError, Notice};
use crate::application::observatory_repository::ObservatoryRepository;
use crate::application::series_builder::build_series;
use crate::domain::chart::ChartSeries;
use crate::domain::filter::{FilterDescriptor, FilterDraft, validate};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PanelState {
    /// No filter submitted yet.
    Unconfigured,
    Loading {
        generation: u64,
    },
    Ready {
        generation: u64,
        filter: FilterDescriptor,
        series: Vec<ChartSeries>,
    },
    Empty {
        generation: u64,
        notice: Notice,
    },
    Failed {
        generation: u64,
        notice: Notice,
        session_expired: bool,
    },
    Closed,
}

/// Fetches and shapes chart data for the latest submitted filter. Each
/// submit gets a generation number and a response is applied only while its
/// generation is still the newest, so a slow earlier fetch never overwrites
/// a later one.
pub struct ChartPanel {
    repository: Arc<dyn ObservatoryRepository>,
    token: Option<String>,
    generation: Arc<AtomicU64>,
    state: Arc<watch::Sender<PanelState>>,
    inflight: Mutex<Vec<JoinHandle<()>>>,
}

impl ChartPanel {
    pub fn new(repository: Arc<dyn ObservatoryRepository>, token: Option<String>) -> Self {
        let (state, _) = watch::channel(PanelState::Unconfigured);
        Self {
            repository,
            token,
            generation: Arc::new(AtomicU64::new(0)),
            state: Arc::new(state),
            inflight: Mutex::new(Vec::new()),
        }
    }

    pub fn state(&self) -> PanelState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PanelState> {
        self.state.subscribe()
    }

    /// Open subscriptions to this panel's state.
    pub fn watchers(&self) -> usize {
        self.state.receiver_count()
    }

    /// Validate the draft and start fetching. Validation failures never reach the backend.
    pub fn submit(&self, draft: FilterDraft) -> Result<u64, DashboardError> {
        let filter = validate(draft)?;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_replace(PanelState::Loading { generation });
        tracing::debug!("Chart filter {:?} submitted as generation {}", filter, generation);

        let task = tokio::spawn(fetch(
            self.repository.clone(),
            self.token.clone(),
            filter,
            generation,
            self.generation.clone(),
            self.state.clone(),
        ));

        if let Ok(mut inflight) = self.inflight.lock() {
            inflight.retain(|handle| !handle.is_finished());
            inflight.push(task);
        }
        Ok(generation)
    }

    /// Abort pending fetches and stop accepting responses.
    pub fn close(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut inflight) = self.inflight.lock() {
            for handle in inflight.drain(..) {
                handle.abort();
            }
        }
        self.state.send_replace(PanelState::Closed);
    }
}

impl Drop for ChartPanel {
    fn drop(&mut self) {
        if let Ok(mut inflight) = self.inflight.lock() {
            for handle in inflight.drain(..) {
                handle.abort();
            }
        }
    }
}

async fn fetch(
    repository: Arc<dyn ObservatoryRepository>,
    token: Option<String>,
    filter: FilterDescriptor,
    generation: u64,
    latest: Arc<AtomicU64>,
    state: Arc<watch::Sender<PanelState>>,
) {
    let next = match repository.measurements(token.as_deref(), &filter).await {
        Ok(batch) if batch.is_empty() => PanelState::Empty {
            generation,
            notice: Notice::info("No data", "There is no data recorded for this filter.".to_string()),
        },
        Ok(batch) => PanelState::Ready {
            generation,
            series: build_series(&filter, &batch),
            filter,
        },
        Err(e) => {
            tracing::warn!("Chart fetch for generation {} failed: {}", generation, e);
            PanelState::Failed {
                generation,
                notice: e.notice(),
                session_expired: e.is_session_expired(),
            }
        }
    };

    // The check runs under the channel's write lock, which submit also takes.
    state.send_if_modified(|current| {
        if latest.load(Ordering::SeqCst) != generation {
            tracing::debug!("Discarding stale chart response for generation {}", generation);
            return false;
        }
        *current = next;
        true
    });
}
