// Live measurements service - Latest readings grouped by variable, refreshed on push
use crate::application::error::{DashboardError, Notice};
use crate::application::measurement_feed::{MeasurementFeed, Subscription};
use crate::application::normalizer::normalize;
use crate::application::observatory_repository::ObservatoryRepository;
use crate::domain::measurement::GroupedVariable;
use crate::infrastructure::config::AssetUrls;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LiveState {
    Loading,
    Ready {
        variables: Vec<GroupedVariable>,
        refreshed_at: DateTime<Utc>,
    },
    Failed {
        notice: Notice,
    },
}

struct FeedListener {
    subscription: Subscription,
    worker: JoinHandle<()>,
}

pub struct LiveMeasurementsService {
    repository: Arc<dyn ObservatoryRepository>,
    assets: AssetUrls,
    token: Option<String>,
    state: watch::Sender<LiveState>,
    refresh_lock: tokio::sync::Mutex<()>,
    listener: Mutex<Option<FeedListener>>,
}

impl LiveMeasurementsService {
    pub fn new(
        repository: Arc<dyn ObservatoryRepository>,
        assets: AssetUrls,
        token: Option<String>,
    ) -> Self {
        let (state, _) = watch::channel(LiveState::Loading);
        Self {
            repository,
            assets,
            token,
            state,
            refresh_lock: tokio::sync::Mutex::new(()),
            listener: Mutex::new(None),
        }
    }

    pub fn state(&self) -> LiveState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LiveState> {
        self.state.subscribe()
    }

    /// Re-fetch the latest readings and the variable catalog, then regroup.
    pub async fn refresh(&self) -> Result<Vec<GroupedVariable>, DashboardError> {
        let _guard = self.refresh_lock.lock().await;
        let token = self.token.as_deref();

        let fetched = tokio::try_join!(
            self.repository.latest_measurements(token),
            self.repository.variables(token, true)
        );
        let (records, catalog) = match fetched {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::warn!("Failed to refresh live measurements: {}", e);
                self.state.send_replace(LiveState::Failed { notice: e.notice() });
                return Err(e);
            }
        };

        let mut variables = normalize(&records, &catalog);
        for variable in &mut variables {
            if !variable.icon.is_empty() {
                variable.icon = self.assets.variable_icon(&variable.icon);
            }
        }
        tracing::debug!(
            "Live view refreshed: {} readings in {} variables",
            records.len(),
            variables.len()
        );

        self.state.send_replace(LiveState::Ready {
            variables: variables.clone(),
            refreshed_at: Utc::now(),
        });
        Ok(variables)
    }

    /// Refresh whenever `feed` announces a new batch. Replaces any earlier feed.
    pub fn watch_feed(self: &Arc<Self>, feed: &dyn MeasurementFeed) {
        let pending = Arc::new(Notify::new());
        let signal = pending.clone();
        let subscription = feed.on_new_measurements(Box::new(move || signal.notify_one()));

        let service = Arc::downgrade(self);
        let worker = tokio::spawn(async move {
            loop {
                pending.notified().await;
                let Some(service) = service.upgrade() else {
                    break;
                };
                // Failures are already published as state.
                let _ = service.refresh().await;
            }
        });

        let previous = match self.listener.lock() {
            Ok(mut listener) => listener.replace(FeedListener { subscription, worker }),
            Err(_) => None,
        };
        if let Some(previous) = previous {
            previous.stop();
        }
    }

    /// Release the push subscription.
    pub fn shutdown(&self) {
        let listener = match self.listener.lock() {
            Ok(mut listener) => listener.take(),
            Err(_) => None,
        };
        if let Some(listener) = listener {
            tracing::debug!("Live view unsubscribed from measurement feed");
            listener.stop();
        }
    }
}

impl FeedListener {
    fn stop(self) {
        self.subscription.unsubscribe();
        self.worker.abort();
    }
}

impl Drop for LiveMeasurementsService {
    fn drop(&mut self) {
        self.shutdown();
    }
}
