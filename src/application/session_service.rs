// Session store - Explicit per-client view state
use crate::application::chart_panel::{ChartPanel, PanelState};
use crate::application::error::DashboardError;
use crate::application::observatory_repository::ObservatoryRepository;
use crate::domain::forms::Credentials;
use crate::domain::session::Session;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

type Contexts = Arc<RwLock<HashMap<String, Arc<ViewContext>>>>;

/// State owned by one client: the signed-in session, if any, and its chart panel.
pub struct ViewContext {
    pub session: Option<Session>,
    pub charts: ChartPanel,
    last_seen: Mutex<Instant>,
}

impl ViewContext {
    fn new(session: Option<Session>, charts: ChartPanel) -> Self {
        Self {
            session,
            charts,
            last_seen: Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) {
        if let Ok(mut last_seen) = self.last_seen.lock() {
            *last_seen = Instant::now();
        }
    }

    fn idle_for(&self) -> Duration {
        self.last_seen
            .lock()
            .map(|last_seen| last_seen.elapsed())
            .unwrap_or_default()
    }

    /// Anonymous, not following the chart stream, and untouched for `max_idle`.
    fn is_abandoned(&self, max_idle: Duration) -> bool {
        self.session.is_none() && self.charts.watchers() == 0 && self.idle_for() >= max_idle
    }
}

/// Keyed by session token for signed-in staff, or by a viewer id for public visitors.
pub struct SessionStore {
    repository: Arc<dyn ObservatoryRepository>,
    service_token: Option<String>,
    contexts: Contexts,
    viewers: AtomicU64,
}

impl SessionStore {
    pub fn new(repository: Arc<dyn ObservatoryRepository>, service_token: Option<String>) -> Self {
        Self {
            repository,
            service_token,
            contexts: Arc::new(RwLock::new(HashMap::new())),
            viewers: AtomicU64::new(0),
        }
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<Session, DashboardError> {
        credentials.validate()?;
        let session = self.repository.login(credentials).await?;

        let context = ViewContext::new(
            Some(session.clone()),
            ChartPanel::new(self.repository.clone(), Some(session.token.clone())),
        );
        let panel_state = context.charts.subscribe();
        self.contexts
            .write()
            .await
            .insert(session.token.clone(), Arc::new(context));
        tokio::spawn(expire_on_rejection(
            self.contexts.clone(),
            session.token.clone(),
            panel_state,
        ));
        tracing::info!("{} signed in", session.email);
        Ok(session)
    }

    /// Register an anonymous visitor of the public views.
    pub async fn open_viewer(&self) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let id = format!(
            "viewer-{:x}-{:x}",
            nanos,
            self.viewers.fetch_add(1, Ordering::Relaxed)
        );
        let context = ViewContext::new(
            None,
            ChartPanel::new(self.repository.clone(), self.service_token.clone()),
        );
        self.contexts.write().await.insert(id.clone(), Arc::new(context));
        id
    }

    pub async fn resolve(&self, key: &str) -> Option<Arc<ViewContext>> {
        let context = self.contexts.read().await.get(key).cloned();
        if let Some(context) = &context {
            context.touch();
        }
        context
    }

    pub async fn session(&self, key: &str) -> Option<Session> {
        self.resolve(key).await.and_then(|context| context.session.clone())
    }

    /// Logout or viewer teardown. Pending chart fetches are dropped.
    pub async fn close(&self, key: &str) -> bool {
        remove(&self.contexts, key).await
    }

    /// Forget a session the backend reported as expired.
    pub async fn expire(&self, key: &str) {
        if self.close(key).await {
            tracing::warn!("Session expired and was cleared");
        }
    }

    /// Close every anonymous viewer idle for at least `max_idle`.
    pub async fn sweep_idle_viewers(&self, max_idle: Duration) -> usize {
        sweep(&self.contexts, max_idle).await
    }

    /// Sweep abandoned viewers every `every` until the handle is aborted.
    pub fn start_sweeper(&self, every: Duration, max_idle: Duration) -> JoinHandle<()> {
        let contexts = self.contexts.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                sweep(&contexts, max_idle).await;
            }
        })
    }

    pub async fn count(&self) -> usize {
        self.contexts.read().await.len()
    }
}

async fn remove(contexts: &Contexts, key: &str) -> bool {
    let removed = contexts.write().await.remove(key);
    match removed {
        Some(context) => {
            context.charts.close();
            true
        }
        None => false,
    }
}

async fn sweep(contexts: &Contexts, max_idle: Duration) -> usize {
    let mut contexts = contexts.write().await;
    let abandoned: Vec<String> = contexts
        .iter()
        .filter(|(_, context)| context.is_abandoned(max_idle))
        .map(|(key, _)| key.clone())
        .collect();

    for key in &abandoned {
        if let Some(context) = contexts.remove(key) {
            context.charts.close();
        }
    }
    if !abandoned.is_empty() {
        tracing::debug!("Closed {} idle viewers, {} contexts remain", abandoned.len(), contexts.len());
    }
    abandoned.len()
}

/// Clear a signed-in context as soon as one of its chart fetches reports an
/// expired token, whether or not the client is polling.
async fn expire_on_rejection(contexts: Contexts, key: String, mut panel: watch::Receiver<PanelState>) {
    let rejected = panel
        .wait_for(|state| {
            matches!(
                state,
                PanelState::Failed { session_expired: true, .. } | PanelState::Closed
            )
        })
        .await
        .map(|state| matches!(*state, PanelState::Failed { .. }))
        .unwrap_or(false);
    drop(panel);

    if rejected && remove(&contexts, &key).await {
        tracing::warn!("Session expired during a chart fetch and was cleared");
    }
}
