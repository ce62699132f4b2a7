// Application state for HTTP handlers
use crate::application::admin_service::AdminService;
use crate::application::error::DashboardError;
use crate::application::live_service::LiveMeasurementsService;
use crate::application::map_service::StationMapService;
use crate::application::session_service::{SessionStore, ViewContext};
use crate::domain::session::{AccessError, Session};
use crate::presentation::http_response::ApiError;
use axum::http::{HeaderMap, header};
use std::sync::Arc;

pub struct AppState {
    pub sessions: SessionStore,
    pub admin: AdminService,
    pub maps: StationMapService,
    pub live: Arc<LiveMeasurementsService>,
    /// Token for anonymous reads of the public views.
    pub service_token: Option<String>,
}

/// Session token or viewer id from `Authorization: Bearer <key>`.
pub fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AppState {
    pub async fn session(&self, key: Option<&str>) -> Option<Session> {
        match key {
            Some(key) => self.sessions.session(key).await,
            None => None,
        }
    }

    pub async fn view(&self, key: Option<&str>) -> Result<Arc<ViewContext>, ApiError> {
        let Some(key) = key else {
            return Err(DashboardError::from(AccessError::NotAuthenticated).into());
        };
        self.sessions
            .resolve(key)
            .await
            .ok_or_else(|| DashboardError::from(AccessError::NotAuthenticated).into())
    }

    /// Token for public reads: the caller's own session when signed in.
    pub async fn read_token(&self, key: Option<&str>) -> Option<String> {
        match self.session(key).await {
            Some(session) => Some(session.token),
            None => self.service_token.clone(),
        }
    }

    /// Map a service result to a response, clearing the session the backend
    /// reported as expired.
    pub async fn settle<T>(&self, key: Option<&str>, result: Result<T, DashboardError>) -> Result<T, ApiError> {
        if let (Err(err), Some(key)) = (&result, key) {
            if err.is_session_expired() {
                self.sessions.expire(key).await;
            }
        }
        result.map_err(ApiError::from)
    }
}
