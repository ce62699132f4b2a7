// Dashboard error taxonomy and user-facing notices
use crate::domain::filter::FilterError;
use crate::domain::forms::FormErrors;
use crate::domain::session::AccessError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    /// Rejected before any network call.
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Form(#[from] FormErrors),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("session expired: {0}")]
    SessionExpired(String),
    #[error("backend returned code {code}: {msg}")]
    Server { code: i64, msg: String },
    #[error("network error: {0}")]
    Network(String),
}

impl DashboardError {
    pub fn is_session_expired(&self) -> bool {
        matches!(self, DashboardError::SessionExpired(_))
    }

    pub fn notice(&self) -> Notice {
        match self {
            DashboardError::Filter(e) => Notice::warning("Invalid selection", e.to_string()),
            DashboardError::Form(e) => Notice::warning("Invalid form", e.to_string()),
            DashboardError::Access(e) => Notice::error("Access denied", e.to_string()),
            DashboardError::SessionExpired(msg) => Notice::error("Session expired", msg.clone()),
            DashboardError::Server { msg, .. } => Notice::error("Something went wrong", msg.clone()),
            DashboardError::Network(_) => {
                Notice::error("Connection error", "Could not reach the server.".to_string())
            }
        }
    }
}

impl From<reqwest::Error> for DashboardError {
    fn from(err: reqwest::Error) -> Self {
        DashboardError::Network(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// A dismissable message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub text: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, title: &str, text: String) -> Self {
        Self {
            level,
            title: title.to_string(),
            text,
        }
    }

    pub fn success(text: String) -> Self {
        Self::new(NoticeLevel::Success, "OK", text)
    }

    pub fn info(title: &str, text: String) -> Self {
        Self::new(NoticeLevel::Info, title, text)
    }

    pub fn warning(title: &str, text: String) -> Self {
        Self::new(NoticeLevel::Warning, title, text)
    }

    pub fn error(title: &str, text: String) -> Self {
        Self::new(NoticeLevel::Error, title, text)
    }
}
