// HTTP response mapping for dashboard errors
use crate::application::error::{DashboardError, Notice};
use crate::domain::forms::FieldError;
use crate::domain::session::AccessError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Where the browser goes when it has to sign in again.
pub const LOGIN_PAGE: &str = "/admin";

#[derive(Debug)]
pub enum ApiError {
    Dashboard(DashboardError),
    /// Request body could not be read into the expected shape.
    BadRequest(String),
}

impl From<DashboardError> for ApiError {
    fn from(err: DashboardError) -> Self {
        ApiError::Dashboard(err)
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub notice: Notice,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<&'static str>,
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

fn status_of(err: &DashboardError) -> StatusCode {
    match err {
        DashboardError::Filter(_) | DashboardError::Form(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DashboardError::Access(AccessError::NotAuthenticated) | DashboardError::SessionExpired(_) => {
            StatusCode::UNAUTHORIZED
        }
        DashboardError::Access(AccessError::MissingRole) => StatusCode::FORBIDDEN,
        DashboardError::Server { .. } => StatusCode::BAD_GATEWAY,
        DashboardError::Network(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn body_of(err: &DashboardError) -> ErrorBody {
    let fields = match err {
        DashboardError::Form(errors) => errors.fields.clone(),
        DashboardError::Filter(e) => vec![FieldError {
            field: e.field(),
            message: e.to_string(),
        }],
        _ => Vec::new(),
    };
    let redirect = match err {
        DashboardError::SessionExpired(_) | DashboardError::Access(AccessError::NotAuthenticated) => {
            Some(LOGIN_PAGE)
        }
        _ => None,
    };
    ErrorBody {
        notice: err.notice(),
        fields,
        redirect,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Dashboard(err) => {
                match &err {
                    DashboardError::Server { .. } | DashboardError::Network(_) => {
                        tracing::error!("Request failed: {}", err)
                    }
                    _ => tracing::debug!("Request rejected: {}", err),
                }
                (status_of(&err), Json(body_of(&err))).into_response()
            }
            ApiError::BadRequest(text) => {
                tracing::debug!("Malformed request: {}", text);
                let body = ErrorBody {
                    notice: Notice::warning("Invalid request", text),
                    fields: Vec::new(),
                    redirect: None,
                };
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
        }
    }
}
