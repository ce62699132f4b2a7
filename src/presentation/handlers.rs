// HTTP request handlers
use crate::application::admin_service::ListQuery;
use crate::application::chart_panel::PanelState;
use crate::application::error::{DashboardError, Notice};
use crate::application::live_service::LiveState;
use crate::application::map_service::{StationMap, WatershedCard};
use crate::domain::filter::FilterDraft;
use crate::domain::forms::{
    AdministratorForm, Credentials, FormMode, MicrocuencaForm, PasswordChange, StationForm,
    VariableForm,
};
use crate::domain::listing::Page;
use crate::domain::measurement::VariableDefinition;
use crate::domain::network::{AccountStatus, Administrator, Microcuenca, Station, StationStatus};
use crate::domain::session::{AccessError, Session};
use crate::presentation::app_state::{AppState, bearer};
use crate::presentation::form_upload::UploadedForm;
use crate::presentation::http_response::{ApiError, ApiResult};
use crate::presentation::live_stream::state_events;
use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Who is calling: the bearer key and the session it resolves to, if any.
struct Caller {
    key: Option<String>,
    session: Option<Session>,
}

impl Caller {
    async fn of(state: &AppState, headers: &HeaderMap) -> Self {
        let key = bearer(headers);
        let session = state.session(key.as_deref()).await;
        Self { key, session }
    }

    fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub session: Session,
}

#[derive(Serialize)]
pub struct ViewerResponse {
    pub viewer: String,
}

#[derive(Serialize)]
pub struct SubmitResponse {
    pub generation: u64,
}

#[derive(Deserialize)]
pub struct StationStatusFilter {
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct StationStatusBody {
    pub status: String,
}

/// Without a status the account's current one is flipped.
#[derive(Deserialize)]
pub struct AccountStatusBody {
    #[serde(default)]
    pub status: Option<AccountStatus>,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

// Session

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(credentials): Json<Credentials>,
) -> ApiResult<LoginResponse> {
    let session = state.sessions.login(&credentials).await?;
    Ok(Json(LoginResponse {
        token: session.token.clone(),
        session,
    }))
}

pub async fn current_session(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Session> {
    let caller = Caller::of(&state, &headers).await;
    caller
        .session
        .map(Json)
        .ok_or_else(|| DashboardError::from(AccessError::NotAuthenticated).into())
}

pub async fn logout(headers: HeaderMap, State(state): State<Arc<AppState>>) -> StatusCode {
    if let Some(key) = bearer(&headers) {
        if state.sessions.close(&key).await {
            tracing::info!("Session closed");
        }
    }
    StatusCode::NO_CONTENT
}

/// Anonymous visitors of the public views get their own chart panel.
pub async fn open_viewer(State(state): State<Arc<AppState>>) -> Json<ViewerResponse> {
    Json(ViewerResponse {
        viewer: state.sessions.open_viewer().await,
    })
}

// Live readings

pub async fn live(State(state): State<Arc<AppState>>) -> Json<LiveState> {
    Json(state.live.state())
}

pub async fn live_stream(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state_events("live", state.live.subscribe())
}

// Charts

pub async fn submit_filter(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(draft): Json<FilterDraft>,
) -> ApiResult<SubmitResponse> {
    let key = bearer(&headers);
    let view = state.view(key.as_deref()).await?;
    let generation = view.charts.submit(draft)?;
    Ok(Json(SubmitResponse { generation }))
}

pub async fn charts(headers: HeaderMap, State(state): State<Arc<AppState>>) -> ApiResult<PanelState> {
    let key = bearer(&headers);
    let view = state.view(key.as_deref()).await?;
    match view.charts.state() {
        PanelState::Failed {
            notice,
            session_expired: true,
            ..
        } if view.session.is_some() => {
            let expired: Result<Json<PanelState>, _> =
                Err(DashboardError::SessionExpired(notice.text));
            state.settle(key.as_deref(), expired).await
        }
        panel => Ok(Json(panel)),
    }
}

pub async fn chart_stream(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let key = bearer(&headers);
    let view = state.view(key.as_deref()).await?;
    Ok(state_events("charts", view.charts.subscribe()))
}

// Public map

pub async fn operative_stations(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<Station>> {
    let key = bearer(&headers);
    let token = state.read_token(key.as_deref()).await;
    let result = state.maps.operative_stations(token.as_deref()).await;
    state.settle(key.as_deref(), result).await.map(Json)
}

pub async fn watersheds(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<WatershedCard>> {
    let key = bearer(&headers);
    let token = state.read_token(key.as_deref()).await;
    let result = state.maps.watersheds(token.as_deref()).await;
    state.settle(key.as_deref(), result).await.map(Json)
}

pub async fn station_map(
    Path(microcuenca_id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> ApiResult<StationMap> {
    let key = bearer(&headers);
    let token = state.read_token(key.as_deref()).await;
    let result = state.maps.station_map(token.as_deref(), &microcuenca_id).await;
    state.settle(key.as_deref(), result).await.map(Json)
}

// Watersheds

pub async fn list_microcuencas(
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Page<Microcuenca>> {
    let caller = Caller::of(&state, &headers).await;
    let result = state.admin.microcuencas(caller.session(), &query).await;
    state.settle(caller.key(), result).await.map(Json)
}

pub async fn get_microcuenca(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Microcuenca> {
    let caller = Caller::of(&state, &headers).await;
    let result = state.admin.microcuenca(caller.session(), &id).await;
    state.settle(caller.key(), result).await.map(Json)
}

pub async fn toggle_microcuenca(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Notice> {
    let caller = Caller::of(&state, &headers).await;
    let result = state.admin.toggle_microcuenca(caller.session(), &id).await;
    state.settle(caller.key(), result).await.map(Json)
}

pub async fn create_microcuenca(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<Notice> {
    let (form, photo) = UploadedForm::read(multipart).await?.parse::<MicrocuencaForm>()?;
    let caller = Caller::of(&state, &headers).await;
    let result = state
        .admin
        .save_microcuenca(caller.session(), FormMode::Create, form, photo)
        .await;
    state.settle(caller.key(), result).await.map(Json)
}

pub async fn update_microcuenca(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<Notice> {
    let (form, photo) = UploadedForm::read(multipart)
        .await?
        .with_id(&id)
        .parse::<MicrocuencaForm>()?;
    let caller = Caller::of(&state, &headers).await;
    let result = state
        .admin
        .save_microcuenca(caller.session(), FormMode::Edit, form, photo)
        .await;
    state.settle(caller.key(), result).await.map(Json)
}

// Stations

pub async fn list_stations(
    Path(microcuenca_id): Path<String>,
    headers: HeaderMap,
    Query(filter): Query<StationStatusFilter>,
    Query(query): Query<ListQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Page<Station>> {
    let status = match filter.status.as_deref() {
        None => StationStatus::Operativa,
        Some(text) => StationStatus::parse(text)
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown station status {}", text)))?,
    };
    let caller = Caller::of(&state, &headers).await;
    let result = state
        .admin
        .stations(caller.session(), &microcuenca_id, status, &query)
        .await;
    state.settle(caller.key(), result).await.map(Json)
}

pub async fn get_station(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Station> {
    let caller = Caller::of(&state, &headers).await;
    let result = state.admin.station(caller.session(), &id).await;
    state.settle(caller.key(), result).await.map(Json)
}

pub async fn change_station_status(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(body): Json<StationStatusBody>,
) -> ApiResult<Notice> {
    let caller = Caller::of(&state, &headers).await;
    let status = StationStatus::parse(&body.status);
    let result = state
        .admin
        .change_station_status(caller.session(), &id, status)
        .await;
    state.settle(caller.key(), result).await.map(Json)
}

pub async fn create_station(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<Notice> {
    let (form, photo) = UploadedForm::read(multipart).await?.parse::<StationForm>()?;
    let caller = Caller::of(&state, &headers).await;
    let result = state
        .admin
        .save_station(caller.session(), FormMode::Create, form, photo)
        .await;
    state.settle(caller.key(), result).await.map(Json)
}

pub async fn update_station(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<Notice> {
    let (form, photo) = UploadedForm::read(multipart)
        .await?
        .with_id(&id)
        .parse::<StationForm>()?;
    let caller = Caller::of(&state, &headers).await;
    let result = state
        .admin
        .save_station(caller.session(), FormMode::Edit, form, photo)
        .await;
    state.settle(caller.key(), result).await.map(Json)
}

// Variable types

pub async fn list_variables(
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Page<VariableDefinition>> {
    let caller = Caller::of(&state, &headers).await;
    let result = state.admin.variables(caller.session(), &query).await;
    state.settle(caller.key(), result).await.map(Json)
}

pub async fn get_variable(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> ApiResult<VariableDefinition> {
    let caller = Caller::of(&state, &headers).await;
    let result = state.admin.variable(caller.session(), &id).await;
    state.settle(caller.key(), result).await.map(Json)
}

pub async fn toggle_variable(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Notice> {
    let caller = Caller::of(&state, &headers).await;
    let result = state.admin.toggle_variable(caller.session(), &id).await;
    state.settle(caller.key(), result).await.map(Json)
}

pub async fn create_variable(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<Notice> {
    let (form, photo) = UploadedForm::read(multipart).await?.parse::<VariableForm>()?;
    let caller = Caller::of(&state, &headers).await;
    let result = state
        .admin
        .save_variable(caller.session(), FormMode::Create, form, photo)
        .await;
    state.settle(caller.key(), result).await.map(Json)
}

pub async fn update_variable(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<Notice> {
    let (form, photo) = UploadedForm::read(multipart)
        .await?
        .with_id(&id)
        .parse::<VariableForm>()?;
    let caller = Caller::of(&state, &headers).await;
    let result = state
        .admin
        .save_variable(caller.session(), FormMode::Edit, form, photo)
        .await;
    state.settle(caller.key(), result).await.map(Json)
}

// Administrator accounts

pub async fn list_administrators(
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Page<Administrator>> {
    let caller = Caller::of(&state, &headers).await;
    let result = state.admin.administrators(caller.session(), &query).await;
    state.settle(caller.key(), result).await.map(Json)
}

pub async fn get_administrator(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Administrator> {
    let caller = Caller::of(&state, &headers).await;
    let result = state.admin.administrator(caller.session(), &id).await;
    state.settle(caller.key(), result).await.map(Json)
}

pub async fn set_account_status(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(body): Json<AccountStatusBody>,
) -> ApiResult<Notice> {
    let caller = Caller::of(&state, &headers).await;
    let status = match body.status {
        Some(status) => Ok(status),
        None => state
            .admin
            .administrator(caller.session(), &id)
            .await
            .map(|account| account.status.toggled()),
    };
    let result = match status {
        Ok(status) => state.admin.set_account_status(caller.session(), &id, status).await,
        Err(e) => Err(e),
    };
    state.settle(caller.key(), result).await.map(Json)
}

pub async fn create_administrator(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<Notice> {
    let (form, photo) = UploadedForm::read(multipart).await?.parse::<AdministratorForm>()?;
    let caller = Caller::of(&state, &headers).await;
    let result = state
        .admin
        .save_administrator(caller.session(), FormMode::Create, form, photo)
        .await;
    state.settle(caller.key(), result).await.map(Json)
}

pub async fn update_administrator(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<Notice> {
    let (form, photo) = UploadedForm::read(multipart)
        .await?
        .with_id(&id)
        .parse::<AdministratorForm>()?;
    let caller = Caller::of(&state, &headers).await;
    let result = state
        .admin
        .save_administrator(caller.session(), FormMode::Edit, form, photo)
        .await;
    state.settle(caller.key(), result).await.map(Json)
}

// Profile

/// The backend revokes the token after a password change, so the session ends here too.
pub async fn change_password(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(change): Json<PasswordChange>,
) -> ApiResult<Notice> {
    let caller = Caller::of(&state, &headers).await;
    let result = state.admin.change_password(caller.session(), &change).await;
    let notice = state.settle(caller.key(), result).await?;
    if let Some(key) = caller.key() {
        state.sessions.close(key).await;
    }
    Ok(Json(notice))
}
