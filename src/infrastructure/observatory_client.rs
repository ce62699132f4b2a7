// Observatory backend repository implementation
use crate::application::error::DashboardError;
use crate::application::observatory_repository::{
    EntityKind, ObservatoryRepository, RepoResult, WatershedStations,
};
use crate::domain::filter::FilterDescriptor;
use crate::domain::forms::{Credentials, FormMode, FormPayload, PasswordChange};
use crate::domain::measurement::{MeasurementBatch, MeasurementRecord, VariableDefinition};
use crate::domain::network::{AccountStatus, Administrator, Microcuenca, Station, StationStatus};
use crate::domain::session::Session;
use crate::infrastructure::api_client::ApiClient;
use crate::infrastructure::wire::{
    AdministratorDto, LoginInfo, MicrocuencaDto, RawRow, StationDto, VariableDto, decode_batch,
};
use async_trait::async_trait;
use chrono::FixedOffset;
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};

#[derive(Debug, Clone)]
pub struct ObservatoryClient {
    api: ApiClient,
    offset: FixedOffset,
}

impl ObservatoryClient {
    pub fn new(api: ApiClient, offset: FixedOffset) -> Self {
        Self { api, offset }
    }

    fn raw_records(&self, rows: Vec<RawRow>) -> Vec<MeasurementRecord> {
        rows.into_iter().map(|row| row.into_record(self.offset)).collect()
    }
}

fn entity_segment(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Microcuenca => "microcuenca",
        EntityKind::Station => "estacion",
        EntityKind::Variable => "tipo_medida",
        EntityKind::Administrator => "entidad",
    }
}

fn save_path(kind: EntityKind, mode: FormMode) -> String {
    let action = match mode {
        FormMode::Create => "guardar",
        FormMode::Edit => "modificar",
    };
    format!("/{}/{}", action, entity_segment(kind))
}

fn multipart(payload: FormPayload) -> Result<Form, DashboardError> {
    let mut form = Form::new();
    for (name, value) in payload.fields {
        form = form.text(name, value);
    }
    if let Some(photo) = payload.photo {
        let mut part = Part::bytes(photo.bytes).file_name(photo.file_name);
        if let Some(content_type) = photo.content_type {
            part = part.mime_str(&content_type)?;
        }
        form = form.part("foto", part);
    }
    Ok(form)
}

#[async_trait]
impl ObservatoryRepository for ObservatoryClient {
    async fn login(&self, credentials: &Credentials) -> RepoResult<Session> {
        let body = json!({ "email": credentials.email, "password": credentials.password });
        let info: LoginInfo = self.api.post(None, "/sesion", &body).await?.into_info()?;
        let mut session = info.into_session();
        if session.email.is_empty() {
            session.email = credentials.email.clone();
        }
        Ok(session)
    }

    async fn latest_measurements(&self, token: Option<&str>) -> RepoResult<Vec<MeasurementRecord>> {
        let rows: Vec<RawRow> = self.api.get(token, "/listar/ultima/medida").await?.into_info()?;
        Ok(self.raw_records(rows))
    }

    async fn latest_station_measurements(
        &self,
        token: Option<&str>,
        station_id: &str,
    ) -> RepoResult<Vec<MeasurementRecord>> {
        let body = json!({ "externalId": station_id });
        let rows: Vec<RawRow> = self
            .api
            .post(token, "/listar/ultima/medida/estacion", &body)
            .await?
            .into_info()?;
        Ok(self.raw_records(rows))
    }

    async fn variables(&self, token: Option<&str>, active: bool) -> RepoResult<Vec<VariableDefinition>> {
        let path = if active {
            "/listar/tipo_medida"
        } else {
            "/listar/tipo_medida/desactivos"
        };
        let rows: Vec<VariableDto> = self.api.get(token, path).await?.into_info()?;
        Ok(rows.into_iter().map(|row| row.into_domain(active)).collect())
    }

    async fn variable(&self, token: Option<&str>, id: &str) -> RepoResult<VariableDefinition> {
        let path = format!("/obtener/tipo_medida/{}", urlencoding::encode(id));
        let row: VariableDto = self.api.get(token, &path).await?.into_info()?;
        Ok(row.into_domain(true))
    }

    async fn toggle_variable(&self, token: Option<&str>, id: &str) -> RepoResult<String> {
        let path = format!("/tipo_fenomeno/cambiar_estado/{}", urlencoding::encode(id));
        self.api.get::<Value>(token, &path).await?.into_message()
    }

    async fn measurements(
        &self,
        token: Option<&str>,
        filter: &FilterDescriptor,
    ) -> RepoResult<MeasurementBatch> {
        let path = filter.query_path();
        tracing::debug!("Fetching measurements from {}", path);
        let rows: Vec<Value> = self.api.get(token, &path).await?.into_info()?;
        Ok(decode_batch(rows, self.offset))
    }

    async fn operative_stations(&self, token: Option<&str>) -> RepoResult<Vec<Station>> {
        let rows: Vec<StationDto> = self
            .api
            .get(token, "/listar/estacion/operativas")
            .await?
            .into_info()?;
        Ok(rows.into_iter().map(StationDto::into_domain).collect())
    }

    async fn microcuencas(&self, token: Option<&str>, active: bool) -> RepoResult<Vec<Microcuenca>> {
        let path = if active {
            "/listar/microcuenca/operativas"
        } else {
            "/listar/microcuenca/desactivas"
        };
        let rows: Vec<MicrocuencaDto> = self.api.get(token, path).await?.into_info()?;
        Ok(rows.into_iter().map(|row| row.into_domain(active)).collect())
    }

    async fn microcuenca(&self, token: Option<&str>, id: &str) -> RepoResult<Microcuenca> {
        let path = format!("/obtener/microcuenca/{}", urlencoding::encode(id));
        let row: MicrocuencaDto = self.api.get(token, &path).await?.into_info()?;
        Ok(row.into_domain(true))
    }

    async fn toggle_microcuenca(&self, token: Option<&str>, id: &str) -> RepoResult<String> {
        let path = format!("/desactivar/microcuenca/{}", urlencoding::encode(id));
        self.api.get::<Value>(token, &path).await?.into_message()
    }

    async fn watershed_stations(
        &self,
        token: Option<&str>,
        microcuenca_id: &str,
    ) -> RepoResult<WatershedStations> {
        let body = json!({ "external": microcuenca_id });
        let envelope = self
            .api
            .post::<_, Vec<StationDto>>(token, "/estaciones/operativas/microcuenca", &body)
            .await?;
        let microcuenca_name = envelope
            .extra_str("microcuenca_nombre")
            .unwrap_or_default()
            .to_string();
        let rows = envelope.into_info()?;
        Ok(WatershedStations {
            microcuenca_name,
            stations: rows.into_iter().map(StationDto::into_domain).collect(),
        })
    }

    async fn stations(
        &self,
        token: Option<&str>,
        microcuenca_id: &str,
        status: StationStatus,
    ) -> RepoResult<Vec<Station>> {
        let path = format!(
            "/listar/estacion/{}/{}",
            status.as_path_segment(),
            urlencoding::encode(microcuenca_id)
        );
        let rows: Vec<StationDto> = self.api.get(token, &path).await?.into_info()?;
        Ok(rows.into_iter().map(StationDto::into_domain).collect())
    }

    async fn station(&self, token: Option<&str>, id: &str) -> RepoResult<Station> {
        let path = format!("/get/estacion/{}", urlencoding::encode(id));
        let row: StationDto = self.api.get(token, &path).await?.into_info()?;
        Ok(row.into_domain())
    }

    async fn change_station_status(
        &self,
        token: Option<&str>,
        id: &str,
        status: StationStatus,
    ) -> RepoResult<String> {
        let body = json!({ "external_id": id, "estado": status.as_form_value() });
        self.api
            .post::<_, Value>(token, "/estacion/cambiar_estado", &body)
            .await?
            .into_message()
    }

    async fn administrators(&self, token: Option<&str>, active: bool) -> RepoResult<Vec<Administrator>> {
        let path = format!("/listar/entidad?estadoCuenta={}", active);
        let rows: Vec<AdministratorDto> = self.api.get(token, &path).await?.into_info()?;
        Ok(rows.into_iter().map(|row| row.into_domain(active)).collect())
    }

    async fn administrator(&self, token: Option<&str>, id: &str) -> RepoResult<Administrator> {
        let path = format!("/obtener/entidad/{}", urlencoding::encode(id));
        let row: AdministratorDto = self.api.get(token, &path).await?.into_info()?;
        Ok(row.into_domain(true))
    }

    async fn set_account_status(
        &self,
        token: Option<&str>,
        id: &str,
        status: AccountStatus,
    ) -> RepoResult<String> {
        let path = format!(
            "/modificar/cuenta-status?external_id={}&nuevoEstado={}",
            urlencoding::encode(id),
            status.as_str()
        );
        self.api.get::<Value>(token, &path).await?.into_message()
    }

    async fn save(
        &self,
        token: Option<&str>,
        kind: EntityKind,
        mode: FormMode,
        payload: FormPayload,
    ) -> RepoResult<String> {
        let path = save_path(kind, mode);
        let form = multipart(payload)?;
        self.api
            .post_multipart::<Value>(token, &path, form)
            .await?
            .into_message()
    }

    async fn change_password(
        &self,
        token: Option<&str>,
        session: &Session,
        change: &PasswordChange,
    ) -> RepoResult<String> {
        let body = json!({
            "external_id": session.external_id,
            "email": session.email,
            "currentPassword": change.current_password,
            "newPassword": change.new_password,
        });
        self.api
            .post::<_, Value>(token, "/cambiar-clave/entidad", &body)
            .await?
            .into_message()
    }
}
