// Administration service - Watersheds, stations, variables and administrator accounts
use crate::application::error::{DashboardError, Notice};
use crate::application::observatory_repository::{EntityKind, ObservatoryRepository};
use crate::domain::forms::{
    AdministratorForm, FormErrors, FormMode, FormPayload, MicrocuencaForm, PasswordChange,
    PhotoUpload, StationForm, VariableForm,
};
use crate::domain::listing::{Page, ROWS_PER_PAGE, paginate, search};
use crate::domain::measurement::VariableDefinition;
use crate::domain::network::{AccountStatus, Administrator, Microcuenca, Station, StationStatus};
use crate::domain::session::{ADMINISTRATOR_ROLE, Session, authorize};
use crate::infrastructure::config::AssetUrls;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub page: Option<usize>,
    /// Deactivated entries instead of active ones
    #[serde(default)]
    pub inactive: bool,
}

impl ListQuery {
    fn apply<T: crate::domain::listing::Searchable>(&self, items: Vec<T>) -> Page<T> {
        let found = search(items, self.search.as_deref().unwrap_or(""));
        paginate(found, self.page.unwrap_or(1), ROWS_PER_PAGE)
    }
}

#[derive(Clone)]
pub struct AdminService {
    repository: Arc<dyn ObservatoryRepository>,
    assets: AssetUrls,
}

impl AdminService {
    pub fn new(repository: Arc<dyn ObservatoryRepository>, assets: AssetUrls) -> Self {
        Self { repository, assets }
    }

    // Watersheds

    pub async fn microcuencas(
        &self,
        session: Option<&Session>,
        query: &ListQuery,
    ) -> Result<Page<Microcuenca>, DashboardError> {
        let session = authorize(session, &[])?;
        let mut items = self
            .repository
            .microcuencas(Some(&session.token), !query.inactive)
            .await?;
        for item in &mut items {
            item.picture = item.picture.take().map(|p| self.assets.microcuenca_picture(&p));
        }
        Ok(query.apply(items))
    }

    pub async fn microcuenca(&self, session: Option<&Session>, id: &str) -> Result<Microcuenca, DashboardError> {
        let session = authorize(session, &[])?;
        self.repository.microcuenca(Some(&session.token), id).await
    }

    /// Deactivate an active watershed or reactivate a deactivated one.
    pub async fn toggle_microcuenca(
        &self,
        session: Option<&Session>,
        id: &str,
    ) -> Result<Notice, DashboardError> {
        let session = authorize(session, &[])?;
        let msg = self.repository.toggle_microcuenca(Some(&session.token), id).await?;
        tracing::info!("Watershed {} toggled by {}", id, session.email);
        Ok(Notice::success(msg))
    }

    pub async fn save_microcuenca(
        &self,
        session: Option<&Session>,
        mode: FormMode,
        form: MicrocuencaForm,
        photo: Option<PhotoUpload>,
    ) -> Result<Notice, DashboardError> {
        let session = authorize(session, &[])?;
        self.persist(session, EntityKind::Microcuenca, mode, form.into_payload(mode, photo))
            .await
    }

    // Stations

    pub async fn stations(
        &self,
        session: Option<&Session>,
        microcuenca_id: &str,
        status: StationStatus,
        query: &ListQuery,
    ) -> Result<Page<Station>, DashboardError> {
        let session = authorize(session, &[])?;
        let mut items = self
            .repository
            .stations(Some(&session.token), microcuenca_id, status)
            .await?;
        for item in &mut items {
            item.picture = item.picture.take().map(|p| self.assets.station_picture(&p));
        }
        Ok(query.apply(items))
    }

    pub async fn station(&self, session: Option<&Session>, id: &str) -> Result<Station, DashboardError> {
        let session = authorize(session, &[])?;
        let mut station = self.repository.station(Some(&session.token), id).await?;
        station.picture = station.picture.take().map(|p| self.assets.station_picture(&p));
        Ok(station)
    }

    pub async fn change_station_status(
        &self,
        session: Option<&Session>,
        id: &str,
        status: Option<StationStatus>,
    ) -> Result<Notice, DashboardError> {
        let session = authorize(session, &[])?;
        let status = status.ok_or_else(|| FormErrors::single("estado", "Select a status"))?;
        let msg = self
            .repository
            .change_station_status(Some(&session.token), id, status)
            .await?;
        tracing::info!("Station {} set to {} by {}", id, status.as_form_value(), session.email);
        Ok(Notice::success(msg))
    }

    pub async fn save_station(
        &self,
        session: Option<&Session>,
        mode: FormMode,
        form: StationForm,
        photo: Option<PhotoUpload>,
    ) -> Result<Notice, DashboardError> {
        let session = authorize(session, &[])?;
        self.persist(session, EntityKind::Station, mode, form.into_payload(mode, photo))
            .await
    }

    // Variable types

    pub async fn variables(
        &self,
        session: Option<&Session>,
        query: &ListQuery,
    ) -> Result<Page<VariableDefinition>, DashboardError> {
        let session = authorize(session, &[])?;
        let mut items = self
            .repository
            .variables(Some(&session.token), !query.inactive)
            .await?;
        for item in &mut items {
            item.icon = item.icon.take().map(|icon| self.assets.variable_icon(&icon));
        }
        Ok(query.apply(items))
    }

    pub async fn variable(
        &self,
        session: Option<&Session>,
        id: &str,
    ) -> Result<VariableDefinition, DashboardError> {
        let session = authorize(session, &[])?;
        self.repository.variable(Some(&session.token), id).await
    }

    pub async fn toggle_variable(&self, session: Option<&Session>, id: &str) -> Result<Notice, DashboardError> {
        let session = authorize(session, &[])?;
        let msg = self.repository.toggle_variable(Some(&session.token), id).await?;
        Ok(Notice::success(msg))
    }

    pub async fn save_variable(
        &self,
        session: Option<&Session>,
        mode: FormMode,
        form: VariableForm,
        photo: Option<PhotoUpload>,
    ) -> Result<Notice, DashboardError> {
        let session = authorize(session, &[])?;
        self.persist(session, EntityKind::Variable, mode, form.into_payload(mode, photo))
            .await
    }

    // Administrator accounts

    pub async fn administrators(
        &self,
        session: Option<&Session>,
        query: &ListQuery,
    ) -> Result<Page<Administrator>, DashboardError> {
        let session = authorize(session, &[ADMINISTRATOR_ROLE])?;
        let mut items = self
            .repository
            .administrators(Some(&session.token), !query.inactive)
            .await?;
        for item in &mut items {
            item.picture = Some(self.assets.user_picture(item.picture.as_deref()));
        }
        Ok(query.apply(items))
    }

    pub async fn administrator(
        &self,
        session: Option<&Session>,
        id: &str,
    ) -> Result<Administrator, DashboardError> {
        let session = authorize(session, &[ADMINISTRATOR_ROLE])?;
        let mut administrator = self.repository.administrator(Some(&session.token), id).await?;
        administrator.picture = Some(self.assets.user_picture(administrator.picture.as_deref()));
        Ok(administrator)
    }

    /// Flip an account between accepted and denied. An administrator cannot
    /// change their own account.
    pub async fn set_account_status(
        &self,
        session: Option<&Session>,
        administrator_id: &str,
        status: AccountStatus,
    ) -> Result<Notice, DashboardError> {
        let session = authorize(session, &[ADMINISTRATOR_ROLE])?;
        if session.external_id == administrator_id {
            return Err(FormErrors::single("estado", "You cannot change the status of your own account").into());
        }
        let msg = self
            .repository
            .set_account_status(Some(&session.token), administrator_id, status)
            .await?;
        tracing::info!(
            "Account {} set to {} by {}",
            administrator_id,
            status.as_str(),
            session.email
        );
        Ok(Notice::success(msg))
    }

    pub async fn save_administrator(
        &self,
        session: Option<&Session>,
        mode: FormMode,
        form: AdministratorForm,
        photo: Option<PhotoUpload>,
    ) -> Result<Notice, DashboardError> {
        let session = authorize(session, &[ADMINISTRATOR_ROLE])?;
        self.persist(session, EntityKind::Administrator, mode, form.into_payload(mode, photo))
            .await
    }

    // Profile

    /// The backend invalidates the current token on success; callers must end the session.
    pub async fn change_password(
        &self,
        session: Option<&Session>,
        change: &PasswordChange,
    ) -> Result<Notice, DashboardError> {
        let session = authorize(session, &[])?;
        change.validate()?;
        let msg = self
            .repository
            .change_password(Some(&session.token), session, change)
            .await?;
        Ok(Notice::success(msg))
    }

    async fn persist(
        &self,
        session: &Session,
        kind: EntityKind,
        mode: FormMode,
        payload: Result<FormPayload, FormErrors>,
    ) -> Result<Notice, DashboardError> {
        let payload = payload?;
        tracing::debug!("Saving {:?} ({:?}) with {} fields", kind, mode, payload.fields.len());
        let msg = self
            .repository
            .save(Some(&session.token), kind, mode, payload)
            .await?;
        Ok(Notice::success(msg))
    }
}
