// Repository trait for the observatory backend
use crate::application::error::DashboardError;
use crate::domain::filter::FilterDescriptor;
use crate::domain::forms::{Credentials, FormMode, FormPayload, PasswordChange};
use crate::domain::measurement::{MeasurementBatch, MeasurementRecord, VariableDefinition};
use crate::domain::network::{AccountStatus, Administrator, Microcuenca, Station, StationStatus};
use crate::domain::session::Session;
use async_trait::async_trait;

pub type RepoResult<T> = Result<T, DashboardError>;

/// Entities managed through multipart forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Microcuenca,
    Station,
    Variable,
    Administrator,
}

/// Operative stations of one watershed.
#[derive(Debug, Clone, PartialEq)]
pub struct WatershedStations {
    pub microcuenca_name: String,
    pub stations: Vec<Station>,
}

/// Every method takes the caller's token explicitly; public views pass `None`.
#[async_trait]
pub trait ObservatoryRepository: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> RepoResult<Session>;

    /// Latest reading of every variable at every station
    async fn latest_measurements(&self, token: Option<&str>) -> RepoResult<Vec<MeasurementRecord>>;

    async fn latest_station_measurements(
        &self,
        token: Option<&str>,
        station_id: &str,
    ) -> RepoResult<Vec<MeasurementRecord>>;

    /// Variable catalog, active or deactivated entries
    async fn variables(&self, token: Option<&str>, active: bool) -> RepoResult<Vec<VariableDefinition>>;

    async fn variable(&self, token: Option<&str>, id: &str) -> RepoResult<VariableDefinition>;

    async fn toggle_variable(&self, token: Option<&str>, id: &str) -> RepoResult<String>;

    /// Raw or aggregated rows for a chart filter
    async fn measurements(
        &self,
        token: Option<&str>,
        filter: &FilterDescriptor,
    ) -> RepoResult<MeasurementBatch>;

    async fn operative_stations(&self, token: Option<&str>) -> RepoResult<Vec<Station>>;

    async fn microcuencas(&self, token: Option<&str>, active: bool) -> RepoResult<Vec<Microcuenca>>;

    async fn microcuenca(&self, token: Option<&str>, id: &str) -> RepoResult<Microcuenca>;

    async fn toggle_microcuenca(&self, token: Option<&str>, id: &str) -> RepoResult<String>;

    async fn watershed_stations(
        &self,
        token: Option<&str>,
        microcuenca_id: &str,
    ) -> RepoResult<WatershedStations>;

    async fn stations(
        &self,
        token: Option<&str>,
        microcuenca_id: &str,
        status: StationStatus,
    ) -> RepoResult<Vec<Station>>;

    async fn station(&self, token: Option<&str>, id: &str) -> RepoResult<Station>;

    async fn change_station_status(
        &self,
        token: Option<&str>,
        id: &str,
        status: StationStatus,
    ) -> RepoResult<String>;

    async fn administrators(&self, token: Option<&str>, active: bool) -> RepoResult<Vec<Administrator>>;

    async fn administrator(&self, token: Option<&str>, id: &str) -> RepoResult<Administrator>;

    async fn set_account_status(
        &self,
        token: Option<&str>,
        id: &str,
        status: AccountStatus,
    ) -> RepoResult<String>;

    /// Create or modify an entity from a validated form
    async fn save(
        &self,
        token: Option<&str>,
        kind: EntityKind,
        mode: FormMode,
        payload: FormPayload,
    ) -> RepoResult<String>;

    async fn change_password(
        &self,
        token: Option<&str>,
        session: &Session,
        change: &PasswordChange,
    ) -> RepoResult<String>;
}
