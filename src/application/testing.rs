// In-memory repository used by application tests
use crate::application::error::DashboardError;
use crate::application::observatory_repository::{
    EntityKind, ObservatoryRepository, RepoResult, WatershedStations,
};
use crate::domain::filter::FilterDescriptor;
use crate::domain::forms::{Credentials, FormMode, FormPayload, PasswordChange};
use crate::domain::measurement::{MeasurementBatch, MeasurementRecord, VariableDefinition};
use crate::domain::network::{AccountStatus, Administrator, Microcuenca, Station, StationStatus};
use crate::domain::session::{ADMINISTRATOR_ROLE, Session};
use async_trait::async_trait;
use chrono::DateTime;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub fn raw_reading(station: &str, variable: &str, value: &str, time: &str) -> MeasurementRecord {
    MeasurementRecord::new(
        station.to_string(),
        variable.to_string(),
        value.to_string(),
        None,
        DateTime::parse_from_rfc3339(time).ok(),
        None,
    )
}

pub fn station(id: &str, name: &str, lng: f64, lat: f64) -> Station {
    Station {
        external_id: id.to_string(),
        name: name.to_string(),
        description: String::new(),
        latitude: Some(lat),
        longitude: Some(lng),
        altitude: None,
        kind: None,
        status: Some(StationStatus::Operativa),
        device_id: String::new(),
        picture: None,
    }
}

pub fn administrator(id: &str, names: &str, email: &str) -> Administrator {
    Administrator {
        external_id: id.to_string(),
        names: names.to_string(),
        surnames: String::new(),
        phone: String::new(),
        email: email.to_string(),
        picture: None,
        status: AccountStatus::Aceptado,
    }
}

pub fn admin_session(id: &str) -> Session {
    Session {
        token: format!("token-{}", id),
        external_id: id.to_string(),
        name: "Ana".to_string(),
        email: "ana@unl.edu.ec".to_string(),
        roles: vec![ADMINISTRATOR_ROLE.to_string()],
    }
}

#[derive(Default)]
pub struct FakeRepository {
    pub latest: Mutex<Vec<MeasurementRecord>>,
    pub catalog: Mutex<Vec<VariableDefinition>>,
    pub station_readings: Mutex<HashMap<String, Vec<MeasurementRecord>>>,
    pub failing_stations: Mutex<Vec<String>>,
    pub watershed: Mutex<Option<WatershedStations>>,
    pub microcuencas: Mutex<Vec<Microcuenca>>,
    pub stations: Mutex<Vec<Station>>,
    pub administrators: Mutex<Vec<Administrator>>,
    pub saved: Mutex<Vec<(EntityKind, FormMode, FormPayload)>>,
    pub status_changes: Mutex<Vec<(String, String)>>,
    batches: Mutex<HashMap<String, MeasurementBatch>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    failure: Mutex<Option<(i64, String)>>,
    measurement_calls: AtomicUsize,
    latest_calls: AtomicUsize,
}

impl FakeRepository {
    /// Batch returned for a filter on `station` ("" for no station).
    pub fn set_batch(&self, station: &str, batch: MeasurementBatch) {
        self.batches.lock().unwrap().insert(station.to_string(), batch);
    }

    /// Hold measurement queries for `station` until `gate` is notified.
    pub fn gate(&self, station: &str, gate: Arc<Notify>) {
        self.gates.lock().unwrap().insert(station.to_string(), gate);
    }

    /// Make every call fail the way the backend envelope would.
    pub fn fail_with(&self, code: i64, msg: &str) {
        *self.failure.lock().unwrap() = Some((code, msg.to_string()));
    }

    pub fn measurement_calls(&self) -> usize {
        self.measurement_calls.load(Ordering::SeqCst)
    }

    pub fn latest_calls(&self) -> usize {
        self.latest_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> RepoResult<()> {
        match self.failure.lock().unwrap().clone() {
            Some((_, msg)) if msg.contains("Token") => Err(DashboardError::SessionExpired(msg)),
            Some((code, msg)) => Err(DashboardError::Server { code, msg }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ObservatoryRepository for FakeRepository {
    async fn login(&self, credentials: &Credentials) -> RepoResult<Session> {
        self.check()?;
        let mut session = admin_session("u1");
        session.email = credentials.email.clone();
        Ok(session)
    }

    async fn latest_measurements(&self, _token: Option<&str>) -> RepoResult<Vec<MeasurementRecord>> {
        self.latest_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.latest.lock().unwrap().clone())
    }

    async fn latest_station_measurements(
        &self,
        _token: Option<&str>,
        station_id: &str,
    ) -> RepoResult<Vec<MeasurementRecord>> {
        self.check()?;
        if self.failing_stations.lock().unwrap().iter().any(|s| s == station_id) {
            return Err(DashboardError::Network("station offline".to_string()));
        }
        Ok(self
            .station_readings
            .lock()
            .unwrap()
            .get(station_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn variables(&self, _token: Option<&str>, active: bool) -> RepoResult<Vec<VariableDefinition>> {
        self.check()?;
        Ok(self
            .catalog
            .lock()
            .unwrap()
            .iter()
            .filter(|v| v.active == active)
            .cloned()
            .collect())
    }

    async fn variable(&self, _token: Option<&str>, id: &str) -> RepoResult<VariableDefinition> {
        self.check()?;
        self.catalog
            .lock()
            .unwrap()
            .iter()
            .find(|v| v.external_id == id)
            .cloned()
            .ok_or(DashboardError::Server { code: 404, msg: "Variable no encontrada".to_string() })
    }

    async fn toggle_variable(&self, _token: Option<&str>, id: &str) -> RepoResult<String> {
        self.check()?;
        self.status_changes.lock().unwrap().push((id.to_string(), "toggle".to_string()));
        Ok("Estado actualizado".to_string())
    }

    async fn measurements(
        &self,
        _token: Option<&str>,
        filter: &FilterDescriptor,
    ) -> RepoResult<MeasurementBatch> {
        self.measurement_calls.fetch_add(1, Ordering::SeqCst);
        let key = filter.station().unwrap_or("").to_string();
        let gate = self.gates.lock().unwrap().get(&key).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.check()?;
        Ok(self
            .batches
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or(MeasurementBatch::Raw(Vec::new())))
    }

    async fn operative_stations(&self, _token: Option<&str>) -> RepoResult<Vec<Station>> {
        self.check()?;
        Ok(self.stations.lock().unwrap().clone())
    }

    async fn microcuencas(&self, _token: Option<&str>, active: bool) -> RepoResult<Vec<Microcuenca>> {
        self.check()?;
        Ok(self
            .microcuencas
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.active == active)
            .cloned()
            .collect())
    }

    async fn microcuenca(&self, _token: Option<&str>, id: &str) -> RepoResult<Microcuenca> {
        self.check()?;
        self.microcuencas
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.external_id == id)
            .cloned()
            .ok_or(DashboardError::Server { code: 404, msg: "Microcuenca no encontrada".to_string() })
    }

    async fn toggle_microcuenca(&self, _token: Option<&str>, id: &str) -> RepoResult<String> {
        self.check()?;
        self.status_changes.lock().unwrap().push((id.to_string(), "toggle".to_string()));
        Ok("Estado actualizado".to_string())
    }

    async fn watershed_stations(
        &self,
        _token: Option<&str>,
        _microcuenca_id: &str,
    ) -> RepoResult<WatershedStations> {
        self.check()?;
        Ok(self.watershed.lock().unwrap().clone().unwrap_or(WatershedStations {
            microcuenca_name: String::new(),
            stations: Vec::new(),
        }))
    }

    async fn stations(
        &self,
        _token: Option<&str>,
        _microcuenca_id: &str,
        status: StationStatus,
    ) -> RepoResult<Vec<Station>> {
        self.check()?;
        Ok(self
            .stations
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.status == Some(status))
            .cloned()
            .collect())
    }

    async fn station(&self, _token: Option<&str>, id: &str) -> RepoResult<Station> {
        self.check()?;
        self.stations
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.external_id == id)
            .cloned()
            .ok_or(DashboardError::Server { code: 404, msg: "Estacion no encontrada".to_string() })
    }

    async fn change_station_status(
        &self,
        _token: Option<&str>,
        id: &str,
        status: StationStatus,
    ) -> RepoResult<String> {
        self.check()?;
        self.status_changes
            .lock()
            .unwrap()
            .push((id.to_string(), status.as_form_value().to_string()));
        Ok("Estado actualizado".to_string())
    }

    async fn administrators(&self, _token: Option<&str>, active: bool) -> RepoResult<Vec<Administrator>> {
        self.check()?;
        let wanted = if active { AccountStatus::Aceptado } else { AccountStatus::Denegado };
        Ok(self
            .administrators
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.status == wanted)
            .cloned()
            .collect())
    }

    async fn administrator(&self, _token: Option<&str>, id: &str) -> RepoResult<Administrator> {
        self.check()?;
        self.administrators
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.external_id == id)
            .cloned()
            .ok_or(DashboardError::Server { code: 404, msg: "Cuenta no encontrada".to_string() })
    }

    async fn set_account_status(
        &self,
        _token: Option<&str>,
        id: &str,
        status: AccountStatus,
    ) -> RepoResult<String> {
        self.check()?;
        self.status_changes
            .lock()
            .unwrap()
            .push((id.to_string(), status.as_str().to_string()));
        Ok("Cuenta actualizada".to_string())
    }

    async fn save(
        &self,
        _token: Option<&str>,
        kind: EntityKind,
        mode: FormMode,
        payload: FormPayload,
    ) -> RepoResult<String> {
        self.check()?;
        self.saved.lock().unwrap().push((kind, mode, payload));
        Ok("Guardado correctamente".to_string())
    }

    async fn change_password(
        &self,
        _token: Option<&str>,
        _session: &Session,
        _change: &PasswordChange,
    ) -> RepoResult<String> {
        self.check()?;
        Ok("Clave actualizada".to_string())
    }
}
