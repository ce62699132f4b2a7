// Wire DTOs for the observatory backend and their mapping to domain models
use crate::domain::measurement::{
    AggregatedRecord, MeasurementBatch, MeasurementRecord, MetricGroup, VariableDefinition,
};
use crate::domain::network::{
    AccountStatus, Administrator, Microcuenca, Operation, Station, StationKind, StationStatus,
};
use crate::domain::session::Session;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct RawRow {
    #[serde(default, deserialize_with = "null_as_default")]
    pub tipo_medida: String,
    #[serde(default)]
    pub valor: Value,
    #[serde(default)]
    pub unidad: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub estacion: String,
    #[serde(default)]
    pub hora: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AggregatedRow {
    #[serde(default, deserialize_with = "null_as_default")]
    pub estacion: String,
    #[serde(default)]
    pub hora: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub medidas: serde_json::Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct VariableDto {
    #[serde(default, deserialize_with = "null_as_default")]
    pub external_id: String,
    #[serde(alias = "name")]
    pub nombre: String,
    #[serde(default, deserialize_with = "null_as_default", alias = "unit_measure")]
    pub unidad: String,
    #[serde(default, alias = "icon")]
    pub icono: Option<String>,
    #[serde(default, deserialize_with = "null_as_default", alias = "operations")]
    pub operaciones: Vec<String>,
    #[serde(default, alias = "status")]
    pub estado: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct MicrocuencaDto {
    #[serde(default, deserialize_with = "null_as_default")]
    pub external_id: String,
    #[serde(alias = "nombre")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default", alias = "descripcion")]
    pub description: String,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default, alias = "estado")]
    pub status: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct StationDto {
    #[serde(default, deserialize_with = "null_as_default")]
    pub external_id: String,
    #[serde(alias = "nombre")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default", alias = "descripcion")]
    pub description: String,
    #[serde(default, alias = "latitud")]
    pub latitude: Value,
    #[serde(default, alias = "longitud")]
    pub longitude: Value,
    #[serde(default, alias = "altitud")]
    pub altitude: Value,
    #[serde(default, rename = "type", alias = "tipo")]
    pub kind: Option<String>,
    #[serde(default, alias = "estado")]
    pub status: Option<String>,
    #[serde(default, alias = "id_dispositivo")]
    pub id_device: Value,
    #[serde(default)]
    pub picture: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AccountDto {
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdministratorDto {
    #[serde(default, deserialize_with = "null_as_default")]
    pub external_id: String,
    #[serde(default, deserialize_with = "null_as_default", alias = "nombres")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default", alias = "apellidos")]
    pub lastname: String,
    #[serde(default, alias = "telefono")]
    pub phone: Value,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub account: Option<AccountDto>,
}

/// A role is either a bare name or an object with a `nombre`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RoleDto {
    Name(String),
    Named { nombre: String },
}

impl RoleDto {
    fn into_name(self) -> String {
        match self {
            RoleDto::Name(name) | RoleDto::Named { nombre: name } => name,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct EntityDto {
    #[serde(default, deserialize_with = "null_as_default")]
    pub external_id: String,
    #[serde(default, deserialize_with = "null_as_default", alias = "nombres")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default", alias = "apellidos")]
    pub lastname: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserDto {
    #[serde(default)]
    pub entidad: Option<EntityDto>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub roles: Vec<RoleDto>,
    #[serde(default)]
    pub rol: Option<RoleDto>,
}

#[derive(Debug, Deserialize)]
pub struct LoginInfo {
    pub token: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user: UserDto,
    #[serde(default, deserialize_with = "null_as_default")]
    pub correo: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub roles: Vec<RoleDto>,
}

impl LoginInfo {
    pub fn into_session(self) -> Session {
        let entity = self.user.entidad.unwrap_or_default();
        let mut roles: Vec<String> = Vec::new();
        for role in self
            .roles
            .into_iter()
            .chain(self.user.roles)
            .chain(self.user.rol)
            .map(RoleDto::into_name)
        {
            if !roles.contains(&role) {
                roles.push(role);
            }
        }

        Session {
            token: self.token,
            external_id: entity.external_id,
            name: format!("{} {}", entity.name, entity.lastname).trim().to_string(),
            email: self.correo,
            roles,
        }
    }
}

/// Parse a backend timestamp into the display offset. Date-only values are
/// midnight UTC and naive date-times are already in display time.
pub fn parse_timestamp(text: &str, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&offset));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return offset.from_local_datetime(&naive).single();
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive).with_timezone(&offset))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn value_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(text) => crate::domain::measurement::parse_value(text),
        _ => None,
    }
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}

impl RawRow {
    pub fn into_record(self, offset: FixedOffset) -> MeasurementRecord {
        MeasurementRecord::new(
            self.estacion,
            self.tipo_medida,
            value_text(&self.valor),
            non_empty(self.unidad),
            self.hora.as_deref().and_then(|h| parse_timestamp(h, offset)),
            non_empty(self.icon),
        )
    }
}

impl AggregatedRow {
    pub fn into_record(self, offset: FixedOffset) -> AggregatedRecord {
        let variables = self
            .medidas
            .into_iter()
            .filter_map(|(variable, group)| match group {
                Value::Object(fields) => Some((variable, metric_group(fields))),
                _ => None,
            })
            .collect();
        AggregatedRecord::new(
            self.estacion,
            self.hora.as_deref().and_then(|h| parse_timestamp(h, offset)),
            variables,
        )
    }
}

/// `icon` and `unidad` describe the variable; every other key is a metric.
fn metric_group(fields: serde_json::Map<String, Value>) -> MetricGroup {
    let mut group = MetricGroup::default();
    for (key, value) in fields {
        match key.as_str() {
            "icon" => group.icon = value.as_str().map(str::to_string).filter(|s| !s.is_empty()),
            "unidad" => group.unit = value.as_str().map(str::to_string).filter(|s| !s.is_empty()),
            _ => group.metrics.push((key, value_number(&value))),
        }
    }
    group
}

/// Split a measurement response into raw or aggregated rows. A batch is raw
/// as soon as one row carries `valor`; undecodable rows are dropped.
pub fn decode_batch(rows: Vec<Value>, offset: FixedOffset) -> MeasurementBatch {
    let raw = rows.iter().any(|row| row.get("valor").is_some());
    if raw {
        MeasurementBatch::Raw(
            rows.into_iter()
                .filter_map(|row| decode_row::<RawRow>(row))
                .map(|row| row.into_record(offset))
                .collect(),
        )
    } else {
        MeasurementBatch::Aggregated(
            rows.into_iter()
                .filter_map(|row| decode_row::<AggregatedRow>(row))
                .map(|row| row.into_record(offset))
                .collect(),
        )
    }
}

fn decode_row<T: serde::de::DeserializeOwned>(row: Value) -> Option<T> {
    match serde_json::from_value(row) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            tracing::warn!("Skipping malformed measurement row: {}", e);
            None
        }
    }
}

impl VariableDto {
    pub fn into_domain(self, active: bool) -> VariableDefinition {
        let mut definition = VariableDefinition::new(self.nombre, self.unidad, non_empty(self.icono));
        definition.external_id = self.external_id;
        definition.operations = self
            .operaciones
            .iter()
            .filter_map(|op| Operation::parse(op))
            .collect();
        definition.active = self.estado.unwrap_or(active);
        definition
    }
}

impl MicrocuencaDto {
    pub fn into_domain(self, active: bool) -> Microcuenca {
        Microcuenca {
            external_id: self.external_id,
            name: self.name,
            description: self.description,
            picture: non_empty(self.picture),
            active: self.status.unwrap_or(active),
        }
    }
}

impl StationDto {
    pub fn into_domain(self) -> Station {
        Station {
            external_id: self.external_id,
            name: self.name,
            description: self.description,
            latitude: value_number(&self.latitude),
            longitude: value_number(&self.longitude),
            altitude: value_number(&self.altitude),
            kind: self.kind.as_deref().and_then(StationKind::parse),
            status: self.status.as_deref().and_then(StationStatus::parse),
            device_id: value_text(&self.id_device),
            picture: non_empty(self.picture),
        }
    }
}

impl AdministratorDto {
    pub fn into_domain(self, active: bool) -> Administrator {
        let account = self.account.unwrap_or(AccountDto {
            email: String::new(),
            status: None,
        });
        let status = match account.status.as_deref() {
            Some("ACEPTADO") => AccountStatus::Aceptado,
            Some("DENEGADO") => AccountStatus::Denegado,
            _ if active => AccountStatus::Aceptado,
            _ => AccountStatus::Denegado,
        };
        Administrator {
            external_id: self.external_id,
            names: self.name,
            surnames: self.lastname,
            phone: value_text(&self.phone),
            email: account.email,
            picture: non_empty(self.picture),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ecuador() -> FixedOffset {
        FixedOffset::west_opt(5 * 3600).unwrap()
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let utc = parse_timestamp("2024-06-10T15:30:00.000Z", ecuador()).unwrap();
        assert_eq!(utc.format("%Y-%m-%d %H:%M").to_string(), "2024-06-10 10:30");

        let naive = parse_timestamp("2024-06-10 10:30:00", ecuador()).unwrap();
        assert_eq!(naive, utc);

        let date = parse_timestamp("2024-06-01", ecuador()).unwrap();
        assert_eq!(date.format("%Y-%m-%d %H:%M").to_string(), "2024-05-31 19:00");

        assert!(parse_timestamp("yesterday", ecuador()).is_none());
    }

    #[test]
    fn test_decode_raw_batch() {
        let rows = vec![
            json!({"tipo_medida": "LLUVIA", "valor": "2.50", "unidad": "mm", "estacion": "E1",
                   "hora": "2024-06-10T15:00:00Z", "icon": "lluvia.png"}),
            json!({"tipo_medida": "TEMPERATURA", "valor": 18.5, "unidad": "", "estacion": "E1",
                   "hora": "2024-06-10T15:00:00Z"}),
        ];
        match decode_batch(rows, ecuador()) {
            MeasurementBatch::Raw(records) => {
                assert_eq!(records.len(), 2);
                assert_eq!(records[0].value, "2.50");
                assert_eq!(records[0].icon.as_deref(), Some("lluvia.png"));
                assert_eq!(records[1].numeric_value(), Some(18.5));
                assert_eq!(records[1].unit, None);
            }
            other => panic!("expected raw rows, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_aggregated_batch_keeps_metric_order() {
        let rows = vec![json!({
            "estacion": "E1",
            "hora": "2024-06-01",
            "medidas": {
                "TEMPERATURA": {"PROMEDIO": 18.2, "MAX": 24, "MIN": null, "icon": "t.png", "unidad": "°C"},
                "LLUVIA": {"SUMA": 12.5}
            }
        })];
        match decode_batch(rows, ecuador()) {
            MeasurementBatch::Aggregated(records) => {
                let group = records[0].group("TEMPERATURA").unwrap();
                let names: Vec<&str> = group.metric_names().collect();
                assert_eq!(names, vec!["PROMEDIO", "MAX", "MIN"]);
                assert_eq!(group.metric("MAX"), Some(24.0));
                assert_eq!(group.metric("MIN"), None);
                assert_eq!(group.unit.as_deref(), Some("°C"));
                assert_eq!(records[0].variables[1].0, "LLUVIA");
            }
            other => panic!("expected aggregated rows, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_batch_is_empty() {
        assert!(decode_batch(Vec::new(), ecuador()).is_empty());
    }

    #[test]
    fn test_station_dto_accepts_numeric_text() {
        let dto: StationDto = serde_json::from_value(json!({
            "external_id": "e1", "name": "Norte", "latitude": "-4.01", "longitude": -79.2,
            "altitude": null, "type": "HIDROLOGICA", "status": "NO OPERATIVA", "id_device": 42
        }))
        .unwrap();
        let station = dto.into_domain();

        assert_eq!(station.coordinates(), Some((-79.2, -4.01)));
        assert_eq!(station.altitude, None);
        assert_eq!(station.kind, Some(StationKind::Hidrologica));
        assert_eq!(station.status, Some(StationStatus::NoOperativa));
        assert_eq!(station.device_id, "42");
    }

    #[test]
    fn test_login_info_into_session() {
        let info: LoginInfo = serde_json::from_value(json!({
            "token": "abc",
            "correo": "ana@unl.edu.ec",
            "user": {
                "entidad": {"external_id": "u1", "nombres": "Ana", "apellidos": "Paz"},
                "roles": [{"nombre": "ADMINISTRADOR"}]
            }
        }))
        .unwrap();
        let session = info.into_session();

        assert_eq!(session.token, "abc");
        assert_eq!(session.external_id, "u1");
        assert_eq!(session.name, "Ana Paz");
        assert_eq!(session.roles, vec!["ADMINISTRADOR".to_string()]);
    }

    #[test]
    fn test_login_roles_merge_without_repeats() {
        let info: LoginInfo = serde_json::from_value(json!({
            "token": "abc",
            "correo": "ana@unl.edu.ec",
            "roles": ["ADMINISTRADOR", "TECNICO"],
            "user": {
                "roles": [{"nombre": "TECNICO"}],
                "rol": "ADMINISTRADOR"
            }
        }))
        .unwrap();

        assert_eq!(
            info.into_session().roles,
            vec!["ADMINISTRADOR".to_string(), "TECNICO".to_string()]
        );
    }

    #[test]
    fn test_administrator_dto() {
        let dto: AdministratorDto = serde_json::from_value(json!({
            "external_id": "u2", "name": "Luis", "lastname": "Mora", "phone": "0991234567",
            "account": {"email": "luis@unl.edu.ec", "status": "DENEGADO"}
        }))
        .unwrap();
        let admin = dto.into_domain(true);
        assert_eq!(admin.email, "luis@unl.edu.ec");
        assert_eq!(admin.status, AccountStatus::Denegado);
    }
}
