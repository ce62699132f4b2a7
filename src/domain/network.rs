// Monitoring network domain models: watersheds, stations, administrators
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Microcuenca {
    pub external_id: String,
    pub name: String,
    pub description: String,
    pub picture: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StationKind {
    #[serde(rename = "METEOROLOGICA")]
    Meteorologica,
    #[serde(rename = "HIDROLOGICA")]
    Hidrologica,
    #[serde(rename = "PLUVIOMETRICA")]
    Pluviometrica,
}

impl StationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StationKind::Meteorologica => "METEOROLOGICA",
            StationKind::Hidrologica => "HIDROLOGICA",
            StationKind::Pluviometrica => "PLUVIOMETRICA",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "METEOROLOGICA" => Some(StationKind::Meteorologica),
            "HIDROLOGICA" => Some(StationKind::Hidrologica),
            "PLUVIOMETRICA" => Some(StationKind::Pluviometrica),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StationStatus {
    #[serde(rename = "OPERATIVA")]
    Operativa,
    #[serde(rename = "MANTENIMIENTO")]
    Mantenimiento,
    #[serde(rename = "NO OPERATIVA", alias = "NO_OPERATIVA")]
    NoOperativa,
}

impl StationStatus {
    /// Value submitted in station forms.
    pub fn as_form_value(&self) -> &'static str {
        match self {
            StationStatus::Operativa => "OPERATIVA",
            StationStatus::Mantenimiento => "MANTENIMIENTO",
            StationStatus::NoOperativa => "NO OPERATIVA",
        }
    }

    /// Segment used by the station listing route.
    pub fn as_path_segment(&self) -> &'static str {
        match self {
            StationStatus::NoOperativa => "NO_OPERATIVA",
            other => other.as_form_value(),
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().replace('_', " ").as_str() {
            "OPERATIVA" => Some(StationStatus::Operativa),
            "MANTENIMIENTO" => Some(StationStatus::Mantenimiento),
            "NO OPERATIVA" => Some(StationStatus::NoOperativa),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Station {
    pub external_id: String,
    pub name: String,
    pub description: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub kind: Option<StationKind>,
    pub status: Option<StationStatus>,
    pub device_id: String,
    pub picture: Option<String>,
}

impl Station {
    /// Coordinates usable for a map marker, as (longitude, latitude).
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.longitude, self.latitude) {
            (Some(lng), Some(lat)) if lng.is_finite() && lat.is_finite() => Some((lng, lat)),
            _ => None,
        }
    }
}

/// Aggregate operations a variable type supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    #[serde(rename = "PROMEDIO")]
    Promedio,
    #[serde(rename = "MAX")]
    Max,
    #[serde(rename = "MIN")]
    Min,
    #[serde(rename = "SUMA")]
    Suma,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Promedio => "PROMEDIO",
            Operation::Max => "MAX",
            Operation::Min => "MIN",
            Operation::Suma => "SUMA",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "PROMEDIO" => Some(Operation::Promedio),
            "MAX" => Some(Operation::Max),
            "MIN" => Some(Operation::Min),
            "SUMA" => Some(Operation::Suma),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    #[serde(rename = "ACEPTADO")]
    Aceptado,
    #[serde(rename = "DENEGADO")]
    Denegado,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Aceptado => "ACEPTADO",
            AccountStatus::Denegado => "DENEGADO",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            AccountStatus::Aceptado => AccountStatus::Denegado,
            AccountStatus::Denegado => AccountStatus::Aceptado,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Administrator {
    pub external_id: String,
    pub names: String,
    pub surnames: String,
    pub phone: String,
    pub email: String,
    pub picture: Option<String>,
    pub status: AccountStatus,
}
