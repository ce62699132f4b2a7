// Measurement domain models
use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use super::network::Operation;

/// Palette used for station readings on the live measurement cards.
pub const READING_PALETTE: [&str; 6] = [
    "#362FD9", "#1AACAC", "#DB005B", "#19A7CE", "#DF2E38", "#8DCBE6",
];

/// One raw reading as reported by a station.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    pub station: String,
    pub variable_type: String,
    /// Value exactly as the backend sent it.
    pub value: String,
    pub unit: Option<String>,
    pub timestamp: Option<DateTime<FixedOffset>>,
    pub icon: Option<String>,
}

impl MeasurementRecord {
    pub fn new(
        station: String,
        variable_type: String,
        value: String,
        unit: Option<String>,
        timestamp: Option<DateTime<FixedOffset>>,
        icon: Option<String>,
    ) -> Self {
        Self {
            station,
            variable_type,
            value,
            unit,
            timestamp,
            icon,
        }
    }

    pub fn numeric_value(&self) -> Option<f64> {
        parse_value(&self.value)
    }
}

/// Metrics reported for one variable inside an aggregated row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricGroup {
    /// Metric name to value, in the order the backend listed them.
    pub metrics: Vec<(String, Option<f64>)>,
    pub icon: Option<String>,
    pub unit: Option<String>,
}

impl MetricGroup {
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics
            .iter()
            .find(|(metric, _)| metric == name)
            .and_then(|(_, value)| *value)
    }

    pub fn metric_names(&self) -> impl Iterator<Item = &str> {
        self.metrics.iter().map(|(name, _)| name.as_str())
    }
}

/// One aggregation period for a station.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRecord {
    pub station: String,
    pub timestamp: Option<DateTime<FixedOffset>>,
    /// Variable type to its metric group, in the order the backend listed them.
    pub variables: Vec<(String, MetricGroup)>,
}

impl AggregatedRecord {
    pub fn new(
        station: String,
        timestamp: Option<DateTime<FixedOffset>>,
        variables: Vec<(String, MetricGroup)>,
    ) -> Self {
        Self {
            station,
            timestamp,
            variables,
        }
    }

    pub fn group(&self, variable_type: &str) -> Option<&MetricGroup> {
        self.variables
            .iter()
            .find(|(name, _)| name == variable_type)
            .map(|(_, group)| group)
    }
}

/// Rows returned by one measurement query. A single response never mixes shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum MeasurementBatch {
    Raw(Vec<MeasurementRecord>),
    Aggregated(Vec<AggregatedRecord>),
}

impl MeasurementBatch {
    pub fn len(&self) -> usize {
        match self {
            MeasurementBatch::Raw(rows) => rows.len(),
            MeasurementBatch::Aggregated(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Catalog entry describing a measured variable type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableDefinition {
    pub external_id: String,
    pub name: String,
    pub unit: String,
    pub icon: Option<String>,
    pub operations: Vec<Operation>,
    pub active: bool,
}

impl VariableDefinition {
    pub fn new(name: String, unit: String, icon: Option<String>) -> Self {
        Self {
            external_id: String::new(),
            name,
            unit,
            icon,
            operations: Vec::new(),
            active: true,
        }
    }

    /// Catalog names match ignoring case, whitespace and underscores.
    pub fn matches(&self, variable_type: &str) -> bool {
        let name = match_key(&self.name);
        !name.is_empty() && name == match_key(variable_type)
    }
}

/// A variable with every station currently reporting it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedVariable {
    pub variable_type: String,
    pub label: String,
    pub icon: String,
    pub unit: String,
    pub stations: Vec<StationReading>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationReading {
    pub station: String,
    pub value: Option<f64>,
    pub color: &'static str,
}

/// Parse a backend value. Non-numeric or non-finite text yields `None`.
pub fn parse_value(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Convert "TEMPERATURA_AIRE" to "Temperatura aire"
pub fn format_name(name: &str) -> String {
    let lowered = name.replace('_', " ").to_lowercase();
    let mut chars = lowered.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn match_key(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}
