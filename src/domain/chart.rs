// Chart domain models
use serde::Serialize;

/// Series colors, assigned by position.
pub const PALETTE: [&str; 6] = [
    "#BF3131", "#00ADB5", "#FFB1B1", "#1679AB", "#FF0075", "#AE00FB",
];

pub fn palette_color(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderKind {
    Line,
    Bar,
}

impl RenderKind {
    /// Rainfall is drawn as bars, every other variable as a line.
    pub fn for_variable(variable_type: &str) -> Self {
        if variable_type.to_lowercase() == "lluvia" {
            RenderKind::Bar
        } else {
            RenderKind::Line
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartDataset {
    pub metric_label: String,
    pub values: Vec<Option<f64>>,
    /// Values as tick text; gaps stay empty.
    pub formatted: Vec<String>,
    pub color: &'static str,
}

impl ChartDataset {
    pub fn new(metric_label: String, values: Vec<Option<f64>>, color: &'static str) -> Self {
        let formatted = values
            .iter()
            .map(|value| value.map(|v| format_tick(&v.into())).unwrap_or_default())
            .collect();
        Self {
            metric_label,
            values,
            formatted,
            color,
        }
    }
}

/// One chart: a single variable measured at a single station.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub station_label: String,
    pub variable_type: String,
    pub variable_label: String,
    pub render: RenderKind,
    pub unit: String,
    pub icon: String,
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
}

impl ChartSeries {
    /// Every dataset has one slot per label.
    pub fn is_aligned(&self) -> bool {
        self.datasets
            .iter()
            .all(|dataset| dataset.values.len() == self.labels.len())
    }
}

/// Y-axis tick text: numbers get two decimals, anything else passes through.
pub fn format_tick(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Number(number) => match number.as_f64() {
            Some(v) => format!("{:.2}", v),
            None => number.to_string(),
        },
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
