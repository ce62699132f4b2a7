// Chart filter domain model
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeScale {
    #[serde(rename = "15min")]
    FifteenMin,
    #[serde(rename = "30min")]
    ThirtyMin,
    #[serde(rename = "hora")]
    Hour,
    #[serde(rename = "diaria")]
    Daily,
    #[serde(rename = "mensual")]
    Monthly,
    #[serde(rename = "rangoFechas")]
    DateRange,
}

impl TimeScale {
    /// Value of the `rango` query parameter.
    pub fn as_param(&self) -> &'static str {
        match self {
            TimeScale::FifteenMin => "15min",
            TimeScale::ThirtyMin => "30min",
            TimeScale::Hour => "hora",
            TimeScale::Daily => "diaria",
            TimeScale::Monthly => "mensual",
            TimeScale::DateRange => "rangoFechas",
        }
    }

    /// Scales served from the recent-window endpoint rather than history.
    pub fn is_recent_window(&self) -> bool {
        matches!(
            self,
            TimeScale::FifteenMin | TimeScale::ThirtyMin | TimeScale::Hour | TimeScale::Daily
        )
    }
}

/// Unvalidated filter as the user left it in the form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterDraft {
    pub scale: Option<TimeScale>,
    #[serde(default)]
    pub station: Option<String>,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("A time scale must be selected.")]
    MissingScale,
    #[error("A complete date range must be provided.")]
    IncompleteRange,
    #[error("The start date cannot be later than the end date.")]
    InvertedRange,
}

impl FilterError {
    pub fn field(&self) -> &'static str {
        match self {
            FilterError::MissingScale => "scale",
            FilterError::IncompleteRange | FilterError::InvertedRange => "range",
        }
    }
}

/// A validated, immutable chart filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterDescriptor {
    scale: TimeScale,
    station: Option<String>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

impl FilterDescriptor {
    pub fn scale(&self) -> TimeScale {
        self.scale
    }

    pub fn station(&self) -> Option<&str> {
        self.station.as_deref()
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    /// Backend path (with query string) serving this filter.
    pub fn query_path(&self) -> String {
        let mut path = if self.scale.is_recent_window() {
            format!("/mediciones/por-tiempo?rango={}", self.scale.as_param())
        } else {
            format!("/mediciones/historicas?rango={}", self.scale.as_param())
        };

        if let (Some(start), Some(end)) = (self.start, self.end) {
            path.push_str(&format!(
                "&fechaInicio={}&fechaFin={}",
                urlencoding::encode(&start.to_rfc3339_opts(SecondsFormat::Millis, true)),
                urlencoding::encode(&end.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ));
        }
        if let Some(station) = &self.station {
            path.push_str(&format!("&estacion={}", urlencoding::encode(station)));
        }
        path
    }
}

pub fn validate(draft: FilterDraft) -> Result<FilterDescriptor, FilterError> {
    let scale = draft.scale.ok_or(FilterError::MissingScale)?;
    let station = draft
        .station
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    if scale != TimeScale::DateRange {
        return Ok(FilterDescriptor {
            scale,
            station,
            start: None,
            end: None,
        });
    }

    match (draft.start, draft.end) {
        (Some(start), Some(end)) if start > end => Err(FilterError::InvertedRange),
        (Some(start), Some(end)) => Ok(FilterDescriptor {
            scale,
            station,
            start: Some(start),
            end: Some(end),
        }),
        _ => Err(FilterError::IncompleteRange),
    }
}
