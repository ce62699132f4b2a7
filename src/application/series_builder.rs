// Series builder - Shapes fetched measurement rows into chart series
use crate::domain::chart::{ChartDataset, ChartSeries, RenderKind, palette_color};
use crate::domain::filter::{FilterDescriptor, TimeScale};
use crate::domain::measurement::{
    AggregatedRecord, MeasurementBatch, MeasurementRecord, format_name,
};
use chrono::{DateTime, Datelike, FixedOffset, NaiveTime, Timelike};
use std::collections::BTreeSet;

const MONTHS: [&str; 12] = [
    "ene", "feb", "mar", "abr", "may", "jun", "jul", "ago", "sept", "oct", "nov", "dic",
];

/// Build one series per (station, variable) pair. Stations keep first-seen
/// order and so do variables within a station.
pub fn build_series(filter: &FilterDescriptor, batch: &MeasurementBatch) -> Vec<ChartSeries> {
    let series = match batch {
        MeasurementBatch::Raw(rows) => build_raw(rows),
        MeasurementBatch::Aggregated(rows) => build_aggregated(filter.scale(), rows),
    };
    tracing::debug!("Built {} series from {} rows", series.len(), batch.len());
    series
}

fn first_seen<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen: Vec<&str> = Vec::new();
    for value in values {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}

fn build_raw(rows: &[MeasurementRecord]) -> Vec<ChartSeries> {
    let mut series = Vec::new();

    for (station_index, station) in first_seen(rows.iter().map(|r| r.station.as_str()))
        .into_iter()
        .enumerate()
    {
        let station_rows: Vec<&MeasurementRecord> =
            rows.iter().filter(|r| r.station == station).collect();

        // Clock times only; records from different days sharing a time merge.
        let times: BTreeSet<NaiveTime> = station_rows
            .iter()
            .filter_map(|r| r.timestamp.as_ref().map(clock_time))
            .collect();
        let labels: Vec<String> = times.iter().map(|t| t.format("%H:%M").to_string()).collect();

        for variable in first_seen(station_rows.iter().map(|r| r.variable_type.as_str())) {
            let variable_rows: Vec<&MeasurementRecord> = station_rows
                .iter()
                .copied()
                .filter(|r| r.variable_type == variable)
                .collect();

            let values = times
                .iter()
                .map(|time| {
                    variable_rows
                        .iter()
                        .find(|r| r.timestamp.as_ref().map(clock_time) == Some(*time))
                        .and_then(|r| r.numeric_value())
                })
                .collect();

            let first = variable_rows.first();
            let color = palette_color(station_index + series.len());
            series.push(ChartSeries {
                station_label: station.to_string(),
                variable_type: variable.to_string(),
                variable_label: format_name(variable),
                render: RenderKind::for_variable(variable),
                unit: first.and_then(|r| r.unit.clone()).unwrap_or_default(),
                icon: first.and_then(|r| r.icon.clone()).unwrap_or_default(),
                labels: labels.clone(),
                datasets: vec![ChartDataset::new(format_name(variable), values, color)],
            });
        }
    }

    series
}

fn build_aggregated(scale: TimeScale, rows: &[AggregatedRecord]) -> Vec<ChartSeries> {
    let mut series = Vec::new();

    for (station_index, station) in first_seen(rows.iter().map(|r| r.station.as_str()))
        .into_iter()
        .enumerate()
    {
        let station_rows: Vec<&AggregatedRecord> =
            rows.iter().filter(|r| r.station == station).collect();

        let mut ordered: Vec<(&DateTime<FixedOffset>, &AggregatedRecord)> = station_rows
            .iter()
            .filter_map(|&r| r.timestamp.as_ref().map(|t| (t, r)))
            .collect();
        ordered.sort_by_key(|(timestamp, _)| **timestamp);
        if ordered.len() < station_rows.len() {
            tracing::debug!(
                "Dropped {} aggregated rows without timestamp for {}",
                station_rows.len() - ordered.len(),
                station
            );
        }
        let labels: Vec<String> = ordered
            .iter()
            .map(|(timestamp, _)| aggregated_label(scale, timestamp))
            .collect();

        let variables = first_seen(
            station_rows
                .iter()
                .flat_map(|r| r.variables.iter().map(|(name, _)| name.as_str())),
        );

        for variable in variables {
            let Some(metadata) = station_rows.iter().find_map(|r| r.group(variable)) else {
                continue;
            };
            let color_base = station_index + series.len();

            let datasets = metadata
                .metric_names()
                .enumerate()
                .map(|(offset, metric)| {
                    let values = ordered
                        .iter()
                        .map(|(_, row)| row.group(variable).and_then(|g| g.metric(metric)))
                        .collect();
                    ChartDataset::new(
                        format_name(&metric.to_uppercase()),
                        values,
                        palette_color(color_base + offset),
                    )
                })
                .collect();

            series.push(ChartSeries {
                station_label: station.to_string(),
                variable_type: variable.to_string(),
                variable_label: format_name(variable),
                render: RenderKind::for_variable(variable),
                unit: metadata.unit.clone().unwrap_or_default(),
                icon: metadata.icon.clone().unwrap_or_default(),
                labels: labels.clone(),
                datasets,
            });
        }
    }

    series
}

fn clock_time(timestamp: &DateTime<FixedOffset>) -> NaiveTime {
    let time = timestamp.time();
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

fn aggregated_label(scale: TimeScale, timestamp: &DateTime<FixedOffset>) -> String {
    let month = MONTHS[timestamp.month0() as usize];
    match scale {
        TimeScale::Monthly => format!("{} {}", month, timestamp.year()),
        TimeScale::Daily => timestamp.format("%H:%M").to_string(),
        _ => format!("{:02} {}", timestamp.day(), month),
    }
}
