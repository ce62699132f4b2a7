// Station map service - Watershed stations with their latest readings
use crate::application::error::DashboardError;
use crate::application::observatory_repository::ObservatoryRepository;
use crate::domain::measurement::{MeasurementRecord, parse_value};
use crate::domain::network::{Microcuenca, Station};
use crate::infrastructure::config::AssetUrls;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;

/// Initial map view when a watershed has no placeable station.
pub const DEFAULT_CENTER: (f64, f64) = (-79.2, -4.0);
pub const DEFAULT_ZOOM: f64 = 12.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardReading {
    pub variable_type: String,
    pub value: Option<f64>,
    pub unit: String,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationCard {
    pub station: Station,
    pub picture_url: Option<String>,
    pub readings: Vec<CardReading>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub external_id: String,
    pub name: String,
    pub longitude: f64,
    pub latitude: f64,
}

/// South-west and north-east corners as (longitude, latitude).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapBounds {
    pub south_west: (f64, f64),
    pub north_east: (f64, f64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationMap {
    pub microcuenca_name: String,
    pub stations: Vec<StationCard>,
    pub markers: Vec<MapMarker>,
    pub bounds: Option<MapBounds>,
    pub center: (f64, f64),
    pub zoom: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatershedCard {
    pub microcuenca: Microcuenca,
    pub picture_url: Option<String>,
}

#[derive(Clone)]
pub struct StationMapService {
    repository: Arc<dyn ObservatoryRepository>,
    assets: AssetUrls,
}

impl StationMapService {
    pub fn new(repository: Arc<dyn ObservatoryRepository>, assets: AssetUrls) -> Self {
        Self { repository, assets }
    }

    /// Active watersheds available for selection on the map.
    pub async fn watersheds(&self, token: Option<&str>) -> Result<Vec<WatershedCard>, DashboardError> {
        let microcuencas = self.repository.microcuencas(token, true).await?;
        Ok(microcuencas
            .into_iter()
            .map(|microcuenca| WatershedCard {
                picture_url: microcuenca
                    .picture
                    .as_deref()
                    .map(|p| self.assets.microcuenca_picture(p)),
                microcuenca,
            })
            .collect())
    }

    /// Stations offered by the chart filter.
    pub async fn operative_stations(&self, token: Option<&str>) -> Result<Vec<Station>, DashboardError> {
        self.repository.operative_stations(token).await
    }

    /// Operative stations of a watershed, each with its latest readings.
    pub async fn station_map(
        &self,
        token: Option<&str>,
        microcuenca_id: &str,
    ) -> Result<StationMap, DashboardError> {
        let watershed = self.repository.watershed_stations(token, microcuenca_id).await?;

        let lookups = watershed.stations.iter().map(|station| async move {
            match self
                .repository
                .latest_station_measurements(token, &station.external_id)
                .await
            {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!(
                        "No latest readings for station {}: {}",
                        station.external_id,
                        e
                    );
                    Vec::new()
                }
            }
        });
        let readings = join_all(lookups).await;

        let stations: Vec<StationCard> = watershed
            .stations
            .into_iter()
            .zip(readings)
            .map(|(station, records)| StationCard {
                picture_url: station.picture.as_deref().map(|p| self.assets.station_picture(p)),
                readings: records.iter().map(|r| self.card_reading(r)).collect(),
                station,
            })
            .collect();

        let markers: Vec<MapMarker> = stations
            .iter()
            .filter_map(|card| {
                let (longitude, latitude) = card.station.coordinates()?;
                Some(MapMarker {
                    external_id: card.station.external_id.clone(),
                    name: card.station.name.clone(),
                    longitude,
                    latitude,
                })
            })
            .collect();
        let bounds = bounds_of(&markers);

        Ok(StationMap {
            microcuenca_name: watershed.microcuenca_name,
            center: bounds.map(|b| b.center()).unwrap_or(DEFAULT_CENTER),
            zoom: DEFAULT_ZOOM,
            stations,
            markers,
            bounds,
        })
    }

    fn card_reading(&self, record: &MeasurementRecord) -> CardReading {
        CardReading {
            variable_type: record.variable_type.clone(),
            value: parse_value(&record.value),
            unit: record.unit.clone().unwrap_or_default(),
            icon: record
                .icon
                .as_deref()
                .filter(|icon| !icon.is_empty())
                .map(|icon| self.assets.variable_icon(icon)),
        }
    }
}

impl MapBounds {
    pub fn center(&self) -> (f64, f64) {
        (
            (self.south_west.0 + self.north_east.0) / 2.0,
            (self.south_west.1 + self.north_east.1) / 2.0,
        )
    }
}

fn bounds_of(markers: &[MapMarker]) -> Option<MapBounds> {
    let first = markers.first()?;
    let mut bounds = MapBounds {
        south_west: (first.longitude, first.latitude),
        north_east: (first.longitude, first.latitude),
    };
    for marker in &markers[1..] {
        bounds.south_west.0 = bounds.south_west.0.min(marker.longitude);
        bounds.south_west.1 = bounds.south_west.1.min(marker.latitude);
        bounds.north_east.0 = bounds.north_east.0.max(marker.longitude);
        bounds.north_east.1 = bounds.north_east.1.max(marker.latitude);
    }
    Some(bounds)
}
