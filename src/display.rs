//! Plain-data views for the presentation layer.
//!
//! Tables, charts and maps are rendered elsewhere. This module only shapes
//! records into what those widgets consume, and defines [`ChartSurface`], the
//! narrow interface a charting adapter implements.

use chrono::{DateTime, Utc};

use crate::models::{Reading, Sensor, SensorId};
use crate::repository::ReadingRepository;

// ---

/// Label shown for a reading whose sensor no longer exists.
pub const REMOVED_SENSOR_LABEL: &str = "Sensor removed";

/// Name of the sensor with `sensor_id`, or [`REMOVED_SENSOR_LABEL`].
pub fn sensor_label(sensors: &[Sensor], sensor_id: SensorId) -> &str {
    sensors
        .iter()
        .find(|sensor| sensor.id == sensor_id)
        .map_or(REMOVED_SENSOR_LABEL, |sensor| sensor.name.as_str())
}

/// One row of the readings table.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingRow {
    pub reading_id: u64,
    pub sensor: String,
    pub temperature: String,
    pub recorded_at: String,
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%d/%m/%Y %H:%M").to_string()
}

/// Table rows in insertion order.
pub fn reading_rows(sensors: &[Sensor], readings: &[Reading]) -> Vec<ReadingRow> {
    // ---
    readings
        .iter()
        .map(|reading| ReadingRow {
            reading_id: reading.id,
            sensor: sensor_label(sensors, reading.sensor_id).to_string(),
            temperature: format!("{:.1}", reading.temperature),
            recorded_at: format_timestamp(&reading.created_at),
        })
        .collect()
}

// ---

/// A timestamp/value pair of a line chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub at: DateTime<Utc>,
    pub value: f64,
}

/// Temperature history of one sensor, oldest first.
pub fn history_series(readings: &ReadingRepository, sensor_id: SensorId) -> Vec<SeriesPoint> {
    readings
        .for_sensor(sensor_id)
        .into_iter()
        .map(|reading| SeriesPoint {
            at: reading.created_at,
            value: reading.temperature,
        })
        .collect()
}

/// Gauge bands for the live reading, in °C.
pub struct GaugeScale;

impl GaugeScale {
    pub const MIN: f64 = -10.0;
    pub const MAX: f64 = 50.0;
    pub const YELLOW_FROM: f64 = 25.0;
    pub const YELLOW_TO: f64 = 35.0;
    pub const RED_FROM: f64 = 35.0;
    pub const RED_TO: f64 = 50.0;
}

/// Something that can draw a line series and a gauge.
pub trait ChartSurface {
    fn draw_series(&mut self, points: &[SeriesPoint]);

    fn draw_gauge(&mut self, value: f64);
}

// ---

/// Default map centre (Florianópolis) when no sensor is registered.
pub const DEFAULT_CENTER: (f64, f64) = (-27.5954, -48.548);

/// Zoom for a map showing a single sensor.
pub const SINGLE_SENSOR_ZOOM: u8 = 14;

/// Zoom for a map showing several (or no) sensors.
pub const OVERVIEW_ZOOM: u8 = 4;

/// Half-width of the embedded map's bounding box, in degrees.
pub const EMBED_DELTA: f64 = 0.01;

/// Centre and zoom for a tile-layer map widget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    pub center: (f64, f64),
    pub zoom: u8,
}

/// Centre on the selected sensor, else the first one, else the default.
pub fn map_view(sensors: &[Sensor], selected: Option<SensorId>) -> MapView {
    // ---
    let center = selected
        .and_then(|id| sensors.iter().find(|sensor| sensor.id == id))
        .or_else(|| sensors.first())
        .map_or(DEFAULT_CENTER, |sensor| (sensor.latitude, sensor.longitude));

    let zoom = if sensors.len() == 1 {
        SINGLE_SENSOR_ZOOM
    } else {
        OVERVIEW_ZOOM
    };

    MapView { center, zoom }
}

/// OpenStreetMap embed URL for an iframe, with a marker on the point.
pub fn osm_embed_url(latitude: f64, longitude: f64) -> String {
    // ---
    let bbox = format!(
        "{},{},{},{}",
        longitude - EMBED_DELTA,
        latitude - EMBED_DELTA,
        longitude + EMBED_DELTA,
        latitude + EMBED_DELTA
    );

    format!(
        "https://www.openstreetmap.org/export/embed.html?bbox={}&layer=mapnik&marker={latitude},{longitude}",
        bbox.replace(',', "%2C")
    )
}
