//! Pure validation of raw form input.
//!
//! Validators never fail with an error type; they either answer a yes/no
//! question or collect user-facing messages into a [`FieldErrors`] map keyed
//! by form field.

use std::collections::BTreeMap;

use crate::generator::RandomReadingParams;
use crate::models::{NewReading, NewSensor, SensorId, SensorType};

// ---

/// Field name to message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (field, message)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

fn parse_finite(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn in_range(raw: &str, min: f64, max: f64) -> bool {
    parse_finite(raw).is_some_and(|v| (min..=max).contains(&v))
}

pub fn is_valid_latitude(raw: &str) -> bool {
    in_range(raw, -90.0, 90.0)
}

pub fn is_valid_longitude(raw: &str) -> bool {
    in_range(raw, -180.0, 180.0)
}

/// Any finite number is a valid temperature.
pub fn parse_temperature(raw: &str) -> Option<f64> {
    parse_finite(raw)
}

/// A selected sensor id from a form's sensor picker.
pub fn parse_sensor_id(raw: &str) -> Option<SensorId> {
    raw.trim().parse().ok()
}

/// A strictly positive whole number.
pub fn parse_count(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|&n| n > 0)
}

// ---

/// Raw sensor registration form.
#[derive(Debug, Clone, Default)]
pub struct SensorForm {
    pub name: String,
    pub latitude: String,
    pub longitude: String,
    pub sensor_type: SensorType,
}

/// Raw manual reading form.
#[derive(Debug, Clone, Default)]
pub struct ReadingForm {
    pub sensor_id: String,
    pub temperature: String,
}

/// Raw random batch form.
#[derive(Debug, Clone)]
pub struct RandomReadingForm {
    pub sensor_id: String,
    pub count: String,
    pub min_temperature: String,
    pub max_temperature: String,
}

impl Default for RandomReadingForm {
    fn default() -> Self {
        Self {
            sensor_id: String::new(),
            count: "10".to_string(),
            min_temperature: "20".to_string(),
            max_temperature: "30".to_string(),
        }
    }
}

const SELECT_SENSOR: &str = "Select a sensor.";

pub fn validate_sensor_form(form: &SensorForm) -> Result<NewSensor, FieldErrors> {
    // ---
    let mut errors = FieldErrors::new();

    let name = form.name.trim();
    if name.is_empty() {
        errors.insert("name", "Enter a name for the sensor.");
    }
    if !is_valid_latitude(&form.latitude) {
        errors.insert("latitude", "Latitude must be between -90 and 90.");
    }
    if !is_valid_longitude(&form.longitude) {
        errors.insert("longitude", "Longitude must be between -180 and 180.");
    }

    match (parse_finite(&form.latitude), parse_finite(&form.longitude)) {
        (Some(latitude), Some(longitude)) if errors.is_empty() => Ok(NewSensor {
            name: name.to_string(),
            latitude,
            longitude,
            sensor_type: form.sensor_type,
            created_at: None,
        }),
        _ => Err(errors),
    }
}

pub fn validate_reading_form(form: &ReadingForm) -> Result<NewReading, FieldErrors> {
    // ---
    let mut errors = FieldErrors::new();

    let sensor_id = parse_sensor_id(&form.sensor_id);
    if sensor_id.is_none() {
        errors.insert("sensorId", SELECT_SENSOR);
    }
    let temperature = parse_temperature(&form.temperature);
    if temperature.is_none() {
        errors.insert("temperature", "Enter a valid temperature (e.g. 23.5).");
    }

    match (sensor_id, temperature) {
        (Some(sensor_id), Some(temperature)) => Ok(NewReading {
            sensor_id,
            temperature,
            created_at: None,
        }),
        _ => Err(errors),
    }
}

/// Checks each field independently; min and max may come in either order.
pub fn validate_random_form(form: &RandomReadingForm) -> Result<RandomReadingParams, FieldErrors> {
    // ---
    let mut errors = FieldErrors::new();

    let sensor_id = parse_sensor_id(&form.sensor_id);
    if sensor_id.is_none() {
        errors.insert("sensorId", SELECT_SENSOR);
    }
    let count = parse_count(&form.count);
    if count.is_none() {
        errors.insert("count", "Enter a whole number greater than zero.");
    }
    let min = parse_temperature(&form.min_temperature);
    if min.is_none() {
        errors.insert("minTemperature", "Enter a valid minimum temperature.");
    }
    let max = parse_temperature(&form.max_temperature);
    if max.is_none() {
        errors.insert("maxTemperature", "Enter a valid maximum temperature.");
    }

    match (sensor_id, count, min, max) {
        (Some(sensor_id), Some(count), Some(min_temperature), Some(max_temperature)) => {
            Ok(RandomReadingParams {
                sensor_id,
                count,
                min_temperature,
                max_temperature,
            })
        }
        _ => Err(errors),
    }
}
