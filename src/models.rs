//! Data models for sensors and temperature readings.
//!
//! Records serialize to the persisted JSON shape directly: camelCase field
//! names and ISO-8601 timestamps with millisecond precision.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::repository::Record;
use crate::storage::{READINGS_KEY, SENSORS_KEY};

// ---

pub type SensorId = u64;
pub type ReadingId = u64;

/// Current time truncated to milliseconds, the resolution that survives
/// a persistence round-trip.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Where a sensor is installed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorType {
    Indoor,
    #[default]
    Outdoor,
}

impl std::str::FromStr for SensorType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // ---
        match s.trim().to_lowercase().as_str() {
            "indoor" => Ok(Self::Indoor),
            "outdoor" => Ok(Self::Outdoor),
            other => Err(format!("unknown sensor type `{other}`")),
        }
    }
}

/// A named, geolocated measurement point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sensor {
    // ---
    pub id: SensorId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    // Older stores have no `type` field.
    #[serde(rename = "type", default)]
    pub sensor_type: SensorType,
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
}

/// A timestamped temperature value attributed to a sensor.
///
/// `sensor_id` is a weak reference: the sensor may have been deleted since.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    // ---
    pub id: ReadingId,
    pub sensor_id: SensorId,
    pub temperature: f64,
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
}

/// Validated input for a new sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSensor {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub sensor_type: SensorType,
    pub created_at: Option<DateTime<Utc>>,
}

/// Validated input for a new reading.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReading {
    pub sensor_id: SensorId,
    pub temperature: f64,
    pub created_at: Option<DateTime<Utc>>,
}

impl Record for Sensor {
    // ---
    type Draft = NewSensor;
    const STORAGE_KEY: &'static str = SENSORS_KEY;
    const KIND: &'static str = "sensor";

    fn id(&self) -> u64 {
        self.id
    }

    fn from_draft(id: u64, draft: NewSensor) -> Self {
        Sensor {
            id,
            name: draft.name,
            latitude: draft.latitude,
            longitude: draft.longitude,
            sensor_type: draft.sensor_type,
            created_at: draft.created_at.unwrap_or_else(now),
        }
    }
}

impl Record for Reading {
    // ---
    type Draft = NewReading;
    const STORAGE_KEY: &'static str = READINGS_KEY;
    const KIND: &'static str = "reading";

    fn id(&self) -> u64 {
        self.id
    }

    fn from_draft(id: u64, draft: NewReading) -> Self {
        Reading {
            id,
            sensor_id: draft.sensor_id,
            temperature: draft.temperature,
            created_at: draft.created_at.unwrap_or_else(now),
        }
    }
}

/// `DateTime<Utc>` as `2025-03-26T18:45:00.000Z`.
pub(crate) mod iso_millis {
    // ---
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::{TimeZone, Timelike};

    fn create_test_sensor(id: SensorId, sensor_type: SensorType) -> Sensor {
        // ---
        Sensor {
            id,
            name: format!("Sensor {id}"),
            latitude: -27.5935,
            longitude: -48.5585,
            sensor_type,
            created_at: Utc.with_ymd_and_hms(2025, 3, 26, 18, 45, 0).unwrap(),
        }
    }

    #[test]
    fn test_sensor_json_shape() {
        // ---
        let sensor = create_test_sensor(3, SensorType::Indoor);
        let json = serde_json::to_value(&sensor).unwrap();

        assert_eq!(json["id"], 3);
        assert_eq!(json["type"], "indoor");
        assert_eq!(json["createdAt"], "2025-03-26T18:45:00.000Z");
        assert!(json.get("sensor_type").is_none());
    }

    #[test]
    fn test_reading_json_shape() {
        // ---
        let reading = Reading {
            id: 7,
            sensor_id: 2,
            temperature: 23.5,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
        };
        let json = serde_json::to_value(&reading).unwrap();

        assert_eq!(json["sensorId"], 2);
        assert_eq!(json["temperature"], 23.5);
        assert_eq!(json["createdAt"], "2025-01-01T12:00:00.000Z");
    }

    #[test]
    fn test_sensor_collection_round_trip() {
        // ---
        let sensors = vec![
            create_test_sensor(1, SensorType::Outdoor),
            create_test_sensor(2, SensorType::Indoor),
        ];

        let json = serde_json::to_string(&sensors).unwrap();
        let restored: Vec<Sensor> = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, sensors);
    }

    #[test]
    fn test_missing_type_defaults_to_outdoor() {
        // ---
        let json = r#"[{"id":4,"name":"Roof","latitude":10.5,"longitude":-20.25,
                        "createdAt":"2025-02-01T08:30:15.250Z"}]"#;
        let restored: Vec<Sensor> = serde_json::from_str(json).unwrap();

        assert_eq!(restored[0].sensor_type, SensorType::Outdoor);
        assert_eq!(restored[0].created_at.nanosecond(), 250_000_000);
    }

    #[test]
    fn test_offset_timestamps_normalized_to_utc() {
        // ---
        let json = r#"{"id":1,"sensorId":1,"temperature":20.0,
                       "createdAt":"2025-03-26T15:45:00-03:00"}"#;
        let reading: Reading = serde_json::from_str(json).unwrap();

        assert_eq!(reading.created_at.hour(), 18);
    }

    #[test]
    fn test_now_has_millisecond_resolution() {
        // ---
        let ts = now();
        assert_eq!(ts.nanosecond() % 1_000_000, 0);
    }

    #[test]
    fn test_draft_without_timestamp_is_stamped() {
        // ---
        let before = now();
        let reading = Reading::from_draft(
            9,
            NewReading {
                sensor_id: 1,
                temperature: 21.0,
                created_at: None,
            },
        );

        assert_eq!(reading.id, 9);
        assert!(reading.created_at >= before);
    }

    #[test]
    fn test_sensor_type_parsing() {
        // ---
        assert_eq!("Indoor".parse::<SensorType>(), Ok(SensorType::Indoor));
        assert_eq!(" outdoor ".parse::<SensorType>(), Ok(SensorType::Outdoor));
        assert!("basement".parse::<SensorType>().is_err());
    }
}
