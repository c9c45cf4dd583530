//! Temperature sensor registry.
//!
//! Sensors (named, geolocated measurement points) and their temperature
//! readings live in ordered in-memory repositories, each with its own id
//! allocator, mirrored to an injected key-value store. Readings can be entered
//! manually, generated in random batches, or emitted periodically by a
//! simulated real-time feed.
//!
//! Module layout:
//! - `models`, `allocator`: records and id bookkeeping
//! - `storage`, `repository`: persistence and the collections built on it
//! - `validation`, `generator`, `simulation`: ways readings come in
//! - `display`, `theme`: plain data for whatever renders the UI
//! - `config`, `error`: ambient plumbing

pub mod allocator;
pub mod config;
pub mod display;
pub mod error;
pub mod generator;
pub mod models;
pub mod repository;
pub mod simulation;
pub mod storage;
pub mod theme;
pub mod validation;

pub use config::Config;
pub use error::{SimulationError, StorageError};
pub use models::{NewReading, NewSensor, Reading, Sensor, SensorType};
pub use repository::{ReadingRepository, SensorRepository};
pub use simulation::Simulation;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
