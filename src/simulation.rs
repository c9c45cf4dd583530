//! Real-time reading simulation for one sensor.
//!
//! A [`Simulation`] is either paused or running. While running it owns a
//! single tokio task that emits one reading per period: a bounded random walk
//! around the previous temperature, appended to the shared reading repository
//! (and so persisted) and published on a watch channel for live display.
//!
//! The task handle is released on every exit path: [`Simulation::pause`],
//! restarting for another sensor, and drop.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info};

use crate::error::SimulationError;
use crate::generator::round_to_tenth;
use crate::models::{now, NewReading, Sensor, SensorId};
use crate::repository::ReadingRepository;

// ---

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3);

/// Starting point of the walk when nothing has been emitted yet.
pub const BASELINE_TEMPERATURE: f64 = 24.0;

/// Largest change between consecutive readings, in either direction.
pub const MAX_STEP: f64 = 1.25;

pub const MIN_TEMPERATURE: f64 = -10.0;
pub const MAX_TEMPERATURE: f64 = 50.0;

/// Reading repository shared between the simulation task and its owner.
pub type SharedReadings = Arc<Mutex<ReadingRepository>>;

/// Next value of the walk, clamped to the simulated sensor's range.
pub fn next_temperature<R>(previous: Option<f64>, rng: &mut R) -> f64
where
    R: Rng + ?Sized,
{
    let base = previous.unwrap_or(BASELINE_TEMPERATURE);
    let step = rng.gen_range(-MAX_STEP..MAX_STEP);
    (base + step).clamp(MIN_TEMPERATURE, MAX_TEMPERATURE)
}

/// Resolve the sensor to simulate; only registered sensors can be selected.
pub fn select_sensor(sensors: &[Sensor], sensor_id: Option<SensorId>) -> Result<SensorId, SimulationError> {
    // ---
    let sensor_id = sensor_id.ok_or(SimulationError::NoSensorSelected)?;
    if sensors.iter().any(|sensor| sensor.id == sensor_id) {
        Ok(sensor_id)
    } else {
        Err(SimulationError::UnknownSensor(sensor_id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationState {
    Paused,
    Running { sensor_id: SensorId },
}

/// Last emitted value, for live display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveReading {
    pub temperature: Option<f64>,
    pub recorded_at: Option<DateTime<Utc>>,
}

struct Running {
    sensor_id: SensorId,
    task: JoinHandle<()>,
}

pub struct Simulation {
    readings: SharedReadings,
    period: Duration,
    live: Arc<watch::Sender<LiveReading>>,
    running: Option<Running>,
    seed: Option<f64>,
}

impl Simulation {
    pub fn new(readings: SharedReadings, period: Duration) -> Self {
        // ---
        let (live, _) = watch::channel(LiveReading::default());
        Self {
            readings,
            period,
            live: Arc::new(live),
            running: None,
            seed: None,
        }
    }

    /// Make the next start continue the walk from `temperature`, e.g. the
    /// sensor's last stored reading. Consumed by that start.
    pub fn resume_from(&mut self, temperature: f64) {
        self.seed = Some(temperature).filter(|t| t.is_finite());
    }

    pub fn state(&self) -> SimulationState {
        match &self.running {
            Some(running) => SimulationState::Running {
                sensor_id: running.sensor_id,
            },
            None => SimulationState::Paused,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Receiver for live updates; one value per emitted reading.
    pub fn subscribe(&self) -> watch::Receiver<LiveReading> {
        self.live.subscribe()
    }

    pub fn latest(&self) -> LiveReading {
        self.live.borrow().clone()
    }

    /// Start emitting for `sensor_id`. The first reading is emitted at once.
    ///
    /// Already running for the same sensor: nothing changes. Running for a
    /// different sensor: the old timer is cancelled before the new one starts.
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, sensor_id: Option<SensorId>) -> Result<(), SimulationError> {
        // ---
        let sensor_id = sensor_id.ok_or(SimulationError::NoSensorSelected)?;

        if let Some(running) = &self.running {
            if running.sensor_id == sensor_id {
                debug!(sensor_id, "Simulation already running");
                return Ok(());
            }
        }
        self.pause();

        let task = tokio::spawn(emit_loop(
            sensor_id,
            self.seed.take(),
            self.readings.clone(),
            self.live.clone(),
            self.period,
        ));
        self.running = Some(Running { sensor_id, task });

        info!(sensor_id, period_ms = self.period.as_millis() as u64, "Simulation started");
        Ok(())
    }

    /// Cancel the pending timer, if any.
    pub fn pause(&mut self) {
        // ---
        if let Some(running) = self.running.take() {
            running.task.abort();
            info!(sensor_id = running.sensor_id, "Simulation paused");
        }
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        self.pause();
    }
}

async fn emit_loop(
    sensor_id: SensorId,
    seed: Option<f64>,
    readings: SharedReadings,
    live: Arc<watch::Sender<LiveReading>>,
    period: Duration,
) {
    // ---
    let mut rng = StdRng::from_entropy();
    let mut previous = seed.or(live.borrow().temperature);
    let mut ticker = interval(period);

    loop {
        ticker.tick().await;

        let temperature = next_temperature(previous, &mut rng);
        previous = Some(temperature);
        let recorded_at = now();

        let reading = readings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .create(NewReading {
                sensor_id,
                temperature: round_to_tenth(temperature),
                created_at: Some(recorded_at),
            });

        live.send_replace(LiveReading {
            temperature: Some(temperature),
            recorded_at: Some(recorded_at),
        });

        debug!(
            sensor_id,
            reading_id = reading.id,
            temperature = reading.temperature,
            "Emitted simulated reading"
        );
    }
}
