//! Command-line entry point for the `sensor-registry` tool.
//!
//! This binary drives the library the way the browser screens would:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Opening the on-disk key-value store (falling back to memory)
//! - Dispatching one command against the hydrated repositories
//!
//! # Commands
//! ```text
//! list
//! sensor add <name> <lat> <lon> [indoor|outdoor]
//! sensor rm <id>
//! reading add <sensor-id> <temp>
//! reading random <sensor-id> <count> <min> <max>
//! reading rm <id>
//! history <sensor-id>
//! map [sensor-id]
//! simulate <sensor-id>
//! theme [toggle]
//! ```
//!
//! # Environment Variables
//! - `SENSOR_LOG_LEVEL` (optional) – log verbosity (default: `info`)
//! - `SENSOR_SPAN_EVENTS` (optional) – span event mode for tracing
//! - see [`sensor_registry::config`] for the rest
use std::{
    env,
    sync::{Arc, Mutex, PoisonError},
};

use anyhow::{anyhow, bail, Result};
use dotenvy::dotenv;
use is_terminal::IsTerminal;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use sensor_registry::display::{self, ChartSurface, GaugeScale, SeriesPoint};
use sensor_registry::simulation::select_sensor;
use sensor_registry::theme::ThemeMode;
use sensor_registry::validation::{self, RandomReadingForm, ReadingForm, SensorForm};
use sensor_registry::{
    config, Config, FileStore, KeyValueStore, MemoryStore, ReadingRepository, SensorRepository,
    SensorType, Simulation,
};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    init_tracing();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let store = open_store(&cfg);

    let args: Vec<String> = env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    match args.as_slice() {
        [] | ["list"] => list(store),
        ["sensor", "add", name, lat, lon, rest @ ..] => add_sensor(store, name, lat, lon, rest),
        ["sensor", "rm", id] => remove_sensor(store, id),
        ["reading", "add", sensor, temp] => add_reading(store, sensor, temp),
        ["reading", "random", sensor, count, min, max] => {
            random_readings(store, sensor, count, min, max)
        }
        ["reading", "rm", id] => remove_reading(store, id),
        ["history", sensor] => history(store, sensor),
        ["map"] => map(store, None),
        ["map", sensor] => map(store, Some(*sensor)),
        ["simulate", sensor] => simulate(&cfg, store, sensor).await,
        ["theme"] => theme(store, false),
        ["theme", "toggle"] => theme(store, true),
        _ => bail!("Unrecognized command: {}", args.join(" ")),
    }
}

// ---

/// Open the configured file store, or degrade to an in-memory one.
fn open_store(cfg: &Config) -> Arc<dyn KeyValueStore> {
    // ---
    match FileStore::open(&cfg.store_path, cfg.store_quota_bytes) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!(error = %e, "Cannot use store file, keeping data in memory only");
            Arc::new(MemoryStore::with_quota(cfg.store_quota_bytes))
        }
    }
}

fn parse_id(raw: &str) -> Result<u64> {
    validation::parse_sensor_id(raw).ok_or_else(|| anyhow!("Invalid id: {raw}"))
}

fn list(store: Arc<dyn KeyValueStore>) -> Result<()> {
    // ---
    let sensors = SensorRepository::hydrate(store.clone());
    let readings = ReadingRepository::hydrate(store.clone());

    println!("Theme: {}", ThemeMode::load(store.as_ref()));
    println!();
    println!("{:>4}  {:<24} {:>10} {:>11}  {:<8} Registered", "Id", "Name", "Latitude", "Longitude", "Type");
    for s in sensors.list() {
        let kind = match s.sensor_type {
            SensorType::Indoor => "indoor",
            SensorType::Outdoor => "outdoor",
        };
        println!(
            "{:>4}  {:<24} {:>10.6} {:>11.6}  {:<8} {}",
            s.id,
            s.name,
            s.latitude,
            s.longitude,
            kind,
            display::format_timestamp(&s.created_at)
        );
    }

    println!();
    println!("{:>4}  {:<24} {:>8}  Recorded", "Id", "Sensor", "°C");
    for row in display::reading_rows(sensors.list(), readings.list()) {
        println!(
            "{:>4}  {:<24} {:>8}  {}",
            row.reading_id, row.sensor, row.temperature, row.recorded_at
        );
    }
    Ok(())
}

fn add_sensor(
    store: Arc<dyn KeyValueStore>,
    name: &str,
    lat: &str,
    lon: &str,
    rest: &[&str],
) -> Result<()> {
    // ---
    let sensor_type = match rest {
        [] => SensorType::default(),
        [kind] => kind.parse::<SensorType>().map_err(|e| anyhow!(e))?,
        _ => bail!("Too many arguments for `sensor add`"),
    };

    let form = SensorForm {
        name: name.to_string(),
        latitude: lat.to_string(),
        longitude: lon.to_string(),
        sensor_type,
    };
    let draft = validation::validate_sensor_form(&form).map_err(|e| anyhow!("Invalid sensor: {e}"))?;

    let mut sensors = SensorRepository::hydrate(store);
    let sensor = sensors.create(draft);
    println!("Registered sensor #{} ({})", sensor.id, sensor.name);
    Ok(())
}

fn remove_sensor(store: Arc<dyn KeyValueStore>, raw_id: &str) -> Result<()> {
    // ---
    let id = parse_id(raw_id)?;
    let mut sensors = SensorRepository::hydrate(store);
    if sensors.delete(id) {
        println!("Removed sensor #{id}; its readings are kept");
    } else {
        println!("No sensor #{id}");
    }
    Ok(())
}

fn add_reading(store: Arc<dyn KeyValueStore>, sensor: &str, temp: &str) -> Result<()> {
    // ---
    let form = ReadingForm {
        sensor_id: sensor.to_string(),
        temperature: temp.to_string(),
    };
    let draft = validation::validate_reading_form(&form).map_err(|e| anyhow!("Invalid reading: {e}"))?;

    let mut readings = ReadingRepository::hydrate(store);
    let reading = readings.create(draft);
    println!("Recorded reading #{} ({:.1} °C)", reading.id, reading.temperature);
    Ok(())
}

fn random_readings(
    store: Arc<dyn KeyValueStore>,
    sensor: &str,
    count: &str,
    min: &str,
    max: &str,
) -> Result<()> {
    // ---
    let form = RandomReadingForm {
        sensor_id: sensor.to_string(),
        count: count.to_string(),
        min_temperature: min.to_string(),
        max_temperature: max.to_string(),
    };
    let params = validation::validate_random_form(&form).map_err(|e| anyhow!("Invalid batch: {e}"))?;

    let mut readings = ReadingRepository::hydrate(store);
    let batch = readings.generate_random(&params, &mut rand::thread_rng());
    println!("Generated {} readings for sensor #{}", batch.len(), params.sensor_id);
    Ok(())
}

fn remove_reading(store: Arc<dyn KeyValueStore>, raw_id: &str) -> Result<()> {
    // ---
    let id = parse_id(raw_id)?;
    let mut readings = ReadingRepository::hydrate(store);
    if readings.delete(id) {
        println!("Removed reading #{id}");
    } else {
        println!("No reading #{id}");
    }
    Ok(())
}

fn history(store: Arc<dyn KeyValueStore>, sensor: &str) -> Result<()> {
    // ---
    let sensor_id = parse_id(sensor)?;
    let sensors = SensorRepository::hydrate(store.clone());
    let readings = ReadingRepository::hydrate(store);

    println!("History for {}", display::sensor_label(sensors.list(), sensor_id));
    let series = display::history_series(&readings, sensor_id);
    if series.is_empty() {
        println!("No readings found for the selected sensor.");
        return Ok(());
    }
    TerminalChart.draw_series(&series);
    Ok(())
}

fn map(store: Arc<dyn KeyValueStore>, sensor: Option<&str>) -> Result<()> {
    // ---
    let selected = sensor.map(parse_id).transpose()?;
    let sensors = SensorRepository::hydrate(store);

    let view = display::map_view(sensors.list(), selected);
    println!(
        "Centre: {:.6}, {:.6}  zoom {}",
        view.center.0, view.center.1, view.zoom
    );
    println!("{}", display::osm_embed_url(view.center.0, view.center.1));
    Ok(())
}

async fn simulate(cfg: &Config, store: Arc<dyn KeyValueStore>, sensor: &str) -> Result<()> {
    // ---
    let sensors = SensorRepository::hydrate(store.clone());
    let sensor_id = match select_sensor(sensors.list(), validation::parse_sensor_id(sensor)) {
        Ok(id) => id,
        Err(e) => bail!("Cannot simulate `{sensor}`: {e}"),
    };

    let readings = ReadingRepository::hydrate(store);
    let last = readings.for_sensor(sensor_id).last().map(|reading| reading.temperature);
    let readings = Arc::new(Mutex::new(readings));

    let mut simulation = Simulation::new(readings.clone(), cfg.sim_interval);
    if let Some(temperature) = last {
        tracing::debug!(sensor_id, temperature, "Continuing from the last stored reading");
        simulation.resume_from(temperature);
    }
    let mut live = simulation.subscribe();
    simulation.start(Some(sensor_id))?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut chart = TerminalChart;
    let mut emitted = 0u32;
    loop {
        tokio::select! {
            changed = live.changed() => {
                if changed.is_err() {
                    break;
                }
                let latest = live.borrow_and_update().clone();
                if let (Some(value), Some(at)) = (latest.temperature, latest.recorded_at) {
                    print!("{}  ", display::format_timestamp(&at));
                    chart.draw_gauge(value);
                }
                emitted += 1;
                if cfg.sim_max_emissions > 0 && emitted >= cfg.sim_max_emissions {
                    break;
                }
            }
            _ = &mut ctrl_c => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }
    simulation.pause();

    let total = readings.lock().unwrap_or_else(PoisonError::into_inner).len();
    tracing::info!(emitted, total, "Simulation finished");
    Ok(())
}

fn theme(store: Arc<dyn KeyValueStore>, toggle: bool) -> Result<()> {
    // ---
    let mut mode = ThemeMode::load(store.as_ref());
    if toggle {
        mode = mode.toggled();
        mode.save(store.as_ref())?;
    }
    println!("Theme: {mode}");
    Ok(())
}

// ---

/// Text rendering of the history chart and the live gauge.
struct TerminalChart;

impl TerminalChart {
    const WIDTH: f64 = 40.0;

    fn bar(value: f64) -> String {
        let span = GaugeScale::MAX - GaugeScale::MIN;
        let filled = ((value.clamp(GaugeScale::MIN, GaugeScale::MAX) - GaugeScale::MIN) / span
            * Self::WIDTH)
            .round() as usize;
        "#".repeat(filled)
    }
}

impl ChartSurface for TerminalChart {
    fn draw_series(&mut self, points: &[SeriesPoint]) {
        for point in points {
            println!(
                "{}  {:>6.1} °C  {}",
                display::format_timestamp(&point.at),
                point.value,
                Self::bar(point.value)
            );
        }
    }

    fn draw_gauge(&mut self, value: f64) {
        let band = if value >= GaugeScale::RED_FROM {
            "high"
        } else if value >= GaugeScale::YELLOW_FROM {
            "warm"
        } else {
            "normal"
        };
        println!("{value:>6.1} °C  [{:<40}] {band}", Self::bar(value));
    }
}

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled, written to stderr so
///   command output on stdout stays clean
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `SENSOR_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by `RUST_LOG`, else the `SENSOR_LOG_LEVEL` env var
fn init_tracing() {
    // ---
    let span_events = match env::var("SENSOR_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stderr().is_terminal(),
    };

    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("SENSOR_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "info",
        };
        EnvFilter::new(level)
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
