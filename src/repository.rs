//! Ordered, persisted collections of sensors and readings.
//!
//! A [`Repository`] is authoritative for its records once hydrated: the
//! in-memory list is the source of truth and the key-value store is a
//! re-computable copy, rewritten in full after every mutation.

use std::sync::Arc;

use rand::Rng;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, info, warn};

use crate::allocator::IdAllocator;
use crate::error::{StorageError, StorageResult};
use crate::generator::{generate_random_readings, RandomReadingParams};
use crate::models::{Reading, Sensor, SensorId};
use crate::storage::KeyValueStore;

// ---

/// A persistable entity with an allocator-assigned id.
pub trait Record: Clone + Serialize + DeserializeOwned {
    /// Validated input the repository turns into a record.
    type Draft;

    /// Key the whole collection is stored under.
    const STORAGE_KEY: &'static str;

    /// Name used in log messages.
    const KIND: &'static str;

    fn id(&self) -> u64;

    fn from_draft(id: u64, draft: Self::Draft) -> Self;
}

pub type SensorRepository = Repository<Sensor>;
pub type ReadingRepository = Repository<Reading>;

/// In-memory collection in insertion order, synchronized to a store.
pub struct Repository<T: Record> {
    items: Vec<T>,
    ids: IdAllocator,
    store: Arc<dyn KeyValueStore>,
    persistent: bool,
}

impl<T: Record> std::fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("kind", &T::KIND)
            .field("len", &self.items.len())
            .field("next_id", &self.ids.peek())
            .field("persistent", &self.persistent)
            .finish()
    }
}

impl<T: Record> Repository<T> {
    /// Load the persisted collection and reinitialize the id allocator.
    ///
    /// Unreadable data is logged and the repository starts empty; the next
    /// mutation overwrites it.
    pub fn hydrate(store: Arc<dyn KeyValueStore>) -> Self {
        // ---
        let items = match load::<T>(store.as_ref()) {
            Ok(items) => items,
            Err(e) => {
                warn!(kind = T::KIND, error = %e, "Could not load persisted records, starting empty");
                Vec::new()
            }
        };

        let mut ids = IdAllocator::new();
        ids.reinitialize(items.iter().map(|item| item.id()));

        info!(kind = T::KIND, count = items.len(), next_id = ids.peek(), "Hydrated repository");

        Self {
            items,
            ids,
            store,
            persistent: true,
        }
    }

    /// Allocate an id for `draft`, append it and persist.
    pub fn create(&mut self, draft: T::Draft) -> T {
        // ---
        let record = T::from_draft(self.ids.next(), draft);
        debug!(kind = T::KIND, id = record.id(), "Created record");
        self.items.push(record.clone());
        self.sync();
        record
    }

    /// Append several drafts with sequential ids, persisting once.
    pub fn create_many<I>(&mut self, drafts: I) -> Vec<T>
    where
        I: IntoIterator<Item = T::Draft>,
    {
        // ---
        let created: Vec<T> = drafts
            .into_iter()
            .map(|draft| T::from_draft(self.ids.next(), draft))
            .collect();
        self.append(created.clone());
        created
    }

    /// Remove the record with `id`. Absent ids are a no-op.
    pub fn delete(&mut self, id: u64) -> bool {
        // ---
        let before = self.items.len();
        self.items.retain(|item| item.id() != id);

        let removed = self.items.len() != before;
        if removed {
            debug!(kind = T::KIND, id, "Deleted record");
            self.sync();
        }
        removed
    }

    pub fn list(&self) -> &[T] {
        &self.items
    }

    pub fn get(&self, id: u64) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// False once a write has failed and the repository went memory-only.
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    fn append(&mut self, records: Vec<T>) {
        if records.is_empty() {
            return;
        }
        debug!(kind = T::KIND, count = records.len(), "Appended records");
        self.items.extend(records);
        self.sync();
    }

    fn sync(&mut self) {
        // ---
        if !self.persistent {
            return;
        }
        if let Err(e) = save(self.store.as_ref(), &self.items) {
            error!(
                kind = T::KIND,
                error = %e,
                "Failed to persist records, continuing in memory only"
            );
            self.persistent = false;
        }
    }
}

impl Repository<Reading> {
    /// Readings of one sensor, oldest first.
    pub fn for_sensor(&self, sensor_id: SensorId) -> Vec<&Reading> {
        // ---
        let mut readings: Vec<&Reading> = self
            .items
            .iter()
            .filter(|reading| reading.sensor_id == sensor_id)
            .collect();
        readings.sort_by_key(|reading| reading.created_at);
        readings
    }

    /// Generate a random batch, append it and persist once.
    pub fn generate_random<R>(&mut self, params: &RandomReadingParams, rng: &mut R) -> Vec<Reading>
    where
        R: Rng + ?Sized,
    {
        let batch = generate_random_readings(params, &mut self.ids, rng);
        self.append(batch.clone());
        batch
    }
}

fn load<T: Record>(store: &dyn KeyValueStore) -> StorageResult<Vec<T>> {
    // ---
    match store.get(T::STORAGE_KEY)? {
        None => Ok(Vec::new()),
        Some(raw) => serde_json::from_str(&raw).map_err(|source| StorageError::Corrupt {
            key: T::STORAGE_KEY.to_string(),
            source,
        }),
    }
}

fn save<T: Record>(store: &dyn KeyValueStore, items: &[T]) -> StorageResult<()> {
    // ---
    let json = serde_json::to_string(items).map_err(|source| StorageError::Encode {
        key: T::STORAGE_KEY.to_string(),
        source,
    })?;
    store.set(T::STORAGE_KEY, &json)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::{NewReading, NewSensor, SensorType};
    use crate::storage::{MemoryStore, READINGS_KEY, SENSORS_KEY};
    use crate::validation::{validate_random_form, RandomReadingForm};
    use chrono::{TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn new_sensor(name: &str) -> NewSensor {
        // ---
        NewSensor {
            name: name.to_string(),
            latitude: -27.59,
            longitude: -48.55,
            sensor_type: SensorType::Outdoor,
            created_at: None,
        }
    }

    fn new_reading(sensor_id: SensorId, temperature: f64, minute: u32) -> NewReading {
        // ---
        NewReading {
            sensor_id,
            temperature,
            created_at: Some(Utc.with_ymd_and_hms(2025, 5, 1, 10, minute, 0).unwrap()),
        }
    }

    #[test]
    fn test_create_assigns_sequential_ids_and_persists() {
        // ---
        let store = Arc::new(MemoryStore::new());
        let mut sensors = SensorRepository::hydrate(store.clone());

        let a = sensors.create(new_sensor("A"));
        let b = sensors.create(new_sensor("B"));

        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(sensors.list().iter().map(|s| s.name.as_str()).collect::<Vec<_>>(), ["A", "B"]);

        let stored: Vec<Sensor> = serde_json::from_str(&store.get(SENSORS_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored, sensors.list());
    }

    #[test]
    fn test_hydrate_reinitializes_ids() {
        // ---
        let store = Arc::new(MemoryStore::new());
        {
            let mut sensors = SensorRepository::hydrate(store.clone());
            for name in ["A", "B", "C"] {
                sensors.create(new_sensor(name));
            }
            sensors.delete(3);
            sensors.delete(1);
        }

        let mut sensors = SensorRepository::hydrate(store);
        assert_eq!(sensors.len(), 1);
        assert_eq!(sensors.create(new_sensor("D")).id, 3);
    }

    #[test]
    fn test_delete_absent_is_noop() {
        // ---
        let store = Arc::new(MemoryStore::new());
        let mut readings = ReadingRepository::hydrate(store.clone());
        readings.create(new_reading(1, 20.0, 0));

        assert!(!readings.delete(42));
        assert!(readings.delete(1));
        assert!(!readings.delete(1));
        assert!(readings.is_empty());
        assert_eq!(store.get(READINGS_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_corrupt_store_starts_empty_then_overwrites() {
        // ---
        let store = Arc::new(MemoryStore::new());
        store.set(READINGS_KEY, "{broken").unwrap();

        let mut readings = ReadingRepository::hydrate(store.clone());
        assert!(readings.is_empty());
        assert!(readings.is_persistent());

        let created = readings.create(new_reading(1, 18.5, 0));
        assert_eq!(created.id, 1);

        let stored: Vec<Reading> = serde_json::from_str(&store.get(READINGS_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored, vec![created]);
    }

    #[test]
    fn test_quota_failure_degrades_to_memory() {
        // ---
        let store = Arc::new(MemoryStore::with_quota(200));
        let mut readings = ReadingRepository::hydrate(store.clone());

        readings.create(new_reading(1, 20.0, 0));
        assert!(readings.is_persistent());

        for minute in 1..10 {
            readings.create(new_reading(1, 20.0, minute));
        }

        assert!(!readings.is_persistent());
        assert_eq!(readings.len(), 10);

        let stored: Vec<Reading> = serde_json::from_str(&store.get(READINGS_KEY).unwrap().unwrap()).unwrap();
        assert!(stored.len() < 10);
    }

    #[test]
    fn test_for_sensor_filters_and_sorts_by_time() {
        // ---
        let store = Arc::new(MemoryStore::new());
        let mut readings = ReadingRepository::hydrate(store);

        readings.create(new_reading(1, 21.0, 30));
        readings.create(new_reading(2, 99.0, 10));
        readings.create(new_reading(1, 19.0, 5));

        let series: Vec<f64> = readings.for_sensor(1).iter().map(|r| r.temperature).collect();
        assert_eq!(series, vec![19.0, 21.0]);
        assert!(readings.for_sensor(3).is_empty());
    }

    #[test]
    fn test_create_many_and_generate_random_continue_sequence() {
        // ---
        let store = Arc::new(MemoryStore::new());
        let mut readings = ReadingRepository::hydrate(store);
        readings.create_many([new_reading(1, 20.0, 0), new_reading(1, 21.0, 1)]);

        let mut rng = StdRng::seed_from_u64(7);
        let params = RandomReadingParams {
            sensor_id: 1,
            count: 3,
            min_temperature: 10.0,
            max_temperature: 12.0,
        };
        let batch = readings.generate_random(&params, &mut rng);

        assert_eq!(batch.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(readings.len(), 5);
    }

    #[test]
    fn test_extreme_random_bounds_survive_a_reload() {
        // ---
        let store = Arc::new(MemoryStore::new());
        let mut readings = ReadingRepository::hydrate(store.clone());
        let mut rng = StdRng::seed_from_u64(3);

        for (min, max) in [("-1e308", "1e308"), ("1.7e308", "1.7e308")] {
            let form = RandomReadingForm {
                sensor_id: "1".to_string(),
                count: "2".to_string(),
                min_temperature: min.to_string(),
                max_temperature: max.to_string(),
            };
            let params = validate_random_form(&form).unwrap();
            let batch = readings.generate_random(&params, &mut rng);
            assert!(batch.iter().all(|r| r.temperature.is_finite()));
        }
        assert!(readings.is_persistent());

        let reloaded = ReadingRepository::hydrate(store);
        assert_eq!(reloaded.len(), 4);
        assert_eq!(reloaded.list(), readings.list());
    }

    #[test]
    fn test_deleting_sensor_keeps_its_readings() {
        // ---
        let store = Arc::new(MemoryStore::new());
        let mut sensors = SensorRepository::hydrate(store.clone());
        let mut readings = ReadingRepository::hydrate(store);

        let sensor = sensors.create(new_sensor("Lab"));
        readings.create(new_reading(sensor.id, 22.0, 0));

        sensors.delete(sensor.id);

        assert!(sensors.get(sensor.id).is_none());
        assert_eq!(readings.for_sensor(sensor.id).len(), 1);
    }
}
