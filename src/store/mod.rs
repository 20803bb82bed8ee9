//! The stats store: a locked, read-through cached view of a record backend.
//!
//! [`Backend`] abstracts where records live. [`CsvFileBackend`] is the
//! persisted strategy; [`MemoryBackend`] keeps everything in-process.
//! [`StatsStore`] serializes every read-modify-write behind one lock.

mod csv_file;
mod memory;

pub use csv_file::CsvFileBackend;
pub use memory::MemoryBackend;

use crate::error::{Result, StoreError};
use crate::record::{Observation, Record, normalize_course};
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// Reads and replaces the full record set.
pub trait Backend: Send + Sync {
    fn read_all(&self) -> Result<Vec<Record>>;

    /// Replaces the stored set with `records`.
    fn write_all(&self, records: &[Record]) -> Result<()>;

    /// Modification stamp; a change means cached data is stale.
    fn version(&self) -> Option<SystemTime>;

    fn describe(&self) -> String;
}

struct Snapshot {
    records: Arc<Vec<Record>>,
    version: Option<SystemTime>,
    loaded_at: DateTime<Utc>,
}

impl Snapshot {
    fn is_fresh(&self, version: Option<SystemTime>, ttl: TimeDelta, now: DateTime<Utc>) -> bool {
        version.is_some() && version == self.version && now - self.loaded_at < ttl
    }
}

pub struct StatsStore {
    backend: Box<dyn Backend>,
    ttl: TimeDelta,
    cache: Mutex<Option<Snapshot>>,
}

impl StatsStore {
    pub fn new(backend: impl Backend + 'static, cache_ttl: Duration) -> Self {
        StatsStore {
            backend: Box::new(backend),
            ttl: TimeDelta::from_std(cache_ttl).unwrap_or(TimeDelta::MAX),
            cache: Mutex::new(None),
        }
    }

    pub fn describe(&self) -> String {
        self.backend.describe()
    }

    /// Returns every record, from cache when the backend is unchanged.
    pub fn load(&self) -> Result<Arc<Vec<Record>>> {
        let mut cache = self.cache.lock();
        self.refresh_locked(&mut cache)
    }

    fn refresh_locked(&self, cache: &mut Option<Snapshot>) -> Result<Arc<Vec<Record>>> {
        let version = self.backend.version();
        let now = Utc::now();

        if let Some(snapshot) = cache.as_ref() {
            if snapshot.is_fresh(version, self.ttl, now) {
                return Ok(Arc::clone(&snapshot.records));
            }
        }

        let records = match self.read_validated() {
            Ok(records) => Arc::new(records),
            Err(e) => {
                *cache = None;
                return Err(e);
            }
        };
        debug!(
            backend = %self.backend.describe(),
            records = records.len(),
            "Reloaded record set"
        );

        *cache = Some(Snapshot {
            records: Arc::clone(&records),
            version,
            loaded_at: now,
        });
        Ok(records)
    }

    fn read_validated(&self) -> Result<Vec<Record>> {
        let records = self.backend.read_all()?;

        let mut seen = HashSet::with_capacity(records.len());
        for r in &records {
            if !seen.insert((r.university.as_str(), r.course.as_str())) {
                return Err(StoreError::DuplicateKey {
                    university: r.university.clone(),
                    course: r.course.clone(),
                });
            }
        }

        Ok(records)
    }

    /// Records whose normalized course equals the normalized query.
    #[tracing::instrument(skip(self))]
    pub fn find_by_course(&self, course: &str) -> Result<Vec<Record>> {
        let wanted = normalize_course(course);
        let records = self.load()?;

        Ok(records
            .iter()
            .filter(|r| r.matches_course(&wanted))
            .cloned()
            .collect())
    }

    /// Distinct courses offered by exactly `university`.
    #[tracing::instrument(skip(self))]
    pub fn courses_for_university(&self, university: &str) -> Result<BTreeSet<String>> {
        let records = self.load()?;

        Ok(records
            .iter()
            .filter(|r| r.university == university)
            .map(|r| r.course.clone())
            .collect())
    }

    pub fn universities(&self) -> Result<BTreeSet<String>> {
        Ok(self.load()?.iter().map(|r| r.university.clone()).collect())
    }

    pub fn courses(&self) -> Result<BTreeSet<String>> {
        Ok(self.load()?.iter().map(|r| r.course.clone()).collect())
    }

    /// Folds `observation` into the record keyed by exactly (`university`, `course`).
    ///
    /// Returns `Ok(None)` without writing when no such record exists.
    #[tracing::instrument(skip(self, observation))]
    pub fn apply_observation(
        &self,
        university: &str,
        course: &str,
        observation: &Observation,
    ) -> Result<Option<Record>> {
        let mut cache = self.cache.lock();

        // Read straight from the backend; the cached set may predate another writer.
        let mut records = self.read_validated()?;

        let Some(record) = records.iter_mut().find(|r| r.is_key(university, course)) else {
            warn!(university, course, "No record for submitted observation, ignoring");
            return Ok(None);
        };
        record.apply(observation);
        let updated = record.clone();

        if let Err(e) = self.backend.write_all(&records) {
            *cache = None;
            return Err(e);
        }

        *cache = Some(Snapshot {
            records: Arc::new(records),
            version: self.backend.version(),
            loaded_at: Utc::now(),
        });

        info!(
            university,
            course,
            gpa_count = updated.gpa_count,
            experience_count = updated.experience_count,
            "Observation applied"
        );
        Ok(Some(updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Metric;

    fn seeded() -> MemoryBackend {
        MemoryBackend::new(vec![
            Record::empty("Harvard", "MBA").with_metric(Metric::Gmat, 730.0, 4),
            Record::empty("Stanford", "MBA"),
            Record::empty("Stanford", "MS CS"),
            Record::empty("MIT", "Data Science"),
        ])
    }

    fn store(backend: &MemoryBackend) -> StatsStore {
        StatsStore::new(backend.clone(), Duration::from_secs(300))
    }

    #[test]
    fn test_find_by_course_normalizes_query() {
        let store = store(&seeded());

        let plain = store.find_by_course("mba").unwrap();
        assert_eq!(plain.len(), 2);
        assert_eq!(store.find_by_course("Mba").unwrap(), plain);
        assert_eq!(store.find_by_course(" MBA ").unwrap(), plain);
    }

    #[test]
    fn test_find_by_course_no_match_is_empty() {
        let store = store(&seeded());
        assert!(store.find_by_course("Law").unwrap().is_empty());
    }

    #[test]
    fn test_courses_for_university_exact_match() {
        let store = store(&seeded());

        let courses = store.courses_for_university("Stanford").unwrap();
        assert_eq!(
            courses.into_iter().collect::<Vec<_>>(),
            vec!["MBA".to_string(), "MS CS".to_string()]
        );
        assert!(store.courses_for_university("stanford").unwrap().is_empty());
        assert!(store.courses_for_university("Unknown U").unwrap().is_empty());
    }

    #[test]
    fn test_universities_and_courses_are_distinct() {
        let store = store(&seeded());

        assert_eq!(store.universities().unwrap().len(), 3);
        assert_eq!(store.courses().unwrap().len(), 3);
    }

    #[test]
    fn test_apply_observation_updates_and_persists() {
        let backend = seeded();
        let store = store(&backend);

        let observation = Observation::new(4.0, 3.8).with(Metric::Gmat, 750.0);
        let updated = store
            .apply_observation("Harvard", "MBA", &observation)
            .unwrap()
            .expect("record exists");

        assert_eq!(updated.gmat_count, 5);
        assert!((updated.gmat_average - 734.0).abs() < 1e-9);

        let persisted = backend.records();
        let harvard = persisted.iter().find(|r| r.is_key("Harvard", "MBA")).unwrap();
        assert_eq!(harvard, &updated);
    }

    #[test]
    fn test_apply_observation_unknown_key_is_noop() {
        let backend = seeded();
        let store = store(&backend);
        let before = backend.records();
        let writes = backend.writes();

        let result = store
            .apply_observation("Harvard", "mba", &Observation::new(1.0, 3.0))
            .unwrap();

        assert!(result.is_none());
        assert_eq!(backend.records(), before);
        assert_eq!(backend.writes(), writes);
    }

    #[test]
    fn test_load_is_cached_until_version_changes() {
        let backend = seeded();
        let store = store(&backend);

        store.load().unwrap();
        store.load().unwrap();
        assert_eq!(backend.reads(), 1);

        backend.replace(vec![Record::empty("Yale", "MBA")]);
        let records = store.load().unwrap();
        assert_eq!(backend.reads(), 2);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_zero_ttl_always_reloads() {
        let backend = seeded();
        let store = StatsStore::new(backend.clone(), Duration::ZERO);

        store.load().unwrap();
        store.load().unwrap();
        assert_eq!(backend.reads(), 2);
    }

    #[test]
    fn test_update_refreshes_cache_for_readers() {
        let backend = seeded();
        let store = store(&backend);

        store.load().unwrap();
        store
            .apply_observation("Stanford", "MBA", &Observation::new(5.0, 3.9))
            .unwrap();

        let reads_after_write = backend.reads();
        let stanford = store.find_by_course("mba").unwrap();
        assert_eq!(backend.reads(), reads_after_write);
        assert!(stanford.iter().any(|r| r.is_key("Stanford", "MBA") && r.gpa_count == 1));
    }

    #[test]
    fn test_duplicate_keys_are_rejected() {
        let backend = MemoryBackend::new(vec![
            Record::empty("A", "X"),
            Record::empty("A", "X"),
        ]);
        let store = store(&backend);

        assert!(matches!(
            store.load(),
            Err(StoreError::DuplicateKey { .. })
        ));
    }
}
