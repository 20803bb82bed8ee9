//! In-process backend whose clones share one versioned record set.

use crate::error::Result;
use crate::record::Record;
use crate::store::Backend;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Default)]
struct State {
    records: Vec<Record>,
    generation: u64,
    reads: usize,
    writes: usize,
}

/// In-process backend. Clones share the same record set.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<State>>,
}

impl MemoryBackend {
    pub fn new(records: Vec<Record>) -> Self {
        MemoryBackend {
            state: Arc::new(Mutex::new(State {
                records,
                generation: 1,
                ..Default::default()
            })),
        }
    }

    pub fn records(&self) -> Vec<Record> {
        self.state.lock().records.clone()
    }

    /// Swaps the record set as an outside writer would.
    pub fn replace(&self, records: Vec<Record>) {
        let mut state = self.state.lock();
        state.records = records;
        state.generation += 1;
    }

    pub fn reads(&self) -> usize {
        self.state.lock().reads
    }

    pub fn writes(&self) -> usize {
        self.state.lock().writes
    }
}

impl Backend for MemoryBackend {
    fn read_all(&self) -> Result<Vec<Record>> {
        let mut state = self.state.lock();
        state.reads += 1;
        Ok(state.records.clone())
    }

    fn write_all(&self, records: &[Record]) -> Result<()> {
        let mut state = self.state.lock();
        state.records = records.to_vec();
        state.generation += 1;
        state.writes += 1;
        Ok(())
    }

    fn version(&self) -> Option<SystemTime> {
        let generation = self.state.lock().generation;
        Some(UNIX_EPOCH + Duration::from_nanos(generation))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
