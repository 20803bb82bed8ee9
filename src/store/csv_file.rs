//! CSV file backend.
//!
//! One header row followed by one row per [`Record`], columns in
//! [`Record`] field order. Writes land in a sibling temp file that is then
//! renamed over the target.

use crate::error::{Result, StoreError};
use crate::record::Record;
use crate::store::Backend;
use csv::WriterBuilder;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::NamedTempFile;
use tracing::debug;

pub struct CsvFileBackend {
    path: PathBuf,
}

impl CsvFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvFileBackend { path: path.into() }
    }

    fn persist_err(&self, reason: impl ToString) -> StoreError {
        StoreError::Persist {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        }
    }
}

impl Backend for CsvFileBackend {
    fn read_all(&self) -> Result<Vec<Record>> {
        let file = File::open(&self.path).map_err(|source| StoreError::Unavailable {
            path: self.path.clone(),
            source,
        })?;
        let mut rdr = csv::Reader::from_reader(file);

        let mut records = Vec::new();
        for result in rdr.deserialize() {
            let record: Record = result.map_err(|e| StoreError::Corrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
            records.push(record);
        }

        debug!(path = %self.path.display(), rows = records.len(), "CSV store read");
        Ok(records)
    }

    fn write_all(&self, records: &[Record]) -> Result<()> {
        let tmp = NamedTempFile::new_in(self.parent_dir()).map_err(|e| self.persist_err(e))?;

        {
            let mut writer = WriterBuilder::new()
                .has_headers(true)
                .from_writer(tmp.as_file());
            for record in records {
                writer.serialize(record).map_err(|e| self.persist_err(e))?;
            }
            writer.flush().map_err(|e| self.persist_err(e))?;
        }
        tmp.as_file().sync_all().map_err(|e| self.persist_err(e))?;

        tmp.persist(&self.path)
            .map_err(|e| self.persist_err(e.error))?;

        debug!(path = %self.path.display(), rows = records.len(), "CSV store replaced");
        Ok(())
    }

    fn version(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).and_then(|m| m.modified()).ok()
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }
}
