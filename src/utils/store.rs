use std::{
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
};

use csv::{ReaderBuilder, Writer, WriterBuilder};

use crate::error::PersistenceError;

use super::stats::MetricRecord;

/// Somewhere metric records are kept between harvesting and analysis.
pub trait ResultStore {
    fn connect(&mut self) -> Result<(), PersistenceError>;

    /// Returns the number of matching rows and the rows themselves.
    fn pull(&mut self, query: &RecordQuery) -> Result<(usize, Vec<MetricRecord>), PersistenceError>;

    fn push(&mut self, records: &[MetricRecord]) -> Result<(), PersistenceError>;

    fn close(&mut self) -> Result<(), PersistenceError>;
}

/// Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
    pub test_run_id: Option<String>,
    pub test_name: Option<String>,
}

impl RecordQuery {
    fn matches(&self, record: &MetricRecord) -> bool {
        self.test_run_id
            .as_ref()
            .map_or(true, |id| *id == record.test_run_id)
            && self
                .test_name
                .as_ref()
                .map_or(true, |name| *name == record.test_name)
    }
}

/// Keeps records as rows of a CSV file, appending on every push.
pub struct CsvResultStore {
    path: PathBuf,
    writer: Option<Writer<File>>,
}

impl CsvResultStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn csv_err(&self, source: csv::Error) -> PersistenceError {
        PersistenceError::Csv {
            path: self.path.clone(),
            source,
        }
    }

    fn writer(&mut self) -> Result<&mut Writer<File>, PersistenceError> {
        let path = self.path.clone();
        self.writer
            .as_mut()
            .ok_or(PersistenceError::NotConnected(path))
    }
}

impl ResultStore for CsvResultStore {
    fn connect(&mut self) -> Result<(), PersistenceError> {
        if self.writer.is_some() {
            return Ok(());
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_err(e))?;
        let empty = file.metadata().map_err(|e| self.io_err(e))?.len() == 0;

        // the header row goes in only once, when the store is created
        self.writer = Some(WriterBuilder::new().has_headers(empty).from_writer(file));
        debug!("store: {} connected", self.path.display());
        Ok(())
    }

    fn pull(&mut self, query: &RecordQuery) -> Result<(usize, Vec<MetricRecord>), PersistenceError> {
        self.writer()?.flush().map_err(|e| self.io_err(e))?;

        let mut reader = ReaderBuilder::new()
            .from_path(&self.path)
            .map_err(|e| self.csv_err(e))?;
        let mut rows = Vec::new();
        for record in reader.deserialize::<MetricRecord>() {
            let record = record.map_err(|e| self.csv_err(e))?;
            if query.matches(&record) {
                rows.push(record);
            }
        }

        Ok((rows.len(), rows))
    }

    fn push(&mut self, records: &[MetricRecord]) -> Result<(), PersistenceError> {
        let path = self.path.clone();
        let writer = self.writer()?;
        for r in records {
            writer.serialize(r).map_err(|source| PersistenceError::Csv {
                path: path.clone(),
                source,
            })?;
        }
        writer
            .flush()
            .map_err(|source| PersistenceError::Io { path, source })?;
        info!("store: {}; pushed {} records", self.path.display(), records.len());
        Ok(())
    }

    fn close(&mut self) -> Result<(), PersistenceError> {
        if let Some(mut w) = self.writer.take() {
            w.flush().map_err(|e| self.io_err(e))?;
        }
        Ok(())
    }
}
