//! Reporting sinks.
//!
//! The runner hands each completed cascade's snapshot to a sink. Buffering and
//! flushing are the sink's business.

use chrono::Utc;
use openbook_core::{Result, ReportConfig, SinkKind, Snapshot, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Destination for feature snapshots.
pub trait ReportSink {
    /// Record one snapshot.
    fn record(&mut self, snapshot: &Snapshot) -> Result<()>;

    /// Push buffered records to their destination.
    fn flush(&mut self) -> Result<()>;
}

impl<K: ReportSink + ?Sized> ReportSink for Box<K> {
    fn record(&mut self, snapshot: &Snapshot) -> Result<()> {
        (**self).record(snapshot)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// Open the sink selected by the report configuration.
pub fn open_sink(config: &ReportConfig) -> Result<Box<dyn ReportSink>> {
    match config.sink {
        SinkKind::Csv => {
            let sink = CsvSink::create(
                &config.reports_dir,
                config.file_name.as_deref(),
                config.flush_every_rows,
            )?;
            Ok(Box::new(sink))
        }
        SinkKind::Log => Ok(Box::new(LogSink::default())),
    }
}

pub const CSV_HEADER: &str = "ts_ms,seq,feature,value";

/// Appends `ts_ms,seq,feature,value` rows to a CSV file.
///
/// Undefined values and missing sequence numbers are written as empty fields.
pub struct CsvSink {
    path: PathBuf,
    writer: BufWriter<File>,
    flush_every_rows: usize,
    pending_rows: usize,
    rows_written: u64,
}

impl CsvSink {
    /// Create the report file inside `dir`.
    ///
    /// Without an explicit `file_name` the file is named after the current UTC
    /// time, e.g. `20240101_120000_000.csv`.
    pub fn create(dir: &Path, file_name: Option<&str>, flush_every_rows: usize) -> Result<Self> {
        let name = match file_name {
            Some(name) => name.to_string(),
            None => format!("{}.csv", Utc::now().format("%Y%m%d_%H%M%S_%3f")),
        };
        let path = dir.join(name);
        let mut writer = BufWriter::new(File::create(&path)?);
        writeln!(writer, "{}", CSV_HEADER)?;

        info!(path = %path.display(), "CSV report opened");
        Ok(Self {
            path,
            writer,
            flush_every_rows: flush_every_rows.max(1),
            pending_rows: 0,
            rows_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows written since creation, flushed or not.
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }
}

impl ReportSink for CsvSink {
    fn record(&mut self, snapshot: &Snapshot) -> Result<()> {
        for record in &snapshot.records {
            let seq = record.seq.map(|s| s.to_string()).unwrap_or_default();
            let value = match record.value {
                Value::Defined(v) => v.to_string(),
                Value::Undefined => String::new(),
            };
            writeln!(
                self.writer,
                "{},{},{},{}",
                record.ts_ms, seq, record.feature, value
            )?;
            self.pending_rows += 1;
            self.rows_written += 1;
        }

        if self.pending_rows >= self.flush_every_rows {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        debug!(rows = self.pending_rows, "CSV report flushed");
        self.pending_rows = 0;
        Ok(())
    }
}

impl Drop for CsvSink {
    fn drop(&mut self) {
        if let Err(e) = self.writer.flush() {
            warn!(path = %self.path.display(), error = %e, "Flushing CSV report on close failed");
        }
    }
}

/// Logs every record at info level.
#[derive(Debug, Default)]
pub struct LogSink {
    records: u64,
}

impl LogSink {
    pub fn records(&self) -> u64 {
        self.records
    }
}

impl ReportSink for LogSink {
    fn record(&mut self, snapshot: &Snapshot) -> Result<()> {
        for record in &snapshot.records {
            info!(
                ts_ms = record.ts_ms,
                seq = ?record.seq,
                feature = %record.feature,
                value = %record.value,
                "Feature"
            );
        }
        self.records += snapshot.records.len() as u64;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
