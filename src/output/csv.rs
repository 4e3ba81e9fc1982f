//! CSV output writer

use crate::Table;
use csv::Writer;
use serde_json::Value;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info};

use super::{OutputError, OutputResult, OutputWriter, TableWriter};

const DEFAULT_BUFFER_SIZE: usize = 8192; // 8KB buffer

/// Rows written between periodic flushes
const FLUSH_EVERY_ROWS: u64 = 1000;

/// CSV writer for aggregated tables
pub struct CsvTableWriter {
    writer: Writer<BufWriter<File>>,
    rows_written: u64,
}

impl CsvTableWriter {
    /// Create a new CSV writer, creating parent directories as needed
    pub fn new<P: AsRef<Path>>(path: P) -> OutputResult<Self> {
        Self::new_with_buffer_size(path, DEFAULT_BUFFER_SIZE)
    }

    /// Create a new CSV writer with custom buffer size
    pub fn new_with_buffer_size<P: AsRef<Path>>(
        path: P,
        buffer_size: usize,
    ) -> OutputResult<Self> {
        let path = path.as_ref();
        info!("Creating CSV writer: path={}", path.display());

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    OutputError::IoError(format!("Failed to create directory: {e}"))
                })?;
            }
        }

        let file = File::create(path)
            .map_err(|e| OutputError::IoError(format!("Failed to create file: {e}")))?;

        let buf_writer = BufWriter::with_capacity(buffer_size, file);

        Ok(Self {
            writer: Writer::from_writer(buf_writer),
            rows_written: 0,
        })
    }

    /// Get number of rows written so far
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }
}

impl TableWriter for CsvTableWriter {
    fn write_table(&mut self, table: &Table) -> OutputResult<()> {
        self.writer
            .write_record(table.columns())
            .map_err(|e| OutputError::CsvError(format!("Failed to write header: {e}")))?;

        for row in table.rows() {
            self.writer
                .write_record(row.iter().map(cell_to_field))
                .map_err(|e| OutputError::CsvError(format!("Failed to write row: {e}")))?;

            self.rows_written += 1;
            if self.rows_written % FLUSH_EVERY_ROWS == 0 {
                self.flush()?;
                debug!("Progress: {} rows written", self.rows_written);
            }
        }

        Ok(())
    }
}

impl OutputWriter for CsvTableWriter {
    fn flush(&mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {e}")))
    }

    fn close(mut self) -> OutputResult<()> {
        self.flush()?;

        let buf_writer = self
            .writer
            .into_inner()
            .map_err(|e| OutputError::IoError(format!("Failed to get inner writer: {e}")))?;

        let file = buf_writer
            .into_inner()
            .map_err(|e| OutputError::IoError(format!("Failed to get file handle: {e}")))?;

        file.sync_all()
            .map_err(|e| OutputError::IoError(format!("Failed to sync file: {e}")))?;

        info!("CSV writer closed successfully: {} rows written", self.rows_written);
        Ok(())
    }
}

/// Write `table` to `path` as CSV and return the number of data rows
pub fn write_table_csv<P: AsRef<Path>>(path: P, table: &Table) -> OutputResult<u64> {
    let mut writer = CsvTableWriter::new(path)?;
    writer.write_table(table)?;
    let rows = writer.rows_written();
    writer.close()?;
    Ok(rows)
}

/// Render one cell: strings unquoted, null empty, everything else as JSON text
fn cell_to_field(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
