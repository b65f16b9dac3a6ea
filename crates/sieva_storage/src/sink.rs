//! Row sink boundary for bulk export output.

use crate::error::StorageResult;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Append-only destination for text rows.
///
/// Cells arrive pre-rendered (already CSV-quoted where needed); the sink
/// joins them with commas and terminates each row. `finish` flushes and
/// returns the destination's location string, which the export pipeline
/// records under the job's opaque code.
pub trait RowSink: Send {
    /// Appends one row.
    fn write_row(&mut self, cells: &[String]) -> StorageResult<()>;

    /// Flushes and closes the sink, returning its location.
    fn finish(self: Box<Self>) -> StorageResult<String>;
}

/// Creates row sinks for export jobs.
///
/// Destination naming and rotation are external concerns; the engine
/// only supplies the job's opaque code.
pub trait ExportSinkFactory: Send + Sync {
    /// Opens a fresh sink for the given job code.
    fn create(&self, code: &str) -> StorageResult<Box<dyn RowSink>>;
}

/// Row sink writing CSV lines to a file through a buffered writer.
#[derive(Debug)]
pub struct FileRowSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FileRowSink {
    /// Creates the destination file, truncating any previous content.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn create(path: &Path) -> StorageResult<Self> {
        let file = File::create(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    /// Returns the destination path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RowSink for FileRowSink {
    fn write_row(&mut self, cells: &[String]) -> StorageResult<()> {
        self.writer.write_all(cells.join(",").as_bytes())?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> StorageResult<String> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        Ok(self.path.to_string_lossy().into_owned())
    }
}

/// Sink factory placing one `<code>.csv` file per job in a directory.
#[derive(Debug)]
pub struct FileSinkFactory {
    dir: PathBuf,
}

impl FileSinkFactory {
    /// Creates a factory writing into `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }
}

impl ExportSinkFactory for FileSinkFactory {
    fn create(&self, code: &str) -> StorageResult<Box<dyn RowSink>> {
        let path = self.dir.join(format!("{code}.csv"));
        Ok(Box::new(FileRowSink::create(&path)?))
    }
}

/// In-memory row sink for tests.
///
/// Rows are shared through an `Arc` so the test can inspect what an
/// export job wrote after the sink has been consumed by `finish`.
#[derive(Debug, Default)]
pub struct MemoryRowSink {
    rows: Arc<Mutex<Vec<Vec<String>>>>,
    location: String,
}

impl MemoryRowSink {
    /// Creates a sink reporting the given location from `finish`.
    #[must_use]
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            rows: Arc::new(Mutex::new(Vec::new())),
            location: location.into(),
        }
    }

    /// Returns a handle to the captured rows.
    #[must_use]
    pub fn rows(&self) -> Arc<Mutex<Vec<Vec<String>>>> {
        Arc::clone(&self.rows)
    }
}

impl RowSink for MemoryRowSink {
    fn write_row(&mut self, cells: &[String]) -> StorageResult<()> {
        self.rows.lock().push(cells.to_vec());
        Ok(())
    }

    fn finish(self: Box<Self>) -> StorageResult<String> {
        Ok(self.location)
    }
}
