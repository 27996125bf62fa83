use std::fs::{self, File, OpenOptions};
use std::io::{self, LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use log::{Level, LevelFilter};

use crate::format::LogFormat;

/// Destination for leveled log records.
///
/// The fetch engine only ever calls [`LogSink::emit`]; handler and formatter
/// details stay with the implementation.
pub trait LogSink: Send + Sync {
    /// Records `message` at `level`.
    fn emit(&self, level: Level, message: &str);
}

struct FileTarget {
    path: PathBuf,
    format: LogFormat,
    writer: Mutex<LineWriter<File>>,
}

/// Caller-owned logger writing to a file and/or the console (stderr).
///
/// Each value owns its own targets. Two loggers built with the same name
/// do not share state.
pub struct ScraperLogger {
    name: String,
    level: LevelFilter,
    file: Option<FileTarget>,
    console: Option<LogFormat>,
}

impl ScraperLogger {
    /// Starts building a logger that stamps records with `name`.
    pub fn builder(name: impl Into<String>) -> ScraperLoggerBuilder {
        ScraperLoggerBuilder {
            name: name.into(),
            level: LevelFilter::Info,
            file: None,
            max_file_bytes: None,
            console: None,
        }
    }

    /// The name rendered by `%(name)s`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The most verbose level this logger records.
    pub fn level(&self) -> LevelFilter {
        self.level
    }

    /// Path of the file target, if one is configured.
    pub fn file_path(&self) -> Option<&Path> {
        self.file.as_ref().map(|target| target.path.as_path())
    }

    /// Whether records are also written to stderr.
    pub fn has_console(&self) -> bool {
        self.console.is_some()
    }
}

impl LogSink for ScraperLogger {
    fn emit(&self, level: Level, message: &str) {
        if level > self.level {
            return;
        }
        let now = Local::now();

        // A failing log target must never take the fetch down with it.
        if let Some(target) = &self.file {
            let line = target.format.render(&self.name, level, message, now);
            if let Ok(mut writer) = target.writer.lock() {
                let _ = writeln!(writer, "{line}");
            }
        }

        if let Some(format) = &self.console {
            let line = format.render(&self.name, level, message, now);
            let _ = writeln!(io::stderr().lock(), "{line}");
        }
    }
}

/// Builder for [`ScraperLogger`].
#[derive(Debug, Clone)]
pub struct ScraperLoggerBuilder {
    name: String,
    level: LevelFilter,
    file: Option<(PathBuf, LogFormat)>,
    max_file_bytes: Option<u64>,
    console: Option<LogFormat>,
}

impl ScraperLoggerBuilder {
    /// Sets the level filter. Defaults to `Info`.
    pub fn level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    /// Appends records to `path`, rendered with `format`.
    pub fn file(mut self, path: impl Into<PathBuf>, format: LogFormat) -> Self {
        self.file = Some((path.into(), format));
        self
    }

    /// Rotates an existing log file to `<file>.1` when it is larger than
    /// `bytes` at build time.
    pub fn max_file_bytes(mut self, bytes: u64) -> Self {
        self.max_file_bytes = Some(bytes);
        self
    }

    /// Mirrors records to stderr, rendered with `format`.
    pub fn console(mut self, format: LogFormat) -> Self {
        self.console = Some(format);
        self
    }

    /// Opens the targets. Only the file target can fail.
    pub fn build(mut self) -> io::Result<ScraperLogger> {
        let file = self.open_file_target()?;
        Ok(self.assemble(file))
    }

    /// Like [`build`](Self::build), but drops the file target instead of
    /// failing when it cannot be opened. The open error is handed back next
    /// to the logger.
    pub fn build_degrading(mut self) -> (ScraperLogger, Option<io::Error>) {
        match self.open_file_target() {
            Ok(file) => (self.assemble(file), None),
            Err(err) => (self.assemble(None), Some(err)),
        }
    }

    fn open_file_target(&mut self) -> io::Result<Option<FileTarget>> {
        let Some((path, format)) = self.file.take() else {
            return Ok(None);
        };
        let file = open_log_file(&path, self.max_file_bytes)?;
        Ok(Some(FileTarget {
            path,
            format,
            writer: Mutex::new(LineWriter::new(file)),
        }))
    }

    fn assemble(self, file: Option<FileTarget>) -> ScraperLogger {
        ScraperLogger {
            name: self.name,
            level: self.level,
            file,
            console: self.console,
        }
    }
}

fn open_log_file(path: &Path, max_bytes: Option<u64>) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    if let Some(max_bytes) = max_bytes {
        if let Ok(meta) = fs::metadata(path) {
            if meta.len() > max_bytes {
                fs::rename(path, rotated_path(path))?;
            }
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}

fn rotated_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".1");
    PathBuf::from(name)
}

/// In-memory sink that keeps every record.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<(Level, String)>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all records so far.
    pub fn records(&self) -> Vec<(Level, String)> {
        self.lock().clone()
    }

    /// Removes and returns all records so far.
    pub fn take(&self) -> Vec<(Level, String)> {
        self.lock().drain(..).collect()
    }

    /// Number of records at exactly `level`.
    pub fn count(&self, level: Level) -> usize {
        self.lock().iter().filter(|(l, _)| *l == level).count()
    }

    /// Whether any record at `level` contains `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.lock()
            .iter()
            .any(|(l, message)| *l == level && message.contains(needle))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(Level, String)>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LogSink for MemorySink {
    fn emit(&self, level: Level, message: &str) {
        self.lock().push((level, message.to_string()));
    }
}
