//! File and stdout dataset sinks.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::SecondsFormat;
use clap::ValueEnum;
use toolscout_core::error::AppError;
use toolscout_core::models::NormalizedTool;
use toolscout_core::traits::DatasetSink;

type BoxedWriter = Box<dyn Write + Send>;

const CSV_HEADER: [&str; 9] = [
    "name",
    "description",
    "url",
    "pricing",
    "category",
    "tags",
    "source",
    "sourceUrl",
    "scrapedAt",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One JSON object per line
    #[default]
    Jsonl,
    /// Comma-separated values with a header row
    Csv,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn open_writer(path: Option<&Path>) -> Result<BoxedWriter, AppError> {
    match path {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                AppError::SinkError(format!("Failed to create {}: {e}", path.display()))
            })?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(std::io::stdout())),
    }
}

/// Writes each record as a single line of camelCase JSON.
#[derive(Clone)]
pub struct JsonLinesSink {
    out: Arc<Mutex<BoxedWriter>>,
}

impl JsonLinesSink {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            out: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn flush(&self) -> Result<(), AppError> {
        lock(&self.out)
            .flush()
            .map_err(|e| AppError::SinkError(format!("Failed to flush output: {e}")))
    }
}

impl DatasetSink for JsonLinesSink {
    async fn append(&self, tool: &NormalizedTool) -> Result<(), AppError> {
        let line = serde_json::to_string(tool)?;
        let mut out = lock(&self.out);
        writeln!(out, "{line}")
            .and_then(|()| out.flush())
            .map_err(|e| AppError::SinkError(format!("Failed to write record: {e}")))
    }
}

/// Writes records as CSV rows; tags are joined with `; `.
#[derive(Clone)]
pub struct CsvSink {
    out: Arc<Mutex<csv::Writer<BoxedWriter>>>,
}

impl CsvSink {
    pub fn new(writer: impl Write + Send + 'static) -> Result<Self, AppError> {
        let boxed: BoxedWriter = Box::new(writer);
        let mut out = csv::Writer::from_writer(boxed);
        out.write_record(CSV_HEADER)
            .map_err(|e| AppError::SinkError(format!("Failed to write CSV header: {e}")))?;
        Ok(Self {
            out: Arc::new(Mutex::new(out)),
        })
    }

    pub fn flush(&self) -> Result<(), AppError> {
        lock(&self.out)
            .flush()
            .map_err(|e| AppError::SinkError(format!("Failed to flush output: {e}")))
    }
}

fn csv_row(tool: &NormalizedTool) -> [String; 9] {
    [
        tool.name.clone(),
        tool.description.clone(),
        tool.url.clone(),
        tool.pricing.as_ref().map(ToString::to_string).unwrap_or_default(),
        tool.category.clone().unwrap_or_default(),
        tool.tags.as_ref().map(|t| t.join("; ")).unwrap_or_default(),
        tool.source.clone(),
        tool.source_url.clone(),
        tool.scraped_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    ]
}

impl DatasetSink for CsvSink {
    async fn append(&self, tool: &NormalizedTool) -> Result<(), AppError> {
        let mut out = lock(&self.out);
        out.write_record(csv_row(tool))
            .map_err(|e| AppError::SinkError(format!("Failed to write record: {e}")))?;
        out.flush()
            .map_err(|e| AppError::SinkError(format!("Failed to flush output: {e}")))
    }
}

/// The sink selected on the command line.
#[derive(Clone)]
pub enum OutputSink {
    JsonLines(JsonLinesSink),
    Csv(CsvSink),
}

impl OutputSink {
    /// Open `path` (stdout when `None`) in the requested format.
    pub fn open(path: Option<&Path>, format: OutputFormat) -> Result<Self, AppError> {
        let writer = open_writer(path)?;
        Ok(match format {
            OutputFormat::Jsonl => Self::JsonLines(JsonLinesSink::new(writer)),
            OutputFormat::Csv => Self::Csv(CsvSink::new(writer)?),
        })
    }

    pub fn flush(&self) -> Result<(), AppError> {
        match self {
            Self::JsonLines(sink) => sink.flush(),
            Self::Csv(sink) => sink.flush(),
        }
    }
}

impl DatasetSink for OutputSink {
    async fn append(&self, tool: &NormalizedTool) -> Result<(), AppError> {
        match self {
            Self::JsonLines(sink) => sink.append(tool).await,
            Self::Csv(sink) => sink.append(tool).await,
        }
    }
}
