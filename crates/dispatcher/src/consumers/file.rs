//! FileConsumer - writes per-frame metadata records to disk
//!
//! Layout under `<base_path>/<consumer name>/`:
//! - `frames.jsonl` (one JSON object per line) or `frames.bin`
//!   (u32 little-endian length prefix + bincode record)
//! - `summary.json`, written by `post_process`

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use contracts::{Consumer, ContractError, FrameMetadata, MolecularSystem, SharedEnvelope};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

/// On-disk record encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordFormat {
    #[default]
    Json,
    Bincode,
}

impl RecordFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "json" | "jsonl" => Some(Self::Json),
            "bincode" | "bin" => Some(Self::Bincode),
            _ => None,
        }
    }

    fn file_name(&self) -> &'static str {
        match self {
            Self::Json => "frames.jsonl",
            Self::Bincode => "frames.bin",
        }
    }
}

/// Configuration for FileConsumer
#[derive(Debug, Clone)]
pub struct FileConsumerConfig {
    /// Base output directory
    pub base_path: PathBuf,
    pub format: RecordFormat,
}

impl FileConsumerConfig {
    /// Create config from params map
    ///
    /// # Errors
    /// Unknown `format` value.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./output"));
        let format = match params.get("format") {
            Some(value) => {
                RecordFormat::parse(value).ok_or_else(|| format!("unknown format '{value}'"))?
            }
            None => RecordFormat::default(),
        };
        Ok(Self { base_path, format })
    }
}

/// One frame as written to disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub meta: FrameMetadata,
    pub num_atoms: usize,
    /// Box vector lengths (nm)
    pub box_extents: [f32; 3],
}

/// Run summary written by `post_process`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSummary {
    pub consumer: String,
    pub format: RecordFormat,
    pub frames_written: u64,
    pub system_atoms: usize,
    pub last: Option<FrameMetadata>,
    /// RFC 3339 completion time
    pub finished_at: String,
}

/// Consumer that writes frame records to disk files
pub struct FileConsumer {
    name: String,
    config: FileConsumerConfig,
    system: MolecularSystem,
    writer: Option<BufWriter<File>>,
    frames_written: u64,
}

impl FileConsumer {
    pub fn new(name: impl Into<String>, config: FileConsumerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            system: MolecularSystem::new(),
            writer: None,
            frames_written: 0,
        }
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, String> {
        Ok(Self::new(name, FileConsumerConfig::from_params(params)?))
    }

    /// Directory receiving this consumer's files
    pub fn output_dir(&self) -> PathBuf {
        self.config.base_path.join(&self.name)
    }

    pub fn frames_path(&self) -> PathBuf {
        self.output_dir().join(self.config.format.file_name())
    }

    pub fn summary_path(&self) -> PathBuf {
        self.output_dir().join("summary.json")
    }

    fn write_record(&mut self, record: &FrameRecord) -> std::io::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| std::io::Error::other("pre_process was not called"))?;

        match self.config.format {
            RecordFormat::Json => {
                serde_json::to_writer(&mut *writer, record)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
                writer.write_all(b"\n")?;
            }
            RecordFormat::Bincode => {
                let bytes = bincode::serialize(record)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
                let len = u32::try_from(bytes.len())
                    .map_err(|_| std::io::Error::other("record too large"))?;
                writer.write_all(&len.to_le_bytes())?;
                writer.write_all(&bytes)?;
            }
        }
        Ok(())
    }

    fn write_summary(&mut self, last: Option<&FrameMetadata>) -> std::io::Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        let summary = FileSummary {
            consumer: self.name.clone(),
            format: self.config.format,
            frames_written: self.frames_written,
            system_atoms: self.system.num_atoms(),
            last: last.copied(),
            finished_at: Utc::now().to_rfc3339(),
        };
        let file = File::create(self.summary_path())?;
        serde_json::to_writer_pretty(file, &summary)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    fn io_error(&self, e: std::io::Error) -> ContractError {
        error!(consumer = %self.name, error = %e, "FileConsumer IO failed");
        ContractError::consumer(&self.name, e.to_string())
    }
}

impl Consumer for FileConsumer {
    fn name(&self) -> &str {
        &self.name
    }

    fn system_mut(&mut self) -> &mut MolecularSystem {
        &mut self.system
    }

    #[instrument(name = "file_consumer_pre_process", skip(self), fields(consumer = %self.name))]
    fn pre_process(&mut self) -> Result<(), ContractError> {
        let dir = self.output_dir();
        fs::create_dir_all(&dir).map_err(|e| self.io_error(e))?;
        let file = File::create(self.frames_path()).map_err(|e| self.io_error(e))?;
        self.writer = Some(BufWriter::new(file));
        self.frames_written = 0;
        debug!(path = %dir.display(), format = ?self.config.format, "FileConsumer opened");
        Ok(())
    }

    fn consume_frame(&mut self, envelope: &SharedEnvelope) -> Result<(), ContractError> {
        let extents = envelope.frame.periodic_box.extents();
        let record = FrameRecord {
            meta: envelope.meta,
            num_atoms: envelope.frame.num_atoms(),
            box_extents: [extents.x, extents.y, extents.z],
        };
        self.write_record(&record).map_err(|e| self.io_error(e))?;
        self.frames_written += 1;
        Ok(())
    }

    #[instrument(name = "file_consumer_post_process", skip(self, last), fields(consumer = %self.name))]
    fn post_process(&mut self, last: Option<&FrameMetadata>) -> Result<(), ContractError> {
        self.write_summary(last).map_err(|e| self.io_error(e))?;
        debug!(frames = self.frames_written, "FileConsumer closed");
        Ok(())
    }
}

/// Read back a `frames.bin` file
pub fn read_bincode_records(path: &Path) -> std::io::Result<Vec<FrameRecord>> {
    let mut bytes = Vec::new();
    File::open(path)?.read_to_end(&mut bytes)?;

    let mut records = Vec::new();
    let mut rest = bytes.as_slice();
    while !rest.is_empty() {
        let (len, tail) = rest
            .split_first_chunk::<4>()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::UnexpectedEof))?;
        let len = u32::from_le_bytes(*len) as usize;
        if tail.len() < len {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        let (body, tail) = tail.split_at(len);
        records.push(
            bincode::deserialize(body)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?,
        );
        rest = tail;
    }
    Ok(records)
}

/// Read back a `frames.jsonl` file
pub fn read_json_records(path: &Path) -> std::io::Result<Vec<FrameRecord>> {
    fs::read_to_string(path)?
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
        .collect()
}
