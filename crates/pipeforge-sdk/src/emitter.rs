//! Manifest emitter
//!
//! Serializes a compiled workflow to YAML and optionally packages it as a
//! single-entry zip or gzip-compressed tar archive.

use crate::error::{Result, SdkError};
use flate2::write::GzEncoder;
use flate2::Compression;
use pipeforge_core::Workflow;
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Name of the manifest inside an archive
pub const ARCHIVE_ENTRY: &str = "pipeline.yaml";

/// Output format of a compiled pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Yaml,
    Zip,
    TarGz,
}

impl OutputFormat {
    /// Infer the format from the suffix of `path`
    pub fn from_path(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| SdkError::UnsupportedOutput(path.display().to_string()))?;

        if file_name.ends_with(".yaml") || file_name.ends_with(".yml") {
            Ok(OutputFormat::Yaml)
        } else if file_name.ends_with(".zip") {
            Ok(OutputFormat::Zip)
        } else if file_name.ends_with(".tar.gz") || file_name.ends_with(".tgz") {
            Ok(OutputFormat::TarGz)
        } else {
            Err(SdkError::UnsupportedOutput(format!(
                "'{}' must end with .yaml, .yml, .zip, .tar.gz or .tgz",
                path.display()
            )))
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Yaml => "yaml",
            OutputFormat::Zip => "zip",
            OutputFormat::TarGz => "tar.gz",
        }
    }
}

/// Manifest emitter
pub struct ManifestEmitter;

impl ManifestEmitter {
    /// Serialize `workflow` in `format`
    pub fn emit(workflow: &Workflow, format: OutputFormat) -> Result<Vec<u8>> {
        let text = serde_yaml::to_string(workflow)?;
        match format {
            OutputFormat::Yaml => Ok(text.into_bytes()),
            OutputFormat::Zip => Self::zip(text.as_bytes()),
            OutputFormat::TarGz => Self::tar_gz(text.as_bytes()),
        }
    }

    /// Write `workflow` to `path` in the format its suffix names
    pub fn write(workflow: &Workflow, path: impl AsRef<Path>) -> Result<OutputFormat> {
        let path = path.as_ref();
        let format = OutputFormat::from_path(path)?;
        let bytes = Self::emit(workflow, format)?;
        std::fs::write(path, bytes)?;
        tracing::info!("wrote {} manifest to {}", format.extension(), path.display());
        Ok(format)
    }

    fn zip(manifest: &[u8]) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());
        writer.start_file(ARCHIVE_ENTRY, options)?;
        writer.write_all(manifest)?;
        Ok(writer.finish()?.into_inner())
    }

    fn tar_gz(manifest: &[u8]) -> Result<Vec<u8>> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);

        let mut header = tar::Header::new_gnu();
        header.set_size(manifest.len() as u64);
        header.set_mode(0o644);
        builder.append_data(&mut header, ARCHIVE_ENTRY, manifest)?;

        Ok(builder.into_inner()?.finish()?)
    }
}
