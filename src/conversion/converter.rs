//! Single-file conversion
//!
//! probe source -> resolve output path -> ffmpeg re-encode -> cover transplant.
//! Encoding and the transplant both target a hidden staging file which is
//! renamed into place only once both steps succeed.

use std::fs;
use std::path::{Path, PathBuf};

use crate::audio::{SourceInfo, transplant};
use crate::error::ConvertError;

use super::ffmpeg::Ffmpeg;
use super::output::{resolve_output_path, staging_path};

/// Parameters for one conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub source: PathBuf,
    /// Used verbatim when set; `target_folder` and `use_tags` then don't affect the path
    pub target_file: Option<PathBuf>,
    pub target_folder: Option<PathBuf>,
    pub use_tags: bool,
    /// Gain shift in dB, 0 = unchanged
    pub volume_db: i32,
}

impl ConversionRequest {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target_file: None,
            target_folder: None,
            use_tags: true,
            volume_db: 0,
        }
    }

    pub fn target_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.target_file = Some(path.into());
        self
    }

    pub fn target_folder(mut self, path: impl Into<PathBuf>) -> Self {
        self.target_folder = Some(path.into());
        self
    }

    pub fn use_tags(mut self, use_tags: bool) -> Self {
        self.use_tags = use_tags;
        self
    }

    pub fn volume_db(mut self, volume_db: i32) -> Self {
        self.volume_db = volume_db;
        self
    }
}

/// Converts single MP3 files
#[derive(Debug, Clone)]
pub struct Converter {
    codec: Ffmpeg,
}

impl Converter {
    pub fn new(codec: Ffmpeg) -> Self {
        log::debug!(
            "Using ffmpeg at {} and ffprobe at {}",
            codec.ffmpeg().display(),
            codec.ffprobe().display()
        );
        Self { codec }
    }

    /// Convert one file and return where the result was written
    pub fn convert(&self, request: &ConversionRequest) -> Result<PathBuf, ConvertError> {
        let source = request.source.as_path();
        let info = self.codec.probe(source)?;

        let output = resolve_output_path(
            source,
            request.target_file.as_deref(),
            request.target_folder.as_deref(),
            request.use_tags,
            &info.tags,
        )?;
        prepare_output_dir(&output, request.target_file.is_some())?;

        log::info!(
            "Converting {} -> {} at {}kbps, {:+}dB",
            source.display(),
            output.display(),
            info.bit_rate / 1000,
            request.volume_db
        );

        let staging = staging_path(&output);
        if let Err(e) = self.encode_staged(source, &staging, &info, request.volume_db) {
            discard_staging(&staging);
            return Err(e);
        }

        if let Err(e) = fs::rename(&staging, &output) {
            discard_staging(&staging);
            return Err(ConvertError::output_write(&output, e));
        }

        log::info!("Finished {}", output.display());
        Ok(output)
    }

    /// Export audio and tags, then carry the cover over
    fn encode_staged(
        &self,
        source: &Path,
        staging: &Path,
        info: &SourceInfo,
        volume_db: i32,
    ) -> Result<(), ConvertError> {
        self.codec
            .transcode(source, staging, info.bit_rate, volume_db, &info.tags)?;
        transplant(source, staging)
    }
}

/// Derived folders are created; an explicit target's folder must already exist
fn prepare_output_dir(output: &Path, explicit_target: bool) -> Result<(), ConvertError> {
    let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };

    if explicit_target {
        if parent.is_dir() {
            Ok(())
        } else {
            Err(ConvertError::output_write(parent, "target directory does not exist"))
        }
    } else {
        fs::create_dir_all(parent).map_err(|e| ConvertError::output_write(parent, e))
    }
}

fn discard_staging(staging: &Path) {
    if staging.exists() {
        if let Err(e) = fs::remove_file(staging) {
            log::warn!("Failed to remove staging file {}: {}", staging.display(), e);
        }
    }
}
