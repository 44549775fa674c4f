//! Error kinds for single-file conversion and batch runs

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Everything that can stop a conversion.
///
/// None of these are retried; they propagate straight out of
/// [`Converter::convert`](crate::conversion::Converter::convert) and abort a batch.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Source is missing, unreadable or not audio
    #[error("failed to read metadata from {}: {reason}", path.display())]
    MetadataRead { path: PathBuf, reason: String },

    /// ffmpeg, symphonia or the image codec failed
    #[error("codec failure on {}: {reason}", path.display())]
    Codec { path: PathBuf, reason: String },

    /// Destination folder, file or tag container could not be written
    #[error("failed to write {}: {reason}", path.display())]
    OutputWrite { path: PathBuf, reason: String },

    /// Cover transplant attempted on a source without an embedded picture
    #[error("no embedded cover found in {}", path.display())]
    NoCoverFound { path: PathBuf },
}

impl ConvertError {
    pub fn metadata_read(path: &Path, reason: impl ToString) -> Self {
        Self::MetadataRead {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn codec(path: &Path, reason: impl ToString) -> Self {
        Self::Codec {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn output_write(path: &Path, reason: impl ToString) -> Self {
        Self::OutputWrite {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn no_cover_found(path: &Path) -> Self {
        Self::NoCoverFound {
            path: path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_path() {
        let err = ConvertError::output_write(Path::new("/music/out/Blue.mp3"), "permission denied");
        assert_eq!(
            err.to_string(),
            "failed to write /music/out/Blue.mp3: permission denied"
        );

        let err = ConvertError::no_cover_found(Path::new("song.mp3"));
        assert_eq!(err.to_string(), "no embedded cover found in song.mp3");
    }

    #[test]
    fn test_variants_are_distinguishable() {
        let err = ConvertError::codec(Path::new("a.mp3"), "ffmpeg exited with status 1");
        assert!(matches!(err, ConvertError::Codec { .. }));

        let err = ConvertError::metadata_read(Path::new("a.mp3"), "no audio stream");
        assert!(matches!(err, ConvertError::MetadataRead { ref reason, .. } if reason == "no audio stream"));
    }
}
