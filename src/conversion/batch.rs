//! Folder-level batch runner

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::ConvertError;

use super::converter::{ConversionRequest, Converter};

/// Convert every entry of `source_folder` into `target_folder`
///
/// Not recursive. Subfolders are handed to the converter like files and fail
/// there. The first failure aborts the rest of the batch.
pub fn convert_folder(
    converter: &Converter,
    source_folder: &Path,
    target_folder: &Path,
    use_tags: bool,
    volume_db: i32,
) -> Result<Vec<PathBuf>, ConvertError> {
    let mut converted = Vec::new();

    let entries = WalkDir::new(source_folder)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    for entry in entries {
        let entry = entry.map_err(|e| ConvertError::metadata_read(source_folder, e))?;

        let request = ConversionRequest::new(entry.path())
            .target_folder(target_folder)
            .use_tags(use_tags)
            .volume_db(volume_db);

        converted.push(converter.convert(&request)?);
    }

    log::info!(
        "Converted {} files from {}",
        converted.len(),
        source_folder.display()
    );

    Ok(converted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::Ffmpeg;
    use crate::test_fixtures::{self, FixtureCover};
    use image::ImageFormat;
    use tempfile::TempDir;

    /// Never actually run; for paths that fail before any tool is spawned
    fn unused_tools() -> Converter {
        Converter::new(Ffmpeg::new(
            PathBuf::from("/nonexistent/bin/ffmpeg"),
            PathBuf::from("/nonexistent/bin/ffprobe"),
        ))
    }

    #[test]
    fn test_missing_source_folder() {
        let target = TempDir::new().unwrap();
        let result = convert_folder(
            &unused_tools(),
            Path::new("/nonexistent/folder"),
            target.path(),
            true,
            0,
        );
        assert!(matches!(result, Err(ConvertError::MetadataRead { .. })));
    }

    #[test]
    fn test_empty_folder_converts_nothing() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();

        let converted =
            convert_folder(&unused_tools(), source.path(), target.path(), true, 0).unwrap();
        assert!(converted.is_empty());
    }

    #[test]
    fn test_subfolder_is_not_skipped() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        std::fs::create_dir(source.path().join("sub")).unwrap();

        let result = convert_folder(&unused_tools(), source.path(), target.path(), true, 0);
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_scripted_batch_converts_in_name_order() {
        let tools_dir = TempDir::new().unwrap();
        let converter = Converter::new(test_fixtures::scripted_tools(tools_dir.path()));
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        test_fixtures::write_synthetic_mp3(source.path(), "02 b.mp3", Some(ImageFormat::Png));
        test_fixtures::write_synthetic_mp3(source.path(), "01 a.mp3", Some(ImageFormat::Jpeg));

        let converted =
            convert_folder(&converter, source.path(), target.path(), false, 0).unwrap();

        assert_eq!(
            converted,
            vec![target.path().join("01 a.mp3"), target.path().join("02 b.mp3")]
        );
        assert!(converted.iter().all(|p| p.is_file()));
    }

    #[cfg(unix)]
    #[test]
    fn test_scripted_batch_stops_at_first_failure() {
        let tools_dir = TempDir::new().unwrap();
        let converter = Converter::new(test_fixtures::scripted_tools(tools_dir.path()));
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        test_fixtures::write_synthetic_mp3(source.path(), "01 bare.mp3", None);
        test_fixtures::write_synthetic_mp3(source.path(), "02 cover.mp3", Some(ImageFormat::Png));

        let result = convert_folder(&converter, source.path(), target.path(), false, 0);

        assert!(matches!(result, Err(ConvertError::NoCoverFound { .. })));
        assert!(!target.path().join("01 bare.mp3").exists());
        assert!(!target.path().join("02 cover.mp3").exists());
    }

    #[test]
    #[ignore = "needs ffmpeg and ffprobe"]
    fn test_converts_every_file() {
        let converter = Converter::new(test_fixtures::tools().clone());
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();

        for (i, name) in ["batch_a", "batch_b"].iter().enumerate() {
            let fixture = test_fixtures::tagged_mp3(name, Some(FixtureCover::Png));
            std::fs::copy(&fixture, source.path().join(format!("{:02} {}.mp3", i + 1, name)))
                .unwrap();
        }

        let converted =
            convert_folder(&converter, source.path(), target.path(), false, 0).unwrap();

        assert_eq!(
            converted,
            vec![
                target.path().join("01 batch_a.mp3"),
                target.path().join("02 batch_b.mp3"),
            ]
        );
        assert!(converted.iter().all(|p| p.is_file()));
    }

    #[test]
    #[ignore = "needs ffmpeg and ffprobe"]
    fn test_first_failure_aborts_batch() {
        let converter = Converter::new(test_fixtures::tools().clone());
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();

        // "00 notes.txt" sorts first and is not audio
        std::fs::write(source.path().join("00 notes.txt"), "not audio").unwrap();
        let fixture = test_fixtures::tagged_mp3("batch_abort", Some(FixtureCover::Png));
        std::fs::copy(&fixture, source.path().join("01 song.mp3")).unwrap();

        let result = convert_folder(&converter, source.path(), target.path(), false, 0);
        assert!(matches!(result, Err(ConvertError::MetadataRead { .. })));
        assert!(!target.path().join("01 song.mp3").exists());
    }
}
