//! Output naming policy
//!
//! - Explicit target file: used verbatim
//! - Otherwise: `<folder>[/<album>]/<title>.mp3` or `<folder>/<source name>`,
//!   where folder is the target folder or the source's own directory

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::audio::TrackMetadata;
use crate::error::ConvertError;

/// Work out where a conversion writes its result
pub fn resolve_output_path(
    source: &Path,
    target_file: Option<&Path>,
    target_folder: Option<&Path>,
    use_tags: bool,
    tags: &TrackMetadata,
) -> Result<PathBuf, ConvertError> {
    if let Some(target_file) = target_file {
        return Ok(target_file.to_path_buf());
    }

    let mut folder = match target_folder {
        Some(folder) => folder.to_path_buf(),
        None => source.parent().map(Path::to_path_buf).unwrap_or_default(),
    };

    // Empty album is allowed and lands directly in the base folder
    if use_tags {
        folder.push(&tags.album);
    }

    let file_name: OsString = if use_tags {
        format!("{}.mp3", tags.title).into()
    } else {
        source
            .file_name()
            .ok_or_else(|| ConvertError::metadata_read(source, "source has no file name"))?
            .to_os_string()
    };

    Ok(folder.join(file_name))
}

/// Hidden sibling of `output` that the encoder writes to before the final rename
pub fn staging_path(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let staged = format!(".{}.{}.part", name, uuid::Uuid::new_v4().simple());

    match output.parent() {
        Some(parent) => parent.join(staged),
        None => PathBuf::from(staged),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jazz_blue() -> TrackMetadata {
        TrackMetadata {
            album: "Jazz".to_string(),
            title: "Blue".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_tag_naming() {
        let path = resolve_output_path(
            Path::new("/music/in/01 track.mp3"),
            None,
            Some(Path::new("/music/out")),
            true,
            &jazz_blue(),
        )
        .unwrap();
        assert_eq!(path, PathBuf::from("/music/out/Jazz/Blue.mp3"));
    }

    #[test]
    fn test_original_name_without_tags() {
        let path = resolve_output_path(
            Path::new("/music/in/01 track.mp3"),
            None,
            Some(Path::new("/music/out")),
            false,
            &jazz_blue(),
        )
        .unwrap();
        assert_eq!(path, PathBuf::from("/music/out/01 track.mp3"));
    }

    #[test]
    fn test_defaults_to_source_folder() {
        let path = resolve_output_path(
            Path::new("/music/in/01 track.mp3"),
            None,
            None,
            true,
            &jazz_blue(),
        )
        .unwrap();
        assert_eq!(path, PathBuf::from("/music/in/Jazz/Blue.mp3"));
    }

    #[test]
    fn test_explicit_target_wins() {
        let path = resolve_output_path(
            Path::new("/music/in/01 track.mp3"),
            Some(Path::new("/elsewhere/custom.mp3")),
            Some(Path::new("/music/out")),
            true,
            &jazz_blue(),
        )
        .unwrap();
        assert_eq!(path, PathBuf::from("/elsewhere/custom.mp3"));
    }

    #[test]
    fn test_empty_album_and_title() {
        let path = resolve_output_path(
            Path::new("/music/in/a.mp3"),
            None,
            Some(Path::new("/music/out")),
            true,
            &TrackMetadata::default(),
        )
        .unwrap();
        assert_eq!(path, PathBuf::from("/music/out/.mp3"));
    }

    #[test]
    fn test_source_without_name() {
        let result = resolve_output_path(Path::new("/"), None, None, false, &jazz_blue());
        assert!(matches!(result, Err(ConvertError::MetadataRead { .. })));
    }

    #[test]
    fn test_staging_is_hidden_sibling() {
        let output = Path::new("/music/out/Jazz/Blue.mp3");
        let staged = staging_path(output);
        assert_eq!(staged.parent(), output.parent());

        let name = staged.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with(".Blue.mp3."));
        assert!(name.ends_with(".part"));
        assert_ne!(staged, staging_path(output), "each call is unique");
    }
}
