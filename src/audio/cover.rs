//! Cover art transplant between MP3 files
//!
//! The re-encode step drops attached pictures, so the cover is read from the
//! source's ID3v2 tag, run through the image codec to establish its real
//! format, and written into the output as a fresh APIC frame.

use std::fs::File;
use std::io::Cursor;
use std::path::Path;

use image::ImageFormat;
use lofty::TextEncoding;
use lofty::config::{ParseOptions, WriteOptions};
use lofty::file::AudioFile;
use lofty::id3::v2::{AttachedPictureFrame, Frame, Id3v2Tag};
use lofty::mpeg::MpegFile;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::tag::{Tag, TagExt};

use crate::error::ConvertError;

/// Description label on every transplanted picture frame
pub const COVER_DESCRIPTION: &str = "Cover";

/// Format of a decoded cover image
///
/// Anything that is not PNG is labelled `image/jpeg`, whatever it really is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverFormat {
    Png,
    OtherCoercedToJpeg(ImageFormat),
}

impl CoverFormat {
    fn from_image_format(format: ImageFormat) -> Self {
        match format {
            ImageFormat::Png => Self::Png,
            other => Self::OtherCoercedToJpeg(other),
        }
    }

    /// Format the bytes are actually encoded in
    pub fn image_format(&self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::OtherCoercedToJpeg(format) => *format,
        }
    }

    pub fn mime_type(&self) -> MimeType {
        match self {
            Self::Png => MimeType::Png,
            Self::OtherCoercedToJpeg(_) => MimeType::Jpeg,
        }
    }
}

/// A cover image ready to embed
#[derive(Debug, Clone)]
pub struct CoverImage {
    pub data: Vec<u8>,
    pub format: CoverFormat,
}

impl CoverImage {
    /// Decode raw picture bytes and re-encode them in the same format
    pub fn from_embedded(path: &Path, raw: &[u8]) -> Result<Self, ConvertError> {
        let format = image::guess_format(raw)
            .map_err(|e| ConvertError::codec(path, format!("unrecognised cover image: {}", e)))?;
        let decoded = image::load_from_memory_with_format(raw, format)
            .map_err(|e| ConvertError::codec(path, format!("failed to decode cover: {}", e)))?;

        let format = CoverFormat::from_image_format(format);

        let mut data = Vec::new();
        decoded
            .write_to(&mut Cursor::new(&mut data), format.image_format())
            .map_err(|e| ConvertError::codec(path, format!("failed to encode cover: {}", e)))?;

        Ok(Self { data, format })
    }

    fn to_picture(&self) -> Picture {
        Picture::new_unchecked(
            PictureType::CoverFront,
            Some(self.format.mime_type()),
            Some(COVER_DESCRIPTION.to_string()),
            self.data.clone(),
        )
    }
}

fn read_id3v2(path: &Path) -> Result<Option<Id3v2Tag>, lofty::error::LoftyError> {
    let mut file = File::open(path)?;
    let mpeg = MpegFile::read_from(&mut file, ParseOptions::new())?;
    Ok(mpeg.id3v2().cloned())
}

/// Pull the embedded cover out of `source`
///
/// Prefers the front-cover picture and falls back to whatever picture comes first.
pub fn extract_cover(source: &Path) -> Result<CoverImage, ConvertError> {
    let id3v2 = read_id3v2(source).map_err(|e| ConvertError::metadata_read(source, e))?;
    let Some(id3v2) = id3v2 else {
        return Err(ConvertError::no_cover_found(source));
    };

    let tag: Tag = id3v2.into();
    let pictures = tag.pictures();
    let picture = pictures
        .iter()
        .find(|p| p.pic_type() == PictureType::CoverFront)
        .or_else(|| pictures.first())
        .ok_or_else(|| ConvertError::no_cover_found(source))?;

    CoverImage::from_embedded(source, picture.data())
}

/// Copy the cover of `source_file` into the tag of `target_file`
///
/// The target tag is rewritten as ID3v2.3 with the picture stored as a
/// front-cover frame labelled "Cover".
pub fn transplant(source_file: &Path, target_file: &Path) -> Result<(), ConvertError> {
    let cover = extract_cover(source_file)?;

    let mut tag = read_id3v2(target_file)
        .map_err(|e| ConvertError::output_write(target_file, e))?
        .unwrap_or_default();

    tag.insert(Frame::Picture(AttachedPictureFrame::new(
        TextEncoding::UTF8,
        cover.to_picture(),
    )));

    tag.save_to_path(target_file, WriteOptions::default().use_id3v23(true))
        .map_err(|e| ConvertError::output_write(target_file, e))?;

    log::debug!(
        "Transplanted {} byte cover ({:?}) from {} to {}",
        cover.data.len(),
        cover.format,
        source_file.display(),
        target_file.display()
    );

    Ok(())
}
