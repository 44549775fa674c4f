//! FFmpeg subprocess handling for audio conversion

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::audio::{SourceInfo, TrackMetadata, probe_source};
use crate::error::ConvertError;
use crate::settings::Settings;

use super::locate_tool;

/// Handle to the external ffmpeg/ffprobe pair
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Ffmpeg {
    pub fn new(ffmpeg: PathBuf, ffprobe: PathBuf) -> Self {
        Self { ffmpeg, ffprobe }
    }

    /// Find both tools using the settings, environment and PATH
    pub fn locate(settings: &Settings) -> Result<Self, ConvertError> {
        let ffmpeg = locate_tool("ffmpeg", settings.ffmpeg_path.as_deref())?;
        let ffprobe = locate_tool("ffprobe", settings.ffprobe_path.as_deref())?;
        Ok(Self::new(ffmpeg, ffprobe))
    }

    pub fn ffmpeg(&self) -> &Path {
        &self.ffmpeg
    }

    pub fn ffprobe(&self) -> &Path {
        &self.ffprobe
    }

    /// Read tags and bit-rate of a source file
    pub fn probe(&self, path: &Path) -> Result<SourceInfo, ConvertError> {
        probe_source(&self.ffprobe, path)
    }

    /// Re-encode `input` to MP3 at `bit_rate`, applying `volume_db` and writing `tags`
    ///
    /// Source metadata and picture streams are not carried over.
    pub fn transcode(
        &self,
        input: &Path,
        output: &Path,
        bit_rate: u32,
        volume_db: i32,
        tags: &TrackMetadata,
    ) -> Result<(), ConvertError> {
        let args = transcode_args(input, output, bit_rate, volume_db, tags);

        log::debug!("ffmpeg {:?}", args);

        let result = Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| ConvertError::codec(input, format!("failed to spawn ffmpeg: {}", e)))?;

        if result.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&result.stderr);
            Err(ConvertError::codec(
                input,
                format!(
                    "ffmpeg exited with status {}: {}",
                    result.status,
                    stderr.lines().last().unwrap_or("Unknown error")
                ),
            ))
        }
    }
}

/// Build the ffmpeg argument list for one transcode
///
/// -map_metadata -1 : drop source tags, only ours are written
/// -vn              : drop attached pictures (cover is transplanted afterwards)
/// -af volume=NdB   : only when the delta is non-zero
/// -f mp3           : output name may not end in .mp3 (staging files)
fn transcode_args(
    input: &Path,
    output: &Path,
    bit_rate: u32,
    volume_db: i32,
    tags: &TrackMetadata,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-hide_banner".into(),
        "-nostdin".into(),
        "-y".into(),
        "-i".into(),
        input.as_os_str().to_owned(),
        "-map_metadata".into(),
        "-1".into(),
        "-vn".into(),
    ];

    if volume_db != 0 {
        args.push("-af".into());
        args.push(format!("volume={}dB", volume_db).into());
    }

    args.push("-codec:a".into());
    args.push("libmp3lame".into());
    args.push("-b:a".into());
    args.push(bit_rate.to_string().into());

    for (key, value) in tags.fields() {
        args.push("-metadata".into());
        args.push(format!("{}={}", key, value).into());
    }

    args.push("-id3v2_version".into());
    args.push("3".into());
    args.push("-f".into());
    args.push("mp3".into());
    args.push(output.as_os_str().to_owned());

    args
}
