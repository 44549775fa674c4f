//! Test fixtures for conversion tests
//!
//! Two kinds of fixture:
//! - [`synthetic_mp3`] builds a tagged MP3 in memory (hand-written ID3v2.3
//!   tag plus silent MPEG frames). Tag and cover tests use these and run
//!   anywhere.
//! - [`tagged_mp3`] renders a real sine with the ffmpeg found on this machine.
//!   Tests using it are `#[ignore]`d; run them with `cargo test -- --ignored`.
//!   They panic when ffmpeg/ffprobe are missing.

#![cfg(test)]

use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use image::{ImageFormat, Rgb, RgbImage};
use lofty::config::ParseOptions;
use lofty::file::AudioFile;
use lofty::mpeg::MpegFile;
use lofty::picture::MimeType;
use lofty::tag::Tag;

use crate::audio::TrackMetadata;
use crate::conversion::Ffmpeg;
use crate::settings::Settings;

static FIXTURES_DIR: OnceLock<PathBuf> = OnceLock::new();
static TOOLS: OnceLock<Ffmpeg> = OnceLock::new();

/// MPEG-1 Layer III, 128kbps, 44.1kHz, no padding, no CRC
const MPEG_FRAME_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0x00];
/// 144 * 128000 / 44100
const MPEG_FRAME_LEN: usize = 417;
const MPEG_FRAME_COUNT: usize = 8;

/// Kind of cover to embed in a generated fixture
#[derive(Debug, Clone, Copy)]
pub enum FixtureCover {
    Png,
    Jpeg,
}

/// The installed ffmpeg/ffprobe pair
pub fn tools() -> &'static Ffmpeg {
    TOOLS.get_or_init(|| {
        Ffmpeg::locate(&Settings::default()).expect("ffmpeg/ffprobe not found")
    })
}

/// Get the fixtures directory, creating it if necessary
pub fn fixtures_dir() -> &'static Path {
    FIXTURES_DIR.get_or_init(|| {
        let dir = std::env::temp_dir().join("mp3_reencode_test_fixtures");
        fs::create_dir_all(&dir).expect("Failed to create fixtures directory");
        dir
    })
}

/// Tags written into every generated fixture
pub fn sample_tags() -> TrackMetadata {
    TrackMetadata {
        album: "Jazz".to_string(),
        album_artist: "The Quartet".to_string(),
        artist: "Someone".to_string(),
        comment: "fixture".to_string(),
        composer: "Composer".to_string(),
        date: "2001".to_string(),
        genre: "Jazz".to_string(),
        title: "Blue".to_string(),
        track: "3".to_string(),
    }
}

/// A small deterministic gradient encoded as `format`
pub fn cover_bytes(format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(16, 16, |x, y| Rgb([(x * 16) as u8, (y * 16) as u8, 128]));
    let mut data = Vec::new();
    img.write_to(&mut Cursor::new(&mut data), format)
        .expect("Failed to encode cover");
    data
}

fn mime_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Gif => "image/gif",
        _ => "application/octet-stream",
    }
}

fn id3v23_frame(id: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(10 + body.len());
    frame.extend_from_slice(id);
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&[0, 0]);
    frame.extend_from_slice(body);
    frame
}

/// Latin-1 text frame body
fn text_body(text: &str) -> Vec<u8> {
    let mut body = vec![0];
    body.extend_from_slice(text.as_bytes());
    body
}

fn synchsafe(n: u32) -> [u8; 4] {
    [
        ((n >> 21) & 0x7F) as u8,
        ((n >> 14) & 0x7F) as u8,
        ((n >> 7) & 0x7F) as u8,
        (n & 0x7F) as u8,
    ]
}

/// A minimal MP3 built in memory: ID3v2.3 tag with `tags` (and `cover` as an
/// APIC frame with an empty description), followed by silent MPEG frames.
///
/// `tags: None` leaves the ID3v2 tag out entirely.
pub fn synthetic_mp3(tags: Option<&TrackMetadata>, cover: Option<ImageFormat>) -> Vec<u8> {
    let mut data = Vec::new();

    if let Some(tags) = tags {
        let mut frames = Vec::new();
        for (id, value) in [
            (b"TALB", &tags.album),
            (b"TPE2", &tags.album_artist),
            (b"TPE1", &tags.artist),
            (b"TCOM", &tags.composer),
            (b"TYER", &tags.date),
            (b"TCON", &tags.genre),
            (b"TIT2", &tags.title),
            (b"TRCK", &tags.track),
        ] {
            frames.extend(id3v23_frame(id, &text_body(value)));
        }

        let mut comment = vec![0];
        comment.extend_from_slice(b"eng\0");
        comment.extend_from_slice(tags.comment.as_bytes());
        frames.extend(id3v23_frame(b"COMM", &comment));

        if let Some(format) = cover {
            let mut picture = vec![0];
            picture.extend_from_slice(mime_for(format).as_bytes());
            picture.push(0);
            picture.push(3); // front cover
            picture.push(0); // empty description
            picture.extend(cover_bytes(format));
            frames.extend(id3v23_frame(b"APIC", &picture));
        }

        data.extend_from_slice(b"ID3\x03\x00\x00");
        data.extend_from_slice(&synchsafe(frames.len() as u32));
        data.extend(frames);
    }

    for _ in 0..MPEG_FRAME_COUNT {
        data.extend_from_slice(&MPEG_FRAME_HEADER);
        data.resize(data.len() + MPEG_FRAME_LEN - MPEG_FRAME_HEADER.len(), 0);
    }

    data
}

/// Write [`synthetic_mp3`] with [`sample_tags`] to `dir/name`
pub fn write_synthetic_mp3(dir: &Path, name: &str, cover: Option<ImageFormat>) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, synthetic_mp3(Some(&sample_tags()), cover))
        .expect("Failed to write synthetic mp3");
    path
}

/// An executable `/bin/sh` script at `dir/name`
#[cfg(unix)]
pub fn script_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("Failed to write script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
        .expect("Failed to make script executable");
    path
}

/// ffprobe's JSON report for an audio file with `tags` at `bit_rate`
pub fn probe_json(tags: &TrackMetadata, bit_rate: u32) -> String {
    let tags: serde_json::Map<String, serde_json::Value> = tags
        .fields()
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::from(*v)))
        .collect();
    serde_json::json!({
        "streams": [{"codec_type": "audio", "bit_rate": bit_rate.to_string()}],
        "format": {"bit_rate": bit_rate.to_string(), "tags": tags},
    })
    .to_string()
}

/// Stand-ins for ffprobe and ffmpeg
///
/// ffprobe reports [`sample_tags`] at 128kbps for any file. ffmpeg copies a
/// cover-less [`synthetic_mp3`] to its last argument (the output path).
#[cfg(unix)]
pub fn scripted_tools(dir: &Path) -> Ffmpeg {
    let report = dir.join("probe.json");
    fs::write(&report, probe_json(&sample_tags(), 128000)).expect("Failed to write report");
    let encoded = write_synthetic_mp3(dir, "encoded.bin", None);

    let ffprobe = script_tool(dir, "ffprobe", &format!("cat '{}'", report.display()));
    let ffmpeg = script_tool(
        dir,
        "ffmpeg",
        &format!("for last; do :; done\ncp '{}' \"$last\"", encoded.display()),
    );
    Ffmpeg::new(ffmpeg, ffprobe)
}

/// Generate a 2 second 440Hz sine MP3 at 128kbps with [`sample_tags`]
///
/// The lavfi sine source peaks at 1/8 full scale (about -18 dBFS).
/// Files are cached by name; callers must use distinct names for distinct fixtures.
pub fn tagged_mp3(name: &str, cover: Option<FixtureCover>) -> PathBuf {
    let output_path = fixtures_dir().join(format!("{}.mp3", name));

    if output_path.exists() {
        return output_path;
    }

    let mut cmd = Command::new(tools().ffmpeg());
    cmd.arg("-hide_banner")
        .arg("-nostdin")
        .arg("-y")
        .arg("-f")
        .arg("lavfi")
        .arg("-i")
        .arg("sine=frequency=440:duration=2");

    if let Some(cover) = cover {
        let (format, ext) = match cover {
            FixtureCover::Png => (ImageFormat::Png, "png"),
            FixtureCover::Jpeg => (ImageFormat::Jpeg, "jpg"),
        };
        let cover_path = fixtures_dir().join(format!("{}_cover.{}", name, ext));
        fs::write(&cover_path, cover_bytes(format)).expect("Failed to write cover");

        cmd.arg("-i")
            .arg(&cover_path)
            .arg("-map")
            .arg("0:a")
            .arg("-map")
            .arg("1:v")
            .arg("-c:v")
            .arg("copy")
            .arg("-disposition:v")
            .arg("attached_pic")
            .arg("-metadata:s:v")
            .arg("comment=Cover (front)");
    }

    cmd.arg("-codec:a").arg("libmp3lame").arg("-b:a").arg("128k");

    for (key, value) in sample_tags().fields() {
        cmd.arg("-metadata").arg(format!("{}={}", key, value));
    }

    // Write beside the final name and rename so parallel tests never see a half-written file
    let partial = fixtures_dir().join(format!("{}.{}.partial", name, uuid::Uuid::new_v4().simple()));
    cmd.arg("-id3v2_version").arg("3").arg("-f").arg("mp3").arg(&partial);

    let output = cmd.output().expect("Failed to execute ffmpeg");

    if !output.status.success() {
        panic!(
            "ffmpeg failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }

    fs::rename(&partial, &output_path).expect("Failed to move fixture into place");
    output_path
}

/// MIME type and description of the first embedded picture, if any
pub fn read_picture_frame(path: &Path) -> Option<(Option<MimeType>, Option<String>)> {
    let mut file = fs::File::open(path).ok()?;
    let mpeg = MpegFile::read_from(&mut file, ParseOptions::new()).ok()?;
    let tag: Tag = mpeg.id3v2()?.clone().into();
    let picture = tag.pictures().first()?;
    Some((
        picture.mime_type().cloned(),
        picture.description().map(str::to_string),
    ))
}

/// Major version byte of a leading ID3v2 header
pub fn id3v2_major_version(path: &Path) -> Option<u8> {
    let mut header = [0u8; 4];
    fs::File::open(path).ok()?.read_exact(&mut header).ok()?;
    (&header[..3] == b"ID3").then_some(header[3])
}
