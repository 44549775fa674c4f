//! Source metadata extraction via ffprobe
//!
//! Reads the container tags and bit-rate of a source file. Only the nine
//! tags in [`TrackMetadata::KEYS`] are carried through to the output.

use std::collections::HashMap;
use std::path::Path;
use std::process::Command;

use serde::Deserialize;

use crate::error::ConvertError;

/// The fixed tag subset written to every converted file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackMetadata {
    pub album: String,
    pub album_artist: String,
    pub artist: String,
    pub comment: String,
    pub composer: String,
    pub date: String,
    pub genre: String,
    pub title: String,
    pub track: String,
}

impl TrackMetadata {
    /// Tag keys in the order they are written
    pub const KEYS: [&'static str; 9] = [
        "album",
        "album_artist",
        "artist",
        "comment",
        "composer",
        "date",
        "genre",
        "title",
        "track",
    ];

    /// Build from a raw tag map. Keys match case-insensitively, an exact match
    /// wins over other spellings; missing keys become "".
    pub fn from_tags(tags: &HashMap<String, String>) -> Self {
        // Exact key first, then the lowest-sorting case-insensitive match
        let lookup = |key: &str| -> String {
            tags.get(key)
                .or_else(|| {
                    tags.iter()
                        .filter(|(k, _)| k.eq_ignore_ascii_case(key))
                        .min_by_key(|(k, _)| *k)
                        .map(|(_, v)| v)
                })
                .cloned()
                .unwrap_or_default()
        };

        Self {
            album: lookup("album"),
            album_artist: lookup("album_artist"),
            artist: lookup("artist"),
            comment: lookup("comment"),
            composer: lookup("composer"),
            date: lookup("date"),
            genre: lookup("genre"),
            title: lookup("title"),
            track: lookup("track"),
        }
    }

    /// (key, value) pairs in [`Self::KEYS`] order
    pub fn fields(&self) -> [(&'static str, &str); 9] {
        [
            ("album", &self.album),
            ("album_artist", &self.album_artist),
            ("artist", &self.artist),
            ("comment", &self.comment),
            ("composer", &self.composer),
            ("date", &self.date),
            ("genre", &self.genre),
            ("title", &self.title),
            ("track", &self.track),
        ]
    }
}

/// What the converter needs to know about a source before encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub tags: TrackMetadata,
    /// Bits per second
    pub bit_rate: u32,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    bit_rate: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

/// Run ffprobe against `path` and extract its tags and bit-rate
pub fn probe_source(ffprobe_path: &Path, path: &Path) -> Result<SourceInfo, ConvertError> {
    let output = Command::new(ffprobe_path)
        .arg("-v")
        .arg("error")
        .arg("-print_format")
        .arg("json")
        .arg("-show_format")
        .arg("-show_streams")
        .arg(path)
        .output()
        .map_err(|e| ConvertError::codec(path, format!("failed to spawn ffprobe: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ConvertError::metadata_read(
            path,
            stderr.lines().last().unwrap_or("ffprobe failed").trim(),
        ));
    }

    let json = String::from_utf8_lossy(&output.stdout);
    parse_probe_output(path, &json)
}

/// Interpret ffprobe's JSON report
///
/// The audio stream's bit-rate wins over the container's, since the container
/// figure is inflated by embedded artwork.
fn parse_probe_output(path: &Path, json: &str) -> Result<SourceInfo, ConvertError> {
    let probe: ProbeOutput = serde_json::from_str(json)
        .map_err(|e| ConvertError::metadata_read(path, format!("unreadable ffprobe output: {}", e)))?;

    let audio = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"))
        .ok_or_else(|| ConvertError::metadata_read(path, "no audio stream"))?;

    let format = probe
        .format
        .ok_or_else(|| ConvertError::metadata_read(path, "no container format"))?;

    let bit_rate = audio
        .bit_rate
        .as_deref()
        .and_then(|b| b.parse::<u32>().ok())
        .or_else(|| format.bit_rate.as_deref().and_then(|b| b.parse::<u32>().ok()))
        .filter(|b| *b > 0)
        .ok_or_else(|| ConvertError::metadata_read(path, "bit-rate unknown"))?;

    Ok(SourceInfo {
        tags: TrackMetadata::from_tags(&format.tags),
        bit_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROBE_JSON: &str = r#"{
        "streams": [
            {"index": 0, "codec_name": "mp3", "codec_type": "audio", "bit_rate": "192000"},
            {"index": 1, "codec_name": "png", "codec_type": "video"}
        ],
        "format": {
            "filename": "song.mp3",
            "format_name": "mp3",
            "bit_rate": "231456",
            "tags": {
                "title": "Blue",
                "ALBUM": "Jazz",
                "artist": "Someone",
                "track": "3/12",
                "encoder": "Lavf60.3.100"
            }
        }
    }"#;

    #[test]
    fn test_missing_keys_default_to_empty() {
        let mut tags = HashMap::new();
        tags.insert("title".to_string(), "Blue".to_string());

        let meta = TrackMetadata::from_tags(&tags);
        assert_eq!(meta.title, "Blue");
        assert_eq!(meta.album, "");
        assert_eq!(meta.composer, "");
    }

    #[test]
    fn test_fields_follow_key_order() {
        let meta = TrackMetadata {
            album: "Jazz".to_string(),
            track: "1".to_string(),
            ..Default::default()
        };
        let keys: Vec<&str> = meta.fields().iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, TrackMetadata::KEYS);
        assert_eq!(meta.fields()[0], ("album", "Jazz"));
        assert_eq!(meta.fields()[8], ("track", "1"));
    }

    #[test]
    fn test_parse_prefers_stream_bit_rate() {
        let info = parse_probe_output(Path::new("song.mp3"), PROBE_JSON).unwrap();
        assert_eq!(info.bit_rate, 192000);
        assert_eq!(info.tags.title, "Blue");
        assert_eq!(info.tags.album, "Jazz", "keys are case-insensitive");
        assert_eq!(info.tags.track, "3/12");
        assert_eq!(info.tags.genre, "");
    }

    #[test]
    fn test_parse_falls_back_to_format_bit_rate() {
        let json = r#"{
            "streams": [{"codec_type": "audio"}],
            "format": {"bit_rate": "128000"}
        }"#;
        let info = parse_probe_output(Path::new("song.mp3"), json).unwrap();
        assert_eq!(info.bit_rate, 128000);
        assert_eq!(info.tags, TrackMetadata::default());
    }

    #[test]
    fn test_parse_rejects_non_audio() {
        let json = r#"{
            "streams": [{"codec_type": "video", "bit_rate": "500000"}],
            "format": {"bit_rate": "500000"}
        }"#;
        let result = parse_probe_output(Path::new("cover.png"), json);
        assert!(matches!(result, Err(ConvertError::MetadataRead { .. })));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let result = parse_probe_output(Path::new("song.mp3"), "not json");
        assert!(matches!(result, Err(ConvertError::MetadataRead { .. })));
    }

    #[test]
    fn test_exact_key_wins_over_other_case() {
        let mut tags = HashMap::new();
        tags.insert("TITLE".to_string(), "Shouted".to_string());
        tags.insert("title".to_string(), "Blue".to_string());
        tags.insert("Title".to_string(), "Capital".to_string());

        for _ in 0..16 {
            assert_eq!(TrackMetadata::from_tags(&tags).title, "Blue");
        }
    }

    #[test]
    fn test_case_variants_resolve_deterministically() {
        let mut tags = HashMap::new();
        tags.insert("Album".to_string(), "Capital".to_string());
        tags.insert("ALBUM".to_string(), "Shouted".to_string());

        assert_eq!(TrackMetadata::from_tags(&tags).album, "Shouted");
    }

    #[cfg(unix)]
    #[test]
    fn test_probe_reads_scripted_report() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let report = temp_dir.path().join("report.json");
        std::fs::write(&report, PROBE_JSON).unwrap();
        let ffprobe = crate::test_fixtures::script_tool(
            temp_dir.path(),
            "ffprobe",
            &format!("cat '{}'", report.display()),
        );

        let info = probe_source(&ffprobe, Path::new("song.mp3")).unwrap();
        assert_eq!(info.bit_rate, 192000);
        assert_eq!(info.tags.title, "Blue");
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_ffprobe_is_metadata_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let ffprobe = crate::test_fixtures::script_tool(
            temp_dir.path(),
            "ffprobe",
            "echo 'song.mp3: Invalid data found when processing input' >&2\nexit 1",
        );

        let result = probe_source(&ffprobe, Path::new("song.mp3"));
        assert!(matches!(result, Err(ConvertError::MetadataRead { .. })));
    }

    #[test]
    fn test_missing_ffprobe_is_codec_error() {
        let result = probe_source(Path::new("/nonexistent/bin/ffprobe"), Path::new("song.mp3"));
        assert!(matches!(result, Err(ConvertError::Codec { .. })));
    }

    #[test]
    #[ignore = "needs ffmpeg and ffprobe"]
    fn test_probe_nonexistent_file() {
        let tools = crate::test_fixtures::tools();
        let result = probe_source(tools.ffprobe(), Path::new("/nonexistent/file.mp3"));
        assert!(matches!(result, Err(ConvertError::MetadataRead { .. })));
    }

    #[test]
    #[ignore = "needs ffmpeg and ffprobe"]
    fn test_probe_reads_fixture_tags() {
        let tools = crate::test_fixtures::tools();
        let fixture = crate::test_fixtures::tagged_mp3("probe_tags", None);

        let info = probe_source(tools.ffprobe(), &fixture).unwrap();
        assert_eq!(info.tags, crate::test_fixtures::sample_tags());
        assert_eq!(info.bit_rate, 128000);
    }
}
