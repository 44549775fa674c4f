//! Peak/RMS measurement of decoded audio

use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::ConvertError;

/// Signal level summary, in dB relative to full scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelStats {
    pub peak_dbfs: f64,
    pub rms_dbfs: f64,
    /// Interleaved samples analysed (all channels)
    pub samples: u64,
}

fn to_dbfs(amplitude: f64) -> f64 {
    if amplitude > 0.0 {
        20.0 * amplitude.log10()
    } else {
        f64::NEG_INFINITY
    }
}

/// Accumulates peak and sum of squares over interleaved samples
#[derive(Debug, Default)]
struct LevelAccumulator {
    peak: f64,
    sum_squares: f64,
    samples: u64,
}

impl LevelAccumulator {
    fn push(&mut self, samples: &[f32]) {
        for &s in samples {
            let s = f64::from(s);
            self.peak = self.peak.max(s.abs());
            self.sum_squares += s * s;
        }
        self.samples += samples.len() as u64;
    }

    fn finish(self) -> LevelStats {
        let rms = if self.samples > 0 {
            (self.sum_squares / self.samples as f64).sqrt()
        } else {
            0.0
        };
        LevelStats {
            peak_dbfs: to_dbfs(self.peak),
            rms_dbfs: to_dbfs(rms),
            samples: self.samples,
        }
    }
}

/// Decode `path` completely and measure its peak and RMS level
pub fn measure_levels(path: &Path) -> Result<LevelStats, ConvertError> {
    let file = File::open(path).map_err(|e| ConvertError::metadata_read(path, e))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension() {
        hint.with_extension(&ext.to_string_lossy());
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| ConvertError::metadata_read(path, format!("failed to probe audio format: {}", e)))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| ConvertError::metadata_read(path, "no default track found"))?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| ConvertError::codec(path, e))?;

    let mut accumulator = LevelAccumulator::default();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(ConvertError::codec(path, e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let buf = sample_buf.get_or_insert_with(|| {
                    SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec())
                });
                buf.copy_interleaved_ref(decoded);
                accumulator.push(buf.samples());
            }
            // Corrupt frame; skip it like a player would
            Err(SymphoniaError::DecodeError(e)) => {
                log::debug!("Skipping undecodable packet in {}: {}", path.display(), e);
            }
            Err(e) => return Err(ConvertError::codec(path, e)),
        }
    }

    Ok(accumulator.finish())
}
