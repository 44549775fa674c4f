//! mp3-reencode
//!
//! Batch re-encodes MP3 files at their original bit-rate with an optional
//! gain shift, rewrites a fixed set of ID3 tags and carries the embedded
//! cover art over to the new file.

mod audio;
mod conversion;
mod error;
mod logging;
mod settings;
mod test_fixtures;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use conversion::{ConversionRequest, Converter, Ffmpeg, convert_folder};
use error::ConvertError;
use settings::Settings;

#[derive(Debug, Parser)]
#[command(version, about = "Re-encode MP3 files, adjust volume and keep tags and cover art")]
struct Cli {
    /// Show debug output on the terminal
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Don't write a log file
    #[arg(long, global = true)]
    no_log_file: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct EncodeOptions {
    /// Name outputs `<album>/<title>.mp3`
    #[arg(long, overrides_with = "no_tags")]
    tags: bool,
    /// Keep original file names instead of `<album>/<title>.mp3`
    #[arg(long, overrides_with = "tags")]
    no_tags: bool,
    /// Gain shift in dB (negative values lower the volume)
    #[arg(long, allow_negative_numbers = true)]
    volume: Option<i32>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Convert every file in a folder
    Folder {
        source: PathBuf,
        target: PathBuf,
        #[command(flatten)]
        options: EncodeOptions,
    },
    /// Convert a single file
    File {
        source: PathBuf,
        /// Exact output file; overrides naming by tags
        #[arg(long)]
        target_file: Option<PathBuf>,
        /// Output folder (defaults to the source's folder)
        #[arg(long)]
        target_folder: Option<PathBuf>,
        #[command(flatten)]
        options: EncodeOptions,
    },
    /// Print peak and RMS levels of MP3 files
    Levels {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Update and print the saved defaults
    Settings {
        #[arg(long)]
        ffmpeg: Option<PathBuf>,
        #[arg(long)]
        ffprobe: Option<PathBuf>,
        #[arg(long, allow_negative_numbers = true)]
        volume: Option<i32>,
        #[arg(long)]
        use_tags: Option<bool>,
    },
}

impl EncodeOptions {
    /// Command line wins over saved settings
    fn resolve(&self, settings: &Settings) -> (bool, i32) {
        let use_tags = if self.tags {
            true
        } else if self.no_tags {
            false
        } else {
            settings.use_tags
        };
        (use_tags, self.volume.unwrap_or(settings.volume_db))
    }
}

fn run(command: Command, settings: Settings) -> Result<(), String> {
    match command {
        Command::Folder {
            source,
            target,
            options,
        } => {
            let (use_tags, volume_db) = options.resolve(&settings);
            let converter = Converter::new(Ffmpeg::locate(&settings).map_err(err)?);
            convert_folder(&converter, &source, &target, use_tags, volume_db).map_err(err)?;
        }
        Command::File {
            source,
            target_file,
            target_folder,
            options,
        } => {
            let (use_tags, volume_db) = options.resolve(&settings);
            let converter = Converter::new(Ffmpeg::locate(&settings).map_err(err)?);

            let mut request = ConversionRequest::new(source)
                .use_tags(use_tags)
                .volume_db(volume_db);
            if let Some(target_file) = target_file {
                request = request.target_file(target_file);
            }
            if let Some(target_folder) = target_folder {
                request = request.target_folder(target_folder);
            }

            let output = converter.convert(&request).map_err(err)?;
            println!("{}", output.display());
        }
        Command::Levels { files } => {
            for file in files {
                let stats = audio::measure_levels(&file).map_err(err)?;
                println!(
                    "{}: peak {:.2} dBFS, rms {:.2} dBFS ({} samples)",
                    file.display(),
                    stats.peak_dbfs,
                    stats.rms_dbfs,
                    stats.samples
                );
            }
        }
        Command::Settings {
            ffmpeg,
            ffprobe,
            volume,
            use_tags,
        } => {
            let mut settings = settings;
            if ffmpeg.is_some() {
                settings.ffmpeg_path = ffmpeg;
            }
            if ffprobe.is_some() {
                settings.ffprobe_path = ffprobe;
            }
            if let Some(volume) = volume {
                settings.volume_db = volume;
            }
            if let Some(use_tags) = use_tags {
                settings.use_tags = use_tags;
            }

            let path = settings.save().map_err(|e| e.to_string())?;
            log::info!("Saved settings to {}", path.display());
            let json = serde_json::to_string_pretty(&settings).map_err(|e| e.to_string())?;
            println!("{}", json);
        }
    }

    Ok(())
}

fn err(e: ConvertError) -> String {
    e.to_string()
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    logging::init_logging(cli.verbose, !cli.no_log_file);
    let settings = Settings::load();

    match run(cli.command, settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
