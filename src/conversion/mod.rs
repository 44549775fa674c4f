//! Audio conversion module
//!
//! Handles re-encoding MP3 files with ffmpeg, naming the outputs and
//! running whole folders through the converter.

mod batch;
mod converter;
mod ffmpeg;
mod output;

pub use batch::convert_folder;
pub use converter::{ConversionRequest, Converter};
pub use ffmpeg::Ffmpeg;

use std::path::{Path, PathBuf};

use crate::error::ConvertError;

fn executable_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", name)
    } else {
        name.to_string()
    }
}

/// Find an external tool
///
/// Order: explicit path, `MP3_REENCODE_<NAME>` environment variable, then PATH.
pub fn locate_tool(name: &str, configured: Option<&Path>) -> Result<PathBuf, ConvertError> {
    if let Some(path) = configured {
        return verify_tool(path);
    }

    let env_var = format!("MP3_REENCODE_{}", name.to_ascii_uppercase());
    if let Some(path) = std::env::var_os(&env_var) {
        log::debug!("Using {} from {}", name, env_var);
        return verify_tool(Path::new(&path));
    }

    let exe = executable_name(name);
    let found = std::env::var_os("PATH").and_then(|paths| {
        std::env::split_paths(&paths)
            .map(|dir| dir.join(&exe))
            .find(|candidate| candidate.is_file())
    });

    match found {
        Some(path) => verify_tool(&path),
        None => Err(ConvertError::codec(
            Path::new(name),
            format!("{} not found on PATH (set {} or the settings file)", name, env_var),
        )),
    }
}

/// Verify that a tool exists and is executable
pub fn verify_tool(path: &Path) -> Result<PathBuf, ConvertError> {
    if !path.is_file() {
        return Err(ConvertError::codec(path, "tool not found"));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata = std::fs::metadata(path)
            .map_err(|e| ConvertError::codec(path, format!("failed to get metadata: {}", e)))?;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(ConvertError::codec(path, "tool is not executable"));
        }
    }

    log::debug!("Tool verified at: {}", path.display());
    Ok(path.to_path_buf())
}
