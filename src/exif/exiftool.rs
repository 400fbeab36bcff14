use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::Signer;
use crate::pipeline::FailureKind;

/// Signs files by running the external `exiftool` program.
#[derive(Debug, Clone)]
pub struct ExifTool {
    program: PathBuf,
}

impl ExifTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Default for ExifTool {
    fn default() -> Self {
        Self::new("exiftool")
    }
}

/// Arguments that overwrite the three attribution tags of `path` in place.
///
/// ```rust
/// use photo_sign::exif::exiftool_args;
/// use std::path::Path;
///
/// let args = exiftool_args(Path::new("photo.jpg"), "Jane Doe");
/// assert_eq!(args[0], "-overwrite_original");
/// assert_eq!(args[4], "photo.jpg");
/// ```
pub fn exiftool_args(path: &Path, signature: &str) -> Vec<OsString> {
    vec![
        OsString::from("-overwrite_original"),
        OsString::from(format!("-Artist={signature}")),
        OsString::from(format!("-Copyright={signature}")),
        OsString::from(format!("-UserComment={signature}")),
        path.as_os_str().to_os_string(),
    ]
}

impl Signer for ExifTool {
    fn name(&self) -> &str {
        "exiftool"
    }

    fn sign(&self, path: &Path, signature: &str) -> Result<()> {
        let output = Command::new(&self.program)
            .args(exiftool_args(path, signature))
            .output()
            .with_context(|| format!("Failed to launch {}", self.program.display()))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if output.status.success() {
            log::debug!("  exiftool: {}", stdout.trim());
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let diagnostic = if stderr.trim().is_empty() {
            stdout.trim()
        } else {
            stderr.trim()
        };
        anyhow::bail!("exiftool exited with {}: {diagnostic}", output.status)
    }

    fn failure_kind(&self) -> FailureKind {
        FailureKind::ExternalTool
    }
}
