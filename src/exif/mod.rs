//! Attribution metadata: writing Artist / Copyright / UserComment and reading them back.
//!
//! Two [`Signer`] implementations are available:
//!
//! - [`ExifTool`] — spawns the external `exiftool` binary (any format it supports)
//! - [`NativeSigner`] — writes EXIF in process (JPEG only)
//!
//! Both overwrite the original file without keeping a backup.

mod exiftool;
mod reader;
mod writer;

pub use exiftool::{exiftool_args, ExifTool};
pub use reader::{read_attribution, Attribution};
pub use writer::{write_attribution, NativeSigner};

use anyhow::Result;
use std::path::Path;

use crate::config::{SignerBackend, SignerConfig};
use crate::pipeline::FailureKind;

/// Writes the three attribution fields into an image file in place.
pub trait Signer {
    /// Human-readable backend name.
    fn name(&self) -> &str;

    /// Overwrite Artist, Copyright and UserComment of `path` with `signature`.
    fn sign(&self, path: &Path, signature: &str) -> Result<()>;

    /// How failures of this backend are classified in batch reports.
    fn failure_kind(&self) -> FailureKind;
}

/// Build the signer selected in the configuration.
pub fn build_signer(config: &SignerConfig) -> Box<dyn Signer> {
    match config.backend {
        SignerBackend::ExifTool => Box::new(ExifTool::new(config.exiftool_path.clone())),
        SignerBackend::Native => Box::new(NativeSigner),
    }
}
