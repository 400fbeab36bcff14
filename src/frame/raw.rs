use anyhow::{Context, Result};
use image::RgbImage;
use std::path::{Path, PathBuf};

/// Turns a camera raw file into an 8-bit RGB raster.
///
/// The default implementation is [`LibRawDecoder`]; tests and embedders can
/// plug in their own.
pub trait RawDecoder {
    /// Decoder name, for logging.
    fn name(&self) -> &str;

    /// Demosaic and postprocess `path` into an sRGB, 8-bit-per-channel image.
    fn decode(&self, path: &Path) -> Result<RgbImage>;
}

/// LibRaw-backed decoder (camera white balance, sRGB, 8 bits).
#[derive(Debug, Clone, Copy, Default)]
pub struct LibRawDecoder;

impl RawDecoder for LibRawDecoder {
    fn name(&self) -> &str {
        "libraw"
    }

    #[cfg(feature = "raw")]
    fn decode(&self, path: &Path) -> Result<RgbImage> {
        use rsraw::{RawImage, BIT_DEPTH_8};

        let file_data = std::fs::read(path).context("Failed to read raw file")?;

        let mut raw = RawImage::open(&file_data)
            .map_err(|e| anyhow::anyhow!("Failed to open raw file: {e:?}"))?;
        raw.unpack()
            .map_err(|e| anyhow::anyhow!("Failed to unpack raw data: {e:?}"))?;
        let processed = raw
            .process::<BIT_DEPTH_8>()
            .map_err(|e| anyhow::anyhow!("Failed to demosaic raw data: {e:?}"))?;

        let width = u32::try_from(processed.width()).context("Raw width out of range")?;
        let height = u32::try_from(processed.height()).context("Raw height out of range")?;
        if processed.colors() != 3 {
            anyhow::bail!(
                "Expected 3 color channels from raw processing, got {}",
                processed.colors()
            );
        }
        log::debug!("  Demosaiced {}: {width}x{height}", path.display());

        RgbImage::from_raw(width, height, processed.to_vec())
            .context("Demosaiced buffer does not match its reported dimensions")
    }

    #[cfg(not(feature = "raw"))]
    fn decode(&self, path: &Path) -> Result<RgbImage> {
        anyhow::bail!(
            "Cannot decode {}: built without raw support (enable the `raw` feature)",
            path.display()
        )
    }
}

/// Output path for a raw-decoded file: `<stem>_watermarked.jpg` next to it.
///
/// ```rust
/// use std::path::Path;
/// use photo_sign::frame::watermarked_path;
///
/// let out = watermarked_path(Path::new("/photos/IMG_0042.DNG"), "_watermarked");
/// assert_eq!(out, Path::new("/photos/IMG_0042_watermarked.jpg"));
/// ```
pub fn watermarked_path(path: &Path, marker: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{stem}{marker}.jpg"))
}
