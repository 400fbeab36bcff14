use anyhow::{Context, Result};
use image::codecs::jpeg::{JpegEncoder, PixelDensity};
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat};
use img_parts::png::{Png, PngChunk};
use img_parts::Bytes;
use std::path::Path;

/// PNG chunk type carrying physical pixel dimensions.
pub const PNG_PHYS_CHUNK: [u8; 4] = *b"pHYs";

const METERS_PER_INCH: f64 = 0.0254;

/// Encode `image` in the format implied by `path`'s extension and write it,
/// replacing any existing file. `dpi` is embedded in both axes.
///
/// JPEG output stores the density in the JFIF header (alpha is dropped);
/// PNG output gets a `pHYs` chunk in pixels per metre. HEIF output (with the
/// `heic` feature) is re-encoded at `quality` and carries no density.
pub fn save_with_dpi(image: &DynamicImage, path: &Path, dpi: u32, quality: u8) -> Result<()> {
    let bytes = if super::is_heif(path) {
        log::debug!("  HEIF output: {dpi} DPI is not stored");
        super::encode_heif(image, quality)?
    } else {
        let format = ImageFormat::from_path(path)
            .with_context(|| format!("Cannot infer output format for {}", path.display()))?;
        match format {
            ImageFormat::Jpeg => encode_jpeg(image, dpi, quality)?,
            ImageFormat::Png => encode_png(image, dpi)?,
            other => anyhow::bail!("Unsupported output format {other:?} for {}", path.display()),
        }
    };

    std::fs::write(path, &bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    log::debug!("  Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

fn encode_jpeg(image: &DynamicImage, dpi: u32, quality: u8) -> Result<Vec<u8>> {
    let dpi = u16::try_from(dpi).context("DPI does not fit the JFIF density field")?;
    let rgb = image.to_rgb8();

    let mut buffer = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
    encoder.set_pixel_density(PixelDensity::dpi(dpi));
    encoder
        .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .context("JPEG encoding failed")?;
    Ok(buffer)
}

fn encode_png(image: &DynamicImage, dpi: u32) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let encoder = PngEncoder::new(&mut buffer);
    if image.color().has_alpha() {
        let rgba = image.to_rgba8();
        encoder
            .write_image(rgba.as_raw(), rgba.width(), rgba.height(), ExtendedColorType::Rgba8)
            .context("PNG encoding failed")?;
    } else {
        let rgb = image.to_rgb8();
        encoder
            .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
            .context("PNG encoding failed")?;
    }

    let mut png = Png::from_bytes(Bytes::from(buffer))
        .map_err(|e| anyhow::anyhow!("Failed to parse encoded PNG: {e}"))?;

    let chunks = png.chunks_mut();
    chunks.retain(|chunk| chunk.kind() != PNG_PHYS_CHUNK);
    // pHYs must precede IDAT; right after IHDR is always valid
    chunks.insert(1, PngChunk::new(PNG_PHYS_CHUNK, Bytes::from(phys_contents(dpi))));

    Ok(png.encoder().bytes().to_vec())
}

/// `pHYs` body: x and y pixels per unit (big-endian) and unit 1 = metre.
fn phys_contents(dpi: u32) -> Vec<u8> {
    let per_meter = (f64::from(dpi) / METERS_PER_INCH).round() as u32;
    let mut contents = Vec::with_capacity(9);
    contents.extend_from_slice(&per_meter.to_be_bytes());
    contents.extend_from_slice(&per_meter.to_be_bytes());
    contents.push(1);
    contents
}
