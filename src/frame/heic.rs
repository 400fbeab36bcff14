use anyhow::{Context, Result};
use image::DynamicImage;
use std::path::Path;

/// Extensions routed through libheif instead of the `image` codecs.
pub const HEIF_EXTENSIONS: &[&str] = &["heic", "heif"];

/// Whether `path` names a HEIF container, by extension (case-insensitive).
pub fn is_heif(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| HEIF_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Decode the primary image of a HEIF file into RGB8, or RGBA8 when it
/// carries an alpha plane.
#[cfg(feature = "heic")]
pub fn decode_heif(path: &Path) -> Result<DynamicImage> {
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let data = std::fs::read(path).context("Failed to read HEIF file")?;
    let ctx = HeifContext::read_from_bytes(&data)
        .map_err(|e| anyhow::anyhow!("Failed to parse HEIF container: {e}"))?;
    let handle = ctx
        .primary_image_handle()
        .map_err(|e| anyhow::anyhow!("HEIF file has no primary image: {e}"))?;

    let has_alpha = handle.has_alpha_channel();
    let (chroma, channels) = if has_alpha {
        (RgbChroma::Rgba, 4)
    } else {
        (RgbChroma::Rgb, 3)
    };

    let lib = LibHeif::new();
    let decoded = lib
        .decode(&handle, ColorSpace::Rgb(chroma), None)
        .map_err(|e| anyhow::anyhow!("Failed to decode HEIF image: {e}"))?;
    let planes = decoded.planes();
    let plane = planes
        .interleaved
        .context("Decoded HEIF image has no interleaved plane")?;

    let (width, height) = (plane.width, plane.height);
    let row_len = width as usize * channels;
    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for row in plane.data.chunks(plane.stride).take(height as usize) {
        pixels.extend_from_slice(row.get(..row_len).context("HEIF row shorter than its width")?);
    }
    log::debug!("  Decoded HEIF {width}x{height} (alpha: {has_alpha})");

    let image = if has_alpha {
        image::RgbaImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgba8)
    } else {
        image::RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8)
    };
    image.context("Decoded HEIF buffer does not match its reported dimensions")
}

#[cfg(not(feature = "heic"))]
pub fn decode_heif(path: &Path) -> Result<DynamicImage> {
    anyhow::bail!(
        "Cannot decode {}: built without HEIF support (enable the `heic` feature)",
        path.display()
    )
}

/// Encode `image` as a single-image HEVC-coded HEIF at `quality` (1-100).
///
/// HEIF has no pixel-density field libheif can write, so no DPI is stored.
#[cfg(feature = "heic")]
pub fn encode_heif(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    use libheif_rs::{
        Channel, ColorSpace, CompressionFormat, EncoderQuality, HeifContext, Image, LibHeif,
        RgbChroma,
    };

    let (chroma, channels, raw) = if image.color().has_alpha() {
        (RgbChroma::Rgba, 4, image.to_rgba8().into_raw())
    } else {
        (RgbChroma::Rgb, 3, image.to_rgb8().into_raw())
    };
    let (width, height) = (image.width(), image.height());

    let mut heif_image = Image::new(width, height, ColorSpace::Rgb(chroma))
        .map_err(|e| anyhow::anyhow!("Failed to allocate HEIF image: {e}"))?;
    heif_image
        .create_plane(Channel::Interleaved, width, height, 8)
        .map_err(|e| anyhow::anyhow!("Failed to allocate HEIF plane: {e}"))?;
    {
        let planes = heif_image.planes_mut();
        let plane = planes
            .interleaved
            .context("HEIF image has no interleaved plane")?;
        let row_len = width as usize * channels;
        for (dst, src) in plane.data.chunks_mut(plane.stride).zip(raw.chunks(row_len)) {
            dst.get_mut(..row_len)
                .context("HEIF plane row shorter than the image width")?
                .copy_from_slice(src);
        }
    }

    let lib = LibHeif::new();
    let mut encoder = lib
        .encoder_for_format(CompressionFormat::Hevc)
        .map_err(|e| anyhow::anyhow!("No HEVC encoder available: {e}"))?;
    encoder
        .set_quality(EncoderQuality::Lossy(quality.clamp(1, 100)))
        .map_err(|e| anyhow::anyhow!("Failed to set HEIF quality: {e}"))?;

    let mut ctx =
        HeifContext::new().map_err(|e| anyhow::anyhow!("Failed to create HEIF context: {e}"))?;
    ctx.encode_image(&heif_image, &mut encoder, None)
        .map_err(|e| anyhow::anyhow!("HEIF encoding failed: {e}"))?;
    ctx.write_to_bytes()
        .map_err(|e| anyhow::anyhow!("Failed to serialize HEIF: {e}"))
}

#[cfg(not(feature = "heic"))]
pub fn encode_heif(_image: &DynamicImage, _quality: u8) -> Result<Vec<u8>> {
    anyhow::bail!("Cannot encode HEIF: built without HEIF support (enable the `heic` feature)")
}
