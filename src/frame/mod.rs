//! White border and signature compositing.
//!
//! - [`border_pixels`] — convert a physical border width to pixels
//! - [`load_font`] — read the signature font from disk
//! - [`frame_and_sign`] — expand the canvas and draw the signature
//! - [`save_with_dpi`] — encode the result with the target resolution embedded
//!
//! EXIF orientation is never applied: the pixels are framed exactly as stored.

mod encode;
mod heic;
mod raw;

pub use encode::{save_with_dpi, PNG_PHYS_CHUNK};
pub use heic::{decode_heif, encode_heif, is_heif, HEIF_EXTENSIONS};
pub use raw::{watermarked_path, LibRawDecoder, RawDecoder};

use ab_glyph::{point, Font, FontVec, OutlinedGlyph, PxScale, ScaleFont};
use anyhow::{Context, Result};
use image::{imageops, DynamicImage, ImageBuffer, Pixel, Rgb, Rgba};
use imageproc::pixelops::weighted_sum;
use std::path::Path;

use crate::config::FrameConfig;

const CM_PER_INCH: f64 = 2.54;

/// Convert a border width in centimeters to pixels at `dpi`, truncating.
///
/// ```rust
/// assert_eq!(photo_sign::frame::border_pixels(2.0, 300), 236);
/// ```
pub fn border_pixels(border_cm: f64, dpi: u32) -> u32 {
    // `as` saturates: negative or NaN widths become 0
    ((f64::from(dpi) / CM_PER_INCH) * border_cm) as u32
}

/// Top-left drawing position for a text box anchored to the bottom-right
/// corner of a `canvas`, inset by `margin` on both axes.
///
/// The result can be negative when the text is wider or taller than the canvas.
pub fn text_origin(canvas: (u32, u32), text: (u32, u32), margin: u32) -> (i32, i32) {
    let x = i64::from(canvas.0) - i64::from(text.0) - i64::from(margin);
    let y = i64::from(canvas.1) - i64::from(text.1) - i64::from(margin);
    (clamp_i32(x), clamp_i32(y))
}

fn clamp_i32(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Load a font file. Collections (`.ttc`) use their first face.
pub fn load_font(path: &Path) -> Result<FontVec> {
    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read font {}", path.display()))?;
    FontVec::try_from_vec_and_index(data, 0)
        .map_err(|e| anyhow::anyhow!("Failed to parse font {}: {e}", path.display()))
}

/// Scale that renders one em at `size` pixels, the way point sizes are
/// usually understood, rather than ab_glyph's ascent-to-descent height.
pub fn em_scale(font: &impl Font, size: f32) -> PxScale {
    match font.units_per_em() {
        Some(upem) if upem > 0.0 => PxScale::from(size * font.height_unscaled() / upem),
        _ => PxScale::from(size),
    }
}

/// Pixel extent of the ink a string leaves, relative to the point the line
/// was laid out from (top of the ascent, left of the first advance).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InkBox {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl InkBox {
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// One line of outlined glyphs, baseline at the ascent.
struct TextLayout {
    glyphs: Vec<OutlinedGlyph>,
    ink: Option<InkBox>,
}

fn layout_text(font: &impl Font, scale: PxScale, text: &str) -> TextLayout {
    let scaled = font.as_scaled(scale);
    let baseline = scaled.ascent();

    let mut glyphs = Vec::new();
    let mut caret = 0.0f32;
    let mut previous = None;
    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = previous {
            caret += scaled.kern(prev, id);
        }
        let glyph = id.with_scale_and_position(scale, point(caret, baseline));
        caret += scaled.h_advance(id);
        previous = Some(id);
        if let Some(outlined) = font.outline_glyph(glyph) {
            glyphs.push(outlined);
        }
    }

    let ink = glyphs
        .iter()
        .map(|g| g.px_bounds())
        .reduce(|a, b| ab_glyph::Rect {
            min: point(a.min.x.min(b.min.x), a.min.y.min(b.min.y)),
            max: point(a.max.x.max(b.max.x), a.max.y.max(b.max.y)),
        })
        .map(|r| InkBox {
            left: r.min.x as i32,
            top: r.min.y as i32,
            width: (r.max.x - r.min.x) as u32,
            height: (r.max.y - r.min.y) as u32,
        });

    TextLayout { glyphs, ink }
}

/// Ink box of `text` rendered with `font` at `size`, or `None` when nothing
/// would be drawn (empty or whitespace-only text).
pub fn measure_text(font: &impl Font, size: f32, text: &str) -> Option<InkBox> {
    layout_text(font, em_scale(font, size), text).ink
}

/// Add a white border of `config.border_pixels()` on every side and draw
/// `signature` in black near the bottom-right corner.
///
/// The signature's ink box ends exactly `config.margin` pixels from the right
/// and bottom edges. Images with an alpha channel come back as RGBA8,
/// everything else as RGB8.
pub fn frame_and_sign(
    image: &DynamicImage,
    signature: &str,
    font: &impl Font,
    config: &FrameConfig,
) -> DynamicImage {
    let border = config.border_pixels();
    if image.color().has_alpha() {
        DynamicImage::ImageRgba8(compose(
            &image.to_rgba8(),
            Rgba([255, 255, 255, 255]),
            Rgba([0, 0, 0, 255]),
            border,
            signature,
            font,
            config,
        ))
    } else {
        DynamicImage::ImageRgb8(compose(
            &image.to_rgb8(),
            Rgb([255, 255, 255]),
            Rgb([0, 0, 0]),
            border,
            signature,
            font,
            config,
        ))
    }
}

fn compose<P>(
    source: &ImageBuffer<P, Vec<P::Subpixel>>,
    background: P,
    ink: P,
    border: u32,
    signature: &str,
    font: &impl Font,
    config: &FrameConfig,
) -> ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel<Subpixel = u8>,
{
    let (width, height) = source.dimensions();
    let mut canvas = ImageBuffer::from_pixel(
        width.saturating_add(border.saturating_mul(2)),
        height.saturating_add(border.saturating_mul(2)),
        background,
    );
    imageops::replace(&mut canvas, source, i64::from(border), i64::from(border));

    let layout = layout_text(font, em_scale(font, config.font_size), signature);
    let Some(ink_box) = layout.ink else {
        return canvas;
    };

    let (x, y) = text_origin(canvas.dimensions(), ink_box.size(), config.margin);
    log::debug!(
        "  Signature box {}x{} at ({x}, {y}) on {}x{} canvas",
        ink_box.width,
        ink_box.height,
        canvas.width(),
        canvas.height()
    );

    // Shift by the ink offset so the box, not the layout origin, lands at (x, y)
    let (canvas_w, canvas_h) = (i64::from(canvas.width()), i64::from(canvas.height()));
    for glyph in &layout.glyphs {
        let bounds = glyph.px_bounds();
        let left = i64::from(x) + (bounds.min.x as i64 - i64::from(ink_box.left));
        let top = i64::from(y) + (bounds.min.y as i64 - i64::from(ink_box.top));
        glyph.draw(|gx, gy, coverage| {
            let (px, py) = (left + i64::from(gx), top + i64::from(gy));
            if (0..canvas_w).contains(&px) && (0..canvas_h).contains(&py) {
                let pixel = canvas.get_pixel_mut(px as u32, py as u32);
                let coverage = coverage.clamp(0.0, 1.0);
                *pixel = weighted_sum(*pixel, ink, 1.0 - coverage, coverage);
            }
        });
    }

    canvas
}
