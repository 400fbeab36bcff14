use anyhow::{Context, Result};
use img_parts::jpeg::Jpeg;
use img_parts::{Bytes, ImageEXIF};
use little_exif::exif_tag::ExifTag;
use little_exif::filetype::FileExtension;
use little_exif::metadata::Metadata;
use std::path::Path;

use super::Signer;
use crate::pipeline::FailureKind;

// little_exif as_u8_vec(JPEG) returns: [APP1 marker 2B][length 2B][Exif\0\0 6B][TIFF data]
// img-parts set_exif() expects just the TIFF data (after Exif\0\0)
const JPEG_EXIF_OVERHEAD: usize = 10; // 2 + 2 + 6

// UserComment character code prefix (8 bytes)
const USER_COMMENT_ASCII: &[u8; 8] = b"ASCII\0\0\0";
const USER_COMMENT_UNICODE: &[u8; 8] = b"UNICODE\0";

/// Signs JPEG files in process, without external tools.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeSigner;

impl Signer for NativeSigner {
    fn name(&self) -> &str {
        "native"
    }

    fn sign(&self, path: &Path, signature: &str) -> Result<()> {
        write_attribution(path, signature)
    }

    fn failure_kind(&self) -> FailureKind {
        FailureKind::MetadataWrite
    }
}

/// UserComment payload: 8-byte character code followed by the text.
/// Non-ASCII text is stored as UTF-16LE, matching little_exif's little-endian TIFF output.
fn user_comment_bytes(text: &str) -> Vec<u8> {
    if text.is_ascii() {
        let mut bytes = USER_COMMENT_ASCII.to_vec();
        bytes.extend_from_slice(text.as_bytes());
        bytes
    } else {
        let mut bytes = USER_COMMENT_UNICODE.to_vec();
        bytes.extend(text.encode_utf16().flat_map(|c| c.to_le_bytes()));
        bytes
    }
}

fn attribution_tags(signature: &str) -> [ExifTag; 3] {
    [
        ExifTag::Artist(signature.to_string()),
        ExifTag::Copyright(signature.to_string()),
        ExifTag::UserComment(user_comment_bytes(signature)),
    ]
}

/// Load existing EXIF metadata from a file path using little_exif.
/// Returns None if it can't parse (the file keeps its other segments either way).
fn load_existing_metadata(path: &Path) -> Option<Metadata> {
    let path_owned = path.to_path_buf();
    // little_exif panics on some malformed IFDs
    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(|_| {}));
    let result = std::panic::catch_unwind(move || Metadata::new_from_path(&path_owned));
    std::panic::set_hook(prev_hook);

    match result {
        Ok(Ok(m)) if !m.data().is_empty() => {
            log::debug!("little_exif loaded {} existing EXIF tags", m.data().len());
            Some(m)
        }
        Ok(Ok(_)) => None,
        Ok(Err(e)) => {
            log::debug!("little_exif could not parse EXIF: {e}");
            None
        }
        Err(_) => {
            log::debug!("little_exif panicked parsing EXIF");
            None
        }
    }
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_lowercase().as_str(), "jpg" | "jpeg"))
        .unwrap_or(false)
}

/// Overwrite Artist, Copyright and UserComment of a JPEG in place.
///
/// Existing EXIF tags are kept when little_exif can parse them; if it can't,
/// the EXIF segment is replaced by one holding only the attribution tags.
/// All other JPEG segments (XMP, IPTC, ICC, ...) are preserved byte for byte.
pub fn write_attribution(path: &Path, signature: &str) -> Result<()> {
    if !is_jpeg(path) {
        anyhow::bail!(
            "Native signing only supports JPEG; use the exiftool backend for {}",
            path.display()
        );
    }

    let file_bytes = std::fs::read(path).context("Failed to read image file")?;
    let mut jpeg = Jpeg::from_bytes(Bytes::from(file_bytes))
        .map_err(|e| anyhow::anyhow!("Failed to parse JPEG: {e}"))?;

    let orig_exif_pos = find_exif_segment_pos(&jpeg);

    let mut metadata = load_existing_metadata(path).unwrap_or_else(|| {
        if jpeg.exif().is_some() {
            log::warn!(
                "Existing EXIF in {} is unreadable; replacing it with attribution tags only",
                path.display()
            );
        }
        Metadata::new()
    });
    for tag in attribution_tags(signature) {
        metadata.set_tag(tag);
    }

    let exif_bytes = metadata.as_u8_vec(FileExtension::JPEG);
    if exif_bytes.len() <= JPEG_EXIF_OVERHEAD {
        anyhow::bail!("little_exif produced an empty EXIF segment");
    }
    jpeg.set_exif(Some(Bytes::from(exif_bytes[JPEG_EXIF_OVERHEAD..].to_vec())));

    // set_exif() inserts at a fixed position; move EXIF back where it was so it
    // stays ahead of XMP (required by many EXIF parsers).
    if let Some(new_pos) = find_exif_segment_pos(&jpeg) {
        let target_pos = orig_exif_pos.unwrap_or(1).min(new_pos);
        if new_pos != target_pos {
            let segments = jpeg.segments_mut();
            let seg = segments.remove(new_pos);
            segments.insert(target_pos, seg);
        }
    }

    let output = jpeg.encoder().bytes();
    std::fs::write(path, &output).context("Failed to write JPEG file")?;
    Ok(())
}

/// Find the position of the EXIF APP1 segment in a JPEG.
/// EXIF segments have marker 0xE1 (APP1) and contents starting with "Exif\0\0".
fn find_exif_segment_pos(jpeg: &Jpeg) -> Option<usize> {
    const EXIF_PREFIX: &[u8] = b"Exif\0\0";
    jpeg.segments()
        .iter()
        .position(|s| s.marker() == 0xE1 && s.contents().starts_with(EXIF_PREFIX))
}
