use anyhow::{Context, Result};
use nom_exif::*;
use serde::Serialize;
use std::path::Path;

// IFD0 tag IDs
const TAG_ARTIST: u16 = 0x013B;
const TAG_COPYRIGHT: u16 = 0x8298;

// UserComment starts with an 8-byte character code
const USER_COMMENT_PREFIXES: &[&str] = &["ASCII\0\0\0", "UNICODE\0", "JIS\0\0\0\0\0", "\0\0\0\0\0\0\0\0"];

/// Attribution fields found in an image.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Attribution {
    pub artist: Option<String>,
    pub copyright: Option<String>,
    pub comment: Option<String>,
}

impl Attribution {
    pub fn is_empty(&self) -> bool {
        self.artist.is_none() && self.copyright.is_none() && self.comment.is_none()
    }
}

/// Read Artist, Copyright and UserComment from an image file.
///
/// A file without EXIF yields an empty [`Attribution`], not an error.
pub fn read_attribution(path: &Path) -> Result<Attribution> {
    let mut parser = MediaParser::new();
    let ms = MediaSource::file_path(path).context("Failed to open image file")?;

    let iter: ExifIter = match parser.parse(ms) {
        Ok(iter) => iter,
        Err(_) => {
            log::debug!("No EXIF data found in {}", path.display());
            return Ok(Attribution::default());
        }
    };
    let exif: Exif = iter.into();

    Ok(Attribution {
        artist: exif.get_by_ifd_tag_code(0, TAG_ARTIST).and_then(entry_to_string),
        copyright: exif.get_by_ifd_tag_code(0, TAG_COPYRIGHT).and_then(entry_to_string),
        comment: exif.get(ExifTag::UserComment).and_then(entry_to_string).map(strip_charset),
    })
}

/// Convert an EntryValue to an Option<String>.
fn entry_to_string(val: &EntryValue) -> Option<String> {
    let s = val.to_string();
    let s = s.trim().trim_matches('"').trim_end_matches('\0').to_string();
    if s.is_empty() { None } else { Some(s) }
}

fn strip_charset(s: String) -> String {
    USER_COMMENT_PREFIXES
        .iter()
        .find_map(|prefix| s.strip_prefix(prefix))
        .map(str::to_string)
        .unwrap_or(s)
}
