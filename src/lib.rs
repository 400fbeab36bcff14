//! # photo-sign
//!
//! Batch signing for exported photos. Two independent pipelines run over the
//! files directly inside one directory:
//!
//! - **sign** — overwrite the Artist, Copyright and UserComment fields with a
//!   signature (via `exiftool`, or in process for JPEG)
//! - **watermark** — add a white border sized in centimeters at a target DPI,
//!   draw the signature in the bottom-right corner and save with that DPI
//!   embedded; camera raw files are demosaiced first and written to a
//!   `<stem>_watermarked.jpg` sibling
//!
//! Every file gets a [`FileReport`](pipeline::FileReport); one bad file never
//! stops the batch.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use photo_sign::config::Config;
//! use photo_sign::exif::build_signer;
//! use photo_sign::pipeline::{sign_directory, Watermarker};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load(Some("config.json".as_ref()))?;
//!     let dir = std::path::Path::new("/Volumes/backup");
//!
//!     // 1. Frame and watermark
//!     let watermarker = Watermarker::new(config.frame.clone());
//!     for report in watermarker.watermark_directory(dir, "Jane Doe")? {
//!         println!("{}: {:?}", report.path.display(), report.outcome);
//!     }
//!
//!     // 2. Write attribution metadata
//!     let signer = build_signer(&config.signer);
//!     sign_directory(dir, "Jane Doe", signer.as_ref(), false)?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Side effects
//!
//! Standard images and signed files are overwritten in place without a
//! backup; snapshot the directory first if you need one. EXIF orientation is
//! not applied before framing, so rotated shots are framed as stored.
//!
//! ## Modules
//!
//! - [`config`] — Configuration types and loading/saving
//! - [`exif`] — Attribution writing (exiftool / native) and reading
//! - [`frame`] — Border math, text placement, compositing and DPI-aware saving
//! - [`pipeline`] — Directory dispatch and per-file outcomes

pub mod config;
pub mod exif;
pub mod frame;
pub mod pipeline;
