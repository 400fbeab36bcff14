use anyhow::{Context, Result};
use image::ImageReader;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::FrameConfig;
use crate::exif::Signer;
use crate::frame::{self, LibRawDecoder, RawDecoder};

/// Extensions the metadata signer handles.
const SIGNABLE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "heic", "dng"];

/// How the watermark compositor treats a file, decided by its extension.
///
/// # Example
///
/// ```rust
/// use photo_sign::pipeline::ImageKind;
/// use std::path::Path;
///
/// assert_eq!(ImageKind::from_path(Path::new("photo.HEIC")), Some(ImageKind::Standard));
/// assert_eq!(ImageKind::from_path(Path::new("photo.dng")), Some(ImageKind::Raw));
/// assert_eq!(ImageKind::from_path(Path::new("notes.txt")), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageKind {
    /// JPEG, PNG, HEIC: decoded directly and overwritten in place
    Standard,
    /// Camera raw (DNG): demosaiced and written to a `_watermarked.jpg` sibling
    Raw,
}

impl ImageKind {
    /// Determine the image kind from a file path extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match lowercase_extension(path)?.as_str() {
            "jpg" | "jpeg" | "png" | "heic" => Some(Self::Standard),
            "dng" => Some(Self::Raw),
            _ => None,
        }
    }
}

fn lowercase_extension(path: &Path) -> Option<String> {
    Some(path.extension()?.to_str()?.to_lowercase())
}

/// Check if a file has an extension the metadata signer accepts.
pub fn is_signable(path: &Path) -> bool {
    lowercase_extension(path)
        .map(|ext| SIGNABLE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Why a file was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Filename already carries the watermark marker.
    AlreadyWatermarked,
    /// Extension is not handled by this pipeline.
    Unrecognized,
}

/// Failure classes reported per file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Unreadable, corrupt or unsupported image / raw file.
    Decode,
    /// Font file missing or unreadable.
    ResourceLoad,
    /// Encoding or writing the output failed.
    Encode,
    /// The external metadata tool failed or could not be launched.
    ExternalTool,
    /// In-process metadata writing failed.
    MetadataWrite,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Decode => "decode error",
            Self::ResourceLoad => "resource load error",
            Self::Encode => "save error",
            Self::ExternalTool => "external tool error",
            Self::MetadataWrite => "metadata write error",
        };
        f.write_str(label)
    }
}

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    /// Processed; `output` is the file that was written.
    Done { output: PathBuf },
    /// Dry run: `output` is the file that would be written.
    Planned { output: PathBuf },
    /// Left untouched; `reason` says why.
    Skipped { reason: SkipReason },
    /// Not processed; `detail` carries the full error chain.
    Failed { kind: FailureKind, detail: String },
}

impl FileOutcome {
    fn failed(kind: FailureKind, err: &anyhow::Error) -> Self {
        Self::Failed {
            kind,
            detail: format!("{err:#}"),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Planned { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// The result of processing a single directory entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: FileOutcome,
}

impl FileReport {
    /// Log this report as one human-readable line.
    pub fn log(&self) {
        let path = self.path.display();
        match &self.outcome {
            FileOutcome::Done { output } if *output == self.path => log::info!("Done: {path}"),
            FileOutcome::Done { output } => log::info!("Done: {path} -> {}", output.display()),
            FileOutcome::Planned { output } => {
                log::info!("Would process: {path} -> {}", output.display())
            }
            FileOutcome::Skipped {
                reason: SkipReason::AlreadyWatermarked,
            } => log::info!("Already processed, skipping: {path}"),
            FileOutcome::Skipped {
                reason: SkipReason::Unrecognized,
            } => log::info!("Unhandled format, skipping: {path}"),
            FileOutcome::Failed { kind, detail } => log::error!("{kind} for {path}: {detail}"),
        }
    }
}

/// Counts of outcomes across a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_reports(reports: &[FileReport]) -> Self {
        let mut summary = Self::default();
        for report in reports {
            match report.outcome {
                FileOutcome::Done { .. } | FileOutcome::Planned { .. } => summary.succeeded += 1,
                FileOutcome::Skipped { .. } => summary.skipped += 1,
                FileOutcome::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }
}

/// List the regular files directly inside `dir`, in the order the filesystem yields them.
///
/// Sub-directories are not descended into. Unreadable entries are logged and left out.
///
/// # Example
///
/// ```rust,no_run
/// use photo_sign::pipeline::list_directory;
///
/// let files = list_directory("./exports".as_ref()).unwrap();
/// println!("Found {} files", files.len());
/// ```
pub fn list_directory(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("Not a directory: {}", dir.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry in {}: {e}", dir.display());
                continue;
            }
        };
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        } else {
            log::debug!("Ignoring non-file entry: {}", entry.path().display());
        }
    }

    Ok(files)
}

fn file_name_contains(path: &Path, marker: &str) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().contains(marker))
        .unwrap_or(false)
}

/// Frames and signs images, one file at a time.
///
/// # Example
///
/// ```rust,no_run
/// use photo_sign::config::FrameConfig;
/// use photo_sign::pipeline::Watermarker;
///
/// let watermarker = Watermarker::new(FrameConfig::default());
/// let reports = watermarker
///     .watermark_directory("./exports".as_ref(), "Jane Doe")
///     .unwrap();
/// for report in &reports {
///     report.log();
/// }
/// ```
pub struct Watermarker {
    config: FrameConfig,
    raw_decoder: Box<dyn RawDecoder>,
    dry_run: bool,
}

impl Watermarker {
    /// Watermarker using the LibRaw decoder for raw files.
    pub fn new(config: FrameConfig) -> Self {
        Self::with_raw_decoder(config, Box::new(LibRawDecoder))
    }

    pub fn with_raw_decoder(config: FrameConfig, raw_decoder: Box<dyn RawDecoder>) -> Self {
        Self {
            config,
            raw_decoder,
            dry_run: false,
        }
    }

    /// Report what would be written without touching any file.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Process every file directly inside `dir`.
    ///
    /// Only a missing or unreadable directory is an error; per-file problems
    /// are returned as [`FileOutcome::Failed`] and the batch carries on.
    pub fn watermark_directory(&self, dir: &Path, signature: &str) -> Result<Vec<FileReport>> {
        let files = list_directory(dir)?;
        let total = files.len();
        log::debug!("Found {total} file(s) in {}", dir.display());

        let mut reports = Vec::with_capacity(total);
        for (i, path) in files.into_iter().enumerate() {
            log::debug!("[{}/{}] {}", i + 1, total, path.display());
            let outcome = self.watermark_file(&path, signature);
            let report = FileReport { path, outcome };
            report.log();
            reports.push(report);
        }
        Ok(reports)
    }

    /// Frame and sign one file, choosing the branch from its name.
    pub fn watermark_file(&self, path: &Path, signature: &str) -> FileOutcome {
        if file_name_contains(path, &self.config.marker) {
            return FileOutcome::Skipped {
                reason: SkipReason::AlreadyWatermarked,
            };
        }

        let Some(kind) = ImageKind::from_path(path) else {
            return FileOutcome::Skipped {
                reason: SkipReason::Unrecognized,
            };
        };

        let output = match kind {
            ImageKind::Standard => path.to_path_buf(),
            ImageKind::Raw => frame::watermarked_path(path, &self.config.marker),
        };

        if self.dry_run {
            return FileOutcome::Planned { output };
        }

        // Decode
        let decoded = match kind {
            ImageKind::Standard => decode_standard(path),
            ImageKind::Raw => self
                .raw_decoder
                .decode(path)
                .map(image::DynamicImage::ImageRgb8)
                .with_context(|| format!("{} could not decode the raw file", self.raw_decoder.name())),
        };
        let image = match decoded {
            Ok(image) => image,
            Err(e) => return FileOutcome::failed(FailureKind::Decode, &e),
        };

        // Font (per file; a missing font must not leave a half-written file)
        let font = match frame::load_font(&self.config.font_path) {
            Ok(font) => font,
            Err(e) => return FileOutcome::failed(FailureKind::ResourceLoad, &e),
        };

        let framed = frame::frame_and_sign(&image, signature, &font, &self.config);

        match frame::save_with_dpi(&framed, &output, self.config.target_dpi, self.config.jpeg_quality) {
            Ok(()) => FileOutcome::Done { output },
            Err(e) => FileOutcome::failed(FailureKind::Encode, &e),
        }
    }
}

/// Decode a standard image. HEIF goes through libheif; everything else sniffs
/// the content rather than trusting the extension. No orientation correction
/// is applied.
fn decode_standard(path: &Path) -> Result<image::DynamicImage> {
    if frame::is_heif(path) {
        return frame::decode_heif(path);
    }
    let image = ImageReader::open(path)
        .context("Failed to open image")?
        .with_guessed_format()
        .context("Failed to read image header")?
        .decode()
        .context("Failed to decode image")?;
    log::debug!("  Decoded {}x{} {:?}", image.width(), image.height(), image.color());
    Ok(image)
}

/// Write the attribution fields of every signable file directly inside `dir`.
///
/// Files are overwritten in place with no backup. The watermark marker is not
/// consulted: composited outputs are signed like any other JPEG.
///
/// # Example
///
/// ```rust,no_run
/// use photo_sign::config::SignerConfig;
/// use photo_sign::exif::build_signer;
/// use photo_sign::pipeline::sign_directory;
///
/// let signer = build_signer(&SignerConfig::default());
/// let reports = sign_directory("./exports".as_ref(), "Jane Doe", signer.as_ref(), false).unwrap();
/// println!("{} files processed", reports.len());
/// ```
pub fn sign_directory(
    dir: &Path,
    signature: &str,
    signer: &dyn Signer,
    dry_run: bool,
) -> Result<Vec<FileReport>> {
    let files = list_directory(dir)?;
    let total = files.len();
    log::debug!("Found {total} file(s) in {}; signing with {}", dir.display(), signer.name());

    let mut reports = Vec::with_capacity(total);
    for (i, path) in files.into_iter().enumerate() {
        log::debug!("[{}/{}] {}", i + 1, total, path.display());
        let outcome = sign_file(&path, signature, signer, dry_run);
        let report = FileReport { path, outcome };
        report.log();
        reports.push(report);
    }
    Ok(reports)
}

/// Sign one file if its extension is accepted.
pub fn sign_file(path: &Path, signature: &str, signer: &dyn Signer, dry_run: bool) -> FileOutcome {
    if !is_signable(path) {
        return FileOutcome::Skipped {
            reason: SkipReason::Unrecognized,
        };
    }
    if dry_run {
        return FileOutcome::Planned {
            output: path.to_path_buf(),
        };
    }
    match signer.sign(path, signature) {
        Ok(()) => FileOutcome::Done {
            output: path.to_path_buf(),
        },
        Err(e) => FileOutcome::failed(signer.failure_kind(), &e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::tests::{fixture_config, fixture_font_path};
    use image::{DynamicImage, Rgb, RgbImage};
    use std::cell::RefCell;
    use std::fs;
    use tempfile::TempDir;

    fn write_jpeg(path: &Path, width: u32, height: u32) {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([120, 130, 140])))
            .save(path)
            .unwrap();
    }

    fn outcome_for<'a>(reports: &'a [FileReport], name: &str) -> &'a FileOutcome {
        &reports
            .iter()
            .find(|r| r.path.file_name().unwrap() == name)
            .unwrap_or_else(|| panic!("no report for {name}"))
            .outcome
    }

    /// Raw decoder returning a fixed gray frame.
    struct FakeRawDecoder {
        width: u32,
        height: u32,
    }

    impl RawDecoder for FakeRawDecoder {
        fn name(&self) -> &str {
            "fake"
        }

        fn decode(&self, _path: &Path) -> Result<RgbImage> {
            Ok(RgbImage::from_pixel(self.width, self.height, Rgb([128, 128, 128])))
        }
    }

    /// Signer that records calls and fails on demand.
    struct RecordingSigner {
        calls: RefCell<Vec<(PathBuf, String)>>,
        fail: bool,
    }

    impl RecordingSigner {
        fn new(fail: bool) -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                fail,
            }
        }
    }

    impl Signer for RecordingSigner {
        fn name(&self) -> &str {
            "recording"
        }

        fn sign(&self, path: &Path, signature: &str) -> Result<()> {
            self.calls
                .borrow_mut()
                .push((path.to_path_buf(), signature.to_string()));
            if self.fail {
                anyhow::bail!("simulated exit status 1");
            }
            Ok(())
        }

        fn failure_kind(&self) -> FailureKind {
            FailureKind::ExternalTool
        }
    }

    // ── ImageKind / is_signable ──────────────────────────────────────

    #[test]
    fn image_kind_standard() {
        for name in ["a.jpg", "a.jpeg", "a.png", "a.heic", "A.JPG", "a.Png", "a.HEIC"] {
            assert_eq!(ImageKind::from_path(Path::new(name)), Some(ImageKind::Standard), "{name}");
        }
    }

    #[test]
    fn image_kind_raw() {
        assert_eq!(ImageKind::from_path(Path::new("a.dng")), Some(ImageKind::Raw));
        assert_eq!(ImageKind::from_path(Path::new("a.DNG")), Some(ImageKind::Raw));
    }

    #[test]
    fn image_kind_unsupported() {
        for name in ["a.txt", "a.tif", "a.cr2", "a.webp", "noext", ".jpg"] {
            assert_eq!(ImageKind::from_path(Path::new(name)), None, "{name}");
        }
    }

    #[test]
    fn signable_extensions() {
        assert!(is_signable(Path::new("a.jpg")));
        assert!(is_signable(Path::new("a.JPEG")));
        assert!(is_signable(Path::new("a.heic")));
        assert!(is_signable(Path::new("a.dng")));
        assert!(!is_signable(Path::new("a.png")));
        assert!(!is_signable(Path::new("a.txt")));
        assert!(!is_signable(Path::new("noext")));
    }

    // ── list_directory ───────────────────────────────────────────────

    #[test]
    fn list_is_not_recursive() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(dir.path().join("a.jpg"), b"x").unwrap();
        fs::write(sub.join("b.jpg"), b"x").unwrap();

        let files = list_directory(dir.path()).unwrap();
        assert_eq!(files, vec![dir.path().join("a.jpg")]);
    }

    #[test]
    fn list_missing_directory_fails() {
        assert!(list_directory(Path::new("/nonexistent/dir")).is_err());
    }

    #[test]
    fn list_file_instead_of_directory_fails() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.jpg");
        fs::write(&file, b"x").unwrap();
        assert!(list_directory(&file).is_err());
    }

    // ── watermark_file ───────────────────────────────────────────────

    #[test]
    fn standard_file_is_framed_in_place() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        write_jpeg(&path, 200, 100);

        let config = fixture_config();
        let border = config.border_pixels();
        let outcome = Watermarker::new(config).watermark_file(&path, "Jane Doe");
        assert_eq!(outcome, FileOutcome::Done { output: path.clone() });

        let framed = image::open(&path).unwrap();
        assert_eq!(framed.width(), 200 + 2 * border);
        assert_eq!(framed.height(), 100 + 2 * border);
    }

    #[test]
    fn png_is_framed_in_place() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shot.png");
        DynamicImage::ImageRgb8(RgbImage::new(30, 30)).save(&path).unwrap();

        let config = FrameConfig { border_cm: 0.5, ..fixture_config() };
        let border = config.border_pixels();
        let outcome = Watermarker::new(config).watermark_file(&path, "x");
        assert!(outcome.is_success());
        assert_eq!(image::open(&path).unwrap().width(), 30 + 2 * border);
    }

    #[cfg(feature = "heic")]
    #[test]
    fn heic_file_is_framed_in_place() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("IMG_1.heic");
        let source = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 48, Rgb([40, 80, 160])));
        fs::write(&path, frame::encode_heif(&source, 80).unwrap()).unwrap();

        let config = FrameConfig { border_cm: 0.5, ..fixture_config() };
        let border = config.border_pixels();
        let outcome = Watermarker::new(config).watermark_file(&path, "Jane Doe");
        assert_eq!(outcome, FileOutcome::Done { output: path.clone() });

        let framed = frame::decode_heif(&path).unwrap();
        assert_eq!((framed.width(), framed.height()), (64 + 2 * border, 48 + 2 * border));
    }

    #[cfg(not(feature = "heic"))]
    #[test]
    fn heic_without_feature_is_a_decode_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("IMG_1.heic");
        fs::write(&path, b"\0\0\0\x18ftypheic").unwrap();
        let before = fs::read(&path).unwrap();

        match Watermarker::new(fixture_config()).watermark_file(&path, "x") {
            FileOutcome::Failed { kind, detail } => {
                assert_eq!(kind, FailureKind::Decode);
                assert!(detail.contains("`heic` feature"), "{detail}");
            }
            other => panic!("expected a decode failure, got {other:?}"),
        }
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn marker_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo_watermarked.jpg");
        write_jpeg(&path, 10, 10);
        let before = fs::read(&path).unwrap();

        let outcome = Watermarker::new(fixture_config()).watermark_file(&path, "x");
        assert_eq!(
            outcome,
            FileOutcome::Skipped {
                reason: SkipReason::AlreadyWatermarked
            }
        );
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn marker_check_precedes_extension() {
        let outcome =
            Watermarker::new(fixture_config()).watermark_file(Path::new("x_watermarked.txt"), "x");
        assert_eq!(
            outcome,
            FileOutcome::Skipped {
                reason: SkipReason::AlreadyWatermarked
            }
        );
    }

    #[test]
    fn unknown_extension_is_skipped() {
        let outcome = Watermarker::new(fixture_config()).watermark_file(Path::new("notes.txt"), "x");
        assert_eq!(
            outcome,
            FileOutcome::Skipped {
                reason: SkipReason::Unrecognized
            }
        );
    }

    #[test]
    fn corrupt_file_is_a_decode_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.jpg");
        fs::write(&path, b"garbage").unwrap();

        let outcome = Watermarker::new(fixture_config()).watermark_file(&path, "x");
        assert!(matches!(
            outcome,
            FileOutcome::Failed {
                kind: FailureKind::Decode,
                ..
            }
        ));
        assert_eq!(fs::read(&path).unwrap(), b"garbage");
    }

    #[test]
    fn missing_font_is_a_resource_failure_and_file_is_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        write_jpeg(&path, 20, 20);
        let before = fs::read(&path).unwrap();

        let config = FrameConfig {
            font_path: dir.path().join("missing.ttc"),
            ..FrameConfig::default()
        };
        let outcome = Watermarker::new(config).watermark_file(&path, "x");
        match outcome {
            FileOutcome::Failed { kind, detail } => {
                assert_eq!(kind, FailureKind::ResourceLoad);
                assert!(detail.contains("missing.ttc"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn raw_file_goes_to_sibling() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("IMG_0001.dng");
        fs::write(&path, b"pretend raw bytes").unwrap();

        let config = fixture_config();
        let border = config.border_pixels();
        let watermarker = Watermarker::with_raw_decoder(
            config,
            Box::new(FakeRawDecoder {
                width: 300,
                height: 200,
            }),
        );
        let outcome = watermarker.watermark_file(&path, "Jane Doe");

        let expected = dir.path().join("IMG_0001_watermarked.jpg");
        assert_eq!(outcome, FileOutcome::Done { output: expected.clone() });
        assert_eq!(fs::read(&path).unwrap(), b"pretend raw bytes");

        let framed = image::open(&expected).unwrap();
        assert_eq!(framed.width(), 300 + 2 * border);
        assert_eq!(framed.height(), 200 + 2 * border);
    }

    #[test]
    fn corrupt_raw_is_a_decode_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("IMG_0002.dng");
        fs::write(&path, b"not raw").unwrap();

        let outcome = Watermarker::new(fixture_config()).watermark_file(&path, "x");
        assert!(matches!(
            outcome,
            FileOutcome::Failed {
                kind: FailureKind::Decode,
                ..
            }
        ));
        assert!(!dir.path().join("IMG_0002_watermarked.jpg").exists());
        assert_eq!(fs::read(&path).unwrap(), b"not raw");
    }

    #[test]
    fn dry_run_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let jpg = dir.path().join("a.jpg");
        let dng = dir.path().join("b.dng");
        write_jpeg(&jpg, 10, 10);
        fs::write(&dng, b"raw").unwrap();
        let before = fs::read(&jpg).unwrap();

        let watermarker = Watermarker::new(fixture_config()).dry_run(true);
        assert_eq!(
            watermarker.watermark_file(&jpg, "x"),
            FileOutcome::Planned { output: jpg.clone() }
        );
        assert_eq!(
            watermarker.watermark_file(&dng, "x"),
            FileOutcome::Planned {
                output: dir.path().join("b_watermarked.jpg")
            }
        );
        assert_eq!(fs::read(&jpg).unwrap(), before);
        assert!(!dir.path().join("b_watermarked.jpg").exists());
    }

    // ── watermark_directory ──────────────────────────────────────────

    #[test]
    fn second_run_skips_raw_outputs() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("r.dng"), b"raw").unwrap();

        let watermarker = Watermarker::with_raw_decoder(
            fixture_config(),
            Box::new(FakeRawDecoder {
                width: 40,
                height: 40,
            }),
        );

        let first = watermarker.watermark_directory(dir.path(), "x").unwrap();
        assert_eq!(first.len(), 1);
        assert!(outcome_for(&first, "r.dng").is_success());

        let output = dir.path().join("r_watermarked.jpg");
        let produced = fs::read(&output).unwrap();

        let second = watermarker.watermark_directory(dir.path(), "x").unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(
            *outcome_for(&second, "r_watermarked.jpg"),
            FileOutcome::Skipped {
                reason: SkipReason::AlreadyWatermarked
            }
        );
        // the raw file is reprocessed, which rewrites the same output
        assert!(outcome_for(&second, "r.dng").is_success());
        assert_eq!(fs::read(&output).unwrap(), produced);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let watermarker = Watermarker::new(fixture_config());
        assert!(watermarker
            .watermark_directory(Path::new("/nonexistent/exports"), "x")
            .is_err());
    }

    // ── sign_file / sign_directory ───────────────────────────────────

    #[test]
    fn sign_passes_path_and_signature() {
        let signer = RecordingSigner::new(false);
        let outcome = sign_file(Path::new("photo.jpg"), "Jane Doe", &signer, false);
        assert_eq!(
            outcome,
            FileOutcome::Done {
                output: PathBuf::from("photo.jpg")
            }
        );
        assert_eq!(
            *signer.calls.borrow(),
            vec![(PathBuf::from("photo.jpg"), "Jane Doe".to_string())]
        );
    }

    #[test]
    fn sign_failure_is_reported() {
        let signer = RecordingSigner::new(true);
        match sign_file(Path::new("photo.heic"), "x", &signer, false) {
            FileOutcome::Failed { kind, detail } => {
                assert_eq!(kind, FailureKind::ExternalTool);
                assert!(detail.contains("simulated exit status 1"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn sign_skips_png_and_dry_run_does_not_call() {
        let signer = RecordingSigner::new(false);
        assert_eq!(
            sign_file(Path::new("a.png"), "x", &signer, false),
            FileOutcome::Skipped {
                reason: SkipReason::Unrecognized
            }
        );
        assert!(sign_file(Path::new("a.jpg"), "x", &signer, true).is_success());
        assert!(signer.calls.borrow().is_empty());
    }

    #[test]
    fn sign_directory_continues_after_failures() {
        let dir = TempDir::new().unwrap();
        for name in ["a.jpg", "b.dng", "c.heic", "d.txt", "e_watermarked.jpg"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let signer = RecordingSigner::new(true);
        let reports = sign_directory(dir.path(), "x", &signer, false).unwrap();
        assert_eq!(reports.len(), 5);
        assert_eq!(signer.calls.borrow().len(), 4);

        let summary = BatchSummary::from_reports(&reports);
        assert_eq!(
            summary,
            BatchSummary {
                succeeded: 0,
                skipped: 1,
                failed: 4
            }
        );
    }

    // ── reports ──────────────────────────────────────────────────────

    #[test]
    fn report_serializes_with_status_tag() {
        let report = FileReport {
            path: PathBuf::from("a.jpg"),
            outcome: FileOutcome::Failed {
                kind: FailureKind::Decode,
                detail: "bad".to_string(),
            },
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"]["status"], "failed");
        assert_eq!(json["outcome"]["kind"], "decode");
        assert_eq!(json["outcome"]["detail"], "bad");

        let skipped = serde_json::to_value(FileOutcome::Skipped {
            reason: SkipReason::AlreadyWatermarked,
        })
        .unwrap();
        assert_eq!(skipped["reason"], "already_watermarked");
    }

    #[test]
    fn fixture_font_exists() {
        assert!(fixture_font_path().is_file());
    }
}
