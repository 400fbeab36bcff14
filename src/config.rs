use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Handwriting-style font shipped with macOS, used when no other font is configured.
pub const DEFAULT_FONT_PATH: &str = "/System/Library/Fonts/Supplemental/MarkerFelt.ttc";

/// Filename marker appended to raw-decoded outputs.
pub const WATERMARK_MARKER: &str = "_watermarked";

/// Top-level configuration for photo-sign.
///
/// Every operation takes the section it needs explicitly, so tests and
/// callers can swap fonts or resolutions without touching shared state.
///
/// # Loading
///
/// ```rust,no_run
/// use photo_sign::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.frame.target_dpi = 600;
/// config.frame.font_path = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf".into();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Border and watermark settings.
    pub frame: FrameConfig,
    /// How attribution fields are written.
    pub signer: SignerConfig,
    /// Output behavior (dry run).
    pub output: OutputConfig,
}

/// Controls the white border and the signature overlay.
///
/// # Example
///
/// ```rust
/// use photo_sign::config::FrameConfig;
///
/// let frame = FrameConfig {
///     border_cm: 1.0,
///     target_dpi: 240,
///     ..FrameConfig::default()
/// };
/// assert_eq!(frame.border_pixels(), 94);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Border width on each side, in centimeters.
    pub border_cm: f64,
    /// Resolution used to convert the border to pixels and embedded in saved files.
    pub target_dpi: u32,
    /// TrueType/OpenType font (or collection) used for the signature.
    pub font_path: PathBuf,
    /// Font em size in pixels.
    pub font_size: f32,
    /// Inset of the signature from the bottom-right corner, in pixels.
    pub margin: u32,
    /// Quality used when writing JPEG output (1-100).
    pub jpeg_quality: u8,
    /// Filename substring that marks an already processed file.
    pub marker: String,
}

/// Which metadata writer signs files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignerBackend {
    /// Spawn the external `exiftool` binary.
    ExifTool,
    /// Write EXIF in process (JPEG only).
    Native,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignerConfig {
    pub backend: SignerBackend,
    /// Program name or path of the exiftool binary.
    pub exiftool_path: PathBuf,
}

/// Output and behavior configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// If `true`, report what would happen without modifying any files.
    pub dry_run: bool,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            border_cm: 2.0,
            target_dpi: 300,
            font_path: PathBuf::from(DEFAULT_FONT_PATH),
            font_size: 50.0,
            margin: 10,
            jpeg_quality: 75,
            marker: WATERMARK_MARKER.to_string(),
        }
    }
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            backend: SignerBackend::ExifTool,
            exiftool_path: PathBuf::from("exiftool"),
        }
    }
}

impl FrameConfig {
    /// Border width in pixels for this configuration.
    pub fn border_pixels(&self) -> u32 {
        crate::frame::border_pixels(self.border_cm, self.target_dpi)
    }
}

impl Config {
    /// Resolve the config file path (same directory as the executable).
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::debug!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Reject values the encoders or the border math cannot honor.
    pub fn validate(&self) -> Result<()> {
        let frame = &self.frame;
        if !frame.border_cm.is_finite() || frame.border_cm < 0.0 {
            anyhow::bail!("frame.border_cm must be a non-negative number, got {}", frame.border_cm);
        }
        if frame.target_dpi == 0 || frame.target_dpi > u32::from(u16::MAX) {
            anyhow::bail!("frame.target_dpi must be between 1 and 65535, got {}", frame.target_dpi);
        }
        if !frame.font_size.is_finite() || frame.font_size <= 0.0 {
            anyhow::bail!("frame.font_size must be positive, got {}", frame.font_size);
        }
        if !(1..=100).contains(&frame.jpeg_quality) {
            anyhow::bail!("frame.jpeg_quality must be between 1 and 100, got {}", frame.jpeg_quality);
        }
        if frame.marker.is_empty() {
            anyhow::bail!("frame.marker must not be empty");
        }
        Ok(())
    }
}
