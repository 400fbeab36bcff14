use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use photo_sign::config::{self, SignerBackend};
use photo_sign::pipeline::{self, BatchSummary, FileReport};
use photo_sign::{exif, frame};

#[derive(Parser, Debug)]
#[command(
    name = "photo-sign",
    version,
    about = "Sign exported photos — write author/copyright metadata, add a white frame and a signature watermark"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Report what would be done without modifying files
    #[arg(long, global = true)]
    dry_run: bool,

    /// Output results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Overwrite Artist, Copyright and UserComment of jpg/jpeg/heic/dng files
    Sign {
        /// Directory holding the exported photos
        dir: PathBuf,
        /// Signature written into the metadata fields
        signature: String,
        /// Write EXIF in process instead of calling exiftool (JPEG only)
        #[arg(long)]
        native: bool,
        /// exiftool binary to run
        #[arg(long, value_name = "PATH")]
        exiftool: Option<PathBuf>,
    },
    /// Add a white frame and the signature to jpg/jpeg/png/heic/dng files
    Watermark {
        /// Directory holding the exported photos
        dir: PathBuf,
        /// Signature drawn in the bottom-right corner
        signature: String,
        /// Border width on each side, in centimeters
        #[arg(long, value_name = "CM")]
        border_cm: Option<f64>,
        /// Target resolution used for the border and embedded in output files
        #[arg(long, value_name = "DPI")]
        dpi: Option<u32>,
        /// Font file for the signature
        #[arg(long, value_name = "PATH")]
        font: Option<PathBuf>,
    },
    /// Print the attribution fields of image files
    Show {
        /// Image files to inspect
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .format_target(false)
        .init();

    // Handle --init
    if cli.init {
        let config = config::Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => config::Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    let Some(command) = cli.command else {
        anyhow::bail!("No command given. Use --help for usage.");
    };

    // Load config
    let mut config = config::Config::load(cli.config.as_deref())?;
    if cli.dry_run {
        config.output.dry_run = true;
    }
    if config.output.dry_run {
        log::info!("DRY RUN — no files will be modified");
    }

    let reports = match command {
        Command::Sign {
            dir,
            signature,
            native,
            exiftool,
        } => {
            if native {
                config.signer.backend = SignerBackend::Native;
            }
            if let Some(path) = exiftool {
                config.signer.exiftool_path = path;
            }
            let signer = exif::build_signer(&config.signer);
            log::info!("Signing {} with {} as \"{signature}\"", dir.display(), signer.name());
            pipeline::sign_directory(&dir, &signature, signer.as_ref(), config.output.dry_run)?
        }
        Command::Watermark {
            dir,
            signature,
            border_cm,
            dpi,
            font,
        } => {
            if let Some(cm) = border_cm {
                config.frame.border_cm = cm;
            }
            if let Some(dpi) = dpi {
                config.frame.target_dpi = dpi;
            }
            if let Some(font) = font {
                config.frame.font_path = font;
            }
            config.validate()?;
            log::info!(
                "Watermarking {}: {} cm border ({} px at {} DPI), font {}",
                dir.display(),
                config.frame.border_cm,
                frame::border_pixels(config.frame.border_cm, config.frame.target_dpi),
                config.frame.target_dpi,
                config.frame.font_path.display()
            );
            pipeline::Watermarker::new(config.frame.clone())
                .dry_run(config.output.dry_run)
                .watermark_directory(&dir, &signature)?
        }
        Command::Show { paths } => {
            show_attribution(&paths, cli.json)?;
            return Ok(());
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    print_summary(&reports);
    Ok(())
}

fn print_summary(reports: &[FileReport]) {
    let summary = BatchSummary::from_reports(reports);
    log::info!(
        "Done: {} succeeded, {} skipped, {} failed out of {} files",
        summary.succeeded,
        summary.skipped,
        summary.failed,
        reports.len()
    );
}

fn show_attribution(paths: &[PathBuf], json: bool) -> Result<()> {
    let mut rows = Vec::new();
    for path in paths {
        match exif::read_attribution(path) {
            Ok(attribution) => {
                if !json {
                    println!("{}", path.display());
                    println!("  Artist:      {}", attribution.artist.as_deref().unwrap_or("-"));
                    println!("  Copyright:   {}", attribution.copyright.as_deref().unwrap_or("-"));
                    println!("  UserComment: {}", attribution.comment.as_deref().unwrap_or("-"));
                }
                rows.push(serde_json::json!({
                    "path": path.display().to_string(),
                    "attribution": attribution,
                }));
            }
            Err(e) => {
                log::error!("Failed to read {}: {e:#}", path.display());
                rows.push(serde_json::json!({
                    "path": path.display().to_string(),
                    "error": format!("{e:#}"),
                }));
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    }
    Ok(())
}
