// ============================================================================
// SpriteSlicer CLI — headless sheet splitting via command-line arguments
// ============================================================================
//
// Usage examples:
//   spriteslicer --input hero.png --rows 4 --cols 8 --output hero.zip
//   spriteslicer -i sheet.png --cols 6 --key-color "#FF00FF" --threshold 40
//   spriteslicer -i "sheets/*.png" --rows 2 --cols 2 --output-dir out/
//   spriteslicer -i tiles.tga --cols 16 --margins 1,1,1,1 --output-dir out/ --loose
//
// No window is opened in CLI mode.  Every input goes through the same session
// pipeline the GUI uses, so the exported slices match what the editor shows.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::error::SlicerError;
use crate::io::decode_path;
use crate::ops::compositor::{self, MAX_THRESHOLD, Margins};
use crate::session::{Session, SliceSettings};
use crate::settings::parse_margins;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// SpriteSlicer headless splitter.
///
/// Cut sprite sheets into per-cell PNGs without opening the GUI.
#[derive(Parser, Debug)]
#[command(
    name = "spriteslicer",
    about = "SpriteSlicer headless sprite-sheet splitter",
    long_about = "Split sprite sheets on a uniform grid into per-cell PNGs, optionally\n\
                  clearing cell margins and keying out a background colour.\n\
                  Reads PNG, JPEG, WEBP, BMP, TGA, ICO, TIFF and GIF (first frame).\n\n\
                  Example:\n  \
                  spriteslicer --input hero.png --rows 4 --cols 8 --output hero.zip\n  \
                  spriteslicer -i \"*.png\" --cols 6 --key-color \"#FF00FF\" --output-dir out/"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "sheets/*.tga").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Number of grid rows.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub rows: u32,

    /// Number of grid columns.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub cols: u32,

    /// Pixels cleared inside every cell, as TOP,BOTTOM,LEFT,RIGHT.
    #[arg(long, default_value = "0,0,0,0", value_name = "T,B,L,R", value_parser = margins_arg)]
    pub margins: Margins,

    /// Background colour to key out (#RRGGBB). Enables background removal.
    #[arg(long, value_name = "HEX", value_parser = color_arg)]
    pub key_color: Option<[u8; 3]>,

    /// Colour distance below which pixels are keyed out (0–441.673).
    #[arg(long, default_value_t = 30.0, value_parser = threshold_arg)]
    pub threshold: f32,

    /// Output archive path. Only valid for single-file input.
    /// For batch input use --output-dir instead.
    #[arg(short, long, value_name = "FILE.zip")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    /// One archive per input, named after the input's stem.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Write loose slice_R_C.png files into a folder instead of a ZIP archive.
    #[arg(long)]
    pub loose: bool,

    /// Print per-file timing and log details to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Returns `true` when any CLI-mode flag is present in the real process arguments.
    /// Used by `main()` to route before creating an eframe window.
    pub fn is_cli_mode() -> bool {
        std::env::args().any(|a| a == "--input" || a == "-i")
    }

    fn slice_settings(&self) -> SliceSettings {
        let defaults = SliceSettings::default();
        SliceSettings {
            rows: self.rows as usize,
            cols: self.cols as usize,
            remove_background: self.key_color.is_some(),
            key_color: self.key_color.unwrap_or(defaults.key_color),
            threshold: self.threshold,
            margins: self.margins,
            ..defaults
        }
    }
}

fn margins_arg(s: &str) -> Result<Margins, String> {
    parse_margins(s).ok_or_else(|| format!("expected four pixel counts T,B,L,R, got '{}'", s))
}

fn color_arg(s: &str) -> Result<[u8; 3], String> {
    compositor::parse_hex_color(s).ok_or_else(|| SlicerError::InvalidColor(s.to_string()).to_string())
}

fn threshold_arg(s: &str) -> Result<f32, String> {
    let t: f32 = s.parse().map_err(|_| format!("'{}' is not a number", s))?;
    if (0.0..=MAX_THRESHOLD).contains(&t) {
        Ok(t)
    } else {
        Err(format!("threshold must be between 0 and {}", MAX_THRESHOLD))
    }
}

// ============================================================================
// Public entry point
// ============================================================================

/// Split every input and return the process exit code: success only when
/// every sheet was written.
pub fn run(args: CliArgs) -> ExitCode {
    crate::logger::init_stderr(args.verbose);

    let inputs = resolve_inputs(&args.input);
    if let Err(msg) = check_outputs(&args, inputs.len()) {
        eprintln!("error: {}", msg);
        return ExitCode::FAILURE;
    }

    let settings = args.slice_settings();
    let total = inputs.len();
    let report = args.verbose || total > 1;
    let mut failed = 0usize;

    for (idx, input) in inputs.iter().enumerate() {
        if report {
            println!("[{}/{}] {}", idx + 1, total, input.display());
        }
        let started = Instant::now();

        let result = build_output_path(input, args.output.as_deref(), args.output_dir.as_deref(), args.loose)
            .ok_or_else(|| SlicerError::UnsupportedInput(format!("no file name in '{}'", input.display())))
            .and_then(|out| run_one(input, &out, &settings, args.loose).map(|n| (out, n)));

        match result {
            Ok((out, count)) if report => println!(
                "  {} slices -> {} in {} ms",
                count,
                out.display(),
                started.elapsed().as_millis()
            ),
            Ok(_) => {}
            Err(e) => {
                eprintln!("  error: {}", e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        log::warn!("{} of {} sheets failed", failed, total);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Reject argument combinations that cannot work before touching any input.
fn check_outputs(args: &CliArgs, input_count: usize) -> Result<(), String> {
    if input_count == 0 {
        return Err("nothing to split; no input matched".to_string());
    }
    if input_count > 1 && args.output.is_some() && args.output_dir.is_none() {
        return Err(format!(
            "--output names one file but {} sheets matched; use --output-dir",
            input_count
        ));
    }
    if let Some(dir) = &args.output_dir {
        std::fs::create_dir_all(dir).map_err(|e| format!("cannot create '{}': {}", dir.display(), e))?;
    }
    Ok(())
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

fn run_one(
    input: &Path,
    output: &Path,
    settings: &SliceSettings,
    loose: bool,
) -> Result<usize, SlicerError> {
    let mut session = Session::new(settings.clone());
    session.load_image(decode_path(input)?);

    let used = session.settings();
    if (used.rows, used.cols) != (settings.rows, settings.cols) {
        log::warn!(
            "{}: grid clamped to {}x{} to fit the image",
            input.display(),
            used.rows,
            used.cols
        );
    }

    if loose {
        session.export_to_dir(output)
    } else {
        session.save_archive(output)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Existing paths are taken as-is; anything else is treated as a glob.
/// Order follows the arguments and duplicates are dropped.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    fn add(found: &mut Vec<PathBuf>, p: PathBuf) {
        if !found.contains(&p) {
            found.push(p);
        }
    }

    let mut found: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let literal = PathBuf::from(pattern);
        if literal.exists() {
            add(&mut found, literal);
            continue;
        }
        let paths = match glob::glob(pattern) {
            Ok(paths) => paths,
            Err(e) => {
                log::warn!("skipping bad pattern '{}': {}", pattern, e);
                continue;
            }
        };
        let before = found.len();
        for p in paths.flatten().filter(|p| p.is_file()) {
            add(&mut found, p);
        }
        if found.len() == before {
            log::warn!("'{}' matched nothing", pattern);
        }
    }

    found
}

/// Compute the output location for a single input file: an archive path, or
/// a folder when `loose` is set.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` (batch directory, derives the name from the input stem)
/// 3. Fallback: next to the input as `<stem>_slices.zip` / `<stem>_slices/`
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    loose: bool,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let stem = input.file_stem()?.to_string_lossy().into_owned();
    let name = |base: &str| if loose { base.to_string() } else { format!("{}.zip", base) };

    if let Some(dir) = output_dir {
        return Some(dir.join(name(&stem)));
    }

    let parent = input.parent().unwrap_or(Path::new("."));
    Some(parent.join(name(&format!("{}_slices", stem))))
}
