// ============================================================================
// inline-extract — pull inline <style>/<script> blocks out of an HTML page
// ============================================================================
//
// Usage:
//   inline-extract                 (processes ./index.html)
//   inline-extract docs/page.html
//
// Writes style.css / script.js next to the page (appending if they exist) and
// links them back in.  Exits 1 only when the page does not exist; any other
// failure is reported and the process still exits 0.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use spriteslicer::error::SlicerError;
use spriteslicer::extract::{self, CSS_FILE, JS_FILE};

#[derive(Parser, Debug)]
#[command(
    name = "inline-extract",
    about = "Move inline <style> and <script> blocks into style.css / script.js"
)]
struct Args {
    /// HTML file to process, relative to the current directory.
    #[arg(default_value = "index.html", value_name = "FILE")]
    file: PathBuf,

    /// Log each step to stderr.
    #[arg(short, long)]
    verbose: bool,

    /// Anything after the file name is ignored.
    #[arg(hide = true, trailing_var_arg = true, allow_hyphen_values = true)]
    _rest: Vec<String>,
}

/// Only `--help` and `--version` end the process early; any other parse
/// error falls back to the first plain argument (or `index.html`).
fn parse_args<I, T>(argv: I) -> Args
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let argv: Vec<std::ffi::OsString> = argv.into_iter().map(Into::into).collect();
    match Args::try_parse_from(&argv) {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(_) => {
            let file = argv
                .iter()
                .skip(1)
                .map(|a| a.to_string_lossy())
                .find(|a| !a.starts_with('-'))
                .map_or_else(|| PathBuf::from("index.html"), |a| PathBuf::from(a.into_owned()));
            Args {
                file,
                verbose: false,
                _rest: Vec::new(),
            }
        }
    }
}

fn main() -> ExitCode {
    let args = parse_args(std::env::args_os());
    spriteslicer::logger::init_stderr(args.verbose);
    run(&args)
}

fn run(args: &Args) -> ExitCode {
    let html_path = std::env::current_dir()
        .map(|cwd| cwd.join(&args.file))
        .unwrap_or_else(|_| args.file.clone());
    println!("Analysing: {}", args.file.display());

    match extract::process_file(&html_path) {
        Ok(report) => {
            if report.css_blocks > 0 {
                if report.css_appended {
                    println!("{} already exists, new rules appended at the end.", CSS_FILE);
                }
                println!("Extracted {} style block(s) to {}", report.css_blocks, CSS_FILE);
            }
            if report.js_blocks > 0 {
                if report.js_appended {
                    println!("{} already exists, new code appended at the end.", JS_FILE);
                }
                println!("Extracted {} script block(s) to {}", report.js_blocks, JS_FILE);
            }
            if report.html_rewritten {
                println!("{} updated.", args.file.display());
            } else {
                println!("No inline styles or scripts found to extract.");
            }
            ExitCode::SUCCESS
        }
        Err(SlicerError::NotFound(path)) => {
            eprintln!("error: file not found: {}", path.display());
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::SUCCESS
        }
    }
}
