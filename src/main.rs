#![windows_subsystem = "windows"]

use eframe::egui;
use spriteslicer::app::SpriteSlicerApp;
use spriteslicer::settings::AppSettings;
use spriteslicer::{cli, logger};
use std::path::PathBuf;

/// The release binary is a GUI-subsystem executable, so headless runs have to
/// borrow the launching terminal and point stdout/stderr at it.
#[cfg(target_os = "windows")]
fn attach_parent_console() {
    unsafe extern "system" {
        fn AttachConsole(dwProcessId: u32) -> i32;
        fn SetStdHandle(nStdHandle: u32, hHandle: isize) -> i32;
        fn CreateFileW(
            lpFileName: *const u16,
            dwDesiredAccess: u32,
            dwShareMode: u32,
            lpSecurityAttributes: *const std::ffi::c_void,
            dwCreationDisposition: u32,
            dwFlagsAndAttributes: u32,
            hTemplateFile: isize,
        ) -> isize;
    }
    const ATTACH_PARENT_PROCESS: u32 = u32::MAX;
    const GENERIC_WRITE: u32 = 0x4000_0000;
    const SHARE_READ_WRITE: u32 = 0x3;
    const OPEN_EXISTING: u32 = 3;
    const STD_OUTPUT_HANDLE: u32 = -11i32 as u32;
    const STD_ERROR_HANDLE: u32 = -12i32 as u32;

    let conout: Vec<u16> = "CONOUT$".encode_utf16().chain(Some(0)).collect();
    unsafe {
        if AttachConsole(ATTACH_PARENT_PROCESS) == 0 {
            return;
        }
        let handle = CreateFileW(conout.as_ptr(), GENERIC_WRITE, SHARE_READ_WRITE, std::ptr::null(), OPEN_EXISTING, 0, 0);
        if handle != -1 {
            SetStdHandle(STD_OUTPUT_HANDLE, handle);
            SetStdHandle(STD_ERROR_HANDLE, handle);
        }
    }
}

fn main() -> Result<(), eframe::Error> {
    // -- CLI / headless mode ---------------------------------------------
    if cli::CliArgs::is_cli_mode() {
        use clap::Parser;
        #[cfg(target_os = "windows")]
        attach_parent_console();
        let code = cli::run(cli::CliArgs::parse());
        std::process::exit(i32::from(code != std::process::ExitCode::SUCCESS));
    }

    // -- GUI mode -----------------------------------------------------

    // Initialize session log (overwrites previous session log)
    logger::init();

    let settings = AppSettings::load();
    log::info!(
        "settings: {}x{} grid, threshold {}",
        settings.slice.rows,
        settings.slice.cols,
        settings.slice.threshold
    );

    // Image paths passed as plain arguments (e.g. "Open with SpriteSlicer")
    let startup_files: Vec<PathBuf> = std::env::args()
        .skip(1)
        .filter(|a| !a.starts_with('-'))
        .map(PathBuf::from)
        .filter(|p| p.is_file())
        .collect();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([640.0, 420.0])
            .with_title("SpriteSlicer")
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "SpriteSlicer",
        options,
        Box::new(move |cc| Box::new(SpriteSlicerApp::new(cc, settings, startup_files))),
    )
}
