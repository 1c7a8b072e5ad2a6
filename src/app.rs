use crate::canvas::{CanvasAction, SheetView};
use crate::components::{CellPreview, ControlAction, ControlsPanel, Notices, PreviewAction};
use crate::io::{self, SourceImage};
use crate::ops::{clipboard, export};
use crate::session::Session;
use crate::settings::AppSettings;
use eframe::egui;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Instant;

// ============================================================================
// ASYNC IO PIPELINE — background image decoding
// ============================================================================

/// Result delivered from a background decode job.
pub enum IoResult {
    /// A file (or dropped bytes) decoded into a sheet.
    ImageLoaded {
        source: SourceImage,
        path: Option<PathBuf>,
    },
    /// Decoding failed or the input was not an image.
    LoadFailed(String),
}

pub struct SpriteSlicerApp {
    session: Session,
    settings: AppSettings,
    canvas: SheetView,
    controls: ControlsPanel,
    preview: CellPreview,
    notices: Notices,

    io_sender: mpsc::Sender<IoResult>,
    io_receiver: mpsc::Receiver<IoResult>,
    pending_io_ops: usize,

    /// Files named on the command line, opened on the first frame.
    pending_startup_files: Vec<PathBuf>,
}

impl SpriteSlicerApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        settings: AppSettings,
        startup_files: Vec<PathBuf>,
    ) -> Self {
        let session = Session::new(settings.slice.clone());
        let controls = ControlsPanel::new(&session);
        let mut preview = CellPreview::default();
        preview.fit_on_open = settings.preview_fit;
        let (io_sender, io_receiver) = mpsc::channel();

        Self {
            session,
            settings,
            canvas: SheetView::default(),
            controls,
            preview,
            notices: Notices::default(),
            io_sender,
            io_receiver,
            pending_io_ops: 0,
            pending_startup_files: startup_files,
        }
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Decode a file on the rayon pool; the result arrives via `io_receiver`.
    fn open_file_by_path(&mut self, path: PathBuf) {
        let sender = self.io_sender.clone();
        self.pending_io_ops += 1;
        rayon::spawn(move || {
            let msg = match io::decode_path(&path) {
                Ok(source) => IoResult::ImageLoaded {
                    source,
                    path: Some(path),
                },
                Err(e) => IoResult::LoadFailed(e.to_string()),
            };
            let _ = sender.send(msg);
        });
    }

    /// Decode in-memory bytes (drops that carry content instead of a path).
    fn open_bytes(&mut self, bytes: std::sync::Arc<[u8]>, name: String) {
        let sender = self.io_sender.clone();
        self.pending_io_ops += 1;
        rayon::spawn(move || {
            let msg = match io::decode_bytes(&bytes, &name) {
                Ok(source) => IoResult::ImageLoaded { source, path: None },
                Err(e) => IoResult::LoadFailed(e.to_string()),
            };
            let _ = sender.send(msg);
        });
    }

    fn install_image(&mut self, source: SourceImage, path: Option<PathBuf>) {
        if let Some(path) = &path {
            self.settings.remember_dir(path);
        }
        self.preview.close();
        self.session.load_image(source);
        self.canvas.image_replaced();
    }

    fn open_dialog(&mut self) {
        if let Some(path) = io::pick_image_path(self.settings.dialog_dir().as_deref()) {
            self.open_file_by_path(path);
        }
    }

    fn paste_from_clipboard(&mut self, now: f64) {
        match clipboard::read_image() {
            Some(pixels) => {
                self.install_image(SourceImage::new(pixels, "clipboard"), None);
                self.notices.info(now, "Pasted image from clipboard");
            }
            None => self.notices.error(now, "Clipboard does not hold an image"),
        }
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    fn copy_cell(&mut self, now: f64, row: usize, col: usize) {
        let result = self
            .session
            .extract_cell(row, col)
            .and_then(|img| clipboard::copy_image(&img));
        match result {
            Ok(()) => self
                .notices
                .info(now, format!("Copied {} to clipboard", export::slice_name(row, col))),
            Err(e) => self.notices.error(now, e.to_string()),
        }
    }

    fn save_cell(&mut self, now: f64, row: usize, col: usize) {
        let name = export::slice_name(row, col);
        let Some(path) = io::pick_png_save_path(self.settings.dialog_dir().as_deref(), &name) else {
            return;
        };
        match self.session.save_cell(row, col, &path) {
            Ok(()) => {
                self.settings.remember_dir(&path);
                self.notices.info(now, format!("Saved {}", path.display()));
            }
            Err(e) => self.notices.error(now, e.to_string()),
        }
    }

    fn export_all(&mut self, now: f64) {
        let Some(path) =
            io::pick_zip_save_path(self.settings.dialog_dir().as_deref(), export::ARCHIVE_NAME)
        else {
            return;
        };
        match self.session.save_archive(&path) {
            Ok(count) => {
                self.settings.remember_dir(&path);
                self.notices.info(now, format!("Saved {} slices to {}", count, path.display()));
            }
            Err(e) => self.notices.error(now, e.to_string()),
        }
    }

    fn export_folder(&mut self, now: f64) {
        let Some(dir) = io::pick_export_folder(self.settings.dialog_dir().as_deref()) else {
            return;
        };
        match self.session.export_to_dir(&dir) {
            Ok(count) => {
                self.settings.last_dir = dir.to_string_lossy().into_owned();
                self.notices.info(now, format!("Wrote {} slices to {}", count, dir.display()));
            }
            Err(e) => self.notices.error(now, e.to_string()),
        }
    }

    fn save_settings(&mut self) {
        self.settings.slice = self.session.settings().clone();
        self.settings.save();
    }

    // ------------------------------------------------------------------
    // Toolbar
    // ------------------------------------------------------------------

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let has_image = self.session.has_image();
            ui.add_enabled_ui(has_image, |ui| {
                if ui.button("−").on_hover_text("Zoom out").clicked() {
                    self.canvas.zoom_out();
                }
                ui.label(format!("{:.0}%", self.canvas.controller.transform.zoom * 100.0));
                if ui.button("+").on_hover_text("Zoom in").clicked() {
                    self.canvas.zoom_in();
                }
                if ui.button("Fit").on_hover_text("Fit the sheet to the window").clicked()
                    && let Some(src) = self.session.source()
                {
                    let size = egui::vec2(src.width() as f32, src.height() as f32);
                    self.canvas.fit(size);
                }
            });

            ui.separator();
            let mut show_grid = self.session.settings().show_grid;
            if ui.toggle_value(&mut show_grid, "Grid").changed() {
                self.session.set_show_grid(show_grid);
            }
            let mut show_mask = self.session.settings().show_mask;
            if ui.toggle_value(&mut show_mask, "Mask").changed() {
                self.session.set_show_mask(show_mask);
            }
            if self.session.is_picking() {
                ui.separator();
                ui.label(egui::RichText::new("Picking background colour…").italics());
            }

            if self.pending_io_ops > 0 {
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.spinner();
                    ui.label("Loading…");
                });
            }
        });
    }
}

impl eframe::App for SpriteSlicerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = ctx.input(|i| i.time);

        // --- Persist settings when the window is closed ---
        if ctx.input(|i| i.viewport().close_requested()) {
            self.save_settings();
        }

        // --- Files passed on the command line ---
        for path in std::mem::take(&mut self.pending_startup_files) {
            self.open_file_by_path(path);
        }

        // --- Poll async IO results ---
        while let Ok(result) = self.io_receiver.try_recv() {
            self.pending_io_ops = self.pending_io_ops.saturating_sub(1);
            match result {
                IoResult::ImageLoaded { source, path } => {
                    let name = source.name.clone();
                    self.install_image(source, path);
                    self.notices.info(now, format!("Loaded {}", name));
                }
                IoResult::LoadFailed(msg) => self.notices.error(now, msg),
            }
        }
        if self.pending_io_ops > 0 {
            ctx.request_repaint();
        }

        // --- Drag-and-drop ---
        let dropped: Vec<egui::DroppedFile> = ctx.input(|i| i.raw.dropped_files.clone());
        if let Some(file) = dropped.into_iter().next() {
            if let Some(path) = file.path {
                self.open_file_by_path(path);
            } else if let Some(bytes) = file.bytes {
                self.open_bytes(bytes, file.name);
            }
        }

        // --- Ctrl/Cmd+V pastes a sheet unless a text field has focus ---
        if !ctx.wants_keyboard_input() {
            let paste = ctx.input(|i| {
                i.events.iter().any(|e| {
                    matches!(e, egui::Event::Paste(_))
                        || matches!(e, egui::Event::Key { key: egui::Key::V, pressed: true, modifiers, .. } if modifiers.command)
                })
            });
            if paste {
                self.paste_from_clipboard(now);
            }
        }

        // --- Debounced margin / threshold edits ---
        if let Some(wait) = self.session.poll(Instant::now()) {
            ctx.request_repaint_after(wait);
        }

        // --- Layout ---
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| self.toolbar(ui));

        let mut control = None;
        egui::SidePanel::left("controls")
            .resizable(false)
            .exact_width(240.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let (action, error) = self.controls.show(ui, &mut self.session);
                    control = action;
                    if let Some(e) = error {
                        self.notices.error(now, e);
                    }
                });
            });

        let mut canvas_action = None;
        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                canvas_action = self.canvas.show(ui, &mut self.session);
            });

        let preview_action = self.preview.show(ctx, &mut self.session);
        self.notices.show(ctx);

        // --- Act on requests collected this frame ---
        match control {
            Some(ControlAction::Open) => self.open_dialog(),
            Some(ControlAction::Paste) => self.paste_from_clipboard(now),
            Some(ControlAction::ExportAll) => self.export_all(now),
            Some(ControlAction::ExportFolder) => self.export_folder(now),
            None => {}
        }

        match canvas_action {
            Some(CanvasAction::ViewCell(r, c)) => {
                if let Err(e) = self.preview.open(&mut self.session, r, c) {
                    self.notices.error(now, e.to_string());
                }
            }
            Some(CanvasAction::CopyCell(r, c)) => self.copy_cell(now, r, c),
            Some(CanvasAction::SaveCell(r, c)) => self.save_cell(now, r, c),
            Some(CanvasAction::Picked(rgb)) => {
                self.notices.info(
                    now,
                    format!("Background colour set to {}", crate::ops::compositor::format_hex_color(rgb)),
                );
            }
            None => {}
        }

        match preview_action {
            Some(PreviewAction::Copy(r, c)) => self.copy_cell(now, r, c),
            Some(PreviewAction::Save(r, c)) => self.save_cell(now, r, c),
            None => {}
        }
    }
}
