// ============================================================================
// CONTROLS PANEL — grid size, margins, background key and export buttons
// ============================================================================

use std::time::Instant;

use eframe::egui;
use egui::RichText;

use crate::ops::compositor::{self, MAX_THRESHOLD};
use crate::session::Session;

/// Panel buttons the app has to act on (they need dialogs or the clipboard).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlAction {
    Open,
    Paste,
    ExportAll,
    ExportFolder,
}

/// Edit buffers for the panel.  Grid counts are applied on change; the hex
/// field is applied on Enter or focus loss.
pub struct ControlsPanel {
    rows: usize,
    cols: usize,
    hex_input: String,
    /// Key colour the hex buffer was last synced from.
    hex_synced: [u8; 3],
}

impl ControlsPanel {
    pub fn new(session: &Session) -> Self {
        let s = session.settings();
        Self {
            rows: s.rows,
            cols: s.cols,
            hex_input: compositor::format_hex_color(s.key_color),
            hex_synced: s.key_color,
        }
    }

    fn section(ui: &mut egui::Ui, title: &str) {
        ui.add_space(8.0);
        ui.label(RichText::new(title).strong());
        ui.add_space(2.0);
    }

    /// Draw the panel.  Returns the error text of a rejected hex entry, if any,
    /// alongside a requested action.
    pub fn show(&mut self, ui: &mut egui::Ui, session: &mut Session) -> (Option<ControlAction>, Option<String>) {
        let mut action = None;
        let mut error = None;
        let has_image = session.has_image();

        // Counts may have been clamped by the session since the last frame.
        self.rows = session.settings().rows;
        self.cols = session.settings().cols;
        let key = session.settings().key_color;
        if key != self.hex_synced {
            self.hex_input = compositor::format_hex_color(key);
            self.hex_synced = key;
        }

        // -- Source ------------------------------------------------------------
        Self::section(ui, "Image");
        ui.horizontal(|ui| {
            if ui.button("Open…").clicked() {
                action = Some(ControlAction::Open);
            }
            if ui.button("Paste").on_hover_text("Ctrl+V").clicked() {
                action = Some(ControlAction::Paste);
            }
        });
        if let Some(src) = session.source() {
            ui.label(
                RichText::new(format!("{} ({} × {})", src.name, src.width(), src.height()))
                    .small()
                    .weak(),
            );
        }

        // -- Grid ----------------------------------------------------------------
        Self::section(ui, "Grid");
        let mut grid_changed = false;
        egui::Grid::new("grid_size")
            .num_columns(2)
            .spacing([8.0, 4.0])
            .show(ui, |ui| {
                ui.label("Rows");
                grid_changed |= ui
                    .add(egui::DragValue::new(&mut self.rows).clamp_range(1..=512).speed(0.1))
                    .changed();
                ui.end_row();
                ui.label("Columns");
                grid_changed |= ui
                    .add(egui::DragValue::new(&mut self.cols).clamp_range(1..=512).speed(0.1))
                    .changed();
                ui.end_row();
            });
        if grid_changed {
            session.set_grid_size(self.rows, self.cols);
        }
        if ui
            .add_enabled(has_image, egui::Button::new("Reset grid"))
            .on_hover_text("Back to an even split, discarding dragged lines")
            .clicked()
        {
            session.reset_grid();
        }

        // -- Margins -------------------------------------------------------------
        Self::section(ui, "Erase margins (px)");
        let mut m = session.settings().margins;
        let mut margins_changed = false;
        egui::Grid::new("margins")
            .num_columns(4)
            .spacing([8.0, 4.0])
            .show(ui, |ui| {
                for (label, value) in [("Top", &mut m.top), ("Bottom", &mut m.bottom)] {
                    ui.label(label);
                    margins_changed |= ui.add(egui::DragValue::new(value).clamp_range(0..=4096)).changed();
                }
                ui.end_row();
                for (label, value) in [("Left", &mut m.left), ("Right", &mut m.right)] {
                    ui.label(label);
                    margins_changed |= ui.add(egui::DragValue::new(value).clamp_range(0..=4096)).changed();
                }
                ui.end_row();
            });
        if margins_changed {
            session.set_margins(m, Instant::now());
        }

        // -- Background key ------------------------------------------------------
        Self::section(ui, "Background");
        let mut remove = session.settings().remove_background;
        if ui.checkbox(&mut remove, "Remove background").changed() {
            session.set_remove_background(remove);
        }

        ui.add_enabled_ui(remove, |ui| {
            ui.horizontal(|ui| {
                let mut rgb = session.settings().key_color;
                if ui.color_edit_button_srgb(&mut rgb).changed() {
                    session.set_key_color(rgb);
                }
                let hex = ui.add(egui::TextEdit::singleline(&mut self.hex_input).desired_width(72.0));
                let submitted = hex.lost_focus();
                if submitted && let Err(e) = session.set_key_hex(&self.hex_input) {
                    error = Some(e.to_string());
                    self.hex_input = compositor::format_hex_color(session.settings().key_color);
                }

                let picking = session.is_picking();
                if ui
                    .selectable_label(picking, "Pick")
                    .on_hover_text("Click the sheet to sample the background colour")
                    .clicked()
                {
                    session.toggle_picking();
                }
            });

            let mut threshold = session.settings().threshold;
            if ui
                .add(egui::Slider::new(&mut threshold, 0.0..=MAX_THRESHOLD).text("Threshold").max_decimals(1))
                .changed()
            {
                session.set_threshold(threshold, Instant::now());
            }
        });

        // -- View ------------------------------------------------------------------
        Self::section(ui, "View");
        let mut show_grid = session.settings().show_grid;
        if ui.checkbox(&mut show_grid, "Show grid").changed() {
            session.set_show_grid(show_grid);
        }
        let mut show_mask = session.settings().show_mask;
        if ui
            .checkbox(&mut show_mask, "Show mask")
            .on_hover_text("Preview and export with the background key applied")
            .changed()
        {
            session.set_show_mask(show_mask);
        }

        // -- Export ------------------------------------------------------------
        Self::section(ui, "Export");
        ui.add_enabled_ui(has_image, |ui| {
            if ui.button("Download all (ZIP)…").clicked() {
                action = Some(ControlAction::ExportAll);
            }
            if ui.button("Export to folder…").clicked() {
                action = Some(ControlAction::ExportFolder);
            }
        });
        ui.label(
            RichText::new("Click a cell to preview it, right-click for copy / save.")
                .small()
                .weak(),
        );

        (action, error)
    }
}
