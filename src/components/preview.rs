// ============================================================================
// CELL PREVIEW — floating window showing one extracted cell with its own
// pan/zoom, plus copy and save buttons
// ============================================================================

use eframe::egui;
use egui::{Color32, Pos2, Rect, Sense, TextureHandle, Vec2};
use image::RgbaImage;

use crate::canvas::{draw_checkerboard, upload_texture};
use crate::session::Session;
use crate::view::{PointerTarget, ViewController, ViewTransform};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreviewAction {
    Copy(usize, usize),
    Save(usize, usize),
}

pub struct CellPreview {
    cell: Option<(usize, usize)>,
    image: Option<RgbaImage>,
    texture: Option<TextureHandle>,
    /// Composite generation and grid revision the cell was cut from.
    cut_from: (u64, u64),
    controller: ViewController,
    /// Canvas size from the last frame; toolbar zoom pivots on its centre.
    last_viewport: Vec2,
    /// Centre the image at zoom 1 on the next frame (viewport size unknown
    /// until then).
    reset_pending: bool,
    /// Fit instead of 1:1 when opening.
    pub fit_on_open: bool,
}

impl Default for CellPreview {
    fn default() -> Self {
        Self {
            cell: None,
            image: None,
            texture: None,
            cut_from: (0, 0),
            controller: ViewController::new(ViewTransform::preview()),
            last_viewport: Vec2::ZERO,
            reset_pending: true,
            fit_on_open: false,
        }
    }
}

impl CellPreview {
    pub fn close(&mut self) {
        self.cell = None;
        self.image = None;
    }

    /// Open (or retarget) the preview on a cell.  Fails without touching
    /// the current preview if the cell cannot be extracted.
    pub fn open(&mut self, session: &mut Session, row: usize, col: usize) -> crate::error::Result<()> {
        let img = session.extract_cell(row, col)?;
        self.cell = Some((row, col));
        self.image = Some(img);
        self.cut_from = (session.generation(), session.grid_revision());
        self.texture = None;
        self.reset_pending = true;
        Ok(())
    }

    /// Re-cut the cell if the composite or the grid changed underneath it.
    /// A cell that no longer exists closes the preview.
    fn follow_session(&mut self, session: &mut Session) {
        let Some((row, col)) = self.cell else { return };
        if !self.is_stale(session) {
            return;
        }
        match session.extract_cell(row, col) {
            Ok(img) => {
                self.image = Some(img);
                self.cut_from = (session.generation(), session.grid_revision());
                self.texture = None;
            }
            Err(_) => self.close(),
        }
    }

    fn is_stale(&self, session: &Session) -> bool {
        self.cut_from != (session.generation(), session.grid_revision())
    }

    fn reset_view(&mut self, viewport: Vec2, image_size: Vec2) {
        let t = &mut self.controller.transform;
        if self.fit_on_open {
            t.fit(viewport, image_size);
        } else {
            t.reset();
            t.pan = (viewport - image_size) / 2.0;
        }
    }

    pub fn show(&mut self, ctx: &egui::Context, session: &mut Session) -> Option<PreviewAction> {
        self.follow_session(session);
        let (row, col) = self.cell?;
        let image_size = {
            let img = self.image.as_ref()?;
            Vec2::new(img.width() as f32, img.height() as f32)
        };
        if self.texture.is_none()
            && let Some(img) = &self.image
        {
            upload_texture(ctx, &mut self.texture, "cell_preview", img);
        }

        let mut open = true;
        let mut action = None;
        let mut reset = false;

        egui::Window::new(format!("slice_{}_{}", row + 1, col + 1))
            .id(egui::Id::new("cell_preview"))
            .open(&mut open)
            .collapsible(false)
            .resizable(true)
            .default_size([480.0, 420.0])
            .show(ctx, |ui| {
                let viewport_size = self.last_viewport;
                ui.horizontal(|ui| {
                    if ui.button("−").on_hover_text("Zoom out").clicked() {
                        self.controller.transform.zoom_out(viewport_size);
                    }
                    ui.label(format!("{:.0}%", self.controller.transform.zoom * 100.0));
                    if ui.button("+").on_hover_text("Zoom in").clicked() {
                        self.controller.transform.zoom_in(viewport_size);
                    }
                    if ui.button("Reset").clicked() {
                        reset = true;
                    }
                    ui.separator();
                    ui.label(format!("{} × {} px", image_size.x, image_size.y));
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("Save PNG…").clicked() {
                            action = Some(PreviewAction::Save(row, col));
                        }
                        if ui.button("Copy").clicked() {
                            action = Some(PreviewAction::Copy(row, col));
                        }
                    });
                });
                ui.separator();

                let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
                let viewport = response.rect;
                self.last_viewport = viewport.size();
                if self.reset_pending || reset {
                    self.reset_view(viewport.size(), image_size);
                    self.reset_pending = false;
                }

                if response.drag_started()
                    && let Some(press) = ui.input(|i| i.pointer.press_origin())
                {
                    self.controller.pointer_down(PointerTarget::Background, press);
                }
                if response.dragged()
                    && let Some(pos) = response.interact_pointer_pos()
                {
                    self.controller.pointer_move(pos, viewport);
                }
                if response.drag_released() {
                    self.controller.pointer_up();
                }
                if let Some(pos) = response.hover_pos() {
                    let scroll = ui.input(|i| i.scroll_delta.y);
                    if scroll.abs() > 0.1 {
                        self.controller.transform.wheel(pos - viewport.min, scroll);
                    }
                }

                let painter = painter.with_clip_rect(viewport);
                painter.rect_filled(viewport, 0.0, ui.visuals().extreme_bg_color);
                let image_rect = self.controller.transform.image_rect(viewport, image_size);
                draw_checkerboard(&painter, image_rect, viewport, self.controller.transform.zoom);
                if let Some(tex) = &self.texture {
                    painter.image(
                        tex.id(),
                        image_rect,
                        Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                        Color32::WHITE,
                    );
                }
            });

        if !open {
            self.close();
        }
        action
    }
}
