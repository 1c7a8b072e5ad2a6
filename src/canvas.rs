// ============================================================================
// SHEET VIEW — the main canvas: composited sheet, grid overlay, pan/zoom,
// boundary dragging, eyedropper and per-cell actions
// ============================================================================

use eframe::egui;
use egui::{
    Color32, ColorImage, CursorIcon, Pos2, Rect, Sense, Stroke, TextureHandle, TextureOptions,
    Vec2,
};
use image::RgbaImage;

use crate::grid::{Axis, Grid};
use crate::session::Session;
use crate::view::{Interaction, PointerTarget, ViewController, ViewTransform};

/// Grab distance around a grid line, in screen points.
const HANDLE_GRAB: f32 = 6.0;

/// Something the user asked for on the canvas that the app has to carry out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CanvasAction {
    ViewCell(usize, usize),
    CopyCell(usize, usize),
    SaveCell(usize, usize),
    /// Eyedropper sampled this colour.
    Picked([u8; 3]),
}

pub struct SheetView {
    pub controller: ViewController,
    texture: Option<TextureHandle>,
    /// Session composite generation currently uploaded.
    texture_generation: u64,
    pub last_viewport: Option<Rect>,
    /// Fit the next image to the viewport once its size is known.
    fit_pending: bool,
    /// Cell the context menu was opened on.
    menu_cell: Option<(usize, usize)>,
}

impl Default for SheetView {
    fn default() -> Self {
        Self {
            controller: ViewController::new(ViewTransform::main()),
            texture: None,
            texture_generation: 0,
            last_viewport: None,
            fit_pending: true,
            menu_cell: None,
        }
    }
}

/// Upload an RGBA buffer as an egui texture, reusing the handle if there is one.
pub fn upload_texture(
    ctx: &egui::Context,
    slot: &mut Option<TextureHandle>,
    name: &str,
    img: &RgbaImage,
) {
    let size = [img.width() as usize, img.height() as usize];
    let color = ColorImage::from_rgba_unmultiplied(size, img.as_raw());
    match slot {
        Some(tex) => tex.set(color, TextureOptions::NEAREST),
        None => *slot = Some(ctx.load_texture(name, color, TextureOptions::NEAREST)),
    }
}

impl SheetView {
    /// Called when a new image replaces the old one.
    pub fn image_replaced(&mut self) {
        self.fit_pending = true;
        self.menu_cell = None;
        self.controller.pointer_up();
    }

    pub fn is_dragging_boundary(&self) -> bool {
        matches!(self.controller.mode(), Interaction::DraggingBoundary { .. })
    }

    pub fn zoom_in(&mut self) {
        if let Some(vp) = self.last_viewport {
            self.controller.transform.zoom_in(vp.size());
        }
    }

    pub fn zoom_out(&mut self) {
        if let Some(vp) = self.last_viewport {
            self.controller.transform.zoom_out(vp.size());
        }
    }

    pub fn fit(&mut self, image_size: Vec2) {
        match self.last_viewport {
            Some(vp) => self.controller.transform.fit(vp.size(), image_size),
            None => self.fit_pending = true,
        }
    }

    /// Keep the texture in step with the session's composite.  The composite
    /// is not rebuilt while a boundary is being dragged; the release
    /// triggers it.
    fn sync_texture(&mut self, ctx: &egui::Context, session: &mut Session) {
        if !self.is_dragging_boundary() && session.needs_refresh() {
            if let Err(e) = session.composited() {
                log::warn!("composite failed: {}", e);
                return;
            }
        }
        if session.generation() != self.texture_generation
            && let Some(img) = session.cached_composite()
        {
            upload_texture(ctx, &mut self.texture, "sheet", img);
            self.texture_generation = session.generation();
        }
    }

    /// Which interior grid line (if any) sits under a screen position.
    fn boundary_under(&self, grid: &Grid, viewport: Rect, image_size: Vec2, pos: Pos2) -> Option<(Axis, usize)> {
        let t = &self.controller.transform;
        let p = t.screen_to_image(viewport, pos);
        let tolerance = HANDLE_GRAB / t.zoom;
        let inside_x = (-tolerance..=image_size.x + tolerance).contains(&p.x);
        let inside_y = (-tolerance..=image_size.y + tolerance).contains(&p.y);

        if inside_y && let Some(i) = grid.boundary_near(Axis::X, p.x, tolerance) {
            return Some((Axis::X, i));
        }
        if inside_x && let Some(i) = grid.boundary_near(Axis::Y, p.y, tolerance) {
            return Some((Axis::Y, i));
        }
        None
    }

    pub fn show(&mut self, ui: &mut egui::Ui, session: &mut Session) -> Option<CanvasAction> {
        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
        let viewport = response.rect;
        self.last_viewport = Some(viewport);
        painter.rect_filled(viewport, 0.0, ui.visuals().extreme_bg_color);

        let Some(src) = session.source() else {
            painter.text(
                viewport.center(),
                egui::Align2::CENTER_CENTER,
                "Open, paste (Ctrl+V) or drop a sprite sheet",
                egui::FontId::proportional(18.0),
                ui.visuals().weak_text_color(),
            );
            return None;
        };
        let image_size = Vec2::new(src.width() as f32, src.height() as f32);

        if self.fit_pending {
            self.controller.transform.fit(viewport.size(), image_size);
            self.fit_pending = false;
        }

        let mut action = None;
        let hover = response.hover_pos();
        let hovered_line = hover.and_then(|p| self.boundary_under(session.grid(), viewport, image_size, p));

        // -- Pointer state machine ------------------------------------------
        if response.drag_started()
            && let Some(press) = ui.input(|i| i.pointer.press_origin())
        {
            let target = match self.boundary_under(session.grid(), viewport, image_size, press) {
                Some((axis, index)) if session.settings().show_grid => PointerTarget::Boundary(axis, index),
                _ => PointerTarget::Background,
            };
            self.controller.pointer_down(target, press);
        }
        if response.dragged()
            && let Some(pos) = response.interact_pointer_pos()
            && let Some(mv) = self.controller.pointer_move(pos, viewport)
        {
            session.move_boundary(mv.axis, mv.index, mv.position);
        }
        if response.drag_released()
            && let Interaction::DraggingBoundary { axis, index } = self.controller.pointer_up()
        {
            log::info!(
                "moved {:?} boundary {} to {:.1}",
                axis,
                index,
                session.grid().boundaries(axis)[index]
            );
        }

        if response.clicked()
            && !self.controller.click_suppressed()
            && let Some(pos) = response.interact_pointer_pos()
        {
            let p = self.controller.transform.screen_to_image(viewport, pos);
            if session.is_picking() {
                action = session.pick_color(p.x, p.y).map(CanvasAction::Picked);
            } else if let Some((r, c)) = session.grid().cell_at(p.x, p.y) {
                action = Some(CanvasAction::ViewCell(r, c));
            }
        }

        if response.secondary_clicked()
            && let Some(pos) = response.interact_pointer_pos()
        {
            let p = self.controller.transform.screen_to_image(viewport, pos);
            self.menu_cell = session.grid().cell_at(p.x, p.y);
        }

        // -- Wheel zoom, pivoting on the pointer ----------------------------
        if let Some(pos) = hover {
            let scroll = ui.input(|i| i.scroll_delta.y);
            if scroll.abs() > 0.1 {
                self.controller.transform.wheel(pos - viewport.min, scroll);
            }
        }

        // -- Cursor ------------------------------------------------------------
        if session.is_picking() && response.hovered() {
            ui.ctx().set_cursor_icon(CursorIcon::Crosshair);
        } else if let Interaction::DraggingBoundary { axis, .. } = self.controller.mode() {
            ui.ctx().set_cursor_icon(resize_cursor(axis));
        } else if let Some((axis, _)) = hovered_line
            && session.settings().show_grid
        {
            ui.ctx().set_cursor_icon(resize_cursor(axis));
        } else if matches!(self.controller.mode(), Interaction::Panning { .. }) {
            ui.ctx().set_cursor_icon(CursorIcon::Grabbing);
        }

        // -- Paint ---------------------------------------------------------------
        self.sync_texture(ui.ctx(), session);
        let image_rect = self.controller.transform.image_rect(viewport, image_size);
        let painter = painter.with_clip_rect(viewport);
        draw_checkerboard(&painter, image_rect, viewport, self.controller.transform.zoom);
        if let Some(tex) = &self.texture {
            painter.image(
                tex.id(),
                image_rect,
                Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                Color32::WHITE,
            );
        }

        if session.settings().show_grid {
            let hovered_cell = hover
                .filter(|_| hovered_line.is_none() && !self.is_dragging_boundary())
                .map(|p| self.controller.transform.screen_to_image(viewport, p))
                .and_then(|p| session.grid().cell_at(p.x, p.y));
            let active = match self.controller.mode() {
                Interaction::DraggingBoundary { axis, index } => Some((axis, index)),
                _ => hovered_line,
            };
            self.draw_grid(&painter, viewport, session.grid(), hovered_cell, active);
        }

        // -- Cell context menu ---------------------------------------------
        let menu_cell = self.menu_cell;
        response.context_menu(|ui| {
            let Some((r, c)) = menu_cell else {
                ui.close_menu();
                return;
            };
            ui.label(format!("Cell {}, {}", r + 1, c + 1));
            ui.separator();
            if ui.button("View").clicked() {
                action = Some(CanvasAction::ViewCell(r, c));
                ui.close_menu();
            }
            if ui.button("Copy to clipboard").clicked() {
                action = Some(CanvasAction::CopyCell(r, c));
                ui.close_menu();
            }
            if ui.button("Save PNG…").clicked() {
                action = Some(CanvasAction::SaveCell(r, c));
                ui.close_menu();
            }
        });

        action
    }

    fn draw_grid(
        &self,
        painter: &egui::Painter,
        viewport: Rect,
        grid: &Grid,
        hovered_cell: Option<(usize, usize)>,
        active_line: Option<(Axis, usize)>,
    ) {
        let t = &self.controller.transform;
        let line = Stroke::new(1.0, Color32::from_rgba_unmultiplied(255, 60, 60, 200));
        let hot = Stroke::new(2.0, Color32::from_rgb(255, 200, 0));

        if let Some((r, c)) = hovered_cell
            && let Some(cell) = grid.cell_rect(r, c)
        {
            let min = t.image_to_screen(viewport, Pos2::new(cell.x, cell.y));
            let max = t.image_to_screen(viewport, Pos2::new(cell.x + cell.width, cell.y + cell.height));
            painter.rect_filled(
                Rect::from_min_max(min, max),
                0.0,
                Color32::from_rgba_unmultiplied(255, 255, 255, 24),
            );
        }

        let xs = grid.boundaries(Axis::X);
        let ys = grid.boundaries(Axis::Y);
        let (Some(&top), Some(&bottom)) = (ys.first(), ys.last()) else { return };
        let (Some(&left), Some(&right)) = (xs.first(), xs.last()) else { return };

        for (i, &x) in xs.iter().enumerate() {
            let a = t.image_to_screen(viewport, Pos2::new(x, top));
            let b = t.image_to_screen(viewport, Pos2::new(x, bottom));
            let stroke = if active_line == Some((Axis::X, i)) { hot } else { line };
            painter.line_segment([a, b], stroke);
            if i > 0 && i + 1 < xs.len() {
                painter.rect_filled(Rect::from_center_size(a.lerp(b, 0.5), Vec2::new(6.0, 14.0)), 2.0, stroke.color);
            }
        }
        for (i, &y) in ys.iter().enumerate() {
            let a = t.image_to_screen(viewport, Pos2::new(left, y));
            let b = t.image_to_screen(viewport, Pos2::new(right, y));
            let stroke = if active_line == Some((Axis::Y, i)) { hot } else { line };
            painter.line_segment([a, b], stroke);
            if i > 0 && i + 1 < ys.len() {
                painter.rect_filled(Rect::from_center_size(a.lerp(b, 0.5), Vec2::new(14.0, 6.0)), 2.0, stroke.color);
            }
        }
    }
}

fn resize_cursor(axis: Axis) -> CursorIcon {
    match axis {
        Axis::X => CursorIcon::ResizeHorizontal,
        Axis::Y => CursorIcon::ResizeVertical,
    }
}

/// Transparency checkerboard under the image, clipped to the visible area.
pub fn draw_checkerboard(painter: &egui::Painter, rect: Rect, clip: Rect, zoom: f32) {
    let checker_size = 10.0 * zoom;
    let light = Color32::from_gray(220);
    let dark = Color32::from_gray(180);

    // Too small to tell apart: one flat average.
    if checker_size < 3.0 {
        painter.rect_filled(rect, 0.0, Color32::from_gray(200));
        return;
    }

    let visible = rect.intersect(clip);
    if visible.is_negative() || visible.width() < 1.0 || visible.height() < 1.0 {
        return;
    }

    painter.rect_filled(rect, 0.0, light);

    let start_x = ((visible.min.x - rect.min.x) / checker_size).floor() as i32;
    let start_y = ((visible.min.y - rect.min.y) / checker_size).floor() as i32;
    let end_x = ((visible.max.x - rect.min.x) / checker_size).ceil() as i32;
    let end_y = ((visible.max.y - rect.min.y) / checker_size).ceil() as i32;

    for y in start_y..end_y {
        for x in start_x..end_x {
            if (x + y) % 2 == 0 {
                continue;
            }
            let checker_rect = Rect::from_min_size(
                Pos2::new(rect.min.x + x as f32 * checker_size, rect.min.y + y as f32 * checker_size),
                Vec2::splat(checker_size),
            );
            let intersection = checker_rect.intersect(rect);
            if !intersection.is_negative() {
                painter.rect_filled(intersection, 0.0, dark);
            }
        }
    }
}
