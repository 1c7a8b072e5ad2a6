// ============================================================================
// VIEW TRANSFORM — pan/zoom and the pointer interaction state machine
// ============================================================================
//
// Presentation only: nothing here touches pixel data.  Screen positions are
// absolute egui coordinates; `pan` is the offset of the image's top-left
// corner from the viewport's top-left corner.

use egui::{Pos2, Rect, Vec2};

use crate::grid::Axis;

/// Zoom limits for the main sheet view.
pub const MAIN_ZOOM_RANGE: (f32, f32) = (0.1, 5.0);
/// Zoom limits for the single-cell preview.
pub const PREVIEW_ZOOM_RANGE: (f32, f32) = (0.1, 10.0);
pub const WHEEL_ZOOM_STEP: f32 = 0.1;
pub const BUTTON_ZOOM_STEP: f32 = 0.2;
/// Empty space kept around the image by `fit`.
pub const FIT_PADDING: f32 = 40.0;
/// Per-move displacement above which a press counts as a pan, not a click.
pub const PAN_CLICK_SLOP: f32 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    pub pan: Vec2,
    pub zoom: f32,
    min_zoom: f32,
    max_zoom: f32,
}

impl ViewTransform {
    pub fn with_limits((min_zoom, max_zoom): (f32, f32)) -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
            min_zoom,
            max_zoom,
        }
    }

    pub fn main() -> Self {
        Self::with_limits(MAIN_ZOOM_RANGE)
    }

    pub fn preview() -> Self {
        Self::with_limits(PREVIEW_ZOOM_RANGE)
    }

    pub fn reset(&mut self) {
        self.pan = Vec2::ZERO;
        self.zoom = 1.0;
    }

    /// Where the image lands on screen.
    pub fn image_rect(&self, viewport: Rect, image_size: Vec2) -> Rect {
        Rect::from_min_size(viewport.min + self.pan, image_size * self.zoom)
    }

    pub fn screen_to_image(&self, viewport: Rect, screen: Pos2) -> Pos2 {
        let local = screen - viewport.min - self.pan;
        (local / self.zoom).to_pos2()
    }

    pub fn image_to_screen(&self, viewport: Rect, image: Pos2) -> Pos2 {
        viewport.min + self.pan + image.to_vec2() * self.zoom
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// Change zoom while keeping the image point under `pivot` fixed.
    ///
    /// `pivot` is relative to the viewport's top-left.  Returns `false` when
    /// the clamped zoom equals the current one.
    pub fn zoom_around(&mut self, pivot: Vec2, new_zoom: f32) -> bool {
        let new_zoom = new_zoom.clamp(self.min_zoom, self.max_zoom);
        if new_zoom == self.zoom {
            return false;
        }
        let image_point = (pivot - self.pan) / self.zoom;
        self.pan = pivot - image_point * new_zoom;
        self.zoom = new_zoom;
        true
    }

    /// One wheel notch, pivoting on the pointer.  Positive `scroll_y`
    /// (wheel up) zooms in.
    pub fn wheel(&mut self, pivot: Vec2, scroll_y: f32) -> bool {
        let step = if scroll_y > 0.0 {
            WHEEL_ZOOM_STEP
        } else {
            -WHEEL_ZOOM_STEP
        };
        self.zoom_around(pivot, self.zoom + step)
    }

    /// Toolbar zoom in: pivots on the viewport centre.
    pub fn zoom_in(&mut self, viewport_size: Vec2) -> bool {
        self.zoom_around(viewport_size / 2.0, self.zoom + BUTTON_ZOOM_STEP)
    }

    /// Toolbar zoom out: pivots on the viewport centre.
    pub fn zoom_out(&mut self, viewport_size: Vec2) -> bool {
        self.zoom_around(viewport_size / 2.0, self.zoom - BUTTON_ZOOM_STEP)
    }

    /// Fit the whole image into the viewport with padding and centre it.
    /// Small images are scaled up; the result never drops below the
    /// minimum zoom.
    pub fn fit(&mut self, viewport_size: Vec2, image_size: Vec2) {
        if image_size.x <= 0.0 || image_size.y <= 0.0 {
            return;
        }
        let available = viewport_size - Vec2::splat(FIT_PADDING * 2.0);
        let scale = (available.x / image_size.x).min(available.y / image_size.y);
        self.zoom = scale.max(self.min_zoom);
        self.pan = (viewport_size - image_size * self.zoom) / 2.0;
    }
}

// ============================================================================
// POINTER STATE MACHINE
// ============================================================================

/// What the pointer went down on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerTarget {
    /// The image or empty workspace: starts a pan.
    Background,
    /// A grid line handle.
    Boundary(Axis, usize),
    /// A button or other widget: ignored by the view.
    Control,
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum Interaction {
    #[default]
    Idle,
    Panning {
        last: Pos2,
    },
    DraggingBoundary {
        axis: Axis,
        index: usize,
    },
}

/// Boundary position requested by a drag, in image pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundaryMove {
    pub axis: Axis,
    pub index: usize,
    pub position: f32,
}

/// Owns the view transform and serializes panning against boundary
/// dragging: only one of them is ever active.
#[derive(Clone, Debug)]
pub struct ViewController {
    pub transform: ViewTransform,
    mode: Interaction,
    /// Set by a pan that actually moved; cleared on the next press.
    pan_moved: bool,
}

impl ViewController {
    pub fn new(transform: ViewTransform) -> Self {
        Self {
            transform,
            mode: Interaction::Idle,
            pan_moved: false,
        }
    }

    pub fn mode(&self) -> Interaction {
        self.mode
    }

    /// True if the last press turned into a pan; used to swallow the click
    /// that follows the release.
    pub fn click_suppressed(&self) -> bool {
        self.pan_moved
    }

    pub fn pointer_down(&mut self, target: PointerTarget, pos: Pos2) {
        match target {
            PointerTarget::Control => {}
            PointerTarget::Boundary(axis, index) => {
                self.mode = Interaction::DraggingBoundary { axis, index };
            }
            PointerTarget::Background => {
                self.pan_moved = false;
                self.mode = Interaction::Panning { last: pos };
            }
        }
    }

    /// Advance the active interaction.  A boundary drag yields the requested
    /// position for the caller to apply to the grid.
    pub fn pointer_move(&mut self, pos: Pos2, viewport: Rect) -> Option<BoundaryMove> {
        match self.mode {
            Interaction::Idle => None,
            Interaction::Panning { last } => {
                let delta = pos - last;
                if delta.x.abs() > PAN_CLICK_SLOP || delta.y.abs() > PAN_CLICK_SLOP {
                    self.pan_moved = true;
                }
                self.transform.pan_by(delta);
                self.mode = Interaction::Panning { last: pos };
                None
            }
            Interaction::DraggingBoundary { axis, index } => {
                let image = self.transform.screen_to_image(viewport, pos);
                let position = match axis {
                    Axis::X => image.x,
                    Axis::Y => image.y,
                };
                Some(BoundaryMove {
                    axis,
                    index,
                    position,
                })
            }
        }
    }

    /// Returns the interaction that just ended.
    pub fn pointer_up(&mut self) -> Interaction {
        std::mem::take(&mut self.mode)
    }
}
