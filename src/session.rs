// ============================================================================
// SESSION — the single owner of image, grid, slice settings and the
// composited cache.  The GUI shell and the headless CLI both drive it.
// ============================================================================

use std::path::Path;
use std::time::{Duration, Instant};

use image::RgbaImage;

use crate::debounce::Debounce;
use crate::error::{Result, SlicerError};
use crate::grid::{Axis, Grid};
use crate::io::SourceImage;
use crate::ops::compositor::{self, ChromaKey, MAX_THRESHOLD, Margins};
use crate::ops::export;

/// User-editable slicing parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct SliceSettings {
    pub rows: usize,
    pub cols: usize,
    /// "Remove background" switch.
    pub remove_background: bool,
    pub key_color: [u8; 3],
    pub threshold: f32,
    pub margins: Margins,
    pub show_grid: bool,
    /// View toggle; when off the key is not applied even if enabled.
    pub show_mask: bool,
}

impl Default for SliceSettings {
    fn default() -> Self {
        Self {
            rows: 4,
            cols: 4,
            remove_background: false,
            key_color: [0, 0, 0],
            threshold: 30.0,
            margins: Margins::default(),
            show_grid: true,
            show_mask: true,
        }
    }
}

impl SliceSettings {
    /// The key to apply, if both the switch and the mask view are on.
    pub fn chroma_key(&self) -> Option<ChromaKey> {
        (self.remove_background && self.show_mask)
            .then(|| ChromaKey::new(self.key_color, self.threshold))
    }
}

pub struct Session {
    source: Option<SourceImage>,
    grid: Grid,
    settings: SliceSettings,
    composited: Option<RgbaImage>,
    dirty: bool,
    /// Bumped every time `composited` is rebuilt.
    generation: u64,
    /// Bumped whenever a cell rectangle may have changed.
    grid_revision: u64,
    picking: bool,
    debounce: Debounce,
}

impl Session {
    pub fn new(settings: SliceSettings) -> Self {
        Self {
            source: None,
            grid: Grid::new(),
            settings,
            composited: None,
            dirty: true,
            generation: 0,
            grid_revision: 0,
            picking: false,
            debounce: Debounce::default(),
        }
    }

    pub fn has_image(&self) -> bool {
        self.source.is_some()
    }

    pub fn source(&self) -> Option<&SourceImage> {
        self.source.as_ref()
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn settings(&self) -> &SliceSettings {
        &self.settings
    }

    pub fn is_picking(&self) -> bool {
        self.picking
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn grid_revision(&self) -> u64 {
        self.grid_revision
    }

    // ------------------------------------------------------------------
    // Image & grid
    // ------------------------------------------------------------------

    /// Replace the current image.  The grid is rebuilt uniformly from the
    /// current row/column settings and any cached composite is dropped.
    pub fn load_image(&mut self, source: SourceImage) {
        log::info!(
            "loaded '{}' ({}x{})",
            source.name,
            source.width(),
            source.height()
        );
        self.source = Some(source);
        self.composited = None;
        self.debounce.flush();
        self.picking = false;
        self.clamp_counts();
        self.reset_grid();
    }

    /// Change row/column counts (clamped to at least 1 and at most the image
    /// size on that axis) and rebuild the grid.
    pub fn set_grid_size(&mut self, rows: usize, cols: usize) {
        self.settings.rows = rows;
        self.settings.cols = cols;
        self.clamp_counts();
        self.reset_grid();
    }

    /// Rebuild the uniform grid, discarding manual drags.  No-op without an
    /// image.
    pub fn reset_grid(&mut self) {
        let Some(src) = &self.source else { return };
        // An empty image leaves no grid rather than the previous one.
        self.grid.clear();
        self.grid
            .initialize(self.settings.rows, self.settings.cols, src.width(), src.height());
        self.grid_revision += 1;
        self.dirty = true;
    }

    pub fn move_boundary(&mut self, axis: Axis, index: usize, position: f32) -> bool {
        let moved = self.grid.move_boundary(axis, index, position);
        if moved {
            self.grid_revision += 1;
            if !self.settings.margins.is_zero() {
                self.dirty = true;
            }
        }
        moved
    }

    fn clamp_counts(&mut self) {
        if let Some(src) = &self.source {
            self.settings.rows = self.settings.rows.min(src.height() as usize);
            self.settings.cols = self.settings.cols.min(src.width() as usize);
        }
        self.settings.rows = self.settings.rows.max(1);
        self.settings.cols = self.settings.cols.max(1);
    }

    // ------------------------------------------------------------------
    // Compositor inputs
    // ------------------------------------------------------------------

    /// Margin edits are debounced; the composite refreshes once input goes
    /// quiet (see `poll`).
    pub fn set_margins(&mut self, margins: Margins, now: Instant) {
        if margins != self.settings.margins {
            self.settings.margins = margins;
            self.debounce.trigger(now);
        }
    }

    /// Threshold edits are debounced like margins.
    pub fn set_threshold(&mut self, threshold: f32, now: Instant) {
        let threshold = threshold.clamp(0.0, MAX_THRESHOLD);
        if threshold != self.settings.threshold {
            self.settings.threshold = threshold;
            self.debounce.trigger(now);
        }
    }

    pub fn set_remove_background(&mut self, on: bool) {
        self.settings.remove_background = on;
        if !on {
            self.picking = false;
        }
        self.dirty = true;
    }

    pub fn set_show_mask(&mut self, on: bool) {
        self.settings.show_mask = on;
        self.dirty = true;
    }

    pub fn set_show_grid(&mut self, on: bool) {
        self.settings.show_grid = on;
    }

    pub fn set_key_color(&mut self, rgb: [u8; 3]) {
        self.settings.key_color = rgb;
        self.dirty = true;
    }

    /// Set the key from `#RRGGBB` text.  Invalid text leaves the key as is.
    pub fn set_key_hex(&mut self, hex: &str) -> Result<()> {
        let rgb = compositor::parse_hex_color(hex)
            .ok_or_else(|| SlicerError::InvalidColor(hex.to_string()))?;
        self.set_key_color(rgb);
        Ok(())
    }

    /// Toggle eyedropper mode.  Only available while background removal is
    /// on; returns the new state.
    pub fn toggle_picking(&mut self) -> bool {
        self.picking = self.settings.remove_background && !self.picking;
        self.picking
    }

    /// Sample the *source* image at an image-space point, make it the key
    /// colour and leave picking mode.  Points outside the image change
    /// nothing.
    pub fn pick_color(&mut self, x: f32, y: f32) -> Option<[u8; 3]> {
        let src = self.source.as_ref()?;
        if x < 0.0 || y < 0.0 {
            return None;
        }
        let (px, py) = (x.floor() as u32, y.floor() as u32);
        if px >= src.width() || py >= src.height() {
            return None;
        }
        let p = src.pixels.get_pixel(px, py);
        let rgb = [p[0], p[1], p[2]];
        self.set_key_color(rgb);
        self.picking = false;
        log::info!("picked key colour {}", compositor::format_hex_color(rgb));
        Some(rgb)
    }

    /// Let the debounce settle.  Returns the time until the next deadline
    /// while one is pending, so the shell can schedule a wake-up.
    pub fn poll(&mut self, now: Instant) -> Option<Duration> {
        if self.debounce.fire(now) {
            self.dirty = true;
            return None;
        }
        self.debounce.remaining(now)
    }

    // ------------------------------------------------------------------
    // Composite & export
    // ------------------------------------------------------------------

    fn refresh(&mut self) -> Result<()> {
        let src = self.source.as_ref().ok_or(SlicerError::NoImage)?;
        if self.debounce.flush() {
            self.dirty = true;
        }
        if self.dirty || self.composited.is_none() {
            self.composited = Some(compositor::composite(
                &src.pixels,
                &self.grid,
                self.settings.margins,
                self.settings.chroma_key(),
            ));
            self.dirty = false;
            self.generation += 1;
        }
        Ok(())
    }

    /// The composited sheet and the grid it was built with.  Pending
    /// debounced edits are applied first, so exports always reflect the
    /// latest inputs.
    pub fn composited(&mut self) -> Result<(&RgbaImage, &Grid)> {
        self.refresh()?;
        let img = self.composited.as_ref().ok_or(SlicerError::NoImage)?;
        Ok((img, &self.grid))
    }

    /// The composite as last built, without forcing pending edits through.
    pub fn cached_composite(&self) -> Option<&RgbaImage> {
        self.composited.as_ref()
    }

    /// Whether the cached composite is stale.
    pub fn needs_refresh(&self) -> bool {
        self.source.is_some() && (self.dirty || self.composited.is_none())
    }

    pub fn extract_cell(&mut self, row: usize, col: usize) -> Result<RgbaImage> {
        let (img, grid) = self.composited()?;
        export::extract_cell(img, grid, row, col)
    }

    pub fn cell_png(&mut self, row: usize, col: usize) -> Result<Vec<u8>> {
        let (img, grid) = self.composited()?;
        export::cell_png(img, grid, row, col)
    }

    pub fn save_cell(&mut self, row: usize, col: usize, path: &Path) -> Result<()> {
        let (img, grid) = self.composited()?;
        export::save_cell_png(img, grid, row, col, path)
    }

    pub fn export_archive(&mut self) -> Result<Vec<u8>> {
        let (img, grid) = self.composited()?;
        export::archive_bytes(img, grid)
    }

    pub fn save_archive(&mut self, path: &Path) -> Result<usize> {
        let (img, grid) = self.composited()?;
        let count = export::save_archive(img, grid, path)?;
        log::info!("wrote {} slices to {}", count, path.display());
        Ok(count)
    }

    pub fn export_to_dir(&mut self, dir: &Path) -> Result<usize> {
        let (img, grid) = self.composited()?;
        Ok(export::export_to_dir(img, grid, dir)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn sheet(w: u32, h: u32) -> SourceImage {
        let px = RgbaImage::from_fn(w, h, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([200, 30, 30, 255])
            }
        });
        SourceImage::new(px, "sheet.png")
    }

    fn two_by_two() -> Session {
        let mut s = Session::new(SliceSettings {
            rows: 2,
            cols: 2,
            ..SliceSettings::default()
        });
        s.load_image(sheet(100, 100));
        s
    }

    #[test]
    fn operations_without_image_fail_cleanly() {
        let mut s = Session::new(SliceSettings::default());
        s.reset_grid();
        assert!(s.grid().is_empty());
        assert!(matches!(s.composited(), Err(SlicerError::NoImage)));
        assert!(matches!(s.export_archive(), Err(SlicerError::NoImage)));
        assert_eq!(s.pick_color(1.0, 1.0), None);
        assert!(!s.needs_refresh());
    }

    #[test]
    fn load_builds_uniform_grid() {
        let s = two_by_two();
        assert_eq!(s.grid().boundaries(Axis::X), &[0.0, 50.0, 100.0]);
        assert_eq!(s.grid().boundaries(Axis::Y), &[0.0, 50.0, 100.0]);
    }

    #[test]
    fn counts_are_clamped() {
        let mut s = Session::new(SliceSettings::default());
        s.load_image(sheet(6, 3));
        s.set_grid_size(0, 50);
        assert_eq!((s.settings().rows, s.settings().cols), (1, 6));
        assert_eq!((s.grid().rows(), s.grid().cols()), (1, 6));
        s.set_grid_size(9, 2);
        assert_eq!((s.grid().rows(), s.grid().cols()), (3, 2));
    }

    #[test]
    fn empty_image_keeps_counts_valid_and_drops_old_grid() {
        let mut s = two_by_two();
        s.load_image(SourceImage::new(RgbaImage::new(0, 0), "empty"));
        assert_eq!((s.settings().rows, s.settings().cols), (1, 1));
        assert!(s.grid().is_empty());
    }

    #[test]
    fn dragging_a_line_changes_grid_revision_without_margins() {
        let mut s = two_by_two();
        s.composited().unwrap();
        let (gen0, rev0) = (s.generation(), s.grid_revision());
        let before = s.extract_cell(0, 0).unwrap().width();

        assert!(s.move_boundary(Axis::X, 1, 30.0));
        assert_ne!(s.grid_revision(), rev0);
        assert_eq!(s.generation(), gen0);
        assert_eq!((before, s.extract_cell(0, 0).unwrap().width()), (50, 30));

        // a rejected move leaves the revision alone
        let rev1 = s.grid_revision();
        assert!(!s.move_boundary(Axis::X, 0, 10.0));
        assert_eq!(s.grid_revision(), rev1);

        s.reset_grid();
        assert_ne!(s.grid_revision(), rev1);
    }

    #[test]
    fn reset_discards_drags_and_new_load_replaces_everything() {
        let mut s = two_by_two();
        assert!(s.move_boundary(Axis::X, 1, 30.0));
        assert_eq!(s.grid().boundaries(Axis::X)[1], 30.0);
        s.reset_grid();
        assert_eq!(s.grid().boundaries(Axis::X)[1], 50.0);

        s.move_boundary(Axis::Y, 1, 70.0);
        s.load_image(sheet(40, 20));
        assert_eq!(s.grid().boundaries(Axis::X), &[0.0, 20.0, 40.0]);
        assert_eq!(s.grid().boundaries(Axis::Y), &[0.0, 10.0, 20.0]);
        let (img, _) = s.composited().unwrap();
        assert_eq!(img.dimensions(), (40, 20));
    }

    #[test]
    fn key_applies_only_with_switch_and_mask_view() {
        let mut s = two_by_two();
        s.set_key_color([255, 255, 255]);
        let opaque = |s: &mut Session| s.composited().unwrap().0.pixels().filter(|p| p[3] == 255).count();
        assert_eq!(opaque(&mut s), 100 * 100);

        s.set_remove_background(true);
        assert_eq!(opaque(&mut s), 100 * 100 / 2);

        s.set_show_mask(false);
        assert_eq!(opaque(&mut s), 100 * 100);
    }

    #[test]
    fn debounced_edits_land_after_quiet_period() {
        let mut s = two_by_two();
        let t0 = Instant::now();
        let gen0 = {
            s.composited().unwrap();
            s.generation()
        };

        s.set_margins(Margins::new(10, 0, 5, 0), t0);
        assert!(!s.needs_refresh());
        assert!(s.poll(t0 + Duration::from_millis(10)).is_some());
        assert_eq!(s.poll(t0 + Duration::from_millis(60)), None);
        assert!(s.needs_refresh());

        let (img, _) = s.composited().unwrap();
        assert_eq!(img.get_pixel(50, 50)[3], 0);
        assert_eq!(img.get_pixel(55, 10)[3], 255);
        assert_eq!(s.generation(), gen0 + 1);
    }

    #[test]
    fn exports_flush_pending_edits() {
        let mut s = two_by_two();
        s.set_margins(Margins::new(50, 0, 0, 0), Instant::now());
        let cell = s.extract_cell(1, 1).unwrap();
        assert!(cell.pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn threshold_is_clamped() {
        let mut s = two_by_two();
        s.set_threshold(9000.0, Instant::now());
        assert_eq!(s.settings().threshold, MAX_THRESHOLD);
        s.set_threshold(-3.0, Instant::now());
        assert_eq!(s.settings().threshold, 0.0);
    }

    #[test]
    fn eyedropper_samples_source_and_exits() {
        let mut s = two_by_two();
        assert!(!s.toggle_picking(), "picking needs background removal");
        s.set_remove_background(true);
        assert!(s.toggle_picking());

        assert_eq!(s.pick_color(150.0, 3.0), None);
        assert!(s.is_picking());

        assert_eq!(s.pick_color(1.7, 0.2), Some([200, 30, 30]));
        assert_eq!(s.settings().key_color, [200, 30, 30]);
        assert!(!s.is_picking());

        s.toggle_picking();
        s.set_remove_background(false);
        assert!(!s.is_picking());
    }

    #[test]
    fn invalid_hex_keeps_previous_key() {
        let mut s = two_by_two();
        s.set_key_hex("#00ff00").unwrap();
        assert_eq!(s.settings().key_color, [0, 255, 0]);
        assert!(matches!(s.set_key_hex("zzz"), Err(SlicerError::InvalidColor(_))));
        assert_eq!(s.settings().key_color, [0, 255, 0]);
    }

    #[test]
    fn archive_and_files_from_session() {
        let mut s = two_by_two();
        let bytes = s.export_archive().unwrap();
        let archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 4);

        let png = s.cell_png(1, 0).unwrap();
        let cell = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(cell, s.extract_cell(1, 0).unwrap());

        let dir = tempfile::tempdir().unwrap();
        assert_eq!(s.save_archive(&dir.path().join("out.zip")).unwrap(), 4);
        assert_eq!(s.export_to_dir(&dir.path().join("loose")).unwrap(), 4);
        s.save_cell(0, 1, &dir.path().join("c.png")).unwrap();
        assert!(matches!(
            s.save_cell(5, 1, &dir.path().join("bad.png")),
            Err(SlicerError::CellOutOfRange { .. })
        ));
        assert!(!dir.path().join("bad.png").exists());
    }
}
