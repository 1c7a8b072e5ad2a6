// ============================================================================
// GRID ENGINE — row/column boundaries in image-pixel space
// ============================================================================
//
// Boundaries are stored in image pixels, never in screen space, so the grid
// is unaffected by pan/zoom.  Cells are not stored: a cell is just the pair
// of adjacent boundaries on each axis.

/// Minimum distance a dragged boundary keeps from each neighbour.
pub const MIN_GAP: f32 = 2.0;

/// Which set of grid lines an operation addresses.
///
/// `X` boundaries are the vertical lines separating columns, `Y` boundaries
/// the horizontal lines separating rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

/// A cell rectangle in (fractional) image coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A cell rectangle snapped to whole pixels.  Adjacent cells share their
/// snapped edge, so pixel rects tile the image exactly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Grid {
    /// `cols + 1` entries, first = 0, last = image width.
    columns: Vec<f32>,
    /// `rows + 1` entries, first = 0, last = image height.
    rows: Vec<f32>,
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor: an initialized uniform grid.
    pub fn uniform(rows: usize, cols: usize, image_width: u32, image_height: u32) -> Self {
        let mut grid = Self::new();
        grid.initialize(rows, cols, image_width, image_height);
        grid
    }

    /// Rebuild the grid as a uniform subdivision of the image.
    ///
    /// Does nothing when a count is zero or the image has no area; callers
    /// clamp counts to at least 1 before calling.
    pub fn initialize(&mut self, rows: usize, cols: usize, image_width: u32, image_height: u32) {
        if rows < 1 || cols < 1 || image_width == 0 || image_height == 0 {
            return;
        }
        self.columns = subdivide(image_width as f32, cols);
        self.rows = subdivide(image_height as f32, rows);
    }

    pub fn clear(&mut self) {
        self.columns.clear();
        self.rows.clear();
    }

    /// True until `initialize` has succeeded at least once.
    pub fn is_empty(&self) -> bool {
        self.columns.len() < 2 || self.rows.len() < 2
    }

    pub fn rows(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }

    pub fn cols(&self) -> usize {
        self.columns.len().saturating_sub(1)
    }

    pub fn boundaries(&self, axis: Axis) -> &[f32] {
        match axis {
            Axis::X => &self.columns,
            Axis::Y => &self.rows,
        }
    }

    fn boundaries_mut(&mut self, axis: Axis) -> &mut Vec<f32> {
        match axis {
            Axis::X => &mut self.columns,
            Axis::Y => &mut self.rows,
        }
    }

    /// Move one interior boundary to `proposed`, clamped to
    /// `[previous + MIN_GAP, next - MIN_GAP]`.
    ///
    /// Returns `false` (and changes nothing) for the fixed image edges,
    /// out-of-range indices, NaN proposals, or when the neighbours are too
    /// close together for any valid position to exist.
    pub fn move_boundary(&mut self, axis: Axis, index: usize, proposed: f32) -> bool {
        let bounds = self.boundaries_mut(axis);
        if index == 0 || index + 1 >= bounds.len() || proposed.is_nan() {
            return false;
        }
        let min = bounds[index - 1] + MIN_GAP;
        let max = bounds[index + 1] - MIN_GAP;
        if min > max {
            return false;
        }
        bounds[index] = proposed.clamp(min, max);
        true
    }

    pub fn cell_rect(&self, row: usize, col: usize) -> Option<CellRect> {
        if row >= self.rows() || col >= self.cols() {
            return None;
        }
        let x = self.columns[col];
        let y = self.rows[row];
        Some(CellRect {
            x,
            y,
            width: self.columns[col + 1] - x,
            height: self.rows[row + 1] - y,
        })
    }

    /// Cell rectangle with every boundary rounded to the nearest pixel edge.
    pub fn cell_pixel_rect(&self, row: usize, col: usize) -> Option<PixelRect> {
        if row >= self.rows() || col >= self.cols() {
            return None;
        }
        let x0 = snap(self.columns[col]);
        let x1 = snap(self.columns[col + 1]);
        let y0 = snap(self.rows[row]);
        let y1 = snap(self.rows[row + 1]);
        Some(PixelRect {
            x: x0,
            y: y0,
            width: x1.saturating_sub(x0),
            height: y1.saturating_sub(y0),
        })
    }

    /// All `(row, col)` pairs in row-major order (row outer, column inner).
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let cols = self.cols();
        (0..self.rows()).flat_map(move |r| (0..cols).map(move |c| (r, c)))
    }

    /// The cell containing an image-space point, if any.
    pub fn cell_at(&self, x: f32, y: f32) -> Option<(usize, usize)> {
        let col = span_index(&self.columns, x)?;
        let row = span_index(&self.rows, y)?;
        Some((row, col))
    }

    /// Nearest interior boundary within `tolerance` of `coord`.
    pub fn boundary_near(&self, axis: Axis, coord: f32, tolerance: f32) -> Option<usize> {
        let bounds = self.boundaries(axis);
        if bounds.len() < 3 {
            return None;
        }
        (1..bounds.len() - 1)
            .map(|i| (i, (bounds[i] - coord).abs()))
            .filter(|&(_, d)| d <= tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }
}

fn subdivide(extent: f32, count: usize) -> Vec<f32> {
    let step = extent / count as f32;
    let mut out: Vec<f32> = (0..=count).map(|i| step * i as f32).collect();
    // Float products can land a hair off the edge.
    out[count] = extent;
    out
}

fn snap(v: f32) -> u32 {
    v.round().max(0.0) as u32
}

fn span_index(bounds: &[f32], v: f32) -> Option<usize> {
    if bounds.len() < 2 || v < bounds[0] || v >= bounds[bounds.len() - 1] {
        return None;
    }
    // partition_point: first boundary strictly greater than v
    let upper = bounds.partition_point(|&b| b <= v);
    Some(upper - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strictly_increasing(v: &[f32]) -> bool {
        v.windows(2).all(|w| w[0] < w[1])
    }

    #[test]
    fn initialize_spans_image_and_is_monotonic() {
        for &(rows, cols, w, h) in &[
            (1, 1, 1, 1),
            (2, 2, 100, 100),
            (3, 7, 101, 53),
            (16, 16, 512, 512),
            (5, 9, 17, 1000),
        ] {
            let g = Grid::uniform(rows, cols, w, h);
            assert_eq!(g.rows(), rows);
            assert_eq!(g.cols(), cols);
            let xs = g.boundaries(Axis::X);
            let ys = g.boundaries(Axis::Y);
            assert_eq!(xs[0], 0.0);
            assert_eq!(ys[0], 0.0);
            assert_eq!(*xs.last().unwrap(), w as f32);
            assert_eq!(*ys.last().unwrap(), h as f32);
            assert!(strictly_increasing(xs));
            assert!(strictly_increasing(ys));
        }
    }

    #[test]
    fn initialize_rejects_zero_counts_and_empty_images() {
        let mut g = Grid::uniform(2, 2, 10, 10);
        let before = g.clone();
        g.initialize(0, 3, 10, 10);
        assert_eq!(g, before);
        g.initialize(3, 0, 10, 10);
        assert_eq!(g, before);
        g.initialize(3, 3, 0, 10);
        assert_eq!(g, before);
        assert!(Grid::uniform(0, 0, 10, 10).is_empty());
    }

    #[test]
    fn two_by_two_on_hundred_pixels() {
        let g = Grid::uniform(2, 2, 100, 100);
        let expected = [(0, 0, 0.0, 0.0), (0, 1, 50.0, 0.0), (1, 0, 0.0, 50.0), (1, 1, 50.0, 50.0)];
        for (r, c, x, y) in expected {
            let rect = g.cell_rect(r, c).unwrap();
            assert_eq!(rect, CellRect { x, y, width: 50.0, height: 50.0 });
        }
        assert!(g.cell_rect(2, 0).is_none());
        assert_eq!(g.cells().collect::<Vec<_>>(), vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn move_boundary_clamps_to_neighbours() {
        let mut g = Grid::uniform(1, 4, 100, 10);
        // neighbours of index 2 are 25 and 75
        assert!(g.move_boundary(Axis::X, 2, 10.0));
        assert_eq!(g.boundaries(Axis::X)[2], 27.0);
        assert!(g.move_boundary(Axis::X, 2, 90.0));
        assert_eq!(g.boundaries(Axis::X)[2], 73.0);
        assert!(g.move_boundary(Axis::X, 2, f32::INFINITY));
        assert_eq!(g.boundaries(Axis::X)[2], 73.0);
        assert!(g.move_boundary(Axis::X, 2, f32::NEG_INFINITY));
        assert_eq!(g.boundaries(Axis::X)[2], 27.0);
        assert!(g.move_boundary(Axis::X, 2, 40.5));
        assert_eq!(g.boundaries(Axis::X)[2], 40.5);
    }

    #[test]
    fn image_edges_are_immutable() {
        let mut g = Grid::uniform(2, 2, 100, 100);
        assert!(!g.move_boundary(Axis::X, 0, 10.0));
        assert!(!g.move_boundary(Axis::Y, 2, 10.0));
        assert!(!g.move_boundary(Axis::Y, 9, 10.0));
        assert!(!g.move_boundary(Axis::Y, 1, f32::NAN));
        assert_eq!(g, Grid::uniform(2, 2, 100, 100));
    }

    #[test]
    fn cramped_neighbours_leave_boundary_alone() {
        // 3 px wide, 3 columns: neighbours 1 px apart from the moving line
        let mut g = Grid::uniform(1, 3, 3, 3);
        let before = g.boundaries(Axis::X).to_vec();
        assert!(!g.move_boundary(Axis::X, 1, 2.5));
        assert_eq!(g.boundaries(Axis::X), &before[..]);
    }

    #[test]
    fn arbitrary_drag_sequences_keep_the_gap() {
        let mut g = Grid::uniform(6, 6, 300, 240);
        let mut seed: u32 = 0x1234_5678;
        let mut next = || {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            seed
        };
        let extremes = [f32::INFINITY, f32::NEG_INFINITY, -1e9, 1e9];
        for step in 0..2000 {
            let axis = if next() % 2 == 0 { Axis::X } else { Axis::Y };
            let index = 1 + (next() % 5) as usize;
            let proposed = if step % 17 == 0 {
                extremes[(next() % 4) as usize]
            } else {
                (next() % 400) as f32 - 50.0
            };
            g.move_boundary(axis, index, proposed);
            for axis in [Axis::X, Axis::Y] {
                let b = g.boundaries(axis);
                for i in 1..b.len() - 1 {
                    assert!(b[i] >= b[i - 1] + MIN_GAP, "{axis:?} {i}: {b:?}");
                    assert!(b[i] <= b[i + 1] - MIN_GAP, "{axis:?} {i}: {b:?}");
                }
            }
        }
    }

    #[test]
    fn pixel_rects_tile_the_image() {
        let mut g = Grid::uniform(3, 5, 97, 61);
        g.move_boundary(Axis::X, 2, 33.7);
        g.move_boundary(Axis::Y, 1, 12.2);
        let (w, h) = (97u32, 61u32);
        let mut coverage = vec![0u8; (w * h) as usize];
        let mut float_area = 0.0f32;
        for (r, c) in g.cells() {
            float_area += {
                let rect = g.cell_rect(r, c).unwrap();
                rect.width * rect.height
            };
            let p = g.cell_pixel_rect(r, c).unwrap();
            for y in p.y..p.bottom() {
                for x in p.x..p.right() {
                    coverage[(y * w + x) as usize] += 1;
                }
            }
        }
        assert!(coverage.iter().all(|&n| n == 1));
        assert!((float_area - (w * h) as f32).abs() < 0.01);
    }

    #[test]
    fn cell_and_boundary_hit_tests() {
        let g = Grid::uniform(2, 4, 100, 50);
        assert_eq!(g.cell_at(0.0, 0.0), Some((0, 0)));
        assert_eq!(g.cell_at(25.0, 24.9), Some((0, 1)));
        assert_eq!(g.cell_at(99.9, 49.9), Some((1, 3)));
        assert_eq!(g.cell_at(100.0, 10.0), None);
        assert_eq!(g.cell_at(-0.1, 10.0), None);

        assert_eq!(g.boundary_near(Axis::X, 51.0, 3.0), Some(2));
        assert_eq!(g.boundary_near(Axis::X, 1.0, 3.0), None); // image edge
        assert_eq!(g.boundary_near(Axis::Y, 26.0, 3.0), Some(1));
        assert_eq!(g.boundary_near(Axis::Y, 40.0, 3.0), None);
    }
}
