// ============================================================================
// CELL EXPORT — crop composited cells, encode PNG, package ZIP archives
// ============================================================================
//
// Preview, single-cell save, clipboard copy and the bulk archive all go
// through `extract_cell`, so what the user previews is byte-for-byte what
// gets written.

use std::fs::{self, File};
use std::io::{BufWriter, Cursor, Seek, Write};
use std::path::{Path, PathBuf};

use image::codecs::png::PngEncoder;
use image::{ImageEncoder, RgbaImage, imageops};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::{Result, SlicerError};
use crate::grid::Grid;

/// Default file name offered for the bulk export.
pub const ARCHIVE_NAME: &str = "sprites_custom.zip";

/// Entry name for a cell: 1-indexed, row first.
pub fn slice_name(row: usize, col: usize) -> String {
    format!("slice_{}_{}.png", row + 1, col + 1)
}

/// Copy one cell's pixel rectangle out of the composited image.
pub fn extract_cell(composited: &RgbaImage, grid: &Grid, row: usize, col: usize) -> Result<RgbaImage> {
    let rect = grid
        .cell_pixel_rect(row, col)
        .ok_or(SlicerError::CellOutOfRange {
            row,
            col,
            rows: grid.rows(),
            cols: grid.cols(),
        })?;
    Ok(imageops::crop_imm(composited, rect.x, rect.y, rect.width, rect.height).to_image())
}

/// Encode an RGBA buffer as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ColorType::Rgba8,
    )?;
    Ok(bytes)
}

/// `extract_cell` + `encode_png`.
pub fn cell_png(composited: &RgbaImage, grid: &Grid, row: usize, col: usize) -> Result<Vec<u8>> {
    encode_png(&extract_cell(composited, grid, row, col)?)
}

/// Every cell as `(name, png bytes)`, row-major.  Fully transparent cells
/// are included like any other.
pub fn export_all(composited: &RgbaImage, grid: &Grid) -> Result<Vec<(String, Vec<u8>)>> {
    grid.cells()
        .map(|(r, c)| Ok((slice_name(r, c), cell_png(composited, grid, r, c)?)))
        .collect()
}

/// Write entries into a Deflate-compressed ZIP and hand the sink back.
pub fn write_archive<W: Write + Seek>(entries: &[(String, Vec<u8>)], sink: W) -> Result<W> {
    let mut zip = ZipWriter::new(sink);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, bytes) in entries {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(bytes)?;
    }
    Ok(zip.finish()?)
}

/// The whole grid as an in-memory ZIP.
pub fn archive_bytes(composited: &RgbaImage, grid: &Grid) -> Result<Vec<u8>> {
    let entries = export_all(composited, grid)?;
    Ok(write_archive(&entries, Cursor::new(Vec::new()))?.into_inner())
}

/// Write the whole grid as a ZIP file.  Returns the number of slices.
pub fn save_archive(composited: &RgbaImage, grid: &Grid, path: &Path) -> Result<usize> {
    let entries = export_all(composited, grid)?;
    let file = File::create(path)?;
    let mut writer = write_archive(&entries, BufWriter::new(file))?;
    writer.flush()?;
    Ok(entries.len())
}

pub fn save_cell_png(composited: &RgbaImage, grid: &Grid, row: usize, col: usize, path: &Path) -> Result<()> {
    fs::write(path, cell_png(composited, grid, row, col)?)?;
    Ok(())
}

/// Write every cell as a loose PNG into `dir` (created if missing).
pub fn export_to_dir(composited: &RgbaImage, grid: &Grid, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(grid.rows() * grid.cols());
    for (name, bytes) in export_all(composited, grid)? {
        let path = dir.join(name);
        fs::write(&path, bytes)?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Axis;
    use crate::ops::compositor::{ChromaKey, Margins, composite};
    use image::Rgba;
    use std::io::Read;

    fn gradient(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| Rgba([x as u8, y as u8, (x ^ y) as u8, 255]))
    }

    fn read_names(bytes: Vec<u8>) -> Vec<String> {
        let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        archive.file_names().map(str::to_string).collect()
    }

    #[test]
    fn names_are_one_indexed() {
        assert_eq!(slice_name(0, 0), "slice_1_1.png");
        assert_eq!(slice_name(2, 10), "slice_3_11.png");
    }

    #[test]
    fn two_by_two_archive_contents() {
        let img = gradient(100, 100);
        let grid = Grid::uniform(2, 2, 100, 100);
        let mut names = read_names(archive_bytes(&img, &grid).unwrap());
        names.sort();
        assert_eq!(names, vec!["slice_1_1.png", "slice_1_2.png", "slice_2_1.png", "slice_2_2.png"]);

        let entries = export_all(&img, &grid).unwrap();
        let order: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(order, vec!["slice_1_1.png", "slice_1_2.png", "slice_2_1.png", "slice_2_2.png"]);
        for (_, png) in &entries {
            let decoded = image::load_from_memory(png).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (50, 50));
        }
    }

    #[test]
    fn transparent_cells_are_not_skipped() {
        let img = RgbaImage::from_pixel(30, 30, Rgba([255, 255, 255, 255]));
        let grid = Grid::uniform(3, 3, 30, 30);
        let keyed = composite(&img, &grid, Margins::default(), Some(ChromaKey::new([255, 255, 255], 5.0)));
        assert!(keyed.pixels().all(|p| p[3] == 0));
        assert_eq!(read_names(archive_bytes(&keyed, &grid).unwrap()).len(), 9);
    }

    #[test]
    fn extracted_cell_matches_direct_crop() {
        let img = gradient(64, 48);
        let mut grid = Grid::uniform(3, 4, 64, 48);
        grid.move_boundary(Axis::X, 1, 11.4);
        grid.move_boundary(Axis::Y, 2, 37.8);
        let composited = composite(&img, &grid, Margins::new(1, 2, 3, 1), Some(ChromaKey::new([10, 10, 0], 20.0)));

        for (r, c) in grid.cells() {
            let rect = grid.cell_pixel_rect(r, c).unwrap();
            let cell = extract_cell(&composited, &grid, r, c).unwrap();
            assert_eq!((cell.width(), cell.height()), (rect.width, rect.height));
            for (x, y, p) in cell.enumerate_pixels() {
                assert_eq!(p, composited.get_pixel(rect.x + x, rect.y + y));
            }
            let decoded = image::load_from_memory(&cell_png(&composited, &grid, r, c).unwrap())
                .unwrap()
                .to_rgba8();
            assert_eq!(decoded, cell);
        }
    }

    #[test]
    fn out_of_range_cell_is_an_error() {
        let img = gradient(10, 10);
        let grid = Grid::uniform(1, 1, 10, 10);
        assert!(matches!(
            extract_cell(&img, &grid, 1, 0),
            Err(SlicerError::CellOutOfRange { row: 1, col: 0, rows: 1, cols: 1 })
        ));
    }

    #[test]
    fn files_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let img = gradient(20, 20);
        let grid = Grid::uniform(2, 1, 20, 20);

        let zip_path = dir.path().join(ARCHIVE_NAME);
        assert_eq!(save_archive(&img, &grid, &zip_path).unwrap(), 2);
        let mut archive = zip::ZipArchive::new(File::open(&zip_path).unwrap()).unwrap();
        let mut first = Vec::new();
        archive.by_name("slice_1_1.png").unwrap().read_to_end(&mut first).unwrap();
        assert_eq!(first, cell_png(&img, &grid, 0, 0).unwrap());

        let single = dir.path().join("one.png");
        save_cell_png(&img, &grid, 1, 0, &single).unwrap();
        assert_eq!(fs::read(&single).unwrap(), cell_png(&img, &grid, 1, 0).unwrap());

        let written = export_to_dir(&img, &grid, &dir.path().join("loose")).unwrap();
        assert_eq!(written.len(), 2);
        assert!(written[1].ends_with("slice_2_1.png"));
        assert!(written.iter().all(|p| p.is_file()));
    }
}
