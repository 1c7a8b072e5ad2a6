use image::{ImageFormat, RgbaImage};
use rfd::FileDialog;
use std::path::{Path, PathBuf};

use crate::error::{Result, SlicerError};

/// Extensions offered in the open dialog and accepted on drop (lowercase).
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "webp", "bmp", "tga", "gif", "ico", "tiff", "tif",
];

/// A decoded sprite sheet.  Immutable once loaded; a new load replaces it.
#[derive(Clone, Debug)]
pub struct SourceImage {
    pub pixels: RgbaImage,
    /// File name (or "clipboard") shown in the status line.
    pub name: String,
}

impl SourceImage {
    pub fn new(pixels: RgbaImage, name: impl Into<String>) -> Self {
        Self {
            pixels,
            name: name.into(),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Check if a file name carries one of the supported image extensions.
pub fn is_image_name(name: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&extension_of(name).as_str())
}

/// Decode raw file bytes.
///
/// `.tga` files take the dedicated TGA path: the format has no magic number,
/// so it has to be selected explicitly.  Everything else is sniffed from the
/// content.  Bytes that are neither sniffable nor carry an image extension are
/// rejected as unsupported input rather than reported as a decode failure.
pub fn decode_bytes(bytes: &[u8], name: &str) -> Result<SourceImage> {
    let ext = extension_of(name);
    if ext == "tga" {
        return Ok(SourceImage::new(decode_tga(bytes)?, name));
    }

    let format = match image::guess_format(bytes) {
        Ok(format) => format,
        Err(_) if is_image_name(name) => {
            return Err(SlicerError::Decode(format!("{}: unrecognised image data", name)));
        }
        Err(_) => return Err(SlicerError::UnsupportedInput(name.to_string())),
    };

    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| SlicerError::Decode(format!("{}: {}", name, e)))?;
    Ok(SourceImage::new(img.to_rgba8(), name))
}

/// Decode a Truevision TGA payload.
pub fn decode_tga(bytes: &[u8]) -> Result<RgbaImage> {
    image::load_from_memory_with_format(bytes, ImageFormat::Tga)
        .map(|img| img.to_rgba8())
        .map_err(|e| SlicerError::Decode(format!("TGA: {}", e)))
}

/// Synchronously read and decode an image file.
pub fn decode_path(path: &Path) -> Result<SourceImage> {
    if !path.exists() {
        return Err(SlicerError::NotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image")
        .to_string();
    decode_bytes(&bytes, &name)
}

// ============================================================================
// NATIVE DIALOGS
// ============================================================================

fn dialog(start_dir: Option<&Path>) -> FileDialog {
    match start_dir {
        Some(dir) => FileDialog::new().set_directory(dir),
        None => FileDialog::new(),
    }
}

/// Show the native open dialog filtered to supported images.
pub fn pick_image_path(start_dir: Option<&Path>) -> Option<PathBuf> {
    dialog(start_dir)
        .add_filter("Images", IMAGE_EXTENSIONS)
        .add_filter("All Files", &["*"])
        .pick_file()
}

/// Show the native save dialog for a single slice.
pub fn pick_png_save_path(start_dir: Option<&Path>, default_name: &str) -> Option<PathBuf> {
    dialog(start_dir)
        .add_filter("PNG", &["png"])
        .set_file_name(default_name)
        .save_file()
}

/// Show the native save dialog for the bulk archive.
pub fn pick_zip_save_path(start_dir: Option<&Path>, default_name: &str) -> Option<PathBuf> {
    dialog(start_dir)
        .add_filter("ZIP archive", &["zip"])
        .set_file_name(default_name)
        .save_file()
}

/// Show the native folder picker for loose PNG export.
pub fn pick_export_folder(start_dir: Option<&Path>) -> Option<PathBuf> {
    dialog(start_dir).pick_folder()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::tga::TgaEncoder;
    use image::{ImageEncoder, Rgba};

    fn sample() -> RgbaImage {
        RgbaImage::from_fn(7, 5, |x, y| Rgba([x as u8 * 30, y as u8 * 40, 99, 200]))
    }

    #[test]
    fn png_bytes_are_sniffed_regardless_of_name() {
        let png = crate::ops::export::encode_png(&sample()).unwrap();
        let img = decode_bytes(&png, "pasted").unwrap();
        assert_eq!(img.pixels, sample());
        assert_eq!(img.name, "pasted");
        assert_eq!((img.width(), img.height()), (7, 5));
    }

    #[test]
    fn tga_goes_through_the_dedicated_decoder() {
        let mut tga = Vec::new();
        TgaEncoder::new(&mut tga)
            .write_image(sample().as_raw(), 7, 5, image::ColorType::Rgba8)
            .unwrap();
        let img = decode_bytes(&tga, "Sheet.TGA").unwrap();
        assert_eq!(img.pixels, sample());
    }

    #[test]
    fn malformed_tga_is_a_decode_error() {
        let err = decode_bytes(&[1, 2, 3], "broken.tga").unwrap_err();
        assert!(matches!(err, SlicerError::Decode(_)), "{err}");
    }

    #[test]
    fn corrupt_image_is_a_decode_error() {
        let mut png = crate::ops::export::encode_png(&sample()).unwrap();
        png.truncate(40);
        assert!(matches!(decode_bytes(&png, "a.png"), Err(SlicerError::Decode(_))));
        assert!(matches!(decode_bytes(b"garbage", "b.jpg"), Err(SlicerError::Decode(_))));
    }

    #[test]
    fn non_image_is_rejected() {
        let err = decode_bytes(b"just some notes", "notes.txt").unwrap_err();
        assert!(matches!(err, SlicerError::UnsupportedInput(ref n) if n == "notes.txt"));
    }

    #[test]
    fn missing_path_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.png");
        assert!(matches!(decode_path(&path), Err(SlicerError::NotFound(p)) if p == path));

        let real = dir.path().join("real.png");
        std::fs::write(&real, crate::ops::export::encode_png(&sample()).unwrap()).unwrap();
        assert_eq!(decode_path(&real).unwrap().name, "real.png");
    }

    #[test]
    fn extension_check() {
        assert!(is_image_name("a.PNG"));
        assert!(is_image_name("dir/b.tga"));
        assert!(!is_image_name("c.txt"));
        assert!(!is_image_name("noext"));
    }
}
