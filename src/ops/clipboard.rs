// ============================================================================
// SYSTEM CLIPBOARD — copy slices out, paste sprite sheets in (via arboard)
// ============================================================================

use std::borrow::Cow;

use image::RgbaImage;

use crate::error::{Result, SlicerError};

/// Write an RGBA image to the system clipboard.
///
/// Fails when the platform has no clipboard, denies access, or cannot hold
/// image data; the caller reports it and carries on.
pub fn copy_image(img: &RgbaImage) -> Result<()> {
    let mut clip = arboard::Clipboard::new().map_err(|e| SlicerError::Clipboard(e.to_string()))?;
    // arboard wants ImageData { width, height, bytes: Cow<[u8]> } in RGBA order.
    let data = arboard::ImageData {
        width: img.width() as usize,
        height: img.height() as usize,
        bytes: Cow::Borrowed(img.as_raw()),
    };
    clip.set_image(data)
        .map_err(|e| SlicerError::Clipboard(e.to_string()))
}

/// Try to read an image from the system clipboard.  Returns `None` if
/// nothing usable is there.
///
/// Handles two cases:
///   1. Raw image data (a screenshot, or copied out of another editor).
///   2. Text that happens to be a path to an image file.
pub fn read_image() -> Option<RgbaImage> {
    let mut clip = arboard::Clipboard::new().ok()?;

    if let Ok(img_data) = clip.get_image()
        && let Some(img) = RgbaImage::from_raw(
            img_data.width as u32,
            img_data.height as u32,
            img_data.bytes.into_owned(),
        )
    {
        return Some(img);
    }

    let text = clip.get_text().ok()?;
    let trimmed = text.trim();
    let path = std::path::Path::new(trimmed);
    if path.is_file() && crate::io::is_image_name(trimmed) {
        return crate::io::decode_path(path).ok().map(|src| src.pixels);
    }
    None
}
