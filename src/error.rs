use std::path::PathBuf;

/// Every failure the slicer can surface.  The GUI turns these into transient
/// notices; the CLIs print them on stderr.  None of them leave the session in
/// a partially-updated state.
#[derive(Debug, thiserror::Error)]
pub enum SlicerError {
    /// A file that is not an image (by extension and by content) was offered.
    #[error("unsupported input: {0}")]
    UnsupportedInput(String),

    /// The bytes looked like an image but could not be decoded.
    #[error("could not decode image: {0}")]
    Decode(String),

    /// The system clipboard refused the operation or has no image support.
    #[error("clipboard unavailable: {0}")]
    Clipboard(String),

    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("no image loaded")]
    NoImage,

    #[error("cell ({row}, {col}) is outside the {rows}x{cols} grid")]
    CellOutOfRange {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("invalid color '{0}', expected #RRGGBB")]
    InvalidColor(String),

    #[error("PNG encode failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SlicerError>;
