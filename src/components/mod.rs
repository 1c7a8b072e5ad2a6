// ============================================================================
// UI COMPONENTS — panels and windows around the sheet view
// ============================================================================
//
//   controls.rs — side panel: grid size, margins, background key, export
//   preview.rs  — floating single-cell preview with its own pan/zoom
//   notices.rs  — transient status messages
// ============================================================================

pub mod controls;
pub mod notices;
pub mod preview;

pub use controls::{ControlAction, ControlsPanel};
pub use notices::Notices;
pub use preview::{CellPreview, PreviewAction};
