// ============================================================================
// OPS — pixel pipeline and the services around it
// ============================================================================
//
//   compositor.rs — per-cell erase margins and background chroma-key
//   export.rs     — cell extraction, PNG encoding, ZIP packaging
//   clipboard.rs  — system clipboard image copy / paste
// ============================================================================

pub mod clipboard;
pub mod compositor;
pub mod export;
