//! SpriteSlicer: cut sprite sheets into per-cell PNGs.
//!
//! The core (`grid`, `ops::compositor`, `ops::export`, `view`, `session`) is
//! plain data and pure functions; `app`, `canvas` and `components` are the
//! egui shell around it and `cli` the headless front end.  `extract` backs
//! the separate `inline-extract` tool.

pub mod app;
pub mod canvas;
pub mod cli;
pub mod components;
pub mod debounce;
pub mod error;
pub mod extract;
pub mod grid;
pub mod io;
pub mod logger;
pub mod ops;
pub mod session;
pub mod settings;
pub mod view;

pub use error::{Result, SlicerError};
