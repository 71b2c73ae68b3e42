//! Pixel-accurate bitmap editing core for small logos: an RGBA pixel buffer,
//! integer rasterizers, flood fill, pointer-driven tools and bounded undo.

#[macro_use]
pub mod logger;

pub mod canvas;
pub mod cli;
pub mod components;
pub mod io;
pub mod ops;
pub mod project;
pub mod settings;

pub use canvas::{BufferSurface, Color, PixelBuffer, Point, Rect, Surface, WriteMode};
pub use components::history::{HistoryStack, UndoHistory};
pub use components::tools::{Tool, ToolKind, ToolOptions, ToolResult, tool_for_index};
pub use project::Project;
