//! Terminal UI module using ratatui.
//!
//! - `render`: page rendering and overlays
//! - `input`: keyboard event handling
//! - `styles`: color scheme and text styling

pub mod input;
pub mod render;
pub mod styles;
