//! User interface rendering.
//!
//! - **renderer**: console viewer for the pixel surface, plus a text dump
//!   that recovers the characters on screen

pub mod renderer;

pub use renderer::{DebugRenderer, Renderer};
