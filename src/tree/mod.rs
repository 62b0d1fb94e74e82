// src/tree/mod.rs
pub mod bounds;
pub mod node;

pub use bounds::{parse_rect, Point, Rect, ScreenSize};
pub use node::UiNode;
