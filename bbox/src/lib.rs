//! Safe bounding box types and functions.
//!
//! Boxes are stored y-first (`t, l, b, r` and `cy, cx, h, w`). The `xyxy`
//! accessors and constructors exist for interop with x-first label tensors.

mod common;

pub use transform::*;
mod transform;

pub use rect::*;
pub mod rect;

pub use tlbr::*;
pub mod tlbr;

pub use hw::*;
pub mod hw;

pub mod prelude {
    pub use crate::rect::{Rect, RectFloat, RectNum};
}
