//! Tensor helpers shared by the detector crates.

mod common;
pub mod iou;
pub mod tensor;
pub mod utils;

pub use iou::*;
pub use tensor::*;
pub use utils::*;
