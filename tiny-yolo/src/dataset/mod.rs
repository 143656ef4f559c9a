//! Conversion from annotated images to padded training tensors.

mod annotation;
mod batch;
mod category;
mod sample;

pub use annotation::*;
pub use batch::*;
pub use category::*;
pub use sample::*;
