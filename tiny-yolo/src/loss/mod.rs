//! Loss function building blocks.

mod bce_with_logit_loss;
mod grid_layout;
mod loss;
mod noobj_mask;
mod target;

pub use bce_with_logit_loss::*;
pub use grid_layout::*;
pub use loss::*;
pub use noobj_mask::*;
pub use target::*;
