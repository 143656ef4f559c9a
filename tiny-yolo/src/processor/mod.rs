//! Data preprocessing building blocks.
//!
//! Every processor consumes an image and its optional labels and returns the
//! transformed pair. Labels are pixel-space boxes and follow the geometry of
//! the image.

pub mod color_jitter;
pub mod compose;
pub mod random_flip;
pub mod resize;
pub mod to_float;
pub mod to_square;

pub use color_jitter::*;
pub use compose::*;
pub use random_flip::*;
pub use resize::*;
pub use to_float::*;
pub use to_square::*;

use crate::common::*;

/// An image and label transformation step.
pub trait Processor
where
    Self: Debug + Send,
{
    /// Transform a `[channels, height, width]` image and its labels.
    fn forward(
        &self,
        image: Tensor,
        labels: Option<Vec<PixelLabel>>,
        rng: &mut StdRng,
    ) -> Result<(Tensor, Option<Vec<PixelLabel>>)>;
}

fn transform_labels(
    labels: Option<Vec<PixelLabel>>,
    transform: &Transform<f64>,
) -> Option<Vec<PixelLabel>> {
    labels.map(|labels| labels.iter().map(|label| transform * label).collect())
}
