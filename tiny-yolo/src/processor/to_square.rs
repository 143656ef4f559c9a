use super::{transform_labels, Processor};
use crate::common::*;

/// Pad the short side of an image so that it becomes square.
///
/// The padding is split evenly with the extra pixel at the bottom or right,
/// and boxes are shifted by the leading padding.
#[derive(Debug, Clone)]
pub struct ToSquare {
    fill_value: f64,
}

impl ToSquare {
    pub fn new(fill_value: f64) -> Result<Self> {
        ensure!(
            fill_value.is_finite(),
            "fill_value must be finite, but get {}",
            fill_value
        );
        Ok(Self { fill_value })
    }
}

impl Processor for ToSquare {
    fn forward(
        &self,
        image: Tensor,
        labels: Option<Vec<PixelLabel>>,
        _rng: &mut StdRng,
    ) -> Result<(Tensor, Option<Vec<PixelLabel>>)> {
        let (_channels, height, width) = image.size3()?;
        let SquarePadding {
            top,
            bottom,
            left,
            right,
        } = HW::try_from_hw([height, width])?.square_padding();

        let image = image.f_pad2d_constant(top, bottom, left, right, self.fill_value)?;
        let transform = Transform::translation(top as f64, left as f64);

        Ok((image, transform_labels(labels, &transform)))
    }
}
