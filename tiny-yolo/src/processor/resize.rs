use super::{transform_labels, Processor};
use crate::common::*;

/// Stretch an image to a square size and scale boxes accordingly.
#[derive(Debug, Clone)]
pub struct Resize {
    size: i64,
}

impl Resize {
    pub fn new(size: usize) -> Result<Self> {
        ensure!(size > 0, "resize target must be positive");
        Ok(Self { size: size as i64 })
    }
}

impl Processor for Resize {
    fn forward(
        &self,
        image: Tensor,
        labels: Option<Vec<PixelLabel>>,
        _rng: &mut StdRng,
    ) -> Result<(Tensor, Option<Vec<PixelLabel>>)> {
        let (_channels, height, width) = image.size3()?;
        ensure!(
            height > 0 && width > 0,
            "cannot resize an empty {}x{} image",
            height,
            width
        );

        let transform = Transform::from_sizes_exact(
            &HW::try_from_hw([height as f64, width as f64])?,
            &HW::try_from_hw([self.size as f64, self.size as f64])?,
        );
        let image = image.resize2d_exact(self.size, self.size)?;
        Ok((image, transform_labels(labels, &transform)))
    }
}
