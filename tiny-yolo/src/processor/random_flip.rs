use super::{transform_labels, Processor};
use crate::common::*;

fn check_prob(prob: f64) -> Result<f64> {
    ensure!(
        (0.0..=1.0).contains(&prob),
        "flip probability must be in range [0, 1], but get {}",
        prob
    );
    Ok(prob)
}

/// Mirror the image and boxes left to right with a probability.
#[derive(Debug, Clone)]
pub struct RandomHorizontalFlip {
    prob: f64,
}

impl RandomHorizontalFlip {
    pub fn new(prob: f64) -> Result<Self> {
        Ok(Self {
            prob: check_prob(prob)?,
        })
    }
}

impl Processor for RandomHorizontalFlip {
    fn forward(
        &self,
        image: Tensor,
        labels: Option<Vec<PixelLabel>>,
        rng: &mut StdRng,
    ) -> Result<(Tensor, Option<Vec<PixelLabel>>)> {
        let (_channels, _height, width) = image.size3()?;
        if !rng.gen_bool(self.prob) {
            return Ok((image, labels));
        }

        let image = tch::no_grad(|| image.flip(&[2]));
        let transform = Transform::horizontal_flip(width as f64);
        Ok((image, transform_labels(labels, &transform)))
    }
}

/// Mirror the image and boxes top to bottom with a probability.
#[derive(Debug, Clone)]
pub struct RandomVerticalFlip {
    prob: f64,
}

impl RandomVerticalFlip {
    pub fn new(prob: f64) -> Result<Self> {
        Ok(Self {
            prob: check_prob(prob)?,
        })
    }
}

impl Processor for RandomVerticalFlip {
    fn forward(
        &self,
        image: Tensor,
        labels: Option<Vec<PixelLabel>>,
        rng: &mut StdRng,
    ) -> Result<(Tensor, Option<Vec<PixelLabel>>)> {
        let (_channels, height, _width) = image.size3()?;
        if !rng.gen_bool(self.prob) {
            return Ok((image, labels));
        }

        let image = tch::no_grad(|| image.flip(&[1]));
        let transform = Transform::vertical_flip(height as f64);
        Ok((image, transform_labels(labels, &transform)))
    }
}
