use super::{
    ColorJitterInit, Processor, RandomHorizontalFlip, RandomVerticalFlip, Resize, ToFloat,
    ToSquare,
};
use crate::{common::*, config::PreprocessorConfig};

/// Run processors in order, feeding each output into the next.
#[derive(Debug, Default)]
pub struct Compose {
    processors: Vec<Box<dyn Processor>>,
}

impl Compose {
    pub fn new(processors: Vec<Box<dyn Processor>>) -> Self {
        Self { processors }
    }

    pub fn push<P>(&mut self, processor: P)
    where
        P: 'static + Processor,
    {
        self.processors.push(Box::new(processor));
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

impl Processor for Compose {
    fn forward(
        &self,
        image: Tensor,
        labels: Option<Vec<PixelLabel>>,
        rng: &mut StdRng,
    ) -> Result<(Tensor, Option<Vec<PixelLabel>>)> {
        self.processors
            .iter()
            .try_fold((image, labels), |(image, labels), processor| {
                processor.forward(image, labels, rng)
            })
    }
}

/// The augmenting pipeline: to float, color jitter, square padding, resize
/// and random flips.
pub fn prepare_for_training(image_size: usize, config: &PreprocessorConfig) -> Result<Compose> {
    config.validate()?;
    let PreprocessorConfig {
        fill_value,
        hue_shift,
        saturation_shift,
        value_shift,
        contrast_shift,
        horizontal_flip_prob,
        vertical_flip_prob,
    } = *config;

    let mut pipeline = Compose::default();
    pipeline.push(ToFloat);
    pipeline.push(
        ColorJitterInit {
            hue_shift,
            saturation_shift,
            value_shift,
            contrast_shift,
        }
        .build()?,
    );
    pipeline.push(ToSquare::new(fill_value.raw())?);
    pipeline.push(Resize::new(image_size)?);
    pipeline.push(RandomHorizontalFlip::new(horizontal_flip_prob.raw())?);
    pipeline.push(RandomVerticalFlip::new(vertical_flip_prob.raw())?);
    Ok(pipeline)
}

/// The deterministic pipeline: to float, square padding and resize.
pub fn prepare_for_inference(image_size: usize, fill_value: f64) -> Result<Compose> {
    let mut pipeline = Compose::default();
    pipeline.push(ToFloat);
    pipeline.push(ToSquare::new(fill_value)?);
    pipeline.push(Resize::new(image_size)?);
    Ok(pipeline)
}
