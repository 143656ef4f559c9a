use super::Sample;
use crate::common::*;

/// Stacked samples.
#[derive(Debug, TensorLike)]
pub struct Batch {
    /// `[batch, channels, height, width]`
    pub images: Tensor,
    /// `[batch, max_num_boxes, 5 + num_classes]`
    pub labels: Tensor,
    /// `[batch]` valid label counts in `Int64`.
    pub num_boxes: Tensor,
}

impl Batch {
    pub fn collate(samples: Vec<Sample>) -> Result<Self> {
        ensure!(!samples.is_empty(), "cannot collate an empty list of samples");

        let (images, labels, num_boxes) = samples
            .into_iter()
            .map(|sample| {
                let Sample {
                    image,
                    labels,
                    num_boxes,
                } = sample;
                (image, labels, num_boxes)
            })
            .unzip_n_vec();

        let images = Tensor::f_stack(&images, 0).context("images have different shapes")?;
        let labels = Tensor::f_stack(&labels, 0).context("labels have different shapes")?;
        let num_boxes = Tensor::of_slice(&num_boxes).to_device(images.device());

        Ok(Self {
            images,
            labels,
            num_boxes,
        })
    }

    pub fn batch_size(&self) -> i64 {
        self.images.size()[0]
    }
}
