use super::{Annotation, CategoryMap};
use crate::{common::*, processor::Processor};
use label::Label;

/// One preprocessed image with its padded label tensor.
#[derive(Debug)]
pub struct Sample {
    /// `[channels, image_size, image_size]` float image.
    pub image: Tensor,
    /// `[max_num_boxes, 5 + num_classes]` rows of `[x1, y1, x2, y2, 1, one-hot..]`, zero padded.
    pub labels: Tensor,
    /// The number of real rows in `labels`.
    pub num_boxes: i64,
}

pub struct SampleBuilderInit<P>
where
    P: Processor,
{
    pub max_num_boxes: usize,
    pub category_map: CategoryMap,
    pub pipeline: P,
}

impl<P> SampleBuilderInit<P>
where
    P: Processor,
{
    pub fn build(self) -> Result<SampleBuilder<P>> {
        let Self {
            max_num_boxes,
            category_map,
            pipeline,
        } = self;
        ensure!(max_num_boxes > 0, "max_num_boxes must be positive");
        ensure!(
            category_map.num_classes() > 0,
            "the category map has no classes"
        );

        Ok(SampleBuilder {
            max_num_boxes,
            num_classes: category_map.num_classes(),
            category_map,
            pipeline,
        })
    }
}

/// Turns decoded images and their annotations into training samples.
#[derive(Debug)]
pub struct SampleBuilder<P>
where
    P: Processor,
{
    max_num_boxes: usize,
    num_classes: usize,
    category_map: CategoryMap,
    pipeline: P,
}

impl<P> SampleBuilder<P>
where
    P: Processor,
{
    pub fn category_map(&self) -> &CategoryMap {
        &self.category_map
    }

    pub fn num_entries(&self) -> usize {
        PixelLabel::row_len(self.num_classes)
    }

    /// Build a sample from a `[channels, height, width]` image.
    ///
    /// Annotations of untrained categories are dropped. Boxes beyond
    /// `max_num_boxes` are dropped with a warning.
    pub fn build(
        &self,
        image: Tensor,
        annotations: &[Annotation],
        rng: &mut StdRng,
    ) -> Result<Sample> {
        let labels: Vec<PixelLabel> = annotations
            .iter()
            .filter_map(|annotation| {
                let class = self
                    .category_map
                    .class_of_category_id(annotation.category_id)?;
                let rect = match annotation.rect() {
                    Some(rect) => rect,
                    None => {
                        warn!("ignore malformed box {:?}", annotation.bbox);
                        return None;
                    }
                };
                if rect.area() <= 0.0 {
                    warn!("zero-area box {:?} found", annotation.bbox);
                }
                Some(Label { rect, class })
            })
            .collect();

        let labels = (!labels.is_empty()).then(|| labels);
        let (image, labels) = self.pipeline.forward(image, labels, rng)?;
        let mut labels = labels.unwrap_or_default();

        if labels.len() > self.max_num_boxes {
            warn!(
                "{} boxes exceed the capacity of {}, the rest are dropped",
                labels.len(),
                self.max_num_boxes
            );
            labels.truncate(self.max_num_boxes);
        }

        let num_entries = self.num_entries();
        let mut values = vec![0f32; self.max_num_boxes * num_entries];
        values
            .chunks_mut(num_entries)
            .zip(&labels)
            .try_for_each(|(row, label)| {
                label
                    .write_row(row, self.num_classes)
                    .ok_or_else(|| format_err!("unable to encode label {:?}", label))
            })?;
        let label_tensor = Tensor::of_slice(&values)
            .view([self.max_num_boxes as i64, num_entries as i64])
            .to_device(image.device());

        Ok(Sample {
            image,
            labels: label_tensor,
            num_boxes: labels.len() as i64,
        })
    }
}
