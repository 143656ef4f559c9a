use super::Processor;
use crate::common::*;

/// Convert `Uint8` images to `Float` in range [0, 1]. Float images pass through.
#[derive(Debug, Clone, Default)]
pub struct ToFloat;

impl Processor for ToFloat {
    fn forward(
        &self,
        image: Tensor,
        labels: Option<Vec<PixelLabel>>,
        _rng: &mut StdRng,
    ) -> Result<(Tensor, Option<Vec<PixelLabel>>)> {
        let image = match image.kind() {
            Kind::Uint8 => tch::no_grad(|| image.to_kind(Kind::Float) / 255.0),
            Kind::Float => image,
            kind => bail!("unsupported image kind {:?}", kind),
        };
        Ok((image, labels))
    }
}
