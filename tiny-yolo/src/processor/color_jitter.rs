//! The random color distortion algorithm.

use super::Processor;
use crate::common::*;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ColorJitterInit {
    pub hue_shift: Option<R64>,
    pub saturation_shift: Option<R64>,
    pub value_shift: Option<R64>,
    pub contrast_shift: Option<R64>,
}

impl ColorJitterInit {
    pub fn build(self) -> Result<ColorJitter> {
        let Self {
            hue_shift,
            saturation_shift,
            value_shift,
            contrast_shift,
        } = self;

        let check = |name: &str, shift: Option<R64>, max: f64| {
            shift
                .map(|shift| {
                    ensure!(
                        shift >= 0.0 && shift <= max,
                        "{} must be in range [0, {}], but get {}",
                        name,
                        max,
                        shift
                    );
                    Ok(shift.raw())
                })
                .transpose()
        };

        Ok(ColorJitter {
            max_hue_shift: check("hue_shift", hue_shift, 0.5)?,
            max_saturation_shift: check("saturation_shift", saturation_shift, 1.0)?,
            max_value_shift: check("value_shift", value_shift, 1.0)?,
            max_contrast_shift: check("contrast_shift", contrast_shift, 1.0)?,
        })
    }
}

/// Shift hue, saturation and value by random amounts, then scale the contrast
/// around the mean gray level. Boxes are untouched.
#[derive(Debug, Clone)]
pub struct ColorJitter {
    max_hue_shift: Option<f64>,
    max_saturation_shift: Option<f64>,
    max_value_shift: Option<f64>,
    max_contrast_shift: Option<f64>,
}

impl Processor for ColorJitter {
    fn forward(
        &self,
        rgb: Tensor,
        labels: Option<Vec<PixelLabel>>,
        rng: &mut StdRng,
    ) -> Result<(Tensor, Option<Vec<PixelLabel>>)> {
        ensure!(
            rgb.kind() == Kind::Float,
            "color jitter expects a float image, but get {:?}",
            rgb.kind()
        );

        let new_rgb = tch::no_grad(|| -> Result<_> {
            let hsv = rgb.f_rgb_to_hsv()?;
            let mut hue = hsv.select(0, 0);
            let mut saturation = hsv.select(0, 1);
            let mut value = hsv.select(0, 2);

            if let Some(max_shift) = self.max_hue_shift {
                let shift = rng.gen_range((-max_shift)..=max_shift);
                hue = (hue + shift + 1.0).fmod(1.0);
            }

            if let Some(max_shift) = self.max_saturation_shift {
                let shift = rng.gen_range((-max_shift)..=max_shift);
                saturation = (saturation + shift).clamp(0.0, 1.0);
            }

            if let Some(max_shift) = self.max_value_shift {
                let shift = rng.gen_range((-max_shift)..=max_shift);
                value = (value + shift).clamp(0.0, 1.0);
            }

            let rgb = Tensor::stack(&[hue, saturation, value], 0).f_hsv_to_rgb()?;

            let rgb = match self.max_contrast_shift {
                Some(max_shift) => {
                    let factor = 1.0 + rng.gen_range((-max_shift)..=max_shift);
                    let mean = gray_mean(&rgb);
                    ((rgb - mean) * factor + mean).clamp(0.0, 1.0)
                }
                None => rgb,
            };
            Ok(rgb)
        })?;

        Ok((new_rgb, labels))
    }
}

/// The mean ITU-R 601 luma of a `[3, h, w]` image.
fn gray_mean(rgb: &Tensor) -> f64 {
    let weights = Tensor::of_slice(&[0.299f32, 0.587, 0.114])
        .to_device(rgb.device())
        .to_kind(rgb.kind())
        .view([3, 1, 1]);
    // the luma weights sum to 1, so the channel axis contributes a factor of 3
    (rgb * weights).mean(Kind::Double).double_value(&[]) * 3.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn no_shift_keeps_colors() {
        let mut rng = StdRng::seed_from_u64(7);
        let image = Tensor::rand(&[3, 5, 5], (Kind::Float, Device::Cpu));
        let jitter = ColorJitterInit::default().build().unwrap();
        let (output, _) = jitter.forward(image.shallow_clone(), None, &mut rng).unwrap();
        let diff = (&output - &image).abs().max().double_value(&[]);
        assert_abs_diff_eq!(diff, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn shifted_colors_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let image = Tensor::rand(&[3, 8, 8], (Kind::Float, Device::Cpu));
        let jitter = ColorJitterInit {
            hue_shift: Some(r64(0.5)),
            saturation_shift: Some(r64(0.5)),
            value_shift: Some(r64(0.5)),
            contrast_shift: Some(r64(0.5)),
        }
        .build()
        .unwrap();
        let (output, _) = jitter.forward(image, None, &mut rng).unwrap();
        assert_eq!(output.size(), [3, 8, 8]);
        assert!(output.min().double_value(&[]) >= -1e-6);
        assert!(output.max().double_value(&[]) <= 1.0 + 1e-6);
    }

    #[test]
    fn contrast_scales_around_gray_mean() {
        let mut rng = StdRng::seed_from_u64(11);
        let image = Tensor::rand(&[3, 6, 6], (Kind::Float, Device::Cpu)) * 0.5 + 0.25;
        let jitter = ColorJitterInit {
            contrast_shift: Some(r64(0.5)),
            ..Default::default()
        }
        .build()
        .unwrap();

        // the same draw the processor makes
        let factor = 1.0 + StdRng::seed_from_u64(11).gen_range(-0.5..=0.5);
        let mean = gray_mean(&image);
        let (output, _) = jitter.forward(image.shallow_clone(), None, &mut rng).unwrap();

        // values stay inside [0, 1] for factors up to 1.5, so nothing clamps
        let expect = (&image - mean) * factor + mean;
        let diff = (&output - &expect).abs().max().double_value(&[]);
        assert_abs_diff_eq!(diff, 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(gray_mean(&output), mean, epsilon = 1e-4);
    }

    #[test]
    fn oversized_contrast_shift_is_rejected() {
        let init = ColorJitterInit {
            contrast_shift: Some(r64(1.5)),
            ..Default::default()
        };
        assert!(init.build().is_err());
    }

    #[test]
    fn oversized_hue_shift_is_rejected() {
        let init = ColorJitterInit {
            hue_shift: Some(r64(0.7)),
            ..Default::default()
        };
        assert!(init.build().is_err());
    }
}
