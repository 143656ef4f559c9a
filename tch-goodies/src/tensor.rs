use crate::common::*;

pub trait TensorExt {
    fn is_empty(&self) -> bool;

    /// Resize a `[channels, height, width]` or `[batch, channels, height, width]`
    /// image without keeping the aspect ratio.
    fn resize2d_exact(&self, new_height: i64, new_width: i64) -> Result<Tensor>;

    /// Pad a `[channels, height, width]` image with a constant value.
    fn f_pad2d_constant(
        &self,
        top: i64,
        bottom: i64,
        left: i64,
        right: i64,
        value: f64,
    ) -> Result<Tensor>;

    fn f_rgb_to_hsv(&self) -> Result<Tensor>;

    fn rgb_to_hsv(&self) -> Tensor {
        self.f_rgb_to_hsv().unwrap()
    }

    fn f_hsv_to_rgb(&self) -> Result<Tensor>;

    fn hsv_to_rgb(&self) -> Tensor {
        self.f_hsv_to_rgb().unwrap()
    }
}

impl TensorExt for Tensor {
    fn is_empty(&self) -> bool {
        self.numel() == 0
    }

    fn resize2d_exact(&self, new_height: i64, new_width: i64) -> Result<Tensor> {
        ensure!(
            new_height > 0 && new_width > 0,
            "resize target must be positive, but get {}x{}",
            new_height,
            new_width
        );
        let kind = self.kind();
        ensure!(
            matches!(kind, Kind::Uint8 | Kind::Float | Kind::Double),
            "unsupported data kind {:?}",
            kind
        );

        tch::no_grad(|| -> Result<_> {
            let batched = match self.dim() {
                3 => self.unsqueeze(0),
                4 => self.shallow_clone(),
                dim => bail!("invalid shape: expect three or four dimensions, but get {}", dim),
            };
            let input = match kind {
                Kind::Uint8 => batched.to_kind(Kind::Float),
                _ => batched,
            };

            let resized = input.f_upsample_bilinear2d(
                &[new_height, new_width],
                false,
                None::<f64>,
                None::<f64>,
            )?;
            let resized = match kind {
                Kind::Uint8 => resized.round().clamp(0.0, 255.0).to_kind(Kind::Uint8),
                _ => resized,
            };

            Ok(if self.dim() == 3 {
                resized.squeeze_dim(0)
            } else {
                resized
            })
        })
    }

    fn f_pad2d_constant(
        &self,
        top: i64,
        bottom: i64,
        left: i64,
        right: i64,
        value: f64,
    ) -> Result<Tensor> {
        ensure!(
            top >= 0 && bottom >= 0 && left >= 0 && right >= 0,
            "padding sizes must be non-negative"
        );
        let (channels, height, width) = self.size3()?;

        tch::no_grad(|| -> Result<_> {
            let outer = Tensor::full(
                &[channels, top + height + bottom, left + width + right],
                value,
                (self.kind(), self.device()),
            );
            outer
                .narrow(1, top, height)
                .narrow(2, left, width)
                .copy_(self);
            Ok(outer)
        })
    }

    fn f_rgb_to_hsv(&self) -> Result<Tensor> {
        let eps = 1e-4;
        let rgb = self;
        let (channels, _height, _width) = rgb.size3()?;
        ensure!(
            channels == 3,
            "channel size must be 3, but get {}",
            channels
        );

        let red = rgb.select(0, 0);
        let green = rgb.select(0, 1);
        let blue = rgb.select(0, 2);

        let (max, argmax) = rgb.max_dim(0, false);
        let (min, _argmin) = rgb.min_dim(0, false);
        let diff = &max - &min;
        let safe_diff = diff.clamp_min(eps);

        let value = max;
        let saturation =
            (&diff / value.clamp_min(eps)).where_self(&value.gt(eps), &value.zeros_like());

        let case1 = value.zeros_like();
        let case2 = (&green - &blue) / &safe_diff;
        let case3 = (&blue - &red) / &safe_diff + 2.0;
        let case4 = (&red - &green) / &safe_diff + 4.0;

        let hue = {
            let hue = case1.where_self(
                &diff.le(eps),
                &case2.where_self(&argmax.eq(0), &case3.where_self(&argmax.eq(1), &case4)),
            );
            let hue = hue.where_self(&hue.ge(0.0), &(&hue + 6.0));
            hue / 6.0
        };

        let hsv = Tensor::stack(&[hue, saturation, value], 0);

        debug_assert!(
            !bool::from(hsv.isnan().any()),
            "NaN detected in RGB to HSV conversion"
        );

        Ok(hsv)
    }

    fn f_hsv_to_rgb(&self) -> Result<Tensor> {
        let hsv = self;
        let (channels, _height, _width) = hsv.size3()?;
        ensure!(
            channels == 3,
            "channel size must be 3, but get {}",
            channels
        );

        let hue = hsv.select(0, 0);
        let saturation = hsv.select(0, 1);
        let value = hsv.select(0, 2);

        // f(n) = v - v * s * clamp(min(k, 4 - k), 0, 1), k = (n + 6h) mod 6
        let func = |n: f64| {
            let k = (&hue * 6.0 + n).fmod(6.0);
            let ramp = k.minimum(&(-&k + 4.0)).clamp(0.0, 1.0);
            &value - &value * &saturation * ramp
        };

        let red = func(5.0);
        let green = func(3.0);
        let blue = func(1.0);
        let rgb = Tensor::stack(&[red, green, blue], 0);

        Ok(rgb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn hsv_round_trip() {
        let rgb = Tensor::of_slice(&[
            1.0f32, 0.2, 0.0, 0.5, // red
            0.0, 0.8, 0.3, 0.5, // green
            0.0, 0.1, 0.9, 0.5, // blue
        ])
        .view([3, 2, 2]);
        let restored = rgb.rgb_to_hsv().hsv_to_rgb();
        let diff = (&restored - &rgb).abs().max().double_value(&[]);
        assert_abs_diff_eq!(diff, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn pure_red_has_zero_hue() {
        let rgb = Tensor::of_slice(&[1.0f32, 0.0, 0.0]).view([3, 1, 1]);
        let hsv = rgb.rgb_to_hsv();
        assert_abs_diff_eq!(hsv.double_value(&[0, 0, 0]), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(hsv.double_value(&[1, 0, 0]), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(hsv.double_value(&[2, 0, 0]), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn resize_keeps_kind_and_layout() {
        let image = Tensor::full(&[3, 6, 8], 100i64, (Kind::Uint8, Device::Cpu));
        let resized = image.resize2d_exact(3, 5).unwrap();
        assert_eq!(resized.size(), [3, 3, 5]);
        assert_eq!(resized.kind(), Kind::Uint8);
        assert!(bool::from(resized.eq(100i64).all()));

        let batch = Tensor::rand(&[2, 3, 4, 4], (Kind::Float, Device::Cpu));
        let resized = batch.resize2d_exact(8, 2).unwrap();
        assert_eq!(resized.size(), [2, 3, 8, 2]);
        assert!(resized.min().double_value(&[]) >= 0.0);
        assert!(resized.max().double_value(&[]) <= 1.0);

        assert!(image.resize2d_exact(0, 5).is_err());
        assert!(Tensor::zeros(&[4, 4], (Kind::Float, Device::Cpu))
            .resize2d_exact(2, 2)
            .is_err());
    }

    #[test]
    fn pad_places_image_at_offset() {
        let image = Tensor::ones(&[3, 2, 4], (Kind::Float, Device::Cpu));
        let padded = image.f_pad2d_constant(1, 1, 0, 0, 0.5).unwrap();
        assert_eq!(padded.size(), [3, 4, 4]);
        assert_abs_diff_eq!(padded.double_value(&[0, 0, 0]), 0.5);
        assert_abs_diff_eq!(padded.double_value(&[0, 1, 0]), 1.0);
        assert_abs_diff_eq!(padded.double_value(&[2, 3, 3]), 0.5);
    }
}
