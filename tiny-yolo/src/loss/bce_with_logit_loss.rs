use crate::common::*;

#[derive(Debug)]
pub struct BceWithLogitsLossInit {
    pub reduction: Reduction,
}

impl BceWithLogitsLossInit {
    pub fn build(self) -> BceWithLogitsLoss {
        let Self { reduction } = self;
        BceWithLogitsLoss { reduction }
    }
}

#[derive(Debug)]
pub struct BceWithLogitsLoss {
    reduction: Reduction,
}

impl BceWithLogitsLoss {
    pub fn f_forward(&self, input: &Tensor, target: &Tensor) -> Result<Tensor> {
        ensure!(
            input.size() == target.size(),
            "input and target tensors must have equal shape, but get {:?} and {:?}",
            input.size(),
            target.size()
        );
        debug_assert!(
            bool::from(target.ge(0.0).logical_and(&target.le(1.0)).all()),
            "target values must be in range of [0.0, 1.0]"
        );

        Ok(input.binary_cross_entropy_with_logits::<&Tensor>(
            target,
            None,
            None,
            self.reduction,
        ))
    }

    pub fn forward(&self, input: &Tensor, target: &Tensor) -> Tensor {
        self.f_forward(input, target).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sum_loss() -> BceWithLogitsLoss {
        BceWithLogitsLossInit {
            reduction: Reduction::Sum,
        }
        .build()
    }

    #[test]
    fn zero_logit_costs_ln_two() {
        let loss = sum_loss();
        let input = Tensor::zeros(&[3, 1], (Kind::Float, Device::Cpu));
        let target = Tensor::ones(&[3, 1], (Kind::Float, Device::Cpu));
        let value = loss.forward(&input, &target).double_value(&[]);
        assert_abs_diff_eq!(value, 3.0 * 2f64.ln(), epsilon = 1e-5);
    }

    #[test]
    fn confident_logits_are_cheap_only_when_right() {
        let loss = sum_loss();
        let input = Tensor::of_slice(&[20.0f32, -20.0]).view([1, 2]);
        let right = Tensor::of_slice(&[1.0f32, 0.0]).view([1, 2]);
        let wrong = Tensor::of_slice(&[0.0f32, 1.0]).view([1, 2]);
        assert!(loss.forward(&input, &right).double_value(&[]) < 1e-6);
        assert_abs_diff_eq!(
            loss.forward(&input, &wrong).double_value(&[]),
            40.0,
            epsilon = 1e-4
        );
    }

    #[test]
    fn empty_input_sums_to_zero() {
        let loss = sum_loss();
        let input = Tensor::zeros(&[0, 4], (Kind::Float, Device::Cpu));
        let value = loss.forward(&input, &input.zeros_like()).double_value(&[]);
        assert_abs_diff_eq!(value, 0.0);
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let loss = sum_loss();
        let input = Tensor::zeros(&[3, 2], (Kind::Float, Device::Cpu));
        let target = Tensor::zeros(&[2, 3], (Kind::Float, Device::Cpu));
        assert!(loss.f_forward(&input, &target).is_err());
    }
}
