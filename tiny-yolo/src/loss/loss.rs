//! Defines loss for training.

use super::{
    bce_with_logit_loss::{BceWithLogitsLoss, BceWithLogitsLossInit},
    grid_layout::GridLayout,
    noobj_mask::{f_build_noobj_mask, f_suppress_positives},
    target::{f_preprocess_targets, EncodedTargets},
};
use crate::common::*;

pub use yolo_loss::*;
pub use yolo_loss_output::*;

/// The offset pushing ignored objectness logits far below zero.
const IGNORE_LOGIT_OFFSET: f64 = 1e7;

mod yolo_loss {
    use super::*;

    #[derive(Debug)]
    pub struct YoloLossInit {
        pub layout: GridLayout,
        pub num_classes: usize,
        pub ignore_thresh: f64,
        pub no_object_coeff: f64,
        pub coord_coeff: f64,
    }

    impl YoloLossInit {
        pub fn build(self) -> Result<YoloLoss> {
            let Self {
                layout,
                num_classes,
                ignore_thresh,
                no_object_coeff,
                coord_coeff,
            } = self;

            ensure!(num_classes > 0, "num_classes must be positive");
            ensure!(
                (0.0..1.0).contains(&ignore_thresh),
                "ignore_thresh must be in range [0, 1), but get {}",
                ignore_thresh
            );
            ensure!(
                no_object_coeff > 0.0,
                "no_object_coeff must be positive, but get {}",
                no_object_coeff
            );
            ensure!(
                coord_coeff > 0.0,
                "coord_coeff must be positive, but get {}",
                coord_coeff
            );

            Ok(YoloLoss {
                layout,
                num_classes: num_classes as i64,
                ignore_thresh,
                no_object_coeff,
                coord_coeff,
                bce: BceWithLogitsLossInit {
                    reduction: Reduction::Sum,
                }
                .build(),
            })
        }
    }

    #[derive(Debug)]
    pub struct YoloLoss {
        layout: GridLayout,
        num_classes: i64,
        ignore_thresh: f64,
        no_object_coeff: f64,
        coord_coeff: f64,
        bce: BceWithLogitsLoss,
    }

    impl YoloLoss {
        pub fn layout(&self) -> &GridLayout {
            &self.layout
        }

        /// Compute the training loss of a batch.
        ///
        /// - `prediction`: `[batch, num_predictions, 5 + num_classes]` raw network output.
        /// - `labels`: `[batch, max_boxes, 5 + num_classes]` rows of
        ///   `[x1, y1, x2, y2, 1, one-hot..]` in pixels, zero padded.
        /// - `valid_counts`: `[batch]` numbers of real rows per image.
        pub fn forward(
            &self,
            prediction: &Tensor,
            labels: &Tensor,
            valid_counts: &Tensor,
        ) -> Result<(YoloLossOutput, YoloLossAuxiliary)> {
            let num_entries = 5 + self.num_classes;
            let (batch_size, num_predictions, pred_entries) = prediction.size3()?;
            let (label_batch_size, _max_boxes, label_entries) = labels.size3()?;
            ensure!(
                num_predictions == self.layout.num_predictions(),
                "expect {} predictions per image, but get {}",
                self.layout.num_predictions(),
                num_predictions
            );
            ensure!(
                pred_entries == num_entries && label_entries == num_entries,
                "expect {} entries per prediction and label, but get {} and {}",
                num_entries,
                pred_entries,
                label_entries
            );
            ensure!(
                batch_size == label_batch_size,
                "batch sizes of prediction and labels differ: {} vs {}",
                batch_size,
                label_batch_size
            );
            ensure!(
                prediction.device() == labels.device()
                    && prediction.device() == valid_counts.device(),
                "prediction, labels and valid counts must be on the same device"
            );

            // match targets to prediction slots
            let targets = tch_goodies::f_xyxy_to_cxcywh(&labels.to_kind(prediction.kind()))?;
            let encoded = f_preprocess_targets(&targets, valid_counts, &self.layout)?;
            let noobj_mask = {
                let mask = f_build_noobj_mask(
                    prediction,
                    &targets,
                    valid_counts,
                    &self.layout,
                    self.ignore_thresh,
                )?;
                f_suppress_positives(&mask, &encoded.flat_indexes)?
            };

            let noobj_loss = self.noobj_loss(prediction, &noobj_mask)?;
            debug_assert!(!bool::from(noobj_loss.isnan().any()), "NaN detected");

            // collect assigned predictions
            let pred_instances = prediction
                .reshape(&[batch_size * num_predictions, num_entries])
                .index_select(0, &encoded.flat_indexes);

            let coord_loss = pred_instances
                .narrow(1, 0, 4)
                .mse_loss(&encoded.targets.narrow(1, 0, 4), Reduction::Sum);
            debug_assert!(!bool::from(coord_loss.isnan().any()), "NaN detected");

            let obj_loss = self.obj_loss(&pred_instances)?;
            debug_assert!(!bool::from(obj_loss.isnan().any()), "NaN detected");

            let class_loss = self.bce.f_forward(
                &pred_instances.narrow(1, 5, self.num_classes),
                &encoded.targets.narrow(1, 5, self.num_classes),
            )?;
            debug_assert!(!bool::from(class_loss.isnan().any()), "NaN detected");

            let total_loss = &class_loss
                + &obj_loss
                + self.coord_coeff * &coord_loss
                + self.no_object_coeff * &noobj_loss;

            Ok((
                YoloLossOutput {
                    total_loss,
                    coord_loss,
                    obj_loss,
                    noobj_loss,
                    class_loss,
                },
                YoloLossAuxiliary {
                    targets: encoded,
                    noobj_mask,
                },
            ))
        }

        /// Objectness of background slots against zero. Ignored slots are
        /// pushed far below zero so they add nothing.
        fn noobj_loss(&self, prediction: &Tensor, noobj_mask: &Tensor) -> Result<Tensor> {
            let objectness = prediction.select(2, 4);
            let logits = &objectness - (1.0 - noobj_mask) * IGNORE_LOGIT_OFFSET;
            self.bce.f_forward(&logits, &objectness.zeros_like())
        }

        /// Objectness of assigned slots against one.
        fn obj_loss(&self, pred_instances: &Tensor) -> Result<Tensor> {
            let objectness = pred_instances.narrow(1, 4, 1);
            let target = tch::no_grad(|| objectness.ones_like());
            self.bce.f_forward(&objectness, &target)
        }
    }
}

mod yolo_loss_output {
    use super::*;

    #[derive(Debug, TensorLike)]
    pub struct YoloLossOutput {
        pub total_loss: Tensor,
        pub coord_loss: Tensor,
        pub obj_loss: Tensor,
        pub noobj_loss: Tensor,
        pub class_loss: Tensor,
    }

    impl YoloLossOutput {
        /// Scalar values in `(total, coord, obj, noobj, class)` order.
        pub fn values(&self) -> [f64; 5] {
            [
                self.total_loss.double_value(&[]),
                self.coord_loss.double_value(&[]),
                self.obj_loss.double_value(&[]),
                self.noobj_loss.double_value(&[]),
                self.class_loss.double_value(&[]),
            ]
        }
    }

    /// Intermediate values kept for inspection.
    #[derive(Debug, TensorLike)]
    pub struct YoloLossAuxiliary {
        pub targets: EncodedTargets,
        /// `[batch, num_predictions]` background mask after positive suppression.
        pub noobj_mask: Tensor,
    }
}
