//! Background selection for the no-object loss.

use super::{grid_layout::GridLayout, target::f_valid_box_mask};
use crate::common::*;

/// Mark the predictions that count as background.
///
/// Predictions are decoded to pixel boxes and compared with the valid
/// `[cx, cy, w, h, ..]` target boxes of the same image. A slot is background
/// (1) when its best IoU is below `ignore_thresh`, otherwise it is ignored (0).
/// An image without targets is background everywhere.
///
/// The output is `[batch, num_predictions]` in the prediction kind.
pub fn f_build_noobj_mask(
    predictions: &Tensor,
    targets: &Tensor,
    valid_counts: &Tensor,
    layout: &GridLayout,
    ignore_thresh: f64,
) -> Result<Tensor> {
    let (batch_size, num_predictions, _num_entries) = predictions.size3()?;
    let (target_batch_size, max_boxes, num_target_entries) = targets.size3()?;
    ensure!(
        batch_size == target_batch_size,
        "batch sizes of predictions and targets differ: {} vs {}",
        batch_size,
        target_batch_size
    );
    ensure!(
        num_target_entries >= 4,
        "targets must have at least 4 entries, but get {}",
        num_target_entries
    );
    ensure!(
        predictions.device() == targets.device(),
        "predictions and targets are on different devices"
    );
    ensure!(
        valid_counts.size1()? == batch_size,
        "expect {} valid counts, but get {}",
        batch_size,
        valid_counts.size1()?
    );
    ensure!(
        predictions.device() == valid_counts.device(),
        "predictions and valid counts are on different devices"
    );

    tch::no_grad(|| -> Result<_> {
        let kind = predictions.kind();

        let best_iou = if max_boxes == 0 {
            Tensor::zeros(&[batch_size, num_predictions], (kind, predictions.device()))
        } else {
            let pred_boxes = layout.decode_boxes(predictions)?;
            let target_boxes = targets.narrow(2, 0, 4).to_kind(kind);
            let valid = f_valid_box_mask(valid_counts, max_boxes)?
                .to_kind(kind)
                .unsqueeze(1);
            let iou = tch_goodies::f_pairwise_iou(
                &pred_boxes,
                &target_boxes,
                IouMode::Positioned(BoxFormat::CxCyWh),
            )? * valid;
            let (best_iou, _) = iou.max_dim(2, false);
            best_iou
        };

        let mask = best_iou.lt(ignore_thresh).to_kind(kind);
        Ok(mask)
    })
}

pub fn build_noobj_mask(
    predictions: &Tensor,
    targets: &Tensor,
    valid_counts: &Tensor,
    layout: &GridLayout,
    ignore_thresh: f64,
) -> Tensor {
    f_build_noobj_mask(predictions, targets, valid_counts, layout, ignore_thresh).unwrap()
}

/// Zero the mask at every positive flat index.
pub fn f_suppress_positives(mask: &Tensor, flat_indexes: &Tensor) -> Result<Tensor> {
    let (batch_size, num_predictions) = mask.size2()?;
    let num_indexes = flat_indexes.size1()?;
    ensure!(
        flat_indexes.kind() == Kind::Int64,
        "flat indexes must be Int64, but get {:?}",
        flat_indexes.kind()
    );
    if num_indexes > 0 {
        let min = flat_indexes.min().int64_value(&[]);
        let max = flat_indexes.max().int64_value(&[]);
        ensure!(
            min >= 0 && max < batch_size * num_predictions,
            "flat indexes [{}, {}] are out of range for {} slots",
            min,
            max,
            batch_size * num_predictions
        );
    }

    let suppressed = tch::no_grad(|| {
        mask.reshape(&[-1])
            .index_fill(0, flat_indexes, 0.0)
            .view([batch_size, num_predictions])
    });
    Ok(suppressed)
}

pub fn suppress_positives(mask: &Tensor, flat_indexes: &Tensor) -> Tensor {
    f_suppress_positives(mask, flat_indexes).unwrap()
}
