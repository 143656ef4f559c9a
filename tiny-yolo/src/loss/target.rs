//! Anchor assignment and target encoding.

use super::grid_layout::GridLayout;
use crate::common::*;

/// Ground truth boxes encoded in the network parametrization.
#[derive(Debug, TensorLike)]
pub struct EncodedTargets {
    /// `[num_targets, num_entries]` rows of `[tx, ty, tw, th, ..]`. Entries
    /// after the box are copied from the input rows.
    pub targets: Tensor,
    /// `[num_targets]` flat prediction indexes across the batch in `Int64`.
    pub flat_indexes: Tensor,
}

impl EncodedTargets {
    pub fn num_targets(&self) -> i64 {
        self.flat_indexes.size()[0]
    }
}

/// Boolean `[batch, max_boxes]` mask of the rows within the valid counts.
pub fn f_valid_box_mask(valid_counts: &Tensor, max_boxes: i64) -> Result<Tensor> {
    let batch_size = valid_counts.size1()?;
    ensure!(
        matches!(
            valid_counts.kind(),
            Kind::Int64 | Kind::Int | Kind::Int16 | Kind::Int8 | Kind::Uint8
        ),
        "valid counts must be integers, but get {:?}",
        valid_counts.kind()
    );
    if batch_size > 0 {
        let min = valid_counts.min().int64_value(&[]);
        let max = valid_counts.max().int64_value(&[]);
        ensure!(
            min >= 0 && max <= max_boxes,
            "valid counts must be in range [0, {}], but get [{}, {}]",
            max_boxes,
            min,
            max
        );
    }

    let positions = Tensor::arange(max_boxes, (Kind::Int64, valid_counts.device())).unsqueeze(0);
    Ok(positions.lt_tensor(&valid_counts.to_kind(Kind::Int64).unsqueeze(1)))
}

/// Assign every valid box to one prediction slot and encode it.
///
/// `targets` is `[batch, max_boxes, num_entries]` with `[cx, cy, w, h]` in
/// pixels in the first four entries, and only the first `valid_counts[i]`
/// rows of image `i` are read. The output keeps image order and box order.
///
/// The anchor is the one with the highest center-aligned IoU; ties go to the
/// lower anchor index. Cells are clamped into the grid. Offsets are clamped
/// to `[EPSILON, 1 - EPSILON]` before the logit and sizes to at least
/// `EPSILON` before the log, so every encoded value is finite.
///
/// Boxes that land on the same slot are all kept. The loss then counts that
/// slot once per box.
pub fn f_preprocess_targets(
    targets: &Tensor,
    valid_counts: &Tensor,
    layout: &GridLayout,
) -> Result<EncodedTargets> {
    let (batch_size, max_boxes, num_entries) = targets.size3()?;
    ensure!(
        num_entries >= 4,
        "targets must have at least 4 entries, but get {}",
        num_entries
    );
    ensure!(
        valid_counts.size1()? == batch_size,
        "expect {} valid counts, but get {}",
        batch_size,
        valid_counts.size1()?
    );
    ensure!(
        targets.device() == valid_counts.device(),
        "targets and valid counts are on different devices"
    );

    let device = targets.device();
    let kind = targets.kind();
    let num_predictions = layout.num_predictions();

    tch::no_grad(|| -> Result<_> {
        // select valid rows in batch order
        let valid_mask = f_valid_box_mask(valid_counts, max_boxes)?;
        let selected = valid_mask.reshape(&[-1]).nonzero().view([-1]);
        let rows = targets
            .reshape(&[batch_size * max_boxes, num_entries])
            .index_select(0, &selected);
        let batch_indexes = Tensor::arange(batch_size, (Kind::Int64, device))
            .unsqueeze(1)
            .expand(&[batch_size, max_boxes], false)
            .reshape(&[-1])
            .index_select(0, &selected);

        let boxes = rows.narrow(1, 0, 4).to_kind(Kind::Double);

        // best anchor by shape
        let anchor_indexes = {
            let iou = tch_goodies::f_pairwise_iou(
                &boxes.unsqueeze(0),
                &layout.anchor_boxes(device),
                IouMode::CenterAligned,
            )?;
            iou.argmax(2, false).view([-1])
        };

        let lookup = layout.anchor_lookup(device);
        let anchor_size = lookup.size.index_select(0, &anchor_indexes);
        let stride = lookup.stride.index_select(0, &anchor_indexes);
        let grid_size = lookup.grid_size.index_select(0, &anchor_indexes);
        let slot_base = lookup.slot_base.index_select(0, &anchor_indexes);
        let grid_max = grid_size.to_kind(Kind::Double) - 1.0;

        let cx = boxes.select(1, 0) / &stride;
        let cy = boxes.select(1, 1) / &stride;
        let grid_x = cx.floor().clamp_min(0.0).minimum(&grid_max);
        let grid_y = cy.floor().clamp_min(0.0).minimum(&grid_max);

        let logit = |offset: Tensor| {
            let offset = offset.clamp(EPSILON, 1.0 - EPSILON);
            (&offset / (1.0 - &offset)).log()
        };
        let tx = logit(&cx - &grid_x);
        let ty = logit(&cy - &grid_y);
        let tw = (boxes.select(1, 2).clamp_min(EPSILON) / anchor_size.select(1, 0)).log();
        let th = (boxes.select(1, 3).clamp_min(EPSILON) / anchor_size.select(1, 1)).log();

        let grid_x = grid_x.to_kind(Kind::Int64);
        let grid_y = grid_y.to_kind(Kind::Int64);
        let flat_indexes =
            batch_indexes * num_predictions + slot_base + grid_y * &grid_size + grid_x;

        let encoded_boxes = Tensor::stack(&[tx, ty, tw, th], 1).to_kind(kind);
        let targets = Tensor::cat(&[encoded_boxes, rows.narrow(1, 4, num_entries - 4)], 1);

        debug_assert!(
            !bool::from(targets.isnan().any()),
            "NaN detected in encoded targets"
        );

        Ok(EncodedTargets {
            targets,
            flat_indexes,
        })
    })
}

pub fn preprocess_targets(
    targets: &Tensor,
    valid_counts: &Tensor,
    layout: &GridLayout,
) -> EncodedTargets {
    f_preprocess_targets(targets, valid_counts, layout).unwrap()
}
