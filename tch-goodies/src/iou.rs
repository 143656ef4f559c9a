//! Batched pairwise IoU and explicit box layout conversions.
//!
//! Box tensors carry the four box parameters in the first entries of the
//! last dimension. Which four parameters they are is never inferred: the
//! caller names the layout with [BoxFormat] or picks the matching converter.

use crate::{common::*, utils::EPSILON};

/// The layout of the first four entries of a box tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoxFormat {
    /// `[x, y, w, h]` where `(x, y)` is the top-left corner.
    Xywh,
    /// `[cx, cy, w, h]` where `(cx, cy)` is the box center.
    CxCyWh,
}

/// How two box sets are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IouMode {
    /// Compare the boxes where they are.
    Positioned(BoxFormat),
    /// Ignore positions and overlay both boxes on a common center. Only
    /// widths and heights matter, which ranks anchor shapes against a box.
    CenterAligned,
}

/// Compute the IoU of every box pair of two batched box sets.
///
/// `lhs` has shape `[batch, n, 4]` and `rhs` has shape `[batch, m, 4]`. The
/// batch dimensions must be equal or one of them must be 1. The result has
/// shape `[batch, n, m]`. The union is guarded by [EPSILON] so zero-area
/// boxes produce 0 instead of NaN.
pub fn f_pairwise_iou(lhs: &Tensor, rhs: &Tensor, mode: IouMode) -> Result<Tensor> {
    let (lhs_batch, _, lhs_entries) = lhs.size3()?;
    let (rhs_batch, _, rhs_entries) = rhs.size3()?;
    ensure!(
        lhs_entries == 4 && rhs_entries == 4,
        "box tensors must have 4 entries in the last dimension, but get {} and {}",
        lhs_entries,
        rhs_entries
    );
    ensure!(
        lhs_batch == rhs_batch || lhs_batch == 1 || rhs_batch == 1,
        "batch sizes {} and {} are not broadcastable",
        lhs_batch,
        rhs_batch
    );
    ensure!(
        lhs.device() == rhs.device(),
        "box tensors are on different devices"
    );

    let [x1, y1, w1, h1] = unpack_boxes(lhs);
    let [x2, y2, w2, h2] = unpack_boxes(rhs);

    let area1 = (&w1 * &h1).unsqueeze(2);
    let area2 = (&w2 * &h2).unsqueeze(1);

    let (inter_w, inter_h) = match mode {
        IouMode::CenterAligned => {
            let inter_w = w1.unsqueeze(2).minimum(&w2.unsqueeze(1)).clamp_min(0.0);
            let inter_h = h1.unsqueeze(2).minimum(&h2.unsqueeze(1)).clamp_min(0.0);
            (inter_w, inter_h)
        }
        IouMode::Positioned(format) => {
            let (l1, t1, l2, t2) = match format {
                BoxFormat::Xywh => (x1, y1, x2, y2),
                BoxFormat::CxCyWh => (
                    x1 - &w1 / 2.0,
                    y1 - &h1 / 2.0,
                    x2 - &w2 / 2.0,
                    y2 - &h2 / 2.0,
                ),
            };

            let r1 = (&l1 + &w1).unsqueeze(2);
            let r2 = (&l2 + &w2).unsqueeze(1);
            let b1 = (&t1 + &h1).unsqueeze(2);
            let b2 = (&t2 + &h2).unsqueeze(1);
            let l1 = l1.unsqueeze(2);
            let l2 = l2.unsqueeze(1);
            let t1 = t1.unsqueeze(2);
            let t2 = t2.unsqueeze(1);

            let inter_w = (r1.minimum(&r2) - l1.maximum(&l2)).clamp_min(0.0);
            let inter_h = (b1.minimum(&b2) - t1.maximum(&t2)).clamp_min(0.0);
            (inter_w, inter_h)
        }
    };

    let inter_area = inter_w * inter_h;
    let iou = &inter_area / (area1 + area2 - &inter_area + EPSILON);
    Ok(iou)
}

pub fn pairwise_iou(lhs: &Tensor, rhs: &Tensor, mode: IouMode) -> Tensor {
    f_pairwise_iou(lhs, rhs, mode).unwrap()
}

/// Convert `[x1, y1, x2, y2, ..]` rows to `[cx, cy, w, h, ..]`.
///
/// Entries after the first four are carried over untouched.
pub fn f_xyxy_to_cxcywh(boxes: &Tensor) -> Result<Tensor> {
    let (last_dim, [x1, y1, x2, y2], rest) = split_box_entries(boxes)?;
    let w = &x2 - &x1;
    let h = &y2 - &y1;
    let cx = &x1 + &w / 2.0;
    let cy = &y1 + &h / 2.0;
    Ok(Tensor::cat(&[cx, cy, w, h, rest], last_dim))
}

/// Convert `[cx, cy, w, h, ..]` rows to `[x1, y1, x2, y2, ..]`.
///
/// Entries after the first four are carried over untouched.
pub fn f_cxcywh_to_xyxy(boxes: &Tensor) -> Result<Tensor> {
    let (last_dim, [cx, cy, w, h], rest) = split_box_entries(boxes)?;
    let x1 = &cx - &w / 2.0;
    let y1 = &cy - &h / 2.0;
    let x2 = &cx + &w / 2.0;
    let y2 = &cy + &h / 2.0;
    Ok(Tensor::cat(&[x1, y1, x2, y2, rest], last_dim))
}

/// Take the four box entries of `[.., 4]` tensors without the trailing dimension.
fn unpack_boxes(boxes: &Tensor) -> [Tensor; 4] {
    let last_dim = boxes.dim() as i64 - 1;
    [
        boxes.select(last_dim, 0),
        boxes.select(last_dim, 1),
        boxes.select(last_dim, 2),
        boxes.select(last_dim, 3),
    ]
}

/// Split `[.., n]` into four `[.., 1]` box columns and the `[.., n - 4]` rest.
fn split_box_entries(boxes: &Tensor) -> Result<(i64, [Tensor; 4], Tensor)> {
    let shape = boxes.size();
    let num_entries = *shape
        .last()
        .ok_or_else(|| format_err!("box tensor must have at least one dimension"))?;
    ensure!(
        num_entries >= 4,
        "box tensor must have at least 4 entries in the last dimension, but get {}",
        num_entries
    );
    let last_dim = shape.len() as i64 - 1;
    let columns = [
        boxes.narrow(last_dim, 0, 1),
        boxes.narrow(last_dim, 1, 1),
        boxes.narrow(last_dim, 2, 1),
        boxes.narrow(last_dim, 3, 1),
    ];
    let rest = boxes.narrow(last_dim, 4, num_entries - 4);
    Ok((last_dim, columns, rest))
}
