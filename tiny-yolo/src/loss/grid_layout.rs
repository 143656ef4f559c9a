//! The flattened multi-scale prediction grid.

use crate::common::*;

/// The number of anchors sharing one detection scale.
pub const ANCHORS_PER_SCALE: usize = 3;

#[derive(Debug, Clone)]
pub struct GridLayoutInit {
    /// The side length of the square input image in pixels.
    pub image_size: usize,
    /// The stride of the finest scale. Each following scale doubles it.
    pub finest_stride: usize,
    /// Anchor `[w, h]` pairs in pixels, grouped by 3 from the finest scale to the coarsest.
    pub anchors: Vec<[f64; 2]>,
}

impl GridLayoutInit {
    pub fn build(self) -> Result<GridLayout> {
        let Self {
            image_size,
            finest_stride,
            anchors,
        } = self;

        ensure!(image_size > 0, "image_size must be positive");
        ensure!(finest_stride > 0, "finest_stride must be positive");
        ensure!(
            !anchors.is_empty() && anchors.len() % ANCHORS_PER_SCALE == 0,
            "the number of anchors must be a non-zero multiple of {}, but get {}",
            ANCHORS_PER_SCALE,
            anchors.len()
        );
        anchors.iter().enumerate().try_for_each(|(index, &[w, h])| {
            ensure!(
                w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0,
                "anchor {} has non-positive size [{}, {}]",
                index,
                w,
                h
            );
            Ok(())
        })?;

        let num_scales = anchors.len() / ANCHORS_PER_SCALE;
        let scales: Vec<_> = (0..num_scales)
            .scan(0, |flat_offset, scale_index| {
                let stride = finest_stride << scale_index;
                let grid_size = image_size / stride;
                let info = ScaleInfo {
                    stride: stride as i64,
                    grid_size: grid_size as i64,
                    flat_offset: *flat_offset,
                };
                *flat_offset += (grid_size.pow(2) * ANCHORS_PER_SCALE) as i64;
                Some((stride, info))
            })
            .map(|(stride, info)| {
                ensure!(
                    image_size % stride == 0 && info.grid_size > 0,
                    "image_size {} is not divisible by the stride {}",
                    image_size,
                    stride
                );
                Ok(info)
            })
            .collect::<Result<_>>()?;

        let num_predictions = scales
            .iter()
            .map(|info| info.grid_size.pow(2) * ANCHORS_PER_SCALE as i64)
            .sum();

        Ok(GridLayout {
            image_size: image_size as i64,
            anchors,
            scales,
            num_predictions,
        })
    }
}

/// Geometry of one detection scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScaleInfo {
    /// Pixels per grid cell.
    pub stride: i64,
    /// Cells per side.
    pub grid_size: i64,
    /// The first flat index of the scale within one image.
    pub flat_offset: i64,
}

/// The position a flat index points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotLocation {
    pub batch_index: i64,
    pub anchor_index: usize,
    pub grid_y: i64,
    pub grid_x: i64,
}

/// Per-anchor lookup tensors indexed by anchor index.
#[derive(Debug, TensorLike)]
pub struct AnchorLookup {
    /// `[num_anchors, 2]` anchor sizes `(w, h)` in double precision.
    pub size: Tensor,
    /// `[num_anchors]` strides in double precision.
    pub stride: Tensor,
    /// `[num_anchors]` grid sizes.
    pub grid_size: Tensor,
    /// `[num_anchors]` first flat index of the anchor plane within one image.
    pub slot_base: Tensor,
}

/// The mapping between `(scale, anchor, cell)` and the flat prediction index.
///
/// The finest scale occupies the first index range and each coarser scale
/// follows contiguously. Within a scale the index is
/// `flat_offset + (anchor_index mod 3) * grid^2 + gy * grid + gx`.
#[derive(Debug, Clone)]
pub struct GridLayout {
    image_size: i64,
    anchors: Vec<[f64; 2]>,
    scales: Vec<ScaleInfo>,
    num_predictions: i64,
}

impl GridLayout {
    pub fn image_size(&self) -> i64 {
        self.image_size
    }

    pub fn anchors(&self) -> &[[f64; 2]] {
        &self.anchors
    }

    pub fn num_anchors(&self) -> usize {
        self.anchors.len()
    }

    pub fn scales(&self) -> &[ScaleInfo] {
        &self.scales
    }

    /// The number of prediction slots per image.
    pub fn num_predictions(&self) -> i64 {
        self.num_predictions
    }

    pub fn scale_of(&self, anchor_index: usize) -> &ScaleInfo {
        &self.scales[anchor_index / ANCHORS_PER_SCALE]
    }

    pub fn f_flat_index(
        &self,
        batch_index: i64,
        anchor_index: usize,
        grid_y: i64,
        grid_x: i64,
    ) -> Result<i64> {
        ensure!(
            anchor_index < self.num_anchors(),
            "anchor index {} is out of range",
            anchor_index
        );
        let ScaleInfo {
            grid_size,
            flat_offset,
            ..
        } = *self.scale_of(anchor_index);
        ensure!(
            (0..grid_size).contains(&grid_y) && (0..grid_size).contains(&grid_x),
            "grid cell ({}, {}) is out of a {}x{} grid",
            grid_x,
            grid_y,
            grid_size,
            grid_size
        );
        let plane = (anchor_index % ANCHORS_PER_SCALE) as i64;
        let slot = flat_offset + plane * grid_size.pow(2) + grid_y * grid_size + grid_x;
        Ok(batch_index * self.num_predictions + slot)
    }

    pub fn flat_index(
        &self,
        batch_index: i64,
        anchor_index: usize,
        grid_y: i64,
        grid_x: i64,
    ) -> i64 {
        self.f_flat_index(batch_index, anchor_index, grid_y, grid_x)
            .unwrap()
    }

    /// Invert [GridLayout::flat_index].
    pub fn locate(&self, flat_index: i64) -> Result<SlotLocation> {
        ensure!(flat_index >= 0, "negative flat index {}", flat_index);
        let batch_index = flat_index / self.num_predictions;
        let slot = flat_index % self.num_predictions;

        let (scale_index, info) = self
            .scales
            .iter()
            .enumerate()
            .rev()
            .find(|(_, info)| info.flat_offset <= slot)
            .ok_or_else(|| format_err!("flat index {} matches no scale", flat_index))?;
        let area = info.grid_size.pow(2);
        let local = slot - info.flat_offset;
        let plane = (local / area) as usize;

        Ok(SlotLocation {
            batch_index,
            anchor_index: scale_index * ANCHORS_PER_SCALE + plane,
            grid_y: (local % area) / info.grid_size,
            grid_x: local % info.grid_size,
        })
    }

    /// Anchor boxes `[1, num_anchors, 4]` centered at the origin in `[cx, cy, w, h]` form.
    pub fn anchor_boxes(&self, device: Device) -> Tensor {
        let values: Vec<f64> = self
            .anchors
            .iter()
            .flat_map(|&[w, h]| [0.0, 0.0, w, h])
            .collect();
        Tensor::of_slice(&values)
            .view([1, self.num_anchors() as i64, 4])
            .to_device(device)
    }

    pub fn anchor_lookup(&self, device: Device) -> AnchorLookup {
        let (size, stride, grid_size, slot_base) = self
            .anchors
            .iter()
            .enumerate()
            .map(|(anchor_index, &[w, h])| {
                let info = self.scale_of(anchor_index);
                let plane = (anchor_index % ANCHORS_PER_SCALE) as i64;
                (
                    [w, h],
                    info.stride as f64,
                    info.grid_size,
                    info.flat_offset + plane * info.grid_size.pow(2),
                )
            })
            .fold(
                (vec![], vec![], vec![], vec![]),
                |(mut size, mut stride, mut grid_size, mut slot_base), (s, st, g, b)| {
                    size.extend(s);
                    stride.push(st);
                    grid_size.push(g);
                    slot_base.push(b);
                    (size, stride, grid_size, slot_base)
                },
            );

        AnchorLookup {
            size: Tensor::of_slice(&size)
                .view([self.num_anchors() as i64, 2])
                .to_device(device),
            stride: Tensor::of_slice(&stride).to_device(device),
            grid_size: Tensor::of_slice(&grid_size).to_device(device),
            slot_base: Tensor::of_slice(&slot_base).to_device(device),
        }
    }

    /// Per-slot decoding parameters `[num_predictions, 5]` laid out as
    /// `(grid_x, grid_y, stride, anchor_w, anchor_h)` in flat index order.
    pub fn slot_geometry(&self, kind: Kind, device: Device) -> Tensor {
        let values: Vec<f64> = self
            .anchors
            .iter()
            .enumerate()
            .flat_map(|(anchor_index, &[w, h])| {
                let ScaleInfo {
                    stride, grid_size, ..
                } = *self.scale_of(anchor_index);
                itertools::iproduct!(0..grid_size, 0..grid_size).map(move |(gy, gx)| {
                    [gx as f64, gy as f64, stride as f64, w, h]
                })
            })
            .flatten()
            .collect();

        Tensor::of_slice(&values)
            .view([self.num_predictions, 5])
            .to_kind(kind)
            .to_device(device)
    }

    /// Decode raw `[batch, num_predictions, 4+]` predictions into pixel-space
    /// `[batch, num_predictions, 4]` boxes in `[cx, cy, w, h]` form.
    ///
    /// `bx = (sigmoid(tx) + gx) * stride` and `bw = anchor_w * exp(tw)`, same for y and h.
    pub fn decode_boxes(&self, predictions: &Tensor) -> Result<Tensor> {
        let (_batch_size, num_predictions, num_entries) = predictions.size3()?;
        ensure!(
            num_predictions == self.num_predictions,
            "expect {} predictions per image, but get {}",
            self.num_predictions,
            num_predictions
        );
        ensure!(
            num_entries >= 4,
            "predictions must have at least 4 entries, but get {}",
            num_entries
        );

        let geometry = self.slot_geometry(predictions.kind(), predictions.device());
        let grid_x = geometry.select(1, 0);
        let grid_y = geometry.select(1, 1);
        let stride = geometry.select(1, 2);
        let anchor_w = geometry.select(1, 3);
        let anchor_h = geometry.select(1, 4);

        let cx = (predictions.select(2, 0).sigmoid() + grid_x) * &stride;
        let cy = (predictions.select(2, 1).sigmoid() + grid_y) * &stride;
        let w = predictions.select(2, 2).exp() * anchor_w;
        let h = predictions.select(2, 3).exp() * anchor_h;

        Ok(Tensor::stack(&[cx, cy, w, h], 2))
    }
}
