//! Bounding boxes paired with class indexes.

use bbox::{Rect, RectNum, Transform, TLBR};
use num_traits::{Num, ToPrimitive};
use std::ops::Mul;

/// A box in pixel units with its class index.
pub type PixelLabel = Label<TLBR<f64>, usize>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label<R, C>
where
    R: Rect,
{
    pub rect: R,
    pub class: C,
}

impl<T> Label<TLBR<T>, usize>
where
    T: Copy + Num + PartialOrd + ToPrimitive,
{
    /// The number of entries of a label row with `num_classes` classes.
    pub fn row_len(num_classes: usize) -> usize {
        5 + num_classes
    }

    /// Write `[x1, y1, x2, y2, 1, one-hot..]` into `row`.
    ///
    /// Returns `None` and leaves `row` untouched if the row length does not
    /// fit `num_classes`, the class is out of range or a corner is not
    /// representable in `f32`.
    pub fn write_row(&self, row: &mut [f32], num_classes: usize) -> Option<()> {
        if row.len() != Self::row_len(num_classes) || self.class >= num_classes {
            return None;
        }
        let [x1, y1, x2, y2] = self.rect.xyxy();
        let corners = [x1.to_f32()?, y1.to_f32()?, x2.to_f32()?, y2.to_f32()?];

        row.iter_mut().for_each(|value| *value = 0.0);
        row[0..4].copy_from_slice(&corners);
        row[4] = 1.0;
        row[5 + self.class] = 1.0;
        Some(())
    }
}

impl<'a, T, C> Mul<&'a Label<TLBR<T>, C>> for &'a Transform<T>
where
    T: Copy + Num + PartialOrd,
    C: Copy,
{
    type Output = Label<TLBR<T>, C>;

    fn mul(self, rhs: &'a Label<TLBR<T>, C>) -> Self::Output {
        Label {
            rect: self * &rhs.rect,
            class: rhs.class,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_keeps_class() {
        let label = Label {
            rect: TLBR::from_tlbr([10.0, 20.0, 30.0, 40.0]),
            class: 7usize,
        };
        let moved = &Transform::translation(5.0, -5.0) * &label;
        assert_eq!(moved.class, 7);
        assert_eq!(moved.rect.tlbr(), [15.0, 15.0, 35.0, 35.0]);
    }

    #[test]
    fn label_row_layout() {
        let label: PixelLabel = Label {
            rect: TLBR::from_tlbr([10.0, 20.0, 30.0, 40.0]),
            class: 2,
        };
        let mut row = vec![9f32; PixelLabel::row_len(3)];
        assert_eq!(label.write_row(&mut row, 3), Some(()));
        assert_eq!(row, [20.0f32, 10.0, 40.0, 30.0, 1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn out_of_range_class_is_rejected() {
        let label: PixelLabel = Label {
            rect: TLBR::from_tlbr([0.0, 0.0, 1.0, 1.0]),
            class: 3,
        };
        let mut row = vec![0f32; PixelLabel::row_len(3)];
        assert!(label.write_row(&mut row, 3).is_none());
        assert!(label.write_row(&mut row[..7], 4).is_none());
        assert!(row.iter().all(|&value| value == 0.0));
    }
}
