use super::{Rect, TLBR};
use crate::{common::*, RectNum, HW};

/// Axis-aligned affine map `y' = y * sy + ty`, `x' = x * sx + tx`.
///
/// A negative scale mirrors the axis.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Transform<T> {
    pub sy: T,
    pub sx: T,
    pub ty: T,
    pub tx: T,
}

impl<T> Transform<T>
where
    T: Copy + Num + PartialOrd,
{
    pub fn identity() -> Self {
        Self {
            sy: T::one(),
            sx: T::one(),
            ty: T::zero(),
            tx: T::zero(),
        }
    }

    pub fn translation(ty: T, tx: T) -> Self {
        Self {
            ty,
            tx,
            ..Self::identity()
        }
    }

    pub fn scaling(sy: T, sx: T) -> Self {
        Self {
            sy,
            sx,
            ..Self::identity()
        }
    }

    /// Mirror the x axis of an image of the given width.
    pub fn horizontal_flip(width: T) -> Self {
        Self {
            sx: T::zero() - T::one(),
            tx: width,
            ..Self::identity()
        }
    }

    /// Mirror the y axis of an image of the given height.
    pub fn vertical_flip(height: T) -> Self {
        Self {
            sy: T::zero() - T::one(),
            ty: height,
            ..Self::identity()
        }
    }

    pub fn from_rects<R>(src: &R, tgt: &R) -> Self
    where
        R: Rect<Type = T>,
    {
        let sy = tgt.h() / src.h();
        let sx = tgt.w() / src.w();
        let ty = tgt.t() - src.t() * sy;
        let tx = tgt.l() - src.l() * sx;

        Self { sy, sx, ty, tx }
    }

    /// The map that stretches an image of `src_size` onto `tgt_size`.
    pub fn from_sizes_exact(src_size: &HW<T>, tgt_size: &HW<T>) -> Self {
        let src = TLBR::from_tlhw([T::zero(), T::zero(), src_size.h(), src_size.w()]);
        let tgt = TLBR::from_tlhw([T::zero(), T::zero(), tgt_size.h(), tgt_size.w()]);
        Self::from_rects(&src, &tgt)
    }
}

impl<T> Transform<T>
where
    T: Copy + Num,
{
    pub fn inverse(&self) -> Self {
        let sy = T::one() / self.sy;
        let sx = T::one() / self.sx;
        let ty = T::zero() - self.ty / self.sy;
        let tx = T::zero() - self.tx / self.sx;

        Self { sy, sx, ty, tx }
    }
}

impl<T> Mul<&TLBR<T>> for &Transform<T>
where
    T: Copy + Num + PartialOrd,
{
    type Output = TLBR<T>;

    fn mul(self, rhs: &TLBR<T>) -> Self::Output {
        rhs.transform(self)
    }
}

/// Composition. `&a * &b` applies `b` first.
impl<T> Mul<&Transform<T>> for &Transform<T>
where
    T: Copy + Num,
{
    type Output = Transform<T>;

    fn mul(self, rhs: &Transform<T>) -> Self::Output {
        Transform {
            sx: self.sx * rhs.sx,
            sy: self.sy * rhs.sy,
            tx: rhs.tx * self.sx + self.tx,
            ty: rhs.ty * self.sy + self.ty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_transform_inverse() {
        let orig = Transform {
            sx: 2.0,
            sy: 2.0,
            tx: 1.0,
            ty: 1.0,
        };
        assert_eq!(orig.inverse().inverse(), orig);
    }

    #[test]
    fn rect_resize_exact() {
        let transform =
            Transform::from_sizes_exact(&HW::from_hw([80.0, 80.0]), &HW::from_hw([20.0, 40.0]));
        let expect = Transform {
            sx: 0.5,
            sy: 0.25,
            tx: 0.0,
            ty: 0.0,
        };
        assert_eq!(transform, expect);
    }

    #[test]
    fn flip_twice_is_identity() {
        let flip = Transform::horizontal_flip(416.0);
        assert_eq!(&flip * &flip, Transform::identity());
    }

    #[test]
    fn composition_order() {
        let pad = Transform::translation(0.0, 10.0);
        let resize = Transform::scaling(0.5, 0.5);
        let rect = TLBR::from_tlbr([0.0, 0.0, 20.0, 20.0]);
        let composed = &resize * &pad;
        assert_eq!(&composed * &rect, &resize * &(&pad * &rect));
        assert_eq!((&composed * &rect).tlbr(), [0.0, 5.0, 10.0, 15.0]);
    }
}
