use super::Rect;
use crate::{common::*, Transform};

/// Bounding box in TLBR format.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TLBR<T> {
    pub(crate) t: T,
    pub(crate) l: T,
    pub(crate) b: T,
    pub(crate) r: T,
}

impl<T> TLBR<T>
where
    T: Copy + Num + PartialOrd,
{
    /// Map the corners through the transform.
    ///
    /// A mirroring transform swaps the opposite edges, so the corners are
    /// re-ordered to keep `t <= b` and `l <= r`.
    pub fn transform(&self, transform: &Transform<T>) -> Self {
        let t = self.t * transform.sy + transform.ty;
        let l = self.l * transform.sx + transform.tx;
        let b = self.b * transform.sy + transform.ty;
        let r = self.r * transform.sx + transform.tx;
        let (t, b) = if t <= b { (t, b) } else { (b, t) };
        let (l, r) = if l <= r { (l, r) } else { (r, l) };
        TLBR { t, l, b, r }
    }
}

impl<T> Rect for TLBR<T>
where
    T: Copy + Num + PartialOrd,
{
    type Type = T;

    fn t(&self) -> Self::Type {
        self.t
    }

    fn l(&self) -> Self::Type {
        self.l
    }

    fn b(&self) -> Self::Type {
        self.b
    }

    fn r(&self) -> Self::Type {
        self.r
    }

    fn cy(&self) -> Self::Type {
        let one = T::one();
        let two = one + one;
        self.t + self.h() / two
    }

    fn cx(&self) -> Self::Type {
        let one = T::one();
        let two = one + one;
        self.l + self.w() / two
    }

    fn h(&self) -> Self::Type {
        self.b - self.t
    }

    fn w(&self) -> Self::Type {
        self.r - self.l
    }

    fn try_from_cycxhw(cycxhw: [Self::Type; 4]) -> Result<Self> {
        let [cy, cx, h, w] = cycxhw;
        let zero = T::zero();
        ensure!(h >= zero && w >= zero, "h and w must be non-negative");

        let two = T::one() + T::one();
        let t = cy - h / two;
        let b = cy + h / two;
        let l = cx - w / two;
        let r = cx + w / two;

        Ok(Self { t, l, b, r })
    }

    fn try_from_tlbr(tlbr: [Self::Type; 4]) -> Result<Self> {
        let [t, l, b, r] = tlbr;
        ensure!(b >= t && r >= l, "b >= t and r >= l must hold");

        Ok(Self { t, l, b, r })
    }

    fn try_from_tlhw(tlhw: [Self::Type; 4]) -> Result<Self> {
        let [t, l, h, w] = tlhw;
        let b = t + h;
        let r = l + w;
        Self::try_from_tlbr([t, l, b, r])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RectNum;

    #[test]
    fn mirrored_rect_stays_ordered() {
        let rect = TLBR::from_tlbr([10.0, 20.0, 30.0, 60.0]);
        let flipped = rect.transform(&Transform::horizontal_flip(100.0));
        assert_eq!(flipped.tlbr(), [10.0, 40.0, 30.0, 80.0]);
        let flipped = rect.transform(&Transform::vertical_flip(100.0));
        assert_eq!(flipped.tlbr(), [70.0, 20.0, 90.0, 60.0]);
    }
}
