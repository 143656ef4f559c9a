use crate::common::*;

/// Image or box extent, height first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HW<T> {
    h: T,
    w: T,
}

/// Margins that pad an extent to a square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SquarePadding<T> {
    pub top: T,
    pub bottom: T,
    pub left: T,
    pub right: T,
}

impl<T> HW<T>
where
    T: Num + PartialOrd + Copy,
{
    pub fn try_from_hw(hw: [T; 2]) -> Result<Self> {
        let [h, w] = hw;
        let zero = T::zero();
        ensure!(
            h >= zero && w >= zero,
            "height and width parameters must be non-negative"
        );
        Ok(Self { h, w })
    }

    pub fn from_hw(hw: [T; 2]) -> Self {
        Self::try_from_hw(hw).unwrap()
    }

    pub fn h(&self) -> T {
        self.h
    }

    pub fn w(&self) -> T {
        self.w
    }

    pub fn area(&self) -> T {
        self.h * self.w
    }

    pub fn long_side(&self) -> T {
        if self.h >= self.w {
            self.h
        } else {
            self.w
        }
    }

    /// Split the side difference evenly onto the short side. For integers
    /// the odd unit goes to the bottom or the right.
    pub fn square_padding(&self) -> SquarePadding<T> {
        let zero = T::zero();
        let two = T::one() + T::one();
        let (short, long) = if self.h <= self.w {
            (self.h, self.w)
        } else {
            (self.w, self.h)
        };
        let diff = long - short;
        let lead = diff / two;
        let trail = diff - lead;

        if self.h < self.w {
            SquarePadding {
                top: lead,
                bottom: trail,
                left: zero,
                right: zero,
            }
        } else {
            SquarePadding {
                top: zero,
                bottom: zero,
                left: lead,
                right: trail,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn size_area() {
        let size = HW::from_hw([3.0, 2.0]);
        let area: f64 = size.area();
        assert_abs_diff_eq!(area, 6.0);
        assert_eq!(size.long_side(), 3.0);
    }

    #[test]
    fn negative_size_is_rejected() {
        assert!(HW::try_from_hw([-1.0, 2.0]).is_err());
    }

    #[test]
    fn odd_padding_goes_to_the_trailing_side() {
        let padding = HW::from_hw([4i64, 9]).square_padding();
        assert_eq!(
            padding,
            SquarePadding {
                top: 2,
                bottom: 3,
                left: 0,
                right: 0
            }
        );

        let padding = HW::from_hw([10i64, 4]).square_padding();
        assert_eq!((padding.left, padding.right), (3, 3));
        assert_eq!((padding.top, padding.bottom), (0, 0));

        let padding = HW::from_hw([5i64, 5]).square_padding();
        assert_eq!(padding.top + padding.bottom + padding.left + padding.right, 0);
    }
}
