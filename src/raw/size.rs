use super::handle::Handle;

/// Exact count of the nodes in a subtree, the rank-augmentation field.
///
/// Bounded by [`Handle::MAX`], since every counted node occupies an arena
/// slot. The arithmetic helpers assert on overflow/underflow: a count going
/// out of bounds means the tree structure is corrupt.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(transparent)]
pub(crate) struct Size(u32);

impl Size {
    pub(crate) const MAX: usize = Handle::MAX;
    pub(crate) const ZERO: Self = Self(0);

    #[inline]
    pub(crate) const fn from_usize(size: usize) -> Self {
        assert!(size <= Self::MAX, "`Size::from_usize()` - `size` > `Size::MAX`!");
        #[allow(clippy::cast_possible_truncation)]
        Self(size as u32)
    }

    #[inline]
    pub(crate) const fn to_usize(self) -> usize {
        self.0 as usize
    }

    /// `self + n`, used for the closed-form rotation deltas.
    #[inline]
    pub(crate) const fn plus(self, n: usize) -> Self {
        Self::from_usize(self.to_usize() + n)
    }

    /// `self - n`, used for the closed-form rotation deltas.
    #[inline]
    pub(crate) const fn minus(self, n: usize) -> Self {
        let lhs = self.to_usize();
        assert!(n <= lhs, "`Size::minus()` - subtree count underflow!");
        Self::from_usize(lhs - n)
    }

    #[inline]
    pub(crate) const fn incr(&mut self) {
        *self = self.plus(1);
    }

    #[inline]
    pub(crate) const fn decr(&mut self) {
        *self = self.minus(1);
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use static_assertions::assert_eq_size;

    assert_eq_size!(Size, u32);

    #[test]
    #[should_panic(expected = "`Size::from_usize()` - `size` > `Size::MAX`!")]
    fn invalid_size() {
        let _ = Size::from_usize(Size::MAX + 1);
    }

    #[test]
    #[should_panic(expected = "`Size::minus()` - subtree count underflow!")]
    fn size_underflow() {
        let _ = Size::ZERO.minus(1);
    }

    proptest! {
        #[test]
        fn size_round_trip(size in 0..=Size::MAX) {
            assert_eq!(Size::from_usize(size).to_usize(), size);
        }

        #[test]
        fn size_arithmetic(size in 0..1_000_000usize, delta in 0..1_000usize) {
            let mut s = Size::from_usize(size);
            assert_eq!(s.plus(delta).to_usize(), size + delta);
            assert_eq!(s.plus(delta).minus(delta), s);
            s.incr();
            assert_eq!(s.to_usize(), size + 1);
            s.decr();
            assert_eq!(s.to_usize(), size);
        }
    }
}
