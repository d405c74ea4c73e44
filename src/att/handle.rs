use std::fmt::{Debug, Display, Formatter};
use std::num::NonZeroU16;
use std::ops::{Bound, RangeBounds};

use crate::util::name_of;

/// Attribute handle ([Vol 3] Part F, Section 3.2.2). Handle `0x0000` is
/// reserved and cannot be represented.
#[derive(
    Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Handle(NonZeroU16);

impl Handle {
    /// Minimum valid handle.
    pub const MIN: Self = Self(NonZeroU16::MIN);
    /// Maximum valid handle.
    pub const MAX: Self = Self(NonZeroU16::MAX);

    /// Wraps a raw handle. Returns `None` if the handle is invalid.
    #[inline]
    #[must_use]
    pub const fn new(h: u16) -> Option<Self> {
        match NonZeroU16::new(h) {
            Some(nz) => Some(Self(nz)),
            None => None,
        }
    }

    /// Returns the next handle or `None` if the maximum handle was reached.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        self.offset(1)
    }

    /// Returns the previous handle or `None` for [`Handle::MIN`].
    #[inline]
    #[must_use]
    pub const fn prev(self) -> Option<Self> {
        Self::new(self.0.get() - 1)
    }

    /// Returns the handle `n` positions after `self` without wrapping.
    #[inline]
    #[must_use]
    pub const fn offset(self, n: u16) -> Option<Self> {
        match self.0.checked_add(n) {
            Some(nz) => Some(Self(nz)),
            None => None,
        }
    }
}

impl Debug for Handle {
    #[allow(clippy::use_self)]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({:#06X})", name_of!(Handle), self.0.get())
    }
}

impl Display for Handle {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self, f)
    }
}

impl From<Handle> for u16 {
    #[inline]
    fn from(h: Handle) -> Self {
        h.0.get()
    }
}

impl From<Handle> for usize {
    #[inline]
    fn from(h: Handle) -> Self {
        Self::from(h.0.get())
    }
}

/// Inclusive range of attribute handles. This is a `Copy` version of
/// `RangeInclusive<Handle>`, which is never empty. Serialized as a
/// `[start, end]` pair.
#[derive(
    Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(try_from = "(Handle, Handle)", into = "(Handle, Handle)")]
#[must_use]
pub struct HandleRange {
    start: Handle,
    end: Handle,
}

impl HandleRange {
    /// Handle range that includes all possible handles.
    pub const ALL: Self = Self {
        start: Handle::MIN,
        end: Handle::MAX,
    };

    /// Creates a new handle range `start..=end`.
    ///
    /// # Panics
    ///
    /// Panics if `end < start`.
    #[inline]
    pub const fn new(start: Handle, end: Handle) -> Self {
        assert!(start.0.get() <= end.0.get());
        Self { start, end }
    }

    /// Creates a handle range from raw handles. Returns [`None`] if either
    /// handle is invalid or if `end < start`.
    #[inline]
    #[must_use]
    pub fn from_raw(start: u16, end: u16) -> Option<Self> {
        let (start, end) = (Handle::new(start)?, Handle::new(end)?);
        (start <= end).then_some(Self { start, end })
    }

    /// Returns the starting handle.
    #[inline(always)]
    #[must_use]
    pub const fn start(self) -> Handle {
        self.start
    }

    /// Returns the ending handle.
    #[inline(always)]
    #[must_use]
    pub const fn end(self) -> Handle {
        self.end
    }

    /// Returns the number of handles in the range.
    #[inline]
    #[must_use]
    pub const fn len(self) -> usize {
        (self.end.0.get() - self.start.0.get()) as usize + 1
    }

    /// Returns an iterator over all handles in the range.
    #[inline]
    pub fn iter(self) -> impl Iterator<Item = Handle> {
        (self.start.0.get()..=self.end.0.get()).filter_map(Handle::new)
    }

    /// Returns whether `other` starts immediately after the end of `self`.
    #[inline]
    #[must_use]
    pub const fn precedes(self, other: Self) -> bool {
        self.end.0.get() as u32 + 1 == other.start.0.get() as u32
    }

    /// Returns the range `self.start..=other.end`.
    #[inline]
    pub const fn join(self, other: Self) -> Self {
        Self::new(self.start, other.end)
    }

    /// Splits off the first `n` handles, returning the prefix and the
    /// remainder, if any. Returns [`None`] if the range is too short or `n` is
    /// zero.
    #[must_use]
    pub fn split(self, n: usize) -> Option<(Self, Option<Self>)> {
        if n == 0 || n > self.len() {
            return None;
        }
        #[allow(clippy::cast_possible_truncation)]
        let last = self.start.offset(n as u16 - 1)?;
        let rest = (last < self.end).then(|| last.next().map(|s| Self::new(s, self.end)));
        Some((Self::new(self.start, last), rest.flatten()))
    }
}

impl TryFrom<(Handle, Handle)> for HandleRange {
    type Error = &'static str;

    #[inline]
    fn try_from((start, end): (Handle, Handle)) -> Result<Self, Self::Error> {
        (start <= end)
            .then_some(Self { start, end })
            .ok_or("handle range end precedes start")
    }
}

impl From<HandleRange> for (Handle, Handle) {
    #[inline(always)]
    fn from(r: HandleRange) -> Self {
        (r.start, r.end)
    }
}

impl Debug for HandleRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:#06X}..={:#06X}]", self.start.0.get(), self.end.0.get())
    }
}

impl RangeBounds<Handle> for HandleRange {
    #[inline]
    fn start_bound(&self) -> Bound<&Handle> {
        Bound::Included(&self.start)
    }

    #[inline]
    fn end_bound(&self) -> Bound<&Handle> {
        Bound::Included(&self.end)
    }

    #[inline]
    fn contains<U>(&self, item: &U) -> bool
    where
        Handle: PartialOrd<U>,
        U: ?Sized + PartialOrd<Handle>,
    {
        self.start <= *item && *item <= self.end
    }
}

impl Default for HandleRange {
    /// Returns a handle range that includes all possible handles.
    #[inline(always)]
    fn default() -> Self {
        Self::ALL
    }
}
