//! LE link identity types.

use std::fmt::{Debug, Display, Formatter};
use std::num::NonZeroU16;

use crate::util::name_of;

/// Bluetooth device address ([Vol 6] Part B, Section 1.3). Identifies the
/// remote peer of a connection.
#[allow(clippy::exhaustive_enums)]
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Addr {
    Public(RawAddr),
    Random(RawAddr),
}

impl Addr {
    /// Returns the raw 48-bit address.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> RawAddr {
        match self {
            Self::Public(addr) | Self::Random(addr) => addr,
        }
    }
}

impl Display for Addr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Public(a) => write!(f, "{a} (public)"),
            Self::Random(a) => write!(f, "{a} (random)"),
        }
    }
}

/// 48-bit untyped device address stored in little-endian byte order.
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct RawAddr([u8; 6]);

impl RawAddr {
    /// Wraps a little-endian address.
    #[inline(always)]
    #[must_use]
    pub const fn new(v: [u8; 6]) -> Self {
        Self(v)
    }
}

impl From<[u8; 6]> for RawAddr {
    #[inline]
    fn from(v: [u8; 6]) -> Self {
        Self(v)
    }
}

impl Debug for RawAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // [Vol 3] Part C, Section 3.2.1.3
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[5], self.0[4], self.0[3], self.0[2], self.0[1], self.0[0]
        )
    }
}

impl Display for RawAddr {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self, f)
    }
}

/// Connection handle ([Vol 4] Part E, Section 5.4.2).
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct ConnHandle(NonZeroU16);

impl ConnHandle {
    /// Number of meaningful bits.
    const BITS: u16 = 12;
    /// Maximum valid connection handle.
    const MAX: u16 = 0xEFF;

    /// Wraps a raw connection handle. Returns `None` if the handle is invalid.
    #[inline]
    #[must_use]
    pub fn new(mut v: u16) -> Option<Self> {
        v &= (1 << Self::BITS) - 1;
        // v <= 0xEFF, so !v is never 0
        (v <= Self::MAX).then(|| NonZeroU16::new(!v).map(Self)).flatten()
    }
}

impl From<ConnHandle> for u16 {
    #[inline]
    fn from(cn: ConnHandle) -> Self {
        !cn.0.get()
    }
}

impl Debug for ConnHandle {
    #[allow(clippy::use_self)]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({:#05X})", name_of!(ConnHandle), u16::from(*self))
    }
}

impl Display for ConnHandle {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self, f)
    }
}

/// Local device role on a connection ([Vol 6] Part B, Section 1.1).
#[allow(clippy::exhaustive_enums)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Role {
    Central,
    Peripheral,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conn_handle() {
        assert_eq!(ConnHandle::new(0).map(u16::from), Some(0));
        assert_eq!(ConnHandle::new(0xEFF).map(u16::from), Some(0xEFF));
        assert_eq!(ConnHandle::new(0xF00), None);
        assert_eq!(ConnHandle::new(0x1005).map(u16::from), Some(5));
        assert_eq!(format!("{}", ConnHandle::new(5).unwrap()), "ConnHandle(0x005)");
    }

    #[test]
    fn addr() {
        let raw = RawAddr::from([0x66, 0x55, 0x44, 0x33, 0x22, 0x11]);
        assert_eq!(raw.to_string(), "11:22:33:44:55:66");
        assert_eq!(Addr::Random(raw).raw(), raw);
        assert_eq!(Addr::Public(raw).to_string(), "11:22:33:44:55:66 (public)");
    }
}
