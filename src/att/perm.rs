use bitflags::bitflags;

use super::ErrorCode;

bitflags! {
    /// Attribute permissions ([Vol 3] Part F, Section 3.2.5).
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct Perm: u8 {
        /// Attribute value may be read.
        const READ = 1 << 0;
        /// Attribute value may be written.
        const WRITE = 1 << 1;
        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
        /// Access requires an encrypted link.
        const ENCRYPT = 1 << 2;
        /// Access requires an authenticated link.
        const AUTHN = 1 << 3;
        /// Access requires authorization by the application.
        const AUTHZ = 1 << 4;
    }
}

/// Type of attribute access being requested.
#[allow(clippy::exhaustive_enums)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Access {
    Read,
    Write,
}

impl Perm {
    /// Returns whether the permission set allows the specified access type,
    /// or the ATT error to return to the client.
    #[inline]
    pub fn test(self, ac: Access) -> Result<(), ErrorCode> {
        match ac {
            Access::Read if !self.contains(Self::READ) => Err(ErrorCode::ReadNotPermitted),
            Access::Write if !self.contains(Self::WRITE) => Err(ErrorCode::WriteNotPermitted),
            _ => Ok(()),
        }
    }
}
