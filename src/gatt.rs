//! Generic Attribute Profile server ([Vol 3] Part G).
//!
//! [`Db`] stores the attribute table and allocates handles through
//! [`HandleAllocator`]. [`Server`] owns the database together with registered
//! applications and live connections, routing client requests to the
//! application that owns each attribute. [`GattServer`] runs a [`Server`] on a
//! single task and serializes all calls into it.

use std::fmt::{Debug, Display, Formatter};

pub use {
    alloc::*, config::*, conn::*, consts::*, db::*, event::*, exec::*, schema::*, server::*,
    transport::*,
};

use crate::att::Handle;
use crate::le::Addr;
use crate::Uuid;

mod alloc;
mod config;
mod conn;
mod consts;
mod db;
mod event;
mod exec;
mod schema;
mod server;
mod transport;

/// Error type returned by the GATT server.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),
    #[error("not enough free handles for {0} attributes")]
    NotEnoughHandles(usize),
    #[error("service {0} is included by service {1}")]
    ReferencedByOtherService(Handle, Handle),
    #[error("attribute {0} not found")]
    HandleNotFound(Handle),
    #[error("included service {0} not found")]
    IncludeServiceNotFound(Handle),
    #[error("invalid characteristic {0}: {1}")]
    InvalidCharacteristic(Uuid, &'static str),
    #[error("invalid value for characteristic {0}")]
    InvalidCharacteristicData(Uuid),
    #[error("invalid descriptors for characteristic {0}: {1}")]
    InvalidCharacteristicDescriptor(Uuid, DescriptorRule),
    #[error("invalid value for descriptor {0}")]
    InvalidCharacteristicDescriptorData(Uuid),
    #[error("only one instance of the {0} service is allowed")]
    DuplicateService(Uuid),
    #[error("maximum number of applications ({0}) reached")]
    MaxApplications(usize),
    #[error("unknown application {0}")]
    InvalidApplication(AppId),
    #[error("service {1} is not owned by application {0}")]
    NotOwner(AppId, Handle),
    #[error("device {0} is not connected")]
    NotConnected(Addr),
    #[error("server is disabled")]
    Disabled,
    #[error("server is shut down")]
    Shutdown,
}

impl Error {
    /// Returns the status code reported to applications for this error.
    #[must_use]
    pub const fn status(&self) -> GattStatus {
        use GattStatus as S;
        match *self {
            Self::InvalidParameter(_) => S::InvalidParameter,
            Self::NotEnoughHandles(_) => S::NotEnoughHandles,
            Self::ReferencedByOtherService(..) => S::ReferencedByOtherService,
            Self::HandleNotFound(_) => S::HandleNotFound,
            Self::IncludeServiceNotFound(_) => S::IncludeServiceNotFound,
            Self::InvalidCharacteristic(..) => S::InvalidCharacteristic,
            Self::InvalidCharacteristicData(_) => S::InvalidCharacteristicData,
            Self::InvalidCharacteristicDescriptor(..) => S::InvalidCharacteristicDescriptor,
            Self::InvalidCharacteristicDescriptorData(_) => S::InvalidCharacteristicDescriptorData,
            Self::DuplicateService(_) | Self::Disabled | Self::Shutdown => S::RequestNotSupport,
            Self::MaxApplications(_) => S::MaxApplications,
            Self::InvalidApplication(_) | Self::NotOwner(..) => S::GattFailure,
            Self::NotConnected(_) => S::InvalidRemoteDevice,
        }
    }
}

/// Common GATT result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Descriptor cardinality rule violated by a characteristic definition
/// ([Vol 3] Part G, Section 3.3.3).
#[allow(clippy::exhaustive_enums)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DescriptorRule {
    /// `BROADCAST` requires exactly one Server Characteristic Configuration
    /// descriptor. It may not appear more than once otherwise.
    Sccd,
    /// `NOTIFY` or `INDICATE` requires exactly one Client Characteristic
    /// Configuration descriptor. It may not appear more than once otherwise.
    Cccd,
    /// `EXTENDED_PROPERTIES` requires exactly one Extended Properties
    /// descriptor, which may not appear otherwise.
    ExtProps,
    /// At most one User Description descriptor.
    UserDescription,
    /// Multiple Presentation Format descriptors require an Aggregate Format
    /// descriptor.
    AggregateFormat,
}

impl Display for DescriptorRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match *self {
            Self::Sccd => "expected one Server Characteristic Configuration descriptor",
            Self::Cccd => "expected one Client Characteristic Configuration descriptor",
            Self::ExtProps => "expected one Characteristic Extended Properties descriptor",
            Self::UserDescription => "more than one Characteristic User Description descriptor",
            Self::AggregateFormat => "missing Characteristic Aggregate Format descriptor",
        })
    }
}

/// Status code delivered to applications in events and results.
#[derive(
    Clone, Copy, Debug, Eq, Hash, PartialEq, num_enum::IntoPrimitive, num_enum::TryFromPrimitive,
)]
#[non_exhaustive]
#[repr(i32)]
pub enum GattStatus {
    InvalidRemoteDevice = -29,
    IncludeServiceNotFound = -28,
    ReferencedByOtherService = -27,
    InvalidCharacteristic = -26,
    InvalidCharacteristicData = -25,
    InvalidCharacteristicDescriptor = -24,
    InvalidCharacteristicDescriptorData = -23,
    NotEnoughHandles = -22,
    HandleNotFound = -21,
    InvalidParameter = -20,
    InternalError = -19,
    RequestNotSupport = -18,
    RemoteDeviceBusy = -17,
    MaxConnections = -16,
    MaxApplications = -15,
    DeviceAlreadyBind = -14,
    InvalidHandle = -13,
    InvalidOffset = -12,
    ReadNotPermitted = -11,
    WriteNotPermitted = -10,
    InsufficientEncryption = -9,
    InsufficientAuthentication = -8,
    InsufficientAuthorization = -7,
    InsufficientEncryptionKeySize = -6,
    PrepareQueueFull = -5,
    AttributeNotLong = -4,
    InvalidAttributeValueLength = -3,
    WriteRequestRejected = -2,
    GattFailure = -1,
    Success = 0,
}

impl GattStatus {
    /// Returns whether the status indicates success.
    #[inline(always)]
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Success)
    }
}

crate::util::impl_display_via_debug! { GattStatus }

/// Registered application identifier. Identifiers are assigned from a
/// monotonic counter and are not reused while registered.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct AppId(u32);

impl AppId {
    /// Wraps a raw application identifier.
    #[inline(always)]
    #[must_use]
    pub const fn new(v: u32) -> Self {
        Self(v)
    }
}

impl From<AppId> for u32 {
    #[inline(always)]
    fn from(id: AppId) -> Self {
        id.0
    }
}

impl Debug for AppId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", crate::util::name_of!(AppId), self.0)
    }
}

impl Display for AppId {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self, f)
    }
}
