//! Service definitions supplied by applications and the snapshots of admitted
//! services returned by the database.

use crate::assigned::Descriptor as Desc;
use crate::att::{Handle, HandleRange, Perm};
use crate::Uuid;

use super::{Cccd, Prop};

/// Service definition passed to [`Server::add_service`](super::Server).
/// Handles are assigned by the database on admission.
#[derive(Clone, Debug, Eq, PartialEq)]
#[must_use]
pub struct ServiceDef {
    pub uuid: Uuid,
    pub primary: bool,
    /// Handles of existing services to include.
    pub includes: Vec<Handle>,
    pub characteristics: Vec<CharacteristicDef>,
}

impl ServiceDef {
    /// Creates an empty primary service definition.
    #[inline]
    pub fn primary(uuid: impl Into<Uuid>) -> Self {
        Self {
            uuid: uuid.into(),
            primary: true,
            includes: Vec::new(),
            characteristics: Vec::new(),
        }
    }

    /// Creates an empty secondary service definition.
    #[inline]
    pub fn secondary(uuid: impl Into<Uuid>) -> Self {
        Self {
            primary: false,
            ..Self::primary(uuid)
        }
    }

    /// Adds an include declaration for the service at handle `h`.
    #[inline]
    pub fn include(mut self, h: Handle) -> Self {
        self.includes.push(h);
        self
    }

    /// Adds a characteristic definition.
    #[inline]
    pub fn characteristic(mut self, c: CharacteristicDef) -> Self {
        self.characteristics.push(c);
        self
    }

    /// Returns the number of handles required by the service: one for the
    /// service declaration, one per include, two per characteristic, and one
    /// per descriptor.
    #[must_use]
    pub fn handle_count(&self) -> usize {
        (self.characteristics.iter())
            .fold(1 + self.includes.len(), |n, c| n + 2 + c.descriptors.len())
    }
}

/// Characteristic definition.
#[derive(Clone, Debug, Eq, PartialEq)]
#[must_use]
pub struct CharacteristicDef {
    pub uuid: Uuid,
    pub props: Prop,
    /// Permissions of the characteristic value.
    pub perms: Perm,
    /// Initial characteristic value.
    pub value: Vec<u8>,
    pub descriptors: Vec<DescriptorDef>,
}

impl CharacteristicDef {
    /// Creates a characteristic definition without descriptors.
    #[inline]
    pub fn new(uuid: impl Into<Uuid>, props: Prop, perms: Perm, value: impl Into<Vec<u8>>) -> Self {
        Self {
            uuid: uuid.into(),
            props,
            perms,
            value: value.into(),
            descriptors: Vec::new(),
        }
    }

    /// Adds a descriptor definition.
    #[inline]
    pub fn descriptor(mut self, d: DescriptorDef) -> Self {
        self.descriptors.push(d);
        self
    }
}

/// Descriptor definition.
#[derive(Clone, Debug, Eq, PartialEq)]
#[must_use]
pub struct DescriptorDef {
    pub uuid: Uuid,
    pub perms: Perm,
    pub value: Vec<u8>,
}

impl DescriptorDef {
    /// Creates a descriptor definition.
    #[inline]
    pub fn new(uuid: impl Into<Uuid>, perms: Perm, value: impl Into<Vec<u8>>) -> Self {
        Self {
            uuid: uuid.into(),
            perms,
            value: value.into(),
        }
    }

    /// Creates a Client Characteristic Configuration descriptor with
    /// notifications and indications disabled.
    #[inline]
    pub fn cccd() -> Self {
        Self::new(
            Desc::ClientCharacteristicConfiguration,
            Perm::READ_WRITE,
            Cccd::empty().to_value(),
        )
    }

    /// Creates a read-only Characteristic User Description descriptor.
    #[inline]
    pub fn user_description(s: &str) -> Self {
        Self::new(Desc::CharacteristicUserDescription, Perm::READ, s.as_bytes())
    }
}

/// Snapshot of an admitted service.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Service {
    pub handle: Handle,
    pub end_handle: Handle,
    pub uuid: Uuid,
    pub primary: bool,
    pub includes: Vec<IncludeService>,
    pub characteristics: Vec<Characteristic>,
}

impl Service {
    /// Returns the service handle range.
    #[inline]
    pub const fn range(&self) -> HandleRange {
        HandleRange::new(self.handle, self.end_handle)
    }

    /// Returns the characteristic with value handle `h`.
    #[must_use]
    pub fn characteristic(&self, h: Handle) -> Option<&Characteristic> {
        self.characteristics.iter().find(|c| c.value_handle == h)
    }
}

/// Include declaration resolved against the included service at admission.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IncludeService {
    /// Handle of the include declaration.
    pub handle: Handle,
    pub start_handle: Handle,
    pub end_handle: Handle,
    pub uuid: Uuid,
    pub primary: bool,
}

/// Snapshot of a characteristic, including its current value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Characteristic {
    /// Handle of the characteristic declaration.
    pub handle: Handle,
    pub value_handle: Handle,
    /// Last handle of the characteristic: the last descriptor, or the value
    /// handle if there are no descriptors.
    pub end_handle: Handle,
    pub uuid: Uuid,
    pub props: Prop,
    pub perms: Perm,
    pub value: Vec<u8>,
    pub descriptors: Vec<Descriptor>,
}

impl Characteristic {
    /// Returns the first descriptor of the specified type.
    #[must_use]
    pub fn descriptor(&self, typ: impl Into<Uuid>) -> Option<&Descriptor> {
        let typ = typ.into();
        self.descriptors.iter().find(|d| d.uuid == typ)
    }
}

/// Snapshot of a descriptor, including its current value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Descriptor {
    pub handle: Handle,
    pub uuid: Uuid,
    pub perms: Perm,
    pub value: Vec<u8>,
}
