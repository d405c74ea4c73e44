use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeBounds;

use tracing::{debug, info};

use crate::assigned::Service as Svc;
use crate::att::{Handle, HandleRange, Perm, MAX_VAL_LEN};
use crate::Uuid;

use super::*;

mod check;
mod hash;
#[cfg(test)]
mod tests;

/// Stored value behind a value-bearing handle: a characteristic value or a
/// descriptor.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AttributeEntity {
    pub handle: Handle,
    pub perms: Perm,
    pub typ: Uuid,
    pub value: Vec<u8>,
}

/// Service structure. Values and permissions are kept in [`AttributeEntity`]
/// records.
#[derive(Clone, Debug)]
struct ServiceRec {
    range: HandleRange,
    uuid: Uuid,
    primary: bool,
    includes: Vec<IncludeService>,
    /// Characteristics keyed by declaration handle.
    chars: BTreeMap<Handle, CharRec>,
}

#[derive(Clone, Debug)]
struct CharRec {
    value_handle: Handle,
    end_handle: Handle,
    uuid: Uuid,
    props: Prop,
    descs: Vec<Handle>,
}

/// Mutable GATT server attribute database.
///
/// Admission of a service is all-or-nothing: every legality check runs before
/// handles are allocated or any record is inserted.
#[derive(Clone, Debug)]
pub struct Db {
    space: HandleRange,
    alloc: HandleAllocator,
    services: BTreeMap<Handle, ServiceRec>,
    attrs: BTreeMap<Handle, AttributeEntity>,
    /// Admitted services that may exist only once.
    singletons: BTreeSet<Uuid>,
}

impl Db {
    /// Creates an empty database using the handles in `space`.
    #[must_use]
    pub fn new(space: HandleRange) -> Self {
        Self {
            space,
            alloc: HandleAllocator::new(space),
            services: BTreeMap::new(),
            attrs: BTreeMap::new(),
            singletons: BTreeSet::new(),
        }
    }

    /// Validates a service definition without modifying the database.
    pub fn check(&self, def: &ServiceDef) -> Result<()> {
        check::service(def)?;
        for &h in &def.includes {
            if !self.services.contains_key(&h) {
                return Err(Error::IncludeServiceNotFound(h));
            }
        }
        if Self::is_singleton(def.uuid) && self.singletons.contains(&def.uuid) {
            return Err(Error::DuplicateService(def.uuid));
        }
        Ok(())
    }

    /// Admits a new service, assigning handles to the service declaration,
    /// includes, and each characteristic declaration, value, and descriptor in
    /// definition order. Returns the service handle.
    pub fn add_service(&mut self, def: &ServiceDef) -> Result<Handle> {
        self.check(def)?;
        let n = def.handle_count();
        let range = self.alloc.allocate(n).ok_or(Error::NotEnoughHandles(n))?;
        let mut hdls = range.iter();
        let mut next = || hdls.next().unwrap_or(range.end());

        let svc = next();
        let includes = (def.includes.iter())
            .filter_map(|h| self.services.get_key_value(h))
            .map(|(&h, inc)| IncludeService {
                handle: next(),
                start_handle: h,
                end_handle: inc.range.end(),
                uuid: inc.uuid,
                primary: inc.primary,
            })
            .collect();
        let mut chars = BTreeMap::new();
        for c in &def.characteristics {
            let (decl, value_handle) = (next(), next());
            self.insert_attr(value_handle, c.uuid, c.perms, c.value.clone());
            let descs: Vec<Handle> = (c.descriptors.iter())
                .map(|d| {
                    let h = next();
                    self.insert_attr(h, d.uuid, d.perms, d.value.clone());
                    h
                })
                .collect();
            let end_handle = descs.last().copied().unwrap_or(value_handle);
            let rec = CharRec {
                value_handle,
                end_handle,
                uuid: c.uuid,
                props: c.props,
                descs,
            };
            chars.insert(decl, rec);
        }
        debug_assert!(hdls.next().is_none(), "unused handles in {range:?}");

        if Self::is_singleton(def.uuid) {
            self.singletons.insert(def.uuid);
        }
        self.services.insert(
            svc,
            ServiceRec {
                range,
                uuid: def.uuid,
                primary: def.primary,
                includes,
                chars,
            },
        );
        info!("Added service {} at {range:?}", def.uuid);
        Ok(svc)
    }

    /// Removes the service at handle `h` and releases its handles. Fails if
    /// another service includes it. Returns the released handle range.
    pub fn delete_service(&mut self, h: Handle) -> Result<HandleRange> {
        let Some(s) = self.services.get(&h) else {
            return Err(Error::InvalidParameter("unknown service handle"));
        };
        if let Some((&by, _)) = (self.services.iter())
            .find(|&(_, other)| other.includes.iter().any(|i| i.start_handle == h))
        {
            return Err(Error::ReferencedByOtherService(h, by));
        }
        let (range, uuid) = (s.range, s.uuid);
        self.services.remove(&h);
        let hdls: Vec<Handle> = self.attrs.range(range).map(|(&h, _)| h).collect();
        for h in hdls {
            self.attrs.remove(&h);
        }
        self.singletons.remove(&uuid);
        self.alloc.release(range);
        info!("Removed service {uuid} at {range:?}");
        Ok(range)
    }

    /// Removes all services.
    pub fn clear(&mut self) {
        *self = Self::new(self.space);
        debug!("Cleared database");
    }

    /// Returns a snapshot of the service at handle `h`.
    #[must_use]
    pub fn service(&self, h: Handle) -> Option<Service> {
        self.services.get(&h).map(|s| self.service_snapshot(h, s))
    }

    /// Returns the handles of all services in ascending order.
    pub fn service_handles(&self) -> impl Iterator<Item = Handle> + '_ {
        self.services.keys().copied()
    }

    /// Returns the included services of the service at handle `h`.
    #[must_use]
    pub fn include_services(&self, h: Handle) -> Option<&[IncludeService]> {
        self.services.get(&h).map(|s| s.includes.as_slice())
    }

    /// Returns the include declaration at handle `h`.
    #[must_use]
    pub fn include_service(&self, h: Handle) -> Option<&IncludeService> {
        let (_, s) = self.service_containing(h)?;
        s.includes.iter().find(|i| i.handle == h)
    }

    /// Returns a snapshot of the characteristic with value handle `h`.
    #[must_use]
    pub fn characteristic(&self, h: Handle) -> Option<Characteristic> {
        let (_, s) = self.service_containing(h)?;
        let decl = h.prev()?;
        let c = s.chars.get(&decl).filter(|c| c.value_handle == h)?;
        Some(self.char_snapshot(decl, c))
    }

    /// Returns a snapshot of the descriptor at handle `h`.
    #[must_use]
    pub fn descriptor(&self, h: Handle) -> Option<Descriptor> {
        let (_, c) = self.char_containing(h)?;
        c.descs.contains(&h).then(|| self.attrs.get(&h)).flatten().map(desc_snapshot)
    }

    /// Returns a snapshot of the characteristic that owns descriptor `h`.
    #[must_use]
    pub fn descriptor_owner(&self, h: Handle) -> Option<Characteristic> {
        let (decl, c) = self.char_containing(h)?;
        c.descs.contains(&h).then(|| self.char_snapshot(decl, c))
    }

    /// Returns the attribute entity at handle `h`.
    #[inline]
    #[must_use]
    pub fn attr(&self, h: Handle) -> Option<&AttributeEntity> {
        self.attrs.get(&h)
    }

    /// Returns the handles of all value-bearing attributes in ascending order.
    pub fn value_handles(&self) -> impl Iterator<Item = Handle> + '_ {
        self.attrs.keys().copied()
    }

    /// Returns the handles of value-bearing attributes within `r`.
    pub fn value_handles_in(&self, r: HandleRange) -> impl Iterator<Item = Handle> + '_ {
        self.attrs.range(r).map(|(&h, _)| h)
    }

    /// Returns the value of attribute `h`.
    pub fn value(&self, h: Handle) -> Result<&[u8]> {
        (self.attrs.get(&h).map(|at| at.value.as_slice())).ok_or(Error::HandleNotFound(h))
    }

    /// Replaces the value of attribute `h`.
    pub fn set_value(&mut self, h: Handle, v: Vec<u8>) -> Result<()> {
        let at = self.attrs.get_mut(&h).ok_or(Error::HandleNotFound(h))?;
        if v.len() > MAX_VAL_LEN {
            return Err(Error::InvalidParameter("attribute value too long"));
        }
        at.value = v;
        Ok(())
    }

    /// Changes the properties of the characteristic with value handle `h` and
    /// the permissions of its value. The new properties must satisfy the same
    /// rules as at admission.
    pub fn set_char_perms(&mut self, h: Handle, props: Prop, perms: Perm) -> Result<()> {
        let (svc, decl) = {
            let (svc, s) = self.service_containing(h).ok_or(Error::HandleNotFound(h))?;
            let decl = h.prev().ok_or(Error::HandleNotFound(h))?;
            let c = (s.chars.get(&decl).filter(|c| c.value_handle == h))
                .ok_or(Error::HandleNotFound(h))?;
            check::props(c.uuid, props, perms)?;
            let types = c.descs.iter().filter_map(|d| self.attrs.get(d)).map(|at| at.typ);
            check::descriptors(c.uuid, props, types)?;
            (svc, decl)
        };
        if let Some(c) = (self.services.get_mut(&svc)).and_then(|s| s.chars.get_mut(&decl)) {
            c.props = props;
        }
        if let Some(at) = self.attrs.get_mut(&h) {
            at.perms = perms;
        }
        Ok(())
    }

    /// Returns the handle allocator state.
    #[inline(always)]
    #[must_use]
    pub const fn allocator(&self) -> &HandleAllocator {
        &self.alloc
    }

    /// Returns whether `uuid` identifies a service that may be admitted at
    /// most once.
    #[inline]
    fn is_singleton(uuid: Uuid) -> bool {
        Svc::try_from(uuid).map_or(false, Svc::singleton)
    }

    /// Returns the service whose handle range contains `h`.
    fn service_containing(&self, h: Handle) -> Option<(Handle, &ServiceRec)> {
        let (&sh, s) = self.services.range(..=h).next_back()?;
        s.range.contains(&h).then_some((sh, s))
    }

    /// Returns the characteristic whose handle range contains `h`.
    fn char_containing(&self, h: Handle) -> Option<(Handle, &CharRec)> {
        let (_, s) = self.service_containing(h)?;
        let (&decl, c) = s.chars.range(..=h).next_back()?;
        (h <= c.end_handle).then_some((decl, c))
    }

    fn insert_attr(&mut self, handle: Handle, typ: Uuid, perms: Perm, value: Vec<u8>) {
        let at = AttributeEntity {
            handle,
            perms,
            typ,
            value,
        };
        self.attrs.insert(handle, at);
    }

    fn service_snapshot(&self, h: Handle, s: &ServiceRec) -> Service {
        Service {
            handle: h,
            end_handle: s.range.end(),
            uuid: s.uuid,
            primary: s.primary,
            includes: s.includes.clone(),
            characteristics: (s.chars.iter())
                .map(|(&decl, c)| self.char_snapshot(decl, c))
                .collect(),
        }
    }

    fn char_snapshot(&self, decl: Handle, c: &CharRec) -> Characteristic {
        let val = self.attrs.get(&c.value_handle);
        Characteristic {
            handle: decl,
            value_handle: c.value_handle,
            end_handle: c.end_handle,
            uuid: c.uuid,
            props: c.props,
            perms: val.map_or(Perm::empty(), |at| at.perms),
            value: val.map(|at| at.value.clone()).unwrap_or_default(),
            descriptors: (c.descs.iter())
                .filter_map(|h| self.attrs.get(h))
                .map(desc_snapshot)
                .collect(),
        }
    }

    /// Returns an iterator over the service records in handle order.
    fn records(&self) -> impl Iterator<Item = (Handle, &ServiceRec)> {
        self.services.iter().map(|(&h, s)| (h, s))
    }
}

impl Default for Db {
    #[inline]
    fn default() -> Self {
        Self::new(HandleRange::ALL)
    }
}

fn desc_snapshot(at: &AttributeEntity) -> Descriptor {
    Descriptor {
        handle: at.handle,
        uuid: at.typ,
        perms: at.perms,
        value: at.value.clone(),
    }
}
