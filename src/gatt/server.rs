use std::collections::BTreeMap;
use std::ops::RangeBounds;
use std::sync::Arc;

use tracing::{debug, error, info, trace, warn};

use crate::assigned::Descriptor as Desc;
use crate::att::{Access, ErrorCode, Handle, HandleRange, Perm, MAX_VAL_LEN};
use crate::le::{Addr, ConnHandle, Role};

use super::*;


/// GATT server state: the attribute database, registered applications, and
/// live connections.
///
/// Every service and every value-bearing handle in the database is owned by
/// the application that added the service. Client requests are routed to the
/// owner as [`ServerEvent`]s and answered through the `respond_*` methods.
/// [`Server`] is not synchronized. [`GattServer`] runs it on a single task.
#[derive(Debug)]
pub struct Server {
    cfg: Config,
    transport: Arc<dyn Transport>,
    db: Db,
    enabled: bool,
    next_app: u32,
    apps: BTreeMap<AppId, Callback>,
    /// Service handle owners.
    services: BTreeMap<Handle, AppId>,
    /// Value-bearing handle owners and the services containing the handles.
    owners: BTreeMap<Handle, (AppId, Handle)>,
    conns: BTreeMap<ConnHandle, Connection>,
}

impl Server {
    /// Creates an enabled server without any applications or services.
    #[must_use]
    pub fn new(cfg: Config, transport: Arc<dyn Transport>) -> Self {
        let db = Db::new(cfg.handle_range);
        Self {
            cfg,
            transport,
            db,
            enabled: true,
            next_app: 0,
            apps: BTreeMap::new(),
            services: BTreeMap::new(),
            owners: BTreeMap::new(),
            conns: BTreeMap::new(),
        }
    }

    /// Enables the server, dropping all previously registered applications
    /// and their services.
    pub fn enable(&mut self) {
        self.apps.clear();
        self.services.clear();
        self.owners.clear();
        self.db.clear();
        for c in self.conns.values_mut() {
            c.retain_cccd(|_| false);
        }
        self.enabled = true;
        info!("GATT server enabled");
    }

    /// Disables the server. Application calls fail with [`Error::Disabled`]
    /// and client requests are dropped until the server is enabled again.
    pub fn disable(&mut self) {
        self.enabled = false;
        info!("GATT server disabled");
    }

    /// Returns whether the server is enabled.
    #[inline(always)]
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the attribute database.
    #[inline(always)]
    #[must_use]
    pub const fn db(&self) -> &Db {
        &self.db
    }

    /// Returns the connection with handle `cn`.
    #[inline]
    #[must_use]
    pub fn connection(&self, cn: ConnHandle) -> Option<&Connection> {
        self.conns.get(&cn)
    }

    /// Registers a new application.
    pub fn register_application(&mut self, cb: Callback) -> Result<AppId> {
        self.ensure_enabled()?;
        let max = self.cfg.max_applications;
        if self.apps.len() >= max {
            warn!("Application limit ({max}) reached");
            return Err(Error::MaxApplications(max));
        }
        let id = loop {
            self.next_app = self.next_app.wrapping_add(1);
            let id = AppId(self.next_app);
            if !self.apps.contains_key(&id) {
                break id;
            }
        };
        self.apps.insert(id, cb);
        info!("Registered application {id}");
        Ok(id)
    }

    /// Removes all services of application `app` and drops its registration.
    /// Deregistering an unknown application is a no-op.
    pub fn deregister_application(&mut self, app: AppId) -> Result<()> {
        self.ensure_enabled()?;
        if !self.apps.contains_key(&app) {
            debug!("Application {app} is not registered");
            return Ok(());
        }
        if let Err(e) = self.clear_services(app) {
            // Services included by other applications are removed once unreferenced
            warn!("Failed to remove all services of application {app}: {e}");
        }
        self.apps.remove(&app);
        info!("Deregistered application {app}");
        Ok(())
    }

    /// Adds a service owned by application `app`. The result is also
    /// delivered to `app` as [`ServerEvent::ServiceAdded`] and all other
    /// applications receive [`ServerEvent::ServiceChanged`].
    pub fn add_service(&mut self, app: AppId, def: &ServiceDef) -> Result<Handle> {
        self.ensure_enabled()?;
        let cb = self.app(app)?.clone();
        let h = match self.db.add_service(def) {
            Ok(h) => h,
            Err(e) => {
                warn!("Application {app} failed to add service {}: {e}", def.uuid);
                cb.call(ServerEvent::ServiceAdded {
                    status: e.status(),
                    service: None,
                });
                return Err(e);
            }
        };
        let svc = self.db.service(h);
        let range = svc.as_ref().map_or(HandleRange::new(h, h), Service::range);
        self.services.insert(h, app);
        for vh in self.db.value_handles_in(range) {
            self.owners.insert(vh, (app, h));
        }
        info!("Application {app} added service {} at {range:?}", def.uuid);
        cb.call(ServerEvent::ServiceAdded {
            status: GattStatus::Success,
            service: svc,
        });
        self.service_changed(app, range);
        Ok(h)
    }

    /// Removes service `h` owned by application `app`.
    pub fn remove_service(&mut self, app: AppId, h: Handle) -> Result<()> {
        self.ensure_enabled()?;
        self.app(app)?;
        match self.services.get(&h) {
            Some(&owner) if owner == app => {}
            Some(_) => return Err(Error::NotOwner(app, h)),
            None => return Err(Error::InvalidParameter("unknown service handle")),
        }
        self.drop_service(h)?;
        self.remove_orphans();
        Ok(())
    }

    /// Removes all services of application `app`. Services that are included
    /// by other services of the same application are removed after their
    /// dependents. Returns the first error for a service that could not be
    /// removed.
    pub fn clear_services(&mut self, app: AppId) -> Result<()> {
        self.ensure_enabled()?;
        self.app(app)?;
        loop {
            let hdls: Vec<Handle> = (self.services.iter())
                .filter_map(|(&h, &owner)| (owner == app).then_some(h))
                .collect();
            let (mut removed, mut err) = (false, None);
            for h in hdls {
                match self.remove_service(app, h) {
                    Ok(()) => removed = true,
                    Err(e) => {
                        err.get_or_insert(e);
                    }
                }
            }
            if !removed || err.is_none() {
                return err.map_or(Ok(()), Err);
            }
        }
    }

    /// Returns a snapshot of service `h`.
    #[inline]
    #[must_use]
    pub fn service(&self, h: Handle) -> Option<Service> {
        self.db.service(h)
    }

    /// Replaces the stored value of characteristic `vh`.
    pub fn set_characteristic_value(&mut self, app: AppId, vh: Handle, v: Vec<u8>) -> Result<()> {
        self.ensure_enabled()?;
        self.check_owner(app, vh)?;
        if self.db.characteristic(vh).is_none() {
            return Err(Error::HandleNotFound(vh));
        }
        self.db.set_value(vh, v)
    }

    /// Changes the properties of characteristic `vh` and the permissions of
    /// its value.
    pub fn set_characteristic_permission(
        &mut self,
        app: AppId,
        vh: Handle,
        props: Prop,
        perms: Perm,
    ) -> Result<()> {
        self.ensure_enabled()?;
        self.check_owner(app, vh)?;
        self.db.set_char_perms(vh, props, perms)
    }

    /// Sends `v` to `device` as a notification or, if `need_confirm` is set, an
    /// indication of characteristic `vh`. Nothing is sent unless the client
    /// enabled the corresponding Client Characteristic Configuration bit. An
    /// indication that cannot be sent is reported back to `app` as a failed
    /// [`ServerEvent::NotifyConfirm`]. The value is truncated to `ATT_MTU - 3`
    /// bytes.
    pub fn notify_client(
        &mut self,
        app: AppId,
        device: Addr,
        vh: Handle,
        v: &[u8],
        need_confirm: bool,
    ) -> Result<()> {
        self.ensure_enabled()?;
        self.check_owner(app, vh)?;
        let ch = self.db.characteristic(vh).ok_or(Error::HandleNotFound(vh))?;
        let Some(c) = self.conn_by_device(device) else {
            debug!("Dropping notification of {vh} for disconnected {device}");
            return Ok(());
        };
        let v = &v[..v.len().min(c.max_ntf_len())];
        let cfg = c.cccd(vh);
        if !need_confirm {
            if cfg.contains(Cccd::NOTIFY) {
                trace!("Notifying {device} of {vh}");
                self.transport.send_notification(c.handle, vh, v);
            } else {
                trace!("Notifications of {vh} not enabled by {device}");
            }
        } else if cfg.contains(Cccd::INDICATE) {
            trace!("Indicating {vh} to {device}");
            self.transport.send_indication(c.handle, vh, v);
        } else {
            debug!("Indications of {vh} not enabled by {device}");
            self.deliver(
                app,
                ServerEvent::NotifyConfirm {
                    device,
                    characteristic: ch,
                    status: GattStatus::GattFailure,
                },
            );
        }
        Ok(())
    }

    /// Responds to [`ServerEvent::CharacteristicReadRequest`].
    pub fn respond_characteristic_read(
        &self,
        app: AppId,
        device: Addr,
        vh: Handle,
        r: ReadResult,
    ) -> Result<()> {
        let cn = self.responder(app, device, vh)?;
        self.transport.send_read_rsp(cn, vh, r);
        Ok(())
    }

    /// Responds to [`ServerEvent::CharacteristicReadByUuidRequest`].
    pub fn respond_characteristic_read_by_uuid(
        &self,
        app: AppId,
        device: Addr,
        vh: Handle,
        r: ReadResult,
    ) -> Result<()> {
        let cn = self.responder(app, device, vh)?;
        self.transport.send_read_by_type_rsp(cn, vh, r);
        Ok(())
    }

    /// Responds to [`ServerEvent::CharacteristicWriteRequest`].
    pub fn respond_characteristic_write(
        &self,
        app: AppId,
        device: Addr,
        vh: Handle,
        r: WriteResult,
    ) -> Result<()> {
        let cn = self.responder(app, device, vh)?;
        self.transport.send_write_rsp(cn, vh, r);
        Ok(())
    }

    /// Responds to [`ServerEvent::DescriptorReadRequest`].
    pub fn respond_descriptor_read(
        &self,
        app: AppId,
        device: Addr,
        h: Handle,
        r: ReadResult,
    ) -> Result<()> {
        let cn = self.responder(app, device, h)?;
        self.transport.send_read_desc_rsp(cn, h, r);
        Ok(())
    }

    /// Responds to [`ServerEvent::DescriptorWriteRequest`].
    pub fn respond_descriptor_write(
        &self,
        app: AppId,
        device: Addr,
        h: Handle,
        r: WriteResult,
    ) -> Result<()> {
        let cn = self.responder(app, device, h)?;
        self.transport.send_write_desc_rsp(cn, h, r);
        Ok(())
    }

    /// Requests a disconnect from `device`. If the disconnect cannot be
    /// started, all applications receive a failed
    /// [`ServerEvent::ConnectionStateChanged`].
    pub fn cancel_connection(&mut self, app: AppId, device: Addr) -> Result<()> {
        self.ensure_enabled()?;
        self.app(app)?;
        info!("Application {app} is disconnecting {device}");
        if let Err(status) = self.transport.disconnect(device) {
            warn!("Failed to disconnect {device}: {status}");
            let state = if self.conn_by_device(device).is_some() {
                ConnState::Connected
            } else {
                ConnState::Disconnected
            };
            self.broadcast(&ServerEvent::ConnectionStateChanged {
                device,
                status,
                state,
            });
        }
        Ok(())
    }

    /// Handles link establishment. Only links where the local device is the
    /// peripheral are reported to applications.
    pub fn on_connect(&mut self, device: Addr, cn: ConnHandle, role: Role, status: GattStatus) {
        if !self.enabled {
            debug!("Server disabled, ignoring connection to {device}");
            return;
        }
        if !status.is_ok() {
            warn!("Connection to {device} failed: {status}");
        } else {
            info!("Connected to {device} ({cn}, {role:?})");
            self.conns.insert(cn, Connection::new(cn, device, role));
        }
        if role == Role::Peripheral {
            let state = if status.is_ok() {
                ConnState::Connected
            } else {
                ConnState::Disconnected
            };
            self.broadcast(&ServerEvent::ConnectionStateChanged {
                device,
                status,
                state,
            });
        }
    }

    /// Handles link termination. The connection is found by handle or, if the
    /// handle is unknown, by device address.
    pub fn on_disconnect(&mut self, device: Addr, cn: ConnHandle, status: GattStatus) {
        let key = if self.conns.contains_key(&cn) {
            Some(cn)
        } else {
            self.conn_by_device(device).map(|c| c.handle)
        };
        let Some(c) = key.and_then(|k| self.conns.remove(&k)) else {
            debug!("Disconnect of unknown device {device} ({cn})");
            return;
        };
        info!("Disconnected from {} ({}): {status}", c.device, c.handle);
        if self.enabled && c.role == Role::Peripheral {
            self.broadcast(&ServerEvent::ConnectionStateChanged {
                device: c.device,
                status,
                state: ConnState::Disconnected,
            });
        }
    }

    /// Handles a link state change reported by the connection manager.
    /// [`ConnState::Connected`] is reported by [`Self::on_connect`] instead and
    /// is ignored here.
    pub fn on_connection_state_changed(
        &mut self,
        device: Addr,
        status: GattStatus,
        state: ConnState,
    ) {
        if !self.enabled || state == ConnState::Connected {
            trace!("Ignoring {state:?} state of {device}");
            return;
        }
        debug!("Connection state of {device}: {state:?} ({status})");
        self.broadcast(&ServerEvent::ConnectionStateChanged {
            device,
            status,
            state,
        });
    }

    /// Handles a connection parameter update.
    pub fn on_connection_parameter_changed(
        &mut self,
        device: Addr,
        params: ConnParams,
        status: GattStatus,
    ) {
        if !self.enabled {
            return;
        }
        debug!("Connection parameters of {device}: {params:?} ({status})");
        self.broadcast(&ServerEvent::ConnectionParameterChanged {
            device,
            params,
            status,
        });
    }

    /// Handles ATT_EXCHANGE_MTU_REQ ([Vol 3] Part F, Section 3.4.2.1).
    pub fn on_exchange_mtu(&mut self, cn: ConnHandle, client_mtu: u16) {
        if !self.enabled {
            return;
        }
        let server_mtu = self.cfg.mtu();
        let Some(c) = self.conns.get_mut(&cn) else {
            warn!("MTU exchange on unknown connection {cn}");
            return;
        };
        self.transport.send_exchange_mtu_rsp(cn, server_mtu);
        let mtu = c.exchange_mtu(client_mtu, server_mtu);
        let device = c.device;
        debug!("ATT_MTU for {device} is {mtu}");
        self.broadcast(&ServerEvent::MtuChanged { device, mtu });
    }

    /// Handles a characteristic value or descriptor read request.
    pub fn on_read(&mut self, cn: ConnHandle, h: Handle) {
        self.read(cn, h, false);
    }

    /// Handles a read-by-type request that matched characteristic value `h`.
    pub fn on_read_by_type(&mut self, cn: ConnHandle, h: Handle) {
        self.read(cn, h, true);
    }

    /// Handles a characteristic value or descriptor write. `need_rsp` is
    /// `false` for write commands.
    pub fn on_write(&mut self, cn: ConnHandle, h: Handle, v: Vec<u8>, need_rsp: bool) {
        if !self.enabled {
            return;
        }
        let Some(device) = self.conns.get(&cn).map(|c| c.device) else {
            warn!("Write from unknown connection {cn}");
            return;
        };
        if let Some(mut ch) = self.db.characteristic(h) {
            let r = if ch.props.intersects(Prop::ANY_WRITE) {
                ch.perms.test(Access::Write)
            } else {
                Err(ErrorCode::WriteNotPermitted)
            };
            let r = r.and_then(|_| valid_len(&v));
            let Some(app) = r.ok().and_then(|_| self.owner(h)) else {
                let e = r.err().unwrap_or(ErrorCode::UnlikelyError);
                debug!("Write of {h} by {device} rejected: {e}");
                if need_rsp {
                    self.transport.send_write_rsp(cn, h, Err(e));
                }
                return;
            };
            ch.value = v;
            self.deliver(
                app,
                ServerEvent::CharacteristicWriteRequest {
                    device,
                    characteristic: ch,
                    need_rsp,
                },
            );
        } else if let Some(mut d) = self.db.descriptor(h) {
            let r = d.perms.test(Access::Write).and_then(|_| valid_len(&v));
            let r = r.and_then(|_| {
                if d.uuid != Desc::ClientCharacteristicConfiguration {
                    return Ok(None);
                }
                let cfg = Cccd::from_value(&v).ok_or(ErrorCode::InvalidAttributeValueLength)?;
                let props = self.db.descriptor_owner(h).map_or(Prop::empty(), |ch| ch.props);
                (cccd_allowed(cfg, props).then_some(Some(cfg)))
                    .ok_or(ErrorCode::CccdImproperlyConfigured)
            });
            let Some(app) = r.ok().and_then(|_| self.owner(h)) else {
                let e = r.err().unwrap_or(ErrorCode::UnlikelyError);
                debug!("Write of {h} by {device} rejected: {e}");
                if need_rsp {
                    self.transport.send_write_desc_rsp(cn, h, Err(e));
                }
                return;
            };
            let mut need_rsp = need_rsp;
            if let Ok(Some(cfg)) = r {
                self.set_cccd(cn, h, cfg);
                if need_rsp {
                    self.transport.send_write_desc_rsp(cn, h, Ok(()));
                    need_rsp = false;
                }
            }
            d.value = v;
            self.deliver(
                app,
                ServerEvent::DescriptorWriteRequest {
                    device,
                    descriptor: d,
                    need_rsp,
                },
            );
        } else {
            debug!("Write of invalid handle {h} by {device}");
            if need_rsp {
                self.transport.send_write_rsp(cn, h, Err(ErrorCode::InvalidHandle));
            }
        }
    }

    /// Handles ATT_HANDLE_VALUE_CFM or an indication failure.
    pub fn on_indication_confirm(&mut self, cn: ConnHandle, vh: Handle, status: GattStatus) {
        if !self.enabled {
            return;
        }
        let Some(device) = self.conns.get(&cn).map(|c| c.device) else {
            warn!("Indication confirmation from unknown connection {cn}");
            return;
        };
        let Some(ch) = self.db.characteristic(vh) else {
            warn!("Indication confirmation for invalid handle {vh}");
            return;
        };
        if let Some(app) = self.owner(vh) {
            let e = ServerEvent::NotifyConfirm {
                device,
                characteristic: ch,
                status,
            };
            self.deliver(app, e);
        }
    }

    /// Routes a read request to the attribute owner or answers it directly
    /// for permission failures and Client Characteristic Configuration
    /// descriptors.
    fn read(&self, cn: ConnHandle, h: Handle, by_type: bool) {
        if !self.enabled {
            return;
        }
        let Some(c) = self.conns.get(&cn) else {
            warn!("Read from unknown connection {cn}");
            return;
        };
        let device = c.device;
        if let Some(ch) = self.db.characteristic(h) {
            let r = if ch.props.contains(Prop::READ) {
                ch.perms.test(Access::Read)
            } else {
                Err(ErrorCode::ReadNotPermitted)
            };
            let Some(app) = r.ok().and_then(|_| self.owner(h)) else {
                let e = r.err().unwrap_or(ErrorCode::UnlikelyError);
                debug!("Read of {h} by {device} rejected: {e}");
                if by_type {
                    self.transport.send_read_by_type_rsp(cn, h, Err(e));
                } else {
                    self.transport.send_read_rsp(cn, h, Err(e));
                }
                return;
            };
            let e = if by_type {
                ServerEvent::CharacteristicReadByUuidRequest {
                    device,
                    characteristic: ch,
                }
            } else {
                ServerEvent::CharacteristicReadRequest {
                    device,
                    characteristic: ch,
                }
            };
            self.deliver(app, e);
        } else if let (false, Some(d)) = (by_type, self.db.descriptor(h)) {
            if let Err(e) = d.perms.test(Access::Read) {
                debug!("Read of {h} by {device} rejected: {e}");
                self.transport.send_read_desc_rsp(cn, h, Err(e));
            } else if d.uuid == Desc::ClientCharacteristicConfiguration {
                let vh = self.db.descriptor_owner(h).map(|ch| ch.value_handle);
                let v = vh.map_or(Cccd::empty(), |vh| c.cccd(vh)).to_value();
                self.transport.send_read_desc_rsp(cn, h, Ok(&v[..]));
            } else if let Some(app) = self.owner(h) {
                self.deliver(
                    app,
                    ServerEvent::DescriptorReadRequest {
                        device,
                        descriptor: d,
                    },
                );
            } else {
                self.transport.send_read_desc_rsp(cn, h, Err(ErrorCode::UnlikelyError));
            }
        } else {
            debug!("Read of invalid handle {h} by {device}");
            if by_type {
                self.transport.send_read_by_type_rsp(cn, h, Err(ErrorCode::AttributeNotFound));
            } else {
                self.transport.send_read_rsp(cn, h, Err(ErrorCode::InvalidHandle));
            }
        }
    }

    /// Deletes service `h` from the database together with its ownership
    /// records and client configuration.
    fn drop_service(&mut self, h: Handle) -> Result<()> {
        let range = self.db.delete_service(h)?;
        let app = self.services.remove(&h);
        self.owners.retain(|vh, _| !range.contains(vh));
        for c in self.conns.values_mut() {
            c.retain_cccd(|vh| !range.contains(&vh));
        }
        if let Some(app) = app {
            info!("Removed service of application {app} at {range:?}");
            self.service_changed(app, range);
        }
        Ok(())
    }

    /// Removes services of deregistered applications that are no longer
    /// included by any other service.
    fn remove_orphans(&mut self) {
        loop {
            let orphans: Vec<Handle> = (self.services.iter())
                .filter_map(|(&h, app)| (!self.apps.contains_key(app)).then_some(h))
                .collect();
            let removed = (orphans.into_iter())
                .filter(|&h| self.drop_service(h).is_ok())
                .count();
            if removed == 0 {
                return;
            }
            debug!("Removed {removed} orphaned service(s)");
        }
    }

    /// Stores the client configuration written to CCCD `h`.
    fn set_cccd(&mut self, cn: ConnHandle, h: Handle, cfg: Cccd) {
        let Some(vh) = self.db.descriptor_owner(h).map(|ch| ch.value_handle) else {
            return;
        };
        if let Some(c) = self.conns.get_mut(&cn) {
            debug!("{} configured {vh} with {cfg:?}", c.device);
            c.set_cccd(vh, cfg);
        }
    }

    /// Validates a response call and returns the connection handle of
    /// `device`.
    fn responder(&self, app: AppId, device: Addr, h: Handle) -> Result<ConnHandle> {
        self.ensure_enabled()?;
        self.check_owner(app, h)?;
        self.conn_by_device(device).map(|c| c.handle).ok_or_else(|| {
            debug!("Dropping response for disconnected {device}");
            Error::NotConnected(device)
        })
    }

    /// Returns the registered owner of attribute `h`. Attributes of services
    /// left behind by deregistered applications have no registered owner. A
    /// value-bearing attribute without any owner means that the router and
    /// the database are out of sync.
    fn owner(&self, h: Handle) -> Option<AppId> {
        let entry = self.owners.get(&h);
        if entry.is_none() {
            error!("Attribute {h} has no owner");
        }
        debug_assert!(entry.is_some(), "attribute {h} has no owner");
        let &(app, _) = entry?;
        if self.apps.contains_key(&app) {
            Some(app)
        } else {
            debug!("Attribute {h} belongs to deregistered application {app}");
            None
        }
    }

    /// Verifies that application `app` owns attribute `h`.
    fn check_owner(&self, app: AppId, h: Handle) -> Result<()> {
        self.app(app)?;
        match self.owners.get(&h) {
            Some(&(owner, _)) if owner == app => Ok(()),
            Some(&(_, svc)) => Err(Error::NotOwner(app, svc)),
            None => Err(Error::HandleNotFound(h)),
        }
    }

    #[inline]
    fn app(&self, app: AppId) -> Result<&Callback> {
        self.apps.get(&app).ok_or(Error::InvalidApplication(app))
    }

    #[inline]
    const fn ensure_enabled(&self) -> Result<()> {
        if self.enabled {
            Ok(())
        } else {
            Err(Error::Disabled)
        }
    }

    fn conn_by_device(&self, device: Addr) -> Option<&Connection> {
        self.conns.values().find(|c| c.device == device)
    }

    /// Delivers an event to application `app`.
    fn deliver(&self, app: AppId, e: ServerEvent) {
        match self.apps.get(&app) {
            Some(cb) => cb.call(e),
            None => debug!("Dropping event for unregistered application {app}: {e:?}"),
        }
    }

    /// Delivers an event to all applications.
    fn broadcast(&self, e: &ServerEvent) {
        for cb in self.apps.values() {
            cb.call(e.clone());
        }
    }

    /// Notifies all applications except `app` that the services in `range`
    /// changed.
    fn service_changed(&self, app: AppId, range: HandleRange) {
        for (_, cb) in self.apps.iter().filter(|&(&id, _)| id != app) {
            cb.call(ServerEvent::ServiceChanged { range });
        }
    }
}

/// Returns whether client configuration `cfg` only enables what the
/// characteristic properties permit.
#[inline]
const fn cccd_allowed(cfg: Cccd, props: Prop) -> bool {
    (!cfg.contains(Cccd::NOTIFY) || props.contains(Prop::NOTIFY))
        && (!cfg.contains(Cccd::INDICATE) || props.contains(Prop::INDICATE))
}

/// Checks the length of a written attribute value.
#[inline]
fn valid_len(v: &[u8]) -> std::result::Result<(), ErrorCode> {
    if v.len() <= MAX_VAL_LEN {
        Ok(())
    } else {
        Err(ErrorCode::InvalidAttributeValueLength)
    }
}
