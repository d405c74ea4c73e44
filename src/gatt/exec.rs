use std::collections::BTreeSet;
use std::ops::RangeBounds;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::att::{ErrorCode, Handle, HandleRange, Perm};
use crate::le::{Addr, ConnHandle, Role};

use super::*;

/// Unit of work executed by the server task.
type Task = Box<dyn FnOnce(&mut Server) + Send>;

/// Cloneable handle to a [`Server`] running on its own task.
///
/// All calls are posted to the task and executed in order, so server state is
/// never accessed concurrently. Calls that return a value wait for the task to
/// execute them. All other application calls are checked for a disabled
/// server, an unknown application, or a handle outside of the database, and
/// return as soon as the task is posted. Their remaining
/// outcome is delivered to the application as a [`ServerEvent`] or logged.
/// After [`GattServer::shutdown`] every call fails with [`Error::Shutdown`].
#[derive(Clone, Debug)]
pub struct GattServer {
    tx: mpsc::UnboundedSender<Task>,
    c: CancellationToken,
    h: Arc<Mutex<Option<JoinHandle<()>>>>,
    gate: Arc<RwLock<Gate>>,
}

/// Server state needed to reject application calls before they are posted.
#[derive(Debug)]
struct Gate {
    enabled: bool,
    apps: BTreeSet<AppId>,
    space: HandleRange,
}

impl Gate {
    /// Checks that the server is enabled, `app` is registered, and `h`, if
    /// any, is within the database handle space.
    fn check(&self, app: AppId, h: Option<Handle>) -> Result<()> {
        if !self.enabled {
            return Err(Error::Disabled);
        }
        if !self.apps.contains(&app) {
            return Err(Error::InvalidApplication(app));
        }
        match h {
            Some(h) if !self.space.contains(&h) => {
                Err(Error::InvalidParameter("handle outside of database"))
            }
            _ => Ok(()),
        }
    }
}

impl GattServer {
    /// Spawns the server task. Must be called within a Tokio runtime.
    #[must_use]
    pub fn new(cfg: Config, transport: Arc<dyn Transport>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let c = CancellationToken::new();
        let gate = Gate {
            enabled: true,
            apps: BTreeSet::new(),
            space: cfg.handle_range,
        };
        let srv = Server::new(cfg, transport);
        let h = tokio::spawn(Self::run(srv, rx, c.clone()));
        Self {
            tx,
            c,
            h: Arc::new(Mutex::new(Some(h))),
            gate: Arc::new(RwLock::new(gate)),
        }
    }

    /// Stops the server task and waits for it to exit. Pending calls are
    /// dropped.
    pub async fn shutdown(&self) {
        self.c.cancel();
        let Some(h) = self.h.lock().take() else {
            return;
        };
        if let Err(e) = h.await {
            error!("GATT server task failed: {e}");
        }
    }

    /// Posts a task without waiting for it to execute.
    pub fn post(&self, f: impl FnOnce(&mut Server) + Send + 'static) -> Result<()> {
        if self.c.is_cancelled() {
            return Err(Error::Shutdown);
        }
        self.tx.send(Box::new(f)).map_err(|_| Error::Shutdown)
    }

    /// Executes `f` on the server task and returns its result.
    pub async fn call<R: Send + 'static>(
        &self,
        f: impl FnOnce(&mut Server) -> R + Send + 'static,
    ) -> Result<R> {
        let (tx, rx) = oneshot::channel();
        self.post(move |s| {
            // Caller may have stopped waiting
            let _ = tx.send(f(s));
        })?;
        rx.await.map_err(|_| Error::Shutdown)
    }

    /// Registers a new application.
    pub async fn register_application(&self, cb: Callback) -> Result<AppId> {
        let gate = Arc::clone(&self.gate);
        (self.call(move |s| {
            let id = s.register_application(cb)?;
            gate.write().apps.insert(id);
            Ok(id)
        }))
        .await?
    }

    /// Removes all services of an application and drops its registration.
    pub async fn deregister_application(&self, app: AppId) -> Result<()> {
        let gate = Arc::clone(&self.gate);
        (self.call(move |s| {
            s.deregister_application(app)?;
            gate.write().apps.remove(&app);
            Ok(())
        }))
        .await?
    }

    /// Adds a service owned by application `app`.
    pub async fn add_service(&self, app: AppId, def: ServiceDef) -> Result<Handle> {
        self.call(move |s| s.add_service(app, &def)).await?
    }

    /// Returns a snapshot of service `h`.
    pub async fn service(&self, h: Handle) -> Result<Option<Service>> {
        self.call(move |s| s.service(h)).await
    }

    /// Returns the current database hash.
    pub async fn db_hash(&self) -> Result<u128> {
        self.call(|s| s.db().hash()).await
    }

    /// Enables the server, dropping all applications.
    pub fn enable(&self) -> Result<()> {
        self.post(Server::enable)?;
        let mut g = self.gate.write();
        g.enabled = true;
        g.apps.clear();
        Ok(())
    }

    /// Disables the server.
    pub fn disable(&self) -> Result<()> {
        self.post(Server::disable)?;
        self.gate.write().enabled = false;
        Ok(())
    }

    pub fn remove_service(&self, app: AppId, h: Handle) -> Result<()> {
        self.post_app("remove_service", app, Some(h), move |s| s.remove_service(app, h))
    }

    pub fn clear_services(&self, app: AppId) -> Result<()> {
        self.post_app("clear_services", app, None, move |s| s.clear_services(app))
    }

    pub fn set_characteristic_value(&self, app: AppId, vh: Handle, v: Vec<u8>) -> Result<()> {
        self.post_app("set_characteristic_value", app, Some(vh), move |s| {
            s.set_characteristic_value(app, vh, v)
        })
    }

    pub fn set_characteristic_permission(
        &self,
        app: AppId,
        vh: Handle,
        props: Prop,
        perms: Perm,
    ) -> Result<()> {
        self.post_app("set_characteristic_permission", app, Some(vh), move |s| {
            s.set_characteristic_permission(app, vh, props, perms)
        })
    }

    pub fn notify_client(
        &self,
        app: AppId,
        device: Addr,
        vh: Handle,
        v: Vec<u8>,
        need_confirm: bool,
    ) -> Result<()> {
        self.post_app("notify_client", app, Some(vh), move |s| {
            s.notify_client(app, device, vh, &v, need_confirm)
        })
    }

    pub fn respond_characteristic_read(
        &self,
        app: AppId,
        device: Addr,
        vh: Handle,
        r: std::result::Result<Vec<u8>, ErrorCode>,
    ) -> Result<()> {
        self.post_app("respond_characteristic_read", app, Some(vh), move |s| {
            s.respond_characteristic_read(app, device, vh, borrowed(&r))
        })
    }

    pub fn respond_characteristic_read_by_uuid(
        &self,
        app: AppId,
        device: Addr,
        vh: Handle,
        r: std::result::Result<Vec<u8>, ErrorCode>,
    ) -> Result<()> {
        self.post_app("respond_characteristic_read_by_uuid", app, Some(vh), move |s| {
            s.respond_characteristic_read_by_uuid(app, device, vh, borrowed(&r))
        })
    }

    pub fn respond_characteristic_write(
        &self,
        app: AppId,
        device: Addr,
        vh: Handle,
        r: WriteResult,
    ) -> Result<()> {
        self.post_app("respond_characteristic_write", app, Some(vh), move |s| {
            s.respond_characteristic_write(app, device, vh, r)
        })
    }

    pub fn respond_descriptor_read(
        &self,
        app: AppId,
        device: Addr,
        h: Handle,
        r: std::result::Result<Vec<u8>, ErrorCode>,
    ) -> Result<()> {
        self.post_app("respond_descriptor_read", app, Some(h), move |s| {
            s.respond_descriptor_read(app, device, h, borrowed(&r))
        })
    }

    pub fn respond_descriptor_write(
        &self,
        app: AppId,
        device: Addr,
        h: Handle,
        r: WriteResult,
    ) -> Result<()> {
        self.post_app("respond_descriptor_write", app, Some(h), move |s| {
            s.respond_descriptor_write(app, device, h, r)
        })
    }

    pub fn cancel_connection(&self, app: AppId, device: Addr) -> Result<()> {
        self.post_app("cancel_connection", app, None, move |s| s.cancel_connection(app, device))
    }

    // Transport and connection manager events

    pub fn on_connect(
        &self,
        device: Addr,
        cn: ConnHandle,
        role: Role,
        status: GattStatus,
    ) -> Result<()> {
        self.post(move |s| s.on_connect(device, cn, role, status))
    }

    pub fn on_disconnect(&self, device: Addr, cn: ConnHandle, status: GattStatus) -> Result<()> {
        self.post(move |s| s.on_disconnect(device, cn, status))
    }

    pub fn on_connection_state_changed(
        &self,
        device: Addr,
        status: GattStatus,
        state: ConnState,
    ) -> Result<()> {
        self.post(move |s| s.on_connection_state_changed(device, status, state))
    }

    pub fn on_connection_parameter_changed(
        &self,
        device: Addr,
        params: ConnParams,
        status: GattStatus,
    ) -> Result<()> {
        self.post(move |s| s.on_connection_parameter_changed(device, params, status))
    }

    pub fn on_exchange_mtu(&self, cn: ConnHandle, client_mtu: u16) -> Result<()> {
        self.post(move |s| s.on_exchange_mtu(cn, client_mtu))
    }

    pub fn on_read(&self, cn: ConnHandle, h: Handle) -> Result<()> {
        self.post(move |s| s.on_read(cn, h))
    }

    pub fn on_read_by_type(&self, cn: ConnHandle, h: Handle) -> Result<()> {
        self.post(move |s| s.on_read_by_type(cn, h))
    }

    pub fn on_write(&self, cn: ConnHandle, h: Handle, v: Vec<u8>, need_rsp: bool) -> Result<()> {
        self.post(move |s| s.on_write(cn, h, v, need_rsp))
    }

    pub fn on_indication_confirm(
        &self,
        cn: ConnHandle,
        vh: Handle,
        status: GattStatus,
    ) -> Result<()> {
        self.post(move |s| s.on_indication_confirm(cn, vh, status))
    }

    /// Validates and posts an application call, logging the error of its
    /// execution.
    fn post_app(
        &self,
        name: &'static str,
        app: AppId,
        h: Option<Handle>,
        f: impl FnOnce(&mut Server) -> Result<()> + Send + 'static,
    ) -> Result<()> {
        self.gate.read().check(app, h)?;
        self.post(move |s| {
            if let Err(e) = f(s) {
                warn!("{name} failed: {e}");
            }
        })
    }

    /// Executes posted tasks until cancellation or until all handles are
    /// dropped.
    async fn run(mut srv: Server, mut rx: mpsc::UnboundedReceiver<Task>, c: CancellationToken) {
        debug!("GATT server started");
        loop {
            let f = tokio::select! {
                f = rx.recv() => f,
                _ = c.cancelled() => None,
            };
            let Some(f) = f else { break };
            f(&mut srv);
        }
        debug!("GATT server stopped");
    }
}

#[inline]
fn borrowed(r: &std::result::Result<Vec<u8>, ErrorCode>) -> ReadResult {
    r.as_deref().map_err(|&e| e)
}
