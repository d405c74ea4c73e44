use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::att::HandleRange;
use crate::le::Addr;

use super::*;

/// Link state reported by [`ServerEvent::ConnectionStateChanged`].
#[allow(clippy::exhaustive_enums)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ConnState {
    Connecting,
    Connected,
    Disconnecting,
    Disconnected,
}

/// Connection parameters ([Vol 4] Part E, Section 7.7.65.3).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ConnParams {
    /// Connection interval in 1.25 ms units.
    pub interval: u16,
    /// Peripheral latency in connection events.
    pub latency: u16,
    /// Supervision timeout in 10 ms units.
    pub timeout: u16,
}

/// Event delivered to a registered application.
///
/// Request events carry value snapshots. The application answers them through
/// the matching `respond_*` call on the server.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ServerEvent {
    /// Result of an `add_service` call made by this application.
    ServiceAdded {
        status: GattStatus,
        service: Option<Service>,
    },
    /// Another application added or removed the services in `range`.
    ServiceChanged { range: HandleRange },
    CharacteristicReadRequest {
        device: Addr,
        characteristic: Characteristic,
    },
    CharacteristicReadByUuidRequest {
        device: Addr,
        characteristic: Characteristic,
    },
    /// Write request. The snapshot carries the value written by the client.
    CharacteristicWriteRequest {
        device: Addr,
        characteristic: Characteristic,
        need_rsp: bool,
    },
    DescriptorReadRequest {
        device: Addr,
        descriptor: Descriptor,
    },
    /// Descriptor write request. The snapshot carries the value written by
    /// the client. Client Characteristic Configuration writes are answered by
    /// the server and are delivered with `need_rsp == false`.
    DescriptorWriteRequest {
        device: Addr,
        descriptor: Descriptor,
        need_rsp: bool,
    },
    NotifyConfirm {
        device: Addr,
        characteristic: Characteristic,
        status: GattStatus,
    },
    MtuChanged {
        device: Addr,
        mtu: u16,
    },
    ConnectionStateChanged {
        device: Addr,
        status: GattStatus,
        state: ConnState,
    },
    ConnectionParameterChanged {
        device: Addr,
        params: ConnParams,
        status: GattStatus,
    },
}

/// Application event callback.
#[derive(Clone)]
#[repr(transparent)]
pub struct Callback(Arc<dyn Fn(ServerEvent) + Send + Sync>);

impl Callback {
    /// Returns a callback that forwards all events into a channel.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let cb = Self::from(move |e: ServerEvent| {
            // Receiver may be dropped by an application that stopped listening
            let _ = tx.send(e);
        });
        (cb, rx)
    }

    /// Delivers an event.
    #[inline(always)]
    pub(super) fn call(&self, e: ServerEvent) {
        (self.0)(e);
    }
}

impl Debug for Callback {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        (f.debug_tuple(crate::util::name_of!(Callback)).field(&Arc::as_ptr(&self.0))).finish()
    }
}

impl<T: Fn(ServerEvent) + Send + Sync + 'static> From<T> for Callback {
    #[inline(always)]
    fn from(f: T) -> Self {
        Self(Arc::new(f))
    }
}
