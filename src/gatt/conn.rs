use std::collections::BTreeMap;

use crate::att::{Handle, MTU_MIN, NTF_HDR};
use crate::le::{Addr, ConnHandle, Role};

use super::Cccd;

/// Live link to a remote client.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Connection {
    pub handle: ConnHandle,
    pub device: Addr,
    pub role: Role,
    mtu: u16,
    /// Client configuration keyed by characteristic value handle.
    cccd: BTreeMap<Handle, Cccd>,
}

impl Connection {
    /// Creates a connection using the default ATT MTU and with all
    /// notifications and indications disabled.
    #[inline]
    #[must_use]
    pub fn new(handle: ConnHandle, device: Addr, role: Role) -> Self {
        Self {
            handle,
            device,
            role,
            mtu: MTU_MIN,
            cccd: BTreeMap::new(),
        }
    }

    /// Returns the negotiated ATT MTU.
    #[inline(always)]
    #[must_use]
    pub const fn mtu(&self) -> u16 {
        self.mtu
    }

    /// Completes an MTU exchange ([Vol 3] Part F, Section 3.4.2.2) and returns
    /// the new ATT MTU.
    pub fn exchange_mtu(&mut self, client: u16, server: u16) -> u16 {
        self.mtu = MTU_MIN.max(client.min(server));
        self.mtu
    }

    /// Returns the maximum length of a notified or indicated value.
    #[inline]
    #[must_use]
    pub fn max_ntf_len(&self) -> usize {
        usize::from(self.mtu - NTF_HDR)
    }

    /// Returns the client configuration of characteristic value `vh`.
    #[inline]
    #[must_use]
    pub fn cccd(&self, vh: Handle) -> Cccd {
        self.cccd.get(&vh).copied().unwrap_or_default()
    }

    /// Updates the client configuration of characteristic value `vh`.
    pub fn set_cccd(&mut self, vh: Handle, v: Cccd) {
        if v.is_empty() {
            self.cccd.remove(&vh);
        } else {
            self.cccd.insert(vh, v);
        }
    }

    /// Drops client configuration of characteristics outside the database.
    pub(super) fn retain_cccd(&mut self, f: impl Fn(Handle) -> bool) {
        self.cccd.retain(|&vh, _| f(vh));
    }
}
