use std::fmt::Debug;

use crate::att::{ErrorCode, Handle};
use crate::le::{Addr, ConnHandle};

use super::GattStatus;

/// ATT read response result.
pub type ReadResult<'a> = std::result::Result<&'a [u8], ErrorCode>;

/// ATT write response result.
pub type WriteResult = std::result::Result<(), ErrorCode>;

/// ATT bearer and link management used by the server. Inbound PDUs and link
/// events are delivered by calling the `on_*` methods of
/// [`Server`](super::Server).
pub trait Transport: Debug + Send + Sync {
    /// Sends an ATT_HANDLE_VALUE_NTF PDU.
    fn send_notification(&self, cn: ConnHandle, hdl: Handle, v: &[u8]);

    /// Sends an ATT_HANDLE_VALUE_IND PDU. The confirmation is reported via
    /// [`Server::on_indication_confirm`](super::Server::on_indication_confirm).
    fn send_indication(&self, cn: ConnHandle, hdl: Handle, v: &[u8]);

    /// Responds to a characteristic value read request.
    fn send_read_rsp(&self, cn: ConnHandle, hdl: Handle, r: ReadResult);

    /// Responds to a read-by-type request that matched `hdl`.
    fn send_read_by_type_rsp(&self, cn: ConnHandle, hdl: Handle, r: ReadResult);

    /// Responds to a characteristic value write request.
    fn send_write_rsp(&self, cn: ConnHandle, hdl: Handle, r: WriteResult);

    /// Responds to a descriptor read request.
    fn send_read_desc_rsp(&self, cn: ConnHandle, hdl: Handle, r: ReadResult);

    /// Responds to a descriptor write request.
    fn send_write_desc_rsp(&self, cn: ConnHandle, hdl: Handle, r: WriteResult);

    /// Responds to an ATT_EXCHANGE_MTU_REQ with the server MTU.
    fn send_exchange_mtu_rsp(&self, cn: ConnHandle, mtu: u16);

    /// Starts disconnecting from `device`. The outcome is reported via
    /// [`Server::on_disconnect`](super::Server::on_disconnect).
    fn disconnect(&self, device: Addr) -> std::result::Result<(), GattStatus>;
}

#[cfg(test)]
pub(crate) mod mock {
    use parking_lot::Mutex;
    use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

    use super::*;

    /// Outbound transport call.
    #[derive(Clone, Debug, Eq, PartialEq)]
    pub enum Sent {
        Notification(ConnHandle, Handle, Vec<u8>),
        Indication(ConnHandle, Handle, Vec<u8>),
        ReadRsp(ConnHandle, Handle, std::result::Result<Vec<u8>, ErrorCode>),
        ReadByTypeRsp(ConnHandle, Handle, std::result::Result<Vec<u8>, ErrorCode>),
        WriteRsp(ConnHandle, Handle, WriteResult),
        ReadDescRsp(ConnHandle, Handle, std::result::Result<Vec<u8>, ErrorCode>),
        WriteDescRsp(ConnHandle, Handle, WriteResult),
        ExchangeMtuRsp(ConnHandle, u16),
        Disconnect(Addr),
    }

    /// Transport that records all outbound calls into a channel.
    #[derive(Debug)]
    pub struct MockTransport {
        tx: UnboundedSender<Sent>,
        disconnect: Mutex<std::result::Result<(), GattStatus>>,
    }

    impl MockTransport {
        pub fn new() -> (Self, UnboundedReceiver<Sent>) {
            let (tx, rx) = mpsc::unbounded_channel();
            let t = Self {
                tx,
                disconnect: Mutex::new(Ok(())),
            };
            (t, rx)
        }

        /// Sets the result of subsequent `disconnect` calls.
        pub fn fail_disconnect(&self, st: GattStatus) {
            *self.disconnect.lock() = Err(st);
        }

        fn send(&self, s: Sent) {
            self.tx.send(s).unwrap();
        }
    }

    fn owned(r: ReadResult) -> std::result::Result<Vec<u8>, ErrorCode> {
        r.map(<[u8]>::to_vec)
    }

    impl Transport for MockTransport {
        fn send_notification(&self, cn: ConnHandle, hdl: Handle, v: &[u8]) {
            self.send(Sent::Notification(cn, hdl, v.to_vec()));
        }

        fn send_indication(&self, cn: ConnHandle, hdl: Handle, v: &[u8]) {
            self.send(Sent::Indication(cn, hdl, v.to_vec()));
        }

        fn send_read_rsp(&self, cn: ConnHandle, hdl: Handle, r: ReadResult) {
            self.send(Sent::ReadRsp(cn, hdl, owned(r)));
        }

        fn send_read_by_type_rsp(&self, cn: ConnHandle, hdl: Handle, r: ReadResult) {
            self.send(Sent::ReadByTypeRsp(cn, hdl, owned(r)));
        }

        fn send_write_rsp(&self, cn: ConnHandle, hdl: Handle, r: WriteResult) {
            self.send(Sent::WriteRsp(cn, hdl, r));
        }

        fn send_read_desc_rsp(&self, cn: ConnHandle, hdl: Handle, r: ReadResult) {
            self.send(Sent::ReadDescRsp(cn, hdl, owned(r)));
        }

        fn send_write_desc_rsp(&self, cn: ConnHandle, hdl: Handle, r: WriteResult) {
            self.send(Sent::WriteDescRsp(cn, hdl, r));
        }

        fn send_exchange_mtu_rsp(&self, cn: ConnHandle, mtu: u16) {
            self.send(Sent::ExchangeMtuRsp(cn, mtu));
        }

        fn disconnect(&self, device: Addr) -> std::result::Result<(), GattStatus> {
            self.send(Sent::Disconnect(device));
            *self.disconnect.lock()
        }
    }
}
