//! Runs a GATT server against a simulated client that logs every ATT PDU the
//! server would send.

#![allow(unused_crate_dependencies)]

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use gattsrv::assigned::{Characteristic as Chr, Service as Svc};
use gattsrv::att::{Handle, Perm};
use gattsrv::gatt::*;
use gattsrv::le::{Addr, ConnHandle, RawAddr, Role};

#[derive(Debug)]
struct Loopback;

impl Transport for Loopback {
    fn send_notification(&self, cn: ConnHandle, hdl: Handle, v: &[u8]) {
        info!("{cn} <- ATT_HANDLE_VALUE_NTF {hdl} {v:02X?}");
    }

    fn send_indication(&self, cn: ConnHandle, hdl: Handle, v: &[u8]) {
        info!("{cn} <- ATT_HANDLE_VALUE_IND {hdl} {v:02X?}");
    }

    fn send_read_rsp(&self, cn: ConnHandle, hdl: Handle, r: ReadResult) {
        info!("{cn} <- ATT_READ_RSP {hdl} {r:02X?}");
    }

    fn send_read_by_type_rsp(&self, cn: ConnHandle, hdl: Handle, r: ReadResult) {
        info!("{cn} <- ATT_READ_BY_TYPE_RSP {hdl} {r:02X?}");
    }

    fn send_write_rsp(&self, cn: ConnHandle, hdl: Handle, r: WriteResult) {
        info!("{cn} <- ATT_WRITE_RSP {hdl} {r:?}");
    }

    fn send_read_desc_rsp(&self, cn: ConnHandle, hdl: Handle, r: ReadResult) {
        info!("{cn} <- ATT_READ_RSP {hdl} {r:02X?}");
    }

    fn send_write_desc_rsp(&self, cn: ConnHandle, hdl: Handle, r: WriteResult) {
        info!("{cn} <- ATT_WRITE_RSP {hdl} {r:?}");
    }

    fn send_exchange_mtu_rsp(&self, cn: ConnHandle, mtu: u16) {
        info!("{cn} <- ATT_EXCHANGE_MTU_RSP {mtu}");
    }

    fn disconnect(&self, device: Addr) -> std::result::Result<(), GattStatus> {
        info!("Disconnecting {device}");
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let srv = GattServer::new(Config::default(), Arc::new(Loopback));

    // Battery service application answering reads from its own state
    let (cb, mut events) = Callback::channel();
    let app = srv.register_application(cb).await?;
    let bas = ServiceDef::primary(Svc::Battery).characteristic(
        CharacteristicDef::new(Chr::BatteryLevel, Prop::READ | Prop::NOTIFY, Perm::READ_WRITE, [100])
            .descriptor(DescriptorDef::cccd())
            .descriptor(DescriptorDef::user_description("Main battery")),
    );
    let s = srv.add_service(app, bas).await?;
    let vh = (srv.service(s).await?)
        .and_then(|svc| svc.characteristics.first().map(|c| c.value_handle))
        .ok_or(Error::HandleNotFound(s))?;
    let cccd = vh.next().ok_or(Error::HandleNotFound(vh))?;
    info!("Database hash: {:032X}", srv.db_hash().await?);

    // Simulated client
    let dev = Addr::Random(RawAddr::new([0x01, 0x02, 0x03, 0x04, 0x05, 0xC6]));
    let cn = ConnHandle::new(0x40).ok_or(Error::InvalidParameter("connection handle"))?;
    srv.on_connect(dev, cn, Role::Peripheral, GattStatus::Success)?;
    srv.on_exchange_mtu(cn, 185)?;
    srv.on_read(cn, vh)?;
    srv.on_write(cn, cccd, Cccd::NOTIFY.to_value().to_vec(), true)?;
    // Rejected with WriteNotPermitted before reaching the application
    srv.on_write(cn, vh, vec![1], true)?;

    let mut level = 100_u8;
    while let Some(e) = events.recv().await {
        info!("Event: {e:?}");
        match e {
            ServerEvent::CharacteristicReadRequest { device, characteristic } => {
                srv.respond_characteristic_read(app, device, characteristic.value_handle, Ok(vec![level]))?;
            }
            ServerEvent::DescriptorWriteRequest { device, .. } => {
                level -= 1;
                srv.set_characteristic_value(app, vh, vec![level])?;
                srv.notify_client(app, device, vh, vec![level], false)?;
                srv.cancel_connection(app, device)?;
                srv.on_disconnect(device, cn, GattStatus::Success)?;
            }
            ServerEvent::ConnectionStateChanged {
                state: ConnState::Disconnected,
                ..
            } => break,
            _ => {}
        }
    }
    srv.shutdown().await;
    Ok(())
}
