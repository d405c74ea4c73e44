//! Attribute Protocol ([Vol 3] Part F) types shared by the GATT server.

pub use {consts::*, handle::*, perm::*};

mod consts;
mod handle;
mod perm;
