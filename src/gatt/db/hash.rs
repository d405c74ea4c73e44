//! GATT database hash ([Vol 3] Part G, Section 7.3).

use cmac::digest;
use structbuf::{Pack, Packer, StructBuf};

use crate::assigned::{Declaration, Descriptor as Desc};
use crate::att::Handle;
use crate::Uuid16;
use gattsrv_const::UuidPacker;

use super::Db;

/// RFC-4493 AES-CMAC ([Vol 3] Part H, Section 2.2.5).
#[derive(Debug)]
#[repr(transparent)]
struct AesCmac(cmac::Cmac<aes::Aes128>);

impl AesCmac {
    /// Creates AES-CMAC state using an all-zero key for database hash
    /// calculation ([Vol 3] Part G, Section 7.3.1).
    #[inline]
    fn db_hash() -> Self {
        Self(digest::KeyInit::new(&[0; 16].into()))
    }

    /// Updates CMAC state.
    #[inline(always)]
    fn update(&mut self, b: impl AsRef<[u8]>) -> &mut Self {
        digest::Update::update(&mut self.0, b.as_ref());
        self
    }

    /// Computes the final MAC value.
    #[inline(always)]
    fn finalize(self) -> u128 {
        u128::from_be_bytes(*digest::FixedOutput::finalize_fixed(self.0).as_ref())
    }
}

impl Db {
    /// Calculates the database hash over all service, include, and
    /// characteristic declarations, Extended Properties values, and the
    /// handles and types of the configuration and format descriptors
    /// ([Vol 3] Part G, Section 7.3.1).
    #[must_use]
    pub fn hash(&self) -> u128 {
        use Desc::*;
        let mut m = AesCmac::db_hash();
        let mut add = |hdl: Handle, typ: Uuid16, val: &[u8]| {
            (m.update(u16::from(hdl).to_le_bytes()))
                .update(typ.raw().to_le_bytes())
                .update(val);
        };
        for (hdl, s) in self.records() {
            let typ = if s.primary {
                Declaration::PrimaryService
            } else {
                Declaration::SecondaryService
            };
            add(hdl, typ.uuid16(), &decl(|v| v.uuid(s.uuid)));
            for inc in &s.includes {
                add(inc.handle, Declaration::INCLUDE, &decl(|v| {
                    v.u16(inc.start_handle).u16(inc.end_handle);
                    if let Some(u) = inc.uuid.as_u16() {
                        v.u16(u);
                    }
                }));
            }
            for (&hdl, c) in &s.chars {
                add(hdl, Declaration::CHARACTERISTIC, &decl(|v| {
                    v.u8(c.props.bits()).u16(c.value_handle).uuid(c.uuid);
                }));
                for at in c.descs.iter().filter_map(|h| self.attr(*h)) {
                    let Some(typ) = at.typ.as_uuid16() else { continue };
                    match Desc::try_from(at.typ) {
                        Ok(CharacteristicExtendedProperties) => add(at.handle, typ, &at.value),
                        Ok(
                            CharacteristicUserDescription
                            | ClientCharacteristicConfiguration
                            | ServerCharacteristicConfiguration
                            | CharacteristicPresentationFormat
                            | CharacteristicAggregateFormat,
                        ) => add(at.handle, typ, &[]),
                        _ => {}
                    }
                }
            }
        }
        m.finalize()
    }
}

/// Encodes a declaration value.
fn decl(f: impl FnOnce(&mut Packer)) -> StructBuf {
    // Characteristic declaration is the longest value
    // ([Vol 3] Part G, Section 3.3.1).
    let mut b = StructBuf::new(1 + 2 + 16);
    f(&mut b.append());
    b
}
