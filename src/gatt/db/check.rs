//! Service definition legality checks ([Vol 3] Part G, Section 3.3).

use crate::assigned::Descriptor as Desc;
use crate::att::{Perm, MAX_VAL_LEN};
use crate::Uuid;

use super::*;

/// Checks all characteristic definitions of a service.
pub(super) fn service(def: &ServiceDef) -> Result<()> {
    def.characteristics.iter().try_for_each(characteristic)
}

/// Checks properties, value, and descriptors of one characteristic.
pub(super) fn characteristic(c: &CharacteristicDef) -> Result<()> {
    props(c.uuid, c.props, c.perms)?;
    if c.value.is_empty() || c.value.len() > MAX_VAL_LEN {
        return Err(Error::InvalidCharacteristicData(c.uuid));
    }
    c.descriptors.iter().try_for_each(descriptor_value)?;
    descriptors(c.uuid, c.props, c.descriptors.iter().map(|d| d.uuid))
}

/// Checks that properties are consistent with value permissions.
pub(super) fn props(uuid: Uuid, props: Prop, perms: Perm) -> Result<()> {
    if props.is_empty() {
        return Err(Error::InvalidCharacteristic(uuid, "no properties"));
    }
    if props.contains(Prop::READ) && !perms.contains(Perm::READ) {
        return Err(Error::InvalidCharacteristic(uuid, "READ property without read permission"));
    }
    if props.intersects(Prop::ANY_WRITE) && !perms.contains(Perm::WRITE) {
        return Err(Error::InvalidCharacteristic(uuid, "WRITE property without write permission"));
    }
    Ok(())
}

/// Checks descriptor cardinality rules for a characteristic with the
/// specified properties and descriptor types.
pub(super) fn descriptors(uuid: Uuid, props: Prop, types: impl Iterator<Item = Uuid>) -> Result<()> {
    use Desc::*;
    let mut n = [0_usize; 6];
    for typ in types {
        let i = match Desc::try_from(typ) {
            Ok(ServerCharacteristicConfiguration) => 0,
            Ok(ClientCharacteristicConfiguration) => 1,
            Ok(CharacteristicExtendedProperties) => 2,
            Ok(CharacteristicUserDescription) => 3,
            Ok(CharacteristicPresentationFormat) => 4,
            Ok(CharacteristicAggregateFormat) => 5,
            _ => continue,
        };
        n[i] += 1;
    }
    let [sccd, cccd, ext, desc, fmt, agg] = n;
    // Required descriptors appear exactly once, optional ones at most once
    let once = |n: usize, required: bool| if required { n == 1 } else { n <= 1 };
    let rule = if !once(sccd, props.contains(Prop::BROADCAST)) {
        DescriptorRule::Sccd
    } else if !once(cccd, props.intersects(Prop::NOTIFY | Prop::INDICATE)) {
        DescriptorRule::Cccd
    } else if ext != usize::from(props.contains(Prop::EXT_PROPS)) {
        DescriptorRule::ExtProps
    } else if desc > 1 {
        DescriptorRule::UserDescription
    } else if fmt > 1 && agg == 0 {
        DescriptorRule::AggregateFormat
    } else {
        return Ok(());
    };
    Err(Error::InvalidCharacteristicDescriptor(uuid, rule))
}

/// Checks the length of a descriptor value.
fn descriptor_value(d: &DescriptorDef) -> Result<()> {
    use Desc::*;
    let n = d.value.len();
    let ok = match Desc::try_from(d.uuid) {
        Ok(ClientCharacteristicConfiguration | ServerCharacteristicConfiguration) => n == 2,
        // Reserved bits must be zero
        Ok(CharacteristicExtendedProperties) => {
            n == 2 && ExtProp::from_bits(u16::from_le_bytes([d.value[0], d.value[1]])).is_some()
        }
        // [Vol 3] Part G, Section 3.3.3.5
        Ok(CharacteristicPresentationFormat) => n == 7,
        // List of attribute handles
        Ok(CharacteristicAggregateFormat) => n > 0 && n % 2 == 0,
        _ => n <= MAX_VAL_LEN,
    };
    if ok {
        Ok(())
    } else {
        Err(Error::InvalidCharacteristicDescriptorData(d.uuid))
    }
}
