use matches::assert_matches;

use crate::assigned::{Characteristic as Chr, Descriptor as Desc, Service as Svc};
use crate::att::{Handle, HandleRange, Perm};

use super::*;

fn h(v: u16) -> Handle {
    Handle::new(v).unwrap()
}

fn notify_char() -> CharacteristicDef {
    CharacteristicDef::new(Chr::HeartRateMeasurement, Prop::NOTIFY, Perm::READ_WRITE, [0, 60])
        .descriptor(DescriptorDef::cccd())
}

fn heart_rate() -> ServiceDef {
    ServiceDef::primary(Svc::HeartRate).characteristic(notify_char())
}

fn battery() -> ServiceDef {
    ServiceDef::primary(Svc::Battery).characteristic(CharacteristicDef::new(
        Chr::BatteryLevel,
        Prop::READ,
        Perm::READ,
        [100],
    ))
}

/// Snapshot of everything admission may change.
fn state(db: &Db) -> (Vec<HandleRange>, Vec<Handle>, Vec<Handle>) {
    (
        db.allocator().free().to_vec(),
        db.service_handles().collect(),
        db.value_handles().collect(),
    )
}

#[test]
fn add_service_layout() {
    let mut db = Db::default();
    let s = db.add_service(&heart_rate()).unwrap();
    assert_eq!(s, Handle::MIN);
    let svc = db.service(s).unwrap();
    assert_eq!(svc.end_handle, h(4));
    assert!(svc.primary);
    let c = &svc.characteristics[0];
    assert_eq!((c.handle, c.value_handle, c.end_handle), (h(2), h(3), h(4)));
    assert_eq!(c.value, [0, 60]);
    assert_eq!(c.perms, Perm::READ_WRITE);
    assert_eq!(c.descriptors[0].handle, h(4));
    assert_eq!(c.descriptors[0].uuid, Desc::ClientCharacteristicConfiguration);
    assert_eq!(db.value_handles().collect::<Vec<_>>(), [h(3), h(4)]);
    assert_eq!(db.allocator().free(), &[HandleRange::new(h(5), Handle::MAX)]);
}

#[test]
fn handle_assignment_order() {
    let mut db = Db::default();
    let inc = db.add_service(&battery()).unwrap();
    let def = ServiceDef::secondary(Svc::HeartRate)
        .include(inc)
        .characteristic(CharacteristicDef::new(Chr::BodySensorLocation, Prop::READ, Perm::READ, [1]))
        .characteristic(notify_char().descriptor(DescriptorDef::user_description("bpm")));
    let s = db.add_service(&def).unwrap();
    assert_eq!(s, h(4));
    let svc = db.service(s).unwrap();
    assert!(!svc.primary);
    assert_eq!(svc.includes[0].handle, h(5));
    let c: Vec<_> = (svc.characteristics.iter())
        .map(|c| (c.handle, c.value_handle, c.end_handle))
        .collect();
    assert_eq!(c, [(h(6), h(7), h(7)), (h(8), h(9), h(11))]);
    assert_eq!(svc.end_handle, h(11));
    assert_eq!(svc.range().len(), def.handle_count());
}

#[test]
fn include_resolution() {
    let mut db = Db::default();
    let inc = db.add_service(&ServiceDef::secondary(Svc::Battery).characteristic(
        CharacteristicDef::new(Chr::BatteryLevel, Prop::READ, Perm::READ, [1]),
    ));
    let inc = inc.unwrap();
    let s = db.add_service(&heart_rate().include(inc)).unwrap();
    let i = db.include_services(s).unwrap()[0];
    assert_eq!((i.start_handle, i.end_handle), (inc, h(3)));
    assert_eq!(i.uuid, Svc::Battery);
    assert!(!i.primary);
    assert_eq!(db.include_service(i.handle), Some(&i));
    assert_eq!(db.include_service(s), None);

    let before = state(&db);
    assert_eq!(
        db.add_service(&battery().include(h(100))),
        Err(Error::IncludeServiceNotFound(h(100)))
    );
    assert_eq!(state(&db), before);
}

#[test]
fn descriptor_rules() {
    use DescriptorRule::*;
    let c = |props| CharacteristicDef::new(Chr::Temperature, props, Perm::READ, [0]);
    let d = |typ: Desc, v: &[u8]| DescriptorDef::new(typ, Perm::READ, v);
    let sccd = || d(Desc::ServerCharacteristicConfiguration, &[0, 0]);
    let ext = || d(Desc::CharacteristicExtendedProperties, &[0, 0]);
    let fmt = || d(Desc::CharacteristicPresentationFormat, &[0x0E, 0xFE, 0x2F, 0x27, 1, 0, 0]);
    let agg = || d(Desc::CharacteristicAggregateFormat, &[0x05, 0x00, 0x06, 0x00]);
    let cases = [
        (c(Prop::BROADCAST | Prop::READ), Some(Sccd)),
        (c(Prop::BROADCAST | Prop::READ).descriptor(sccd()), None),
        (c(Prop::BROADCAST | Prop::READ).descriptor(sccd()).descriptor(sccd()), Some(Sccd)),
        (c(Prop::READ).descriptor(sccd()), None),
        (c(Prop::INDICATE), Some(Cccd)),
        (c(Prop::INDICATE).descriptor(DescriptorDef::cccd()), None),
        (
            c(Prop::READ).descriptor(DescriptorDef::cccd()).descriptor(DescriptorDef::cccd()),
            Some(Cccd),
        ),
        (c(Prop::READ | Prop::EXT_PROPS), Some(ExtProps)),
        (c(Prop::READ | Prop::EXT_PROPS).descriptor(ext()), None),
        (c(Prop::READ).descriptor(ext()), Some(ExtProps)),
        (
            (c(Prop::READ).descriptor(DescriptorDef::user_description("a")))
                .descriptor(DescriptorDef::user_description("b")),
            Some(UserDescription),
        ),
        (c(Prop::READ).descriptor(fmt()), None),
        (c(Prop::READ).descriptor(fmt()).descriptor(fmt()), Some(AggregateFormat)),
        (c(Prop::READ).descriptor(fmt()).descriptor(fmt()).descriptor(agg()), None),
    ];
    for (c, want) in cases {
        let mut db = Db::default();
        let before = state(&db);
        let r = db.add_service(&ServiceDef::primary(Svc::EnvironmentalSensing).characteristic(c.clone()));
        match want {
            None => assert!(r.is_ok(), "{c:?}: {r:?}"),
            Some(rule) => {
                assert_eq!(r, Err(Error::InvalidCharacteristicDescriptor(c.uuid, rule)), "{c:?}");
                assert_eq!(state(&db), before);
            }
        }
    }
}

#[test]
fn characteristic_rules() {
    let svc = |c| ServiceDef::primary(Svc::Battery).characteristic(c);
    let chr = |props, perms, v: &[u8]| CharacteristicDef::new(Chr::BatteryLevel, props, perms, v);
    let mut db = Db::default();
    assert_matches!(
        db.add_service(&svc(chr(Prop::READ, Perm::WRITE, &[1]))),
        Err(Error::InvalidCharacteristic(..))
    );
    assert_matches!(
        db.add_service(&svc(chr(Prop::WRITE_CMD, Perm::READ, &[1]))),
        Err(Error::InvalidCharacteristic(..))
    );
    assert_matches!(
        db.add_service(&svc(chr(Prop::empty(), Perm::READ, &[1]))),
        Err(Error::InvalidCharacteristic(..))
    );
    assert_matches!(
        db.add_service(&svc(chr(Prop::READ, Perm::READ, &[]))),
        Err(Error::InvalidCharacteristicData(_))
    );
    assert_matches!(
        db.add_service(&svc(chr(Prop::READ, Perm::READ, &[0; 513]))),
        Err(Error::InvalidCharacteristicData(_))
    );
    let bad_cccd = DescriptorDef::new(Desc::ClientCharacteristicConfiguration, Perm::READ_WRITE, [0]);
    assert_matches!(
        db.add_service(&svc(chr(Prop::NOTIFY, Perm::READ, &[1]).descriptor(bad_cccd))),
        Err(Error::InvalidCharacteristicDescriptorData(_))
    );
    let ext = |v: u16| {
        let typ = Desc::CharacteristicExtendedProperties;
        let d = DescriptorDef::new(typ, Perm::READ, v.to_le_bytes());
        svc(chr(Prop::READ | Prop::EXT_PROPS, Perm::READ, &[1]).descriptor(d))
    };
    assert_matches!(
        db.add_service(&ext(0x0004)),
        Err(Error::InvalidCharacteristicDescriptorData(_))
    );
    assert_eq!(db.service_handles().count(), 0);
    assert_eq!(db.allocator().free(), &[HandleRange::ALL]);
    let r = ext(ExtProp::RELIABLE_WRITE.bits());
    assert!(db.add_service(&r).is_ok());
    db.clear();
    assert!(db.add_service(&svc(chr(Prop::READ | Prop::WRITE, Perm::READ_WRITE, &[1]))).is_ok());
}

#[test]
fn not_enough_handles() {
    let mut db = Db::new(HandleRange::new(h(1), h(5)));
    assert_eq!(db.add_service(&heart_rate()), Ok(h(1)));
    let before = state(&db);
    assert_eq!(db.add_service(&heart_rate()), Err(Error::NotEnoughHandles(4)));
    assert_eq!(state(&db), before);
    assert_eq!(db.add_service(&ServiceDef::primary(Svc::LinkLoss)), Ok(h(5)));
}

#[test]
fn referential_integrity() {
    let mut db = Db::default();
    let y = db.add_service(&battery()).unwrap();
    let x = db.add_service(&heart_rate().include(y)).unwrap();
    assert_eq!(db.delete_service(y), Err(Error::ReferencedByOtherService(y, x)));
    assert!(db.service(y).is_some());
    assert_eq!(db.delete_service(x), Ok(HandleRange::new(h(4), h(8))));
    assert_eq!(db.delete_service(y), Ok(HandleRange::new(h(1), h(3))));
    assert_eq!(db.delete_service(y), Err(Error::InvalidParameter("unknown service handle")));
    assert_eq!(db.allocator().free(), &[HandleRange::ALL]);
    assert_eq!(db.value_handles().count(), 0);
}

#[test]
fn delete_merges_free_space() {
    let mut db = Db::default();
    let a = db.add_service(&battery()).unwrap();
    let b = db.add_service(&heart_rate()).unwrap();
    let c = db.add_service(&battery()).unwrap();
    db.delete_service(b).unwrap();
    assert_eq!(
        db.allocator().free(),
        &[HandleRange::new(h(4), h(7)), HandleRange::new(h(11), Handle::MAX)]
    );
    db.delete_service(a).unwrap();
    assert_eq!(
        db.allocator().free(),
        &[HandleRange::new(h(1), h(7)), HandleRange::new(h(11), Handle::MAX)]
    );
    db.delete_service(c).unwrap();
    assert_eq!(db.allocator().free(), &[HandleRange::ALL]);
}

#[test]
fn zero_descriptor_round_trip() {
    let def = ServiceDef::primary(Svc::DeviceInformation)
        .characteristic(CharacteristicDef::new(Chr::ManufacturerNameString, Prop::READ, Perm::READ, *b"acme"))
        .characteristic(CharacteristicDef::new(Chr::ModelNumberString, Prop::READ, Perm::READ, *b"x1"));
    assert_eq!(def.handle_count(), 5);
    let mut db = Db::default();
    let first = db.add_service(&battery()).unwrap();
    let s = db.add_service(&def).unwrap();
    let range = db.service(s).unwrap().range();
    assert_eq!(range.len(), 5);
    db.delete_service(s).unwrap();
    assert_eq!(db.allocator().free_count(), 0xFFFF - 3);
    let again = db.add_service(&def).unwrap();
    assert_eq!(db.service(again).unwrap().range(), range);
    assert_eq!(db.allocator().free_count(), 0xFFFF - 3 - 5);
    db.delete_service(again).unwrap();
    db.delete_service(first).unwrap();
    assert_eq!(db.allocator().free(), &[HandleRange::ALL]);
}

#[test]
fn singleton_services() {
    let dis = || {
        ServiceDef::primary(Svc::DeviceInformation).characteristic(CharacteristicDef::new(
            Chr::ManufacturerNameString,
            Prop::READ,
            Perm::READ,
            *b"acme",
        ))
    };
    let mut db = Db::default();
    let s = db.add_service(&dis()).unwrap();
    let before = state(&db);
    assert_eq!(db.add_service(&dis()), Err(Error::DuplicateService(Svc::DeviceInformation.uuid())));
    assert_eq!(state(&db), before);
    assert!(db.add_service(&battery()).is_ok());
    assert!(db.add_service(&battery()).is_ok());
    db.delete_service(s).unwrap();
    assert!(db.add_service(&dis()).is_ok());
}

#[test]
fn lookups() {
    let mut db = Db::default();
    db.add_service(&battery()).unwrap();
    let s = db.add_service(&heart_rate()).unwrap();
    assert_eq!(s, h(4));
    // Declaration handle is not a value handle
    assert_eq!(db.characteristic(h(5)), None);
    let c = db.characteristic(h(6)).unwrap();
    assert_eq!(c.handle, h(5));
    assert_eq!(db.characteristic(h(7)), None);
    assert_eq!(db.descriptor(h(7)).unwrap().uuid, Desc::ClientCharacteristicConfiguration);
    assert_eq!(db.descriptor(h(6)), None);
    assert_eq!(db.descriptor_owner(h(7)), Some(c));
    assert_eq!(db.descriptor_owner(h(6)), None);
    assert_eq!(db.characteristic(h(8)), None);
    assert_eq!(db.service(h(5)), None);
    assert_eq!(db.attr(h(3)).map(|at| at.typ), Some(Chr::BatteryLevel.uuid()));
}

#[test]
fn values() {
    let mut db = Db::default();
    db.add_service(&battery()).unwrap();
    assert_eq!(db.value(h(3)), Ok(&[100][..]));
    db.set_value(h(3), vec![42]).unwrap();
    assert_eq!(db.value(h(3)), Ok(&[42][..]));
    assert_eq!(db.characteristic(h(3)).unwrap().value, [42]);
    assert_eq!(db.value(h(2)), Err(Error::HandleNotFound(h(2))));
    assert_eq!(db.set_value(h(9), vec![1]), Err(Error::HandleNotFound(h(9))));
    assert_matches!(db.set_value(h(3), vec![0; 513]), Err(Error::InvalidParameter(_)));
}

#[test]
fn set_char_perms() {
    let mut db = Db::default();
    db.add_service(&heart_rate()).unwrap();
    db.set_char_perms(h(3), Prop::NOTIFY | Prop::READ, Perm::READ).unwrap();
    let c = db.characteristic(h(3)).unwrap();
    assert_eq!((c.props, c.perms), (Prop::NOTIFY | Prop::READ, Perm::READ));
    assert_matches!(
        db.set_char_perms(h(3), Prop::WRITE | Prop::NOTIFY, Perm::READ),
        Err(Error::InvalidCharacteristic(..))
    );
    assert_matches!(
        db.set_char_perms(h(3), Prop::READ | Prop::BROADCAST, Perm::READ),
        Err(Error::InvalidCharacteristicDescriptor(_, DescriptorRule::Sccd))
    );
    assert_eq!(
        db.set_char_perms(h(4), Prop::READ, Perm::READ),
        Err(Error::HandleNotFound(h(4)))
    );
    assert_eq!(db.characteristic(h(3)).unwrap().props, Prop::NOTIFY | Prop::READ);
}

#[test]
fn clear() {
    let mut db = Db::new(HandleRange::new(h(0x10), h(0x20)));
    db.add_service(&battery()).unwrap();
    db.clear();
    assert_eq!(db.service_handles().count(), 0);
    assert_eq!(db.allocator().free(), &[HandleRange::new(h(0x10), h(0x20))]);
    assert_eq!(db.add_service(&battery()), Ok(h(0x10)));
}

/// Database from [Vol 3] Part G, Appendix B.
fn appendix_b() -> Db {
    let mut db = Db::default();
    let gap = ServiceDef::primary(Svc::GenericAccess)
        .characteristic(CharacteristicDef::new(Chr::DeviceName, Prop::READ | Prop::WRITE, Perm::READ_WRITE, *b"x"))
        .characteristic(CharacteristicDef::new(Chr::Appearance, Prop::READ, Perm::READ, [0, 0]));
    let gatt = ServiceDef::primary(Svc::GenericAttribute)
        .characteristic(
            CharacteristicDef::new(Chr::ServiceChanged, Prop::INDICATE, Perm::empty(), [0; 4])
                .descriptor(DescriptorDef::cccd()),
        )
        .characteristic(CharacteristicDef::new(
            Chr::ClientSupportedFeatures,
            Prop::READ | Prop::WRITE,
            Perm::READ_WRITE,
            [0],
        ))
        .characteristic(CharacteristicDef::new(Chr::DatabaseHash, Prop::READ, Perm::READ, [0; 16]));
    assert_eq!(db.add_service(&gap), Ok(h(0x0001)));
    assert_eq!(db.add_service(&gatt), Ok(h(0x0006)));

    // Reserve the glucose service handles so that battery lands at 0x0014
    let filler = ServiceDef::primary(Svc::TxPower)
        .characteristic(CharacteristicDef::new(Chr::TxPowerLevel, Prop::READ, Perm::READ, [0]))
        .characteristic(
            CharacteristicDef::new(Chr::TxPowerLevel, Prop::READ, Perm::READ, [0])
                .descriptor(DescriptorDef::user_description("tx")),
        );
    let filler = db.add_service(&filler).unwrap();
    let bas = ServiceDef::secondary(Svc::Battery).characteristic(CharacteristicDef::new(
        Chr::BatteryLevel,
        Prop::READ,
        Perm::READ,
        [100],
    ));
    assert_eq!(db.add_service(&bas), Ok(h(0x0014)));
    db.delete_service(filler).unwrap();

    let gls = ServiceDef::primary(Svc::Glucose).include(h(0x0014)).characteristic(
        CharacteristicDef::new(
            Chr::GlucoseMeasurement,
            Prop::READ | Prop::INDICATE | Prop::EXT_PROPS,
            Perm::READ,
            [0],
        )
        .descriptor(DescriptorDef::cccd())
        .descriptor(DescriptorDef::new(Desc::CharacteristicExtendedProperties, Perm::READ, [0, 0])),
    );
    assert_eq!(db.add_service(&gls), Ok(h(0x000E)));
    db
}

#[test]
fn hash() {
    let db = appendix_b();
    assert_eq!(db.service(h(0x000E)).unwrap().end_handle, h(0x0013));
    assert_eq!(db.hash(), 0xF1_CA_2D_48_EC_F5_8B_AC_8A_88_30_BB_B9_FB_A9_90);

    // Values of non-declaration attributes are not part of the hash
    let mut db2 = appendix_b();
    db2.set_value(h(0x0003), b"other".to_vec()).unwrap();
    assert_eq!(db2.hash(), db.hash());
    db2.delete_service(h(0x000E)).unwrap();
    assert_ne!(db2.hash(), db.hash());
}
