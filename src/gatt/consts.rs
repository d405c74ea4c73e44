use bitflags::bitflags;

bitflags! {
    /// Characteristic properties ([Vol 3] Part G, Section 3.3.1.1).
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct Prop: u8 {
        /// Permits broadcasts of the Characteristic Value using Server
        /// Characteristic Configuration Descriptor. If set, the Server
        /// Characteristic Configuration Descriptor shall exist.
        const BROADCAST = 0x01;
        /// Permits reads of the Characteristic Value.
        const READ = 0x02;
        /// Permit writes of the Characteristic Value without response.
        const WRITE_CMD = 0x04;
        /// Permits writes of the Characteristic Value with response.
        const WRITE = 0x08;
        /// Permits notifications of a Characteristic Value without
        /// acknowledgment. If set, the Client Characteristic Configuration
        /// Descriptor shall exist.
        const NOTIFY = 0x10;
        /// Permits indications of a Characteristic Value with acknowledgment.
        /// If set, the Client Characteristic Configuration Descriptor shall
        /// exist.
        const INDICATE = 0x20;
        /// Permits signed writes to the Characteristic Value.
        const SIGNED_WRITE_CMD = 0x40;
        /// Additional characteristic properties are defined in the
        /// Characteristic Extended Properties Descriptor. If set, the
        /// Characteristic Extended Properties Descriptor shall exist.
        const EXT_PROPS = 0x80;
    }
}

impl Prop {
    /// Properties that permit some form of write.
    pub const ANY_WRITE: Self = Self::WRITE_CMD.union(Self::WRITE).union(Self::SIGNED_WRITE_CMD);
}

bitflags! {
    /// Characteristic Extended Properties descriptor value
    /// ([Vol 3] Part G, Section 3.3.3.1).
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct ExtProp: u16 {
        /// Permits reliable writes of the Characteristic Value.
        const RELIABLE_WRITE = 1 << 0;
        /// Permits writes to the characteristic descriptor.
        const WRITABLE_AUX = 1 << 1;
    }
}

bitflags! {
    /// Client Characteristic Configuration descriptor value
    /// ([Vol 3] Part G, Section 3.3.3.3).
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct Cccd: u16 {
        /// The Characteristic Value shall be notified.
        const NOTIFY = 1 << 0;
        /// The Characteristic Value shall be indicated.
        const INDICATE = 1 << 1;
    }
}

impl Cccd {
    /// Decodes a descriptor value. Returns [`None`] if the value is not
    /// exactly two bytes.
    #[inline]
    #[must_use]
    pub fn from_value(v: &[u8]) -> Option<Self> {
        use structbuf::Unpack;
        (v.len() == 2).then(|| Self::from_bits_truncate(v.unpack().u16()))
    }

    /// Returns the encoded descriptor value.
    #[inline]
    #[must_use]
    pub const fn to_value(self) -> [u8; 2] {
        self.bits().to_le_bytes()
    }
}
