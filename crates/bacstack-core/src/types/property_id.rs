/// BACnet property identifiers.
///
/// Named variants for the properties this stack reads, writes, or
/// serves; everything else keeps its numeric identity through
/// [`Other`](Self::Other), which also carries vendor-proprietary ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyId {
    Description,
    EventState,
    FirmwareRevision,
    Location,
    MaxApduLengthAccepted,
    MaxPresValue,
    MinPresValue,
    ModelName,
    ObjectIdentifier,
    ObjectList,
    ObjectName,
    ObjectType,
    OutOfService,
    PresentValue,
    PriorityArray,
    ProtocolVersion,
    RelinquishDefault,
    SegmentationSupported,
    StatusFlags,
    SystemStatus,
    Units,
    VendorIdentifier,
    VendorName,
    Other(u32),
}

impl PropertyId {
    pub const fn to_u32(self) -> u32 {
        match self {
            Self::Description => 28,
            Self::EventState => 36,
            Self::FirmwareRevision => 44,
            Self::Location => 58,
            Self::MaxApduLengthAccepted => 62,
            Self::MaxPresValue => 65,
            Self::MinPresValue => 69,
            Self::ModelName => 70,
            Self::ObjectIdentifier => 75,
            Self::ObjectList => 76,
            Self::ObjectName => 77,
            Self::ObjectType => 79,
            Self::OutOfService => 81,
            Self::PresentValue => 85,
            Self::PriorityArray => 87,
            Self::ProtocolVersion => 98,
            Self::RelinquishDefault => 104,
            Self::SegmentationSupported => 107,
            Self::StatusFlags => 111,
            Self::SystemStatus => 112,
            Self::Units => 117,
            Self::VendorIdentifier => 120,
            Self::VendorName => 121,
            Self::Other(v) => v,
        }
    }

    pub const fn from_u32(value: u32) -> Self {
        match value {
            28 => Self::Description,
            36 => Self::EventState,
            44 => Self::FirmwareRevision,
            58 => Self::Location,
            62 => Self::MaxApduLengthAccepted,
            65 => Self::MaxPresValue,
            69 => Self::MinPresValue,
            70 => Self::ModelName,
            75 => Self::ObjectIdentifier,
            76 => Self::ObjectList,
            77 => Self::ObjectName,
            79 => Self::ObjectType,
            81 => Self::OutOfService,
            85 => Self::PresentValue,
            87 => Self::PriorityArray,
            98 => Self::ProtocolVersion,
            104 => Self::RelinquishDefault,
            107 => Self::SegmentationSupported,
            111 => Self::StatusFlags,
            112 => Self::SystemStatus,
            117 => Self::Units,
            120 => Self::VendorIdentifier,
            121 => Self::VendorName,
            v => Self::Other(v),
        }
    }
}
