/// Segmentation capability advertised in I-Am.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Segmentation {
    Both = 0,
    Transmit = 1,
    Receive = 2,
    #[default]
    None = 3,
}

impl Segmentation {
    pub const fn to_u32(self) -> u32 {
        self as u32
    }

    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Both),
            1 => Some(Self::Transmit),
            2 => Some(Self::Receive),
            3 => Some(Self::None),
            _ => None,
        }
    }
}

/// Maximum APDU length a device accepts, as the coded value carried in
/// confirmed-request headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum MaxApdu {
    Octets50 = 0,
    Octets128 = 1,
    Octets206 = 2,
    Octets480 = 3,
    Octets1024 = 4,
    #[default]
    Octets1476 = 5,
}

impl MaxApdu {
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Octets50),
            1 => Some(Self::Octets128),
            2 => Some(Self::Octets206),
            3 => Some(Self::Octets480),
            4 => Some(Self::Octets1024),
            5 => Some(Self::Octets1476),
            _ => None,
        }
    }

    /// The octet count behind the code.
    pub const fn octets(self) -> u16 {
        match self {
            Self::Octets50 => 50,
            Self::Octets128 => 128,
            Self::Octets206 => 206,
            Self::Octets480 => 480,
            Self::Octets1024 => 1024,
            Self::Octets1476 => 1476,
        }
    }
}

/// Error class of a BACnet Error PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorClass {
    Device = 0,
    Object = 1,
    Property = 2,
    Resources = 3,
    Security = 4,
    Services = 5,
    Vt = 6,
    Communication = 7,
}

impl ErrorClass {
    pub const fn to_u32(self) -> u32 {
        self as u32
    }

    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Device),
            1 => Some(Self::Object),
            2 => Some(Self::Property),
            3 => Some(Self::Resources),
            4 => Some(Self::Security),
            5 => Some(Self::Services),
            6 => Some(Self::Vt),
            7 => Some(Self::Communication),
            _ => None,
        }
    }
}

/// Error code of a BACnet Error PDU (the subset this stack raises or
/// interprets).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    Other = 0,
    ConfigurationInProgress = 2,
    DeviceBusy = 3,
    InconsistentParameters = 7,
    InvalidDataType = 9,
    NoSpaceForObject = 18,
    UnknownObject = 31,
    UnknownProperty = 32,
    ValueOutOfRange = 37,
    WriteAccessDenied = 40,
    InvalidArrayIndex = 42,
    OptionalFunctionalityNotSupported = 45,
    PropertyIsNotAnArray = 50,
}

impl ErrorCode {
    pub const fn to_u32(self) -> u32 {
        self as u32
    }

    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Other),
            2 => Some(Self::ConfigurationInProgress),
            3 => Some(Self::DeviceBusy),
            7 => Some(Self::InconsistentParameters),
            9 => Some(Self::InvalidDataType),
            18 => Some(Self::NoSpaceForObject),
            31 => Some(Self::UnknownObject),
            32 => Some(Self::UnknownProperty),
            37 => Some(Self::ValueOutOfRange),
            40 => Some(Self::WriteAccessDenied),
            42 => Some(Self::InvalidArrayIndex),
            45 => Some(Self::OptionalFunctionalityNotSupported),
            50 => Some(Self::PropertyIsNotAnArray),
            _ => None,
        }
    }
}

/// Reason byte of a Reject PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RejectReason {
    Other = 0,
    BufferOverflow = 1,
    InconsistentParameters = 2,
    InvalidParameterDataType = 3,
    InvalidTag = 4,
    MissingRequiredParameter = 5,
    ParameterOutOfRange = 6,
    TooManyArguments = 7,
    UndefinedEnumeration = 8,
    UnrecognizedService = 9,
}

/// Reason byte of an Abort PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AbortReason {
    Other = 0,
    BufferOverflow = 1,
    InvalidApduInThisState = 2,
    PreemptedByHigherPriorityTask = 3,
    SegmentationNotSupported = 4,
}
