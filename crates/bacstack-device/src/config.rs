use bacstack_core::types::{MaxApdu, Segmentation};
use bacstack_datalink::LinkAddress;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Where broadcasts go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastMode {
    /// The limited broadcast `255.255.255.255` on the configured port.
    Global,
    /// A subnet-directed broadcast address (or, in tests, a concrete
    /// peer).
    Directed(SocketAddr),
}

/// Per-instance configuration of a [`DeviceManager`](crate::DeviceManager).
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub bind_address: IpAddr,
    pub port: u16,
    pub broadcast: BroadcastMode,
    pub default_timeout: Duration,
    /// Cap on concurrently pending confirmed requests; the invoke-id
    /// space is one octet, so 255 is the protocol maximum.
    pub max_inflight: u8,
    pub max_apdu: MaxApdu,
    pub segmentation: Segmentation,
    /// Instance number of the local device object, advertised in I-Am.
    pub instance: u32,
    pub vendor_id: u32,
    pub vendor_name: String,
    pub device_name: String,
    pub model_name: String,
    pub firmware_revision: String,
    pub location: String,
}

impl DeviceConfig {
    pub fn new(instance: u32) -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: LinkAddress::DEFAULT_PORT,
            broadcast: BroadcastMode::Global,
            default_timeout: Duration::from_millis(5000),
            max_inflight: 255,
            max_apdu: MaxApdu::Octets1476,
            segmentation: Segmentation::None,
            instance,
            vendor_id: 0,
            vendor_name: String::from("bacstack"),
            device_name: format!("bacstack-{instance}"),
            model_name: String::from("bacstack-device"),
            firmware_revision: String::from(env!("CARGO_PKG_VERSION")),
            location: String::new(),
        }
    }

    pub fn with_bind(mut self, address: IpAddr, port: u16) -> Self {
        self.bind_address = address;
        self.port = port;
        self
    }

    pub fn with_broadcast(mut self, mode: BroadcastMode) -> Self {
        self.broadcast = mode;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_max_inflight(mut self, max_inflight: u8) -> Self {
        self.max_inflight = max_inflight.max(1);
        self
    }

    pub fn with_vendor(mut self, id: u32, name: impl Into<String>) -> Self {
        self.vendor_id = id;
        self.vendor_name = name.into();
        self
    }

    pub fn with_device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = name.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub(crate) fn bind_socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    pub(crate) fn broadcast_address(&self) -> LinkAddress {
        match self.broadcast {
            BroadcastMode::Global => LinkAddress::global_broadcast(self.port),
            BroadcastMode::Directed(addr) => LinkAddress::Ip(addr),
        }
    }
}
