//! The device manager: one socket, one registry, one dispatch loop.
//!
//! The dispatch loop consumes request frames from the driver, serves
//! Who-Is/ReadProperty/WriteProperty against the registry, and folds
//! I-Am replies into the discovered-device map and any discovery
//! windows open at the time. Events go out over a channel so no
//! subscriber code ever runs under a lock.

use crate::client;
use crate::config::DeviceConfig;
use crate::driver::{Driver, IncomingApdu};
use crate::error::DeviceError;
use crate::object::{BacnetObject, ObjectError, ObjectRegistry};
use crate::server::{self, LocalIdentity};
use crate::value::PropertyValue;
use bacstack_core::apdu::{ApduType, ConfirmedRequestHeader, UnconfirmedRequestHeader};
use bacstack_core::encoding::{reader::Reader, writer::Writer};
use bacstack_core::services::{
    IAmRequest, WhoIsRequest, SERVICE_I_AM, SERVICE_WHO_IS,
};
use bacstack_core::types::{ObjectId, Segmentation};
use bacstack_datalink::{BipTransport, LinkAddress};
use std::collections::{HashMap, HashSet};
use std::future::{pending, Future};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A peer device learned from I-Am.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub instance: u32,
    pub vendor_id: u32,
    pub max_apdu: u32,
    pub segmentation: Segmentation,
    pub address: LinkAddress,
}

/// Lifecycle notifications published by a manager.
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    /// A device instance was seen for the first time.
    Discovered(DeviceRecord),
    /// An object was added to the local registry.
    Added(ObjectId),
    /// An object was removed from the local registry.
    Removed(ObjectId),
}

/// Receiver half of the event channel; dropped events are never
/// replayed.
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<DeviceEvent>,
}

impl EventStream {
    /// The next event, or `None` once the manager is gone.
    pub async fn recv(&mut self) -> Option<DeviceEvent> {
        self.rx.recv().await
    }
}

#[derive(Default)]
struct DiscoveryWindows {
    next_id: u64,
    active: Vec<(u64, WindowState)>,
}

#[derive(Default)]
struct WindowState {
    seen: HashSet<u32>,
    found: Vec<DeviceRecord>,
}

impl DiscoveryWindows {
    fn open(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.active.push((id, WindowState::default()));
        id
    }

    fn close(&mut self, id: u64) -> Vec<DeviceRecord> {
        match self.active.iter().position(|(window, _)| *window == id) {
            Some(at) => self.active.swap_remove(at).1.found,
            None => Vec::new(),
        }
    }

    fn offer(&mut self, record: &DeviceRecord) {
        for (_, state) in &mut self.active {
            // First reply wins within a window.
            if state.seen.insert(record.instance) {
                state.found.push(record.clone());
            }
        }
    }
}

/// A running BACnet device: server, client, and discovery over one
/// UDP socket.
pub struct DeviceManager {
    identity: LocalIdentity,
    registry: Arc<ObjectRegistry>,
    driver: Arc<Driver>,
    records: Arc<Mutex<HashMap<u32, DeviceRecord>>>,
    windows: Arc<Mutex<DiscoveryWindows>>,
    events: mpsc::UnboundedSender<DeviceEvent>,
    dispatch_task: JoinHandle<()>,
}

impl DeviceManager {
    /// Binds the socket, registers the local device object, and starts
    /// the receive and dispatch loops.
    pub async fn start(config: DeviceConfig) -> Result<(Self, EventStream), DeviceError> {
        let link = BipTransport::bind(config.bind_socket_addr()).await?;
        let (driver, inbound_rx) = Driver::start(link, &config);
        let driver = Arc::new(driver);

        let mut device = crate::object::DeviceObject::new(config.instance, &config.device_name);
        device.location = config.location.clone();
        device.vendor_name = config.vendor_name.clone();
        device.vendor_id = config.vendor_id;
        device.model_name = config.model_name.clone();
        device.firmware_revision = config.firmware_revision.clone();
        device.max_apdu = config.max_apdu;
        device.segmentation = config.segmentation;
        let registry = Arc::new(ObjectRegistry::new(device));

        let identity = LocalIdentity::from_config(&config);
        let records = Arc::new(Mutex::new(HashMap::new()));
        let windows = Arc::new(Mutex::new(DiscoveryWindows::default()));
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let dispatch_task = tokio::spawn(dispatch_loop(
            inbound_rx,
            Arc::clone(&driver),
            Arc::clone(&registry),
            identity,
            Arc::clone(&records),
            Arc::clone(&windows),
            events_tx.clone(),
        ));

        Ok((
            Self {
                identity,
                registry,
                driver,
                records,
                windows,
                events: events_tx,
                dispatch_task,
            },
            EventStream { rx: events_rx },
        ))
    }

    /// The bound socket address (useful when the port was 0).
    pub fn local_addr(&self) -> Result<SocketAddr, DeviceError> {
        self.driver.local_addr()
    }

    /// Object id of the local device object.
    pub fn device_id(&self) -> ObjectId {
        self.identity.device_id
    }

    /// The local object registry.
    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    /// Registers an object and announces it on the event channel.
    pub fn add_object(&self, object: impl Into<BacnetObject>) -> Result<ObjectId, ObjectError> {
        let id = self.registry.add(object)?;
        let _ = self.events.send(DeviceEvent::Added(id));
        Ok(id)
    }

    /// Unregisters an object and announces the removal.
    pub fn remove_object(&self, id: ObjectId) -> Result<(), ObjectError> {
        self.registry.remove(id)?;
        let _ = self.events.send(DeviceEvent::Removed(id));
        Ok(())
    }

    /// The record for a discovered device instance, if any.
    pub fn device_record(&self, instance: u32) -> Option<DeviceRecord> {
        self.lock_records().get(&instance).cloned()
    }

    /// All discovered device records.
    pub fn device_records(&self) -> Vec<DeviceRecord> {
        self.lock_records().values().cloned().collect()
    }

    /// Broadcasts a global Who-Is and collects I-Am replies for
    /// `window`, deduplicated by device instance.
    pub async fn discover_devices(
        &self,
        window: Duration,
    ) -> Result<Vec<DeviceRecord>, DeviceError> {
        self.discover(None, window, pending()).await
    }

    /// Ranged discovery; panics when `low > high`.
    pub async fn discover_devices_in_range(
        &self,
        low: u32,
        high: u32,
        window: Duration,
    ) -> Result<Vec<DeviceRecord>, DeviceError> {
        self.discover(Some((low, high)), window, pending()).await
    }

    /// Discovery that ends early when `cancel` resolves, returning the
    /// records collected so far.
    pub async fn discover_devices_with_cancel(
        &self,
        window: Duration,
        cancel: impl Future<Output = ()>,
    ) -> Result<Vec<DeviceRecord>, DeviceError> {
        self.discover(None, window, cancel).await
    }

    async fn discover(
        &self,
        range: Option<(u32, u32)>,
        window: Duration,
        cancel: impl Future<Output = ()>,
    ) -> Result<Vec<DeviceRecord>, DeviceError> {
        let who_is = match range {
            Some((low, high)) => WhoIsRequest::ranged(low, high),
            None => WhoIsRequest::global(),
        };
        let mut buf = [0u8; 64];
        let mut w = Writer::new(&mut buf);
        UnconfirmedRequestHeader {
            service_choice: SERVICE_WHO_IS,
        }
        .encode(&mut w)?;
        who_is.encode(&mut w)?;

        let id = self.lock_windows().open();
        if let Err(err) = self.driver.broadcast_apdu(w.as_written()).await {
            self.lock_windows().close(id);
            return Err(err);
        }

        tokio::pin!(cancel);
        tokio::select! {
            _ = tokio::time::sleep(window) => {}
            _ = &mut cancel => {}
        }
        Ok(self.lock_windows().close(id))
    }

    /// Reads a property from a remote object.
    pub async fn read_property(
        &self,
        peer: LinkAddress,
        object_id: ObjectId,
        property_id: bacstack_core::types::PropertyId,
        array_index: Option<u32>,
    ) -> Result<PropertyValue, DeviceError> {
        client::read_property(
            &self.driver,
            peer,
            object_id,
            property_id,
            array_index,
            None,
            pending(),
        )
        .await
    }

    /// [`read_property`](Self::read_property) with a timeout override
    /// and a cancellation signal.
    pub async fn read_property_with_cancel(
        &self,
        peer: LinkAddress,
        object_id: ObjectId,
        property_id: bacstack_core::types::PropertyId,
        array_index: Option<u32>,
        timeout: Option<Duration>,
        cancel: impl Future<Output = ()>,
    ) -> Result<PropertyValue, DeviceError> {
        client::read_property(
            &self.driver,
            peer,
            object_id,
            property_id,
            array_index,
            timeout,
            cancel,
        )
        .await
    }

    /// Writes a property on a remote object.
    pub async fn write_property(
        &self,
        peer: LinkAddress,
        object_id: ObjectId,
        property_id: bacstack_core::types::PropertyId,
        value: &PropertyValue,
        array_index: Option<u32>,
        priority: Option<u8>,
    ) -> Result<(), DeviceError> {
        client::write_property(
            &self.driver,
            peer,
            object_id,
            property_id,
            value,
            array_index,
            priority,
            None,
            pending(),
        )
        .await
    }

    /// [`write_property`](Self::write_property) with a timeout override
    /// and a cancellation signal.
    #[allow(clippy::too_many_arguments)]
    pub async fn write_property_with_cancel(
        &self,
        peer: LinkAddress,
        object_id: ObjectId,
        property_id: bacstack_core::types::PropertyId,
        value: &PropertyValue,
        array_index: Option<u32>,
        priority: Option<u8>,
        timeout: Option<Duration>,
        cancel: impl Future<Output = ()>,
    ) -> Result<(), DeviceError> {
        client::write_property(
            &self.driver,
            peer,
            object_id,
            property_id,
            value,
            array_index,
            priority,
            timeout,
            cancel,
        )
        .await
    }

    /// Announces the local device unsolicited (e.g. at startup).
    pub async fn announce(&self) -> Result<(), DeviceError> {
        let mut buf = [0u8; 64];
        let mut w = Writer::new(&mut buf);
        UnconfirmedRequestHeader {
            service_choice: SERVICE_I_AM,
        }
        .encode(&mut w)?;
        self.identity.i_am().encode(&mut w)?;
        self.driver.broadcast_apdu(w.as_written()).await
    }

    /// Stops the dispatch loop and the driver; every pending request
    /// fails with `Shutdown`.
    pub fn shutdown(self) {
        self.dispatch_task.abort();
        self.driver.shutdown();
    }

    fn lock_records(&self) -> MutexGuard<'_, HashMap<u32, DeviceRecord>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_windows(&self) -> MutexGuard<'_, DiscoveryWindows> {
        self.windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for DeviceManager {
    fn drop(&mut self) {
        self.dispatch_task.abort();
        self.driver.shutdown();
    }
}

#[allow(clippy::too_many_arguments)]
async fn dispatch_loop(
    mut inbound: mpsc::UnboundedReceiver<IncomingApdu>,
    driver: Arc<Driver>,
    registry: Arc<ObjectRegistry>,
    identity: LocalIdentity,
    records: Arc<Mutex<HashMap<u32, DeviceRecord>>>,
    windows: Arc<Mutex<DiscoveryWindows>>,
    events: mpsc::UnboundedSender<DeviceEvent>,
) {
    while let Some(frame) = inbound.recv().await {
        let outcome = dispatch_frame(
            &frame, &driver, &registry, &identity, &records, &windows, &events,
        )
        .await;
        if let Err(err) = outcome {
            // One malformed peer must not end the loop.
            log::debug!("dropping frame from {}: {err}", frame.source);
        }
    }
}

async fn dispatch_frame(
    frame: &IncomingApdu,
    driver: &Driver,
    registry: &ObjectRegistry,
    identity: &LocalIdentity,
    records: &Mutex<HashMap<u32, DeviceRecord>>,
    windows: &Mutex<DiscoveryWindows>,
    events: &mpsc::UnboundedSender<DeviceEvent>,
) -> Result<(), DeviceError> {
    let mut r = Reader::new(&frame.apdu);
    match ApduType::of(&frame.apdu)? {
        ApduType::UnconfirmedRequest => {
            let header = UnconfirmedRequestHeader::decode(&mut r)?;
            match header.service_choice {
                SERVICE_I_AM => {
                    let i_am = IAmRequest::decode(&mut r)?;
                    if i_am.device_id != identity.device_id {
                        note_i_am(records, windows, events, &i_am, frame.source);
                    }
                }
                SERVICE_WHO_IS => {
                    if let Some(reply) = server::answer_who_is(identity, &mut r)? {
                        driver.send_apdu(frame.source, &reply).await?;
                    }
                }
                other => log::debug!("unhandled unconfirmed service {other}"),
            }
        }
        ApduType::ConfirmedRequest => {
            let header = ConfirmedRequestHeader::decode(&mut r)?;
            // The registry lock is taken and released inside; the reply
            // is sent with no lock held.
            let reply = server::answer_confirmed(registry, &header, &mut r);
            driver.send_apdu(frame.source, &reply).await?;
        }
        // Reply PDUs are correlated inside the driver, never here.
        _ => {}
    }
    Ok(())
}

/// Folds one I-Am into the record map and any open discovery windows.
fn note_i_am(
    records: &Mutex<HashMap<u32, DeviceRecord>>,
    windows: &Mutex<DiscoveryWindows>,
    events: &mpsc::UnboundedSender<DeviceEvent>,
    i_am: &IAmRequest,
    source: LinkAddress,
) {
    let record = DeviceRecord {
        instance: i_am.device_id.instance(),
        vendor_id: i_am.vendor_id,
        max_apdu: i_am.max_apdu,
        segmentation: i_am.segmentation,
        address: source,
    };

    let newly_seen = {
        let mut map = records.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // Re-announcements update in place: the address may have moved.
        map.insert(record.instance, record.clone()).is_none()
    };
    if newly_seen {
        let _ = events.send(DeviceEvent::Discovered(record.clone()));
    }

    windows
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .offer(&record);
}
