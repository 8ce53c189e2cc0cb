//! The UDP transport driver.
//!
//! One receive task owns the socket's inbound side. Replies are
//! correlated to callers through a 256-slot pending table keyed by
//! invoke id; request and unconfirmed frames are handed to the dispatch
//! loop over a channel. The pending-table mutex is never held across a
//! socket operation or an `.await`.

use crate::config::DeviceConfig;
use crate::error::DeviceError;
use bacstack_core::apdu::{
    AbortPdu, ApduType, ComplexAckHeader, ConfirmedRequestHeader, ErrorPdu, RejectPdu, SimpleAck,
};
use bacstack_core::encoding::{reader::Reader, writer::Writer};
use bacstack_core::npdu::Npdu;
use bacstack_core::types::MaxApdu;
use bacstack_core::EncodeError;
use bacstack_datalink::bip::transport::MAX_FRAME_LEN;
use bacstack_datalink::{BipTransport, DataLink, LinkAddress};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// A request or unconfirmed frame awaiting dispatch.
#[derive(Debug)]
pub(crate) struct IncomingApdu {
    pub source: LinkAddress,
    pub apdu: Vec<u8>,
}

/// What a peer answered to a confirmed request.
#[derive(Debug)]
pub(crate) enum ServiceReply {
    SimpleAck,
    /// Service payload following the Complex-Ack header.
    ComplexAck(Vec<u8>),
    /// The peer answered with a segmented acknowledgement, which this
    /// stack does not reassemble.
    Segmented,
    Error {
        invoke_id: u8,
        error_class: Option<u32>,
        error_code: Option<u32>,
    },
    Reject {
        reason: u8,
    },
    Abort {
        reason: u8,
        server: bool,
    },
}

struct PendingEntry {
    service_choice: u8,
    peer: LinkAddress,
    tx: oneshot::Sender<ServiceReply>,
}

struct PendingTable {
    slots: Vec<Option<PendingEntry>>,
    cursor: u8,
    in_flight: usize,
    limit: usize,
    open: bool,
}

impl PendingTable {
    fn new(limit: usize) -> Self {
        Self {
            slots: (0..=u8::MAX).map(|_| None).collect(),
            cursor: 0,
            in_flight: 0,
            limit,
            open: true,
        }
    }

    /// Claims the next free invoke id, scanning from a rolling cursor.
    fn reserve(
        &mut self,
        service_choice: u8,
        peer: LinkAddress,
    ) -> Result<(u8, oneshot::Receiver<ServiceReply>), DeviceError> {
        if !self.open {
            return Err(DeviceError::Shutdown);
        }
        if self.in_flight >= self.limit {
            return Err(DeviceError::ResourceBusy);
        }
        for offset in 0..=u8::MAX {
            let id = self.cursor.wrapping_add(offset);
            if self.slots[usize::from(id)].is_none() {
                let (tx, rx) = oneshot::channel();
                self.slots[usize::from(id)] = Some(PendingEntry {
                    service_choice,
                    peer,
                    tx,
                });
                self.in_flight += 1;
                self.cursor = id.wrapping_add(1);
                return Ok((id, rx));
            }
        }
        Err(DeviceError::ResourceBusy)
    }

    /// Removes an entry regardless of state (timeout, cancellation).
    fn release(&mut self, invoke_id: u8) -> Option<PendingEntry> {
        let entry = self.slots[usize::from(invoke_id)].take();
        if entry.is_some() {
            self.in_flight -= 1;
        }
        entry
    }

    /// Removes an entry only if it matches the reply's correlation
    /// data: invoke id, source, and (when the reply carries one) the
    /// service choice.
    fn take_matching(
        &mut self,
        invoke_id: u8,
        service_choice: Option<u8>,
        peer: LinkAddress,
    ) -> Option<PendingEntry> {
        let entry = self.slots[usize::from(invoke_id)].as_ref()?;
        if entry.peer != peer {
            return None;
        }
        if let Some(choice) = service_choice {
            if entry.service_choice != choice {
                return None;
            }
        }
        self.release(invoke_id)
    }

    /// Drops every entry; their callers observe `Shutdown`.
    fn close(&mut self) {
        self.open = false;
        self.in_flight = 0;
        for slot in &mut self.slots {
            *slot = None;
        }
    }
}

/// Removes the pending entry when a request leaves `request()` by any
/// path the completer did not already clean up (timeout, cancellation,
/// send failure).
struct PendingGuard<'a> {
    pending: &'a Mutex<PendingTable>,
    invoke_id: u8,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .release(self.invoke_id);
    }
}

/// The running transport: socket, receive task, pending table.
pub(crate) struct Driver {
    link: BipTransport,
    pending: Arc<Mutex<PendingTable>>,
    recv_task: JoinHandle<()>,
    broadcast_addr: LinkAddress,
    default_timeout: Duration,
    max_apdu: MaxApdu,
}

impl Driver {
    /// Starts the receive loop on `link`, returning the driver handle
    /// and the channel of inbound request frames.
    pub(crate) fn start(
        link: BipTransport,
        config: &DeviceConfig,
    ) -> (Self, mpsc::UnboundedReceiver<IncomingApdu>) {
        let pending = Arc::new(Mutex::new(PendingTable::new(usize::from(
            config.max_inflight,
        ))));
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        let recv_link = link.clone();
        let recv_pending = Arc::clone(&pending);
        let recv_task = tokio::spawn(async move {
            recv_loop(recv_link, recv_pending, inbound_tx).await;
        });

        (
            Self {
                link,
                pending,
                recv_task,
                broadcast_addr: config.broadcast_address(),
                default_timeout: config.default_timeout,
                max_apdu: config.max_apdu,
            },
            inbound_rx,
        )
    }

    pub(crate) fn local_addr(&self) -> Result<std::net::SocketAddr, DeviceError> {
        Ok(self.link.local_addr()?)
    }

    /// Sends a confirmed request and awaits the correlated reply.
    ///
    /// `cancel` resolving withdraws the request promptly; so does
    /// dropping the returned future.
    pub(crate) async fn request(
        &self,
        peer: LinkAddress,
        service_choice: u8,
        encode_params: &(dyn Fn(&mut Writer<'_>) -> Result<(), EncodeError> + Sync),
        timeout_override: Option<Duration>,
        cancel: impl Future<Output = ()>,
    ) -> Result<ServiceReply, DeviceError> {
        let (invoke_id, rx) = self.lock_pending().reserve(service_choice, peer)?;
        let _guard = PendingGuard {
            pending: self.pending.as_ref(),
            invoke_id,
        };

        let mut buf = [0u8; MAX_FRAME_LEN];
        let mut w = Writer::new(&mut buf);
        Npdu::expecting_reply().encode(&mut w)?;
        ConfirmedRequestHeader::unsegmented(invoke_id, service_choice, self.max_apdu)
            .encode(&mut w)?;
        encode_params(&mut w)?;
        self.link.send(peer, w.as_written()).await?;

        let window = timeout_override.unwrap_or(self.default_timeout);
        tokio::pin!(cancel);
        tokio::select! {
            _ = &mut cancel => Err(DeviceError::Cancelled),
            outcome = tokio::time::timeout(window, rx) => match outcome {
                Err(_) => Err(DeviceError::Timeout),
                Ok(Err(_)) => Err(DeviceError::Shutdown),
                Ok(Ok(reply)) => Ok(reply),
            },
        }
    }

    /// Sends an APDU image to one peer under a plain NPDU.
    pub(crate) async fn send_apdu(&self, peer: LinkAddress, apdu: &[u8]) -> Result<(), DeviceError> {
        let mut buf = [0u8; MAX_FRAME_LEN];
        let mut w = Writer::new(&mut buf);
        Npdu::application().encode(&mut w)?;
        w.write_all(apdu)?;
        self.link.send(peer, w.as_written()).await?;
        Ok(())
    }

    /// Sends an APDU image to the configured broadcast address.
    pub(crate) async fn broadcast_apdu(&self, apdu: &[u8]) -> Result<(), DeviceError> {
        let mut buf = [0u8; MAX_FRAME_LEN];
        let mut w = Writer::new(&mut buf);
        Npdu::application().encode(&mut w)?;
        w.write_all(apdu)?;
        self.link.broadcast(self.broadcast_addr, w.as_written()).await?;
        Ok(())
    }

    /// Stops the receive loop and fails every pending request with
    /// `Shutdown`. Idempotent; also run on drop.
    pub(crate) fn shutdown(&self) {
        self.recv_task.abort();
        self.lock_pending().close();
    }

    fn lock_pending(&self) -> MutexGuard<'_, PendingTable> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn recv_loop(
    link: BipTransport,
    pending: Arc<Mutex<PendingTable>>,
    inbound_tx: mpsc::UnboundedSender<IncomingApdu>,
) {
    let mut buf = [0u8; MAX_FRAME_LEN];
    loop {
        let (n, source) = match link.recv(&mut buf).await {
            Ok(received) => received,
            Err(err) => {
                // Includes ICMP-driven send errors surfacing on recv;
                // the socket stays usable.
                log::debug!("dropping undecodable datagram: {err}");
                continue;
            }
        };
        if inbound_tx.is_closed() {
            return;
        }
        handle_frame(&pending, &inbound_tx, &buf[..n], source);
    }
}

fn handle_frame(
    pending: &Mutex<PendingTable>,
    inbound_tx: &mpsc::UnboundedSender<IncomingApdu>,
    frame: &[u8],
    source: LinkAddress,
) {
    let mut r = Reader::new(frame);
    let npdu = match Npdu::decode(&mut r) {
        Ok(npdu) => npdu,
        Err(err) => {
            log::debug!("bad NPDU from {source}: {err}");
            return;
        }
    };
    if npdu.is_network_message() {
        log::debug!(
            "ignoring network-layer message type {:?} from {source}",
            npdu.message_type
        );
        return;
    }

    let apdu = r.rest();
    let apdu_type = match ApduType::of(apdu) {
        Ok(t) => t,
        Err(err) => {
            log::debug!("bad APDU from {source}: {err}");
            return;
        }
    };

    let mut ar = Reader::new(apdu);
    let completion = match apdu_type {
        ApduType::ConfirmedRequest | ApduType::UnconfirmedRequest => {
            let _ = inbound_tx.send(IncomingApdu {
                source,
                apdu: apdu.to_vec(),
            });
            return;
        }
        ApduType::SimpleAck => SimpleAck::decode(&mut ar).ok().map(|ack| {
            (
                ack.invoke_id,
                Some(ack.service_choice),
                ServiceReply::SimpleAck,
            )
        }),
        ApduType::ComplexAck => ComplexAckHeader::decode(&mut ar).ok().map(|header| {
            let reply = if header.segmented {
                ServiceReply::Segmented
            } else {
                ServiceReply::ComplexAck(ar.rest().to_vec())
            };
            (header.invoke_id, Some(header.service_choice), reply)
        }),
        ApduType::Error => ErrorPdu::decode(&mut ar).ok().map(|err| {
            (
                err.invoke_id,
                Some(err.service_choice),
                ServiceReply::Error {
                    invoke_id: err.invoke_id,
                    error_class: err.error_class,
                    error_code: err.error_code,
                },
            )
        }),
        ApduType::Reject => RejectPdu::decode(&mut ar).ok().map(|rej| {
            (
                rej.invoke_id,
                None,
                ServiceReply::Reject { reason: rej.reason },
            )
        }),
        ApduType::Abort => AbortPdu::decode(&mut ar).ok().map(|abort| {
            (
                abort.invoke_id,
                None,
                ServiceReply::Abort {
                    reason: abort.reason,
                    server: abort.server,
                },
            )
        }),
        ApduType::SegmentAck => {
            log::debug!("discarding segment ack from {source}");
            return;
        }
    };

    let Some((invoke_id, service_choice, reply)) = completion else {
        log::debug!("undecodable reply APDU from {source}");
        return;
    };

    let entry = {
        let mut table = pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        table.take_matching(invoke_id, service_choice, source)
    };
    match entry {
        Some(entry) => {
            let _ = entry.tx.send(reply);
        }
        None => log::debug!("discarding reply for free invoke id {invoke_id} from {source}"),
    }
}

#[cfg(test)]
mod tests {
    use super::{Driver, ServiceReply};
    use crate::config::{BroadcastMode, DeviceConfig};
    use crate::error::DeviceError;
    use bacstack_core::apdu::ConfirmedRequestHeader;
    use bacstack_core::encoding::reader::Reader;
    use bacstack_core::npdu::Npdu;
    use bacstack_datalink::{BipTransport, LinkAddress};
    use std::future::pending;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::time::Duration;
    use tokio::net::UdpSocket;

    fn loopback() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
    }

    fn test_config() -> DeviceConfig {
        DeviceConfig::new(1)
            .with_bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
            .with_default_timeout(Duration::from_millis(400))
    }

    async fn start_driver(
        config: DeviceConfig,
    ) -> (Driver, tokio::sync::mpsc::UnboundedReceiver<super::IncomingApdu>) {
        let link = BipTransport::bind(loopback()).await.unwrap();
        Driver::start(link, &config)
    }

    /// Reads one confirmed request off `peer`, returning the source
    /// address and decoded header.
    async fn read_request(peer: &UdpSocket) -> (SocketAddr, ConfirmedRequestHeader) {
        let mut buf = [0u8; 256];
        let (n, src) = peer.recv_from(&mut buf).await.unwrap();
        let mut r = Reader::new(&buf[4..n]);
        Npdu::decode(&mut r).unwrap();
        (src, ConfirmedRequestHeader::decode(&mut r).unwrap())
    }

    /// Wraps an APDU in BVLC + NPDU and sends it to `target`.
    async fn send_apdu(peer: &UdpSocket, target: SocketAddr, apdu: &[u8]) {
        let mut frame = vec![0x81, 0x0A, 0x00, 0x00, 0x01, 0x00];
        frame.extend_from_slice(apdu);
        let len = frame.len() as u16;
        frame[2..4].copy_from_slice(&len.to_be_bytes());
        peer.send_to(&frame, target).await.unwrap();
    }

    #[tokio::test]
    async fn replies_complete_their_own_request_even_out_of_order() {
        let (driver, _inbound) = start_driver(test_config()).await;
        let peer = UdpSocket::bind(loopback()).await.unwrap();
        let peer_addr = LinkAddress::Ip(peer.local_addr().unwrap());

        let responder = tokio::spawn(async move {
            let (src_a, first) = read_request(&peer).await;
            let (_, second) = read_request(&peer).await;
            assert_ne!(first.invoke_id, second.invoke_id);

            // Answer the second request first.
            send_apdu(&peer, src_a, &[0x20, second.invoke_id, 0x0F]).await;
            send_apdu(&peer, src_a, &[0x20, first.invoke_id, 0x0F]).await;
        });

        let (a, b) = tokio::join!(
            driver.request(peer_addr, 0x0F, &|_w| Ok(()), None, pending()),
            driver.request(peer_addr, 0x0F, &|_w| Ok(()), None, pending()),
        );
        assert!(matches!(a.unwrap(), ServiceReply::SimpleAck));
        assert!(matches!(b.unwrap(), ServiceReply::SimpleAck));
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn unanswered_requests_time_out_and_free_their_slot() {
        let (driver, _inbound) = start_driver(test_config().with_max_inflight(1)).await;
        let peer = UdpSocket::bind(loopback()).await.unwrap();
        let peer_addr = LinkAddress::Ip(peer.local_addr().unwrap());

        let err = driver
            .request(
                peer_addr,
                0x0C,
                &|_w| Ok(()),
                Some(Duration::from_millis(50)),
                pending(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::Timeout));

        // The slot freed by the timeout is reservable again.
        let (src, header) = {
            let request = driver.request(
                peer_addr,
                0x0C,
                &|_w| Ok(()),
                Some(Duration::from_millis(200)),
                pending(),
            );
            tokio::pin!(request);
            tokio::select! {
                _ = &mut request => panic!("no reply was sent yet"),
                header = read_request(&peer) => header,
            }
        };
        assert_eq!(src, driver.local_addr().unwrap());
        // A late reply for the timed-out id is discarded without effect.
        let _ = header;
    }

    #[tokio::test]
    async fn inflight_limit_yields_resource_busy() {
        let (driver, _inbound) = start_driver(test_config().with_max_inflight(1)).await;
        let peer = UdpSocket::bind(loopback()).await.unwrap();
        let peer_addr = LinkAddress::Ip(peer.local_addr().unwrap());

        let slow = driver.request(
            peer_addr,
            0x0C,
            &|_w| Ok(()),
            Some(Duration::from_millis(300)),
            pending(),
        );
        tokio::pin!(slow);
        // Let the first request reserve its slot.
        tokio::select! {
            _ = &mut slow => panic!("peer never answers"),
            _ = tokio::time::sleep(Duration::from_millis(20)) => {}
        }

        let err = driver
            .request(peer_addr, 0x0C, &|_w| Ok(()), None, pending())
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::ResourceBusy));
    }

    #[tokio::test]
    async fn cancellation_frees_the_slot_promptly() {
        let (driver, _inbound) = start_driver(test_config().with_max_inflight(1)).await;
        let peer = UdpSocket::bind(loopback()).await.unwrap();
        let peer_addr = LinkAddress::Ip(peer.local_addr().unwrap());

        let err = driver
            .request(
                peer_addr,
                0x0C,
                &|_w| Ok(()),
                None,
                tokio::time::sleep(Duration::from_millis(30)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::Cancelled));

        // The cancelled slot is free; a new request is accepted.
        let next = driver.request(
            peer_addr,
            0x0C,
            &|_w| Ok(()),
            Some(Duration::from_millis(50)),
            pending(),
        );
        assert!(matches!(next.await.unwrap_err(), DeviceError::Timeout));
    }

    #[tokio::test]
    async fn shutdown_fails_pending_requests() {
        let (driver, _inbound) = start_driver(test_config()).await;
        let peer = UdpSocket::bind(loopback()).await.unwrap();
        let peer_addr = LinkAddress::Ip(peer.local_addr().unwrap());

        let request = driver.request(
            peer_addr,
            0x0C,
            &|_w| Ok(()),
            Some(Duration::from_secs(5)),
            pending(),
        );
        tokio::pin!(request);
        tokio::select! {
            _ = &mut request => panic!("peer never answers"),
            _ = tokio::time::sleep(Duration::from_millis(20)) => {}
        }

        driver.shutdown();
        assert!(matches!(request.await.unwrap_err(), DeviceError::Shutdown));
        assert!(matches!(
            driver
                .request(peer_addr, 0x0C, &|_w| Ok(()), None, pending())
                .await
                .unwrap_err(),
            DeviceError::Shutdown
        ));
    }

    #[tokio::test]
    async fn mismatched_service_choice_does_not_complete() {
        let (driver, _inbound) = start_driver(test_config()).await;
        let peer = UdpSocket::bind(loopback()).await.unwrap();
        let peer_addr = LinkAddress::Ip(peer.local_addr().unwrap());

        let responder = tokio::spawn(async move {
            let (src, header) = read_request(&peer).await;
            // Right invoke id, wrong service choice: must be ignored.
            send_apdu(&peer, src, &[0x20, header.invoke_id, 0x0C]).await;
        });

        let err = driver
            .request(
                peer_addr,
                0x0F,
                &|_w| Ok(()),
                Some(Duration::from_millis(150)),
                pending(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::Timeout));
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn broadcast_mode_directed_reaches_the_configured_target() {
        let peer = UdpSocket::bind(loopback()).await.unwrap();
        let peer_sa = peer.local_addr().unwrap();
        let config = test_config().with_broadcast(BroadcastMode::Directed(peer_sa));
        let (driver, _inbound) = start_driver(config).await;

        driver.broadcast_apdu(&[0x10, 0x08]).await.unwrap();
        let mut buf = [0u8; 64];
        let (n, _) = peer.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &[0x81, 0x0B, 0x00, 0x08, 0x01, 0x00, 0x10, 0x08]);
    }
}
