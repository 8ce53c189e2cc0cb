//! BACnet/IP over UDP.
//!
//! One socket per transport, broadcast enabled at bind time. Outbound
//! NPDUs get an Original-Unicast or Original-Broadcast BVLC envelope;
//! inbound datagrams are unwrapped, with Forwarded-NPDU frames yielding
//! the originator carried in their 6-octet address prefix rather than
//! the forwarding router.

use crate::bip::bvlc::{BvlcFunction, BvlcHeader, BVLC_HEADER_LEN};
use crate::{DataLink, DataLinkError, LinkAddress};
use bacstack_core::encoding::{reader::Reader, writer::Writer};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::UdpSocket;

/// Largest datagram this link sends or accepts: the 1476-octet APDU
/// ceiling plus NPDU and BVLC headroom.
pub const MAX_FRAME_LEN: usize = 1600;

/// The BACnet/IP data link.
#[derive(Debug, Clone)]
pub struct BipTransport {
    socket: Arc<UdpSocket>,
}

impl BipTransport {
    /// Binds `bind_addr` and enables broadcast on the socket.
    pub async fn bind(bind_addr: SocketAddr) -> Result<Self, DataLinkError> {
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.set_broadcast(true)?;
        Ok(Self {
            socket: Arc::new(socket),
        })
    }

    /// Binds the default port on all interfaces.
    pub async fn bind_default() -> Result<Self, DataLinkError> {
        Self::bind(SocketAddr::new(
            IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            LinkAddress::DEFAULT_PORT,
        ))
        .await
    }

    pub fn local_addr(&self) -> Result<SocketAddr, DataLinkError> {
        self.socket.local_addr().map_err(DataLinkError::Io)
    }

    async fn send_wrapped(
        &self,
        function: BvlcFunction,
        target: SocketAddr,
        npdu: &[u8],
    ) -> Result<(), DataLinkError> {
        let mut frame = [0u8; MAX_FRAME_LEN];
        if npdu.len() > MAX_FRAME_LEN - BVLC_HEADER_LEN {
            return Err(DataLinkError::FrameTooLarge);
        }
        let mut w = Writer::new(&mut frame);
        BvlcHeader::for_payload(function, npdu.len())
            .and_then(|header| header.encode(&mut w))
            .map_err(|_| DataLinkError::FrameTooLarge)?;
        w.write_all(npdu).map_err(|_| DataLinkError::FrameTooLarge)?;

        self.socket.send_to(w.as_written(), target).await?;
        Ok(())
    }
}

impl DataLink for BipTransport {
    async fn send(&self, address: LinkAddress, npdu: &[u8]) -> Result<(), DataLinkError> {
        self.send_wrapped(
            BvlcFunction::OriginalUnicastNpdu,
            address.socket_addr(),
            npdu,
        )
        .await
    }

    async fn broadcast(&self, address: LinkAddress, npdu: &[u8]) -> Result<(), DataLinkError> {
        self.send_wrapped(
            BvlcFunction::OriginalBroadcastNpdu,
            address.socket_addr(),
            npdu,
        )
        .await
    }

    async fn recv(&self, buf: &mut [u8]) -> Result<(usize, LinkAddress), DataLinkError> {
        let mut frame = [0u8; MAX_FRAME_LEN];
        let (n, src) = self.socket.recv_from(&mut frame).await?;

        let mut r = Reader::new(&frame[..n]);
        let header =
            BvlcHeader::decode_exact(&mut r, n).map_err(|_| DataLinkError::InvalidFrame)?;

        match header.function {
            BvlcFunction::OriginalUnicastNpdu | BvlcFunction::OriginalBroadcastNpdu => {
                let payload = r
                    .read_exact(header.payload_len())
                    .map_err(|_| DataLinkError::InvalidFrame)?;
                copy_payload(payload, buf)?;
                Ok((payload.len(), LinkAddress::Ip(src)))
            }
            BvlcFunction::ForwardedNpdu => {
                let payload = r
                    .read_exact(header.payload_len())
                    .map_err(|_| DataLinkError::InvalidFrame)?;
                // 4-octet IP + 2-octet port of the original sender.
                if payload.len() < 6 {
                    return Err(DataLinkError::InvalidFrame);
                }
                let origin = SocketAddr::new(
                    IpAddr::V4(Ipv4Addr::new(
                        payload[0], payload[1], payload[2], payload[3],
                    )),
                    u16::from_be_bytes([payload[4], payload[5]]),
                );
                let npdu = &payload[6..];
                copy_payload(npdu, buf)?;
                Ok((npdu.len(), LinkAddress::Ip(origin)))
            }
            BvlcFunction::Unknown(v) => Err(DataLinkError::UnsupportedBvlcFunction(v)),
            other => {
                log::debug!("ignoring BVLC function {other:?} from {src}");
                Err(DataLinkError::InvalidFrame)
            }
        }
    }
}

fn copy_payload(payload: &[u8], buf: &mut [u8]) -> Result<(), DataLinkError> {
    if payload.len() > buf.len() {
        return Err(DataLinkError::FrameTooLarge);
    }
    buf[..payload.len()].copy_from_slice(payload);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::BipTransport;
    use crate::bip::bvlc::{BvlcFunction, BvlcHeader, BVLC_TYPE_BIP};
    use crate::{DataLink, DataLinkError, LinkAddress};
    use bacstack_core::encoding::{reader::Reader, writer::Writer};
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use tokio::net::UdpSocket;

    fn loopback() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
    }

    #[tokio::test]
    async fn unicast_wraps_npdu_in_original_unicast() {
        let transport = BipTransport::bind(loopback()).await.unwrap();
        let peer = UdpSocket::bind(loopback()).await.unwrap();
        let peer_addr = peer.local_addr().unwrap();

        transport
            .send(LinkAddress::Ip(peer_addr), &[0x01, 0x00, 0x10, 0x08])
            .await
            .unwrap();

        let mut rx = [0u8; 64];
        let (n, _) = peer.recv_from(&mut rx).await.unwrap();
        assert_eq!(&rx[..n], &[0x81, 0x0A, 0x00, 0x08, 0x01, 0x00, 0x10, 0x08]);
    }

    #[tokio::test]
    async fn broadcast_function_differs_from_unicast() {
        let transport = BipTransport::bind(loopback()).await.unwrap();
        let peer = UdpSocket::bind(loopback()).await.unwrap();
        let peer_addr = peer.local_addr().unwrap();

        // Loopback target keeps the test off the real network; the
        // function octet is what is under test.
        transport
            .broadcast(LinkAddress::Ip(peer_addr), &[0x01, 0x00, 0x10, 0x08])
            .await
            .unwrap();

        let mut rx = [0u8; 64];
        let (n, _) = peer.recv_from(&mut rx).await.unwrap();
        assert_eq!(&rx[..n], &[0x81, 0x0B, 0x00, 0x08, 0x01, 0x00, 0x10, 0x08]);
    }

    #[tokio::test]
    async fn recv_unwraps_to_the_npdu() {
        let transport = BipTransport::bind(loopback()).await.unwrap();
        let target = transport.local_addr().unwrap();
        let sender = UdpSocket::bind(loopback()).await.unwrap();

        sender
            .send_to(&[0x81, 0x0A, 0x00, 0x07, 0x01, 0x00, 0x20], target)
            .await
            .unwrap();

        let mut buf = [0u8; 64];
        let (n, src) = transport.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &[0x01, 0x00, 0x20]);
        assert_eq!(src, LinkAddress::Ip(sender.local_addr().unwrap()));
    }

    #[tokio::test]
    async fn forwarded_npdu_reports_the_originator() {
        let transport = BipTransport::bind(loopback()).await.unwrap();
        let target = transport.local_addr().unwrap();
        let router = UdpSocket::bind(loopback()).await.unwrap();

        let mut frame = [0u8; 64];
        let mut w = Writer::new(&mut frame);
        BvlcHeader::for_payload(BvlcFunction::ForwardedNpdu, 6 + 3)
            .unwrap()
            .encode(&mut w)
            .unwrap();
        w.write_all(&[10, 1, 2, 3]).unwrap();
        w.write_be_u16(47808).unwrap();
        w.write_all(&[0x01, 0x00, 0x10]).unwrap();
        router.send_to(w.as_written(), target).await.unwrap();

        let mut buf = [0u8; 16];
        let (n, src) = transport.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &[0x01, 0x00, 0x10]);
        assert_eq!(
            src,
            LinkAddress::Ip(SocketAddr::new(
                IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3)),
                47808
            ))
        );
    }

    #[tokio::test]
    async fn declared_length_mismatch_is_an_invalid_frame() {
        let transport = BipTransport::bind(loopback()).await.unwrap();
        let target = transport.local_addr().unwrap();
        let sender = UdpSocket::bind(loopback()).await.unwrap();

        // Header claims 12 octets, datagram carries 6.
        sender
            .send_to(&[BVLC_TYPE_BIP, 0x0A, 0x00, 0x0C, 0x01, 0x00], target)
            .await
            .unwrap();

        let mut buf = [0u8; 16];
        let err = transport.recv(&mut buf).await.unwrap_err();
        assert!(matches!(err, DataLinkError::InvalidFrame));
    }

    #[tokio::test]
    async fn unknown_bvlc_function_is_reported() {
        let transport = BipTransport::bind(loopback()).await.unwrap();
        let target = transport.local_addr().unwrap();
        let sender = UdpSocket::bind(loopback()).await.unwrap();

        sender
            .send_to(&[BVLC_TYPE_BIP, 0x99, 0x00, 0x04], target)
            .await
            .unwrap();

        let mut buf = [0u8; 16];
        let err = transport.recv(&mut buf).await.unwrap_err();
        assert!(matches!(err, DataLinkError::UnsupportedBvlcFunction(0x99)));
    }

    #[test]
    fn reader_position_tracks_the_header() {
        let raw = [0x81, 0x0A, 0x00, 0x08, 0x01, 0x00, 0x10, 0x08];
        let mut r = Reader::new(&raw);
        let header = BvlcHeader::decode(&mut r).unwrap();
        assert_eq!(r.position(), 4);
        assert_eq!(header.payload_len(), 4);
    }
}
