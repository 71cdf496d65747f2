//! UDP transport for OSC packets.

use crate::error::Result;
use log::{error, log_enabled, trace, Level};
use parking_lot::Mutex;
use rosc::{decoder, encoder, OscMessage, OscPacket, OscType};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::Arc;

/// Largest UDP payload over IPv4.
pub const MAX_DATAGRAM: usize = 65_507;

/// Sends OSC packets to one destination.
///
/// Sends are serialized through a mutex so concurrent MIDI callbacks never
/// interleave on the socket. Failures are logged and swallowed.
pub struct OscSender {
    socket: Mutex<UdpSocket>,
    destination: SocketAddr,
}

impl OscSender {
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let destination = (host, port).to_socket_addrs()?.next().ok_or_else(|| {
            crate::Error::Config(format!("cannot resolve OSC host {host}:{port}"))
        })?;
        Self::to_addr(destination)
    }

    pub fn to_addr(destination: SocketAddr) -> Result<Self> {
        let bind: SocketAddr = if destination.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (IpAddr::from([0u16; 8]), 0).into()
        };
        let socket = UdpSocket::bind(bind)?;
        Ok(Self {
            socket: Mutex::new(socket),
            destination,
        })
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    pub fn send_message(&self, message: OscMessage) {
        self.send_packet(&OscPacket::Message(message));
    }

    pub fn send_packet(&self, packet: &OscPacket) {
        match encoder::encode(packet) {
            Ok(bytes) => self.send_udp(&bytes),
            Err(e) => error!("Failed to encode OSC packet: {e:?}"),
        }
    }

    pub fn send_udp(&self, bytes: &[u8]) {
        let socket = self.socket.lock();
        match socket.send_to(bytes, self.destination) {
            Ok(_) => {
                if log_enabled!(Level::Trace) {
                    trace!("sent UDP message to {}: {}", self.destination, dump_datagram(bytes));
                }
            }
            Err(e) => error!("Error sending through UDP socket to {}: {e}", self.destination),
        }
    }
}

/// Outcome of one blocking receive.
#[derive(Debug)]
pub enum Received {
    Packet(OscPacket, SocketAddr),
    /// Woken by an [`Interrupter`].
    Interrupted,
}

/// Listens for OSC packets on one UDP port.
pub struct OscReceiver {
    socket: UdpSocket,
    buffer: Vec<u8>,
}

impl OscReceiver {
    pub fn bind(port: u16) -> Result<Self> {
        Self::bind_addr((Ipv4Addr::UNSPECIFIED, port).into())
    }

    pub fn bind_addr(addr: SocketAddr) -> Result<Self> {
        Ok(Self {
            socket: UdpSocket::bind(addr)?,
            buffer: vec![0; MAX_DATAGRAM],
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Returns a handle that can wake a thread blocked in [`receive`](Self::receive).
    pub fn interrupter(&self) -> Result<Interrupter> {
        let mut target = self.local_addr()?;
        if target.ip().is_unspecified() {
            let loopback = match target {
                SocketAddr::V4(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
                SocketAddr::V6(_) => IpAddr::from([0, 0, 0, 0, 0, 0, 0, 1u16]),
            };
            target.set_ip(loopback);
        }
        Ok(Interrupter {
            sender: Arc::new(OscSender::to_addr(target)?),
        })
    }

    /// Blocks until a packet or a wake-up arrives.
    ///
    /// An empty datagram is the wake-up signal. Datagrams that fail to decode
    /// come back as `Err(Error::Osc)`; the socket stays usable.
    pub fn receive(&mut self) -> Result<Received> {
        let (len, from) = self.socket.recv_from(&mut self.buffer)?;
        if len == 0 {
            return Ok(Received::Interrupted);
        }
        let (_, packet) = decoder::decode_udp(&self.buffer[..len])?;
        Ok(Received::Packet(packet, from))
    }
}

/// Wakes a blocked [`OscReceiver`] by sending it an empty datagram.
#[derive(Clone)]
pub struct Interrupter {
    sender: Arc<OscSender>,
}

impl Interrupter {
    pub fn interrupt(&self) {
        self.sender.send_udp(&[]);
    }
}

/// Port name as it appears in OSC addresses and arguments.
pub fn osc_name(name: &str) -> String {
    name.replace(' ', "_")
}

/// Builds a heartbeat: one `(int32 id, string name)` pair per active port.
pub fn heartbeat_message<'a, I>(addr: &str, ports: I) -> OscMessage
where
    I: IntoIterator<Item = (u32, &'a str)>,
{
    let mut args = Vec::new();
    for (id, name) in ports {
        args.push(OscType::Int(id as i32));
        args.push(OscType::String(osc_name(name)));
    }
    OscMessage {
        addr: addr.to_string(),
        args,
    }
}

/// Printable ASCII as-is, everything else as `[xx]`.
pub fn dump_datagram(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        if (32..127).contains(&b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("[{b:02x}]"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_dump_datagram() {
        assert_eq!(dump_datagram(b"/midi\0\x01"), "/midi[00][01]");
    }

    #[test]
    fn test_heartbeat_layout() {
        let msg = heartbeat_message("/midi/heartbeat", [(0, "Keys"), (3, "Drum Pads")]);
        assert_eq!(msg.addr, "/midi/heartbeat");
        assert_eq!(
            msg.args,
            vec![
                OscType::Int(0),
                OscType::String("Keys".into()),
                OscType::Int(3),
                OscType::String("Drum_Pads".into()),
            ]
        );
    }

    #[test]
    fn test_send_and_receive_loopback() {
        let mut receiver = OscReceiver::bind_addr("127.0.0.1:0".parse().unwrap()).unwrap();
        receiver
            .socket
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let sender = OscSender::to_addr(receiver.local_addr().unwrap()).unwrap();

        sender.send_message(OscMessage {
            addr: "/test".into(),
            args: vec![OscType::Int(7)],
        });

        match receiver.receive().unwrap() {
            Received::Packet(OscPacket::Message(msg), _) => {
                assert_eq!(msg.addr, "/test");
                assert_eq!(msg.args, vec![OscType::Int(7)]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_interrupter_wakes_receiver() {
        let mut receiver = OscReceiver::bind_addr("127.0.0.1:0".parse().unwrap()).unwrap();
        receiver
            .socket
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let interrupter = receiver.interrupter().unwrap();
        interrupter.interrupt();
        assert!(matches!(receiver.receive().unwrap(), Received::Interrupted));
    }

    #[test]
    fn test_send_failure_is_swallowed() {
        // Port 0 is not a valid destination, so every send_to fails.
        let unreachable = OscSender::to_addr("127.0.0.1:0".parse().unwrap()).unwrap();
        unreachable.send_message(OscMessage {
            addr: "/lost".into(),
            args: vec![],
        });
        unreachable.send_udp(b"junk");

        let mut receiver = OscReceiver::bind_addr("127.0.0.1:0".parse().unwrap()).unwrap();
        receiver
            .socket
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let sender = OscSender::to_addr(receiver.local_addr().unwrap()).unwrap();
        sender.send_message(OscMessage {
            addr: "/after".into(),
            args: vec![],
        });
        match receiver.receive().unwrap() {
            Received::Packet(OscPacket::Message(msg), _) => assert_eq!(msg.addr, "/after"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_receive_large_datagram() {
        let mut receiver = OscReceiver::bind_addr("127.0.0.1:0".parse().unwrap()).unwrap();
        receiver
            .socket
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let sender = OscSender::to_addr(receiver.local_addr().unwrap()).unwrap();
        let blob: Vec<u8> = (0..8192).map(|i| (i % 128) as u8).collect();
        sender.send_message(OscMessage {
            addr: "/d/raw".into(),
            args: vec![OscType::Blob(blob.clone())],
        });
        match receiver.receive().unwrap() {
            Received::Packet(OscPacket::Message(msg), _) => {
                assert_eq!(msg.args, vec![OscType::Blob(blob)]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
