//! DHCP and DNS on the access point, so clients get an address and any name they look up
//! resolves to the board.

use checkinlib::board::Timestamp;
use checkinlib::config::NetworkConfig;
use checkinlib::dhcp::{self, DhcpServer};
use checkinlib::dns;
use embassy_executor::Spawner;
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::{IpAddress, Ipv4Address, Stack};
use embassy_time::Instant;

/// One UDP socket per responder.
pub const RESPONDER_SOCKETS: usize = 2;

const UDP_BUFFER_LEN: usize = 768;
const UDP_PACKETS: usize = 4;

pub fn setup_responders(stack: Stack<'static>, config: &'static NetworkConfig, spawner: Spawner) {
    spawner.must_spawn(dhcp_task(stack, DhcpServer::new(config)));
    spawner.must_spawn(dns_task(stack, Ipv4Address::from(config.gateway)));
}

/// Task that leases addresses from the pool
#[embassy_executor::task]
async fn dhcp_task(stack: Stack<'static>, mut server: DhcpServer) {
    let mut rx_meta = [PacketMetadata::EMPTY; UDP_PACKETS];
    let mut rx_buffer = [0; UDP_BUFFER_LEN];
    let mut tx_meta = [PacketMetadata::EMPTY; UDP_PACKETS];
    let mut tx_buffer = [0; UDP_BUFFER_LEN];
    let mut socket = UdpSocket::new(stack, &mut rx_meta, &mut rx_buffer, &mut tx_meta, &mut tx_buffer);
    if let Err(e) = socket.bind(dhcp::SERVER_PORT) {
        log::error!("DHCP responder failed to bind: {e:?}");
        return;
    }
    log::info!("DHCP responder on {}", server.server_ip());

    let mut frame = [0; UDP_BUFFER_LEN];
    let mut reply = [0; dhcp::REPLY_LEN];
    loop {
        let len = match socket.recv_from(&mut frame).await {
            Ok((len, _)) => len,
            Err(e) => {
                log::warn!("DHCP receive failed: {e:?}");
                continue;
            }
        };
        let now = Timestamp::from_secs(Instant::now().as_secs());
        let Some(reply_len) = server.handle(&frame[..len], now, &mut reply) else {
            continue;
        };
        // Clients without an address only hear broadcasts
        let to = (IpAddress::Ipv4(Ipv4Address::BROADCAST), dhcp::CLIENT_PORT);
        if let Err(e) = socket.send_to(&reply[..reply_len], to).await {
            log::warn!("DHCP send failed: {e:?}");
        }
    }
}

/// Task that answers every name with the device address
#[embassy_executor::task]
async fn dns_task(stack: Stack<'static>, address: Ipv4Address) {
    let mut rx_meta = [PacketMetadata::EMPTY; UDP_PACKETS];
    let mut rx_buffer = [0; UDP_BUFFER_LEN];
    let mut tx_meta = [PacketMetadata::EMPTY; UDP_PACKETS];
    let mut tx_buffer = [0; UDP_BUFFER_LEN];
    let mut socket = UdpSocket::new(stack, &mut rx_meta, &mut rx_buffer, &mut tx_meta, &mut tx_buffer);
    if let Err(e) = socket.bind(dns::SERVER_PORT) {
        log::error!("DNS responder failed to bind: {e:?}");
        return;
    }
    log::info!("DNS responder answering with {address}");

    let mut query = [0; 512];
    let mut reply = [0; 512];
    loop {
        let Ok((len, remote)) = socket.recv_from(&mut query).await else {
            continue;
        };
        let Some(reply_len) = dns::answer(&query[..len], address, &mut reply) else {
            log::debug!("Ignoring malformed DNS query");
            continue;
        };
        if let Err(e) = socket.send_to(&reply[..reply_len], remote).await {
            log::warn!("DNS send failed: {e:?}");
        }
    }
}
