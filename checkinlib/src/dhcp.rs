//! DHCP responder for the access point subnet.
//!
//! Clients joining the access point get an address from a small pool next to the gateway.
//! The gateway names itself as router and DNS server. Leases are kept in memory and expire
//! after [`LEASE_SECS`]. Only Ethernet clients with 6-byte hardware addresses are served.

use core::net::Ipv4Addr;

use crate::board::Timestamp;
use crate::config::NetworkConfig;

pub const SERVER_PORT: u16 = 67;
pub const CLIENT_PORT: u16 = 68;

pub const LEASE_SECS: u32 = 4 * 60 * 60;
pub const MAX_LEASES: usize = 8;

/// Replies are padded to the BOOTP minimum message size.
pub const REPLY_LEN: usize = 300;

const HEADER_LEN: usize = 240;
const MAGIC_COOKIE: [u8; 4] = [99, 130, 83, 99];

const BOOTREQUEST: u8 = 1;
const BOOTREPLY: u8 = 2;
const HTYPE_ETHERNET: u8 = 1;

mod option {
    pub const PAD: u8 = 0;
    pub const SUBNET_MASK: u8 = 1;
    pub const ROUTER: u8 = 3;
    pub const DNS_SERVER: u8 = 6;
    pub const BROADCAST: u8 = 28;
    pub const REQUESTED_IP: u8 = 50;
    pub const LEASE_TIME: u8 = 51;
    pub const MESSAGE_TYPE: u8 = 53;
    pub const SERVER_ID: u8 = 54;
    pub const RENEWAL_TIME: u8 = 58;
    pub const REBINDING_TIME: u8 = 59;
    pub const END: u8 = 255;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Discover,
    Offer,
    Request,
    Decline,
    Ack,
    Nak,
    Release,
    Inform,
}

impl MessageType {
    fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            1 => MessageType::Discover,
            2 => MessageType::Offer,
            3 => MessageType::Request,
            4 => MessageType::Decline,
            5 => MessageType::Ack,
            6 => MessageType::Nak,
            7 => MessageType::Release,
            8 => MessageType::Inform,
            _ => return None,
        })
    }

    fn code(self) -> u8 {
        match self {
            MessageType::Discover => 1,
            MessageType::Offer => 2,
            MessageType::Request => 3,
            MessageType::Decline => 4,
            MessageType::Ack => 5,
            MessageType::Nak => 6,
            MessageType::Release => 7,
            MessageType::Inform => 8,
        }
    }
}

/// The fields of a client message the responder acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageType,
    pub xid: u32,
    pub flags: u16,
    pub client_mac: [u8; 6],
    /// `ciaddr`, set by clients renewing a lease
    pub client_ip: Option<Ipv4Addr>,
    pub requested_ip: Option<Ipv4Addr>,
    pub server_id: Option<Ipv4Addr>,
}

impl Message {
    /// Parse a BOOTREQUEST. Anything malformed, or without a message type, is `None`.
    pub fn parse(frame: &[u8]) -> Option<Self> {
        if frame.len() < HEADER_LEN
            || frame[0] != BOOTREQUEST
            || frame[1] != HTYPE_ETHERNET
            || frame[2] != 6
            || frame[236..240] != MAGIC_COOKIE
        {
            return None;
        }

        let mut kind = None;
        let mut requested_ip = None;
        let mut server_id = None;

        let mut rest = &frame[HEADER_LEN..];
        while let Some((&code, tail)) = rest.split_first() {
            match code {
                option::PAD => {
                    rest = tail;
                    continue;
                }
                option::END => break,
                _ => {}
            }
            let (&len, tail) = tail.split_first()?;
            let data = tail.get(..len as usize)?;
            match (code, data) {
                (option::MESSAGE_TYPE, &[kind_code]) => kind = MessageType::from_code(kind_code),
                (option::REQUESTED_IP, &[a, b, c, d]) => requested_ip = Some(Ipv4Addr::new(a, b, c, d)),
                (option::SERVER_ID, &[a, b, c, d]) => server_id = Some(Ipv4Addr::new(a, b, c, d)),
                _ => {}
            }
            rest = &tail[len as usize..];
        }

        let ciaddr = Ipv4Addr::new(frame[12], frame[13], frame[14], frame[15]);
        let mut client_mac = [0; 6];
        client_mac.copy_from_slice(&frame[28..34]);

        Some(Message {
            kind: kind?,
            xid: u32::from_be_bytes([frame[4], frame[5], frame[6], frame[7]]),
            flags: u16::from_be_bytes([frame[10], frame[11]]),
            client_mac,
            client_ip: (!ciaddr.is_unspecified()).then_some(ciaddr),
            requested_ip,
            server_id,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lease {
    pub mac: [u8; 6],
    pub ip: Ipv4Addr,
    /// Uptime in seconds after which the address is free again
    pub expires: u64,
}

pub struct DhcpServer {
    server_ip: Ipv4Addr,
    netmask: Ipv4Addr,
    pool_start: u32,
    pool_size: u8,
    leases: heapless::Vec<Lease, MAX_LEASES>,
}

impl DhcpServer {
    /// A responder for the subnet of `config`. The pool comes from the already validated config.
    pub fn new(config: &NetworkConfig) -> Self {
        DhcpServer {
            server_ip: Ipv4Addr::from(config.gateway),
            netmask: Ipv4Addr::from(config.netmask()),
            pool_start: config.dhcp_pool_start(),
            pool_size: config.dhcp_pool_size,
            leases: heapless::Vec::new(),
        }
    }

    pub fn server_ip(&self) -> Ipv4Addr {
        self.server_ip
    }

    pub fn broadcast(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.server_ip) | !u32::from(self.netmask))
    }

    pub fn leases(&self) -> &[Lease] {
        &self.leases
    }

    /// Answer one client message, returns the length of the reply written to `reply`.
    /// `None` when the message needs no answer.
    pub fn handle(&mut self, frame: &[u8], now: Timestamp, reply: &mut [u8]) -> Option<usize> {
        let message = Message::parse(frame)?;
        if message.server_id.is_some_and(|id| id != self.server_ip) {
            log::debug!("DHCP {:?} for another server, ignoring", message.kind);
            return None;
        }

        let now = now.as_secs();
        self.leases.retain(|lease| lease.expires > now);

        match message.kind {
            MessageType::Discover => {
                let Some(ip) = self.assign(&message, now) else {
                    log::warn!("DHCP pool exhausted, no offer for {:02x?}", message.client_mac);
                    return None;
                };
                build_reply(reply, &message, MessageType::Offer, Some(ip), self)
            }
            MessageType::Request => {
                let wanted = message.requested_ip.or(message.client_ip);
                match self.assign(&message, now) {
                    Some(ip) if wanted.map_or(true, |wanted| wanted == ip) => {
                        log::info!("Leased {ip} to {:02x?}", message.client_mac);
                        build_reply(reply, &message, MessageType::Ack, Some(ip), self)
                    }
                    _ => {
                        log::info!("Refusing {wanted:?} to {:02x?}", message.client_mac);
                        build_reply(reply, &message, MessageType::Nak, None, self)
                    }
                }
            }
            MessageType::Decline | MessageType::Release => {
                self.leases.retain(|lease| lease.mac != message.client_mac);
                None
            }
            _ => None,
        }
    }

    fn in_pool(&self, ip: Ipv4Addr) -> bool {
        let ip = u32::from(ip);
        ip >= self.pool_start && ip < self.pool_start + self.pool_size as u32
    }

    /// Address for the client of `message`: its current lease, the address it asks for if
    /// that is free, or the first free one. Refreshes the lease.
    fn assign(&mut self, message: &Message, now: u64) -> Option<Ipv4Addr> {
        let mac = message.client_mac;
        let expires = now + LEASE_SECS as u64;
        let wanted = message
            .requested_ip
            .or(message.client_ip)
            .filter(|ip| self.in_pool(*ip))
            .filter(|ip| self.leases.iter().all(|lease| lease.mac == mac || lease.ip != *ip));

        if let Some(lease) = self.leases.iter_mut().find(|lease| lease.mac == mac) {
            if let Some(ip) = wanted {
                lease.ip = ip;
            }
            lease.expires = expires;
            return Some(lease.ip);
        }

        let ip = wanted.or_else(|| {
            (0..self.pool_size as u32)
                .map(|offset| Ipv4Addr::from(self.pool_start + offset))
                .find(|ip| self.leases.iter().all(|lease| lease.ip != *ip))
        })?;
        self.leases.push(Lease { mac, ip, expires }).ok()?;
        Some(ip)
    }
}

/// Appends options after the fixed header.
struct Options<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl Options<'_> {
    fn put(&mut self, code: u8, payload: &[u8]) -> Option<()> {
        let end = self.len + 2 + payload.len();
        let dest = self.buf.get_mut(self.len..end)?;
        dest[0] = code;
        dest[1] = payload.len() as u8;
        dest[2..].copy_from_slice(payload);
        self.len = end;
        Some(())
    }
}

fn build_reply(
    reply: &mut [u8],
    request: &Message,
    kind: MessageType,
    ip: Option<Ipv4Addr>,
    server: &DhcpServer,
) -> Option<usize> {
    let reply = reply.get_mut(..REPLY_LEN)?;
    reply.fill(0);
    reply[0] = BOOTREPLY;
    reply[1] = HTYPE_ETHERNET;
    reply[2] = 6;
    reply[4..8].copy_from_slice(&request.xid.to_be_bytes());
    reply[10..12].copy_from_slice(&request.flags.to_be_bytes());
    if let Some(ip) = ip {
        reply[16..20].copy_from_slice(&ip.octets());
        reply[20..24].copy_from_slice(&server.server_ip.octets());
    }
    reply[28..34].copy_from_slice(&request.client_mac);
    reply[236..240].copy_from_slice(&MAGIC_COOKIE);

    let server_ip = server.server_ip.octets();
    let mut options = Options {
        buf: &mut reply[HEADER_LEN..],
        len: 0,
    };
    options.put(option::MESSAGE_TYPE, &[kind.code()])?;
    options.put(option::SERVER_ID, &server_ip)?;
    if kind != MessageType::Nak {
        options.put(option::LEASE_TIME, &LEASE_SECS.to_be_bytes())?;
        options.put(option::RENEWAL_TIME, &(LEASE_SECS / 2).to_be_bytes())?;
        options.put(option::REBINDING_TIME, &(LEASE_SECS / 8 * 7).to_be_bytes())?;
        options.put(option::SUBNET_MASK, &server.netmask.octets())?;
        options.put(option::ROUTER, &server_ip)?;
        options.put(option::DNS_SERVER, &server_ip)?;
        options.put(option::BROADCAST, &server.broadcast().octets())?;
    }
    let end = options.len;
    *reply.get_mut(HEADER_LEN + end)? = option::END;

    Some(REPLY_LEN)
}
