//! Address assignment for stations joining the provisioning access point.
//!
//! Leases are keyed by client hardware address and never expire; when the
//! pool is exhausted the oldest slot is reused. The server also hands out its
//! own address as router and name server so lookups reach the captive-portal
//! responder.

use crate::error::DhcpError;

const OP_BOOTREQUEST: u8 = 1;
const OP_BOOTREPLY: u8 = 2;
const HTYPE_ETHERNET: u8 = 1;
const HLEN_ETHERNET: u8 = 6;
const MAGIC_COOKIE: [u8; 4] = [0x63, 0x82, 0x53, 0x63];
/// Fixed BOOTP header plus the magic cookie.
const OPTIONS_OFFSET: usize = 240;
/// Shortest reply some clients accept.
const MIN_REPLY_LEN: usize = 300;

const OPT_PAD: u8 = 0;
const OPT_SUBNET_MASK: u8 = 1;
const OPT_ROUTER: u8 = 3;
const OPT_DNS: u8 = 6;
const OPT_REQUESTED_IP: u8 = 50;
const OPT_LEASE_TIME: u8 = 51;
const OPT_MESSAGE_TYPE: u8 = 53;
const OPT_SERVER_ID: u8 = 54;
const OPT_END: u8 = 255;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
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
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Discover),
            2 => Some(Self::Offer),
            3 => Some(Self::Request),
            4 => Some(Self::Decline),
            5 => Some(Self::Ack),
            6 => Some(Self::Nak),
            7 => Some(Self::Release),
            8 => Some(Self::Inform),
            _ => None,
        }
    }

    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Discover => 1,
            Self::Offer => 2,
            Self::Request => 3,
            Self::Decline => 4,
            Self::Ack => 5,
            Self::Nak => 6,
            Self::Release => 7,
            Self::Inform => 8,
        }
    }
}

/// The parts of a client message the server acts on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientMessage {
    pub xid: [u8; 4],
    pub flags: [u8; 2],
    pub ciaddr: [u8; 4],
    pub giaddr: [u8; 4],
    pub chaddr: [u8; 6],
    pub message_type: MessageType,
    pub requested_ip: Option<[u8; 4]>,
    pub server_id: Option<[u8; 4]>,
}

impl ClientMessage {
    pub fn decode(packet: &[u8]) -> Result<Self, DhcpError> {
        if packet.len() < OPTIONS_OFFSET {
            return Err(DhcpError::Truncated);
        }
        if packet[0] != OP_BOOTREQUEST
            || packet[1] != HTYPE_ETHERNET
            || packet[2] != HLEN_ETHERNET
            || packet[236..240] != MAGIC_COOKIE
        {
            return Err(DhcpError::Malformed);
        }

        let mut message_type = None;
        let mut requested_ip = None;
        let mut server_id = None;
        let mut at = OPTIONS_OFFSET;
        while let Some(&tag) = packet.get(at) {
            match tag {
                OPT_PAD => {
                    at += 1;
                    continue;
                }
                OPT_END => break,
                _ => {}
            }
            let len = *packet.get(at + 1).ok_or(DhcpError::Truncated)? as usize;
            let value = packet
                .get(at + 2..at + 2 + len)
                .ok_or(DhcpError::Truncated)?;
            match tag {
                OPT_MESSAGE_TYPE => message_type = value.first().copied().and_then(MessageType::from_u8),
                OPT_REQUESTED_IP => requested_ip = ipv4(value),
                OPT_SERVER_ID => server_id = ipv4(value),
                _ => {}
            }
            at += 2 + len;
        }

        let mut chaddr = [0u8; 6];
        chaddr.copy_from_slice(&packet[28..34]);
        Ok(Self {
            xid: [packet[4], packet[5], packet[6], packet[7]],
            flags: [packet[10], packet[11]],
            ciaddr: [packet[12], packet[13], packet[14], packet[15]],
            giaddr: [packet[24], packet[25], packet[26], packet[27]],
            chaddr,
            message_type: message_type.ok_or(DhcpError::Malformed)?,
            requested_ip,
            server_id,
        })
    }
}

fn ipv4(value: &[u8]) -> Option<[u8; 4]> {
    value.try_into().ok()
}

pub struct DhcpServer<const N: usize> {
    address: [u8; 4],
    lease_time_s: u32,
    leases: [Option<[u8; 6]>; N],
    next_reuse: usize,
}

impl<const N: usize> DhcpServer<N> {
    /// Pool addresses follow `address` in the same /24.
    pub const fn new(address: [u8; 4], lease_time_s: u32) -> Self {
        Self {
            address,
            lease_time_s,
            leases: [None; N],
            next_reuse: 0,
        }
    }

    pub fn lease_for(&self, chaddr: [u8; 6]) -> Option<[u8; 4]> {
        self.slot_of(chaddr).map(|slot| self.slot_address(slot))
    }

    /// Build the reply for one client packet into `reply`. `Ok(None)` means
    /// nothing should be sent.
    pub fn handle(&mut self, packet: &[u8], reply: &mut [u8]) -> Result<Option<usize>, DhcpError> {
        let message = ClientMessage::decode(packet)?;
        if reply.len() < MIN_REPLY_LEN {
            return Err(DhcpError::Truncated);
        }

        let (reply_type, yiaddr) = match message.message_type {
            MessageType::Discover => (MessageType::Offer, self.assign(message.chaddr)),
            MessageType::Request => {
                if message.server_id.is_some_and(|id| id != self.address) {
                    // The client picked another server.
                    self.release(message.chaddr);
                    return Ok(None);
                }
                let assigned = self.assign(message.chaddr);
                let wanted = message
                    .requested_ip
                    .or(Some(message.ciaddr).filter(|ip| *ip != [0; 4]));
                match wanted {
                    Some(ip) if ip != assigned => (MessageType::Nak, [0; 4]),
                    _ => (MessageType::Ack, assigned),
                }
            }
            MessageType::Release | MessageType::Decline => {
                self.release(message.chaddr);
                return Ok(None);
            }
            _ => return Ok(None),
        };

        log::debug!(
            "dhcp: {:?} -> {:?} {}.{}.{}.{}",
            message.message_type,
            reply_type,
            yiaddr[0],
            yiaddr[1],
            yiaddr[2],
            yiaddr[3]
        );
        Ok(Some(self.encode_reply(&message, reply_type, yiaddr, reply)))
    }

    fn encode_reply(
        &self,
        message: &ClientMessage,
        reply_type: MessageType,
        yiaddr: [u8; 4],
        reply: &mut [u8],
    ) -> usize {
        reply[..MIN_REPLY_LEN].fill(0);
        reply[0] = OP_BOOTREPLY;
        reply[1] = HTYPE_ETHERNET;
        reply[2] = HLEN_ETHERNET;
        reply[4..8].copy_from_slice(&message.xid);
        reply[10..12].copy_from_slice(&message.flags);
        reply[16..20].copy_from_slice(&yiaddr);
        reply[20..24].copy_from_slice(&self.address);
        reply[24..28].copy_from_slice(&message.giaddr);
        reply[28..34].copy_from_slice(&message.chaddr);
        reply[236..240].copy_from_slice(&MAGIC_COOKIE);

        let mut at = OPTIONS_OFFSET;
        let mut option = |tag: u8, value: &[u8]| {
            reply[at] = tag;
            reply[at + 1] = value.len() as u8;
            reply[at + 2..at + 2 + value.len()].copy_from_slice(value);
            at += 2 + value.len();
        };
        option(OPT_MESSAGE_TYPE, &[reply_type.as_u8()]);
        option(OPT_SERVER_ID, &self.address);
        if reply_type != MessageType::Nak {
            option(OPT_LEASE_TIME, &self.lease_time_s.to_be_bytes());
            option(OPT_SUBNET_MASK, &[255, 255, 255, 0]);
            option(OPT_ROUTER, &self.address);
            option(OPT_DNS, &self.address);
        }
        reply[at] = OPT_END;
        at += 1;
        at.max(MIN_REPLY_LEN)
    }

    fn slot_of(&self, chaddr: [u8; 6]) -> Option<usize> {
        self.leases.iter().position(|lease| *lease == Some(chaddr))
    }

    fn slot_address(&self, slot: usize) -> [u8; 4] {
        let mut address = self.address;
        address[3] = address[3].wrapping_add(1 + slot as u8);
        address
    }

    fn assign(&mut self, chaddr: [u8; 6]) -> [u8; 4] {
        let slot = match self.slot_of(chaddr) {
            Some(slot) => slot,
            None => {
                let slot = match self.leases.iter().position(Option::is_none) {
                    Some(free) => free,
                    None => {
                        let reused = self.next_reuse % N;
                        self.next_reuse = self.next_reuse.wrapping_add(1);
                        reused
                    }
                };
                self.leases[slot] = Some(chaddr);
                slot
            }
        };
        self.slot_address(slot)
    }

    fn release(&mut self, chaddr: [u8; 6]) {
        if let Some(slot) = self.slot_of(chaddr) {
            self.leases[slot] = None;
        }
    }
}
