use base64::Engine as _;
use heapless::String;
use sha1::{Digest, Sha1};

const ACCEPT_GUID: &[u8] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";
pub const ACCEPT_KEY_LEN: usize = 28;
pub const FRAME_HEADER_MAX: usize = 10;
/// Viewer token that binds a connection as the stream target.
pub const HANDSHAKE_TOKEN: &[u8] = b"hello";

pub fn accept_key(client_key: &str) -> String<ACCEPT_KEY_LEN> {
    let mut hasher = Sha1::new();
    hasher.update(client_key.trim().as_bytes());
    hasher.update(ACCEPT_GUID);
    let digest = hasher.finalize();

    let mut encoded = [0u8; ACCEPT_KEY_LEN];
    let mut out = String::new();
    if let Ok(len) = base64::engine::general_purpose::STANDARD.encode_slice(digest, &mut encoded) {
        for &byte in &encoded[..len] {
            let _ = out.push(byte as char);
        }
    }
    out
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opcode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
}

impl Opcode {
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x0 => Some(Self::Continuation),
            0x1 => Some(Self::Text),
            0x2 => Some(Self::Binary),
            0x8 => Some(Self::Close),
            0x9 => Some(Self::Ping),
            0xA => Some(Self::Pong),
            _ => None,
        }
    }

    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Continuation => 0x0,
            Self::Text => 0x1,
            Self::Binary => 0x2,
            Self::Close => 0x8,
            Self::Ping => 0x9,
            Self::Pong => 0xA,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameError {
    UnknownOpcode,
    /// Client frames must be masked.
    Unmasked,
    TooLarge,
}

impl FrameError {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnknownOpcode => "unknown websocket opcode",
            Self::Unmasked => "unmasked client frame",
            Self::TooLarge => "websocket frame too large",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    pub fin: bool,
    pub opcode: Opcode,
    pub mask: [u8; 4],
    pub payload_len: usize,
    pub header_len: usize,
}

impl FrameHeader {
    pub fn frame_len(&self) -> usize {
        self.header_len + self.payload_len
    }
}

/// Parse a client frame header. `Ok(None)` means more bytes are needed.
pub fn parse_client_frame(buf: &[u8], max_payload: usize) -> Result<Option<FrameHeader>, FrameError> {
    let [first, second, ..] = *buf else {
        return Ok(None);
    };
    let fin = first & 0x80 != 0;
    let opcode = Opcode::from_u8(first & 0x0F).ok_or(FrameError::UnknownOpcode)?;
    if second & 0x80 == 0 {
        return Err(FrameError::Unmasked);
    }

    let (payload_len, mut at) = match second & 0x7F {
        126 => {
            let Some(bytes) = buf.get(2..4) else {
                return Ok(None);
            };
            (u16::from_be_bytes([bytes[0], bytes[1]]) as u64, 4)
        }
        127 => {
            let Some(bytes) = buf.get(2..10) else {
                return Ok(None);
            };
            let mut raw = [0u8; 8];
            raw.copy_from_slice(bytes);
            (u64::from_be_bytes(raw), 10)
        }
        len => (len as u64, 2),
    };
    if payload_len > max_payload as u64 {
        return Err(FrameError::TooLarge);
    }

    let Some(mask_bytes) = buf.get(at..at + 4) else {
        return Ok(None);
    };
    let mut mask = [0u8; 4];
    mask.copy_from_slice(mask_bytes);
    at += 4;

    Ok(Some(FrameHeader {
        fin,
        opcode,
        mask,
        payload_len: payload_len as usize,
        header_len: at,
    }))
}

pub fn unmask(payload: &mut [u8], mask: [u8; 4]) {
    for (index, byte) in payload.iter_mut().enumerate() {
        *byte ^= mask[index % 4];
    }
}

/// Header of an unmasked, final server frame.
pub fn encode_server_frame_header(
    opcode: Opcode,
    payload_len: usize,
    out: &mut [u8; FRAME_HEADER_MAX],
) -> usize {
    out[0] = 0x80 | opcode.as_u8();
    if payload_len < 126 {
        out[1] = payload_len as u8;
        2
    } else if payload_len <= u16::MAX as usize {
        out[1] = 126;
        out[2..4].copy_from_slice(&(payload_len as u16).to_be_bytes());
        4
    } else {
        out[1] = 127;
        out[2..10].copy_from_slice(&(payload_len as u64).to_be_bytes());
        10
    }
}

pub fn is_handshake(payload: &[u8]) -> bool {
    payload
        .windows(HANDSHAKE_TOKEN.len())
        .any(|window| window == HANDSHAKE_TOKEN)
}
