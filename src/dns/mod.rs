//! Captive-portal name resolution: every question is answered with the
//! access point's own address.

use crate::error::DnsError;
use crate::telemetry;

const FLAG_RESPONSE: u16 = 0x8000;
/// QR, RD and RA set; rcode 0.
const RESPONSE_FLAGS: u16 = 0x8180;
/// Compression pointer to the first question name, right after the header.
const QUESTION_NAME_POINTER: u16 = 0xC000 | DnsHeader::LEN as u16;
const TYPE_A: u16 = 1;
const CLASS_IN: u16 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DnsHeader {
    pub id: u16,
    pub flags: u16,
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

impl DnsHeader {
    pub const LEN: usize = 12;

    pub fn decode(bytes: &[u8]) -> Result<Self, DnsError> {
        let header = bytes.get(..Self::LEN).ok_or(DnsError::Truncated)?;
        let word = |at: usize| u16::from_be_bytes([header[at], header[at + 1]]);
        Ok(Self {
            id: word(0),
            flags: word(2),
            qdcount: word(4),
            ancount: word(6),
            nscount: word(8),
            arcount: word(10),
        })
    }

    pub fn encode(&self, out: &mut [u8]) -> Result<usize, DnsError> {
        let out = out.get_mut(..Self::LEN).ok_or(DnsError::Truncated)?;
        for (slot, word) in out.chunks_exact_mut(2).zip([
            self.id,
            self.flags,
            self.qdcount,
            self.ancount,
            self.nscount,
            self.arcount,
        ]) {
            slot.copy_from_slice(&word.to_be_bytes());
        }
        Ok(Self::LEN)
    }

    pub fn is_response(&self) -> bool {
        self.flags & FLAG_RESPONSE != 0
    }
}

/// A-record answer whose owner name is a compression pointer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnswerRecord {
    pub name_pointer: u16,
    pub ttl_s: u32,
    pub address: [u8; 4],
}

impl AnswerRecord {
    pub const LEN: usize = 16;

    pub fn encode(&self, out: &mut [u8]) -> Result<usize, DnsError> {
        let out = out.get_mut(..Self::LEN).ok_or(DnsError::Truncated)?;
        out[0..2].copy_from_slice(&self.name_pointer.to_be_bytes());
        out[2..4].copy_from_slice(&TYPE_A.to_be_bytes());
        out[4..6].copy_from_slice(&CLASS_IN.to_be_bytes());
        out[6..10].copy_from_slice(&self.ttl_s.to_be_bytes());
        out[10..12].copy_from_slice(&(self.address.len() as u16).to_be_bytes());
        out[12..16].copy_from_slice(&self.address);
        Ok(Self::LEN)
    }
}

/// Length of the first question (name, type and class) at the start of
/// `section`. Labels are walked but not decoded.
pub fn question_len(section: &[u8]) -> Result<usize, DnsError> {
    let mut at = 0usize;
    loop {
        let len = *section.get(at).ok_or(DnsError::Truncated)? as usize;
        match len {
            0 => {
                at += 1;
                break;
            }
            len if len & 0xC0 == 0xC0 => {
                at += 2;
                break;
            }
            len if len & 0xC0 != 0 => return Err(DnsError::Truncated),
            len => at += 1 + len,
        }
    }
    let end = at + 4;
    if end > section.len() {
        return Err(DnsError::Truncated);
    }
    Ok(end)
}

#[derive(Clone, Copy, Debug)]
pub struct CaptivePortalResponder {
    address: [u8; 4],
    ttl_s: u32,
}

impl CaptivePortalResponder {
    pub const fn new(address: [u8; 4], ttl_s: u32) -> Self {
        Self { address, ttl_s }
    }

    pub fn address(&self) -> [u8; 4] {
        self.address
    }

    /// Build the answer for `query` into `response`.
    ///
    /// Returns `Ok(None)` when the packet is not a query or the answer would
    /// not fit `response`; such packets are dropped, never truncated.
    pub fn handle_query(&self, query: &[u8], response: &mut [u8]) -> Result<Option<usize>, DnsError> {
        let header = DnsHeader::decode(query)?;
        if header.is_response() || header.qdcount == 0 {
            telemetry::record_dns_dropped();
            return Ok(None);
        }

        let section = &query[DnsHeader::LEN..];
        let question = &section[..question_len(section)?];
        let total = DnsHeader::LEN + question.len() + AnswerRecord::LEN;
        if total > response.len() {
            log::debug!("dns: query of {} bytes does not fit response", query.len());
            telemetry::record_dns_dropped();
            return Ok(None);
        }

        let mut at = DnsHeader {
            id: header.id,
            flags: RESPONSE_FLAGS,
            qdcount: 1,
            ancount: 1,
            nscount: 0,
            arcount: 0,
        }
        .encode(response)?;
        response[at..at + question.len()].copy_from_slice(question);
        at += question.len();
        at += AnswerRecord {
            name_pointer: QUESTION_NAME_POINTER,
            ttl_s: self.ttl_s,
            address: self.address,
        }
        .encode(&mut response[at..])?;

        telemetry::record_dns_answered();
        Ok(Some(at))
    }
}

#[cfg(test)]
mod tests;
