use std::vec::Vec;

use super::*;
use crate::config::{AP_ADDRESS, DNS_ANSWER_TTL_S, DNS_BUFFER_LEN};

fn query(id: u16, labels: &[&str], extra: &[u8]) -> Vec<u8> {
    let mut packet = Vec::new();
    packet.extend_from_slice(&id.to_be_bytes());
    packet.extend_from_slice(&0x0100u16.to_be_bytes());
    packet.extend_from_slice(&1u16.to_be_bytes());
    packet.extend_from_slice(&0u16.to_be_bytes());
    packet.extend_from_slice(&0u16.to_be_bytes());
    packet.extend_from_slice(&(!extra.is_empty() as u16).to_be_bytes());
    for label in labels {
        packet.push(label.len() as u8);
        packet.extend_from_slice(label.as_bytes());
    }
    packet.push(0);
    packet.extend_from_slice(&TYPE_A.to_be_bytes());
    packet.extend_from_slice(&CLASS_IN.to_be_bytes());
    packet.extend_from_slice(extra);
    packet
}

fn responder() -> CaptivePortalResponder {
    CaptivePortalResponder::new(AP_ADDRESS, DNS_ANSWER_TTL_S)
}

#[test]
fn answer_echoes_id_and_points_at_access_point() {
    let packet = query(0x1234, &["connectivitycheck", "gstatic", "com"], &[]);
    let mut response = [0u8; DNS_BUFFER_LEN];
    let len = responder()
        .handle_query(&packet, &mut response)
        .unwrap()
        .unwrap();
    let response = &response[..len];

    assert_eq!(&response[0..2], &[0x12, 0x34]);
    assert_eq!(&response[2..4], &[0x81, 0x80]);
    assert_eq!(&response[6..8], &[0x00, 0x01]);
    assert_eq!(&response[12..packet.len()], &packet[12..]);
    assert_eq!(&response[packet.len()..packet.len() + 2], &[0xC0, 0x0C]);
    assert_eq!(&response[len - 4..], &AP_ADDRESS);
    assert_eq!(len, packet.len() + AnswerRecord::LEN);
}

#[test]
fn trailing_additional_records_are_not_echoed() {
    let opt = [0u8, 0x00, 0x29, 0x10, 0x00, 0, 0, 0, 0, 0, 0];
    let packet = query(7, &["example", "com"], &opt);
    let mut response = [0u8; DNS_BUFFER_LEN];
    let len = responder()
        .handle_query(&packet, &mut response)
        .unwrap()
        .unwrap();
    let header = DnsHeader::decode(&response).unwrap();
    assert_eq!(header.arcount, 0);
    assert_eq!(len, packet.len() - opt.len() + AnswerRecord::LEN);
}

#[test]
fn oversize_question_is_dropped_not_truncated() {
    let long = "a".repeat(60);
    let packet = query(1, &[long.as_str(), long.as_str()], &[]);
    let mut response = [0u8; DNS_BUFFER_LEN];
    assert_eq!(responder().handle_query(&packet, &mut response), Ok(None));
}

#[test]
fn short_or_malformed_packets_fail_to_decode() {
    let mut response = [0u8; DNS_BUFFER_LEN];
    assert_eq!(
        responder().handle_query(&[0u8; 11], &mut response),
        Err(DnsError::Truncated)
    );

    let mut packet = query(1, &["example", "com"], &[]);
    packet.truncate(packet.len() - 3);
    assert_eq!(
        responder().handle_query(&packet, &mut response),
        Err(DnsError::Truncated)
    );

    let mut overrun = query(1, &["abc"], &[]);
    overrun[12] = 40;
    assert_eq!(
        responder().handle_query(&overrun, &mut response),
        Err(DnsError::Truncated)
    );
}

#[test]
fn responses_are_ignored() {
    let mut packet = query(9, &["example"], &[]);
    packet[2] |= 0x80;
    let mut response = [0u8; DNS_BUFFER_LEN];
    assert_eq!(responder().handle_query(&packet, &mut response), Ok(None));
}

#[test]
fn header_round_trips_through_bounded_slices() {
    let header = DnsHeader {
        id: 0xBEEF,
        flags: RESPONSE_FLAGS,
        qdcount: 1,
        ancount: 1,
        nscount: 0,
        arcount: 0,
    };
    let mut out = [0u8; DnsHeader::LEN];
    assert_eq!(header.encode(&mut out), Ok(DnsHeader::LEN));
    assert_eq!(DnsHeader::decode(&out), Ok(header));
    assert_eq!(header.encode(&mut [0u8; 4]), Err(DnsError::Truncated));
}
