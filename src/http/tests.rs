use super::request::*;
use super::websocket::*;
use super::*;
use crate::connectivity::ConnectivityMode;

const UPGRADE: &str = "GET /signal HTTP/1.1\r\nHost: 192.168.4.1\r\nUpgrade: websocket\r\n\
Connection: keep-alive, Upgrade\r\nSec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
Sec-WebSocket-Version: 13\r\n\r\n";

#[test]
fn request_head_parses_line_and_headers() {
    let end = find_header_end(UPGRADE.as_bytes()).unwrap();
    let head = RequestHead::parse(&UPGRADE[..end]).unwrap();
    assert_eq!(head.method, "GET");
    assert_eq!(head.path(), "/signal");
    assert_eq!(head.content_length, None);
    assert!(head.is_websocket_upgrade());
    assert_eq!(head.websocket_key(), Some("dGhlIHNhbXBsZSBub25jZQ=="));
}

#[test]
fn content_length_rules() {
    let header = "POST /params HTTP/1.1\r\ncontent-length: 12\r\n";
    assert_eq!(parse_content_length(header), Ok(Some(12)));
    let duplicate = "POST /params HTTP/1.1\r\nContent-Length: 1\r\nContent-Length: 1\r\n";
    assert!(parse_content_length(duplicate).is_err());
    let invalid = "POST /params HTTP/1.1\r\nContent-Length: x\r\n";
    assert!(RequestHead::parse(invalid).is_err());
}

#[test]
fn query_is_stripped_from_path() {
    assert_eq!(target_path("/generate_204?x=1"), "/generate_204");
    assert!(parse_request_line("GET /\r\n").is_none());
}

#[test]
fn plain_get_is_not_an_upgrade() {
    let head = RequestHead::parse("GET / HTTP/1.1\r\nConnection: keep-alive\r\n").unwrap();
    assert!(!head.is_websocket_upgrade());
}

#[test]
fn routes_resolve_by_method_and_path() {
    let mode = ConnectivityMode::Connected;
    assert_eq!(Route::resolve("GET", "/", mode), Route::Index);
    assert_eq!(Route::resolve("GET", "/index.js", mode), Route::Script);
    assert_eq!(Route::resolve("POST", "/params", mode), Route::Params);
    assert_eq!(Route::resolve("POST", "/api/save_wifi", mode), Route::SaveWifi);
    assert_eq!(Route::resolve("GET", "/params", mode), Route::MethodNotAllowed);
    assert_eq!(Route::resolve("GET", "/hotspot-detect.html", mode), Route::NotFound);
}

#[test]
fn unknown_paths_redirect_while_provisioning() {
    let mode = ConnectivityMode::Provisioning;
    assert_eq!(Route::resolve("GET", "/generate_204", mode), Route::CaptiveRedirect);
    assert_eq!(Route::resolve("GET", "/api/status", mode), Route::Status);
}

#[test]
fn accept_key_matches_rfc6455_sample() {
    assert_eq!(
        accept_key("dGhlIHNhbXBsZSBub25jZQ==").as_str(),
        "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
    );
}

#[test]
fn masked_text_frame_is_decoded() {
    let mask = [0x37, 0xfa, 0x21, 0x3d];
    let mut frame = std::vec![0x81, 0x85];
    frame.extend_from_slice(&mask);
    frame.extend(b"hello".iter().enumerate().map(|(i, b)| b ^ mask[i % 4]));

    assert_eq!(parse_client_frame(&frame[..5], 1024), Ok(None));
    let header = parse_client_frame(&frame, 1024).unwrap().unwrap();
    assert!(header.fin);
    assert_eq!(header.opcode, Opcode::Text);
    assert_eq!(header.payload_len, 5);
    assert_eq!(header.frame_len(), frame.len());

    let payload = &mut frame[header.header_len..header.frame_len()];
    unmask(payload, header.mask);
    assert_eq!(payload, b"hello");
    assert!(is_handshake(payload));
}

#[test]
fn client_frames_must_be_masked_and_bounded() {
    assert_eq!(parse_client_frame(&[0x81, 0x05], 1024), Err(FrameError::Unmasked));
    assert_eq!(
        parse_client_frame(&[0x82, 0xFE, 0x10, 0x00, 0, 0, 0, 0], 1024),
        Err(FrameError::TooLarge)
    );
    assert_eq!(parse_client_frame(&[0x83, 0x80], 1024), Err(FrameError::UnknownOpcode));
}

#[test]
fn server_header_uses_extended_length() {
    let mut out = [0u8; FRAME_HEADER_MAX];
    assert_eq!(encode_server_frame_header(Opcode::Pong, 0, &mut out), 2);
    assert_eq!(&out[..2], &[0x8A, 0x00]);

    assert_eq!(encode_server_frame_header(Opcode::Binary, 1600, &mut out), 4);
    assert_eq!(&out[..4], &[0x82, 126, 0x06, 0x40]);
}

#[test]
fn embed_padding_is_trimmed() {
    assert_eq!(trim_embed_padding(b"<html>\0\0"), b"<html>");
    assert_eq!(trim_embed_padding(b"\0"), b"");
    assert_eq!(Asset::new(CONTENT_HTML, b"x\0").body(), b"x");
}

#[test]
fn redirect_head_carries_location() {
    let head = response_head(STATUS_FOUND, None, 0, Some("/"));
    assert!(head.starts_with("HTTP/1.0 302 Found\r\n"));
    assert!(head.contains("Location: /\r\n"));
    assert!(head.ends_with("Content-Length: 0\r\n\r\n"));
}

#[test]
fn status_json_reports_mode_and_sampling() {
    let status = DeviceStatus {
        connectivity: ConnectivityStatus {
            mode: ConnectivityMode::Connecting,
            retry_count: 3,
        },
        sample_rate_hz: 10_000,
        attenuation: 3,
        bit_width: 12,
        test_tone_hz: 100,
        viewer_attached: false,
        telemetry: TelemetrySnapshot::default(),
    };
    let body = status_json(&status);
    assert!(body.starts_with("{\"mode\":\"connecting\",\"connected\":false,\"retries\":3,\"sample_rate\":10000,"));
    assert!(body.contains("\"viewer\":false"));
    assert!(body.ends_with(",\"samples_missed\":0}"));
}
