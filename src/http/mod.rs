//! Transport-independent pieces of the HTTP surface: request heads, routing,
//! WebSocket framing, embedded assets and response heads.

pub mod request;
pub mod route;
pub mod websocket;

use core::fmt::Write as _;

use heapless::String;

use crate::connectivity::{ConnectivityMode, ConnectivityStatus};
use crate::telemetry::TelemetrySnapshot;

pub use request::RequestHead;
pub use route::Route;

pub const HTTP_HEADER_MAX: usize = 1024;
pub const RESPONSE_HEAD_MAX: usize = 256;
pub const STATUS_BODY_MAX: usize = 384;

pub const STATUS_OK: &str = "200 OK";
pub const STATUS_SWITCHING: &str = "101 Switching Protocols";
pub const STATUS_FOUND: &str = "302 Found";
pub const STATUS_BAD_REQUEST: &str = "400 Bad Request";
pub const STATUS_NOT_FOUND: &str = "404 Not Found";
pub const STATUS_METHOD_NOT_ALLOWED: &str = "405 Method Not Allowed";
pub const STATUS_TIMEOUT: &str = "408 Request Timeout";
pub const STATUS_TOO_LARGE: &str = "413 Payload Too Large";
pub const STATUS_INTERNAL: &str = "500 Internal Server Error";
pub const STATUS_UNAVAILABLE: &str = "503 Service Unavailable";

pub const CONTENT_HTML: &str = "text/html";
pub const CONTENT_JAVASCRIPT: &str = "text/javascript";
pub const CONTENT_JSON: &str = "application/json";
pub const CONTENT_TEXT: &str = "text/plain";

/// Static file served from flash.
#[derive(Clone, Copy, Debug)]
pub struct Asset {
    pub content_type: &'static str,
    body: &'static [u8],
}

impl Asset {
    pub const fn new(content_type: &'static str, body: &'static [u8]) -> Self {
        Self { content_type, body }
    }

    pub fn body(&self) -> &'static [u8] {
        trim_embed_padding(self.body)
    }
}

/// Embedded blobs may carry trailing NUL padding that must not be served.
pub fn trim_embed_padding(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|&byte| byte != 0)
        .map_or(0, |last| last + 1);
    &bytes[..end]
}

/// Response head with `Connection: close`; the body length is always known.
pub fn response_head(
    status: &str,
    content_type: Option<&str>,
    content_length: usize,
    location: Option<&str>,
) -> String<RESPONSE_HEAD_MAX> {
    let mut head = String::new();
    let _ = write!(head, "HTTP/1.0 {}\r\nConnection: close\r\n", status);
    if let Some(content_type) = content_type {
        let _ = write!(head, "Content-Type: {}\r\n", content_type);
    }
    if let Some(location) = location {
        let _ = write!(head, "Location: {}\r\n", location);
    }
    let _ = write!(head, "Content-Length: {}\r\n\r\n", content_length);
    head
}

pub fn websocket_upgrade_head(accept: &str) -> String<RESPONSE_HEAD_MAX> {
    let mut head = String::new();
    let _ = write!(
        head,
        "HTTP/1.1 {}\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Accept: {}\r\n\r\n",
        STATUS_SWITCHING, accept
    );
    head
}

/// Snapshot reported by `GET /api/status`.
#[derive(Clone, Copy, Debug)]
pub struct DeviceStatus {
    pub connectivity: ConnectivityStatus,
    pub sample_rate_hz: u32,
    pub attenuation: u8,
    pub bit_width: u8,
    pub test_tone_hz: u32,
    pub viewer_attached: bool,
    pub telemetry: TelemetrySnapshot,
}

pub fn status_json(status: &DeviceStatus) -> String<STATUS_BODY_MAX> {
    let mut body = String::new();
    let telemetry = &status.telemetry;
    let _ = write!(
        body,
        "{{\"mode\":\"{}\",\"connected\":{},\"retries\":{},\"sample_rate\":{},\"atten\":{},\"bit_width\":{},\
\"test_hz\":{},\"viewer\":{},\"frames_sent\":{},\"frames_dropped\":{},\"evictions\":{},\
\"reconfigurations\":{},\"hardware_faults\":{},\"samples_missed\":{}}}",
        status.connectivity.mode.as_str(),
        status.connectivity.mode == ConnectivityMode::Connected,
        status.connectivity.retry_count,
        status.sample_rate_hz,
        status.attenuation,
        status.bit_width,
        status.test_tone_hz,
        status.viewer_attached,
        telemetry.frames_sent,
        telemetry.frames_dropped,
        telemetry.viewer_evictions,
        telemetry.reconfigurations,
        telemetry.hardware_faults,
        telemetry.samples_missed,
    );
    body
}

#[cfg(test)]
mod tests;
