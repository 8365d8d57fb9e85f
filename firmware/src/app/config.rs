use core::sync::atomic::AtomicU32;

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel, signal::Signal};
use esp_scope::{
    acquisition::RecordFormat,
    config::SAMPLE_FRAME_MAX_BYTES,
    connectivity::ConnectivityStatusCell,
    sampling::{SampleRateLimits, SamplingConfig},
    stream::ViewerSlot,
};

use super::types::PowerRequest;

#[cfg(all(feature = "esp32c6", feature = "esp32"))]
compile_error!("select exactly one board feature: esp32c6 or esp32");

/// Rates the paced one-shot driver sustains, not the DMA engine's range.
#[cfg(feature = "esp32c6")]
pub(crate) const SAMPLE_RATE_LIMITS: SampleRateLimits = SampleRateLimits::new(100, 20_000);
#[cfg(feature = "esp32c6")]
pub(crate) const RECORD_FORMAT: RecordFormat = RecordFormat::Type2;
/// XIAO ESP32-C6 user LED is wired active low.
#[cfg(feature = "esp32c6")]
pub(crate) const STATUS_LED_ACTIVE_LOW: bool = true;

#[cfg(feature = "esp32")]
pub(crate) const SAMPLE_RATE_LIMITS: SampleRateLimits = SampleRateLimits::new(100, 10_000);
#[cfg(feature = "esp32")]
pub(crate) const RECORD_FORMAT: RecordFormat = RecordFormat::Type1;
#[cfg(feature = "esp32")]
pub(crate) const STATUS_LED_ACTIVE_LOW: bool = false;

pub(crate) const ADC_CHANNEL: u8 = 0;

pub(crate) const HEAP_SIZE: usize = 72 * 1024;
pub(crate) const STACK_SOCKETS: usize = 8;

pub(crate) const HTTP_WORKER_COUNT: usize = 3;
pub(crate) const HTTP_RW_BUF: usize = 2048;
pub(crate) const HTTP_HEADER_TIMEOUT_MS: u64 = 10_000;
pub(crate) const HTTP_SOCKET_TIMEOUT_S: u64 = 20;
pub(crate) const WS_RX_BUF: usize = 512;
pub(crate) const WS_WRITE_TIMEOUT_MS: u64 = 5_000;
pub(crate) const WS_SUPERSEDE_POLL_MS: u64 = 250;
pub(crate) const WS_KEEPALIVE_S: u64 = 10;

pub(crate) const WIFI_RETRY_DELAY_MS: u64 = 2_000;
pub(crate) const WIFI_DHCP_TIMEOUT_MS: u64 = 15_000;

pub(crate) const LED_PROVISIONING_HALF_PERIOD_MS: u64 = 1_000;
pub(crate) const LED_CONNECTING_HALF_PERIOD_MS: u64 = 150;
pub(crate) const LED_POLL_MS: u64 = 500;

pub(crate) const RESET_HOLD_MS: u64 = 3_000;
pub(crate) const RESET_POLL_MS: u64 = 50;

pub(crate) const OUTBOX_DEPTH: usize = 2;
pub(crate) type SampleFrame = heapless::Vec<u8, SAMPLE_FRAME_MAX_BYTES>;

pub(crate) static SAMPLING: SamplingConfig = SamplingConfig::with_limits(SAMPLE_RATE_LIMITS);
pub(crate) static VIEWER: ViewerSlot = ViewerSlot::new();
pub(crate) static CONNECTIVITY: ConnectivityStatusCell = ConnectivityStatusCell::new();

/// Frames for the connection that currently owns the stream.
pub(crate) static STREAM_OUTBOX: Channel<CriticalSectionRawMutex, SampleFrame, OUTBOX_DEPTH> =
    Channel::new();
/// Peer id of the WebSocket connection that is alive and registered; zero
/// when none.
pub(crate) static LIVE_PEER: AtomicU32 = AtomicU32::new(0);
pub(crate) static NEXT_PEER: AtomicU32 = AtomicU32::new(1);

pub(crate) static POWER_REQUESTS: Signal<CriticalSectionRawMutex, PowerRequest> = Signal::new();
