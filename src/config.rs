pub const ADC_MAX_TRANSFER_BYTES: usize = 4096;
pub const ADC_MIN_CHUNK_BYTES: usize = 128;
pub const ADC_CHUNK_ALIGN: usize = 4;
pub const ADC_CHUNK_TARGET_MS: u32 = 20;
pub const ADC_SETTLE_MS: u32 = 20;
pub const ADC_READ_BACKOFF_MS: u64 = 10;
pub const ADC_FAULT_RETRY_MS: u64 = 500;
/// Software pacing: longest run of back-to-back conversions, widest gap
/// worth spinning through, and how far behind schedule samples are dropped.
pub const ADC_BURST_BUDGET_US: u64 = 1_000;
pub const ADC_SPIN_THRESHOLD_US: u64 = 100;
pub const ADC_OVERRUN_LAG_US: u64 = 2 * ADC_CHUNK_TARGET_MS as u64 * 1_000;
pub const ADC_SAMPLE_MASK: u16 = 0x0FFF;

/// Largest decoded batch: a full transfer of the narrowest record format.
pub const SAMPLE_BATCH_MAX: usize = ADC_MAX_TRANSFER_BYTES / 2;
pub const SAMPLE_FRAME_MAX_BYTES: usize = SAMPLE_BATCH_MAX * 2;

pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 10_000;
pub const DEFAULT_ATTENUATION: u8 = 3;
pub const DEFAULT_BIT_WIDTH: u8 = 12;
pub const DEFAULT_TEST_TONE_HZ: u32 = 100;

pub const STREAM_THROTTLE_DIVISOR: u32 = 2;

/// Largest accepted request bodies, in bytes.
pub const CONTROL_BODY_MAX: usize = 255;
pub const CREDENTIALS_BODY_MAX: usize = 199;

pub const WIFI_SSID_MAX: usize = 32;
pub const WIFI_PASSWORD_MAX: usize = 64;

pub const CREDENTIAL_STORE_MAGIC: u32 = 0x5343_5046;
pub const CREDENTIAL_STORE_VERSION: u8 = 1;
/// magic(4) + version(1) + ssid_len(1) + ssid + password_len(1) + password + checksum(1)
pub const CREDENTIAL_STORE_RECORD_LEN: usize = 4 + 1 + 1 + WIFI_SSID_MAX + 1 + WIFI_PASSWORD_MAX + 1;

pub const AP_SSID: &str = match option_env!("ESP_SCOPE_AP_SSID") {
    Some(ssid) => ssid,
    None => "ESP-Scope",
};
pub const AP_CHANNEL: u8 = 1;
pub const AP_MAX_CONNECTIONS: u16 = 4;
pub const AP_ADDRESS: [u8; 4] = [192, 168, 4, 1];
pub const AP_PREFIX_LEN: u8 = 24;

pub const HOSTNAME: &str = match option_env!("ESP_SCOPE_HOSTNAME") {
    Some(hostname) => hostname,
    None => "esp-scope",
};

pub const DNS_PORT: u16 = 53;
pub const DNS_BUFFER_LEN: usize = 128;
pub const DNS_ANSWER_TTL_S: u32 = 60;

pub const DHCP_SERVER_PORT: u16 = 67;
pub const DHCP_CLIENT_PORT: u16 = 68;
pub const DHCP_PACKET_MAX: usize = 576;
pub const DHCP_LEASE_TIME_S: u32 = 7_200;
pub const DHCP_POOL_SIZE: usize = AP_MAX_CONNECTIONS as usize;

pub const HTTP_PORT: u16 = 80;
pub const RESTART_FLUSH_MS: u64 = 1_000;
pub const POWER_OFF_FLUSH_MS: u64 = 500;
