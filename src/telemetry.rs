use core::sync::atomic::{AtomicU32, Ordering};

static STREAM_FRAMES_SENT: AtomicU32 = AtomicU32::new(0);
static STREAM_FRAMES_DROPPED: AtomicU32 = AtomicU32::new(0);
static STREAM_VIEWER_EVICTIONS: AtomicU32 = AtomicU32::new(0);
static ADC_RECONFIGURATIONS: AtomicU32 = AtomicU32::new(0);
static ADC_HARDWARE_FAULTS: AtomicU32 = AtomicU32::new(0);
static ADC_SAMPLES_MISSED: AtomicU32 = AtomicU32::new(0);
static DNS_QUERIES_ANSWERED: AtomicU32 = AtomicU32::new(0);
static DNS_QUERIES_DROPPED: AtomicU32 = AtomicU32::new(0);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub frames_sent: u32,
    pub frames_dropped: u32,
    pub viewer_evictions: u32,
    pub reconfigurations: u32,
    pub hardware_faults: u32,
    /// Conversions a paced driver abandoned after falling behind schedule.
    pub samples_missed: u32,
    pub dns_answered: u32,
    pub dns_dropped: u32,
}

pub fn record_frame_sent() {
    STREAM_FRAMES_SENT.fetch_add(1, Ordering::Relaxed);
}

pub fn record_frame_dropped() {
    STREAM_FRAMES_DROPPED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_viewer_eviction() {
    STREAM_VIEWER_EVICTIONS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_reconfiguration() {
    ADC_RECONFIGURATIONS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_hardware_fault() {
    ADC_HARDWARE_FAULTS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_samples_missed(count: u32) {
    ADC_SAMPLES_MISSED.fetch_add(count, Ordering::Relaxed);
}

pub fn record_dns_answered() {
    DNS_QUERIES_ANSWERED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_dns_dropped() {
    DNS_QUERIES_DROPPED.fetch_add(1, Ordering::Relaxed);
}

pub fn snapshot() -> TelemetrySnapshot {
    TelemetrySnapshot {
        frames_sent: STREAM_FRAMES_SENT.load(Ordering::Relaxed),
        frames_dropped: STREAM_FRAMES_DROPPED.load(Ordering::Relaxed),
        viewer_evictions: STREAM_VIEWER_EVICTIONS.load(Ordering::Relaxed),
        reconfigurations: ADC_RECONFIGURATIONS.load(Ordering::Relaxed),
        hardware_faults: ADC_HARDWARE_FAULTS.load(Ordering::Relaxed),
        samples_missed: ADC_SAMPLES_MISSED.load(Ordering::Relaxed),
        dns_answered: DNS_QUERIES_ANSWERED.load(Ordering::Relaxed),
        dns_dropped: DNS_QUERIES_DROPPED.load(Ordering::Relaxed),
    }
}
