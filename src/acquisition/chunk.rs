use crate::config::{
    ADC_CHUNK_ALIGN, ADC_CHUNK_TARGET_MS, ADC_MAX_TRANSFER_BYTES, ADC_MIN_CHUNK_BYTES,
};

use super::decode::RecordFormat;

/// Bytes requested per read: about one target window of records, clamped to
/// the transfer limits and aligned for the peripheral.
pub fn chunk_size(sample_rate_hz: u32, format: RecordFormat) -> usize {
    let samples = (sample_rate_hz as u64 * ADC_CHUNK_TARGET_MS as u64) / 1000;
    let raw = samples.saturating_mul(format.record_size() as u64);
    let clamped = raw.clamp(ADC_MIN_CHUNK_BYTES as u64, ADC_MAX_TRANSFER_BYTES as u64) as usize;
    align_up(clamped, ADC_CHUNK_ALIGN).min(ADC_MAX_TRANSFER_BYTES)
}

const fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) / align * align
}
