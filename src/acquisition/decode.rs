use heapless::Vec;

use crate::config::{ADC_SAMPLE_MASK, SAMPLE_BATCH_MAX};

pub type SampleBatch = Vec<u16, SAMPLE_BATCH_MAX>;

/// Layout of one raw conversion record as the peripheral writes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordFormat {
    /// 16-bit word: data[0..12], channel[12..16].
    Type1,
    /// 32-bit word: data[0..12], reserved[12], channel[13..16], unit[16].
    Type2,
}

impl RecordFormat {
    pub const fn record_size(self) -> usize {
        match self {
            Self::Type1 => 2,
            Self::Type2 => 4,
        }
    }

    pub fn sample(self, record: &[u8]) -> Option<u16> {
        match self {
            Self::Type1 => {
                let bytes: [u8; 2] = record.get(..2)?.try_into().ok()?;
                Some(u16::from_le_bytes(bytes) & ADC_SAMPLE_MASK)
            }
            Self::Type2 => {
                let bytes: [u8; 4] = record.get(..4)?.try_into().ok()?;
                Some((u32::from_le_bytes(bytes) & ADC_SAMPLE_MASK as u32) as u16)
            }
        }
    }

    pub fn channel(self, record: &[u8]) -> Option<u8> {
        match self {
            Self::Type1 => {
                let bytes: [u8; 2] = record.get(..2)?.try_into().ok()?;
                Some((u16::from_le_bytes(bytes) >> 12) as u8)
            }
            Self::Type2 => {
                let bytes: [u8; 4] = record.get(..4)?.try_into().ok()?;
                Some(((u32::from_le_bytes(bytes) >> 13) & 0b111) as u8)
            }
        }
    }

    /// Write one record; returns the number of bytes used or `None` if `out`
    /// is too short.
    pub fn write_record(self, out: &mut [u8], channel: u8, sample: u16) -> Option<usize> {
        let data = sample & ADC_SAMPLE_MASK;
        match self {
            Self::Type1 => {
                let word = data | ((channel as u16 & 0x0F) << 12);
                out.get_mut(..2)?.copy_from_slice(&word.to_le_bytes());
                Some(2)
            }
            Self::Type2 => {
                let word = data as u32 | ((channel as u32 & 0b111) << 13);
                out.get_mut(..4)?.copy_from_slice(&word.to_le_bytes());
                Some(4)
            }
        }
    }
}

/// Replace `batch` with the samples carried by `raw`. A trailing partial
/// record is ignored.
pub fn decode_records(format: RecordFormat, raw: &[u8], batch: &mut SampleBatch) {
    batch.clear();
    for record in raw.chunks_exact(format.record_size()) {
        let Some(sample) = format.sample(record) else {
            break;
        };
        if batch.push(sample).is_err() {
            break;
        }
    }
}
