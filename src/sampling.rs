use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use crate::config::{
    DEFAULT_ATTENUATION, DEFAULT_BIT_WIDTH, DEFAULT_SAMPLE_RATE_HZ, DEFAULT_TEST_TONE_HZ,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attenuation {
    Db0,
    Db2p5,
    Db6,
    Db12,
}

impl Attenuation {
    pub const fn from_index(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Db0),
            1 => Some(Self::Db2p5),
            2 => Some(Self::Db6),
            3 => Some(Self::Db12),
            _ => None,
        }
    }

    pub const fn as_index(self) -> u8 {
        match self {
            Self::Db0 => 0,
            Self::Db2p5 => 1,
            Self::Db6 => 2,
            Self::Db12 => 3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BitWidth {
    Bits9,
    Bits10,
    Bits11,
    Bits12,
}

impl BitWidth {
    pub const fn from_bits(value: u8) -> Option<Self> {
        match value {
            9 => Some(Self::Bits9),
            10 => Some(Self::Bits10),
            11 => Some(Self::Bits11),
            12 => Some(Self::Bits12),
            _ => None,
        }
    }

    pub const fn bits(self) -> u8 {
        match self {
            Self::Bits9 => 9,
            Self::Bits10 => 10,
            Self::Bits11 => 11,
            Self::Bits12 => 12,
        }
    }

    /// Reduce a full 12-bit conversion to this width.
    pub const fn scale(self, sample: u16) -> u16 {
        sample >> (12 - self.bits())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SampleRateLimits {
    pub min_hz: u32,
    pub max_hz: u32,
}

impl SampleRateLimits {
    pub const fn new(min_hz: u32, max_hz: u32) -> Self {
        Self { min_hz, max_hz }
    }

    pub const fn clamp(self, rate_hz: u32) -> u32 {
        if rate_hz < self.min_hz {
            self.min_hz
        } else if rate_hz > self.max_hz {
            self.max_hz
        } else {
            rate_hz
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SamplingParams {
    pub sample_rate_hz: u32,
    pub attenuation: Attenuation,
    pub bit_width: BitWidth,
}

/// Monotonic mutation counter of a [`SamplingConfig`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Revision(u32);

/// Acquisition parameters shared between the control plane (writer) and the
/// acquisition loop (reader).
///
/// Each field is its own atomic. Writers store the value first and bump the
/// revision afterwards, so a reader that samples the revision before the
/// values can at worst see newer values under an older revision, which only
/// causes one extra reconfiguration pass.
pub struct SamplingConfig {
    sample_rate_hz: AtomicU32,
    attenuation: AtomicU8,
    bit_width: AtomicU8,
    test_tone_hz: AtomicU32,
    revision: AtomicU32,
}

impl SamplingConfig {
    pub const fn new(sample_rate_hz: u32) -> Self {
        Self {
            sample_rate_hz: AtomicU32::new(sample_rate_hz),
            attenuation: AtomicU8::new(DEFAULT_ATTENUATION),
            bit_width: AtomicU8::new(DEFAULT_BIT_WIDTH),
            test_tone_hz: AtomicU32::new(DEFAULT_TEST_TONE_HZ),
            revision: AtomicU32::new(0),
        }
    }

    /// Defaults with the boot sample rate brought inside the board limits.
    pub const fn with_limits(limits: SampleRateLimits) -> Self {
        Self::new(limits.clamp(DEFAULT_SAMPLE_RATE_HZ))
    }

    pub fn revision(&self) -> Revision {
        Revision(self.revision.load(Ordering::Acquire))
    }

    pub fn snapshot(&self) -> (SamplingParams, Revision) {
        let revision = self.revision();
        let params = SamplingParams {
            sample_rate_hz: self.sample_rate_hz.load(Ordering::Relaxed),
            attenuation: Attenuation::from_index(self.attenuation.load(Ordering::Relaxed))
                .unwrap_or(Attenuation::Db12),
            bit_width: BitWidth::from_bits(self.bit_width.load(Ordering::Relaxed))
                .unwrap_or(BitWidth::Bits12),
        };
        (params, revision)
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz.load(Ordering::Relaxed)
    }

    pub fn test_tone_hz(&self) -> u32 {
        self.test_tone_hz.load(Ordering::Relaxed)
    }

    /// Returns `true` when the stored value changed.
    pub fn set_sample_rate_hz(&self, rate_hz: u32) -> bool {
        let changed = self.sample_rate_hz.swap(rate_hz, Ordering::Relaxed) != rate_hz;
        self.bump_if(changed)
    }

    pub fn set_attenuation(&self, attenuation: Attenuation) -> bool {
        let index = attenuation.as_index();
        let changed = self.attenuation.swap(index, Ordering::Relaxed) != index;
        self.bump_if(changed)
    }

    pub fn set_bit_width(&self, bit_width: BitWidth) -> bool {
        let bits = bit_width.bits();
        let changed = self.bit_width.swap(bits, Ordering::Relaxed) != bits;
        self.bump_if(changed)
    }

    /// The tone runs on its own peripheral; it never marks acquisition dirty.
    pub fn set_test_tone_hz(&self, tone_hz: u32) -> bool {
        self.test_tone_hz.swap(tone_hz, Ordering::Relaxed) != tone_hz
    }

    fn bump_if(&self, changed: bool) -> bool {
        if changed {
            self.revision.fetch_add(1, Ordering::Release);
        }
        changed
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE_HZ)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unchanged_write_keeps_revision() {
        let config = SamplingConfig::default();
        let before = config.revision();
        assert!(!config.set_sample_rate_hz(DEFAULT_SAMPLE_RATE_HZ));
        assert!(!config.set_attenuation(Attenuation::Db12));
        assert!(!config.set_bit_width(BitWidth::Bits12));
        assert_eq!(config.revision(), before);
    }

    #[test]
    fn each_changed_field_bumps_revision() {
        let config = SamplingConfig::default();
        let before = config.revision();
        assert!(config.set_sample_rate_hz(40_000));
        assert!(config.set_attenuation(Attenuation::Db0));
        let (params, after) = config.snapshot();
        assert_ne!(before, after);
        assert_eq!(params.sample_rate_hz, 40_000);
        assert_eq!(params.attenuation, Attenuation::Db0);
    }

    #[test]
    fn tone_change_does_not_dirty_acquisition() {
        let config = SamplingConfig::default();
        let before = config.revision();
        assert!(config.set_test_tone_hz(440));
        assert_eq!(config.revision(), before);
        assert_eq!(config.test_tone_hz(), 440);
    }

    #[test]
    fn boot_rate_respects_board_minimum() {
        let config = SamplingConfig::with_limits(SampleRateLimits::new(20_000, 2_000_000));
        assert_eq!(config.sample_rate_hz(), 20_000);
    }

    #[test]
    fn bit_width_scales_down_from_twelve_bits() {
        assert_eq!(BitWidth::Bits12.scale(0x0FFF), 0x0FFF);
        assert_eq!(BitWidth::Bits9.scale(0x0FFF), 0x01FF);
        assert_eq!(BitWidth::from_bits(8), None);
    }
}
