use crate::config::{ADC_BURST_BUDGET_US, ADC_OVERRUN_LAG_US, ADC_SPIN_THRESHOLD_US};

const MICROS_PER_SECOND: u64 = 1_000_000;

/// What a software-paced driver should do next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaceStep {
    /// A sample is due; convert it, then call [`SamplePacer::advance`].
    Convert,
    /// The next sample is due within the spin threshold.
    Spin,
    /// Hand the executor back and resume at [`SamplePacer::resume_at`].
    Yield,
}

/// Schedules one-shot conversions at a fixed rate in short bursts.
///
/// Due times are derived from a sample index against the last anchor so the
/// delivered rate does not drift from rounding the period. A burst never
/// runs longer than the burst budget, and gaps longer than the spin
/// threshold are left to the caller to await.
#[derive(Clone, Copy, Debug)]
pub struct SamplePacer {
    rate_hz: u64,
    anchor_us: u64,
    index: u64,
    burst_start_us: u64,
}

impl SamplePacer {
    /// `None` when the rate is zero or above one sample per microsecond.
    pub fn new(rate_hz: u32) -> Option<Self> {
        let rate_hz = rate_hz as u64;
        if rate_hz == 0 || rate_hz > MICROS_PER_SECOND {
            return None;
        }
        Some(Self {
            rate_hz,
            anchor_us: 0,
            index: 0,
            burst_start_us: 0,
        })
    }

    pub fn start(&mut self, now_us: u64) {
        self.anchor_us = now_us;
        self.index = 0;
        self.burst_start_us = now_us;
    }

    /// Due time of the next conversion.
    pub fn resume_at(&self) -> u64 {
        self.anchor_us + self.index * MICROS_PER_SECOND / self.rate_hz
    }

    /// Opens a burst. When the schedule has fallen more than the overrun lag
    /// behind, the missed samples are abandoned and their count returned.
    pub fn begin_burst(&mut self, now_us: u64) -> u32 {
        self.burst_start_us = now_us;
        let due = self.resume_at();
        if now_us <= due + ADC_OVERRUN_LAG_US {
            return 0;
        }
        let owed = (now_us - self.anchor_us) * self.rate_hz / MICROS_PER_SECOND;
        let missed = owed.saturating_sub(self.index);
        self.anchor_us = now_us;
        self.index = 0;
        missed.min(u32::MAX as u64) as u32
    }

    pub fn step(&self, now_us: u64) -> PaceStep {
        if now_us.saturating_sub(self.burst_start_us) >= ADC_BURST_BUDGET_US {
            return PaceStep::Yield;
        }
        let due = self.resume_at();
        if now_us >= due {
            PaceStep::Convert
        } else if due - now_us <= ADC_SPIN_THRESHOLD_US {
            PaceStep::Spin
        } else {
            PaceStep::Yield
        }
    }

    pub fn advance(&mut self) {
        self.index += 1;
    }
}
