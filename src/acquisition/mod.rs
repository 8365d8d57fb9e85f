//! Continuous sampling: session lifecycle, chunk sizing and record decoding.

mod chunk;
mod decode;
mod pacing;

use embedded_hal_async::delay::DelayNs;

pub use chunk::chunk_size;
pub use decode::{decode_records, RecordFormat, SampleBatch};
pub use pacing::{PaceStep, SamplePacer};

use crate::config::{ADC_MAX_TRANSFER_BYTES, ADC_SETTLE_MS};
use crate::error::HardwareFault;
use crate::sampling::{Attenuation, BitWidth, Revision, SamplingConfig, SamplingParams};
use crate::telemetry;

/// Everything a driver needs to build one capture session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionParams {
    pub sample_rate_hz: u32,
    pub attenuation: Attenuation,
    pub bit_width: BitWidth,
    pub chunk_bytes: usize,
    pub format: RecordFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    Data(usize),
    /// Nothing buffered yet.
    Timeout,
}

/// Continuous-capture peripheral contract.
///
/// A driver hands out at most one live `Session`; `release` must run before
/// the next `configure`.
pub trait ContinuousAdc {
    type Session;

    fn record_format(&self) -> RecordFormat;
    fn configure(&mut self, params: &SessionParams) -> Result<Self::Session, HardwareFault>;
    fn start(&mut self, session: &mut Self::Session) -> Result<(), HardwareFault>;
    fn stop(&mut self, session: &mut Self::Session) -> Result<(), HardwareFault>;
    fn release(&mut self, session: Self::Session);
    /// Bounded poll; must not wait longer than one chunk window.
    fn read(
        &mut self,
        session: &mut Self::Session,
        buf: &mut [u8],
    ) -> Result<ReadOutcome, HardwareFault>;
}

pub struct AcquisitionSession<H> {
    handle: H,
    params: SessionParams,
}

impl<H> AcquisitionSession<H> {
    pub fn params(&self) -> &SessionParams {
        &self.params
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    Batch,
    Idle,
}

pub struct AcquisitionController<'a, A: ContinuousAdc> {
    adc: A,
    config: &'a SamplingConfig,
    /// Present only while the peripheral is running.
    session: Option<AcquisitionSession<A::Session>>,
    applied: Option<Revision>,
    /// A handle was released since the last build, so the next build waits
    /// for the input to settle.
    needs_settle: bool,
    raw: [u8; ADC_MAX_TRANSFER_BYTES],
}

impl<'a, A: ContinuousAdc> AcquisitionController<'a, A> {
    pub fn new(adc: A, config: &'a SamplingConfig) -> Self {
        Self {
            adc,
            config,
            session: None,
            applied: None,
            needs_settle: false,
            raw: [0u8; ADC_MAX_TRANSFER_BYTES],
        }
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    pub fn session_params(&self) -> Option<&SessionParams> {
        self.session.as_ref().map(AcquisitionSession::params)
    }

    pub fn is_dirty(&self) -> bool {
        self.session.is_none() || self.applied != Some(self.config.revision())
    }

    pub fn adc(&self) -> &A {
        &self.adc
    }

    /// Build a stopped session for `params`. The caller must have released
    /// any previous session.
    pub fn configure(
        &mut self,
        params: SamplingParams,
    ) -> Result<AcquisitionSession<A::Session>, HardwareFault> {
        let format = self.adc.record_format();
        let params = SessionParams {
            sample_rate_hz: params.sample_rate_hz,
            attenuation: params.attenuation,
            bit_width: params.bit_width,
            chunk_bytes: chunk_size(params.sample_rate_hz, format),
            format,
        };
        let handle = self.adc.configure(&params)?;
        Ok(AcquisitionSession { handle, params })
    }

    /// Apply pending configuration: stop, release, settle, rebuild, start.
    ///
    /// The revision is recorded only once the new session is running, so a
    /// mutation that lands mid-sequence leaves the controller dirty.
    pub async fn reconfigure_if_dirty<D: DelayNs>(
        &mut self,
        delay: &mut D,
    ) -> Result<bool, HardwareFault> {
        if !self.is_dirty() {
            return Ok(false);
        }

        let (params, revision) = self.config.snapshot();
        self.teardown()?;
        if self.needs_settle {
            delay.delay_ms(ADC_SETTLE_MS).await;
            self.needs_settle = false;
        }

        let mut session = self.configure(params)?;
        if let Err(fault) = self.adc.start(&mut session.handle) {
            self.adc.release(session.handle);
            self.needs_settle = true;
            return Err(fault);
        }

        log::info!(
            "acquisition: running rate={}Hz atten={} bits={} chunk={}",
            session.params.sample_rate_hz,
            session.params.attenuation.as_index(),
            session.params.bit_width.bits(),
            session.params.chunk_bytes
        );
        self.session = Some(session);
        self.applied = Some(revision);
        telemetry::record_reconfiguration();
        Ok(true)
    }

    /// Drain whatever the peripheral has buffered into `batch`.
    pub fn read(&mut self, batch: &mut SampleBatch) -> Result<ReadOutcome, HardwareFault> {
        batch.clear();
        let Some(session) = self.session.as_mut() else {
            return Ok(ReadOutcome::Timeout);
        };

        let chunk = session.params.chunk_bytes;
        let format = session.params.format;
        match self.adc.read(&mut session.handle, &mut self.raw[..chunk]) {
            Ok(ReadOutcome::Data(len)) => {
                decode_records(format, &self.raw[..len.min(chunk)], batch);
                Ok(ReadOutcome::Data(len))
            }
            Ok(ReadOutcome::Timeout) => Ok(ReadOutcome::Timeout),
            Err(fault) => {
                let _ = self.teardown();
                Err(fault)
            }
        }
    }

    /// One acquisition iteration: apply pending configuration, then read.
    /// On a fault the session is torn down and rebuilt on the next call.
    pub async fn cycle<D: DelayNs>(
        &mut self,
        delay: &mut D,
        batch: &mut SampleBatch,
    ) -> Result<CycleOutcome, HardwareFault> {
        if let Err(fault) = self.reconfigure_if_dirty(delay).await {
            telemetry::record_hardware_fault();
            return Err(fault);
        }
        match self.read(batch) {
            Ok(ReadOutcome::Data(_)) if !batch.is_empty() => Ok(CycleOutcome::Batch),
            Ok(_) => Ok(CycleOutcome::Idle),
            Err(fault) => {
                telemetry::record_hardware_fault();
                Err(fault)
            }
        }
    }

    /// The handle is released even when stopping fails.
    fn teardown(&mut self) -> Result<(), HardwareFault> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };
        let stopped = self.adc.stop(&mut session.handle);
        self.adc.release(session.handle);
        self.needs_settle = true;
        stopped
    }
}

#[cfg(test)]
mod tests;
