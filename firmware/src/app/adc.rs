use embassy_time::Instant;
use esp_hal::{
    analog::adc::{Adc, AdcConfig, AdcPin, Attenuation as HalAttenuation},
    peripherals::ADC1,
    Blocking,
};
use esp_scope::{
    acquisition::{ContinuousAdc, PaceStep, ReadOutcome, RecordFormat, SamplePacer, SessionParams},
    config::ADC_MAX_TRANSFER_BYTES,
    error::HardwareFault,
    sampling::{Attenuation, BitWidth},
    telemetry,
};

#[cfg(feature = "esp32")]
pub(crate) use esp_hal::peripherals::GPIO36 as AdcInput;
#[cfg(feature = "esp32c6")]
pub(crate) use esp_hal::peripherals::GPIO0 as AdcInput;

use super::config::ADC_CHANNEL;

pub(crate) struct OneshotSession {
    adc: Adc<'static, ADC1<'static>, Blocking>,
    pin: AdcPin<AdcInput<'static>, ADC1<'static>>,
    bit_width: BitWidth,
    pacer: SamplePacer,
    running: bool,
    /// Records of the chunk being assembled across bursts.
    stage: [u8; ADC_MAX_TRANSFER_BYTES],
    staged: usize,
}

/// Timer-paced one-shot conversions on ADC1 channel 0, emitted as the
/// board's DMA record format so the acquisition decoder sees one layout.
///
/// Each read runs one short burst of due conversions and returns; the
/// acquisition task awaits [`PacedAdc::resume_at`] between bursts.
pub(crate) struct PacedAdc {
    parts: Option<(ADC1<'static>, AdcInput<'static>)>,
    format: RecordFormat,
    resume_at: Option<Instant>,
}

impl PacedAdc {
    pub(crate) fn new(adc: ADC1<'static>, input: AdcInput<'static>, format: RecordFormat) -> Self {
        Self {
            parts: Some((adc, input)),
            format,
            resume_at: None,
        }
    }

    /// When the next conversion is due; `None` while no session runs.
    pub(crate) fn resume_at(&self) -> Option<Instant> {
        self.resume_at
    }
}

impl ContinuousAdc for PacedAdc {
    type Session = OneshotSession;

    fn record_format(&self) -> RecordFormat {
        self.format
    }

    fn configure(&mut self, params: &SessionParams) -> Result<OneshotSession, HardwareFault> {
        let pacer = SamplePacer::new(params.sample_rate_hz).ok_or(HardwareFault::Configure)?;
        let (adc1, input) = self.parts.take().ok_or(HardwareFault::Configure)?;

        let mut config = AdcConfig::new();
        let pin = config.enable_pin(input, hal_attenuation(params.attenuation));
        let adc = Adc::new(adc1, config);

        Ok(OneshotSession {
            adc,
            pin,
            bit_width: params.bit_width,
            pacer,
            running: false,
            stage: [0u8; ADC_MAX_TRANSFER_BYTES],
            staged: 0,
        })
    }

    fn start(&mut self, session: &mut OneshotSession) -> Result<(), HardwareFault> {
        let now = Instant::now();
        session.pacer.start(now.as_micros());
        session.staged = 0;
        session.running = true;
        self.resume_at = Some(now);
        Ok(())
    }

    fn stop(&mut self, session: &mut OneshotSession) -> Result<(), HardwareFault> {
        session.running = false;
        self.resume_at = None;
        Ok(())
    }

    fn release(&mut self, session: OneshotSession) {
        drop(session);
        self.resume_at = None;
        // SAFETY: the dropped session owned the only driver built on ADC1 and
        // the input pin; nothing else in the firmware touches either.
        self.parts = Some(unsafe { (ADC1::steal(), AdcInput::steal()) });
    }

    fn read(
        &mut self,
        session: &mut OneshotSession,
        buf: &mut [u8],
    ) -> Result<ReadOutcome, HardwareFault> {
        if !session.running {
            return Ok(ReadOutcome::Timeout);
        }

        let record_size = self.format.record_size();
        let target = (buf.len() - buf.len() % record_size).min(session.stage.len());
        if target == 0 {
            return Err(HardwareFault::Read);
        }

        let missed = session.pacer.begin_burst(Instant::now().as_micros());
        if missed > 0 {
            telemetry::record_samples_missed(missed);
            log::debug!("adc: behind schedule, dropped {} samples", missed);
        }

        while session.staged < target {
            match session.pacer.step(Instant::now().as_micros()) {
                PaceStep::Convert => {
                    let raw = nb::block!(session.adc.read_oneshot(&mut session.pin))
                        .map_err(|_| HardwareFault::Read)?;
                    let sample = session.bit_width.scale(raw);
                    session.staged += self
                        .format
                        .write_record(&mut session.stage[session.staged..], ADC_CHANNEL, sample)
                        .ok_or(HardwareFault::Read)?;
                    session.pacer.advance();
                }
                PaceStep::Spin => core::hint::spin_loop(),
                PaceStep::Yield => break,
            }
        }
        self.resume_at = Some(Instant::from_micros(session.pacer.resume_at()));

        if session.staged < target {
            return Ok(ReadOutcome::Timeout);
        }
        buf[..target].copy_from_slice(&session.stage[..target]);
        session.staged = 0;
        Ok(ReadOutcome::Data(target))
    }
}

fn hal_attenuation(attenuation: Attenuation) -> HalAttenuation {
    match attenuation {
        Attenuation::Db0 => HalAttenuation::_0dB,
        Attenuation::Db2p5 => HalAttenuation::_2p5dB,
        Attenuation::Db6 => HalAttenuation::_6dB,
        Attenuation::Db12 => HalAttenuation::_11dB,
    }
}
