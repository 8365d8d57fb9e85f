use esp_hal::{
    gpio::DriveMode,
    ledc::{
        channel::{self, ChannelIFace as _},
        timer::{self, config::Duty, TimerIFace as _},
        LSGlobalClkSource, Ledc, LowSpeed,
    },
    peripherals::{GPIO1, LEDC},
    time::Rate,
};
use esp_scope::{control::ToneGenerator, error::HardwareFault};

const LEDC_SOURCE_CLOCK_HZ: u32 = 80_000_000;
const TONE_DUTY_BITS_MAX: u32 = 14;
const TONE_DUTY_PCT: u8 = 50;
/// Timer frequency used while the output is parked at zero duty.
const TONE_IDLE_HZ: u32 = 1_000;

/// Square-wave reference on GPIO1, driven by LEDC low-speed timer 0 and
/// channel 0. Both are rebuilt on every change.
pub(crate) struct LedcTone {
    ledc: LEDC<'static>,
    pin: GPIO1<'static>,
}

impl LedcTone {
    pub(crate) fn new(ledc: LEDC<'static>, pin: GPIO1<'static>) -> Self {
        Self { ledc, pin }
    }

    fn drive(&mut self, tone_hz: u32, duty_pct: u8) -> Result<(), HardwareFault> {
        let duty = duty_resolution(tone_hz).ok_or(HardwareFault::ToneConfigure)?;

        let mut ledc = Ledc::new(self.ledc.reborrow());
        ledc.set_global_slow_clock(LSGlobalClkSource::APBClk);

        let mut tone_timer = ledc.timer::<LowSpeed>(timer::Number::Timer0);
        tone_timer
            .configure(timer::config::Config {
                duty,
                clock_source: timer::LSClockSource::APBClk,
                frequency: Rate::from_hz(tone_hz),
            })
            .map_err(|_| HardwareFault::ToneConfigure)?;

        let mut tone_channel = ledc.channel::<LowSpeed>(channel::Number::Channel0, self.pin.reborrow());
        tone_channel
            .configure(channel::config::Config {
                timer: &tone_timer,
                duty_pct,
                drive_mode: DriveMode::PushPull,
            })
            .map_err(|_| HardwareFault::ToneConfigure)
    }
}

impl ToneGenerator for LedcTone {
    fn set_frequency(&mut self, tone_hz: u32) -> Result<(), HardwareFault> {
        self.drive(tone_hz, TONE_DUTY_PCT)?;
        log::info!("tone: {}Hz on GPIO1", tone_hz);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), HardwareFault> {
        self.drive(TONE_IDLE_HZ, 0)?;
        log::info!("tone: stopped");
        Ok(())
    }
}

/// Widest duty resolution the source clock allows at `tone_hz`.
fn duty_resolution(tone_hz: u32) -> Option<Duty> {
    if tone_hz == 0 {
        return None;
    }
    let ticks_per_period = LEDC_SOURCE_CLOCK_HZ / tone_hz;
    if ticks_per_period < 2 {
        return None;
    }
    let bits = (u32::BITS - 1 - ticks_per_period.leading_zeros()).min(TONE_DUTY_BITS_MAX);
    Some(match bits {
        1 => Duty::Duty1Bit,
        2 => Duty::Duty2Bit,
        3 => Duty::Duty3Bit,
        4 => Duty::Duty4Bit,
        5 => Duty::Duty5Bit,
        6 => Duty::Duty6Bit,
        7 => Duty::Duty7Bit,
        8 => Duty::Duty8Bit,
        9 => Duty::Duty9Bit,
        10 => Duty::Duty10Bit,
        11 => Duty::Duty11Bit,
        12 => Duty::Duty12Bit,
        13 => Duty::Duty13Bit,
        _ => Duty::Duty14Bit,
    })
}
