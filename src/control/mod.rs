//! Translation of control requests into sampling and test-tone changes.

use heapless::String;

use crate::config::{CONTROL_BODY_MAX, CREDENTIALS_BODY_MAX, WIFI_PASSWORD_MAX, WIFI_SSID_MAX};
use crate::error::{ConfigParseError, HardwareFault};
use crate::json::JsonObject;
use crate::sampling::{Attenuation, BitWidth, SampleRateLimits, SamplingConfig};

/// PWM reference signal used to probe the input.
pub trait ToneGenerator {
    fn set_frequency(&mut self, tone_hz: u32) -> Result<(), HardwareFault>;
    fn stop(&mut self) -> Result<(), HardwareFault>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ControlUpdate {
    pub sample_rate_hz: Option<u32>,
    pub attenuation: Option<Attenuation>,
    pub bit_width: Option<BitWidth>,
    pub test_tone_hz: Option<u32>,
}

impl ControlUpdate {
    /// Unknown, malformed or out-of-range members are ignored one by one.
    pub fn from_json(body: &[u8]) -> Result<Self, ConfigParseError> {
        let object = JsonObject::parse(body, CONTROL_BODY_MAX)?;
        let mut update = Self::default();
        for (key, value) in object.members() {
            let Some(number) = value.as_u32() else {
                log::debug!("control: ignoring member {}", key);
                continue;
            };
            match key {
                "sample_rate" => update.sample_rate_hz = Some(number),
                "atten" => {
                    if let Some(attenuation) =
                        u8::try_from(number).ok().and_then(Attenuation::from_index)
                    {
                        update.attenuation = Some(attenuation);
                    }
                }
                "bit_width" => {
                    if let Some(bit_width) = u8::try_from(number).ok().and_then(BitWidth::from_bits)
                    {
                        update.bit_width = Some(bit_width);
                    }
                }
                "test_hz" => update.test_tone_hz = Some(number),
                _ => log::debug!("control: ignoring member {}", key),
            }
        }
        Ok(update)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ControlOutcome {
    /// Acquisition picks this up on its next cycle.
    pub acquisition_dirty: bool,
    pub tone_applied: bool,
}

pub struct ControlPlane<'a, T> {
    config: &'a SamplingConfig,
    limits: SampleRateLimits,
    tone: T,
}

impl<'a, T: ToneGenerator> ControlPlane<'a, T> {
    pub fn new(config: &'a SamplingConfig, limits: SampleRateLimits, tone: T) -> Self {
        Self {
            config,
            limits,
            tone,
        }
    }

    pub fn config(&self) -> &SamplingConfig {
        self.config
    }

    pub fn limits(&self) -> SampleRateLimits {
        self.limits
    }

    /// Drive the tone at the configured boot frequency.
    pub fn start_tone(&mut self) -> Result<(), HardwareFault> {
        let tone_hz = self.config.test_tone_hz();
        self.drive_tone(tone_hz)
    }

    pub fn handle_request(&mut self, body: &[u8]) -> Result<ControlOutcome, ConfigParseError> {
        let update = ControlUpdate::from_json(body)?;
        Ok(self.apply(&update))
    }

    pub fn apply(&mut self, update: &ControlUpdate) -> ControlOutcome {
        let mut outcome = ControlOutcome::default();

        if let Some(rate_hz) = update.sample_rate_hz {
            let clamped = self.limits.clamp(rate_hz);
            if clamped != rate_hz {
                log::info!("control: sample rate {}Hz clamped to {}Hz", rate_hz, clamped);
            }
            outcome.acquisition_dirty |= self.config.set_sample_rate_hz(clamped);
        }
        if let Some(attenuation) = update.attenuation {
            outcome.acquisition_dirty |= self.config.set_attenuation(attenuation);
        }
        if let Some(bit_width) = update.bit_width {
            outcome.acquisition_dirty |= self.config.set_bit_width(bit_width);
        }

        if let Some(tone_hz) = update.test_tone_hz {
            if tone_hz != self.config.test_tone_hz() {
                match self.drive_tone(tone_hz) {
                    Ok(()) => {
                        self.config.set_test_tone_hz(tone_hz);
                        outcome.tone_applied = true;
                    }
                    Err(fault) => log::warn!("control: tone {}Hz rejected: {}", tone_hz, fault),
                }
            }
        }

        outcome
    }

    fn drive_tone(&mut self, tone_hz: u32) -> Result<(), HardwareFault> {
        if tone_hz == 0 {
            self.tone.stop()
        } else {
            self.tone.set_frequency(tone_hz)
        }
    }
}

/// Body of a credential save request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialRequest {
    /// `None` when missing or not a string that fits.
    pub ssid: Option<String<WIFI_SSID_MAX>>,
    /// Required even for open networks, where it is the empty string.
    pub password: Option<String<WIFI_PASSWORD_MAX>>,
}

impl CredentialRequest {
    pub fn from_json(body: &[u8]) -> Result<Self, ConfigParseError> {
        let object = JsonObject::parse(body, CREDENTIALS_BODY_MAX)?;
        let ssid = object
            .get("ssid")
            .and_then(|value| value.decode_string::<WIFI_SSID_MAX>());
        let password = object
            .get("password")
            .and_then(|value| value.decode_string::<WIFI_PASSWORD_MAX>());
        Ok(Self { ssid, password })
    }

    pub fn parts(&self) -> Option<(&[u8], &[u8])> {
        Some((self.ssid.as_ref()?.as_bytes(), self.password.as_ref()?.as_bytes()))
    }
}

#[cfg(test)]
mod tests;
