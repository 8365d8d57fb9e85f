use std::vec::Vec;

use super::*;
use crate::test_support::init_logging;

#[derive(Default)]
struct RecordingTone {
    calls: Vec<u32>,
    reject: bool,
}

impl ToneGenerator for RecordingTone {
    fn set_frequency(&mut self, tone_hz: u32) -> Result<(), HardwareFault> {
        if self.reject {
            return Err(HardwareFault::ToneConfigure);
        }
        self.calls.push(tone_hz);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), HardwareFault> {
        self.calls.push(0);
        Ok(())
    }
}

const WROOM_LIMITS: SampleRateLimits = SampleRateLimits::new(20_000, 2_000_000);

#[test]
fn sample_rate_below_hardware_minimum_is_clamped() {
    init_logging();
    let config = SamplingConfig::new(20_000);
    config.set_sample_rate_hz(40_000);
    let mut control = ControlPlane::new(&config, WROOM_LIMITS, RecordingTone::default());

    let outcome = control.handle_request(br#"{"sample_rate": 5000}"#).unwrap();
    assert!(outcome.acquisition_dirty);
    assert_eq!(config.sample_rate_hz(), 20_000);
}

#[test]
fn unchanged_fields_leave_acquisition_clean() {
    let config = SamplingConfig::new(20_000);
    let mut control = ControlPlane::new(&config, WROOM_LIMITS, RecordingTone::default());
    let revision = config.revision();

    let outcome = control
        .handle_request(br#"{"sample_rate":20000,"atten":3,"bit_width":12}"#)
        .unwrap();
    assert!(!outcome.acquisition_dirty);
    assert_eq!(config.revision(), revision);
}

#[test]
fn tone_is_applied_immediately_without_dirtying() {
    let config = SamplingConfig::new(20_000);
    let mut control = ControlPlane::new(&config, WROOM_LIMITS, RecordingTone::default());
    let revision = config.revision();

    let outcome = control.handle_request(br#"{"test_hz":1000}"#).unwrap();
    assert!(outcome.tone_applied);
    assert!(!outcome.acquisition_dirty);
    assert_eq!(control.tone.calls, [1000]);
    assert_eq!(config.test_tone_hz(), 1000);
    assert_eq!(config.revision(), revision);

    control.handle_request(br#"{"test_hz":0}"#).unwrap();
    assert_eq!(control.tone.calls, [1000, 0]);
}

#[test]
fn rejected_tone_keeps_previous_frequency() {
    let config = SamplingConfig::new(20_000);
    let tone = RecordingTone {
        reject: true,
        ..RecordingTone::default()
    };
    let mut control = ControlPlane::new(&config, WROOM_LIMITS, tone);
    let outcome = control.handle_request(br#"{"test_hz":999999}"#).unwrap();
    assert!(!outcome.tone_applied);
    assert_eq!(config.test_tone_hz(), crate::config::DEFAULT_TEST_TONE_HZ);
}

#[test]
fn malformed_fields_are_ignored_individually() {
    let update =
        ControlUpdate::from_json(br#"{"sample_rate":"fast","atten":9,"bit_width":12,"x":1}"#)
            .unwrap();
    assert_eq!(update.sample_rate_hz, None);
    assert_eq!(update.attenuation, None);
    assert_eq!(update.bit_width, Some(BitWidth::Bits12));
}

#[test]
fn empty_object_is_still_acknowledged() {
    let config = SamplingConfig::default();
    let mut control = ControlPlane::new(&config, WROOM_LIMITS, RecordingTone::default());
    let outcome = control.handle_request(b"{}").unwrap();
    assert_eq!(outcome, ControlOutcome::default());
    assert!(ControlUpdate::from_json(b" { } ").unwrap().is_empty());
}

#[test]
fn unparseable_or_oversize_bodies_are_rejected() {
    assert_eq!(
        ControlUpdate::from_json(b"sample_rate=1000"),
        Err(ConfigParseError::NotAnObject)
    );
    let mut oversize = std::vec![b' '; CONTROL_BODY_MAX + 1];
    oversize[0] = b'{';
    *oversize.last_mut().unwrap() = b'}';
    assert_eq!(
        ControlUpdate::from_json(&oversize),
        Err(ConfigParseError::TooLarge)
    );
}

#[test]
fn boot_starts_tone_at_configured_frequency() {
    let config = SamplingConfig::default();
    let mut control = ControlPlane::new(&config, WROOM_LIMITS, RecordingTone::default());
    control.start_tone().unwrap();
    assert_eq!(control.tone.calls, [crate::config::DEFAULT_TEST_TONE_HZ]);
}

#[test]
fn credential_request_parts() {
    let request = CredentialRequest::from_json(br#"{"ssid":"lab","password":"pw"}"#).unwrap();
    assert_eq!(request.parts(), Some((&b"lab"[..], &b"pw"[..])));

    let open = CredentialRequest::from_json(br#"{"ssid":"cafe","password":""}"#).unwrap();
    assert_eq!(open.parts(), Some((&b"cafe"[..], &b""[..])));

    let long = std::format!(r#"{{"ssid":"{}","password":""}}"#, "s".repeat(40));
    let rejected = CredentialRequest::from_json(long.as_bytes()).unwrap();
    assert_eq!(rejected.parts(), None);
}

#[test]
fn credential_request_requires_password_string() {
    let missing = CredentialRequest::from_json(br#"{"ssid":"cafe"}"#).unwrap();
    assert_eq!(missing.password, None);
    assert_eq!(missing.parts(), None);

    let null = CredentialRequest::from_json(br#"{"ssid":"cafe","password":null}"#).unwrap();
    assert_eq!(null.parts(), None);

    let number = CredentialRequest::from_json(br#"{"ssid":"cafe","password":42}"#).unwrap();
    assert_eq!(number.parts(), None);
}
