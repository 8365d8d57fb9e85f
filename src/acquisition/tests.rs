use std::collections::VecDeque;
use std::vec::Vec;

use embedded_hal_async::delay::DelayNs;

use super::*;
use crate::config::{
    ADC_BURST_BUDGET_US, ADC_MAX_TRANSFER_BYTES, ADC_MIN_CHUNK_BYTES, ADC_SPIN_THRESHOLD_US,
};
use crate::test_support::{block_on, init_logging, RecordingDelay};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Op {
    Configure(u32),
    Start,
    Stop,
    Release,
}

struct MockAdc {
    format: RecordFormat,
    ops: Vec<Op>,
    handle_live: bool,
    running: bool,
    fail_next_start: bool,
    reads: VecDeque<Result<ReadOutcome, HardwareFault>>,
}

impl MockAdc {
    fn new(format: RecordFormat) -> Self {
        Self {
            format,
            ops: Vec::new(),
            handle_live: false,
            running: false,
            fail_next_start: false,
            reads: VecDeque::new(),
        }
    }

    fn configured_rates(&self) -> Vec<u32> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Configure(rate) => Some(*rate),
                _ => None,
            })
            .collect()
    }
}

struct MockSession;

impl ContinuousAdc for MockAdc {
    type Session = MockSession;

    fn record_format(&self) -> RecordFormat {
        self.format
    }

    fn configure(&mut self, params: &SessionParams) -> Result<MockSession, HardwareFault> {
        assert!(!self.handle_live, "configure while previous handle is held");
        assert_eq!(params.chunk_bytes % 4, 0);
        self.ops.push(Op::Configure(params.sample_rate_hz));
        self.handle_live = true;
        Ok(MockSession)
    }

    fn start(&mut self, _session: &mut MockSession) -> Result<(), HardwareFault> {
        self.ops.push(Op::Start);
        if core::mem::take(&mut self.fail_next_start) {
            return Err(HardwareFault::Start);
        }
        self.running = true;
        Ok(())
    }

    fn stop(&mut self, _session: &mut MockSession) -> Result<(), HardwareFault> {
        self.ops.push(Op::Stop);
        self.running = false;
        Ok(())
    }

    fn release(&mut self, _session: MockSession) {
        assert!(!self.running, "release while running");
        self.ops.push(Op::Release);
        self.handle_live = false;
    }

    fn read(
        &mut self,
        _session: &mut MockSession,
        buf: &mut [u8],
    ) -> Result<ReadOutcome, HardwareFault> {
        assert!(self.running);
        let outcome = self.reads.pop_front().unwrap_or(Ok(ReadOutcome::Timeout));
        if let Ok(ReadOutcome::Data(len)) = outcome {
            let size = self.format.record_size();
            for (index, record) in buf[..len].chunks_exact_mut(size).enumerate() {
                self.format
                    .write_record(record, 0, 0x7000 | index as u16)
                    .unwrap();
            }
        }
        outcome
    }
}

/// Applies control-plane writes while the settle delay is pending.
struct MutatingDelay<'a> {
    config: &'a SamplingConfig,
    pending: VecDeque<u32>,
}

impl DelayNs for MutatingDelay<'_> {
    async fn delay_ns(&mut self, _ns: u32) {
        while let Some(rate) = self.pending.pop_front() {
            self.config.set_sample_rate_hz(rate);
        }
    }
}

#[test]
fn chunk_size_stays_aligned_and_bounded() {
    for format in [RecordFormat::Type1, RecordFormat::Type2] {
        for rate in [0, 1, 611, 1_000, 9_999, 20_000, 83_333, 2_000_000, u32::MAX] {
            let chunk = chunk_size(rate, format);
            assert!(chunk >= ADC_MIN_CHUNK_BYTES, "rate={rate} chunk={chunk}");
            assert!(chunk <= ADC_MAX_TRANSFER_BYTES, "rate={rate} chunk={chunk}");
            assert_eq!(chunk % 4, 0);
        }
    }
}

#[test]
fn chunk_size_targets_twenty_millis() {
    assert_eq!(chunk_size(20_000, RecordFormat::Type1), 800);
    assert_eq!(chunk_size(20_000, RecordFormat::Type2), 1_600);
    assert_eq!(chunk_size(1_000, RecordFormat::Type2), ADC_MIN_CHUNK_BYTES);
}

#[test]
fn decode_masks_metadata() {
    let mut raw = [0u8; 8];
    RecordFormat::Type2.write_record(&mut raw[..4], 5, 0x0ABC).unwrap();
    RecordFormat::Type2.write_record(&mut raw[4..], 7, 0xF123).unwrap();
    assert_eq!(RecordFormat::Type2.channel(&raw[..4]), Some(5));

    let mut batch = SampleBatch::new();
    decode_records(RecordFormat::Type2, &raw, &mut batch);
    assert_eq!(batch.as_slice(), &[0x0ABC, 0x0123]);

    let type1 = [0xFFu8, 0xFF, 0x34, 0x12, 0x01];
    decode_records(RecordFormat::Type1, &type1, &mut batch);
    assert_eq!(batch.as_slice(), &[0x0FFF, 0x0234]);
}

#[test]
fn first_cycle_builds_and_starts_session() {
    init_logging();
    let config = SamplingConfig::new(20_000);
    let mut controller = AcquisitionController::new(MockAdc::new(RecordFormat::Type1), &config);
    let mut delay = RecordingDelay::default();

    assert!(block_on(controller.reconfigure_if_dirty(&mut delay)).unwrap());
    assert!(controller.is_running());
    assert_eq!(delay.calls, 0);
    assert_eq!(controller.adc().ops, [Op::Configure(20_000), Op::Start]);
    assert!(!block_on(controller.reconfigure_if_dirty(&mut delay)).unwrap());
}

#[test]
fn reconfiguration_stops_releases_then_settles() {
    let config = SamplingConfig::new(20_000);
    let mut controller = AcquisitionController::new(MockAdc::new(RecordFormat::Type2), &config);
    let mut delay = RecordingDelay::default();
    block_on(controller.reconfigure_if_dirty(&mut delay)).unwrap();

    config.set_sample_rate_hz(40_000);
    assert!(controller.is_dirty());
    assert!(block_on(controller.reconfigure_if_dirty(&mut delay)).unwrap());

    assert_eq!(
        controller.adc().ops,
        [
            Op::Configure(20_000),
            Op::Start,
            Op::Stop,
            Op::Release,
            Op::Configure(40_000),
            Op::Start,
        ]
    );
    assert_eq!(delay.total_ns, ADC_SETTLE_MS as u64 * 1_000_000);
    assert_eq!(controller.session_params().unwrap().chunk_bytes, 3_200);
}

#[test]
fn mutations_during_reconfiguration_trigger_second_pass() {
    let config = SamplingConfig::new(20_000);
    let mut controller = AcquisitionController::new(MockAdc::new(RecordFormat::Type1), &config);
    block_on(controller.reconfigure_if_dirty(&mut RecordingDelay::default())).unwrap();

    config.set_sample_rate_hz(30_000);
    let mut delay = MutatingDelay {
        config: &config,
        pending: VecDeque::from([35_000, 45_000, 50_000]),
    };
    assert!(block_on(controller.reconfigure_if_dirty(&mut delay)).unwrap());
    assert!(controller.is_dirty());

    assert!(block_on(controller.reconfigure_if_dirty(&mut delay)).unwrap());
    assert!(!controller.is_dirty());
    assert_eq!(controller.adc().configured_rates(), [20_000, 30_000, 50_000]);
    assert_eq!(controller.session_params().unwrap().sample_rate_hz, 50_000);
}

#[test]
fn start_failure_releases_handle_and_retries() {
    init_logging();
    let config = SamplingConfig::new(20_000);
    let mut adc = MockAdc::new(RecordFormat::Type1);
    adc.fail_next_start = true;
    let mut controller = AcquisitionController::new(adc, &config);
    let mut delay = RecordingDelay::default();
    let mut batch = SampleBatch::new();

    assert!(matches!(
        block_on(controller.cycle(&mut delay, &mut batch)),
        Err(HardwareFault::Start)
    ));
    assert!(!controller.is_running());
    assert!(!controller.adc().handle_live);

    assert!(matches!(
        block_on(controller.cycle(&mut delay, &mut batch)),
        Ok(CycleOutcome::Idle)
    ));
    assert!(controller.is_running());
}

#[test]
fn timeout_is_idle_and_data_is_decoded() {
    let config = SamplingConfig::new(20_000);
    let mut adc = MockAdc::new(RecordFormat::Type1);
    adc.reads.push_back(Ok(ReadOutcome::Timeout));
    adc.reads.push_back(Ok(ReadOutcome::Data(8)));
    let mut controller = AcquisitionController::new(adc, &config);
    let mut delay = RecordingDelay::default();
    let mut batch = SampleBatch::new();

    assert!(matches!(
        block_on(controller.cycle(&mut delay, &mut batch)),
        Ok(CycleOutcome::Idle)
    ));
    assert!(matches!(
        block_on(controller.cycle(&mut delay, &mut batch)),
        Ok(CycleOutcome::Batch)
    ));
    assert_eq!(batch.as_slice(), &[0, 1, 2, 3]);
}

#[test]
fn read_fault_tears_down_session() {
    let config = SamplingConfig::new(20_000);
    let mut adc = MockAdc::new(RecordFormat::Type1);
    adc.reads.push_back(Err(HardwareFault::Read));
    let mut controller = AcquisitionController::new(adc, &config);
    let mut delay = RecordingDelay::default();
    let mut batch = SampleBatch::new();

    assert!(matches!(
        block_on(controller.cycle(&mut delay, &mut batch)),
        Err(HardwareFault::Read)
    ));
    assert!(!controller.is_running());
    assert!(controller.is_dirty());
    assert!(matches!(
        block_on(controller.cycle(&mut delay, &mut batch)),
        Ok(CycleOutcome::Idle)
    ));
    assert_eq!(controller.adc().configured_rates(), [20_000, 20_000]);
}

#[test]
fn rebuild_after_read_fault_waits_for_settle() {
    let config = SamplingConfig::new(20_000);
    let mut adc = MockAdc::new(RecordFormat::Type2);
    adc.reads.push_back(Err(HardwareFault::Read));
    let mut controller = AcquisitionController::new(adc, &config);
    let mut delay = RecordingDelay::default();
    let mut batch = SampleBatch::new();

    assert!(block_on(controller.cycle(&mut delay, &mut batch)).is_err());
    assert_eq!(delay.calls, 0);

    assert!(block_on(controller.cycle(&mut delay, &mut batch)).is_ok());
    assert_eq!(delay.calls, 1);
    assert_eq!(delay.total_ns, ADC_SETTLE_MS as u64 * 1_000_000);

    assert!(block_on(controller.cycle(&mut delay, &mut batch)).is_ok());
    assert_eq!(delay.calls, 1);
}

/// Drives a pacer against a simulated clock where each conversion costs
/// `conversion_us` and every wake-up arrives `wake_latency_us` late.
struct PacedRun {
    samples: u64,
    bursts: u64,
    longest_burst_us: u64,
    missed: u64,
}

fn run_paced(rate_hz: u32, conversion_us: u64, wake_latency_us: u64, until_us: u64) -> PacedRun {
    let mut pacer = SamplePacer::new(rate_hz).unwrap();
    let mut now = 0u64;
    pacer.start(now);
    let mut run = PacedRun {
        samples: 0,
        bursts: 0,
        longest_burst_us: 0,
        missed: 0,
    };

    while now < until_us {
        run.missed += pacer.begin_burst(now) as u64;
        let burst_start = now;
        loop {
            match pacer.step(now) {
                PaceStep::Convert => {
                    now += conversion_us;
                    pacer.advance();
                    run.samples += 1;
                }
                PaceStep::Spin => now += 1,
                PaceStep::Yield => break,
            }
        }
        run.bursts += 1;
        run.longest_burst_us = run.longest_burst_us.max(now - burst_start);
        now = now.max(pacer.resume_at()) + wake_latency_us;
    }
    run
}

#[test]
fn pacer_delivers_rate_in_bounded_bursts() {
    let run = run_paced(20_000, 12, 30, 1_000_000);
    assert!((19_950..=20_050).contains(&run.samples), "samples={}", run.samples);
    assert_eq!(run.missed, 0);
    assert!(run.bursts >= 900, "bursts={}", run.bursts);
    assert!(run.longest_burst_us <= ADC_BURST_BUDGET_US + 12);
}

#[test]
fn pacer_yields_across_long_gaps() {
    let run = run_paced(1_000, 12, 30, 1_000_000);
    assert!((999..=1_001).contains(&run.samples), "samples={}", run.samples);
    assert!(run.longest_burst_us <= 12 + ADC_SPIN_THRESHOLD_US);

    let mut pacer = SamplePacer::new(1_000).unwrap();
    pacer.start(0);
    pacer.begin_burst(0);
    assert_eq!(pacer.step(0), PaceStep::Convert);
    pacer.advance();
    assert_eq!(pacer.step(10), PaceStep::Yield);
    assert_eq!(pacer.resume_at(), 1_000);
    assert_eq!(pacer.step(950), PaceStep::Spin);
}

#[test]
fn pacer_schedule_does_not_drift_at_uneven_periods() {
    let mut pacer = SamplePacer::new(611).unwrap();
    pacer.start(0);
    for _ in 0..611 {
        pacer.advance();
    }
    assert_eq!(pacer.resume_at(), 1_000_000);
}

#[test]
fn pacer_abandons_samples_when_far_behind() {
    let mut pacer = SamplePacer::new(10_000).unwrap();
    pacer.start(0);
    assert_eq!(pacer.begin_burst(200_000), 2_000);
    assert_eq!(pacer.resume_at(), 200_000);
    assert_eq!(pacer.step(200_000), PaceStep::Convert);

    pacer.advance();
    assert_eq!(pacer.begin_burst(200_500), 0);
}

#[test]
fn pacer_rejects_unschedulable_rates() {
    assert!(SamplePacer::new(0).is_none());
    assert!(SamplePacer::new(2_000_000).is_none());
    assert!(SamplePacer::new(1_000_000).is_some());
}
