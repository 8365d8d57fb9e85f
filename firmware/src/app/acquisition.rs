use embassy_time::{Delay, Duration, Instant, Timer};
use esp_scope::{
    acquisition::{AcquisitionController, CycleOutcome, SampleBatch},
    config::{ADC_FAULT_RETRY_MS, ADC_READ_BACKOFF_MS},
    stream::StreamingSink,
};

use super::{
    adc::PacedAdc,
    config::{SAMPLING, VIEWER},
    stream::OutboxTransport,
};

#[embassy_executor::task]
pub(crate) async fn acquisition_task(adc: PacedAdc) {
    let mut controller = AcquisitionController::new(adc, &SAMPLING);
    let mut sink = StreamingSink::new(&VIEWER);
    let mut transport = OutboxTransport;
    let mut delay = Delay;
    let mut batch = SampleBatch::new();

    log::info!(
        "acquisition: starting at {}Hz",
        SAMPLING.sample_rate_hz()
    );

    loop {
        match controller.cycle(&mut delay, &mut batch).await {
            Ok(CycleOutcome::Batch) => {
                sink.publish(&mut transport, &batch);
                embassy_futures::yield_now().await;
            }
            Ok(CycleOutcome::Idle) => match controller.adc().resume_at() {
                Some(at) if at > Instant::now() => Timer::at(at).await,
                // Behind schedule: let the other tasks run, then catch up.
                Some(_) => embassy_futures::yield_now().await,
                None => Timer::after(Duration::from_millis(ADC_READ_BACKOFF_MS)).await,
            },
            Err(fault) => {
                log::warn!("acquisition: {}; rebuilding session", fault);
                Timer::after(Duration::from_millis(ADC_FAULT_RETRY_MS)).await;
            }
        }
    }
}
