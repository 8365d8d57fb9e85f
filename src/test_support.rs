use std::sync::Once;

use embedded_hal_async::delay::DelayNs;

pub(crate) use embassy_futures::block_on;

pub(crate) fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = env_logger::Builder::from_default_env()
            .is_test(true)
            .filter_level(log::LevelFilter::Debug)
            .try_init();
    });
}

/// Records requested delays without sleeping.
#[derive(Default)]
pub(crate) struct RecordingDelay {
    pub(crate) total_ns: u64,
    pub(crate) calls: usize,
}

impl DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.total_ns += ns as u64;
        self.calls += 1;
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.total_ns += ms as u64 * 1_000_000;
        self.calls += 1;
    }
}
