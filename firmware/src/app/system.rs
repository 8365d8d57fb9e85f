use embassy_time::{Duration, Instant, Timer};
use esp_hal::{
    gpio::{Input, Level, Output},
    peripherals::LPWR,
    rtc_cntl::Rtc,
};
use esp_scope::{
    config::{POWER_OFF_FLUSH_MS, RESTART_FLUSH_MS},
    connectivity::{ConnectivityMode, DeviceControl},
};

use super::{
    config::{
        CONNECTIVITY, LED_CONNECTING_HALF_PERIOD_MS, LED_POLL_MS, LED_PROVISIONING_HALF_PERIOD_MS,
        POWER_REQUESTS, RESET_HOLD_MS, RESET_POLL_MS, STATUS_LED_ACTIVE_LOW,
    },
    types::{ManagerMutex, PowerRequest},
};

pub(crate) struct SystemReset;

impl DeviceControl for SystemReset {
    fn restart_device(&mut self) {
        esp_hal::system::software_reset();
    }
}

/// Runs restart and deep-sleep requests once the requesting handler has had
/// time to flush its reply.
#[embassy_executor::task]
pub(crate) async fn power_task(lpwr: LPWR<'static>) {
    match POWER_REQUESTS.wait().await {
        PowerRequest::Restart(restart) => {
            Timer::after(Duration::from_millis(RESTART_FLUSH_MS)).await;
            restart.perform(&mut SystemReset);
        }
        PowerRequest::PowerOff => {
            Timer::after(Duration::from_millis(POWER_OFF_FLUSH_MS)).await;
            esp_println::println!("power: entering deep sleep without wake source");
            let mut rtc = Rtc::new(lpwr);
            rtc.sleep_deep(&[]);
        }
    }
}

#[embassy_executor::task]
pub(crate) async fn status_led_task(mut led: Output<'static>) {
    let mut lit = false;
    loop {
        let half_period_ms = match CONNECTIVITY.current_mode() {
            ConnectivityMode::Connected => {
                set_led(&mut led, true);
                Timer::after(Duration::from_millis(LED_POLL_MS)).await;
                continue;
            }
            ConnectivityMode::Connecting => LED_CONNECTING_HALF_PERIOD_MS,
            ConnectivityMode::Provisioning => LED_PROVISIONING_HALF_PERIOD_MS,
        };
        lit = !lit;
        set_led(&mut led, lit);
        Timer::after(Duration::from_millis(half_period_ms)).await;
    }
}

fn set_led(led: &mut Output<'static>, on: bool) {
    let level = if on != STATUS_LED_ACTIVE_LOW {
        Level::High
    } else {
        Level::Low
    };
    led.set_level(level);
}

/// Holding the boot button erases the stored network and restarts.
#[embassy_executor::task]
pub(crate) async fn reset_button_task(button: Input<'static>, manager: &'static ManagerMutex) {
    let mut pressed_since: Option<Instant> = None;
    loop {
        Timer::after(Duration::from_millis(RESET_POLL_MS)).await;
        if button.is_high() {
            pressed_since = None;
            continue;
        }

        let since = *pressed_since.get_or_insert_with(Instant::now);
        if since.elapsed() < Duration::from_millis(RESET_HOLD_MS) {
            continue;
        }

        esp_println::println!("button: held {}ms, factory reset", RESET_HOLD_MS);
        let restart = manager.lock().await.factory_reset();
        POWER_REQUESTS.signal(PowerRequest::Restart(restart));
        return;
    }
}
