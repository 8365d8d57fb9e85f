mod acquisition;
mod adc;
pub(crate) mod config;
mod http;
mod portal;
pub(crate) mod store;
mod stream;
mod system;
mod tone;
pub(crate) mod types;
mod wifi;

use embassy_sync::mutex::Mutex;
use esp_hal::{
    gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull},
    timer::timg::TimerGroup,
};
use esp_println::println;
use esp_scope::{
    connectivity::{ConnectivityManager, LinkAction, RetryForever},
    control::ControlPlane,
};
use static_cell::StaticCell;

use self::{
    adc::PacedAdc,
    config::{CONNECTIVITY, HEAP_SIZE, HTTP_WORKER_COUNT, RECORD_FORMAT, SAMPLE_RATE_LIMITS, SAMPLING},
    tone::LedcTone,
    types::{ControlMutex, HttpContext, ManagerMutex, NetRole},
};

static MANAGER: StaticCell<ManagerMutex> = StaticCell::new();
static CONTROL: StaticCell<ControlMutex> = StaticCell::new();
#[cfg(feature = "esp32c6")]
static RF_SWITCH: StaticCell<[Output<'static>; 2]> = StaticCell::new();

pub(crate) fn run() -> ! {
    let peripherals = esp_hal::init(esp_hal::Config::default());
    esp_alloc::heap_allocator!(size: HEAP_SIZE);
    esp_println::logger::init_logger_from_env();

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    #[cfg(feature = "esp32c6")]
    {
        let sw_int =
            esp_hal::interrupt::software::SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
        esp_rtos::start(timg0.timer0, sw_int.software_interrupt0);
    }
    #[cfg(feature = "esp32")]
    esp_rtos::start(timg0.timer0);

    println!("esp-scope: booting");

    // XIAO ESP32-C6: GPIO3 low powers the RF switch, GPIO14 low selects the
    // on-board antenna.
    #[cfg(feature = "esp32c6")]
    RF_SWITCH.init([
        Output::new(peripherals.GPIO3, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO14, Level::Low, OutputConfig::default()),
    ]);

    let credential_store = store::credential_store(peripherals.FLASH);
    let (manager, boot) = ConnectivityManager::boot(credential_store, RetryForever, &CONNECTIVITY);
    let role = if boot.actions.contains(&LinkAction::StartStation) {
        NetRole::Station
    } else {
        NetRole::AccessPoint
    };
    let credentials = manager.credentials().copied();

    let mut control = ControlPlane::new(
        &SAMPLING,
        SAMPLE_RATE_LIMITS,
        LedcTone::new(peripherals.LEDC, peripherals.GPIO1),
    );
    if let Err(fault) = control.start_tone() {
        println!("esp-scope: {}", fault);
    }

    #[cfg(feature = "esp32c6")]
    let adc = PacedAdc::new(peripherals.ADC1, peripherals.GPIO0, RECORD_FORMAT);
    #[cfg(feature = "esp32")]
    let adc = PacedAdc::new(peripherals.ADC1, peripherals.GPIO36, RECORD_FORMAT);

    #[cfg(feature = "esp32c6")]
    let (led_pin, button_pin) = (peripherals.GPIO15, peripherals.GPIO9);
    #[cfg(feature = "esp32")]
    let (led_pin, button_pin) = (peripherals.GPIO2, peripherals.GPIO0);
    let led = Output::new(led_pin, Level::High, OutputConfig::default());
    let button = Input::new(button_pin, InputConfig::default().with_pull(Pull::Up));

    let net = wifi::setup(peripherals.WIFI, role).expect("failed to bring up wifi");

    let manager: &'static ManagerMutex = MANAGER.init(Mutex::new(manager));
    let control: &'static ControlMutex = CONTROL.init(Mutex::new(control));
    let http_context = HttpContext { manager, control };
    let lpwr = peripherals.LPWR;

    let mut executor = esp_rtos::embassy::Executor::new();
    let executor = unsafe { make_static(&mut executor) };
    executor.run(move |spawner| {
        spawner.must_spawn(wifi::net_task(net.runner));
        match (role, credentials) {
            (NetRole::Station, Some(credentials)) => {
                spawner.must_spawn(wifi::station_task(
                    net.controller,
                    net.stack,
                    manager,
                    credentials,
                ));
            }
            _ => {
                spawner.must_spawn(wifi::access_point_task(net.controller));
                spawner.must_spawn(portal::dns_task(net.stack));
                spawner.must_spawn(portal::dhcp_task(net.stack));
            }
        }
        for worker in 0..HTTP_WORKER_COUNT {
            spawner.must_spawn(http::http_worker(net.stack, http_context, worker));
        }
        spawner.must_spawn(acquisition::acquisition_task(adc));
        spawner.must_spawn(system::power_task(lpwr));
        spawner.must_spawn(system::status_led_task(led));
        spawner.must_spawn(system::reset_button_task(button, manager));
    });
}

unsafe fn make_static<T>(value: &mut T) -> &'static mut T {
    unsafe { core::mem::transmute(value) }
}
