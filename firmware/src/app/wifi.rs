use embassy_net::{
    Config as NetConfig, DhcpConfig, Ipv4Address, Ipv4Cidr, Runner, Stack, StackResources,
    StaticConfigV4,
};
use embassy_time::{with_timeout, Duration, Timer};
use esp_hal::rng::Rng;
use esp_println::println;
use esp_radio::wifi::{
    AccessPointConfig, AuthMethod, ClientConfig, ModeConfig, PowerSaveMode, WifiController,
    WifiDevice, WifiEvent,
};
use esp_scope::{
    config::{AP_ADDRESS, AP_CHANNEL, AP_MAX_CONNECTIONS, AP_PREFIX_LEN, AP_SSID, HOSTNAME},
    connectivity::{LinkAction, LinkEvent},
    credentials::WifiCredentials,
};
use static_cell::StaticCell;

use super::{
    config::{STACK_SOCKETS, WIFI_DHCP_TIMEOUT_MS, WIFI_RETRY_DELAY_MS},
    types::{ManagerMutex, NetRole},
};

pub(crate) struct NetRuntime {
    pub(crate) controller: WifiController<'static>,
    pub(crate) runner: Runner<'static, WifiDevice<'static>>,
    pub(crate) stack: Stack<'static>,
}

pub(crate) fn setup(
    wifi: esp_hal::peripherals::WIFI<'static>,
    role: NetRole,
) -> Result<NetRuntime, &'static str> {
    static RADIO_CTRL: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
    static STACK_RESOURCES: StaticCell<StackResources<STACK_SOCKETS>> = StaticCell::new();

    let radio_ctrl = esp_radio::init().map_err(|err| {
        println!("wifi: esp_radio::init err={:?}", err);
        "wifi: esp_radio::init failed"
    })?;
    let radio_ctrl = RADIO_CTRL.init(radio_ctrl);
    let (controller, ifaces) =
        esp_radio::wifi::new(radio_ctrl, wifi, Default::default()).map_err(|err| {
            println!("wifi: esp_radio::wifi::new err={:?}", err);
            "wifi: controller init failed"
        })?;

    let (device, net_config) = match role {
        NetRole::Station => (ifaces.sta, NetConfig::dhcpv4(station_dhcp_config())),
        NetRole::AccessPoint => (ifaces.ap, NetConfig::ipv4_static(access_point_address())),
    };

    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;
    let (stack, runner) = embassy_net::new(
        device,
        net_config,
        STACK_RESOURCES.init(StackResources::<STACK_SOCKETS>::new()),
        seed,
    );

    Ok(NetRuntime {
        controller,
        runner,
        stack,
    })
}

fn station_dhcp_config() -> DhcpConfig {
    let mut config = DhcpConfig::default();
    config.hostname = heapless::String::try_from(HOSTNAME).ok();
    config
}

fn access_point_address() -> StaticConfigV4 {
    let [a, b, c, d] = AP_ADDRESS;
    StaticConfigV4 {
        address: Ipv4Cidr::new(Ipv4Address::new(a, b, c, d), AP_PREFIX_LEN),
        gateway: None,
        dns_servers: Default::default(),
    }
}

#[embassy_executor::task]
pub(crate) async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}

/// Join the stored network and keep rejoining it. Every failed attempt and
/// every link loss is reported to the connectivity manager, whose retry
/// policy decides whether to continue. A granted reconnect is issued at
/// once; only radio bring-up failures wait before retrying.
#[embassy_executor::task]
pub(crate) async fn station_task(
    mut controller: WifiController<'static>,
    stack: Stack<'static>,
    manager: &'static ManagerMutex,
    credentials: WifiCredentials,
) {
    let (Some(ssid), Some(password)) = (credentials.ssid_str(), credentials.password_str()) else {
        println!("wifi: stored credentials are not utf8; staying offline");
        return;
    };
    let auth_method = if password.is_empty() {
        AuthMethod::None
    } else {
        AuthMethod::Wpa2Personal
    };
    let mode = ModeConfig::Client(
        ClientConfig::default()
            .with_ssid(ssid.into())
            .with_password(password.into())
            .with_auth_method(auth_method),
    );

    loop {
        if !matches!(controller.is_started(), Ok(true)) {
            if let Err(err) = controller.set_config(&mode) {
                println!("wifi: station config err={:?}", err);
                Timer::after(Duration::from_millis(WIFI_RETRY_DELAY_MS)).await;
                continue;
            }
            if let Err(err) = controller.start_async().await {
                println!("wifi: start err={:?}", err);
                Timer::after(Duration::from_millis(WIFI_RETRY_DELAY_MS)).await;
                continue;
            }
            // Modem sleep adds tens of milliseconds to every streamed frame.
            if let Err(err) = controller.set_power_saving(PowerSaveMode::None) {
                log::warn!("wifi: power save err={:?}", err);
            }
        }

        log::info!("wifi: connecting ssid={}", ssid);
        let joined = match controller.connect_async().await {
            Ok(()) => {
                let addressed =
                    with_timeout(Duration::from_millis(WIFI_DHCP_TIMEOUT_MS), stack.wait_config_up())
                        .await
                        .is_ok();
                if !addressed {
                    log::warn!("wifi: no address within {}ms", WIFI_DHCP_TIMEOUT_MS);
                    let _ = controller.disconnect_async().await;
                }
                addressed
            }
            Err(err) => {
                log::warn!("wifi: connect err={:?}", err);
                false
            }
        };

        if joined {
            if let Some(config) = stack.config_v4() {
                println!("wifi: connected ip={}", config.address.address());
            }
            manager.lock().await.apply(LinkEvent::AddressAcquired);
            controller.wait_for_event(WifiEvent::StaDisconnected).await;
            log::warn!("wifi: station disconnected");
        }

        let result = manager.lock().await.apply(LinkEvent::Disconnected);
        if result.actions.contains(&LinkAction::GiveUp) {
            let _ = controller.stop_async().await;
            println!("wifi: retry policy exhausted; station stopped");
            return;
        }
        if let Some(LinkAction::Reconnect { attempt }) = result
            .actions
            .iter()
            .find(|action| matches!(action, LinkAction::Reconnect { .. }))
        {
            log::info!("wifi: reconnect attempt={}", attempt);
        }
    }
}

/// Open provisioning network; stations get addresses from the portal DHCP
/// service. The task keeps the controller alive for the rest of the boot.
#[embassy_executor::task]
pub(crate) async fn access_point_task(mut controller: WifiController<'static>) {
    let mode = ModeConfig::AccessPoint(
        AccessPointConfig::default()
            .with_ssid(AP_SSID.into())
            .with_channel(AP_CHANNEL)
            .with_auth_method(AuthMethod::None)
            .with_max_connections(AP_MAX_CONNECTIONS),
    );

    loop {
        let started = match controller.set_config(&mode) {
            Ok(()) => controller.start_async().await,
            Err(err) => Err(err),
        };
        match started {
            Ok(()) => break,
            Err(err) => {
                println!("wifi: access point start err={:?}", err);
                Timer::after(Duration::from_millis(WIFI_RETRY_DELAY_MS)).await;
            }
        }
    }
    println!(
        "wifi: provisioning access point ssid={} channel={}",
        AP_SSID, AP_CHANNEL
    );

    core::future::pending::<()>().await;
}
