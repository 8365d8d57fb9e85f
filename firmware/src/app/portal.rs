//! Captive-portal services that run only while the access point is up.

use embassy_net::{
    udp::{PacketMetadata, UdpSocket},
    IpAddress, IpEndpoint, Ipv4Address, Stack,
};
use embassy_time::{Duration, Timer};
use esp_scope::{
    config::{
        AP_ADDRESS, DHCP_CLIENT_PORT, DHCP_LEASE_TIME_S, DHCP_PACKET_MAX, DHCP_POOL_SIZE,
        DHCP_SERVER_PORT, DNS_ANSWER_TTL_S, DNS_BUFFER_LEN, DNS_PORT,
    },
    dhcp::DhcpServer,
    dns::CaptivePortalResponder,
    telemetry,
};

const RETRY_DELAY: Duration = Duration::from_secs(2);

#[embassy_executor::task]
pub(crate) async fn dns_task(stack: Stack<'static>) {
    let responder = CaptivePortalResponder::new(AP_ADDRESS, DNS_ANSWER_TTL_S);
    let mut rx_meta = [PacketMetadata::EMPTY; 4];
    let mut tx_meta = [PacketMetadata::EMPTY; 4];
    let mut rx_storage = [0u8; 512];
    let mut tx_storage = [0u8; 512];
    let mut query = [0u8; DNS_BUFFER_LEN];
    let mut answer = [0u8; DNS_BUFFER_LEN];

    stack.wait_config_up().await;
    let mut socket = UdpSocket::new(
        stack,
        &mut rx_meta,
        &mut rx_storage,
        &mut tx_meta,
        &mut tx_storage,
    );
    while let Err(err) = socket.bind(DNS_PORT) {
        log::warn!("dns: bind {} failed: {:?}", DNS_PORT, err);
        Timer::after(RETRY_DELAY).await;
    }
    log::info!("dns: answering every name with {:?}", AP_ADDRESS);

    loop {
        let (len, meta) = match socket.recv_from(&mut query).await {
            Ok(received) => received,
            Err(err) => {
                // Oversize datagrams are dropped, never answered truncated.
                log::debug!("dns: recv {:?}", err);
                telemetry::record_dns_dropped();
                continue;
            }
        };

        match responder.handle_query(&query[..len], &mut answer) {
            Ok(Some(answer_len)) => {
                if let Err(err) = socket.send_to(&answer[..answer_len], meta.endpoint).await {
                    log::warn!("dns: send_to {:?}", err);
                }
            }
            Ok(None) => {}
            Err(err) => {
                log::debug!("dns: {}", err);
                telemetry::record_dns_dropped();
            }
        }
    }
}

#[embassy_executor::task]
pub(crate) async fn dhcp_task(stack: Stack<'static>) {
    let mut server = DhcpServer::<DHCP_POOL_SIZE>::new(AP_ADDRESS, DHCP_LEASE_TIME_S);
    let mut rx_meta = [PacketMetadata::EMPTY; 4];
    let mut tx_meta = [PacketMetadata::EMPTY; 4];
    let mut rx_storage = [0u8; 1024];
    let mut tx_storage = [0u8; 1024];
    let mut request = [0u8; DHCP_PACKET_MAX];
    let mut reply = [0u8; DHCP_PACKET_MAX];

    stack.wait_config_up().await;
    let mut socket = UdpSocket::new(
        stack,
        &mut rx_meta,
        &mut rx_storage,
        &mut tx_meta,
        &mut tx_storage,
    );
    while let Err(err) = socket.bind(DHCP_SERVER_PORT) {
        log::warn!("dhcp: bind {} failed: {:?}", DHCP_SERVER_PORT, err);
        Timer::after(RETRY_DELAY).await;
    }
    let broadcast = IpEndpoint::new(IpAddress::Ipv4(Ipv4Address::BROADCAST), DHCP_CLIENT_PORT);

    loop {
        let (len, _) = match socket.recv_from(&mut request).await {
            Ok(received) => received,
            Err(err) => {
                log::debug!("dhcp: recv {:?}", err);
                continue;
            }
        };

        match server.handle(&request[..len], &mut reply) {
            Ok(Some(reply_len)) => {
                if let Err(err) = socket.send_to(&reply[..reply_len], broadcast).await {
                    log::warn!("dhcp: send_to {:?}", err);
                }
            }
            Ok(None) => {}
            Err(err) => log::debug!("dhcp: {}", err),
        }
    }
}
