mod connection;
mod websocket;

use core::cmp::min;

use embassy_net::{tcp::TcpSocket, IpListenEndpoint, Stack};
use embassy_time::{with_timeout, Duration, Timer};
use embedded_io_async::Write;
use esp_println::println;
use esp_scope::{
    config::HTTP_PORT,
    http::{response_head, CONTENT_TEXT},
};

use super::{
    config::{HTTP_RW_BUF, HTTP_SOCKET_TIMEOUT_S, HTTP_WORKER_COUNT},
    types::HttpContext,
};

const FLUSH_TIMEOUT_MS: u64 = 250;

/// One accept loop per worker. Each worker owns its socket buffers, so a
/// long-lived stream connection only ties up the worker serving it.
#[embassy_executor::task(pool_size = HTTP_WORKER_COUNT)]
pub(crate) async fn http_worker(stack: Stack<'static>, context: HttpContext, worker: usize) {
    stack.wait_config_up().await;
    if worker == 0 {
        if let Some(cfg) = stack.config_v4() {
            println!("http: listening on {}:{}", cfg.address.address(), HTTP_PORT);
        }
    }

    let mut rx_buffer = [0u8; HTTP_RW_BUF];
    let mut tx_buffer = [0u8; HTTP_RW_BUF];

    loop {
        let mut socket = TcpSocket::new(stack, &mut rx_buffer, &mut tx_buffer);
        socket.set_timeout(Some(Duration::from_secs(HTTP_SOCKET_TIMEOUT_S)));

        let accepted = socket
            .accept(IpListenEndpoint {
                addr: None,
                port: HTTP_PORT,
            })
            .await;
        if let Err(err) = accepted {
            log::warn!("http[{}]: accept err={:?}", worker, err);
            Timer::after(Duration::from_millis(100)).await;
            continue;
        }

        if let Err(err) = connection::handle_connection(&mut socket, context).await {
            log::debug!("http[{}]: request err={}", worker, err);
        }

        let _ = with_timeout(Duration::from_millis(FLUSH_TIMEOUT_MS), socket.flush()).await;
        socket.close();
        Timer::after(Duration::from_millis(20)).await;
        socket.abort();
    }
}

pub(super) async fn write_response(
    socket: &mut TcpSocket<'_>,
    status: &str,
    content_type: &str,
    body: &[u8],
) {
    let head = response_head(status, Some(content_type), body.len(), None);
    let _ = socket.write_all(head.as_bytes()).await;
    let _ = socket.write_all(body).await;
}

pub(super) async fn write_text(socket: &mut TcpSocket<'_>, status: &str, body: &str) {
    write_response(socket, status, CONTENT_TEXT, body.as_bytes()).await;
}

pub(super) async fn drain_remaining_body(
    socket: &mut TcpSocket<'_>,
    content_length: usize,
    already_in_buffer: usize,
) -> Result<(), &'static str> {
    if already_in_buffer >= content_length {
        return Ok(());
    }
    let mut remaining = content_length - already_in_buffer;
    let mut sink = [0u8; 256];
    while remaining > 0 {
        let want = min(remaining, sink.len());
        let n = socket.read(&mut sink[..want]).await.map_err(|_| "drain")?;
        if n == 0 {
            return Err("drain eof");
        }
        remaining -= n;
    }
    Ok(())
}

/// Collect a body of exactly `content_length` bytes into `body`, starting
/// with whatever arrived alongside the header.
pub(super) async fn read_body<'b>(
    socket: &mut TcpSocket<'_>,
    already: &[u8],
    content_length: usize,
    body: &'b mut [u8],
) -> Result<&'b [u8], &'static str> {
    if content_length > body.len() {
        return Err("body too large");
    }
    let take = min(already.len(), content_length);
    body[..take].copy_from_slice(&already[..take]);
    let mut filled = take;
    while filled < content_length {
        let n = socket
            .read(&mut body[filled..content_length])
            .await
            .map_err(|_| "read body")?;
        if n == 0 {
            return Err("incomplete body");
        }
        filled += n;
    }
    Ok(&body[..content_length])
}
