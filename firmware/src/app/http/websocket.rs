//! `/signal` stream session. A connection becomes the viewer after its
//! handshake message; a later handshake on another connection supersedes it.

use embassy_futures::select::{select3, Either3};
use embassy_net::tcp::TcpSocket;
use embassy_time::{with_timeout, Duration, Timer};
use embedded_io_async::Write;
use esp_scope::{
    http::{
        websocket::{
            accept_key, encode_server_frame_header, is_handshake, parse_client_frame, unmask,
            Opcode, FRAME_HEADER_MAX,
        },
        websocket_upgrade_head,
    },
    stream::PeerId,
};

use super::super::{
    config::{
        SampleFrame, STREAM_OUTBOX, VIEWER, WS_KEEPALIVE_S, WS_RX_BUF, WS_SUPERSEDE_POLL_MS,
        WS_WRITE_TIMEOUT_MS,
    },
    stream::{allocate_peer, claim_stream, owns_stream, release_stream},
};

const CLOSE_NORMAL: [u8; 2] = 1000u16.to_be_bytes();
const CLOSE_PROTOCOL_ERROR: [u8; 2] = 1002u16.to_be_bytes();
const CLOSE_TOO_LARGE: [u8; 2] = 1009u16.to_be_bytes();

enum Wake {
    Read(usize),
    Frame(SampleFrame),
    Tick,
}

pub(super) async fn serve(
    socket: &mut TcpSocket<'_>,
    client_key: &str,
    already: &[u8],
) -> Result<(), &'static str> {
    let accept = accept_key(client_key);
    let head = websocket_upgrade_head(&accept);
    socket
        .write_all(head.as_bytes())
        .await
        .map_err(|_| "ws upgrade write")?;

    // Stream sessions outlive the request timeout; keep-alive probes detect
    // browsers that vanish without a close.
    socket.set_timeout(None);
    socket.set_keep_alive(Some(Duration::from_secs(WS_KEEPALIVE_S)));

    let peer = allocate_peer();
    log::info!("ws: peer {} connected", peer.get());
    let result = session(socket, peer, already).await;
    release_stream(peer);
    if VIEWER.evict(peer) {
        log::info!("ws: peer {} left, viewer slot cleared", peer.get());
    }
    result
}

async fn session(
    socket: &mut TcpSocket<'_>,
    peer: PeerId,
    already: &[u8],
) -> Result<(), &'static str> {
    let mut rx = [0u8; WS_RX_BUF];
    let mut filled = already.len().min(rx.len());
    rx[..filled].copy_from_slice(&already[..filled]);
    let mut registered = false;

    loop {
        loop {
            let frame = match parse_client_frame(&rx[..filled], WS_RX_BUF - FRAME_HEADER_MAX - 4) {
                Ok(Some(frame)) if frame.frame_len() <= filled => frame,
                Ok(_) => break,
                Err(err) => {
                    log::warn!("ws: peer {} sent bad frame: {}", peer.get(), err.as_str());
                    let _ = write_frame(socket, Opcode::Close, &CLOSE_PROTOCOL_ERROR).await;
                    return Err(err.as_str());
                }
            };
            let end = frame.frame_len();
            let payload = &mut rx[frame.header_len..end];
            unmask(payload, frame.mask);

            match frame.opcode {
                Opcode::Text | Opcode::Binary | Opcode::Continuation => {
                    if is_handshake(payload) {
                        if let Some(previous) = VIEWER.register(peer) {
                            if previous != peer {
                                log::info!(
                                    "ws: peer {} supersedes peer {}",
                                    peer.get(),
                                    previous.get()
                                );
                            }
                        }
                        claim_stream(peer);
                        registered = true;
                    }
                }
                Opcode::Ping => {
                    write_frame(socket, Opcode::Pong, payload).await?;
                }
                Opcode::Pong => {}
                Opcode::Close => {
                    let _ = write_frame(socket, Opcode::Close, &CLOSE_NORMAL).await;
                    return Ok(());
                }
            }

            rx.copy_within(end..filled, 0);
            filled -= end;
        }

        if filled == rx.len() {
            let _ = write_frame(socket, Opcode::Close, &CLOSE_TOO_LARGE).await;
            return Err("ws frame exceeds buffer");
        }

        if registered && !owns_stream(peer) {
            let _ = write_frame(socket, Opcode::Close, &CLOSE_NORMAL).await;
            return Ok(());
        }

        let owner = registered && owns_stream(peer);
        let wake = {
            let outbox = async {
                if owner {
                    STREAM_OUTBOX.receive().await
                } else {
                    core::future::pending().await
                }
            };
            match select3(
                socket.read(&mut rx[filled..]),
                outbox,
                Timer::after(Duration::from_millis(WS_SUPERSEDE_POLL_MS)),
            )
            .await
            {
                Either3::First(Ok(0)) => return Err("ws eof"),
                Either3::First(Ok(n)) => Wake::Read(n),
                Either3::First(Err(_)) => return Err("ws read"),
                Either3::Second(frame) => Wake::Frame(frame),
                Either3::Third(()) => Wake::Tick,
            }
        };

        match wake {
            Wake::Read(n) => filled += n,
            Wake::Frame(frame) => {
                // The frame may have been queued for a connection that was
                // superseded while it waited.
                if owns_stream(peer) {
                    write_frame(socket, Opcode::Binary, &frame).await?;
                }
            }
            Wake::Tick => {}
        }
    }
}

async fn write_frame(
    socket: &mut TcpSocket<'_>,
    opcode: Opcode,
    payload: &[u8],
) -> Result<(), &'static str> {
    let mut header = [0u8; FRAME_HEADER_MAX];
    let header_len = encode_server_frame_header(opcode, payload.len(), &mut header);
    let write = async {
        socket.write_all(&header[..header_len]).await?;
        socket.write_all(payload).await
    };
    match with_timeout(Duration::from_millis(WS_WRITE_TIMEOUT_MS), write).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(_)) => Err("ws write"),
        Err(_) => Err("ws write timeout"),
    }
}
