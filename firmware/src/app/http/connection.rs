use embassy_net::tcp::TcpSocket;
use embassy_time::{with_timeout, Duration};
use esp_scope::{
    config::{CONTROL_BODY_MAX, CREDENTIALS_BODY_MAX},
    control::CredentialRequest,
    error::CredentialsError,
    http::{
        request::find_header_end, response_head, status_json, Asset, DeviceStatus, RequestHead,
        Route, CONTENT_HTML, CONTENT_JAVASCRIPT, CONTENT_JSON, HTTP_HEADER_MAX,
        STATUS_BAD_REQUEST, STATUS_FOUND, STATUS_INTERNAL, STATUS_METHOD_NOT_ALLOWED,
        STATUS_NOT_FOUND, STATUS_OK, STATUS_TIMEOUT, STATUS_TOO_LARGE,
    },
    telemetry,
};
use embedded_io_async::Write;

use super::{
    super::{
        config::{CONNECTIVITY, HTTP_HEADER_TIMEOUT_MS, POWER_REQUESTS, SAMPLING, VIEWER},
        types::{HttpContext, PowerRequest},
    },
    drain_remaining_body, read_body, websocket, write_response, write_text,
};

static INDEX_PAGE: Asset = Asset::new(CONTENT_HTML, include_bytes!("../../../assets/index.html"));
static INDEX_SCRIPT: Asset = Asset::new(
    CONTENT_JAVASCRIPT,
    include_bytes!("../../../assets/index.js"),
);

const POWER_OFF_PAGE: &str = "<!DOCTYPE html><html><body><h1>Powering off</h1>\
<p>Press the reset button to wake the device.</p></body></html>";

pub(super) async fn handle_connection(
    socket: &mut TcpSocket<'_>,
    context: HttpContext,
) -> Result<(), &'static str> {
    let mut header_buf = [0u8; HTTP_HEADER_MAX];
    let received = with_timeout(
        Duration::from_millis(HTTP_HEADER_TIMEOUT_MS),
        read_header(socket, &mut header_buf),
    )
    .await;
    let (header_end, filled) = match received {
        Ok(Ok(read)) => read,
        Ok(Err(HeaderError::TooLarge)) => {
            write_text(socket, STATUS_TOO_LARGE, "header too large").await;
            return Err("header too large");
        }
        Ok(Err(HeaderError::Io(err))) => return Err(err),
        Err(_) => {
            write_text(socket, STATUS_TIMEOUT, "header timeout").await;
            return Err("header timeout");
        }
    };

    let header = match core::str::from_utf8(&header_buf[..header_end]) {
        Ok(header) => header,
        Err(_) => {
            write_text(socket, STATUS_BAD_REQUEST, "header not utf8").await;
            return Err("header utf8");
        }
    };
    let request = match RequestHead::parse(header) {
        Ok(request) => request,
        Err(err) => {
            write_text(socket, STATUS_BAD_REQUEST, err).await;
            return Err(err);
        }
    };
    let body_start = header_end + 4;
    let already = &header_buf[body_start.min(filled)..filled];
    let content_length = request.content_length.unwrap_or(0);

    let route = Route::resolve(request.method, request.path(), CONNECTIVITY.current_mode());
    match route {
        Route::Index => serve_asset(socket, &INDEX_PAGE, content_length, already.len()).await,
        Route::Script => serve_asset(socket, &INDEX_SCRIPT, content_length, already.len()).await,
        Route::Signal => {
            let Some(key) = request.websocket_key().filter(|_| request.is_websocket_upgrade())
            else {
                write_text(socket, STATUS_BAD_REQUEST, "websocket upgrade required").await;
                return Err("not an upgrade");
            };
            websocket::serve(socket, key, already).await
        }
        Route::Params => {
            if content_length > CONTROL_BODY_MAX {
                write_text(socket, STATUS_INTERNAL, "body too large").await;
                return Err("params body too large");
            }
            let mut body_buf = [0u8; CONTROL_BODY_MAX];
            let body = read_body(socket, already, content_length, &mut body_buf).await?;
            let outcome = context.control.lock().await.handle_request(body);
            match outcome {
                Ok(outcome) => {
                    log::info!(
                        "http: params applied dirty={} tone={}",
                        outcome.acquisition_dirty,
                        outcome.tone_applied
                    );
                    write_text(socket, STATUS_OK, "OK").await;
                    Ok(())
                }
                Err(err) => {
                    write_text(socket, STATUS_BAD_REQUEST, err.as_str()).await;
                    Err(err.as_str())
                }
            }
        }
        Route::SaveWifi => {
            if content_length > CREDENTIALS_BODY_MAX {
                write_text(socket, STATUS_INTERNAL, "body too large").await;
                return Err("credentials body too large");
            }
            let mut body_buf = [0u8; CREDENTIALS_BODY_MAX];
            let body = read_body(socket, already, content_length, &mut body_buf).await?;
            let request = match CredentialRequest::from_json(body) {
                Ok(request) => request,
                Err(err) => {
                    write_text(socket, STATUS_BAD_REQUEST, err.as_str()).await;
                    return Err(err.as_str());
                }
            };
            let Some((ssid, password)) = request.parts() else {
                write_text(socket, STATUS_BAD_REQUEST, "invalid ssid or password").await;
                return Err("invalid credentials");
            };
            let saved = context.manager.lock().await.save_credentials(ssid, password);
            match saved {
                Ok(restart) => {
                    write_text(socket, STATUS_OK, "Saved. Rebooting...").await;
                    POWER_REQUESTS.signal(PowerRequest::Restart(restart));
                    Ok(())
                }
                Err(err) => {
                    let status = match err {
                        CredentialsError::InvalidLength => STATUS_BAD_REQUEST,
                        CredentialsError::Persistence(_) => STATUS_INTERNAL,
                    };
                    write_text(socket, status, err.as_str()).await;
                    Err(err.as_str())
                }
            }
        }
        Route::FactoryReset => {
            drain_remaining_body(socket, content_length, already.len()).await?;
            let restart = context.manager.lock().await.factory_reset();
            write_text(socket, STATUS_OK, "Factory reset. Rebooting...").await;
            POWER_REQUESTS.signal(PowerRequest::Restart(restart));
            Ok(())
        }
        Route::Status => {
            drain_remaining_body(socket, content_length, already.len()).await?;
            let (params, _) = SAMPLING.snapshot();
            let status = DeviceStatus {
                connectivity: CONNECTIVITY.read(),
                sample_rate_hz: params.sample_rate_hz,
                attenuation: params.attenuation.as_index(),
                bit_width: params.bit_width.bits(),
                test_tone_hz: SAMPLING.test_tone_hz(),
                viewer_attached: VIEWER.current().is_some(),
                telemetry: telemetry::snapshot(),
            };
            let body = status_json(&status);
            write_response(socket, STATUS_OK, CONTENT_JSON, body.as_bytes()).await;
            Ok(())
        }
        Route::PowerOff => {
            drain_remaining_body(socket, content_length, already.len()).await?;
            write_response(socket, STATUS_OK, CONTENT_HTML, POWER_OFF_PAGE.as_bytes()).await;
            POWER_REQUESTS.signal(PowerRequest::PowerOff);
            Ok(())
        }
        Route::CaptiveRedirect => {
            drain_remaining_body(socket, content_length, already.len()).await?;
            let head = response_head(STATUS_FOUND, None, 0, Some("/"));
            let _ = socket.write_all(head.as_bytes()).await;
            Ok(())
        }
        Route::MethodNotAllowed => {
            drain_remaining_body(socket, content_length, already.len()).await?;
            write_text(socket, STATUS_METHOD_NOT_ALLOWED, "method not allowed").await;
            Ok(())
        }
        Route::NotFound => {
            drain_remaining_body(socket, content_length, already.len()).await?;
            write_text(socket, STATUS_NOT_FOUND, "not found").await;
            Ok(())
        }
    }
}

enum HeaderError {
    TooLarge,
    Io(&'static str),
}

/// Returns the offset of the blank line ending the header and the number of
/// bytes read so far.
async fn read_header(
    socket: &mut TcpSocket<'_>,
    header_buf: &mut [u8],
) -> Result<(usize, usize), HeaderError> {
    let mut filled = 0usize;
    loop {
        if filled == header_buf.len() {
            return Err(HeaderError::TooLarge);
        }
        let n = socket
            .read(&mut header_buf[filled..])
            .await
            .map_err(|_| HeaderError::Io("read"))?;
        if n == 0 {
            return Err(HeaderError::Io("eof"));
        }
        filled += n;
        if let Some(end) = find_header_end(&header_buf[..filled]) {
            return Ok((end, filled));
        }
    }
}

async fn serve_asset(
    socket: &mut TcpSocket<'_>,
    asset: &Asset,
    content_length: usize,
    already_in_buffer: usize,
) -> Result<(), &'static str> {
    drain_remaining_body(socket, content_length, already_in_buffer).await?;
    write_response(socket, STATUS_OK, asset.content_type, asset.body()).await;
    Ok(())
}
