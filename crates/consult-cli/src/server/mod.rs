//! HTTP surface over `tiny_http`.
//!
//! `tiny_http::Server::recv` blocks, so the accept loop runs in
//! `spawn_blocking` and hands each request (body already read) to the async
//! side through a bounded channel. Each request is then handled on its own
//! task and answered from a blocking task.

mod handler;
mod routes;

use std::sync::Arc;

use anyhow::Context;
use consult_config::ServerConfig;
use tokio::sync::mpsc;

use crate::context::AppContext;
use handler::{
    ApiRequest, ApiResponse, DOCTOR_ID_HEADER, MAX_BODY_BYTES, PRIVILEGED_HEADER, handle, read_body,
};
use routes::Method;

/// Serve until Ctrl-C.
pub async fn serve(ctx: Arc<AppContext>, config: &ServerConfig) -> anyhow::Result<()> {
    let addr = config.socket_addr()?;
    let server = Arc::new(
        tiny_http::Server::http(addr)
            .map_err(|e| anyhow::anyhow!("failed to bind {addr}: {e}"))?,
    );
    tracing::info!(%addr, "consult API listening");
    eprintln!("consult API listening on http://{addr}");

    let (tx, mut rx) = mpsc::channel(config.queue_depth.max(1));
    let accept_server = Arc::clone(&server);
    let accept = tokio::task::spawn_blocking(move || accept_loop(&accept_server, &tx));

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            received = rx.recv() => {
                let Some((api_request, raw_request)) = received else { break };
                let ctx = Arc::clone(&ctx);
                tokio::spawn(async move {
                    let response = handle(&ctx.service, &api_request).await;
                    tracing::debug!(
                        url = %api_request.url,
                        status = response.status,
                        "request handled"
                    );
                    if let Err(error) =
                        tokio::task::spawn_blocking(move || respond(raw_request, &response)).await
                    {
                        tracing::warn!(%error, "response task failed");
                    }
                });
            }
            _ = &mut shutdown => {
                tracing::info!("shutting down");
                break;
            }
        }
    }

    drop(rx);
    server.unblock();
    accept.await.context("accept loop panicked")?;
    Ok(())
}

fn accept_loop(server: &tiny_http::Server, tx: &mpsc::Sender<(ApiRequest, tiny_http::Request)>) {
    loop {
        let mut request = match server.recv() {
            Ok(request) => request,
            Err(_) if tx.is_closed() => break,
            Err(error) => {
                tracing::warn!(%error, "accept failed");
                continue;
            }
        };
        let api_request = match read_request(&mut request) {
            Ok(api_request) => api_request,
            Err(response) => {
                respond(request, &response);
                continue;
            }
        };
        if tx.blocking_send((api_request, request)).is_err() {
            break;
        }
    }
}

fn read_request(request: &mut tiny_http::Request) -> Result<ApiRequest, ApiResponse> {
    let header = |name: &'static str| {
        request
            .headers()
            .iter()
            .find(|h| h.field.equiv(name))
            .map(|h| h.value.as_str().to_string())
    };
    let doctor_id = header(DOCTOR_ID_HEADER);
    let privileged =
        header(PRIVILEGED_HEADER).is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));

    let body = read_body(request.as_reader(), MAX_BODY_BYTES)?;

    Ok(ApiRequest {
        method: Method::from(request.method()),
        url: request.url().to_string(),
        doctor_id,
        privileged,
        body,
    })
}

fn respond(request: tiny_http::Request, response: &ApiResponse) {
    let body = response.body.to_string();
    let mut http_response =
        tiny_http::Response::from_string(body).with_status_code(response.status);
    if let Ok(content_type) =
        tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
    {
        http_response = http_response.with_header(content_type);
    }
    if let Err(error) = request.respond(http_response) {
        tracing::warn!(%error, "failed to write response");
    }
}
