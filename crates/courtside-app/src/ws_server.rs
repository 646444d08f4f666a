// WebSocket polling endpoint for court-side displays.

use std::fmt::Display;
use std::sync::Arc;

use chrono::Utc;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, error, info, warn};

use courtside_core::source::ScheduleSource;

use crate::service::{LiveService, PollRequest, PollResponse, CALCULATION_FAILED};

/// Run the WebSocket server on `127.0.0.1:{port}`.
///
/// Every accepted connection is served on its own task, so a slow display
/// never holds up another. Runs until the task is cancelled or the listener
/// fails.
pub async fn run<S>(port: u16, service: Arc<LiveService<S>>) -> anyhow::Result<()>
where
    S: ScheduleSource + 'static,
{
    let listener = TcpListener::bind(format!("127.0.0.1:{port}")).await?;
    let local_addr = listener.local_addr()?;
    info!("WebSocket server listening on {local_addr}");

    loop {
        let (stream, addr) = listener.accept().await?;
        let addr = addr.to_string();
        let service = Arc::clone(&service);
        info!("Accepted TCP connection from {addr}");

        tokio::spawn(async move {
            let ws_stream = match tokio_tungstenite::accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    warn!("WebSocket handshake failed for {addr}: {e}");
                    return;
                }
            };

            let (write, read) = ws_stream.split();
            if let Err(e) = process_request_stream(read, write, service, &addr).await {
                warn!("Failed to reply to {addr}: {e}");
            }
            info!("Client {addr} disconnected");
        });
    }
}

/// Answer every text frame on `stream` with one text frame on `sink`.
///
/// Text frames carry a JSON [`PollRequest`]; the reply is the JSON
/// [`PollResponse`]. Close frames and transport errors end the loop;
/// binary, ping and pong frames are ignored. Returns `Err` only when a reply
/// cannot be written.
///
/// Generic over the stream and sink so it can be tested without sockets.
pub async fn process_request_stream<St, Si, S>(
    mut stream: St,
    mut sink: Si,
    service: Arc<LiveService<S>>,
    addr: &str,
) -> Result<(), Si::Error>
where
    St: Stream<Item = Result<Message, WsError>> + Unpin,
    Si: Sink<Message> + Unpin,
    Si::Error: Display,
    S: ScheduleSource + 'static,
{
    while let Some(msg_result) = stream.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                let reply = handle_request(&service, text.as_str()).await;
                sink.send(Message::Text(reply.into())).await?;
            }
            Ok(Message::Close(_)) => {
                info!("Client {addr} sent close frame");
                break;
            }
            Err(e) => {
                warn!("WebSocket error from {addr}: {e}");
                break;
            }
            _ => {
                // Ignore Binary, Ping, Pong, Frame variants.
            }
        }
    }
    Ok(())
}

/// Turn one raw request into the JSON reply text.
async fn handle_request<S>(service: &Arc<LiveService<S>>, raw: &str) -> String
where
    S: ScheduleSource + 'static,
{
    let response = match serde_json::from_str::<PollRequest>(raw) {
        Ok(request) => {
            debug!("Poll for session {}", request.session_id);
            let service = Arc::clone(service);
            // Snapshot reads hit SQLite; keep them off the async workers.
            match tokio::task::spawn_blocking(move || service.poll(&request, Utc::now())).await {
                Ok(response) => response,
                Err(e) => {
                    error!("Poll task failed: {e}");
                    PollResponse::error(CALCULATION_FAILED)
                }
            }
        }
        Err(e) => PollResponse::error(format!("Invalid request: {e}")),
    };

    serde_json::to_string(&response).unwrap_or_else(|e| {
        error!("Failed to serialize poll response: {e}");
        format!(r#"{{"error":"{CALCULATION_FAILED}"}}"#)
    })
}
