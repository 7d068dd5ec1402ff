//! Gateway socket listener.
//!
//! The chat bridge connects over a Unix socket and speaks JSON Lines:
//! one `GatewayEvent` per inbound line, one `GatewayReply` per outbound
//! line. Events are enqueued to the controller in connection order (which
//! preserves each user's arrival order); replies are awaited on separate
//! tasks so a slow comparison for one user never stalls the read loop.

use crate::controller::SessionController;
use crate::reply::Reply;
use crate::session::SessionEvent;
use likeness_core::wire::{EventPayload, GatewayEvent, GatewayReply};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixListener;
use tokio::sync::{mpsc, Mutex};

/// Writer for the currently connected bridge, if any.
type SharedWriter = Arc<Mutex<Option<OwnedWriteHalf>>>;

/// Accept bridge connections and pump events until the listener fails.
pub async fn serve(
    listener: UnixListener,
    controller: SessionController,
    mut notices: mpsc::Receiver<GatewayReply>,
) -> anyhow::Result<()> {
    let writer: SharedWriter = Arc::new(Mutex::new(None));

    // Expiry notices go to whichever bridge is connected, best-effort.
    let notice_writer = writer.clone();
    tokio::spawn(async move {
        while let Some(notice) = notices.recv().await {
            send_line(&notice_writer, &notice).await;
        }
    });

    loop {
        let (stream, _addr) = listener.accept().await?;
        tracing::info!("gateway bridge connected");

        let (read_half, write_half) = stream.into_split();
        *writer.lock().await = Some(write_half);

        let controller = controller.clone();
        let writer = writer.clone();
        tokio::spawn(async move {
            if let Err(e) = pump_events(read_half, writer, controller).await {
                tracing::warn!(error = %e, "gateway connection closed with error");
            } else {
                tracing::info!("gateway bridge disconnected");
            }
        });
    }
}

async fn pump_events(
    read_half: OwnedReadHalf,
    writer: SharedWriter,
    controller: SessionController,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(read_half).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let event: GatewayEvent = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "malformed gateway line, skipped");
                continue;
            }
        };

        let user_id = event.user_id;
        let session_event = match event.payload {
            EventPayload::Command { name } => SessionEvent::Command(name),
            EventPayload::Photo { data } => SessionEvent::Photo(data),
            EventPayload::Text => SessionEvent::Text,
        };

        match controller.submit(&user_id, session_event).await {
            Ok(ack_rx) => {
                // Await the reply off the read loop so other users keep moving.
                let writer = writer.clone();
                tokio::spawn(async move {
                    if let Ok(Some(reply)) = ack_rx.await {
                        let outbound = GatewayReply {
                            user_id,
                            text: reply.text(),
                        };
                        send_line(&writer, &outbound).await;
                    }
                });
            }
            Err(()) => {
                let outbound = GatewayReply {
                    user_id,
                    text: Reply::Busy.text(),
                };
                send_line(&writer, &outbound).await;
            }
        }
    }

    Ok(())
}

async fn send_line(writer: &SharedWriter, reply: &GatewayReply) {
    let mut line = match serde_json::to_string(reply) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(error = %e, "reply serialization failed");
            return;
        }
    };
    line.push('\n');

    let mut guard = writer.lock().await;
    match guard.as_mut() {
        Some(w) => {
            if let Err(e) = w.write_all(line.as_bytes()).await {
                tracing::warn!(error = %e, "gateway write failed, dropping connection writer");
                *guard = None;
            }
        }
        None => {
            tracing::debug!(user = %reply.user_id, "no gateway connected, message dropped");
        }
    }
}
