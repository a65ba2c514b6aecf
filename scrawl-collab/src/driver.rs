//! The per-connection protocol adapter.
//!
//! One driver task bridges one WebSocket to one session:
//!
//! ```text
//!             ┌───────────────── select loop ─────────────────┐
//! socket ──►  │ inbound frame ─► decode ─► session call       │
//!             │ session notify ─► delta_since ─► send frames  │
//!             └───────────────────────────────────────────────┘
//! ```
//!
//! Outbound deltas are flushed at the top of every iteration, before the
//! next inbound frame is taken, so a client always sees the echo of its
//! accepted operation before the session will accept its next one. Any
//! session-layer rejection or decode failure closes this connection only.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use log::{info, warn};
use thiserror::Error;
use uuid::Uuid;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::session::{Session, SessionError, Watermark};

#[derive(Debug, Error)]
enum DriverError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("undecodable frame: {0}")]
    Frame(#[from] serde_json::Error),
    #[error(transparent)]
    Socket(#[from] axum::Error),
    #[error("connection idle past the inactivity limit")]
    IdleTimeout,
}

/// Service one client connection until it closes, errors, or the session
/// is evicted. Detaches the participant on the way out.
pub async fn run(
    mut socket: WebSocket,
    session: Arc<Session>,
    resume: u64,
    idle_timeout: Option<Duration>,
) {
    let connection = Uuid::new_v4();
    let participant = session.attach();
    info!("connection {connection}: participant {participant} attached");
    match drive(&mut socket, &session, participant, resume, idle_timeout).await {
        Ok(()) => info!("connection {connection}: participant {participant} detached"),
        Err(e) => warn!("connection {connection}: closing participant {participant}: {e}"),
    }
    session.detach(participant);
}

async fn drive(
    socket: &mut WebSocket,
    session: &Session,
    participant: u64,
    resume: u64,
    idle_timeout: Option<Duration>,
) -> Result<(), DriverError> {
    send(socket, &ServerMessage::Identity(participant)).await?;

    // bootstrap: the backlog from the client's resume point, even if empty,
    // so a fresh client always sees where the log stands
    let resume = resume.min(session.revision());
    let backlog = session.operations_since(resume);
    let mut watermark = Watermark {
        revision: resume + backlog.len() as u64,
        seq: 0,
    };
    send(
        socket,
        &ServerMessage::History {
            start: resume,
            operations: backlog,
        },
    )
    .await?;
    loop {
        // register interest before reading the delta; a change landing
        // between the two would otherwise be missed
        let notified = session.notified();
        if session.killed() {
            return Ok(());
        }
        for message in session.delta_since(participant, &mut watermark) {
            send(socket, &message).await?;
        }
        session.record_ack(participant, watermark.revision);

        tokio::select! {
            _ = notified => {}
            inbound = socket.recv() => {
                let Some(frame) = inbound else { return Ok(()) };
                match frame? {
                    Message::Text(frame) => {
                        let message = ClientMessage::decode(frame.as_str())?;
                        dispatch(session, participant, &watermark, message)?;
                    }
                    Message::Close(_) => return Ok(()),
                    Message::Binary(_) | Message::Ping(_) | Message::Pong(_) => {}
                }
            }
            () = inactivity(idle_timeout) => return Err(DriverError::IdleTimeout),
        }
    }
}

fn dispatch(
    session: &Session,
    participant: u64,
    watermark: &Watermark,
    message: ClientMessage,
) -> Result<(), SessionError> {
    match message {
        ClientMessage::Edit {
            revision,
            operation,
        } => {
            session.submit(participant, revision, operation)?;
        }
        ClientMessage::SetLanguage(language) => session.set_language(language),
        ClientMessage::ClientInfo(info) => session.set_info(participant, info)?,
        ClientMessage::CursorData(data) => {
            // the cursor is expressed at the revision this client last saw
            session.update_cursor(participant, data, watermark.revision)?;
        }
    }
    Ok(())
}

async fn send(socket: &mut WebSocket, message: &ServerMessage) -> Result<(), DriverError> {
    socket.send(Message::Text(message.encode().into())).await?;
    Ok(())
}

async fn inactivity(limit: Option<Duration>) {
    match limit {
        Some(limit) => tokio::time::sleep(limit).await,
        None => std::future::pending().await,
    }
}
