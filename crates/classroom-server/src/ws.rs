//! WebSocket push of session events.
//!
//! One socket per viewer. A student socket opened with a `participant_id`
//! carries session-wide events plus that participant's own pair events.
//! Events are sent as the JSON of [`SessionEvent`]; a viewer that falls
//! behind gets a `resync` notice and must re-fetch the session. Closing a
//! participant's socket marks them disconnected.
//!
//! [`SessionEvent`]: classroom_coordination::SessionEvent

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use classroom_coordination::events::FilteredReceiver;
use classroom_coordination::{SharedClassroom, Viewer};

use crate::error::ApiResult;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(default = "default_viewer")]
    pub role: Viewer,
    pub participant_id: Option<String>,
}

fn default_viewer() -> Viewer {
    Viewer::Student
}

pub async fn session_events(
    ws: WebSocketUpgrade,
    State(classroom): State<SharedClassroom>,
    Path(session_id): Path<String>,
    Query(query): Query<EventsQuery>,
) -> ApiResult<Response> {
    // Unknown sessions and participants are refused before upgrading.
    classroom.session_view(&session_id, query.role)?;
    if let Some(participant_id) = &query.participant_id {
        classroom.reconnect(&session_id, participant_id)?;
    }

    // A student socket only carries its own pair's negotiation events.
    let events = match (query.role, &query.participant_id) {
        (Viewer::Student, Some(participant_id)) => {
            classroom.subscribe_participant(&session_id, participant_id)?
        }
        _ => classroom.subscribe(&session_id, query.role),
    };

    Ok(ws.on_upgrade(move |socket| {
        stream_events(socket, classroom, events, session_id, query.participant_id)
    }))
}

async fn stream_events(
    socket: WebSocket,
    classroom: SharedClassroom,
    mut events: FilteredReceiver,
    session_id: String,
    participant_id: Option<String>,
) {
    let (mut sink, mut stream) = socket.split();
    debug!(session_id = %session_id, participant_id = ?participant_id, "Event stream opened");

    loop {
        tokio::select! {
            received = events.recv() => {
                let text = match received {
                    Ok(event) => match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(error = %e, "Failed to encode event");
                            continue;
                        }
                    },
                    Err(RecvError::Lagged(missed)) => {
                        warn!(session_id = %session_id, missed, "Viewer lagged; asking for resync");
                        json!({
                            "session_id": session_id,
                            "event": { "type": "resync", "missed": missed },
                        })
                        .to_string()
                    }
                    Err(RecvError::Closed) => break,
                };
                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    debug!(session_id = %session_id, participant_id = ?participant_id, "Event stream closed");
    if let Some(participant_id) = participant_id {
        if let Err(e) = classroom.disconnect(&session_id, &participant_id) {
            warn!(session_id = %session_id, participant_id = %participant_id, error = %e, "Disconnect failed");
        }
    }
}
