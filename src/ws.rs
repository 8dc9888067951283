use axum::{
    extract::{State, WebSocketUpgrade},
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tower_sessions::Session;

use crate::{events::ServerEvent, session, AppResult};

/// Live change-notification channel. Each subscriber gets the broadcast
/// stream filtered down to its own scope; closing the socket tears the
/// subscription down.
pub async fn events_ws(
    State(events): State<broadcast::Sender<ServerEvent>>,
    session: Session,
    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let user = session::require_user(&session).await?;
    let mut rx = events.subscribe();

    Ok(ws
        .on_upgrade(move |stream| async move {
            let (mut sender, mut receiver) = stream.split();
            loop {
                tokio::select! {
                    event = rx.recv() => {
                        let event = match event {
                            Ok(event) => event,
                            // A lagged dashboard just picks up at the next event.
                            Err(broadcast::error::RecvError::Lagged(_)) => continue,
                            Err(broadcast::error::RecvError::Closed) => break,
                        };
                        if !event.visible_to(&user.role, &user.id) {
                            continue;
                        }
                        let Ok(payload) = serde_json::to_string(&event) else {
                            continue;
                        };
                        if sender.send(payload.into()).await.is_err() {
                            break;
                        }
                    }
                    msg = receiver.next() => {
                        match msg {
                            // Inbound frames are only pings; events flow one way.
                            Some(Ok(_)) => continue,
                            _ => break,
                        }
                    }
                }
            }
        })
        .into_response())
}
