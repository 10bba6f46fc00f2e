use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use uuid::Uuid;

use crate::state::SharedState;

#[derive(Deserialize)]
pub struct StreamParams {
    pub tenant_id: Uuid,
}

/// Live event stream for one tenant. The tenant comes from the query string;
/// no credential is checked here.
pub async fn subscribe(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
    Query(params): Query<StreamParams>,
) -> Response {
    ws.on_upgrade(move |socket| run(socket, state, params.tenant_id))
}

/// Runs until the client goes away. The subscription is dropped on return,
/// which is the one place the connection leaves the hub.
async fn run(socket: WebSocket, state: SharedState, tenant_id: Uuid) {
    let mut subscription = state.hub.subscribe(tenant_id);
    let id = subscription.id();
    tracing::info!("Stream {id} opened for tenant {tenant_id}");

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            outbound = subscription.recv() => {
                let Some(text) = outbound else { break };
                if sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            inbound = receiver.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    if text.as_str().trim().eq_ignore_ascii_case("ping")
                        && sender.send(Message::Text("pong".into())).await.is_err()
                    {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    drop(subscription);
    tracing::info!("Stream {id} closed for tenant {tenant_id}");
}
