use crate::connection::Frame;
use crate::errors::IntoErrorResponse;
use crate::handlers::join::GameInfoQuery;
use crate::registry::Registry;
use futures::{future, SinkExt, StreamExt};
use warp::reply::Response;
use warp::ws::{Message, WebSocket, Ws};
use warp::Reply;

/// Upgrades `/ws?player=..&room=..` and hands the socket to the registry.
pub fn upgrade(ws: Ws, query: GameInfoQuery, registry: Registry) -> Response {
    let (player, room) = match query.require() {
        Ok(info) => info,
        Err(err) => return err.into_http_response(),
    };
    ws.on_upgrade(move |socket| join_room(socket, player, room, registry))
        .into_response()
}

/// Splits the socket into the frame stream and text sink a connection pump
/// expects, then joins the room. A rejected join drops the socket.
pub async fn join_room(socket: WebSocket, player: String, room: String, registry: Registry) {
    let (tx, rx) = socket.split();
    let reader = rx.map(|frame| frame.map(Frame::from));
    let writer = tx.with(|text: String| future::ready(Ok::<_, warp::Error>(Message::text(text))));

    match registry.connect(&player, &room, reader, writer).await {
        Ok(joined) => {
            tracing::debug!(room = %room, player = %player, clients = joined.client_count(), "socket attached");
        }
        Err(err) => {
            tracing::warn!(room = %room, player = %player, error = %err, "join rejected");
        }
    }
}
