//! # introspect_web: real-time session server for the Introspect party game
//!
//! Players connect over a WebSocket, land in a named room, and exchange JSON
//! events that drive the room's [`introspect_engine::Game`].
//!
//! - [`connection`] - per-player pump between a socket and a bounded queue
//! - [`dispatcher`] - routes decoded messages to handlers by event name
//! - [`room`] - one game session and its broadcast fan-out
//! - [`registry`] - the process-wide set of live rooms
//! - [`handlers`] - the standard event handlers and HTTP endpoints
//! - [`server`] - warp routes and server lifecycle

pub mod connection;
pub mod dispatcher;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod logging;
pub mod registry;
pub mod room;
pub mod server;
pub mod settings;

pub use connection::{
    Connection, ConnectionError, ConnectionId, ConnectionOptions, Envelope, Frame, Outbound,
};
pub use dispatcher::{DispatchError, Dispatcher, Handler};
pub use errors::{ErrorResponse, ErrorSeverity, IntoErrorResponse, RequestError};
pub use events::{LobbyAction, OutboundEvent};
pub use logging::{init_logging, init_test_logging, LogEntry, LogFormat, TestLogSubscriber};
pub use registry::{JoinInfo, Registry, RegistrySettings};
pub use room::{Broadcaster, GameRoom, Room, RoomError, RoomOptions};
pub use server::{AppContext, ServerError, ServerHandle, WebServer};
pub use settings::{ServerSettings, SettingsError, SettingsOverrides, SettingsResolved};

#[cfg(test)]
mod tests {
    use super::*;
    use introspect_engine::QuestionStore;
    use std::sync::Arc;

    #[test]
    fn context_starts_without_rooms() {
        let ctx = AppContext::with_questions(
            ServerSettings::default(),
            Arc::new(QuestionStore::unshuffled(Vec::new())),
        );

        assert_eq!(ctx.registry().room_count(), 0);
        assert_eq!(ctx.settings().port, 8080);
    }
}
