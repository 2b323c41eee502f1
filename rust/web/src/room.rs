//! A single game session: the connected players and their round engine.

use crate::connection::{Connection, ConnectionId, ConnectionOptions, Envelope, Frame, Outbound, PayloadHandler};
use crate::dispatcher::Dispatcher;
use crate::events::{ActionTrigger, LobbyAction, OutboundEvent};
use crate::handlers::game;
use futures::{FutureExt, Sink, Stream};
use introspect_engine::{GameError, RoundEngine};
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::Duration;
use thiserror::Error;

/// Fan-out of outbound events to the players of one room.
pub trait Broadcaster: Send + Sync {
    /// Sends `event` to every connected player.
    fn broadcast(&self, event: OutboundEvent) -> impl Future<Output = ()> + Send;

    /// Sends `event` to one player. Unknown names are logged and ignored.
    fn send_msg(&self, player: &str, event: OutboundEvent) -> impl Future<Output = ()> + Send;
}

/// What event handlers get to see of a room.
pub trait GameRoom: Broadcaster {
    fn name(&self) -> &str;
    fn engine(&self) -> &dyn RoundEngine;
    /// Pause between a question's results and the round totals
    fn results_delay(&self) -> Duration;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoomError {
    #[error("player name '{0}' is already taken")]
    NameTaken(String),
    #[error("game error: {0}")]
    Game(GameError),
    #[error("room client map poisoned")]
    StoragePoisoned,
}

impl From<GameError> for RoomError {
    fn from(err: GameError) -> Self {
        match err {
            GameError::NameTaken(name) => RoomError::NameTaken(name),
            other => RoomError::Game(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoomOptions {
    pub connection: ConnectionOptions,
    pub results_delay: Duration,
}

type EmptyHook = Box<dyn Fn(&Room) + Send + Sync>;

pub struct Room {
    name: String,
    clients: RwLock<HashMap<String, Connection>>,
    engine: Arc<dyn RoundEngine>,
    dispatcher: Dispatcher<Room>,
    options: RoomOptions,
    on_empty: EmptyHook,
    this: Weak<Room>,
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("name", &self.name)
            .field("clients", &self.client_names())
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

impl Room {
    /// `on_empty` runs after the last client has been removed, outside the
    /// room's lock.
    pub fn new(
        name: impl Into<String>,
        engine: Arc<dyn RoundEngine>,
        dispatcher: Dispatcher<Room>,
        options: RoomOptions,
        on_empty: impl Fn(&Room) + Send + Sync + 'static,
    ) -> Arc<Self> {
        let name = name.into();
        tracing::info!(room = %name, "creating room");
        Arc::new_cyclic(|this| Self {
            name,
            clients: RwLock::new(HashMap::new()),
            engine,
            dispatcher,
            options,
            on_empty: Box::new(on_empty),
            this: this.clone(),
        })
    }

    fn read_clients(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Connection>>, RoomError> {
        self.clients.read().map_err(|_| RoomError::StoragePoisoned)
    }

    fn write_clients(
        &self,
    ) -> Result<RwLockWriteGuard<'_, HashMap<String, Connection>>, RoomError> {
        self.clients.write().map_err(|_| RoomError::StoragePoisoned)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dispatcher(&self) -> &Dispatcher<Room> {
        &self.dispatcher
    }

    /// True while the game is still in the lobby and nobody is ready.
    pub fn is_joinable(&self) -> Result<bool, RoomError> {
        Ok(self.engine.is_joinable()?)
    }

    pub fn client_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .read_clients()
            .map(|clients| clients.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn client_count(&self) -> usize {
        self.read_clients().map(|clients| clients.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.client_count() == 0
    }

    pub fn has_client(&self, player: &str) -> bool {
        self.read_clients()
            .map(|clients| clients.contains_key(player))
            .unwrap_or(false)
    }

    /// Registers a player and starts their connection pump.
    ///
    /// Synchronous so the registry can run it under its own lock. Callers
    /// follow up with [`Room::announce`] once the lock is released.
    pub fn register_client<R, W, E>(&self, player: &str, reader: R, writer: W) -> Result<(), RoomError>
    where
        R: Stream<Item = Result<Frame, E>> + Send + Unpin + 'static,
        E: Display + Send + 'static,
        W: Sink<String> + Send + Unpin + 'static,
        W::Error: Display + Send,
    {
        let mut clients = self.write_clients()?;
        if clients.contains_key(player) {
            tracing::warn!(room = %self.name, player, "name already taken, dropping connection");
            return Err(RoomError::NameTaken(player.to_string()));
        }
        self.engine.add_player(player)?;

        let this = self.this.clone();
        let leaving = player.to_string();
        let on_close = move |id: ConnectionId| {
            async move {
                if let Some(room) = this.upgrade() {
                    room.remove_client(&leaving, id).await;
                }
            }
            .boxed()
        };
        let connection = Connection::spawn(
            player,
            reader,
            writer,
            self.payload_handler(player),
            on_close,
            self.options.connection,
        );
        clients.insert(player.to_string(), connection);
        tracing::info!(room = %self.name, player, clients = clients.len(), "player joined");
        Ok(())
    }

    /// Registers a player and tells the room about it.
    pub async fn add_client<R, W, E>(&self, player: &str, reader: R, writer: W) -> Result<(), RoomError>
    where
        R: Stream<Item = Result<Frame, E>> + Send + Unpin + 'static,
        E: Display + Send + 'static,
        W: Sink<String> + Send + Unpin + 'static,
        W::Error: Display + Send,
    {
        self.register_client(player, reader, writer)?;
        self.announce(player, LobbyAction::Joined).await;
        Ok(())
    }

    /// Broadcasts the roster with `player`'s join or leave attached.
    pub async fn announce(&self, player: &str, action: LobbyAction) {
        let status = match self.engine.room_status() {
            Ok(status) => status,
            Err(err) => {
                tracing::error!(room = %self.name, error = %err, "unable to read roster");
                return;
            }
        };
        self.broadcast(OutboundEvent::LobbyRoomUpdate {
            players: status.players,
            is_all_ready: status.is_all_ready,
            action_trigger: Some(ActionTrigger {
                player: player.to_string(),
                action,
            }),
        })
        .await;
    }

    /// Removal path shared by both pump loops and slow-consumer eviction.
    ///
    /// Only removes the entry if it still belongs to connection `id`, so a
    /// late callback cannot evict a player who rejoined under the same name.
    /// The players left behind are re-checked against the current question
    /// so a departure cannot stall it.
    pub async fn remove_client(&self, player: &str, id: ConnectionId) {
        let (now_empty, was_self_voting) = {
            let mut clients = match self.write_clients() {
                Ok(clients) => clients,
                Err(err) => {
                    tracing::error!(room = %self.name, player, error = %err, "unable to remove client");
                    return;
                }
            };
            if clients.get(player).map(Connection::id) != Some(id) {
                return;
            }
            let was_self_voting = self.engine.is_voting_complete().unwrap_or(false);
            clients.remove(player);
            if let Err(err) = self.engine.remove_player(player) {
                tracing::warn!(room = %self.name, player, error = %err, "unable to remove player from game");
            }
            (clients.is_empty(), was_self_voting)
        };
        tracing::info!(room = %self.name, player, "player left");

        if now_empty {
            tracing::info!(room = %self.name, "no players left");
            (self.on_empty)(self);
            return;
        }
        self.announce(player, LobbyAction::Left).await;
        game::player_left(self, player, was_self_voting).await;
    }

    fn payload_handler(&self, player: &str) -> PayloadHandler {
        let this = self.this.clone();
        let sender: Arc<str> = Arc::from(player);
        Arc::new(move |envelope: Envelope| {
            let this = this.clone();
            let sender = Arc::clone(&sender);
            async move {
                if let Some(room) = this.upgrade() {
                    room.handle(&sender, envelope).await;
                }
            }
            .boxed()
        })
    }

    async fn handle(self: Arc<Self>, sender: &str, envelope: Envelope) {
        match self.dispatcher.dispatch(Arc::clone(&self), envelope).await {
            Ok(event) => {
                tracing::debug!(room = %self.name, player = sender, event = %event, "handled event")
            }
            Err(err) => {
                tracing::warn!(room = %self.name, player = sender, error = %err, "dropped message")
            }
        }
    }

    fn outbound_for(&self, player: &str) -> Option<Outbound> {
        self.read_clients()
            .ok()
            .and_then(|clients| clients.get(player).map(Connection::outbound))
    }

    fn snapshot(&self) -> Vec<Outbound> {
        match self.read_clients() {
            Ok(clients) => clients.values().map(Connection::outbound).collect(),
            Err(err) => {
                tracing::error!(room = %self.name, error = %err, "unable to read clients");
                Vec::new()
            }
        }
    }

    fn encode(&self, event: &OutboundEvent) -> Option<String> {
        match event.to_text() {
            Ok(text) => Some(text),
            Err(err) => {
                tracing::error!(room = %self.name, event = event.name(), error = %err, "unable to encode event");
                None
            }
        }
    }
}

impl Broadcaster for Room {
    async fn broadcast(&self, event: OutboundEvent) {
        let Some(text) = self.encode(&event) else {
            return;
        };
        let recipients = self.snapshot();
        tracing::debug!(
            room = %self.name,
            event = event.name(),
            recipients = recipients.len(),
            "broadcasting event"
        );
        for outbound in recipients {
            if let Err(err) = outbound.send(text.clone()).await {
                tracing::warn!(room = %self.name, player = outbound.player(), error = %err, "broadcast send failed");
            }
        }
    }

    async fn send_msg(&self, player: &str, event: OutboundEvent) {
        let Some(outbound) = self.outbound_for(player) else {
            tracing::warn!(room = %self.name, player, event = event.name(), "unable to find player");
            return;
        };
        let Some(text) = self.encode(&event) else {
            return;
        };
        if let Err(err) = outbound.send(text).await {
            tracing::warn!(room = %self.name, player, error = %err, "send failed");
        }
    }
}

impl GameRoom for Room {
    fn name(&self) -> &str {
        &self.name
    }

    fn engine(&self) -> &dyn RoundEngine {
        self.engine.as_ref()
    }

    fn results_delay(&self) -> Duration {
        self.options.results_delay
    }
}
