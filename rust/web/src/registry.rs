//! Process-wide map of room name to live [`Room`].

use crate::connection::Frame;
use crate::events::LobbyAction;
use crate::handlers::game::standard_dispatcher;
use crate::room::{Room, RoomError, RoomOptions};
use futures::{Sink, Stream};
use introspect_engine::{Game, GameConfig, QuestionSource};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

/// Answer to the pre-connect validation query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinInfo {
    pub player_name_available: bool,
    pub room_is_joinable: bool,
}

#[derive(Debug, Clone)]
pub struct RegistrySettings {
    pub game: GameConfig,
    pub room: RoomOptions,
}

/// Creates rooms on first join and forgets them once they empty out.
///
/// Cloning is cheap; every clone refers to the same set of rooms.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    rooms: RwLock<HashMap<String, Arc<Room>>>,
    questions: Arc<dyn QuestionSource>,
    settings: RegistrySettings,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("rooms", &self.active_rooms())
            .field("settings", &self.inner.settings)
            .finish()
    }
}

impl Registry {
    pub fn new(questions: Arc<dyn QuestionSource>, settings: RegistrySettings) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                rooms: RwLock::new(HashMap::new()),
                questions,
                settings,
            }),
        }
    }

    fn read_rooms(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Arc<Room>>>, RoomError> {
        self.inner.rooms.read().map_err(|_| RoomError::StoragePoisoned)
    }

    fn write_rooms(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Arc<Room>>>, RoomError> {
        self.inner.rooms.write().map_err(|_| RoomError::StoragePoisoned)
    }

    /// Joins `player` to `room`, creating the room if needed.
    ///
    /// Room creation and client registration happen under the registry
    /// lock, so a room tearing itself down cannot swallow the join.
    pub async fn connect<R, W, E>(
        &self,
        player: &str,
        room: &str,
        reader: R,
        writer: W,
    ) -> Result<Arc<Room>, RoomError>
    where
        R: Stream<Item = Result<Frame, E>> + Send + Unpin + 'static,
        E: Display + Send + 'static,
        W: Sink<String> + Send + Unpin + 'static,
        W::Error: Display + Send,
    {
        let joined = {
            let mut rooms = self.write_rooms()?;
            let joined = match rooms.get(room) {
                Some(existing) => Arc::clone(existing),
                None => {
                    let created = self.create_room(room);
                    rooms.insert(room.to_string(), Arc::clone(&created));
                    created
                }
            };
            let registered = joined.register_client(player, reader, writer);
            if registered.is_err() && joined.is_empty() {
                // a room created for a rejected join must not linger
                rooms.remove(room);
            }
            registered?;
            joined
        };

        joined.announce(player, LobbyAction::Joined).await;
        Ok(joined)
    }

    /// Reports whether `player` could join `room` right now. Unknown rooms
    /// accept anyone.
    pub fn is_joinable(&self, room: &str, player: &str) -> Result<JoinInfo, RoomError> {
        let Some(existing) = self.room(room) else {
            return Ok(JoinInfo {
                player_name_available: true,
                room_is_joinable: true,
            });
        };
        Ok(JoinInfo {
            player_name_available: !existing.has_client(player),
            room_is_joinable: existing.is_joinable()?,
        })
    }

    pub fn room(&self, name: &str) -> Option<Arc<Room>> {
        self.read_rooms().ok()?.get(name).cloned()
    }

    pub fn active_rooms(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .read_rooms()
            .map(|rooms| rooms.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn room_count(&self) -> usize {
        self.read_rooms().map(|rooms| rooms.len()).unwrap_or(0)
    }

    fn create_room(&self, name: &str) -> Arc<Room> {
        let engine = Arc::new(Game::new(
            self.inner.settings.game.clone(),
            Arc::clone(&self.inner.questions),
        ));
        let registry = Arc::downgrade(&self.inner);
        Room::new(
            name,
            engine,
            standard_dispatcher(),
            self.inner.settings.room,
            move |room: &Room| teardown(&registry, room),
        )
    }
}

/// Drops `room` from the registry if it is still the registered instance
/// and still has no clients.
fn teardown(registry: &Weak<RegistryInner>, room: &Room) {
    let Some(inner) = registry.upgrade() else {
        return;
    };
    let mut rooms = match inner.rooms.write() {
        Ok(rooms) => rooms,
        Err(_) => {
            tracing::error!(room = room.name(), "room registry poisoned");
            return;
        }
    };
    let same_instance = rooms
        .get(room.name())
        .is_some_and(|current| std::ptr::eq(Arc::as_ptr(current), room));
    if same_instance && room.is_empty() {
        rooms.remove(room.name());
        tracing::info!(room = room.name(), active_rooms = rooms.len(), "room deleted");
    }
}
