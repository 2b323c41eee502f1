use crate::errors::{IntoErrorResponse, RequestError};
use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use warp::reply::Response;
use warp::Reply;

/// `?player=..&room=..` as sent by the lobby page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameInfoQuery {
    pub player: Option<String>,
    pub room: Option<String>,
}

impl GameInfoQuery {
    /// Returns `(player, room)`, rejecting missing or blank values.
    pub fn require(self) -> Result<(String, String), RequestError> {
        let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        match (present(self.player), present(self.room)) {
            (Some(player), Some(room)) => Ok((player, room)),
            _ => Err(RequestError::MissingGameInfo),
        }
    }
}

/// Answers whether `player` may join `room` before the socket is opened.
pub fn validate_game_info(query: GameInfoQuery, registry: &Registry) -> Response {
    let response = match query.require() {
        Ok((player, room)) => match registry.is_joinable(&room, &player) {
            Ok(info) => {
                tracing::debug!(
                    room = %room,
                    player = %player,
                    name_available = info.player_name_available,
                    joinable = info.room_is_joinable,
                    "validated game info"
                );
                warp::reply::json(&info).into_response()
            }
            Err(err) => err.into_http_response(),
        },
        Err(err) => err.into_http_response(),
    };
    warp::reply::with_header(response, "Access-Control-Allow-Origin", "*").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(player: Option<&str>, room: Option<&str>) -> GameInfoQuery {
        GameInfoQuery {
            player: player.map(str::to_string),
            room: room.map(str::to_string),
        }
    }

    #[test]
    fn require_returns_player_and_room() {
        assert_eq!(
            query(Some("ada"), Some("attic")).require(),
            Ok(("ada".to_string(), "attic".to_string()))
        );
    }

    #[test]
    fn require_rejects_missing_or_blank_values() {
        assert_eq!(
            query(None, Some("attic")).require(),
            Err(RequestError::MissingGameInfo)
        );
        assert_eq!(
            query(Some("ada"), Some("  ")).require(),
            Err(RequestError::MissingGameInfo)
        );
    }
}
