pub mod game;
pub mod health;
pub mod join;
pub mod ws;

pub use game::{register_standard_handlers, standard_dispatcher};
pub use health::{health, ping};
pub use join::{validate_game_info, GameInfoQuery};
pub use ws::{join_room, upgrade};
