//! # introspect-engine: round engine for the Introspect party game
//!
//! Players answer questions by voting for two people in the room, then guess
//! whether they themselves ended up most voted, neutral, or least voted.
//! Correct guesses earn points.
//!
//! ## Core Modules
//!
//! - [`game`] - The per-room state machine ([`game::RoundEngine`], [`game::Game`])
//! - [`player`] - Game-facing player state, ballots and self-votes
//! - [`question`] - Question catalog and the supplier handing out unused batches
//! - [`scoring`] - Pure per-question scoring and range totals
//! - [`errors`] - Error types for game operations
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use introspect_engine::game::{Game, GameConfig, RoundEngine};
//! use introspect_engine::player::{Ballot, SelfVote};
//! use introspect_engine::question::QuestionStore;
//!
//! let game = Game::new(GameConfig::default(), Arc::new(QuestionStore::unshuffled(vec![])));
//! game.add_player("ada").unwrap();
//! game.add_player("bo").unwrap();
//! game.register_votes(&Ballot::new("ada", "bo", "bo")).unwrap();
//! game.register_votes(&Ballot::new("bo", "bo", "ada")).unwrap();
//! assert!(game.is_voting_complete().unwrap());
//!
//! game.register_self_vote("ada", SelfVote::LeastVoted).unwrap();
//! game.register_self_vote("bo", SelfVote::MostVoted).unwrap();
//! assert!(game.advance_if_question_done().unwrap().question_done);
//!
//! let points: Vec<u32> = game.score_question(1).unwrap().iter().map(|e| e.points).collect();
//! assert_eq!(points, vec![3, 3]);
//! ```

pub mod errors;
pub mod game;
pub mod player;
pub mod question;
pub mod scoring;

pub use errors::{GameError, QuestionError};
pub use game::{
    Game, GameConfig, GameStatus, Phase, PlayerUpdate, QuestionProgress, QuestionStage,
    RoomStatus, RoundEngine, FIRST_QUESTION, VOTES_PER_PLAYER,
};
pub use player::{Ballot, SelfVote, Vote};
pub use question::{Catalog, Question, QuestionSource, QuestionStore, QuestionText};
pub use scoring::{PlayerPoints, PointsEntry, ScoringRules};
