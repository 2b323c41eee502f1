use crate::errors::GameError;
use crate::player::{Ballot, Player, SelfVote};
use crate::question::{Question, QuestionSource, QUESTIONS_PER_BATCH};
use crate::scoring::{self, PlayerPoints, PlayerStat, PointsEntry, ScoringRules};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Each player casts this many votes per question.
pub const VOTES_PER_PLAYER: u32 = 2;
pub const FIRST_QUESTION: u32 = 1;

/// Tunables for a single game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Questions per round-group, also the size of a question block
    pub questions_per_round: u32,
    /// Round-groups before the game is finished; `None` plays until the
    /// catalog runs dry
    pub rounds_per_game: Option<u32>,
    pub scoring: ScoringRules,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            questions_per_round: QUESTIONS_PER_BATCH as u32,
            rounds_per_game: Some(3),
            scoring: ScoringRules::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Lobby,
    Playing,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStage {
    CollectingVotes,
    CollectingSelfVotes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionProgress {
    /// The question this check was made for
    pub question: u32,
    /// Every registered player has self-voted; the question counter moved on
    pub question_done: bool,
    /// The completed question closed a round-group
    pub round_done: bool,
    /// The completed round-group was the last one of the game
    pub game_finished: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerUpdate {
    pub name: String,
    pub is_ready: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomStatus {
    pub players: Vec<PlayerUpdate>,
    pub is_all_ready: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStatus {
    pub phase: Phase,
    pub current_question: u32,
    pub stage: QuestionStage,
    pub completed_rounds: u32,
    pub player_count: usize,
}

/// The voting/self-voting/scoring state machine of one room.
///
/// Every method takes the engine's own lock for the duration of the call and
/// never holds it across I/O.
pub trait RoundEngine: Send + Sync {
    fn config(&self) -> &GameConfig;
    fn add_player(&self, name: &str) -> Result<(), GameError>;
    fn remove_player(&self, name: &str) -> Result<(), GameError>;
    fn has_player(&self, name: &str) -> Result<bool, GameError>;
    fn set_player_ready(&self, name: &str) -> Result<(), GameError>;
    fn all_players_ready(&self) -> Result<bool, GameError>;
    fn set_player_ready_for_next_round(&self, name: &str) -> Result<(), GameError>;
    fn is_next_round(&self) -> Result<bool, GameError>;
    fn room_status(&self) -> Result<RoomStatus, GameError>;
    fn is_joinable(&self) -> Result<bool, GameError>;
    fn status(&self) -> Result<GameStatus, GameError>;
    fn current_question(&self) -> Result<u32, GameError>;
    fn add_custom_question(&self, text: &str) -> Result<usize, GameError>;
    fn questions(&self) -> Result<Vec<Question>, GameError>;
    fn register_votes(&self, ballot: &Ballot) -> Result<(), GameError>;
    fn is_voting_complete(&self) -> Result<bool, GameError>;
    fn register_self_vote(&self, name: &str, choice: SelfVote) -> Result<(), GameError>;
    fn advance_if_question_done(&self) -> Result<QuestionProgress, GameError>;
    fn score_question(&self, question: u32) -> Result<Vec<PointsEntry>, GameError>;
    fn score_range(&self, from: u32, to: u32) -> Result<Vec<PlayerPoints>, GameError>;
}

#[derive(Debug)]
struct GameState {
    /// Sorted by name so rosters and score sheets come out in a stable order
    players: BTreeMap<String, Player>,
    current_question: u32,
    /// Every question issued so far, in block order
    questions: Vec<Question>,
    custom_questions: VecDeque<Question>,
    phase: Phase,
    completed_rounds: u32,
}

impl GameState {
    fn votes_on_current(&self) -> u32 {
        self.players
            .values()
            .map(|p| p.votes_on(self.current_question))
            .sum()
    }

    fn stats_for(&self, question: u32) -> Vec<PlayerStat> {
        self.players
            .iter()
            .map(|(name, player)| PlayerStat {
                name: name.clone(),
                votes: player.votes_on(question),
                self_vote: player.self_vote_on(question),
            })
            .collect()
    }
}

pub struct Game {
    config: GameConfig,
    state: RwLock<GameState>,
    source: Arc<dyn QuestionSource>,
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish()
    }
}

impl Game {
    pub fn new(config: GameConfig, source: Arc<dyn QuestionSource>) -> Self {
        Self {
            config,
            state: RwLock::new(GameState {
                players: BTreeMap::new(),
                current_question: FIRST_QUESTION,
                questions: Vec::new(),
                custom_questions: VecDeque::new(),
                phase: Phase::Lobby,
                completed_rounds: 0,
            }),
            source,
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, GameState>, GameError> {
        self.state.read().map_err(|_| GameError::StoragePoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, GameState>, GameError> {
        self.state.write().map_err(|_| GameError::StoragePoisoned)
    }

    fn block_size(&self) -> usize {
        self.config.questions_per_round.max(1) as usize
    }

    /// Appends one block to the issued list. Pending custom questions go
    /// first; the supplier fills the rest. Nothing is consumed on failure.
    fn materialize_block(&self, state: &mut GameState) -> Result<(), GameError> {
        let size = self.block_size();
        let from_custom = state.custom_questions.len().min(size);
        let missing = size - from_custom;

        let supplied = if missing > 0 {
            let used: Vec<String> = state.questions.iter().map(|q| q.id.clone()).collect();
            self.source.unique_batch(&used, missing)?
        } else {
            Vec::new()
        };

        state
            .questions
            .extend(state.custom_questions.drain(..from_custom).collect::<Vec<_>>());
        state.questions.extend(supplied);
        Ok(())
    }
}

impl RoundEngine for Game {
    fn config(&self) -> &GameConfig {
        &self.config
    }

    fn add_player(&self, name: &str) -> Result<(), GameError> {
        let mut state = self.write()?;
        if state.players.contains_key(name) {
            return Err(GameError::NameTaken(name.to_string()));
        }
        state.players.insert(name.to_string(), Player::new());
        Ok(())
    }

    fn remove_player(&self, name: &str) -> Result<(), GameError> {
        let mut state = self.write()?;
        state.players.remove(name);
        Ok(())
    }

    fn has_player(&self, name: &str) -> Result<bool, GameError> {
        Ok(self.read()?.players.contains_key(name))
    }

    fn set_player_ready(&self, name: &str) -> Result<(), GameError> {
        let mut state = self.write()?;
        let player = state
            .players
            .get_mut(name)
            .ok_or_else(|| GameError::PlayerNotFound(name.to_string()))?;
        player.set_ready_to_start();

        if state.phase == Phase::Lobby && state.players.values().all(Player::is_ready_to_start) {
            state.phase = Phase::Playing;
        }
        Ok(())
    }

    fn all_players_ready(&self) -> Result<bool, GameError> {
        Ok(self.read()?.players.values().all(Player::is_ready_to_start))
    }

    fn set_player_ready_for_next_round(&self, name: &str) -> Result<(), GameError> {
        let mut state = self.write()?;
        let player = state
            .players
            .get_mut(name)
            .ok_or_else(|| GameError::PlayerNotFound(name.to_string()))?;
        player.set_ready_for_next_round(true);
        Ok(())
    }

    fn is_next_round(&self) -> Result<bool, GameError> {
        let mut state = self.write()?;
        let all_ready = state.players.values().all(Player::is_ready_for_next_round);
        if all_ready {
            for player in state.players.values_mut() {
                player.set_ready_for_next_round(false);
            }
        }
        Ok(all_ready)
    }

    fn room_status(&self) -> Result<RoomStatus, GameError> {
        let state = self.read()?;
        let players: Vec<PlayerUpdate> = state
            .players
            .iter()
            .map(|(name, player)| PlayerUpdate {
                name: name.clone(),
                is_ready: player.is_ready_to_start(),
            })
            .collect();
        let is_all_ready = players.iter().all(|p| p.is_ready);
        Ok(RoomStatus {
            players,
            is_all_ready,
        })
    }

    fn is_joinable(&self) -> Result<bool, GameError> {
        let state = self.read()?;
        Ok(state.phase == Phase::Lobby
            && !state.players.values().any(Player::is_ready_to_start))
    }

    fn status(&self) -> Result<GameStatus, GameError> {
        let state = self.read()?;
        let expected = VOTES_PER_PLAYER * state.players.len() as u32;
        let stage = if state.votes_on_current() < expected {
            QuestionStage::CollectingVotes
        } else {
            QuestionStage::CollectingSelfVotes
        };
        Ok(GameStatus {
            phase: state.phase,
            current_question: state.current_question,
            stage,
            completed_rounds: state.completed_rounds,
            player_count: state.players.len(),
        })
    }

    fn current_question(&self) -> Result<u32, GameError> {
        Ok(self.read()?.current_question)
    }

    fn add_custom_question(&self, text: &str) -> Result<usize, GameError> {
        let mut state = self.write()?;
        state.custom_questions.push_back(Question::custom(text));
        Ok(state.custom_questions.len())
    }

    fn questions(&self) -> Result<Vec<Question>, GameError> {
        let mut state = self.write()?;
        let size = self.block_size();
        let block = (state.current_question - FIRST_QUESTION) as usize / size;
        let start = block * size;
        let end = start + size;

        while state.questions.len() < end {
            if let Err(err) = self.materialize_block(&mut state) {
                state.phase = Phase::Finished;
                return Err(err);
            }
        }
        Ok(state.questions[start..end].to_vec())
    }

    fn register_votes(&self, ballot: &Ballot) -> Result<(), GameError> {
        let mut state = self.write()?;
        let question = state.current_question;
        for target in ballot.targets() {
            if let Some(player) = state.players.get_mut(target) {
                player.receive_vote(question);
            }
        }
        Ok(())
    }

    fn is_voting_complete(&self) -> Result<bool, GameError> {
        let state = self.read()?;
        let expected = VOTES_PER_PLAYER * state.players.len() as u32;
        Ok(state.votes_on_current() == expected)
    }

    fn register_self_vote(&self, name: &str, choice: SelfVote) -> Result<(), GameError> {
        let mut state = self.write()?;
        let question = state.current_question;
        if let Some(player) = state.players.get_mut(name) {
            player.record_self_vote(question, choice);
        }
        Ok(())
    }

    fn advance_if_question_done(&self) -> Result<QuestionProgress, GameError> {
        let mut state = self.write()?;
        let question = state.current_question;
        let question_done = state
            .players
            .values()
            .all(|p| p.self_vote_on(question).is_some());

        if !question_done {
            return Ok(QuestionProgress {
                question,
                question_done: false,
                round_done: false,
                game_finished: false,
            });
        }

        state.current_question += 1;
        let round_done = question % self.config.questions_per_round.max(1) == 0;
        let mut game_finished = false;
        if round_done {
            state.completed_rounds += 1;
            if let Some(limit) = self.config.rounds_per_game {
                if state.completed_rounds >= limit {
                    state.phase = Phase::Finished;
                    game_finished = true;
                }
            }
        }

        Ok(QuestionProgress {
            question,
            question_done,
            round_done,
            game_finished,
        })
    }

    fn score_question(&self, question: u32) -> Result<Vec<PointsEntry>, GameError> {
        let state = self.read()?;
        Ok(scoring::score(&state.stats_for(question), &self.config.scoring))
    }

    fn score_range(&self, from: u32, to: u32) -> Result<Vec<PlayerPoints>, GameError> {
        if from < FIRST_QUESTION || from > to {
            return Ok(Vec::new());
        }
        let state = self.read()?;
        let entries: Vec<PointsEntry> = (from..=to)
            .flat_map(|question| scoring::score(&state.stats_for(question), &self.config.scoring))
            .collect();
        Ok(scoring::totals(&entries))
    }
}
