use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A player's guess about how the rest of the room voted for them.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum SelfVote {
    #[serde(rename = "Most Voted")]
    MostVoted,
    #[serde(rename = "Neutral")]
    Neutral,
    #[serde(rename = "Least Voted")]
    LeastVoted,
}

impl SelfVote {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelfVote::MostVoted => "Most Voted",
            SelfVote::Neutral => "Neutral",
            SelfVote::LeastVoted => "Least Voted",
        }
    }
}

/// One vote cast on a question.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    /// Name of the player receiving the vote (may be the voter)
    pub player_who_received_the_vote: String,
    #[serde(rename = "questionID", default)]
    pub question_id: String,
}

impl Vote {
    pub fn for_player(name: impl Into<String>) -> Self {
        Self {
            player_who_received_the_vote: name.into(),
            question_id: String::new(),
        }
    }
}

/// Both votes a player casts on a single question.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Ballot {
    pub player: String,
    pub votes: [Vote; 2],
}

impl Ballot {
    pub fn new(player: impl Into<String>, first: &str, second: &str) -> Self {
        Self {
            player: player.into(),
            votes: [Vote::for_player(first), Vote::for_player(second)],
        }
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.votes
            .iter()
            .map(|vote| vote.player_who_received_the_vote.as_str())
    }
}

/// Game-facing state of a player.
///
/// Only ever touched while the owning game's lock is held.
#[derive(Debug, Clone, Default)]
pub struct Player {
    ready_to_start: bool,
    ready_for_next_round: bool,
    /// question number -> votes received on that question
    votes: HashMap<u32, u32>,
    /// question number -> self-vote claimed on that question
    self_votes: HashMap<u32, SelfVote>,
}

impl Player {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready_to_start(&self) -> bool {
        self.ready_to_start
    }

    pub fn set_ready_to_start(&mut self) {
        self.ready_to_start = true;
    }

    pub fn is_ready_for_next_round(&self) -> bool {
        self.ready_for_next_round
    }

    pub fn set_ready_for_next_round(&mut self, ready: bool) {
        self.ready_for_next_round = ready;
    }

    pub fn votes_on(&self, question: u32) -> u32 {
        self.votes.get(&question).copied().unwrap_or(0)
    }

    pub fn receive_vote(&mut self, question: u32) {
        *self.votes.entry(question).or_insert(0) += 1;
    }

    pub fn self_vote_on(&self, question: u32) -> Option<SelfVote> {
        self.self_votes.get(&question).copied()
    }

    pub fn record_self_vote(&mut self, question: u32, choice: SelfVote) {
        self.self_votes.insert(question, choice);
    }
}
