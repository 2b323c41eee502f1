use thiserror::Error;

/// Failures raised by the round engine.
///
/// None of these are fatal to a room: callers log them and degrade the single
/// request that triggered them.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("player name '{0}' is already taken")]
    NameTaken(String),
    #[error("unable to find a player with the name '{0}'")]
    PlayerNotFound(String),
    #[error("no more questions: {0}")]
    QuestionsExhausted(#[from] QuestionError),
    #[error("game state lock poisoned")]
    StoragePoisoned,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuestionError {
    #[error("unable to find {wanted} questions, found {found}")]
    NotEnough { wanted: usize, found: usize },
    #[error("unable to read question catalog '{path}': {message}")]
    Io { path: String, message: String },
    #[error("unable to parse question catalog '{path}': {message}")]
    Parse { path: String, message: String },
    #[error("question must have at least one translation")]
    EmptyQuestion,
}
