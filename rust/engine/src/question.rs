use crate::errors::QuestionError;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use uuid::Uuid;

/// Number of questions handed out per block.
pub const QUESTIONS_PER_BATCH: usize = 4;

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct QuestionText {
    #[serde(default)]
    pub no: String,
    #[serde(default)]
    pub en: String,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub question: QuestionText,
}

impl Question {
    pub fn new(id: impl Into<String>, no: impl Into<String>, en: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            question: QuestionText {
                no: no.into(),
                en: en.into(),
            },
        }
    }

    /// A question written by a player. The language is unknown, so the text
    /// is used for every translation.
    pub fn custom(text: &str) -> Self {
        Self::new(Uuid::new_v4().to_string(), text, text)
    }
}

/// Supplies batches of questions a room has not seen yet.
pub trait QuestionSource: Send + Sync {
    /// Returns exactly `count` questions whose ids are not in `used`, or an
    /// error if the catalog cannot fill the batch.
    fn unique_batch(&self, used: &[String], count: usize) -> Result<Vec<Question>, QuestionError>;
}

/// Read-only, shuffled view of the question catalog shared by every room.
#[derive(Debug, Clone)]
pub struct QuestionStore {
    questions: Vec<Question>,
}

impl QuestionStore {
    /// Shuffles the catalog once. Repeated ids keep their first occurrence
    /// only, so a batch never carries the same id twice.
    pub fn new(questions: Vec<Question>, seed: Option<u64>) -> Self {
        let mut questions = distinct(questions);
        let mut rng = match seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_os_rng(),
        };
        questions.shuffle(&mut rng);
        Self { questions }
    }

    /// Keeps catalog order. Useful when callers need predictable batches.
    pub fn unshuffled(questions: Vec<Question>) -> Self {
        Self {
            questions: distinct(questions),
        }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

fn distinct(questions: Vec<Question>) -> Vec<Question> {
    let mut seen = HashSet::new();
    questions
        .into_iter()
        .filter(|q| seen.insert(q.id.clone()))
        .collect()
}

impl QuestionSource for QuestionStore {
    fn unique_batch(&self, used: &[String], count: usize) -> Result<Vec<Question>, QuestionError> {
        let used: HashSet<&str> = used.iter().map(String::as_str).collect();
        let batch: Vec<Question> = self
            .questions
            .iter()
            .filter(|q| !used.contains(q.id.as_str()))
            .take(count)
            .cloned()
            .collect();

        if batch.len() != count {
            return Err(QuestionError::NotEnough {
                wanted: count,
                found: batch.len(),
            });
        }
        Ok(batch)
    }
}

/// On-disk question catalog: `{"questions": [...]}`.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub questions: Vec<Question>,
}

impl Catalog {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, QuestionError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|err| QuestionError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|err| QuestionError::Parse {
            path: path.display().to_string(),
            message: err.to_string(),
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), QuestionError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|err| QuestionError::Parse {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        fs::write(path, json).map_err(|err| QuestionError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })
    }

    /// Appends a question under a freshly generated id that is unique within
    /// the catalog.
    pub fn add(&mut self, en: &str, no: &str) -> Result<&Question, QuestionError> {
        if en.trim().is_empty() && no.trim().is_empty() {
            return Err(QuestionError::EmptyQuestion);
        }
        let mut id = Uuid::new_v4().to_string();
        while self.questions.iter().any(|q| q.id == id) {
            id = Uuid::new_v4().to_string();
        }
        self.questions.push(Question::new(id, no, en));
        Ok(&self.questions[self.questions.len() - 1])
    }

    /// Lists every problem found in the catalog. Empty means valid.
    pub fn problems(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut problems = Vec::new();
        for (idx, q) in self.questions.iter().enumerate() {
            if q.id.trim().is_empty() {
                problems.push(format!("question #{idx} has an empty id"));
            } else if !seen.insert(q.id.as_str()) {
                problems.push(format!("question #{idx} reuses id '{}'", q.id));
            }
            if q.question.en.trim().is_empty() && q.question.no.trim().is_empty() {
                problems.push(format!("question #{idx} ('{}') has no text", q.id));
            }
        }
        problems
    }
}
