use crate::player::SelfVote;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Points handed out for a correct self-vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringRules {
    pub most_voted_points: u32,
    pub neutral_points: u32,
    pub least_voted_points: u32,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            most_voted_points: 3,
            neutral_points: 1,
            least_voted_points: 3,
        }
    }
}

impl ScoringRules {
    fn reward(&self, group: SelfVote) -> u32 {
        match group {
            SelfVote::MostVoted => self.most_voted_points,
            SelfVote::Neutral => self.neutral_points,
            SelfVote::LeastVoted => self.least_voted_points,
        }
    }
}

/// What one player did on one question, as seen by the scorer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerStat {
    pub name: String,
    pub votes: u32,
    pub self_vote: Option<SelfVote>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsEntry {
    pub player: String,
    pub self_vote: Option<SelfVote>,
    pub votes_received: u32,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerPoints {
    pub player: String,
    pub points: u32,
}

/// Places a vote count into a group. The max check runs first, so when every
/// player has the same count they all land in `MostVoted`.
pub fn classify(votes: u32, min: u32, max: u32) -> SelfVote {
    if votes == max {
        SelfVote::MostVoted
    } else if votes == min {
        SelfVote::LeastVoted
    } else {
        SelfVote::Neutral
    }
}

/// Scores a single question. Entries come back in the order of `stats`.
pub fn score(stats: &[PlayerStat], rules: &ScoringRules) -> Vec<PointsEntry> {
    let Some(min) = stats.iter().map(|s| s.votes).min() else {
        return Vec::new();
    };
    let max = stats.iter().map(|s| s.votes).max().unwrap_or(min);

    stats
        .iter()
        .map(|stat| {
            let group = classify(stat.votes, min, max);
            let points = if stat.self_vote == Some(group) {
                rules.reward(group)
            } else {
                0
            };
            PointsEntry {
                player: stat.name.clone(),
                self_vote: stat.self_vote,
                votes_received: stat.votes,
                points,
            }
        })
        .collect()
}

/// Sums per-question entries into per-player totals, sorted by name.
pub fn totals<'a>(entries: impl IntoIterator<Item = &'a PointsEntry>) -> Vec<PlayerPoints> {
    let mut sums: BTreeMap<&str, u32> = BTreeMap::new();
    for entry in entries {
        *sums.entry(entry.player.as_str()).or_insert(0) += entry.points;
    }
    sums.into_iter()
        .map(|(player, points)| PlayerPoints {
            player: player.to_string(),
            points,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(name: &str, votes: u32, self_vote: Option<SelfVote>) -> PlayerStat {
        PlayerStat {
            name: name.to_string(),
            votes,
            self_vote,
        }
    }

    #[test]
    fn classify_prefers_most_voted_on_ties() {
        assert_eq!(classify(2, 2, 2), SelfVote::MostVoted);
        assert_eq!(classify(0, 0, 4), SelfVote::LeastVoted);
        assert_eq!(classify(2, 0, 4), SelfVote::Neutral);
    }

    #[test]
    fn correct_guesses_earn_group_reward() {
        let stats = vec![
            stat("a", 4, Some(SelfVote::MostVoted)),
            stat("b", 2, Some(SelfVote::Neutral)),
            stat("c", 0, Some(SelfVote::LeastVoted)),
            stat("d", 2, Some(SelfVote::MostVoted)),
        ];
        let entries = score(&stats, &ScoringRules::default());
        let points: Vec<u32> = entries.iter().map(|e| e.points).collect();
        assert_eq!(points, vec![3, 1, 3, 0]);
    }

    #[test]
    fn missing_self_vote_scores_zero() {
        let stats = vec![stat("a", 3, None), stat("b", 1, Some(SelfVote::LeastVoted))];
        let entries = score(&stats, &ScoringRules::default());
        assert_eq!(entries[0].points, 0);
        assert_eq!(entries[1].points, 3);
    }

    #[test]
    fn universal_tie_never_rewards_least_voted() {
        let stats = vec![
            stat("a", 2, Some(SelfVote::LeastVoted)),
            stat("b", 2, Some(SelfVote::MostVoted)),
        ];
        let entries = score(&stats, &ScoringRules::default());
        assert_eq!(entries[0].points, 0);
        assert_eq!(entries[1].points, 3);
    }

    #[test]
    fn empty_room_scores_nothing() {
        assert!(score(&[], &ScoringRules::default()).is_empty());
    }

    #[test]
    fn custom_rules_are_applied() {
        let rules = ScoringRules {
            most_voted_points: 5,
            neutral_points: 2,
            least_voted_points: 4,
        };
        let stats = vec![
            stat("a", 3, Some(SelfVote::MostVoted)),
            stat("b", 1, Some(SelfVote::Neutral)),
            stat("c", 0, Some(SelfVote::LeastVoted)),
        ];
        let points: Vec<u32> = score(&stats, &rules).iter().map(|e| e.points).collect();
        assert_eq!(points, vec![5, 2, 4]);
    }
}
