//! Wire shapes for everything that crosses a player connection.
//!
//! Inbound payloads are one struct per event name, decoded after the
//! dispatcher has stripped the `event` field. Outbound messages are a single
//! tagged enum so the `event` field is always present.

use introspect_engine::{PlayerPoints, PlayerUpdate, PointsEntry, Question, SelfVote};
use serde::{Deserialize, Serialize};

pub use introspect_engine::Ballot as QuestionVote;

/// Payload of events that carry nothing but the sender's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerPayload {
    pub player: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyChat {
    pub player: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddCustomQuestion {
    pub player: String,
    pub question: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterSelfVote {
    pub player: String,
    pub choice: SelfVote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LobbyAction {
    #[serde(rename = "JOINED")]
    Joined,
    #[serde(rename = "LEFT")]
    Left,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionTrigger {
    pub player: String,
    pub action: LobbyAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OutboundEvent {
    Pong {
        player: String,
    },
    LobbyChat {
        player: String,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    LobbyRoomUpdate {
        players: Vec<PlayerUpdate>,
        is_all_ready: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        action_trigger: Option<ActionTrigger>,
    },
    #[serde(rename_all = "camelCase")]
    CustomQuestionAdded {
        player: String,
        queued_questions: usize,
    },
    GetQuestionsResponse {
        player: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        questions: Option<Vec<Question>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    RegisterQuestionVoteUpdate {
        player: String,
        is_self_voting: bool,
    },
    RegisterSelfVoteUpdate {
        player: String,
    },
    #[serde(rename_all = "camelCase")]
    QuestionIsDone {
        question_points: Vec<PointsEntry>,
        current_question: u32,
    },
    #[serde(rename_all = "camelCase")]
    RoundIsFinished {
        players_result_except_last_round: Vec<PlayerPoints>,
        players_results: Vec<PlayerPoints>,
    },
    #[serde(rename_all = "camelCase")]
    GameIsFinished {
        players_result_except_last_round: Vec<PlayerPoints>,
        players_results: Vec<PlayerPoints>,
    },
    NextRoundStart,
}

impl OutboundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::Pong { .. } => "pong",
            OutboundEvent::LobbyChat { .. } => "lobby_chat",
            OutboundEvent::LobbyRoomUpdate { .. } => "lobby_room_update",
            OutboundEvent::CustomQuestionAdded { .. } => "custom_question_added",
            OutboundEvent::GetQuestionsResponse { .. } => "get_questions_response",
            OutboundEvent::RegisterQuestionVoteUpdate { .. } => "register_question_vote_update",
            OutboundEvent::RegisterSelfVoteUpdate { .. } => "register_self_vote_update",
            OutboundEvent::QuestionIsDone { .. } => "question_is_done",
            OutboundEvent::RoundIsFinished { .. } => "round_is_finished",
            OutboundEvent::GameIsFinished { .. } => "game_is_finished",
            OutboundEvent::NextRoundStart => "next_round_start",
        }
    }

    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn outbound_events_carry_their_name_in_the_event_field() {
        let events = vec![
            OutboundEvent::Pong {
                player: "ada".into(),
            },
            OutboundEvent::RegisterSelfVoteUpdate {
                player: "ada".into(),
            },
            OutboundEvent::NextRoundStart,
        ];
        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["event"], event.name());
        }
    }

    #[test]
    fn lobby_update_uses_camel_case_and_action_strings() {
        let event = OutboundEvent::LobbyRoomUpdate {
            players: vec![PlayerUpdate {
                name: "ada".into(),
                is_ready: true,
            }],
            is_all_ready: true,
            action_trigger: Some(ActionTrigger {
                player: "bo".into(),
                action: LobbyAction::Left,
            }),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "event": "lobby_room_update",
                "players": [{"name": "ada", "isReady": true}],
                "isAllReady": true,
                "actionTrigger": {"player": "bo", "action": "LEFT"}
            })
        );
    }

    #[test]
    fn question_results_match_the_client_shape() {
        let event = OutboundEvent::QuestionIsDone {
            question_points: vec![PointsEntry {
                player: "ada".into(),
                self_vote: Some(SelfVote::MostVoted),
                votes_received: 4,
                points: 3,
            }],
            current_question: 1,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["currentQuestion"], 1);
        assert_eq!(value["questionPoints"][0]["selfVote"], "Most Voted");
        assert_eq!(value["questionPoints"][0]["votesReceived"], 4);
    }

    #[test]
    fn error_response_omits_questions() {
        let event = OutboundEvent::GetQuestionsResponse {
            player: "ada".into(),
            questions: None,
            error: Some("no more questions".into()),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert!(value.get("questions").is_none());
        assert_eq!(value["error"], "no more questions");
    }

    #[test]
    fn self_vote_payload_requires_a_known_choice() {
        let ok: RegisterSelfVote =
            serde_json::from_value(json!({"player": "ada", "choice": "Neutral"})).unwrap();
        assert_eq!(ok.choice, SelfVote::Neutral);
        assert!(serde_json::from_value::<RegisterSelfVote>(
            json!({"player": "ada", "choice": "Maybe"})
        )
        .is_err());
    }
}
