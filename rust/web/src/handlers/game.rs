//! The standard event handler set every room is created with.
//!
//! Handlers are generic over [`GameRoom`] so they can be driven by a real
//! [`Room`](crate::room::Room) or by a recording double in tests. None of them
//! fail the connection: engine errors are logged and degrade the single
//! request that caused them.

use crate::dispatcher::Dispatcher;
use crate::events::{
    AddCustomQuestion, LobbyChat, OutboundEvent, PlayerPayload, QuestionVote, RegisterSelfVote,
};
use crate::room::GameRoom;
use introspect_engine::FIRST_QUESTION;
use std::sync::Arc;

pub const PING: &str = "ping";
pub const LOBBY_CHAT: &str = "lobby_chat";
pub const LOBBY_PLAYER_READY: &str = "lobby_player_ready";
pub const ADD_CUSTOM_QUESTION: &str = "add_custom_question";
pub const GET_QUESTIONS_REQUEST: &str = "get_questions_request";
pub const REGISTER_QUESTION_VOTE: &str = "register_question_vote";
pub const REGISTER_SELF_VOTE: &str = "register_self_vote";
pub const NEXT_ROUND: &str = "next_round";

/// Builds a dispatcher with every standard event registered.
pub fn standard_dispatcher<C: GameRoom + 'static>() -> Dispatcher<C> {
    let mut dispatcher = Dispatcher::new();
    register_standard_handlers(&mut dispatcher);
    dispatcher
}

pub fn register_standard_handlers<C: GameRoom + 'static>(dispatcher: &mut Dispatcher<C>) {
    dispatcher.on_typed(PING, ping::<C>);
    dispatcher.on_typed(LOBBY_CHAT, lobby_chat::<C>);
    dispatcher.on_typed(LOBBY_PLAYER_READY, lobby_player_ready::<C>);
    dispatcher.on_typed(ADD_CUSTOM_QUESTION, add_custom_question::<C>);
    dispatcher.on_typed(GET_QUESTIONS_REQUEST, get_questions::<C>);
    dispatcher.on_typed(REGISTER_QUESTION_VOTE, register_question_vote::<C>);
    dispatcher.on_typed(REGISTER_SELF_VOTE, register_self_vote::<C>);
    dispatcher.on_typed(NEXT_ROUND, next_round::<C>);
}

/// Replies `pong` to the sender only.
pub async fn ping<C: GameRoom>(room: Arc<C>, msg: PlayerPayload) {
    room.send_msg(&msg.player, OutboundEvent::Pong { player: msg.player.clone() })
        .await;
}

pub async fn lobby_chat<C: GameRoom>(room: Arc<C>, msg: LobbyChat) {
    room.broadcast(OutboundEvent::LobbyChat {
        player: msg.player,
        message: msg.message,
    })
    .await;
}

/// Marks the sender ready and broadcasts the updated roster.
///
/// The engine moves from lobby to playing once every player is ready; the
/// roster's `isAllReady` flag is how clients learn about it.
pub async fn lobby_player_ready<C: GameRoom>(room: Arc<C>, msg: PlayerPayload) {
    if let Err(err) = room.engine().set_player_ready(&msg.player) {
        tracing::warn!(room = room.name(), player = %msg.player, error = %err, "unable to mark player ready");
        return;
    }
    let status = match room.engine().room_status() {
        Ok(status) => status,
        Err(err) => {
            tracing::error!(room = room.name(), error = %err, "unable to read roster");
            return;
        }
    };
    if status.is_all_ready {
        tracing::info!(room = room.name(), players = status.players.len(), "all players ready");
    }
    room.broadcast(OutboundEvent::LobbyRoomUpdate {
        players: status.players,
        is_all_ready: status.is_all_ready,
        action_trigger: None,
    })
    .await;
}

pub async fn add_custom_question<C: GameRoom>(room: Arc<C>, msg: AddCustomQuestion) {
    let text = msg.question.trim();
    if text.is_empty() {
        tracing::warn!(room = room.name(), player = %msg.player, "ignoring empty custom question");
        return;
    }
    match room.engine().add_custom_question(text) {
        Ok(queued_questions) => {
            tracing::debug!(room = room.name(), player = %msg.player, queued_questions, "custom question queued");
            room.broadcast(OutboundEvent::CustomQuestionAdded {
                player: msg.player,
                queued_questions,
            })
            .await;
        }
        Err(err) => {
            tracing::error!(room = room.name(), error = %err, "unable to queue custom question");
        }
    }
}

/// Sends the current block of questions, or an error payload once the
/// catalog has run dry.
pub async fn get_questions<C: GameRoom>(room: Arc<C>, msg: PlayerPayload) {
    let response = match room.engine().questions() {
        Ok(questions) => OutboundEvent::GetQuestionsResponse {
            player: msg.player.clone(),
            questions: Some(questions),
            error: None,
        },
        Err(err) => {
            tracing::warn!(room = room.name(), player = %msg.player, error = %err, "unable to hand out questions");
            OutboundEvent::GetQuestionsResponse {
                player: msg.player.clone(),
                questions: None,
                error: Some(err.to_string()),
            }
        }
    };
    room.send_msg(&msg.player, response).await;
}

pub async fn register_question_vote<C: GameRoom>(room: Arc<C>, ballot: QuestionVote) {
    let engine = room.engine();
    if let Err(err) = engine.register_votes(&ballot) {
        tracing::error!(room = room.name(), player = %ballot.player, error = %err, "unable to register votes");
        return;
    }
    let is_self_voting = match engine.is_voting_complete() {
        Ok(done) => done,
        Err(err) => {
            tracing::error!(room = room.name(), error = %err, "unable to read vote count");
            return;
        }
    };
    room.broadcast(OutboundEvent::RegisterQuestionVoteUpdate {
        player: ballot.player,
        is_self_voting,
    })
    .await;
}

/// Records a self-vote and, when it was the last one, publishes results.
pub async fn register_self_vote<C: GameRoom>(room: Arc<C>, msg: RegisterSelfVote) {
    let engine = room.engine();
    if let Err(err) = engine.register_self_vote(&msg.player, msg.choice) {
        tracing::error!(room = room.name(), player = %msg.player, error = %err, "unable to register self-vote");
        return;
    }
    room.broadcast(OutboundEvent::RegisterSelfVoteUpdate {
        player: msg.player.clone(),
    })
    .await;

    publish_progress(room.as_ref()).await;
}

/// Re-checks the question in progress after `player` left the room.
///
/// The departed player no longer counts towards either gate, so the players
/// still in the room may have just completed voting or self-voting.
pub async fn player_left<C: GameRoom>(room: &C, player: &str, was_self_voting: bool) {
    match room.engine().is_voting_complete() {
        Ok(true) if !was_self_voting => {
            tracing::info!(room = room.name(), player, "voting complete after player left");
            room.broadcast(OutboundEvent::RegisterQuestionVoteUpdate {
                player: player.to_string(),
                is_self_voting: true,
            })
            .await;
        }
        Ok(_) => {}
        Err(err) => {
            tracing::error!(room = room.name(), error = %err, "unable to read vote count");
            return;
        }
    }
    publish_progress(room).await;
}

/// Advances the current question once every player has self-voted.
///
/// Question results go out immediately. When the question also closed a
/// round-group this waits for the room's results delay before sending the
/// running totals, so clients get time to show the per-question sheet.
/// The engine advances at most once per question, so concurrent callers
/// publish each result once.
pub async fn publish_progress<C: GameRoom>(room: &C) {
    let progress = match room.engine().advance_if_question_done() {
        Ok(progress) => progress,
        Err(err) => {
            tracing::error!(room = room.name(), error = %err, "unable to advance question");
            return;
        }
    };
    if !progress.question_done {
        return;
    }

    let question = progress.question;
    tracing::info!(room = room.name(), question, round_done = progress.round_done, "question done");
    match room.engine().score_question(question) {
        Ok(question_points) => {
            room.broadcast(OutboundEvent::QuestionIsDone {
                question_points,
                current_question: question,
            })
            .await;
        }
        Err(err) => {
            tracing::error!(room = room.name(), question, error = %err, "unable to score question");
            return;
        }
    }

    if !progress.round_done {
        return;
    }
    let delay = room.results_delay();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let per_round = room.engine().config().questions_per_round.max(1);
    let previous_rounds_end = question.saturating_sub(per_round);
    let totals = room
        .engine()
        .score_range(FIRST_QUESTION, previous_rounds_end)
        .and_then(|before| {
            room.engine()
                .score_range(FIRST_QUESTION, question)
                .map(|after| (before, after))
        });
    let (players_result_except_last_round, players_results) = match totals {
        Ok(totals) => totals,
        Err(err) => {
            tracing::error!(room = room.name(), error = %err, "unable to total scores");
            return;
        }
    };

    let event = if progress.game_finished {
        tracing::info!(room = room.name(), question, "game finished");
        OutboundEvent::GameIsFinished {
            players_result_except_last_round,
            players_results,
        }
    } else {
        OutboundEvent::RoundIsFinished {
            players_result_except_last_round,
            players_results,
        }
    };
    room.broadcast(event).await;
}

/// Marks the sender ready for the next round and opens the gate once the
/// whole room is ready.
pub async fn next_round<C: GameRoom>(room: Arc<C>, msg: PlayerPayload) {
    let engine = room.engine();
    if let Err(err) = engine.set_player_ready_for_next_round(&msg.player) {
        tracing::warn!(room = room.name(), player = %msg.player, error = %err, "unable to mark player ready for next round");
        return;
    }
    match engine.is_next_round() {
        Ok(true) => {
            tracing::info!(room = room.name(), "starting next round");
            room.broadcast(OutboundEvent::NextRoundStart).await;
        }
        Ok(false) => {}
        Err(err) => {
            tracing::error!(room = room.name(), error = %err, "unable to read next round readiness");
        }
    }
}
