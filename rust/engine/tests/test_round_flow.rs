use introspect_engine::game::{Game, GameConfig, Phase, RoundEngine};
use introspect_engine::player::{Ballot, SelfVote};
use introspect_engine::question::{Question, QuestionStore};
use introspect_engine::scoring::PlayerPoints;
use introspect_engine::GameError;
use std::collections::HashSet;
use std::sync::Arc;

const A: &str = "Player AAA";
const B: &str = "Player BBB";
const C: &str = "Player CCC";

fn catalog(n: usize) -> Vec<Question> {
    (0..n)
        .map(|i| Question::new(format!("q-{i}"), format!("spørsmål {i}"), format!("question {i}")))
        .collect()
}

fn new_game(players: &[&str], questions: usize) -> Game {
    let store = QuestionStore::new(catalog(questions), Some(99));
    let game = Game::new(GameConfig::default(), Arc::new(store));
    for name in players {
        game.add_player(name).expect("add player");
    }
    game
}

/// A gets 4 votes, B gets 2, C gets 0; everybody guesses right.
fn play_reference_question(game: &Game) {
    game.register_votes(&Ballot::new(A, B, B)).unwrap();
    game.register_votes(&Ballot::new(B, A, A)).unwrap();
    game.register_votes(&Ballot::new(C, A, A)).unwrap();
    game.register_self_vote(A, SelfVote::MostVoted).unwrap();
    game.register_self_vote(B, SelfVote::Neutral).unwrap();
    game.register_self_vote(C, SelfVote::LeastVoted).unwrap();
}

fn points_of(totals: &[PlayerPoints], name: &str) -> u32 {
    totals
        .iter()
        .find(|p| p.player == name)
        .map(|p| p.points)
        .expect("player in totals")
}

#[test]
fn roster_tracks_adds_and_removes() {
    let game = new_game(&[A, B, C], 0);
    game.remove_player(B).unwrap();
    game.add_player("Player DDD").unwrap();
    game.remove_player("never joined").unwrap();

    let names: HashSet<String> = game
        .room_status()
        .unwrap()
        .players
        .into_iter()
        .map(|p| p.name)
        .collect();
    let expected: HashSet<String> = [A, C, "Player DDD"].iter().map(|s| s.to_string()).collect();
    assert_eq!(names, expected);
}

#[test]
fn voting_completes_at_exactly_two_votes_per_player() {
    let game = new_game(&[A, B, C], 0);
    game.register_votes(&Ballot::new(A, B, C)).unwrap();
    game.register_votes(&Ballot::new(B, A, C)).unwrap();
    game.register_votes(&Ballot::new(C, A, "someone who left")).unwrap();
    // 5 of 6 counted
    assert!(!game.is_voting_complete().unwrap());

    let game = new_game(&[A, B, C], 0);
    game.register_votes(&Ballot::new(A, B, C)).unwrap();
    game.register_votes(&Ballot::new(B, A, C)).unwrap();
    game.register_votes(&Ballot::new(C, A, B)).unwrap();
    assert!(game.is_voting_complete().unwrap());
}

#[test]
fn self_votes_count_towards_the_tally() {
    let game = new_game(&[A, B], 0);
    game.register_votes(&Ballot::new(A, A, A)).unwrap();
    game.register_votes(&Ballot::new(B, A, B)).unwrap();
    assert!(game.is_voting_complete().unwrap());
    let sheet = game.score_question(1).unwrap();
    assert_eq!(sheet[0].votes_received, 3);
}

#[test]
fn advance_moves_the_counter_only_when_done() {
    let game = new_game(&[A, B, C], 0);
    play_reference_question(&game);
    game.remove_player(C).unwrap();
    game.add_player(C).unwrap();

    // C rejoined without a self-vote
    let progress = game.advance_if_question_done().unwrap();
    assert!(!progress.question_done);
    assert_eq!(game.current_question().unwrap(), 1);

    game.register_self_vote(C, SelfVote::LeastVoted).unwrap();
    let progress = game.advance_if_question_done().unwrap();
    assert!(progress.question_done);
    assert!(!progress.round_done);
    assert_eq!(game.current_question().unwrap(), 2);

    // nobody self-voted on question 2 yet
    assert!(!game.advance_if_question_done().unwrap().question_done);
    assert_eq!(game.current_question().unwrap(), 2);
}

#[test]
fn round_done_on_every_fourth_question() {
    let game = new_game(&[A, B, C], 0);
    for question in 1..=8 {
        play_reference_question(&game);
        let progress = game.advance_if_question_done().unwrap();
        assert!(progress.question_done);
        assert_eq!(progress.question, question);
        assert_eq!(progress.round_done, question % 4 == 0, "question {question}");
    }
    assert_eq!(game.status().unwrap().completed_rounds, 2);
}

#[test]
fn game_finishes_after_configured_rounds() {
    let store = QuestionStore::unshuffled(Vec::new());
    let config = GameConfig {
        rounds_per_game: Some(1),
        ..GameConfig::default()
    };
    let game = Game::new(config, Arc::new(store));
    for name in [A, B, C] {
        game.add_player(name).unwrap();
    }
    for _ in 0..3 {
        play_reference_question(&game);
        assert!(!game.advance_if_question_done().unwrap().game_finished);
    }
    play_reference_question(&game);
    let progress = game.advance_if_question_done().unwrap();
    assert!(progress.round_done && progress.game_finished);
    assert_eq!(game.status().unwrap().phase, Phase::Finished);
}

#[test]
fn reference_question_scores_three_one_three() {
    let game = new_game(&[A, B, C], 0);
    play_reference_question(&game);

    let sheet = game.score_question(1).unwrap();
    let by_name = |name: &str| sheet.iter().find(|e| e.player == name).unwrap().clone();
    assert_eq!(by_name(A).votes_received, 4);
    assert_eq!(by_name(B).votes_received, 2);
    assert_eq!(by_name(C).votes_received, 0);
    assert_eq!(by_name(A).points, 3);
    assert_eq!(by_name(B).points, 1);
    assert_eq!(by_name(C).points, 3);
}

#[test]
fn wrong_guess_scores_zero() {
    let game = new_game(&[A, B, C, "Player DDD"], 0);
    play_reference_question(&game);
    game.register_self_vote("Player DDD", SelfVote::MostVoted).unwrap();

    let sheet = game.score_question(1).unwrap();
    let d = sheet.iter().find(|e| e.player == "Player DDD").unwrap();
    assert_eq!(d.votes_received, 0);
    assert_eq!(d.points, 0);
}

#[test]
fn scoring_is_repeatable() {
    let game = new_game(&[A, B, C], 0);
    play_reference_question(&game);
    assert_eq!(game.score_question(1).unwrap(), game.score_question(1).unwrap());
    assert_eq!(game.score_range(1, 1).unwrap(), game.score_range(1, 1).unwrap());
}

#[test]
fn full_round_totals() {
    let game = new_game(&[A, B, C], 0);
    for _ in 0..4 {
        play_reference_question(&game);
        assert!(game.advance_if_question_done().unwrap().question_done);
    }
    assert_eq!(game.current_question().unwrap(), 5);

    let totals = game.score_range(1, 4).unwrap();
    assert_eq!(points_of(&totals, A), 12);
    assert_eq!(points_of(&totals, B), 4);
    assert_eq!(points_of(&totals, C), 12);
}

#[test]
fn invalid_ranges_are_empty() {
    let game = new_game(&[A, B, C], 0);
    play_reference_question(&game);
    assert!(game.score_range(3, 1).unwrap().is_empty());
    assert!(game.score_range(0, 0).unwrap().is_empty());
}

#[test]
fn universal_tie_lands_everyone_in_most_voted() {
    let game = new_game(&[A, B], 0);
    game.register_votes(&Ballot::new(A, B, A)).unwrap();
    game.register_votes(&Ballot::new(B, A, B)).unwrap();
    game.register_self_vote(A, SelfVote::MostVoted).unwrap();
    game.register_self_vote(B, SelfVote::LeastVoted).unwrap();
    let sheet = game.score_question(1).unwrap();
    assert_eq!(sheet[0].points, 3);
    assert_eq!(sheet[1].points, 0);
}

#[test]
fn question_blocks_never_repeat() {
    let game = new_game(&[A, B, C], 12);
    let mut seen = HashSet::new();
    for _ in 0..3 {
        let block = game.questions().expect("block");
        assert_eq!(block.len(), 4);
        // same block while the round is in progress
        assert_eq!(game.questions().unwrap(), block);
        for q in &block {
            assert!(seen.insert(q.id.clone()), "question {} repeated", q.id);
        }
        for _ in 0..4 {
            play_reference_question(&game);
            game.advance_if_question_done().unwrap();
        }
    }
}

#[test]
fn exhausted_catalog_fails_cleanly() {
    let game = new_game(&[A, B, C], 6);
    assert_eq!(game.questions().unwrap().len(), 4);
    for _ in 0..4 {
        play_reference_question(&game);
        game.advance_if_question_done().unwrap();
    }
    match game.questions() {
        Err(GameError::QuestionsExhausted(err)) => {
            assert_eq!(err.to_string(), "unable to find 4 questions, found 2");
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }

    // the game is over but the session keeps its players and scores
    let status = game.status().unwrap();
    assert_eq!(status.phase, Phase::Finished);
    assert_eq!(status.current_question, 5);
    assert_eq!(game.room_status().unwrap().players.len(), 3);
    assert!(!game.is_joinable().unwrap());
    assert_eq!(game.score_range(1, 4).unwrap().len(), 3);
    assert!(game.questions().is_err());
}

#[test]
fn custom_questions_are_served_first() {
    let game = new_game(&[A, B, C], 8);
    assert_eq!(game.add_custom_question("Who would survive a zombie attack?").unwrap(), 1);
    assert_eq!(game.add_custom_question("Who tells the best jokes?").unwrap(), 2);

    let block = game.questions().unwrap();
    assert_eq!(block[0].question.en, "Who would survive a zombie attack?");
    assert_eq!(block[1].question.no, "Who tells the best jokes?");
    assert_ne!(block[0].id, block[1].id);
    assert!(block[2].id.starts_with("q-"));
}

#[test]
fn custom_questions_survive_a_failed_block() {
    let game = new_game(&[A, B, C], 0);
    game.add_custom_question("Who is the night owl?").unwrap();
    assert!(game.questions().is_err());
    assert_eq!(game.add_custom_question("Who cooks best?").unwrap(), 2);
}

#[test]
fn leaving_mid_question_does_not_block_the_rest() {
    let game = new_game(&[A, B, C], 0);
    game.register_votes(&Ballot::new(A, B, C)).unwrap();
    game.register_votes(&Ballot::new(B, A, C)).unwrap();
    game.register_votes(&Ballot::new(C, A, B)).unwrap();
    game.register_self_vote(A, SelfVote::Neutral).unwrap();
    game.register_self_vote(B, SelfVote::Neutral).unwrap();
    game.remove_player(C).unwrap();

    let progress = game.advance_if_question_done().unwrap();
    assert!(progress.question_done);
    assert_eq!(game.current_question().unwrap(), 2);
}

#[test]
fn concurrent_self_votes_advance_exactly_once() {
    let names: Vec<String> = (0..16).map(|i| format!("p{i}")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let game = Arc::new(new_game(&refs, 0));

    let handles: Vec<_> = names
        .iter()
        .cloned()
        .map(|name| {
            let game = Arc::clone(&game);
            std::thread::spawn(move || {
                game.register_self_vote(&name, SelfVote::Neutral).unwrap();
                game.advance_if_question_done().unwrap().question_done
            })
        })
        .collect();

    let advanced = handles
        .into_iter()
        .map(|h| h.join().expect("join"))
        .filter(|done| *done)
        .count();
    assert_eq!(advanced, 1);
    assert_eq!(game.current_question().unwrap(), 2);
}
