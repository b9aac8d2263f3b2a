use concentration_core::ai::{MoveReason, Policy, PolicyContext, RandomPolicy, RecallMemory};
use concentration_core::game::engine::Phase;
use concentration_core::model::board::Board;
use concentration_core::model::card::CardState;
use concentration_core::model::owner::Owner;
use concentration_core::{GameError, GameSession, SessionConfig, SessionSnapshot};
use rand::SeedableRng;
use rand::rngs::StdRng;

const MAX_STEPS: usize = 10_000;

fn revealed_unmatched(snapshot: &SessionSnapshot) -> usize {
    snapshot
        .cards
        .iter()
        .filter(|card| card.state == CardState::Revealed)
        .count()
}

/// Plays the human seat with blind guesses until the board is cleared,
/// checking invariants after every call.
fn play_out(session: &mut GameSession, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let blank = RecallMemory::new(0);

    for _ in 0..MAX_STEPS {
        let snapshot = session.snapshot();
        assert!(revealed_unmatched(&snapshot) <= 2);

        match snapshot.phase {
            Phase::Finished => {
                assert!(session.board().is_complete());
                return;
            }
            Phase::Resolving => {
                let owner_before = snapshot.current_owner;
                let turns_before = snapshot.turns_taken;
                let after = session.resolve_mismatch().unwrap();
                assert_eq!(after.turns_taken, turns_before + 1);
                if owner_before == Owner::Ai {
                    assert_eq!(after.current_owner, Owner::Player);
                } else {
                    // The AI has already answered; it holds the turn or finished it.
                    assert_eq!(after.current_owner, Owner::Ai);
                }
            }
            Phase::AwaitingFirstFlip | Phase::AwaitingSecondFlip => {
                assert_eq!(snapshot.current_owner, Owner::Player);
                let chosen = {
                    let ctx = PolicyContext {
                        board: session.board(),
                        memory: &blank,
                    };
                    RandomPolicy.choose_move(&ctx, &mut rng).unwrap()
                };
                let first = session.request_flip(Owner::Player, chosen.first).unwrap();
                assert_eq!(first.phase, Phase::AwaitingSecondFlip);
                let pairs_before = first.pairs.player;
                let second = session.request_flip(Owner::Player, chosen.second).unwrap();
                assert!(revealed_unmatched(&second) <= 2);
                if second.pairs.player > pairs_before {
                    assert_eq!(second.current_owner, Owner::Player);
                } else {
                    assert_eq!(second.phase, Phase::Resolving);
                    assert_eq!(second.current_owner, Owner::Player);
                }
            }
        }
        assert!(session.memory().len() <= session.memory().capacity());
    }
    panic!("game did not finish within {MAX_STEPS} steps");
}

#[test]
fn random_games_preserve_invariants_and_finish() {
    for seed in 0..24 {
        let config = SessionConfig {
            rows: 4,
            cols: 4,
            starting_owner: if seed % 2 == 0 { Owner::Player } else { Owner::Ai },
            ai_memory_capacity: (seed % 6) as usize * 3,
        };
        let mut session = GameSession::with_seed(config, seed).unwrap();
        play_out(&mut session, seed + 1000);

        let summary = session.summary().expect("finished game has a summary");
        assert_eq!(summary.player_pairs + summary.ai_pairs, 8);
        assert_eq!(session.scores().total_pairs(), 8);
    }
}

#[test]
fn human_mismatch_hands_turn_to_ai() {
    // 0:A 1:B ... 5:A
    let values = vec![0, 1, 2, 3, 4, 0, 5, 6, 7, 1, 2, 3, 4, 5, 6, 7];
    let board = Board::from_values(4, 4, values).unwrap();
    let mut session =
        GameSession::with_board(board, Owner::Player, 16, StdRng::seed_from_u64(5)).unwrap();

    session.request_flip(Owner::Player, 0).unwrap();
    let snapshot = session.request_flip(Owner::Player, 1).unwrap();
    assert_eq!(snapshot.phase, Phase::Resolving);
    assert_eq!(snapshot.current_owner, Owner::Player);

    let snapshot = session.resolve_mismatch().unwrap();
    assert_eq!(snapshot.current_owner, Owner::Ai);
    assert_eq!(snapshot.turns_taken, 1);

    // Position 0 is remembered and its twin at 5 is not, so the AI leads
    // with 0 and guesses the second card blind.
    let decisions = session.decisions();
    assert!(decisions.known_single >= 1);
    assert_eq!(decisions.known_pair, 0);
    assert_ne!(snapshot.cards[0].state, CardState::Hidden);
    let expected = if snapshot.phase == Phase::Finished {
        GameError::GameOver
    } else {
        GameError::NotYourTurn {
            expected: Owner::Ai,
            actual: Owner::Player,
        }
    };
    assert_eq!(session.request_flip(Owner::Player, 2), Err(expected));
}

#[test]
fn ai_leads_with_a_remembered_single() {
    let values = vec![0, 1, 2, 0, 3, 1, 2, 3];
    let board = Board::from_values(2, 4, values).unwrap();
    let mut session =
        GameSession::with_board(board, Owner::Player, 8, StdRng::seed_from_u64(11)).unwrap();

    session.request_flip(Owner::Player, 0).unwrap();
    session.request_flip(Owner::Player, 1).unwrap();
    let snapshot = session.resolve_mismatch().unwrap();

    // 0 is the oldest remembered card without a known twin, so it is the
    // AI's first flip and is face up or taken now.
    assert!(matches!(
        snapshot.cards[0].state,
        CardState::Revealed | CardState::Matched
    ));
    assert!(session.memory().len() <= 8);
    let ai_pairs_first_turn = session.scores().pairs(Owner::Ai);
    assert!(ai_pairs_first_turn <= 4);
    assert!(session.decisions().known_single >= 1);
}

#[test]
fn last_pair_flip_finishes_the_game() {
    let board = Board::from_values(2, 2, vec![0, 1, 1, 0]).unwrap();
    let mut session =
        GameSession::with_board(board, Owner::Player, 4, StdRng::seed_from_u64(0)).unwrap();

    session.request_flip(Owner::Player, 1).unwrap();
    let snapshot = session.request_flip(Owner::Player, 2).unwrap();
    assert_eq!(snapshot.pairs.player, 1);
    assert_eq!(snapshot.phase, Phase::AwaitingFirstFlip);

    session.request_flip(Owner::Player, 3).unwrap();
    let snapshot = session.request_flip(Owner::Player, 0).unwrap();
    assert_eq!(snapshot.phase, Phase::Finished);
    assert!(session.board().is_complete());
    assert_eq!(snapshot.pairs.player, 2);
    assert_eq!(snapshot.turns_taken, 0);
}

#[test]
fn rejected_flips_leave_state_untouched() {
    let mut session = GameSession::with_seed(SessionConfig::default(), 99).unwrap();
    let before = session.snapshot();

    assert!(matches!(
        session.request_flip(Owner::Player, 16),
        Err(GameError::InvalidIndex { index: 16, len: 16 })
    ));
    assert!(matches!(
        session.request_flip(Owner::Ai, 0),
        Err(GameError::NotYourTurn { .. })
    ));
    assert!(matches!(
        session.resolve_mismatch(),
        Err(GameError::IllegalState { .. })
    ));
    assert_eq!(session.snapshot(), before);

    session.request_flip(Owner::Player, 4).unwrap();
    let mid = session.snapshot();
    assert!(matches!(
        session.request_flip(Owner::Player, 4),
        Err(GameError::IllegalState { .. })
    ));
    assert_eq!(session.snapshot(), mid);
}

#[test]
fn memory_capacity_bounds_ai_recall() {
    let config = SessionConfig {
        ai_memory_capacity: 2,
        ..SessionConfig::default()
    };
    let mut session = GameSession::with_seed(config, 17).unwrap();
    let mut rng = StdRng::seed_from_u64(4);
    let blank = RecallMemory::new(0);

    for _ in 0..50 {
        match session.phase() {
            Phase::Finished => break,
            Phase::Resolving => {
                session.resolve_mismatch().unwrap();
            }
            _ => {
                let chosen = RandomPolicy
                    .choose_move(
                        &PolicyContext {
                            board: session.board(),
                            memory: &blank,
                        },
                        &mut rng,
                    )
                    .unwrap();
                assert_eq!(chosen.reason, MoveReason::Random);
                session.request_flip(Owner::Player, chosen.first).unwrap();
                session.request_flip(Owner::Player, chosen.second).unwrap();
            }
        }
        assert!(session.memory().len() <= 2);
    }
}
