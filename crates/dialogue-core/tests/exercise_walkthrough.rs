use std::sync::Arc;

use contracts::{Speaker, Stage};
use dialogue_core::{CapabilityToken, Catalog, Session, SteppedClock};

fn run_full_exercise() -> Session {
    let catalog = Arc::new(Catalog::builtin().expect("builtin catalog"));
    let mut session = Session::new("walkthrough", catalog)
        .with_clock(SteppedClock::default())
        .with_credential(CapabilityToken::new("token"));

    session.advance();
    session.submit_text("I'm ready.");
    session.advance();
    for message in [
        "Hi Sam, thanks for making time.",
        "We'd bring our own nurses, so your officers only escort.",
        "The county health budget covers the vaccine cost.",
        "Data from other jails shows fewer sick days.",
        "Could we start with one housing unit instead?",
    ] {
        session.submit_text(message);
    }
    session.submit_text("Sam kept moving the goalposts.");
    session.advance();
    session
}

#[test]
fn full_exercise_produces_expected_speaker_order() {
    let session = run_full_exercise();
    assert_eq!(session.stage(), Stage::End);

    let speakers = session
        .turns()
        .iter()
        .map(|turn| turn.speaker)
        .collect::<Vec<_>>();
    let mut expected = vec![
        Speaker::Narrator,
        Speaker::Trainee,
        Speaker::Narrator,
        Speaker::Narrator,
        Speaker::Antagonist,
    ];
    for _ in 0..5 {
        expected.extend([Speaker::Trainee, Speaker::Antagonist]);
    }
    expected.extend([
        Speaker::Antagonist,
        Speaker::Narrator,
        Speaker::Trainee,
        Speaker::Narrator,
    ]);
    assert_eq!(speakers, expected);
}

#[test]
fn replies_follow_first_match_and_shared_rotation() {
    let session = run_full_exercise();
    let bank = session.catalog().bank();
    let replies = session
        .turns()
        .iter()
        .filter(|turn| turn.speaker == Speaker::Antagonist)
        .map(|turn| turn.text.as_str())
        .collect::<Vec<_>>();

    let line = |category: &str, index: usize| bank.category(category).expect("category").lines()[index].as_str();
    assert_eq!(replies[0], bank.opening_line());
    assert_eq!(replies[1], line("opening", 0));
    assert_eq!(replies[2], line("staffing", 1));
    assert_eq!(replies[3], line("budget", 0));
    assert_eq!(replies[4], line("evidence", 1));
    assert_eq!(replies[5], line("opening", 1));
    assert_eq!(replies[6], session.catalog().sign_off());
}

#[test]
fn identical_runs_render_identical_transcripts() {
    let first = run_full_exercise();
    let second = run_full_exercise();
    assert_eq!(first.turns(), second.turns());
    assert_eq!(first.transcript_markdown(), second.transcript_markdown());
    assert!(first.transcript_markdown().starts_with("**Noa**: Hello, I'm Noa Martinez"));
}
