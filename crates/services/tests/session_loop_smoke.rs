use std::sync::Arc;
use std::time::Duration;

use flashdeck_core::model::{CardDraft, DeckDraft, DeckFormat, DeckId, FaceSegment};
use flashdeck_core::time::fixed_now;
use services::{
    Direction, ManualScheduler, OrderMode, SessionConfig, SessionPhase, StudyLoopService,
    TokioTickScheduler,
};
use storage::repository::{DeckRepository, InMemoryRepository};

async fn seeded_repo() -> (InMemoryRepository, DeckId) {
    let repo = InMemoryRepository::new();
    let deck = DeckDraft::new("Geography")
        .with_format(DeckFormat::Cloze)
        .with_cards(vec![
            CardDraft::new(30, "The capital of Spain is ___.", "Madrid"),
            CardDraft::new(10, "The capital of France is ___", "Paris"),
            CardDraft::new(20, "What is the capital of Italy?", "Rome"),
        ])
        .assign_id(DeckId::new(1), fixed_now())
        .unwrap();
    repo.upsert_deck(&deck).await.unwrap();
    (repo, deck.id())
}

#[tokio::test]
async fn ordered_session_runs_to_finish() {
    let (repo, deck_id) = seeded_repo().await;
    let loop_svc = StudyLoopService::new(Arc::new(repo));

    let mut session = loop_svc
        .start_session(deck_id, SessionConfig::default(), ManualScheduler::new())
        .await
        .unwrap();

    session.reveal();
    let view = session.view();
    assert_eq!(view.progress.percent, 33);
    assert_eq!(
        view.answer.unwrap().segments(),
        &[
            FaceSegment::Text("The capital of France is ".into()),
            FaceSegment::Filled("Paris".into()),
        ]
    );

    session.advance(Direction::Next);
    session.reveal();
    assert_eq!(
        session.view().answer.unwrap().to_string(),
        "What is the capital of Italy? (Rome)"
    );

    session.advance(Direction::Next);
    session.finish();
    assert_eq!(session.phase(), SessionPhase::InProgress);

    session.reveal();
    assert!(session.view().controls.finish);
    session.finish();
    assert_eq!(session.phase(), SessionPhase::Finished);
}

#[tokio::test]
async fn timed_session_auto_reveals() {
    let (repo, deck_id) = seeded_repo().await;
    let loop_svc = StudyLoopService::new(Arc::new(repo));
    let config = SessionConfig::new(OrderMode::Random, true, 5).unwrap();

    let mut session = loop_svc
        .start_session(deck_id, config, ManualScheduler::new())
        .await
        .unwrap();

    for _ in 0..5 {
        for token in session.scheduler_mut().advance(Duration::from_secs(1)) {
            session.on_tick(token);
        }
    }

    let view = session.view();
    assert!(view.revealed);
    assert_eq!(view.remaining_secs, Some(0));
    assert!(view.answer.is_some());
}

#[tokio::test(start_paused = true)]
async fn tokio_scheduler_drives_countdown() {
    let (repo, deck_id) = seeded_repo().await;
    let loop_svc = StudyLoopService::new(Arc::new(repo));
    let config = SessionConfig::new(OrderMode::Ordered, true, 5).unwrap();
    let (scheduler, mut ticks) = TokioTickScheduler::channel();

    let mut session = loop_svc
        .start_session(deck_id, config, scheduler)
        .await
        .unwrap();

    while !session.is_revealed() {
        let token = ticks.recv().await.unwrap();
        session.on_tick(token);
    }
    assert_eq!(session.remaining_secs(), Some(0));
    assert!(!session.timer_armed());

    session.restart();
    let silent = tokio::time::timeout(Duration::from_secs(10), ticks.recv()).await;
    assert!(silent.is_err());
}
