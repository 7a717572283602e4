use std::sync::Arc;

use recall_core::model::{
    FlashcardDraft, FlashcardId, SessionPhase, SessionStateError, StudyResponse,
};
use recall_core::time::{fixed_clock, fixed_now};
use services::{SessionError, SessionOrchestrator};
use storage::repository::{FlashcardRepository, InMemoryRepository};

fn id(raw: &str) -> FlashcardId {
    FlashcardId::parse(raw).unwrap()
}

fn response(raw: &str, is_correct: bool) -> StudyResponse {
    StudyResponse::new(id(raw), is_correct, 2.0, fixed_now()).unwrap()
}

async fn setup(ids: &[&str]) -> (SessionOrchestrator, InMemoryRepository) {
    let repo = InMemoryRepository::new();
    for raw in ids {
        let card = FlashcardDraft::new(format!("front {raw}"), format!("back {raw}"))
            .validate(fixed_now())
            .unwrap()
            .assign_id(id(raw));
        repo.insert_flashcard(&card).await.unwrap();
    }
    let orchestrator = SessionOrchestrator::new(fixed_clock(), Arc::new(repo.clone()));
    (orchestrator, repo)
}

#[tokio::test]
async fn happy_path_advances_and_counts_correct() {
    let (orch, _repo) = setup(&["A", "B", "C"]).await;
    let mut session = orch.start_session().await.unwrap();

    let current = orch.current_flashcard(&session).await.unwrap().unwrap();
    assert_eq!(current.id(), &id("A"));
    assert_eq!(current.front().as_str(), "front A");

    orch.submit_response(&mut session, response("A", true)).unwrap();
    assert_eq!(session.cursor(), 1);
    assert_eq!(session.current_flashcard_id(), Some(&id("B")));
    assert_eq!(orch.progress(&session).correct_count, 1);
}

#[tokio::test]
async fn navigation_does_not_record_responses() {
    let (orch, _repo) = setup(&["A", "B"]).await;
    let mut session = orch.start_session().await.unwrap();

    orch.navigate_forward(&mut session);
    assert_eq!(session.current_flashcard_id(), Some(&id("B")));
    orch.navigate_back(&mut session).unwrap();
    assert_eq!(session.current_flashcard_id(), Some(&id("A")));
    assert!(session.responses().is_empty());
}

#[tokio::test]
async fn exhaustion_then_completion() {
    let (orch, _repo) = setup(&["A"]).await;
    let mut session = orch.start_session().await.unwrap();

    orch.submit_response(&mut session, response("A", true)).unwrap();
    assert!(session.is_complete());
    assert_eq!(session.phase(), SessionPhase::Exhausted);
    assert!(orch.current_flashcard(&session).await.unwrap().is_none());

    orch.complete_session(&mut session);
    assert!(!session.is_active());
    assert_eq!(session.completed_at(), Some(fixed_now()));
    assert_eq!(session.phase(), SessionPhase::Completed);
}

#[tokio::test]
async fn mismatched_response_is_rejected_without_side_effects() {
    let (orch, _repo) = setup(&["A", "B"]).await;
    let mut session = orch.start_session().await.unwrap();

    let err = orch
        .submit_response(&mut session, response("B", true))
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::State(SessionStateError::MismatchedResponse { ref expected, ref actual })
            if expected == &id("A") && actual == &id("B")
    ));
    assert!(err.is_client_error());
    assert_eq!(session.cursor(), 0);
    assert!(session.responses().is_empty());
}

#[tokio::test]
async fn empty_collection_cannot_start() {
    let (orch, _repo) = setup(&[]).await;
    let err = orch.start_session().await.unwrap_err();
    assert!(matches!(err, SessionError::NoFlashcardsAvailable));
}

#[tokio::test]
async fn session_keeps_repository_order() {
    let (orch, _repo) = setup(&["C", "A", "B"]).await;
    let session = orch.start_session().await.unwrap();
    assert_eq!(session.card_sequence(), &[id("C"), id("A"), id("B")]);
}

#[tokio::test]
async fn deleted_card_surfaces_as_dangling_reference() {
    let (orch, repo) = setup(&["A", "B"]).await;
    let session = orch.start_session().await.unwrap();

    repo.delete_flashcard(&id("A")).await.unwrap();
    let err = orch.current_flashcard(&session).await.unwrap_err();
    assert!(matches!(err, SessionError::DanglingReference(ref missing) if missing == &id("A")));
    assert!(!err.is_client_error());
}

#[tokio::test]
async fn submitting_past_the_end_fails() {
    let (orch, _repo) = setup(&["A"]).await;
    let mut session = orch.start_session().await.unwrap();
    orch.submit_response(&mut session, response("A", false)).unwrap();

    let err = orch
        .submit_response(&mut session, response("A", true))
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::State(SessionStateError::SessionComplete)
    ));
    assert_eq!(session.responses().len(), 1);
}

#[tokio::test]
async fn reviewing_backwards_keeps_earlier_answers() {
    let (orch, _repo) = setup(&["A", "B"]).await;
    let mut session = orch.start_session().await.unwrap();

    orch.submit_response(&mut session, response("A", false)).unwrap();
    orch.navigate_back(&mut session).unwrap();
    let earlier = session.response_for(&id("A")).unwrap();
    assert!(!earlier.is_correct());

    orch.submit_response(&mut session, response("A", true)).unwrap();
    let progress = orch.progress(&session);
    assert_eq!(progress.completed_count, 2);
    assert_eq!(progress.correct_count, 1);
    assert!((progress.accuracy_percent - 50.0).abs() < f64::EPSILON);
}
