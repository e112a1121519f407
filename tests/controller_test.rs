// Generation controller tests against scripted providers

mod common;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use common::*;
use futures::channel::mpsc;
use sitecraft::preview::{PreviewCompiler, PLACEHOLDER_MESSAGE};
use sitecraft::session::{
    ControllerOptions, FallbackPayload, GenerationController, GenerationError, GenerationRequest,
    GenerationSession, Phase, SessionOutcome, SessionStatus, WireFile,
};
use sitecraft::store::FileStore;

fn controller(provider: Arc<ScriptedProvider>) -> Arc<GenerationController> {
    Arc::new(GenerationController::new(
        provider,
        FileStore::new(),
        PreviewCompiler::default(),
        ControllerOptions::default(),
    ))
}

fn request() -> GenerationRequest {
    GenerationRequest::new("project-1", "workspace-1", "build a landing page")
}

async fn generate(
    controller: &GenerationController,
) -> (Result<SessionOutcome, GenerationError>, GenerationSession) {
    let mut session = GenerationSession::new("project-1", "build a landing page");
    let result = controller.generate(request(), Some("token"), &mut session).await;
    (result, session)
}

fn completed(outcome: SessionOutcome) -> sitecraft::session::CompletedGeneration {
    match outcome {
        SessionOutcome::Completed(done) => done,
        SessionOutcome::Cancelled => panic!("generation was cancelled"),
    }
}

#[tokio::test]
async fn test_full_stream_applies_files_in_order() {
    let provider = ScriptedProvider::new(vec![body(&[
        stage("context", "start"),
        stage("plan", "start"),
        stage("generate", "start"),
        create("src/App.tsx", APP),
        create("src/index.css", "body { margin: 0; }"),
        update("src/index.css", "body { margin: 4px; }"),
        complete("Built your page"),
    ])]);
    let ctrl = controller(provider);

    let (result, session) = generate(&ctrl).await;
    let done = completed(result.unwrap());

    assert!(!done.synthesized);
    assert_eq!(done.file_events, 3);
    assert_eq!(done.delta.written, vec!["src/App.tsx", "src/index.css"]);
    assert_eq!(
        ctrl.store().get_file("src/index.css").unwrap().content,
        "body { margin: 4px; }"
    );
    assert!(done.preview_html.contains(r#"<div class="p-4">"#));
    assert!(done.preview_html.contains("margin: 4px"));
    assert_eq!(ctrl.store().preview_html().as_deref(), Some(done.preview_html.as_str()));

    let phase = ctrl.phase();
    assert_eq!(phase.phase, Phase::Complete);
    assert_eq!(phase.progress, 100);
    assert_eq!(phase.message, "Built your page");

    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.files_generated, 3);
    assert_eq!(session.model_used.as_deref(), Some("test-model"));
    assert!(!ctrl.is_live());
}

#[tokio::test]
async fn test_event_split_across_chunks() {
    let full = [create("src/App.tsx", "const a = \"héllo ✓\";"), complete("done")].concat();
    let bytes = full.as_bytes();

    // split inside the multi-byte characters as well as between lines
    let split = full.find('✓').unwrap() + 1;
    let chunks = vec![
        Bytes::copy_from_slice(&bytes[..5]),
        Bytes::copy_from_slice(&bytes[5..split]),
        Bytes::copy_from_slice(&bytes[split..]),
    ];
    let ctrl = controller(ScriptedProvider::new(vec![Script::Chunks(chunks)]));

    let (result, _) = generate(&ctrl).await;
    completed(result.unwrap());
    assert_eq!(
        ctrl.store().get_file("src/App.tsx").unwrap().content,
        "const a = \"héllo ✓\";"
    );
}

#[tokio::test]
async fn test_malformed_frame_is_skipped() {
    let ctrl = controller(ScriptedProvider::new(vec![body(&[
        create("a.txt", "one"),
        "data: {\"type\": \"file\", \"command\": \n\n".to_string(),
        create("b.txt", "two"),
        complete("ok"),
    ])]));

    let (result, _) = generate(&ctrl).await;
    let done = completed(result.unwrap());

    assert_eq!(done.file_events, 2);
    assert_eq!(ctrl.store().paths(), vec!["a.txt", "b.txt"]);
}

#[tokio::test]
async fn test_truncated_stream_synthesizes_completion() {
    let ctrl = controller(ScriptedProvider::new(vec![body(&[
        stage("generate", "start"),
        create("src/App.tsx", APP),
        create("src/styles.css", "h1 { color: red; }"),
    ])]));

    let (result, session) = generate(&ctrl).await;
    let done = completed(result.unwrap());

    assert!(done.synthesized);
    assert_eq!(done.summary.files_generated, 2);
    assert_eq!(done.summary.file_paths, vec!["src/App.tsx", "src/styles.css"]);
    assert_eq!(ctrl.phase().phase, Phase::Complete);
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.files_generated, 2);
}

#[tokio::test]
async fn test_error_event_fails_session() {
    let ctrl = controller(ScriptedProvider::new(vec![body(&[
        create("a.txt", "kept"),
        error("Rate limit exceeded, try again later"),
        create("b.txt", "never applied"),
    ])]));

    let (result, session) = generate(&ctrl).await;
    let err = result.unwrap_err();

    assert!(matches!(err, GenerationError::RateLimited { .. }));
    assert!(err.is_retryable());
    assert_eq!(ctrl.phase().phase, Phase::Error);
    assert_eq!(session.status, SessionStatus::Failed);
    assert!(ctrl.store().contains("a.txt"));
    assert!(!ctrl.store().contains("b.txt"));
}

#[tokio::test]
async fn test_quota_error_from_transport() {
    let ctrl = controller(ScriptedProvider::new(vec![Script::Fail(GenerationError::classify(
        Some(402),
        "Out of credits",
        None,
    ))]));

    let (result, session) = generate(&ctrl).await;
    let err = result.unwrap_err();

    assert!(matches!(err, GenerationError::QuotaExceeded { .. }));
    assert!(!err.is_retryable());
    assert_eq!(session.status, SessionStatus::Failed);
    assert!(ctrl.store().is_empty());
}

#[tokio::test]
async fn test_preconditions_checked_before_network() {
    let provider = ScriptedProvider::new(vec![]);
    let ctrl = controller(provider.clone());

    let mut session = GenerationSession::new("project-1", "hi");
    let err = ctrl.generate(request(), None, &mut session).await.unwrap_err();
    assert_eq!(err, GenerationError::NotAuthenticated);

    let no_workspace = GenerationRequest::new("project-1", "  ", "hi");
    let err = ctrl
        .generate(no_workspace, Some("token"), &mut session)
        .await
        .unwrap_err();
    assert_eq!(err, GenerationError::NoWorkspace);
    assert!(err.is_precondition());

    assert_eq!(provider.opened(), 0);
    assert_eq!(ctrl.phase().phase, Phase::Idle);
}

#[tokio::test]
async fn test_json_fallback_applies_files() {
    let payload = FallbackPayload {
        files: vec![
            WireFile {
                path: "/src/App.tsx".to_string(),
                content: APP.to_string(),
            },
            WireFile {
                path: "./README.md".to_string(),
                content: "# Site".to_string(),
            },
        ],
        ai_message: Some("Here you go".to_string()),
        ..FallbackPayload::default()
    };
    let ctrl = controller(ScriptedProvider::new(vec![Script::Json(payload)]));

    let (result, session) = generate(&ctrl).await;
    let done = completed(result.unwrap());

    assert_eq!(ctrl.store().paths(), vec!["README.md", "src/App.tsx"]);
    assert_eq!(done.summary.files_generated, 2);
    assert_eq!(done.summary.ai_message.as_deref(), Some("Here you go"));
    assert!(done.preview_html.contains("<h1>Hello</h1>"));
    assert_eq!(session.files_generated, 2);
}

#[tokio::test]
async fn test_patch_and_delete_events() {
    let ctrl = controller(ScriptedProvider::new(vec![body(&[
        create("src/App.tsx", APP),
        create("old.txt", "bye"),
        patch("src/App.tsx", "<h1>Hello</h1>", "<h1>Patched</h1>"),
        patch("src/App.tsx", "not in the file", "ignored"),
        patch("missing.tsx", "a", "b"),
        delete("old.txt"),
        complete("ok"),
    ])]));

    let (result, _) = generate(&ctrl).await;
    let done = completed(result.unwrap());

    assert!(ctrl
        .store()
        .get_file("src/App.tsx")
        .unwrap()
        .content
        .contains("<h1>Patched</h1>"));
    assert!(!ctrl.store().contains("old.txt"));
    assert!(!ctrl.store().contains("missing.tsx"));
    assert_eq!(done.delta.written, vec!["src/App.tsx"]);
    assert_eq!(done.delta.deleted, vec!["old.txt"]);
}

#[tokio::test]
async fn test_cancel_mid_stream_stops_mutation() {
    let (tx, rx) = mpsc::unbounded();
    let provider = ScriptedProvider::new(vec![Script::Channel(rx)]);
    let ctrl = controller(provider);

    let task = {
        let ctrl = ctrl.clone();
        tokio::spawn(async move { generate(&ctrl).await })
    };

    tx.unbounded_send(Ok(Bytes::from(create("first.txt", "1")))).unwrap();

    let store = ctrl.store().clone();
    let mut revisions = store.subscribe();
    tokio::time::timeout(Duration::from_secs(5), async {
        while !store.contains("first.txt") {
            revisions.changed().await.unwrap();
        }
    })
    .await
    .unwrap();

    assert!(ctrl.cancel());
    let _ = tx.unbounded_send(Ok(Bytes::from(create("second.txt", "2"))));

    let (result, session) = task.await.unwrap();
    assert!(matches!(result.unwrap(), SessionOutcome::Cancelled));
    assert_eq!(session.status, SessionStatus::Failed);
    assert_eq!(session.error.as_deref(), Some("cancelled"));

    assert!(store.contains("first.txt"));
    assert!(!store.contains("second.txt"));
    assert_eq!(ctrl.phase().phase, Phase::Idle);
    assert!(!ctrl.is_live());
    assert!(!ctrl.cancel());
}

#[tokio::test]
async fn test_cancel_and_wait_returns_after_release() {
    let (tx, rx) = mpsc::unbounded();
    let provider = ScriptedProvider::new(vec![Script::Channel(rx)]);
    let ctrl = controller(provider.clone());

    let task = {
        let ctrl = ctrl.clone();
        tokio::spawn(async move { generate(&ctrl).await })
    };
    provider.wait_opened(1).await;

    assert!(ctrl.cancel_and_wait().await);
    // the generation has already wound down, no yield needed
    assert!(!ctrl.is_live());
    assert_eq!(ctrl.phase().phase, Phase::Idle);

    let _ = tx.unbounded_send(Ok(Bytes::from(create("late.txt", "x"))));
    assert!(!ctrl.store().contains("late.txt"));

    let (result, session) = task.await.unwrap();
    assert!(matches!(result.unwrap(), SessionOutcome::Cancelled));
    assert_eq!(session.status, SessionStatus::Failed);

    assert!(!ctrl.cancel_and_wait().await);
}

#[tokio::test]
async fn test_new_generation_cancels_previous() {
    let (_tx, rx) = mpsc::unbounded();
    let provider = ScriptedProvider::new(vec![Script::Channel(rx)]);
    let ctrl = controller(provider.clone());

    let first = {
        let ctrl = ctrl.clone();
        tokio::spawn(async move { generate(&ctrl).await })
    };
    provider.wait_opened(1).await;

    provider.push(body(&[create("second.txt", "2"), complete("second done")]));
    let (second, _) = generate(&ctrl).await;

    let (first, first_session) = first.await.unwrap();
    assert!(matches!(first.unwrap(), SessionOutcome::Cancelled));
    assert_eq!(first_session.status, SessionStatus::Failed);

    let done = completed(second.unwrap());
    assert_eq!(done.delta.written, vec!["second.txt"]);
    assert_eq!(ctrl.phase().phase, Phase::Complete);
    assert_eq!(provider.opened(), 2);
}

#[tokio::test]
async fn test_preview_never_empty() {
    let ctrl = controller(ScriptedProvider::new(vec![body(&[
        create("src/App.tsx", "export default function App() { return null; }"),
        complete("ok"),
    ])]));

    let (result, _) = generate(&ctrl).await;
    let done = completed(result.unwrap());

    assert!(done.preview_html.starts_with("<!DOCTYPE html>"));
    assert!(done.preview_html.contains(PLACEHOLDER_MESSAGE));
}
