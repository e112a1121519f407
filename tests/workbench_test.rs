// End-to-end flows: generate, save, version, restore, recover

mod common;

use std::sync::Arc;

use common::*;
use sitecraft::core::{RunError, RunOutcome, Workbench};
use sitecraft::db::{Database, FileRepository, Project};
use sitecraft::preview::PreviewCompiler;
use sitecraft::reconcile::ReconcileError;
use sitecraft::session::{
    ControllerOptions, GenerationError, GenerationSession, SessionStatus,
};
use sitecraft::store::ProjectFile;

fn workbench(db: Database, provider: Arc<ScriptedProvider>) -> Workbench {
    Workbench::new(
        db,
        provider,
        PreviewCompiler::default(),
        ControllerOptions::default(),
        20,
    )
}

async fn new_project(bench: &Workbench) -> Project {
    let project = bench
        .projects
        .create("Landing".to_string(), Some("ws-1".to_string()), None)
        .await
        .unwrap();
    bench.open_project(&project.id).await.unwrap()
}

async fn run(bench: &Workbench, project: &Project, prompt: &str) -> i64 {
    let report = bench
        .run_generation(project, prompt, Some("token"))
        .await
        .unwrap();
    match report.outcome {
        RunOutcome::Completed { version, .. } => version.unwrap().version_number,
        RunOutcome::Cancelled => panic!("unexpected cancel"),
    }
}

#[tokio::test]
async fn test_generation_saves_files_and_version() {
    let (db, _temp) = create_test_db();
    let provider = ScriptedProvider::new(vec![body(&[
        create("src/App.tsx", APP),
        create("src/index.css", "body { margin: 0; }"),
        complete("Built it"),
    ])]);
    let bench = workbench(db.clone(), provider);
    let project = new_project(&bench).await;

    let report = bench
        .run_generation(&project, "make a landing page", Some("token"))
        .await
        .unwrap();
    assert_eq!(report.session.status, SessionStatus::Completed);

    let RunOutcome::Completed { saved, version, generation } = report.outcome else {
        panic!("expected completion");
    };
    assert_eq!(saved.saved.inserted, 2);
    let version = version.unwrap();
    assert_eq!(version.version_number, 1);
    assert_eq!(version.files.len(), 2);
    assert_eq!(version.label.as_deref(), Some("make a landing page"));

    let records = FileRepository::new(db.clone()).list("ws-1").await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].file_path, "src/App.tsx");
    assert_eq!(records[0].file_type.as_str(), "component");
    assert_eq!(records[1].file_type.as_str(), "style");

    let stored = bench.projects.get(&project.id).await.unwrap().unwrap();
    assert_eq!(stored.preview_html.as_deref(), Some(generation.preview_html.as_str()));

    let row = bench.sessions.get(&report.session.id).await.unwrap().unwrap();
    assert_eq!(row.status, SessionStatus::Completed);
    assert_eq!(row.files_generated, 2);

    let messages = bench.messages.list(&project.id).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, "user");
    assert_eq!(messages[1].content, "Built it");
}

#[tokio::test]
async fn test_history_and_files_sent_with_request() {
    let (db, _temp) = create_test_db();
    let provider = ScriptedProvider::new(vec![
        body(&[create("a.txt", "1"), complete("first reply")]),
        body(&[complete("second reply")]),
    ]);
    let bench = workbench(db, provider.clone());
    let project = new_project(&bench).await;

    run(&bench, &project, "first").await;
    run(&bench, &project, "second").await;

    let requests = provider.requests();
    assert!(requests[0].conversation_history.is_empty());
    assert_eq!(requests[1].conversation_history.len(), 2);
    assert_eq!(requests[1].conversation_history[1].content, "first reply");
    assert_eq!(requests[1].existing_files.len(), 1);
    assert_eq!(requests[1].existing_files[0].path, "a.txt");
}

#[tokio::test]
async fn test_version_numbers_increase() {
    let (db, _temp) = create_test_db();
    let provider = ScriptedProvider::new(vec![
        body(&[create("a.txt", "1"), complete("ok")]),
        body(&[update("a.txt", "2"), complete("ok")]),
        body(&[update("a.txt", "3"), complete("ok")]),
    ]);
    let bench = workbench(db, provider);
    let project = new_project(&bench).await;

    let mut numbers = Vec::new();
    for prompt in ["one", "two", "three"] {
        numbers.push(run(&bench, &project, prompt).await);
    }
    assert_eq!(numbers, vec![1, 2, 3]);

    let listed = bench.reconciler.versions().list(&project.id).await.unwrap();
    let listed: Vec<i64> = listed.iter().map(|v| v.version_number).collect();
    assert_eq!(listed, vec![3, 2, 1]);
}

#[tokio::test]
async fn test_restore_earlier_version() {
    let (db, _temp) = create_test_db();
    let provider = ScriptedProvider::new(vec![
        body(&[create("src/App.tsx", APP), create("a.txt", "v1"), complete("ok")]),
        body(&[update("a.txt", "v2"), create("b.txt", "new"), complete("ok")]),
        body(&[delete("src/App.tsx"), update("a.txt", "v3"), complete("ok")]),
    ]);
    let bench = workbench(db.clone(), provider);
    let project = new_project(&bench).await;

    run(&bench, &project, "one").await;
    run(&bench, &project, "two").await;
    run(&bench, &project, "three").await;
    assert_eq!(bench.store.paths(), vec!["a.txt", "b.txt"]);

    let report = bench.restore(&project, 1, true).await.unwrap();
    assert_eq!(report.version_number, 1);
    assert_eq!(report.backup, Some(4));

    assert_eq!(bench.store.paths(), vec!["a.txt", "src/App.tsx"]);
    assert_eq!(bench.store.get_file("a.txt").unwrap().content, "v1");

    let saved: Vec<(String, String)> = FileRepository::new(db.clone())
        .list("ws-1")
        .await
        .unwrap()
        .into_iter()
        .map(|r| (r.file_path, r.content))
        .collect();
    assert_eq!(
        saved,
        vec![
            ("a.txt".to_string(), "v1".to_string()),
            ("src/App.tsx".to_string(), APP.to_string()),
        ]
    );

    let backup = bench.reconciler.versions().get(&project.id, 4).await.unwrap().unwrap();
    assert_eq!(backup.label.as_deref(), Some("Backup before restoring v1"));
    assert_eq!(backup.files.len(), 2);

    // reopening reads what restore persisted
    bench.open_project(&project.id).await.unwrap();
    assert_eq!(bench.store.get_file("a.txt").unwrap().content, "v1");
}

#[tokio::test]
async fn test_restore_missing_version_leaves_store() {
    let (db, _temp) = create_test_db();
    let provider = ScriptedProvider::new(vec![body(&[create("a.txt", "keep"), complete("ok")])]);
    let bench = workbench(db, provider);
    let project = new_project(&bench).await;
    run(&bench, &project, "one").await;

    let err = bench.restore(&project, 7, true).await.unwrap_err();
    assert!(matches!(err, ReconcileError::VersionNotFound { version: 7, .. }));
    assert_eq!(bench.store.get_file("a.txt").unwrap().content, "keep");

    // no backup is taken for a version that does not exist
    let versions = bench.reconciler.versions().list(&project.id).await.unwrap();
    assert_eq!(versions.len(), 1);
}

#[tokio::test]
async fn test_restore_rebuilds_missing_preview() {
    let (db, _temp) = create_test_db();
    let provider = ScriptedProvider::new(vec![body(&[
        update(
            "src/App.tsx",
            "export default function App() { return (<main>SECOND</main>); }",
        ),
        complete("ok"),
    ])]);
    let bench = workbench(db, provider);
    let project = new_project(&bench).await;

    let first = bench
        .reconciler
        .create_version(
            &project.id,
            &[ProjectFile::new(
                "src/App.tsx",
                "export default function App() { return (<main>FIRST</main>); }",
            )],
            None,
            None,
        )
        .await
        .unwrap();
    assert_eq!(first.version_number, 1);

    run(&bench, &project, "second").await;
    assert!(bench.store.preview_html().unwrap().contains("SECOND"));

    bench.restore(&project, 1, false).await.unwrap();

    let live = bench.store.preview_html().unwrap();
    assert!(live.contains("FIRST"));
    assert!(!live.contains("SECOND"));

    let stored = bench.projects.get(&project.id).await.unwrap().unwrap();
    let cached = stored.preview_html.unwrap();
    assert!(cached.contains("FIRST"));
    assert!(!cached.contains("SECOND"));
}

#[tokio::test]
async fn test_failed_restore_rolls_back_live_state() {
    let (db, _temp) = create_test_db();
    let provider = ScriptedProvider::new(vec![
        body(&[create("src/App.tsx", APP), create("a.txt", "one"), complete("ok")]),
        body(&[update("a.txt", "two"), create("b.txt", "new"), complete("ok")]),
    ]);
    let bench = workbench(db.clone(), provider);
    let project = new_project(&bench).await;
    run(&bench, &project, "one").await;
    run(&bench, &project, "two").await;

    let files = bench.store.files();
    let preview = bench.store.preview_html();
    assert!(preview.is_some());

    db.lock().await.execute_batch("DROP TABLE project_files").unwrap();

    let err = bench.restore(&project, 1, false).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Restore { version: 1, .. }));
    assert_eq!(bench.store.files(), files);
    assert_eq!(bench.store.preview_html(), preview);
}

#[tokio::test]
async fn test_failed_restore_clears_rebuilt_preview() {
    let (db, _temp) = create_test_db();
    let bench = workbench(db.clone(), ScriptedProvider::new(vec![]));
    let project = new_project(&bench).await;
    assert_eq!(bench.store.preview_html(), None);

    bench
        .reconciler
        .create_version(&project.id, &[ProjectFile::new("src/App.tsx", APP)], None, None)
        .await
        .unwrap();
    db.lock().await.execute_batch("DROP TABLE project_files").unwrap();

    let err = bench.restore(&project, 1, false).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Restore { .. }));
    assert!(bench.store.is_empty());
    assert_eq!(bench.store.preview_html(), None);

    let stored = bench.projects.get(&project.id).await.unwrap().unwrap();
    assert_eq!(stored.preview_html, None);
}

#[tokio::test]
async fn test_failed_preview_write_restores_saved_files() {
    let (db, _temp) = create_test_db();
    let provider = ScriptedProvider::new(vec![
        body(&[create("a.txt", "one"), complete("ok")]),
        body(&[update("a.txt", "two"), create("b.txt", "new"), complete("ok")]),
    ]);
    let bench = workbench(db.clone(), provider);
    let project = new_project(&bench).await;
    run(&bench, &project, "one").await;
    run(&bench, &project, "two").await;

    db.lock()
        .await
        .execute_batch(
            "CREATE TRIGGER projects_read_only BEFORE UPDATE ON projects
             BEGIN SELECT RAISE(ABORT, 'projects are read only'); END;",
        )
        .unwrap();

    let err = bench.restore(&project, 1, false).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Restore { version: 1, .. }));
    assert_eq!(bench.store.paths(), vec!["a.txt", "b.txt"]);

    let saved: Vec<(String, String)> = FileRepository::new(db.clone())
        .list("ws-1")
        .await
        .unwrap()
        .into_iter()
        .map(|r| (r.file_path, r.content))
        .collect();
    assert_eq!(
        saved,
        vec![
            ("a.txt".to_string(), "two".to_string()),
            ("b.txt".to_string(), "new".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_save_failure_is_reported() {
    let (db, _temp) = create_test_db();
    let provider = ScriptedProvider::new(vec![body(&[create("a.txt", "1"), complete("ok")])]);
    let bench = workbench(db.clone(), provider);
    let project = new_project(&bench).await;

    db.lock().await.execute_batch("DROP TABLE project_files").unwrap();

    let err = bench
        .run_generation(&project, "files", Some("token"))
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::Reconcile(ReconcileError::Save(_))));

    // the stream itself finished, so the session row says so
    let sessions = bench
        .sessions
        .list(&project.id, Some(SessionStatus::Completed))
        .await
        .unwrap();
    assert_eq!(sessions.len(), 1);
    assert!(bench.reconciler.versions().list(&project.id).await.unwrap().is_empty());
    assert_eq!(bench.store.get_file("a.txt").unwrap().content, "1");
}

#[tokio::test]
async fn test_version_failure_does_not_fail_run() {
    let (db, _temp) = create_test_db();
    let provider = ScriptedProvider::new(vec![body(&[create("a.txt", "1"), complete("done")])]);
    let bench = workbench(db.clone(), provider);
    let project = new_project(&bench).await;

    db.lock().await.execute_batch("DROP TABLE file_versions").unwrap();

    let report = bench
        .run_generation(&project, "files", Some("token"))
        .await
        .unwrap();
    let RunOutcome::Completed { saved, version, .. } = report.outcome else {
        panic!("expected completion");
    };
    assert!(version.is_none());
    assert_eq!(saved.saved.inserted, 1);

    let records = FileRepository::new(db.clone()).list("ws-1").await.unwrap();
    assert_eq!(records.len(), 1);
    let stored = bench.projects.get(&project.id).await.unwrap().unwrap();
    assert!(stored.preview_html.is_some());
    let messages = bench.messages.list(&project.id).await.unwrap();
    assert_eq!(messages.last().unwrap().content, "done");
}

#[tokio::test]
async fn test_save_is_retry_safe() {
    let (db, _temp) = create_test_db();
    let provider = ScriptedProvider::new(vec![body(&[
        create("a.txt", "1"),
        create("b.txt", "2"),
        complete("ok"),
    ])]);
    let bench = workbench(db, provider);
    let project = new_project(&bench).await;

    let report = bench
        .run_generation(&project, "files", Some("token"))
        .await
        .unwrap();
    let RunOutcome::Completed { generation, .. } = report.outcome else {
        panic!("expected completion");
    };

    let again = bench
        .reconciler
        .save_session_files(&project, &generation.delta)
        .await
        .unwrap();
    assert_eq!(again.saved.unchanged, 2);
    assert_eq!(again.saved.inserted, 0);
    assert_eq!(again.saved.updated, 0);
}

#[tokio::test]
async fn test_next_generation_fails_orphaned_sessions() {
    let (db, _temp) = create_test_db();
    let provider = ScriptedProvider::new(vec![]);
    let bench = workbench(db, provider.clone());
    let project = new_project(&bench).await;

    let mut stuck = GenerationSession::new(&project.id, "left running");
    stuck.advance(SessionStatus::Generating);
    bench.sessions.create(&stuck).await.unwrap();

    let mut finished = GenerationSession::new(&project.id, "done");
    finished.complete(3, None);
    bench.sessions.create(&finished).await.unwrap();

    // opening alone leaves other sessions untouched
    bench.open_project(&project.id).await.unwrap();
    let row = bench.sessions.get(&stuck.id).await.unwrap().unwrap();
    assert_eq!(row.status, SessionStatus::Generating);

    provider.push(body(&[create("a.txt", "1"), complete("ok")]));
    run(&bench, &project, "next").await;

    let stuck = bench.sessions.get(&stuck.id).await.unwrap().unwrap();
    assert_eq!(stuck.status, SessionStatus::Failed);
    assert_eq!(stuck.error.as_deref(), Some("interrupted"));
    assert!(stuck.completed_at.is_some());

    let finished = bench.sessions.get(&finished.id).await.unwrap().unwrap();
    assert_eq!(finished.status, SessionStatus::Completed);

    let completed = bench
        .sessions
        .list(&project.id, Some(SessionStatus::Completed))
        .await
        .unwrap();
    assert_eq!(completed.len(), 2);
}

#[tokio::test]
async fn test_precondition_failure_records_nothing() {
    let (db, _temp) = create_test_db();
    let provider = ScriptedProvider::new(vec![]);
    let bench = workbench(db, provider.clone());
    let project = new_project(&bench).await;

    let err = bench.run_generation(&project, "hi", None).await.unwrap_err();
    assert!(matches!(err, RunError::Generation(GenerationError::NotAuthenticated)));

    assert_eq!(provider.opened(), 0);
    assert!(bench.sessions.list(&project.id, None).await.unwrap().is_empty());
    assert!(bench.messages.list(&project.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_generation_persists_failure() {
    let (db, _temp) = create_test_db();
    let provider = ScriptedProvider::new(vec![body(&[error("Upgrade your plan: quota reached")])]);
    let bench = workbench(db, provider);
    let project = new_project(&bench).await;

    let err = bench.run_generation(&project, "hi", Some("token")).await.unwrap_err();
    assert!(matches!(err, RunError::Generation(GenerationError::QuotaExceeded { .. })));

    let sessions = bench.sessions.list(&project.id, Some(SessionStatus::Failed)).await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert!(bench.reconciler.versions().list(&project.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_projects_do_not_leak_files() {
    let (db, _temp) = create_test_db();
    let provider = ScriptedProvider::new(vec![body(&[create("only-a.txt", "a"), complete("ok")])]);
    let bench = workbench(db, provider);

    let first = new_project(&bench).await;
    run(&bench, &first, "one").await;

    let second = bench
        .projects
        .create("Other".to_string(), Some("ws-2".to_string()), None)
        .await
        .unwrap();
    bench.open_project(&second.id).await.unwrap();
    assert!(bench.store.is_empty());

    bench.open_project(&first.id).await.unwrap();
    assert_eq!(bench.store.paths(), vec!["only-a.txt"]);
}
