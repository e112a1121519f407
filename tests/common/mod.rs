// Shared fixtures for integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::channel::mpsc;
use futures::StreamExt;
use serde_json::{json, Value};
use sitecraft::db::Database;
use sitecraft::session::{
    FallbackPayload, GenerationError, GenerationProvider, GenerationRequest, GenerationResponse,
};
use tempfile::TempDir;

pub fn create_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::new(db_path).unwrap();
    (db, temp_dir)
}

/// One canned response per `open` call
pub enum Script {
    Chunks(Vec<Bytes>),
    Channel(mpsc::UnboundedReceiver<Result<Bytes, GenerationError>>),
    Json(FallbackPayload),
    Fail(GenerationError),
}

#[derive(Default)]
pub struct ScriptedProvider {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<GenerationRequest>>,
    opened: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            ..Self::default()
        })
    }

    pub fn push(&self, script: Script) {
        self.scripts.lock().unwrap().push_back(script);
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Wait until `open` has been called `count` times
    pub async fn wait_opened(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.opened() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("provider was never opened");
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    async fn open(
        &self,
        request: &GenerationRequest,
        _credential: &str,
    ) -> Result<GenerationResponse, GenerationError> {
        self.requests.lock().unwrap().push(request.clone());
        let script = self.scripts.lock().unwrap().pop_front();
        self.opened.fetch_add(1, Ordering::SeqCst);

        match script.expect("no script left for request") {
            Script::Chunks(chunks) => Ok(GenerationResponse::Stream(Box::pin(
                futures::stream::iter(chunks.into_iter().map(Ok)),
            ))),
            Script::Channel(rx) => Ok(GenerationResponse::Stream(rx.boxed())),
            Script::Json(payload) => Ok(GenerationResponse::Json(payload)),
            Script::Fail(error) => Err(error),
        }
    }
}

pub fn frame(event: Value) -> String {
    format!("data: {}\n\n", event)
}

pub fn stage(name: &str, status: &str) -> String {
    frame(json!({ "type": "stage", "stage": name, "status": status, "message": "" }))
}

pub fn create(path: &str, content: &str) -> String {
    frame(json!({ "type": "file", "command": "CREATE_FILE", "path": path, "content": content }))
}

pub fn update(path: &str, content: &str) -> String {
    frame(json!({ "type": "file", "command": "UPDATE_FILE", "path": path, "content": content }))
}

pub fn delete(path: &str) -> String {
    frame(json!({ "type": "file", "command": "DELETE_FILE", "path": path }))
}

pub fn patch(path: &str, search: &str, replace: &str) -> String {
    frame(json!({
        "type": "file",
        "command": "PATCH_FILE",
        "path": path,
        "patches": [{ "search": search, "replace": replace }]
    }))
}

pub fn complete(message: &str) -> String {
    frame(json!({ "type": "complete", "aiMessage": message, "modelsUsed": ["test-model"] }))
}

pub fn error(message: &str) -> String {
    frame(json!({ "type": "error", "message": message }))
}

/// A whole response body as one chunk
pub fn body(frames: &[String]) -> Script {
    Script::Chunks(vec![Bytes::from(frames.concat())])
}

pub const APP: &str = r#"export default function App() {
  return (
    <div className="p-4">
      <h1>Hello</h1>
    </div>
  );
}"#;
