//! Generation session controller
//!
//! Drives one generation at a time against a shared `FileStore`. Parsed events
//! go through an explicit FIFO queue and each one is fully applied before the
//! next is taken, so store mutations always follow stream arrival order.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::GenerationError;
use super::model::{GenerationRequest, GenerationSession, SessionStatus};
use super::phase::GenerationPhase;
use super::provider::{ByteStream, FallbackPayload, GenerationProvider, GenerationResponse};
use crate::preview::router::is_component_file;
use crate::preview::PreviewCompiler;
use crate::store::language::extension;
use crate::store::{normalize_path, FileStore, PatchOutcome};
use crate::stream::{CompleteEvent, FileCommand, FileEvent, SseParser, StageStatus, StreamEvent};

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Minimum gap between mid-stream preview recompiles
    pub preview_interval: Duration,
    /// Route compiled into the preview
    pub preview_route: String,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            preview_interval: Duration::from_millis(250),
            preview_route: "/".to_string(),
        }
    }
}

/// Paths a session wrote or deleted, in first-touch order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionDelta {
    pub written: Vec<String>,
    pub deleted: Vec<String>,
}

impl SessionDelta {
    pub fn record_write(&mut self, path: &str) {
        self.deleted.retain(|p| p != path);
        if !self.written.iter().any(|p| p == path) {
            self.written.push(path.to_string());
        }
    }

    pub fn record_delete(&mut self, path: &str) {
        self.written.retain(|p| p != path);
        if !self.deleted.iter().any(|p| p == path) {
            self.deleted.push(path.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.written.is_empty() && self.deleted.is_empty()
    }
}

/// A session that reached `complete`
#[derive(Debug, Clone)]
pub struct CompletedGeneration {
    pub summary: CompleteEvent,
    pub delta: SessionDelta,
    pub preview_html: String,
    /// Number of `file` events applied
    pub file_events: usize,
    /// The stream ended without a terminal event and completion was inferred
    pub synthesized: bool,
}

#[derive(Debug)]
pub enum SessionOutcome {
    Completed(CompletedGeneration),
    Cancelled,
}

struct LiveGeneration {
    id: u64,
    token: CancellationToken,
}

enum RunEnd {
    Completed {
        summary: CompleteEvent,
        synthesized: bool,
    },
    Cancelled,
}

struct PreviewThrottle {
    interval: Duration,
    last: Option<Instant>,
}

impl PreviewThrottle {
    fn due(&self) -> bool {
        self.last.map_or(true, |t| t.elapsed() >= self.interval)
    }
}

struct RunState {
    delta: SessionDelta,
    file_events: usize,
    preview: PreviewThrottle,
}

impl RunState {
    /// Completion for a stream that closed without `complete` or `error`
    fn synthesized_summary(&self) -> CompleteEvent {
        CompleteEvent {
            files_generated: self.file_events,
            file_paths: self.delta.written.clone(),
            ..CompleteEvent::default()
        }
    }
}

pub struct GenerationController {
    provider: Arc<dyn GenerationProvider>,
    store: FileStore,
    compiler: PreviewCompiler,
    options: ControllerOptions,
    phase: watch::Sender<GenerationPhase>,
    live: Mutex<Option<LiveGeneration>>,
    /// Held for the whole of a run; a new run waits here for the
    /// cancelled one to let go of the store
    stream_lock: tokio::sync::Mutex<()>,
    next_id: AtomicU64,
}

impl GenerationController {
    pub fn new(
        provider: Arc<dyn GenerationProvider>,
        store: FileStore,
        compiler: PreviewCompiler,
        options: ControllerOptions,
    ) -> Self {
        let (phase, _rx) = watch::channel(GenerationPhase::default());
        Self {
            provider,
            store,
            compiler,
            options,
            phase,
            live: Mutex::new(None),
            stream_lock: tokio::sync::Mutex::new(()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    pub fn compiler(&self) -> &PreviewCompiler {
        &self.compiler
    }

    pub fn phase(&self) -> GenerationPhase {
        self.phase.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<GenerationPhase> {
        self.phase.subscribe()
    }

    pub fn is_live(&self) -> bool {
        self.live_slot().is_some()
    }

    /// Abort the in-flight generation, if any
    pub fn cancel(&self) -> bool {
        match self.live_slot().as_ref() {
            Some(live) => {
                info!("Cancelling generation {}", live.id);
                live.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Abort the in-flight generation and wait until it has let go of the
    /// store. Returns whether a generation was running.
    pub async fn cancel_and_wait(&self) -> bool {
        let cancelled = self.cancel();
        let _guard = self.stream_lock.lock().await;
        cancelled
    }

    /// Checks made before any network call
    pub fn check_preconditions(
        request: &GenerationRequest,
        credential: Option<&str>,
    ) -> Result<String, GenerationError> {
        let credential = match credential.map(str::trim) {
            Some(c) if !c.is_empty() => c.to_string(),
            _ => return Err(GenerationError::NotAuthenticated),
        };
        if request.workspace_id.trim().is_empty() {
            return Err(GenerationError::NoWorkspace);
        }
        Ok(credential)
    }

    /// Run one generation to a terminal state.
    ///
    /// A generation already in flight is cancelled first. Cancellation ends in
    /// `Ok(SessionOutcome::Cancelled)` with the phase back at idle; failures end
    /// in `Err` with the phase at error.
    pub async fn generate(
        &self,
        request: GenerationRequest,
        credential: Option<&str>,
        session: &mut GenerationSession,
    ) -> Result<SessionOutcome, GenerationError> {
        let credential = Self::check_preconditions(&request, credential)?;

        let (id, token) = self.begin();
        let _guard = self.stream_lock.lock().await;

        if token.is_cancelled() {
            // superseded before it ever started
            self.finish(id);
            session.fail("cancelled");
            return Ok(SessionOutcome::Cancelled);
        }

        info!("Starting generation {} for project {}", id, request.project_id);
        self.set_phase(GenerationPhase::starting());

        let mut state = RunState {
            delta: SessionDelta::default(),
            file_events: 0,
            preview: PreviewThrottle {
                interval: self.options.preview_interval,
                last: None,
            },
        };

        let result = self.run(&request, &credential, &token, session, &mut state).await;
        self.finish(id);

        match result {
            Ok(RunEnd::Completed {
                summary,
                synthesized,
            }) => {
                let preview_html = self.refresh_preview();
                let files_generated = if summary.files_generated > 0 {
                    summary.files_generated
                } else {
                    state.file_events
                };
                let model = (!summary.models_used.is_empty()).then(|| summary.models_used.join(", "));
                session.complete(files_generated, model);

                let message = summary
                    .ai_message
                    .clone()
                    .unwrap_or_else(|| format!("Generated {} files", files_generated));
                self.set_phase(GenerationPhase::complete(message));
                info!(
                    "Generation {} complete: {} file events{}",
                    id,
                    state.file_events,
                    if synthesized { " (stream truncated)" } else { "" }
                );

                Ok(SessionOutcome::Completed(CompletedGeneration {
                    summary,
                    delta: state.delta,
                    preview_html,
                    file_events: state.file_events,
                    synthesized,
                }))
            }
            Ok(RunEnd::Cancelled) => {
                info!("Generation {} cancelled after {} file events", id, state.file_events);
                session.fail("cancelled");
                self.set_phase(GenerationPhase::idle("Generation cancelled"));
                Ok(SessionOutcome::Cancelled)
            }
            Err(e) => {
                warn!("Generation {} failed: {}", id, e);
                session.fail(e.to_string());
                self.set_phase(GenerationPhase::error(e.to_string()));
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        request: &GenerationRequest,
        credential: &str,
        token: &CancellationToken,
        session: &mut GenerationSession,
        state: &mut RunState,
    ) -> Result<RunEnd, GenerationError> {
        let response = tokio::select! {
            biased;
            _ = token.cancelled() => return Ok(RunEnd::Cancelled),
            response = self.provider.open(request, credential) => response?,
        };

        match response {
            GenerationResponse::Stream(stream) => self.consume(stream, token, session, state).await,
            GenerationResponse::Json(payload) => Ok(self.apply_fallback(payload, token, session, state)),
        }
    }

    async fn consume(
        &self,
        mut stream: ByteStream,
        token: &CancellationToken,
        session: &mut GenerationSession,
        state: &mut RunState,
    ) -> Result<RunEnd, GenerationError> {
        let mut parser = SseParser::new();
        let mut queue: VecDeque<StreamEvent> = VecDeque::new();

        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(RunEnd::Cancelled),
                chunk = stream.next() => chunk,
            };

            let exhausted = match next {
                Some(Ok(chunk)) => {
                    queue.extend(parser.feed(&chunk));
                    false
                }
                Some(Err(e)) => return Err(e),
                None => {
                    queue.extend(parser.finish());
                    true
                }
            };

            while let Some(event) = queue.pop_front() {
                if token.is_cancelled() {
                    return Ok(RunEnd::Cancelled);
                }
                if let Some(summary) = self.apply_event(event, session, state)? {
                    if parser.skipped() > 0 {
                        warn!("Skipped {} malformed frames", parser.skipped());
                    }
                    return Ok(RunEnd::Completed {
                        summary,
                        synthesized: false,
                    });
                }
            }

            if exhausted {
                break;
            }
        }

        warn!(
            "Stream closed without a terminal event; finalizing with {} file events",
            state.file_events
        );
        Ok(RunEnd::Completed {
            summary: state.synthesized_summary(),
            synthesized: true,
        })
    }

    /// Apply one event. Returns the summary once the stream reports completion.
    fn apply_event(
        &self,
        event: StreamEvent,
        session: &mut GenerationSession,
        state: &mut RunState,
    ) -> Result<Option<CompleteEvent>, GenerationError> {
        match event {
            StreamEvent::Stage(stage) => {
                debug!("Stage {} {:?}", stage.stage.as_str(), stage.status);
                session.advance(SessionStatus::for_stage(stage.stage));
                if stage.status == StageStatus::Start || !stage.message.is_empty() {
                    self.set_phase(GenerationPhase::stage(&stage, state.file_events));
                }
                Ok(None)
            }
            StreamEvent::File(file) => {
                state.file_events += 1;
                session.advance(SessionStatus::Generating);
                let touched = self.dispatch(&file, &mut state.delta);
                self.set_phase(GenerationPhase::generating(state.file_events, &file.path));
                if touched && affects_preview(&file.path) && state.preview.due() {
                    self.refresh_preview();
                    state.preview.last = Some(Instant::now());
                }
                Ok(None)
            }
            StreamEvent::Complete(summary) => Ok(Some(summary)),
            StreamEvent::Error(error) => Err(GenerationError::from_stream_message(error.message)),
        }
    }

    /// Hand a file event to the store. Returns whether the store changed.
    fn dispatch(&self, event: &FileEvent, delta: &mut SessionDelta) -> bool {
        let path = normalize_path(&event.path);
        if path.is_empty() {
            warn!("Ignoring {} with empty path", event.command.as_str());
            return false;
        }
        debug!("{} {}", event.command.as_str(), path);

        match event.command {
            FileCommand::CreateFile => {
                self.store
                    .add_file(&path, event.content.clone().unwrap_or_default());
                delta.record_write(&path);
                true
            }
            FileCommand::UpdateFile => match &event.content {
                Some(content) => {
                    self.store.update_file(&path, content.as_str());
                    delta.record_write(&path);
                    true
                }
                None => {
                    warn!("Ignoring UPDATE_FILE without content for {}", path);
                    false
                }
            },
            FileCommand::PatchFile => {
                let patches = event.patches.as_deref().unwrap_or_default();
                if patches.is_empty() {
                    warn!("Ignoring PATCH_FILE without patches for {}", path);
                    return false;
                }
                match self.store.patch_file(&path, patches) {
                    PatchOutcome::Applied { applied, .. } => {
                        if applied > 0 {
                            delta.record_write(&path);
                        }
                        applied > 0
                    }
                    PatchOutcome::Missing => false,
                }
            }
            FileCommand::DeleteFile => {
                let removed = self.store.remove_file(&path);
                delta.record_delete(&path);
                removed
            }
        }
    }

    fn apply_fallback(
        &self,
        payload: FallbackPayload,
        token: &CancellationToken,
        session: &mut GenerationSession,
        state: &mut RunState,
    ) -> RunEnd {
        let summary = payload.summary();
        for file in payload.files {
            if token.is_cancelled() {
                return RunEnd::Cancelled;
            }
            let event = FileEvent {
                command: FileCommand::UpdateFile,
                path: file.path,
                content: Some(file.content),
                patches: None,
            };
            // same path as streamed events, minus preview throttling
            state.file_events += 1;
            session.advance(SessionStatus::Generating);
            self.dispatch(&event, &mut state.delta);
        }
        RunEnd::Completed {
            summary,
            synthesized: false,
        }
    }

    /// Recompile the preview from the current store contents
    pub fn refresh_preview(&self) -> String {
        let files = self.store.files();
        let html = self
            .compiler
            .compile_project(&files, &self.options.preview_route);
        self.store.set_preview_html(html.clone());
        html
    }

    fn begin(&self) -> (u64, CancellationToken) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let prior = self.live_slot().replace(LiveGeneration {
            id,
            token: token.clone(),
        });
        if let Some(prior) = prior {
            info!("Cancelling generation {} in favour of {}", prior.id, id);
            prior.token.cancel();
        }
        (id, token)
    }

    fn finish(&self, id: u64) {
        let mut live = self.live_slot();
        if live.as_ref().is_some_and(|l| l.id == id) {
            *live = None;
        }
    }

    fn live_slot(&self) -> MutexGuard<'_, Option<LiveGeneration>> {
        self.live.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_phase(&self, phase: GenerationPhase) {
        debug!("Phase {} ({}%)", phase.phase.as_str(), phase.progress);
        self.phase.send_replace(phase);
    }
}

fn affects_preview(path: &str) -> bool {
    is_component_file(path)
        || matches!(extension(path).as_deref(), Some("css") | Some("html"))
}
