use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use async_trait::async_trait;
use crate::error::{GlassboxError, Result};
use crate::events::{ProgressEvent, WireEvent};
use crate::github::RepoFetcher;
use crate::llm::{CompletionClient, CompletionRequest};
use crate::models::RepoSnapshot;
use crate::pipeline::{EventSink, SinkClosed};

enum Script {
    Queue(Mutex<VecDeque<Result<String>>>),
    Repeat(String),
}

/// Completion client that replays canned replies
///
/// Queued replies are handed out in order; once the queue is empty every call fails.
pub struct ScriptedClient {
    script: Script,
    calls: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    /// Replays `replies` in order
    pub fn new(replies: Vec<Result<String>>) -> Self {
        Self::with_script(Script::Queue(Mutex::new(replies.into())))
    }

    /// Answers every call with `reply`
    pub fn repeating(reply: impl Into<String>) -> Self {
        Self::with_script(Script::Repeat(reply.into()))
    }

    fn with_script(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Number of `complete` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request received, in order
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        match &self.script {
            Script::Repeat(reply) => Ok(reply.clone()),
            Script::Queue(queue) => queue
                .lock()
                .ok()
                .and_then(|mut q| q.pop_front())
                .unwrap_or_else(|| Err(GlassboxError::LLM("no scripted reply left".into()))),
        }
    }
}

type ClosePredicate = Box<dyn Fn(&ProgressEvent, usize) -> bool + Send + Sync>;

/// Event sink that keeps everything it receives
///
/// Can be told to close itself once a given event has been recorded, which simulates a
/// consumer that disconnects mid-run.
pub struct RecordingSink {
    events: Mutex<Vec<WireEvent>>,
    closed: AtomicBool,
    close_when: Option<ClosePredicate>,
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSink {
    /// A sink that never closes
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            close_when: None,
        }
    }

    /// A sink that closes right after recording an event matching `predicate`
    ///
    /// The predicate also gets the number of events recorded so far, including this one.
    pub fn close_after<F>(predicate: F) -> Self
    where
        F: Fn(&ProgressEvent, usize) -> bool + Send + Sync + 'static,
    {
        Self {
            close_when: Some(Box::new(predicate)),
            ..Self::new()
        }
    }

    /// Closes the sink now
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Encoded events, in arrival order
    pub fn wire_events(&self) -> Vec<WireEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Decoded events, in arrival order
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.wire_events()
            .iter()
            .filter_map(|event| event.decode().ok())
            .collect()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn send(&self, event: WireEvent) -> std::result::Result<(), SinkClosed> {
        if self.is_closed() {
            return Err(SinkClosed);
        }
        let decoded = event.decode().ok();
        let count = {
            let mut events = self.events.lock().map_err(|_| SinkClosed)?;
            events.push(event);
            events.len()
        };
        if let (Some(predicate), Some(decoded)) = (&self.close_when, decoded) {
            if predicate(&decoded, count) {
                self.close();
            }
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Repository fetcher returning a fixed snapshot, or failing when given none
pub struct StaticFetcher {
    snapshot: Option<RepoSnapshot>,
    calls: AtomicUsize,
}

impl StaticFetcher {
    /// Answers every fetch with a copy of `snapshot`
    pub fn new(snapshot: RepoSnapshot) -> Self {
        Self { snapshot: Some(snapshot), calls: AtomicUsize::new(0) }
    }

    /// Fails every fetch
    pub fn failing() -> Self {
        Self { snapshot: None, calls: AtomicUsize::new(0) }
    }

    /// Number of fetches so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RepoFetcher for StaticFetcher {
    async fn fetch(&self, owner: &str, repo: &str) -> Result<RepoSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.snapshot {
            Some(snapshot) => Ok(RepoSnapshot {
                owner: owner.to_string(),
                repo_name: repo.to_string(),
                ..snapshot.clone()
            }),
            None => Err(GlassboxError::GitHubApi(format!("{}/{} is unavailable", owner, repo))),
        }
    }
}
