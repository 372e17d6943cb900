//! Test doubles and common utilities for engine contract tests
//!
//! The fakes are cheap to clone and clones share their internals, so a
//! test can hand one copy to the engine and keep another to inspect.

#![allow(dead_code)]

use async_trait::async_trait;
use citewatch_core::config::{AuthorSelector, EngineConfig, StateStoreConfig, WatchConfig};
use citewatch_core::error::{FetchError, NotifyError};
use citewatch_core::traits::{CountSource, Notifier, Observation, StateStore};
use citewatch_core::{NotificationMessage, WatchEngine};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A count source that replays a scripted list of results
///
/// Once the script runs out, the last entry is repeated.
#[derive(Clone)]
pub struct ScriptedCountSource {
    script: Arc<Mutex<VecDeque<Result<Observation, FetchError>>>>,
    last: Arc<Mutex<Option<Result<Observation, FetchError>>>>,
    fetch_call_count: Arc<AtomicUsize>,
}

impl ScriptedCountSource {
    pub fn new(script: Vec<Result<Observation, FetchError>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            last: Arc::new(Mutex::new(None)),
            fetch_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Script a plain sequence of counts
    pub fn counts(counts: &[u64]) -> Self {
        Self::new(counts.iter().map(|c| Ok(Observation::new(*c))).collect())
    }

    /// Append another result to the script
    pub fn push(&self, result: Result<Observation, FetchError>) {
        self.script.lock().unwrap().push_back(result);
    }

    /// Get the number of times fetch() was called
    pub fn fetch_call_count(&self) -> usize {
        self.fetch_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CountSource for ScriptedCountSource {
    async fn fetch(&self, _selector: &AuthorSelector) -> Result<Observation, FetchError> {
        self.fetch_call_count.fetch_add(1, Ordering::SeqCst);

        let next = self.script.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        match next {
            Some(result) => {
                *last = Some(result.clone());
                result
            }
            None => last
                .clone()
                .unwrap_or_else(|| Err(FetchError::network("script is empty"))),
        }
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// A notifier that records every message it is asked to deliver
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    attempts: Arc<Mutex<Vec<NotificationMessage>>>,
    delivered: Arc<Mutex<Vec<NotificationMessage>>>,
    failure: Arc<Mutex<Option<NotifyError>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail with `error` (or succeed with `None`)
    pub fn set_failure(&self, error: Option<NotifyError>) {
        *self.failure.lock().unwrap() = error;
    }

    /// Every message passed to notify(), delivered or not
    pub fn attempts(&self) -> Vec<NotificationMessage> {
        self.attempts.lock().unwrap().clone()
    }

    /// Messages that were delivered successfully
    pub fn delivered(&self) -> Vec<NotificationMessage> {
        self.delivered.lock().unwrap().clone()
    }

    /// (previous, current) pairs of delivered messages
    pub fn delivered_counts(&self) -> Vec<(Option<u64>, u64)> {
        self.delivered()
            .iter()
            .map(|m| (m.previous, m.current))
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &NotificationMessage) -> Result<(), NotifyError> {
        self.attempts.lock().unwrap().push(message.clone());

        if let Some(error) = self.failure.lock().unwrap().clone() {
            return Err(error);
        }

        self.delivered.lock().unwrap().push(message.clone());
        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        "recording"
    }
}

/// A state store whose writes can be made to fail
#[derive(Clone, Default)]
pub struct FlakyStateStore {
    value: Arc<Mutex<Option<u64>>>,
    fail_writes: Arc<Mutex<bool>>,
    write_call_count: Arc<AtomicUsize>,
}

impl FlakyStateStore {
    pub fn new(initial: Option<u64>) -> Self {
        Self {
            value: Arc::new(Mutex::new(initial)),
            ..Self::default()
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap() = fail;
    }

    pub fn value(&self) -> Option<u64> {
        *self.value.lock().unwrap()
    }

    /// Get the number of times write() was called
    pub fn write_call_count(&self) -> usize {
        self.write_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateStore for FlakyStateStore {
    async fn read(&self) -> Option<u64> {
        *self.value.lock().unwrap()
    }

    async fn write(&self, value: u64) -> Result<(), citewatch_core::Error> {
        self.write_call_count.fetch_add(1, Ordering::SeqCst);
        if *self.fail_writes.lock().unwrap() {
            return Err(citewatch_core::Error::state_store("disk full"));
        }
        *self.value.lock().unwrap() = Some(value);
        Ok(())
    }
}

/// Helper to create a minimal WatchConfig for testing
pub fn minimal_config(check_interval: Duration) -> WatchConfig {
    WatchConfig {
        author: AuthorSelector::Id("qc6CJjYAAAAJ".to_string()),
        state_store: StateStoreConfig::Memory,
        engine: EngineConfig::default().with_check_interval(check_interval),
    }
}

/// Build an engine over the given fakes with a one hour interval
pub fn engine_with(
    source: &ScriptedCountSource,
    notifier: &RecordingNotifier,
    store: &FlakyStateStore,
) -> WatchEngine {
    engine_with_interval(source, notifier, store, Duration::from_secs(3600))
}

/// Build an engine over the given fakes with a custom interval
pub fn engine_with_interval(
    source: &ScriptedCountSource,
    notifier: &RecordingNotifier,
    store: &FlakyStateStore,
    check_interval: Duration,
) -> WatchEngine {
    let (engine, _event_rx) = WatchEngine::new(
        Box::new(source.clone()),
        Box::new(notifier.clone()),
        Box::new(store.clone()),
        minimal_config(check_interval),
    )
    .expect("engine construction succeeds");
    engine
}

/// Log output captured from a fmt subscriber
///
/// Install with `tracing::subscriber::set_default(logs.subscriber())` on a
/// current-thread runtime.
#[derive(Clone, Default)]
pub struct CapturedLogs {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscriber that writes every level, without colors, into this buffer
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + 'static {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(self.clone())
            .finish()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock().unwrap()).into_owned()
    }

    /// Lines logged at WARN or above
    pub fn warnings(&self) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| line.contains(" WARN ") || line.contains("ERROR"))
            .map(str::to_string)
            .collect()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
