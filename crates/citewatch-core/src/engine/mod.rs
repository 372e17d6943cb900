//! Core watch engine
//!
//! The WatchEngine is responsible for:
//! - Fetching the current citation count via CountSource
//! - Comparing it against the StateStore watermark
//! - Sending a notification via Notifier on an increase
//! - Persisting the new count after a successful notification
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐
//! │ CountSource │─── Observation ─────┐
//! └─────────────┘                     │
//!                                     ▼
//!                            ┌──────────────┐
//!                            │ WatchEngine  │
//!                            └──────────────┘
//!                                     │
//!         ┌───────────────────────────┼───────────────────────────┐
//!         │                           │                           │
//!         ▼                           ▼                           ▼
//! ┌─────────────┐           ┌──────────────┐           ┌─────────────┐
//! │ StateStore  │           │  Notifier    │           │   Events    │
//! │ (compare)   │           │  (deliver)   │           │ (observe)   │
//! └─────────────┘           └──────────────┘           └─────────────┘
//! ```
//!
//! ## Cycle
//!
//! 1. Fetch the count; on failure skip to sleep
//! 2. Read the stored count (absent = never notified)
//! 3. Increase, or nothing stored: notify
//! 4. On successful notification, write the new count
//! 5. Sleep for the check interval, or stop on shutdown

use std::future::Future;
use std::time::Duration;

use crate::config::{AuthorSelector, WatchConfig};
use crate::error::{FetchError, NotifyError, Result};
use crate::message::NotificationMessage;
use crate::traits::{CountSource, Notifier, Observation, StateStore};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, trace, warn};

/// Events emitted by the WatchEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine started
    Started {
        author: String,
    },

    /// Count fetched successfully
    CountFetched {
        count: u64,
    },

    /// Count could not be fetched this cycle
    FetchFailed {
        kind: &'static str,
        error: String,
    },

    /// Count equals the stored watermark
    NoIncrease {
        count: u64,
    },

    /// Count is below the stored watermark
    CountDecreased {
        stored: u64,
        observed: u64,
    },

    /// Notification delivered
    NotificationSent {
        previous: Option<u64>,
        current: u64,
    },

    /// Notification could not be delivered
    NotificationFailed {
        kind: &'static str,
        error: String,
    },

    /// New watermark written
    StatePersisted {
        count: u64,
    },

    /// New watermark could not be written
    PersistFailed {
        count: u64,
        error: String,
    },

    /// Engine stopped
    Stopped {
        reason: String,
    },
}

/// Result of a single fetch → compare → notify → persist cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The source failed; nothing was compared, sent or written
    FetchFailed {
        error: FetchError,
    },

    /// Observed count equals the stored count
    Unchanged {
        count: u64,
    },

    /// Observed count is below the stored count; the watermark is kept
    Decreased {
        stored: u64,
        observed: u64,
    },

    /// Notification sent and the new count persisted
    Notified {
        previous: Option<u64>,
        current: u64,
    },

    /// Notification failed; the stored count is untouched so the next
    /// cycle retries
    NotifyFailed {
        previous: Option<u64>,
        current: u64,
        error: NotifyError,
    },

    /// Notification sent but the new count could not be persisted; the
    /// next cycle will notify again
    PersistFailed {
        previous: Option<u64>,
        current: u64,
        error: String,
    },
}

impl CycleOutcome {
    /// Whether a notification went out during this cycle
    pub fn sent_notification(&self) -> bool {
        matches!(self, Self::Notified { .. } | Self::PersistFailed { .. })
    }
}

/// What to do with a fresh observation, given the stored watermark
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Nothing was ever stored: first observation, notify
    FirstObservation,
    /// Strictly above the watermark: notify
    Increased { previous: u64 },
    /// Equal to the watermark
    Unchanged,
    /// Below the watermark
    Decreased { stored: u64 },
}

impl Comparison {
    /// Compare an observed count against the stored one
    pub fn of(stored: Option<u64>, observed: u64) -> Self {
        match stored {
            None => Self::FirstObservation,
            Some(previous) if observed > previous => Self::Increased { previous },
            Some(previous) if observed == previous => Self::Unchanged,
            Some(stored) => Self::Decreased { stored },
        }
    }

    /// Whether this comparison calls for a notification
    pub fn should_notify(&self) -> bool {
        matches!(self, Self::FirstObservation | Self::Increased { .. })
    }
}

/// Core citation watch engine
///
/// The engine runs the change-detection loop on a fixed cadence until a
/// shutdown signal arrives. Cycles never overlap and every failure inside
/// a cycle is contained to that cycle.
///
/// ## Lifecycle
///
/// 1. Create with [`WatchEngine::new()`]
/// 2. Start with [`WatchEngine::run()`]
/// 3. Engine runs until SIGINT/SIGTERM
///
/// ## Shutdown
///
/// The shutdown signal is observed while the engine sleeps between cycles.
/// A cycle that is already running completes first, so the state file is
/// never left mid-write.
pub struct WatchEngine {
    /// Source of citation counts
    source: Box<dyn CountSource>,

    /// Delivery of increase notifications
    notifier: Box<dyn Notifier>,

    /// Durable watermark
    state_store: Box<dyn StateStore>,

    /// Author being watched
    author: AuthorSelector,

    /// Sleep between cycles
    check_interval: Duration,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl WatchEngine {
    /// Create a new watch engine
    ///
    /// # Parameters
    ///
    /// - `source`: Count source implementation
    /// - `notifier`: Notifier implementation
    /// - `state_store`: State store implementation
    /// - `config`: Watcher configuration
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        source: Box<dyn CountSource>,
        notifier: Box<dyn Notifier>,
        state_store: Box<dyn StateStore>,
        config: WatchConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let engine = Self {
            source,
            notifier,
            state_store,
            author: config.author,
            check_interval: config.engine.check_interval(),
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Author this engine watches
    pub fn author(&self) -> &AuthorSelector {
        &self.author
    }

    /// Time slept between cycles
    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    /// Run the engine
    ///
    /// Runs cycles until SIGINT or SIGTERM is received (SIGINT only on
    /// non-Unix platforms).
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: Signal handlers could not be installed
    pub async fn run(&self) -> Result<()> {
        let shutdown = os_shutdown_signal()?;
        self.run_until(shutdown).await
    }

    /// Run the engine with a programmatic shutdown signal
    ///
    /// With `None` this behaves like [`run()`](Self::run). With a receiver,
    /// the engine stops when a value is sent or the sender is dropped.
    pub async fn run_with_shutdown(&self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        match shutdown_rx {
            Some(rx) => {
                self.run_until(async move {
                    let _ = rx.await;
                    info!("Shutdown signal received");
                })
                .await
            }
            None => self.run().await,
        }
    }

    /// Main loop: cycle, then sleep or stop
    async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        info!(
            "Watching citations for {} via {} (interval {:?})",
            self.author,
            self.source.source_name(),
            self.check_interval
        );
        self.emit_event(EngineEvent::Started {
            author: self.author.describe(),
        });

        loop {
            let outcome = self.run_cycle().await;
            debug!("Cycle finished: {:?}", outcome);

            debug!("Sleeping {:?} before next check", self.check_interval);
            tokio::select! {
                _ = tokio::time::sleep(self.check_interval) => {}
                _ = &mut shutdown => {
                    self.emit_event(EngineEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    break;
                }
            }
        }

        info!("Engine stopped");
        Ok(())
    }

    /// Run a single fetch → compare → notify → persist cycle
    ///
    /// Never fails: every error is logged, reported as an event, and
    /// folded into the returned [`CycleOutcome`].
    pub async fn run_cycle(&self) -> CycleOutcome {
        info!("Checking citation count for {}", self.author);

        let observation = match self.source.fetch(&self.author).await {
            Ok(observation) => observation,
            Err(e) => {
                warn!("Fetch failed ({}): {}. Skipping this cycle.", e.kind(), e);
                self.emit_event(EngineEvent::FetchFailed {
                    kind: e.kind(),
                    error: e.to_string(),
                });
                return CycleOutcome::FetchFailed { error: e };
            }
        };

        let current = observation.citations;
        info!(
            "Fetched {} citations for {}",
            current,
            observation.author_name.as_deref().unwrap_or(self.author.value())
        );
        self.emit_event(EngineEvent::CountFetched { count: current });

        let stored = self.state_store.read().await;
        match Comparison::of(stored, current) {
            Comparison::FirstObservation => {
                info!("No previous count recorded, treating {} as an increase", current);
            }
            Comparison::Increased { previous } => {
                info!("Citation count increased: {} -> {}", previous, current);
            }
            Comparison::Unchanged => {
                info!("No increase: citation count still {}", current);
                self.emit_event(EngineEvent::NoIncrease { count: current });
                return CycleOutcome::Unchanged { count: current };
            }
            Comparison::Decreased { stored } => {
                warn!(
                    "Citation count {} is below the last notified count {}, keeping {}",
                    current, stored, stored
                );
                self.emit_event(EngineEvent::CountDecreased {
                    stored,
                    observed: current,
                });
                return CycleOutcome::Decreased {
                    stored,
                    observed: current,
                };
            }
        }

        self.notify_and_persist(stored, &observation).await
    }

    /// Deliver the notification, then advance the watermark
    async fn notify_and_persist(&self, previous: Option<u64>, observation: &Observation) -> CycleOutcome {
        let current = observation.citations;
        let label = observation
            .author_name
            .clone()
            .unwrap_or_else(|| self.author.value().to_string());
        let message = NotificationMessage::new(label, self.author.describe(), previous, current);

        if let Err(e) = self.notifier.notify(&message).await {
            error!(
                "Notification via {} failed ({}): {}. Count not persisted, will retry next cycle.",
                self.notifier.notifier_name(),
                e.kind(),
                e
            );
            self.emit_event(EngineEvent::NotificationFailed {
                kind: e.kind(),
                error: e.to_string(),
            });
            return CycleOutcome::NotifyFailed {
                previous,
                current,
                error: e,
            };
        }

        info!(
            "Notification sent via {}: {}",
            self.notifier.notifier_name(),
            message.subject()
        );
        self.emit_event(EngineEvent::NotificationSent { previous, current });

        match self.state_store.write(current).await {
            Ok(()) => {
                info!("Persisted citation count {}", current);
                self.emit_event(EngineEvent::StatePersisted { count: current });
                CycleOutcome::Notified { previous, current }
            }
            Err(e) => {
                error!(
                    "Failed to persist citation count {}: {}. The increase will be notified again.",
                    current, e
                );
                self.emit_event(EngineEvent::PersistFailed {
                    count: current,
                    error: e.to_string(),
                });
                CycleOutcome::PersistFailed {
                    previous,
                    current,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Emit an engine event
    ///
    /// Events are optional: a dropped receiver is not an error.
    fn emit_event(&self, event: EngineEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!("Event channel full, dropping event {:?}", event);
            }
            Err(TrySendError::Closed(event)) => {
                trace!("No event receiver, dropping event {:?}", event);
            }
        }
    }
}

/// Build a future that resolves on SIGTERM or SIGINT
///
/// Handlers are installed here, before the first cycle, so a signal that
/// arrives mid-cycle is still seen at the next sleep.
#[cfg(unix)]
fn os_shutdown_signal() -> Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    Ok(async move {
        let name = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };
        info!("Received {}, shutting down", name);
    })
}

#[cfg(not(unix))]
fn os_shutdown_signal() -> Result<impl Future<Output = ()>> {
    Ok(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, shutting down"),
            Err(e) => error!("Failed to wait for CTRL-C: {}", e),
        }
    })
}
