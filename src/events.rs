// Fire-and-forget notifications for whatever sits on top of the agent (API, UI, logs).

use crate::models::{Alert, HealthScore, Problem, Scan, SpeedTestResult};
use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum Event {
    ScanStarted(Scan),
    ScanCompleted(Scan),
    ProblemCreated(Problem),
    ProblemResolved(Problem),
    AlertRaised(Alert),
    HealthUpdated(HealthScore),
    SpeedTestCompleted(SpeedTestResult),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::ScanStarted(_) => "scan-started",
            Event::ScanCompleted(_) => "scan-completed",
            Event::ProblemCreated(_) => "problem-created",
            Event::ProblemResolved(_) => "problem-resolved",
            Event::AlertRaised(_) => "alert-raised",
            Event::HealthUpdated(_) => "health-updated",
            Event::SpeedTestCompleted(_) => "speed-test-completed",
        }
    }
}

/// Receives events from the engines. Must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Drops every event.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: Event) {}
}

/// Fans events out over a tokio broadcast channel. Slow receivers lag, senders never wait.
pub struct BroadcastSink {
    tx: broadcast::Sender<Event>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl EventSink for BroadcastSink {
    fn emit(&self, event: Event) {
        let name = event.name();
        if self.tx.send(event).is_err() {
            tracing::trace!(event = name, "No event subscribers");
        }
    }
}
