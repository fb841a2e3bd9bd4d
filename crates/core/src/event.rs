// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process publish/subscribe event bus.
//!
//! Handlers are invoked in descending priority order; a handler may call
//! [`Event::stop_propagation`] to short-circuit the remaining handlers for
//! that one event. Dispatch inside a single [`EventBus::publish`] call is
//! cooperative and sequential — handlers are awaited one at a time, in
//! priority order, so relative ordering within one event is deterministic.
//! Nothing here is a process-wide singleton: every component that needs to
//! emit or observe events holds an explicit `Arc<EventBus>` (or a narrower
//! reference), matching the "no global state" redesign of the source.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Closed set of event kinds the core pipeline emits, plus an open
/// `Custom` escape hatch for embedder-defined events (mirrors the source's
/// `EventType | str` union).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    WorkflowStarted,
    WorkflowCompleted,
    WorkflowFailed,
    StageStarted,
    StageCompleted,
    StageFailed,
    ComponentInitialized,
    ComponentStarted,
    ComponentStopped,
    ComponentFailed,
    Progress,
    Error,
    Metrics,
    StateChange,
    BaselineEstablished,
    RegressionAlert,
    RollbackInitiated,
    RollbackCompleted,
    RollbackFailed,
    RollbackVerificationPassed,
    RollbackVerificationFailed,
    CascadingRollbackStarted,
    CascadingRollbackCompleted,
    Custom(String),
}

impl EventKind {
    fn as_wire_str(&self) -> &str {
        match self {
            Self::WorkflowStarted => "workflow_started",
            Self::WorkflowCompleted => "workflow_completed",
            Self::WorkflowFailed => "workflow_failed",
            Self::StageStarted => "stage_started",
            Self::StageCompleted => "stage_completed",
            Self::StageFailed => "stage_failed",
            Self::ComponentInitialized => "component_initialized",
            Self::ComponentStarted => "component_started",
            Self::ComponentStopped => "component_stopped",
            Self::ComponentFailed => "component_failed",
            Self::Progress => "progress",
            Self::Error => "error",
            Self::Metrics => "metrics",
            Self::StateChange => "state_change",
            Self::BaselineEstablished => "baseline_established",
            Self::RegressionAlert => "regression_alert",
            Self::RollbackInitiated => "rollback_initiated",
            Self::RollbackCompleted => "rollback_completed",
            Self::RollbackFailed => "rollback_failed",
            Self::RollbackVerificationPassed => "rollback_verification_passed",
            Self::RollbackVerificationFailed => "rollback_verification_failed",
            Self::CascadingRollbackStarted => "cascading_rollback_started",
            Self::CascadingRollbackCompleted => "cascading_rollback_completed",
            Self::Custom(s) => s.as_str(),
        }
    }

    fn from_wire_str(s: &str) -> Self {
        match s {
            "workflow_started" => Self::WorkflowStarted,
            "workflow_completed" => Self::WorkflowCompleted,
            "workflow_failed" => Self::WorkflowFailed,
            "stage_started" => Self::StageStarted,
            "stage_completed" => Self::StageCompleted,
            "stage_failed" => Self::StageFailed,
            "component_initialized" => Self::ComponentInitialized,
            "component_started" => Self::ComponentStarted,
            "component_stopped" => Self::ComponentStopped,
            "component_failed" => Self::ComponentFailed,
            "progress" => Self::Progress,
            "error" => Self::Error,
            "metrics" => Self::Metrics,
            "state_change" => Self::StateChange,
            "baseline_established" => Self::BaselineEstablished,
            "regression_alert" => Self::RegressionAlert,
            "rollback_initiated" => Self::RollbackInitiated,
            "rollback_completed" => Self::RollbackCompleted,
            "rollback_failed" => Self::RollbackFailed,
            "rollback_verification_passed" => Self::RollbackVerificationPassed,
            "rollback_verification_failed" => Self::RollbackVerificationFailed,
            "cascading_rollback_started" => Self::CascadingRollbackStarted,
            "cascading_rollback_completed" => Self::CascadingRollbackCompleted,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire_str())
    }
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_wire_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Ok(Self::from_wire_str(&String::deserialize(d)?))
    }
}

/// Severity of an [`Event::error`]-kind event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

/// Opaque handle returned by [`EventBus::subscribe`]; pass to `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// An immutable record published through the bus. `stop` is the one
/// interior-mutable field: a handler flips it via [`Event::stop_propagation`]
/// while holding only `&Event`, matching the source's `event._stop_propagation`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub source: String,
    pub payload: Map<String, Value>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub context: Map<String, Value>,
    #[serde(skip, default)]
    stop: AtomicBool,
}

impl Clone for Event {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            source: self.source.clone(),
            payload: self.payload.clone(),
            timestamp: self.timestamp,
            context: self.context.clone(),
            stop: AtomicBool::new(self.stop.load(Ordering::Relaxed)),
        }
    }
}

impl Event {
    pub fn new(kind: EventKind, source: impl Into<String>) -> Self {
        Self {
            kind,
            source: source.into(),
            payload: Map::new(),
            timestamp: chrono::Utc::now(),
            context: Map::new(),
            stop: AtomicBool::new(false),
        }
    }

    pub fn with_payload(mut self, payload: Map<String, Value>) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = context;
        self
    }

    pub fn insert(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// ComponentEvent specialization: `{componentType, componentId, operation}`.
    pub fn component(
        kind: EventKind,
        source: impl Into<String>,
        component_type: impl Into<String>,
        component_id: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self::new(kind, source)
            .insert("componentType", component_type.into())
            .insert("componentId", component_id.into())
            .insert("operation", operation.into())
    }

    /// ProgressEvent specialization: `{current, total, stage, percentage}`.
    pub fn progress(
        source: impl Into<String>,
        current: u64,
        total: u64,
        stage: impl Into<String>,
    ) -> Self {
        let percentage = if total == 0 { 0.0 } else { current as f64 / total as f64 * 100.0 };
        Self::new(EventKind::Progress, source)
            .insert("current", current)
            .insert("total", total)
            .insert("stage", stage.into())
            .insert("percentage", percentage)
    }

    /// ErrorEvent specialization: `{errorType, message, severity, recoverable}`.
    pub fn error(
        source: impl Into<String>,
        error_type: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
        recoverable: bool,
    ) -> Self {
        Self::new(EventKind::Error, source)
            .insert("errorType", error_type.into())
            .insert("message", message.into())
            .insert(
                "severity",
                serde_json::to_value(severity).unwrap_or(Value::Null),
            )
            .insert("recoverable", recoverable)
    }

    /// MetricsEvent specialization: `{metrics, thresholdExceeded}`.
    pub fn metrics(
        source: impl Into<String>,
        metrics: Map<String, Value>,
        threshold_exceeded: bool,
    ) -> Self {
        Self::new(EventKind::Metrics, source)
            .insert("metrics", Value::Object(metrics))
            .insert("thresholdExceeded", threshold_exceeded)
    }

    /// StateChangeEvent specialization: `{oldState, newState, entityType, entityId}`.
    pub fn state_change(
        source: impl Into<String>,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        old_state: impl Into<String>,
        new_state: impl Into<String>,
    ) -> Self {
        Self::new(EventKind::StateChange, source)
            .insert("entityType", entity_type.into())
            .insert("entityId", entity_id.into())
            .insert("oldState", old_state.into())
            .insert("newState", new_state.into())
    }

    pub fn stop_propagation(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
}

/// Error returned by a failed handler. Never re-raised: the bus logs it and
/// keeps dispatching.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl From<String> for HandlerError {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for HandlerError {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A subscriber. Implement directly for stateful handlers, or subscribe a
/// plain `Fn(&Event) -> impl Future<Output = Result<(), HandlerError>>`
/// closure via the blanket impl below.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &Event) -> Result<(), HandlerError>;
}

#[async_trait]
impl<F, Fut> EventHandler for F
where
    F: Fn(&Event) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send,
{
    async fn handle(&self, event: &Event) -> Result<(), HandlerError> {
        self(event).await
    }
}

/// Predicate gating whether a handler runs for a given event.
pub type EventFilter = Arc<dyn Fn(&Event) -> bool + Send + Sync>;

struct HandlerEntry {
    id: SubscriptionId,
    priority: i32,
    filter: Option<EventFilter>,
    handler: Arc<dyn EventHandler>,
}

/// Snapshot of bus activity for observability.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EventBusMetrics {
    pub published_by_kind: HashMap<String, u64>,
    pub total_published: u64,
    pub handler_errors: u64,
}

struct Inner {
    by_kind: HashMap<String, Vec<HandlerEntry>>,
    default_handlers: Vec<HandlerEntry>,
    history: VecDeque<Event>,
    history_capacity: usize,
    metrics: EventBusMetrics,
}

/// Default bounded history size.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// In-process event bus. Cheap to clone (wraps an `Arc`); pass by value or
/// share a single instance — both are fine since subscription state lives
/// behind a lock, not behind `&mut self`.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Mutex<Inner>>,
    next_id: Arc<AtomicU64>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl EventBus {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                by_kind: HashMap::new(),
                default_handlers: Vec::new(),
                history: VecDeque::with_capacity(history_capacity.min(4096)),
                history_capacity,
                metrics: EventBusMetrics::default(),
            })),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Subscribe to one event kind, or `None` for every event (a "default
    /// handler" in source terms). Higher `priority` runs first.
    pub fn subscribe(
        &self,
        kind: Option<EventKind>,
        handler: impl EventHandler + 'static,
        priority: i32,
        filter: Option<EventFilter>,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let entry = HandlerEntry { id, priority, filter, handler: Arc::new(handler) };

        let mut inner = self.inner.lock();
        match kind {
            Some(k) => {
                let list = inner.by_kind.entry(k.as_wire_str().to_string()).or_default();
                list.push(entry);
                list.sort_by(|a, b| b.priority.cmp(&a.priority));
            }
            None => {
                inner.default_handlers.push(entry);
                inner.default_handlers.sort_by(|a, b| b.priority.cmp(&a.priority));
            }
        }
        id
    }

    /// Remove a handler previously returned by `subscribe`. Returns `true` if
    /// a handler with that id was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.default_handlers.len();
        inner.default_handlers.retain(|h| h.id != id);
        let mut removed = before != inner.default_handlers.len();
        for list in inner.by_kind.values_mut() {
            let before = list.len();
            list.retain(|h| h.id != id);
            removed |= before != list.len();
        }
        removed
    }

    /// Dispatch `event` to matching per-kind handlers then default handlers,
    /// both in descending priority, awaiting each in turn. Stops as soon as
    /// the event's propagation flag is set. Handler errors are isolated,
    /// logged, and counted — never propagated to the caller.
    pub async fn publish(&self, event: Event) -> Event {
        let key = event.kind.as_wire_str().to_string();
        let entries: Vec<Arc<dyn EventHandler>> = {
            let inner = self.inner.lock();
            let mut out = Vec::new();
            if let Some(list) = inner.by_kind.get(&key) {
                out.extend(
                    list.iter()
                        .filter(|h| h.filter.as_ref().map_or(true, |f| f(&event)))
                        .map(|h| h.handler.clone()),
                );
            }
            out.extend(
                inner
                    .default_handlers
                    .iter()
                    .filter(|h| h.filter.as_ref().map_or(true, |f| f(&event)))
                    .map(|h| h.handler.clone()),
            );
            out
        };

        let mut handler_errors = 0u64;
        for handler in &entries {
            if event.is_propagation_stopped() {
                break;
            }
            if let Err(e) = handler.handle(&event).await {
                tracing::error!(kind = %event.kind, source = %event.source, error = %e, "event handler failed");
                handler_errors += 1;
            }
        }

        let mut inner = self.inner.lock();
        inner.metrics.total_published += 1;
        inner.metrics.handler_errors += handler_errors;
        *inner.metrics.published_by_kind.entry(key).or_insert(0) += 1;
        if inner.history_capacity > 0 {
            if inner.history.len() >= inner.history_capacity {
                inner.history.pop_front();
            }
            inner.history.push_back(event.clone());
        }
        event
    }

    /// Publish each event in order; each is fully dispatched before the next
    /// starts (order preserved, no cross-event interleaving within the call).
    pub async fn publish_batch(&self, events: Vec<Event>) -> Vec<Event> {
        let mut out = Vec::with_capacity(events.len());
        for event in events {
            out.push(self.publish(event).await);
        }
        out
    }

    /// Most recent `limit` events (oldest first), or the full bounded
    /// history when `limit` is `None`.
    pub fn history(&self, limit: Option<usize>) -> Vec<Event> {
        let inner = self.inner.lock();
        match limit {
            Some(n) if n < inner.history.len() => {
                inner.history.iter().skip(inner.history.len() - n).cloned().collect()
            }
            _ => inner.history.iter().cloned().collect(),
        }
    }

    pub fn metrics(&self) -> EventBusMetrics {
        self.inner.lock().metrics.clone()
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
