//! Model lifecycle events.
//!
//! Persistence operations fire a "before" event (`Saving`, `Updating`, `Deleting`) and, on
//! success, an "after" event (`Saved`, `Updated`, `Deleted`). Each event first goes to the
//! model's [`EventDispatcher`]; unless a dispatcher stopped propagation, the entity's own
//! [`Entity::on_event`](crate::Entity::on_event) handler runs next and may abort a "before" event
//! with [`HookAction::Abort`].

use crate::value::Row;
use std::fmt;
use std::sync::Arc;
use tracing::Level;

/// Lifecycle event names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    Saving,
    Saved,
    Updating,
    Updated,
    Deleting,
    Deleted,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Saving => "saving",
            Self::Saved => "saved",
            Self::Updating => "updating",
            Self::Updated => "updated",
            Self::Deleting => "deleting",
            Self::Deleted => "deleted",
        }
    }

    /// "Before" events can cancel the operation.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, Self::Saving | Self::Updating | Self::Deleting)
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One lifecycle event, carrying a snapshot of the affected entries.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelEvent {
    name: EventName,
    table: String,
    entries: Row,
    propagation_stopped: bool,
}

impl ModelEvent {
    pub fn new(name: EventName, table: impl Into<String>, entries: Row) -> Self {
        Self {
            name,
            table: table.into(),
            entries,
            propagation_stopped: false,
        }
    }

    pub fn name(&self) -> EventName {
        self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn entries(&self) -> &Row {
        &self.entries
    }

    /// Stop later dispatchers and the entity handler from seeing this event.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// What an entity handler wants done with a "before" event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HookAction {
    /// Carry on with the operation.
    #[default]
    Continue,
    /// Cancel the operation; nothing is executed.
    Abort(String),
}

impl HookAction {
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Abort(_))
    }
}

/// Receives lifecycle events.
pub trait EventDispatcher: Send + Sync {
    fn dispatch(&self, event: &mut ModelEvent);
}

impl<F> EventDispatcher for F
where
    F: Fn(&mut ModelEvent) + Send + Sync,
{
    fn dispatch(&self, event: &mut ModelEvent) {
        self(event)
    }
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDispatcher;

impl EventDispatcher for NoopDispatcher {
    fn dispatch(&self, _event: &mut ModelEvent) {}
}

/// Logs each event through `tracing` under the `pgrecord.model` target.
#[derive(Debug, Clone)]
pub struct TracingDispatcher {
    /// Tracing event level to emit at.
    pub level: Level,
}

impl Default for TracingDispatcher {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
        }
    }
}

impl TracingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the tracing event level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }
}

impl EventDispatcher for TracingDispatcher {
    fn dispatch(&self, event: &mut ModelEvent) {
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        emit_at_level!(
            self.level,
            target: "pgrecord.model",
            event = event.name().as_str(),
            table = event.table(),
            entries = event.entries().len(),
        );
    }
}

/// Runs dispatchers in order until one stops propagation.
#[derive(Clone, Default)]
pub struct CompositeDispatcher {
    dispatchers: Vec<Arc<dyn EventDispatcher>>,
}

impl CompositeDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dispatcher.
    #[allow(clippy::should_implement_trait)]
    pub fn add<D: EventDispatcher + 'static>(mut self, dispatcher: D) -> Self {
        self.dispatchers.push(Arc::new(dispatcher));
        self
    }

    /// Add an Arc-wrapped dispatcher.
    pub fn add_arc(mut self, dispatcher: Arc<dyn EventDispatcher>) -> Self {
        self.dispatchers.push(dispatcher);
        self
    }

    pub fn len(&self) -> usize {
        self.dispatchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dispatchers.is_empty()
    }
}

impl fmt::Debug for CompositeDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeDispatcher")
            .field("dispatchers", &self.dispatchers.len())
            .finish()
    }
}

impl EventDispatcher for CompositeDispatcher {
    fn dispatch(&self, event: &mut ModelEvent) {
        for dispatcher in &self.dispatchers {
            if event.is_propagation_stopped() {
                break;
            }
            dispatcher.dispatch(event);
        }
    }
}
