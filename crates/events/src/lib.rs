#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for the bridge update agent
//!
//! Library crates never log or print. They emit [`AppEvent`]s through an
//! [`EventSender`] and the binary decides how each event is rendered, which
//! keeps the pipeline crates free of any output policy.
//!
//! ## Architecture
//!
//! - **Domain-driven events**: grouped by stage of the pipeline (download, install, sync, schedule)
//! - **Unified `EventEmitter` trait**: one API whether you hold a sender or a struct that owns one
//! - **Tracing integration**: every event knows its log level and target

pub mod events;
pub use events::{
    AppEvent, DownloadEvent, FailureContext, GeneralEvent, InstallEvent, ScheduleEvent, SyncEvent,
};

use tokio::sync::mpsc::UnboundedSender;

/// Type alias for the event sender
pub type EventSender = UnboundedSender<AppEvent>;

/// Type alias for the event receiver
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<AppEvent>;

/// Create a new event channel
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events
///
/// Implementors only supply [`EventEmitter::event_sender`]; a component built
/// without a sender silently drops its events.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Emit an event through this emitter
    fn emit(&self, event: AppEvent) {
        if let Some(sender) = self.event_sender() {
            // Receiver gone means nobody is listening any more
            let _ = sender.send(event);
        }
    }

    /// Emit a debug log event
    fn emit_debug(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::debug(message)));
    }

    /// Emit a warning event
    fn emit_warning(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning(message)));
    }
}

/// `EventSender` can be used directly where an `EventEmitter` is expected
impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}

impl EventEmitter for Option<EventSender> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sender_delivers_in_order() {
        let (tx, mut rx) = channel();
        tx.emit_debug("resolving");
        tx.emit_warning("careful");

        assert!(matches!(
            rx.recv().await,
            Some(AppEvent::General(GeneralEvent::DebugLog { .. }))
        ));
        assert!(matches!(
            rx.recv().await,
            Some(AppEvent::General(GeneralEvent::Warning { message })) if message == "careful"
        ));
    }

    #[test]
    fn missing_sender_drops_events() {
        let none: Option<EventSender> = None;
        none.emit_warning("nobody hears this");
    }

    #[test]
    fn closed_receiver_is_not_an_error() {
        let (tx, rx) = channel();
        drop(rx);
        tx.emit_debug("after close");
    }
}
