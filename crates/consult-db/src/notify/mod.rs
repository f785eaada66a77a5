//! Bundled `NotificationDispatcher` implementations.
//!
//! - [`LogDispatcher`] records events through `tracing` only.
//! - [`outbox::OutboxDispatcher`] appends events to per-recipient JSONL files.
//! - [`memory::MemoryDispatcher`] collects events in process (tests, embedding).

pub mod memory;
pub mod outbox;

use async_trait::async_trait;
use consult_core::events::ConsultationEvent;
use consult_core::ports::{NotificationDispatcher, NotifyError};

pub use memory::MemoryDispatcher;
pub use outbox::OutboxDispatcher;

/// Logs each event at info level and delivers nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn dispatch(&self, event: &ConsultationEvent) -> Result<(), NotifyError> {
        tracing::info!(
            kind = event.kind(),
            consultation_id = event.consultation_id(),
            recipient = event.recipient_id(),
            "consultation event"
        );
        Ok(())
    }
}
