use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use consult_core::events::ConsultationEvent;
use consult_core::ports::{NotificationDispatcher, NotifyError};

/// Keeps every dispatched event in memory, in dispatch order.
#[derive(Debug, Default)]
pub struct MemoryDispatcher {
    events: Mutex<Vec<ConsultationEvent>>,
}

impl MemoryDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ConsultationEvent>> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    #[must_use]
    pub fn events(&self) -> Vec<ConsultationEvent> {
        self.lock().clone()
    }

    /// Events addressed to one doctor.
    #[must_use]
    pub fn events_for(&self, recipient_id: &str) -> Vec<ConsultationEvent> {
        self.lock()
            .iter()
            .filter(|e| e.recipient_id() == recipient_id)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[async_trait]
impl NotificationDispatcher for MemoryDispatcher {
    async fn dispatch(&self, event: &ConsultationEvent) -> Result<(), NotifyError> {
        self.lock().push(event.clone());
        Ok(())
    }
}
