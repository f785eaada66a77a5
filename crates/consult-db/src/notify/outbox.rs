//! JSONL notification outbox.
//!
//! Appends each event to `{outbox_dir}/{recipient_id}.jsonl` using
//! `serde_jsonlines::append_json_lines`, one envelope per line. A delivery
//! worker (outside this workspace) tails these files.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use consult_core::events::ConsultationEvent;
use consult_core::ports::{NotificationDispatcher, NotifyError};
use serde::{Deserialize, Serialize};

use crate::helpers::{fmt_timestamp, now};

/// Current outbox envelope version.
pub const OUTBOX_VERSION: u32 = 1;

/// One line of an outbox file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutboxRecord {
    pub v: u32,
    pub ts: String,
    pub recipient: String,
    pub event: ConsultationEvent,
}

/// Writes dispatched events to per-recipient JSONL files.
pub struct OutboxDispatcher {
    outbox_dir: PathBuf,
    enabled: bool,
}

impl OutboxDispatcher {
    /// Create a dispatcher writing under `outbox_dir`.
    ///
    /// Creates the directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError` if the directory cannot be created.
    pub fn new(outbox_dir: PathBuf) -> Result<Self, NotifyError> {
        std::fs::create_dir_all(&outbox_dir).map_err(|e| NotifyError::Other(e.into()))?;
        Ok(Self {
            outbox_dir,
            enabled: true,
        })
    }

    /// A dispatcher that accepts events and writes nothing.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            outbox_dir: PathBuf::new(),
            enabled: false,
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn outbox_dir(&self) -> &Path {
        &self.outbox_dir
    }

    /// Path of a recipient's outbox file.
    #[must_use]
    pub fn path_for(&self, recipient_id: &str) -> PathBuf {
        self.outbox_dir
            .join(format!("{}.jsonl", file_stem(recipient_id)))
    }

    /// Read back every record queued for a recipient, oldest first.
    ///
    /// A recipient with no file has an empty outbox.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError` if the file exists but cannot be parsed.
    pub fn read(&self, recipient_id: &str) -> Result<Vec<OutboxRecord>, NotifyError> {
        let path = self.path_for(recipient_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        serde_jsonlines::json_lines(&path)
            .map_err(|e| NotifyError::Other(e.into()))?
            .collect::<Result<Vec<OutboxRecord>, _>>()
            .map_err(|e| NotifyError::Other(e.into()))
    }

    fn append(&self, event: &ConsultationEvent) -> Result<(), NotifyError> {
        let record = OutboxRecord {
            v: OUTBOX_VERSION,
            ts: fmt_timestamp(&now()),
            recipient: event.recipient_id().to_string(),
            event: event.clone(),
        };
        serde_jsonlines::append_json_lines(self.path_for(&record.recipient), [&record])
            .map_err(|e| NotifyError::Delivery(format!("outbox append failed: {e}")))
    }
}

/// Keep recipient IDs from escaping the outbox directory.
fn file_stem(recipient_id: &str) -> String {
    recipient_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl NotificationDispatcher for OutboxDispatcher {
    async fn dispatch(&self, event: &ConsultationEvent) -> Result<(), NotifyError> {
        if !self.enabled {
            return Ok(());
        }
        self.append(event)
    }
}
