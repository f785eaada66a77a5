//! Notification dispatch configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

fn default_outbox_dir() -> String {
    String::from(".consult/outbox")
}

const fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationsConfig {
    /// Write events to the JSONL outbox. When false, events are only logged.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Directory holding one `{doctor_id}.jsonl` outbox file per recipient.
    #[serde(default = "default_outbox_dir")]
    pub outbox_dir: String,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            outbox_dir: default_outbox_dir(),
        }
    }
}

impl NotificationsConfig {
    #[must_use]
    pub fn outbox_path(&self) -> PathBuf {
        PathBuf::from(&self.outbox_dir)
    }
}
