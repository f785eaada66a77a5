use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use consult_config::ConsultConfig;
use consult_core::ports::NotificationDispatcher;
use consult_db::ConsultDb;
use consult_db::notify::{LogDispatcher, OutboxDispatcher};
use consult_db::service::ConsultService;

/// Shared state for command handlers and the HTTP server.
pub struct AppContext {
    pub service: ConsultService,
    pub config: ConsultConfig,
}

impl AppContext {
    /// Open the database and wire the notification dispatcher from config.
    pub async fn init(config: ConsultConfig) -> anyhow::Result<Self> {
        let db = ConsultDb::open_local_with_timeout(
            &config.database.path,
            Duration::from_millis(config.database.busy_timeout_ms),
        )
        .await
        .with_context(|| format!("failed to open database at {}", config.database.path))?;

        let notifier: Arc<dyn NotificationDispatcher> = if config.notifications.enabled {
            Arc::new(
                OutboxDispatcher::new(config.notifications.outbox_path())
                    .context("failed to create notification outbox")?,
            )
        } else {
            Arc::new(LogDispatcher)
        };

        if config.database.is_in_memory() {
            tracing::warn!("database is in memory; nothing is kept after exit");
        }
        tracing::debug!(
            database = %config.database.path,
            outbox = config.notifications.enabled,
            "application context ready"
        );

        Ok(Self {
            service: ConsultService::from_db(Arc::new(db), notifier),
            config,
        })
    }

    /// Outbox reader for the configured directory.
    pub fn outbox(&self) -> anyhow::Result<OutboxDispatcher> {
        OutboxDispatcher::new(self.config.notifications.outbox_path())
            .context("failed to open notification outbox")
    }
}
