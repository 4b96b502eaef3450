//! Replay a recorded event stream through the service

use anyhow::{Context, Result};
use rejoin_core::{
    LoggingPlatform, MemberEvent, PersistService, ServiceConfig, ServiceStats, StaticConfigSource,
    TracingAuditSink,
};
use rejoin_store::{JsonFileStateStore, MemoryAllowList, MemoryStateStore, PersistedStateStore};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Parse JSON-lines events, skipping blank lines and `#` comments
pub(crate) fn parse_events(input: &str) -> Result<Vec<MemberEvent>> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(n, line)| {
            serde_json::from_str(line).with_context(|| format!("invalid event on line {}", n + 1))
        })
        .collect()
}

pub(crate) async fn replay(
    config: &ServiceConfig,
    events: Vec<MemberEvent>,
    store_path: Option<&Path>,
) -> Result<ServiceStats> {
    let store: Arc<dyn PersistedStateStore> = match store_path {
        Some(path) => Arc::new(
            JsonFileStateStore::open(path)
                .await
                .with_context(|| format!("failed to open store {}", path.display()))?,
        ),
        None => Arc::new(MemoryStateStore::new()),
    };

    let service = Arc::new(PersistService::new(
        store,
        Arc::new(LoggingPlatform),
        Arc::new(TracingAuditSink),
        Arc::new(MemoryAllowList::from_communities(
            config.allowed_communities.iter().cloned(),
        )),
        Arc::new(StaticConfigSource::from_service_config(config)),
        config.handler_options(),
    ));

    let (tx, rx) = mpsc::channel(64);
    let runner = tokio::spawn(service.run(rx));

    tracing::info!(events = events.len(), "replaying events");
    for event in events {
        tx.send(event)
            .await
            .context("service stopped before all events were sent")?;
    }
    drop(tx);

    runner.await.context("service task panicked")
}
