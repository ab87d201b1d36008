//! Source store event emission helpers.
//!
//! Each helper logs through tracing and publishes the matching structured event.

use crate::events::structured::{publish_global, Event, SourceEvent, SourceStoreEvent};

use super::{errors::BindHistoryError, source::SourceRef};

pub fn emit_policy_appended(id: &str, position: usize) {
    tracing::info!(target = "source_store", policy = id, position, "policy appended");
    publish_global(Event::SourceStore(SourceStoreEvent::PolicyAppended {
        id: id.to_string(),
        position,
    }));
}

pub fn emit_policy_removed(id: &str, remaining: usize) {
    tracing::info!(target = "source_store", policy = id, remaining, "policy removed");
    publish_global(Event::SourceStore(SourceStoreEvent::PolicyRemoved {
        id: id.to_string(),
        remaining,
    }));
}

pub fn emit_bind_history_toggled(recording: bool) {
    tracing::info!(target = "source_store", recording, "bind history recording toggled");
    publish_global(Event::SourceStore(SourceStoreEvent::BindHistoryToggled {
        recording,
    }));
}

pub fn emit_bind_recorded(source_id: &str, address: &str, records: usize) {
    tracing::debug!(
        target = "source_store",
        source = source_id,
        address,
        records,
        "bind history saved"
    );
    publish_global(Event::SourceStore(SourceStoreEvent::BindRecorded {
        source_id: source_id.to_string(),
        address: address.to_string(),
        records,
    }));
}

pub fn emit_bind_failed(source_id: &str, address: &str, err: &BindHistoryError) {
    tracing::error!(
        target = "source_store",
        source = source_id,
        address,
        category = err.category(),
        error = %err,
        "save bind history failed"
    );
    publish_global(Event::SourceStore(SourceStoreEvent::BindFailed {
        source_id: source_id.to_string(),
        address: address.to_string(),
        category: err.category().to_string(),
        message: err.to_string(),
    }));
}

fn collect_ids(sources: &[SourceRef]) -> Vec<String> {
    sources.iter().map(|s| s.id().to_string()).collect()
}

pub fn emit_sources_added(sources: &[SourceRef]) {
    if sources.is_empty() {
        return;
    }
    let ids = collect_ids(sources);
    tracing::info!(target = "source_store", sources = ?ids, "sources added");
    publish_global(Event::Source(SourceEvent::Added { ids }));
}

pub fn emit_sources_removed(sources: &[SourceRef]) {
    if sources.is_empty() {
        return;
    }
    let ids = collect_ids(sources);
    tracing::info!(target = "source_store", sources = ?ids, "sources removed");
    publish_global(Event::Source(SourceEvent::Removed { ids }));
}
