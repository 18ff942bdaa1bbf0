//! Mapping directory watcher for hot reload.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::routing::MappingStore;

/// Monitors the descriptor directory and reloads the store on change.
pub struct MappingWatcher {
    path: PathBuf,
    store: Arc<MappingStore>,
    poll_interval: Duration,
    update_tx: mpsc::UnboundedSender<u64>,
}

impl MappingWatcher {
    /// Create a new MappingWatcher.
    ///
    /// Returns the watcher and a receiver of newly published generations.
    pub fn new(
        path: &Path,
        store: Arc<MappingStore>,
        poll_interval: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<u64>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                store,
                poll_interval,
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. The returned handle must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let store = Arc::clone(&self.store);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if is_descriptor_change(&event) => {
                    tracing::info!(paths = ?event.paths, "Mapping change detected, reloading");
                    // Queue behind any running reload; it may have scanned before this change.
                    match store.reload_queued() {
                        Ok(generation) => {
                            let _ = tx.send(generation);
                        }
                        Err(e) => {
                            tracing::error!("Failed to reload mappings: {}. Keeping current mappings.", e);
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(self.poll_interval),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Mapping watcher started");
        Ok(watcher)
    }
}

fn is_descriptor_change(event: &Event) -> bool {
    let relevant_kind = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    );
    relevant_kind
        && event
            .paths
            .iter()
            .any(|p| p.extension().is_some_and(|ext| ext == "xml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind};

    #[test]
    fn test_only_xml_changes_trigger_reload() {
        let xml = Event::new(EventKind::Modify(ModifyKind::Any)).add_path(PathBuf::from("/m/v1.xml"));
        assert!(is_descriptor_change(&xml));

        let swap = Event::new(EventKind::Create(CreateKind::File)).add_path(PathBuf::from("/m/.v1.xml.swp"));
        assert!(!is_descriptor_change(&swap));

        let access = Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path(PathBuf::from("/m/v1.xml"));
        assert!(!is_descriptor_change(&access));
    }
}
