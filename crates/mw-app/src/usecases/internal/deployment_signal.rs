use std::sync::Arc;

use mw_core::ports::{ClockPort, FileUpdate, RemoteStorePort};
use mw_core::remote::deployment_marker_path;
use mw_core::time::to_iso_millis;
use serde_json::json;
use tracing::{debug, warn};

/// Writes the `last-update.json` marker a static-site deployment watches.
///
/// Marker writes never fail the operation that triggered them.
#[derive(Clone)]
pub struct DeploymentSignal {
    remote: Arc<dyn RemoteStorePort>,
    clock: Arc<dyn ClockPort>,
    marker_path: Option<String>,
}

impl DeploymentSignal {
    pub fn new(
        remote: Arc<dyn RemoteStorePort>,
        clock: Arc<dyn ClockPort>,
        marker_dir: Option<&str>,
    ) -> Self {
        Self {
            remote,
            clock,
            marker_path: marker_dir.map(deployment_marker_path),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.marker_path.is_some()
    }

    /// The marker as a file update, for inclusion in a batch commit.
    pub fn marker_update(&self, reason: &str) -> Option<FileUpdate> {
        let path = self.marker_path.as_ref()?;
        let body = json!({
            "timestamp": to_iso_millis(&self.clock.now()),
            "reason": reason,
        });
        Some(FileUpdate::new(path.clone(), body.to_string()))
    }

    /// Write the marker as its own revision.
    pub async fn signal(&self, reason: &str) {
        let Some(update) = self.marker_update(reason) else {
            return;
        };

        let sha = match self.remote.get_file(&update.path).await {
            Ok(existing) => existing.map(|file| file.sha),
            Err(err) => {
                warn!(error = %err, "could not read deployment marker");
                None
            }
        };

        let message = format!("Trigger deployment: {reason}");
        match self
            .remote
            .put_file(&update.path, &update.content, &message, sha.as_deref())
            .await
        {
            Ok(()) => debug!(reason, "deployment marker written"),
            Err(err) => warn!(error = %err, reason, "failed to write deployment marker"),
        }
    }
}
