use std::path::{Path, PathBuf};

use fs_err as fs;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::wire::InboundRequest;

/// Best-effort persistence of submitted wizard state.
///
/// Saves run on the blocking pool and are never awaited by the request path.
/// Errors go to the `draft` log target and nowhere else.
#[derive(Debug, Clone)]
pub struct DraftSaver {
    dir: PathBuf,
}

impl DraftSaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, tx: Uuid) -> PathBuf {
        self.dir.join(format!("{tx}.json"))
    }

    /// The returned handle may be dropped; the save still completes.
    pub fn spawn_save(&self, tx: Uuid, draft: InboundRequest) -> JoinHandle<()> {
        let path = self.path_for(tx);
        tokio::task::spawn_blocking(move || match write_draft(&path, &draft) {
            Ok(()) => tracing::debug!(target: "draft", %tx, path = %path.display(), "draft saved"),
            Err(e) => tracing::warn!(target: "draft", %tx, error = %e, "draft save failed"),
        })
    }
}

fn write_draft(path: &Path, draft: &InboundRequest) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_vec_pretty(draft)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> InboundRequest {
        InboundRequest {
            recipient_name: Some("Sarah".into()),
            selected_templates: vec!["hero".into()],
            ..InboundRequest::default()
        }
    }

    #[tokio::test]
    async fn writes_draft_json() {
        let dir = tempfile::tempdir().unwrap();
        let saver = DraftSaver::new(dir.path().join("drafts"));
        let tx = Uuid::new_v4();
        saver.spawn_save(tx, draft()).await.unwrap();
        let saved: InboundRequest =
            serde_json::from_slice(&fs::read(saver.path_for(tx)).unwrap()).unwrap();
        assert_eq!(saved.recipient_name.as_deref(), Some("Sarah"));
    }

    #[tokio::test]
    async fn failure_is_contained() {
        let blocker = tempfile::NamedTempFile::new().unwrap();
        let saver = DraftSaver::new(blocker.path().join("drafts"));
        // the task itself completes normally even though the write fails
        saver.spawn_save(Uuid::new_v4(), draft()).await.unwrap();
    }
}
