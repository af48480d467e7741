//! Roast history.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{read_json, write_json, StoreError};
use crate::roast::RoastStyle;

pub const SESSIONS_FILE: &str = "sessions.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoastSession {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub input_text: String,
    pub style: RoastStyle,
    pub roast: String,
    #[serde(default)]
    pub image_path: Option<PathBuf>,
}

impl RoastSession {
    pub fn new(
        input_text: impl Into<String>,
        style: RoastStyle,
        roast: impl Into<String>,
        image_path: Option<PathBuf>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            input_text: input_text.into(),
            style,
            roast: roast.into(),
            image_path,
        }
    }
}

/// Persistent list of past roasts, oldest first.
pub trait SessionStore: Send + Sync {
    fn list(&self) -> Result<Vec<RoastSession>, StoreError>;
    fn append(&self, session: RoastSession) -> Result<(), StoreError>;
    /// Returns `false` when no session had that id.
    fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
    /// Returns the number of sessions removed.
    fn clear(&self) -> Result<usize, StoreError>;
}

pub struct FileSessionStore {
    path: PathBuf,
    limit: usize,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>, limit: usize) -> Self {
        Self {
            path: path.into(),
            limit: limit.max(1),
        }
    }

    pub fn in_dir(dir: &Path, limit: usize) -> Self {
        Self::new(dir.join(SESSIONS_FILE), limit)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn remove_image(session: &RoastSession) {
    let Some(path) = &session.image_path else {
        return;
    };
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed session image"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!(path = %path.display(), error = %err, "Failed to remove session image"),
    }
}

impl SessionStore for FileSessionStore {
    fn list(&self) -> Result<Vec<RoastSession>, StoreError> {
        read_json(&self.path)
    }

    fn append(&self, session: RoastSession) -> Result<(), StoreError> {
        let mut sessions = self.list()?;
        sessions.push(session);

        let overflow = sessions.len().saturating_sub(self.limit);
        let evicted: Vec<RoastSession> = sessions.drain(..overflow).collect();
        write_json(&self.path, &sessions)?;

        if !evicted.is_empty() {
            info!(count = evicted.len(), "Pruned old roast sessions");
        }
        evicted.iter().for_each(remove_image);
        Ok(())
    }

    fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut sessions = self.list()?;
        let Some(index) = sessions.iter().position(|s| s.id == id) else {
            return Ok(false);
        };
        let removed = sessions.remove(index);
        write_json(&self.path, &sessions)?;
        remove_image(&removed);
        Ok(true)
    }

    fn clear(&self) -> Result<usize, StoreError> {
        let sessions = self.list()?;
        write_json(&self.path, &Vec::<RoastSession>::new())?;
        sessions.iter().for_each(remove_image);
        Ok(sessions.len())
    }
}
