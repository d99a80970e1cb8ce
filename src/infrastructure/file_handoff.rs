use crate::domain::ports::ReferenceHandoff;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::sync::Mutex;

/// A handoff slot backed by a JSON object file.
///
/// A missing file is an empty slot. `take` rewrites the file without the key,
/// so a value survives exactly one read even across processes.
pub struct FileHandoff {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileHandoff {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<BTreeMap<String, String>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn staging_path(&self) -> PathBuf {
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        PathBuf::from(staging)
    }

    /// Writes a sibling file and renames it over the slot, so readers see
    /// either the old contents or the new ones.
    async fn save(&self, slots: &BTreeMap<String, String>) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(slots)?;
        let staging = self.staging_path();
        tokio::fs::write(&staging, bytes).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl ReferenceHandoff for FileHandoff {
    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut slots = self.load().await?;
        slots.insert(key.to_string(), value.to_string());
        self.save(&slots).await
    }

    async fn take(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().await;
        let mut slots = self.load().await?;
        let value = slots.remove(key);
        if value.is_some() {
            self.save(&slots).await?;
        }
        Ok(value)
    }
}
