use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use feed_core::{Item, StoredItem};
use ingest_logging::ingest_warn;
use tokio::io::AsyncWriteExt;

use crate::persist::{ensure_store_dir, PersistError};

pub const ITEMS_FILENAME: &str = "items.jsonl";

/// Destination for ingested items. Ids are assigned by the store.
#[async_trait::async_trait]
pub trait ItemStore: Send + Sync {
    async fn save(&self, item: Item) -> Result<(), PersistError>;
    async fn list_all(&self) -> Result<Vec<StoredItem>, PersistError>;
}

#[derive(Debug, Default)]
pub struct MemoryItemStore {
    items: Mutex<Vec<StoredItem>>,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<StoredItem>>, PersistError> {
        self.items
            .lock()
            .map_err(|_| PersistError::Unavailable("memory store lock poisoned".into()))
    }
}

#[async_trait::async_trait]
impl ItemStore for MemoryItemStore {
    async fn save(&self, item: Item) -> Result<(), PersistError> {
        let mut items = self.lock()?;
        let id = items.len() as u64 + 1;
        items.push(StoredItem { id, item });
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<StoredItem>, PersistError> {
        Ok(self.lock()?.clone())
    }
}

/// Append-only JSON-lines store: one `StoredItem` per line in `{dir}/items.jsonl`.
#[derive(Debug)]
pub struct FileItemStore {
    path: PathBuf,
    next_id: tokio::sync::Mutex<u64>,
}

impl FileItemStore {
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, PersistError> {
        let dir = dir.as_ref();
        ensure_store_dir(dir)?;
        let path = dir.join(ITEMS_FILENAME);
        truncate_torn_tail(&path).await?;
        let existing = read_items(&path).await?;
        let next_id = existing.iter().map(|stored| stored.id).max().unwrap_or(0) + 1;
        Ok(Self {
            path,
            next_id: tokio::sync::Mutex::new(next_id),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl ItemStore for FileItemStore {
    async fn save(&self, item: Item) -> Result<(), PersistError> {
        let mut next_id = self.next_id.lock().await;
        let stored = StoredItem { id: *next_id, item };
        let mut line = serde_json::to_vec(&stored)?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let committed_len = file.metadata().await?.len();
        if let Err(err) = write_line(&mut file, &line).await {
            // Drop the partial record so the next append starts on a clean line.
            if let Err(rollback) = file.set_len(committed_len).await {
                ingest_warn!(
                    "Failed to roll back partial write in {:?}: {}",
                    self.path,
                    rollback
                );
            }
            return Err(err.into());
        }

        *next_id += 1;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<StoredItem>, PersistError> {
        // Hold the writer lock so a half-written line is never observed.
        let _guard = self.next_id.lock().await;
        read_items(&self.path).await
    }
}

async fn write_line(file: &mut tokio::fs::File, line: &[u8]) -> std::io::Result<()> {
    file.write_all(line).await?;
    file.flush().await?;
    file.sync_data().await
}

/// Cuts an unterminated final record left by an interrupted write.
async fn truncate_torn_tail(path: &Path) -> Result<(), PersistError> {
    let content = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err.into()),
    };
    if content.is_empty() || content.ends_with(b"\n") {
        return Ok(());
    }
    let keep = content
        .iter()
        .rposition(|&byte| byte == b'\n')
        .map_or(0, |pos| pos + 1);
    ingest_warn!(
        "Truncating {} byte(s) of unterminated record at end of {:?}",
        content.len() - keep,
        path
    );
    let file = tokio::fs::OpenOptions::new().write(true).open(path).await?;
    file.set_len(keep as u64).await?;
    file.sync_data().await?;
    Ok(())
}

async fn read_items(path: &Path) -> Result<Vec<StoredItem>, PersistError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };

    let mut items = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<StoredItem>(line) {
            Ok(stored) => items.push(stored),
            Err(err) => {
                ingest_warn!(
                    "Skipping unreadable record at {:?}:{}: {}",
                    path,
                    index + 1,
                    err
                );
            }
        }
    }
    Ok(items)
}
