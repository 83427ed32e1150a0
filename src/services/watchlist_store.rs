use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::Utc;
use serde_json::Value;
use tokio::{fs, io::AsyncWriteExt, sync::Mutex};

use crate::{
    error::{PersistenceError, StoreError, ValidationError},
    models::{NewItem, WatchedItem},
};

pub type Snapshot = Arc<Vec<WatchedItem>>;

/// Owner of the watchlist and its data file.
///
/// All mutations go through one async mutex, and each one rewrites the whole
/// file before the new list replaces the old one. Readers get an immutable
/// `Arc` snapshot, so a tick that is already iterating never sees a half-applied
/// add or remove.
pub struct WatchlistStore {
    path: PathBuf,
    items: Mutex<Snapshot>,
}

/// Reads the watchlist file. A missing file yields an empty list.
///
/// Records that cannot be decoded are skipped, and a file that is not a JSON
/// array at all yields an empty list. In both cases the file is first backed up
/// next to the original, so the next write cannot destroy the only copy.
pub async fn load(path: &Path) -> Vec<WatchedItem> {
    let bytes = match fs::read(path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "no watchlist file yet, starting empty");
            return Vec::new();
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not read watchlist, starting empty");
            return Vec::new();
        }
    };

    let records = match serde_json::from_slice::<Vec<Value>>(&bytes) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "malformed watchlist, starting empty");
            back_up(path, &bytes).await;
            return Vec::new();
        }
    };

    let mut items: Vec<WatchedItem> = Vec::with_capacity(records.len());
    let mut skipped = 0;
    for record in records {
        match serde_json::from_value::<WatchedItem>(record) {
            Ok(item) if items.iter().any(|i| i.id == item.id) => {
                tracing::warn!(item_id = %item.id, "duplicate watchlist entry skipped");
                skipped += 1;
            }
            Ok(item) => items.push(item),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable watchlist entry skipped");
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        back_up(path, &bytes).await;
    }
    items
}

/// Path next to `path` with `suffix` appended to the file name.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

async fn back_up(path: &Path, bytes: &[u8]) {
    let backup = sibling(path, &format!(".{}.bad", Utc::now().timestamp()));
    match fs::write(&backup, bytes).await {
        Ok(()) => tracing::warn!(backup = %backup.display(), "original watchlist saved"),
        Err(e) => tracing::error!(backup = %backup.display(), error = %e, "could not back up watchlist"),
    }
}

impl WatchlistStore {
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let items = load(&path).await;
        tracing::info!(count = items.len(), path = %path.display(), "watchlist loaded");
        Self {
            path,
            items: Mutex::new(Arc::new(items)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.items.lock().await.clone()
    }

    pub async fn add(&self, new_item: NewItem) -> Result<Snapshot, StoreError> {
        let item = new_item.validate()?;

        let mut guard = self.items.lock().await;
        if guard.iter().any(|i| i.id == item.id) {
            return Err(ValidationError::DuplicateId(item.id).into());
        }

        let mut next = guard.to_vec();
        next.push(item);
        self.commit(&mut guard, next).await?;

        Ok(guard.clone())
    }

    /// Removes every entry with `id`. Absent ids are not an error.
    pub async fn remove(&self, id: &str) -> Result<Snapshot, PersistenceError> {
        let mut guard = self.items.lock().await;

        let next: Vec<WatchedItem> = guard.iter().filter(|i| i.id != id).cloned().collect();
        if next.len() != guard.len() {
            self.commit(&mut guard, next).await?;
        }

        Ok(guard.clone())
    }

    /// Stores dedup state for an item. Returns false if the item was removed meanwhile.
    pub async fn record_alert(
        &self,
        id: &str,
        price: f64,
        at: i64,
    ) -> Result<bool, PersistenceError> {
        let mut guard = self.items.lock().await;

        let mut next = guard.to_vec();
        let Some(item) = next.iter_mut().find(|i| i.id == id) else {
            return Ok(false);
        };
        item.last_alerted_price = Some(price);
        item.last_alerted_at = Some(at);

        self.commit(&mut guard, next).await?;
        Ok(true)
    }

    /// Drops dedup state so the next drop below the threshold alerts again.
    pub async fn clear_alert(&self, id: &str) -> Result<bool, PersistenceError> {
        let mut guard = self.items.lock().await;

        let mut next = guard.to_vec();
        let Some(item) = next.iter_mut().find(|i| i.id == id) else {
            return Ok(false);
        };
        if item.last_alerted_price.is_none() && item.last_alerted_at.is_none() {
            return Ok(false);
        }
        item.last_alerted_price = None;
        item.last_alerted_at = None;

        self.commit(&mut guard, next).await?;
        Ok(true)
    }

    async fn commit(
        &self,
        current: &mut Snapshot,
        next: Vec<WatchedItem>,
    ) -> Result<(), PersistenceError> {
        if let Err(e) = persist(&self.path, &next).await {
            tracing::error!(path = %self.path.display(), error = %e, "failed to persist watchlist");
            return Err(e);
        }
        *current = Arc::new(next);
        Ok(())
    }
}

/// Writes the full list to a sibling temp file, then renames it over `path`.
pub async fn persist(path: &Path, items: &[WatchedItem]) -> Result<(), PersistenceError> {
    let json = serde_json::to_vec_pretty(items)?;
    let tmp = sibling(path, ".tmp");

    let mut file = fs::File::create(&tmp).await?;
    file.write_all(&json).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&tmp, path).await?;
    sync_parent(path).await?;
    Ok(())
}

// makes the rename itself durable
#[cfg(unix)]
async fn sync_parent(path: &Path) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    fs::File::open(dir).await?.sync_all().await
}

#[cfg(not(unix))]
async fn sync_parent(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
