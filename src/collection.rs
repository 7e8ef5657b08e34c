use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::PathBuf;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// An in-memory list of documents mirrored to a single JSON file.
///
/// The whole file is rewritten after each change, so callers hold the write
/// guard from check to [`Collection::push_and_save`].
pub struct Collection<T> {
    path: PathBuf,
    items: RwLock<Vec<T>>,
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let items = if path.exists() {
            let data = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&data)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            Vec::new()
        };

        Ok(Self {
            path,
            items: RwLock::new(items),
        })
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, Vec<T>> {
        self.items.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, Vec<T>> {
        self.items.write().await
    }

    /// Appends `item` and persists the list. A failed write takes the item
    /// back out, so memory never holds what the file does not.
    pub async fn push_and_save(&self, items: &mut Vec<T>, item: T) -> Result<()> {
        items.push(item);
        if let Err(e) = self.save(items).await {
            items.pop();
            return Err(e);
        }
        Ok(())
    }

    pub async fn save(&self, items: &[T]) -> Result<()> {
        let json = serde_json::to_string_pretty(items)
            .with_context(|| format!("Failed to serialize {}", self.path.display()))?;
        tokio::fs::write(&self.path, json)
            .await
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_opens_empty() {
        let temp_dir = TempDir::new().unwrap();
        let collection: Collection<String> =
            Collection::open(temp_dir.path().join("absent.json")).unwrap();
        assert!(collection.read().await.is_empty());
    }

    #[tokio::test]
    async fn saved_items_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("words.json");

        let collection: Collection<String> = Collection::open(&path).unwrap();
        {
            let mut items = collection.write().await;
            items.push("alpha".to_string());
            items.push("beta".to_string());
            collection.save(&items).await.unwrap();
        }

        let reopened: Collection<String> = Collection::open(&path).unwrap();
        assert_eq!(*reopened.read().await, vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn failed_push_is_rolled_back() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("words.json");
        let collection: Collection<String> = Collection::open(&path).unwrap();
        fs::create_dir(&path).unwrap();

        let mut items = collection.write().await;
        let result = collection.push_and_save(&mut items, "lost".to_string()).await;

        assert!(result.is_err());
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.json");
        fs::write(&path, "{not json").unwrap();

        let result: Result<Collection<String>> = Collection::open(&path);
        assert!(result.is_err());
    }
}
