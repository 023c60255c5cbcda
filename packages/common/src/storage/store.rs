use std::path::PathBuf;

use tokio::fs;
use tokio::io::BufReader;

use super::error::StorageError;
use super::path::StoredPath;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn tokio::io::AsyncRead + Unpin + Send>;

/// Filesystem-backed store for uploaded task files.
///
/// Files live under `{base_path}/{shard}/{name}` where the whole relative
/// path is a freshly generated [`StoredPath`]. Writes go through a temp file
/// plus rename so a crash never leaves a half-written file at its final
/// location.
pub struct FileStore {
    base_path: PathBuf,
    max_size: u64,
}

impl FileStore {
    pub async fn new(base_path: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            max_size,
        })
    }

    fn full_path(&self, key: &StoredPath) -> PathBuf {
        self.base_path.join(key.as_str())
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }

    /// Store bytes under a fresh unpredictable path and return it.
    pub async fn save(&self, data: &[u8]) -> Result<StoredPath, StorageError> {
        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        let key = StoredPath::generate();
        let final_path = self.full_path(&key);

        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, &final_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(key)
    }

    /// Overwrite the bytes at an existing path.
    pub async fn replace(&self, key: &StoredPath, data: &[u8]) -> Result<(), StorageError> {
        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        let final_path = self.full_path(key);
        if !fs::try_exists(&final_path).await? {
            return Err(StorageError::NotFound(key.to_string()));
        }

        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&temp_path, &final_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Open a stored file as a streaming async reader.
    pub async fn open(&self, key: &StoredPath) -> Result<BoxReader, StorageError> {
        match fs::File::open(self.full_path(key)).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Read a stored file fully into memory.
    pub async fn read(&self, key: &StoredPath) -> Result<Vec<u8>, StorageError> {
        match fs::read(self.full_path(key)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a stored file. Returns `false` if it did not exist.
    pub async fn delete(&self, key: &StoredPath) -> Result<bool, StorageError> {
        match fs::remove_file(self.full_path(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_store() -> (FileStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("files"), 1024 * 1024)
            .await
            .unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn save_read_round_trip() {
        let (store, _dir) = temp_store().await;
        let key = store.save(b"task handout").await.unwrap();
        assert_eq!(store.read(&key).await.unwrap(), b"task handout");
    }

    #[tokio::test]
    async fn save_generates_distinct_paths_for_same_content() {
        let (store, _dir) = temp_store().await;
        let a = store.save(b"same bytes").await.unwrap();
        let b = store.save(b"same bytes").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn replace_overwrites_in_place() {
        let (store, _dir) = temp_store().await;
        let key = store.save(b"v1").await.unwrap();
        store.replace(&key, b"v2").await.unwrap();
        assert_eq!(store.read(&key).await.unwrap(), b"v2");
    }

    #[tokio::test]
    async fn replace_missing_is_not_found() {
        let (store, _dir) = temp_store().await;
        let key = StoredPath::generate();
        assert!(matches!(
            store.replace(&key, b"x").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn size_limit_enforced_and_tmp_cleaned() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("files"), 10).await.unwrap();

        let result = store.save(b"this is more than 10 bytes").await;
        assert!(matches!(
            result,
            Err(StorageError::SizeLimitExceeded { .. })
        ));

        let tmp_entries: Vec<_> = std::fs::read_dir(dir.path().join("files/.tmp"))
            .unwrap()
            .collect();
        assert_eq!(tmp_entries.len(), 0);
    }

    #[tokio::test]
    async fn read_missing_is_not_found() {
        let (store, _dir) = temp_store().await;
        let key = StoredPath::generate();
        assert!(matches!(
            store.read(&key).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn open_streams_stored_bytes() {
        use tokio::io::AsyncReadExt;

        let (store, _dir) = temp_store().await;
        let key = store.save(b"streamed").await.unwrap();
        let mut reader = store.open(&key).await.unwrap();
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"streamed");
    }

    #[tokio::test]
    async fn delete_removes_file() {
        let (store, _dir) = temp_store().await;
        let key = store.save(b"delete me").await.unwrap();
        assert!(store.delete(&key).await.unwrap());
        assert!(!store.delete(&key).await.unwrap());
        assert!(matches!(
            store.read(&key).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn constructor_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("deep/nested/files");
        assert!(!base.exists());

        let _store = FileStore::new(base.clone(), 1024).await.unwrap();

        assert!(base.exists());
        assert!(base.join(".tmp").exists());
    }
}
