//! Filesystem implementation of [`ObjectStore`].
//!
//! Keys map to relative paths below the base directory. Writes are atomic
//! (temp file + rename) and metadata is stored as a JSON object in
//! `{key}.meta.json`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docchat_core::{Error, ObjectStore, Result, StoredObject};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// Suffix of metadata sidecar files.
pub const METADATA_SUFFIX: &str = ".meta.json";

const TEMP_SUFFIX: &str = ".tmp";
const HEALTH_CHECK_DIR: &str = ".health-check";

/// Reject keys that are empty, absolute, or escape the base directory.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidInput("Storage key is empty".to_string()));
    }
    if key.starts_with('/') || key.contains('\\') || key.contains('\0') {
        return Err(Error::InvalidInput(format!("Invalid storage key: {}", key)));
    }
    if key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(Error::InvalidInput(format!("Invalid storage key: {}", key)));
    }
    if key.ends_with(METADATA_SUFFIX) || key.ends_with(TEMP_SUFFIX) {
        return Err(Error::InvalidInput(format!("Reserved storage key: {}", key)));
    }
    Ok(())
}

/// Object store backed by a local directory.
pub struct FilesystemStore {
    base_path: PathBuf,
}

impl FilesystemStore {
    /// Create a store rooted at the given base directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.base_path.join(key)
    }

    fn metadata_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}{}", key, METADATA_SUFFIX))
    }

    /// Round-trip a probe file so permission or mount problems show up at
    /// startup instead of on the first upload.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        let test_dir = self.base_path.join(HEALTH_CHECK_DIR);
        let test_file = test_dir.join("probe.bin");

        fs::create_dir_all(&test_dir)
            .await
            .map_err(|e| format!("create_dir_all({:?}): {}", test_dir, e))?;

        let data = b"storage-health-check";
        fs::write(&test_file, data)
            .await
            .map_err(|e| format!("write({:?}): {}", test_file, e))?;

        let read_data = fs::read(&test_file)
            .await
            .map_err(|e| format!("read({:?}): {}", test_file, e))?;
        if read_data != data {
            return Err("read-back mismatch".to_string());
        }

        fs::remove_file(&test_file)
            .await
            .map_err(|e| format!("remove_file({:?}): {}", test_file, e))?;
        let _ = fs::remove_dir(&test_dir).await;

        Ok(())
    }

    async fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                warn!(parent = %parent.display(), error = %e, "store: create_dir_all failed");
                e
            })?;
        }

        let mut temp_name = path.as_os_str().to_owned();
        temp_name.push(format!(".{}{}", Uuid::new_v4().simple(), TEMP_SUFFIX));
        let temp_path = PathBuf::from(temp_name);

        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            warn!(temp_path = %temp_path.display(), error = %e, "store: File::create failed");
            e
        })?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, path).await.map_err(|e| {
            warn!(from = %temp_path.display(), to = %path.display(), error = %e, "store: rename failed");
            e
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, std::fs::Permissions::from_mode(0o644)).await?;
        }

        Ok(())
    }

    fn relative_key(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.base_path).ok()?;
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}

#[async_trait]
impl ObjectStore for FilesystemStore {
    async fn put(
        &self,
        key: &str,
        data: &[u8],
        metadata: HashMap<String, String>,
    ) -> Result<String> {
        validate_key(key)?;
        let path = self.object_path(key);
        debug!(storage_key = %key, size = data.len(), "store: put");

        self.write_atomic(&path, data).await?;
        let meta_bytes = serde_json::to_vec(&metadata)?;
        self.write_atomic(&self.metadata_path(key), &meta_bytes)
            .await?;

        Ok(key.to_string())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        validate_key(key)?;
        match fs::read(self.object_path(key)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("Object {}", key)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        for path in [self.object_path(key), self.metadata_path(key)] {
            if fs::try_exists(&path).await? {
                fs::remove_file(&path).await?;
            }
        }
        debug!(storage_key = %key, "store: delete");
        Ok(())
    }

    async fn head_metadata(&self, key: &str) -> Result<HashMap<String, String>> {
        validate_key(key)?;
        if !fs::try_exists(self.object_path(key)).await? {
            return Err(Error::NotFound(format!("Object {}", key)));
        }
        match fs::read(self.metadata_path(key)).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(storage_key = %key, "store: object has no metadata sidecar");
                Ok(HashMap::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<StoredObject>> {
        let mut objects = Vec::new();
        if !fs::try_exists(&self.base_path).await? {
            return Ok(objects);
        }

        let mut pending = vec![self.base_path.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let name = entry.file_name().to_string_lossy().into_owned();
                let file_type = entry.file_type().await?;

                if file_type.is_dir() {
                    if name != HEALTH_CHECK_DIR {
                        pending.push(path);
                    }
                    continue;
                }
                if name.ends_with(METADATA_SUFFIX) || name.ends_with(TEMP_SUFFIX) {
                    continue;
                }

                let Some(key) = self.relative_key(&path) else {
                    continue;
                };
                let meta = entry.metadata().await?;
                let last_modified: DateTime<Utc> = meta
                    .modified()
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| Utc::now());
                objects.push(StoredObject {
                    key,
                    size: meta.len(),
                    last_modified,
                });
            }
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        debug!(result_count = objects.len(), "store: list");
        Ok(objects)
    }
}
