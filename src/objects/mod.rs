//! Object store seam
//!
//! The library core only sees this trait; the filesystem implementation
//! below stands in for a hosted blob service and mimics its contract
//! (opaque references, idempotent delete, expiring signed URLs).

use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::OffsetDateTime;

pub trait ObjectStore {
    /// Store bytes and return an opaque object reference.
    fn put(&self, owner_id: &str, ext: &str, bytes: &[u8]) -> anyhow::Result<String>;

    /// Delete an object; deleting a missing object is a no-op.
    fn delete(&self, object_ref: &str) -> anyhow::Result<()>;

    /// A time-limited URL for serving the object.
    fn signed_url(&self, object_ref: &str, ttl: Duration) -> String;
}

/// Local filesystem object store rooted at a configured directory.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, object_ref: &str) -> PathBuf {
        self.root.join(object_ref)
    }
}

impl ObjectStore for FsObjectStore {
    fn put(&self, owner_id: &str, ext: &str, bytes: &[u8]) -> anyhow::Result<String> {
        let now_ms = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        let object_ref = format!(
            "{}/{}_{}.{}",
            owner_id,
            now_ms,
            hex::encode(rand::random::<[u8; 4]>()),
            ext
        );

        let path = self.object_path(&object_ref);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create dir {}", parent.display()))?;
        }
        fs::write(&path, bytes).with_context(|| format!("write {}", path.display()))?;

        Ok(object_ref)
    }

    fn delete(&self, object_ref: &str) -> anyhow::Result<()> {
        let path = self.object_path(object_ref);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("delete {}", path.display())),
        }
    }

    fn signed_url(&self, object_ref: &str, ttl: Duration) -> String {
        let expires = OffsetDateTime::now_utc().unix_timestamp() + ttl.as_secs() as i64;
        format!(
            "file://{}?expires={}",
            absolute_display(&self.object_path(object_ref)),
            expires
        )
    }
}

fn absolute_display(path: &Path) -> String {
    path.canonicalize()
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}
