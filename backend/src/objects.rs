//! Object store.
//!
//! Objects live under `<root>/<bucket>/<path>`. Objects in public buckets are
//! reachable through a plain URL; every other bucket is only reachable
//! through a signed URL that carries an expiry and a token:
//!
//! `token = base64url(sha256(secret | bucket/path | expires))`
//!
//! Tokens are compared in constant time.

use crate::config::StorageConfig;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use subtle::ConstantTimeEq;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectError {
    #[error("invalid object path `{0}`")]
    InvalidPath(String),
    #[error("object `{0}` not found")]
    NotFound(String),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("signed URL has expired")]
    Expired,
    #[error("object store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct ObjectStore {
    root: PathBuf,
    secret: Vec<u8>,
    base_url: String,
    public_buckets: Vec<String>,
}

impl ObjectStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: config.root.clone(),
            secret: config.signing_secret.as_bytes().to_vec(),
            base_url: config.public_base_url.trim_end_matches('/').to_string(),
            public_buckets: config.public_buckets.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_public(&self, bucket: &str) -> bool {
        self.public_buckets.iter().any(|b| b == bucket)
    }

    /// Resolves an object to its file, refusing anything that could escape
    /// the bucket directory.
    pub fn object_path(&self, bucket: &str, path: &str) -> Result<PathBuf, ObjectError> {
        let invalid = || ObjectError::InvalidPath(format!("{}/{}", bucket, path));
        if bucket.is_empty() || bucket.contains(['/', '\\']) || bucket.starts_with('.') {
            return Err(invalid());
        }
        if path.is_empty() || path.contains('\\') {
            return Err(invalid());
        }
        let relative = Path::new(path);
        let clean = relative.components().all(|c| matches!(c, Component::Normal(_)));
        if !clean {
            return Err(invalid());
        }
        Ok(self.root.join(bucket).join(relative))
    }

    /// Writes an object, replacing any previous content at that path.
    pub fn upload(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<(), ObjectError> {
        let target = self.object_path(bucket, path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, bytes)?;
        log::debug!("Stored {} bytes at {}/{}", bytes.len(), bucket, path);
        Ok(())
    }

    pub fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>, ObjectError> {
        let target = self.object_path(bucket, path)?;
        fs::read(&target).map_err(|e| not_found_or_io(e, bucket, path))
    }

    pub fn remove(&self, bucket: &str, path: &str) -> Result<(), ObjectError> {
        let target = self.object_path(bucket, path)?;
        fs::remove_file(&target).map_err(|e| not_found_or_io(e, bucket, path))
    }

    pub fn exists(&self, bucket: &str, path: &str) -> bool {
        self.object_path(bucket, path)
            .map(|p| p.is_file())
            .unwrap_or(false)
    }

    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, bucket, path
        )
    }

    /// A URL valid until `now + ttl_secs`.
    pub fn create_signed_url(
        &self,
        bucket: &str,
        path: &str,
        ttl_secs: i64,
    ) -> Result<String, ObjectError> {
        self.object_path(bucket, path)?;
        let expires = chrono::Utc::now().timestamp() + ttl_secs;
        Ok(format!(
            "{}/storage/v1/object/sign/{}/{}?token={}&expires={}",
            self.base_url,
            bucket,
            path,
            self.sign(bucket, path, expires),
            expires
        ))
    }

    /// The URL handed to clients: public for public buckets, signed otherwise.
    pub fn url_for(&self, bucket: &str, path: &str, ttl_secs: i64) -> Result<String, ObjectError> {
        if self.is_public(bucket) {
            Ok(self.public_url(bucket, path))
        } else {
            self.create_signed_url(bucket, path, ttl_secs)
        }
    }

    pub fn sign(&self, bucket: &str, path: &str, expires: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.secret);
        hasher.update([0u8]);
        hasher.update(bucket.as_bytes());
        hasher.update(b"/");
        hasher.update(path.as_bytes());
        hasher.update([0u8]);
        hasher.update(expires.to_be_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }

    /// Checks a token presented at time `now` (unix seconds).
    pub fn verify(
        &self,
        bucket: &str,
        path: &str,
        token: &str,
        expires: i64,
        now: i64,
    ) -> Result<(), ObjectError> {
        let expected = self.sign(bucket, path, expires);
        let matches: bool = expected.as_bytes().ct_eq(token.as_bytes()).into();
        if !matches {
            return Err(ObjectError::InvalidSignature);
        }
        if now > expires {
            return Err(ObjectError::Expired);
        }
        Ok(())
    }
}

fn not_found_or_io(err: std::io::Error, bucket: &str, path: &str) -> ObjectError {
    if err.kind() == ErrorKind::NotFound {
        ObjectError::NotFound(format!("{}/{}", bucket, path))
    } else {
        ObjectError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &Path) -> ObjectStore {
        ObjectStore::new(&StorageConfig {
            root: dir.to_path_buf(),
            signing_secret: "secret".into(),
            public_base_url: "http://localhost:8080/".into(),
            signed_url_ttl_secs: 3600,
            public_buckets: vec!["avatars".into()],
        })
    }

    #[test]
    fn upload_download_remove() {
        let dir = tempfile::tempdir().unwrap();
        let objects = store(dir.path());
        objects.upload("documents", "u1/id/abc.pdf", b"%PDF").unwrap();
        assert!(objects.exists("documents", "u1/id/abc.pdf"));
        assert_eq!(objects.download("documents", "u1/id/abc.pdf").unwrap(), b"%PDF");
        objects.remove("documents", "u1/id/abc.pdf").unwrap();
        assert!(matches!(
            objects.remove("documents", "u1/id/abc.pdf"),
            Err(ObjectError::NotFound(_))
        ));
    }

    #[test]
    fn rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let objects = store(dir.path());
        for path in ["../x", "/etc/passwd", "a/../../b", "", "a\\b", "./a"] {
            assert!(objects.object_path("documents", path).is_err(), "{path}");
        }
        assert!(objects.object_path("..", "a").is_err());
    }

    #[test]
    fn signatures_bind_path_and_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let objects = store(dir.path());
        let token = objects.sign("documents", "u1/id/a.pdf", 1_000);
        assert!(objects.verify("documents", "u1/id/a.pdf", &token, 1_000, 999).is_ok());
        assert!(matches!(
            objects.verify("documents", "u1/id/a.pdf", &token, 1_000, 1_001),
            Err(ObjectError::Expired)
        ));
        assert!(matches!(
            objects.verify("documents", "u1/id/b.pdf", &token, 1_000, 999),
            Err(ObjectError::InvalidSignature)
        ));
        assert!(matches!(
            objects.verify("documents", "u1/id/a.pdf", &token, 2_000, 999),
            Err(ObjectError::InvalidSignature)
        ));
    }

    #[test]
    fn public_buckets_get_plain_urls() {
        let dir = tempfile::tempdir().unwrap();
        let objects = store(dir.path());
        assert_eq!(
            objects.url_for("avatars", "u1.png", 60).unwrap(),
            "http://localhost:8080/storage/v1/object/public/avatars/u1.png"
        );
        let signed = objects.url_for("documents", "u1/id/a.pdf", 60).unwrap();
        assert!(signed.starts_with(
            "http://localhost:8080/storage/v1/object/sign/documents/u1/id/a.pdf?token="
        ));
    }
}
