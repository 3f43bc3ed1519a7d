//! On-disk fulltext cache
//!
//! Entry files are named `<md5>-<sha256>.txt` after the source file digests.
//! Reads larger than [`MAX_READ_BYTES`] or failing I/O count as misses.

use crate::error::{FulltextError, Result};
use md5::Md5;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Cached artifacts larger than this are treated as misses.
pub const MAX_READ_BYTES: u64 = 16 * 1024 * 1024;

const CACHE_SUFFIX: &str = "txt";

/// Extracted text keyed by the content of the source file.
///
/// Entries are written to a unique temporary file in `scratch_dir` and
/// renamed into `cache_dir`, so readers never see a partial entry. Two
/// writers racing on the same key both succeed and the last rename wins.
#[derive(Debug, Clone)]
pub struct FulltextCache {
    cache_dir: PathBuf,
    scratch_dir: PathBuf,
    max_read_bytes: u64,
}

impl FulltextCache {
    pub fn new(cache_dir: impl Into<PathBuf>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            scratch_dir: scratch_dir.into(),
            max_read_bytes: MAX_READ_BYTES,
        }
    }

    /// Cache under `<workspace>/cache`, temporary files under `<workspace>/tmp`.
    pub fn in_workspace(workspace: &Path) -> Self {
        Self::new(workspace.join("cache"), workspace.join("tmp"))
    }

    pub fn with_max_read_bytes(mut self, max: u64) -> Self {
        self.max_read_bytes = max;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// `<md5>-<sha256>` of the file content, both lowercase hex.
    pub fn key_for(&self, file: &Path) -> Result<String> {
        let mut reader =
            fs::File::open(file).map_err(|e| FulltextError::storage(file, e))?;
        let mut md5 = Md5::new();
        let mut sha256 = Sha256::new();
        let mut buffer = [0u8; 64 * 1024];
        loop {
            let read = reader
                .read(&mut buffer)
                .map_err(|e| FulltextError::storage(file, e))?;
            if read == 0 {
                break;
            }
            md5.update(&buffer[..read]);
            sha256.update(&buffer[..read]);
        }
        Ok(format!(
            "{}-{}",
            hex::encode(md5.finalize()),
            hex::encode(sha256.finalize())
        ))
    }

    pub fn path_for_key(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.{}", key, CACHE_SUFFIX))
    }

    /// Cached text for `file`, or `None` on a miss.
    ///
    /// An empty entry is a hit: it records an extraction that produced no text.
    pub fn read(&self, file: &Path) -> Option<String> {
        let key = match self.key_for(file) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "Cannot hash file for cache lookup");
                return None;
            }
        };
        let path = self.path_for_key(&key);

        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cannot stat cache entry");
                return None;
            }
        };
        if metadata.len() > self.max_read_bytes {
            tracing::warn!(
                path = %path.display(),
                size = metadata.len(),
                max = self.max_read_bytes,
                "Skipping oversized cache entry"
            );
            return None;
        }

        match fs::read(&path) {
            Ok(bytes) => {
                tracing::debug!(file = %file.display(), key = %key, "Fulltext cache hit");
                Some(String::from_utf8_lossy(&bytes).trim().to_string())
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cannot read cache entry");
                None
            }
        }
    }

    /// Store `text` for `file`. Failures are logged and otherwise ignored.
    pub fn write(&self, file: &Path, text: &str) {
        if let Err(e) = self.try_write(file, text) {
            tracing::warn!(file = %file.display(), error = %e, "Failed to write fulltext cache entry");
        }
    }

    fn try_write(&self, file: &Path, text: &str) -> Result<PathBuf> {
        let key = self.key_for(file)?;
        let target = self.path_for_key(&key);

        fs::create_dir_all(&self.scratch_dir)
            .map_err(|e| FulltextError::storage(&self.scratch_dir, e))?;
        fs::create_dir_all(&self.cache_dir)
            .map_err(|e| FulltextError::storage(&self.cache_dir, e))?;

        // dropped (and removed) on every early return
        let mut temp = NamedTempFile::new_in(&self.scratch_dir)
            .map_err(|e| FulltextError::storage(&self.scratch_dir, e))?;
        temp.write_all(text.trim().as_bytes())
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|e| FulltextError::storage(temp.path(), e))?;

        temp.persist(&target)
            .map_err(|e| FulltextError::storage(&target, e.error))?;

        tracing::debug!(file = %file.display(), key = %key, "Fulltext cached");
        Ok(target)
    }

    /// Remove every cached entry; returns the number removed.
    pub fn clear(&self) -> Result<usize> {
        let entries = match fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(FulltextError::storage(&self.cache_dir, e)),
        };

        let mut removed = 0;
        for entry in entries {
            let path = entry
                .map_err(|e| FulltextError::storage(&self.cache_dir, e))?
                .path();
            let is_entry = path.is_file()
                && path.extension().and_then(|ext| ext.to_str()) == Some(CACHE_SUFFIX);
            if is_entry {
                fs::remove_file(&path).map_err(|e| FulltextError::storage(&path, e))?;
                removed += 1;
            }
        }
        tracing::info!(removed, dir = %self.cache_dir.display(), "Fulltext cache cleared");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, FulltextCache, PathBuf) {
        let dir = TempDir::new().unwrap();
        let cache = FulltextCache::in_workspace(dir.path());
        let source = dir.path().join("article.pdf");
        fs::write(&source, b"%PDF-1.4 fake").unwrap();
        (dir, cache, source)
    }

    fn scratch_is_empty(cache: &FulltextCache) -> bool {
        fs::read_dir(cache.scratch_dir())
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(true)
    }

    #[test]
    fn key_combines_md5_and_sha256() {
        let (_dir, cache, source) = fixture();
        let key = cache.key_for(&source).unwrap();
        let (md5, sha) = key.split_once('-').unwrap();
        assert_eq!(md5.len(), 32);
        assert_eq!(sha.len(), 64);
        assert_eq!(key, cache.key_for(&source).unwrap());
    }

    #[test]
    fn write_then_read_returns_trimmed_text() {
        let (_dir, cache, source) = fixture();
        assert_eq!(cache.read(&source), None);

        cache.write(&source, "  extracted text \n");
        assert_eq!(cache.read(&source).as_deref(), Some("extracted text"));
        assert!(scratch_is_empty(&cache));
    }

    #[test]
    fn empty_result_is_a_hit() {
        let (_dir, cache, source) = fixture();
        cache.write(&source, "");
        assert_eq!(cache.read(&source).as_deref(), Some(""));
    }

    #[test]
    fn key_follows_content_not_name() {
        let (dir, cache, source) = fixture();
        cache.write(&source, "text");

        let copy = dir.path().join("copy.pdf");
        fs::copy(&source, &copy).unwrap();
        assert_eq!(cache.read(&copy).as_deref(), Some("text"));

        fs::write(&source, b"changed").unwrap();
        assert_eq!(cache.read(&source), None);
    }

    #[test]
    fn failed_write_leaves_previous_entry() {
        let (dir, cache, source) = fixture();
        cache.write(&source, "first");

        // scratch directory replaced by a plain file: temp file creation fails
        let blocked_scratch = dir.path().join("blocked");
        fs::write(&blocked_scratch, b"").unwrap();
        let broken = FulltextCache::new(cache.cache_dir(), &blocked_scratch);
        broken.write(&source, "second");

        assert_eq!(cache.read(&source).as_deref(), Some("first"));
    }

    #[test]
    fn failed_rename_never_exposes_partial_entry() {
        let (_dir, cache, source) = fixture();
        let target = cache.path_for_key(&cache.key_for(&source).unwrap());
        fs::create_dir_all(target.join("occupied")).unwrap();

        cache.write(&source, "text");
        assert!(target.is_dir());
        assert_eq!(cache.read(&source), None);
        assert!(scratch_is_empty(&cache));
    }

    #[test]
    fn oversized_entry_is_a_miss() {
        let (_dir, cache, source) = fixture();
        cache.write(&source, "0123456789");
        let small = cache.clone().with_max_read_bytes(4);
        assert_eq!(small.read(&source), None);
    }

    #[test]
    fn clear_removes_entries() {
        let (dir, cache, source) = fixture();
        cache.write(&source, "text");
        let other = dir.path().join("other.txt");
        fs::write(&other, b"other").unwrap();
        cache.write(&other, "more");

        assert_eq!(cache.clear().unwrap(), 2);
        assert_eq!(cache.read(&source), None);
        assert_eq!(cache.clear().unwrap(), 0);
    }

    #[test]
    fn missing_source_is_a_miss() {
        let (dir, cache, _) = fixture();
        assert_eq!(cache.read(&dir.path().join("missing.pdf")), None);
    }
}
