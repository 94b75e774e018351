use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

use bytes::Bytes;
use ocfl_inventory::join_path;
use parking_lot::RwLock;

use super::client::{CloudClient, CloudError, CloudResult, ListResult, ListedObject};

/// In-memory blob store keyed by full object key.
///
/// Intended for tests and embedding. An optional key prefix emulates a
/// repository living under a sub-path of a shared bucket.
pub struct InMemoryCloudClient {
    prefix: String,
    objects: RwLock<BTreeMap<String, Bytes>>,
}

impl InMemoryCloudClient {
    pub fn new() -> Self {
        Self::with_prefix("")
    }

    /// A client whose keys all live under `prefix/`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into().trim_matches('/').to_string(),
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// All keys, relative to the prefix, in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.objects
            .read()
            .keys()
            .filter_map(|k| self.strip(k))
            .collect()
    }

    /// Raw bytes of one object.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.objects.read().get(&self.full_key(key)).cloned()
    }

    /// Overwrite an object without any checks.
    pub fn put(&self, key: &str, bytes: impl Into<Bytes>) {
        self.objects.write().insert(self.full_key(key), bytes.into());
    }

    fn full_key(&self, key: &str) -> String {
        join_path(&self.prefix, key)
    }

    fn strip(&self, full_key: &str) -> Option<String> {
        if self.prefix.is_empty() {
            return Some(full_key.to_string());
        }
        full_key
            .strip_prefix(&self.prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .map(str::to_string)
    }

    /// `path/` as a full-key prefix, or the client prefix for the root.
    fn dir_prefix(&self, path: &str) -> String {
        let full = self.full_key(path.trim_matches('/'));
        if full.is_empty() {
            String::new()
        } else {
            format!("{full}/")
        }
    }

    fn fetch(&self, key: &str) -> CloudResult<Bytes> {
        self.get(key)
            .ok_or_else(|| CloudError::KeyNotFound(key.to_string()))
    }
}

impl Default for InMemoryCloudClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CloudClient for InMemoryCloudClient {
    fn upload_file(&self, src: &Path, dst_key: &str) -> CloudResult<()> {
        let bytes = fs::read(src)?;
        self.put(dst_key, bytes);
        Ok(())
    }

    fn upload_bytes(&self, dst_key: &str, bytes: &[u8], _content_type: &str) -> CloudResult<()> {
        self.put(dst_key, Bytes::copy_from_slice(bytes));
        Ok(())
    }

    fn download_stream(&self, src_key: &str) -> CloudResult<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(self.fetch(src_key)?)))
    }

    fn download_file(&self, src_key: &str, dst: &Path) -> CloudResult<()> {
        let bytes = self.fetch(src_key)?;
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(dst, &bytes)?;
        Ok(())
    }

    fn download_string(&self, src_key: &str) -> CloudResult<String> {
        let bytes = self.fetch(src_key)?;
        let mut text = String::new();
        Cursor::new(bytes).read_to_string(&mut text)?;
        Ok(text)
    }

    fn copy_object(&self, src_key: &str, dst_key: &str) -> CloudResult<()> {
        let bytes = self.fetch(src_key)?;
        self.put(dst_key, bytes);
        Ok(())
    }

    fn list(&self, prefix: &str) -> CloudResult<ListResult> {
        let dir = self.dir_prefix(prefix);
        let objects = self
            .objects
            .read()
            .keys()
            .filter_map(|full| {
                let suffix = full.strip_prefix(&dir)?;
                Some(ListedObject {
                    key: self.strip(full)?,
                    key_suffix: suffix.to_string(),
                })
            })
            .collect();
        Ok(ListResult {
            objects,
            directories: Vec::new(),
        })
    }

    fn list_directory(&self, path: &str) -> CloudResult<ListResult> {
        let dir = self.dir_prefix(path);
        let mut objects = Vec::new();
        let mut directories = BTreeSet::new();
        for full in self.objects.read().keys() {
            let Some(suffix) = full.strip_prefix(&dir) else {
                continue;
            };
            match suffix.split_once('/') {
                Some((child, _)) => {
                    directories.insert(join_path(path.trim_matches('/'), child));
                }
                None => {
                    if let Some(key) = self.strip(full) {
                        objects.push(ListedObject {
                            key,
                            key_suffix: suffix.to_string(),
                        });
                    }
                }
            }
        }
        Ok(ListResult {
            objects,
            directories: directories.into_iter().collect(),
        })
    }

    fn delete_path(&self, path: &str) -> CloudResult<()> {
        let dir = self.dir_prefix(path);
        self.objects.write().retain(|k, _| !k.starts_with(&dir));
        Ok(())
    }

    fn delete_objects(&self, keys: &[String]) -> CloudResult<()> {
        let mut objects = self.objects.write();
        for key in keys {
            objects.remove(&self.full_key(key));
        }
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryCloudClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCloudClient")
            .field("prefix", &self.prefix)
            .field("object_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> InMemoryCloudClient {
        let c = InMemoryCloudClient::with_prefix("repo");
        c.put("o1/inventory.json", "{}");
        c.put("o1/v1/content/a.txt", "a");
        c.put("o1/v1/content/dir/b.txt", "b");
        c.put("o2/inventory.json", "{}");
        c
    }

    #[test]
    fn list_is_recursive() {
        let result = client().list("o1").unwrap();
        let suffixes: Vec<_> = result.objects.iter().map(|o| o.key_suffix.as_str()).collect();
        assert_eq!(suffixes, ["inventory.json", "v1/content/a.txt", "v1/content/dir/b.txt"]);
        assert_eq!(result.objects[1].key, "o1/v1/content/a.txt");
        assert!(result.directories.is_empty());
    }

    #[test]
    fn list_directory_is_one_level() {
        let c = client();
        let result = c.list_directory("o1").unwrap();
        assert_eq!(result.objects.len(), 1);
        assert_eq!(result.objects[0].key_suffix, "inventory.json");
        assert_eq!(result.directories, ["o1/v1"]);

        let root = c.list_directory("").unwrap();
        assert!(root.objects.is_empty());
        assert_eq!(root.directories, ["o1", "o2"]);
    }

    #[test]
    fn prefixes_do_not_match_partial_segments() {
        let c = client();
        c.put("o10/inventory.json", "{}");
        assert_eq!(c.list("o1").unwrap().objects.len(), 3);
        c.delete_path("o1").unwrap();
        assert!(c.get("o10/inventory.json").is_some());
        assert!(c.get("o1/inventory.json").is_none());
    }

    #[test]
    fn missing_keys_are_reported() {
        let c = client();
        assert!(matches!(c.download_string("nope"), Err(CloudError::KeyNotFound(_))));
        assert!(matches!(c.copy_object("nope", "x"), Err(CloudError::KeyNotFound(_))));
    }

    #[test]
    fn copy_and_delete() {
        let c = client();
        c.copy_object("o1/v1/content/a.txt", "o1/v2/content/a.txt").unwrap();
        assert_eq!(c.download_string("o1/v2/content/a.txt").unwrap(), "a");
        c.delete_objects(&["o1/v2/content/a.txt".to_string(), "missing".to_string()])
            .unwrap();
        assert!(c.get("o1/v2/content/a.txt").is_none());
    }

    #[test]
    fn file_transfer_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.txt");
        fs::write(&src, b"payload").unwrap();
        let c = InMemoryCloudClient::new();
        c.upload_file(&src, "k/in.txt").unwrap();
        let dst = dir.path().join("out/nested.txt");
        c.download_file("k/in.txt", &dst).unwrap();
        assert_eq!(fs::read(dst).unwrap(), b"payload");
        assert_eq!(c.keys(), ["k/in.txt"]);
    }

    #[test]
    fn prefix_is_hidden_from_callers() {
        let c = client();
        assert!(c.keys().iter().all(|k| !k.starts_with("repo/")));
        assert_eq!(c.prefix(), "repo");
    }
}
