//! Fixtures shared by the storage integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use ocfl_crypto::digest_bytes;
use ocfl_inventory::{
    write_inventory_with_sidecar, Inventory, JsonInventoryMapper, ObjectPaths, Version,
    VersionBuilder,
};
use ocfl_storage::{
    CloudClient, CloudOcflStorage, FileSystemOcflStorage, FlatLayout, InMemoryCloudClient,
    ObjectIdPathMapper, OcflStorage, StorageConfig,
};
use tempfile::TempDir;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn test_config() -> StorageConfig {
    StorageConfig {
        worker_threads: 4,
        lock_wait_ms: 200,
        ..StorageConfig::default()
    }
}

/// An initialized filesystem storage in a fresh temp dir. The storage root
/// is `<tmp>/repo`.
pub fn fs_storage() -> (FileSystemOcflStorage, TempDir) {
    fs_storage_with(Arc::new(FlatLayout))
}

pub fn fs_storage_with(layout: Arc<dyn ObjectIdPathMapper>) -> (FileSystemOcflStorage, TempDir) {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let storage =
        FileSystemOcflStorage::new(tmp.path().join("repo"), layout, &test_config()).unwrap();
    storage.initialize_storage().unwrap();
    (storage, tmp)
}

/// An initialized cloud storage over `client`.
pub fn cloud_storage(client: Arc<dyn CloudClient>) -> CloudOcflStorage {
    init_tracing();
    let storage = CloudOcflStorage::new(client, Arc::new(FlatLayout), &test_config()).unwrap();
    storage.initialize_storage().unwrap();
    storage
}

pub fn memory_client() -> Arc<InMemoryCloudClient> {
    Arc::new(InMemoryCloudClient::with_prefix("bucket/repo"))
}

/// The inventory to build the first version on.
pub fn stub(storage: &dyn OcflStorage, object_id: &str) -> Inventory {
    let root = storage.object_root_path(object_id).unwrap();
    Inventory::stub(object_id, &test_config().ocfl, root).unwrap()
}

/// The current inventory, or a stub if the object does not exist.
pub fn current(storage: &dyn OcflStorage, object_id: &str) -> Inventory {
    storage
        .load_inventory(object_id)
        .unwrap()
        .unwrap_or_else(|| stub(storage, object_id))
}

fn next_version_state(previous: &Inventory) -> VersionBuilder {
    let mut version = match previous.head_version() {
        Some(head) => VersionBuilder::from_version(head),
        None => Version::builder(),
    };
    version
        .created(chrono::Utc::now())
        .user("Test User", Some("mailto:test@example.org".into()));
    version
}

/// Stage the next immutable version of `previous` into `staging`: `files`
/// are added or replaced, `removed` logical paths dropped.
pub fn stage_version(
    previous: &Inventory,
    files: &[(&str, &[u8])],
    removed: &[&str],
    staging: &Path,
) -> Inventory {
    let algorithm = previous.digest_algorithm();
    let version_id = previous.next_version_id().unwrap();
    let content_dir = previous.resolve_content_directory().to_string();
    let mut builder = previous.to_builder();
    let mut version = next_version_state(previous);
    version.message(format!("commit {version_id}"));

    for logical in removed {
        version.remove_file(logical);
    }
    for (logical, bytes) in files {
        let digest = digest_bytes(algorithm, bytes);
        version.remove_file(logical);
        version.add_file(&digest, logical).unwrap();
        if !builder.manifest().contains_id(&digest) {
            builder
                .add_file_to_manifest(&digest, &format!("{version_id}/{content_dir}/{logical}"))
                .unwrap();
            write_file(&staging.join(&content_dir).join(logical), bytes);
        }
    }

    builder.put_version(version_id, version.build());
    builder.remove_unreferenced_content();
    let inventory = builder.build().unwrap();
    write_inventory_with_sidecar(&JsonInventoryMapper::default(), staging, &inventory).unwrap();
    inventory
}

/// Stage the next mutable HEAD revision of `previous` into `staging`.
pub fn stage_revision(previous: &Inventory, files: &[(&str, &[u8])], staging: &Path) -> Inventory {
    let algorithm = previous.digest_algorithm();
    let version_id = previous.next_version_id().unwrap();
    let revision = previous.next_revision_id().unwrap();
    let content_dir = previous.resolve_content_directory().to_string();
    let mut builder = previous.to_builder();
    let mut version = next_version_state(previous);
    version.message(format!("revision {revision}"));

    for (logical, bytes) in files {
        let digest = digest_bytes(algorithm, bytes);
        version.remove_file(logical);
        version.add_file(&digest, logical).unwrap();
        if !builder.manifest().contains_id(&digest) {
            let content_path = format!(
                "{}/{logical}",
                ObjectPaths::mutable_head_revision_dir(&content_dir, revision)
            );
            builder.add_file_to_manifest(&digest, &content_path).unwrap();
            write_file(
                &staging.join(&content_dir).join(revision.to_string()).join(logical),
                bytes,
            );
        }
    }

    builder.put_version(version_id, version.build()).mutable_head(revision);
    builder.remove_unreferenced_content();
    let inventory = builder.build().unwrap();
    write_inventory_with_sidecar(&JsonInventoryMapper::default(), staging, &inventory).unwrap();
    inventory
}

/// Stage the inventory that turns `head` into an ordinary version.
pub fn stage_head_commit(head: &Inventory, staging: &Path) -> Inventory {
    let committed = head.to_committed().unwrap();
    write_inventory_with_sidecar(&JsonInventoryMapper::default(), staging, &committed).unwrap();
    committed
}

/// Stage and store the next version in one step.
pub fn commit(storage: &dyn OcflStorage, object_id: &str, files: &[(&str, &[u8])]) -> Inventory {
    let previous = current(storage, object_id);
    let staging = tempfile::tempdir().unwrap();
    let inventory = stage_version(&previous, files, &[], staging.path());
    storage.store_new_version(&inventory, staging.path()).unwrap();
    inventory
}

/// Stage and store the next mutable HEAD revision in one step.
pub fn commit_revision(
    storage: &dyn OcflStorage,
    object_id: &str,
    files: &[(&str, &[u8])],
) -> Inventory {
    let previous = current(storage, object_id);
    let staging = tempfile::tempdir().unwrap();
    let inventory = stage_revision(&previous, files, staging.path());
    storage.store_new_version(&inventory, staging.path()).unwrap();
    inventory
}

pub fn write_file(path: &Path, bytes: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, bytes).unwrap();
}

/// Every file under `dir`, keyed by `/`-separated relative path.
pub fn read_tree(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .map(Result::unwrap)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e
                .path()
                .strip_prefix(dir)
                .unwrap()
                .components()
                .map(|c| c.as_os_str().to_str().unwrap().to_string())
                .collect::<Vec<_>>()
                .join("/");
            (rel, fs::read(e.path()).unwrap())
        })
        .collect()
}

pub fn expected_tree(files: &[(&str, &[u8])]) -> BTreeMap<String, Vec<u8>> {
    files
        .iter()
        .map(|(path, bytes)| (path.to_string(), bytes.to_vec()))
        .collect()
}
