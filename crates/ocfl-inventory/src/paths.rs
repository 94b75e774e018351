use ocfl_types::{DigestAlgorithm, RevisionId, VersionId};

/// Object-relative paths of the OCFL object layout.
///
/// All paths use `/` separators regardless of platform.
pub struct ObjectPaths;

impl ObjectPaths {
    pub const INVENTORY_FILE: &'static str = "inventory.json";
    pub const DEFAULT_CONTENT_DIRECTORY: &'static str = "content";
    pub const EXTENSIONS_DIR: &'static str = "extensions";
    pub const MUTABLE_HEAD_EXT_DIR: &'static str = "extensions/0005-mutable-head";
    pub const MUTABLE_HEAD_DIR: &'static str = "extensions/0005-mutable-head/head";
    pub const MUTABLE_HEAD_REVISIONS_DIR: &'static str = "extensions/0005-mutable-head/revisions";

    /// `inventory.json.<alg>`
    pub fn sidecar_name(algorithm: DigestAlgorithm) -> String {
        format!("{}.{}", Self::INVENTORY_FILE, algorithm.ocfl_name())
    }

    /// Copy of the root sidecar saved when a mutable HEAD is first staged.
    pub fn root_sidecar_backup(algorithm: DigestAlgorithm) -> String {
        format!(
            "{}/root-{}",
            Self::MUTABLE_HEAD_EXT_DIR,
            Self::sidecar_name(algorithm)
        )
    }

    /// `extensions/0005-mutable-head/revisions/r<N>`
    pub fn revision_marker(revision: RevisionId) -> String {
        format!("{}/{revision}", Self::MUTABLE_HEAD_REVISIONS_DIR)
    }

    /// `v<N>/<content_dir>`
    pub fn version_content_dir(version: VersionId, content_dir: &str) -> String {
        format!("{version}/{content_dir}")
    }

    /// `extensions/0005-mutable-head/head/<content_dir>`
    pub fn mutable_head_content_dir(content_dir: &str) -> String {
        format!("{}/{content_dir}", Self::MUTABLE_HEAD_DIR)
    }

    /// `extensions/0005-mutable-head/head/<content_dir>/r<N>`
    pub fn mutable_head_revision_dir(content_dir: &str, revision: RevisionId) -> String {
        format!("{}/{revision}", Self::mutable_head_content_dir(content_dir))
    }

    /// Rewrite a content path under the mutable HEAD into the equivalent path
    /// under `version`, or `None` when the path is not mutable HEAD content.
    pub fn mutable_head_to_version(content_path: &str, version: VersionId) -> Option<String> {
        content_path
            .strip_prefix(Self::MUTABLE_HEAD_DIR)
            .and_then(|rest| rest.strip_prefix('/'))
            .map(|rest| format!("{version}/{rest}"))
    }

    /// Inverse of [`ObjectPaths::mutable_head_to_version`].
    pub fn version_to_mutable_head(content_path: &str, version: VersionId) -> Option<String> {
        let prefix = format!("{version}/");
        content_path
            .strip_prefix(&prefix)
            .map(|rest| format!("{}/{rest}", Self::MUTABLE_HEAD_DIR))
    }
}

/// Join two `/`-separated path fragments, ignoring empty fragments.
pub fn join_path(base: &str, rest: &str) -> String {
    let base = base.trim_end_matches('/');
    let rest = rest.trim_start_matches('/');
    match (base.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{base}/{rest}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sidecar_names() {
        assert_eq!(ObjectPaths::sidecar_name(DigestAlgorithm::Sha512), "inventory.json.sha512");
        assert_eq!(
            ObjectPaths::root_sidecar_backup(DigestAlgorithm::Sha256),
            "extensions/0005-mutable-head/root-inventory.json.sha256"
        );
    }

    #[test]
    fn mutable_head_paths() {
        let r3 = RevisionId::new(3).unwrap();
        assert_eq!(
            ObjectPaths::revision_marker(r3),
            "extensions/0005-mutable-head/revisions/r3"
        );
        assert_eq!(
            ObjectPaths::mutable_head_revision_dir("content", r3),
            "extensions/0005-mutable-head/head/content/r3"
        );
    }

    #[test]
    fn head_and_version_paths_convert_both_ways() {
        let v2 = VersionId::new(2);
        let head_path = "extensions/0005-mutable-head/head/content/r1/a.txt";
        let version_path = ObjectPaths::mutable_head_to_version(head_path, v2).unwrap();
        assert_eq!(version_path, "v2/content/r1/a.txt");
        assert_eq!(
            ObjectPaths::version_to_mutable_head(&version_path, v2).unwrap(),
            head_path
        );
        assert!(ObjectPaths::mutable_head_to_version("v1/content/a.txt", v2).is_none());
    }

    #[test]
    fn join_handles_empty_and_slashes() {
        assert_eq!(join_path("", "a"), "a");
        assert_eq!(join_path("a/", "/b"), "a/b");
        assert_eq!(join_path("a", ""), "a");
    }
}
