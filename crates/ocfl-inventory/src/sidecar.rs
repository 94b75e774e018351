use std::fs;
use std::io;
use std::path::Path;

use ocfl_crypto::{digest_bytes, digests_match};
use ocfl_types::DigestAlgorithm;

use crate::document::InventoryContext;
use crate::error::{InventoryError, InventoryResult};
use crate::inventory::Inventory;
use crate::mapper::InventoryMapper;
use crate::paths::ObjectPaths;

/// Sidecar file body: `<hex digest>\tinventory.json\n`.
pub fn sidecar_contents(digest: &str) -> String {
    format!("{digest}\t{}\n", ObjectPaths::INVENTORY_FILE)
}

/// Extract the digest from a sidecar: its first whitespace-delimited token.
pub fn parse_sidecar(text: &str) -> InventoryResult<String> {
    text.split_whitespace()
        .next()
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| InventoryError::CorruptSidecar("sidecar is empty".into()))
}

/// Check serialized inventory bytes against the digest a sidecar records.
pub fn verify_inventory_digest(
    bytes: &[u8],
    algorithm: DigestAlgorithm,
    expected: &str,
) -> InventoryResult<()> {
    let actual = digest_bytes(algorithm, bytes);
    if !digests_match(&actual, expected) {
        return Err(InventoryError::SidecarMismatch {
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

/// An inventory serialized together with its sidecar.
#[derive(Clone, Debug)]
pub struct SerializedInventory {
    pub bytes: Vec<u8>,
    pub algorithm: DigestAlgorithm,
    pub digest: String,
}

impl SerializedInventory {
    pub fn new<M: InventoryMapper + ?Sized>(
        mapper: &M,
        inventory: &Inventory,
    ) -> InventoryResult<Self> {
        let bytes = mapper.write(inventory)?;
        let algorithm = inventory.digest_algorithm();
        let digest = digest_bytes(algorithm, &bytes);
        Ok(Self {
            bytes,
            algorithm,
            digest,
        })
    }

    /// `inventory.json.<alg>`
    pub fn sidecar_name(&self) -> String {
        ObjectPaths::sidecar_name(self.algorithm)
    }

    pub fn sidecar(&self) -> String {
        sidecar_contents(&self.digest)
    }
}

/// Write `inventory.json` and its sidecar into `dir`.
pub fn write_inventory_with_sidecar<M: InventoryMapper + ?Sized>(
    mapper: &M,
    dir: &Path,
    inventory: &Inventory,
) -> InventoryResult<SerializedInventory> {
    let serialized = SerializedInventory::new(mapper, inventory)?;
    fs::create_dir_all(dir)?;
    fs::write(dir.join(ObjectPaths::INVENTORY_FILE), &serialized.bytes)?;
    fs::write(dir.join(serialized.sidecar_name()), serialized.sidecar())?;
    Ok(serialized)
}

/// Read `inventory.json` from `dir`, verify it against its sidecar and
/// hydrate it with `context`.
///
/// Returns `None` when `dir` holds no inventory. A missing or unreadable
/// sidecar is a [`InventoryError::CorruptSidecar`]; a digest disagreement is
/// a [`InventoryError::SidecarMismatch`].
pub fn read_inventory_with_sidecar<M: InventoryMapper + ?Sized>(
    mapper: &M,
    dir: &Path,
    context: InventoryContext,
) -> InventoryResult<Option<Inventory>> {
    let bytes = match fs::read(dir.join(ObjectPaths::INVENTORY_FILE)) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let document = mapper.read_document(&bytes)?;
    let algorithm = document.digest_algorithm;

    let sidecar_path = dir.join(ObjectPaths::sidecar_name(algorithm));
    let sidecar = fs::read_to_string(&sidecar_path).map_err(|e| {
        InventoryError::CorruptSidecar(format!("cannot read {}: {e}", sidecar_path.display()))
    })?;
    verify_inventory_digest(&bytes, algorithm, &parse_sidecar(&sidecar)?)?;

    document.hydrate(context).map(Some)
}

/// Read and parse only the sidecar digest in `dir` for `algorithm`.
pub fn read_sidecar_digest(dir: &Path, algorithm: DigestAlgorithm) -> InventoryResult<String> {
    let path = dir.join(ObjectPaths::sidecar_name(algorithm));
    let text = fs::read_to_string(&path).map_err(|e| {
        InventoryError::CorruptSidecar(format!("cannot read {}: {e}", path.display()))
    })?;
    parse_sidecar(&text)
}
