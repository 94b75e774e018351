use crate::document::{InventoryContext, InventoryDocument};
use crate::error::InventoryResult;
use crate::inventory::Inventory;

/// Codec between inventory documents and their serialized bytes.
pub trait InventoryMapper: Send + Sync {
    fn read_document(&self, bytes: &[u8]) -> InventoryResult<InventoryDocument>;

    fn write_document(&self, document: &InventoryDocument) -> InventoryResult<Vec<u8>>;

    /// Parse `bytes` and hydrate the result with `context`.
    fn read(&self, bytes: &[u8], context: InventoryContext) -> InventoryResult<Inventory> {
        self.read_document(bytes)?.hydrate(context)
    }

    fn write(&self, inventory: &Inventory) -> InventoryResult<Vec<u8>> {
        self.write_document(&InventoryDocument::from(inventory))
    }
}

/// `serde_json` implementation of [`InventoryMapper`].
#[derive(Clone, Copy, Debug)]
pub struct JsonInventoryMapper {
    pretty: bool,
}

impl JsonInventoryMapper {
    /// Indented output.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    /// Single-line output.
    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

impl Default for JsonInventoryMapper {
    fn default() -> Self {
        Self::pretty()
    }
}

impl InventoryMapper for JsonInventoryMapper {
    fn read_document(&self, bytes: &[u8]) -> InventoryResult<InventoryDocument> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn write_document(&self, document: &InventoryDocument) -> InventoryResult<Vec<u8>> {
        if self.pretty {
            Ok(serde_json::to_vec_pretty(document)?)
        } else {
            Ok(serde_json::to_vec(document)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OcflConfig;
    use crate::version::Version;
    use ocfl_types::VersionId;

    fn inventory() -> Inventory {
        Inventory::stub("o1", &OcflConfig::default(), "o1")
            .unwrap()
            .to_builder()
            .add_file_to_manifest("aa", "v1/content/a.txt")
            .unwrap()
            .put_version(
                VersionId::V1,
                Version::builder().add_file("aa", "a.txt").unwrap().build(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn write_then_read_preserves_inventory() {
        let mapper = JsonInventoryMapper::pretty();
        let inv = inventory();
        let bytes = mapper.write(&inv).unwrap();
        let read = mapper.read(&bytes, InventoryContext::new("o1")).unwrap();
        assert_eq!(read, inv);
    }

    #[test]
    fn field_order_follows_ocfl_layout() {
        let bytes = JsonInventoryMapper::compact().write(&inventory()).unwrap();
        let json = String::from_utf8(bytes).unwrap();
        let keys = [
            "\"id\"",
            "\"type\"",
            "\"digestAlgorithm\"",
            "\"head\"",
            "\"manifest\"",
            "\"versions\"",
        ];
        let order: Vec<usize> = keys
            .iter()
            .map(|key| json.find(key).unwrap())
            .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]), "{json}");
        assert!(!json.contains('\n'));
    }

    #[test]
    fn malformed_bytes_are_serialization_errors() {
        let err = JsonInventoryMapper::default()
            .read_document(b"{not json")
            .unwrap_err();
        assert!(matches!(err, crate::InventoryError::Serialization(_)));
    }
}
