use std::collections::HashMap;

/// Ids owning a catalog entity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Owner {
    pub dataset_id: Option<String>,
    pub organization_id: Option<String>,
}

/// One catalog row reduced to what the index needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: String,
    /// Human readable key (slug, or url for resources)
    pub key: Option<String>,
    pub owner: Owner,
    /// Whether the canonical id also resolves to itself
    pub self_mapped: bool,
}

impl CatalogEntry {
    pub fn new(id: &str, key: &str) -> Self {
        Self {
            id: id.to_string(),
            key: non_empty(Some(key.to_string())),
            owner: Owner::default(),
            self_mapped: true,
        }
    }

    pub fn with_organization(mut self, organization_id: &str) -> Self {
        self.owner.organization_id = non_empty(Some(organization_id.to_string()));
        self
    }

    pub fn with_dataset(mut self, dataset_id: &str) -> Self {
        self.owner.dataset_id = non_empty(Some(dataset_id.to_string()));
        self
    }
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Immutable lookup from slug (or url) and canonical id to canonical id.
#[derive(Debug, Default)]
pub struct CatalogIndex {
    key_to_id: HashMap<String, String>,
    owners: HashMap<String, Owner>,
}

impl CatalogIndex {
    pub fn build<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = CatalogEntry>,
    {
        let mut key_to_id = HashMap::new();
        let mut owners = HashMap::new();

        for entry in entries {
            if entry.id.is_empty() {
                continue;
            }
            if let Some(key) = entry.key {
                key_to_id.insert(key, entry.id.clone());
            }
            if entry.self_mapped {
                key_to_id.insert(entry.id.clone(), entry.id.clone());
            }
            owners.insert(entry.id, entry.owner);
        }

        Self { key_to_id, owners }
    }

    /// Canonical id for a raw identifier, if the catalog knows it.
    pub fn resolve(&self, raw_identifier: &str) -> Option<&str> {
        self.key_to_id.get(raw_identifier).map(|s| s.as_str())
    }

    pub fn owner(&self, canonical_id: &str) -> Option<&Owner> {
        self.owners.get(canonical_id)
    }

    /// Number of keys (slugs and ids) the index resolves.
    pub fn len(&self) -> usize {
        self.key_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key_to_id.is_empty()
    }

    pub fn entity_count(&self) -> usize {
        self.owners.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_and_id_resolve_to_id() {
        let index = CatalogIndex::build(vec![CatalogEntry::new("X", "s")]);
        assert_eq!(index.resolve("s"), Some("X"));
        assert_eq!(index.resolve("X"), Some("X"));
        assert_eq!(index.resolve("unknown"), None);
        assert_eq!(index.len(), 2);
        assert_eq!(index.entity_count(), 1);
    }

    #[test]
    fn test_owner_lookup() {
        let index = CatalogIndex::build(vec![
            CatalogEntry::new("D1", "abc123").with_organization("O1"),
            CatalogEntry::new("D2", "orphan").with_organization(""),
        ]);
        assert_eq!(index.owner("D1").unwrap().organization_id.as_deref(), Some("O1"));
        assert_eq!(index.owner("D2").unwrap().organization_id, None);
        assert!(index.owner("abc123").is_none());
    }

    #[test]
    fn test_entry_without_self_mapping() {
        let mut entry = CatalogEntry::new("R1", "https://static.data.gouv.fr/resources/a.csv");
        entry.self_mapped = false;
        let index = CatalogIndex::build(vec![entry]);
        assert_eq!(index.resolve("https://static.data.gouv.fr/resources/a.csv"), Some("R1"));
        assert_eq!(index.resolve("R1"), None);
    }

    #[test]
    fn test_later_rows_override_earlier_keys() {
        let index = CatalogIndex::build(vec![
            CatalogEntry::new("A", "shared-slug"),
            CatalogEntry::new("B", "shared-slug"),
        ]);
        assert_eq!(index.resolve("shared-slug"), Some("B"));
        assert_eq!(index.resolve("A"), Some("A"));
    }

    #[test]
    fn test_rows_without_id_are_skipped() {
        let index = CatalogIndex::build(vec![CatalogEntry::new("", "ghost")]);
        assert!(index.is_empty());
    }
}
