//! Name dictionary mapping between integer IDs and string names
//!
//! Genes, proteins and per-genome contigs each get their own dictionary.
//! IDs are dense and assigned in first-seen order.
use indexmap::IndexSet;

#[derive(Debug, Default, Clone)]
pub struct NameDict {
    names: IndexSet<String>,
}

impl NameDict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or assign an ID for a name; the flag is true if the name was new
    pub fn put(&mut self, name: &str) -> (u32, bool) {
        if let Some(id) = self.names.get_index_of(name) {
            return (id as u32, false);
        }
        let (id, _) = self.names.insert_full(name.to_string());
        (id as u32, true)
    }

    /// Look up an existing name
    pub fn get(&self, name: &str) -> Option<u32> {
        self.names.get_index_of(name).map(|id| id as u32)
    }

    /// Canonical name for an ID
    pub fn name(&self, id: u32) -> Option<&str> {
        self.names.get_index(id as usize).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dict() {
        let mut dict = NameDict::new();

        // Assign new IDs
        assert_eq!(dict.put("chr1"), (0, true));
        assert_eq!(dict.put("chr2"), (1, true));

        // Get existing ID
        assert_eq!(dict.put("chr1"), (0, false));
        assert_eq!(dict.len(), 2);

        // Lookup by ID
        assert_eq!(dict.name(0), Some("chr1"));
        assert_eq!(dict.name(1), Some("chr2"));
        assert_eq!(dict.name(2), None);
        assert_eq!(dict.get("chr2"), Some(1));
        assert_eq!(dict.get("chr3"), None);
    }
}
