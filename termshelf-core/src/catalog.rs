use once_cell::sync::Lazy;

use crate::DocumentId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: DocumentId,
    pub title: String,
    pub description: String,
    /// Filesystem path or `file://` URL, possibly percent-encoded.
    pub source: String,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

static BUILTIN: Lazy<Catalog> = Lazy::new(|| {
    Catalog::from_entries(vec![
        entry(
            "first-floor",
            "First Floor",
            "Housekeeping SOP for the first floor",
            "Housekeeping%20SOP%201st%20floor%20NOV%202025.pdf",
        ),
        entry(
            "second-floor",
            "Second Floor",
            "Housekeeping SOP for the second floor",
            "Housekeeping%20SOP%202nd%20floor%20NOV%202025.pdf",
        ),
    ])
});

fn entry(id: &str, title: &str, description: &str, source: &str) -> CatalogEntry {
    CatalogEntry {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        source: source.to_string(),
    }
}

impl Catalog {
    pub fn builtin() -> &'static Catalog {
        &BUILTIN
    }

    pub fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }

    /// Next entry after `id`, wrapping. Unknown ids resolve to the first entry.
    pub fn next_after(&self, id: &str) -> Option<&CatalogEntry> {
        if self.entries.is_empty() {
            return None;
        }
        match self.position(id) {
            Some(index) => self.entries.get((index + 1) % self.entries.len()),
            None => self.entries.first(),
        }
    }

    pub fn prev_before(&self, id: &str) -> Option<&CatalogEntry> {
        if self.entries.is_empty() {
            return None;
        }
        match self.position(id) {
            Some(index) => self
                .entries
                .get((index + self.entries.len() - 1) % self.entries.len()),
            None => self.entries.last(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_lists_both_floors() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.len(), 2);
        let first = catalog.get("first-floor").expect("first floor present");
        assert_eq!(first.title, "First Floor");
        assert!(first.source.contains("%20"));
        assert!(catalog.get("second-floor").is_some());
        assert!(catalog.get("third-floor").is_none());
    }

    #[test]
    fn switcher_wraps_in_both_directions() {
        let catalog = Catalog::builtin();
        let next = catalog.next_after("second-floor").unwrap();
        assert_eq!(next.id, "first-floor");
        let prev = catalog.prev_before("first-floor").unwrap();
        assert_eq!(prev.id, "second-floor");
    }

    #[test]
    fn unknown_id_resolves_to_an_edge_entry() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.next_after("nope").unwrap().id, "first-floor");
        assert_eq!(catalog.prev_before("nope").unwrap().id, "second-floor");
    }

    #[test]
    fn empty_catalog_has_no_neighbours() {
        let catalog = Catalog::from_entries(Vec::new());
        assert!(catalog.is_empty());
        assert!(catalog.next_after("first-floor").is_none());
        assert!(catalog.prev_before("first-floor").is_none());
    }
}
