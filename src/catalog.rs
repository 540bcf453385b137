//! Defines the [`Catalog`]: every entry of a run, most recent first, and
//! grouped by tag on demand.

use crate::entry::Entry;
use std::collections::BTreeSet;

/// The complete, sorted collection of entries for one run.
#[derive(Debug, Default)]
pub struct Catalog {
    entries: Vec<Entry>,
}

impl Catalog {
    /// Builds a catalog sorted by date, most recent first. The sort is stable
    /// so entries sharing a date keep the order they were read in.
    pub fn new(mut entries: Vec<Entry>) -> Catalog {
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        Catalog { entries }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The union of every entry's tags.
    pub fn tags(&self) -> BTreeSet<&str> {
        self.entries
            .iter()
            .flat_map(|entry| entry.tags.iter().map(String::as_str))
            .collect()
    }

    /// The entries tagged with `tag`, in catalog order. An entry that lists a
    /// tag twice appears once.
    pub fn by_tag(&self, tag: &str) -> Vec<&Entry> {
        self.entries.iter().filter(|entry| entry.has_tag(tag)).collect()
    }
}
