//! Ordered per-handler outputs for one request

/// What a single dispatched handler produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleEntry {
    /// Raw handler output
    Completed(String),
    /// The handler did not answer within the configured timeout
    TimedOut,
}

impl std::fmt::Display for BundleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed(_) => write!(f, "completed"),
            Self::TimedOut => write!(f, "timed_out"),
        }
    }
}

/// Handler name → output, kept in dispatch order.
///
/// Built by the router, consumed once by the synthesizer. Iteration order
/// is insertion order; inserting a name twice replaces the earlier entry in
/// place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseBundle {
    entries: Vec<(String, BundleEntry)>,
}

impl ResponseBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, handler: impl Into<String>, entry: BundleEntry) {
        let handler = handler.into();
        match self.entries.iter_mut().find(|(name, _)| *name == handler) {
            Some(slot) => slot.1 = entry,
            None => self.entries.push((handler, entry)),
        }
    }

    pub fn get(&self, handler: &str) -> Option<&BundleEntry> {
        self.entries
            .iter()
            .find(|(name, _)| name == handler)
            .map(|(_, entry)| entry)
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BundleEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn handler_names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, BundleEntry)> for ResponseBundle {
    fn from_iter<I: IntoIterator<Item = (S, BundleEntry)>>(iter: I) -> Self {
        let mut bundle = Self::new();
        for (name, entry) in iter {
            bundle.insert(name, entry);
        }
        bundle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_preserved() {
        let mut bundle = ResponseBundle::new();
        bundle.insert("events_agent", BundleEntry::Completed("e".into()));
        bundle.insert("document_analyzer", BundleEntry::Completed("d".into()));
        bundle.insert("course_advisor", BundleEntry::TimedOut);
        assert_eq!(
            bundle.handler_names(),
            vec!["events_agent", "document_analyzer", "course_advisor"]
        );
    }

    #[test]
    fn test_reinsert_keeps_position() {
        let mut bundle = ResponseBundle::new();
        bundle.insert("a", BundleEntry::TimedOut);
        bundle.insert("b", BundleEntry::TimedOut);
        bundle.insert("a", BundleEntry::Completed("late".into()));
        assert_eq!(bundle.len(), 2);
        assert_eq!(bundle.handler_names(), vec!["a", "b"]);
        assert_eq!(bundle.get("a"), Some(&BundleEntry::Completed("late".into())));
    }

    #[test]
    fn test_entry_display() {
        assert_eq!(BundleEntry::Completed(String::new()).to_string(), "completed");
        assert_eq!(BundleEntry::TimedOut.to_string(), "timed_out");
    }
}
