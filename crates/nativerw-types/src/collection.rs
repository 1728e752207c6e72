use std::collections::BTreeSet;
use std::sync::Arc;

/// Immutable allow-list of collection names.
///
/// Built once when a connection is constructed and shared by every clone of
/// it. Names are matched exactly (case-sensitive).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectionSet {
    names: Arc<BTreeSet<String>>,
}

impl CollectionSet {
    /// Build the set from collection names. Duplicates collapse.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: Arc::new(names.into_iter().map(Into::into).collect()),
        }
    }

    /// Exact, case-sensitive membership.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Iterate names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for CollectionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_only_listed_names() {
        let set = CollectionSet::new(["video", "universal-content", "pac-metadata"]);
        assert!(set.contains("universal-content"));
        assert!(!set.contains("Universal-Content"));
        assert!(!set.contains("methode"));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn duplicates_collapse() {
        let set: CollectionSet = vec!["a", "a", "b"].into_iter().collect();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn clones_share_names() {
        let set = CollectionSet::new(["x"]);
        let clone = set.clone();
        assert_eq!(set, clone);
        assert!(CollectionSet::default().is_empty());
    }
}
