use serde::Serialize;
use std::path::{Path, PathBuf};

/// Ordered architecture-sensitive file names inside the executable dir.
///
/// The first name is the primary transcoder. The set is fixed by
/// configuration and never discovered by scanning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BinarySet {
    names: Vec<String>,
}

impl BinarySet {
    /// Build a set; `None` when `names` is empty since a set always has a
    /// primary.
    #[must_use]
    pub fn new(names: Vec<String>) -> Option<Self> {
        (!names.is_empty()).then_some(Self { names })
    }

    #[must_use]
    pub fn primary(&self) -> &str {
        &self.names[0]
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Full paths of every member under `dir`, in order
    pub fn paths_in<'a>(&'a self, dir: &'a Path) -> impl Iterator<Item = (&'a str, PathBuf)> + 'a {
        self.names.iter().map(move |name| (name.as_str(), dir.join(name)))
    }
}
