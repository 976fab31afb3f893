use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub type CategoryId = u32;

/// Category id given to every new tracker
pub const DEFAULT_CATEGORY: CategoryId = 1;

/// Set of category ids; empty matches every category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFilter(BTreeSet<CategoryId>);

impl CategoryFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Logical OR over the ids; an empty filter matches everything
    pub fn matches(&self, id: CategoryId) -> bool {
        self.0.is_empty() || self.0.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = CategoryId> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<CategoryId> for CategoryFilter {
    fn from_iter<I: IntoIterator<Item = CategoryId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
