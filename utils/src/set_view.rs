use std::collections::{BTreeSet, HashSet};
use std::hash::{BuildHasher, Hash};

/// Read-only view over a set of items.
///
/// Every representation that can take part in a [`LazySet`](crate::lazy_set::LazySet)
/// chain implements this, including `LazySet` itself.
pub trait SetView<T>: Send + Sync {
    fn contains(&self, item: &T) -> bool;

    fn iter(&self) -> Box<dyn Iterator<Item = &T> + '_>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T, S> SetView<T> for HashSet<T, S>
where
    T: Eq + Hash + Send + Sync,
    S: BuildHasher + Send + Sync,
{
    fn contains(&self, item: &T) -> bool {
        HashSet::contains(self, item)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(HashSet::iter(self))
    }

    fn len(&self) -> usize {
        HashSet::len(self)
    }
}

impl<T> SetView<T> for BTreeSet<T>
where
    T: Ord + Send + Sync,
{
    fn contains(&self, item: &T) -> bool {
        BTreeSet::contains(self, item)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(BTreeSet::iter(self))
    }

    fn len(&self) -> usize {
        BTreeSet::len(self)
    }
}

/// Sorted, de-duplicated array with binary-search membership.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SortedVecSet<T>(Vec<T>);

impl<T: Ord> SortedVecSet<T> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_vec(mut items: Vec<T>) -> Self {
        items.sort();
        items.dedup();
        Self(items)
    }

    /// Inserts `item`, returning false if it was already present.
    pub fn insert(&mut self, item: T) -> bool {
        match self.0.binary_search(&item) {
            Ok(_) => false,
            Err(pos) => {
                self.0.insert(pos, item);
                true
            }
        }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<T> {
        self.0
    }
}

impl<T: Ord> FromIterator<T> for SortedVecSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<T> SetView<T> for SortedVecSet<T>
where
    T: Ord + Send + Sync,
{
    fn contains(&self, item: &T) -> bool {
        self.0.binary_search(item).is_ok()
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(self.0.iter())
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}
