//! Lazily chained set algebra.
//!
//! A [`LazySet`] records unions and differences of shared sets instead of
//! applying them. A block's past can then be expressed as its parent's past
//! plus a small diff, without copying the parent's set. Membership is resolved
//! newest layer first, so for every item the last operation that mentions it
//! decides. Iteration walks the layers in the same direction and yields each
//! item once.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::set_view::SetView;

/// A set shared between lazy chains. Shared sets are immutable.
pub type SharedSet<T> = Arc<dyn SetView<T>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SetOp {
    Union,
    Difference,
}

struct Layer<T> {
    op: SetOp,
    set: SharedSet<T>,
}

impl<T> Clone for Layer<T> {
    fn clone(&self) -> Self {
        Self { op: self.op, set: Arc::clone(&self.set) }
    }
}

pub struct LazySet<T> {
    layers: Vec<Layer<T>>,
}

impl<T> Clone for LazySet<T> {
    fn clone(&self) -> Self {
        Self { layers: self.layers.clone() }
    }
}

impl<T> Default for LazySet<T> {
    fn default() -> Self {
        Self { layers: Vec::new() }
    }
}

impl<T> LazySet<T>
where
    T: Eq + Hash + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_set<S: SetView<T> + 'static>(set: S) -> Self {
        Self::from_shared(Arc::new(set))
    }

    pub fn from_shared(set: SharedSet<T>) -> Self {
        Self::new().and_union(set)
    }

    /// Builds `base − negatives[0] − negatives[1] … ∪ positives[0] ∪ positives[1] …`.
    pub fn with_parts<N, P>(base: SharedSet<T>, negatives: N, positives: P) -> Self
    where
        N: IntoIterator<Item = SharedSet<T>>,
        P: IntoIterator<Item = SharedSet<T>>,
    {
        let mut set = Self::from_shared(base);
        for negative in negatives {
            set.push(SetOp::Difference, negative);
        }
        for positive in positives {
            set.push(SetOp::Union, positive);
        }
        set
    }

    /// Returns a new lazy set containing the items of `self` and `other`.
    pub fn union(&self, other: SharedSet<T>) -> Self {
        self.clone().and_union(other)
    }

    /// Returns a new lazy set containing the items of `self` that are not in `other`.
    pub fn difference(&self, other: SharedSet<T>) -> Self {
        self.clone().and_difference(other)
    }

    pub fn and_union(mut self, other: SharedSet<T>) -> Self {
        self.push(SetOp::Union, other);
        self
    }

    pub fn and_difference(mut self, other: SharedSet<T>) -> Self {
        self.push(SetOp::Difference, other);
        self
    }

    fn push(&mut self, op: SetOp, set: SharedSet<T>) {
        // Empty sets and differences from nothing cannot change membership.
        if (op == SetOp::Difference && self.layers.is_empty()) || set.is_empty() {
            return;
        }
        self.layers.push(Layer { op, set });
    }

    pub fn contains(&self, item: &T) -> bool {
        self.layers
            .iter()
            .rev()
            .find(|layer| layer.set.contains(item))
            .map_or(false, |layer| layer.op == SetOp::Union)
    }

    pub fn iter(&self) -> LazySetIter<'_, T> {
        LazySetIter { layers: &self.layers, current: None, excluded: HashSet::new() }
    }

    /// Counts the items by iterating, so this is linear in the total size of
    /// the participating sets.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Number of chained operations, used to decide when to flatten.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// The participating sets, oldest first.
    pub fn layer_sets(&self) -> impl Iterator<Item = &SharedSet<T>> + '_ {
        self.layers.iter().map(|layer| &layer.set)
    }

    pub fn is_subset_of(&self, other: &dyn SetView<T>) -> bool {
        self.iter().all(|item| other.contains(item))
    }

    pub fn is_superset_of(&self, other: &dyn SetView<T>) -> bool {
        other.iter().all(|item| self.contains(item))
    }

    pub fn is_disjoint(&self, other: &dyn SetView<T>) -> bool {
        self.iter().all(|item| !other.contains(item))
    }

    pub fn set_eq(&self, other: &dyn SetView<T>) -> bool {
        self.is_subset_of(other) && self.is_superset_of(other)
    }
}

impl<T> LazySet<T>
where
    T: Eq + Hash + Clone + Send + Sync + 'static,
{
    /// Materializes the chain into a plain set.
    pub fn flatten(&self) -> HashSet<T> {
        self.iter().cloned().collect()
    }

    /// Returns an equivalent lazy set made of a single layer.
    pub fn flattened(&self) -> Self {
        Self::from_set(self.flatten())
    }

    /// Merges the newest union layers while the newest holds at least as
    /// many items as the one below it, then until at most `max_layers`
    /// remain. Only the merged tail is copied; older layers stay shared.
    ///
    /// Appending single items to a compacted set behaves like a binary
    /// counter: layer sizes strictly decrease towards the newest, so a chain
    /// of n items keeps at most log2(n) + 1 layers.
    pub fn compacted(mut self, max_layers: usize) -> Self {
        let max_layers = max_layers.max(1);
        loop {
            let len = self.layers.len();
            let grown = len >= 2 && self.layers[len - 1].set.len() >= self.layers[len - 2].set.len();
            let too_long = len > max_layers;
            if !grown && !too_long {
                return self;
            }
            if !self.merge_newest() {
                // A difference blocks merging; fall back to a single layer.
                return if too_long { self.flattened() } else { self };
            }
        }
    }

    /// Replaces the two newest layers by their union if both are unions.
    fn merge_newest(&mut self) -> bool {
        let len = self.layers.len();
        if len < 2 || self.layers[len - 1].op != SetOp::Union || self.layers[len - 2].op != SetOp::Union {
            return false;
        }
        let (Some(newest), Some(older)) = (self.layers.pop(), self.layers.pop()) else {
            return false;
        };
        let mut merged: HashSet<T> = HashSet::with_capacity(older.set.len() + newest.set.len());
        merged.extend(older.set.iter().cloned());
        merged.extend(newest.set.iter().cloned());
        self.layers.push(Layer { op: SetOp::Union, set: Arc::new(merged) });
        true
    }

    /// Intersections are not chained; the result is materialized.
    pub fn intersection(&self, other: &dyn SetView<T>) -> Self {
        let items: HashSet<T> = self.iter().filter(|item| other.contains(item)).cloned().collect();
        Self::from_set(items)
    }

    pub fn symmetric_difference(&self, other: SharedSet<T>) -> Self {
        let common: HashSet<T> = other.iter().filter(|item| self.contains(item)).cloned().collect();
        self.union(other).and_difference(Arc::new(common))
    }
}

impl<T> FromIterator<T> for LazySet<T>
where
    T: Eq + Hash + Send + Sync + 'static,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_set(iter.into_iter().collect::<HashSet<T>>())
    }
}

impl<T> SetView<T> for LazySet<T>
where
    T: Eq + Hash + Send + Sync + 'static,
{
    fn contains(&self, item: &T) -> bool {
        LazySet::contains(self, item)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(LazySet::iter(self))
    }

    fn len(&self) -> usize {
        LazySet::len(self)
    }

    fn is_empty(&self) -> bool {
        LazySet::is_empty(self)
    }
}

impl<T> fmt::Debug for LazySet<T>
where
    T: fmt::Debug + Eq + Hash + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Iterator over a [`LazySet`], newest layer first.
pub struct LazySetIter<'a, T> {
    layers: &'a [Layer<T>],
    current: Option<Box<dyn Iterator<Item = &'a T> + 'a>>,
    excluded: HashSet<&'a T>,
}

impl<'a, T> Iterator for LazySetIter<'a, T>
where
    T: Eq + Hash,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(items) = self.current.as_mut() {
                for item in items.by_ref() {
                    // Newer layers already decided every item in `excluded`.
                    if self.excluded.insert(item) {
                        return Some(item);
                    }
                }
            }
            self.current = None;

            let layers = self.layers;
            let (layer, rest) = layers.split_last()?;
            self.layers = rest;
            match layer.op {
                SetOp::Difference => self.excluded.extend(layer.set.iter()),
                SetOp::Union => self.current = Some(layer.set.iter()),
            }
        }
    }
}
