//! Calculated-field memoisation.
//!
//! A [`FieldDependencies`] graph records which calculated fields are derived from
//! which inputs. A [`FieldCache`] stores calculated values and, when an input is
//! written, clears every field reachable from it in the graph.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Field -> fields calculated from it.
#[derive(Debug, Clone)]
pub struct FieldDependencies<F> {
    dependents: HashMap<F, Vec<F>>,
}

impl<F: Copy + Eq + Hash> FieldDependencies<F> {
    /// Builds the graph from `(calculated field, inputs)` pairs.
    pub fn new(calculated: &[(F, &[F])]) -> Self {
        let mut dependents: HashMap<F, Vec<F>> = HashMap::new();
        for (field, inputs) in calculated {
            for input in *inputs {
                let entry = dependents.entry(*input).or_default();
                if !entry.contains(field) {
                    entry.push(*field);
                }
            }
        }
        Self { dependents }
    }

    pub fn direct_dependents(&self, field: F) -> &[F] {
        self.dependents.get(&field).map_or(&[], Vec::as_slice)
    }

    /// Every field that must be recalculated after `field` changes.
    pub fn affected_by(&self, field: F) -> Vec<F> {
        let mut seen = HashSet::new();
        let mut stack = vec![field];
        let mut affected = Vec::new();
        while let Some(current) = stack.pop() {
            for dependent in self.direct_dependents(current) {
                if seen.insert(*dependent) {
                    affected.push(*dependent);
                    stack.push(*dependent);
                }
            }
        }
        affected
    }
}

/// Calculated values cached on first read.
///
/// Lives behind a `RefCell` so accessors taking `&self` can fill it.
#[derive(Debug, Clone)]
pub struct FieldCache<F, V> {
    values: RefCell<HashMap<F, V>>,
}

impl<F, V> Default for FieldCache<F, V> {
    fn default() -> Self {
        Self {
            values: RefCell::new(HashMap::new()),
        }
    }
}

impl<F: Copy + Eq + Hash, V: Clone> FieldCache<F, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: F) -> Option<V> {
        self.values.borrow().get(&field).cloned()
    }

    /// Returns the cached value or calculates and stores it.
    ///
    /// No borrow is held while `calculate` runs, so it may read other fields.
    pub fn get_or_insert_with(&self, field: F, calculate: impl FnOnce() -> V) -> V {
        if let Some(value) = self.get(field) {
            return value;
        }
        let value = calculate();
        self.values.borrow_mut().insert(field, value.clone());
        value
    }

    pub fn set(&self, field: F, value: V) {
        self.values.borrow_mut().insert(field, value);
    }

    pub fn is_cached(&self, field: F) -> bool {
        self.values.borrow().contains_key(&field)
    }

    /// Drops every value calculated from `field`.
    pub fn invalidate(&self, field: F, dependencies: &FieldDependencies<F>) {
        let affected = dependencies.affected_by(field);
        if affected.is_empty() {
            return;
        }
        let mut values = self.values.borrow_mut();
        for dependent in affected {
            values.remove(&dependent);
        }
    }

    pub fn clear(&self) {
        self.values.borrow_mut().clear();
    }
}
