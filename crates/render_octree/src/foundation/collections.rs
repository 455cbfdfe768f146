//! Specialized collection types

use std::collections::HashMap;
use std::hash::Hash;

pub use slotmap::{SecondaryMap, SlotMap};

/// Maps resource references to small dense ids in first-seen order
///
/// Ids start at zero and are contiguous, so they can be packed into sort keys
/// and used to index GPU-side tables. Clearing keeps the allocations.
#[derive(Debug, Clone)]
pub struct Interner<K> {
    ids: HashMap<K, u32>,
    values: Vec<K>,
}

impl<K: Copy + Eq + Hash> Interner<K> {
    /// Create an empty interner
    pub fn new() -> Self {
        Self {
            ids: HashMap::new(),
            values: Vec::new(),
        }
    }
    
    /// Get the id for `value`, assigning the next dense id on first sight
    pub fn intern(&mut self, value: K) -> u32 {
        if let Some(&id) = self.ids.get(&value) {
            return id;
        }
        
        let id = self.values.len() as u32;
        self.ids.insert(value, id);
        self.values.push(value);
        id
    }
    
    /// Look up an id without assigning one
    pub fn get(&self, value: &K) -> Option<u32> {
        self.ids.get(value).copied()
    }
    
    /// Resolve an id back to the value it was assigned to
    pub fn resolve(&self, id: u32) -> Option<K> {
        self.values.get(id as usize).copied()
    }
    
    /// Values in id order
    pub fn values(&self) -> &[K] {
        &self.values
    }
    
    /// Number of interned values
    pub fn len(&self) -> usize {
        self.values.len()
    }
    
    /// Check if nothing has been interned
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
    
    /// Forget all values
    pub fn clear(&mut self) {
        self.ids.clear();
        self.values.clear();
    }
}

impl<K: Copy + Eq + Hash> Default for Interner<K> {
    fn default() -> Self {
        Self::new()
    }
}
