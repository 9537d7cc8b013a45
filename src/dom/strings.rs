//! String Interning Pool
//!
//! Deduplicated storage for element names, attribute names and values, and
//! text content. Every interned string lives in one contiguous buffer and is
//! addressed by a `u32` id; id 0 is the empty string.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

#[derive(Debug)]
pub struct StringPool {
    /// (offset, len) into `data`, indexed by string id
    entries: Vec<(usize, usize)>,
    data: String,
    /// Hash of string content -> ids with that hash
    hash_index: HashMap<u64, Vec<u32>>,
}

impl Default for StringPool {
    fn default() -> Self {
        Self::new()
    }
}

impl StringPool {
    pub fn new() -> Self {
        StringPool {
            entries: vec![(0, 0)],
            data: String::with_capacity(4096),
            hash_index: HashMap::new(),
        }
    }

    #[inline]
    fn compute_hash(s: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        s.hash(&mut hasher);
        hasher.finish()
    }

    /// Intern a string, returning the id of an equal string if one exists
    pub fn intern(&mut self, s: &str) -> u32 {
        if s.is_empty() {
            return 0;
        }

        let hash = Self::compute_hash(s);
        if let Some(ids) = self.hash_index.get(&hash) {
            for &id in ids {
                if self.get_str(id) == Some(s) {
                    return id;
                }
            }
        }

        let offset = self.data.len();
        self.data.push_str(s);
        let id = self.entries.len() as u32;
        self.entries.push((offset, s.len()));
        self.hash_index.entry(hash).or_default().push(id);
        id
    }

    /// Id of an already interned string, without interning it
    pub fn lookup(&self, s: &str) -> Option<u32> {
        if s.is_empty() {
            return Some(0);
        }
        let ids = self.hash_index.get(&Self::compute_hash(s))?;
        ids.iter().copied().find(|&id| self.get_str(id) == Some(s))
    }

    pub fn get_str(&self, id: u32) -> Option<&str> {
        let &(offset, len) = self.entries.get(id as usize)?;
        self.data.get(offset..offset + len)
    }
}
