//! Insertion-ordered friendly-name index.
//!
//! A [`NameIndex`] is rebuilt from scratch on every run and never outlives
//! it. Inserting an existing name keeps the name's first position and
//! replaces its value, so duplicate names in a desired collection collapse
//! to the last declaration.

use std::collections::HashMap;

use tassa_core::{Identified, Named, Sid};

#[derive(Debug, Clone)]
pub struct NameIndex<T> {
    entries: Vec<(String, T)>,
    positions: HashMap<String, usize>,
}

impl<T> Default for NameIndex<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            positions: HashMap::new(),
        }
    }
}

impl<T> NameIndex<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. Returns the replaced value, if any.
    pub fn insert(&mut self, name: impl Into<String>, value: T) -> Option<T> {
        let name = name.into();
        match self.positions.get(&name) {
            Some(&pos) => Some(std::mem::replace(&mut self.entries[pos].1, value)),
            None => {
                self.positions.insert(name.clone(), self.entries.len());
                self.entries.push((name, value));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.positions.get(name).map(|&pos| &self.entries[pos].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }
}

impl<T: Named> FromIterator<T> for NameIndex<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut index = NameIndex::new();
        for item in iter {
            let name = item.friendly_name().to_string();
            index.insert(name, item);
        }
        index
    }
}

impl NameIndex<Sid> {
    /// friendlyName → identifier for a list of remote records.
    pub fn of_sids<'a, R: Identified + 'a>(records: impl IntoIterator<Item = &'a R>) -> Self {
        let mut index = NameIndex::new();
        for record in records {
            index.insert(record.friendly_name(), record.sid().clone());
        }
        index
    }

    /// Reverse lookup: the friendly name bound to `sid`.
    pub fn name_of(&self, sid: &Sid) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, candidate)| candidate == sid)
            .map(|(name, _)| name.as_str())
    }
}
