// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Thread-safe keyed table with an id sequence and duplicate detection.
//!
//! Backs the account, entry, and transfer tables of the [`Store`](crate::Store).
//! Rows are only ever inserted, never replaced or removed.

use crate::LedgerError;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub(crate) struct Journal<K, V>
where
    K: Eq + Hash,
{
    name: &'static str,
    rows: DashMap<K, V>,
    /// Last id handed out. Ids burnt by rolled-back transactions are not reused.
    sequence: AtomicU64,
}

impl<K, V> Journal<K, V>
where
    K: Copy + Eq + Hash + Ord + Display,
    V: Clone,
{
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            rows: DashMap::new(),
            sequence: AtomicU64::new(0),
        }
    }

    /// Draws the next value from the id sequence, starting at 1.
    pub(crate) fn next_id(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Adds a row.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::DuplicateKey`] if the key is already present.
    pub(crate) fn insert(&self, key: K, row: V) -> Result<(), LedgerError> {
        // Entry API keeps check-and-insert atomic per shard.
        match self.rows.entry(key) {
            Entry::Occupied(_) => Err(self.duplicate(key)),
            Entry::Vacant(slot) => {
                slot.insert(row);
                Ok(())
            }
        }
    }

    /// Fails with [`LedgerError::DuplicateKey`] if any key is already present.
    pub(crate) fn check_vacant(
        &self,
        keys: impl IntoIterator<Item = K>,
    ) -> Result<(), LedgerError> {
        keys.into_iter()
            .find(|key| self.rows.contains_key(key))
            .map_or(Ok(()), |key| Err(self.duplicate(key)))
    }

    pub(crate) fn get(&self, key: &K) -> Option<V> {
        self.rows.get(key).map(|row| row.value().clone())
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        self.rows.contains_key(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns matching rows in ascending key order.
    pub(crate) fn scan(&self, filter: impl Fn(&V) -> bool) -> Vec<V> {
        let mut rows: Vec<(K, V)> = self
            .rows
            .iter()
            .filter(|row| filter(row.value()))
            .map(|row| (*row.key(), row.value().clone()))
            .collect();
        rows.sort_unstable_by_key(|(key, _)| *key);
        rows.into_iter().map(|(_, row)| row).collect()
    }

    /// Returns all keys in ascending order.
    pub(crate) fn keys(&self) -> Vec<K> {
        let mut keys: Vec<K> = self.rows.iter().map(|row| *row.key()).collect();
        keys.sort_unstable();
        keys
    }

    fn duplicate(&self, key: K) -> LedgerError {
        LedgerError::DuplicateKey {
            table: self.name,
            key: key.to_string(),
        }
    }
}
