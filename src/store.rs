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

//! In-memory ledger store with row-level locking.
//!
//! # Locking model
//!
//! Every account row sits behind its own [`parking_lot::Mutex`]. A
//! [`StoreTx`] locks a row the first time it updates that row's balance and
//! keeps the lock until commit or rollback, the way a database holds row
//! locks taken by `UPDATE` until the end of the transaction. Balances are
//! changed in place under the lock; the balance seen at lock time is kept so
//! rollback can restore it.
//!
//! Entries and transfer records are staged inside the transaction and
//! published to their tables on commit. Rolled-back rows are never visible.
//! Publication happens under the write side of a store-wide
//! [`parking_lot::RwLock`]; audit reads take the read side, so a reader sees
//! either all rows of a committed transaction or none of them.
//!
//! Lock order is row locks, then the publication lock. Readers never hold a
//! row lock while waiting on the publication lock.
//!
//! Lock waits are bounded by the configured timeout; an expired wait fails the
//! transaction with [`LedgerError::LockTimeout`].

use crate::LedgerError;
use crate::account::{Account, AccountFilter, NewAccount};
use crate::account::Page;
use crate::base::{AccountId, Currency, EntryId, TransferId, UserId};
use crate::config::LedgerConfig;
use crate::entry::Entry;
use crate::journal::Journal;
use crate::queries::Queries;
use crate::transfer::{NewTransferRecord, TransferFilter, TransferRecord};
use crate::tx::{Transaction, Transactional};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry as IndexEntry;
use lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, trace};

type AccountRow = Arc<Mutex<Account>>;

/// Row counts of each table, read at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableCounts {
    pub accounts: usize,
    pub entries: usize,
    pub transfers: usize,
}

/// Account, entry, and transfer tables.
#[derive(Debug)]
pub struct Store {
    accounts: Journal<AccountId, AccountRow>,
    /// Unique index: one account per owner and currency.
    owners: DashMap<(UserId, Currency), AccountId>,
    entries: Journal<EntryId, Entry>,
    transfers: Journal<TransferId, TransferRecord>,
    /// Held for writing while a commit publishes its rows.
    publication: RwLock<()>,
    lock_timeout: Duration,
    closed: AtomicBool,
}

impl Store {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            accounts: Journal::new("accounts"),
            owners: DashMap::new(),
            entries: Journal::new("entries"),
            transfers: Journal::new("transfers"),
            publication: RwLock::new(()),
            lock_timeout,
            closed: AtomicBool::new(false),
        }
    }

    pub fn with_config(config: &LedgerConfig) -> Self {
        Self::new(config.lock_timeout())
    }

    /// Stops accepting transactions. Commits still in flight fail and roll back.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Inserts a new account with the next id from the account sequence.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::DuplicateKey`] - The owner already has an account in
    ///   this currency.
    /// - [`LedgerError::StoreClosed`] - The store was closed.
    pub fn create_account(&self, new: NewAccount) -> Result<Account, LedgerError> {
        if self.is_closed() {
            return Err(LedgerError::StoreClosed);
        }
        // The index slot stays locked until the account row is in place.
        let slot = match self.owners.entry((new.owner, new.currency)) {
            IndexEntry::Occupied(_) => {
                return Err(LedgerError::DuplicateKey {
                    table: "accounts",
                    key: format!("{}/{}", new.owner, new.currency),
                });
            }
            IndexEntry::Vacant(slot) => slot,
        };
        let account = Account {
            id: AccountId(self.accounts.next_id()),
            name: new.name,
            owner: new.owner,
            currency: new.currency,
            balance: new.balance,
            created_at: new.created_at,
        };
        self.accounts
            .insert(account.id, Arc::new(Mutex::new(account.clone())))?;
        slot.insert(account.id);
        Ok(account)
    }

    /// Reads the committed state of an account.
    ///
    /// Waits while another transaction holds the row.
    pub fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        let row = self.account_row(id)?;
        self.read_row(id, &row)
    }

    /// Accounts ordered by id, optionally only those of one owner.
    pub fn list_accounts(&self, filter: AccountFilter) -> Result<Vec<Account>, LedgerError> {
        let ids = match filter.owner {
            Some(owner) => {
                let mut ids: Vec<AccountId> = self
                    .owners
                    .iter()
                    .filter(|row| row.key().0 == owner)
                    .map(|row| *row.value())
                    .collect();
                ids.sort_unstable();
                ids
            }
            None => self.accounts.keys(),
        };
        filter
            .page
            .apply(ids)
            .into_iter()
            .map(|id| self.get_account(id))
            .collect()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn get_entry(&self, id: EntryId) -> Result<Entry, LedgerError> {
        let _published = self.publication.read();
        self.entries.get(&id).ok_or(LedgerError::EntryNotFound(id))
    }

    /// Entries of one account, oldest first.
    pub fn list_entries(&self, account: AccountId, page: Page) -> Vec<Entry> {
        let _published = self.publication.read();
        page.apply(self.entries.scan(|entry| entry.account_id == account))
    }

    pub fn entry_count(&self) -> usize {
        let _published = self.publication.read();
        self.entries.len()
    }

    pub fn get_transfer(&self, id: TransferId) -> Result<TransferRecord, LedgerError> {
        let _published = self.publication.read();
        self.transfers
            .get(&id)
            .ok_or(LedgerError::TransferNotFound(id))
    }

    pub fn list_transfers(&self, filter: TransferFilter) -> Vec<TransferRecord> {
        let _published = self.publication.read();
        let rows = self.transfers.scan(|transfer| match filter.account {
            Some(account) => transfer.involves(account),
            None => true,
        });
        filter.page.apply(rows)
    }

    pub fn transfer_count(&self) -> usize {
        let _published = self.publication.read();
        self.transfers.len()
    }

    /// Counts every table between two commits.
    pub fn counts(&self) -> TableCounts {
        let _published = self.publication.read();
        TableCounts {
            accounts: self.accounts.len(),
            entries: self.entries.len(),
            transfers: self.transfers.len(),
        }
    }

    fn account_row(&self, id: AccountId) -> Result<AccountRow, LedgerError> {
        self.accounts.get(&id).ok_or(LedgerError::AccountNotFound(id))
    }

    fn read_row(&self, id: AccountId, row: &AccountRow) -> Result<Account, LedgerError> {
        row.try_lock_for(self.lock_timeout)
            .map(|account| (*account).clone())
            .ok_or(LedgerError::LockTimeout(id))
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::with_config(&LedgerConfig::default())
    }
}

impl Transactional for Store {
    type Tx<'a> = StoreTx<'a>;

    fn begin(&self) -> Result<StoreTx<'_>, LedgerError> {
        if self.is_closed() {
            return Err(LedgerError::StoreClosed);
        }
        trace!("transaction started");
        Ok(StoreTx {
            store: self,
            locked: Vec::new(),
            entries: Vec::new(),
            transfers: Vec::new(),
            finished: false,
        })
    }
}

struct LockedRow {
    guard: ArcMutexGuard<RawMutex, Account>,
    /// Balance when the lock was taken.
    original_balance: i64,
}

/// Transaction handle over a [`Store`].
///
/// Rolls back when dropped without [`commit`](Transaction::commit).
pub struct StoreTx<'s> {
    store: &'s Store,
    /// Account rows locked by this transaction, in acquisition order.
    locked: Vec<LockedRow>,
    entries: Vec<Entry>,
    transfers: Vec<TransferRecord>,
    finished: bool,
}

impl StoreTx<'_> {
    /// Returns the locked row for `id`, locking it first if needed.
    fn lock_row(&mut self, id: AccountId) -> Result<&mut Account, LedgerError> {
        let index = match self.locked.iter().position(|row| row.guard.id == id) {
            Some(index) => index,
            None => {
                let row = self.store.account_row(id)?;
                let guard = row
                    .try_lock_arc_for(self.store.lock_timeout)
                    .ok_or(LedgerError::LockTimeout(id))?;
                trace!(account = %id, "row locked");
                self.locked.push(LockedRow {
                    original_balance: guard.balance,
                    guard,
                });
                self.locked.len() - 1
            }
        };
        Ok(&mut *self.locked[index].guard)
    }

    fn account_exists(&self, id: AccountId) -> bool {
        self.store.accounts.contains(&id)
    }

    fn entry_exists(&self, id: EntryId) -> bool {
        self.entries.iter().any(|entry| entry.id == id) || self.store.entries.contains(&id)
    }

    /// Restores locked balances, discards staged rows, and releases all locks.
    fn abort(&mut self) {
        for row in self.locked.iter_mut().rev() {
            row.guard.balance = row.original_balance;
        }
        let released = self.locked.len();
        self.locked.clear();
        self.entries.clear();
        self.transfers.clear();
        self.finished = true;
        debug!(released, "transaction rolled back");
    }
}

impl Queries for StoreTx<'_> {
    fn get_account(&mut self, id: AccountId) -> Result<Account, LedgerError> {
        if let Some(row) = self.locked.iter().find(|row| row.guard.id == id) {
            return Ok((*row.guard).clone());
        }
        self.store.get_account(id)
    }

    fn create_entry(
        &mut self,
        account_id: AccountId,
        amount: i64,
        created_at: DateTime<Utc>,
    ) -> Result<Entry, LedgerError> {
        if !self.account_exists(account_id) {
            return Err(LedgerError::ForeignKeyViolation {
                table: "entries",
                key: format!("account {account_id}"),
            });
        }
        let entry = Entry {
            id: EntryId(self.store.entries.next_id()),
            account_id,
            amount,
            created_at,
        };
        self.entries.push(entry.clone());
        Ok(entry)
    }

    fn create_transfer_record(
        &mut self,
        record: NewTransferRecord,
    ) -> Result<TransferRecord, LedgerError> {
        if record.amount <= 0 {
            return Err(LedgerError::InvalidAmount);
        }
        for account in [record.from_account_id, record.to_account_id] {
            if !self.account_exists(account) {
                return Err(LedgerError::ForeignKeyViolation {
                    table: "transfers",
                    key: format!("account {account}"),
                });
            }
        }
        for entry in [record.from_entry_id, record.to_entry_id] {
            if !self.entry_exists(entry) {
                return Err(LedgerError::ForeignKeyViolation {
                    table: "transfers",
                    key: format!("entry {entry}"),
                });
            }
        }
        let transfer = TransferRecord {
            id: TransferId(self.store.transfers.next_id()),
            from_account_id: record.from_account_id,
            to_account_id: record.to_account_id,
            from_entry_id: record.from_entry_id,
            to_entry_id: record.to_entry_id,
            amount: record.amount,
            created_at: record.created_at,
        };
        self.transfers.push(transfer.clone());
        Ok(transfer)
    }

    fn update_balance(&mut self, id: AccountId, delta: i64) -> Result<Account, LedgerError> {
        let account = self.lock_row(id)?;
        account.apply_delta(delta)?;
        Ok(account.clone())
    }
}

impl Transaction for StoreTx<'_> {
    fn commit(mut self) -> Result<(), LedgerError> {
        if self.store.is_closed() {
            // Drop rolls back.
            return Err(LedgerError::StoreClosed);
        }
        let store = self.store;
        let published = store.publication.write();
        store
            .entries
            .check_vacant(self.entries.iter().map(|entry| entry.id))?;
        store
            .transfers
            .check_vacant(self.transfers.iter().map(|transfer| transfer.id))?;

        let entries = self.entries.len();
        let transfers = self.transfers.len();
        for entry in self.entries.drain(..) {
            store.entries.insert(entry.id, entry)?;
        }
        for transfer in self.transfers.drain(..) {
            store.transfers.insert(transfer.id, transfer)?;
        }
        // Balances are already in place; releasing the locks publishes them.
        let released = self.locked.len();
        self.locked.clear();
        self.finished = true;
        drop(published);
        debug!(entries, transfers, released, "transaction committed");
        Ok(())
    }

    fn rollback(mut self) -> Result<(), LedgerError> {
        self.abort();
        Ok(())
    }
}

impl Drop for StoreTx<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.abort();
        }
    }
}
