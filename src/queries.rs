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

//! Typed accessor over the account, entry, and transfer tables.

use crate::LedgerError;
use crate::account::Account;
use crate::base::AccountId;
use crate::entry::Entry;
use crate::transfer::{NewTransferRecord, TransferRecord};
use chrono::{DateTime, Utc};

/// Row operations available inside a transaction.
///
/// Implementations bind every call to one open transaction: rows created here
/// become visible to others only on commit, and an account whose balance was
/// updated stays locked until the transaction finishes.
pub trait Queries {
    /// Reads an account as seen by this transaction.
    fn get_account(&mut self, id: AccountId) -> Result<Account, LedgerError>;

    /// Inserts a ledger entry.
    ///
    /// # Errors
    ///
    /// [`LedgerError::ForeignKeyViolation`] if the account does not exist.
    fn create_entry(
        &mut self,
        account_id: AccountId,
        amount: i64,
        created_at: DateTime<Utc>,
    ) -> Result<Entry, LedgerError>;

    /// Inserts a transfer record linking two entries.
    ///
    /// # Errors
    ///
    /// [`LedgerError::ForeignKeyViolation`] if an account or entry does not
    /// exist, [`LedgerError::InvalidAmount`] if the amount is not positive.
    fn create_transfer_record(
        &mut self,
        record: NewTransferRecord,
    ) -> Result<TransferRecord, LedgerError>;

    /// Atomically adds `delta` to an account balance and returns the updated row.
    ///
    /// Blocks until the row lock is available.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AccountNotFound`] - No such account.
    /// - [`LedgerError::BalanceOverflow`] - The new balance does not fit.
    /// - [`LedgerError::LockTimeout`] - The row stayed locked past the timeout.
    fn update_balance(&mut self, id: AccountId, delta: i64) -> Result<Account, LedgerError>;
}
