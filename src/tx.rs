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

//! Transaction runner.
//!
//! [`run_in_transaction`] executes a unit of work against a transaction-scoped
//! [`Queries`] handle and either commits all of it or none of it.
//!
//! # Guarantees
//!
//! - Work succeeds: the transaction is committed. A commit failure is
//!   returned as [`LedgerError::Commit`].
//! - Work fails: the transaction is rolled back and the work's error is
//!   returned unchanged. If the rollback fails as well, both errors are
//!   returned in [`LedgerError::RollbackFailed`].
//! - Work panics: the handle is dropped during unwinding, and
//!   [`Transaction`] implementations roll back on drop.

use crate::LedgerError;
use crate::queries::Queries;

/// A storage backend able to open transactions.
pub trait Transactional {
    type Tx<'a>: Transaction
    where
        Self: 'a;

    /// Opens a new transaction.
    fn begin(&self) -> Result<Self::Tx<'_>, LedgerError>;
}

/// An open transaction.
///
/// Dropping a transaction that was neither committed nor rolled back must roll
/// it back. A failed commit must leave no partial effects behind.
pub trait Transaction: Queries {
    fn commit(self) -> Result<(), LedgerError>;

    fn rollback(self) -> Result<(), LedgerError>;
}

/// Runs `work` inside a single transaction on `store`.
///
/// # Errors
///
/// - [`LedgerError::Begin`] - The transaction could not be opened; `work` did not run.
/// - Any error returned by `work`, after a successful rollback.
/// - [`LedgerError::RollbackFailed`] - `work` failed and so did the rollback.
/// - [`LedgerError::Commit`] - `work` succeeded but the commit failed.
pub fn run_in_transaction<'s, S, T, F>(store: &'s S, work: F) -> Result<T, LedgerError>
where
    S: Transactional + ?Sized,
    F: FnOnce(&mut S::Tx<'s>) -> Result<T, LedgerError>,
{
    let mut tx = store
        .begin()
        .map_err(|error| LedgerError::Begin(Box::new(error)))?;

    match work(&mut tx) {
        Ok(value) => {
            tx.commit()
                .map_err(|error| LedgerError::Commit(Box::new(error)))?;
            Ok(value)
        }
        Err(error) => match tx.rollback() {
            Ok(()) => Err(error),
            Err(rollback) => Err(LedgerError::RollbackFailed {
                error: Box::new(error),
                rollback: Box::new(rollback),
            }),
        },
    }
}
