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

//! Error types for the ledger store and transfer engine.

use crate::base::{AccountId, Currency, EntryId, TransferId, UserId};
use thiserror::Error;

/// Ledger errors.
///
/// Storage errors (not-found, constraint violations) are returned unchanged
/// from inside a transaction; infrastructure errors wrap the underlying cause.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Amount is zero or negative
    #[error("invalid amount (must be positive)")]
    InvalidAmount,

    /// A required account id was zero
    #[error("missing account id")]
    MissingAccountId,

    /// Referenced account does not exist
    #[error("account {0} not found")]
    AccountNotFound(AccountId),

    /// Referenced entry does not exist
    #[error("entry {0} not found")]
    EntryNotFound(EntryId),

    /// Referenced transfer does not exist
    #[error("transfer {0} not found")]
    TransferNotFound(TransferId),

    /// A row references a parent row that does not exist
    #[error("foreign key violation on {table}: {key} does not exist")]
    ForeignKeyViolation { table: &'static str, key: String },

    /// A row with the same primary key already exists
    #[error("duplicate key {key} in {table}")]
    DuplicateKey { table: &'static str, key: String },

    /// Applying a delta would overflow the balance column
    #[error("balance overflow on account {0}")]
    BalanceOverflow(AccountId),

    /// Debit would take the balance below zero
    #[error("insufficient funds on account {account}: balance {balance}, requested {amount}")]
    InsufficientFunds {
        account: AccountId,
        balance: i64,
        amount: i64,
    },

    /// Currency code is malformed or not enabled
    #[error("unsupported currency {0:?}")]
    UnsupportedCurrency(String),

    /// Account currency differs from the requested currency
    #[error("account {account} currency mismatch: {actual} vs {expected}")]
    CurrencyMismatch {
        account: AccountId,
        actual: Currency,
        expected: Currency,
    },

    /// Account is not owned by the requesting user
    #[error("account {account} does not belong to user {user}")]
    NotAccountOwner { account: AccountId, user: UserId },

    /// Row lock could not be acquired in time
    #[error("timed out waiting for lock on account {0}")]
    LockTimeout(AccountId),

    /// Store no longer accepts transactions
    #[error("store is closed")]
    StoreClosed,

    /// Transaction could not be started
    #[error("failed to begin transaction: {0}")]
    Begin(#[source] Box<LedgerError>),

    /// Transaction could not be committed; its work was rolled back
    #[error("failed to commit transaction: {0}")]
    Commit(#[source] Box<LedgerError>),

    /// Work failed and the rollback failed too
    #[error("tx error: {error}, rollback error: {rollback}")]
    RollbackFailed {
        error: Box<LedgerError>,
        rollback: Box<LedgerError>,
    },
}

impl LedgerError {
    /// Returns `true` when the same request may succeed if submitted again.
    ///
    /// The engine never retries by itself: a transfer is not idempotent.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::LockTimeout(_) => true,
            Self::Commit(inner) => inner.is_retryable(),
            Self::RollbackFailed { error, .. } => error.is_retryable(),
            _ => false,
        }
    }
}
