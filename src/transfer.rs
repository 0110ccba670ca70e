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

//! Funds transfers.
//!
//! A transfer runs as one transaction:
//!
//! 1. debit entry `-amount` on the source account
//! 2. credit entry `+amount` on the destination account
//! 3. transfer record linking both entries
//! 4. balance updates on both accounts, lower account id first
//!
//! Balance updates lock account rows until commit. Taking those locks in
//! ascending account-id order, whatever the transfer direction, means two
//! transfers over the same pair of accounts can never wait on each other in a
//! cycle. Entries lock nothing, so their order does not matter.

use crate::LedgerError;
use crate::account::{Account, Page};
use crate::base::{AccountId, Currency, EntryId, TransferId, UserId};
use crate::config::OverdraftPolicy;
use crate::entry::Entry;
use crate::queries::Queries;
use crate::tx::{Transactional, run_in_transaction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audit row linking a debit and a credit entry as one fund movement.
///
/// `amount` is always positive: the debit entry carries `-amount`, the credit
/// entry `+amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub id: TransferId,
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub from_entry_id: EntryId,
    pub to_entry_id: EntryId,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

impl TransferRecord {
    pub fn involves(&self, account: AccountId) -> bool {
        self.from_account_id == account || self.to_account_id == account
    }
}

/// Column values for a transfer record insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewTransferRecord {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub from_entry_id: EntryId,
    pub to_entry_id: EntryId,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

/// Input for the transfer engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferParams {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

impl TransferParams {
    pub fn new(
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: i64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            from_account_id,
            to_account_id,
            amount,
            created_at,
        }
    }

    /// Checks caller preconditions. Nothing touches storage when this fails.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.from_account_id.is_missing() || self.to_account_id.is_missing() {
            return Err(LedgerError::MissingAccountId);
        }
        if self.amount <= 0 {
            return Err(LedgerError::InvalidAmount);
        }
        Ok(())
    }
}

/// Everything a committed transfer wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    pub transfer: TransferRecord,
    pub from_account: Account,
    pub to_account: Account,
    pub from_entry: Entry,
    pub to_entry: Entry,
}

/// A transfer as submitted by an account owner, checked before it reaches the
/// engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: i64,
    pub currency: Currency,
    pub owner: UserId,
}

/// Filter for listing transfer records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferFilter {
    /// Only transfers where this account is either side.
    pub account: Option<AccountId>,
    pub page: Page,
}

/// Moves `params.amount` from one account to another in a single transaction.
///
/// With [`OverdraftPolicy::Reject`] the debit is refused when it would take
/// the source balance below zero. The check runs while the source row is
/// locked, so concurrent debits cannot race past it. A self-transfer leaves
/// the balance unchanged and is never refused.
///
/// # Errors
///
/// - [`LedgerError::InvalidAmount`] / [`LedgerError::MissingAccountId`] - Rejected before any transaction opens.
/// - [`LedgerError::ForeignKeyViolation`] - An account does not exist.
/// - [`LedgerError::InsufficientFunds`] - Debit refused by the overdraft policy.
/// - [`LedgerError::BalanceOverflow`] - A balance would overflow.
/// - [`LedgerError::LockTimeout`] - An account row stayed locked too long.
/// - Transaction infrastructure errors from [`run_in_transaction`].
///
/// Every error leaves storage exactly as it was.
pub fn transfer_tx<S>(
    store: &S,
    params: &TransferParams,
    overdraft: OverdraftPolicy,
) -> Result<TransferResult, LedgerError>
where
    S: Transactional + ?Sized,
{
    params.validate()?;

    run_in_transaction(store, |q| {
        let from_entry =
            q.create_entry(params.from_account_id, -params.amount, params.created_at)?;
        let to_entry = q.create_entry(params.to_account_id, params.amount, params.created_at)?;

        let transfer = q.create_transfer_record(NewTransferRecord {
            from_account_id: params.from_account_id,
            to_account_id: params.to_account_id,
            from_entry_id: from_entry.id,
            to_entry_id: to_entry.id,
            amount: params.amount,
            created_at: params.created_at,
        })?;

        let (from_account, to_account) = update_balances(q, params, overdraft)?;

        Ok(TransferResult {
            transfer,
            from_account,
            to_account,
            from_entry,
            to_entry,
        })
    })
}

/// Applies both balance deltas, lower account id first.
fn update_balances<Q>(
    q: &mut Q,
    params: &TransferParams,
    overdraft: OverdraftPolicy,
) -> Result<(Account, Account), LedgerError>
where
    Q: Queries + ?Sized,
{
    if params.from_account_id <= params.to_account_id {
        let from_account = debit(q, params, overdraft)?;
        let to_account = q.update_balance(params.to_account_id, params.amount)?;
        Ok((from_account, to_account))
    } else {
        let to_account = q.update_balance(params.to_account_id, params.amount)?;
        let from_account = debit(q, params, overdraft)?;
        Ok((from_account, to_account))
    }
}

fn debit<Q>(
    q: &mut Q,
    params: &TransferParams,
    overdraft: OverdraftPolicy,
) -> Result<Account, LedgerError>
where
    Q: Queries + ?Sized,
{
    let account = q.update_balance(params.from_account_id, -params.amount)?;
    // A self-transfer nets to zero; only its intermediate balance dips.
    let self_transfer = params.from_account_id == params.to_account_id;
    if overdraft == OverdraftPolicy::Reject && !self_transfer && account.balance < 0 {
        return Err(LedgerError::InsufficientFunds {
            account: account.id,
            balance: account.balance + params.amount,
            amount: params.amount,
        });
    }
    Ok(account)
}
