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

//! Account rows.
//!
//! An account is created once and afterwards only its balance changes, through
//! balance updates issued inside a transaction.
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use ledger_transfer_rs::{Currency, Engine, NewAccount, UserId};
//!
//! let engine = Engine::new();
//! let account = engine
//!     .create_account(NewAccount::new("savings", UserId(1), Currency::USD, 250, Utc::now()))
//!     .unwrap();
//! assert_eq!(account.balance, 250);
//! ```

use crate::LedgerError;
use crate::base::{AccountId, Currency, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ledger account.
///
/// `balance` is a signed integer in the smallest currency unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub owner: UserId,
    pub currency: Currency,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Adds `delta` to the balance.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::BalanceOverflow`] when the result does not fit,
    /// leaving the balance unchanged.
    pub(crate) fn apply_delta(&mut self, delta: i64) -> Result<(), LedgerError> {
        self.balance = self
            .balance
            .checked_add(delta)
            .ok_or(LedgerError::BalanceOverflow(self.id))?;
        Ok(())
    }
}

/// Input for account creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccount {
    pub name: String,
    pub owner: UserId,
    pub currency: Currency,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
}

impl NewAccount {
    pub fn new(
        name: impl Into<String>,
        owner: UserId,
        currency: Currency,
        balance: i64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            owner,
            currency,
            balance,
            created_at,
        }
    }
}

/// Limit/offset window for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Page {
    pub const fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    pub(crate) fn apply<T>(&self, rows: impl IntoIterator<Item = T>) -> Vec<T> {
        rows.into_iter().skip(self.offset).take(self.limit).collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(100, 0)
    }
}

/// Filter for listing accounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountFilter {
    /// Only accounts owned by this user.
    pub owner: Option<UserId>,
    pub page: Page,
}

impl AccountFilter {
    pub const fn owned_by(owner: UserId, page: Page) -> Self {
        Self {
            owner: Some(owner),
            page,
        }
    }
}

impl From<Page> for AccountFilter {
    fn from(page: Page) -> Self {
        Self { owner: None, page }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(balance: i64) -> Account {
        Account {
            id: AccountId(1),
            name: "checking".to_string(),
            owner: UserId(1),
            currency: Currency::USD,
            balance,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn apply_delta_credits_and_debits() {
        let mut account = account(100);
        account.apply_delta(50).unwrap();
        assert_eq!(account.balance, 150);
        account.apply_delta(-175).unwrap();
        assert_eq!(account.balance, -25);
    }

    #[test]
    fn apply_delta_overflow_leaves_balance_unchanged() {
        let mut account = account(i64::MAX - 1);
        assert_eq!(
            account.apply_delta(5),
            Err(LedgerError::BalanceOverflow(AccountId(1)))
        );
        assert_eq!(account.balance, i64::MAX - 1);
    }

    #[test]
    fn page_skips_then_limits() {
        let page = Page::new(2, 1);
        assert_eq!(page.apply(1..=5), vec![2, 3]);
        assert!(Page::new(5, 10).apply(1..=5).is_empty());
    }

    #[test]
    fn account_serializes_with_snake_case_fields() {
        let json = serde_json::to_value(account(42)).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["owner"], 1);
        assert_eq!(json["currency"], "USD");
        assert_eq!(json["balance"], 42);
        assert!(json["created_at"].is_string());
    }
}
