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

//! Transfer engine.
//!
//! The [`Engine`] is the entry point for callers: it owns the [`Store`] and the
//! [`LedgerConfig`], creates accounts, runs transfers, and serves the audit
//! log.
//!
//! # Transfers
//!
//! - [`Engine::transfer`]: the raw transactional transfer. Callers are trusted
//!   to have checked currency and ownership.
//! - [`Engine::submit_transfer`]: checks a [`TransferRequest`] the way a request
//!   handler would (currency, ownership, funds), then runs the transfer.
//!
//! # Thread Safety
//!
//! `Engine` is `Sync`. Any number of threads may call it at once; transfers on
//! disjoint accounts never wait on each other, transfers sharing an account
//! serialize on that account's row lock.

use crate::account::{Account, AccountFilter, NewAccount, Page};
use crate::base::{AccountId, EntryId, TransferId};
use crate::config::LedgerConfig;
use crate::entry::Entry;
use crate::store::Store;
use crate::transfer::{
    TransferFilter, TransferParams, TransferRecord, TransferRequest, TransferResult, transfer_tx,
};
use crate::LedgerError;
use tracing::{debug, info, warn};

pub struct Engine {
    store: Store,
    config: LedgerConfig,
}

impl Engine {
    /// Creates an engine with the default configuration and an empty store.
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
    }

    pub fn with_config(config: LedgerConfig) -> Self {
        Engine {
            store: Store::with_config(&config),
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Opens an account.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::UnsupportedCurrency`] - Currency not enabled in the config.
    /// - [`LedgerError::DuplicateKey`] - The owner already has an account in this currency.
    /// - [`LedgerError::StoreClosed`] - The store was closed.
    pub fn create_account(&self, new: NewAccount) -> Result<Account, LedgerError> {
        if !self.config.is_supported(new.currency) {
            return Err(LedgerError::UnsupportedCurrency(new.currency.to_string()));
        }
        let account = self.store.create_account(new)?;
        info!(
            account = %account.id,
            owner = %account.owner,
            currency = %account.currency,
            balance = account.balance,
            "account created"
        );
        Ok(account)
    }

    /// Moves funds between two accounts atomically.
    ///
    /// Writes a debit entry, a credit entry, and a transfer record, and
    /// updates both balances, all in one transaction. See
    /// [`transfer_tx`](crate::transfer_tx) for the error list.
    pub fn transfer(&self, params: TransferParams) -> Result<TransferResult, LedgerError> {
        match transfer_tx(&self.store, &params, self.config.overdraft) {
            Ok(result) => {
                debug!(
                    transfer_id = %result.transfer.id,
                    from = %params.from_account_id,
                    to = %params.to_account_id,
                    amount = params.amount,
                    "transfer committed"
                );
                Ok(result)
            }
            Err(error) => {
                warn!(
                    from = %params.from_account_id,
                    to = %params.to_account_id,
                    amount = params.amount,
                    %error,
                    "transfer rolled back"
                );
                Err(error)
            }
        }
    }

    /// Checks a transfer request against both accounts, then runs it.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] - Amount is zero or negative.
    /// - [`LedgerError::UnsupportedCurrency`] - Request currency not enabled.
    /// - [`LedgerError::AccountNotFound`] - Either account does not exist.
    /// - [`LedgerError::CurrencyMismatch`] - An account holds another currency.
    /// - [`LedgerError::NotAccountOwner`] - Source account belongs to someone else.
    /// - [`LedgerError::InsufficientFunds`] - Source balance below the amount.
    /// - Any error from [`Engine::transfer`].
    pub fn submit_transfer(
        &self,
        request: TransferRequest,
    ) -> Result<TransferResult, LedgerError> {
        if request.amount <= 0 {
            return Err(LedgerError::InvalidAmount);
        }
        if !self.config.is_supported(request.currency) {
            return Err(LedgerError::UnsupportedCurrency(request.currency.to_string()));
        }

        let from = self.checked_account(request.from_account_id, &request)?;
        self.checked_account(request.to_account_id, &request)?;

        if from.owner != request.owner {
            return Err(LedgerError::NotAccountOwner {
                account: from.id,
                user: request.owner,
            });
        }
        // Advisory: the balance may change before the transfer locks the row.
        if from.balance < request.amount {
            return Err(LedgerError::InsufficientFunds {
                account: from.id,
                balance: from.balance,
                amount: request.amount,
            });
        }

        self.transfer(TransferParams::new(
            request.from_account_id,
            request.to_account_id,
            request.amount,
            chrono::Utc::now(),
        ))
    }

    fn checked_account(
        &self,
        id: AccountId,
        request: &TransferRequest,
    ) -> Result<Account, LedgerError> {
        if id.is_missing() {
            return Err(LedgerError::MissingAccountId);
        }
        let account = self.store.get_account(id)?;
        if account.currency != request.currency {
            return Err(LedgerError::CurrencyMismatch {
                account: id,
                actual: account.currency,
                expected: request.currency,
            });
        }
        Ok(account)
    }

    pub fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.store.get_account(id)
    }

    /// Returns accounts ordered by id, optionally only those of one owner.
    pub fn list_accounts(
        &self,
        filter: impl Into<AccountFilter>,
    ) -> Result<Vec<Account>, LedgerError> {
        self.store.list_accounts(filter.into())
    }

    pub fn get_entry(&self, id: EntryId) -> Result<Entry, LedgerError> {
        self.store.get_entry(id)
    }

    /// Returns the entries of one account ordered by id.
    pub fn list_entries(&self, account: AccountId, page: Page) -> Vec<Entry> {
        self.store.list_entries(account, page)
    }

    pub fn get_transfer(&self, id: TransferId) -> Result<TransferRecord, LedgerError> {
        self.store.get_transfer(id)
    }

    /// Returns transfer records ordered by id.
    pub fn list_transfers(&self, filter: TransferFilter) -> Vec<TransferRecord> {
        self.store.list_transfers(filter)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
