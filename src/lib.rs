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

//! # Ledger Transfer
//!
//! This library provides a transactional funds-transfer engine. Accounts hold
//! integer balances in a currency; a transfer moves funds between two accounts
//! and records a double-entry audit trail, atomically.
//!
//! ## Core Components
//!
//! - [`Engine`]: Entry point for account creation, transfers, and audit reads
//! - [`Store`]: In-memory account, entry, and transfer tables with row locks
//! - [`run_in_transaction`]: All-or-nothing execution of a unit of work
//! - [`transfer_tx`]: The transfer algorithm, generic over any [`Transactional`] backend
//! - [`LedgerError`]: Error types for storage, transaction, and request failures
//!
//! ## Example
//!
//! ```
//! use chrono::Utc;
//! use ledger_transfer_rs::{Currency, Engine, NewAccount, TransferParams, UserId};
//!
//! let engine = Engine::new();
//! let alice = engine
//!     .create_account(NewAccount::new("alice", UserId(1), Currency::USD, 1000, Utc::now()))
//!     .unwrap();
//! let bob = engine
//!     .create_account(NewAccount::new("bob", UserId(2), Currency::USD, 500, Utc::now()))
//!     .unwrap();
//!
//! let result = engine
//!     .transfer(TransferParams::new(alice.id, bob.id, 200, Utc::now()))
//!     .unwrap();
//!
//! assert_eq!(result.from_account.balance, 800);
//! assert_eq!(result.to_account.balance, 700);
//! assert_eq!(result.from_entry.amount, -200);
//! assert_eq!(result.to_entry.amount, 200);
//! ```
//!
//! ## Thread Safety
//!
//! Transfers lock the two account rows they update, in ascending account-id
//! order, and hold them until commit. Concurrent transfers over the same
//! accounts serialize without deadlocking, whatever their direction.

pub mod account;
mod base;
pub mod config;
mod engine;
pub mod entry;
pub mod error;
mod journal;
pub mod queries;
mod store;
pub mod transfer;
pub mod tx;

pub use account::{Account, AccountFilter, NewAccount, Page};
pub use base::{AccountId, Currency, EntryId, TransferId, UserId};
pub use config::{ConfigError, LedgerConfig, OverdraftPolicy};
pub use engine::Engine;
pub use entry::Entry;
pub use error::LedgerError;
pub use queries::Queries;
pub use store::{Store, StoreTx, TableCounts};
pub use transfer::{
    NewTransferRecord, TransferFilter, TransferParams, TransferRecord, TransferRequest,
    TransferResult, transfer_tx,
};
pub use tx::{Transaction, Transactional, run_in_transaction};
