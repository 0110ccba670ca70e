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

//! Account and store public API integration tests.

use chrono::{TimeZone, Utc};
use ledger_transfer_rs::{
    Account, AccountId, Currency, LedgerError, NewAccount, OverdraftPolicy, Queries, Store,
    Transaction, Transactional, TransferParams, UserId, run_in_transaction, transfer_tx,
};
use std::time::Duration;

// === Helper Functions ===

fn make_store(balances: &[i64]) -> Store {
    let store = Store::new(Duration::from_millis(500));
    for (i, balance) in balances.iter().enumerate() {
        store
            .create_account(NewAccount::new(
                format!("account-{i}"),
                UserId(i as u64 + 1),
                Currency::USD,
                *balance,
                Utc::now(),
            ))
            .unwrap();
    }
    store
}

// === Account Records ===

#[test]
fn created_account_keeps_its_fields() {
    let store = Store::default();
    let created_at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

    let account = store
        .create_account(NewAccount::new("savings", UserId(7), Currency::CAD, 42, created_at))
        .unwrap();

    assert_eq!(account.id, AccountId(1));
    assert_eq!(account.name, "savings");
    assert_eq!(account.owner, UserId(7));
    assert_eq!(account.currency, Currency::CAD);
    assert_eq!(account.balance, 42);
    assert_eq!(account.created_at, created_at);
    assert_eq!(store.get_account(account.id).unwrap(), account);
}

#[test]
fn negative_opening_balance_is_allowed() {
    let store = make_store(&[-10]);
    assert_eq!(store.get_account(AccountId(1)).unwrap().balance, -10);
}

#[test]
fn account_serializes_with_plain_ids_and_currency_code() {
    let store = make_store(&[100]);
    let account = store.get_account(AccountId(1)).unwrap();

    let json = serde_json::to_value(&account).unwrap();

    assert_eq!(json["id"], 1);
    assert_eq!(json["owner"], 1);
    assert_eq!(json["currency"], "USD");
    assert_eq!(json["balance"], 100);

    let back: Account = serde_json::from_value(json).unwrap();
    assert_eq!(back, account);
}

#[test]
fn currency_codes_parse_case_insensitively() {
    assert_eq!(" usd ".parse::<Currency>().unwrap(), Currency::USD);
    assert_eq!("Eur".parse::<Currency>().unwrap(), Currency::EUR);
    assert!(matches!(
        "US".parse::<Currency>(),
        Err(LedgerError::UnsupportedCurrency(_))
    ));
    assert!(serde_json::from_str::<Currency>("\"12$\"").is_err());
}

// === Transactions on the Store ===

#[test]
fn transfer_tx_runs_directly_against_the_store() {
    let store = make_store(&[300, 100]);
    let params = TransferParams::new(AccountId(2), AccountId(1), 60, Utc::now());

    let result = transfer_tx(&store, &params, OverdraftPolicy::Reject).unwrap();

    assert_eq!(result.from_account.balance, 40);
    assert_eq!(result.to_account.balance, 360);
    assert_eq!(store.get_transfer(result.transfer.id).unwrap(), result.transfer);
}

#[test]
fn work_error_is_returned_unchanged_and_rolled_back() {
    let store = make_store(&[100, 100]);

    let result: Result<(), LedgerError> = run_in_transaction(&store, |tx| {
        tx.create_entry(AccountId(1), -30, Utc::now())?;
        tx.update_balance(AccountId(1), -30)?;
        tx.update_balance(AccountId(3), 30)?;
        Ok(())
    });

    assert_eq!(result, Err(LedgerError::AccountNotFound(AccountId(3))));
    assert_eq!(store.get_account(AccountId(1)).unwrap().balance, 100);
    assert_eq!(store.entry_count(), 0);
}

#[test]
fn reads_inside_a_transaction_see_its_own_updates() {
    let store = make_store(&[100]);

    let seen = run_in_transaction(&store, |tx| {
        tx.update_balance(AccountId(1), 11)?;
        tx.get_account(AccountId(1))
    })
    .unwrap();

    assert_eq!(seen.balance, 111);
    assert_eq!(store.get_account(AccountId(1)).unwrap().balance, 111);
}

#[test]
fn explicit_rollback_discards_staged_work() {
    let store = make_store(&[100]);
    let mut tx = store.begin().unwrap();
    let entry = tx.create_entry(AccountId(1), 5, Utc::now()).unwrap();
    tx.update_balance(AccountId(1), 5).unwrap();

    tx.rollback().unwrap();

    assert!(store.get_entry(entry.id).is_err());
    assert_eq!(store.get_account(AccountId(1)).unwrap().balance, 100);
}

#[test]
fn closed_store_rejects_new_accounts() {
    let store = make_store(&[]);
    store.close();

    assert!(store.is_closed());
    assert_eq!(
        store.create_account(NewAccount::new("late", UserId(1), Currency::USD, 0, Utc::now())),
        Err(LedgerError::StoreClosed)
    );
}
