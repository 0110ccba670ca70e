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

//! Benchmarks for the transfer engine.
//!
//! Run with: cargo bench
//!
//! Benchmarks include:
//! - Single-threaded transfers
//! - Parallel transfers on one contended account pair, both directions
//! - Parallel transfers on disjoint account pairs
//! - Scaling with number of threads and number of accounts
//! - Audit log reads as history grows

use chrono::Utc;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use ledger_transfer_rs::{
    AccountId, Currency, Engine, LedgerConfig, NewAccount, OverdraftPolicy, Page, TransferFilter,
    TransferParams, UserId,
};
use rayon::prelude::*;
use std::sync::Arc;

// =============================================================================
// Helper Functions
// =============================================================================

/// Engine with `accounts` funded accounts, ids `1..=accounts`.
fn make_engine(accounts: u64, balance: i64) -> Engine {
    let engine = Engine::with_config(LedgerConfig {
        overdraft: OverdraftPolicy::Allow,
        ..LedgerConfig::default()
    });
    for i in 0..accounts {
        engine
            .create_account(NewAccount::new(
                format!("bench-{i}"),
                UserId(i + 1),
                Currency::USD,
                balance,
                Utc::now(),
            ))
            .unwrap();
    }
    engine
}

fn make_transfer(from: u64, to: u64, amount: i64) -> TransferParams {
    TransferParams::new(AccountId(from), AccountId(to), amount, Utc::now())
}

// =============================================================================
// Single-Threaded Benchmarks
// =============================================================================

fn bench_single_transfer(c: &mut Criterion) {
    let engine = make_engine(2, 1_000_000_000);
    c.bench_function("single_transfer", |b| {
        b.iter(|| {
            engine.transfer(black_box(make_transfer(1, 2, 10))).unwrap();
        })
    });
}

fn bench_transfer_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("transfer_throughput");

    for count in [100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let engine = make_engine(2, 1_000_000);
                for i in 0..count {
                    // Alternate direction
                    let transfer = if i % 2 == 0 {
                        make_transfer(1, 2, 10)
                    } else {
                        make_transfer(2, 1, 10)
                    };
                    engine.transfer(transfer).unwrap();
                }
                black_box(&engine);
            })
        });
    }
    group.finish();
}

// =============================================================================
// Multi-Threaded Benchmarks
// =============================================================================

fn bench_parallel_transfers_same_pair(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_transfers_same_pair");

    for count in [1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let engine = Arc::new(make_engine(2, 1_000_000));

                (0..count).into_par_iter().for_each(|i| {
                    let transfer = if i % 2 == 0 {
                        make_transfer(1, 2, 1)
                    } else {
                        make_transfer(2, 1, 1)
                    };
                    engine.transfer(transfer).unwrap();
                });

                black_box(&engine);
            })
        });
    }
    group.finish();
}

fn bench_parallel_transfers_disjoint_pairs(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_transfers_disjoint_pairs");

    for count in [1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let engine = Arc::new(make_engine(1_000, 1_000_000));

                (0..count).into_par_iter().for_each(|i: u64| {
                    // Pairs (1,2), (3,4), ... never share an account
                    let from = (i % 500) * 2 + 1;
                    engine.transfer(make_transfer(from, from + 1, 1)).unwrap();
                });

                black_box(&engine);
            })
        });
    }
    group.finish();
}

// =============================================================================
// Scaling Benchmarks
// =============================================================================

fn bench_thread_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("thread_scaling");
    let total_transfers = 20_000u64;

    for num_threads in [1, 2, 4, 8].iter() {
        group.throughput(Throughput::Elements(total_transfers));
        group.bench_with_input(
            BenchmarkId::from_parameter(num_threads),
            num_threads,
            |b, &num_threads| {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(num_threads)
                    .build()
                    .unwrap();

                b.iter(|| {
                    let engine = Arc::new(make_engine(100, 1_000_000));

                    pool.install(|| {
                        (0..total_transfers).into_par_iter().for_each(|i| {
                            let from = i % 100 + 1;
                            let to = (i * 7) % 100 + 1;
                            engine.transfer(make_transfer(from, to, 1)).unwrap();
                        });
                    });

                    black_box(&engine);
                })
            },
        );
    }
    group.finish();
}

fn bench_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("contention");
    let total_ops = 10_000u64;

    // Fewer accounts = more threads competing for the same row locks
    for num_accounts in [2u64, 10, 100, 1_000].iter() {
        group.throughput(Throughput::Elements(total_ops));
        group.bench_with_input(
            BenchmarkId::new("accounts", num_accounts),
            num_accounts,
            |b, &num_accounts| {
                b.iter(|| {
                    let engine = Arc::new(make_engine(num_accounts, 1_000_000));

                    (0..total_ops).into_par_iter().for_each(|i| {
                        let from = i % num_accounts + 1;
                        let to = (i + 1) % num_accounts + 1;
                        engine.transfer(make_transfer(from, to, 1)).unwrap();
                    });

                    black_box(&engine);
                })
            },
        );
    }
    group.finish();
}

// =============================================================================
// Audit Log Benchmarks
// =============================================================================

fn bench_transfer_history(c: &mut Criterion) {
    let mut group = c.benchmark_group("transfer_history");

    for history_size in [100, 1_000, 10_000].iter() {
        let engine = make_engine(10, 1_000_000);
        for i in 0..*history_size as u64 {
            engine
                .transfer(make_transfer(i % 10 + 1, (i + 3) % 10 + 1, 1))
                .unwrap();
        }

        group.bench_with_input(
            BenchmarkId::from_parameter(history_size),
            history_size,
            |b, _| {
                b.iter(|| {
                    let page = engine.list_transfers(TransferFilter {
                        account: Some(AccountId(1)),
                        page: Page::new(50, 0),
                    });
                    black_box(page);
                })
            },
        );
    }
    group.finish();
}

criterion_group!(
    single_threaded,
    bench_single_transfer,
    bench_transfer_throughput,
);

criterion_group!(
    multi_threaded,
    bench_parallel_transfers_same_pair,
    bench_parallel_transfers_disjoint_pairs,
);

criterion_group!(scaling, bench_thread_scaling, bench_contention,);

criterion_group!(history, bench_transfer_history,);

criterion_main!(single_threaded, multi_threaded, scaling, history);
