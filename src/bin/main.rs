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

use chrono::Utc;
use clap::Parser;
use crossbeam::channel::{self, Sender};
use csv::{ReaderBuilder, Trim, Writer};
use ledger_transfer_rs::{
    AccountId, Currency, Engine, LedgerConfig, NewAccount, OverdraftPolicy, Page,
    TransferRequest, UserId,
};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Ledger Transfer - Replay account openings and transfers from a CSV file
///
/// Opens accounts and runs transfers concurrently, then writes the final
/// account balances to stdout.
#[derive(Parser, Debug)]
#[command(name = "ledger-transfer-rs")]
#[command(about = "Replays account openings and transfers from a CSV file", long_about = None)]
struct Args {
    /// Path to CSV file with operations
    ///
    /// Expected format: type,account,to,amount,currency,owner,name
    /// Example: cargo run -- operations.csv > accounts.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// YAML engine configuration
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Number of threads running transfers
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// Override the row lock timeout
    #[arg(long, value_name = "MS")]
    lock_timeout_ms: Option<u64>,

    /// Let transfers take balances below zero
    #[arg(long)]
    allow_overdraft: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,
}

fn main() {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match LedgerConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                process::exit(1);
            }
        },
        None => LedgerConfig::default(),
    };
    if let Some(timeout) = args.lock_timeout_ms {
        config.lock_timeout_ms = timeout;
    }
    if args.allow_overdraft {
        config.overdraft = OverdraftPolicy::Allow;
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }

    init_logging(&config.log_level);

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            error!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let engine = Engine::with_config(config);
    let summary = match process_operations(BufReader::new(file), &engine, args.workers) {
        Ok(summary) => summary,
        Err(e) => {
            error!("Error processing operations: {}", e);
            process::exit(1);
        }
    };
    info!(
        opened = summary.opened,
        transferred = summary.transferred,
        rejected = summary.rejected,
        "replay finished"
    );

    if let Err(e) = write_accounts(&engine, std::io::stdout()) {
        error!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Logs go to stderr so stdout stays valid CSV.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Raw CSV record matching the input format.
///
/// Fields: `type, account, to, amount, currency, owner, name`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(rename = "type")]
    op_type: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    account: Option<u64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    to: Option<u64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    amount: Option<i64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    currency: Option<Currency>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    owner: Option<u64>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug)]
enum Operation {
    Open(NewAccount),
    Transfer(TransferRequest),
}

impl CsvRecord {
    /// Converts CSV record to an operation.
    ///
    /// Returns `None` for unknown operation types or missing required fields.
    fn into_operation(self) -> Option<Operation> {
        let currency = self.currency?;
        let owner = UserId(self.owner?);

        match self.op_type.to_lowercase().as_str() {
            "open" => {
                let name = self
                    .name
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| format!("{}-{}", owner, currency));
                Some(Operation::Open(NewAccount::new(
                    name,
                    owner,
                    currency,
                    self.amount.unwrap_or(0),
                    Utc::now(),
                )))
            }
            "transfer" => Some(Operation::Transfer(TransferRequest {
                from_account_id: AccountId(self.account?),
                to_account_id: AccountId(self.to?),
                amount: self.amount?,
                currency,
                owner,
            })),
            _ => None,
        }
    }
}

/// Counts of applied and rejected rows.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub opened: usize,
    pub transferred: usize,
    pub rejected: usize,
}

#[derive(Default)]
struct Counters {
    opened: AtomicUsize,
    transferred: AtomicUsize,
    rejected: AtomicUsize,
}

impl Counters {
    fn summary(&self) -> ReplaySummary {
        ReplaySummary {
            opened: self.opened.load(Ordering::SeqCst),
            transferred: self.transferred.load(Ordering::SeqCst),
            rejected: self.rejected.load(Ordering::SeqCst),
        }
    }
}

/// Process operations from a CSV reader.
///
/// Rows are streamed. `open` rows run on the reading thread as they are read,
/// so any later row can reference the new account. `transfer` rows are handed
/// to `workers` threads through a bounded channel and run concurrently.
/// Malformed rows and rejected operations are logged and skipped.
///
/// # CSV Format
///
/// Expected columns: `type, account, to, amount, currency, owner, name`
/// - `type`: `open` or `transfer`
/// - `account`: Source account id (transfer only)
/// - `to`: Destination account id (transfer only)
/// - `amount`: Opening balance or transfer amount, in minor units
/// - `currency`: Three-letter currency code
/// - `owner`: Owning user id (open) or requesting user id (transfer)
/// - `name`: Optional account name (open only)
///
/// Account ids are assigned in the order `open` rows appear, starting at 1.
///
/// # Example
///
/// ```csv
/// type,account,to,amount,currency,owner,name
/// open,,,1000,USD,1,alice
/// open,,,500,USD,2,bob
/// transfer,1,2,200,USD,1,
/// ```
///
/// # Errors
///
/// Returns a CSV error if the reader fails or the CSV structure is invalid.
pub fn process_operations<R: Read>(
    reader: R,
    engine: &Engine,
    workers: usize,
) -> Result<ReplaySummary, csv::Error> {
    let workers = workers.max(1);
    let counters = Counters::default();
    let (sender, receiver) = channel::bounded::<TransferRequest>(workers * 64);

    let outcome = crossbeam::scope(|scope| {
        for _ in 0..workers {
            let receiver = receiver.clone();
            let counters = &counters;
            scope.spawn(move |_| {
                for request in receiver.iter() {
                    match engine.submit_transfer(request) {
                        Ok(result) => {
                            debug!(transfer_id = %result.transfer.id, "transfer applied");
                            counters.transferred.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(e) => {
                            warn!(
                                from = %request.from_account_id,
                                to = %request.to_account_id,
                                "Skipping transfer: {}", e
                            );
                            counters.rejected.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                }
            });
        }
        drop(receiver);

        let read = read_operations(reader, engine, &sender, &counters);
        // Closing the channel lets the workers drain and exit.
        drop(sender);
        read
    });

    match outcome {
        Ok(read) => read.map(|()| counters.summary()),
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

fn read_operations<R: Read>(
    reader: R,
    engine: &Engine,
    sender: &Sender<TransferRequest>,
    counters: &Counters,
) -> Result<(), csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All) // Handle whitespace in fields like " transfer "
        .flexible(true) // Allow trailing optional columns to be omitted
        .has_headers(true)
        .from_reader(reader);

    for result in rdr.deserialize::<CsvRecord>() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping malformed row: {}", e);
                counters.rejected.fetch_add(1, Ordering::SeqCst);
                continue;
            }
        };

        let Some(operation) = record.into_operation() else {
            warn!("Skipping invalid operation record");
            counters.rejected.fetch_add(1, Ordering::SeqCst);
            continue;
        };

        match operation {
            Operation::Open(new) => match engine.create_account(new) {
                Ok(_) => {
                    counters.opened.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) => {
                    warn!("Skipping account opening: {}", e);
                    counters.rejected.fetch_add(1, Ordering::SeqCst);
                }
            },
            Operation::Transfer(request) => {
                if sender.send(request).is_err() {
                    // Every worker is gone; nothing left to run transfers.
                    counters.rejected.fetch_add(1, Ordering::SeqCst);
                }
            }
        }
    }

    Ok(())
}

/// Output row: `id, name, owner, currency, balance`.
#[derive(Debug, Serialize)]
struct AccountRow<'a> {
    id: AccountId,
    name: &'a str,
    owner: UserId,
    currency: Currency,
    balance: i64,
}

/// Write account balances to a CSV writer, ordered by account id.
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_accounts<W: Write>(
    engine: &Engine,
    writer: W,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut wtr = Writer::from_writer(writer);

    let accounts = engine.list_accounts(Page::new(usize::MAX, 0))?;
    for account in &accounts {
        wtr.serialize(AccountRow {
            id: account.id,
            name: &account.name,
            owner: account.owner,
            currency: account.currency,
            balance: account.balance,
        })?;
    }

    wtr.flush()?;
    Ok(())
}
