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

//! Engine configuration.
//!
//! Every field has a default, so a YAML file only needs the keys it changes:
//!
//! ```yaml
//! lock_timeout_ms: 250
//! overdraft: allow
//! supported_currencies: [USD, EUR]
//! ```

use crate::base::Currency;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// What a transfer does when the debit would take the source balance below zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverdraftPolicy {
    /// Fail the transfer with [`LedgerError::InsufficientFunds`](crate::LedgerError::InsufficientFunds).
    #[default]
    Reject,
    /// Let the balance go negative; callers are trusted to pre-check funds.
    Allow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Maximum wait for an account row lock.
    pub lock_timeout_ms: u64,
    pub overdraft: OverdraftPolicy,
    /// Currencies accepted for new accounts and transfer requests.
    pub supported_currencies: Vec<Currency>,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl LedgerConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn is_supported(&self, currency: Currency) -> bool {
        self.supported_currencies.contains(&currency)
    }

    pub fn from_yaml(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path)?;
        Self::from_yaml(&source)
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 5_000,
            overdraft: OverdraftPolicy::Reject,
            supported_currencies: vec![
                Currency::USD,
                Currency::EUR,
                Currency::INR,
                Currency::CAD,
                Currency::YEN,
            ],
            log_level: "info".to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}
