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

//! Core identifier types for accounts, ledger rows, and owners.

use crate::LedgerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Returns `true` for the zero id, which no stored row ever carries.
            pub const fn is_missing(self) -> bool {
                self.0 == 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

row_id!(
    /// Unique identifier for an account.
    ///
    /// Ids are assigned from a sequence starting at 1. The ordering of account
    /// ids is the global lock order used by transfers.
    AccountId
);

row_id!(
    /// Unique identifier for a ledger entry.
    EntryId
);

row_id!(
    /// Unique identifier for a transfer record.
    TransferId
);

row_id!(
    /// Reference to the user owning an account.
    UserId
);

/// ISO-4217 style three-letter currency code.
///
/// Always stored upper-case. Whether a code is accepted for new accounts is a
/// configuration concern (see [`LedgerConfig`](crate::LedgerConfig)).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency([u8; 3]);

impl Currency {
    pub const USD: Currency = Currency(*b"USD");
    pub const EUR: Currency = Currency(*b"EUR");
    pub const INR: Currency = Currency(*b"INR");
    pub const CAD: Currency = Currency(*b"CAD");
    pub const YEN: Currency = Currency(*b"YEN");

    pub fn as_str(&self) -> &str {
        // Only ASCII letters get past `from_str`.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl FromStr for Currency {
    type Err = LedgerError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        let code = code.trim();
        let bytes: [u8; 3] = code
            .as_bytes()
            .try_into()
            .map_err(|_| LedgerError::UnsupportedCurrency(code.to_string()))?;
        if !bytes.iter().all(u8::is_ascii_alphabetic) {
            return Err(LedgerError::UnsupportedCurrency(code.to_string()));
        }
        Ok(Currency(bytes.map(|b| b.to_ascii_uppercase())))
    }
}

impl TryFrom<String> for Currency {
    type Error = LedgerError;

    fn try_from(code: String) -> Result<Self, Self::Error> {
        code.parse()
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.as_str().to_string()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Currency({})", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_parses_case_insensitively() {
        assert_eq!("usd".parse::<Currency>().unwrap(), Currency::USD);
        assert_eq!(" Eur ".parse::<Currency>().unwrap(), Currency::EUR);
    }

    #[test]
    fn currency_rejects_malformed_codes() {
        assert_eq!(
            "US".parse::<Currency>(),
            Err(LedgerError::UnsupportedCurrency("US".to_string()))
        );
        assert!("U5D".parse::<Currency>().is_err());
        assert!("DOLLAR".parse::<Currency>().is_err());
    }

    #[test]
    fn currency_serializes_as_code() {
        let json = serde_json::to_string(&Currency::CAD).unwrap();
        assert_eq!(json, "\"CAD\"");
        let parsed: Currency = serde_json::from_str("\"inr\"").unwrap();
        assert_eq!(parsed, Currency::INR);
    }

    #[test]
    fn ids_display_inner_value() {
        assert_eq!(AccountId(7).to_string(), "7");
        assert_eq!(TransferId(42).to_string(), "42");
    }

    #[test]
    fn zero_id_is_missing() {
        assert!(AccountId(0).is_missing());
        assert!(!EntryId(1).is_missing());
    }

    #[test]
    fn account_ids_order_numerically() {
        assert!(AccountId(2) < AccountId(10));
    }
}
