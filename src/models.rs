// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::LedgerError;
use anyhow::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

/// Direction of a debt as seen from the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtKind {
    OwedByMe,
    OwedToMe,
}

impl DebtKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DebtKind::OwedByMe => "owed_by_me",
            DebtKind::OwedToMe => "owed_to_me",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "owed_by_me" => Ok(DebtKind::OwedByMe),
            "owed_to_me" => Ok(DebtKind::OwedToMe),
            other => Err(LedgerError::validation(
                "kind",
                format!("'{}' is not owed-by-me or owed-to-me", other),
            )
            .into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Debt {
    pub id: i64,
    pub person_id: i64,
    pub kind: DebtKind,
    pub amount: Decimal,
    pub currency: String,
    pub description: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubDebt {
    pub id: i64,
    pub debt_id: i64,
    pub amount: Decimal,
    pub note: Option<String>,
    pub created_at: String,
}

/// Outcome of `record_repayment`: the sub-debt written, and whether the
/// parent debt auto-settled (was deleted) as a result.
#[derive(Debug, Clone, Serialize)]
pub struct Repayment {
    pub sub_debt_id: i64,
    pub settled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PersonSummary {
    pub id: i64,
    pub name: String,
    pub net_balance: Decimal,
}

/// A debt joined with its person and repayment history, as the UI lists it.
#[derive(Debug, Clone, Serialize)]
pub struct DebtDetail {
    pub id: i64,
    pub person_id: i64,
    pub person_name: String,
    pub kind: DebtKind,
    pub amount: Decimal,
    pub paid_amount: Decimal,
    pub remaining_amount: Decimal,
    pub currency: String,
    pub description: String,
    pub created_at: String,
    pub sub_debts: Vec<SubDebt>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Totals {
    pub i_owe: Decimal,
    pub owed_to_me: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub uid: String,
    pub name: Option<String>,
    pub iban: Option<String>,
    pub balance: Decimal,
    pub currency: Option<String>,
    pub bank_name: Option<String>,
    pub last_synced: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionView {
    pub uid: String,
    pub booking_date: String,
    pub amount: Decimal,
    pub currency: Option<String>,
    pub display_name: String,
    pub remittance: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountDetail {
    #[serde(flatten)]
    pub account: Account,
    pub transactions: Vec<TransactionView>,
}
