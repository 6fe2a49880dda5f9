// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Pure normalization of raw aggregator payloads.
//!
//! Aggregator responses vary in shape across banks and response formats, and
//! under rate limiting they arrive partial or malformed. Nothing in this
//! module touches the database and nothing here returns an `Err` that aborts
//! a sync batch: a payload that cannot be normalized yields a `SkipReason`
//! and the caller moves on, keeping prior local state intact.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

/// Why a raw payload was dropped instead of written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotAnObject,
    MissingIdentity,
    /// Identity contained the literal "[object" text: an upstream bug once
    /// stringified a whole object into the id field, and such ids must never
    /// become row keys.
    StringifiedIdentity,
    NoAmount,
    NoDate,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::NotAnObject => "payload is not a JSON object",
            SkipReason::MissingIdentity => "no usable identity (uid/account_id/iban)",
            SkipReason::StringifiedIdentity => "identity is a stringified object",
            SkipReason::NoAmount => "no parseable amount",
            SkipReason::NoDate => "no parseable booking or value date",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct NormalizedAccount {
    pub uid: String,
    pub name: Option<String>,
    pub iban: Option<String>,
    /// `None` means the payload carried no balance at all, which is distinct
    /// from an explicit zero. The upsert failsafe depends on the difference.
    pub balance: Option<Decimal>,
    pub currency: Option<String>,
    pub bank_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NormalizedTransaction {
    pub uid: String,
    pub account_uid: String,
    pub booking_date: NaiveDate,
    pub amount: Decimal,
    pub currency: Option<String>,
    pub creditor_name: Option<String>,
    pub debtor_name: Option<String>,
    pub remittance: Option<String>,
}

/// Resolve the stable account identity: `uid`, then `account_id`, then
/// `iban`. A candidate containing the `"[object"` sentinel is rejected and
/// the next source is tried.
pub fn account_identity(raw: &Value) -> Result<String, SkipReason> {
    if !raw.is_object() {
        return Err(SkipReason::NotAnObject);
    }
    let mut saw_stringified = false;
    for key in ["uid", "account_id", "iban"] {
        let Some(candidate) = raw.get(key).and_then(Value::as_str) else {
            continue;
        };
        let candidate = candidate.trim();
        if candidate.is_empty() {
            continue;
        }
        if candidate.contains("[object") {
            saw_stringified = true;
            continue;
        }
        return Ok(candidate.to_string());
    }
    if saw_stringified {
        Err(SkipReason::StringifiedIdentity)
    } else {
        Err(SkipReason::MissingIdentity)
    }
}

/// Extract a balance from the known upstream shapes, one case per shape:
/// `balances.current` (bare number/string or `{amount}` object), else the
/// first element of a `balances` array under one of the nested amount field
/// spellings. `None` when nothing matches.
pub fn extract_balance(raw: &Value) -> Option<Decimal> {
    let balances = raw.get("balances")?;

    if let Some(current) = balances.get("current") {
        if let Some(d) = decimal_value(current) {
            return Some(d);
        }
        if let Some(d) = current.get("amount").and_then(decimal_value) {
            return Some(d);
        }
    }

    let first = balances.as_array()?.first()?;
    for key in ["amount", "balanceAmount", "balance_amount"] {
        if let Some(d) = first
            .get(key)
            .and_then(|a| a.get("amount"))
            .and_then(decimal_value)
        {
            return Some(d);
        }
    }
    None
}

// BIC fragments that show up inside IBANs, best-effort only.
const IBAN_BANK_HINTS: &[(&str, &str)] = &[
    ("INGB", "ING"),
    ("ABNA", "ABN AMRO"),
    ("RABO", "Rabobank"),
    ("BNPA", "BNP Paribas"),
    ("DEUT", "Deutsche Bank"),
    ("COBA", "Commerzbank"),
    ("AIBK", "AIB"),
    ("BOFI", "Bank of Ireland"),
    ("REVO", "Revolut"),
    ("NTSB", "N26"),
    ("BUNQ", "bunq"),
];

pub fn infer_bank_name(iban: &str) -> Option<&'static str> {
    let upper = iban.to_ascii_uppercase();
    IBAN_BANK_HINTS
        .iter()
        .find(|(fragment, _)| upper.contains(fragment))
        .map(|(_, name)| *name)
}

pub fn normalize_account(raw: &Value) -> Result<NormalizedAccount, SkipReason> {
    let uid = account_identity(raw)?;
    let iban = str_field(raw, "iban");
    let bank_name = str_field(raw, "bank_name")
        .or_else(|| iban.as_deref().and_then(infer_bank_name).map(String::from));
    Ok(NormalizedAccount {
        uid,
        name: str_field(raw, "name"),
        iban,
        balance: extract_balance(raw),
        currency: str_field(raw, "currency"),
        bank_name,
    })
}

pub fn normalize_transaction(
    raw: &Value,
    account_uid: &str,
) -> Result<NormalizedTransaction, SkipReason> {
    if !raw.is_object() {
        return Err(SkipReason::NotAnObject);
    }

    let raw_amount = raw
        .get("transaction_amount")
        .and_then(|t| t.get("amount"))
        .and_then(decimal_value)
        .or_else(|| raw.get("amount").and_then(decimal_value))
        .ok_or(SkipReason::NoAmount)?;

    // Upstream sign conventions differ per bank, so the credit/debit
    // indicator is authoritative and overrides the raw sign.
    let amount = match raw
        .get("credit_debit_indicator")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_ascii_uppercase())
        .as_deref()
    {
        Some("DBIT") => -raw_amount.abs(),
        Some("CRDT") => raw_amount.abs(),
        _ => raw_amount,
    };

    // Value date is the economic effective date and wins over booking date.
    let booking_date = date_field(raw, "value_date")
        .or_else(|| date_field(raw, "booking_date"))
        .ok_or(SkipReason::NoDate)?;

    let uid = str_field(raw, "transaction_id")
        .or_else(|| str_field(raw, "entry_reference"))
        .unwrap_or_else(|| synthetic_transaction_uid(account_uid, booking_date, amount));

    let currency = raw
        .get("transaction_amount")
        .and_then(|t| t.get("currency"))
        .and_then(Value::as_str)
        .map(String::from)
        .or_else(|| str_field(raw, "currency"));

    let mut creditor_name = party_name(raw, "creditor_name", "creditor");
    let debtor_name = party_name(raw, "debtor_name", "debtor");
    let remittance = str_field(raw, "remittance_information");
    if creditor_name.is_none() && debtor_name.is_none() {
        creditor_name = remittance.as_deref().and_then(counterparty_from_remittance);
    }

    Ok(NormalizedTransaction {
        uid,
        account_uid: account_uid.to_string(),
        booking_date,
        amount,
        currency,
        creditor_name,
        debtor_name,
        remittance,
    })
}

/// Deterministic fallback identity for transactions the upstream never gave
/// an id. Stability contract: the digest input is exactly
/// `account_uid|YYYY-MM-DD|signed_amount`; changing it orphans every
/// previously synced id-less transaction.
pub fn synthetic_transaction_uid(account_uid: &str, date: NaiveDate, amount: Decimal) -> String {
    let mut hasher = Sha256::new();
    hasher.update(account_uid.as_bytes());
    hasher.update(b"|");
    hasher.update(date.format("%Y-%m-%d").to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(amount.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

static SENT_FROM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(.+?)\s+sent\s+from\s+\S").unwrap());

/// Best-effort counterparty recovery from free-text remittance info matching
/// the "<Name> Sent from <Bank>" convention some banks use.
pub fn counterparty_from_remittance(remittance: &str) -> Option<String> {
    SENT_FROM
        .captures(remittance)
        .map(|c| c[1].trim().to_string())
        .filter(|name| !name.is_empty())
}

fn str_field(raw: &Value, key: &str) -> Option<String> {
    raw.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn party_name(raw: &Value, flat_key: &str, nested_key: &str) -> Option<String> {
    str_field(raw, flat_key).or_else(|| raw.get(nested_key).and_then(|p| str_field(p, "name")))
}

fn date_field(raw: &Value, key: &str) -> Option<NaiveDate> {
    let s = raw.get(key).and_then(Value::as_str)?.trim();
    // Some formats carry a full timestamp; the date prefix is enough.
    let prefix = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

fn decimal_value(v: &Value) -> Option<Decimal> {
    match v {
        Value::String(s) => s.trim().parse::<Decimal>().ok(),
        Value::Number(_) => v.to_string().parse::<Decimal>().ok(),
        _ => None,
    }
}
