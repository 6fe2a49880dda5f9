// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Ingest of raw aggregator payloads into the local account/transaction
//! store. The guiding rule here is stale-but-correct over fresh-but-corrupt:
//! a record that cannot be normalized is skipped and counted, never allowed
//! to error the batch or overwrite good local state.

use crate::normalize::{self, SkipReason};
use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::fs;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("accounts", sub)) => {
            let report = run_from_file(conn, sub, false)?;
            println!(
                "Synced {} account(s), {} transaction(s), skipped {}",
                report.accounts, report.transactions, report.skipped
            );
        }
        Some(("refresh", sub)) => {
            let report = run_from_file(conn, sub, true)?;
            println!(
                "Refreshed {} account(s), {} transaction(s), skipped {}",
                report.accounts, report.transactions, report.skipped
            );
        }
        _ => {}
    }
    Ok(())
}

fn run_from_file(
    conn: &mut Connection,
    sub: &clap::ArgMatches,
    known_only: bool,
) -> Result<SyncReport> {
    let path = sub.get_one::<String>("path").unwrap().trim();
    let raw = fs::read_to_string(path).with_context(|| format!("Open payload {}", path))?;
    let payload: Value =
        serde_json::from_str(&raw).with_context(|| format!("Parse payload {}", path))?;
    if known_only {
        refresh_accounts(conn, &payload)
    } else {
        sync_accounts(conn, &payload)
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct SyncReport {
    pub accounts: usize,
    pub transactions: usize,
    pub skipped: usize,
}

#[derive(Debug)]
pub enum UpsertOutcome {
    Written,
    Skipped(SkipReason),
}

/// Session-exchange ingest: upsert every account in the payload, then the
/// transactions embedded under it.
pub fn sync_accounts(conn: &mut Connection, payload: &Value) -> Result<SyncReport> {
    ingest(conn, payload, false)
}

/// Periodic refresh: same ingest, but only accounts already stored locally
/// are touched. Unknown accounts in the payload are counted as skipped.
pub fn refresh_accounts(conn: &mut Connection, payload: &Value) -> Result<SyncReport> {
    ingest(conn, payload, true)
}

fn ingest(conn: &mut Connection, payload: &Value, known_only: bool) -> Result<SyncReport> {
    let mut report = SyncReport::default();
    for raw_account in account_items(payload) {
        if known_only {
            let uid = match normalize::account_identity(raw_account) {
                Ok(uid) => uid,
                Err(_) => {
                    report.skipped += 1;
                    continue;
                }
            };
            let known: Option<i64> = conn
                .query_row("SELECT 1 FROM accounts WHERE uid=?1", params![uid], |r| {
                    r.get(0)
                })
                .optional()?;
            if known.is_none() {
                report.skipped += 1;
                continue;
            }
        }
        match upsert_account(conn, raw_account)? {
            UpsertOutcome::Written => report.accounts += 1,
            UpsertOutcome::Skipped(_) => {
                report.skipped += 1;
                continue;
            }
        }
        // Identity succeeded above if we got here.
        if let Ok(uid) = normalize::account_identity(raw_account) {
            for raw_tx in transaction_items(raw_account) {
                match upsert_transaction(conn, raw_tx, &uid)? {
                    UpsertOutcome::Written => report.transactions += 1,
                    UpsertOutcome::Skipped(_) => report.skipped += 1,
                }
            }
        }
    }
    Ok(report)
}

fn account_items(payload: &Value) -> Vec<&Value> {
    match payload {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => payload
            .get("accounts")
            .and_then(Value::as_array)
            .map(|items| items.iter().collect())
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn transaction_items(raw_account: &Value) -> Vec<&Value> {
    match raw_account.get("transactions") {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(obj @ Value::Object(_)) => ["booked", "pending"]
            .iter()
            .filter_map(|k| obj.get(*k))
            .filter_map(Value::as_array)
            .flatten()
            .collect(),
        _ => Vec::new(),
    }
}

/// Insert-or-update an account by its derived identity. An unresolvable
/// identity is a silent no-op (partial sync responses are expected), and a
/// zero or absent balance never overwrites an existing non-zero one: the
/// aggregator returns transient zero balances under rate limiting.
pub fn upsert_account(conn: &Connection, raw: &Value) -> Result<UpsertOutcome> {
    let account = match normalize::normalize_account(raw) {
        Ok(a) => a,
        Err(reason) => return Ok(UpsertOutcome::Skipped(reason)),
    };

    let stored: Option<String> = conn
        .query_row(
            "SELECT balance FROM accounts WHERE uid=?1",
            params![account.uid],
            |r| r.get(0),
        )
        .optional()?;

    match stored {
        Some(stored_raw) => {
            let stored_balance = stored_raw.parse::<Decimal>().with_context(|| {
                format!("Invalid stored balance '{}' for {}", stored_raw, account.uid)
            })?;
            let balance = match account.balance {
                Some(fresh) if !(fresh.is_zero() && !stored_balance.is_zero()) => fresh,
                // Failsafe: keep the stored balance when the fresh one is
                // zero-against-nonzero or missing entirely.
                _ => stored_balance,
            };
            conn.execute(
                "UPDATE accounts SET name=COALESCE(?2,name), iban=COALESCE(?3,iban), balance=?4, \
                 currency=COALESCE(?5,currency), bank_name=COALESCE(?6,bank_name), \
                 last_synced=datetime('now') WHERE uid=?1",
                params![
                    account.uid,
                    account.name,
                    account.iban,
                    balance.to_string(),
                    account.currency,
                    account.bank_name
                ],
            )?;
        }
        None => {
            // First insert has no prior balance to protect.
            let balance = account.balance.unwrap_or(Decimal::ZERO);
            conn.execute(
                "INSERT INTO accounts(uid, name, iban, balance, currency, bank_name, last_synced) \
                 VALUES (?1,?2,?3,?4,?5,?6,datetime('now'))",
                params![
                    account.uid,
                    account.name,
                    account.iban,
                    balance.to_string(),
                    account.currency,
                    account.bank_name
                ],
            )?;
        }
    }
    Ok(UpsertOutcome::Written)
}

/// Insert-or-replace a transaction by its stable identity; repeated syncs of
/// the same underlying transaction collapse to one row.
pub fn upsert_transaction(
    conn: &Connection,
    raw: &Value,
    account_uid: &str,
) -> Result<UpsertOutcome> {
    let tx = match normalize::normalize_transaction(raw, account_uid) {
        Ok(t) => t,
        Err(reason) => return Ok(UpsertOutcome::Skipped(reason)),
    };

    conn.execute(
        "INSERT INTO bank_transactions(uid, account_uid, booking_date, amount, currency, \
         creditor_name, debtor_name, remittance, raw_json) \
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9) \
         ON CONFLICT(uid) DO UPDATE SET account_uid=excluded.account_uid, \
         booking_date=excluded.booking_date, amount=excluded.amount, \
         currency=excluded.currency, creditor_name=excluded.creditor_name, \
         debtor_name=excluded.debtor_name, remittance=excluded.remittance, \
         raw_json=excluded.raw_json",
        params![
            tx.uid,
            tx.account_uid,
            tx.booking_date.to_string(),
            tx.amount.to_string(),
            tx.currency,
            tx.creditor_name,
            tx.debtor_name,
            tx.remittance,
            raw.to_string()
        ],
    )?;
    Ok(UpsertOutcome::Written)
}

/// Sequential batch upsert; each item is independently idempotent, so a bad
/// item mid-batch leaves the processed prefix committed.
pub fn upsert_transactions_batch(
    conn: &Connection,
    raw_items: &[Value],
    account_uid: &str,
) -> Result<SyncReport> {
    let mut report = SyncReport::default();
    for raw in raw_items {
        match upsert_transaction(conn, raw, account_uid)? {
            UpsertOutcome::Written => report.transactions += 1,
            UpsertOutcome::Skipped(_) => report.skipped += 1,
        }
    }
    Ok(report)
}
