// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{Account, AccountDetail, TransactionView};
use crate::normalize::counterparty_from_remittance;
use crate::utils::{maybe_print_json, pretty_table};
use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("list", sub)) => {
            let json_flag = sub.get_flag("json");
            let jsonl_flag = sub.get_flag("jsonl");
            let data = accounts_with_transactions(conn)?;
            if !maybe_print_json(json_flag, jsonl_flag, &data)? {
                let rows: Vec<Vec<String>> = data
                    .iter()
                    .map(|d| {
                        vec![
                            d.account.uid.clone(),
                            d.account.name.clone().unwrap_or_default(),
                            d.account.iban.clone().unwrap_or_default(),
                            d.account.balance.round_dp(2).to_string(),
                            d.account.currency.clone().unwrap_or_default(),
                            d.account.bank_name.clone().unwrap_or_default(),
                            d.account.last_synced.clone(),
                            d.transactions.len().to_string(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(
                        &["UID", "Name", "IBAN", "Balance", "CCY", "Bank", "Last Synced", "Txns"],
                        rows,
                    )
                );
            }
        }
        _ => {}
    }
    Ok(())
}

/// All accounts with their transactions nested, newest booking date first.
/// Display name resolution: explicit creditor/debtor name, else the
/// remittance heuristic, else "Unknown".
pub fn accounts_with_transactions(conn: &Connection) -> Result<Vec<AccountDetail>> {
    let mut stmt = conn.prepare(
        "SELECT uid, name, iban, balance, currency, bank_name, last_synced \
         FROM accounts ORDER BY name, uid",
    )?;
    let mut rows = stmt.query([])?;
    let mut data = Vec::new();
    while let Some(r) = rows.next()? {
        let uid: String = r.get(0)?;
        let balance_raw: String = r.get(3)?;
        let balance = balance_raw
            .parse::<Decimal>()
            .with_context(|| format!("Invalid stored balance '{}' for {}", balance_raw, uid))?;
        let account = Account {
            uid: uid.clone(),
            name: r.get(1)?,
            iban: r.get(2)?,
            balance,
            currency: r.get(4)?,
            bank_name: r.get(5)?,
            last_synced: r.get(6)?,
        };
        let transactions = transactions_for(conn, &uid)?;
        data.push(AccountDetail {
            account,
            transactions,
        });
    }
    Ok(data)
}

fn transactions_for(conn: &Connection, account_uid: &str) -> Result<Vec<TransactionView>> {
    let mut stmt = conn.prepare_cached(
        "SELECT uid, booking_date, amount, currency, creditor_name, debtor_name, remittance \
         FROM bank_transactions WHERE account_uid=?1 ORDER BY booking_date DESC, uid",
    )?;
    let mut rows = stmt.query(params![account_uid])?;
    let mut data = Vec::new();
    while let Some(r) = rows.next()? {
        let uid: String = r.get(0)?;
        let booking_date: String = r.get(1)?;
        let amount_raw: String = r.get(2)?;
        let currency: Option<String> = r.get(3)?;
        let creditor_name: Option<String> = r.get(4)?;
        let debtor_name: Option<String> = r.get(5)?;
        let remittance: Option<String> = r.get(6)?;

        let amount = amount_raw.parse::<Decimal>().with_context(|| {
            format!("Invalid stored amount '{}' on transaction {}", amount_raw, uid)
        })?;
        let display_name = creditor_name
            .or(debtor_name)
            .or_else(|| {
                remittance
                    .as_deref()
                    .and_then(counterparty_from_remittance)
            })
            .unwrap_or_else(|| "Unknown".to_string());
        data.push(TransactionView {
            uid,
            booking_date,
            amount,
            currency,
            display_name,
            remittance,
        });
    }
    Ok(data)
}
