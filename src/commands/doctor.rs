// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::pretty_table;
use anyhow::Result;
use rusqlite::Connection;
use rust_decimal::Decimal;

pub fn handle(conn: &Connection) -> Result<()> {
    let mut rows = Vec::new();

    // 1) Repayments whose parent debt is gone (cascade should prevent this)
    let mut stmt = conn.prepare(
        "SELECT s.id FROM sub_debts s LEFT JOIN debts d ON s.debt_id=d.id WHERE d.id IS NULL",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let id: i64 = r.get(0)?;
        rows.push(vec!["orphan_sub_debt".into(), format!("sub_debt {}", id)]);
    }

    // 2) Debts that should have auto-settled but still exist
    let mut stmt2 = conn.prepare("SELECT id, amount FROM debts")?;
    let mut cur2 = stmt2.query([])?;
    while let Some(r) = cur2.next()? {
        let id: i64 = r.get(0)?;
        let amount_raw: String = r.get(1)?;
        let Ok(amount) = amount_raw.parse::<Decimal>() else {
            rows.push(vec!["bad_debt_amount".into(), format!("debt {}: '{}'", id, amount_raw)]);
            continue;
        };
        let mut sstmt = conn.prepare_cached("SELECT amount FROM sub_debts WHERE debt_id=?1")?;
        let mut scur = sstmt.query([id])?;
        let mut paid = Decimal::ZERO;
        while let Some(s) = scur.next()? {
            let raw: String = s.get(0)?;
            match raw.parse::<Decimal>() {
                Ok(d) => paid += d,
                Err(_) => {
                    rows.push(vec!["bad_repayment_amount".into(), format!("debt {}: '{}'", id, raw)]);
                }
            }
        }
        if amount - paid <= Decimal::ZERO {
            rows.push(vec!["unsettled_zero_debt".into(), format!("debt {}", id)]);
        }
    }

    // 3) Transactions pointing at accounts we never stored
    let mut stmt3 = conn.prepare(
        "SELECT t.uid FROM bank_transactions t LEFT JOIN accounts a ON t.account_uid=a.uid \
         WHERE a.uid IS NULL",
    )?;
    let mut cur3 = stmt3.query([])?;
    while let Some(r) = cur3.next()? {
        let uid: String = r.get(0)?;
        rows.push(vec!["orphan_transaction".into(), uid]);
    }

    // 4) Stored balances that no longer parse as decimals
    let mut stmt4 = conn.prepare("SELECT uid, balance FROM accounts")?;
    let mut cur4 = stmt4.query([])?;
    while let Some(r) = cur4.next()? {
        let uid: String = r.get(0)?;
        let balance: String = r.get(1)?;
        if balance.parse::<Decimal>().is_err() {
            rows.push(vec!["bad_balance".into(), format!("{}: '{}'", uid, balance)]);
        }
    }

    if rows.is_empty() {
        println!("doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}
