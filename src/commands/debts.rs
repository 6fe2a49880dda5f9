// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::LedgerError;
use crate::models::{Debt, DebtDetail, DebtKind, Repayment, SubDebt, Totals};
use crate::utils::{fmt_money, id_for_person, maybe_print_json, parse_decimal, pretty_table};
use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("repay", sub)) => repay(conn, sub)?,
        Some(("totals", sub)) => totals_cmd(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let person = sub.get_one::<String>("person").unwrap().trim().to_string();
    let kind = DebtKind::parse(sub.get_one::<String>("kind").unwrap())?;
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap().trim())?;
    let description = sub.get_one::<String>("description").map(|s| s.trim());
    let currency = sub.get_one::<String>("currency").map(|s| s.trim());

    let person_id = id_for_person(conn, &person)?;
    let debt = create_debt(conn, person_id, kind, amount, description, currency)?;
    println!(
        "Recorded debt #{}: {} {} '{}' ({})",
        debt.id,
        fmt_money(&debt.amount, &debt.currency),
        match debt.kind {
            DebtKind::OwedByMe => "owed to",
            DebtKind::OwedToMe => "owed by",
        },
        person,
        debt.description
    );
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let kind = sub
        .get_one::<String>("kind")
        .map(|s| DebtKind::parse(s))
        .transpose()?;

    let data = debts_list(conn, kind)?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|d| {
                vec![
                    d.id.to_string(),
                    d.person_name.clone(),
                    d.kind.as_str().to_string(),
                    d.description.clone(),
                    d.amount.round_dp(2).to_string(),
                    d.paid_amount.round_dp(2).to_string(),
                    d.remaining_amount.round_dp(2).to_string(),
                    d.currency.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["ID", "Person", "Kind", "Description", "Amount", "Paid", "Remaining", "CCY"],
                rows,
            )
        );
    }
    Ok(())
}

fn repay(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let debt_id = sub.get_one::<String>("id").unwrap().trim().parse::<i64>()?;
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap().trim())?;
    let note = sub
        .get_one::<String>("note")
        .map(|s| s.trim())
        .filter(|s| !s.is_empty());

    let repayment = record_repayment(conn, debt_id, amount, note)?;
    if repayment.settled {
        println!("Recorded repayment of {}; debt #{} settled and removed", amount, debt_id);
    } else {
        println!("Recorded repayment of {} against debt #{}", amount, debt_id);
    }
    Ok(())
}

fn totals_cmd(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let t = totals(conn)?;
    if !maybe_print_json(json_flag, jsonl_flag, &t)? {
        println!(
            "{}",
            pretty_table(
                &["I owe", "Owed to me"],
                vec![vec![
                    t.i_owe.round_dp(2).to_string(),
                    t.owed_to_me.round_dp(2).to_string(),
                ]],
            )
        );
    }
    Ok(())
}

pub fn create_debt(
    conn: &Connection,
    person_id: i64,
    kind: DebtKind,
    amount: Decimal,
    description: Option<&str>,
    currency: Option<&str>,
) -> Result<Debt> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::validation("amount", "must be positive").into());
    }
    let exists: Option<i64> = conn
        .query_row(
            "SELECT id FROM people WHERE id=?1",
            params![person_id],
            |r| r.get(0),
        )
        .optional()?;
    if exists.is_none() {
        return Err(LedgerError::not_found("Person", person_id).into());
    }

    let description = description.filter(|s| !s.is_empty()).unwrap_or("Debt");
    let currency = currency.filter(|s| !s.is_empty()).unwrap_or("EUR");
    conn.execute(
        "INSERT INTO debts(person_id, kind, amount, currency, description) VALUES (?1,?2,?3,?4,?5)",
        params![
            person_id,
            kind.as_str(),
            amount.to_string(),
            currency,
            description
        ],
    )?;
    let id = conn.last_insert_rowid();
    let created_at: String = conn.query_row(
        "SELECT created_at FROM debts WHERE id=?1",
        params![id],
        |r| r.get(0),
    )?;
    Ok(Debt {
        id,
        person_id,
        kind,
        amount,
        currency: currency.to_string(),
        description: description.to_string(),
        created_at,
    })
}

/// Record a partial repayment. When the repayments reach (or exceed) the
/// principal the debt auto-settles: the row is deleted outright, cascading
/// its sub-debts, rather than being retained with a settled flag. Overpaying
/// is accepted and the excess discarded.
pub fn record_repayment(
    conn: &mut Connection,
    debt_id: i64,
    amount: Decimal,
    note: Option<&str>,
) -> Result<Repayment> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::validation("amount", "must be positive").into());
    }

    let tx = conn.transaction()?;
    let principal_raw: Option<String> = tx
        .query_row(
            "SELECT amount FROM debts WHERE id=?1",
            params![debt_id],
            |r| r.get(0),
        )
        .optional()?;
    let Some(principal_raw) = principal_raw else {
        return Err(LedgerError::not_found("Debt", debt_id).into());
    };
    let principal = principal_raw
        .parse::<Decimal>()
        .with_context(|| format!("Invalid amount '{}' on debt {}", principal_raw, debt_id))?;

    tx.execute(
        "INSERT INTO sub_debts(debt_id, amount, note) VALUES (?1,?2,?3)",
        params![debt_id, amount.to_string(), note],
    )?;
    let sub_debt_id = tx.last_insert_rowid();

    let paid = sum_sub_debts(&tx, debt_id)?;
    let settled = principal - paid <= Decimal::ZERO;
    if settled {
        // Cascade removes the sub-debts, including the one just written.
        tx.execute("DELETE FROM debts WHERE id=?1", params![debt_id])?;
    }
    tx.commit()?;
    Ok(Repayment {
        sub_debt_id,
        settled,
    })
}

pub fn debts_list(conn: &Connection, kind: Option<DebtKind>) -> Result<Vec<DebtDetail>> {
    let mut sql = String::from(
        "SELECT d.id, d.person_id, p.name, d.kind, d.amount, d.currency, d.description, d.created_at \
         FROM debts d JOIN people p ON d.person_id=p.id WHERE 1=1",
    );
    let mut params_vec: Vec<String> = Vec::new();
    if let Some(k) = kind {
        sql.push_str(" AND d.kind=?");
        params_vec.push(k.as_str().to_string());
    }
    sql.push_str(" ORDER BY d.created_at DESC, d.id DESC");

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = if params_vec.is_empty() {
        stmt.query([])?
    } else {
        let params: Vec<&dyn rusqlite::ToSql> = params_vec
            .iter()
            .map(|s| s as &dyn rusqlite::ToSql)
            .collect();
        stmt.query(rusqlite::params_from_iter(params))?
    };

    let mut data = Vec::new();
    while let Some(r) = rows.next()? {
        let id: i64 = r.get(0)?;
        let person_id: i64 = r.get(1)?;
        let person_name: String = r.get(2)?;
        let kind_raw: String = r.get(3)?;
        let amount_raw: String = r.get(4)?;
        let currency: String = r.get(5)?;
        let description: String = r.get(6)?;
        let created_at: String = r.get(7)?;

        let kind = DebtKind::parse(&kind_raw)?;
        let amount = amount_raw
            .parse::<Decimal>()
            .with_context(|| format!("Invalid amount '{}' on debt {}", amount_raw, id))?;
        let sub_debts = sub_debts_for(conn, id)?;
        let paid_amount: Decimal = sub_debts.iter().map(|s| s.amount).sum();
        data.push(DebtDetail {
            id,
            person_id,
            person_name,
            kind,
            amount,
            paid_amount,
            remaining_amount: amount - paid_amount,
            currency,
            description,
            created_at,
            sub_debts,
        });
    }
    Ok(data)
}

/// Global totals, derived from the per-person summaries: positive nets sum
/// into owed_to_me, negative nets (absolute) into i_owe.
pub fn totals(conn: &Connection) -> Result<Totals> {
    let mut i_owe = Decimal::ZERO;
    let mut owed_to_me = Decimal::ZERO;
    for person in super::people::people_summary(conn)? {
        if person.net_balance >= Decimal::ZERO {
            owed_to_me += person.net_balance;
        } else {
            i_owe += -person.net_balance;
        }
    }
    Ok(Totals { i_owe, owed_to_me })
}

/// Remaining balance is never cached: it is recomputed from the sub-debt sum
/// at every query.
pub fn net_balance_for_person(conn: &Connection, person_id: i64) -> Result<Decimal> {
    let mut stmt = conn.prepare("SELECT id, kind, amount FROM debts WHERE person_id=?1")?;
    let mut rows = stmt.query(params![person_id])?;
    let mut net = Decimal::ZERO;
    while let Some(r) = rows.next()? {
        let debt_id: i64 = r.get(0)?;
        let kind_raw: String = r.get(1)?;
        let amount_raw: String = r.get(2)?;
        let amount = amount_raw
            .parse::<Decimal>()
            .with_context(|| format!("Invalid amount '{}' on debt {}", amount_raw, debt_id))?;
        let remaining = amount - sum_sub_debts(conn, debt_id)?;
        match DebtKind::parse(&kind_raw)? {
            DebtKind::OwedToMe => net += remaining,
            DebtKind::OwedByMe => net -= remaining,
        }
    }
    Ok(net)
}

fn sum_sub_debts(conn: &Connection, debt_id: i64) -> Result<Decimal> {
    let mut stmt = conn.prepare_cached("SELECT amount FROM sub_debts WHERE debt_id=?1")?;
    let mut rows = stmt.query(params![debt_id])?;
    let mut total = Decimal::ZERO;
    while let Some(r) = rows.next()? {
        let raw: String = r.get(0)?;
        total += raw
            .parse::<Decimal>()
            .with_context(|| format!("Invalid repayment amount '{}' on debt {}", raw, debt_id))?;
    }
    Ok(total)
}

fn sub_debts_for(conn: &Connection, debt_id: i64) -> Result<Vec<SubDebt>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, amount, note, created_at FROM sub_debts WHERE debt_id=?1 \
         ORDER BY created_at DESC, id DESC",
    )?;
    let mut rows = stmt.query(params![debt_id])?;
    let mut subs = Vec::new();
    while let Some(r) = rows.next()? {
        let id: i64 = r.get(0)?;
        let amount_raw: String = r.get(1)?;
        let note: Option<String> = r.get(2)?;
        let created_at: String = r.get(3)?;
        subs.push(SubDebt {
            id,
            debt_id,
            amount: amount_raw
                .parse::<Decimal>()
                .with_context(|| format!("Invalid repayment amount '{}' on debt {}", amount_raw, debt_id))?,
            note,
            created_at,
        });
    }
    Ok(subs)
}
