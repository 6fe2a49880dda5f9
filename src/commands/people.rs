// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::LedgerError;
use crate::models::{Person, PersonSummary};
use crate::utils::{maybe_print_json, pretty_table};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, params};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let person = create_person(conn, name)?;
            println!("Added person '{}' (id {})", person.name, person.id);
        }
        Some(("list", sub)) => {
            let json_flag = sub.get_flag("json");
            let jsonl_flag = sub.get_flag("jsonl");
            let data = people_summary(conn)?;
            if !maybe_print_json(json_flag, jsonl_flag, &data)? {
                let rows: Vec<Vec<String>> = data
                    .iter()
                    .map(|p| {
                        vec![
                            p.id.to_string(),
                            p.name.clone(),
                            p.net_balance.round_dp(2).to_string(),
                        ]
                    })
                    .collect();
                println!("{}", pretty_table(&["ID", "Name", "Net Balance"], rows));
            }
        }
        _ => {}
    }
    Ok(())
}

pub fn create_person(conn: &Connection, name: &str) -> Result<Person> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LedgerError::validation("name", "must not be empty").into());
    }
    let existing: Option<i64> = conn
        .query_row("SELECT id FROM people WHERE name=?1", params![name], |r| {
            r.get(0)
        })
        .optional()?;
    if existing.is_some() {
        return Err(LedgerError::DuplicateName(name.to_string()).into());
    }

    conn.execute("INSERT INTO people(name) VALUES (?1)", params![name])?;
    let id = conn.last_insert_rowid();
    let created_at: String = conn.query_row(
        "SELECT created_at FROM people WHERE id=?1",
        params![id],
        |r| r.get(0),
    )?;
    Ok(Person {
        id,
        name: name.to_string(),
        created_at,
    })
}

/// Every person with their signed net balance, ordered by name ascending.
pub fn people_summary(conn: &Connection) -> Result<Vec<PersonSummary>> {
    let mut stmt = conn.prepare("SELECT id, name FROM people ORDER BY name")?;
    let rows = stmt.query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?)))?;
    let mut data = Vec::new();
    for row in rows {
        let (id, name) = row?;
        let net_balance = super::debts::net_balance_for_person(conn, id)?;
        data.push(PersonSummary {
            id,
            name,
            net_balance,
        });
    }
    Ok(data)
}
