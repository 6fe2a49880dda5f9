// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Pocketledger", "pocketledger"));

pub fn db_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("pocketledger.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    let path = db_path()?;
    let mut conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&mut conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS people(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS debts(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        person_id INTEGER NOT NULL,
        kind TEXT NOT NULL CHECK(kind IN ('owed_by_me','owed_to_me')),
        amount TEXT NOT NULL,
        currency TEXT NOT NULL DEFAULT 'EUR',
        description TEXT NOT NULL DEFAULT 'Debt',
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(person_id) REFERENCES people(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_debts_person ON debts(person_id);

    CREATE TABLE IF NOT EXISTS sub_debts(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        debt_id INTEGER NOT NULL,
        amount TEXT NOT NULL,
        note TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(debt_id) REFERENCES debts(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_sub_debts_debt ON sub_debts(debt_id);

    -- Synced accounts are keyed by the identity derived from the aggregator
    -- payload, not by a local rowid, so repeated syncs collapse to one row.
    CREATE TABLE IF NOT EXISTS accounts(
        uid TEXT PRIMARY KEY,
        name TEXT,
        iban TEXT,
        balance TEXT NOT NULL DEFAULT '0',
        currency TEXT,
        bank_name TEXT,
        last_synced TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS bank_transactions(
        uid TEXT PRIMARY KEY,
        account_uid TEXT NOT NULL,
        booking_date TEXT NOT NULL,
        amount TEXT NOT NULL,
        currency TEXT,
        creditor_name TEXT,
        debtor_name TEXT,
        remittance TEXT,
        raw_json TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    CREATE INDEX IF NOT EXISTS idx_bank_transactions_account
        ON bank_transactions(account_uid, booking_date);
    "#,
    )?;
    Ok(())
}
