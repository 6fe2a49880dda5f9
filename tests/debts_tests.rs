// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use pocketledger::commands::{debts, people};
use pocketledger::error::LedgerError;
use pocketledger::models::DebtKind;
use rusqlite::Connection;
use rust_decimal::Decimal;

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    pocketledger::db::init_schema(&mut conn).unwrap();
    conn
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

#[test]
fn duplicate_person_name_rejected() {
    let conn = setup();
    people::create_person(&conn, "Alice").unwrap();
    let err = people::create_person(&conn, "Alice").unwrap_err();
    match err.downcast_ref::<LedgerError>() {
        Some(LedgerError::DuplicateName(name)) => assert_eq!(name, "Alice"),
        other => panic!("expected DuplicateName, got {:?}", other),
    }
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM people WHERE name='Alice'", [], |r| {
            r.get(0)
        })
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn empty_person_name_rejected() {
    let conn = setup();
    let err = people::create_person(&conn, "   ").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LedgerError>(),
        Some(LedgerError::Validation { .. })
    ));
}

#[test]
fn debt_requires_existing_person() {
    let conn = setup();
    let err =
        debts::create_debt(&conn, 99, DebtKind::OwedToMe, dec("10"), None, None).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LedgerError>(),
        Some(LedgerError::NotFound { .. })
    ));
}

#[test]
fn debt_rejects_non_positive_amount() {
    let conn = setup();
    let p = people::create_person(&conn, "Bob").unwrap();
    let err =
        debts::create_debt(&conn, p.id, DebtKind::OwedToMe, dec("0"), None, None).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LedgerError>(),
        Some(LedgerError::Validation { .. })
    ));
}

#[test]
fn debt_defaults_applied() {
    let conn = setup();
    let p = people::create_person(&conn, "Bob").unwrap();
    let d = debts::create_debt(&conn, p.id, DebtKind::OwedByMe, dec("25"), None, None).unwrap();
    assert_eq!(d.description, "Debt");
    assert_eq!(d.currency, "EUR");
}

#[test]
fn exact_repayment_settles_and_removes_debt() {
    let mut conn = setup();
    let p = people::create_person(&conn, "Alice").unwrap();
    let d =
        debts::create_debt(&conn, p.id, DebtKind::OwedToMe, dec("100"), Some("Lunch"), None)
            .unwrap();

    let r = debts::record_repayment(&mut conn, d.id, dec("100"), None).unwrap();
    assert!(r.settled);

    assert!(debts::debts_list(&conn, None).unwrap().is_empty());
    let subs: i64 = conn
        .query_row("SELECT COUNT(*) FROM sub_debts", [], |r| r.get(0))
        .unwrap();
    assert_eq!(subs, 0, "cascade should remove repayments with the debt");
}

#[test]
fn split_repayments_settle_like_one() {
    let mut conn = setup();
    let p = people::create_person(&conn, "Alice").unwrap();
    let d = debts::create_debt(&conn, p.id, DebtKind::OwedToMe, dec("100"), None, None).unwrap();

    let first = debts::record_repayment(&mut conn, d.id, dec("60"), Some("part 1")).unwrap();
    assert!(!first.settled);
    let listed = debts::debts_list(&conn, None).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].paid_amount, dec("60"));
    assert_eq!(listed[0].remaining_amount, dec("40"));

    let second = debts::record_repayment(&mut conn, d.id, dec("40"), Some("part 2")).unwrap();
    assert!(second.settled);
    assert!(debts::debts_list(&conn, None).unwrap().is_empty());
}

#[test]
fn overpayment_settles_and_discards_excess() {
    let mut conn = setup();
    let p = people::create_person(&conn, "Alice").unwrap();
    let d = debts::create_debt(&conn, p.id, DebtKind::OwedToMe, dec("50"), None, None).unwrap();

    let r = debts::record_repayment(&mut conn, d.id, dec("80"), None).unwrap();
    assert!(r.settled);
    assert!(debts::debts_list(&conn, None).unwrap().is_empty());
    let t = debts::totals(&conn).unwrap();
    assert_eq!(t.owed_to_me, Decimal::ZERO);
    assert_eq!(t.i_owe, Decimal::ZERO);
}

#[test]
fn repayment_on_missing_debt_fails() {
    let mut conn = setup();
    let err = debts::record_repayment(&mut conn, 42, dec("5"), None).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LedgerError>(),
        Some(LedgerError::NotFound { .. })
    ));
}

#[test]
fn net_balance_sign_convention() {
    let mut conn = setup();
    let p = people::create_person(&conn, "Carol").unwrap();
    let owed_to_me =
        debts::create_debt(&conn, p.id, DebtKind::OwedToMe, dec("70"), None, None).unwrap();
    debts::create_debt(&conn, p.id, DebtKind::OwedByMe, dec("30"), None, None).unwrap();
    // Bring the owed-to-me debt down to a remaining 50
    debts::record_repayment(&mut conn, owed_to_me.id, dec("20"), None).unwrap();

    let summary = people::people_summary(&conn).unwrap();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].net_balance, dec("20"));

    // The whole person lands in owed_to_me, nothing in i_owe
    let t = debts::totals(&conn).unwrap();
    assert_eq!(t.owed_to_me, dec("20"));
    assert_eq!(t.i_owe, Decimal::ZERO);
}

#[test]
fn totals_split_across_people() {
    let conn = setup();
    let a = people::create_person(&conn, "Alice").unwrap();
    let b = people::create_person(&conn, "Bob").unwrap();
    debts::create_debt(&conn, a.id, DebtKind::OwedToMe, dec("80"), None, None).unwrap();
    debts::create_debt(&conn, b.id, DebtKind::OwedByMe, dec("45"), None, None).unwrap();

    let t = debts::totals(&conn).unwrap();
    assert_eq!(t.owed_to_me, dec("80"));
    assert_eq!(t.i_owe, dec("45"));
}

#[test]
fn people_summary_ordered_by_name() {
    let conn = setup();
    people::create_person(&conn, "Zoe").unwrap();
    people::create_person(&conn, "Alice").unwrap();
    people::create_person(&conn, "Mallory").unwrap();
    let names: Vec<String> = people::people_summary(&conn)
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["Alice", "Mallory", "Zoe"]);
}

#[test]
fn debts_list_filters_by_kind_and_nests_repayments() {
    let mut conn = setup();
    let p = people::create_person(&conn, "Dave").unwrap();
    let owed =
        debts::create_debt(&conn, p.id, DebtKind::OwedToMe, dec("100"), None, None).unwrap();
    debts::create_debt(&conn, p.id, DebtKind::OwedByMe, dec("10"), None, None).unwrap();
    debts::record_repayment(&mut conn, owed.id, dec("25"), Some("first")).unwrap();
    debts::record_repayment(&mut conn, owed.id, dec("5"), Some("second")).unwrap();

    let filtered = debts::debts_list(&conn, Some(DebtKind::OwedToMe)).unwrap();
    assert_eq!(filtered.len(), 1);
    let detail = &filtered[0];
    assert_eq!(detail.person_name, "Dave");
    assert_eq!(detail.paid_amount, dec("30"));
    assert_eq!(detail.remaining_amount, dec("70"));
    assert_eq!(detail.sub_debts.len(), 2);
    // Newest repayment first
    assert_eq!(detail.sub_debts[0].note.as_deref(), Some("second"));
    assert_eq!(detail.sub_debts[1].note.as_deref(), Some("first"));

    let all = debts::debts_list(&conn, None).unwrap();
    assert_eq!(all.len(), 2);
}

#[test]
fn repayment_rejects_non_positive_amount() {
    let mut conn = setup();
    let p = people::create_person(&conn, "Eve").unwrap();
    let d = debts::create_debt(&conn, p.id, DebtKind::OwedToMe, dec("10"), None, None).unwrap();
    let err = debts::record_repayment(&mut conn, d.id, dec("-1"), None).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LedgerError>(),
        Some(LedgerError::Validation { .. })
    ));
    // Nothing was written
    let subs: i64 = conn
        .query_row("SELECT COUNT(*) FROM sub_debts", [], |r| r.get(0))
        .unwrap();
    assert_eq!(subs, 0);
}
