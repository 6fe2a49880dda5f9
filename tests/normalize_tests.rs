// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use pocketledger::normalize::{
    SkipReason, account_identity, counterparty_from_remittance, extract_balance, infer_bank_name,
    normalize_transaction, synthetic_transaction_uid,
};
use rust_decimal::Decimal;
use serde_json::json;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

#[test]
fn identity_priority_uid_then_account_id_then_iban() {
    let v = json!({"uid": "u", "account_id": "a", "iban": "i"});
    assert_eq!(account_identity(&v).unwrap(), "u");
    let v = json!({"account_id": "a", "iban": "i"});
    assert_eq!(account_identity(&v).unwrap(), "a");
    let v = json!({"iban": "i"});
    assert_eq!(account_identity(&v).unwrap(), "i");
}

#[test]
fn identity_rejects_stringified_objects() {
    let v = json!({"uid": "[object Object]"});
    assert_eq!(
        account_identity(&v).unwrap_err(),
        SkipReason::StringifiedIdentity
    );
    // A later candidate can still rescue the record
    let v = json!({"uid": "[object Object]", "iban": "DE89370400440532013000"});
    assert_eq!(account_identity(&v).unwrap(), "DE89370400440532013000");
}

#[test]
fn identity_missing_when_all_blank() {
    assert_eq!(
        account_identity(&json!({"uid": "  ", "name": "x"})).unwrap_err(),
        SkipReason::MissingIdentity
    );
    assert_eq!(
        account_identity(&json!("not an object")).unwrap_err(),
        SkipReason::NotAnObject
    );
}

#[test]
fn balance_object_and_array_shapes() {
    assert_eq!(
        extract_balance(&json!({"balances": {"current": "99.90"}})),
        Some(dec("99.90"))
    );
    assert_eq!(
        extract_balance(&json!({"balances": {"current": {"amount": 12}}})),
        Some(dec("12"))
    );
    assert_eq!(
        extract_balance(&json!({"balances": [{"amount": {"amount": "1.50"}}]})),
        Some(dec("1.50"))
    );
    assert_eq!(
        extract_balance(&json!({"balances": [{"balanceAmount": {"amount": 3}}]})),
        Some(dec("3"))
    );
    assert_eq!(
        extract_balance(&json!({"balances": [{"balance_amount": {"amount": "4"}}]})),
        Some(dec("4"))
    );
    assert_eq!(extract_balance(&json!({"balances": []})), None);
    assert_eq!(extract_balance(&json!({"name": "no balances"})), None);
}

#[test]
fn crdt_indicator_forces_positive() {
    let tx = normalize_transaction(
        &json!({
            "transaction_id": "t",
            "booking_date": "2025-02-01",
            "transaction_amount": {"amount": "-30", "currency": "EUR"},
            "credit_debit_indicator": "CRDT"
        }),
        "acct",
    )
    .unwrap();
    assert_eq!(tx.amount, dec("30"));
    assert_eq!(tx.currency.as_deref(), Some("EUR"));
}

#[test]
fn raw_sign_kept_without_indicator() {
    let tx = normalize_transaction(
        &json!({"transaction_id": "t", "booking_date": "2025-02-01", "amount": "-7.25"}),
        "acct",
    )
    .unwrap();
    assert_eq!(tx.amount, dec("-7.25"));
}

#[test]
fn nested_party_names_are_read() {
    let tx = normalize_transaction(
        &json!({
            "transaction_id": "t",
            "booking_date": "2025-02-01",
            "amount": "1",
            "creditor": {"name": "Acme GmbH"},
            "debtor": {"name": "Jan"}
        }),
        "acct",
    )
    .unwrap();
    assert_eq!(tx.creditor_name.as_deref(), Some("Acme GmbH"));
    assert_eq!(tx.debtor_name.as_deref(), Some("Jan"));
}

#[test]
fn timestamp_dates_use_the_date_prefix() {
    let tx = normalize_transaction(
        &json!({"transaction_id": "t", "booking_date": "2025-02-01T09:30:00Z", "amount": "1"}),
        "acct",
    )
    .unwrap();
    assert_eq!(
        tx.booking_date,
        NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()
    );
}

#[test]
fn missing_amount_and_date_are_skip_reasons() {
    assert_eq!(
        normalize_transaction(&json!({"booking_date": "2025-02-01"}), "a").unwrap_err(),
        SkipReason::NoAmount
    );
    assert_eq!(
        normalize_transaction(&json!({"amount": "1"}), "a").unwrap_err(),
        SkipReason::NoDate
    );
}

#[test]
fn entry_reference_used_when_no_transaction_id() {
    let tx = normalize_transaction(
        &json!({"entry_reference": "ref-9", "booking_date": "2025-02-01", "amount": "1"}),
        "acct",
    )
    .unwrap();
    assert_eq!(tx.uid, "ref-9");
}

#[test]
fn synthetic_uid_is_deterministic_and_input_sensitive() {
    let date = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
    let a = synthetic_transaction_uid("acct", date, dec("-12.30"));
    let b = synthetic_transaction_uid("acct", date, dec("-12.30"));
    assert_eq!(a, b);
    assert_ne!(a, synthetic_transaction_uid("acct", date, dec("12.30")));
    assert_ne!(a, synthetic_transaction_uid("other", date, dec("-12.30")));
}

#[test]
fn remittance_recovers_creditor_when_no_names_present() {
    let tx = normalize_transaction(
        &json!({"transaction_id": "t", "booking_date": "2025-02-01", "amount": "1",
                "remittance_information": "Maria Lopez Sent from Revolut"}),
        "acct",
    )
    .unwrap();
    assert_eq!(tx.creditor_name.as_deref(), Some("Maria Lopez"));

    // An explicit name suppresses the heuristic
    let tx = normalize_transaction(
        &json!({"transaction_id": "t", "booking_date": "2025-02-01", "amount": "1",
                "debtor_name": "Jan",
                "remittance_information": "Maria Lopez Sent from Revolut"}),
        "acct",
    )
    .unwrap();
    assert_eq!(tx.creditor_name, None);
}

#[test]
fn remittance_heuristic_extracts_counterparty() {
    assert_eq!(
        counterparty_from_remittance("Maria Lopez Sent from Revolut").as_deref(),
        Some("Maria Lopez")
    );
    assert_eq!(
        counterparty_from_remittance("maria SENT FROM n26").as_deref(),
        Some("maria")
    );
    assert_eq!(counterparty_from_remittance("utility bill march"), None);
}

#[test]
fn bank_inference_from_iban_fragment() {
    assert_eq!(infer_bank_name("NL91INGB0001234567"), Some("ING"));
    assert_eq!(infer_bank_name("nl13bunq2025123456"), Some("bunq"));
    assert_eq!(infer_bank_name("FR7630006000011234567890189"), None);
}
