// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use bulkpay::auth::{PaymentScope, Unrestricted};
use bulkpay::db;
use bulkpay::history::{HistoryFilter, Period, payment_details, payment_history};
use bulkpay::models::PaymentMethod;
use bulkpay::recorder::{PaymentRequest, record_bulk_payment};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

fn dec(s: &str) -> Decimal {
    Decimal::from_str_exact(s).unwrap()
}

fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

fn setup() -> Connection {
    let conn = db::open_in_memory().unwrap();
    conn.execute_batch(
        r#"
        INSERT INTO centers(id, name) VALUES (1, 'North');
        INSERT INTO branches(id, name, center_id) VALUES (1, 'Main', 1);
        INSERT INTO customers(id, name, is_agency) VALUES (1, 'Aziz', 0), (2, 'Alpha Travel', 1);
        INSERT INTO orders(id, customer_id, product, total_price, received, created_at, updated_at) VALUES
            (1, 1, 'Diploma', '100', '0', '2025-02-01 09:00:00', '2025-02-01 09:00:00'),
            (2, 1, 'Passport', '50', '0', '2025-02-02 09:00:00', '2025-02-02 09:00:00'),
            (3, 2, 'Contracts', '300', '0', '2025-02-01 09:00:00', '2025-02-01 09:00:00');
        "#,
    )
    .unwrap();
    conn
}

fn pay(conn: &mut Connection, customer_id: i64, amount: &str, method: &str, when: &str) -> i64 {
    let req = PaymentRequest::parse(customer_id, amount, method, "").unwrap();
    let id = record_bulk_payment(conn, &Unrestricted, &req)
        .unwrap()
        .receipt
        .payment_id;
    conn.execute(
        "UPDATE bulk_payments SET created_at=?1 WHERE id=?2",
        params![when, id],
    )
    .unwrap();
    id
}

/// Three payments in March 2025: two from Aziz, one from the agency.
fn seeded() -> (Connection, [i64; 3]) {
    let mut conn = setup();
    let p1 = pay(&mut conn, 1, "120", "cash", "2025-03-01 10:00:00");
    let p2 = pay(&mut conn, 2, "300", "bank_transfer", "2025-03-05 10:00:00");
    let p3 = pay(&mut conn, 1, "100", "card", "2025-03-10 10:00:00");
    (conn, [p1, p2, p3])
}

#[test]
fn history_is_newest_first_with_statistics() {
    let (conn, [p1, p2, p3]) = seeded();
    let h = payment_history(&conn, &PaymentScope::All, &HistoryFilter::default(), at(2025, 3, 20, 0))
        .unwrap();

    let ids: Vec<i64> = h.payments.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![p3, p2, p1]);
    // The last payment only needed 30 of its 100.
    assert_eq!(h.payments[0].amount, dec("100"));
    assert_eq!(h.payments[0].applied, dec("30"));
    assert_eq!(h.payments[0].payment_method, PaymentMethod::Card);

    assert_eq!(h.stats.total_count, 3);
    assert_eq!(h.stats.total_amount, dec("450"));
    assert_eq!(h.stats.total_orders, 4);
    assert_eq!(h.stats.fully_paid_orders, 3);
    assert_eq!(h.stats.unique_customers, 2);
    assert_eq!(h.stats.average_amount, dec("150"));
}

#[test]
fn history_filters_combine() {
    let (conn, [p1, p2, p3]) = seeded();
    let now = at(2025, 3, 20, 0);
    let ids = |f: HistoryFilter| -> Vec<i64> {
        payment_history(&conn, &PaymentScope::All, &f, now)
            .unwrap()
            .payments
            .iter()
            .map(|p| p.id)
            .collect()
    };

    assert_eq!(
        ids(HistoryFilter {
            customer_id: Some(1),
            ..HistoryFilter::default()
        }),
        vec![p3, p1]
    );
    assert_eq!(
        ids(HistoryFilter {
            method: Some(PaymentMethod::BankTransfer),
            ..HistoryFilter::default()
        }),
        vec![p2]
    );
    assert_eq!(
        ids(HistoryFilter {
            agency: Some(false),
            ..HistoryFilter::default()
        }),
        vec![p3, p1]
    );
    let march = |from: &str, to: &str| Period::parse("custom", Some(from), Some(to)).unwrap();
    assert_eq!(
        ids(HistoryFilter {
            period: march("2025-03-04", "2025-03-09"),
            ..HistoryFilter::default()
        }),
        vec![p2]
    );
    assert_eq!(
        ids(HistoryFilter {
            period: march("2025-03-05", "2025-03-10"),
            ..HistoryFilter::default()
        }),
        vec![p3, p2]
    );
    assert!(
        ids(HistoryFilter {
            period: Period::Today,
            ..HistoryFilter::default()
        })
        .is_empty()
    );
}

#[test]
fn payment_scope_limits_history() {
    let (conn, [_, p2, _]) = seeded();
    conn.execute("UPDATE bulk_payments SET branch_id=1 WHERE id=?1", params![p2])
        .unwrap();
    let now = at(2025, 3, 20, 0);
    let filter = HistoryFilter::default();

    let branch = payment_history(&conn, &PaymentScope::Branch(1), &filter, now).unwrap();
    assert_eq!(branch.payments.len(), 1);
    assert_eq!(branch.payments[0].id, p2);
    assert_eq!(branch.payments[0].branch.as_deref(), Some("Main"));

    let center = payment_history(&conn, &PaymentScope::Center(1), &filter, now).unwrap();
    assert_eq!(center.payments.len(), 1);

    let nothing = payment_history(&conn, &PaymentScope::Nothing, &filter, now).unwrap();
    assert!(nothing.payments.is_empty());
    assert_eq!(nothing.stats.total_count, 0);
}

#[test]
fn periods_parse_and_bound() {
    assert!(Period::parse("custom", None, Some("2025-01-01")).is_err());
    assert!(Period::parse("custom", Some("2025-02-01"), Some("2025-01-01")).is_err());
    assert!(Period::parse("decade", None, None).is_err());
    assert_eq!(Period::parse("all", None, None).unwrap(), Period::All);

    // 2025-03-15 is a Saturday.
    let now = at(2025, 3, 15, 18);
    assert_eq!(Period::All.bounds(now), None);
    assert_eq!(Period::Week.bounds(now), Some((at(2025, 3, 10, 0), now)));
    assert_eq!(Period::Month.bounds(now), Some((at(2025, 3, 1, 0), now)));
    assert_eq!(Period::Year.bounds(now), Some((at(2025, 1, 1, 0), now)));
    assert_eq!(Period::Today.bounds(now), Some((at(2025, 3, 15, 0), now)));
}

#[test]
fn details_show_current_state_of_touched_orders() {
    let (conn, [p1, _, _]) = seeded();
    let d = payment_details(&conn, &PaymentScope::All, p1).unwrap();

    assert_eq!(d.payment.applied, dec("120"));
    assert_eq!(d.orders.len(), 2);
    assert_eq!(d.orders[0].product, "Diploma");
    assert!(d.orders[0].fully_paid_by_payment);
    // Order 2 was only part-paid by this payment but a later one settled it.
    assert!(!d.orders[1].fully_paid_by_payment);
    assert_eq!(d.orders[1].paid_amount, dec("20"));
    assert!(d.orders[1].is_fully_paid);
    assert_eq!(d.fully_paid_count, 2);
    assert_eq!(d.remaining_debt, Decimal::ZERO);
}

#[test]
fn details_respect_scope_and_existence() {
    let (conn, [p1, _, _]) = seeded();

    let err = payment_details(&conn, &PaymentScope::All, 999).unwrap_err();
    assert_eq!(err.to_string(), "Payment 999 not found");

    let err = payment_details(&conn, &PaymentScope::Branch(1), p1).unwrap_err();
    assert_eq!(err.to_string(), "Permission denied");
}
