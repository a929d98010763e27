// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use bulkpay::allocator::allocate;
use bulkpay::error::PaymentError;
use bulkpay::models::Debt;
use chrono::NaiveDate;
use rust_decimal::Decimal;

fn dec(s: &str) -> Decimal {
    Decimal::from_str_exact(s).unwrap()
}

fn debts(remaining: &[&str]) -> Vec<Debt> {
    remaining
        .iter()
        .enumerate()
        .map(|(i, r)| Debt {
            order_id: i as i64 + 1,
            total_due: dec(r),
            received: Decimal::ZERO,
            remaining: dec(r),
            created_at: NaiveDate::from_ymd_opt(2025, 1, 1 + i as u32)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        })
        .collect()
}

#[test]
fn partial_payment_stops_at_second_order() {
    let a = allocate(dec("120"), &debts(&["100", "50", "200"])).unwrap();

    assert_eq!(a.entries.len(), 2);
    assert_eq!(a.entries[0].order_id, 1);
    assert_eq!(a.entries[0].amount_applied, dec("100"));
    assert_eq!(a.entries[0].new_remaining, Decimal::ZERO);
    assert!(a.entries[0].fully_paid);

    assert_eq!(a.entries[1].order_id, 2);
    assert_eq!(a.entries[1].amount_applied, dec("20"));
    assert_eq!(a.entries[1].previous_remaining, dec("50"));
    assert_eq!(a.entries[1].new_remaining, dec("30"));
    assert!(!a.entries[1].fully_paid);

    assert_eq!(a.unused_amount, Decimal::ZERO);
    assert_eq!(a.fully_paid_count(), 1);
}

#[test]
fn overpayment_settles_everything_and_reports_unused() {
    let a = allocate(dec("500"), &debts(&["100", "50", "200"])).unwrap();

    assert_eq!(a.entries.len(), 3);
    assert!(a.entries.iter().all(|e| e.fully_paid));
    assert_eq!(a.applied_total(), dec("350"));
    assert_eq!(a.unused_amount, dec("150"));
}

#[test]
fn non_positive_amounts_are_rejected() {
    for raw in ["-10", "0"] {
        match allocate(dec(raw), &debts(&["100"])) {
            Err(PaymentError::InvalidAmount(_)) => {}
            other => panic!("expected InvalidAmount for {}, got {:?}", raw, other),
        }
    }
}

#[test]
fn sub_cent_leftover_counts_as_fully_paid() {
    let a = allocate(dec("10.001"), &debts(&["10.005"])).unwrap();

    assert_eq!(a.entries[0].new_remaining, dec("0.004"));
    assert!(a.entries[0].fully_paid);
    assert_eq!(a.unused_amount, Decimal::ZERO);
}

#[test]
fn leftover_above_one_cent_is_not_fully_paid() {
    let a = allocate(dec("9.98"), &debts(&["10.00"])).unwrap();
    assert_eq!(a.entries[0].new_remaining, dec("0.02"));
    assert!(!a.entries[0].fully_paid);
}

#[test]
fn exact_payment_leaves_nothing_unused() {
    let a = allocate(dec("150"), &debts(&["100", "50", "200"])).unwrap();
    assert_eq!(a.entries.len(), 2);
    assert!(a.entries.iter().all(|e| e.fully_paid));
    assert_eq!(a.unused_amount, Decimal::ZERO);
}

#[test]
fn empty_debt_list_returns_whole_amount_unused() {
    let a = allocate(dec("75.50"), &[]).unwrap();
    assert!(a.entries.is_empty());
    assert_eq!(a.unused_amount, dec("75.50"));
}

#[test]
fn allocation_conserves_the_payment_and_follows_input_order() {
    let list = debts(&["12.34", "0.66", "99.99", "5"]);
    for raw in ["0.01", "13", "50.50", "117.99", "1000"] {
        let amount = dec(raw);
        let a = allocate(amount, &list).unwrap();

        assert_eq!(a.applied_total() + a.unused_amount, amount);
        for (entry, debt) in a.entries.iter().zip(&list) {
            assert_eq!(entry.order_id, debt.order_id);
            assert!(entry.amount_applied > Decimal::ZERO);
            assert!(entry.amount_applied <= debt.remaining);
            assert_eq!(entry.new_remaining, debt.remaining - entry.amount_applied);
        }
        // Every entry but the last is settled completely.
        if let Some((_, head)) = a.entries.split_last() {
            assert!(head.iter().all(|e| e.new_remaining == Decimal::ZERO));
        }
        if a.unused_amount > Decimal::ZERO {
            assert_eq!(a.entries.len(), list.len());
        }
    }
}

#[test]
fn allocation_is_deterministic() {
    let list = debts(&["30", "30", "30"]);
    let first = allocate(dec("45"), &list).unwrap();
    let second = allocate(dec("45"), &list).unwrap();
    assert_eq!(first, second);
}
