// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use bulkpay::config::Config;
use bulkpay::models::Customer;
use bulkpay::notify::PaymentNotice;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::PathBuf;

fn lookup(pairs: &[(&str, &str)]) -> Config {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_lookup(|key| map.get(key).cloned())
}

#[test]
fn defaults_apply_when_nothing_is_set() {
    let cfg = lookup(&[]);
    assert_eq!(cfg.db_path, None);
    assert_eq!(cfg.log_filter, "info");
    assert_eq!(cfg.actor, None);
    assert_eq!(cfg.telegram_token, None);
    assert_eq!(cfg.telegram_api, "https://api.telegram.org");
    assert_eq!(cfg.busy_timeout_ms, 5_000);
}

#[test]
fn environment_overrides_defaults() {
    let cfg = lookup(&[
        ("BULKPAY_DB", "/tmp/pay.sqlite"),
        ("BULKPAY_LOG", "bulkpay=debug"),
        ("BULKPAY_ACTOR", " cashier "),
        ("BULKPAY_TELEGRAM_TOKEN", "123:abc"),
        ("BULKPAY_TELEGRAM_API", "http://localhost:8081/"),
        ("BULKPAY_BUSY_TIMEOUT_MS", "250"),
    ]);
    assert_eq!(cfg.db_path, Some(PathBuf::from("/tmp/pay.sqlite")));
    assert_eq!(cfg.log_filter, "bulkpay=debug");
    assert_eq!(cfg.actor.as_deref(), Some("cashier"));
    assert_eq!(cfg.telegram_token.as_deref(), Some("123:abc"));
    assert_eq!(cfg.telegram_api, "http://localhost:8081");
    assert_eq!(cfg.busy_timeout_ms, 250);
}

#[test]
fn blank_or_invalid_values_fall_back() {
    let cfg = lookup(&[("BULKPAY_ACTOR", "  "), ("BULKPAY_BUSY_TIMEOUT_MS", "soon")]);
    assert_eq!(cfg.actor, None);
    assert_eq!(cfg.busy_timeout_ms, 5_000);
}

#[test]
fn notice_message_reports_the_payment() {
    let customer = Customer {
        id: 1,
        name: "Aziz".into(),
        phone: String::new(),
        is_agency: false,
        telegram_id: Some(42),
    };
    let notice = PaymentNotice {
        customer: &customer,
        amount: Decimal::new(12050, 2),
        orders_paid: 2,
        fully_paid: 1,
        currency: "UZS",
    };
    let msg = notice.message();
    assert!(msg.contains("120.50 UZS"));
    assert!(msg.contains("Orders paid: 2"));
    assert!(msg.contains("Fully paid orders: 1"));
}
