// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use bulkpay::auth::{AuthorizationPort, StaffAccess, Unrestricted};
use bulkpay::commands::{debtors, doctor, exporter, orders, payments};
use bulkpay::error::PaymentError;
use bulkpay::notify::LogNotifier;
use bulkpay::{cli, db};
use rusqlite::Connection;
use rust_decimal::Decimal;
use tempfile::tempdir;

fn dec(s: &str) -> Decimal {
    Decimal::from_str_exact(s).unwrap()
}

fn setup() -> Connection {
    let conn = db::open_in_memory().unwrap();
    conn.execute_batch(
        r#"
        INSERT INTO centers(id, name) VALUES (1, 'North');
        INSERT INTO branches(id, name, center_id) VALUES (1, 'Main', 1);
        INSERT INTO staff(username, role, branch_id) VALUES ('viewer', 'manager', 1);
        INSERT INTO customers(id, name, phone) VALUES (1, 'Aziz', '+998901112233');
        INSERT INTO orders(id, customer_id, branch_id, total_price, received, created_at, updated_at) VALUES
            (1, 1, 1, '100', '0', '2025-01-01 09:00:00', '2025-01-01 09:00:00'),
            (2, 1, 1, '50', '0', '2025-01-02 09:00:00', '2025-01-02 09:00:00');
        "#,
    )
    .unwrap();
    conn
}

fn received(conn: &Connection, order_id: i64) -> Decimal {
    let raw: String = conn
        .query_row("SELECT received FROM orders WHERE id=?1", [order_id], |r| r.get(0))
        .unwrap();
    dec(&raw)
}

fn run_pay(conn: &mut Connection, args: &[&str]) -> anyhow::Result<()> {
    let matches = cli::build_cli().get_matches_from(args.iter().copied());
    if let Some(("pay", pay_m)) = matches.subcommand() {
        payments::handle(conn, pay_m, &Unrestricted, &LogNotifier)
    } else {
        panic!("no pay subcommand");
    }
}

fn run_order(conn: &mut Connection, args: &[&str]) -> anyhow::Result<()> {
    run_order_as(conn, &Unrestricted, args)
}

fn run_order_as(
    conn: &mut Connection,
    auth: &dyn AuthorizationPort,
    args: &[&str],
) -> anyhow::Result<()> {
    let matches = cli::build_cli().get_matches_from(args.iter().copied());
    if let Some(("order", order_m)) = matches.subcommand() {
        orders::handle(conn, order_m, auth)
    } else {
        panic!("no order subcommand");
    }
}

fn is_denied(result: anyhow::Result<()>) -> bool {
    matches!(
        result.unwrap_err().downcast_ref::<PaymentError>(),
        Some(PaymentError::PermissionDenied)
    )
}

fn order_row(conn: &Connection, order_id: i64) -> (String, String, bool, String) {
    conn.query_row(
        "SELECT received, extra_fee, payment_accepted_fully, status FROM orders WHERE id=?1",
        [order_id],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
    )
    .unwrap()
}

#[test]
fn pay_process_applies_fifo() {
    let mut conn = setup();
    run_pay(
        &mut conn,
        &["bulkpay", "pay", "process", "--customer", "1", "--amount", "120", "--method", "card"],
    )
    .unwrap();

    assert_eq!(received(&conn, 1), dec("100"));
    assert_eq!(received(&conn, 2), dec("20"));
}

#[test]
fn pay_preview_does_not_touch_orders() {
    let mut conn = setup();
    run_pay(
        &mut conn,
        &["bulkpay", "pay", "preview", "--customer", "1", "--amount", "120", "--json"],
    )
    .unwrap();
    assert_eq!(received(&conn, 1), Decimal::ZERO);
}

#[test]
fn pay_process_rejects_unknown_method() {
    let mut conn = setup();
    let err = run_pay(
        &mut conn,
        &["bulkpay", "pay", "process", "--customer", "1", "--amount", "10", "--method", "iou"],
    )
    .unwrap_err();
    assert!(err.to_string().contains("Invalid payment method 'iou'"));
    assert_eq!(received(&conn, 1), Decimal::ZERO);
}

#[test]
fn pay_process_json_reports_failure_in_the_object_only() {
    let mut conn = setup();
    run_pay(
        &mut conn,
        &["bulkpay", "pay", "process", "--customer", "1", "--amount", "10", "--method", "iou", "--json"],
    )
    .unwrap();
    assert_eq!(received(&conn, 1), Decimal::ZERO);
    let payments: i64 = conn
        .query_row("SELECT COUNT(*) FROM bulk_payments", [], |r| r.get(0))
        .unwrap();
    assert_eq!(payments, 0);
}

#[test]
fn debtors_require_the_bulk_payment_capability() {
    let conn = setup();
    let viewer = StaffAccess::load(&conn, "viewer").unwrap();
    let matches = cli::build_cli().get_matches_from(["bulkpay", "debtors", "top", "--json"]);
    if let Some(("debtors", m)) = matches.subcommand() {
        assert!(debtors::handle(&conn, m, &viewer).is_err());
        debtors::handle(&conn, m, &Unrestricted).unwrap();
    } else {
        panic!("no debtors subcommand");
    }
}

#[test]
fn customer_type_values_are_checked() {
    assert_eq!(debtors::parse_customer_type(None).unwrap(), None);
    assert_eq!(
        debtors::parse_customer_type(Some(&"agency".to_string())).unwrap(),
        Some(true)
    );
    assert!(debtors::parse_customer_type(Some(&"company".to_string())).is_err());
}

#[test]
fn order_accept_refuses_underpaid_without_force() {
    let mut conn = setup();
    assert!(run_order(&mut conn, &["bulkpay", "order", "accept", "--id", "1"]).is_err());

    run_order(&mut conn, &["bulkpay", "order", "accept", "--id", "1", "--force"]).unwrap();
    assert_eq!(received(&conn, 1), dec("100"));
    let (flag, status): (bool, String) = conn
        .query_row(
            "SELECT payment_accepted_fully, status FROM orders WHERE id=1",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert!(flag);
    assert_eq!(status, "payment_confirmed");

    run_order(&mut conn, &["bulkpay", "order", "reset", "--id", "1"]).unwrap();
    assert_eq!(received(&conn, 1), Decimal::ZERO);
}

#[test]
fn order_fee_must_be_positive() {
    let mut conn = setup();
    assert!(
        run_order(
            &mut conn,
            &["bulkpay", "order", "fee", "--id", "2", "--amount", "0"]
        )
        .is_err()
    );
    run_order(
        &mut conn,
        &["bulkpay", "order", "fee", "--id", "2", "--amount", "7.5", "--description", "courier"],
    )
    .unwrap();
    let fee: String = conn
        .query_row("SELECT extra_fee FROM orders WHERE id=2", [], |r| r.get(0))
        .unwrap();
    assert_eq!(dec(&fee), dec("7.5"));
}

#[test]
fn export_payments_writes_csv_rows() {
    let mut conn = setup();
    run_pay(
        &mut conn,
        &["bulkpay", "pay", "process", "--customer", "1", "--amount", "120", "--note", "March"],
    )
    .unwrap();

    let dir = tempdir().unwrap();
    let out_path = dir.path().join("payments.csv");
    let out_str = out_path.to_string_lossy().to_string();
    let matches = cli::build_cli().get_matches_from([
        "bulkpay", "export", "payments", "--period", "all", "--out", &out_str,
    ]);
    if let Some(("export", export_m)) = matches.subcommand() {
        exporter::handle(&conn, export_m, &Unrestricted).unwrap();
    } else {
        panic!("no export subcommand");
    }

    let mut rdr = csv::Reader::from_path(&out_path).unwrap();
    let headers = rdr.headers().unwrap().clone();
    assert_eq!(&headers[0], "id");
    let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][2], "Aziz");
    assert_eq!(&rows[0][3], "individual");
    assert_eq!(&rows[0][6], "cash");
    assert_eq!(&rows[0][7], "2");
    assert_eq!(&rows[0][12], "March");
}

#[test]
fn export_payments_rejects_unknown_format() {
    let conn = setup();
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("payments.xml");
    let out_str = out_path.to_string_lossy().to_string();
    let matches = cli::build_cli().get_matches_from([
        "bulkpay", "export", "payments", "--format", "xml", "--out", &out_str,
    ]);
    if let Some(("export", export_m)) = matches.subcommand() {
        assert!(exporter::handle(&conn, export_m, &Unrestricted).is_err());
    } else {
        panic!("no export subcommand");
    }
    assert!(!out_path.exists());
}

#[test]
fn doctor_flags_inconsistent_links() {
    let mut conn = setup();
    run_pay(
        &mut conn,
        &["bulkpay", "pay", "process", "--customer", "1", "--amount", "120"],
    )
    .unwrap();
    assert!(doctor::audit(&conn).unwrap().is_empty());

    conn.execute(
        "UPDATE payment_order_links SET new_received='999' WHERE order_id=2",
        [],
    )
    .unwrap();
    conn.execute("UPDATE bulk_payments SET orders_count=5", []).unwrap();
    let issues: Vec<String> = doctor::audit(&conn)
        .unwrap()
        .into_iter()
        .map(|(issue, _)| issue)
        .collect();
    assert!(issues.contains(&"link_arithmetic".to_string()));
    assert!(issues.contains(&"orders_count_mismatch".to_string()));
}

fn add_order_staff(conn: &Connection) {
    conn.execute_batch(
        r#"
        INSERT INTO centers(id, name) VALUES (2, 'South');
        INSERT INTO branches(id, name, center_id) VALUES (2, 'Harbor', 2);
        INSERT INTO staff(username, role, branch_id, can_manage_bulk_payments) VALUES
            ('clerk', 'staff', 1, 1),
            ('cashier', 'manager', 1, 1),
            ('southpaw', 'manager', 2, 1);
        INSERT INTO staff(username, role, center_id, can_manage_bulk_payments) VALUES ('boss', 'owner', 1, 1);
        "#,
    )
    .unwrap();
}

#[test]
fn order_changes_are_refused_outside_the_actor_scope() {
    let mut conn = setup();
    add_order_staff(&conn);
    let before = order_row(&conn, 1);

    // Order 1 is unassigned, so plain staff cannot see it; the other manager sits in another center.
    for who in ["clerk", "southpaw", "viewer"] {
        let actor = StaffAccess::load(&conn, who).unwrap();
        for args in [
            &["bulkpay", "order", "pay", "--id", "1", "--amount", "10"][..],
            &["bulkpay", "order", "fee", "--id", "1", "--amount", "5"][..],
            &["bulkpay", "order", "accept", "--id", "1", "--force"][..],
            &["bulkpay", "order", "reset", "--id", "1"][..],
            &["bulkpay", "order", "status", "--id", "1", "--status", "completed"][..],
        ] {
            assert!(is_denied(run_order_as(&mut conn, &actor, args)), "{} {:?}", who, args);
        }
    }
    assert_eq!(order_row(&conn, 1), before);
}

#[test]
fn reset_and_forced_accept_need_an_owner() {
    let mut conn = setup();
    add_order_staff(&conn);
    let cashier = StaffAccess::load(&conn, "cashier").unwrap();
    let boss = StaffAccess::load(&conn, "boss").unwrap();

    run_order_as(&mut conn, &cashier, &["bulkpay", "order", "pay", "--id", "1", "--amount", "40"]).unwrap();
    assert!(is_denied(run_order_as(
        &mut conn,
        &cashier,
        &["bulkpay", "order", "accept", "--id", "1", "--force"]
    )));
    assert!(is_denied(run_order_as(
        &mut conn,
        &cashier,
        &["bulkpay", "order", "reset", "--id", "1"]
    )));
    assert_eq!(received(&conn, 1), dec("40"));

    run_order_as(&mut conn, &boss, &["bulkpay", "order", "accept", "--id", "1", "--force"]).unwrap();
    assert_eq!(received(&conn, 1), dec("100"));
    run_order_as(&mut conn, &boss, &["bulkpay", "order", "reset", "--id", "1"]).unwrap();
    assert_eq!(received(&conn, 1), Decimal::ZERO);
}

#[test]
fn order_pay_records_partial_then_full_payment() {
    let mut conn = setup();
    run_order(&mut conn, &["bulkpay", "order", "pay", "--id", "1", "--amount", "30.004"]).unwrap();
    let (received_raw, _, accepted, status) = order_row(&conn, 1);
    assert_eq!(dec(&received_raw), dec("30"));
    assert!(!accepted);
    assert_eq!(status, "payment_received");

    // More than the remaining 70 is refused.
    assert!(run_order(&mut conn, &["bulkpay", "order", "pay", "--id", "1", "--amount", "70.01"]).is_err());
    assert!(run_order(&mut conn, &["bulkpay", "order", "pay", "--id", "1", "--amount", "0"]).is_err());

    run_order(&mut conn, &["bulkpay", "order", "pay", "--id", "1", "--amount", "70"]).unwrap();
    let (received_raw, _, _, status) = order_row(&conn, 1);
    assert_eq!(dec(&received_raw), dec("100"));
    assert_eq!(status, "payment_confirmed");
}
