// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::history::{all_bulk_payments, links_for_payment};
use crate::utils::{decimal_col, pretty_table};
use anyhow::Result;
use rusqlite::Connection;
use rust_decimal::Decimal;

/// Consistency problems found in stored payments, as `(issue, detail)` pairs.
pub fn audit(conn: &Connection) -> Result<Vec<(String, String)>> {
    let mut issues = Vec::new();

    for p in all_bulk_payments(conn)? {
        let links = links_for_payment(conn, p.id)?;
        let applied: Decimal = links.iter().map(|l| l.amount_applied).sum();
        // 1) Links that settle more than the payment brought in
        if applied > p.amount {
            issues.push((
                "links_exceed_payment".into(),
                format!("payment {}: applied {} > amount {}", p.id, applied, p.amount),
            ));
        }
        // 2) Summary counters that disagree with the links
        if p.orders_count != links.len() as i64 {
            issues.push((
                "orders_count_mismatch".into(),
                format!(
                    "payment {}: {} recorded, {} linked",
                    p.id,
                    p.orders_count,
                    links.len()
                ),
            ));
        }
        if p.fully_paid_orders > p.orders_count {
            issues.push((
                "fully_paid_exceeds_orders".into(),
                format!(
                    "payment {}: {} fully paid of {}",
                    p.id, p.fully_paid_orders, p.orders_count
                ),
            ));
        }
    }

    // 3) Link snapshots that do not add up
    let mut stmt = conn.prepare(
        "SELECT bulk_payment_id, order_id, amount_applied, previous_received, new_received
         FROM payment_order_links ORDER BY id",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let payment_id: i64 = r.get(0)?;
        let order_id: i64 = r.get(1)?;
        let applied = decimal_col(r, 2)?;
        let prev = decimal_col(r, 3)?;
        let new = decimal_col(r, 4)?;
        if prev.checked_add(applied) != Some(new) {
            issues.push((
                "link_arithmetic".into(),
                format!(
                    "payment {} order {}: {} + {} != {}",
                    payment_id, order_id, prev, applied, new
                ),
            ));
        }
        if applied <= Decimal::ZERO {
            issues.push((
                "non_positive_link".into(),
                format!("payment {} order {}: applied {}", payment_id, order_id, applied),
            ));
        }
    }

    // 4) Orders holding more than they owe without being accepted in full
    let mut stmt_orders = conn.prepare(
        "SELECT id, total_price, extra_fee, received FROM orders
         WHERE payment_accepted_fully=0 AND status!='cancelled' ORDER BY id",
    )?;
    let mut cur_orders = stmt_orders.query([])?;
    while let Some(r) = cur_orders.next()? {
        let id: i64 = r.get(0)?;
        let due = decimal_col(r, 1)?.saturating_add(decimal_col(r, 2)?);
        let received = decimal_col(r, 3)?;
        if received > due {
            issues.push((
                "order_overpaid".into(),
                format!("order {}: received {} > due {}", id, received, due),
            ));
        }
    }

    Ok(issues)
}

pub fn handle(conn: &Connection) -> Result<()> {
    let issues = audit(conn)?;
    if issues.is_empty() {
        println!("doctor: no issues found");
    } else {
        let rows = issues.into_iter().map(|(i, d)| vec![i, d]).collect();
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}
