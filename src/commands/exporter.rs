// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::auth::AuthorizationPort;
use crate::commands::history::filter_from_args;
use crate::history::payment_history;
use crate::utils::now;
use anyhow::{Result, anyhow};
use rusqlite::Connection;
use serde_json::json;

pub fn handle(conn: &Connection, m: &clap::ArgMatches, auth: &dyn AuthorizationPort) -> Result<()> {
    match m.subcommand() {
        Some(("payments", sub)) => export_payments(conn, sub, auth),
        _ => Ok(()),
    }
}

fn export_payments(conn: &Connection, sub: &clap::ArgMatches, auth: &dyn AuthorizationPort) -> Result<()> {
    let fmt = sub.get_one::<String>("format").unwrap().to_lowercase();
    let out = sub.get_one::<String>("out").unwrap();
    let filter = filter_from_args(sub)?;
    let h = payment_history(conn, &auth.payment_scope(), &filter, now())?;

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record([
                "id",
                "date",
                "customer",
                "customer_type",
                "amount",
                "applied",
                "method",
                "orders",
                "fully_paid",
                "remaining_debt_after",
                "processed_by",
                "branch",
                "note",
            ])?;
            for p in &h.payments {
                wtr.write_record([
                    p.id.to_string(),
                    p.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                    p.customer_name.clone(),
                    if p.is_agency { "agency" } else { "individual" }.to_string(),
                    p.amount.to_string(),
                    p.applied.to_string(),
                    p.payment_method.as_str().to_string(),
                    p.orders_count.to_string(),
                    p.fully_paid_orders.to_string(),
                    p.remaining_debt_after.to_string(),
                    p.processed_by.clone().unwrap_or_default(),
                    p.branch.clone().unwrap_or_default(),
                    p.receipt_note.clone(),
                ])?;
            }
            wtr.flush()?;
        }
        "json" => {
            let items: Vec<_> = h
                .payments
                .iter()
                .map(|p| {
                    json!({
                        "id": p.id,
                        "date": p.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                        "customer": p.customer_name,
                        "customer_type": if p.is_agency { "agency" } else { "individual" },
                        "amount": p.amount.to_string(),
                        "applied": p.applied.to_string(),
                        "method": p.payment_method.as_str(),
                        "orders": p.orders_count,
                        "fully_paid": p.fully_paid_orders,
                        "remaining_debt_after": p.remaining_debt_after.to_string(),
                        "processed_by": p.processed_by,
                        "branch": p.branch,
                        "note": p.receipt_note,
                    })
                })
                .collect();
            std::fs::write(out, serde_json::to_string_pretty(&items)?)?;
        }
        _ => return Err(anyhow!("Unknown format: {} (use csv|json)", fmt)),
    }
    println!("Exported {} payments to {}", h.payments.len(), out);
    Ok(())
}
