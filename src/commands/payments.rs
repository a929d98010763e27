// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::auth::AuthorizationPort;
use crate::notify::Notifier;
use crate::preview::preview_distribution;
use crate::recorder::{self, PaymentRequest, parse_amount, process_bulk_payment};
use crate::utils::{fmt_money, get_currency, maybe_print_json, pretty_table};
use anyhow::Result;
use rusqlite::Connection;
use tracing::warn;

pub fn handle(
    conn: &mut Connection,
    m: &clap::ArgMatches,
    auth: &dyn AuthorizationPort,
    notifier: &dyn Notifier,
) -> Result<()> {
    match m.subcommand() {
        Some(("preview", sub)) => preview(conn, sub, auth)?,
        Some(("process", sub)) => process(conn, sub, auth, notifier)?,
        _ => {}
    }
    Ok(())
}

fn preview(conn: &Connection, sub: &clap::ArgMatches, auth: &dyn AuthorizationPort) -> Result<()> {
    let customer_id = *sub.get_one::<i64>("customer").unwrap();
    let amount = parse_amount(sub.get_one::<String>("amount").unwrap())?;
    let p = preview_distribution(conn, auth, customer_id, amount)
        .inspect_err(|e| warn!(customer_id, code = e.code(), "payment preview failed: {}", e))?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &p)? {
        return Ok(());
    }

    let ccy = get_currency(conn)?;
    println!("Preview for {} (#{})", p.customer_name, p.customer_id);
    let rows = p
        .allocation
        .entries
        .iter()
        .map(|e| {
            vec![
                e.order_id.to_string(),
                format!("{:.2}", e.previous_remaining),
                format!("{:.2}", e.amount_applied),
                format!("{:.2}", e.new_remaining),
                if e.fully_paid { "yes".into() } else { String::new() },
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Order", "Remaining", "Applied", "After", "Fully paid"], rows)
    );
    let s = &p.summary;
    println!(
        "Pays {} orders ({} fully). Debt {} -> {}",
        s.orders_affected,
        s.fully_paid_orders,
        fmt_money(&s.total_debt, &ccy),
        fmt_money(&s.remaining_debt_after, &ccy)
    );
    if !s.unused_amount.is_zero() {
        println!("Unused: {}", fmt_money(&s.unused_amount, &ccy));
    }
    Ok(())
}

fn process(
    conn: &mut Connection,
    sub: &clap::ArgMatches,
    auth: &dyn AuthorizationPort,
    notifier: &dyn Notifier,
) -> Result<()> {
    let customer_id = *sub.get_one::<i64>("customer").unwrap();
    let result = PaymentRequest::parse(
        customer_id,
        sub.get_one::<String>("amount").unwrap(),
        sub.get_one::<String>("method").unwrap(),
        sub.get_one::<String>("note").unwrap(),
    )
    .and_then(|req| process_bulk_payment(conn, auth, notifier, &req));

    // The JSON object carries failures too.
    if sub.get_flag("json") {
        println!(
            "{}",
            serde_json::to_string_pretty(&recorder::response_json(&result))?
        );
        return Ok(());
    }
    let receipt = result?;

    let ccy = get_currency(conn)?;
    let s = &receipt.summary;
    println!(
        "Payment #{} of {} recorded for {}",
        receipt.payment_id,
        fmt_money(&s.payment_amount, &ccy),
        s.customer_name
    );
    println!(
        "{} orders paid, {} fully. Remaining debt {}",
        s.orders_paid,
        s.fully_paid_orders,
        fmt_money(&s.remaining_debt, &ccy)
    );
    if !receipt.unused_amount.is_zero() {
        println!(
            "Unused amount: {}",
            fmt_money(&receipt.unused_amount, &ccy)
        );
    }
    Ok(())
}
