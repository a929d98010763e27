// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::auth::AuthorizationPort;
use crate::commands::debtors::parse_customer_type;
use crate::error::PaymentError;
use crate::history::{self, HistoryFilter, Period};
use crate::models::PaymentMethod;
use crate::utils::{fmt_money, get_currency, maybe_print_json, now, pretty_table};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches, auth: &dyn AuthorizationPort) -> Result<()> {
    match m.subcommand() {
        Some(("list", sub)) => list(conn, sub, auth)?,
        Some(("show", sub)) => show(conn, sub, auth)?,
        _ => {}
    }
    Ok(())
}

/// Builds a history filter from the shared `--period/--from/--to/...` flags.
pub fn filter_from_args(sub: &clap::ArgMatches) -> Result<HistoryFilter> {
    let period = Period::parse(
        sub.get_one::<String>("period").unwrap(),
        sub.get_one::<String>("from").map(|s| s.as_str()),
        sub.get_one::<String>("to").map(|s| s.as_str()),
    )?;
    let method = match sub.get_one::<String>("method") {
        Some(raw) => Some(
            raw.trim()
                .parse::<PaymentMethod>()
                .map_err(PaymentError::InvalidPaymentMethod)?,
        ),
        None => None,
    };
    Ok(HistoryFilter {
        customer_id: sub.get_one::<i64>("customer").copied(),
        method,
        agency: parse_customer_type(sub.get_one::<String>("type"))?,
        period,
    })
}

fn list(conn: &Connection, sub: &clap::ArgMatches, auth: &dyn AuthorizationPort) -> Result<()> {
    let filter = filter_from_args(sub)?;
    let h = history::payment_history(conn, &auth.payment_scope(), &filter, now())?;
    if sub.get_flag("jsonl") {
        maybe_print_json(false, true, &h.payments)?;
        return Ok(());
    }
    if maybe_print_json(sub.get_flag("json"), false, &h)? {
        return Ok(());
    }

    let ccy = get_currency(conn)?;
    let rows = h
        .payments
        .iter()
        .map(|p| {
            vec![
                p.id.to_string(),
                p.created_at.format("%Y-%m-%d %H:%M").to_string(),
                p.customer_name.clone(),
                format!("{:.2}", p.amount),
                p.payment_method.label().to_string(),
                format!("{}/{}", p.fully_paid_orders, p.orders_count),
                format!("{:.2}", p.remaining_debt_after),
                p.processed_by.clone().unwrap_or_else(|| "system".into()),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["ID", "Date", "Customer", "Amount", "Method", "Paid/Orders", "Debt after", "By"],
            rows
        )
    );
    let s = &h.stats;
    println!(
        "{} payments from {} customers, total {}, average {}, {} orders ({} fully paid)",
        s.total_count,
        s.unique_customers,
        fmt_money(&s.total_amount, &ccy),
        fmt_money(&s.average_amount, &ccy),
        s.total_orders,
        s.fully_paid_orders
    );
    Ok(())
}

fn show(conn: &Connection, sub: &clap::ArgMatches, auth: &dyn AuthorizationPort) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let d = history::payment_details(conn, &auth.payment_scope(), id)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &d)? {
        return Ok(());
    }

    let ccy = get_currency(conn)?;
    let p = &d.payment;
    println!(
        "Payment #{} on {} from {}: {} by {}",
        p.id,
        p.created_at.format("%Y-%m-%d %H:%M"),
        p.customer_name,
        fmt_money(&p.amount, &ccy),
        p.payment_method.label()
    );
    if !p.receipt_note.is_empty() {
        println!("Note: {}", p.receipt_note);
    }
    let rows = d
        .orders
        .iter()
        .map(|l| {
            vec![
                l.order_id.to_string(),
                l.product.clone(),
                format!("{:.2}", l.paid_amount),
                format!("{:.2}", l.previous_received),
                format!("{:.2}", l.new_received),
                format!("{:.2}", l.current_remaining),
                if l.is_fully_paid { "yes".into() } else { String::new() },
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["Order", "Product", "Paid", "Before", "After", "Remaining now", "Fully paid"],
            rows
        )
    );
    println!(
        "{} of {} orders fully paid, {} still open",
        d.fully_paid_count,
        d.orders.len(),
        fmt_money(&d.remaining_debt, &ccy)
    );
    Ok(())
}
