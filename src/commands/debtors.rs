// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::auth::AuthorizationPort;
use crate::error::PaymentError;
use crate::ledger::{self, DebtorFilter, DebtorRow, DebtorSort};
use crate::utils::{
    fmt_money, get_currency, id_for_branch, maybe_print_json, now, parse_decimal, pretty_table,
};
use anyhow::{Result, anyhow};
use rusqlite::Connection;
use rust_decimal::Decimal;

pub fn handle(conn: &Connection, m: &clap::ArgMatches, auth: &dyn AuthorizationPort) -> Result<()> {
    if !auth.can_manage_bulk_payments() {
        return Err(PaymentError::PermissionDenied.into());
    }
    match m.subcommand() {
        Some(("top", sub)) => top(conn, sub, auth)?,
        Some(("search", sub)) => {
            let q = sub.get_one::<String>("query").unwrap();
            let data = ledger::search_debtors(conn, &auth.order_scope(), q)?;
            print_debtors(conn, sub, &data)?;
        }
        Some(("show", sub)) => show(conn, sub, auth)?,
        _ => {}
    }
    Ok(())
}

pub fn parse_customer_type(raw: Option<&String>) -> Result<Option<bool>> {
    match raw.map(|s| s.trim()) {
        None | Some("") => Ok(None),
        Some("agency") => Ok(Some(true)),
        Some("individual") => Ok(Some(false)),
        Some(other) => Err(anyhow!(
            "Unknown customer type '{}' (use agency|individual)",
            other
        )),
    }
}

pub fn filter_from_args(conn: &Connection, sub: &clap::ArgMatches) -> Result<DebtorFilter> {
    let branch_id = match sub.get_one::<String>("branch") {
        Some(b) => Some(id_for_branch(conn, b.trim())?),
        None => None,
    };
    let min_debt = match sub.get_one::<String>("min_debt") {
        Some(raw) => Some(parse_decimal(raw)?),
        None => None,
    };
    let max_debt = match sub.get_one::<String>("max_debt") {
        Some(raw) => Some(parse_decimal(raw)?),
        None => None,
    };
    Ok(DebtorFilter {
        agency: parse_customer_type(sub.get_one::<String>("type"))?,
        branch_id,
        min_debt,
        max_debt,
        sort: DebtorSort::parse(sub.get_one::<String>("sort").unwrap()),
        limit: sub.get_one::<usize>("limit").copied(),
    })
}

fn top(conn: &Connection, sub: &clap::ArgMatches, auth: &dyn AuthorizationPort) -> Result<()> {
    let filter = filter_from_args(conn, sub)?;
    let data = ledger::top_debtors(conn, &auth.order_scope(), &filter)?;
    print_debtors(conn, sub, &data)?;
    if !sub.get_flag("json") && !sub.get_flag("jsonl") && !data.is_empty() {
        let total: Decimal = data.iter().map(|d| d.total_debt).sum();
        let orders: usize = data.iter().map(|d| d.order_count).sum();
        println!(
            "{} debtors, {} orders, total debt {}, average {}",
            data.len(),
            orders,
            fmt_money(&total, &get_currency(conn)?),
            fmt_money(&(total / Decimal::from(data.len())), &get_currency(conn)?)
        );
    }
    Ok(())
}

fn print_debtors(conn: &Connection, sub: &clap::ArgMatches, data: &[DebtorRow]) -> Result<()> {
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        return Ok(());
    }
    let today = now();
    let debt_header = format!("Debt ({})", get_currency(conn)?);
    let rows = data
        .iter()
        .map(|d| {
            vec![
                d.id.to_string(),
                d.name.clone(),
                d.phone.clone(),
                d.customer_type.clone(),
                format!("{:.2}", d.total_debt),
                d.order_count.to_string(),
                (today - d.oldest_order_at).num_days().to_string(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &[
                "ID",
                "Customer",
                "Phone",
                "Type",
                debt_header.as_str(),
                "Orders",
                "Oldest (days)"
            ],
            rows
        )
    );
    Ok(())
}

fn show(conn: &Connection, sub: &clap::ArgMatches, auth: &dyn AuthorizationPort) -> Result<()> {
    let customer_id = *sub.get_one::<i64>("customer").unwrap();
    let customer = ledger::lookup_customer(conn, customer_id)?
        .ok_or(PaymentError::CustomerNotFound(customer_id))?;
    let details = ledger::debt_details(conn, &auth.order_scope(), customer, now())?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &details)? {
        return Ok(());
    }
    let ccy = get_currency(conn)?;
    println!(
        "{} ({}), phone {}",
        details.customer.name,
        details.customer.customer_type(),
        details.customer.phone
    );
    let rows = details
        .orders
        .iter()
        .map(|l| {
            vec![
                l.order_id.to_string(),
                l.created_at.format("%Y-%m-%d").to_string(),
                l.product.clone(),
                format!("{:.2}", l.total_price.saturating_add(l.extra_fee)),
                format!("{:.2}", l.received),
                format!("{:.2}", l.remaining),
                l.days_old.to_string(),
                l.status.to_string(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["Order", "Created", "Product", "Due", "Received", "Remaining", "Days", "Status"],
            rows
        )
    );
    println!(
        "Total debt {} across {} orders{}",
        fmt_money(&details.total_debt, &ccy),
        details.order_count,
        details
            .oldest_debt_days
            .map(|d| format!(", oldest {} days", d))
            .unwrap_or_default()
    );
    Ok(())
}
