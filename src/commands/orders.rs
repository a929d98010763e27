// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::auth::AuthorizationPort;
use crate::models::{Order, OrderStatus};
use crate::orders::{self, NewOrder};
use crate::recorder::parse_amount;
use crate::utils::{
    fmt_money, get_currency, id_for_branch, id_for_staff, maybe_print_json, now, parse_datetime,
    parse_decimal, pretty_table,
};
use anyhow::{Context, Result};
use rusqlite::Connection;
use rust_decimal::Decimal;

pub fn handle(
    conn: &mut Connection,
    m: &clap::ArgMatches,
    auth: &dyn AuthorizationPort,
) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("pay", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let amount = parse_amount(sub.get_one::<String>("amount").unwrap())?;
            let o = orders::record_payment(conn, auth, id, amount)?;
            print_order_state(conn, &o)?;
        }
        Some(("fee", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
            let description = sub.get_one::<String>("description").unwrap();
            let o = orders::add_extra_fee(conn, auth, id, amount, description)?;
            print_order_state(conn, &o)?;
        }
        Some(("accept", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let o = orders::accept_fully(conn, auth, id, sub.get_flag("force"))?;
            print_order_state(conn, &o)?;
        }
        Some(("reset", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let o = orders::reset_payment(conn, auth, id)?;
            print_order_state(conn, &o)?;
        }
        Some(("status", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let status: OrderStatus = sub.get_one::<String>("status").unwrap().trim().parse()?;
            let o = orders::set_status(conn, auth, id, status)?;
            print_order_state(conn, &o)?;
        }
        _ => {}
    }
    Ok(())
}

fn optional_decimal(sub: &clap::ArgMatches, key: &str) -> Result<Decimal> {
    match sub.get_one::<String>(key) {
        Some(raw) => parse_decimal(raw),
        None => Ok(Decimal::ZERO),
    }
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let customer_id = *sub.get_one::<i64>("customer").unwrap();
    let branch_id = match sub.get_one::<String>("branch") {
        Some(b) => Some(id_for_branch(conn, b.trim())?),
        None => None,
    };
    let assigned_to = match sub.get_one::<String>("assigned_to") {
        Some(u) => Some(id_for_staff(conn, u.trim())?),
        None => None,
    };
    let created_at = match sub.get_one::<String>("created") {
        Some(raw) => parse_datetime(raw)?,
        None => now(),
    };
    let new = NewOrder {
        customer_id,
        branch_id,
        assigned_to,
        product: sub
            .get_one::<String>("product")
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
        total_price: parse_decimal(sub.get_one::<String>("price").unwrap())?,
        extra_fee: optional_decimal(sub, "fee")?,
        received: optional_decimal(sub, "received")?,
        status: sub.get_one::<String>("status").unwrap().trim().parse()?,
        created_at,
    };
    let id = orders::create_order(conn, &new)?;
    println!(
        "Created order #{} for customer {} ({})",
        id,
        customer_id,
        fmt_money(&new.total_price.saturating_add(new.extra_fee), &get_currency(conn)?)
    );
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let customer_id = *sub.get_one::<i64>("customer").unwrap();
    let data = orders::list_orders(conn, customer_id, sub.get_flag("all"))
        .with_context(|| format!("List orders of customer {}", customer_id))?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .iter()
            .map(|o| {
                vec![
                    o.id.to_string(),
                    o.created_at.format("%Y-%m-%d %H:%M").to_string(),
                    o.product.clone(),
                    format!("{:.2}", o.total_due()),
                    format!("{:.2}", o.received),
                    format!("{:.2}", o.remaining()),
                    o.status.to_string(),
                    if o.payment_accepted_fully { "yes".into() } else { String::new() },
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["ID", "Created", "Product", "Due", "Received", "Remaining", "Status", "Accepted"],
                rows
            )
        );
    }
    Ok(())
}

fn print_order_state(conn: &Connection, o: &Order) -> Result<()> {
    let ccy = get_currency(conn)?;
    println!(
        "Order #{}: due {}, received {}, remaining {}, status {}",
        o.id,
        fmt_money(&o.total_due(), &ccy),
        fmt_money(&o.received, &ccy),
        fmt_money(&o.remaining(), &ccy),
        o.status
    );
    Ok(())
}
