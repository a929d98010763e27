// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Read side of recorded bulk payments: filtered history, statistics and
//! per-payment details.

use anyhow::{Context, Result, anyhow};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, ToSql, params};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashSet;

use crate::auth::PaymentScope;
use crate::ledger::load_order;
use crate::models::{BulkPayment, PaymentMethod, PaymentOrderLink};
use crate::utils::{decimal_col, parse_date};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    All,
    Today,
    Week,
    Month,
    Year,
    Custom(NaiveDate, NaiveDate),
}

impl Period {
    pub fn parse(period: &str, from: Option<&str>, to: Option<&str>) -> Result<Period> {
        let p = match period.trim() {
            "all" => Period::All,
            "today" => Period::Today,
            "week" => Period::Week,
            "month" => Period::Month,
            "year" => Period::Year,
            "custom" => {
                let from = from.context("--from is required for a custom period")?;
                let to = to.context("--to is required for a custom period")?;
                let (from, to) = (parse_date(from.trim())?, parse_date(to.trim())?);
                if from > to {
                    return Err(anyhow!("Period start {} is after its end {}", from, to));
                }
                Period::Custom(from, to)
            }
            other => {
                return Err(anyhow!(
                    "Unknown period '{}' (use all|today|week|month|year|custom)",
                    other
                ));
            }
        };
        Ok(p)
    }

    /// Inclusive `[start, end]` bounds relative to `now`; `None` means unbounded.
    pub fn bounds(&self, now: NaiveDateTime) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let today = now.date();
        let start = match self {
            Period::All => return None,
            Period::Today => today,
            Period::Week => today - Duration::days(today.weekday().num_days_from_monday() as i64),
            Period::Month => today.with_day(1)?,
            Period::Year => NaiveDate::from_ymd_opt(today.year(), 1, 1)?,
            Period::Custom(from, to) => {
                return Some((from.and_hms_opt(0, 0, 0)?, to.and_hms_opt(23, 59, 59)?));
            }
        };
        Some((start.and_hms_opt(0, 0, 0)?, now))
    }
}

#[derive(Debug, Clone)]
pub struct HistoryFilter {
    pub customer_id: Option<i64>,
    pub method: Option<PaymentMethod>,
    pub agency: Option<bool>,
    pub period: Period,
}

impl Default for HistoryFilter {
    fn default() -> Self {
        HistoryFilter {
            customer_id: None,
            method: None,
            agency: None,
            period: Period::All,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryRow {
    pub id: i64,
    pub created_at: NaiveDateTime,
    pub customer_id: i64,
    pub customer_name: String,
    pub is_agency: bool,
    pub amount: Decimal,
    /// What the links actually settled; can be below `amount` on overpayment.
    pub applied: Decimal,
    pub payment_method: PaymentMethod,
    pub orders_count: i64,
    pub fully_paid_orders: i64,
    pub remaining_debt_after: Decimal,
    pub processed_by: Option<String>,
    pub branch: Option<String>,
    pub receipt_note: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HistoryStats {
    pub total_count: usize,
    pub total_amount: Decimal,
    pub total_orders: i64,
    pub fully_paid_orders: i64,
    pub unique_customers: usize,
    pub average_amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct History {
    pub payments: Vec<HistoryRow>,
    pub stats: HistoryStats,
}

const PAYMENT_SELECT: &str = "SELECT p.id, p.created_at, p.customer_id, c.name, c.is_agency, p.amount,
        p.payment_method, p.orders_count, p.fully_paid_orders, p.remaining_debt_after,
        s.username, b.name, p.receipt_note
     FROM bulk_payments p
     JOIN customers c ON p.customer_id=c.id
     LEFT JOIN staff s ON p.processed_by=s.id
     LEFT JOIN branches b ON p.branch_id=b.id";

fn method_col(r: &Row<'_>, idx: usize) -> rusqlite::Result<PaymentMethod> {
    let method: String = r.get(idx)?;
    method.parse::<PaymentMethod>().map_err(|m| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unknown payment method '{}'", m).into(),
        )
    })
}

fn payment_from_row(r: &Row<'_>) -> rusqlite::Result<HistoryRow> {
    let payment_method = method_col(r, 6)?;
    Ok(HistoryRow {
        id: r.get(0)?,
        created_at: r.get(1)?,
        customer_id: r.get(2)?,
        customer_name: r.get(3)?,
        is_agency: r.get(4)?,
        amount: decimal_col(r, 5)?,
        applied: Decimal::ZERO,
        payment_method,
        orders_count: r.get(7)?,
        fully_paid_orders: r.get(8)?,
        remaining_debt_after: decimal_col(r, 9)?,
        processed_by: r.get(10)?,
        branch: r.get(11)?,
        receipt_note: r.get(12)?,
    })
}

fn scope_clause(scope: &PaymentScope) -> Option<(&'static str, Option<i64>)> {
    match scope {
        PaymentScope::All => Some(("", None)),
        PaymentScope::Center(id) => Some((" AND b.center_id=?", Some(*id))),
        PaymentScope::Branch(id) => Some((" AND p.branch_id=?", Some(*id))),
        PaymentScope::Nothing => None,
    }
}

const BULK_SELECT: &str = "SELECT id, customer_id, amount, payment_method, receipt_note, processed_by,
        branch_id, orders_count, fully_paid_orders, remaining_debt_after, created_at
     FROM bulk_payments";

fn bulk_payment_from_row(r: &Row<'_>) -> rusqlite::Result<BulkPayment> {
    Ok(BulkPayment {
        id: r.get(0)?,
        customer_id: r.get(1)?,
        amount: decimal_col(r, 2)?,
        payment_method: method_col(r, 3)?,
        receipt_note: r.get(4)?,
        processed_by: r.get(5)?,
        branch_id: r.get(6)?,
        orders_count: r.get(7)?,
        fully_paid_orders: r.get(8)?,
        remaining_debt_after: decimal_col(r, 9)?,
        created_at: r.get(10)?,
    })
}

/// The stored payment record as written by the recorder.
pub fn load_bulk_payment(conn: &Connection, payment_id: i64) -> Result<Option<BulkPayment>> {
    let p = conn
        .query_row(
            &format!("{BULK_SELECT} WHERE id=?1"),
            params![payment_id],
            bulk_payment_from_row,
        )
        .optional()?;
    Ok(p)
}

pub fn all_bulk_payments(conn: &Connection) -> Result<Vec<BulkPayment>> {
    let mut stmt = conn.prepare(&format!("{BULK_SELECT} ORDER BY id"))?;
    let rows = stmt.query_map([], bulk_payment_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn links_for_payment(conn: &Connection, payment_id: i64) -> Result<Vec<PaymentOrderLink>> {
    let mut stmt = conn.prepare(
        "SELECT id, bulk_payment_id, order_id, amount_applied, previous_received, new_received, fully_paid
         FROM payment_order_links WHERE bulk_payment_id=?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![payment_id], |r| {
        Ok(PaymentOrderLink {
            id: r.get(0)?,
            bulk_payment_id: r.get(1)?,
            order_id: r.get(2)?,
            amount_applied: decimal_col(r, 3)?,
            previous_received: decimal_col(r, 4)?,
            new_received: decimal_col(r, 5)?,
            fully_paid: r.get(6)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Payments visible under `scope`, newest first, with statistics over the whole set.
pub fn payment_history(
    conn: &Connection,
    scope: &PaymentScope,
    filter: &HistoryFilter,
    now: NaiveDateTime,
) -> Result<History> {
    let Some((scope_sql, scope_param)) = scope_clause(scope) else {
        return Ok(History {
            payments: Vec::new(),
            stats: HistoryStats::default(),
        });
    };

    let mut sql = format!("{PAYMENT_SELECT} WHERE 1=1{scope_sql}");
    let mut params_vec: Vec<Box<dyn ToSql>> = Vec::new();
    if let Some(id) = scope_param {
        params_vec.push(Box::new(id));
    }
    if let Some(id) = filter.customer_id {
        sql.push_str(" AND p.customer_id=?");
        params_vec.push(Box::new(id));
    }
    if let Some(m) = filter.method {
        sql.push_str(" AND p.payment_method=?");
        params_vec.push(Box::new(m.as_str()));
    }
    if let Some(agency) = filter.agency {
        sql.push_str(" AND c.is_agency=?");
        params_vec.push(Box::new(agency));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        rusqlite::params_from_iter(params_vec.iter().map(|p| p.as_ref())),
        payment_from_row,
    )?;

    let bounds = filter.period.bounds(now);
    let mut payments = Vec::new();
    for row in rows {
        let mut p = row?;
        if let Some((start, end)) = bounds {
            if p.created_at < start || p.created_at > end {
                continue;
            }
        }
        p.applied = links_for_payment(conn, p.id)?
            .iter()
            .map(|l| l.amount_applied)
            .sum();
        payments.push(p);
    }
    payments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));

    let total_amount: Decimal = payments.iter().map(|p| p.applied).sum();
    let unique: HashSet<i64> = payments.iter().map(|p| p.customer_id).collect();
    let stats = HistoryStats {
        total_count: payments.len(),
        total_amount,
        total_orders: payments.iter().map(|p| p.orders_count).sum(),
        fully_paid_orders: payments.iter().map(|p| p.fully_paid_orders).sum(),
        unique_customers: unique.len(),
        average_amount: if payments.is_empty() {
            Decimal::ZERO
        } else {
            total_amount / Decimal::from(payments.len())
        },
    };
    Ok(History { payments, stats })
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentDetailLine {
    pub order_id: i64,
    pub product: String,
    pub paid_amount: Decimal,
    pub previous_received: Decimal,
    pub new_received: Decimal,
    pub fully_paid_by_payment: bool,
    pub current_remaining: Decimal,
    pub is_fully_paid: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentDetails {
    pub payment: HistoryRow,
    pub fully_paid_count: usize,
    pub remaining_debt: Decimal,
    pub orders: Vec<PaymentDetailLine>,
}

/// One payment and the current state of every order it touched.
pub fn payment_details(
    conn: &Connection,
    scope: &PaymentScope,
    payment_id: i64,
) -> Result<PaymentDetails> {
    let Some((scope_sql, scope_param)) = scope_clause(scope) else {
        return Err(anyhow!("Permission denied"));
    };
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM bulk_payments WHERE id=?1)",
        params![payment_id],
        |r| r.get(0),
    )?;
    if !exists {
        return Err(anyhow!("Payment {} not found", payment_id));
    }

    let sql = format!("{PAYMENT_SELECT} WHERE p.id=?{scope_sql}");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = match scope_param {
        Some(id) => stmt.query(params![payment_id, id])?,
        None => stmt.query(params![payment_id])?,
    };
    let mut payment = match rows.next()? {
        Some(r) => payment_from_row(r)?,
        None => return Err(anyhow!("Permission denied")),
    };

    let links = links_for_payment(conn, payment_id)?;
    payment.applied = links.iter().map(|l| l.amount_applied).sum();

    let mut orders = Vec::new();
    for link in &links {
        let order = load_order(conn, link.order_id)?
            .with_context(|| format!("Order {} linked to payment {} is missing", link.order_id, payment_id))?;
        let current_remaining = order.remaining();
        orders.push(PaymentDetailLine {
            order_id: order.id,
            product: order.product,
            paid_amount: link.amount_applied,
            previous_received: link.previous_received,
            new_received: link.new_received,
            fully_paid_by_payment: link.fully_paid,
            current_remaining,
            is_fully_paid: current_remaining <= Decimal::ZERO,
        });
    }
    Ok(PaymentDetails {
        payment,
        fully_paid_count: orders.iter().filter(|o| o.is_fully_paid).count(),
        remaining_debt: orders
            .iter()
            .filter(|o| !o.is_fully_paid)
            .map(|o| o.current_remaining)
            .sum(),
        orders,
    })
}
