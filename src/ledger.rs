// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Outstanding-debt reads: per-customer FIFO debt lists and debtor aggregates.

use anyhow::Result;
use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, ToSql, params, params_from_iter};
use rust_decimal::Decimal;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::auth::OrderScope;
use crate::models::{Customer, Debt, Order, OrderStatus, customer_type_label, remaining_balance};
use crate::utils::decimal_col;

const ORDER_SELECT: &str = "SELECT o.id, o.customer_id, o.branch_id, b.center_id, o.assigned_to,
        o.product, o.total_price, o.extra_fee, o.received, o.payment_accepted_fully,
        o.status, o.payment_received_by, o.payment_received_at, o.created_at
     FROM orders o LEFT JOIN branches b ON o.branch_id=b.id";

fn order_from_row(r: &Row<'_>) -> rusqlite::Result<Order> {
    let status: String = r.get(10)?;
    let status = status
        .parse::<OrderStatus>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(10, Type::Text, e.into()))?;
    Ok(Order {
        id: r.get(0)?,
        customer_id: r.get(1)?,
        branch_id: r.get(2)?,
        center_id: r.get(3)?,
        assigned_to: r.get(4)?,
        product: r.get(5)?,
        total_price: decimal_col(r, 6)?,
        extra_fee: decimal_col(r, 7)?,
        received: decimal_col(r, 8)?,
        payment_accepted_fully: r.get(9)?,
        status,
        payment_received_by: r.get(11)?,
        payment_received_at: r.get(12)?,
        created_at: r.get(13)?,
    })
}

pub fn load_order(conn: &Connection, order_id: i64) -> rusqlite::Result<Option<Order>> {
    conn.query_row(
        &format!("{ORDER_SELECT} WHERE o.id=?1"),
        params![order_id],
        order_from_row,
    )
    .optional()
}

pub fn lookup_customer(conn: &Connection, customer_id: i64) -> rusqlite::Result<Option<Customer>> {
    conn.query_row(
        "SELECT id, name, phone, is_agency, telegram_id FROM customers WHERE id=?1",
        params![customer_id],
        |r| {
            Ok(Customer {
                id: r.get(0)?,
                name: r.get(1)?,
                phone: r.get(2)?,
                is_agency: r.get(3)?,
                telegram_id: r.get(4)?,
            })
        },
    )
    .optional()
}

/// Non-cancelled orders of one customer that fall inside `scope`.
pub fn customer_orders(
    conn: &Connection,
    customer_id: i64,
    scope: &OrderScope,
) -> rusqlite::Result<Vec<Order>> {
    let mut stmt = conn.prepare(&format!(
        "{ORDER_SELECT} WHERE o.customer_id=?1 AND o.status != 'cancelled'"
    ))?;
    let rows = stmt.query_map(params![customer_id], order_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        let order = row?;
        if scope.contains(&order) {
            out.push(order);
        }
    }
    Ok(out)
}

fn fifo_cmp(a: &Order, b: &Order) -> Ordering {
    a.created_at
        .cmp(&b.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

/// Outstanding debts of one customer, oldest first (ties by order id).
pub fn customer_debts(
    conn: &Connection,
    customer_id: i64,
    scope: &OrderScope,
) -> rusqlite::Result<Vec<Debt>> {
    let mut orders = customer_orders(conn, customer_id, scope)?;
    orders.retain(|o| o.remaining() > Decimal::ZERO);
    orders.sort_by(fifo_cmp);
    Ok(orders
        .into_iter()
        .map(|o| Debt {
            order_id: o.id,
            total_due: o.total_due(),
            received: o.received,
            remaining: o.remaining(),
            created_at: o.created_at,
        })
        .collect())
}

pub fn total_remaining(
    conn: &Connection,
    customer_id: i64,
    scope: &OrderScope,
) -> rusqlite::Result<Decimal> {
    Ok(customer_debts(conn, customer_id, scope)?
        .iter()
        .map(|d| d.remaining)
        .sum())
}

#[derive(Debug, Clone, Serialize)]
pub struct DebtorRow {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub is_agency: bool,
    pub customer_type: String,
    pub total_debt: Decimal,
    pub order_count: usize,
    pub oldest_order_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebtorSort {
    #[default]
    DebtDesc,
    DebtAsc,
    OrdersDesc,
    OrdersAsc,
    NameAsc,
    NameDesc,
}

impl DebtorSort {
    pub fn parse(s: &str) -> DebtorSort {
        match s {
            "debt_asc" => DebtorSort::DebtAsc,
            "orders_desc" => DebtorSort::OrdersDesc,
            "orders_asc" => DebtorSort::OrdersAsc,
            "name_asc" => DebtorSort::NameAsc,
            "name_desc" => DebtorSort::NameDesc,
            _ => DebtorSort::DebtDesc,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DebtorFilter {
    /// `Some(true)` for agencies only, `Some(false)` for individuals only.
    pub agency: Option<bool>,
    pub branch_id: Option<i64>,
    pub min_debt: Option<Decimal>,
    pub max_debt: Option<Decimal>,
    pub sort: DebtorSort,
    pub limit: Option<usize>,
}

pub const MAX_DEBTORS: usize = 100;

/// Customers with outstanding debt inside `scope`, aggregated per customer.
pub fn top_debtors(
    conn: &Connection,
    scope: &OrderScope,
    filter: &DebtorFilter,
) -> Result<Vec<DebtorRow>> {
    let mut out = debtors(conn, scope, filter)?;
    out.truncate(filter.limit.unwrap_or(MAX_DEBTORS).min(MAX_DEBTORS));
    Ok(out)
}

/// SQL condition and parameters restricting `orders o` to `scope`; `None` when nothing is visible.
fn order_scope_clause(scope: &OrderScope) -> Option<(String, Vec<i64>)> {
    fn branch_list(ids: &[i64]) -> String {
        vec!["?"; ids.len()].join(",")
    }
    match scope {
        OrderScope::All => Some((String::new(), Vec::new())),
        OrderScope::Center(id) => Some((" AND b.center_id=?".into(), vec![*id])),
        OrderScope::Branches(ids) if !ids.is_empty() => Some((
            format!(" AND o.branch_id IN ({})", branch_list(ids)),
            ids.clone(),
        )),
        OrderScope::Assigned { branches, staff_id } if !branches.is_empty() => {
            let mut args = branches.clone();
            args.push(*staff_id);
            Some((
                format!(
                    " AND o.branch_id IN ({}) AND o.assigned_to=?",
                    branch_list(branches)
                ),
                args,
            ))
        }
        _ => None,
    }
}

fn debtors(conn: &Connection, scope: &OrderScope, filter: &DebtorFilter) -> Result<Vec<DebtorRow>> {
    let Some((scope_sql, scope_args)) = order_scope_clause(scope) else {
        return Ok(Vec::new());
    };

    let mut sql = format!(
        "SELECT c.id, c.name, c.phone, c.is_agency,
                o.total_price, o.extra_fee, o.received, o.created_at
         FROM orders o
         JOIN customers c ON o.customer_id=c.id
         LEFT JOIN branches b ON o.branch_id=b.id
         WHERE o.status != 'cancelled' AND o.payment_accepted_fully=0{scope_sql}"
    );
    let mut params_vec: Vec<Box<dyn ToSql>> = scope_args
        .into_iter()
        .map(|id| Box::new(id) as Box<dyn ToSql>)
        .collect();
    if let Some(id) = filter.branch_id {
        sql.push_str(" AND o.branch_id=?");
        params_vec.push(Box::new(id));
    }
    if let Some(agency) = filter.agency {
        sql.push_str(" AND c.is_agency=?");
        params_vec.push(Box::new(agency));
    }

    let mut stmt = conn.prepare(&sql)?;
    let mut cur = stmt.query(params_from_iter(params_vec.iter().map(|p| p.as_ref())))?;

    let mut per_customer: BTreeMap<i64, DebtorRow> = BTreeMap::new();
    while let Some(r) = cur.next()? {
        let remaining = remaining_balance(
            decimal_col(r, 4)?,
            decimal_col(r, 5)?,
            decimal_col(r, 6)?,
            false,
        );
        if remaining <= Decimal::ZERO {
            continue;
        }
        let created_at: NaiveDateTime = r.get(7)?;
        let customer_id: i64 = r.get(0)?;
        match per_customer.get_mut(&customer_id) {
            Some(row) => {
                row.total_debt = row.total_debt.saturating_add(remaining);
                row.order_count += 1;
                row.oldest_order_at = row.oldest_order_at.min(created_at);
            }
            None => {
                let name: String = r.get(1)?;
                let phone: String = r.get(2)?;
                let is_agency: bool = r.get(3)?;
                per_customer.insert(
                    customer_id,
                    DebtorRow {
                        id: customer_id,
                        name: if name.is_empty() { "Unknown".into() } else { name },
                        phone: if phone.is_empty() { "N/A".into() } else { phone },
                        is_agency,
                        customer_type: customer_type_label(is_agency).to_string(),
                        total_debt: remaining,
                        order_count: 1,
                        oldest_order_at: created_at,
                    },
                );
            }
        }
    }

    let mut out: Vec<DebtorRow> = per_customer
        .into_values()
        .filter(|d| !filter.min_debt.is_some_and(|m| d.total_debt < m))
        .filter(|d| !filter.max_debt.is_some_and(|m| d.total_debt > m))
        .collect();

    match filter.sort {
        DebtorSort::DebtDesc => out.sort_by(|a, b| b.total_debt.cmp(&a.total_debt)),
        DebtorSort::DebtAsc => out.sort_by(|a, b| a.total_debt.cmp(&b.total_debt)),
        DebtorSort::OrdersDesc => out.sort_by(|a, b| b.order_count.cmp(&a.order_count)),
        DebtorSort::OrdersAsc => out.sort_by(|a, b| a.order_count.cmp(&b.order_count)),
        DebtorSort::NameAsc => out.sort_by_key(|d| d.name.to_lowercase()),
        DebtorSort::NameDesc => {
            out.sort_by(|a, b| b.name.to_lowercase().cmp(&a.name.to_lowercase()))
        }
    }
    Ok(out)
}

/// Debtors whose name or phone contains `query`; shorter queries match nothing.
pub fn search_debtors(conn: &Connection, scope: &OrderScope, query: &str) -> Result<Vec<DebtorRow>> {
    let q = query.trim().to_lowercase();
    if q.chars().count() < 2 {
        return Ok(Vec::new());
    }
    let mut all = debtors(conn, scope, &DebtorFilter::default())?;
    all.retain(|d| d.name.to_lowercase().contains(&q) || d.phone.to_lowercase().contains(&q));
    all.truncate(20);
    Ok(all)
}

#[derive(Debug, Clone, Serialize)]
pub struct DebtLine {
    pub order_id: i64,
    pub product: String,
    pub created_at: NaiveDateTime,
    pub total_price: Decimal,
    pub extra_fee: Decimal,
    pub received: Decimal,
    pub remaining: Decimal,
    pub days_old: i64,
    pub status: OrderStatus,
    pub payment_received_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DebtDetails {
    pub customer: Customer,
    pub total_debt: Decimal,
    pub order_count: usize,
    pub oldest_debt_days: Option<i64>,
    pub orders: Vec<DebtLine>,
}

/// The FIFO debt list of one customer with order metadata, as of `now`.
pub fn debt_details(
    conn: &Connection,
    scope: &OrderScope,
    customer: Customer,
    now: NaiveDateTime,
) -> Result<DebtDetails> {
    let mut orders = customer_orders(conn, customer.id, scope)?;
    orders.retain(|o| o.remaining() > Decimal::ZERO);
    orders.sort_by(fifo_cmp);

    let lines: Vec<DebtLine> = orders
        .iter()
        .map(|o| DebtLine {
            order_id: o.id,
            product: o.product.clone(),
            created_at: o.created_at,
            total_price: o.total_price,
            extra_fee: o.extra_fee,
            received: o.received,
            remaining: o.remaining(),
            days_old: (now - o.created_at).num_days(),
            status: o.status,
            payment_received_at: o.payment_received_at,
        })
        .collect();

    Ok(DebtDetails {
        customer,
        total_debt: lines.iter().map(|l| l.remaining).sum(),
        order_count: lines.len(),
        oldest_debt_days: lines.first().map(|l| l.days_old),
        orders: lines,
    })
}
