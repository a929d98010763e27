// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Single-order payment operations: creation, direct payments, extra fees,
//! manual full acceptance and payment reset.
//!
//! Every mutation checks the actor against the order inside the write
//! transaction. Reset and forced acceptance also need override rights.

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDateTime;
use rusqlite::{Connection, TransactionBehavior, params};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::auth::{AuthorizationPort, OrderScope};
use crate::error::PaymentError;
use crate::ledger::{customer_orders, load_order};
use crate::models::{EPSILON, Order, OrderStatus};
use crate::utils;

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: i64,
    pub branch_id: Option<i64>,
    pub assigned_to: Option<i64>,
    pub product: String,
    pub total_price: Decimal,
    pub extra_fee: Decimal,
    pub received: Decimal,
    pub status: OrderStatus,
    pub created_at: NaiveDateTime,
}

pub fn create_order(conn: &Connection, o: &NewOrder) -> Result<i64> {
    if o.total_price < Decimal::ZERO || o.extra_fee < Decimal::ZERO || o.received < Decimal::ZERO {
        return Err(anyhow!("Order amounts cannot be negative"));
    }
    if o.total_price.checked_add(o.extra_fee).is_none() {
        return Err(anyhow!("Order total is too large"));
    }
    conn.execute(
        "INSERT INTO orders(customer_id, branch_id, assigned_to, product, total_price, extra_fee, received, status, created_at, updated_at)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?9)",
        params![
            o.customer_id,
            o.branch_id,
            o.assigned_to,
            o.product,
            o.total_price.to_string(),
            o.extra_fee.to_string(),
            o.received.to_string(),
            o.status.as_str(),
            o.created_at
        ],
    )
    .with_context(|| format!("Create order for customer {}", o.customer_id))?;
    Ok(conn.last_insert_rowid())
}

pub fn list_orders(conn: &Connection, customer_id: i64, include_cancelled: bool) -> Result<Vec<Order>> {
    let mut orders = customer_orders(conn, customer_id, &OrderScope::All)?;
    if include_cancelled {
        let mut stmt = conn.prepare(
            "SELECT id FROM orders WHERE customer_id=?1 AND status='cancelled'",
        )?;
        let ids = stmt.query_map(params![customer_id], |r| r.get::<_, i64>(0))?;
        for id in ids {
            if let Some(o) = load_order(conn, id?)? {
                orders.push(o);
            }
        }
    }
    orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    Ok(orders)
}

fn require_order(conn: &Connection, order_id: i64) -> Result<Order> {
    load_order(conn, order_id)?.with_context(|| format!("Order {} not found", order_id))
}

/// Loads the order and refuses it when the actor may not touch it.
fn authorized_order(
    conn: &Connection,
    auth: &dyn AuthorizationPort,
    order_id: i64,
    needs_override: bool,
) -> Result<Order> {
    let order = require_order(conn, order_id)?;
    if !auth.can_manage_bulk_payments()
        || !auth.order_scope().contains(&order)
        || (needs_override && !auth.can_override_payments())
    {
        warn!(order_id, actor = ?auth.processed_by(), "order change refused");
        return Err(PaymentError::PermissionDenied.into());
    }
    Ok(order)
}

/// Records money received against a single order.
///
/// The amount is rounded to cents and may not exceed the remaining balance.
pub fn record_payment(
    conn: &mut Connection,
    auth: &dyn AuthorizationPort,
    order_id: i64,
    amount: Decimal,
) -> Result<Order> {
    let amount = amount.round_dp(2);
    if amount <= Decimal::ZERO {
        return Err(PaymentError::InvalidAmount("amount must be greater than zero".into()).into());
    }
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let order = authorized_order(&tx, auth, order_id, false)?;
    if order.status == OrderStatus::Cancelled {
        return Err(anyhow!("Order {} is cancelled", order_id));
    }
    let remaining = order.remaining();
    if amount > remaining {
        return Err(PaymentError::InvalidAmount(format!(
            "{} exceeds the remaining {} on order {}",
            amount, remaining, order_id
        ))
        .into());
    }
    let received = order
        .received
        .checked_add(amount)
        .ok_or_else(|| PaymentError::InvalidAmount(amount.to_string()))?;
    let status = if remaining - amount <= EPSILON {
        OrderStatus::PaymentConfirmed
    } else {
        OrderStatus::PaymentReceived
    };
    let now = utils::now();
    tx.execute(
        "UPDATE orders SET received=?1, payment_received_by=?2, payment_received_at=?3,
                status=?4, updated_at=?3
         WHERE id=?5",
        params![
            received.to_string(),
            auth.processed_by(),
            now,
            status.as_str(),
            order_id
        ],
    )?;
    let updated = require_order(&tx, order_id)?;
    tx.commit()?;
    info!(order_id, amount = %amount, received = %received, status = %status, "order payment recorded");
    Ok(updated)
}

/// Adds a positive fee, rounded to cents, to the order's extra fee.
pub fn add_extra_fee(
    conn: &mut Connection,
    auth: &dyn AuthorizationPort,
    order_id: i64,
    amount: Decimal,
    description: &str,
) -> Result<Order> {
    let amount = amount.round_dp(2);
    if amount <= Decimal::ZERO {
        return Err(anyhow!("Extra fee must be a positive amount"));
    }
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let order = authorized_order(&tx, auth, order_id, false)?;
    let new_fee = order
        .extra_fee
        .checked_add(amount)
        .filter(|fee| order.total_price.checked_add(*fee).is_some())
        .ok_or_else(|| anyhow!("Extra fee {} is too large for order {}", amount, order_id))?;
    tx.execute(
        "UPDATE orders SET extra_fee=?1, extra_fee_description=?2, updated_at=?3 WHERE id=?4",
        params![new_fee.to_string(), description.trim(), utils::now(), order_id],
    )?;
    let updated = require_order(&tx, order_id)?;
    tx.commit()?;
    info!(order_id, fee = %amount, "extra fee added");
    Ok(updated)
}

/// Marks the order as paid regardless of the received amount.
///
/// Underpaid orders are refused unless `force` is set, which needs override rights.
pub fn accept_fully(
    conn: &mut Connection,
    auth: &dyn AuthorizationPort,
    order_id: i64,
    force: bool,
) -> Result<Order> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let order = authorized_order(&tx, auth, order_id, force)?;
    let total_due = order.total_due();
    if !force && order.received < total_due {
        return Err(anyhow!(
            "Cannot mark as fully paid. Received {} but total due is {}. Use --force to override.",
            order.received,
            total_due
        ));
    }
    let now = utils::now();
    tx.execute(
        "UPDATE orders SET payment_accepted_fully=1, received=?1, payment_received_by=?2,
                payment_received_at=?3, status=?4, updated_at=?3
         WHERE id=?5",
        params![
            total_due.to_string(),
            auth.processed_by(),
            now,
            OrderStatus::PaymentConfirmed.as_str(),
            order_id
        ],
    )?;
    let updated = require_order(&tx, order_id)?;
    tx.commit()?;
    info!(order_id, previous_received = %order.received, forced = force, "order accepted fully");
    Ok(updated)
}

/// Clears received money and the full-acceptance flag; status returns to pending.
pub fn reset_payment(
    conn: &mut Connection,
    auth: &dyn AuthorizationPort,
    order_id: i64,
) -> Result<Order> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let order = authorized_order(&tx, auth, order_id, true)?;
    tx.execute(
        "UPDATE orders SET received='0', payment_accepted_fully=0, payment_received_by=NULL,
                payment_received_at=NULL, status='pending', updated_at=?1
         WHERE id=?2",
        params![utils::now(), order_id],
    )?;
    let updated = require_order(&tx, order_id)?;
    tx.commit()?;
    info!(
        order_id,
        was_received = %order.received,
        was_accepted_fully = order.payment_accepted_fully,
        "payment reset"
    );
    Ok(updated)
}

pub fn set_status(
    conn: &mut Connection,
    auth: &dyn AuthorizationPort,
    order_id: i64,
    status: OrderStatus,
) -> Result<Order> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    authorized_order(&tx, auth, order_id, false)?;
    tx.execute(
        "UPDATE orders SET status=?1, updated_at=?2 WHERE id=?3",
        params![status.as_str(), utils::now(), order_id],
    )?;
    let updated = require_order(&tx, order_id)?;
    tx.commit()?;
    Ok(updated)
}
