// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Atomic recording of a bulk payment.
//!
//! [`record_bulk_payment`] is the transactional part: it validates, takes the
//! write lock, re-reads the ledger, applies the FIFO allocation and commits.
//! [`process_bulk_payment`] wraps it and notifies the customer only after the
//! commit has succeeded.

use chrono::NaiveDateTime;
use rusqlite::{Connection, Transaction, TransactionBehavior, params};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use crate::allocator::allocate;
use crate::auth::AuthorizationPort;
use crate::error::PaymentError;
use crate::ledger::{customer_debts, load_order, lookup_customer, total_remaining};
use crate::models::{AllocationEntry, Customer, OrderStatus, PaymentMethod, PaymentOrderLink};
use crate::notify::{Notifier, PaymentNotice};
use crate::utils;

#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub customer_id: i64,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub receipt_note: String,
}

impl PaymentRequest {
    /// Builds a request from untyped input, rejecting bad amounts and methods.
    pub fn parse(
        customer_id: i64,
        amount: &str,
        method: &str,
        receipt_note: &str,
    ) -> Result<PaymentRequest, PaymentError> {
        let amount = parse_amount(amount)?;
        let payment_method = method
            .trim()
            .parse::<PaymentMethod>()
            .map_err(PaymentError::InvalidPaymentMethod)?;
        Ok(PaymentRequest {
            customer_id,
            amount,
            payment_method,
            receipt_note: receipt_note.trim().to_string(),
        })
    }
}

pub fn parse_amount(raw: &str) -> Result<Decimal, PaymentError> {
    let amount = raw
        .trim()
        .parse::<Decimal>()
        .map_err(|_| PaymentError::InvalidAmount(format!("'{}' is not a number", raw.trim())))?;
    if amount <= Decimal::ZERO {
        return Err(PaymentError::InvalidAmount(format!(
            "{} (must be greater than 0)",
            amount
        )));
    }
    Ok(amount)
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentSummary {
    pub payment_amount: Decimal,
    pub orders_paid: usize,
    pub fully_paid_orders: usize,
    pub remaining_debt: Decimal,
    pub customer_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub payment_id: i64,
    pub summary: PaymentSummary,
    pub unused_amount: Decimal,
    pub links: Vec<PaymentOrderLink>,
    pub created_at: NaiveDateTime,
}

/// A committed payment together with the customer it was recorded for.
#[derive(Debug, Clone)]
pub struct Committed {
    pub receipt: PaymentReceipt,
    pub customer: Customer,
}

/// Validates and records a payment in one transaction; nothing is written on error.
pub fn record_bulk_payment(
    conn: &mut Connection,
    auth: &dyn AuthorizationPort,
    req: &PaymentRequest,
) -> Result<Committed, PaymentError> {
    if !auth.can_manage_bulk_payments() {
        return Err(PaymentError::PermissionDenied);
    }
    if req.amount <= Decimal::ZERO {
        return Err(PaymentError::InvalidAmount(format!(
            "{} (must be greater than 0)",
            req.amount
        )));
    }
    let customer =
        lookup_customer(conn, req.customer_id)?.ok_or(PaymentError::CustomerNotFound(req.customer_id))?;
    let scope = auth.order_scope();
    if customer_debts(conn, customer.id, &scope)?.is_empty() {
        return Err(PaymentError::NoOutstandingDebt);
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    // The snapshot that drives the allocation is taken under the write lock.
    let debts = customer_debts(&tx, customer.id, &scope)?;
    if debts.is_empty() {
        return Err(PaymentError::NoOutstandingDebt);
    }
    debug!(customer_id = customer.id, debts = debts.len(), "ledger snapshot taken");
    let allocation = allocate(req.amount, &debts)?;
    let now = utils::now();

    tx.execute(
        "INSERT INTO bulk_payments(customer_id, amount, payment_method, receipt_note, processed_by, branch_id, created_at)
         VALUES (?1,?2,?3,?4,?5,?6,?7)",
        params![
            customer.id,
            req.amount.to_string(),
            req.payment_method.as_str(),
            req.receipt_note,
            auth.processed_by(),
            auth.branch_id(),
            now
        ],
    )?;
    let payment_id = tx.last_insert_rowid();

    let mut links = Vec::new();
    for entry in allocation
        .entries
        .iter()
        .filter(|e| e.amount_applied > Decimal::ZERO)
    {
        links.push(apply_entry(&tx, payment_id, entry, auth.processed_by(), now)?);
    }

    let remaining_after = total_remaining(&tx, customer.id, &scope)?;
    let fully_paid = links.iter().filter(|l| l.fully_paid).count();
    tx.execute(
        "UPDATE bulk_payments SET orders_count=?1, fully_paid_orders=?2, remaining_debt_after=?3 WHERE id=?4",
        params![
            links.len() as i64,
            fully_paid as i64,
            remaining_after.to_string(),
            payment_id
        ],
    )?;
    tx.commit()?;

    let receipt = PaymentReceipt {
        payment_id,
        summary: PaymentSummary {
            payment_amount: req.amount,
            orders_paid: links.len(),
            fully_paid_orders: fully_paid,
            remaining_debt: remaining_after,
            customer_name: customer.name.clone(),
        },
        unused_amount: allocation.unused_amount,
        links,
        created_at: now,
    };
    info!(
        payment_id,
        customer = %customer.name,
        amount = %req.amount,
        orders = receipt.summary.orders_paid,
        fully_paid = receipt.summary.fully_paid_orders,
        processed_by = ?auth.processed_by(),
        "bulk payment processed"
    );
    Ok(Committed { receipt, customer })
}

fn apply_entry(
    tx: &Transaction<'_>,
    payment_id: i64,
    entry: &AllocationEntry,
    processed_by: Option<i64>,
    now: NaiveDateTime,
) -> Result<PaymentOrderLink, PaymentError> {
    let order = load_order(tx, entry.order_id)?.ok_or_else(|| {
        PaymentError::PersistenceFailure(format!("order {} no longer exists", entry.order_id))
    })?;
    if order.remaining() != entry.previous_remaining {
        return Err(PaymentError::PersistenceFailure(format!(
            "order {} balance changed from {} to {} during payment",
            order.id,
            entry.previous_remaining,
            order.remaining()
        )));
    }

    let previous_received = order.received;
    let new_received = previous_received + entry.amount_applied;
    let status = if entry.fully_paid && order.status.promotes_on_full_payment() {
        OrderStatus::PaymentConfirmed
    } else {
        order.status
    };

    let changed = tx.execute(
        "UPDATE orders SET received=?1, payment_received_by=?2, payment_received_at=?3, status=?4, updated_at=?3
         WHERE id=?5 AND received=?6 AND payment_accepted_fully=0",
        params![
            new_received.to_string(),
            processed_by,
            now,
            status.as_str(),
            order.id,
            previous_received.to_string()
        ],
    )?;
    if changed != 1 {
        return Err(PaymentError::PersistenceFailure(format!(
            "order {} was modified concurrently",
            order.id
        )));
    }

    tx.execute(
        "INSERT INTO payment_order_links(bulk_payment_id, order_id, amount_applied, previous_received, new_received, fully_paid)
         VALUES (?1,?2,?3,?4,?5,?6)",
        params![
            payment_id,
            order.id,
            entry.amount_applied.to_string(),
            previous_received.to_string(),
            new_received.to_string(),
            entry.fully_paid
        ],
    )?;
    Ok(PaymentOrderLink {
        id: tx.last_insert_rowid(),
        bulk_payment_id: payment_id,
        order_id: order.id,
        amount_applied: entry.amount_applied,
        previous_received,
        new_received,
        fully_paid: entry.fully_paid,
    })
}

/// Records the payment, then attempts the customer notification.
pub fn process_bulk_payment(
    conn: &mut Connection,
    auth: &dyn AuthorizationPort,
    notifier: &dyn Notifier,
    req: &PaymentRequest,
) -> Result<PaymentReceipt, PaymentError> {
    let committed = match record_bulk_payment(conn, auth, req) {
        Ok(c) => c,
        Err(e) => {
            if let PaymentError::PersistenceFailure(msg) = &e {
                error!(customer_id = req.customer_id, "bulk payment rolled back: {}", msg);
            }
            return Err(e);
        }
    };

    let currency = utils::get_currency(conn).unwrap_or_else(|_| "UZS".to_string());
    let notice = PaymentNotice {
        customer: &committed.customer,
        amount: req.amount,
        orders_paid: committed.receipt.summary.orders_paid,
        fully_paid: committed.receipt.summary.fully_paid_orders,
        currency: &currency,
    };
    if let Err(e) = notifier.payment_confirmed(&notice) {
        warn!(
            payment_id = committed.receipt.payment_id,
            "Could not send payment notification to customer: {:#}", e
        );
    }
    Ok(committed.receipt)
}

/// The presentation-neutral result object for a payment attempt.
pub fn response_json(result: &Result<PaymentReceipt, PaymentError>) -> Value {
    match result {
        Ok(r) => json!({
            "success": true,
            "payment_id": r.payment_id,
            "summary": r.summary,
        }),
        Err(e) => json!({
            "success": false,
            "error": e.to_string(),
            "code": e.code(),
        }),
    }
}
