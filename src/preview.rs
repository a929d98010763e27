// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::allocator::{Allocation, allocate};
use crate::auth::AuthorizationPort;
use crate::error::PaymentError;
use crate::ledger::{customer_debts, lookup_customer};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewSummary {
    pub payment_amount: Decimal,
    pub orders_affected: usize,
    pub fully_paid_orders: usize,
    pub total_debt: Decimal,
    pub remaining_debt_after: Decimal,
    pub unused_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preview {
    pub customer_id: i64,
    pub customer_name: String,
    pub allocation: Allocation,
    pub summary: PreviewSummary,
}

/// Computes the allocation a payment would produce without writing anything.
pub fn preview_distribution(
    conn: &Connection,
    auth: &dyn AuthorizationPort,
    customer_id: i64,
    payment_amount: Decimal,
) -> Result<Preview, PaymentError> {
    if !auth.can_manage_bulk_payments() {
        return Err(PaymentError::PermissionDenied);
    }
    if payment_amount <= Decimal::ZERO {
        return Err(PaymentError::InvalidAmount(format!(
            "{} (must be greater than 0)",
            payment_amount
        )));
    }
    let customer =
        lookup_customer(conn, customer_id)?.ok_or(PaymentError::CustomerNotFound(customer_id))?;
    let debts = customer_debts(conn, customer.id, &auth.order_scope())?;
    let allocation = allocate(payment_amount, &debts)?;

    let total_debt: Decimal = debts.iter().map(|d| d.remaining).sum();
    let applied = allocation.applied_total();
    let summary = PreviewSummary {
        payment_amount,
        orders_affected: allocation.entries.len(),
        fully_paid_orders: allocation.fully_paid_count(),
        total_debt,
        remaining_debt_after: (total_debt - applied).max(Decimal::ZERO),
        unused_amount: allocation.unused_amount,
    };
    Ok(Preview {
        customer_id: customer.id,
        customer_name: customer.name,
        allocation,
        summary,
    })
}
