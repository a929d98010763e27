// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Oldest-first distribution of a single payment over outstanding debts.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::PaymentError;
use crate::models::{AllocationEntry, Debt, EPSILON};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Allocation {
    pub entries: Vec<AllocationEntry>,
    /// Part of the payment left over once every debt is covered.
    pub unused_amount: Decimal,
}

impl Allocation {
    pub fn applied_total(&self) -> Decimal {
        self.entries.iter().map(|e| e.amount_applied).sum()
    }

    pub fn fully_paid_count(&self) -> usize {
        self.entries.iter().filter(|e| e.fully_paid).count()
    }
}

/// Applies `payment_amount` to `debts` in the order given.
///
/// `debts` must already be FIFO-ordered; the result is a pure function of the
/// inputs.
pub fn allocate(payment_amount: Decimal, debts: &[Debt]) -> Result<Allocation, PaymentError> {
    if payment_amount <= Decimal::ZERO {
        return Err(PaymentError::InvalidAmount(format!(
            "{} (must be greater than 0)",
            payment_amount
        )));
    }

    let mut remaining_payment = payment_amount;
    let mut entries = Vec::with_capacity(debts.len());
    for debt in debts {
        if remaining_payment <= Decimal::ZERO {
            break;
        }
        let amount_to_apply = remaining_payment.min(debt.remaining);
        let new_remaining = debt.remaining - amount_to_apply;
        entries.push(AllocationEntry {
            order_id: debt.order_id,
            amount_applied: amount_to_apply,
            previous_remaining: debt.remaining,
            new_remaining,
            fully_paid: new_remaining <= EPSILON,
        });
        remaining_payment -= amount_to_apply;
    }

    Ok(Allocation {
        entries,
        unused_amount: remaining_payment,
    })
}
