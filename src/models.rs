// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Remaining balances at or below this are treated as settled.
pub const EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub is_agency: bool,
    pub telegram_id: Option<i64>,
}

impl Customer {
    pub fn customer_type(&self) -> &'static str {
        customer_type_label(self.is_agency)
    }
}

pub fn customer_type_label(is_agency: bool) -> &'static str {
    if is_agency { "agency" } else { "individual" }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Owner,
    Manager,
    Staff,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Owner => "owner",
            StaffRole::Manager => "manager",
            StaffRole::Staff => "staff",
        }
    }
}

impl FromStr for StaffRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owner" => Ok(StaffRole::Owner),
            "manager" => Ok(StaffRole::Manager),
            "staff" => Ok(StaffRole::Staff),
            other => Err(anyhow::anyhow!(
                "Unknown role '{}' (use owner|manager|staff)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    pub role: StaffRole,
    pub branch_id: Option<i64>,
    pub center_id: Option<i64>,
    pub is_superuser: bool,
    pub can_manage_bulk_payments: bool,
    pub can_view_all_orders: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    PaymentPending,
    PaymentReceived,
    PaymentConfirmed,
    InProgress,
    Ready,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::PaymentPending => "payment_pending",
            OrderStatus::PaymentReceived => "payment_received",
            OrderStatus::PaymentConfirmed => "payment_confirmed",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Ready => "ready",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Early-stage statuses that a full payment promotes to `payment_confirmed`.
    pub fn promotes_on_full_payment(&self) -> bool {
        matches!(
            self,
            OrderStatus::Pending | OrderStatus::PaymentPending | OrderStatus::PaymentReceived
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s {
            "pending" => OrderStatus::Pending,
            "payment_pending" => OrderStatus::PaymentPending,
            "payment_received" => OrderStatus::PaymentReceived,
            "payment_confirmed" => OrderStatus::PaymentConfirmed,
            "in_progress" => OrderStatus::InProgress,
            "ready" => OrderStatus::Ready,
            "completed" => OrderStatus::Completed,
            "cancelled" => OrderStatus::Cancelled,
            other => return Err(anyhow::anyhow!("Unknown order status '{}'", other)),
        };
        Ok(status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Card,
    Other,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::Cash,
        PaymentMethod::BankTransfer,
        PaymentMethod::Card,
        PaymentMethod::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Card => "card",
            PaymentMethod::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::BankTransfer => "Bank Transfer",
            PaymentMethod::Card => "Card",
            PaymentMethod::Other => "Other",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// A stored order, restricted to the fields payment settlement reads or writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub customer_id: i64,
    pub branch_id: Option<i64>,
    pub center_id: Option<i64>,
    pub assigned_to: Option<i64>,
    pub product: String,
    pub total_price: Decimal,
    pub extra_fee: Decimal,
    pub received: Decimal,
    pub payment_accepted_fully: bool,
    pub status: OrderStatus,
    pub payment_received_by: Option<i64>,
    pub payment_received_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl Order {
    pub fn total_due(&self) -> Decimal {
        self.total_price.saturating_add(self.extra_fee)
    }

    pub fn remaining(&self) -> Decimal {
        remaining_balance(
            self.total_price,
            self.extra_fee,
            self.received,
            self.payment_accepted_fully,
        )
    }
}

/// Zero when the order was accepted fully, otherwise `total_due - received` floored at zero.
pub fn remaining_balance(
    total_price: Decimal,
    extra_fee: Decimal,
    received: Decimal,
    accepted_fully: bool,
) -> Decimal {
    if accepted_fully {
        return Decimal::ZERO;
    }
    total_price
        .saturating_add(extra_fee)
        .saturating_sub(received)
        .max(Decimal::ZERO)
}

/// One order's outstanding balance at the moment the ledger was read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Debt {
    pub order_id: i64,
    pub total_due: Decimal,
    pub received: Decimal,
    pub remaining: Decimal,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationEntry {
    pub order_id: i64,
    pub amount_applied: Decimal,
    pub previous_remaining: Decimal,
    pub new_remaining: Decimal,
    pub fully_paid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkPayment {
    pub id: i64,
    pub customer_id: i64,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub receipt_note: String,
    pub processed_by: Option<i64>,
    pub branch_id: Option<i64>,
    pub orders_count: i64,
    pub fully_paid_orders: i64,
    pub remaining_debt_after: Decimal,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOrderLink {
    pub id: i64,
    pub bulk_payment_id: i64,
    pub order_id: i64,
    pub amount_applied: Decimal,
    pub previous_received: Decimal,
    pub new_received: Decimal,
    pub fully_paid: bool,
}
