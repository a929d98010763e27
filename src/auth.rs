// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Access scoping for bulk payments.
//!
//! The settlement core never looks up who is acting; it receives an
//! [`AuthorizationPort`] and asks it for the capability check and the set of
//! orders the actor may touch.

use anyhow::{Context, Result};
use rusqlite::{Connection, params};

use crate::models::{Order, Staff, StaffRole};

/// The orders an actor is allowed to see and settle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderScope {
    All,
    Center(i64),
    Branches(Vec<i64>),
    Assigned { branches: Vec<i64>, staff_id: i64 },
    Nothing,
}

impl OrderScope {
    pub fn contains(&self, order: &Order) -> bool {
        match self {
            OrderScope::All => true,
            OrderScope::Center(center) => order.center_id == Some(*center),
            OrderScope::Branches(ids) => order.branch_id.is_some_and(|b| ids.contains(&b)),
            OrderScope::Assigned { branches, staff_id } => {
                order.branch_id.is_some_and(|b| branches.contains(&b))
                    && order.assigned_to == Some(*staff_id)
            }
            OrderScope::Nothing => false,
        }
    }
}

/// Which bulk payments an actor may list in history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentScope {
    All,
    Center(i64),
    Branch(i64),
    Nothing,
}

pub trait AuthorizationPort {
    fn can_manage_bulk_payments(&self) -> bool;
    /// Reset payments and force full acceptance of underpaid orders.
    fn can_override_payments(&self) -> bool;
    fn order_scope(&self) -> OrderScope;
    fn payment_scope(&self) -> PaymentScope;
    /// Staff id written to `processed_by`; `None` for system actors.
    fn processed_by(&self) -> Option<i64>;
    fn branch_id(&self) -> Option<i64>;
}

/// A system-level actor with full access and no staff identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unrestricted;

impl AuthorizationPort for Unrestricted {
    fn can_manage_bulk_payments(&self) -> bool {
        true
    }

    fn can_override_payments(&self) -> bool {
        true
    }

    fn order_scope(&self) -> OrderScope {
        OrderScope::All
    }

    fn payment_scope(&self) -> PaymentScope {
        PaymentScope::All
    }

    fn processed_by(&self) -> Option<i64> {
        None
    }

    fn branch_id(&self) -> Option<i64> {
        None
    }
}

/// Access rights of a stored staff member.
#[derive(Debug, Clone)]
pub struct StaffAccess {
    pub staff: Staff,
}

impl StaffAccess {
    pub fn load(conn: &Connection, username: &str) -> Result<StaffAccess> {
        let staff = load_staff(conn, username)?
            .with_context(|| format!("Staff member '{}' not found", username))?;
        Ok(StaffAccess { staff })
    }

    fn own_branches(&self) -> Vec<i64> {
        self.staff.branch_id.into_iter().collect()
    }
}

impl AuthorizationPort for StaffAccess {
    fn can_manage_bulk_payments(&self) -> bool {
        self.staff.is_superuser || self.staff.can_manage_bulk_payments
    }

    fn can_override_payments(&self) -> bool {
        self.staff.is_superuser || self.staff.role == StaffRole::Owner
    }

    fn order_scope(&self) -> OrderScope {
        let s = &self.staff;
        if s.is_superuser {
            return OrderScope::All;
        }
        if s.role == StaffRole::Owner {
            if let Some(center) = s.center_id {
                return OrderScope::Center(center);
            }
        }
        let branches = self.own_branches();
        if branches.is_empty() {
            return OrderScope::Nothing;
        }
        if s.role == StaffRole::Staff && !s.can_view_all_orders {
            return OrderScope::Assigned {
                branches,
                staff_id: s.id,
            };
        }
        OrderScope::Branches(branches)
    }

    fn payment_scope(&self) -> PaymentScope {
        let s = &self.staff;
        if s.is_superuser {
            return PaymentScope::All;
        }
        match (s.role, s.center_id, s.branch_id) {
            (StaffRole::Owner, Some(center), _) => PaymentScope::Center(center),
            (_, _, Some(branch)) => PaymentScope::Branch(branch),
            _ => PaymentScope::Nothing,
        }
    }

    fn processed_by(&self) -> Option<i64> {
        Some(self.staff.id)
    }

    fn branch_id(&self) -> Option<i64> {
        self.staff.branch_id
    }
}

pub fn load_staff(conn: &Connection, username: &str) -> Result<Option<Staff>> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.username, s.full_name, s.role, s.branch_id,
                COALESCE(s.center_id, b.center_id), s.is_superuser,
                s.can_manage_bulk_payments, s.can_view_all_orders
         FROM staff s LEFT JOIN branches b ON s.branch_id=b.id
         WHERE s.username=?1",
    )?;
    let mut rows = stmt.query(params![username])?;
    let Some(r) = rows.next()? else {
        return Ok(None);
    };
    let role: String = r.get(3)?;
    Ok(Some(Staff {
        id: r.get(0)?,
        username: r.get(1)?,
        full_name: r.get(2)?,
        role: role.parse()?,
        branch_id: r.get(4)?,
        center_id: r.get(5)?,
        is_superuser: r.get(6)?,
        can_manage_bulk_payments: r.get(7)?,
        can_view_all_orders: r.get(8)?,
    }))
}
