// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

use crate::models::PaymentMethod;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Invalid payment amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid payment method '{0}'. Must be one of: {}", method_list())]
    InvalidPaymentMethod(String),

    #[error("Customer {0} not found")]
    CustomerNotFound(i64),

    #[error("No outstanding orders found for this customer")]
    NoOutstandingDebt,

    #[error("You do not have permission to manage bulk payments")]
    PermissionDenied,

    #[error("Payment processing failed: {0}")]
    PersistenceFailure(String),
}

impl PaymentError {
    pub fn code(&self) -> &'static str {
        match self {
            PaymentError::InvalidAmount(_) => "invalid_amount",
            PaymentError::InvalidPaymentMethod(_) => "invalid_payment_method",
            PaymentError::CustomerNotFound(_) => "customer_not_found",
            PaymentError::NoOutstandingDebt => "no_outstanding_debt",
            PaymentError::PermissionDenied => "permission_denied",
            PaymentError::PersistenceFailure(_) => "persistence_failure",
        }
    }
}

impl From<rusqlite::Error> for PaymentError {
    fn from(err: rusqlite::Error) -> Self {
        PaymentError::PersistenceFailure(err.to_string())
    }
}

fn method_list() -> String {
    PaymentMethod::ALL
        .iter()
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
