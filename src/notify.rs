// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result, anyhow};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::info;

use crate::config::Config;
use crate::models::Customer;
use crate::utils::http_client;

/// What a customer is told after a bulk payment commits.
#[derive(Debug, Clone)]
pub struct PaymentNotice<'a> {
    pub customer: &'a Customer,
    pub amount: Decimal,
    pub orders_paid: usize,
    pub fully_paid: usize,
    pub currency: &'a str,
}

impl PaymentNotice<'_> {
    pub fn message(&self) -> String {
        format!(
            "Payment received: {:.2} {}\nOrders paid: {}\nFully paid orders: {}\nThank you, {}!",
            self.amount.round_dp(2),
            self.currency,
            self.orders_paid,
            self.fully_paid,
            self.customer.name
        )
    }
}

/// Best-effort delivery; callers log failures and never propagate them.
pub trait Notifier {
    fn payment_confirmed(&self, notice: &PaymentNotice<'_>) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn payment_confirmed(&self, notice: &PaymentNotice<'_>) -> Result<()> {
        info!(
            customer_id = notice.customer.id,
            amount = %notice.amount,
            orders_paid = notice.orders_paid,
            fully_paid = notice.fully_paid,
            "payment confirmation (no bot configured)"
        );
        Ok(())
    }
}

/// Sends the confirmation through the Telegram Bot API `sendMessage` method.
pub struct TelegramNotifier {
    client: reqwest::blocking::Client,
    api_base: String,
    token: String,
}

impl TelegramNotifier {
    pub fn new(api_base: &str, token: &str) -> Result<TelegramNotifier> {
        Ok(TelegramNotifier {
            client: http_client()?,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }
}

impl Notifier for TelegramNotifier {
    fn payment_confirmed(&self, notice: &PaymentNotice<'_>) -> Result<()> {
        let chat_id = notice
            .customer
            .telegram_id
            .ok_or_else(|| anyhow!("Customer {} has no Telegram chat", notice.customer.id))?;
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        self.client
            .post(url)
            .json(&json!({ "chat_id": chat_id, "text": notice.message() }))
            .send()
            .context("Telegram sendMessage request failed")?
            .error_for_status()?;
        Ok(())
    }
}

/// Telegram when a bot token is configured, otherwise log-only.
pub fn from_config(cfg: &Config) -> Result<Box<dyn Notifier>> {
    match &cfg.telegram_token {
        Some(token) => Ok(Box::new(TelegramNotifier::new(&cfg.telegram_api, token)?)),
        None => Ok(Box::new(LogNotifier)),
    }
}
